use std::collections::HashMap;
use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub sarvam_api_key: String,
    pub sarvam_base_url: String,
    pub llm_provider: String,
    pub llm_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub symptom_kb_path: String,
    pub default_language: String,
    pub user_language: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            sarvam_api_key: env::var("SARVAM_API_KEY").unwrap_or_default(),
            sarvam_base_url: env::var("SARVAM_BASE_URL")
                .unwrap_or_else(|_| "https://api.sarvam.ai".to_string()),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "sarvam".to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "sarvam-m".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            symptom_kb_path: env::var("SYMPTOM_KB_PATH")
                .unwrap_or_else(|_| "data/symptom_kb.json".to_string()),
            default_language: env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "en-IN".to_string()),
            user_language: env::var("USER_LANGUAGE").ok().filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn has_sarvam_key(&self) -> bool {
        !self.sarvam_api_key.trim().is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct LanguageProfile {
    pub display: String,
    pub disclaimer: String,
}

/// Supported languages keyed by BCP-47 style code (`hi-IN`, `ta-IN`, ...).
#[derive(Clone, Debug)]
pub struct LanguageConfig {
    languages: HashMap<String, LanguageProfile>,
    fallback_language: String,
}

impl LanguageConfig {
    pub fn new(fallback_language: impl Into<String>) -> Self {
        Self {
            languages: HashMap::new(),
            fallback_language: fallback_language.into(),
        }
    }

    pub fn with_language(mut self, code: &str, display: &str, disclaimer: &str) -> Self {
        self.languages.insert(
            code.to_string(),
            LanguageProfile {
                display: display.to_string(),
                disclaimer: disclaimer.to_string(),
            },
        );
        self
    }

    /// The built-in Indian language table with `fallback` as the default language.
    pub fn indian_languages(fallback: &str) -> Self {
        Self::new(fallback)
            .with_language(
                "en-IN",
                "English",
                "This information is for general knowledge and informational purposes only, and does not constitute professional advice.",
            )
            .with_language(
                "hi-IN",
                "हिन्दी",
                "यह जानकारी केवल सामान्य ज्ञान और सूचनात्मक उद्देश्यों के लिए है, और इसे पेशेवर सलाह नहीं माना जाना चाहिए।",
            )
            .with_language(
                "bn-IN",
                "বাংলা",
                "এই তথ্য শুধুমাত্র সাধারণ জ্ঞান এবং তথ্যের উদ্দেশ্যে, এবং পেশাদারী পরামর্শ হিসাবে গণ্য করা উচিত নয়।",
            )
            .with_language(
                "mr-IN",
                "मराठी",
                "ही माहिती केवळ सामान्य ज्ञान आणि माहितीच्या उद्देशाने आहे आणि याला व्यावसायिक सल्ला मानले जाऊ नये.",
            )
            .with_language(
                "kn-IN",
                "ಕನ್ನಡ",
                "ಈ ಮಾಹಿತಿಯು ಸಾಮಾನ್ಯ ಜ್ಞಾನ ಮತ್ತು ಮಾಹಿತಿ ಉದ್ದೇಶಗಳಿಗಾಗಿ ಮಾತ್ರ, ಮತ್ತು ಇದನ್ನು ವೃತ್ತಿಪರ ಸಲಹೆಯೆಂದು ಪರಿಗಣಿಸಬಾರದು.",
            )
            .with_language(
                "ta-IN",
                "தமிழ்",
                "இந்தத் தகவல் பொது அறிவு மற்றும் தகவல் நோக்கங்களுக்காக மட்டுமே, மேலும் இது தொழில்முறை ஆலோசனை எனக் கருதப்படக்கூடாது.",
            )
            .with_language(
                "te-IN",
                "తెలుగు",
                "ఈ సమాచారం సాధారణ జ్ఞానం మరియు సమాచార ప్రయోజనాల కోసం మాత్రమే, మరియు దీనిని వృత్తిపరమైన సలహాగా పరిగణించరాదు.",
            )
            .with_language(
                "ml-IN",
                "മലയാളം",
                "ഈ വിവരങ്ങൾ പൊതുവായ അറിവിനും വിവരങ്ങൾക്കും മാത്രമുള്ളതാണ്, ഇത് ഒരു പ്രൊഫഷണൽ ഉപദേശമായി കണക്കാക്കരുത്.",
            )
    }

    pub fn fallback_language(&self) -> &str {
        &self.fallback_language
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.languages.contains_key(code)
    }

    /// Maps unsupported codes to the fallback language.
    pub fn resolve(&self, code: &str) -> String {
        if self.is_supported(code) {
            code.to_string()
        } else {
            self.fallback_language.clone()
        }
    }

    pub fn display_name(&self, code: &str) -> &str {
        self.languages
            .get(code)
            .map(|p| p.display.as_str())
            .unwrap_or("English")
    }

    pub fn disclaimer(&self, code: &str) -> &str {
        self.languages
            .get(code)
            .map(|p| p.disclaimer.as_str())
            .unwrap_or("")
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self::indian_languages("en-IN")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_language_falls_back() {
        let langs = LanguageConfig::default();
        assert_eq!(langs.resolve("fr-FR"), "en-IN");
        assert_eq!(langs.resolve("ta-IN"), "ta-IN");
        assert_eq!(langs.display_name("fr-FR"), "English");
        assert_eq!(langs.disclaimer("fr-FR"), "");
    }

    #[test]
    fn test_localized_display_names() {
        let langs = LanguageConfig::default();
        assert_eq!(langs.display_name("hi-IN"), "हिन्दी");
        assert!(langs.disclaimer("en-IN").contains("general knowledge"));
    }
}
