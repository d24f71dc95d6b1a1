use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomKbEntry {
    pub symptom_name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    #[serde(default)]
    pub basic_triage_points: Vec<String>,
}

impl SymptomKbEntry {
    /// Lookup key: the lower-cased symptom name.
    pub fn key(&self) -> String {
        self.symptom_name.trim().to_lowercase()
    }
}

#[derive(Debug, Deserialize)]
struct KbFile {
    symptoms: Vec<SymptomKbEntry>,
}

/// Immutable symptom catalog. Keeps file order so matching is deterministic.
#[derive(Debug, Clone, Default)]
pub struct SymptomKb {
    entries: Vec<SymptomKbEntry>,
    index: HashMap<String, usize>,
}

impl SymptomKb {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = SymptomKbEntry>) -> Self {
        let mut kb = Self::default();
        for mut entry in entries {
            let key = entry.key();
            if key.is_empty() {
                tracing::warn!("skipping knowledge base entry with blank symptom_name");
                continue;
            }
            if kb.index.contains_key(&key) {
                tracing::warn!(symptom = %key, "duplicate knowledge base entry, keeping the first");
                continue;
            }
            entry.keywords = entry
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            kb.index.insert(key, kb.entries.len());
            kb.entries.push(entry);
        }
        kb
    }

    pub fn from_json(s: &str) -> Result<Self, AppError> {
        let file: KbFile = serde_json::from_str(s)?;
        Ok(Self::from_entries(file.symptoms))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::KnowledgeBase(format!(
                "file not found: {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Loads the catalog, degrading to an empty one on any failure.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(kb) => {
                tracing::info!(path = %path.display(), symptoms = kb.len(), "loaded symptom knowledge base");
                kb
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "symptom knowledge base unavailable, using empty catalog");
                Self::empty()
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&SymptomKbEntry> {
        self.index
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[SymptomKbEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
