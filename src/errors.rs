#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("AI provider error: {0}")]
    Ai(String),

    #[error("speech error: {0}")]
    Speech(String),
}
