//! Translate interface - the model behind it is loaded once at startup

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /translate`.
///
/// Only the presence of `text` is checked when the body is read. A value
/// that is not a string fails later as a model error, see [`TranslateRequest::text`].
/// The language fields are accepted for client compatibility and ignored:
/// the service is bound to a single English to Kannada model.
#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: Value,
    #[serde(default)]
    pub source_lang: Option<Value>,
    #[serde(default)]
    pub target_lang: Option<Value>,
}

impl TranslateRequest {
    pub fn text(&self) -> Result<&str, TranslationError> {
        self.text.as_str().ok_or_else(|| {
            TranslationError::InvalidInput(format!(
                "Expected text to be a string, got {}",
                json_kind(&self.text)
            ))
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub translated_text: String,
}

/// Failure raised by a model while translating. The `Display` output is
/// returned to the client unchanged.
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("Tokenization failed: {0}")]
    Tokenizer(String),

    #[error("{0}")]
    Inference(#[from] candle_core::Error),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Translation worker failed: {0}")]
    Worker(String),

    #[error("{0}")]
    Model(String),
}

/// A loaded translation model.
///
/// Implementations are shared across concurrent requests and must not
/// require exclusive access from callers.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into the model's target language
    async fn translate(&self, text: &str) -> Result<String, TranslationError>;

    /// Short human readable description used in startup logs
    fn describe(&self) -> String;
}
