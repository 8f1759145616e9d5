use std::sync::Arc;
use tracing::{error, info};

use super::interface::Translator;
use super::marian::MarianTranslator;
use crate::config::TranslatorConfig;

/// Outcome of the startup model load, fixed for the life of the process.
#[derive(Clone)]
pub enum ModelState {
    Loaded(Arc<dyn Translator>),
    Unloaded { reason: String },
}

impl ModelState {
    pub fn loaded(translator: impl Translator + 'static) -> Self {
        Self::Loaded(Arc::new(translator))
    }

    pub fn unloaded(reason: impl Into<String>) -> Self {
        Self::Unloaded {
            reason: reason.into(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn translator(&self) -> Option<&Arc<dyn Translator>> {
        match self {
            Self::Loaded(translator) => Some(translator),
            Self::Unloaded { .. } => None,
        }
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded(translator) => f.debug_tuple("Loaded").field(&translator.describe()).finish(),
            Self::Unloaded { reason } => f.debug_struct("Unloaded").field("reason", reason).finish(),
        }
    }
}

/// Load the configured model. A failure is logged and leaves the service in
/// degraded mode; it never aborts startup.
pub fn bootstrap(settings: &TranslatorConfig) -> ModelState {
    info!("Loading translation model from {}", settings.model_path);

    match MarianTranslator::load(settings) {
        Ok(translator) => {
            info!("Translation model ready: {}", translator.describe());
            ModelState::loaded(translator)
        }
        Err(e) => {
            error!("Error loading model: {:#}", e);
            ModelState::unloaded(format!("{:#}", e))
        }
    }
}
