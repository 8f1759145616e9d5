use std::sync::Arc;

use crate::alerts::AlertStats;
use crate::translate::ModelState;

#[derive(Clone)]
pub struct AppState {
    pub model: ModelState,
    pub alerts: Arc<AlertStats>,
}

impl AppState {
    pub fn new(model: ModelState) -> Self {
        Self {
            model,
            alerts: Arc::new(AlertStats::new()),
        }
    }
}
