use std::sync::Arc;

use crate::config::LabConfig;
use crate::lab::Lab;

/// Shared handler state: the startup configuration and the components built
/// from it.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LabConfig>,
    pub lab: Arc<Lab>,
}

impl AppState {
    pub fn new(config: LabConfig) -> Self {
        let lab = Lab::new(&config);
        Self {
            config: Arc::new(config),
            lab: Arc::new(lab),
        }
    }
}
