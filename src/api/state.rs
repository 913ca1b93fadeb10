use std::sync::Arc;

use crate::config::Config;
use crate::manager::TaskManager;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub manager: TaskManager,
}

impl AppState {
    pub fn new(config: Config, manager: TaskManager) -> Self {
        Self {
            config: Arc::new(config),
            manager,
        }
    }
}
