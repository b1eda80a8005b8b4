// handlers/mod.rs - HTTP surface
//
// public: service info and health (GET /, GET /health)
// calls:  call record CRUD under /api/v1/calls
pub mod calls;
pub mod public;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::store::CallStore;
use crate::services::CallService;

/// Shared state handed to every handler through `Extension`
#[derive(Clone)]
pub struct AppContext {
    pub service: CallService,
    pub config: Arc<AppConfig>,
}

impl AppContext {
    pub fn new(store: Arc<dyn CallStore>, config: AppConfig) -> Self {
        let service = CallService::new(store, config.api.max_batch_size);
        Self {
            service,
            config: Arc::new(config),
        }
    }
}
