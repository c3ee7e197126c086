use std::sync::Arc;

use common::LanguageRegistry;
use judge::Store;

use crate::auth::AuthClient;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub langs: Arc<LanguageRegistry>,
    pub auth: Arc<dyn AuthClient>,
    pub config: AppConfig,
}
