use std::sync::Arc;

use crate::config::Config;
use crate::store::DirectoryStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn DirectoryStore>,
    pub config: Config,
}
