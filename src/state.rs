use std::sync::Arc;

use crate::auth::GrantSigner;
use crate::config::Config;
use crate::matchmaker::Matchmaker;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub matchmaker: Arc<Matchmaker>,
    pub grants: Arc<GrantSigner>,
}

impl AppState {
    pub fn new(config: Config, matchmaker: Arc<Matchmaker>, grants: GrantSigner) -> Self {
        Self {
            config: Arc::new(config),
            matchmaker,
            grants: Arc::new(grants),
        }
    }
}
