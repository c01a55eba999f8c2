use lemonade_manager_core::{Config, LemonadeClient, OptionsStore, PrefsStore};

/// Shared per-request context.
///
/// The stores are plain path handles; all document state lives on disk
/// and is re-read on every request, so handlers share nothing mutable
/// in-process.
pub struct AppState {
    pub config: Config,
    pub options: OptionsStore,
    pub prefs: PrefsStore,
    pub client: LemonadeClient,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let client = LemonadeClient::new(&config);
        let options = OptionsStore::new(config.storage.recipe_file.clone());
        let prefs = PrefsStore::new(config.storage.prefs_file.clone());
        Self {
            config,
            options,
            prefs,
            client,
        }
    }
}
