use snapdrive_config::Settings;
use snapdrive_services::{AuthService, DriveService, TokenStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub drive: Arc<DriveService>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(TokenStore::new(&settings.tokens.path));
        let auth = Arc::new(AuthService::new(settings.oauth.clone(), store));
        let drive = Arc::new(DriveService::new(settings.drive.clone(), auth.clone()));

        Self {
            settings,
            auth,
            drive,
        }
    }
}
