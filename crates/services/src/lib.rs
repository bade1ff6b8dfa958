pub mod auth;
pub mod drive;
pub mod token_store;

pub use auth::AuthService;
pub use drive::DriveService;
pub use token_store::TokenStore;
