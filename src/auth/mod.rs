//! Session lifecycle: OAuth login, renewal, logout and persistence.

pub mod error;
pub mod manager;
pub mod oauth;
pub mod session;
pub mod state;
pub mod store;

pub use error::AuthError;
pub use manager::{AuthManager, PendingLogin};
pub use oauth::{IdentityProvider, LoginChallenge, OAuthClient};
pub use session::Session;
pub use state::{AuthEvent, AuthState};
pub use store::{FileSessionStore, SessionStore, SessionStoreConfig};
