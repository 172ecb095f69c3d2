pub mod auth;

pub use auth::{ApiKeyAuth, AuthedKey};
