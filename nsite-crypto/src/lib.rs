pub mod auth;
pub mod errors;
pub mod identity;

pub use auth::{AuthVerb, BlobAuthorization};
pub use errors::{CryptoError, Result};
pub use identity::{PublicKey, SiteIdentity};
