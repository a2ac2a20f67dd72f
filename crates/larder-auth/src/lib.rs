//! Persisted credential storage for the Larder dashboard client.
//!
//! The dashboard owns exactly two pieces of client-side persisted state: the
//! bearer token proving authentication and the "remember me" flag. They are
//! stored together and cleared together (on logout or when the server rejects
//! the token).
//!
//! Readers must not hold a copy of the token across requests: a logout in
//! another view can invalidate it at any time, so every request re-reads the
//! store. [`FileCredentialStore`] deliberately keeps no in-memory copy.

mod error;
mod store;

pub use error::{CredentialError, Result};
pub use store::{
    Credentials, CredentialStore, FileCredentialStore, InMemoryCredentialStore,
    SharedCredentialStore, CREDENTIALS_FILE,
};
