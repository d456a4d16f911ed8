pub mod kv;
pub mod secret;

pub use kv::KvStore;
pub use secret::{FileSecretStore, SecretStore};
