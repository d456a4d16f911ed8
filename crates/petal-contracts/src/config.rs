use crate::models::ApiConfig;
use crate::stores::kv::{KvStore, CONFIG_SLOT};
use crate::stores::secret::SecretStore;

pub const API_KEY_SECRET: &str = "api_key";

/// Merges the plain settings blob with the separately stored API key. The
/// key has its own lifecycle: it is overlaid on read and split out on write,
/// and the plain blob on disk never contains it.
pub struct ConfigStore {
    kv: KvStore,
    secrets: Box<dyn SecretStore>,
}

impl ConfigStore {
    pub fn new(kv: KvStore, secrets: Box<dyn SecretStore>) -> Self {
        Self { kv, secrets }
    }

    pub fn current(&mut self) -> ApiConfig {
        let mut config: ApiConfig = self.kv.get(CONFIG_SLOT).unwrap_or_default();
        if let Some(key) = self.secrets.load(API_KEY_SECRET) {
            config.api_key = key;
        }
        config
    }

    /// An empty incoming key leaves the stored secret untouched, so saving
    /// settings without re-entering the key keeps the existing credential.
    pub fn update(&mut self, config: &ApiConfig) -> anyhow::Result<()> {
        if !config.api_key.is_empty() {
            self.secrets.save(API_KEY_SECRET, &config.api_key)?;
        }
        let mut plain = config.clone();
        plain.api_key = String::new();
        self.kv.set(CONFIG_SLOT, &plain)
    }
}
