use uuid::Uuid;

use crate::models::{Language, Tenant};
use crate::stores::kv::{KvStore, LANGUAGE_SLOT, TENANT_SLOT};

/// Shop session state: the signed-in tenant name and the output language.
/// Only the shop name is persisted; a tenant id is minted per load, matching
/// the host app.
pub struct SessionStore {
    kv: KvStore,
}

impl SessionStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub fn login(&mut self, shop_name: &str) -> anyhow::Result<Tenant> {
        self.kv.set(TENANT_SLOT, &shop_name.to_string())?;
        Ok(Tenant {
            id: Uuid::new_v4().to_string(),
            name: shop_name.to_string(),
        })
    }

    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.kv.remove(TENANT_SLOT)
    }

    pub fn current_tenant(&mut self) -> Option<Tenant> {
        let name: String = self.kv.get(TENANT_SLOT)?;
        Some(Tenant {
            id: Uuid::new_v4().to_string(),
            name,
        })
    }

    pub fn language(&mut self) -> Language {
        self.kv.get(LANGUAGE_SLOT).unwrap_or(Language::En)
    }

    pub fn set_language(&mut self, language: Language) -> anyhow::Result<()> {
        self.kv.set(LANGUAGE_SLOT, &language)
    }
}
