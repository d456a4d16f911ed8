use std::path::PathBuf;

const SERVICE: &str = "com.petal.apikey";

/// Credential storage seam. The mobile host backs this with the platform
/// keychain; the default implementation below keeps one file per key so the
/// secret never shares a file with the plain settings blob.
pub trait SecretStore {
    fn save(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn load(&self, key: &str) -> Option<String>;
    fn delete(&self, key: &str);
}

#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{SERVICE}.{key}"))
    }
}

impl SecretStore for FileSecretStore {
    fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        std::fs::write(&path, value)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn load(&self, key: &str) -> Option<String> {
        let raw = std::fs::read_to_string(self.entry_path(key)).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_string())
    }

    fn delete(&self, key: &str) {
        let _ = std::fs::remove_file(self.entry_path(key));
    }
}
