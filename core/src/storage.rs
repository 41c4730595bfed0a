use std::fmt;
use std::path::Path;

use parking_lot::Mutex;
use zeroize::Zeroizing;

use crate::Result;

const PUBLIC_KEY: &[u8] = b"publicKey";
const PRIVATE_KEY: &[u8] = b"privateKey";

/// A hex-encoded key pair as the service issues and accepts it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub public_key: String,
    pub private_key: Zeroizing<String>,
}

impl Credentials {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: Zeroizing::new(private_key.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Durable home for "remember me" credentials.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credentials>>;
    fn save(&self, credentials: &Credentials) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// sled-backed store that survives process restarts
pub struct SledCredentialStore {
    _db: sled::Db,
    tree: sled::Tree,
}

impl SledCredentialStore {
    pub fn open<P: AsRef<Path>>(data_dir: P, tree_name: &str) -> Result<Self> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db = sled::open(data_dir.as_ref().join("client-db"))?;
        let tree = db.open_tree(tree_name)?;
        log::debug!("🔐 Credential store opened at {:?}", data_dir.as_ref());
        Ok(Self { _db: db, tree })
    }
}

impl CredentialStore for SledCredentialStore {
    fn load(&self) -> Result<Option<Credentials>> {
        let public_key = self.tree.get(PUBLIC_KEY)?;
        let private_key = self.tree.get(PRIVATE_KEY)?;
        match (public_key, private_key) {
            (Some(public_key), Some(private_key)) => Ok(Some(Credentials::new(
                String::from_utf8_lossy(&public_key).into_owned(),
                String::from_utf8_lossy(&private_key).into_owned(),
            ))),
            _ => Ok(None),
        }
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        let mut batch = sled::Batch::default();
        batch.insert(PUBLIC_KEY, credentials.public_key.as_bytes());
        batch.insert(PRIVATE_KEY, credentials.private_key.as_bytes());
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut batch = sled::Batch::default();
        batch.remove(PUBLIC_KEY);
        batch.remove(PRIVATE_KEY);
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;
        Ok(())
    }
}

/// Process-local store; nothing reaches the disk.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credentials>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        *self.slot.lock() = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot.lock().take();
        Ok(())
    }
}
