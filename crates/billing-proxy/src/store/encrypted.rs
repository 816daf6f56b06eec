//! Encrypted persistent storage for the user directory.

use super::UserDirectory;
use crate::error::ProxyError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

/// Label mixed into the store key so it differs from the token key.
const KEY_DERIVATION_PATH: &str = "billing-proxy/user-store";

/// Nonce size for AES-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// Derive the 32-byte store key: SHA256(secret || derivation path).
pub fn derive_key(secret: &SecretString) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.expose_secret().as_bytes());
    hasher.update(KEY_DERIVATION_PATH.as_bytes());
    hasher.finalize().into()
}

/// Encrypt a serialized directory: `[12-byte nonce][ciphertext + tag]`.
fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, ProxyError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut sealed = vec![0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut sealed);
    let ciphertext = cipher.encrypt(Nonce::from_slice(&sealed), plaintext)?;
    sealed.extend(ciphertext);
    Ok(sealed)
}

/// Inverse of [`seal`]. Anything that does not authenticate is an error, never
/// an empty directory, so a damaged file is not silently overwritten.
fn unseal(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, ProxyError> {
    if sealed.len() < NONCE_SIZE {
        return Err(ProxyError::Encryption(format!(
            "User store is truncated ({} bytes)",
            sealed.len()
        )));
    }

    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| {
            ProxyError::Encryption(
                "Failed to decrypt user store. Was the store secret changed?".to_string(),
            )
        })
}

/// AES-256-GCM encrypted file store.
pub struct EncryptedStore {
    storage_path: PathBuf,
    key: [u8; 32],
}

impl EncryptedStore {
    pub fn new(storage_path: PathBuf, secret: &SecretString) -> Self {
        Self {
            storage_path,
            key: derive_key(secret),
        }
    }

    /// Replace the file with the sealed directory via a temp file and rename.
    pub async fn save(&self, directory: &UserDirectory) -> Result<(), ProxyError> {
        let sealed = seal(&self.key, &serde_json::to_vec(directory)?)?;

        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let staging = self.storage_path.with_extension("tmp");
        fs::write(&staging, &sealed).await?;
        fs::rename(&staging, &self.storage_path).await?;

        debug!(
            bytes = sealed.len(),
            records = directory.count(),
            path = ?self.storage_path,
            "User store saved"
        );
        Ok(())
    }

    /// Load the directory. Only a missing file yields an empty directory.
    pub async fn load(&self) -> Result<UserDirectory, ProxyError> {
        let sealed = match fs::read(&self.storage_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = ?self.storage_path, "No user store yet, starting empty");
                return Ok(UserDirectory::new());
            }
            Err(e) => return Err(e.into()),
        };

        let directory: UserDirectory = serde_json::from_slice(&unseal(&self.key, &sealed)?)?;
        info!(
            records = directory.count(),
            path = ?self.storage_path,
            "User store loaded"
        );
        Ok(directory)
    }
}

/// No-op store used in tests or when persistence is disabled.
pub struct MemoryStore;

impl MemoryStore {
    pub async fn save(&self, _directory: &UserDirectory) -> Result<(), ProxyError> {
        debug!("Memory store: save is a no-op");
        Ok(())
    }

    pub async fn load(&self) -> Result<UserDirectory, ProxyError> {
        debug!("Memory store: returning empty directory");
        Ok(UserDirectory::new())
    }
}

/// Storage backend.
pub enum Store {
    /// Encrypted file storage
    Encrypted(EncryptedStore),
    /// In-memory only (no persistence)
    Memory(MemoryStore),
}

impl Store {
    pub fn encrypted(storage_path: PathBuf, secret: &SecretString) -> Self {
        Store::Encrypted(EncryptedStore::new(storage_path, secret))
    }

    pub fn memory() -> Self {
        Store::Memory(MemoryStore)
    }

    pub async fn save(&self, directory: &UserDirectory) -> Result<(), ProxyError> {
        match self {
            Store::Encrypted(s) => s.save(directory).await,
            Store::Memory(s) => s.save(directory).await,
        }
    }

    pub async fn load(&self) -> Result<UserDirectory, ProxyError> {
        match self {
            Store::Encrypted(s) => s.load().await,
            Store::Memory(s) => s.load().await,
        }
    }
}
