//! Key/value storage with TTL and optional encryption.
//!
//! Two backends:
//! - **local**: a JSON file, rewritten after every mutation
//! - **session**: memory only, gone when the process exits
//!
//! Values are stored as JSON text. With a [`Cipher`] they are sealed with
//! ChaCha20-Poly1305 under a fresh random nonce per write and kept as
//! base64 of `nonce || ciphertext`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{BridgeError, Result};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Symmetric cipher for stored values.
#[derive(Clone)]
pub struct Cipher {
    aead: ChaCha20Poly1305,
}

impl Cipher {
    /// From a raw 32-byte key.
    pub fn from_key(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(BridgeError::Crypto(format!(
                "key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        Ok(Self {
            aead: ChaCha20Poly1305::new(Key::from_slice(key)),
        })
    }

    /// Key = SHA-256(passphrase).
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        Self {
            aead: ChaCha20Poly1305::new(&digest),
        }
    }

    /// Seal `plaintext`; returns base64 of `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let sealed = self
            .aead
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| BridgeError::Crypto(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    /// Open a value produced by [`Cipher::encrypt`].
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>> {
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| BridgeError::Crypto(format!("invalid base64: {e}")))?;
        if raw.len() < NONCE_LEN {
            return Err(BridgeError::Crypto("ciphertext shorter than nonce".into()));
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        self.aead
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| BridgeError::Crypto("decryption failed (wrong key or corrupted data)".into()))
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cipher(..)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    value: String,
    #[serde(default)]
    encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug)]
enum Backend {
    Local(PathBuf),
    Session,
}

/// Key/value store. All methods are synchronous; the local backend does
/// blocking file I/O.
#[derive(Debug)]
pub struct Storage {
    backend: Backend,
    entries: Mutex<HashMap<String, StoredEntry>>,
    cipher: Option<Cipher>,
}

impl Storage {
    /// In-memory store.
    pub fn session() -> Self {
        Self {
            backend: Backend::Session,
            entries: Mutex::new(HashMap::new()),
            cipher: None,
        }
    }

    /// File-backed store. A missing file starts empty.
    pub fn local(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => HashMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                BridgeError::Storage(format!("corrupt store {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "storage loaded");

        Ok(Self {
            backend: Backend::Local(path),
            entries: Mutex::new(entries),
            cipher: None,
        })
    }

    /// Encrypt values written from now on. Existing plaintext entries stay
    /// readable.
    pub fn with_cipher(mut self, cipher: Cipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::Local(path) => Some(path),
            Backend::Session => None,
        }
    }

    fn persist(&self, entries: &HashMap<String, StoredEntry>) -> Result<()> {
        let Backend::Local(path) = &self.backend else {
            return Ok(());
        };
        // Sorted for stable diffs
        let sorted: BTreeMap<&String, &StoredEntry> = entries.iter().collect();
        let text = serde_json::to_string_pretty(&sorted)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Run `f` on a copy of the entries; the copy replaces the live map
    /// only once it has been persisted. `f` reports whether it changed
    /// anything.
    fn update<R>(&self, f: impl FnOnce(&mut HashMap<String, StoredEntry>) -> (R, bool)) -> Result<R> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        let (out, changed) = f(&mut next);
        if changed {
            self.persist(&next)?;
            *entries = next;
        }
        Ok(out)
    }

    fn write(&self, key: &str, entry: StoredEntry) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), entry);
            ((), true)
        })
    }

    fn seal<T: Serialize + ?Sized>(&self, value: &T, expires_at: Option<DateTime<Utc>>) -> Result<StoredEntry> {
        let json = serde_json::to_string(value)?;
        Ok(match &self.cipher {
            Some(cipher) => StoredEntry {
                value: cipher.encrypt(json.as_bytes())?,
                encrypted: true,
                expires_at,
            },
            None => StoredEntry {
                value: json,
                encrypted: false,
                expires_at,
            },
        })
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let entry = self.seal(value, None)?;
        self.write(key, entry)
    }

    /// Store `value` until `ttl` has passed.
    pub fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| BridgeError::Storage(format!("ttl out of range: {e}")))?;
        let entry = self.seal(value, Some(Utc::now() + ttl))?;
        self.write(key, entry)
    }

    /// Value for `key`. Expired entries read as absent and are purged.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let entry = {
            let entries = self.entries.lock();
            match entries.get(key) {
                Some(entry) => entry.clone(),
                None => return Ok(None),
            }
        };

        let now = Utc::now();
        if entry.is_expired(now) {
            self.update(|entries| {
                let still_expired = entries.get(key).is_some_and(|e| e.is_expired(now));
                if still_expired {
                    entries.remove(key);
                }
                ((), still_expired)
            })?;
            tracing::debug!(key, "expired entry purged");
            return Ok(None);
        }

        let json = if entry.encrypted {
            let cipher = self.cipher.as_ref().ok_or_else(|| {
                BridgeError::Crypto(format!("'{key}' is encrypted but no cipher is configured"))
            })?;
            String::from_utf8(cipher.decrypt(&entry.value)?)
                .map_err(|e| BridgeError::Crypto(e.to_string()))?
        } else {
            entry.value
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|e| !e.is_expired(Utc::now()))
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        self.update(|entries| {
            let removed = entries.remove(key).is_some();
            (removed, removed)
        })
    }

    /// Live keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = Utc::now();
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> Result<()> {
        self.update(|entries| {
            entries.clear();
            ((), true)
        })
    }

    /// Drop every expired entry; returns how many went.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|_, e| !e.is_expired(now));
            let purged = before - entries.len();
            (purged, purged > 0)
        })
    }
}
