//! Tenant-scoped payload encryption (§4.6). Client-data payloads are
//! sealed with a tenant-scoped symmetric key before chunking; system and
//! internal-DB updates use a mesh/node key. Key material itself always
//! comes from an external `KeyringPort` — this crate never generates or
//! stores long-lived keys, only performs the AEAD seal/open around
//! whatever the keyring hands back.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use rand::RngCore;

pub const NONCE_LEN: usize = 12;
pub const KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("no key available for scope {0:?}")]
    KeyUnavailable(KeyScope),
    #[error("ciphertext too short to contain a nonce")]
    Truncated,
    #[error("seal failed")]
    SealFailed,
    #[error("open failed: ciphertext invalid or key mismatch")]
    OpenFailed,
}

/// Which key a payload should be sealed under. `Tenant` covers client-data
/// streams; `Mesh` covers system and internal-DB updates (§4.6).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyScope {
    Tenant(String),
    Mesh,
}

/// External collaborator boundary: a real implementation fetches key
/// material from a secrets manager, HSM, or similar. This crate only
/// depends on the trait.
#[async_trait]
pub trait KeyringPort: Send + Sync {
    async fn key_for(&self, scope: &KeyScope) -> Result<[u8; KEY_LEN], CryptoError>;
}

/// Seals `plaintext` under the key for `scope`, returning `nonce || ciphertext`.
/// Headers are never passed here — only the opaque payload is encrypted,
/// matching §4.6's "headers remain cleartext".
pub async fn seal(keyring: &dyn KeyringPort, scope: &KeyScope, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key_bytes = keyring.key_for(scope).await?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher.encrypt(nonce, plaintext).map_err(|_| CryptoError::SealFailed)?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Inverse of `seal`: expects `nonce || ciphertext` as produced above.
pub async fn open(keyring: &dyn KeyringPort, scope: &KeyScope, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_LEN {
        return Err(CryptoError::Truncated);
    }
    let key_bytes = keyring.key_for(scope).await?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher.decrypt(nonce, ciphertext).map_err(|_| CryptoError::OpenFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct StaticKeyring {
        keys: RwLock<HashMap<KeyScope, [u8; KEY_LEN]>>,
    }

    impl StaticKeyring {
        fn with_key(scope: KeyScope, key: [u8; KEY_LEN]) -> Self {
            let mut keys = HashMap::new();
            keys.insert(scope, key);
            StaticKeyring { keys: RwLock::new(keys) }
        }
    }

    #[async_trait]
    impl KeyringPort for StaticKeyring {
        async fn key_for(&self, scope: &KeyScope) -> Result<[u8; KEY_LEN], CryptoError> {
            self.keys
                .read()
                .unwrap()
                .get(scope)
                .copied()
                .ok_or_else(|| CryptoError::KeyUnavailable(scope.clone()))
        }
    }

    #[tokio::test]
    async fn seal_then_open_roundtrips() {
        let keyring = StaticKeyring::with_key(KeyScope::Tenant("tenant-1".into()), [7u8; KEY_LEN]);
        let scope = KeyScope::Tenant("tenant-1".into());
        let sealed = seal(&keyring, &scope, b"order-confirmed").await.unwrap();
        let opened = open(&keyring, &scope, &sealed).await.unwrap();
        assert_eq!(opened, b"order-confirmed");
    }

    #[tokio::test]
    async fn open_fails_under_the_wrong_scope_key() {
        let keyring_a = StaticKeyring::with_key(KeyScope::Tenant("a".into()), [1u8; KEY_LEN]);
        let keyring_b = StaticKeyring::with_key(KeyScope::Tenant("a".into()), [2u8; KEY_LEN]);
        let scope = KeyScope::Tenant("a".into());
        let sealed = seal(&keyring_a, &scope, b"secret").await.unwrap();
        let err = open(&keyring_b, &scope, &sealed).await.unwrap_err();
        assert!(matches!(err, CryptoError::OpenFailed));
    }

    #[tokio::test]
    async fn missing_key_is_reported_distinctly() {
        let keyring = StaticKeyring::with_key(KeyScope::Mesh, [0u8; KEY_LEN]);
        let err = seal(&keyring, &KeyScope::Tenant("nope".into()), b"x").await.unwrap_err();
        assert!(matches!(err, CryptoError::KeyUnavailable(_)));
    }
}
