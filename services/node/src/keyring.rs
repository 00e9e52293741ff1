//! A generate-on-first-use keyring. `mesh-crypto::KeyringPort` is an
//! external collaborator boundary — a real deployment would back this
//! with a secrets manager or HSM. This adapter exists so a standalone
//! node has something to seal payloads with out of the box.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use mesh_crypto::{CryptoError, KeyScope, KeyringPort, KEY_LEN};
use rand::RngCore;

#[derive(Default)]
pub struct GeneratedKeyring {
    keys: RwLock<HashMap<KeyScope, [u8; KEY_LEN]>>,
}

impl GeneratedKeyring {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyringPort for GeneratedKeyring {
    async fn key_for(&self, scope: &KeyScope) -> Result<[u8; KEY_LEN], CryptoError> {
        if let Some(key) = self.keys.read().unwrap().get(scope) {
            return Ok(*key);
        }
        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        self.keys.write().unwrap().insert(scope.clone(), key);
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_scope_returns_the_same_key_twice() {
        let keyring = GeneratedKeyring::new();
        let scope = KeyScope::Tenant("tenant-1".to_owned());
        let k1 = keyring.key_for(&scope).await.unwrap();
        let k2 = keyring.key_for(&scope).await.unwrap();
        assert_eq!(k1, k2);
    }

    #[tokio::test]
    async fn different_scopes_get_different_keys() {
        let keyring = GeneratedKeyring::new();
        let a = keyring.key_for(&KeyScope::Tenant("a".to_owned())).await.unwrap();
        let b = keyring.key_for(&KeyScope::Tenant("b".to_owned())).await.unwrap();
        assert_ne!(a, b);
    }
}
