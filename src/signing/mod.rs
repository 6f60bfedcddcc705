//! Wallet signers and the per-client signer cache.
//!
//! This module provides utilities for:
//! - Creating signers from hex private keys
//! - Computing wallet addresses
//! - A keyed signer cache with explicit eviction on disconnect

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use tracing::debug;

use crate::error::GatewayError;

/// Identity of a connected wallet client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Client identified by an explicit label.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Client identified by its account address.
    pub fn from_address(address: Address) -> Self {
        Self(address.to_string().to_lowercase())
    }

    /// The identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Create a LocalSigner from a hex-encoded private key.
///
/// The private key can be with or without the "0x" prefix.
pub fn create_signer(private_key: &str) -> Result<PrivateKeySigner, GatewayError> {
    let key = private_key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    let bytes = hex::decode(key)
        .map_err(|e| GatewayError::Signing(format!("Invalid private key hex: {}", e)))?;

    if bytes.len() != 32 {
        return Err(GatewayError::Signing(format!(
            "Private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }

    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&bytes);

    PrivateKeySigner::from_bytes(&key_bytes.into())
        .map_err(|e| GatewayError::Signing(format!("Failed to create signer: {}", e)))
}

/// Get the wallet address of a private key.
pub fn address_from_private_key(private_key: &str) -> Result<Address, GatewayError> {
    Ok(create_signer(private_key)?.address())
}

/// Signers keyed by client, created once and dropped on disconnect.
#[derive(Debug, Default)]
pub struct SignerCache {
    signers: RwLock<HashMap<ClientId, PrivateKeySigner>>,
}

impl SignerCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached signer for `id`, created from `private_key` on a miss.
    pub fn get_or_create(&self, id: &ClientId, private_key: &str) -> Result<PrivateKeySigner, GatewayError> {
        // Read lock first
        {
            let cache = self
                .signers
                .read()
                .map_err(|e| GatewayError::Cache(format!("read lock poisoned: {}", e)))?;
            if let Some(signer) = cache.get(id) {
                debug!(client = %id, "Using cached signer");
                return Ok(signer.clone());
            }
        }

        let signer = create_signer(private_key)?;

        let mut cache = self
            .signers
            .write()
            .map_err(|e| GatewayError::Cache(format!("write lock poisoned: {}", e)))?;
        let cached = cache.entry(id.clone()).or_insert_with(|| {
            debug!(client = %id, address = %signer.address(), "Caching new signer");
            signer
        });
        Ok(cached.clone())
    }

    /// Cached signer for `id`, if any.
    pub fn get(&self, id: &ClientId) -> Option<PrivateKeySigner> {
        self.signers.read().ok()?.get(id).cloned()
    }

    /// Drop the signer of a disconnected client.
    pub fn evict(&self, id: &ClientId) -> bool {
        let removed = self
            .signers
            .write()
            .map(|mut cache| cache.remove(id).is_some())
            .unwrap_or(false);
        if removed {
            debug!(client = %id, "Signer evicted");
        }
        removed
    }

    /// Drop every cached signer.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.signers.write() {
            cache.clear();
            debug!("Signer cache cleared");
        }
    }

    /// Number of cached signers.
    pub fn len(&self) -> usize {
        self.signers.read().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
