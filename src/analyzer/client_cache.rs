//! Get-or-create cache of constructed provider clients.
//!
//! Keys carry the provider, the model, an 8-character credential prefix and
//! a short SHA-256 fingerprint of the credential; the credential itself is
//! never stored. Entries live until `clear()`.

use crate::analyzer::llm_client::GenerationClient;
use crate::analyzer::registry::ClientFactory;
use crate::error::AnalysisError;
use crate::models::{credential_prefix, ProviderId};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    pub provider: ProviderId,
    pub credential_prefix: String,
    pub fingerprint: String,
    pub model: String,
}

impl ClientKey {
    pub fn new(provider: ProviderId, credential: &str, model: Option<&str>) -> Self {
        Self {
            provider,
            credential_prefix: credential_prefix(credential),
            fingerprint: fingerprint(credential),
            model: model.unwrap_or(provider.default_model()).to_string(),
        }
    }
}

fn fingerprint(credential: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credential.as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..8])
}

pub struct ClientCache {
    factory: Arc<dyn ClientFactory>,
    clients: DashMap<ClientKey, Arc<dyn GenerationClient>>,
}

impl ClientCache {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            clients: DashMap::new(),
        }
    }

    /// Returns the cached client for this key, building it on a miss.
    ///
    /// Two callers racing on the same missing key may both build a client;
    /// only the first insert is kept and both receive that instance.
    pub fn get_or_create(
        &self,
        provider: ProviderId,
        credential: &str,
        model: Option<&str>,
    ) -> Result<Arc<dyn GenerationClient>, AnalysisError> {
        let key = ClientKey::new(provider, credential, model);

        if let Some(client) = self.clients.get(&key) {
            debug!(provider = %provider, key = %key.credential_prefix, model = %key.model, "client cache hit");
            return Ok(Arc::clone(client.value()));
        }

        let client = self.factory.create_client(provider, credential, model)?;
        debug!(provider = %provider, key = %key.credential_prefix, model = %key.model, "client cache miss");

        let entry = self.clients.entry(key).or_insert(client);
        Ok(Arc::clone(entry.value()))
    }

    pub fn contains(&self, provider: ProviderId, credential: &str, model: Option<&str>) -> bool {
        self.clients
            .contains_key(&ClientKey::new(provider, credential, model))
    }

    pub fn clear(&self) {
        self.clients.clear();
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
