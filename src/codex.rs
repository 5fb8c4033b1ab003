//! State codex: canonical, round-trippable encoding of a [`State`] into an
//! opaque hash string, plus a swappable-backend registry.
//!
//! Codices are modeled as `async_trait` traits so a caller can plug in a
//! cryptographic or compressed encoding that genuinely suspends (e.g. an
//! out-of-process hashing service); the default implementation is
//! synchronous under the hood and returns immediately, which satisfies the
//! trait trivially.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use derive_more::{Display, From};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::CodexError;
use crate::state::State;

/// An opaque, canonical identifier for a state. Two states that are
/// structurally equal always produce the same `Hash`; this is the crate's
/// only notion of state identity for graph/visited-set purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
pub struct Hash(pub String);

/// Encodes/decodes states to/from an opaque string identity. Implementors
/// must satisfy two invariants:
/// - round-trip: `decode(encode(s)) == s` for every reachable `s`
/// - canonicality: encoding is independent of object-key insertion order
#[async_trait]
pub trait Codex: Send + Sync {
    async fn encode(&self, state: &State) -> Result<Hash, CodexError>;
    async fn decode(&self, hash: &Hash) -> Result<State, CodexError>;
}

/// Canonicalizes by converting to JSON (object keys are already sorted —
/// see [`State::to_json`]), serializing compactly, then base64-encoding so
/// the resulting hash string is safe to use as a map key or file name.
#[derive(Debug, Clone, Default)]
pub struct DefaultCodex;

#[async_trait]
impl Codex for DefaultCodex {
    async fn encode(&self, state: &State) -> Result<Hash, CodexError> {
        let json = state.to_json();
        let text = serde_json::to_string(&json).map_err(|e| CodexError(e.to_string()))?;
        Ok(Hash(STANDARD.encode(text.as_bytes())))
    }

    async fn decode(&self, hash: &Hash) -> Result<State, CodexError> {
        let bytes = STANDARD.decode(hash.0.as_bytes()).map_err(|e| CodexError(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| CodexError(e.to_string()))?;
        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| CodexError(e.to_string()))?;
        Ok(State::from_json(&json))
    }
}

static REGISTRY: Lazy<RwLock<HashMap<String, std::sync::Arc<dyn Codex>>>> = Lazy::new(|| {
    let mut map: HashMap<String, std::sync::Arc<dyn Codex>> = HashMap::new();
    map.insert("default".to_string(), std::sync::Arc::new(DefaultCodex));
    RwLock::new(map)
});

/// Registers a codex under `name`, replacing any existing entry.
pub fn register(name: impl Into<String>, codex: std::sync::Arc<dyn Codex>) {
    REGISTRY.write().insert(name.into(), codex);
}

/// Looks up a previously-registered codex, `"default"` being always present.
pub fn lookup(name: &str) -> Option<std::sync::Arc<dyn Codex>> {
    REGISTRY.read().get(name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips() {
        let codex = DefaultCodex;
        let state = State::object([
            ("b".to_string(), State::Number(2.0)),
            ("a".to_string(), State::array([State::from("x")])),
        ]);
        let hash = codex.encode(&state).await.unwrap();
        let back = codex.decode(&hash).await.unwrap();
        assert_eq!(state, back);
    }

    #[tokio::test]
    async fn canonical_regardless_of_construction_order() {
        let codex = DefaultCodex;
        let a = State::object([
            ("a".to_string(), State::Number(1.0)),
            ("b".to_string(), State::Number(2.0)),
        ]);
        let b = State::object([
            ("b".to_string(), State::Number(2.0)),
            ("a".to_string(), State::Number(1.0)),
        ]);
        assert_eq!(codex.encode(&a).await.unwrap(), codex.encode(&b).await.unwrap());
    }

    #[test]
    fn default_codex_is_registered() {
        assert!(lookup("default").is_some());
        assert!(lookup("nonexistent").is_none());
    }
}
