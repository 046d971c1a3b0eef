//! Versioned JSON envelope
//!
//! Stored values look like `{"version": 1, "payload": ...}`. Anything that
//! fails to read back (missing, malformed, other version) yields the default
//! value and a warning; local caches are never authoritative.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub version: u32,
    pub payload: T,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    payload: &'a T,
}

#[derive(Deserialize)]
struct RawEnvelope {
    version: u32,
    payload: serde_json::Value,
}

impl<T: DeserializeOwned + Default> Envelope<T> {
    /// Read `key`, falling back to `T::default()` on any failure
    pub fn load(store: &dyn KeyValueStore, key: &str, version: u32) -> T {
        Self::try_load(store, key, version).unwrap_or_default()
    }

    /// Read `key`; `None` when missing or unusable
    pub fn try_load(store: &dyn KeyValueStore, key: &str, version: u32) -> Option<T> {
        let json = match store.get(key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(err) => {
                log::warn!("Reading {key} failed: {err}");
                return None;
            }
        };

        let raw: RawEnvelope = match serde_json::from_str(&json) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("Discarding malformed {key}: {err}");
                return None;
            }
        };
        if raw.version != version {
            log::warn!(
                "Discarding {key}: stored version {} but expected {version}",
                raw.version
            );
            return None;
        }

        match serde_json::from_value(raw.payload) {
            Ok(payload) => Some(payload),
            Err(err) => {
                log::warn!("Discarding malformed {key} payload: {err}");
                None
            }
        }
    }
}

impl<T: Serialize> Envelope<T> {
    /// Write `payload` under `key`; returns false (and logs) on failure
    pub fn save(store: &mut dyn KeyValueStore, key: &str, version: u32, payload: &T) -> bool {
        let json = match serde_json::to_string(&EnvelopeRef { version, payload }) {
            Ok(json) => json,
            Err(err) => {
                log::warn!("Serializing {key} failed: {err}");
                return false;
            }
        };
        match store.set(key, &json) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Writing {key} failed: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, StorageError};

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
    }

    #[test]
    fn test_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(Envelope::save(&mut store, "counter", 2, &Counter { value: 9 }));
        let loaded: Counter = Envelope::load(&store, "counter", 2);
        assert_eq!(loaded, Counter { value: 9 });
        assert_eq!(
            store.get("counter").unwrap().as_deref(),
            Some(r#"{"version":2,"payload":{"value":9}}"#)
        );
    }

    #[test]
    fn test_version_mismatch_uses_default() {
        let mut store = MemoryStore::new();
        Envelope::save(&mut store, "counter", 1, &Counter { value: 9 });
        let loaded: Counter = Envelope::load(&store, "counter", 2);
        assert_eq!(loaded, Counter::default());
    }

    #[test]
    fn test_corrupt_json_uses_default() {
        let mut store = MemoryStore::new();
        store.set("counter", "{not json").unwrap();
        let loaded: Counter = Envelope::load(&store, "counter", 1);
        assert_eq!(loaded, Counter::default());

        store
            .set("counter", r#"{"version":1,"payload":{"value":"nine"}}"#)
            .unwrap();
        assert!(Envelope::<Counter>::try_load(&store, "counter", 1).is_none());
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("quota".into()))
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota".into()))
        }
        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_broken_store_is_recoverable() {
        let mut store = BrokenStore;
        assert!(!Envelope::save(&mut store, "counter", 1, &Counter { value: 1 }));
        let loaded: Counter = Envelope::load(&store, "counter", 1);
        assert_eq!(loaded, Counter::default());
    }
}
