//! Document store adapter — the external k/v session store.
//!
//! The engine never touches storage; handlers load a snapshot, run the
//! merge, and persist the result here. Concurrent writes to the same
//! session are last-write-wins at this layer; there is no CAS.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// Pluggable session document store. Production uses Redis; tests use the
/// in-memory implementation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads the nested document for a session, if one exists.
    async fn load(&self, session_id: Uuid) -> Result<Option<Value>>;

    /// Persists the nested document for a session (upsert).
    async fn upsert(&self, session_id: Uuid, document: &Value) -> Result<()>;

    /// Keys ever successfully filled for this session. Grows monotonically;
    /// a rejected batch never shrinks it.
    async fn filled_keys(&self, session_id: Uuid) -> Result<HashSet<String>>;

    /// Unions `keys` into the session's filled-key set.
    async fn mark_filled(&self, session_id: Uuid, keys: &[&str]) -> Result<()>;
}

fn doc_key(session_id: Uuid) -> String {
    format!("cv:{session_id}:doc")
}

fn filled_key(session_id: Uuid) -> String {
    format!("cv:{session_id}:filled")
}

/// Redis-backed store: the document as a JSON string, the filled-key set
/// as a Redis set.
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<Value>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(doc_key(session_id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, session_id: Uuid, document: &Value) -> Result<()> {
        let mut conn = self.conn().await?;
        let json = serde_json::to_string(document)?;
        conn.set::<_, _, ()>(doc_key(session_id), json).await?;
        info!("Persisted document for session {session_id}");
        Ok(())
    }

    async fn filled_keys(&self, session_id: Uuid) -> Result<HashSet<String>> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn.smembers(filled_key(session_id)).await?;
        Ok(members.into_iter().collect())
    }

    async fn mark_filled(&self, session_id: Uuid, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        conn.sadd::<_, _, ()>(filled_key(session_id), keys).await?;
        Ok(())
    }
}

/// In-memory store used by unit tests and local development.
#[derive(Default)]
pub struct InMemoryStore {
    documents: Mutex<HashMap<Uuid, Value>>,
    filled: Mutex<HashMap<Uuid, HashSet<String>>>,
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<Value>> {
        Ok(self
            .documents
            .lock()
            .map_err(|_| anyhow::anyhow!("store mutex poisoned"))?
            .get(&session_id)
            .cloned())
    }

    async fn upsert(&self, session_id: Uuid, document: &Value) -> Result<()> {
        self.documents
            .lock()
            .map_err(|_| anyhow::anyhow!("store mutex poisoned"))?
            .insert(session_id, document.clone());
        Ok(())
    }

    async fn filled_keys(&self, session_id: Uuid) -> Result<HashSet<String>> {
        Ok(self
            .filled
            .lock()
            .map_err(|_| anyhow::anyhow!("store mutex poisoned"))?
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_filled(&self, session_id: Uuid, keys: &[&str]) -> Result<()> {
        let mut filled = self
            .filled
            .lock()
            .map_err(|_| anyhow::anyhow!("store mutex poisoned"))?;
        let entry = filled.entry(session_id).or_default();
        entry.extend(keys.iter().map(|k| k.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_upsert_then_load() {
        let store = InMemoryStore::default();
        let id = Uuid::new_v4();
        assert!(store.load(id).await.unwrap().is_none());
        let doc = json!({ "personal": { "fullName": "Ayşe" } });
        store.upsert(id, &doc).await.unwrap();
        assert_eq!(store.load(id).await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn test_filled_keys_grow_monotonically() {
        let store = InMemoryStore::default();
        let id = Uuid::new_v4();
        store.mark_filled(id, &["contact.phone"]).await.unwrap();
        store
            .mark_filled(id, &["contact.phone", "personal.fullName"])
            .await
            .unwrap();
        let filled = store.filled_keys(id).await.unwrap();
        assert_eq!(filled.len(), 2);
        assert!(filled.contains("contact.phone"));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemoryStore::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.upsert(a, &json!({ "x": 1 })).await.unwrap();
        assert!(store.load(b).await.unwrap().is_none());
    }
}
