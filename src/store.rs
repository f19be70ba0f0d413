//! Shared state store.
//!
//! Every game document lives in an external key-value store reachable by
//! read, write, and subscribe, keyed by `games/{code}`. Sub-paths address
//! fields inside a document (`games/{code}/players`), which lets callers
//! replace a single list without rewriting the whole document. Writing
//! `null` deletes the addressed document or field.
//!
//! Last write wins. There is no compare-and-swap: two clients that read the
//! same roster and write back their own copies will silently drop one
//! side's change. Atomic field-level appends or a revision check before
//! write would close that race, but the plain-overwrite contract is kept so
//! any key-value backend with subscribe-on-change semantics can satisfy the
//! trait.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use crate::error::GameResult;

/// Broadcast capacity per watched document. Sessions that lag this far
/// behind skip to the newest snapshot, which is always safe because every
/// event carries the full document.
const WATCH_CAPACITY: usize = 64;

/// A change notification for one document.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    /// Document path, e.g. `games/A1B2C3`.
    pub path: String,
    /// Full document after the change; `None` once deleted.
    pub value: Option<Value>,
}

/// Receiver half of a document subscription. Dropping it unsubscribes.
pub type StoreSubscription = broadcast::Receiver<StoreEvent>;

/// The external shared-state store, as seen by the controller.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the value at `path`, or `None` if nothing is stored there.
    async fn read(&self, path: &str) -> GameResult<Option<Value>>;

    /// Write `value` at `path`. `null` deletes.
    async fn write(&self, path: &str, value: Value) -> GameResult<()>;

    /// Watch the document containing `path`. Every change to it (including
    /// sub-path writes) pushes the full document; deletion pushes `None`.
    async fn subscribe(&self, path: &str) -> GameResult<StoreSubscription>;
}

/// A document lives at the first two path segments (`games/{code}`); any
/// deeper segments address fields inside it.
fn split_path(path: &str) -> (String, Vec<&str>) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() <= 2 {
        (segments.join("/"), Vec::new())
    } else {
        (segments[..2].join("/"), segments[2..].to_vec())
    }
}

fn ensure_object(node: &mut Value) -> &mut serde_json::Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(serde_json::Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Set (or, for `null`, remove) a nested field, creating intermediate
/// objects as needed.
fn set_field(doc: &mut Value, fields: &[&str], value: Value) {
    let Some((last, parents)) = fields.split_last() else {
        return;
    };
    let mut node = doc;
    for field in parents {
        node = ensure_object(node)
            .entry((*field).to_string())
            .or_insert(Value::Null);
    }
    let parent = ensure_object(node);
    if value.is_null() {
        parent.remove(*last);
    } else {
        parent.insert((*last).to_string(), value);
    }
}

fn get_field<'a>(doc: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    let mut node = doc;
    for field in fields {
        node = node.get(*field)?;
    }
    Some(node)
}

/// In-process store implementation, used by the server binary and tests.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
    watchers: RwLock<HashMap<String, broadcast::Sender<StoreEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn notify(&self, doc_key: &str, value: Option<Value>) {
        let mut watchers = self.watchers.write().await;
        let dead = match watchers.get(doc_key) {
            Some(sender) => sender
                .send(StoreEvent {
                    path: doc_key.to_string(),
                    value,
                })
                .is_err(),
            None => false,
        };
        // A send error means every subscriber is gone; drop the channel.
        if dead {
            watchers.remove(doc_key);
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read(&self, path: &str) -> GameResult<Option<Value>> {
        let (doc_key, fields) = split_path(path);
        let documents = self.documents.read().await;
        Ok(documents.get(&doc_key).and_then(|doc| {
            if fields.is_empty() {
                Some(doc.clone())
            } else {
                get_field(doc, &fields).cloned()
            }
        }))
    }

    async fn write(&self, path: &str, value: Value) -> GameResult<()> {
        let (doc_key, fields) = split_path(path);
        let snapshot = {
            let mut documents = self.documents.write().await;
            if fields.is_empty() {
                if value.is_null() {
                    documents.remove(&doc_key);
                    None
                } else {
                    documents.insert(doc_key.clone(), value.clone());
                    Some(value)
                }
            } else {
                let doc = documents
                    .entry(doc_key.clone())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                set_field(doc, &fields, value);
                Some(doc.clone())
            }
        };
        self.notify(&doc_key, snapshot).await;
        Ok(())
    }

    async fn subscribe(&self, path: &str) -> GameResult<StoreSubscription> {
        let (doc_key, _) = split_path(path);
        let mut watchers = self.watchers.write().await;
        let sender = watchers
            .entry(doc_key)
            .or_insert_with(|| broadcast::channel(WATCH_CAPACITY).0);
        Ok(sender.subscribe())
    }
}
