//! The seam between the application and its document store.
//!
//! The real store is a remote cloud service; everything here talks to it
//! through the [`DocumentStore`] trait so the rest of the crate never learns
//! which vendor is on the other side. [`MemoryStore`] implements the same
//! contract in memory for tests and offline use.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::entity::RecordId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document '{id}' in '{collection}'")]
    NotFound { collection: String, id: RecordId },
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store backend: {0}")]
    Backend(String),
}

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// A push notification for one document.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: RecordId,
    pub kind: ChangeKind,
    /// The document after the change; `None` for removals.
    pub doc: Option<Value>,
}

/// A collection-scoped change listener.
pub type Listener = Box<dyn FnMut(&ChangeEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// One operation inside a [`DocumentStore::batch`] commit.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Set {
        collection: String,
        id: RecordId,
        doc: Value,
    },
    Update {
        collection: String,
        id: RecordId,
        fields: Map<String, Value>,
    },
    Delete {
        collection: String,
        id: RecordId,
    },
}

/// A key-addressed document service.
///
/// Subscribing delivers the current contents of the collection as `Added`
/// events before any live changes, so a new subscriber always starts from a
/// full snapshot. Notifications fire synchronously on the mutating call.
pub trait DocumentStore {
    fn get(&self, collection: &str, id: &RecordId) -> Result<Option<Value>, StoreError>;

    /// Create or replace a document.
    fn set(&mut self, collection: &str, id: &RecordId, doc: Value) -> Result<(), StoreError>;

    /// Merge `fields` into an existing document. Fails if it doesn't exist.
    fn update(
        &mut self,
        collection: &str,
        id: &RecordId,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Remove a document. Removing a document that isn't there is not an
    /// error; there is nothing to roll back.
    fn delete(&mut self, collection: &str, id: &RecordId) -> Result<(), StoreError>;

    /// Apply `ops` in order. Either every operation is applied or none is.
    fn batch(&mut self, ops: Vec<BatchOp>) -> Result<(), StoreError>;

    fn subscribe(&mut self, collection: &str, listener: Listener) -> SubscriptionId;

    fn unsubscribe(&mut self, subscription: SubscriptionId);
}

struct ListenerEntry {
    id: SubscriptionId,
    collection: String,
    callback: Listener,
}

/// An in-memory [`DocumentStore`].
#[derive(Default)]
pub struct MemoryStore {
    collections: BTreeMap<String, BTreeMap<RecordId, Value>>,
    listeners: Vec<ListenerEntry>,
    next_subscription: u64,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn notify(&mut self, event: &ChangeEvent) {
        for entry in &mut self.listeners {
            if entry.collection == event.collection {
                (entry.callback)(event);
            }
        }
    }
}

fn merge_fields(
    collections: &BTreeMap<String, BTreeMap<RecordId, Value>>,
    collection: &str,
    id: &RecordId,
    fields: &Map<String, Value>,
) -> Result<Value, StoreError> {
    let existing = collections
        .get(collection)
        .and_then(|docs| docs.get(id))
        .ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.clone(),
        })?;
    let mut merged = match existing {
        Value::Object(map) => map.clone(),
        _ => {
            return Err(StoreError::Backend(format!(
                "document '{}' in '{}' is not an object",
                id, collection
            )))
        }
    };
    for (key, value) in fields {
        merged.insert(key.clone(), value.clone());
    }
    Ok(Value::Object(merged))
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &RecordId) -> Result<Option<Value>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn set(&mut self, collection: &str, id: &RecordId, doc: Value) -> Result<(), StoreError> {
        let existed = self
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc.clone())
            .is_some();
        let kind = if existed {
            ChangeKind::Modified
        } else {
            ChangeKind::Added
        };
        self.notify(&ChangeEvent {
            collection: collection.to_string(),
            id: id.clone(),
            kind,
            doc: Some(doc),
        });
        Ok(())
    }

    fn update(
        &mut self,
        collection: &str,
        id: &RecordId,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let merged = merge_fields(&self.collections, collection, id, &fields)?;
        if let Some(docs) = self.collections.get_mut(collection) {
            docs.insert(id.clone(), merged.clone());
        }
        self.notify(&ChangeEvent {
            collection: collection.to_string(),
            id: id.clone(),
            kind: ChangeKind::Modified,
            doc: Some(merged),
        });
        Ok(())
    }

    fn delete(&mut self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            self.notify(&ChangeEvent {
                collection: collection.to_string(),
                id: id.clone(),
                kind: ChangeKind::Removed,
                doc: None,
            });
        }
        Ok(())
    }

    fn batch(&mut self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        // stage against a copy so a failure anywhere leaves nothing applied
        let mut staged = self.collections.clone();
        let mut events = Vec::new();
        for op in ops {
            match op {
                BatchOp::Set {
                    collection,
                    id,
                    doc,
                } => {
                    let existed = staged
                        .entry(collection.clone())
                        .or_default()
                        .insert(id.clone(), doc.clone())
                        .is_some();
                    let kind = if existed {
                        ChangeKind::Modified
                    } else {
                        ChangeKind::Added
                    };
                    events.push(ChangeEvent {
                        collection,
                        id,
                        kind,
                        doc: Some(doc),
                    });
                }
                BatchOp::Update {
                    collection,
                    id,
                    fields,
                } => {
                    let merged = merge_fields(&staged, &collection, &id, &fields)?;
                    if let Some(docs) = staged.get_mut(&collection) {
                        docs.insert(id.clone(), merged.clone());
                    }
                    events.push(ChangeEvent {
                        collection,
                        id,
                        kind: ChangeKind::Modified,
                        doc: Some(merged),
                    });
                }
                BatchOp::Delete { collection, id } => {
                    let removed = staged
                        .get_mut(&collection)
                        .and_then(|docs| docs.remove(&id))
                        .is_some();
                    if removed {
                        events.push(ChangeEvent {
                            collection,
                            id,
                            kind: ChangeKind::Removed,
                            doc: None,
                        });
                    }
                }
            }
        }
        self.collections = staged;
        for event in &events {
            self.notify(event);
        }
        Ok(())
    }

    fn subscribe(&mut self, collection: &str, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push(ListenerEntry {
            id,
            collection: collection.to_string(),
            callback: listener,
        });

        // snapshot replay for the new subscriber only
        let snapshot: Vec<ChangeEvent> = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(doc_id, doc)| ChangeEvent {
                        collection: collection.to_string(),
                        id: doc_id.clone(),
                        kind: ChangeKind::Added,
                        doc: Some(doc.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default();
        if let Some(entry) = self.listeners.last_mut() {
            for event in &snapshot {
                (entry.callback)(event);
            }
        }
        id
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.listeners.retain(|entry| entry.id != subscription);
    }
}
