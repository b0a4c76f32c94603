//! Record identity.

use std::fmt;

/// A document id, unique within its collection.
///
/// Ids normally come from the remote store; records created locally before
/// the store has seen them get a generated id from [`RecordId::generate`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(raw: impl Into<String>) -> RecordId {
        RecordId(raw.into())
    }

    /// Returns a new id unique within this process.
    pub fn generate(prefix: &str) -> RecordId {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        RecordId(format!("{}-{:06}", prefix, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RecordId {
    fn from(raw: &str) -> RecordId {
        RecordId::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = RecordId::generate("site");
        let b = RecordId::generate("site");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("site-"));
    }
}
