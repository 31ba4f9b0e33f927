//! In-memory document store for tests and local runs without Firestore.

use super::store::{DocumentStore, Record, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    documents: HashMap<(String, String), Record>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(
        mut self,
        collection: impl Into<String>,
        document_id: impl Into<String>,
        record: Record,
    ) -> Self {
        self.insert(collection, document_id, record);
        self
    }

    pub fn insert(
        &mut self,
        collection: impl Into<String>,
        document_id: impl Into<String>,
        record: Record,
    ) {
        self.documents
            .insert((collection.into(), document_id.into()), record);
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<Record>, StoreError> {
        Ok(self
            .documents
            .get(&(collection.to_string(), document_id.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn returns_inserted_documents_by_collection_and_id() {
        let record = Record::from_value(json!({ "class": 9 })).unwrap();
        let store = InMemoryStore::new().with_document("content", "class9chapter1", record.clone());

        assert_eq!(
            store.get_document("content", "class9chapter1").await.unwrap(),
            Some(record)
        );
        assert_eq!(
            store.get_document("other", "class9chapter1").await.unwrap(),
            None
        );
        assert_eq!(
            store.get_document("content", "class9chapter2").await.unwrap(),
            None
        );
    }
}
