use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::RwLock;

use async_trait::async_trait;

use billforge_core::{Document, DocumentId, ExpectedVersion, UserId};

use super::DocumentStore;
use crate::error::StoreError;

/// In-memory owner-isolated store for tests/dev.
#[derive(Debug)]
pub struct InMemoryDocumentStore<D> {
    inner: RwLock<HashMap<(UserId, DocumentId), D>>,
    _document: PhantomData<fn() -> D>,
}

impl<D> InMemoryDocumentStore<D> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            _document: PhantomData,
        }
    }
}

impl<D> Default for InMemoryDocumentStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

fn key<D: Document>(document: &D) -> (UserId, DocumentId) {
    (document.owner(), document.document_id())
}

#[async_trait]
impl<D: Document> DocumentStore<D> for InMemoryDocumentStore<D> {
    async fn get(&self, owner: UserId, id: DocumentId) -> Result<Option<D>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map.get(&(owner, id)).cloned())
    }

    async fn list(&self, owner: UserId) -> Result<Vec<D>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut docs: Vec<D> = map
            .iter()
            .filter_map(|((o, _id), d)| if *o == owner { Some(d.clone()) } else { None })
            .collect();
        // UUIDv7 ids sort by creation time.
        docs.sort_by_key(|d| d.document_id());
        Ok(docs)
    }

    async fn insert(&self, mut document: D) -> Result<D, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let key = key(&document);
        if map.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "{} document {} already exists",
                D::COLLECTION,
                key.1
            )));
        }
        document.set_version(1);
        map.insert(key, document.clone());
        Ok(document)
    }

    async fn update(&self, mut document: D, expected: ExpectedVersion) -> Result<D, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let stored = map.get_mut(&key(&document)).ok_or(StoreError::NotFound)?;
        let current = stored.version();
        if !expected.matches(current) {
            return Err(StoreError::version_mismatch(expected, current));
        }
        document.set_version(current + 1);
        *stored = document.clone();
        Ok(document)
    }

    async fn update_all(&self, documents: Vec<D>) -> Result<Vec<D>, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;

        // Check everything before touching anything.
        for document in &documents {
            let stored = map.get(&key(document)).ok_or(StoreError::NotFound)?;
            if stored.version() != document.version() {
                return Err(StoreError::version_mismatch(
                    ExpectedVersion::Exact(document.version()),
                    stored.version(),
                ));
            }
        }

        let mut written = Vec::with_capacity(documents.len());
        for mut document in documents {
            document.set_version(document.version() + 1);
            map.insert(key(&document), document.clone());
            written.push(document);
        }
        Ok(written)
    }

    async fn delete(&self, owner: UserId, id: DocumentId) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        map.remove(&(owner, id)).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: DocumentId,
        owner: UserId,
        text: String,
        version: u64,
    }

    impl Note {
        fn new(owner: UserId, text: &str) -> Self {
            Self {
                id: DocumentId::new(),
                owner,
                text: text.to_string(),
                version: 0,
            }
        }
    }

    impl Document for Note {
        const COLLECTION: &'static str = "notes";

        fn document_id(&self) -> DocumentId {
            self.id
        }

        fn owner(&self) -> UserId {
            self.owner
        }

        fn version(&self) -> u64 {
            self.version
        }

        fn set_version(&mut self, version: u64) {
            self.version = version;
        }
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let store = InMemoryDocumentStore::<Note>::new();
        let alice = UserId::new();
        let bob = UserId::new();

        let note = store.insert(Note::new(alice, "hello")).await.unwrap();
        assert_eq!(note.version, 1);

        assert!(store.get(bob, note.id).await.unwrap().is_none());
        assert!(store.list(bob).await.unwrap().is_empty());
        assert!(matches!(store.delete(bob, note.id).await, Err(StoreError::NotFound)));
        assert_eq!(store.list(alice).await.unwrap(), vec![note]);
    }

    #[tokio::test]
    async fn list_is_in_creation_order() {
        let store = InMemoryDocumentStore::<Note>::new();
        let owner = UserId::new();
        for text in ["a", "b", "c"] {
            store.insert(Note::new(owner, text)).await.unwrap();
        }
        let texts: Vec<_> = store.list(owner).await.unwrap().into_iter().map(|n| n.text).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn duplicate_insert_conflicts() {
        let store = InMemoryDocumentStore::<Note>::new();
        let note = store.insert(Note::new(UserId::new(), "x")).await.unwrap();
        assert!(matches!(store.insert(note).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn stale_update_is_rejected() {
        let store = InMemoryDocumentStore::<Note>::new();
        let mut note = store.insert(Note::new(UserId::new(), "v1")).await.unwrap();

        note.text = "v2".into();
        let updated = store.update(note.clone(), ExpectedVersion::Exact(1)).await.unwrap();
        assert_eq!(updated.version, 2);

        let err = store.update(note.clone(), ExpectedVersion::Exact(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let forced = store.update(note, ExpectedVersion::Any).await.unwrap();
        assert_eq!(forced.version, 3);
    }

    #[tokio::test]
    async fn batch_update_is_all_or_nothing() {
        let store = InMemoryDocumentStore::<Note>::new();
        let owner = UserId::new();
        let mut a = store.insert(Note::new(owner, "a")).await.unwrap();
        let mut b = store.insert(Note::new(owner, "b")).await.unwrap();

        a.text = "a2".into();
        b.text = "b2".into();
        let mut stale = b.clone();
        stale.version = 7;

        let err = store.update_all(vec![a.clone(), stale]).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.require(owner, a.id).await.unwrap().text, "a");

        let written = store.update_all(vec![a, b]).await.unwrap();
        assert!(written.iter().all(|n| n.version == 2));
        assert_eq!(store.require(owner, written[1].id).await.unwrap().text, "b2");
    }
}
