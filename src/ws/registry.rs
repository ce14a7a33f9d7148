use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::session::Session;

/// Document ID -> sessions attached to it, keyed by session identity.
///
/// Every operation on one document holds only that document's map entry,
/// and only for the duration of the mutation or snapshot. Empty sets are
/// pruned under the same entry lock, so an absent document and an empty
/// one look the same to callers.
#[derive(Default)]
pub struct Registry {
    documents: DashMap<String, HashMap<Uuid, Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session under its own document. Returns false if it was already present.
    pub fn register(&self, session: Arc<Session>) -> bool {
        let id = session.id();
        let mut sessions = self
            .documents
            .entry(session.document_id().to_string())
            .or_default();
        let inserted = sessions.insert(id, session).is_none();
        debug!("Registered session {} ({} in document)", id, sessions.len());
        inserted
    }

    /// Remove a session from its document. Removing an absent session is a no-op.
    pub fn deregister(&self, session: &Session) -> bool {
        match self.documents.entry(session.document_id().to_string()) {
            Entry::Occupied(mut entry) => {
                let removed = entry.get_mut().remove(&session.id()).is_some();
                if entry.get().is_empty() {
                    entry.remove();
                }
                removed
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Snapshot of every session in `document_id` except `session_id`.
    pub fn peers_except(&self, document_id: &str, session_id: Uuid) -> Vec<Arc<Session>> {
        self.documents
            .get(document_id)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter(|(id, _)| **id != session_id)
                    .map(|(_, session)| session.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Snapshot of every session in `document_id`.
    pub fn sessions(&self, document_id: &str) -> Vec<Arc<Session>> {
        self.documents
            .get(document_id)
            .map(|sessions| sessions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every registered session across all documents.
    pub fn all_sessions(&self) -> Vec<Arc<Session>> {
        self.documents
            .iter()
            .flat_map(|entry| entry.value().values().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub fn contains(&self, session: &Session) -> bool {
        self.documents
            .get(session.document_id())
            .is_some_and(|sessions| sessions.contains_key(&session.id()))
    }

    pub fn session_count(&self, document_id: &str) -> usize {
        self.documents
            .get(document_id)
            .map_or(0, |sessions| sessions.len())
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn connection_count(&self) -> usize {
        self.documents.iter().map(|entry| entry.value().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::test_support::memory_sink;

    fn session(document_id: &str, user_id: &str) -> Arc<Session> {
        let (sink, _rx) = memory_sink();
        let session = Session::new(document_id.into(), user_id.into(), sink);
        session.activate();
        Arc::new(session)
    }

    #[test]
    fn register_and_deregister() {
        let registry = Registry::new();
        let a = session("doc1", "a");
        let b = session("doc1", "b");

        assert!(registry.register(a.clone()));
        assert!(registry.register(b.clone()));
        assert!(!registry.register(a.clone()));
        assert_eq!(registry.session_count("doc1"), 2);

        assert!(registry.deregister(&a));
        assert!(!registry.deregister(&a));
        assert_eq!(registry.session_count("doc1"), 1);
        assert!(registry.contains(&b));
        assert!(!registry.contains(&a));
    }

    #[test]
    fn empty_documents_are_pruned() {
        let registry = Registry::new();
        let a = session("doc1", "a");
        registry.register(a.clone());
        assert_eq!(registry.document_count(), 1);

        registry.deregister(&a);
        assert_eq!(registry.document_count(), 0);
        assert!(registry.peers_except("doc1", a.id()).is_empty());
        assert!(registry.sessions("doc1").is_empty());
    }

    #[test]
    fn peers_except_skips_the_sender_and_other_documents() {
        let registry = Registry::new();
        let a = session("doc1", "a");
        let b = session("doc1", "b");
        let c = session("doc1", "c");
        let other = session("doc2", "d");
        for s in [&a, &b, &c, &other] {
            registry.register((*s).clone());
        }

        let mut peers: Vec<Uuid> = registry
            .peers_except("doc1", a.id())
            .iter()
            .map(|s| s.id())
            .collect();
        peers.sort();
        let mut expected = vec![b.id(), c.id()];
        expected.sort();
        assert_eq!(peers, expected);

        assert!(registry.peers_except("doc2", other.id()).is_empty());
        assert!(registry.peers_except("missing", a.id()).is_empty());
        assert_eq!(registry.connection_count(), 4);
        assert_eq!(registry.all_sessions().len(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_register_and_deregister_keep_exact_membership() {
        let registry = Arc::new(Registry::new());
        let sessions: Vec<Arc<Session>> = (0..100)
            .map(|i| session("doc1", &format!("u{i}")))
            .collect();

        let mut tasks = Vec::new();
        for s in &sessions {
            let registry = registry.clone();
            let s = s.clone();
            tasks.push(tokio::spawn(async move { registry.register(s) }));
        }
        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(registry.session_count("doc1"), 100);

        let mut tasks = Vec::new();
        for s in sessions.iter().take(30) {
            let registry = registry.clone();
            let s = s.clone();
            // Each removal races a second removal of the same session.
            tasks.push(tokio::spawn({
                let registry = registry.clone();
                let s = s.clone();
                async move { registry.deregister(&s) }
            }));
            tasks.push(tokio::spawn(async move { registry.deregister(&s) }));
        }
        let removed = futures_util::future::join_all(tasks)
            .await
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();

        assert_eq!(removed, 30);
        assert_eq!(registry.session_count("doc1"), 70);
        for s in sessions.iter().skip(30) {
            assert!(registry.contains(s));
        }
    }
}
