use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::model::{Person, PersonKind};
use crate::store::{Document, DocumentStore, StoreResult, Subscription};

/// Latest known teachers and employees, each tagged with its kind.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub teachers: Arc<Vec<Person>>,
    pub employees: Arc<Vec<Person>>,
}

impl Roster {
    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.teachers.iter().chain(self.employees.iter())
    }

    pub fn len(&self) -> usize {
        self.teachers.len() + self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with(&self, kind: PersonKind, documents: &[Document]) -> Self {
        let people = Arc::new(
            documents
                .iter()
                .map(|doc| Person::from_document(kind, doc))
                .collect(),
        );

        match kind {
            PersonKind::Teacher => Self {
                teachers: people,
                employees: self.employees.clone(),
            },
            PersonKind::Employee => Self {
                teachers: self.teachers.clone(),
                employees: people,
            },
        }
    }
}

/// Read handle shared with request handlers.
#[derive(Debug, Clone)]
pub struct RosterReader {
    rx: watch::Receiver<Arc<Roster>>,
}

impl RosterReader {
    pub fn snapshot(&self) -> Arc<Roster> {
        self.rx.borrow().clone()
    }

    /// Waits for the next roster change. Returns false once the roster stopped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Keeps a [`Roster`] in step with both person collections through live
/// subscriptions, so readers re-derive from committed state instead of
/// patching local copies.
pub struct LiveRoster {
    rx: watch::Receiver<Arc<Roster>>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl LiveRoster {
    pub async fn start(store: Arc<dyn DocumentStore>) -> StoreResult<Self> {
        let mut teachers = store.subscribe(PersonKind::Teacher.collection()).await?;
        let mut employees = store.subscribe(PersonKind::Employee.collection()).await?;

        let mut roster = Roster::default();
        if let Some(docs) = teachers.next().await {
            roster = roster.with(PersonKind::Teacher, &docs);
        }
        if let Some(docs) = employees.next().await {
            roster = roster.with(PersonKind::Employee, &docs);
        }
        info!(people = roster.len(), "live roster loaded");

        let (tx, rx) = watch::channel(Arc::new(roster));
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(follow(teachers, employees, tx, stop_rx));

        Ok(Self {
            rx,
            stop: Some(stop),
            task,
        })
    }

    pub fn reader(&self) -> RosterReader {
        RosterReader { rx: self.rx.clone() }
    }

    pub fn snapshot(&self) -> Arc<Roster> {
        self.rx.borrow().clone()
    }

    /// Stops following the store and releases both subscriptions.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = self.task.await;
    }
}

async fn follow(
    mut teachers: Subscription,
    mut employees: Subscription,
    tx: watch::Sender<Arc<Roster>>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop => break,
            Some(docs) = teachers.next() => publish(&tx, PersonKind::Teacher, &docs),
            Some(docs) = employees.next() => publish(&tx, PersonKind::Employee, &docs),
            else => break,
        }
    }

    teachers.unsubscribe();
    employees.unsubscribe();
    debug!("live roster stopped");
}

fn publish(tx: &watch::Sender<Arc<Roster>>, kind: PersonKind, documents: &[Document]) {
    tx.send_modify(|roster| {
        let next = roster.with(kind, documents);
        *roster = Arc::new(next);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn roster_follows_commits() {
        let store = Arc::new(MemoryStore::new());
        store.put("teachers", "t1", json!({"fullName": "Amal"})).await;
        store.put("employees", "e1", json!({"fullName": "Karim"})).await;

        let roster = LiveRoster::start(store.clone()).await.unwrap();
        let mut reader = roster.reader();
        assert_eq!(reader.snapshot().len(), 2);

        store.put("employees", "e2", json!({"fullName": "Lina"})).await;
        assert!(reader.changed().await);

        let snapshot = reader.snapshot();
        assert_eq!(snapshot.employees.len(), 2);
        assert!(snapshot.employees.iter().all(|p| p.kind == PersonKind::Employee));
        assert_eq!(snapshot.teachers[0].kind, PersonKind::Teacher);

        roster.shutdown().await;
        assert!(!reader.changed().await);
    }
}
