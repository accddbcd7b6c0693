//! Background thread running a [`MintWorker`] loop.

use std::sync::mpsc::{channel, Sender};
use std::thread::{self, JoinHandle};

use super::{MintWorker, WorkerStats};
use crate::chain::BlockchainAdapter;
use crate::clock::Clock;
use crate::model::ModelStore;

/// A [`MintWorker`] running on its own thread.
///
/// ## Example
///
/// ```ignore
/// use storymint::{InMemoryLedger, InMemoryModelStore, MintWorker, MintWorkerThread};
///
/// let store = InMemoryModelStore::new();
/// let worker = MintWorker::new(store.clone(), InMemoryLedger::new().auto_mining());
///
/// let handle = MintWorkerThread::spawn(worker);
///
/// // ... publish works ...
///
/// let stats = handle.stop();
/// println!("completed {} events", stats.completed);
/// ```
pub struct MintWorkerThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl MintWorkerThread {
    /// Move `worker` onto a new thread and start its loop.
    ///
    /// Several threads may share one store: store handles such as
    /// `InMemoryModelStore` clone into views of the same documents, and the
    /// outbox claim hands each event to one worker only.
    pub fn spawn<S, A, C>(mut worker: MintWorker<S, A, C>) -> Self
    where
        S: ModelStore + Clone + 'static,
        A: BlockchainAdapter + 'static,
        C: Clock + 'static,
    {
        let (stop_tx, stop_rx) = channel();
        let handle = thread::spawn(move || worker.run(&stop_rx));

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the worker to stop and wait for it to finish.
    /// Returns the worker statistics.
    pub fn stop(mut self) -> WorkerStats {
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => WorkerStats::default(),
        }
    }

    /// Signal the worker to stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for MintWorkerThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
