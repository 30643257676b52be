//! Tracked-process table.

use std::collections::BTreeMap;

use tokio::sync::oneshot;

use crate::api::ProcessInfo;

struct TrackedProcess {
    info: ProcessInfo,
    /// Signals the watcher task to kill the child. Taken on first kill.
    kill_tx: Option<oneshot::Sender<()>>,
}

/// Spawned processes keyed by id. Ids start at 1 and are never reused.
pub struct ProcessTable {
    next_id: u64,
    processes: BTreeMap<u64, TrackedProcess>,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            processes: BTreeMap::new(),
        }
    }

    /// Allocate the next id.
    pub fn reserve_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, info: ProcessInfo, kill_tx: oneshot::Sender<()>) {
        self.processes.insert(
            info.id,
            TrackedProcess {
                info,
                kill_tx: Some(kill_tx),
            },
        );
    }

    pub fn remove(&mut self, id: u64) -> Option<ProcessInfo> {
        self.processes.remove(&id).map(|p| p.info)
    }

    pub fn get(&self, id: u64) -> Option<ProcessInfo> {
        self.processes.get(&id).map(|p| p.info.clone())
    }

    /// Ask the watcher to kill `id`.
    ///
    /// `false` for unknown ids and for processes already being killed.
    pub fn kill(&mut self, id: u64) -> bool {
        self.processes
            .get_mut(&id)
            .and_then(|p| p.kill_tx.take())
            .is_some_and(|tx| tx.send(()).is_ok())
    }

    /// Signal every tracked process; returns how many were signalled.
    pub fn kill_all(&mut self) -> usize {
        self.processes
            .values_mut()
            .filter_map(|p| p.kill_tx.take())
            .filter(|tx| !tx.is_closed())
            .filter_map(|tx| tx.send(()).ok())
            .count()
    }

    pub fn list(&self) -> Vec<ProcessInfo> {
        self.processes.values().map(|p| p.info.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn info(id: u64) -> ProcessInfo {
        ProcessInfo {
            id,
            pid: Some(1000 + id as u32),
            name: format!("job-{id}"),
            created_at: Utc::now(),
            window: 1,
        }
    }

    #[test]
    fn test_ids_never_reused() {
        let mut table = ProcessTable::new();
        let a = table.reserve_id();
        let (tx, _rx) = oneshot::channel();
        table.insert(info(a), tx);
        table.remove(a);

        let b = table.reserve_id();
        assert_eq!((a, b), (1, 2));
        assert!(table.is_empty());
    }

    #[test]
    fn test_kill_signals_once() {
        let mut table = ProcessTable::new();
        let id = table.reserve_id();
        let (tx, mut rx) = oneshot::channel();
        table.insert(info(id), tx);

        assert!(table.kill(id));
        assert!(rx.try_recv().is_ok());
        assert!(!table.kill(id));
        assert!(!table.kill(99));

        // Entry stays until the watcher reports the exit
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_kill_all() {
        let mut table = ProcessTable::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let id = table.reserve_id();
            let (tx, rx) = oneshot::channel();
            table.insert(info(id), tx);
            receivers.push(rx);
        }
        drop(receivers.pop());

        assert_eq!(table.kill_all(), 2);
        assert_eq!(table.list().len(), 3);
    }
}
