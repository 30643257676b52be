//! Window table: ids, state and the per-window event queue.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::api::{Bounds, WindowInfo};
use crate::protocol::{WindowEvent, WindowId};

/// Mutable per-window state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowState {
    pub minimized: bool,
    pub maximized: bool,
    pub focused: bool,
    pub bounds: Bounds,
}

struct WindowEntry {
    name: String,
    created_at: DateTime<Utc>,
    state: WindowState,
    destroyed: bool,
    events: mpsc::UnboundedSender<WindowEvent>,
}

impl WindowEntry {
    fn info(&self, id: WindowId) -> WindowInfo {
        WindowInfo {
            id,
            name: self.name.clone(),
            created_at: self.created_at,
            minimized: self.state.minimized,
            maximized: self.state.maximized,
            focused: self.state.focused,
            destroyed: self.destroyed,
            bounds: self.state.bounds,
        }
    }

    /// Live means not destroyed and the window side still listening.
    fn is_live(&self) -> bool {
        !self.destroyed && !self.events.is_closed()
    }
}

/// Windows keyed by id. Ids start at 1 and are never reused.
pub struct WindowTable {
    next_id: WindowId,
    windows: BTreeMap<WindowId, WindowEntry>,
}

impl Default for WindowTable {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowTable {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            windows: BTreeMap::new(),
        }
    }

    /// Register a window; the new window takes focus.
    pub fn open(
        &mut self,
        name: &str,
        bounds: Bounds,
        events: mpsc::UnboundedSender<WindowEvent>,
    ) -> WindowId {
        let id = self.next_id;
        self.next_id += 1;

        for entry in self.windows.values_mut() {
            entry.state.focused = false;
        }
        self.windows.insert(
            id,
            WindowEntry {
                name: name.to_string(),
                created_at: Utc::now(),
                state: WindowState {
                    focused: true,
                    bounds,
                    ..WindowState::default()
                },
                destroyed: false,
                events,
            },
        );
        id
    }

    /// Remove a window. Dropping its sender ends the window's event pump.
    pub fn close(&mut self, id: WindowId) -> bool {
        self.windows.remove(&id).is_some()
    }

    /// Flag a window as torn down while it is still in the table.
    pub fn mark_destroyed(&mut self, id: WindowId) -> bool {
        match self.windows.get_mut(&id) {
            Some(entry) => {
                entry.destroyed = true;
                entry.state.focused = false;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: WindowId) -> Option<WindowInfo> {
        self.windows.get(&id).map(|entry| entry.info(id))
    }

    pub fn ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Mutate a live window's state; `None` for unknown or destroyed ids.
    pub fn update<F>(&mut self, id: WindowId, f: F) -> Option<WindowInfo>
    where
        F: FnOnce(&mut WindowState),
    {
        let entry = self.windows.get_mut(&id).filter(|e| !e.destroyed)?;
        f(&mut entry.state);
        Some(entry.info(id))
    }

    /// Give `id` focus and take it from every other window.
    pub fn focus(&mut self, id: WindowId) -> Option<WindowInfo> {
        if !self.windows.get(&id).is_some_and(|e| !e.destroyed) {
            return None;
        }
        for (other, entry) in self.windows.iter_mut() {
            entry.state.focused = *other == id;
            if *other == id {
                entry.state.minimized = false;
            }
        }
        self.get(id)
    }

    /// Queue `event` for one window. `false` if the window is not live.
    pub fn send_to(&self, id: WindowId, event: WindowEvent) -> bool {
        match self.windows.get(&id) {
            Some(entry) if entry.is_live() => entry.events.send(event).is_ok(),
            _ => false,
        }
    }

    /// Queue `event` for every live window; returns the delivered count.
    ///
    /// A window that stops listening between the liveness check and the
    /// send is skipped like a destroyed one.
    pub fn broadcast(&self, event: &WindowEvent) -> usize {
        let mut delivered = 0;
        for (id, entry) in &self.windows {
            if !entry.is_live() {
                tracing::trace!(window = id, channel = %event.channel, "skipping dead window");
                continue;
            }
            if entry.events.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(window = id, channel = %event.channel, "window closed mid-broadcast");
            }
        }
        delivered
    }

    /// Drop every window.
    pub fn clear(&mut self) {
        self.windows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn open(table: &mut WindowTable, name: &str) -> (WindowId, mpsc::UnboundedReceiver<WindowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (table.open(name, Bounds::default(), tx), rx)
    }

    #[test]
    fn test_ids_are_sequential_and_not_reused() {
        let mut table = WindowTable::new();
        let (a, _ra) = open(&mut table, "main");
        let (b, _rb) = open(&mut table, "settings");
        assert_eq!((a, b), (1, 2));

        assert!(table.close(b));
        let (c, _rc) = open(&mut table, "about");
        assert_eq!(c, 3);
        assert_eq!(table.ids(), vec![1, 3]);
    }

    #[test]
    fn test_new_window_takes_focus() {
        let mut table = WindowTable::new();
        let (a, _ra) = open(&mut table, "main");
        let (b, _rb) = open(&mut table, "settings");
        assert!(!table.get(a).unwrap().focused);
        assert!(table.get(b).unwrap().focused);

        table.focus(a).unwrap();
        assert!(table.get(a).unwrap().focused);
        assert!(!table.get(b).unwrap().focused);
    }

    #[test]
    fn test_broadcast_skips_destroyed_and_closed() {
        let mut table = WindowTable::new();
        let (_a, mut ra) = open(&mut table, "a");
        let (b, _rb) = open(&mut table, "b");
        let (_c, rc) = open(&mut table, "c");

        table.mark_destroyed(b);
        drop(rc); // window side gone without the host noticing yet

        let delivered = table.broadcast(&WindowEvent::new("theme:changed", Bytes::new()));
        assert_eq!(delivered, 1);
        assert_eq!(ra.try_recv().unwrap().channel, "theme:changed");
    }

    #[test]
    fn test_update_rejects_destroyed() {
        let mut table = WindowTable::new();
        let (a, _ra) = open(&mut table, "a");
        let info = table.update(a, |s| s.minimized = true).unwrap();
        assert!(info.minimized);

        table.mark_destroyed(a);
        assert!(table.update(a, |s| s.minimized = false).is_none());
        assert!(table.focus(a).is_none());
        assert!(table.get(a).unwrap().destroyed);
    }
}
