/// Per-container viewer registry
///
/// Mounting twice into the same container must not build a second viewer, so
/// every front end keeps its viewers here keyed by container id.
use std::collections::HashMap;

use log::debug;

/// Result of asking the registry to initialize a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    Initialized,
    /// The container already had a viewer; the initializer was not run.
    AlreadyInitialized,
}

#[derive(Debug)]
pub struct Registry<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the value built by `init` unless `id` is already taken.
    pub fn init_with(&mut self, id: &str, init: impl FnOnce() -> T) -> InitStatus {
        if self.entries.contains_key(id) {
            debug!("container '{id}' already initialized");
            return InitStatus::AlreadyInitialized;
        }
        self.entries.insert(id.to_string(), init());
        debug!("container '{id}' initialized");
        InitStatus::Initialized
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.entries.get_mut(id)
    }

    /// Run `f` on the entry for `id`, if any.
    pub fn with_mut<R>(&mut self, id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.entries.get_mut(id).map(f)
    }

    /// Replace the value stored for an already-registered id.
    pub fn replace(&mut self, id: &str, value: T) -> Option<T> {
        self.entries.get_mut(id).map(|slot| std::mem::replace(slot, value))
    }

    /// Remove and return the viewer for `id`. A later mount starts fresh.
    pub fn teardown(&mut self, id: &str) -> Option<T> {
        let removed = self.entries.remove(id);
        if removed.is_some() {
            debug!("container '{id}' torn down");
        }
        removed
    }

    /// Remove the entry for `id` only if `claim` accepts it; otherwise
    /// leave it in place. Used to claim a record that may have been replaced
    /// while the caller was away.
    pub fn take_if(&mut self, id: &str, claim: impl FnOnce(&T) -> bool) -> Option<T> {
        if !claim(self.entries.get(id)?) {
            debug!("container '{id}' changed hands; leaving it alone");
            return None;
        }
        self.teardown(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        let mut registry = Registry::new();
        assert_eq!(registry.init_with("viewer", || 1), InitStatus::Initialized);

        let mut ran = false;
        let status = registry.init_with("viewer", || {
            ran = true;
            2
        });
        assert_eq!(status, InitStatus::AlreadyInitialized);
        assert!(!ran);
        assert_eq!(registry.get("viewer"), Some(&1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_containers_are_independent() {
        let mut registry = Registry::new();
        registry.init_with("a", || 1);
        registry.init_with("b", || 10);
        registry.with_mut("a", |v| *v += 1);
        assert_eq!(registry.get("a"), Some(&2));
        assert_eq!(registry.get("b"), Some(&10));

        assert_eq!(registry.replace("b", 11), Some(10));
        assert_eq!(registry.replace("c", 0), None);
        assert!(!registry.contains("c"));
    }

    #[test]
    fn test_teardown_allows_remount() {
        let mut registry = Registry::new();
        registry.init_with("a", || "first");
        assert_eq!(registry.teardown("a"), Some("first"));
        assert!(registry.is_empty());
        assert_eq!(registry.init_with("a", || "second"), InitStatus::Initialized);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["a"]);
    }

    #[derive(Debug, PartialEq)]
    enum Slot {
        Loading(u64),
        Ready(u64),
    }

    #[test]
    fn test_take_if_ignores_a_newer_mount() {
        let mut registry = Registry::new();
        registry.init_with("a", || Slot::Loading(1));
        registry.teardown("a");
        registry.init_with("a", || Slot::Loading(2));

        // The first mount's load finishes late and must not claim the second's record.
        assert_eq!(registry.take_if("a", |s| *s == Slot::Loading(1)), None);
        assert_eq!(registry.get("a"), Some(&Slot::Loading(2)));

        assert_eq!(registry.take_if("a", |s| *s == Slot::Loading(2)), Some(Slot::Loading(2)));
        registry.init_with("a", || Slot::Ready(2));
        assert_eq!(registry.take_if("a", |s| matches!(s, Slot::Loading(_))), None);
        assert_eq!(registry.get("a"), Some(&Slot::Ready(2)));
        assert_eq!(registry.take_if("missing", |_| true), None);
    }
}
