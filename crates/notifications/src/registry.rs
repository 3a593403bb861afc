//! Priority-ordered, copy-on-write handler registry.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::handler::{EventHandler, ExecutionMode};

/// A registered handler together with the ordering data captured at
/// registration time.
#[derive(Clone)]
pub struct Registration {
    handler: Arc<dyn EventHandler>,
    name: String,
    priority: i32,
    mode: ExecutionMode,
}

impl Registration {
    fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            name: handler.name().to_string(),
            priority: handler.priority(),
            mode: handler.mode(),
            handler,
        }
    }

    pub fn handler(&self) -> &Arc<dyn EventHandler> {
        &self.handler
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Returns true if this registration wraps exactly `handler` (same allocation).
    pub fn is(&self, handler: &Arc<dyn EventHandler>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.handler), Arc::as_ptr(handler))
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Point-in-time view of the registry, ordered by ascending priority.
pub type Snapshot = Arc<[Registration]>;

/// Thread-safe set of handlers kept sorted by priority.
///
/// Writers replace the whole list; readers only clone an `Arc` to it, so a
/// snapshot taken by an in-flight dispatch never observes later changes.
/// Ties on priority keep registration order.
pub struct HandlerRegistry {
    handlers: RwLock<Snapshot>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Adds a handler. Returns false if the same instance is already registered.
    pub fn register(&self, handler: Arc<dyn EventHandler>) -> bool {
        let registration = Registration::new(handler);
        let mut handlers = self.write();

        if handlers.iter().any(|r| r.is(&registration.handler)) {
            tracing::debug!(handler = %registration.name, "handler already registered");
            return false;
        }

        tracing::debug!(
            handler = %registration.name,
            priority = registration.priority,
            mode = %registration.mode,
            "handler registered"
        );

        let mut next = handlers.to_vec();
        next.push(registration);
        // stable: equal priorities stay in registration order
        next.sort_by_key(Registration::priority);
        *handlers = Arc::from(next);
        true
    }

    /// Removes a handler by identity. Returns whether it was registered.
    pub fn unregister(&self, handler: &Arc<dyn EventHandler>) -> bool {
        let (removed, previous) = {
            let mut handlers = self.write();
            let Some(index) = handlers.iter().position(|r| r.is(handler)) else {
                return false;
            };

            let mut next = handlers.to_vec();
            let removed = next.remove(index);
            let previous = std::mem::replace(&mut *handlers, Arc::from(next));
            (removed, previous)
        };

        tracing::debug!(handler = %removed.name, "handler unregistered");
        // handler drops run outside the lock
        drop(previous);
        drop(removed);
        true
    }

    /// Returns the current handlers in dispatch order.
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.read())
    }

    /// Removes every handler.
    pub fn clear(&self) {
        let previous = std::mem::replace(&mut *self.write(), Arc::from(Vec::new()));
        drop(previous);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn count_by_mode(&self, mode: ExecutionMode) -> usize {
        self.read().iter().filter(|r| r.mode == mode).count()
    }

    // No handler code runs while the lock is held, and every write swaps in a
    // complete list, so a poisoned lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::event::{EventEnvelope, EventKind};
    use async_trait::async_trait;
    use std::panic::AssertUnwindSafe;

    struct Fixed {
        name: &'static str,
        priority: i32,
        mode: ExecutionMode,
    }

    #[async_trait]
    impl EventHandler for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn is_interested_in(&self, _kind: EventKind) -> bool {
            true
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn mode(&self) -> ExecutionMode {
            self.mode
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<()> {
            Ok(())
        }
    }

    fn handler(name: &'static str, priority: i32, mode: ExecutionMode) -> Arc<dyn EventHandler> {
        Arc::new(Fixed {
            name,
            priority,
            mode,
        })
    }

    fn names(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.iter().map(Registration::name).collect()
    }

    struct PanicsOnDrop;

    impl Drop for PanicsOnDrop {
        fn drop(&mut self) {
            panic!("drop exploded");
        }
    }

    #[async_trait]
    impl EventHandler for PanicsOnDrop {
        fn name(&self) -> &str {
            "panics-on-drop"
        }

        fn is_interested_in(&self, _kind: EventKind) -> bool {
            true
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn handler_drop_runs_outside_the_lock() {
        let registry = HandlerRegistry::new();
        registry.register(Arc::new(PanicsOnDrop));
        registry.register(handler("kept", 1, ExecutionMode::Inline));

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| registry.clear()));

        assert!(result.is_err());
        assert!(!registry.handlers.is_poisoned());
        assert!(registry.is_empty());
        assert!(registry.register(handler("after", 1, ExecutionMode::Inline)));
    }

    #[test]
    fn register_sorts_by_priority() {
        let registry = HandlerRegistry::new();
        registry.register(handler("late", 50, ExecutionMode::Inline));
        registry.register(handler("early", 1, ExecutionMode::Inline));
        registry.register(handler("middle", 10, ExecutionMode::Deferred));

        assert_eq!(names(&registry.snapshot()), vec!["early", "middle", "late"]);
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let registry = HandlerRegistry::new();
        registry.register(handler("first", 5, ExecutionMode::Inline));
        registry.register(handler("second", 5, ExecutionMode::Inline));
        registry.register(handler("zero", 0, ExecutionMode::Inline));
        registry.register(handler("third", 5, ExecutionMode::Inline));

        assert_eq!(
            names(&registry.snapshot()),
            vec!["zero", "first", "second", "third"]
        );
    }

    #[test]
    fn register_same_instance_twice_is_a_noop() {
        let registry = HandlerRegistry::new();
        let h = handler("once", 1, ExecutionMode::Inline);

        assert!(registry.register(Arc::clone(&h)));
        assert!(!registry.register(Arc::clone(&h)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_instances_with_same_name_are_both_registered() {
        let registry = HandlerRegistry::new();
        assert!(registry.register(handler("twin", 1, ExecutionMode::Inline)));
        assert!(registry.register(handler("twin", 1, ExecutionMode::Inline)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unregister_by_identity() {
        let registry = HandlerRegistry::new();
        let a = handler("a", 1, ExecutionMode::Inline);
        let b = handler("b", 2, ExecutionMode::Inline);
        registry.register(Arc::clone(&a));
        registry.register(Arc::clone(&b));

        assert!(registry.unregister(&a));
        assert!(!registry.unregister(&a));
        assert_eq!(names(&registry.snapshot()), vec!["b"]);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_changes() {
        let registry = HandlerRegistry::new();
        let a = handler("a", 1, ExecutionMode::Inline);
        registry.register(Arc::clone(&a));

        let before = registry.snapshot();
        registry.register(handler("b", 0, ExecutionMode::Inline));
        registry.unregister(&a);

        assert_eq!(names(&before), vec!["a"]);
        assert_eq!(names(&registry.snapshot()), vec!["b"]);
    }

    #[test]
    fn clear_and_counts() {
        let registry = HandlerRegistry::new();
        registry.register(handler("i1", 1, ExecutionMode::Inline));
        registry.register(handler("i2", 2, ExecutionMode::Inline));
        registry.register(handler("d1", 3, ExecutionMode::Deferred));

        assert_eq!(registry.count_by_mode(ExecutionMode::Inline), 2);
        assert_eq!(registry.count_by_mode(ExecutionMode::Deferred), 1);

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.count_by_mode(ExecutionMode::Inline), 0);
    }

    #[test]
    fn concurrent_registration_keeps_every_handler() {
        let registry = Arc::new(HandlerRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        registry.register(handler("worker", (i * 25 + j) % 7, ExecutionMode::Inline));
                        let _ = registry.snapshot();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 200);
        assert!(snapshot.windows(2).all(|w| w[0].priority() <= w[1].priority()));
    }
}
