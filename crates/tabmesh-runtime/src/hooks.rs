//! Local broadcast hooks
//!
//! A string-keyed dispatch table: any name is a valid topic, no schema.
//! Hooks are async closures; firing spawns one task per hook so a slow
//! hook never delays the caller or the receive loop. The join handles are
//! what lets a receiver tell a waiting sender "my reaction has settled".

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;

/// Future returned by a hook invocation
pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A registered hook
pub type Hook = dyn Fn() -> HookFuture + Send + Sync;

/// String-keyed table of local hooks
#[derive(Default)]
pub struct HookTable {
    hooks: RwLock<HashMap<String, Vec<Arc<Hook>>>>,
}

impl HookTable {
    pub fn new() -> Self {
        HookTable::default()
    }

    /// Register a hook for a broadcast name. Multiple hooks per name all
    /// fire; registration order is not significant.
    pub fn register<F, Fut>(&self, name: &str, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: Arc<Hook> = Arc::new(move || Box::pin(hook()) as HookFuture);
        self.hooks
            .write()
            .entry(name.to_string())
            .or_default()
            .push(hook);
    }

    /// Fire every hook registered for `name`, one spawned task each.
    ///
    /// A name with no hooks returns an empty set of handles - broadcasting
    /// an unhandled name is a silent no-op.
    pub fn fire(&self, name: &str) -> Vec<JoinHandle<()>> {
        let hooks: Vec<Arc<Hook>> = match self.hooks.read().get(name) {
            Some(list) => list.clone(),
            None => return Vec::new(),
        };

        hooks
            .into_iter()
            .map(|hook| tokio::spawn(hook()))
            .collect()
    }

    /// Number of hooks registered for a name.
    pub fn count(&self, name: &str) -> usize {
        self.hooks.read().get(name).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fire_runs_every_hook() {
        let table = HookTable::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            table.register("go", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        for handle in table.fire("go") {
            handle.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unknown_name_is_noop() {
        let table = HookTable::new();
        assert!(table.fire("nobody").is_empty());
    }

    #[tokio::test]
    async fn test_hooks_are_keyed_by_name() {
        let table = HookTable::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        table.register("a", move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        for handle in table.fire("b") {
            handle.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(table.count("a"), 1);
        assert_eq!(table.count("b"), 0);
    }
}
