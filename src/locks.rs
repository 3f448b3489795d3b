//! Per-path async locks.
//!
//! Writes to one file are totally ordered by taking its lock; distinct
//! paths proceed independently. Lock objects are created on first use and
//! shared through `Arc` so holders survive map churn.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
pub struct PathLocks {
    map: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for one path.
    pub fn get(&self, path: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.map.lock().expect("path lock map poisoned");
        map.entry(path.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Lock handles for every listed path, in sorted order so multi-path
    /// holders always acquire in the same sequence.
    pub fn get_all(&self, paths: &[String]) -> Vec<Arc<AsyncMutex<()>>> {
        let mut sorted: Vec<&String> = paths.iter().collect();
        sorted.sort();
        sorted.dedup();
        sorted.into_iter().map(|p| self.get(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_path_serializes() {
        let locks = Arc::new(PathLocks::new());
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let lock = locks.get("projects/p1.md");
                let _guard = lock.lock().await;
                let seen = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                tokio::task::yield_now().await;
                // Nobody else entered the critical section meanwhile.
                assert_eq!(
                    counter.load(std::sync::atomic::Ordering::SeqCst),
                    seen + 1
                );
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[test]
    fn get_all_sorts_and_dedups() {
        let locks = PathLocks::new();
        let paths = vec![
            "b.md".to_string(),
            "a.md".to_string(),
            "b.md".to_string(),
        ];
        assert_eq!(locks.get_all(&paths).len(), 2);
    }
}
