use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// In-process advisory locks keyed by string.
///
/// Entries are held weakly, so a key costs memory only while someone holds or awaits its lock.
#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    /// Empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`; released when the guard drops.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            slots.retain(|_, weak| weak.strong_count() > 0);
            match slots.get(key).and_then(Weak::upgrade) {
                Some(slot) => slot,
                None => {
                    let slot = Arc::new(AsyncMutex::new(()));
                    slots.insert(key.to_string(), Arc::downgrade(&slot));
                    slot
                }
            }
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn live_keys(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock("notice-1").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("notice-1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("acquired after release")
            .expect("task");
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block_and_are_released() {
        let locks = KeyedLocks::new();
        let first = locks.lock("a").await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.lock("b"))
            .await
            .expect("independent key");
        assert_eq!(locks.live_keys(), 2);
        drop(first);
        drop(second);
        assert_eq!(locks.live_keys(), 0);
    }
}
