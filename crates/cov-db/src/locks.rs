//! Per-contract mutual exclusion.
//!
//! Every mutating lifecycle operation holds its contract's lock from the first
//! read to commit, so two operations on the same contract never interleave
//! their read-decide-write windows. Operations on different contracts do not
//! contend here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of async locks keyed by contract id.
#[derive(Debug, Default)]
pub struct ContractLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held while a unit of work runs against one contract.
pub struct ContractGuard {
    _guard: OwnedMutexGuard<()>,
}

impl ContractLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `contract_id`.
    pub async fn acquire(&self, contract_id: &str) -> ContractGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop slots nobody holds or waits on.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(contract_id.to_string()).or_default())
        };
        tracing::debug!(contract_id, "waiting for contract lock");
        ContractGuard {
            _guard: slot.lock_owned().await,
        }
    }

    /// Number of contracts with a live lock slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_contract_is_exclusive() {
        let locks = Arc::new(ContractLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("ctr-00000001").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_contracts_do_not_block() {
        let locks = ContractLocks::new();
        let _a = locks.acquire("ctr-0000000a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("ctr-0000000b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_slots_are_pruned() {
        let locks = ContractLocks::new();
        {
            let _a = locks.acquire("ctr-0000000a").await;
        }
        let _b = locks.acquire("ctr-0000000b").await;
        assert_eq!(locks.len(), 1);
    }
}
