//! Per-order serialisation.
//!
//! Transitions on one order run one at a time; different orders never wait
//! on each other.
//!
//! ```text
//!   OrderLocks
//!   ┌──────────────────────────────────────────────┐
//!   │ std Mutex<HashMap<Uuid, Arc<tokio Mutex>>>   │  held only to look up
//!   └───────────────┬──────────────────────────────┘
//!                   ▼
//!   order 7f3a… ──► Arc<tokio::Mutex<()>> ──► load → apply → save
//! ```
//!
//! Entries are dropped again once no task holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct OrderLocks {
    inner: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

/// Held while an order is being transitioned.
#[derive(Debug)]
pub struct OrderGuard {
    _guard: OwnedMutexGuard<()>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task is transitioning `order_id`.
    pub async fn lock(&self, order_id: Uuid) -> OrderGuard {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            // Drop entries nobody references any more
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(order_id).or_default().clone()
        };

        OrderGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of orders with an active or waiting lock holder.
    pub fn active(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.values().filter(|m| Arc::strong_count(m) > 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_order_is_serialised() {
        let locks = Arc::new(OrderLocks::new());
        let id = Uuid::new_v4();

        let guard = locks.lock(id).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_orders_do_not_block() {
        let locks = OrderLocks::new();
        let _a = locks.lock(Uuid::new_v4()).await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.lock(Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = OrderLocks::new();
        drop(locks.lock(Uuid::new_v4()).await);
        assert_eq!(locks.active(), 0);
        let _g = locks.lock(Uuid::new_v4()).await;
        assert_eq!(locks.inner.lock().unwrap().len(), 1);
    }
}
