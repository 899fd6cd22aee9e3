use model::core::identifiers::BatchId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-batch advisory locks. Two operator actions on the same batch are
/// serialized; independent batches proceed in parallel. Entries live for the
/// process lifetime, which is bounded by the number of batches touched.
#[derive(Default)]
pub struct BatchLocks {
    inner: Mutex<HashMap<BatchId, Arc<Mutex<()>>>>,
}

impl BatchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, batch_id: &BatchId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(batch_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_batch_is_serialized() {
        let locks = Arc::new(BatchLocks::new());
        let id = BatchId::new("b1");
        let counter = Arc::new(Mutex::new(0u32));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let id = id.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&id).await;
                let mut count = counter.lock().await;
                *count += 1;
                // Holding the batch lock across the await keeps others out.
                tokio::time::sleep(Duration::from_millis(5)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*counter.lock().await, 4);
    }

    #[tokio::test]
    async fn different_batches_do_not_block_each_other() {
        let locks = BatchLocks::new();
        let _a = locks.acquire(&BatchId::new("a")).await;
        // Would deadlock if locks were global.
        let _b = locks.acquire(&BatchId::new("b")).await;
    }
}
