use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type LockKey = (Uuid, String);

/// Serializes generation passes per `(sales channel, route)` within the process.
#[derive(Clone, Default)]
pub struct GenerationLocks {
    locks: Arc<Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>>,
}

impl GenerationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, sales_channel_id: Uuid, route_name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(l) => l,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks
                .entry((sales_channel_id, route_name.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}
