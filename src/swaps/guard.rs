/// Keyed guards serializing swap attempts per (owner, mint)
///
/// An attempt holds the guards for every mint it touches from account
/// resolution until its terminal outcome. A second attempt on the same
/// wallet and mint waits instead of racing to create the same accounts.
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type SlotKey = (Pubkey, Pubkey);

#[derive(Default)]
pub struct AttemptGuards {
    slots: Arc<Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>>,
}

impl AttemptGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until every (owner, mint) slot is free and take them all
    pub async fn acquire(&self, owner: &Pubkey, mints: &[Pubkey]) -> AttemptSlotGuard {
        let mut keys: Vec<SlotKey> = mints.iter().map(|mint| (*owner, *mint)).collect();
        // fixed order so two attempts never wait on each other crosswise
        keys.sort();
        keys.dedup();

        let mut held = Vec::with_capacity(keys.len());
        for key in &keys {
            let lock = self
                .slots
                .lock()
                .entry(*key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone();
            held.push(lock.lock_owned().await);
        }

        AttemptSlotGuard {
            slots: self.slots.clone(),
            keys,
            held,
        }
    }

    /// Whether some attempt currently holds the slot
    pub fn is_busy(&self, owner: &Pubkey, mint: &Pubkey) -> bool {
        self.slots
            .lock()
            .get(&(*owner, *mint))
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }
}

/// RAII guard releasing the slots of one attempt
pub struct AttemptSlotGuard {
    slots: Arc<Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>>,
    keys: Vec<SlotKey>,
    held: Vec<OwnedMutexGuard<()>>,
}

impl Drop for AttemptSlotGuard {
    fn drop(&mut self) {
        self.held.clear();
        let mut slots = self.slots.lock();
        for key in &self.keys {
            // drop the entry unless another attempt is waiting on it
            let idle = slots
                .get(key)
                .map(|lock| Arc::strong_count(lock) == 1)
                .unwrap_or(false);
            if idle {
                slots.remove(key);
            }
        }
    }
}
