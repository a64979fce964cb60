use std::sync::Arc;
use dashmap::DashMap;
use poise::serenity_prelude::GuildId;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct RelaySlot {
    cancel: CancellationToken,
    lock: Arc<Mutex<()>>,
}

/// Permission to run a relay in one guild. Dropping it lets the next relay in.
pub struct RelayTicket {
    pub cancel: CancellationToken,
    _guard: OwnedMutexGuard<()>,
}

#[derive(Debug, Default)]
pub struct RelayManager {
    slots: DashMap<GuildId, RelaySlot>,
}

impl RelayManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels whatever relay runs in `guild_id` and waits until it has torn down.
    pub async fn acquire(&self, guild_id: GuildId) -> RelayTicket {
        let (cancel, lock) = {
            let mut slot = self.slots.entry(guild_id).or_default();
            slot.cancel.cancel();
            slot.cancel = CancellationToken::new();
            (slot.cancel.clone(), slot.lock.clone())
        };

        let guard = lock.lock_owned().await;
        tracing::debug!("Acquired relay slot for guild: {}", guild_id);

        RelayTicket { cancel, _guard: guard }
    }

    pub fn cancel_all(&self) {
        for slot in self.slots.iter() {
            slot.cancel.cancel();
        }
        tracing::info!("Cancelled {} relay slot(s)", self.slots.len());
    }

    /// Cancels every relay and waits until each one has torn down.
    pub async fn shutdown(&self) {
        let locks: Vec<_> = self.slots.iter().map(|slot| slot.lock.clone()).collect();

        self.cancel_all();

        for lock in locks {
            let _ = lock.lock().await;
        }

        tracing::info!("All relays stopped");
    }
}
