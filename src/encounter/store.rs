//! Shared encounter state: the single record, the spawn lock, the session
//! token, and the last-action clock.
//!
//! All critical sections are short read-modify-writes, so no lock is ever
//! held across an await point or a narrative delay.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use super::boss::BossEncounter;

// ============================================================================
// EncounterStore
// ============================================================================

/// Owner of the single mutable [`BossEncounter`] record.
///
/// The session token is a generation counter: every spawn bumps it, and a
/// background monitor holding a stale token must stop at its next poll.
pub struct EncounterStore {
    /// The live (or absent) encounter record.
    record: Mutex<Option<BossEncounter>>,
    /// Spawn lock: acquisition succeeds only when the held-until instant
    /// is absent or past.
    lock_held_until: Mutex<Option<Instant>>,
    /// Monotonically increasing spawn generation.
    session: AtomicU64,
    /// Instant of the last accepted participant action.
    last_action: Mutex<Instant>,
}

impl EncounterStore {
    /// Creates an empty store with no live encounter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            record: Mutex::new(None),
            lock_held_until: Mutex::new(None),
            session: AtomicU64::new(0),
            last_action: Mutex::new(Instant::now()),
        }
    }

    // ------------------------------------------------------------------
    // Spawn lock
    // ------------------------------------------------------------------

    /// Attempts a check-and-set acquisition of the spawn lock.
    ///
    /// Succeeds only when no unexpired acquisition exists; on success the
    /// lock is held for `ttl` and released early when the returned guard
    /// drops, so every exit path (including panics) releases it.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn try_acquire_spawn_lock(&self, ttl: Duration) -> Option<SpawnGuard<'_>> {
        let now = Instant::now();
        let mut held = self
            .lock_held_until
            .lock()
            .expect("spawn lock mutex poisoned");
        if held.is_some_and(|until| until > now) {
            return None;
        }
        *held = Some(now + ttl);
        Some(SpawnGuard { store: self })
    }

    fn release_spawn_lock(&self) {
        let mut held = self
            .lock_held_until
            .lock()
            .expect("spawn lock mutex poisoned");
        *held = None;
    }

    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    /// Installs a freshly spawned encounter, bumps the session token, and
    /// resets the last-action clock. Returns the new token.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn install(&self, boss: BossEncounter) -> u64 {
        {
            let mut record = self.record.lock().expect("record mutex poisoned");
            *record = Some(boss);
        }
        self.touch();
        self.session.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Clones the current record, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Option<BossEncounter> {
        self.record.lock().expect("record mutex poisoned").clone()
    }

    /// Runs a read-modify-write against the record under the lock.
    ///
    /// Returns `None` when no encounter exists. The closure must not block;
    /// the lock is released as soon as it returns.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn update<T>(&self, f: impl FnOnce(&mut BossEncounter) -> T) -> Option<T> {
        let mut record = self.record.lock().expect("record mutex poisoned");
        record.as_mut().map(f)
    }

    /// Clears the record if it matches `id`, returning the removed
    /// encounter. A mismatched or absent record is left untouched, which
    /// makes concurrent despawn/victory paths idempotent.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn clear_if(&self, id: Uuid) -> Option<BossEncounter> {
        let mut record = self.record.lock().expect("record mutex poisoned");
        if record.as_ref().is_some_and(|b| b.id == id) {
            record.take()
        } else {
            None
        }
    }

    /// Whether any encounter record exists (live, transitioning, or about
    /// to be cleared).
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.snapshot().is_some()
    }

    // ------------------------------------------------------------------
    // Session token
    // ------------------------------------------------------------------

    /// The current session token.
    #[must_use]
    pub fn session(&self) -> u64 {
        self.session.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Last-action clock
    // ------------------------------------------------------------------

    /// Records a participant action now.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn touch(&self) {
        let mut last = self.last_action.lock().expect("last action mutex poisoned");
        *last = Instant::now();
    }

    /// Time since the last recorded participant action.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        let last = self.last_action.lock().expect("last action mutex poisoned");
        last.elapsed()
    }
}

impl Default for EncounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EncounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncounterStore")
            .field("occupied", &self.is_occupied())
            .field("session", &self.session())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SpawnGuard
// ============================================================================

/// Scoped spawn-lock acquisition; releases on drop.
#[must_use = "dropping the guard releases the spawn lock"]
pub struct SpawnGuard<'a> {
    store: &'a EncounterStore,
}

impl Drop for SpawnGuard<'_> {
    fn drop(&mut self) {
        self.store.release_spawn_lock();
    }
}
