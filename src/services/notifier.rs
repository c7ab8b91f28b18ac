use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Notice;

/// How long a notice stays visible unless replaced or dismissed.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

#[derive(Default)]
struct Slot {
    current: Option<Notice>,
    /// Bumped on every set/dismiss so a clear task that already woke up
    /// cannot wipe a newer notice.
    seq: u64,
    timer: Option<JoinHandle<()>>,
}

impl Slot {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Single-slot error banner with a cancellable auto-clear task.
///
/// Must be used from within a tokio runtime, since each notice schedules its
/// own clear task.
#[derive(Clone)]
pub struct Notifier {
    slot: Arc<Mutex<Slot>>,
    ttl: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_ttl(NOTICE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> Option<Notice> {
        self.lock().current
    }

    /// Shows `notice`, replacing whatever was visible and restarting the clock.
    pub fn notify(&self, notice: Notice) {
        let mut slot = self.lock();
        slot.cancel_timer();
        slot.seq += 1;
        slot.current = Some(notice);

        let seq = slot.seq;
        let ttl = self.ttl;
        let weak = Arc::downgrade(&self.slot);
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            expire(weak, seq);
        }));
        debug!("notice shown: {}", notice);
    }

    pub fn dismiss(&self) {
        let mut slot = self.lock();
        slot.cancel_timer();
        slot.seq += 1;
        slot.current = None;
    }
}

fn expire(slot: Weak<Mutex<Slot>>, seq: u64) {
    let Some(slot) = slot.upgrade() else {
        return;
    };
    let mut slot = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if slot.seq == seq {
        slot.current = None;
        // this task is the timer; dropping the handle detaches it
        slot.timer = None;
    }
}
