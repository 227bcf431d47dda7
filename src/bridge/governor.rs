//! Session admission control.
//!
//! One [`Governor`] is shared by every session task. It keeps two counters:
//! `active` (sessions currently in the menu or forwarding) and `total`
//! (lifetime attempts, admitted or refused). Counter updates are lock-free
//! atomics, so admission never contends with session I/O.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide session counters and the concurrency ceiling.
#[derive(Debug)]
pub struct Governor {
    active: AtomicU32,
    total: AtomicU64,
    max_active: u32,
}

impl Governor {
    pub fn new(max_active: u32) -> Arc<Self> {
        Arc::new(Self {
            active: AtomicU32::new(0),
            total: AtomicU64::new(0),
            max_active,
        })
    }

    /// Try to admit one session.
    ///
    /// Every call counts toward `total`, refusals included. On admission the
    /// returned [`Permit`] holds the slot; dropping it releases the slot, so
    /// release happens exactly once on every exit path, panics included.
    pub fn try_admit(self: &Arc<Self>) -> Option<Permit> {
        self.total.fetch_add(1, Ordering::Relaxed);
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.max_active {
                return None;
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(Permit {
                        governor: Arc::clone(self),
                    })
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Sessions currently admitted.
    pub fn active(&self) -> u32 {
        self.active.load(Ordering::Acquire)
    }

    /// Lifetime admission attempts (admitted + refused).
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// The configured ceiling.
    pub fn max_active(&self) -> u32 {
        self.max_active
    }
}

/// An admitted session's slot. Releases on drop.
#[derive(Debug)]
pub struct Permit {
    governor: Arc<Governor>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.governor.active.fetch_sub(1, Ordering::AcqRel);
    }
}
