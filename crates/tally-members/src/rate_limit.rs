//! Per-inviter throttle on invite creation.
//!
//! Abuse dampening only: the in-memory limiter resets on restart and is not shared
//! between processes.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tally_storage::UserId;

/// Decides whether an inviter may send another invite.
#[async_trait]
pub trait InviteRateLimiter: Send + Sync {
    /// Records an attempt; returns `false` when the inviter is over the limit.
    async fn try_acquire(&self, inviter: &UserId) -> bool;
}

#[derive(Clone, Copy, Debug)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window counter per inviter. Windows that have reset are swept at most once
/// per window length.
pub struct MemoryRateLimiter {
    max_attempts: u32,
    window: Duration,
    windows: DashMap<UserId, Window>,
    next_prune: Mutex<Instant>,
}

impl MemoryRateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            windows: DashMap::new(),
            next_prune: Mutex::new(Instant::now() + window),
        }
    }

    /// Same as [`InviteRateLimiter::try_acquire`] with an explicit clock.
    pub fn try_acquire_at(&self, inviter: &UserId, now: Instant) -> bool {
        let allowed = self.record(inviter, now);
        self.maybe_prune(now);
        allowed
    }

    fn record(&self, inviter: &UserId, now: Instant) -> bool {
        // The entry guard holds the shard lock, so check and increment are one step.
        let mut entry = self.windows.entry(inviter.clone()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if entry.count == 0 || now > entry.reset_at {
            *entry = Window {
                count: 1,
                reset_at: now + self.window,
            };
            return true;
        }

        if entry.count >= self.max_attempts {
            return false;
        }
        entry.count += 1;
        true
    }

    fn maybe_prune(&self, now: Instant) {
        // Another caller is already sweeping.
        let Ok(mut next) = self.next_prune.try_lock() else {
            return;
        };
        if now < *next {
            return;
        }
        *next = now + self.window;
        drop(next);
        self.prune(now);
    }

    /// Drop windows that have already reset.
    fn prune(&self, now: Instant) {
        self.windows.retain(|_, w| now <= w.reset_at);
    }
}

#[async_trait]
impl InviteRateLimiter for MemoryRateLimiter {
    async fn try_acquire(&self, inviter: &UserId) -> bool {
        let allowed = self.try_acquire_at(inviter, Instant::now());
        if !allowed {
            tracing::warn!(user_id = %inviter.0, "Invite rate limit exceeded");
        }
        allowed
    }
}

/// Never throttles. For tools that act on behalf of the operator.
pub struct NoopRateLimiter;

#[async_trait]
impl InviteRateLimiter for NoopRateLimiter {
    async fn try_acquire(&self, _inviter: &UserId) -> bool {
        true
    }
}
