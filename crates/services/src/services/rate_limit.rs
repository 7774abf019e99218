//! Sliding-window request limits for assistant sessions.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

/// At most `max_requests` in any trailing `window`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: VecDeque::with_capacity(max_requests),
        }
    }

    /// Record a request at `now` if the window has room. Rejected requests are not recorded.
    pub fn check_at(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.hits.front() {
            if now.duration_since(oldest) >= self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
        if self.hits.len() >= self.max_requests {
            return false;
        }
        self.hits.push_back(now);
        true
    }

    pub fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    pub fn remaining(&self) -> usize {
        self.max_requests.saturating_sub(self.hits.len())
    }
}

/// One limiter per user session, created on first use and dropped on logout.
#[derive(Debug)]
pub struct ChatSessions {
    max_requests: usize,
    window: Duration,
    sessions: DashMap<Uuid, RateLimiter>,
}

impl ChatSessions {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            sessions: DashMap::new(),
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Returns `true` when `user_id` may send another message now.
    pub fn check(&self, user_id: Uuid) -> bool {
        let allowed = self
            .sessions
            .entry(user_id)
            .or_insert_with(|| RateLimiter::new(self.max_requests, self.window))
            .check();
        if !allowed {
            debug!(user_id = %user_id, "Chat session rate limited");
        }
        allowed
    }

    /// Discard the user's session. Returns whether one existed.
    pub fn end(&self, user_id: Uuid) -> bool {
        self.sessions.remove(&user_id).is_some()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
