use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use frames_types::attendance::SubjectId;

pub const DEFAULT_COOLDOWN_MS: i64 = 10_000;

/// Last accepted recognition per subject.
///
/// `should_accept` and `record_accepted` are only meaningful as a pair taken
/// under one `&mut` borrow; see [`crate::AttendanceDesk::on_recognized`].
#[derive(Debug, Clone)]
pub struct CooldownLedger {
    window: Duration,
    last_accepted: HashMap<SubjectId, DateTime<Utc>>,
}

impl Default for CooldownLedger {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_COOLDOWN_MS))
    }
}

impl CooldownLedger {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    pub fn should_accept(&self, subject: &SubjectId, now: DateTime<Utc>) -> bool {
        match self.last_accepted.get(subject) {
            None => true,
            Some(last) => now.signed_duration_since(*last) >= self.window,
        }
    }

    /// Last write wins, even if `now` is older than the stored timestamp.
    pub fn record_accepted(&mut self, subject: SubjectId, now: DateTime<Utc>) {
        self.last_accepted.insert(subject, now);
    }

    /// Time left before `subject` may be accepted again.
    pub fn remaining(&self, subject: &SubjectId, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_accepted.get(subject)?;
        let left = self.window - now.signed_duration_since(*last);
        (left > Duration::zero()).then_some(left)
    }

    pub fn last_accepted(&self, subject: &SubjectId) -> Option<DateTime<Utc>> {
        self.last_accepted.get(subject).copied()
    }

    /// Drop entries older than `retention`; returns how many were evicted.
    pub fn prune(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let before = self.last_accepted.len();
        self.last_accepted
            .retain(|_, last| now.signed_duration_since(*last) < retention);
        before - self.last_accepted.len()
    }

    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }
}
