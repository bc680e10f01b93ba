use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_BANNER_MS: i64 = 3_000;

/// Transient success message that clears itself after a fixed time.
#[derive(Debug, Clone, Default)]
pub struct SuccessBanner {
    current: Option<(String, DateTime<Utc>)>,
}

impl SuccessBanner {
    pub fn show(&mut self, text: impl Into<String>, now: DateTime<Utc>, ttl: Duration) {
        self.current = Some((text.into(), now + ttl));
    }

    pub fn visible(&self, now: DateTime<Utc>) -> Option<&str> {
        match &self.current {
            Some((text, until)) if now < *until => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.current.as_ref().map(|(_, until)| *until)
    }

    /// Clears the banner once its deadline passed. Returns true if it was cleared.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        match self.deadline() {
            Some(until) if now >= until => {
                self.current = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_clears_after_ttl() {
        let start = Utc::now();
        let mut banner = SuccessBanner::default();
        banner.show("hello", start, Duration::milliseconds(DEFAULT_BANNER_MS));
        assert_eq!(banner.visible(start), Some("hello"));
        assert!(!banner.expire(start + Duration::milliseconds(2_999)));
        assert!(banner.expire(start + Duration::milliseconds(3_000)));
        assert_eq!(banner.visible(start), None);
        assert!(!banner.expire(start + Duration::milliseconds(4_000)));
    }

    #[test]
    fn reshow_extends_deadline() {
        let start = Utc::now();
        let mut banner = SuccessBanner::default();
        banner.show("a", start, Duration::milliseconds(3_000));
        banner.show("b", start + Duration::milliseconds(2_000), Duration::milliseconds(3_000));
        assert!(!banner.expire(start + Duration::milliseconds(3_500)));
        assert_eq!(
            banner.visible(start + Duration::milliseconds(3_500)),
            Some("b")
        );
    }
}
