use std::collections::VecDeque;

use frames_types::attendance::RecordedEvent;

/// Newest-first list of accepted recognitions.
#[derive(Debug, Clone, Default)]
pub struct RecordLog {
    entries: VecDeque<RecordedEvent>,
    capacity: usize,
    total: u64,
}

impl RecordLog {
    /// `capacity == 0` keeps every entry.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            total: 0,
        }
    }

    pub fn push(&mut self, event: RecordedEvent) {
        self.entries.push_front(event);
        self.total += 1;
        if self.capacity > 0 {
            self.entries.truncate(self.capacity);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordedEvent> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&RecordedEvent> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_recorded(&self) -> u64 {
        self.total
    }

    pub fn to_vec(&self) -> Vec<RecordedEvent> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use frames_types::attendance::{RecognitionResult, RecordedEvent};

    fn event(name: &str) -> RecordedEvent {
        RecordedEvent::from_result(&RecognitionResult::new(name, name), Utc::now())
    }

    #[test]
    fn newest_first_and_capped() {
        let mut log = RecordLog::new(2);
        log.push(event("a"));
        log.push(event("b"));
        log.push(event("c"));
        let names: Vec<_> = log.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);
        assert_eq!(log.total_recorded(), 3);
    }

    #[test]
    fn zero_capacity_is_unbounded() {
        let mut log = RecordLog::new(0);
        for i in 0..500 {
            log.push(event(&i.to_string()));
        }
        assert_eq!(log.len(), 500);
        assert_eq!(log.latest().map(|e| e.display_name.as_str()), Some("499"));
    }
}
