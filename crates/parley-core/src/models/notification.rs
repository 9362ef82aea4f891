use std::time::SystemTime;

/// Severity of a transient notification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// Short-lived user-facing notice (the toast of the web client)
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: SystemTime,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: SystemTime::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }
}

/// FIFO queue of notifications, bounded like the error log it replaces
pub struct NotificationQueue {
    entries: Vec<Notification>,
    max_entries: usize,
}

impl NotificationQueue {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    pub fn push(&mut self, notification: Notification) {
        self.entries.push(notification);
        // FIFO eviction when exceeding max
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction() {
        let mut queue = NotificationQueue::new(2);
        queue.push(Notification::info("one"));
        queue.push(Notification::info("two"));
        queue.push(Notification::error("three"));
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "two");
        assert_eq!(drained[1].level, NotificationLevel::Error);
        assert!(queue.is_empty());
    }
}
