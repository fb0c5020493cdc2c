use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

const SHOW_FOR: Duration = Duration::from_secs(5);
const MAX_ALERTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: Level,
    pub message: String,
    raised: Instant,
}

/// Toast queue, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Alerts {
    queue: VecDeque<Alert>,
}

impl Alerts {
    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        let message = message.into();
        // the same failure repeated back to back only refreshes the toast
        self.queue
            .retain(|alert| !(alert.level == level && alert.message == message));
        self.queue.push_back(Alert {
            level,
            message,
            raised: Instant::now(),
        });
        while self.queue.len() > MAX_ALERTS {
            self.queue.pop_front();
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message);
    }

    pub fn expire(&mut self, now: Instant) {
        self.queue
            .retain(|alert| now.saturating_duration_since(alert.raised) < SHOW_FOR);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.queue.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn last(&self) -> Option<&Alert> {
        self.queue.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_and_expiring() {
        let mut alerts = Alerts::default();
        for i in 0..6 {
            alerts.error(format!("failure {}", i));
        }
        alerts.error("failure 5");
        let messages: Vec<&str> = alerts.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(messages, vec!["failure 2", "failure 3", "failure 4", "failure 5"]);

        alerts.expire(Instant::now());
        assert_eq!(alerts.iter().count(), 4);
        alerts.expire(Instant::now() + SHOW_FOR);
        assert!(alerts.is_empty());
    }
}
