//! Time source used to stamp users and compute trailing windows.

use chrono::{DateTime, Utc};

/// Port for getting the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock using the OS time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock moved by hand; every read advances it by one millisecond so that
/// consecutive inserts never share a timestamp.
#[cfg(test)]
pub struct ManualClock {
    millis: std::sync::atomic::AtomicI64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: std::sync::atomic::AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Jump forward.
    pub fn advance(&self, delta: chrono::TimeDelta) {
        self.millis.fetch_add(
            delta.num_milliseconds(),
            std::sync::atomic::Ordering::SeqCst,
        );
    }

    /// Move to an exact instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.millis.store(
            instant.timestamp_millis(),
            std::sync::atomic::Ordering::SeqCst,
        );
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self
            .millis
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}
