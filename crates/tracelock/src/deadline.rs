use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const MICROS_PER_SEC: u64 = 1_000_000;
const NANOS_PER_MICRO: u32 = 1_000;
// Stand-in for deadlines the monotonic clock cannot represent.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// An absolute point in time, in microseconds since the UNIX epoch.
///
/// Timed condition waits take a `Deadline` rather than a duration so that a
/// caller looping over spurious wakeups keeps waiting for the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline {
    micros: u64,
}

impl Deadline {
    pub const fn from_micros(micros: u64) -> Self {
        Self { micros }
    }

    pub const fn as_micros(self) -> u64 {
        self.micros
    }

    /// The current wall-clock time, truncated to whole microseconds.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        let timeout = u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX);
        Self::from_micros(Self::now().micros.saturating_add(timeout))
    }

    /// Times before the epoch clamp to the epoch.
    pub fn from_system_time(time: SystemTime) -> Self {
        let micros = time
            .duration_since(UNIX_EPOCH)
            .map(|since| u64::try_from(since.as_micros()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self::from_micros(micros)
    }

    /// Splits the deadline into whole seconds and the nanosecond remainder.
    pub const fn as_secs_nanos(self) -> (u64, u32) {
        let secs = self.micros / MICROS_PER_SEC;
        let sub_micros = (self.micros % MICROS_PER_SEC) as u32;
        (secs, sub_micros * NANOS_PER_MICRO)
    }

    /// `None` if the deadline lies beyond what `SystemTime` can represent.
    pub fn to_system_time(self) -> Option<SystemTime> {
        let (secs, nanos) = self.as_secs_nanos();
        UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
    }

    /// Time left until the deadline, or zero if it has passed.
    pub fn remaining(self) -> Duration {
        Duration::from_micros(self.micros.saturating_sub(Self::now().micros))
    }

    /// Maps the deadline onto the monotonic clock the backends wait on.
    pub fn to_instant(self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.remaining())
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now)
    }

    pub fn has_passed(self) -> bool {
        self <= Self::now()
    }
}

impl From<SystemTime> for Deadline {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (secs, nanos) = self.as_secs_nanos();
        write!(f, "{secs}.{:06}", nanos / NANOS_PER_MICRO)
    }
}
