//! Timestamped data types exchanged through data ports.
//!
//! Every type carries a `tm` timestamp next to its payload and implements
//! [`DataType`], whose `TYPE_NAME` is compared when two ports are connected.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Marker trait for payloads that can travel through a port.
pub trait DataType: Serialize + DeserializeOwned + Clone + Default + Send + 'static {
    /// Repository id used to type-check port connections.
    const TYPE_NAME: &'static str;
}

/// Timestamp with second / nanosecond split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Time {
    /// Seconds since UNIX epoch
    pub sec: u32,
    /// Nanoseconds within the second
    pub nsec: u32,
}

impl Time {
    /// Current wall-clock time.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_duration(since_epoch)
    }

    /// Build a timestamp from a duration since the epoch. Seconds saturate at `u32::MAX`.
    pub fn from_duration(d: Duration) -> Self {
        Self {
            sec: u32::try_from(d.as_secs()).unwrap_or(u32::MAX),
            nsec: d.subsec_nanos(),
        }
    }

    /// Convert back to a duration since the epoch.
    pub fn as_duration(&self) -> Duration {
        Duration::new(u64::from(self.sec), self.nsec)
    }
}

/// Planar velocity: translation along x/y and rotation about z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity2D {
    /// Linear velocity along x [m/s]
    pub vx: f64,
    /// Linear velocity along y [m/s]
    pub vy: f64,
    /// Angular velocity [rad/s]
    pub va: f64,
}

/// Timestamped [`Velocity2D`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimedVelocity2D {
    /// Timestamp
    pub tm: Time,
    /// Payload
    pub data: Velocity2D,
}

impl DataType for TimedVelocity2D {
    const TYPE_NAME: &'static str = "IDL:RTC/TimedVelocity2D:1.0";
}

/// Timestamped sequence of 16-bit integers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimedShortSeq {
    /// Timestamp
    pub tm: Time,
    /// Payload
    pub data: Vec<i16>,
}

impl DataType for TimedShortSeq {
    const TYPE_NAME: &'static str = "IDL:RTC/TimedShortSeq:1.0";
}

/// Timestamped 32-bit integer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimedLong {
    /// Timestamp
    pub tm: Time,
    /// Payload
    pub data: i32,
}

impl DataType for TimedLong {
    const TYPE_NAME: &'static str = "IDL:RTC/TimedLong:1.0";
}
