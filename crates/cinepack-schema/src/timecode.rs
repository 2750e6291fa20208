use serde::Serialize;
use std::fmt;

/// Wall-clock position of a frame: hours, minutes, seconds, milliseconds.
///
/// Field order gives the derived ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timecode {
    pub h: i64,
    pub m: i64,
    pub s: i64,
    pub ms: i64,
}

impl Timecode {
    pub const fn new(h: i64, m: i64, s: i64, ms: i64) -> Self {
        Self { h, m, s, ms }
    }

    /// Position of `frame` at `fps` frames per second. `fps <= 0` gives zero.
    pub fn from_frame(frame: i64, fps: i32) -> Self {
        if fps <= 0 {
            return Self::default();
        }
        Self::from_milliseconds(frame * 1000 / i64::from(fps))
    }

    pub fn from_milliseconds(total_ms: i64) -> Self {
        let total_s = total_ms / 1000;
        Self {
            h: total_s / 3600,
            m: (total_s / 60) % 60,
            s: total_s % 60,
            ms: total_ms % 1000,
        }
    }

    pub fn total_milliseconds(&self) -> i64 {
        ((self.h * 60 + self.m) * 60 + self.s) * 1000 + self.ms
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}.{}", self.h, self.m, self.s, self.ms)
    }
}
