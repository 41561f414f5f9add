//! Ragdoll settling telemetry.
//!
//! Summarizes the motion of a ragdoll's parts each step and decides when the
//! figure has come to rest. Outputs CSV rows to any writer.

use std::io::{self, Write};

use glam::Vec3;

/// CSV column names, in row order.
pub const CSV_HEADER: &str = "t,max_speed,lowest_y,highest_y";

/// Motion summary of a ragdoll at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleSample {
    /// Seconds since the ragdoll was dropped.
    pub elapsed: f32,
    /// Fastest part speed in m/s.
    pub max_speed: f32,
    /// Lowest part center height.
    pub lowest_y: f32,
    /// Highest part center height.
    pub highest_y: f32,
}

impl SettleSample {
    /// Summarize `(position, linear velocity)` pairs of every part.
    ///
    /// Returns `None` when there are no parts.
    pub fn from_parts(elapsed: f32, parts: impl IntoIterator<Item = (Vec3, Vec3)>) -> Option<Self> {
        let mut sample: Option<Self> = None;
        for (position, velocity) in parts {
            let speed = velocity.length();
            let entry = sample.get_or_insert(Self {
                elapsed,
                max_speed: speed,
                lowest_y: position.y,
                highest_y: position.y,
            });
            entry.max_speed = entry.max_speed.max(speed);
            entry.lowest_y = entry.lowest_y.min(position.y);
            entry.highest_y = entry.highest_y.max(position.y);
        }
        sample
    }
}

/// Write the CSV header line.
pub fn write_header(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{CSV_HEADER}")
}

/// Write one sample as a CSV row.
pub fn write_row(out: &mut impl Write, sample: &SettleSample) -> io::Result<()> {
    writeln!(
        out,
        "{:.4},{:.4},{:.4},{:.4}",
        sample.elapsed, sample.max_speed, sample.lowest_y, sample.highest_y
    )
}

/// Detects when a ragdoll has stayed below a speed threshold long enough.
#[derive(Debug, Clone)]
pub struct SettleTracker {
    speed_threshold: f32,
    hold_secs: f32,
    still_for: f32,
}

impl SettleTracker {
    pub fn new(speed_threshold: f32, hold_secs: f32) -> Self {
        Self {
            speed_threshold,
            hold_secs,
            still_for: 0.0,
        }
    }

    /// Feed the fastest part speed for a step of `dt` seconds.
    ///
    /// Returns true once the speed has stayed under the threshold for the
    /// hold time. Any faster step resets the timer.
    pub fn observe(&mut self, max_speed: f32, dt: f32) -> bool {
        if max_speed < self.speed_threshold {
            self.still_for += dt;
        } else {
            self.still_for = 0.0;
        }
        self.is_settled()
    }

    pub fn is_settled(&self) -> bool {
        self.still_for >= self.hold_secs
    }

    /// How long the ragdoll has been still, in seconds.
    pub fn still_for(&self) -> f32 {
        self.still_for
    }
}
