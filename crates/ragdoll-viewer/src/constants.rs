//! Shared scene and physics constants.

use glam::Vec3;

/// Default vertical gravity in m/s^2 (negative pulls down).
pub const DEFAULT_GRAVITY: f32 = -9.81;

/// Lower bound of the gravity slider.
pub const GRAVITY_MIN: f32 = -10.0;

/// Upper bound of the gravity slider.
pub const GRAVITY_MAX: f32 = 10.0;

/// Gravity slider step.
pub const GRAVITY_STEP: f64 = 0.1;

/// Side length of the square ground plane in meters.
pub const GROUND_SIZE: f32 = 20.0;

/// Half-thickness of the ground physics slab. Its top face sits at y = 0.
pub const GROUND_HALF_THICKNESS: f32 = 0.2;

/// Initial camera position.
pub const CAMERA_START: Vec3 = Vec3::new(0.0, 4.0, 3.0);

/// Height above the ground at which new ragdolls are dropped.
pub const SPAWN_HEIGHT: f32 = 1.0;

/// Horizontal half-range for randomized ragdoll spawn positions.
pub const SPAWN_SPREAD: f32 = 1.5;

/// Ragdolls whose parts are all below this height are removed.
pub const KILL_HEIGHT: f32 = -50.0;
