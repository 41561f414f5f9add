//! Interactive ragdoll physics demo using Bevy and Avian.
//!
//! This library exposes the ragdoll core (blueprint, spawning and settling
//! telemetry) so the headless settle binary can share it with the viewer.

/// Shared scene and physics constants.
pub mod constants;

/// Ragdoll blueprint, physics spawning and telemetry.
pub mod ragdoll;
