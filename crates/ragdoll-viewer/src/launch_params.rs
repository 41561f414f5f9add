//! Launch parameter parsing for the viewer.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use bevy::prelude::*;

use ragdoll_viewer::constants::DEFAULT_GRAVITY;

/// Number of ragdolls spawned at startup by default.
const DEFAULT_RAGDOLLS: usize = 1;

/// Launch parameters for the viewer.
#[derive(Resource, Debug, Clone)]
pub struct LaunchParams {
    /// Initial vertical gravity in m/s².
    pub gravity: f32,
    /// Number of ragdolls to spawn at startup.
    pub ragdolls: usize,
    /// Whether the physics debug overlay starts enabled.
    pub debug_physics: bool,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            ragdolls: DEFAULT_RAGDOLLS,
            debug_physics: true,
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;
    use ragdoll_viewer::constants::{GRAVITY_MAX, GRAVITY_MIN};

    use super::*;

    /// Parse a gravity value, rejecting anything outside the slider range.
    pub(super) fn parse_gravity(s: &str) -> Result<f32, String> {
        let value = s
            .parse::<f32>()
            .map_err(|e| format!("invalid gravity: {e}"))?;
        if !(GRAVITY_MIN..=GRAVITY_MAX).contains(&value) {
            return Err(format!(
                "gravity out of range: {value} (expected {GRAVITY_MIN} to {GRAVITY_MAX})"
            ));
        }
        Ok(value)
    }

    #[derive(Parser)]
    #[command(about = "Interactive ragdoll physics viewer")]
    struct CliArgs {
        /// Vertical gravity in m/s² (negative pulls down).
        #[arg(long, default_value_t = DEFAULT_GRAVITY, value_parser = parse_gravity, allow_hyphen_values = true)]
        gravity: f32,

        /// Number of ragdolls to spawn at startup.
        #[arg(long, default_value_t = DEFAULT_RAGDOLLS)]
        ragdolls: usize,

        /// Start with the physics debug overlay hidden.
        #[arg(long)]
        no_debug_physics: bool,
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        LaunchParams {
            gravity: args.gravity,
            ragdolls: args.ragdolls,
            debug_physics: !args.no_debug_physics,
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}
