//! Interactive ragdoll physics viewer using Bevy and Avian.
//!
//! Drops jointed humanoid ragdolls onto a ground plane under a procedural
//! sky. Limbs can be dragged with the mouse, and a control panel adjusts
//! gravity, the physics debug overlay and the number of ragdolls.

mod camera;
mod input;
mod launch_params;
mod physics;
mod pull;
mod ragdoll_view;
mod scene;
mod ui;

use bevy::prelude::*;

use camera::OrbitCameraPlugin;
use input::InputPlugin;
use physics::{PhysicsIntegrationPlugin, SimulationSettings};
use pull::PullPlugin;
use ragdoll_view::RagdollViewPlugin;
use scene::ScenePlugin;
use ui::ControlsUiPlugin;

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            InputPlugin,
            ScenePlugin,
            PhysicsIntegrationPlugin,
            RagdollViewPlugin,
            PullPlugin,
            OrbitCameraPlugin,
            ControlsUiPlugin,
        ));
    }
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();
    tracing::info!(
        "Starting with gravity {:.2} m/s², {} ragdoll(s), debug physics {}",
        params.gravity,
        params.ragdolls,
        params.debug_physics
    );

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "ragdoll-viewer".to_string(),
        resolution: (1280, 720).into(),
        position: WindowPosition::Centered(MonitorSelection::Primary),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }));

    app.insert_resource(SimulationSettings::from_launch_params(&params))
        .insert_resource(params)
        .add_plugins(AppPlugin)
        .run();
}
