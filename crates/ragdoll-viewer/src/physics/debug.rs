//! Physics debug overlay.
//!
//! Collider and joint outlines are drawn by avian's debug renderer. Their
//! visibility follows [`SimulationSettings::debug_physics`].

use avian3d::debug_render::PhysicsGizmos;
use bevy::color::palettes::css::LIME;
use bevy::gizmos::config::{GizmoConfig, GizmoConfigStore};
use bevy::prelude::*;
use leafwing_input_manager::prelude::*;

use super::SimulationSettings;
use crate::input::ViewerAction;

/// Configure physics debug rendering on startup.
pub fn configure_physics_debug_on_startup(
    settings: Res<SimulationSettings>,
    mut config_store: ResMut<GizmoConfigStore>,
) {
    let physics_gizmos = PhysicsGizmos {
        collider_color: Some(LIME.into()),
        ..Default::default()
    };

    // Negative depth bias keeps outlines visible through the meshes they wrap.
    let gizmo_config = GizmoConfig {
        enabled: settings.debug_physics,
        depth_bias: -1.0,
        ..Default::default()
    };

    config_store.insert(gizmo_config, physics_gizmos);
}

/// Show or hide the physics debug overlay.
pub fn set_physics_debug(config_store: &mut GizmoConfigStore, enabled: bool) {
    let (config, _) = config_store.config_mut::<PhysicsGizmos>();
    if config.enabled != enabled {
        config.enabled = enabled;
        tracing::info!("Physics debug visualization: {enabled}");
    }
}

/// Check if the physics debug overlay is currently shown.
pub fn is_physics_debug_enabled(config_store: &GizmoConfigStore) -> bool {
    let (config, _) = config_store.config::<PhysicsGizmos>();
    config.enabled
}

/// Flip the debug setting when G is pressed.
pub fn toggle_physics_debug(
    query: Query<&ActionState<ViewerAction>>,
    mut settings: ResMut<SimulationSettings>,
) {
    if query
        .iter()
        .any(|actions| actions.just_pressed(&ViewerAction::ToggleDebug))
    {
        settings.debug_physics = !settings.debug_physics;
    }
}

/// Mirror the debug setting into the gizmo config when it changes.
pub fn apply_physics_debug(
    settings: Res<SimulationSettings>,
    mut config_store: ResMut<GizmoConfigStore>,
) {
    if settings.is_changed() && is_physics_debug_enabled(&config_store) != settings.debug_physics {
        set_physics_debug(&mut config_store, settings.debug_physics);
    }
}
