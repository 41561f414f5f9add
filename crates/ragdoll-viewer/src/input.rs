//! Input action definitions and focus management.
//!
//! All viewer controls go through `leafwing-input-manager`. Pointer actions
//! are switched off while egui owns the pointer, keyboard actions while egui
//! owns the keyboard.

use bevy::prelude::*;
use bevy_egui::EguiContexts;
use leafwing_input_manager::{plugin::InputManagerSystem, prelude::*};

/// Actions available in the viewer.
#[derive(Actionlike, PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum ViewerAction {
    /// Mouse motion, consumed by rotate, pan and pull.
    #[actionlike(DualAxis)]
    Look,
    /// Orbit the camera (left drag).
    Rotate,
    /// Pan the camera focus (right drag).
    Pan,
    /// Zoom towards the focus (scroll).
    #[actionlike(Axis)]
    Zoom,
    /// Grab the hovered ragdoll part (left click).
    Grab,
    /// Spawn another ragdoll (R).
    SpawnRagdoll,
    /// Toggle the physics debug overlay (G).
    ToggleDebug,
    /// Toggle UI visibility (Q).
    ToggleUi,
}

/// Create the default input map.
pub fn default_input_map() -> InputMap<ViewerAction> {
    InputMap::default()
        .with_dual_axis(ViewerAction::Look, MouseMove::default())
        .with(ViewerAction::Rotate, MouseButton::Left)
        .with(ViewerAction::Pan, MouseButton::Right)
        .with_axis(ViewerAction::Zoom, MouseScrollAxis::Y)
        .with(ViewerAction::Grab, MouseButton::Left)
        .with(ViewerAction::SpawnRagdoll, KeyCode::KeyR)
        .with(ViewerAction::ToggleDebug, KeyCode::KeyG)
        .with(ViewerAction::ToggleUi, KeyCode::KeyQ)
}

/// Plugin that registers the action type and the input focus system.
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InputManagerPlugin::<ViewerAction>::default())
            .add_systems(
                PreUpdate,
                manage_input_focus.after(InputManagerSystem::Update),
            );
    }
}

/// Actions disabled while egui wants keyboard input.
const KEYBOARD_ACTIONS: &[ViewerAction] = &[ViewerAction::SpawnRagdoll, ViewerAction::ToggleDebug];

/// Actions disabled while the pointer is over the UI.
const POINTER_ACTIONS: &[ViewerAction] = &[
    ViewerAction::Look,
    ViewerAction::Rotate,
    ViewerAction::Pan,
    ViewerAction::Zoom,
    ViewerAction::Grab,
];

fn set_actions(
    action_state: &mut ActionState<ViewerAction>,
    actions: &[ViewerAction],
    enabled: bool,
) {
    for action in actions {
        if enabled {
            action_state.enable_action(action);
        } else {
            action_state.disable_action(action);
        }
    }
}

/// Route input between egui and the 3D view.
///
/// `ToggleUi` is always kept enabled.
fn manage_input_focus(
    mut query: Query<&mut ActionState<ViewerAction>>,
    mut contexts: EguiContexts,
) {
    let (egui_wants_pointer, egui_wants_kb) = contexts.ctx_mut().ok().map_or(
        (false, false),
        |ctx| {
            (
                ctx.wants_pointer_input() || ctx.is_pointer_over_area(),
                ctx.wants_keyboard_input(),
            )
        },
    );

    for mut action_state in &mut query {
        action_state.enable_action(&ViewerAction::ToggleUi);
        set_actions(&mut action_state, POINTER_ACTIONS, !egui_wants_pointer);
        set_actions(&mut action_state, KEYBOARD_ACTIONS, !egui_wants_kb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_binds_every_action() {
        let map = default_input_map();
        for action in [
            ViewerAction::Rotate,
            ViewerAction::Pan,
            ViewerAction::Grab,
            ViewerAction::SpawnRagdoll,
            ViewerAction::ToggleDebug,
            ViewerAction::ToggleUi,
        ] {
            assert!(map.get_buttonlike(&action).is_some(), "{action:?} unbound");
        }
        assert!(map.get_dual_axislike(&ViewerAction::Look).is_some());
        assert!(map.get_axislike(&ViewerAction::Zoom).is_some());
    }

    #[test]
    fn test_focus_lists_are_disjoint() {
        for action in KEYBOARD_ACTIONS {
            assert!(!POINTER_ACTIONS.contains(action));
        }
        assert!(!KEYBOARD_ACTIONS.contains(&ViewerAction::ToggleUi));
        assert!(!POINTER_ACTIONS.contains(&ViewerAction::ToggleUi));
    }
}
