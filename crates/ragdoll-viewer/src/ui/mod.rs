//! Control panel for the viewer.
//!
//! A single egui window with ragdoll, physics and performance controls.

mod stats;

use bevy::{
    diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin},
    prelude::*,
};
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};
use leafwing_input_manager::prelude::*;

use ragdoll_viewer::constants::{GRAVITY_MAX, GRAVITY_MIN, GRAVITY_STEP};

use crate::{
    input::ViewerAction,
    physics::{SceneStats, SimulationSettings},
    ragdoll_view::RagdollActions,
};

use stats::FrameTimeHistory;

/// Resource controlling whether the control panel is visible.
#[derive(Resource)]
pub struct UiVisible(pub bool);

impl Default for UiVisible {
    fn default() -> Self {
        Self(true)
    }
}

/// Plugin for the control panel.
pub struct ControlsUiPlugin;

impl Plugin for ControlsUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .add_plugins(FrameTimeDiagnosticsPlugin::default())
            .init_resource::<UiVisible>()
            .init_resource::<FrameTimeHistory>()
            .add_systems(Update, (toggle_ui_visible, stats::record_frame_time))
            .add_systems(
                EguiPrimaryContextPass,
                controls_ui_system.run_if(|visible: Res<UiVisible>| visible.0),
            );
    }
}

/// Toggle UI visibility with Q.
fn toggle_ui_visible(
    action_query: Query<&ActionState<ViewerAction>>,
    mut visible: ResMut<UiVisible>,
) {
    let Ok(action_state) = action_query.single() else {
        return;
    };

    if action_state.just_pressed(&ViewerAction::ToggleUi) {
        visible.0 = !visible.0;
    }
}

/// Render the control panel.
fn controls_ui_system(
    mut contexts: EguiContexts,
    mut settings: ResMut<SimulationSettings>,
    mut actions: ResMut<RagdollActions>,
    scene_stats: Res<SceneStats>,
    diagnostics: Res<DiagnosticsStore>,
    history: Res<FrameTimeHistory>,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    // Edit copies so change detection only fires on real edits.
    let mut debug_physics = settings.debug_physics;
    let mut gravity = settings.gravity;
    let mut rigid_bodies = scene_stats.rigid_bodies;
    let mut ragdolls = scene_stats.ragdolls;

    egui::Window::new("Controls")
        .default_pos([10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            if ui.button("Add Ragdoll").clicked() {
                actions.request_spawn();
            }

            if ui.checkbox(&mut debug_physics, "Debug physics").changed() {
                settings.debug_physics = debug_physics;
            }

            ui.add_enabled_ui(false, |ui| {
                ui.horizontal(|ui| {
                    ui.add(egui::DragValue::new(&mut rigid_bodies));
                    ui.label("Rigid bodies");
                });
                ui.horizontal(|ui| {
                    ui.add(egui::DragValue::new(&mut ragdolls));
                    ui.label("Ragdolls");
                });
            });

            if ui
                .add(
                    egui::Slider::new(&mut gravity, GRAVITY_MIN..=GRAVITY_MAX)
                        .step_by(GRAVITY_STEP)
                        .text("Gravity"),
                )
                .changed()
            {
                settings.gravity = gravity;
            }

            ui.separator();
            ui.collapsing("Stats", |ui| {
                stats::render_stats(ui, &diagnostics, &history);
            });

            ui.separator();
            ui.small("Drag limbs with the left mouse button. R adds a ragdoll, G toggles debug lines, Q hides this panel.");
        });

    Ok(())
}
