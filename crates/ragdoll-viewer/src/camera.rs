//! Orbit camera controls.
//!
//! Left drag orbits around the focus point, right drag pans it, scroll zooms.
//! Orbiting is suspended while a ragdoll part is hovered or being pulled so
//! the same left drag can grab limbs.

use bevy::prelude::*;
use leafwing_input_manager::prelude::*;

use crate::{input::ViewerAction, pull::PullSystems};

/// Radians of orbit per pixel of mouse motion.
const ROTATE_SPEED: f32 = 0.005;

/// Focus movement per pixel, scaled by the orbit radius.
const PAN_SPEED: f32 = 0.0015;

/// Radius multiplier per scroll step.
const ZOOM_FACTOR: f32 = 1.1;

/// Pitch limits, just short of straight down and straight up.
const MIN_PITCH: f32 = -1.5;
const MAX_PITCH: f32 = 1.5;

/// Radius limits in meters.
const MIN_RADIUS: f32 = 0.5;
const MAX_RADIUS: f32 = 100.0;

/// Plugin for the orbit camera.
pub struct OrbitCameraPlugin;

impl Plugin for OrbitCameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, orbit_camera_input.after(PullSystems));
    }
}

/// Camera orbiting a focus point.
///
/// `yaw` is measured around +Y from +Z, `pitch` upwards from the ground plane.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub focus: Vec3,
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Cleared while the cursor is over a ragdoll or a pull is active.
    pub rotate_enabled: bool,
}

impl OrbitCamera {
    /// Orbit camera placed at `eye`, looking at `focus`.
    pub fn from_look_at(eye: Vec3, focus: Vec3) -> Self {
        let offset = eye - focus;
        let radius = offset.length().clamp(MIN_RADIUS, MAX_RADIUS);
        let direction = offset.normalize_or(Vec3::Z);
        Self {
            focus,
            radius,
            yaw: direction.x.atan2(direction.z),
            pitch: direction.y.asin().clamp(MIN_PITCH, MAX_PITCH),
            rotate_enabled: true,
        }
    }

    /// Camera position.
    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.focus + self.radius * Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.focus, Vec3::Y)
    }

    /// Orbit by a mouse delta in pixels. Dragging right turns the view left
    /// around the focus, dragging down raises the camera.
    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * ROTATE_SPEED;
        self.pitch = (self.pitch + delta.y * ROTATE_SPEED).clamp(MIN_PITCH, MAX_PITCH);
    }

    /// Zoom by scroll steps. Positive moves towards the focus.
    pub fn zoom(&mut self, steps: f32) {
        self.radius = (self.radius * ZOOM_FACTOR.powf(-steps)).clamp(MIN_RADIUS, MAX_RADIUS);
    }

    /// Pan the focus in the view plane by a mouse delta in pixels.
    pub fn pan(&mut self, delta: Vec2) {
        let transform = self.transform();
        let scale = PAN_SPEED * self.radius;
        self.focus += (-transform.right() * delta.x + transform.up() * delta.y) * scale;
    }
}

fn orbit_camera_input(
    mut query: Query<(
        &mut OrbitCamera,
        &mut Transform,
        &ActionState<ViewerAction>,
    )>,
) {
    for (mut orbit, mut transform, actions) in &mut query {
        let delta = actions.axis_pair(&ViewerAction::Look);
        let zoom = actions.value(&ViewerAction::Zoom);

        let mut moved = false;
        if orbit.rotate_enabled && actions.pressed(&ViewerAction::Rotate) && delta != Vec2::ZERO {
            orbit.orbit(delta);
            moved = true;
        }
        if actions.pressed(&ViewerAction::Pan) && delta != Vec2::ZERO {
            orbit.pan(delta);
            moved = true;
        }
        if zoom != 0.0 {
            orbit.zoom(zoom);
            moved = true;
        }

        if moved {
            *transform = orbit.transform();
        }
    }
}

#[cfg(test)]
mod tests {
    use ragdoll_viewer::constants::CAMERA_START;

    use super::*;

    fn assert_vec_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn test_from_look_at_reproduces_eye() {
        let orbit = OrbitCamera::from_look_at(CAMERA_START, Vec3::ZERO);
        assert_vec_near(orbit.eye(), CAMERA_START);
        assert!((orbit.radius - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_transform_looks_at_focus() {
        let focus = Vec3::new(1.0, 0.5, -2.0);
        let orbit = OrbitCamera::from_look_at(Vec3::new(4.0, 3.0, 2.0), focus);
        let transform = orbit.transform();
        let to_focus = (focus - transform.translation).normalize();
        assert_vec_near(*transform.forward(), to_focus);
        assert!(((focus - transform.translation).length() - orbit.radius).abs() < 1e-4);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut orbit = OrbitCamera::from_look_at(CAMERA_START, Vec3::ZERO);
        orbit.orbit(Vec2::new(0.0, 1e5));
        assert_eq!(orbit.pitch, MAX_PITCH);
        orbit.orbit(Vec2::new(0.0, -1e5));
        assert_eq!(orbit.pitch, MIN_PITCH);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut orbit = OrbitCamera::from_look_at(CAMERA_START, Vec3::ZERO);
        orbit.zoom(1.0);
        assert!(orbit.radius < 5.0);
        orbit.zoom(1000.0);
        assert_eq!(orbit.radius, MIN_RADIUS);
        orbit.zoom(-1000.0);
        assert_eq!(orbit.radius, MAX_RADIUS);
    }

    #[test]
    fn test_pan_keeps_view_offset() {
        let mut orbit = OrbitCamera::from_look_at(CAMERA_START, Vec3::ZERO);
        let offset = orbit.eye() - orbit.focus;
        orbit.pan(Vec2::new(30.0, -12.0));
        assert!(orbit.focus.length() > 0.0);
        assert_vec_near(orbit.eye() - orbit.focus, offset);
    }
}
