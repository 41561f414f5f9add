//! Static scene setup: camera, sky, lights, ground plane and the mouse helper.

use std::f32::consts::PI;

use bevy::{
    camera::Exposure,
    color::palettes::css::{LIGHT_GRAY, YELLOW},
    core_pipeline::tonemapping::Tonemapping,
    light::light_consts::lux,
    pbr::{Atmosphere, AtmosphereSettings, ScatteringMedium},
    prelude::*,
    render::view::Hdr,
};
use leafwing_input_manager::prelude::*;

use ragdoll_viewer::constants::{CAMERA_START, GROUND_SIZE};

use crate::{
    camera::OrbitCamera,
    input::{ViewerAction, default_input_map},
    pull::MouseHelper,
};

/// Sun polar angle from the zenith.
const SUN_PHI_DEGREES: f32 = 30.0;

/// Sun azimuth around +Y, measured from +Z.
const SUN_THETA_DEGREES: f32 = 180.0;

/// Earth radius in meters, the floor of the sky model.
const EARTH_RADIUS: f32 = 6_371_000.0;

/// Top of the atmosphere (100 km above the surface).
const ATMOSPHERE_TOP_RADIUS: f32 = 6_471_000.0;

/// Point light placement and reach.
const POINT_LIGHT_POSITION: Vec3 = Vec3::new(0.0, 5.0, -5.0);
const POINT_LIGHT_RANGE: f32 = 30.0;

/// Bright enough to show up under the daylight exposure.
const POINT_LIGHT_LUMENS: f32 = 20_000_000.0;

/// Radius of the sphere marking the grab point.
const MOUSE_HELPER_RADIUS: f32 = 0.1;

/// Plugin that builds the static scene.
pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene);
    }
}

/// Unit vector pointing towards the sun for spherical angles in radians.
///
/// `phi` is the polar angle from +Y, `theta` the azimuth around +Y from +Z.
pub fn sun_direction(phi: f32, theta: f32) -> Vec3 {
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta)
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut media: ResMut<Assets<ScatteringMedium>>,
) {
    let orbit = OrbitCamera::from_look_at(CAMERA_START, Vec3::ZERO);
    let earth_medium = media.add(ScatteringMedium::default());

    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        orbit.transform(),
        Projection::Perspective(PerspectiveProjection {
            fov: 75.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            ..default()
        }),
        // HDR is required for atmosphere rendering.
        Hdr,
        Tonemapping::AcesFitted,
        Exposure { ev100: 13.0 },
        Atmosphere {
            bottom_radius: EARTH_RADIUS,
            top_radius: ATMOSPHERE_TOP_RADIUS,
            ground_albedo: Vec3::splat(0.3),
            medium: earth_medium,
        },
        AtmosphereSettings::default(),
        AmbientLight {
            color: Color::WHITE,
            brightness: 2_000.0,
            ..default()
        },
        orbit,
        default_input_map(),
        ActionState::<ViewerAction>::default(),
    ));

    // The atmosphere is lit by the directional light, so it doubles as the sun.
    let sun = sun_direction(SUN_PHI_DEGREES.to_radians(), SUN_THETA_DEGREES.to_radians());
    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            color: Color::WHITE,
            illuminance: lux::RAW_SUNLIGHT,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(sun).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Name::new("Point light"),
        PointLight {
            color: Color::WHITE,
            intensity: POINT_LIGHT_LUMENS,
            range: POINT_LIGHT_RANGE,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(POINT_LIGHT_POSITION),
    ));

    commands.spawn((
        Name::new("Ground plane"),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(GROUND_SIZE, GROUND_SIZE))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: LIGHT_GRAY.into(),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::default(),
    ));

    commands.spawn((
        Name::new("Mouse helper"),
        MouseHelper,
        Mesh3d(meshes.add(Sphere::new(MOUSE_HELPER_RADIUS))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: YELLOW.with_alpha(0.6).into(),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        })),
        Transform::default(),
        Visibility::Hidden,
    ));

    tracing::info!(
        "Scene setup complete - drag limbs with the left mouse button, R adds a ragdoll"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sun_direction_is_unit() {
        for (phi, theta) in [(0.0, 0.0), (0.3, 1.0), (PI / 2.0, PI), (2.5, -1.2)] {
            assert!((sun_direction(phi, theta).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sun_direction_axes() {
        assert!((sun_direction(0.0, 1.234) - Vec3::Y).length() < 1e-6);
        assert!((sun_direction(PI / 2.0, 0.0) - Vec3::Z).length() < 1e-6);
        assert!((sun_direction(PI / 2.0, PI / 2.0) - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_default_sun_is_above_horizon_behind_origin() {
        let sun = sun_direction(SUN_PHI_DEGREES.to_radians(), SUN_THETA_DEGREES.to_radians());
        assert!((sun.y - 30.0_f32.to_radians().cos()).abs() < 1e-6);
        assert!(sun.z < 0.0);
        assert!(sun.x.abs() < 1e-6);
    }
}
