//! Mouse dragging of ragdoll parts.
//!
//! The cursor ray is cast against ragdoll colliders every frame. Pressing the
//! grab button on a part spawns a kinematic anchor at the hit point and ties
//! it to the part with a soft distance joint. The anchor then follows the
//! cursor across a camera-facing plane through the initial hit point until
//! the button is released.

use avian3d::prelude::*;
use bevy::{prelude::*, window::PrimaryWindow};
use bevy_egui::EguiContexts;
use leafwing_input_manager::prelude::*;

use ragdoll_viewer::ragdoll::{GameLayer, RagdollPart};

use crate::{camera::OrbitCamera, input::ViewerAction};

/// Maximum distance of the hover raycast.
const PICK_RANGE: f32 = 500.0;

/// Joint compliance (inverse stiffness) of the pull spring.
const PULL_COMPLIANCE: f32 = 1e-4;

/// Linear damping of the pull spring, stops the grabbed part from bouncing.
const PULL_LINEAR_DAMPING: f32 = 5.0;

/// System set containing all pull systems, in hover, begin, update, end order.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullSystems;

/// Plugin for ragdoll pulling.
pub struct PullPlugin;

impl Plugin for PullPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HoverState>().add_systems(
            Update,
            (update_hover, begin_pull, update_pull, end_pull)
                .chain()
                .in_set(PullSystems),
        );
    }
}

/// Marker for the sphere showing the grab point.
#[derive(Component)]
pub struct MouseHelper;

/// A ragdoll part under the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverHit {
    pub ragdoll: Entity,
    pub part: Entity,
    /// World-space point where the cursor ray hit the part.
    pub point: Vec3,
}

/// What the cursor is currently over.
#[derive(Resource, Debug, Default)]
pub struct HoverState {
    pub hit: Option<HoverHit>,
}

/// The drag in progress. Present only while a part is held.
#[derive(Resource, Debug, Clone, Copy)]
pub struct ActivePull {
    pub ragdoll: Entity,
    pub part: Entity,
    /// Kinematic body following the cursor.
    pub anchor: Entity,
    /// Distance joint between anchor and part.
    pub joint: Entity,
    /// Where the joint attaches, in the part's local frame.
    pub grab_point: Vec3,
    /// A point on the drag plane.
    pub plane_origin: Vec3,
    /// Drag plane normal, facing the camera.
    pub plane_normal: Dir3,
}

/// Intersect a ray with a plane.
///
/// Returns `None` when the ray is parallel to the plane or the plane lies
/// behind the ray origin.
pub fn ray_plane_intersection(
    ray_origin: Vec3,
    ray_direction: Dir3,
    plane_origin: Vec3,
    plane_normal: Dir3,
) -> Option<Vec3> {
    let denom = plane_normal.dot(*ray_direction);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = plane_normal.dot(plane_origin - ray_origin) / denom;
    if t < 0.0 {
        return None;
    }
    Some(ray_origin + *ray_direction * t)
}

/// Express a world point in a body's local frame.
pub fn local_grab_point(position: Vec3, rotation: Quat, world_point: Vec3) -> Vec3 {
    rotation.inverse() * (world_point - position)
}

/// Cursor ray in world space, if the cursor is inside the window.
fn cursor_ray(
    window: &Query<&Window, With<PrimaryWindow>>,
    camera: &Query<(&Camera, &GlobalTransform), With<OrbitCamera>>,
) -> Option<Ray3d> {
    let cursor = window.single().ok()?.cursor_position()?;
    let (camera, camera_transform) = camera.single().ok()?;
    camera.viewport_to_world(camera_transform, cursor).ok()
}

/// Raycast under the cursor and update hover feedback.
fn update_hover(
    mut hover: ResMut<HoverState>,
    active: Option<Res<ActivePull>>,
    mut contexts: EguiContexts,
    spatial_query: SpatialQuery,
    window: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform), With<OrbitCamera>>,
    mut orbit: Query<&mut OrbitCamera>,
    parts: Query<&RagdollPart>,
    mut helper: Query<(&mut Transform, &mut Visibility), With<MouseHelper>>,
) {
    let over_ui = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.is_pointer_over_area());

    let hit = if active.is_some() || over_ui {
        None
    } else {
        cursor_ray(&window, &camera).and_then(|ray| {
            let filter = SpatialQueryFilter::from_mask(GameLayer::Ragdoll);
            let hit = spatial_query.cast_ray(ray.origin, ray.direction, PICK_RANGE, true, &filter)?;
            let part = parts.get(hit.entity).ok()?;
            Some(HoverHit {
                ragdoll: part.ragdoll,
                part: hit.entity,
                point: ray.get_point(hit.distance),
            })
        })
    };

    if hover.hit != hit {
        hover.hit = hit;
    }

    let rotate_enabled = hit.is_none() && active.is_none();
    for mut orbit in &mut orbit {
        if orbit.rotate_enabled != rotate_enabled {
            orbit.rotate_enabled = rotate_enabled;
        }
    }

    // While pulling, the helper tracks the anchor instead.
    if active.is_some() {
        return;
    }
    for (mut transform, mut visibility) in &mut helper {
        match hit {
            Some(hit) => {
                transform.translation = hit.point;
                *visibility = Visibility::Visible;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}

/// Start pulling the hovered part when the grab button goes down.
fn begin_pull(
    mut commands: Commands,
    hover: Res<HoverState>,
    active: Option<Res<ActivePull>>,
    camera: Query<(&GlobalTransform, &ActionState<ViewerAction>), With<OrbitCamera>>,
    parts: Query<(&Position, &Rotation), With<RagdollPart>>,
) {
    if active.is_some() {
        return;
    }
    let Some(hit) = hover.hit else {
        return;
    };
    let Ok((camera_transform, actions)) = camera.single() else {
        return;
    };
    if !actions.just_pressed(&ViewerAction::Grab) {
        return;
    }
    let Ok((position, rotation)) = parts.get(hit.part) else {
        return;
    };

    let anchor = commands
        .spawn((
            Name::new("Pull anchor"),
            RigidBody::Kinematic,
            Position(hit.point),
            Transform::from_translation(hit.point),
        ))
        .id();

    let local_anchor = local_grab_point(position.0, rotation.0, hit.point);
    let joint = commands
        .spawn((
            Name::new("Pull joint"),
            DistanceJoint::new(anchor, hit.part)
                .with_local_anchor1(Vec3::ZERO)
                .with_local_anchor2(local_anchor)
                .with_limits(0.0, 0.0)
                .with_compliance(PULL_COMPLIANCE),
            JointDamping {
                linear: PULL_LINEAR_DAMPING,
                angular: 0.0,
            },
        ))
        .id();

    commands.insert_resource(ActivePull {
        ragdoll: hit.ragdoll,
        part: hit.part,
        anchor,
        joint,
        grab_point: local_anchor,
        plane_origin: hit.point,
        plane_normal: camera_transform.back(),
    });

    tracing::debug!("Pulling part {} of ragdoll {}", hit.part, hit.ragdoll);
}

/// Move the anchor to where the cursor ray crosses the drag plane.
fn update_pull(
    active: Option<Res<ActivePull>>,
    window: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform), With<OrbitCamera>>,
    mut anchors: Query<&mut Position, Without<MouseHelper>>,
    mut helper: Query<(&mut Transform, &mut Visibility), With<MouseHelper>>,
) {
    let Some(active) = active else {
        return;
    };
    let Some(ray) = cursor_ray(&window, &camera) else {
        return;
    };
    let Some(target) = ray_plane_intersection(
        ray.origin,
        ray.direction,
        active.plane_origin,
        active.plane_normal,
    ) else {
        return;
    };

    if let Ok(mut position) = anchors.get_mut(active.anchor) {
        position.0 = target;
    }
    for (mut transform, mut visibility) in &mut helper {
        transform.translation = target;
        *visibility = Visibility::Visible;
    }
}

/// Release the part when the button comes up or the part is gone.
fn end_pull(
    mut commands: Commands,
    active: Option<Res<ActivePull>>,
    camera: Query<&ActionState<ViewerAction>, With<OrbitCamera>>,
    parts: Query<(), With<RagdollPart>>,
) {
    let Some(active) = active else {
        return;
    };

    let held = camera
        .iter()
        .any(|actions| actions.pressed(&ViewerAction::Grab));
    if held && parts.contains(active.part) {
        return;
    }

    commands.entity(active.joint).try_despawn();
    commands.entity(active.anchor).try_despawn();
    commands.remove_resource::<ActivePull>();
    tracing::debug!(
        "Released ragdoll {} (held at local {})",
        active.ragdoll,
        active.grab_point
    );
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_ray_hits_facing_plane() {
        let hit = ray_plane_intersection(
            Vec3::new(0.0, 4.0, 3.0),
            Dir3::NEG_Z,
            Vec3::new(0.0, 0.0, -1.0),
            Dir3::Z,
        );
        assert_eq!(hit, Some(Vec3::new(0.0, 4.0, -1.0)));
    }

    #[test]
    fn test_parallel_ray_misses() {
        let hit = ray_plane_intersection(Vec3::ZERO, Dir3::X, Vec3::new(0.0, 0.0, -1.0), Dir3::Z);
        assert_eq!(hit, None);
    }

    #[test]
    fn test_plane_behind_ray_misses() {
        let hit = ray_plane_intersection(Vec3::ZERO, Dir3::Z, Vec3::new(0.0, 0.0, -1.0), Dir3::Z);
        assert_eq!(hit, None);
    }

    #[test]
    fn test_local_grab_point_undoes_pose() {
        let position = Vec3::new(1.0, 2.0, 3.0);
        let rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let local = local_grab_point(position, rotation, Vec3::new(1.0, 3.0, 3.0));
        assert!((local - Vec3::X).length() < 1e-5, "{local}");
    }

    fn spawn_camera(world: &mut World, grab_held: bool) -> Entity {
        let mut actions = ActionState::<ViewerAction>::default();
        if grab_held {
            actions.press(&ViewerAction::Grab);
        }
        world
            .spawn((
                OrbitCamera::from_look_at(Vec3::new(0.0, 4.0, 3.0), Vec3::ZERO),
                GlobalTransform::from_translation(Vec3::new(0.0, 4.0, 3.0)),
                actions,
            ))
            .id()
    }

    fn spawn_part(world: &mut World, position: Vec3, rotation: Quat) -> Entity {
        let ragdoll = world.spawn_empty().id();
        world
            .spawn((
                Position(position),
                Rotation(rotation),
                RagdollPart {
                    ragdoll,
                    bone: ragdoll_viewer::ragdoll::skeleton::Bone::LowerArmLeft,
                },
            ))
            .id()
    }

    /// World with a part, a camera and a pull in progress on that part.
    fn world_with_pull(grab_held: bool) -> (World, ActivePull) {
        let mut world = World::new();
        spawn_camera(&mut world, grab_held);
        let part = spawn_part(&mut world, Vec3::Y, Quat::IDENTITY);
        let anchor = world.spawn(Name::new("Pull anchor")).id();
        let joint = world.spawn(Name::new("Pull joint")).id();
        let active = ActivePull {
            ragdoll: world.get::<RagdollPart>(part).unwrap().ragdoll,
            part,
            anchor,
            joint,
            grab_point: Vec3::ZERO,
            plane_origin: Vec3::Y,
            plane_normal: Dir3::Z,
        };
        world.insert_resource(active);
        (world, active)
    }

    #[test]
    fn test_grab_starts_pull_at_hit_point() {
        let mut world = World::new();
        spawn_camera(&mut world, true);
        let position = Vec3::new(0.5, 1.0, 0.0);
        let rotation = Quat::from_rotation_y(0.7);
        let part = spawn_part(&mut world, position, rotation);
        let ragdoll = world.get::<RagdollPart>(part).unwrap().ragdoll;
        let point = Vec3::new(0.55, 1.1, 0.05);
        world.insert_resource(HoverState {
            hit: Some(HoverHit {
                ragdoll,
                part,
                point,
            }),
        });

        world.run_system_once(begin_pull).unwrap();

        let active = *world.resource::<ActivePull>();
        assert_eq!(active.part, part);
        assert_eq!(active.ragdoll, ragdoll);
        assert_eq!(active.plane_origin, point);

        let anchor = world.entity(active.anchor);
        assert!(matches!(
            anchor.get::<RigidBody>(),
            Some(RigidBody::Kinematic)
        ));
        assert_eq!(anchor.get::<Position>().unwrap().0, point);

        let joint = world.get::<DistanceJoint>(active.joint).unwrap();
        assert_eq!(joint.body1, active.anchor);
        assert_eq!(joint.body2, part);
        let expected = local_grab_point(position, rotation, point);
        assert!((active.grab_point - expected).length() < 1e-6);
        assert!((rotation * active.grab_point + position - point).length() < 1e-5);
    }

    #[test]
    fn test_no_pull_without_grab() {
        let mut world = World::new();
        spawn_camera(&mut world, false);
        let part = spawn_part(&mut world, Vec3::Y, Quat::IDENTITY);
        world.insert_resource(HoverState {
            hit: Some(HoverHit {
                ragdoll: world.get::<RagdollPart>(part).unwrap().ragdoll,
                part,
                point: Vec3::Y,
            }),
        });

        world.run_system_once(begin_pull).unwrap();

        assert!(!world.contains_resource::<ActivePull>());
    }

    #[test]
    fn test_release_ends_pull() {
        let (mut world, active) = world_with_pull(false);

        world.run_system_once(end_pull).unwrap();

        assert!(!world.contains_resource::<ActivePull>());
        assert!(world.get_entity(active.anchor).is_err());
        assert!(world.get_entity(active.joint).is_err());
        assert!(world.get_entity(active.part).is_ok());
    }

    #[test]
    fn test_pull_ends_when_part_disappears() {
        let (mut world, active) = world_with_pull(true);

        world.run_system_once(end_pull).unwrap();
        assert!(world.contains_resource::<ActivePull>());

        world.despawn(active.part);
        world.run_system_once(end_pull).unwrap();

        assert!(!world.contains_resource::<ActivePull>());
        assert!(world.get_entity(active.anchor).is_err());
        assert!(world.get_entity(active.joint).is_err());
    }

    fn vec3_strategy(range: f32) -> impl Strategy<Value = Vec3> {
        (-range..range, -range..range, -range..range).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    fn dir_strategy() -> impl Strategy<Value = Dir3> {
        vec3_strategy(1.0)
            .prop_filter("non-degenerate direction", |v| v.length() > 0.1)
            .prop_map(|v| Dir3::new(v).unwrap_or(Dir3::Y))
    }

    proptest! {
        #[test]
        fn prop_intersection_lies_on_plane_and_ray(
            origin in vec3_strategy(10.0),
            direction in dir_strategy(),
            plane_origin in vec3_strategy(10.0),
            normal in dir_strategy(),
        ) {
            if let Some(point) = ray_plane_intersection(origin, direction, plane_origin, normal) {
                let scale = 1.0 + (point - origin).length();
                prop_assert!(normal.dot(point - plane_origin).abs() < 1e-3 * scale);
                let along = point - origin;
                prop_assert!(along.dot(*direction) >= -1e-4);
                prop_assert!(along.cross(*direction).length() < 1e-3 * scale);
            }
        }

        #[test]
        fn prop_grab_point_maps_back_to_world(
            position in vec3_strategy(10.0),
            yaw in -3.0f32..3.0,
            pitch in -3.0f32..3.0,
            point in vec3_strategy(10.0),
        ) {
            let rotation = Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0);
            let local = local_grab_point(position, rotation, point);
            prop_assert!((rotation * local + position - point).length() < 1e-3);
        }
    }
}
