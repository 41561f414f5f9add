//! Ragdoll physics bodies and joints.
//!
//! A ragdoll is a root entity holding [`Ragdoll`] plus one dynamic rigid body
//! per blueprint bone, tied together by spherical joints. Rendering is left to
//! the caller: parts carry no meshes.

pub mod skeleton;
pub mod telemetry;

use avian3d::prelude::*;
use bevy::prelude::*;

use skeleton::{Bone, BoneShape, RagdollBlueprint};

/// Collision layers.
///
/// Used to limit cursor picking to ragdoll parts and keep the ground out of it.
#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum GameLayer {
    /// The static ground slab.
    #[default]
    Ground,
    /// Ragdoll body parts.
    Ragdoll,
}

/// Linear damping applied to every part.
const PART_LINEAR_DAMPING: f32 = 0.05;

/// Angular damping applied to every part.
const PART_ANGULAR_DAMPING: f32 = 0.3;

/// Angular damping on joints, keeps limbs from flailing.
const JOINT_ANGULAR_DAMPING: f32 = 2.0;

/// Root of a spawned ragdoll.
#[derive(Component, Debug, Clone)]
pub struct Ragdoll {
    /// Rigid body entities, one per bone.
    pub parts: Vec<Entity>,
    /// Joint entities connecting the parts.
    pub joints: Vec<Entity>,
}

/// A rigid body belonging to a ragdoll.
#[derive(Component, Debug, Clone, Copy)]
pub struct RagdollPart {
    /// The root entity holding [`Ragdoll`].
    pub ragdoll: Entity,
    /// Which bone this body represents.
    pub bone: Bone,
}

/// A part created by [`spawn_ragdoll`], with its initial pose.
#[derive(Debug, Clone)]
pub struct SpawnedPart {
    pub bone: Bone,
    pub shape: BoneShape,
    pub entity: Entity,
    pub transform: Transform,
}

/// Entities created by [`spawn_ragdoll`].
#[derive(Debug, Clone)]
pub struct SpawnedRagdoll {
    pub root: Entity,
    pub parts: Vec<SpawnedPart>,
}

/// Build the collider for a bone shape.
pub fn bone_collider(shape: &BoneShape) -> Collider {
    match *shape {
        BoneShape::Cuboid { half_extents } => {
            let size = half_extents * 2.0;
            Collider::cuboid(size.x, size.y, size.z)
        }
        BoneShape::Capsule {
            radius,
            half_length,
        } => Collider::capsule(radius, half_length * 2.0),
        BoneShape::Sphere { radius } => Collider::sphere(radius),
    }
}

/// Spawn a ragdoll standing on `origin`, turned by `yaw` around the vertical axis.
///
/// The blueprint is expected to be valid (see [`RagdollBlueprint::validate`]);
/// joints referencing missing bones are skipped with a warning.
pub fn spawn_ragdoll(
    commands: &mut Commands,
    blueprint: &RagdollBlueprint,
    origin: Vec3,
    yaw: f32,
) -> SpawnedRagdoll {
    let root = commands.spawn(Name::new("Ragdoll")).id();

    let parts: Vec<SpawnedPart> = blueprint
        .place(origin, yaw)
        .into_iter()
        .map(|placed| {
            let transform =
                Transform::from_translation(placed.position).with_rotation(placed.rotation);
            let entity = commands
                .spawn((
                    Name::new(format!("Ragdoll {}", placed.bone)),
                    RagdollPart {
                        ragdoll: root,
                        bone: placed.bone,
                    },
                    RigidBody::Dynamic,
                    bone_collider(&placed.shape),
                    ColliderDensity(placed.density),
                    LinearDamping(PART_LINEAR_DAMPING),
                    AngularDamping(PART_ANGULAR_DAMPING),
                    CollisionLayers::new(
                        GameLayer::Ragdoll,
                        [GameLayer::Ground, GameLayer::Ragdoll],
                    ),
                    transform,
                ))
                .id();
            SpawnedPart {
                bone: placed.bone,
                shape: placed.shape,
                entity,
                transform,
            }
        })
        .collect();

    let entity_of = |bone: Bone| {
        parts
            .iter()
            .find(|part| part.bone == bone)
            .map(|part| part.entity)
    };

    let mut joints = Vec::with_capacity(blueprint.joints.len());
    for joint in &blueprint.joints {
        let (Some(parent), Some(child), Some((anchor1, anchor2))) = (
            entity_of(joint.parent),
            entity_of(joint.child),
            blueprint.joint_local_anchors(joint),
        ) else {
            tracing::warn!(
                "Skipping ragdoll joint {} -> {}: bone not in blueprint",
                joint.parent,
                joint.child
            );
            continue;
        };

        let entity = commands
            .spawn((
                Name::new(format!("Ragdoll joint {} -> {}", joint.parent, joint.child)),
                SphericalJoint::new(parent, child)
                    .with_local_anchor1(anchor1)
                    .with_local_anchor2(anchor2)
                    .with_swing_limits(-joint.swing_limit, joint.swing_limit)
                    .with_twist_limits(-joint.twist_limit, joint.twist_limit),
                JointDamping {
                    linear: 0.0,
                    angular: JOINT_ANGULAR_DAMPING,
                },
                JointCollisionDisabled,
            ))
            .id();
        joints.push(entity);
    }

    commands.entity(root).insert(Ragdoll {
        parts: parts.iter().map(|part| part.entity).collect(),
        joints,
    });

    tracing::debug!(
        "Spawned ragdoll {root} at ({:.2}, {:.2}, {:.2})",
        origin.x,
        origin.y,
        origin.z
    );

    SpawnedRagdoll { root, parts }
}

/// Despawn a ragdoll's joints, parts and root.
pub fn despawn_ragdoll(commands: &mut Commands, root: Entity, ragdoll: &Ragdoll) {
    for &joint in &ragdoll.joints {
        commands.entity(joint).despawn();
    }
    for &part in &ragdoll.parts {
        commands.entity(part).despawn();
    }
    commands.entity(root).despawn();
}
