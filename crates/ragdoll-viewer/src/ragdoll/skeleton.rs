//! Ragdoll blueprint: bones, collision shapes and joints.
//!
//! Pure data and geometry with no Bevy dependencies, so the figure layout can
//! be validated and tested in isolation. All positions are expressed in the
//! blueprint frame: Y is up, the figure stands upright facing +Z, and every
//! bone's rest rotation is the identity.

use std::{collections::HashSet, f32::consts::PI, fmt};

use glam::{Quat, Vec3};

/// A named body part of the ragdoll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bone {
    Pelvis,
    Torso,
    Head,
    UpperArmLeft,
    LowerArmLeft,
    UpperArmRight,
    LowerArmRight,
    ThighLeft,
    ShinLeft,
    ThighRight,
    ShinRight,
}

impl Bone {
    /// Human-readable bone name, used for entity names and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pelvis => "pelvis",
            Self::Torso => "torso",
            Self::Head => "head",
            Self::UpperArmLeft => "upper arm (L)",
            Self::LowerArmLeft => "lower arm (L)",
            Self::UpperArmRight => "upper arm (R)",
            Self::LowerArmRight => "lower arm (R)",
            Self::ThighLeft => "thigh (L)",
            Self::ShinLeft => "shin (L)",
            Self::ThighRight => "thigh (R)",
            Self::ShinRight => "shin (R)",
        }
    }
}

impl fmt::Display for Bone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collision shape of a bone, centered on the bone position.
///
/// Capsules are aligned with the bone's local Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoneShape {
    Cuboid { half_extents: Vec3 },
    Capsule { radius: f32, half_length: f32 },
    Sphere { radius: f32 },
}

impl BoneShape {
    /// Half of the shape's extent along the local Y axis.
    pub fn half_height(&self) -> f32 {
        match *self {
            Self::Cuboid { half_extents } => half_extents.y,
            Self::Capsule {
                radius,
                half_length,
            } => half_length + radius,
            Self::Sphere { radius } => radius,
        }
    }

    fn has_positive_dimensions(&self) -> bool {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        match *self {
            Self::Cuboid { half_extents } => half_extents.to_array().into_iter().all(positive),
            Self::Capsule {
                radius,
                half_length,
            } => positive(radius) && positive(half_length),
            Self::Sphere { radius } => positive(radius),
        }
    }
}

/// A bone of the blueprint.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneSpec {
    pub bone: Bone,
    pub shape: BoneShape,
    /// Center of the shape in the blueprint frame.
    pub position: Vec3,
    /// Collider density in kg/m^3.
    pub density: f32,
}

/// A ball-and-socket connection between two bones.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSpec {
    pub parent: Bone,
    pub child: Bone,
    /// Pivot point in the blueprint frame.
    pub anchor: Vec3,
    /// Maximum swing away from the rest direction, in radians.
    pub swing_limit: f32,
    /// Maximum twist around the bone axis, in radians.
    pub twist_limit: f32,
}

/// World-space pose of a bone after placing a blueprint.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBone {
    pub bone: Bone,
    pub shape: BoneShape,
    pub density: f32,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Reasons a blueprint cannot be turned into a ragdoll.
#[derive(Debug, Clone, PartialEq)]
pub enum SkeletonError {
    /// A bone has a zero, negative or non-finite dimension or density.
    InvalidShape(Bone),
    /// The same bone appears twice.
    DuplicateBone(Bone),
    /// A joint references a bone that is not part of the blueprint.
    MissingBone(Bone),
    /// A joint connects a bone to itself.
    SelfJoint(Bone),
    /// A bone is the child of more than one joint.
    MultipleParents(Bone),
    /// The blueprint does not have exactly one root bone.
    RootCount(usize),
    /// A bone cannot be reached from the root through joints.
    Unreachable(Bone),
    /// A joint limit is outside `[0, PI]`.
    InvalidLimit { parent: Bone, child: Bone },
}

impl fmt::Display for SkeletonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidShape(bone) => write!(f, "bone '{bone}' has an invalid shape or density"),
            Self::DuplicateBone(bone) => write!(f, "bone '{bone}' is defined more than once"),
            Self::MissingBone(bone) => write!(f, "joint references undefined bone '{bone}'"),
            Self::SelfJoint(bone) => write!(f, "bone '{bone}' is jointed to itself"),
            Self::MultipleParents(bone) => write!(f, "bone '{bone}' has more than one parent"),
            Self::RootCount(count) => write!(f, "expected exactly one root bone, found {count}"),
            Self::Unreachable(bone) => write!(f, "bone '{bone}' is not connected to the root"),
            Self::InvalidLimit { parent, child } => {
                write!(f, "joint '{parent}' -> '{child}' has a limit outside [0, PI]")
            }
        }
    }
}

impl std::error::Error for SkeletonError {}

/// Bones and joints making up a ragdoll.
#[derive(Debug, Clone, PartialEq)]
pub struct RagdollBlueprint {
    pub bones: Vec<BoneSpec>,
    pub joints: Vec<JointSpec>,
}

/// Density used for every bone of the default figure (roughly that of water).
const BODY_DENSITY: f32 = 1000.0;

impl RagdollBlueprint {
    /// The default 11-bone humanoid, roughly 1.7 m tall.
    ///
    /// Arms hang alongside the torso. Left is +X.
    pub fn humanoid() -> Self {
        let bone = |bone, shape, position| BoneSpec {
            bone,
            shape,
            position,
            density: BODY_DENSITY,
        };
        let capsule = |radius, half_length| BoneShape::Capsule {
            radius,
            half_length,
        };
        let joint = |parent, child, anchor, swing_limit, twist_limit| JointSpec {
            parent,
            child,
            anchor,
            swing_limit,
            twist_limit,
        };

        let bones = vec![
            bone(
                Bone::Pelvis,
                BoneShape::Cuboid {
                    half_extents: Vec3::new(0.15, 0.10, 0.09),
                },
                Vec3::new(0.0, 0.95, 0.0),
            ),
            bone(
                Bone::Torso,
                BoneShape::Cuboid {
                    half_extents: Vec3::new(0.17, 0.20, 0.10),
                },
                Vec3::new(0.0, 1.27, 0.0),
            ),
            bone(
                Bone::Head,
                BoneShape::Sphere { radius: 0.11 },
                Vec3::new(0.0, 1.62, 0.0),
            ),
            bone(
                Bone::UpperArmLeft,
                capsule(0.045, 0.12),
                Vec3::new(0.23, 1.30, 0.0),
            ),
            bone(
                Bone::LowerArmLeft,
                capsule(0.04, 0.12),
                Vec3::new(0.23, 1.01, 0.0),
            ),
            bone(
                Bone::UpperArmRight,
                capsule(0.045, 0.12),
                Vec3::new(-0.23, 1.30, 0.0),
            ),
            bone(
                Bone::LowerArmRight,
                capsule(0.04, 0.12),
                Vec3::new(-0.23, 1.01, 0.0),
            ),
            bone(
                Bone::ThighLeft,
                capsule(0.065, 0.15),
                Vec3::new(0.09, 0.66, 0.0),
            ),
            bone(
                Bone::ShinLeft,
                capsule(0.05, 0.16),
                Vec3::new(0.09, 0.25, 0.0),
            ),
            bone(
                Bone::ThighRight,
                capsule(0.065, 0.15),
                Vec3::new(-0.09, 0.66, 0.0),
            ),
            bone(
                Bone::ShinRight,
                capsule(0.05, 0.16),
                Vec3::new(-0.09, 0.25, 0.0),
            ),
        ];

        let joints = vec![
            joint(
                Bone::Pelvis,
                Bone::Torso,
                Vec3::new(0.0, 1.06, 0.0),
                0.35,
                0.3,
            ),
            joint(
                Bone::Torso,
                Bone::Head,
                Vec3::new(0.0, 1.50, 0.0),
                0.6,
                0.5,
            ),
            joint(
                Bone::Torso,
                Bone::UpperArmLeft,
                Vec3::new(0.23, 1.44, 0.0),
                1.4,
                0.8,
            ),
            joint(
                Bone::UpperArmLeft,
                Bone::LowerArmLeft,
                Vec3::new(0.23, 1.15, 0.0),
                1.2,
                0.2,
            ),
            joint(
                Bone::Torso,
                Bone::UpperArmRight,
                Vec3::new(-0.23, 1.44, 0.0),
                1.4,
                0.8,
            ),
            joint(
                Bone::UpperArmRight,
                Bone::LowerArmRight,
                Vec3::new(-0.23, 1.15, 0.0),
                1.2,
                0.2,
            ),
            joint(
                Bone::Pelvis,
                Bone::ThighLeft,
                Vec3::new(0.09, 0.86, 0.0),
                1.0,
                0.4,
            ),
            joint(
                Bone::ThighLeft,
                Bone::ShinLeft,
                Vec3::new(0.09, 0.45, 0.0),
                1.1,
                0.1,
            ),
            joint(
                Bone::Pelvis,
                Bone::ThighRight,
                Vec3::new(-0.09, 0.86, 0.0),
                1.0,
                0.4,
            ),
            joint(
                Bone::ThighRight,
                Bone::ShinRight,
                Vec3::new(-0.09, 0.45, 0.0),
                1.1,
                0.1,
            ),
        ];

        Self { bones, joints }
    }

    /// Look up a bone's spec.
    pub fn bone(&self, bone: Bone) -> Option<&BoneSpec> {
        self.bones.iter().find(|spec| spec.bone == bone)
    }

    /// Check that the blueprint describes a single connected tree of valid bones.
    pub fn validate(&self) -> Result<(), SkeletonError> {
        let mut seen = HashSet::new();
        for spec in &self.bones {
            if !seen.insert(spec.bone) {
                return Err(SkeletonError::DuplicateBone(spec.bone));
            }
            if !spec.shape.has_positive_dimensions()
                || !(spec.density.is_finite() && spec.density > 0.0)
            {
                return Err(SkeletonError::InvalidShape(spec.bone));
            }
        }

        let mut children = HashSet::new();
        for joint in &self.joints {
            for bone in [joint.parent, joint.child] {
                if !seen.contains(&bone) {
                    return Err(SkeletonError::MissingBone(bone));
                }
            }
            if joint.parent == joint.child {
                return Err(SkeletonError::SelfJoint(joint.parent));
            }
            if !children.insert(joint.child) {
                return Err(SkeletonError::MultipleParents(joint.child));
            }
            let in_range = |limit: f32| (0.0..=PI).contains(&limit);
            if !in_range(joint.swing_limit) || !in_range(joint.twist_limit) {
                return Err(SkeletonError::InvalidLimit {
                    parent: joint.parent,
                    child: joint.child,
                });
            }
        }

        let roots: Vec<Bone> = self
            .bones
            .iter()
            .map(|spec| spec.bone)
            .filter(|bone| !children.contains(bone))
            .collect();
        let &[root] = roots.as_slice() else {
            return Err(SkeletonError::RootCount(roots.len()));
        };

        // Walk down from the root; anything left over sits on a detached cycle.
        let mut reached = HashSet::from([root]);
        let mut frontier = vec![root];
        while let Some(bone) = frontier.pop() {
            for joint in self.joints.iter().filter(|joint| joint.parent == bone) {
                if reached.insert(joint.child) {
                    frontier.push(joint.child);
                }
            }
        }
        if let Some(spec) = self.bones.iter().find(|spec| !reached.contains(&spec.bone)) {
            return Err(SkeletonError::Unreachable(spec.bone));
        }

        Ok(())
    }

    /// The joint anchor expressed in the parent's and the child's local frames.
    ///
    /// Returns `None` if either bone is missing.
    pub fn joint_local_anchors(&self, joint: &JointSpec) -> Option<(Vec3, Vec3)> {
        let parent = self.bone(joint.parent)?;
        let child = self.bone(joint.child)?;
        Some((joint.anchor - parent.position, joint.anchor - child.position))
    }

    /// Lowest point of any bone shape, in the blueprint frame.
    pub fn min_y(&self) -> f32 {
        self.bones
            .iter()
            .map(|spec| spec.position.y - spec.shape.half_height())
            .fold(f32::INFINITY, f32::min)
    }

    /// Vertical extent of the figure.
    pub fn height(&self) -> f32 {
        let max_y = self
            .bones
            .iter()
            .map(|spec| spec.position.y + spec.shape.half_height())
            .fold(f32::NEG_INFINITY, f32::max);
        max_y - self.min_y()
    }

    /// World poses for every bone, with the figure's lowest point at `origin`
    /// and the whole figure turned by `yaw` radians around the vertical axis.
    pub fn place(&self, origin: Vec3, yaw: f32) -> Vec<PlacedBone> {
        let rotation = Quat::from_rotation_y(yaw);
        let lift = Vec3::Y * self.min_y();
        self.bones
            .iter()
            .map(|spec| PlacedBone {
                bone: spec.bone,
                shape: spec.shape,
                density: spec.density,
                position: origin + rotation * (spec.position - lift),
                rotation,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_humanoid_is_valid() {
        let blueprint = RagdollBlueprint::humanoid();
        assert_eq!(blueprint.validate(), Ok(()));
        assert_eq!(blueprint.bones.len(), 11);
        assert_eq!(blueprint.joints.len(), blueprint.bones.len() - 1);
    }

    #[test]
    fn test_humanoid_is_mirrored() {
        let blueprint = RagdollBlueprint::humanoid();
        for (left, right) in [
            (Bone::UpperArmLeft, Bone::UpperArmRight),
            (Bone::LowerArmLeft, Bone::LowerArmRight),
            (Bone::ThighLeft, Bone::ThighRight),
            (Bone::ShinLeft, Bone::ShinRight),
        ] {
            let left = blueprint.bone(left).unwrap();
            let right = blueprint.bone(right).unwrap();
            assert_eq!(left.shape, right.shape);
            assert_eq!(left.position * Vec3::new(-1.0, 1.0, 1.0), right.position);
        }
    }

    #[test]
    fn test_humanoid_height() {
        let blueprint = RagdollBlueprint::humanoid();
        let height = blueprint.height();
        assert!((1.5..2.0).contains(&height), "height was {height}");
        assert!(blueprint.min_y() >= 0.0);
    }

    /// Radius of a sphere around the bone center enclosing the shape.
    fn bounding_radius(shape: &BoneShape) -> f32 {
        match *shape {
            BoneShape::Cuboid { half_extents } => half_extents.length(),
            BoneShape::Capsule {
                radius,
                half_length,
            } => half_length + radius,
            BoneShape::Sphere { radius } => radius,
        }
    }

    #[test]
    fn test_joint_anchors_touch_both_bones() {
        const MARGIN: f32 = 0.05;
        let blueprint = RagdollBlueprint::humanoid();
        for joint in &blueprint.joints {
            for bone in [joint.parent, joint.child] {
                let spec = blueprint.bone(bone).unwrap();
                let distance = joint.anchor.distance(spec.position);
                assert!(
                    distance <= bounding_radius(&spec.shape) + MARGIN,
                    "anchor of {} -> {} is {distance} from {bone}",
                    joint.parent,
                    joint.child,
                );
            }
        }
    }

    #[test]
    fn test_duplicate_bone_rejected() {
        let mut blueprint = RagdollBlueprint::humanoid();
        let head = blueprint.bone(Bone::Head).unwrap().clone();
        blueprint.bones.push(head);
        assert_eq!(
            blueprint.validate(),
            Err(SkeletonError::DuplicateBone(Bone::Head))
        );
    }

    #[test]
    fn test_invalid_shape_rejected() {
        let mut blueprint = RagdollBlueprint::humanoid();
        blueprint.bones[2].shape = BoneShape::Sphere { radius: 0.0 };
        assert_eq!(
            blueprint.validate(),
            Err(SkeletonError::InvalidShape(Bone::Head))
        );

        let mut blueprint = RagdollBlueprint::humanoid();
        blueprint.bones[0].density = f32::NAN;
        assert_eq!(
            blueprint.validate(),
            Err(SkeletonError::InvalidShape(Bone::Pelvis))
        );
    }

    #[test]
    fn test_missing_bone_rejected() {
        let mut blueprint = RagdollBlueprint::humanoid();
        blueprint.bones.retain(|spec| spec.bone != Bone::ShinRight);
        assert_eq!(
            blueprint.validate(),
            Err(SkeletonError::MissingBone(Bone::ShinRight))
        );
    }

    #[test]
    fn test_multiple_parents_rejected() {
        let mut blueprint = RagdollBlueprint::humanoid();
        let mut extra = blueprint.joints[1].clone();
        extra.parent = Bone::Pelvis;
        blueprint.joints.push(extra);
        assert_eq!(
            blueprint.validate(),
            Err(SkeletonError::MultipleParents(Bone::Head))
        );
    }

    #[test]
    fn test_self_joint_rejected() {
        let mut blueprint = RagdollBlueprint::humanoid();
        blueprint.joints[0].child = Bone::Pelvis;
        assert_eq!(
            blueprint.validate(),
            Err(SkeletonError::SelfJoint(Bone::Pelvis))
        );
    }

    #[test]
    fn test_detached_cycle_rejected() {
        let mut blueprint = RagdollBlueprint::humanoid();
        // Re-parent the left thigh onto the left shin: thigh <-> shin form a loop.
        for joint in &mut blueprint.joints {
            if joint.child == Bone::ThighLeft {
                joint.parent = Bone::ShinLeft;
            }
        }
        assert!(matches!(
            blueprint.validate(),
            Err(SkeletonError::Unreachable(Bone::ThighLeft | Bone::ShinLeft))
        ));
    }

    #[test]
    fn test_two_roots_rejected() {
        let mut blueprint = RagdollBlueprint::humanoid();
        blueprint.joints.retain(|joint| joint.child != Bone::Head);
        assert_eq!(blueprint.validate(), Err(SkeletonError::RootCount(2)));
    }

    #[test]
    fn test_invalid_limit_rejected() {
        let mut blueprint = RagdollBlueprint::humanoid();
        blueprint.joints[3].swing_limit = -0.1;
        assert_eq!(
            blueprint.validate(),
            Err(SkeletonError::InvalidLimit {
                parent: Bone::UpperArmLeft,
                child: Bone::LowerArmLeft,
            })
        );
    }

    #[test]
    fn test_place_rests_on_origin() {
        let blueprint = RagdollBlueprint::humanoid();
        let origin = Vec3::new(2.0, 1.0, -3.0);
        let placed = blueprint.place(origin, 0.0);
        let lowest = placed
            .iter()
            .map(|bone| bone.position.y - bone.shape.half_height())
            .fold(f32::INFINITY, f32::min);
        assert!((lowest - origin.y).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn place_preserves_bone_distances(
            yaw in -10.0f32..10.0,
            x in -50.0f32..50.0,
            y in -5.0f32..50.0,
            z in -50.0f32..50.0,
        ) {
            let blueprint = RagdollBlueprint::humanoid();
            let placed = blueprint.place(Vec3::new(x, y, z), yaw);
            for (i, a) in placed.iter().enumerate() {
                for b in &placed[i + 1..] {
                    let before = blueprint.bone(a.bone).unwrap().position
                        .distance(blueprint.bone(b.bone).unwrap().position);
                    let after = a.position.distance(b.position);
                    prop_assert!((before - after).abs() < 1e-3);
                }
            }
        }

        #[test]
        fn local_anchors_agree_in_world_space(yaw in -10.0f32..10.0) {
            let blueprint = RagdollBlueprint::humanoid();
            let placed = blueprint.place(Vec3::ZERO, yaw);
            let pose = |bone| placed.iter().find(|p| p.bone == bone).unwrap();
            for joint in &blueprint.joints {
                let (local_parent, local_child) = blueprint.joint_local_anchors(joint).unwrap();
                let parent = pose(joint.parent);
                let child = pose(joint.child);
                let from_parent = parent.position + parent.rotation * local_parent;
                let from_child = child.position + child.rotation * local_child;
                prop_assert!(from_parent.distance(from_child) < 1e-4);
            }
        }
    }
}
