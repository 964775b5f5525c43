//! Skeleton container codec

use crate::binio::{Reader, Writer};
use lodestar_core::{LodestarError, Result};

pub const SKELETON_MAGIC: &[u8; 4] = b"LSKL";
const SKELETON_VERSION: u16 = 1;

/// A joint as stored in a skeleton container: name, parent index into the
/// same container, local TRS pose
#[derive(Debug, Clone)]
pub struct SkeletonJoint {
    pub name: String,
    pub parent: Option<usize>,
    pub translation: [f32; 3],
    /// Quaternion xyzw
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl SkeletonJoint {
    /// A root joint with an identity pose
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            translation: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

/// Parsed skeleton container
#[derive(Debug, Clone)]
pub struct SkeletonFile {
    pub joints: Vec<SkeletonJoint>,
}

impl SkeletonFile {
    /// Parse a skeleton container from bytes.
    ///
    /// Validates the hierarchy invariants: parent indices in range and no
    /// cycles anywhere in the parent graph.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        r.expect_magic(SKELETON_MAGIC)?;
        let version = r.read_u16()?;
        if version != SKELETON_VERSION {
            return Err(LodestarError::FormatError(format!(
                "unsupported skeleton container version {}",
                version
            )));
        }

        let joint_count = r.read_u16()? as usize;
        let mut joints = Vec::with_capacity(joint_count);
        for _ in 0..joint_count {
            let name = r.read_string()?;
            let parent = match r.read_i32()? {
                -1 => None,
                p if p >= 0 && (p as usize) < joint_count => Some(p as usize),
                p => {
                    return Err(LodestarError::SkeletonError(format!(
                        "joint '{}' has parent index {} outside the {}-joint table",
                        name, p, joint_count
                    )))
                }
            };
            joints.push(SkeletonJoint {
                name,
                parent,
                translation: r.read_f32_array::<3>()?,
                rotation: r.read_f32_array::<4>()?,
                scale: r.read_f32_array::<3>()?,
            });
        }

        let skeleton = Self { joints };
        skeleton.check_acyclic()?;
        Ok(skeleton)
    }

    /// Serialize to container bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_magic(SKELETON_MAGIC);
        w.write_u16(SKELETON_VERSION);
        w.write_u16(self.joints.len() as u16);
        for joint in &self.joints {
            w.write_string(&joint.name);
            w.write_i32(joint.parent.map(|p| p as i32).unwrap_or(-1));
            w.write_f32_array(&joint.translation);
            w.write_f32_array(&joint.rotation);
            w.write_f32_array(&joint.scale);
        }
        w.into_bytes()
    }

    fn check_acyclic(&self) -> Result<()> {
        for (index, joint) in self.joints.iter().enumerate() {
            let mut steps = 0;
            let mut current = joint.parent;
            while let Some(parent) = current {
                if parent == index {
                    return Err(LodestarError::SkeletonError(format!(
                        "cycle in joint hierarchy through '{}'",
                        joint.name
                    )));
                }
                steps += 1;
                if steps > self.joints.len() {
                    return Err(LodestarError::SkeletonError(format!(
                        "cycle in joint hierarchy through '{}'",
                        joint.name
                    )));
                }
                current = self.joints[parent].parent;
            }
        }
        Ok(())
    }
}
