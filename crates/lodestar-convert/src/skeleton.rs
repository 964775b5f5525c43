//! Runtime skeleton graph with generated-joint extension
//!
//! A skeleton graph is loaded once (from a skeleton container, an archive
//! entry, or a model's joint table) and then shared read-only by export
//! binding, or tracked mutably by LOD assembly. Joints authored in the
//! source always keep their indices; joints synthesized for unknown bone
//! names are appended after them and never reordered.

use lodestar_formats::{GeneratedJointRecord, ModelFile, SkeletonFile};
use lodestar_import::{ExportJoint, ExportSkeleton};
use std::collections::HashMap;

/// A single joint in the graph
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub parent: Option<usize>,
    pub translation: [f32; 3],
    /// Quaternion xyzw
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
    /// True for joints synthesized during import rather than authored
    pub generated: bool,
}

impl Joint {
    fn authored(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
            translation: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 1.0],
            generated: false,
        }
    }

    fn synthesized(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            generated: true,
            ..Self::authored(name, parent)
        }
    }
}

/// Ordered, name-indexed joint hierarchy
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    pub name: String,
    joints: Vec<Joint>,
    by_name: HashMap<String, usize>,
}

impl Skeleton {
    /// Build a graph from a parsed skeleton container
    pub fn from_file(name: impl Into<String>, file: &SkeletonFile) -> Self {
        let mut skeleton = Self {
            name: name.into(),
            ..Default::default()
        };
        for joint in &file.joints {
            skeleton.push(Joint {
                name: joint.name.clone(),
                parent: joint.parent,
                translation: joint.translation,
                rotation: joint.rotation,
                scale: joint.scale,
                generated: false,
            });
        }
        skeleton
    }

    /// Build a flat graph from a model container's joint table: the
    /// authored prefix becomes root-level authored joints, the persisted
    /// generated records re-enter as generated joints
    pub fn from_model(name: impl Into<String>, model: &ModelFile) -> Self {
        let mut skeleton = Self {
            name: name.into(),
            ..Default::default()
        };
        for joint_name in &model.joint_names[..model.authored_joint_count()] {
            skeleton.push(Joint::authored(joint_name.clone(), None));
        }
        skeleton.adopt_generated_records(&model.generated_joints);
        skeleton
    }

    fn push(&mut self, joint: Joint) {
        self.by_name
            .entry(joint.name.clone())
            .or_insert(self.joints.len());
        self.joints.push(joint);
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn authored_count(&self) -> usize {
        self.joints.iter().filter(|j| !j.generated).count()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The deterministic parent for generated joints: the first authored
    /// root joint. `None` when the graph has no authored joints, in which
    /// case generated joints become roots themselves.
    pub fn fallback_parent(&self) -> Option<usize> {
        self.joints
            .iter()
            .position(|j| !j.generated && j.parent.is_none())
    }

    /// Synthesize one generated joint per name not already present.
    ///
    /// Names already in the graph (authored or generated) are skipped, so
    /// re-running with the same set is a no-op. Existing joints are never
    /// removed or reordered. Returns the indices of the joints added by
    /// this call.
    pub fn extend_with_generated<'a, I>(&mut self, names: I) -> Vec<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let fallback = self.fallback_parent();
        let mut added = Vec::new();
        for name in names {
            if self.contains(name) {
                continue;
            }
            added.push(self.joints.len());
            self.push(Joint::synthesized(name, fallback));
        }
        added
    }

    /// Re-adopt generated joints persisted in a model container, resolving
    /// each record's parent by name
    pub fn adopt_generated_records(&mut self, records: &[GeneratedJointRecord]) {
        for record in records {
            if self.contains(&record.name) {
                continue;
            }
            let parent = record
                .parent
                .as_deref()
                .and_then(|p| self.find(p))
                .filter(|&p| !self.joints[p].generated)
                .or_else(|| self.fallback_parent());
            self.push(Joint::synthesized(record.name.clone(), parent));
        }
    }

    /// Persistable records for the graph's generated joints, in order
    pub fn generated_records(&self) -> Vec<GeneratedJointRecord> {
        self.joints
            .iter()
            .filter(|j| j.generated)
            .map(|j| GeneratedJointRecord {
                name: j.name.clone(),
                parent: j.parent.map(|p| self.joints[p].name.clone()),
            })
            .collect()
    }

    /// The form handed to the interchange scene writer
    pub fn to_export(&self) -> ExportSkeleton {
        ExportSkeleton {
            name: self.name.clone(),
            joints: self
                .joints
                .iter()
                .map(|j| ExportJoint {
                    name: j.name.clone(),
                    parent: j.parent,
                    translation: j.translation,
                    rotation: j.rotation,
                    scale: j.scale,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_formats::SkeletonJoint;

    fn base_skeleton() -> Skeleton {
        let file = SkeletonFile {
            joints: vec![
                SkeletonJoint::root("root"),
                SkeletonJoint {
                    parent: Some(0),
                    ..SkeletonJoint::root("spine")
                },
                SkeletonJoint {
                    parent: Some(1),
                    ..SkeletonJoint::root("head")
                },
            ],
        };
        Skeleton::from_file("body", &file)
    }

    #[test]
    fn test_extension_is_idempotent() {
        let mut skeleton = base_skeleton();
        let added = skeleton.extend_with_generated(["tail_tip_03", "cape_a"]);
        assert_eq!(added.len(), 2);
        assert_eq!(skeleton.joint_count(), 5);

        let added_again = skeleton.extend_with_generated(["tail_tip_03", "cape_a"]);
        assert!(added_again.is_empty());
        assert_eq!(skeleton.joint_count(), 5);
    }

    #[test]
    fn test_generated_joints_attach_to_fallback_never_to_generated() {
        let mut skeleton = base_skeleton();
        skeleton.extend_with_generated(["tail_a", "tail_b", "tail_c"]);
        let fallback = skeleton.fallback_parent().unwrap();
        for joint in skeleton.joints().iter().filter(|j| j.generated) {
            let parent = joint.parent.unwrap();
            assert_eq!(parent, fallback);
            assert!(!skeleton.joints()[parent].generated);
        }
    }

    #[test]
    fn test_authored_indices_are_stable_across_extensions() {
        let mut skeleton = base_skeleton();
        let before: Vec<(String, Option<usize>)> = skeleton
            .joints()
            .iter()
            .map(|j| (j.name.clone(), j.parent))
            .collect();

        skeleton.extend_with_generated(["x"]);
        skeleton.extend_with_generated(["y", "z"]);

        for (i, (name, parent)) in before.iter().enumerate() {
            assert_eq!(&skeleton.joints()[i].name, name);
            assert_eq!(&skeleton.joints()[i].parent, parent);
        }
        assert_eq!(skeleton.find("spine"), Some(1));
    }

    #[test]
    fn test_names_already_authored_are_not_regenerated() {
        let mut skeleton = base_skeleton();
        let added = skeleton.extend_with_generated(["spine", "tail"]);
        assert_eq!(added.len(), 1);
        assert_eq!(skeleton.joints()[added[0]].name, "tail");
    }

    #[test]
    fn test_empty_skeleton_generates_roots() {
        let mut skeleton = Skeleton::default();
        skeleton.extend_with_generated(["a", "b"]);
        assert_eq!(skeleton.joint_count(), 2);
        assert!(skeleton.joints().iter().all(|j| j.parent.is_none()));
    }

    #[test]
    fn test_generated_records_roundtrip_through_model() {
        let mut skeleton = base_skeleton();
        skeleton.extend_with_generated(["tail_tip_03"]);
        let records = skeleton.generated_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "tail_tip_03");
        assert_eq!(records[0].parent.as_deref(), Some("root"));

        let mut reloaded = base_skeleton();
        reloaded.adopt_generated_records(&records);
        let index = reloaded.find("tail_tip_03").unwrap();
        assert!(reloaded.joints()[index].generated);
        assert_eq!(reloaded.joints()[index].parent, reloaded.find("root"));
    }

    #[test]
    fn test_from_model_rebuilds_generated_range() {
        let model = ModelFile {
            joint_names: vec![
                "root".to_string(),
                "spine".to_string(),
                "cape_a".to_string(),
            ],
            generated_joints: vec![GeneratedJointRecord {
                name: "cape_a".to_string(),
                parent: Some("spine".to_string()),
            }],
            lods: vec![],
        };
        let skeleton = Skeleton::from_model("hero", &model);
        assert_eq!(skeleton.joint_count(), 3);
        assert_eq!(skeleton.authored_count(), 2);
        let cape = skeleton.find("cape_a").unwrap();
        assert!(skeleton.joints()[cape].generated);
        assert_eq!(skeleton.joints()[cape].parent, skeleton.find("spine"));
    }
}
