//! Skeleton resolution from multi-entry archives
//!
//! An archive may pack several skeleton definitions (body plus attachments
//! such as weapons or capes). Export either asks for one entry by name or
//! takes the whole skeleton set, ordered so the primary body rig comes
//! first.

use crate::skeleton::Skeleton;
use lodestar_core::Result;
use lodestar_formats::{ArchiveEntry, ArchiveFile, SkeletonFile};
use std::cmp::Ordering;

/// Archive entries with this suffix are skeleton definitions
pub const SKELETON_SUFFIX: &str = ".skl";

/// Marker identifying the primary body rig among several skeleton entries
pub const PRIMARY_BODY_MARKER: &str = "body.skl";

/// Outcome of resolving skeletons from an archive
#[derive(Debug)]
pub enum SkeletonLookup {
    /// The resolved candidate set, possibly empty when the archive packs
    /// no skeletons at all
    Found(Vec<Skeleton>),
    /// A specific entry was requested but nothing matched; carries every
    /// available skeleton entry name so the operator can self-correct
    NotFound {
        requested: String,
        available: Vec<String>,
    },
}

impl SkeletonLookup {
    /// The skeleton set to bind, empty on the not-found path
    pub fn into_skeletons(self) -> Vec<Skeleton> {
        match self {
            SkeletonLookup::Found(skeletons) => skeletons,
            SkeletonLookup::NotFound { .. } => Vec::new(),
        }
    }
}

/// Default priority for unrequested lookups: entries carrying the primary
/// body marker sort first; ties keep archive order (the sort is stable)
pub fn primary_body_first(a: &str, b: &str) -> Ordering {
    let a_primary = a.to_ascii_lowercase().contains(PRIMARY_BODY_MARKER);
    let b_primary = b.to_ascii_lowercase().contains(PRIMARY_BODY_MARKER);
    b_primary.cmp(&a_primary)
}

/// True when an entry name matches the requested skeleton name: equal, or
/// ending in the request after a path separator, case-insensitively
pub fn matches_requested(entry_name: &str, requested: &str) -> bool {
    let entry = entry_name.to_ascii_lowercase();
    let requested = requested.to_ascii_lowercase();
    entry == requested
        || entry.ends_with(&format!("/{}", requested))
        || entry.ends_with(&format!("\\{}", requested))
}

fn is_skeleton_entry(entry: &ArchiveEntry) -> bool {
    entry.name.to_ascii_lowercase().ends_with(SKELETON_SUFFIX)
}

fn skeleton_display_name(entry_name: &str) -> String {
    entry_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(entry_name)
        .trim_end_matches(SKELETON_SUFFIX)
        .to_string()
}

fn load_entry(entry: &ArchiveEntry) -> Result<Skeleton> {
    let file = SkeletonFile::open(&entry.data)?;
    Ok(Skeleton::from_file(skeleton_display_name(&entry.name), &file))
}

/// Resolve skeletons with the default priority ordering
pub fn lookup_skeletons(archive: &ArchiveFile, requested: Option<&str>) -> Result<SkeletonLookup> {
    lookup_skeletons_with(archive, requested, primary_body_first)
}

/// Resolve skeletons from an archive.
///
/// With a requested name, exactly the first matching entry is loaded;
/// zero matches yields the `NotFound` listing. Without one, every
/// skeleton entry is loaded, ordered by `priority`. The archive itself is
/// never mutated.
pub fn lookup_skeletons_with<F>(
    archive: &ArchiveFile,
    requested: Option<&str>,
    priority: F,
) -> Result<SkeletonLookup>
where
    F: Fn(&str, &str) -> Ordering,
{
    let skeleton_entries: Vec<&ArchiveEntry> =
        archive.entries.iter().filter(|e| is_skeleton_entry(e)).collect();

    match requested {
        Some(name) => {
            match skeleton_entries
                .iter()
                .find(|e| matches_requested(&e.name, name))
            {
                Some(entry) => Ok(SkeletonLookup::Found(vec![load_entry(entry)?])),
                None => Ok(SkeletonLookup::NotFound {
                    requested: name.to_string(),
                    available: skeleton_entries.iter().map(|e| e.name.clone()).collect(),
                }),
            }
        }
        None => {
            let mut ordered = skeleton_entries;
            ordered.sort_by(|a, b| priority(&a.name, &b.name));
            let mut skeletons = Vec::with_capacity(ordered.len());
            for entry in ordered {
                skeletons.push(load_entry(entry)?);
            }
            Ok(SkeletonLookup::Found(skeletons))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_formats::SkeletonJoint;

    fn skl_bytes(root_name: &str) -> Vec<u8> {
        SkeletonFile {
            joints: vec![SkeletonJoint::root(root_name)],
        }
        .to_bytes()
    }

    fn sample_archive() -> ArchiveFile {
        ArchiveFile {
            entries: vec![
                ArchiveEntry {
                    name: "chara/arm.skl".to_string(),
                    data: skl_bytes("arm_root"),
                },
                ArchiveEntry {
                    name: "chara/body.skl".to_string(),
                    data: skl_bytes("body_root"),
                },
                ArchiveEntry {
                    name: "chara/tail.skl".to_string(),
                    data: skl_bytes("tail_root"),
                },
                ArchiveEntry {
                    name: "chara/body_d.tex".to_string(),
                    data: vec![0, 1, 2],
                },
            ],
        }
    }

    #[test]
    fn test_unrequested_lookup_returns_all_body_first() {
        let lookup = lookup_skeletons(&sample_archive(), None).unwrap();
        let skeletons = lookup.into_skeletons();
        let names: Vec<&str> = skeletons.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["body", "arm", "tail"]);
    }

    #[test]
    fn test_requested_exact_name() {
        let lookup = lookup_skeletons(&sample_archive(), Some("chara/tail.skl")).unwrap();
        let skeletons = lookup.into_skeletons();
        assert_eq!(skeletons.len(), 1);
        assert_eq!(skeletons[0].name, "tail");
    }

    #[test]
    fn test_requested_suffix_match_is_case_insensitive() {
        let lookup = lookup_skeletons(&sample_archive(), Some("BODY.SKL")).unwrap();
        let skeletons = lookup.into_skeletons();
        assert_eq!(skeletons.len(), 1);
        assert_eq!(skeletons[0].name, "body");
        assert_eq!(skeletons[0].joints()[0].name, "body_root");
    }

    #[test]
    fn test_requested_missing_lists_available_entries() {
        let lookup = lookup_skeletons(&sample_archive(), Some("wings.skl")).unwrap();
        match lookup {
            SkeletonLookup::NotFound {
                requested,
                available,
            } => {
                assert_eq!(requested, "wings.skl");
                assert_eq!(
                    available,
                    vec!["chara/arm.skl", "chara/body.skl", "chara/tail.skl"]
                );
            }
            SkeletonLookup::Found(_) => panic!("expected NotFound"),
        }
    }

    #[test]
    fn test_suffix_requires_separator_boundary() {
        // "body.skl" must not match "ribody.skl"
        let archive = ArchiveFile {
            entries: vec![ArchiveEntry {
                name: "chara/ribody.skl".to_string(),
                data: skl_bytes("rib"),
            }],
        };
        let lookup = lookup_skeletons(&archive, Some("body.skl")).unwrap();
        assert!(matches!(lookup, SkeletonLookup::NotFound { .. }));
    }

    #[test]
    fn test_priority_is_overridable() {
        let lookup = lookup_skeletons_with(&sample_archive(), None, |a, b| a.cmp(b)).unwrap();
        let names: Vec<String> = lookup
            .into_skeletons()
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(names, vec!["arm", "body", "tail"]);
    }
}
