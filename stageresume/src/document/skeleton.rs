//! Structural skeletons of pipeline documents.
//!
//! A skeleton keeps only stage identifiers and their sequential/parallel
//! shape. Names, descriptions, steps and every other field are dropped, so two
//! documents with equal skeletons can be retried against each other.

use super::{PipelineDocument, StageSlot};
use crate::errors::DocumentError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One position in the sequential order of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonGroup {
    /// A stage that runs on its own.
    Sequential(String),
    /// Stages that fan out together, in declaration order.
    Parallel(Vec<String>),
}

impl SkeletonGroup {
    /// Returns the identifiers in this group.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            Self::Sequential(id) => vec![id.as_str()],
            Self::Parallel(ids) => ids.iter().map(String::as_str).collect(),
        }
    }

    /// Returns true if the group contains `identifier`.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        match self {
            Self::Sequential(id) => id == identifier,
            Self::Parallel(ids) => ids.iter().any(|id| id == identifier),
        }
    }
}

/// The identifier-and-shape projection of a pipeline document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StructuralSkeleton {
    groups: Vec<SkeletonGroup>,
}

impl StructuralSkeleton {
    /// Creates a skeleton from its groups.
    #[must_use]
    pub fn new(groups: Vec<SkeletonGroup>) -> Self {
        Self { groups }
    }

    /// Extracts the skeleton of a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not have a recognizable stage layout.
    pub fn extract(document: &PipelineDocument) -> Result<Self, DocumentError> {
        Ok(Self::from_slots(&document.stage_slots()?))
    }

    pub(crate) fn from_slots(slots: &[StageSlot]) -> Self {
        let mut groups: Vec<SkeletonGroup> = Vec::new();
        let mut current_group: Option<usize> = None;

        for slot in slots {
            let identifier = slot.identifier.clone();
            if slot.path.member.is_some() && current_group == Some(slot.path.group) {
                if let Some(SkeletonGroup::Parallel(ids)) = groups.last_mut() {
                    ids.push(identifier);
                    continue;
                }
            }
            current_group = Some(slot.path.group);
            groups.push(match slot.path.member {
                Some(_) => SkeletonGroup::Parallel(vec![identifier]),
                None => SkeletonGroup::Sequential(identifier),
            });
        }

        Self { groups }
    }

    /// Returns the groups in sequential order.
    #[must_use]
    pub fn groups(&self) -> &[SkeletonGroup] {
        &self.groups
    }

    /// Returns every identifier in linear order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        self.groups.iter().flat_map(SkeletonGroup::identifiers).collect()
    }

    /// Returns the index of the group containing `identifier`.
    #[must_use]
    pub fn group_index_of(&self, identifier: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(identifier))
    }

    /// Returns true if the skeleton has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns a stable SHA-256 hex digest of the skeleton.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for group in &self.groups {
            match group {
                SkeletonGroup::Sequential(id) => {
                    hasher.update(b"S:");
                    hasher.update(id.as_bytes());
                }
                SkeletonGroup::Parallel(ids) => {
                    hasher.update(b"P:");
                    for id in ids {
                        hasher.update(id.as_bytes());
                        hasher.update(b",");
                    }
                }
            }
            hasher.update(b";");
        }
        hex::encode(hasher.finalize())
    }
}
