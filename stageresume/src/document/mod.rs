//! Pipeline documents and their stage layout.
//!
//! A document is an already-parsed YAML/JSON tree. The retry core only cares
//! about where stages sit: which identifiers appear, in what order, and which
//! of them share a parallel fan-out. Two layouts are understood:
//!
//! - [`PipelineVersion::V0`]: `pipeline.stages[]`, each item either
//!   `{ stage: { identifier, .. } }` or `{ parallel: [ { stage: .. }, .. ] }`.
//! - [`PipelineVersion::V1`]: top-level `stages[]` (with `version: 1`), each
//!   item either a stage object keyed by `id` or
//!   `{ parallel: { stages: [ .. ] } }`.

mod eligibility;
mod skeleton;
mod splitter;

pub use eligibility::{is_retry_valid, skeletons_match};
pub use skeleton::{SkeletonGroup, StructuralSkeleton};
pub use splitter::{split, split_yaml, SplitOutcome, SplitSummary};

use crate::errors::DocumentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Layout version of a pipeline document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVersion {
    /// `pipeline.stages` with `stage` / `parallel` wrappers.
    #[default]
    V0,
    /// Top-level `stages` with `id` keyed stages.
    V1,
}

impl PipelineVersion {
    /// Detects the layout version from a document root.
    #[must_use]
    pub fn detect(root: &Value) -> Self {
        match root.get("version") {
            Some(Value::Number(n)) if n.as_u64() == Some(1) => Self::V1,
            Some(Value::String(s)) if s.trim() == "1" => Self::V1,
            _ => Self::V0,
        }
    }
}

/// Location of a stage inside a document's stage list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StagePath {
    /// Index of the top-level item (sequential group position).
    pub group: usize,
    /// Index inside a parallel item, if the stage is a parallel member.
    pub member: Option<usize>,
}

/// One stage of a linearized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StageSlot {
    /// Stage identifier.
    pub identifier: String,
    /// Where the stage sits.
    pub path: StagePath,
}

/// A parsed pipeline document.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDocument {
    root: Value,
    version: PipelineVersion,
}

impl PipelineDocument {
    /// Wraps an already-parsed tree, detecting its layout version.
    #[must_use]
    pub fn from_value(root: Value) -> Self {
        let version = PipelineVersion::detect(&root);
        Self { root, version }
    }

    /// Parses YAML (or JSON, which is valid YAML) text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is blank or not valid YAML.
    pub fn from_yaml(text: &str) -> Result<Self, DocumentError> {
        if text.trim().is_empty() {
            return Err(DocumentError::Empty);
        }
        let root: Value = serde_yaml::from_str(text)?;
        Ok(Self::from_value(root))
    }

    /// Overrides the detected layout version.
    #[must_use]
    pub fn with_version(mut self, version: PipelineVersion) -> Self {
        self.version = version;
        self
    }

    /// Returns the layout version.
    #[must_use]
    pub fn version(&self) -> PipelineVersion {
        self.version
    }

    /// Returns the document tree.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Consumes the document, returning its tree.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.root
    }

    /// Returns true if the document holds no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.root {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Renders the document as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(&self.root)?)
    }

    /// Renders the document as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml_string(&self) -> Result<String, DocumentError> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    fn stage_list_path(&self) -> &'static str {
        match self.version {
            PipelineVersion::V0 => "pipeline.stages",
            PipelineVersion::V1 => "stages",
        }
    }

    fn stage_list(&self) -> Result<&Vec<Value>, DocumentError> {
        let list = match self.version {
            PipelineVersion::V0 => self.root.get("pipeline").and_then(|p| p.get("stages")),
            PipelineVersion::V1 => self.root.get("stages"),
        };
        list.and_then(Value::as_array)
            .ok_or_else(|| DocumentError::layout(self.stage_list_path(), "expected a list of stages"))
    }

    fn stage_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        let list = match self.version {
            PipelineVersion::V0 => self
                .root
                .get_mut("pipeline")
                .and_then(|p| p.get_mut("stages")),
            PipelineVersion::V1 => self.root.get_mut("stages"),
        };
        list.and_then(Value::as_array_mut)
    }

    /// Returns the members of a parallel item, or `None` if the item is a stage.
    fn parallel_members<'a>(&self, item: &'a Value) -> Option<Option<&'a Vec<Value>>> {
        let parallel = item.get("parallel")?;
        Some(match self.version {
            PipelineVersion::V0 => parallel.as_array(),
            PipelineVersion::V1 => parallel.get("stages").and_then(Value::as_array),
        })
    }

    fn stage_identifier(&self, item: &Value, path: &str) -> Result<String, DocumentError> {
        let identifier = match self.version {
            PipelineVersion::V0 => item.get("stage").and_then(|s| s.get("identifier")),
            PipelineVersion::V1 => item.get("id").or_else(|| item.get("identifier")),
        };
        identifier
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| DocumentError::layout(path, "expected a stage with an identifier"))
    }

    /// Lists every stage in linear order together with its location.
    pub(crate) fn stage_slots(&self) -> Result<Vec<StageSlot>, DocumentError> {
        let base = self.stage_list_path();
        let mut slots = Vec::new();

        for (group, item) in self.stage_list()?.iter().enumerate() {
            let item_path = format!("{base}[{group}]");
            match self.parallel_members(item) {
                Some(Some(members)) => {
                    for (member, stage) in members.iter().enumerate() {
                        let member_path = format!("{item_path}.parallel[{member}]");
                        if stage.get("parallel").is_some() {
                            return Err(DocumentError::layout(
                                member_path,
                                "nested parallel groups are not supported",
                            ));
                        }
                        slots.push(StageSlot {
                            identifier: self.stage_identifier(stage, &member_path)?,
                            path: StagePath {
                                group,
                                member: Some(member),
                            },
                        });
                    }
                }
                Some(None) => {
                    return Err(DocumentError::layout(
                        item_path,
                        "expected a list of parallel stages",
                    ));
                }
                None => slots.push(StageSlot {
                    identifier: self.stage_identifier(item, &item_path)?,
                    path: StagePath {
                        group,
                        member: None,
                    },
                }),
            }
        }

        Ok(slots)
    }

    /// Returns the stage item at `path`.
    pub(crate) fn stage_at(&self, path: StagePath) -> Option<&Value> {
        let item = self.stage_list().ok()?.get(path.group)?;
        match path.member {
            None => Some(item),
            Some(member) => self.parallel_members(item)??.get(member),
        }
    }

    /// Replaces the stage item at `path`, returning false if it does not exist.
    pub(crate) fn replace_stage_at(&mut self, path: StagePath, stage: Value) -> bool {
        let version = self.version;
        let Some(item) = self
            .stage_list_mut()
            .and_then(|list| list.get_mut(path.group))
        else {
            return false;
        };

        let slot = match path.member {
            None => Some(item),
            Some(member) => {
                let members = match version {
                    PipelineVersion::V0 => item.get_mut("parallel"),
                    PipelineVersion::V1 => item
                        .get_mut("parallel")
                        .and_then(|p| p.get_mut("stages")),
                };
                members
                    .and_then(Value::as_array_mut)
                    .and_then(|m| m.get_mut(member))
            }
        };

        match slot {
            Some(slot) => {
                *slot = stage;
                true
            }
            None => false,
        }
    }
}
