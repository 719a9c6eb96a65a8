//! Record, document and plan fixtures.
//!
//! The record fixtures mirror the stage layouts retries are most often
//! requested against: single stages, sequential runs, parallel fan-outs and
//! mixes of both.

use crate::core::{ExecutionStatus, StageRetryRecord};
use crate::document::PipelineDocument;
use crate::plan::{ExecutionPlan, PlanNode, StepCategory, StepType};
use serde_json::{json, Value};

fn stage(identifier: &str, parent: &str, status: ExecutionStatus) -> StageRetryRecord {
    StageRetryRecord::new(identifier)
        .with_parent_group(parent)
        .with_status(status)
}

fn chain(mut records: Vec<StageRetryRecord>) -> Vec<StageRetryRecord> {
    let parents: Vec<String> = records.iter().map(|r| r.parent_group_id.clone()).collect();
    for (i, record) in records.iter_mut().enumerate() {
        record.created_at = i64::try_from(i).unwrap_or_default() + 1;
        if let Some(next) = parents[i + 1..].iter().find(|p| **p != parents[i]) {
            record.next_group_id = Some(next.clone());
        }
    }
    records
}

/// One stage that failed.
#[must_use]
pub fn first_stage_failed() -> Vec<StageRetryRecord> {
    chain(vec![stage("stage1", "parent1", ExecutionStatus::Failed)])
}

/// Three sequential stages, the last one failed.
#[must_use]
pub fn last_stage_failed() -> Vec<StageRetryRecord> {
    chain(vec![
        stage("stage1", "parent1", ExecutionStatus::Success),
        stage("stage2", "parent2", ExecutionStatus::Success),
        stage("stage3", "parent3", ExecutionStatus::Failed),
    ])
}

/// Three stages of one parallel fan-out, one of them failed.
#[must_use]
pub fn parallel_first_group_failed() -> Vec<StageRetryRecord> {
    chain(vec![
        stage("stage1", "parent1", ExecutionStatus::Success),
        stage("stage2", "parent1", ExecutionStatus::Failed),
        stage("stage3", "parent1", ExecutionStatus::Success),
    ])
}

/// Three parallel fan-outs of three stages, failing in the last one.
#[must_use]
pub fn last_stage_parallel_and_failed() -> Vec<StageRetryRecord> {
    chain(vec![
        stage("stage1", "parent1", ExecutionStatus::Success),
        stage("stage2", "parent1", ExecutionStatus::Success),
        stage("stage3", "parent1", ExecutionStatus::Success),
        stage("stage4", "parent2", ExecutionStatus::Success),
        stage("stage5", "parent2", ExecutionStatus::Success),
        stage("stage6", "parent2", ExecutionStatus::Success),
        stage("stage7", "parent3", ExecutionStatus::Failed),
        stage("stage8", "parent3", ExecutionStatus::Success),
        stage("stage9", "parent3", ExecutionStatus::Aborted),
    ])
}

/// Three sequential stages followed by a failed parallel fan-out.
#[must_use]
pub fn mixed_stages_with_parallel_failed() -> Vec<StageRetryRecord> {
    chain(vec![
        stage("stage1", "parent1", ExecutionStatus::Success),
        stage("stage2", "parent2", ExecutionStatus::Success),
        stage("stage3", "parent3", ExecutionStatus::Success),
        stage("stage4", "parent4", ExecutionStatus::Failed),
        stage("stage5", "parent4", ExecutionStatus::Success),
        stage("stage6", "parent4", ExecutionStatus::Expired),
    ])
}

/// Sequential stages around a parallel fan-out, failing in the trailing run.
#[must_use]
pub fn mixed_stages_with_series_failed() -> Vec<StageRetryRecord> {
    chain(vec![
        stage("stage1", "parent1", ExecutionStatus::Success),
        stage("stage2", "parent2", ExecutionStatus::Success),
        stage("stage3", "parent3", ExecutionStatus::Success),
        stage("stage4", "parent4", ExecutionStatus::Success),
        stage("stage5", "parent4", ExecutionStatus::Success),
        stage("stage6", "parent4", ExecutionStatus::Success),
        stage("stage7", "parent7", ExecutionStatus::Failed),
        stage("stage8", "parent8", ExecutionStatus::Aborted),
        stage("stage9", "parent9", ExecutionStatus::Failed),
    ])
}

fn v0_stage(identifier: &str, label: &str) -> Value {
    json!({
        "stage": {
            "identifier": identifier,
            "name": identifier,
            "description": label,
            "type": "Custom",
            "spec": {
                "execution": {
                    "steps": [{
                        "step": {
                            "identifier": "ShellScript_1",
                            "type": "ShellScript",
                            "__uuid": format!("{label}-{identifier}-step")
                        }
                    }]
                }
            },
            "__uuid": format!("{label}-{identifier}")
        }
    })
}

/// A V0 document: stage1, stage2, parallel(stage3..stage5), stage6, stage7, parallel(stage8, stage9).
///
/// Every stage carries `label` as its description so the origin of each
/// stage in a hybrid document can be told apart.
#[must_use]
pub fn golden_v0_document(label: &str) -> PipelineDocument {
    let s = |id: &str| v0_stage(id, label);
    PipelineDocument::from_value(json!({
        "pipeline": {
            "identifier": "rc",
            "name": "rc",
            "stages": [
                s("stage1"),
                s("stage2"),
                {"parallel": [s("stage3"), s("stage4"), s("stage5")]},
                s("stage6"),
                s("stage7"),
                {"parallel": [s("stage8"), s("stage9")]}
            ]
        }
    }))
}

fn v1_stage(id: &str, label: &str) -> Value {
    json!({
        "id": id,
        "name": id,
        "description": label,
        "steps": [{"run": {"script": format!("echo {id}")}}]
    })
}

/// A V1 document: stage1, parallel(stage1_1, stage1_2), parallel(stage2_1, stage2_2), stage3.
#[must_use]
pub fn golden_v1_document(label: &str) -> PipelineDocument {
    let s = |id: &str| v1_stage(id, label);
    PipelineDocument::from_value(json!({
        "version": 1,
        "stages": [
            s("stage1"),
            {"parallel": {"stages": [s("stage1_1"), s("stage1_2")]}},
            {"parallel": {"stages": [s("stage2_1"), s("stage2_2")]}},
            s("stage3")
        ]
    }))
}

/// A plan for a two-stage pipeline with one step per stage.
///
/// Node uuids are `pipeline-uuid`, `stage{n}-uuid` and `step{n}-uuid`; the
/// pipeline node has no stage FQN.
#[must_use]
pub fn retry_plan() -> ExecutionPlan {
    let mut plan = ExecutionPlan::new("pipeline-uuid").with_node(
        PlanNode::new("pipeline", StepType::new("PIPELINE", StepCategory::Pipeline)).with_uuid("pipeline-uuid"),
    );
    for n in 1..=2 {
        let fqn = format!("pipeline.stages.stage{n}");
        plan = plan
            .with_node(
                PlanNode::new(format!("stage{n}"), StepType::stage("Custom"))
                    .with_uuid(format!("stage{n}-uuid"))
                    .with_name(format!("Stage {n}"))
                    .with_stage_fqn(fqn.clone()),
            )
            .with_node(
                PlanNode::new(format!("step{n}"), StepType::new("ShellScript", StepCategory::Step))
                    .with_uuid(format!("step{n}-uuid"))
                    .with_stage_fqn(format!("{fqn}.spec.execution.steps.step{n}")),
            );
    }
    plan
}
