// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TF slice planning and the transformer wire formats.
//!
//! An STF is divided into `slices_per_sample` contiguous TF ranges; the last
//! slice absorbs the remainder so the ranges partition `[0, tfs_per_stf - 1]`.

use crate::naming::slice_tf_filename;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contiguous TF range within an STF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceBounds {
    pub slice_id: u32,
    pub tf_first: u32,
    pub tf_last: u32,
    pub tf_count: u32,
}

/// Partition `[0, tfs_per_stf - 1]` into `slices_per_sample` contiguous ranges.
///
/// Integer division sizes every slice; the last one extends to the final TF.
/// Zero slices or zero TFs yield an empty plan.
pub fn plan_slices(slices_per_sample: u32, tfs_per_stf: u32) -> Vec<SliceBounds> {
    if slices_per_sample == 0 || tfs_per_stf == 0 {
        return Vec::new();
    }
    let tfs_per_slice = (tfs_per_stf / slices_per_sample).max(1);
    let mut slices = Vec::with_capacity(slices_per_sample as usize);
    for i in 0..slices_per_sample {
        let tf_first = i * tfs_per_slice;
        if tf_first >= tfs_per_stf {
            break;
        }
        let tf_last = if i + 1 == slices_per_sample {
            tfs_per_stf - 1
        } else {
            ((i + 1) * tfs_per_slice - 1).min(tfs_per_stf - 1)
        };
        slices.push(SliceBounds {
            slice_id: i,
            tf_first,
            tf_last,
            tf_count: tf_last - tf_first + 1,
        });
    }
    slices
}

/// Payload of a `slice` message on the transformer queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceContent {
    pub run_id: u64,
    pub execution_id: String,
    /// Fresh UUID per dispatched slice.
    pub req_id: String,
    /// Parent STF filename.
    pub filename: String,
    pub tf_filename: String,
    pub slice_id: u32,
    pub start: u32,
    pub end: u32,
    pub tf_count: u32,
    pub state: String,
    pub substate: String,
}

impl SliceContent {
    pub fn new(
        run_id: u64,
        execution_id: &str,
        stf_filename: &str,
        bounds: SliceBounds,
    ) -> Self {
        Self {
            run_id,
            execution_id: execution_id.to_string(),
            req_id: uuid::Uuid::new_v4().to_string(),
            filename: stf_filename.to_string(),
            tf_filename: slice_tf_filename(stf_filename, bounds.slice_id),
            slice_id: bounds.slice_id,
            start: bounds.tf_first,
            end: bounds.tf_last,
            tf_count: bounds.tf_count,
            state: "queued".to_string(),
            substate: "new".to_string(),
        }
    }
}

/// Full `slice` message as published to the transformer queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceMessage {
    pub msg_type: String,
    pub run_id: u64,
    pub created_at: String,
    pub content: SliceContent,
}

impl SliceMessage {
    pub fn new(run_id: u64, content: SliceContent) -> Self {
        Self {
            msg_type: "slice".to_string(),
            run_id,
            created_at: crate::now_iso(),
            content,
        }
    }
}

/// `content` of a `slice_result` message from a transformer worker.
///
/// Workers nest the actual outcome two levels deep; every field is optional
/// because worker implementations vary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceResultContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panda_task_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panda_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvester_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_start_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SliceResultOuter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceResultOuter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SliceResultInner>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceResultInner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tf_filename: Option<String>,
    #[serde(default)]
    pub processed: bool,
}

impl SliceResultContent {
    fn inner(&self) -> Option<&SliceResultInner> {
        self.result.as_ref()?.result.as_ref()
    }

    /// The slice this result refers to, when the worker reported one.
    pub fn slice_id(&self) -> Option<u32> {
        self.inner()?.slice_id
    }

    /// A result counts as done when the worker reports `state == "done"` or
    /// the inner payload claims `processed`.
    pub fn is_done(&self) -> bool {
        self.state.as_deref() == Some("done") || self.inner().is_some_and(|r| r.processed)
    }
}

#[cfg(test)]
#[path = "slice_tests.rs"]
mod tests;
