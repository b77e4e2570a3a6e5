//! Output contracts of the insertion animator.
//!
//! Events carry only handles and identifiers. Hosts forward them to their own
//! event transport (the Bevy plugin re-emits them as `InsertionOutput`).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InsertionError;
use crate::input::ValueKind;
use valuebox_animation_core::TimelineId;

/// Sequence number of an accepted submission.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u32);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch#{}", self.0)
    }
}

/// Discrete semantic signals emitted by `submit` and `tick`.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum InsertionEvent<H> {
    BatchStarted {
        batch: BatchId,
        timelines: usize,
    },
    LabelSpawned {
        batch: BatchId,
        kind: ValueKind,
        label: H,
        container: H,
        timeline: TimelineId,
    },
    /// A value could not be animated; the rest of the batch is unaffected.
    LabelSkipped {
        batch: BatchId,
        kind: ValueKind,
        reason: InsertionError,
    },
    LabelBound {
        batch: BatchId,
        kind: ValueKind,
        label: H,
        container: H,
    },
    TimelineCancelled {
        batch: BatchId,
        kind: ValueKind,
        label: H,
        container: H,
        timeline: TimelineId,
    },
    BatchFinished {
        batch: BatchId,
        bound: usize,
        cancelled: usize,
    },
    PriorLabelsCleared {
        removed: usize,
    },
}

/// Result of a submission that passed validation (or was not evaluated).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Labels were created for every kind not listed in `skipped`.
    /// `timelines == 0` means nothing could start and no batch is in flight.
    Started {
        batch: BatchId,
        timelines: usize,
        skipped: Vec<ValueKind>,
    },
    /// All fields were blank.
    Empty,
    /// A batch is still animating; the submission was ignored.
    Busy,
}

impl SubmitOutcome {
    pub fn timelines(&self) -> usize {
        match self {
            SubmitOutcome::Started { timelines, .. } => *timelines,
            _ => 0,
        }
    }
}
