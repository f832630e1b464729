//! The shared, observable content plan.
//!
//! The current plan lives in a `tokio::sync::watch` channel. Every update is
//! tagged with the plan it was issued for and applied as a read-modify-write
//! against the latest value, so concurrent completions never overwrite each
//! other and late results from a replaced plan are dropped.

use tokio::sync::watch;
use tracing::{debug, warn};

use contenize_shared::{ContentPlan, InlineImage, PlanId, SliceRevision};

/// What an update changes on its slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceChange {
    /// A finished illustration.
    Image(InlineImage),
    /// An accepted text revision.
    Revision(SliceRevision),
}

/// A change addressed to one slice of one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanUpdate {
    pub plan_id: PlanId,
    pub slice_id: String,
    pub change: SliceChange,
}

/// Why an update was not applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeRejection {
    #[error("update targets plan {update} but the current plan is {current}")]
    StalePlan { update: PlanId, current: PlanId },

    #[error("plan has no slice '{0}'")]
    UnknownSlice(String),

    #[error("slice '{0}' already has an image")]
    AlreadyIllustrated(String),

    #[error("no plan has been committed")]
    NoPlan,
}

/// Apply `update` to `current`, returning the next plan.
///
/// Pure: `current` is never modified. Only the addressed slice is replaced,
/// and only the field the change names.
pub fn merge(current: &ContentPlan, update: &PlanUpdate) -> Result<ContentPlan, MergeRejection> {
    if update.plan_id != current.id {
        return Err(MergeRejection::StalePlan {
            update: update.plan_id,
            current: current.id,
        });
    }

    let index = current
        .slices
        .iter()
        .position(|s| s.id == update.slice_id)
        .ok_or_else(|| MergeRejection::UnknownSlice(update.slice_id.clone()))?;
    let slice = &current.slices[index];

    let replacement = match &update.change {
        SliceChange::Image(image) => {
            if slice.image.is_some() {
                return Err(MergeRejection::AlreadyIllustrated(slice.id.clone()));
            }
            slice.with_image(image.clone())
        }
        SliceChange::Revision(revision) => slice.revised(revision),
    };

    let mut next = current.clone();
    next.slices[index] = replacement;
    Ok(next)
}

/// Holder of the current plan.
#[derive(Debug)]
pub struct PlanStore {
    tx: watch::Sender<Option<ContentPlan>>,
}

impl Default for PlanStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Make `plan` the current plan, superseding any previous one.
    pub fn commit(&self, plan: ContentPlan) {
        debug!(plan_id = %plan.id, slices = plan.slices.len(), "committing plan");
        self.tx.send_replace(Some(plan));
    }

    /// Merge `update` into the latest plan.
    pub fn apply(&self, update: PlanUpdate) -> Result<(), MergeRejection> {
        let mut outcome = Ok(());

        self.tx.send_if_modified(|current| match current {
            None => {
                outcome = Err(MergeRejection::NoPlan);
                false
            }
            Some(plan) => match merge(plan, &update) {
                Ok(next) => {
                    *plan = next;
                    true
                }
                Err(rejection) => {
                    outcome = Err(rejection);
                    false
                }
            },
        });

        if let Err(rejection) = &outcome {
            match rejection {
                MergeRejection::StalePlan { .. } => {
                    debug!(slice = %update.slice_id, %rejection, "discarding stale update");
                }
                _ => warn!(slice = %update.slice_id, %rejection, "update rejected"),
            }
        }

        outcome
    }

    /// A copy of the current plan.
    pub fn snapshot(&self) -> Option<ContentPlan> {
        self.tx.borrow().clone()
    }

    pub fn current_id(&self) -> Option<PlanId> {
        self.tx.borrow().as_ref().map(|p| p.id)
    }

    /// Observe plan changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<ContentPlan>> {
        self.tx.subscribe()
    }
}
