//! End-to-end studio flow: brief → committed plan → background illustrations,
//! plus by-id slice revisions against the current plan.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use contenize_genai::GenerativeModel;
use contenize_shared::{ContenizeError, ContentBrief, ContentPlan, ContentSlice, Result};

use crate::editor::SliceEditor;
use crate::illustrator::Illustrator;
use crate::planner::PlanGenerator;
use crate::store::{MergeRejection, PlanStore, PlanUpdate, SliceChange};

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// How one illustration task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllustrationOutcome {
    /// Merged into the current plan.
    Applied,
    /// Generated, but the plan had moved on; dropped.
    Stale,
    /// The model call failed; the slice stays without an image.
    Failed,
}

/// Progress callback for the CLI (or other frontends).
pub trait StudioProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each illustration settles.
    fn illustration(&self, slice_id: &str, outcome: IllustrationOutcome, done: usize, total: usize);
}

/// No-op progress reporter.
pub struct SilentProgress;

impl StudioProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn illustration(&self, _slice_id: &str, _outcome: IllustrationOutcome, _done: usize, _total: usize) {}
}

/// Tally of a finished illustration batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IllustrationSummary {
    pub applied: usize,
    pub stale: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// IllustrationBatch
// ---------------------------------------------------------------------------

/// Handle to the illustrations spawned for one plan.
///
/// Dropping the handle detaches outstanding tasks; they still merge into the
/// store when they finish.
#[must_use = "wait on the batch or drop it to let illustrations finish in the background"]
pub struct IllustrationBatch {
    tasks: JoinSet<(String, IllustrationOutcome)>,
    total: usize,
}

impl Drop for IllustrationBatch {
    fn drop(&mut self) {
        self.tasks.detach_all();
    }
}

impl IllustrationBatch {
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Wait for every task, in completion order.
    pub async fn wait(mut self, progress: &dyn StudioProgress) -> IllustrationSummary {
        let mut summary = IllustrationSummary::default();
        let mut done = 0;

        while let Some(joined) = self.tasks.join_next().await {
            done += 1;
            let (slice_id, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "illustration task did not complete");
                    (String::new(), IllustrationOutcome::Failed)
                }
            };

            match outcome {
                IllustrationOutcome::Applied => summary.applied += 1,
                IllustrationOutcome::Stale => summary.stale += 1,
                IllustrationOutcome::Failed => summary.failed += 1,
            }
            progress.illustration(&slice_id, outcome, done, self.total);
        }

        info!(
            applied = summary.applied,
            stale = summary.stale,
            failed = summary.failed,
            "illustrations settled"
        );
        summary
    }
}

// ---------------------------------------------------------------------------
// ContentStudio
// ---------------------------------------------------------------------------

/// Owns the components and the shared plan.
pub struct ContentStudio {
    planner: PlanGenerator,
    illustrator: Illustrator,
    editor: SliceEditor,
    store: Arc<PlanStore>,
}

impl ContentStudio {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            planner: PlanGenerator::new(model.clone()),
            illustrator: Illustrator::new(model.clone()),
            editor: SliceEditor::new(model),
            store: Arc::new(PlanStore::new()),
        }
    }

    pub fn store(&self) -> &PlanStore {
        &self.store
    }

    /// A copy of the current plan.
    pub fn current_plan(&self) -> Option<ContentPlan> {
        self.store.snapshot()
    }

    /// Validate `brief`, generate a plan, commit it, then start illustrating.
    ///
    /// The plan is committed before any illustration request is issued.
    #[instrument(skip_all, fields(company = %brief.company_name))]
    pub async fn generate(
        &self,
        brief: &ContentBrief,
        progress: &dyn StudioProgress,
    ) -> Result<(ContentPlan, IllustrationBatch)> {
        let start = Instant::now();
        brief.validate()?;

        progress.phase("Generating strategy");
        let plan = self.planner.generate_plan(brief).await?;
        self.store.commit(plan.clone());
        info!(
            plan_id = %plan.id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "plan committed"
        );

        progress.phase("Illustrating assets");
        let batch = self.illustrate_pending()?;
        Ok((plan, batch))
    }

    /// Make a previously saved plan current.
    pub fn load(&self, plan: ContentPlan) {
        info!(plan_id = %plan.id, "loading plan");
        self.store.commit(plan);
    }

    /// Spawn one illustration task per slice of the current plan that has no image yet.
    pub fn illustrate_pending(&self) -> Result<IllustrationBatch> {
        let plan = self
            .store
            .snapshot()
            .ok_or_else(|| ContenizeError::validation("no plan to illustrate"))?;

        let mut tasks = JoinSet::new();
        for slice in plan.slices.iter().filter(|s| s.image.is_none()) {
            let illustrator = self.illustrator.clone();
            let store = self.store.clone();
            let brand = plan.brand_analysis.clone();
            let slice = slice.clone();
            let plan_id = plan.id;

            tasks.spawn(async move {
                let outcome = match illustrator.illustrate(&slice, &brand).await {
                    Ok(image) => {
                        let update = PlanUpdate {
                            plan_id,
                            slice_id: slice.id.clone(),
                            change: SliceChange::Image(image),
                        };
                        match store.apply(update) {
                            Ok(()) => IllustrationOutcome::Applied,
                            Err(MergeRejection::StalePlan { .. }) => IllustrationOutcome::Stale,
                            Err(rejection) => {
                                warn!(slice = %slice.id, %rejection, "illustration not merged");
                                IllustrationOutcome::Failed
                            }
                        }
                    }
                    Err(e) => {
                        warn!(slice = %slice.id, error = %e, "illustration failed");
                        IllustrationOutcome::Failed
                    }
                };
                (slice.id, outcome)
            });
        }

        let total = tasks.len();
        Ok(IllustrationBatch { tasks, total })
    }

    /// Revise one slice of the current plan and merge the result.
    ///
    /// Returns the updated slice. Editor failures propagate unchanged.
    #[instrument(skip_all, fields(slice = %slice_id))]
    pub async fn revise(&self, slice_id: &str, instruction: &str) -> Result<ContentSlice> {
        let plan = self
            .store
            .snapshot()
            .ok_or_else(|| ContenizeError::validation("no plan loaded"))?;
        let slice = plan
            .slice(slice_id)
            .ok_or_else(|| ContenizeError::validation(format!("plan has no slice '{slice_id}'")))?;

        let revision = self.editor.revise_slice(slice, instruction).await?;

        self.store
            .apply(PlanUpdate {
                plan_id: plan.id,
                slice_id: slice_id.to_string(),
                change: SliceChange::Revision(revision),
            })
            .map_err(|rejection| match rejection {
                MergeRejection::StalePlan { .. } => {
                    ContenizeError::Edit("the plan was replaced while the edit was running".into())
                }
                other => ContenizeError::Edit(other.to_string()),
            })?;

        self.store
            .snapshot()
            .and_then(|p| p.slice(slice_id).cloned())
            .ok_or_else(|| ContenizeError::Edit(format!("slice '{slice_id}' disappeared")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use contenize_genai::UpstreamError;
    use contenize_genai::mock::MockModel;
    use contenize_shared::{Channel, InlineImage};

    fn brief() -> ContentBrief {
        ContentBrief {
            company_name: "Acme SaaS".into(),
            company_website: "https://acme.example".into(),
            industry: "Fintech".into(),
            objective: "Drive free trials".into(),
            target_audience: "CTOs".into(),
            core_content: "Real-time payments are here.".into(),
            selected_channels: vec![Channel::LinkedinPost, Channel::InstagramReel, Channel::Twitter],
            attachments: vec![],
        }
    }

    fn plan_text() -> String {
        let slice = |id: &str, channel: &str| {
            json!({
                "id": id, "channel": channel, "format": "Post", "hook": "H", "body": "B",
                "callToAction": "C", "estimatedEffort": "Low", "imagePrompt": format!("art for {id}")
            })
        };
        json!({
            "strategyName": "Push",
            "executiveSummary": "Summary",
            "brandAnalysis": {
                "tone": "Bold", "voice": "Direct", "personality": "Curious",
                "suggestedColors": ["#000000"]
            },
            "slices": [slice("l1", "linkedin_post"), slice("r1", "instagram_reel"), slice("t1", "twitter")]
        })
        .to_string()
    }

    fn png(tag: &str) -> InlineImage {
        InlineImage {
            mime_type: "image/png".into(),
            data: tag.into(),
        }
    }

    /// Reverse completion order: the first slice finishes last.
    fn staggered_images(request: &contenize_genai::ImageRequest) -> (Duration, std::result::Result<InlineImage, UpstreamError>) {
        let delay = if request.prompt.ends_with("l1") {
            30
        } else if request.prompt.ends_with("r1") {
            15
        } else {
            1
        };
        let tag = request.prompt.rsplit(' ').next().unwrap_or_default().to_string();
        (Duration::from_millis(delay), Ok(png(&tag)))
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        settled: Mutex<Vec<String>>,
    }

    impl StudioProgress for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn illustration(&self, slice_id: &str, _outcome: IllustrationOutcome, _done: usize, _total: usize) {
            self.settled.lock().unwrap().push(slice_id.to_string());
        }
    }

    #[tokio::test]
    async fn out_of_order_illustrations_all_land() {
        let model = Arc::new(
            MockModel::new()
                .with_text(plan_text())
                .with_images(staggered_images),
        );
        let studio = ContentStudio::new(model.clone());
        let progress = RecordingProgress::default();

        let (plan, batch) = studio.generate(&brief(), &progress).await.unwrap();
        assert_eq!(plan.illustrated_count(), 0);
        assert_eq!(batch.len(), 3);

        let summary = batch.wait(&progress).await;
        assert_eq!(summary, IllustrationSummary { applied: 3, stale: 0, failed: 0 });
        assert_eq!(*progress.settled.lock().unwrap(), vec!["t1", "r1", "l1"]);

        let current = studio.current_plan().unwrap();
        assert_eq!(current.slice_ids(), vec!["l1", "r1", "t1"]);
        assert_eq!(current.slice("l1").unwrap().image, Some(png("l1")));
        assert_eq!(current.slice("r1").unwrap().image, Some(png("r1")));
        assert_eq!(current.slice("t1").unwrap().image, Some(png("t1")));

        let aspects: Vec<String> = model
            .image_requests()
            .into_iter()
            .map(|r| r.aspect_ratio)
            .collect();
        assert!(aspects.contains(&"9:16".to_string()));
        assert_eq!(aspects.iter().filter(|a| *a == "16:9").count(), 2);
    }

    #[tokio::test]
    async fn failed_illustration_leaves_slice_without_image() {
        let model = Arc::new(MockModel::new().with_text(plan_text()).with_images(|r| {
            if r.prompt.ends_with("r1") {
                (Duration::ZERO, Err(UpstreamError::NoImage))
            } else {
                (Duration::ZERO, Ok(png("ok")))
            }
        }));
        let studio = ContentStudio::new(model);

        let (_, batch) = studio.generate(&brief(), &SilentProgress).await.unwrap();
        let summary = batch.wait(&SilentProgress).await;
        assert_eq!(summary.applied, 2);
        assert_eq!(summary.failed, 1);

        let current = studio.current_plan().unwrap();
        assert!(current.slice("r1").unwrap().image.is_none());
    }

    #[tokio::test]
    async fn illustrations_for_replaced_plan_are_discarded() {
        let model = Arc::new(
            MockModel::new()
                .with_text(plan_text())
                .with_text(plan_text())
                .with_images(|_| (Duration::from_millis(20), Ok(png("late")))),
        );
        let studio = ContentStudio::new(model);

        let (first, first_batch) = studio.generate(&brief(), &SilentProgress).await.unwrap();
        let (second, second_batch) = studio.generate(&brief(), &SilentProgress).await.unwrap();
        assert_ne!(first.id, second.id);

        let stale = first_batch.wait(&SilentProgress).await;
        assert_eq!(stale.stale, 3);
        let fresh = second_batch.wait(&SilentProgress).await;
        assert_eq!(fresh.applied, 3);

        let current = studio.current_plan().unwrap();
        assert_eq!(current.id, second.id);
        assert_eq!(current.illustrated_count(), 3);
    }

    #[tokio::test]
    async fn dropped_batch_still_illustrates() {
        let model = Arc::new(
            MockModel::new()
                .with_text(plan_text())
                .with_images(|_| (Duration::from_millis(10), Ok(png("bg")))),
        );
        let studio = ContentStudio::new(model);

        let (plan, batch) = studio.generate(&brief(), &SilentProgress).await.unwrap();
        drop(batch);

        let mut rx = studio.store().subscribe();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let illustrated = rx.borrow_and_update().as_ref().map(ContentPlan::illustrated_count);
                if illustrated == Some(3) {
                    break;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        let current = studio.current_plan().unwrap();
        assert_eq!(current.id, plan.id);
        assert_eq!(current.slice("l1").unwrap().image, Some(png("bg")));
    }

    #[tokio::test]
    async fn overlapping_batches_count_duplicates_as_failed() {
        let model = Arc::new(
            MockModel::new()
                .with_text(plan_text())
                .with_images(|_| (Duration::from_millis(20), Ok(png("dup")))),
        );
        let studio = ContentStudio::new(model);

        let (_, first) = studio.generate(&brief(), &SilentProgress).await.unwrap();
        let second = studio.illustrate_pending().unwrap();
        assert_eq!(second.len(), 3);

        let a = first.wait(&SilentProgress).await;
        let b = second.wait(&SilentProgress).await;
        assert_eq!(a.applied + b.applied, 3);
        assert_eq!(a.failed + b.failed, 3);
        assert_eq!(a.stale + b.stale, 0);
        assert_eq!(studio.current_plan().unwrap().illustrated_count(), 3);
    }

    #[tokio::test]
    async fn invalid_brief_never_reaches_the_model() {
        let model = Arc::new(MockModel::new());
        let studio = ContentStudio::new(model.clone());
        let mut bad = brief();
        bad.selected_channels.clear();

        let err = studio.generate(&bad, &SilentProgress).await.err().unwrap();
        assert!(matches!(err, ContenizeError::Validation { .. }));
        assert!(model.structured_requests().is_empty());
        assert!(studio.current_plan().is_none());
    }

    #[tokio::test]
    async fn generation_failure_commits_nothing() {
        let model = Arc::new(MockModel::new().with_text("   "));
        let studio = ContentStudio::new(model.clone());

        assert!(studio.generate(&brief(), &SilentProgress).await.is_err());
        assert!(studio.current_plan().is_none());
        assert!(model.image_requests().is_empty());
    }

    #[tokio::test]
    async fn revise_merges_by_id() {
        let model = Arc::new(
            MockModel::new()
                .with_text(plan_text())
                .with_text(r#"{"callToAction":"Book a demo"}"#),
        );
        let studio = ContentStudio::new(model);
        let (plan, batch) = studio.generate(&brief(), &SilentProgress).await.unwrap();
        batch.wait(&SilentProgress).await;

        let slice = studio.revise("r1", "stronger CTA").await.unwrap();
        assert_eq!(slice.call_to_action, "Book a demo");

        let current = studio.current_plan().unwrap();
        assert_eq!(current.slice("r1").unwrap().call_to_action, "Book a demo");
        assert_eq!(current.slice("l1"), plan.slice("l1"));
    }

    #[tokio::test]
    async fn revise_failure_propagates_and_keeps_plan() {
        let model = Arc::new(MockModel::new().with_text(plan_text()).with_text("not json"));
        let studio = ContentStudio::new(model);
        let (_, batch) = studio.generate(&brief(), &SilentProgress).await.unwrap();
        batch.wait(&SilentProgress).await;
        let before = studio.current_plan();

        let err = studio.revise("l1", "rewrite").await.unwrap_err();
        assert!(matches!(err, ContenizeError::Edit(_)));
        assert_eq!(studio.current_plan(), before);
    }

    #[tokio::test]
    async fn revise_unknown_slice_is_validation_error() {
        let model = Arc::new(MockModel::new().with_text(plan_text()));
        let studio = ContentStudio::new(model);
        let (_, batch) = studio.generate(&brief(), &SilentProgress).await.unwrap();
        batch.wait(&SilentProgress).await;

        let err = studio.revise("missing", "rewrite").await.unwrap_err();
        assert!(matches!(err, ContenizeError::Validation { .. }));
    }
}
