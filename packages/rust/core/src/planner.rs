//! Plan generation: one structured request in, one [`ContentPlan`] out.
//!
//! The brief is embedded in a single instruction together with a strict
//! response schema. The reply must contain exactly one slice per requested
//! channel; anything less fails generation rather than returning a partial plan.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use contenize_genai::{GenerativeModel, StructuredRequest, decode_json};
use contenize_shared::{
    BrandAnalysis, Channel, ContenizeError, ContentBrief, ContentPlan, ContentSlice, Effort,
    GenerationErrorKind, OptimizationScores, PlanId, Result,
};

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    strategy_name: String,
    executive_summary: String,
    brand_analysis: BrandAnalysis,
    slices: Vec<RawSlice>,
    #[serde(default)]
    implementation_steps: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSlice {
    #[serde(default)]
    id: String,
    channel: String,
    #[serde(default)]
    format: String,
    #[serde(default)]
    hook: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    call_to_action: String,
    #[serde(default = "default_effort")]
    estimated_effort: Effort,
    #[serde(default)]
    image_prompt: String,
    #[serde(default)]
    seo_title: Option<String>,
    #[serde(default)]
    seo_description: Option<String>,
    #[serde(default)]
    primary_keyword: Option<String>,
    #[serde(default)]
    alt_text: Option<String>,
    #[serde(default)]
    direct_answer_snippet: Option<String>,
    #[serde(default)]
    seo_score: Option<f64>,
    #[serde(default)]
    aeo_score: Option<f64>,
    #[serde(default)]
    geo_score: Option<f64>,
}

fn default_effort() -> Effort {
    Effort::Medium
}

// ---------------------------------------------------------------------------
// PlanGenerator
// ---------------------------------------------------------------------------

/// Turns a [`ContentBrief`] into a [`ContentPlan`] with one model call.
#[derive(Clone)]
pub struct PlanGenerator {
    model: Arc<dyn GenerativeModel>,
}

impl PlanGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Generate a plan for `brief`.
    ///
    /// The brief is expected to be validated by the caller. No retries.
    #[instrument(skip_all, fields(company = %brief.company_name, channels = brief.selected_channels.len()))]
    pub async fn generate_plan(&self, brief: &ContentBrief) -> Result<ContentPlan> {
        let request = StructuredRequest {
            prompt: build_prompt(brief),
            schema: plan_schema(&brief.selected_channels),
            attachments: brief.attachments.clone(),
            grounded: true,
        };

        let response = self
            .model
            .generate_structured(request)
            .await
            .map_err(|e| ContenizeError::generation(e.generation_kind(), e.to_string()))?;

        let raw: RawPlan = decode_json(&response)
            .map_err(|e| ContenizeError::generation(e.generation_kind(), e.to_string()))?;

        let plan = assemble_plan(raw, &brief.selected_channels)?;

        info!(
            plan_id = %plan.id,
            strategy = %plan.strategy_name,
            slices = plan.slices.len(),
            "content plan generated"
        );

        Ok(plan)
    }
}

/// Build the natural-language instruction for `brief`.
fn build_prompt(brief: &ContentBrief) -> String {
    let channel_lines: String = brief
        .selected_channels
        .iter()
        .map(|c| format!("    - `{}` ({})\n", c.as_str(), c.label()))
        .collect();

    let attachment_note = if brief.attachments.is_empty() {
        String::new()
    } else {
        format!(
            "\n    {} supporting file(s) are attached; treat them as part of the core content.\n",
            brief.attachments.len()
        )
    };

    format!(
        r#"
    Act as a world-class content strategist and brand analyst.

    STEP 1: RESEARCH
    Use the company website {website} and company name {company} to identify their brand identity,
    tone of voice, personality, primary colors, and the SEO keywords (with search intent) they should own.

    STEP 2: CONTENT PIPELINE
    Using the "Turkey Slicing Method", take the following "Core Content" and slice it into a multi-channel pipeline.

    Industry: {industry}
    Objective: {objective}
    Target Audience: {audience}
{attachment_note}
    Core Content:
    {content}

    Guidelines:
    1. Produce exactly one slice for each of these channels, in this order, using the channel id verbatim:
{channel_lines}    2. For each slice, create a highly specific 'imagePrompt' that an AI image generator can use to create
       a visual matching the brand's aesthetic and the channel format.
    3. Give each slice an SEO title, primary keyword, alt text, and a 'directAnswerSnippet' written to be quoted
       verbatim by answer engines, plus SEO/AEO/GEO fitness scores from 0 to 100.
    4. Ensure the tone matches the brand identity discovered from the website.
    5. Finish with short, ordered implementation steps for rolling out the pipeline.
  "#,
        website = brief.company_website,
        company = brief.company_name,
        industry = brief.industry,
        objective = brief.objective,
        audience = brief.target_audience,
        content = brief.core_content,
    )
}

/// Response schema for a plan covering `channels`.
fn plan_schema(channels: &[Channel]) -> Value {
    let channel_ids: Vec<&str> = channels.iter().map(Channel::as_str).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "strategyName": { "type": "STRING" },
            "executiveSummary": { "type": "STRING" },
            "brandAnalysis": {
                "type": "OBJECT",
                "properties": {
                    "tone": { "type": "STRING" },
                    "toneSentiment": { "type": "STRING" },
                    "voice": { "type": "STRING" },
                    "voiceSentiment": { "type": "STRING" },
                    "personality": { "type": "STRING" },
                    "suggestedColors": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "brandKeywords": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "seoKeywords": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "term": { "type": "STRING" },
                                "intent": {
                                    "type": "STRING",
                                    "enum": ["Informational", "Transactional", "Navigational", "Commercial"]
                                }
                            },
                            "required": ["term", "intent"]
                        }
                    }
                },
                "required": ["tone", "voice", "personality", "suggestedColors"]
            },
            "slices": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "channel": { "type": "STRING", "enum": channel_ids },
                        "format": { "type": "STRING" },
                        "hook": { "type": "STRING" },
                        "body": { "type": "STRING" },
                        "callToAction": { "type": "STRING" },
                        "estimatedEffort": { "type": "STRING", "enum": ["Low", "Medium", "High"] },
                        "imagePrompt": { "type": "STRING" },
                        "seoTitle": { "type": "STRING" },
                        "seoDescription": { "type": "STRING" },
                        "primaryKeyword": { "type": "STRING" },
                        "altText": { "type": "STRING" },
                        "directAnswerSnippet": { "type": "STRING" },
                        "seoScore": { "type": "INTEGER" },
                        "aeoScore": { "type": "INTEGER" },
                        "geoScore": { "type": "INTEGER" }
                    },
                    "required": [
                        "id", "channel", "format", "hook", "body",
                        "callToAction", "estimatedEffort", "imagePrompt"
                    ]
                }
            },
            "implementationSteps": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["strategyName", "executiveSummary", "brandAnalysis", "slices"]
    })
}

/// Normalize a channel id as returned by the model.
fn normalize_channel(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
}

/// Reconcile the raw response with the requested channels.
///
/// Slices follow the requested order; the first slice wins for a channel that
/// appears twice and unrequested channels are dropped. Upstream ids are kept
/// when usable, otherwise `<channel>-<n>` is assigned.
fn assemble_plan(raw: RawPlan, channels: &[Channel]) -> Result<ContentPlan> {
    let mut pool: Vec<Option<RawSlice>> = raw.slices.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(channels.len());
    let mut missing = Vec::new();

    for channel in channels {
        let found = pool.iter_mut().find(|slot| {
            slot.as_ref()
                .is_some_and(|s| normalize_channel(&s.channel) == channel.as_str())
        });
        match found.and_then(Option::take) {
            Some(slice) => ordered.push((*channel, slice)),
            None => missing.push(channel.as_str()),
        }
    }

    if !missing.is_empty() {
        return Err(ContenizeError::generation(
            GenerationErrorKind::MissingChannel,
            format!("response has no slice for: {}", missing.join(", ")),
        ));
    }

    let leftovers = pool.iter().flatten().count();
    if leftovers > 0 {
        warn!(leftovers, "dropping slices for channels that were not requested");
    }

    let mut used_ids = HashSet::new();
    let slices = ordered
        .into_iter()
        .enumerate()
        .map(|(index, (channel, raw))| {
            let id = unique_id(&raw.id, channel, index, &mut used_ids);
            into_slice(id, channel, raw)
        })
        .collect();

    Ok(ContentPlan {
        id: PlanId::new(),
        created_at: Utc::now(),
        strategy_name: raw.strategy_name,
        executive_summary: raw.executive_summary,
        brand_analysis: raw.brand_analysis,
        slices,
        implementation_steps: raw.implementation_steps,
    })
}

fn unique_id(proposed: &str, channel: Channel, index: usize, used: &mut HashSet<String>) -> String {
    let proposed = proposed.trim();
    if !proposed.is_empty() && used.insert(proposed.to_string()) {
        return proposed.to_string();
    }

    let base = format!("{}-{}", channel.as_str(), index + 1);
    let mut candidate = base.clone();
    let mut suffix = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    candidate
}

fn into_slice(id: String, channel: Channel, raw: RawSlice) -> ContentSlice {
    let scores = match (raw.seo_score, raw.aeo_score, raw.geo_score) {
        (None, None, None) => None,
        (seo, aeo, geo) => Some(OptimizationScores {
            seo: clamp_score(seo),
            aeo: clamp_score(aeo),
            geo: clamp_score(geo),
        }),
    };

    ContentSlice {
        id,
        channel: channel.as_str().to_string(),
        format: raw.format,
        hook: raw.hook,
        body: raw.body,
        call_to_action: raw.call_to_action,
        estimated_effort: raw.estimated_effort,
        image_prompt: raw.image_prompt,
        seo_title: non_blank(raw.seo_title),
        seo_description: non_blank(raw.seo_description),
        primary_keyword: non_blank(raw.primary_keyword),
        alt_text: non_blank(raw.alt_text),
        direct_answer_snippet: non_blank(raw.direct_answer_snippet),
        scores,
        image: None,
    }
}

fn clamp_score(score: Option<f64>) -> u8 {
    score.map_or(0, |s| s.round().clamp(0.0, 100.0) as u8)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contenize_genai::UpstreamError;
    use contenize_genai::mock::MockModel;

    fn brief(channels: Vec<Channel>) -> ContentBrief {
        ContentBrief {
            company_name: "Acme SaaS".into(),
            company_website: "https://acme.example".into(),
            industry: "Fintech".into(),
            objective: "Drive free trials".into(),
            target_audience: "CTOs".into(),
            core_content: "Real-time payments are here.".into(),
            selected_channels: channels,
            attachments: vec![],
        }
    }

    fn slice_json(id: &str, channel: &str) -> Value {
        json!({
            "id": id,
            "channel": channel,
            "format": "Post",
            "hook": format!("Hook for {channel}"),
            "body": "Body",
            "callToAction": "Act now",
            "estimatedEffort": "Low",
            "imagePrompt": "An orange lightning bolt"
        })
    }

    fn plan_json(slices: Vec<Value>) -> String {
        json!({
            "strategyName": "Real-Time Push",
            "executiveSummary": "Summary",
            "brandAnalysis": {
                "tone": "Confident",
                "voice": "Direct",
                "personality": "Pragmatic",
                "suggestedColors": ["#EA580C"]
            },
            "slices": slices
        })
        .to_string()
    }

    fn generator(model: MockModel) -> (PlanGenerator, Arc<MockModel>) {
        let model = Arc::new(model);
        (PlanGenerator::new(model.clone()), model)
    }

    #[tokio::test]
    async fn one_slice_per_channel_in_requested_order() {
        let text = plan_json(vec![
            slice_json("t1", "twitter"),
            slice_json("l1", "linkedin_post"),
        ]);
        let (planner, _) = generator(MockModel::new().with_text(text));

        let plan = planner
            .generate_plan(&brief(vec![Channel::LinkedinPost, Channel::Twitter]))
            .await
            .unwrap();

        let channels: Vec<&str> = plan.slices.iter().map(|s| s.channel.as_str()).collect();
        assert_eq!(channels, vec!["linkedin_post", "twitter"]);
        assert_eq!(plan.slice_ids(), vec!["l1", "t1"]);
        assert!(plan.slices.iter().all(|s| s.image.is_none()));
    }

    #[tokio::test]
    async fn missing_or_duplicate_ids_are_replaced() {
        let text = plan_json(vec![
            slice_json("", "linkedin_post"),
            slice_json("dup", "twitter"),
            slice_json("dup", "blog_post"),
        ]);
        let (planner, _) = generator(MockModel::new().with_text(text));

        let plan = planner
            .generate_plan(&brief(vec![
                Channel::LinkedinPost,
                Channel::Twitter,
                Channel::BlogPost,
            ]))
            .await
            .unwrap();

        let ids = plan.slice_ids();
        assert_eq!(ids, vec!["linkedin_post-1", "dup", "blog_post-3"]);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[tokio::test]
    async fn omitted_channel_fails_generation() {
        let text = plan_json(vec![slice_json("l1", "linkedin_post")]);
        let (planner, _) = generator(MockModel::new().with_text(text));

        let err = planner
            .generate_plan(&brief(vec![Channel::LinkedinPost, Channel::Twitter]))
            .await
            .unwrap_err();

        assert_eq!(err.generation_kind(), Some(GenerationErrorKind::MissingChannel));
        assert!(err.to_string().contains("twitter"));
    }

    #[tokio::test]
    async fn unrequested_channels_are_dropped() {
        let text = plan_json(vec![
            slice_json("l1", "linkedin_post"),
            slice_json("x1", "tiktok"),
        ]);
        let (planner, _) = generator(MockModel::new().with_text(text));

        let plan = planner
            .generate_plan(&brief(vec![Channel::LinkedinPost]))
            .await
            .unwrap();
        assert_eq!(plan.slices.len(), 1);
    }

    #[tokio::test]
    async fn whitespace_payload_is_empty_response() {
        let (planner, _) = generator(MockModel::new().with_text("   \n  "));

        let err = planner
            .generate_plan(&brief(vec![Channel::LinkedinPost]))
            .await
            .unwrap_err();
        assert_eq!(err.generation_kind(), Some(GenerationErrorKind::EmptyResponse));
    }

    #[tokio::test]
    async fn truncated_payload_is_reported() {
        let text = plan_json(vec![slice_json("l1", "linkedin_post")]);
        let cut = &text[..text.len() / 2];
        let (planner, _) = generator(MockModel::new().with_text(cut));

        let err = planner
            .generate_plan(&brief(vec![Channel::LinkedinPost]))
            .await
            .unwrap_err();
        assert_eq!(err.generation_kind(), Some(GenerationErrorKind::TruncatedResponse));
    }

    #[tokio::test]
    async fn schema_mismatch_is_malformed() {
        let (planner, _) = generator(MockModel::new().with_text(r#"{"strategyName":"only"}"#));

        let err = planner
            .generate_plan(&brief(vec![Channel::LinkedinPost]))
            .await
            .unwrap_err();
        assert_eq!(err.generation_kind(), Some(GenerationErrorKind::MalformedResponse));
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let (planner, _) = generator(
            MockModel::new().with_structured(Err(UpstreamError::Api {
                status: 503,
                message: "overloaded".into(),
            })),
        );

        let err = planner
            .generate_plan(&brief(vec![Channel::LinkedinPost]))
            .await
            .unwrap_err();
        assert_eq!(err.generation_kind(), Some(GenerationErrorKind::Transport));
    }

    #[tokio::test]
    async fn request_embeds_brief_and_channel_enum() {
        let text = plan_json(vec![slice_json("r1", "instagram_reel")]);
        let (planner, model) = generator(MockModel::new().with_text(text));

        planner
            .generate_plan(&brief(vec![Channel::InstagramReel]))
            .await
            .unwrap();

        let requests = model.structured_requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.prompt.contains("https://acme.example"));
        assert!(request.prompt.contains("`instagram_reel`"));
        assert!(request.grounded);
        assert_eq!(
            request.schema["properties"]["slices"]["items"]["properties"]["channel"]["enum"],
            json!(["instagram_reel"])
        );
    }

    #[test]
    fn scores_are_clamped() {
        let raw: RawSlice = serde_json::from_value(json!({
            "channel": "twitter",
            "seoScore": 140.0,
            "aeoScore": 72.6
        }))
        .unwrap();
        let slice = into_slice("t".into(), Channel::Twitter, raw);
        let scores = slice.scores.unwrap();
        assert_eq!((scores.seo, scores.aeo, scores.geo), (100, 73, 0));
        assert_eq!(slice.estimated_effort, Effort::Medium);
    }

    #[test]
    fn channel_normalization() {
        assert_eq!(normalize_channel(" LinkedIn-Post "), "linkedin_post");
        assert_eq!(normalize_channel("instagram reel"), "instagram_reel");
    }
}
