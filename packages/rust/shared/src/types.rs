//! Core domain types: briefs, brand analysis, slices and plans.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ContenizeError, Result};

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A supported distribution channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    LinkedinPost,
    Twitter,
    BlogPost,
    EmailNewsletter,
    InstagramPost,
    InstagramReel,
    InstagramStory,
    Tiktok,
    YoutubeShort,
    PinterestPin,
    FacebookPost,
}

impl Channel {
    /// Every supported channel, in display order.
    pub const ALL: [Channel; 11] = [
        Channel::LinkedinPost,
        Channel::Twitter,
        Channel::BlogPost,
        Channel::EmailNewsletter,
        Channel::InstagramPost,
        Channel::InstagramReel,
        Channel::InstagramStory,
        Channel::Tiktok,
        Channel::YoutubeShort,
        Channel::PinterestPin,
        Channel::FacebookPost,
    ];

    /// Stable identifier used on the wire and in slice `channel` fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinkedinPost => "linkedin_post",
            Self::Twitter => "twitter",
            Self::BlogPost => "blog_post",
            Self::EmailNewsletter => "email_newsletter",
            Self::InstagramPost => "instagram_post",
            Self::InstagramReel => "instagram_reel",
            Self::InstagramStory => "instagram_story",
            Self::Tiktok => "tiktok",
            Self::YoutubeShort => "youtube_short",
            Self::PinterestPin => "pinterest_pin",
            Self::FacebookPost => "facebook_post",
        }
    }

    /// Human-readable label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LinkedinPost => "LinkedIn Post",
            Self::Twitter => "Twitter (X) Thread",
            Self::BlogPost => "Professional Blog Post",
            Self::EmailNewsletter => "Email Newsletter",
            Self::InstagramPost => "Instagram Post",
            Self::InstagramReel => "Instagram Reel",
            Self::InstagramStory => "Instagram Story",
            Self::Tiktok => "TikTok Video",
            Self::YoutubeShort => "YouTube Short",
            Self::PinterestPin => "Pinterest Pin",
            Self::FacebookPost => "Facebook Post",
        }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::for_channel_id(self.as_str())
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = ContenizeError;

    fn from_str(s: &str) -> Result<Self> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| ContenizeError::validation(format!("unsupported channel '{s}'")))
    }
}

/// Visual orientation of a channel's assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Wide, 16:9.
    Landscape,
    /// Tall, 9:16 (short-form / vertical formats).
    Portrait,
}

/// Identifier fragments that mark a vertical, short-form format.
const VERTICAL_MARKERS: [&str; 5] = ["reel", "short", "story", "tiktok", "pin"];

impl Orientation {
    /// Pick the orientation from a channel identifier.
    ///
    /// Works on raw identifiers so slices whose channel string came back from
    /// the model slightly off-enum still get a sensible layout.
    pub fn for_channel_id(channel: &str) -> Self {
        let lower = channel.to_ascii_lowercase();
        if VERTICAL_MARKERS.iter().any(|m| lower.contains(m)) {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }

    /// Aspect ratio hint understood by the image model.
    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

// ---------------------------------------------------------------------------
// ContentBrief
// ---------------------------------------------------------------------------

/// A file attached to the brief, sent to the model as an inline part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: String,
    /// Base64-encoded file content.
    pub data: String,
}

/// User-supplied input for one generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBrief {
    pub company_name: String,
    pub company_website: String,
    pub industry: String,
    pub objective: String,
    pub target_audience: String,
    /// The cornerstone content to repurpose.
    pub core_content: String,
    /// Requested channels; order is the output order.
    #[serde(default)]
    pub selected_channels: Vec<Channel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ContentBrief {
    /// Boundary validation, run before the brief reaches the planner.
    pub fn validate(&self) -> Result<()> {
        if self.selected_channels.is_empty() {
            return Err(ContenizeError::validation(
                "select at least one distribution channel",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for channel in &self.selected_channels {
            if !seen.insert(*channel) {
                return Err(ContenizeError::validation(format!(
                    "channel '{channel}' selected more than once"
                )));
            }
        }

        let required = [
            ("company_name", &self.company_name),
            ("industry", &self.industry),
            ("objective", &self.objective),
            ("target_audience", &self.target_audience),
            ("core_content", &self.core_content),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ContenizeError::validation(format!("{field} is required")));
            }
        }

        let website = url::Url::parse(self.company_website.trim()).map_err(|e| {
            ContenizeError::validation(format!(
                "invalid company_website '{}': {e}",
                self.company_website
            ))
        })?;
        if !matches!(website.scheme(), "http" | "https") {
            return Err(ContenizeError::validation(format!(
                "company_website must be http(s), got '{}'",
                website.scheme()
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BrandAnalysis
// ---------------------------------------------------------------------------

/// Search intent attached to an SEO keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchIntent {
    Informational,
    Transactional,
    Navigational,
    Commercial,
}

impl SearchIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Informational => "Informational",
            Self::Transactional => "Transactional",
            Self::Navigational => "Navigational",
            Self::Commercial => "Commercial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoKeyword {
    pub term: String,
    pub intent: SearchIntent,
}

/// Derived brand identity profile. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandAnalysis {
    pub tone: String,
    #[serde(default)]
    pub tone_sentiment: String,
    pub voice: String,
    #[serde(default)]
    pub voice_sentiment: String,
    pub personality: String,
    /// Ordered colour palette (hex strings as returned by the model).
    pub suggested_colors: Vec<String>,
    #[serde(default)]
    pub brand_keywords: Vec<String>,
    #[serde(default)]
    pub seo_keywords: Vec<SeoKeyword>,
}

// ---------------------------------------------------------------------------
// ContentSlice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effort {
    Low,
    Medium,
    High,
}

/// Discovery-fitness scores (0-100) reported by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationScores {
    pub seo: u8,
    pub aeo: u8,
    pub geo: u8,
}

/// An inline, base64-encoded image payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    /// `data:` URL suitable for embedding in HTML or Markdown.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decode the payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.data.trim())
            .map_err(|e| ContenizeError::validation(format!("invalid base64 image data: {e}")))
    }
}

/// One channel-specific asset derived from the cornerstone content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSlice {
    /// Stable identity, assigned at plan creation.
    pub id: String,
    /// Channel identifier (see [`Channel::as_str`]).
    pub channel: String,
    pub format: String,
    pub hook: String,
    pub body: String,
    pub call_to_action: String,
    pub estimated_effort: Effort,
    pub image_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    /// AEO answer snippet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_answer_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<OptimizationScores>,
    /// Generated illustration; absent until (and unless) illustration succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<InlineImage>,
}

impl ContentSlice {
    pub fn orientation(&self) -> Orientation {
        Orientation::for_channel_id(&self.channel)
    }

    /// Text placed on the clipboard by "copy asset": hook, body and call to
    /// action, optionally followed by the AEO snippet.
    pub fn clipboard_text(&self, include_aeo: bool) -> String {
        let mut text = format!("{}\n\n{}\n\n{}", self.hook, self.body, self.call_to_action);
        if include_aeo {
            if let Some(snippet) = self.direct_answer_snippet.as_deref() {
                if !snippet.trim().is_empty() {
                    text.push_str("\n\n");
                    text.push_str(snippet);
                }
            }
        }
        text
    }

    /// Copy of this slice with the image set.
    pub fn with_image(&self, image: InlineImage) -> Self {
        Self {
            image: Some(image),
            ..self.clone()
        }
    }

    /// Copy of this slice with the revision's fields applied.
    pub fn revised(&self, revision: &SliceRevision) -> Self {
        let mut next = self.clone();
        if let Some(hook) = &revision.hook {
            next.hook = hook.clone();
        }
        if let Some(body) = &revision.body {
            next.body = body.clone();
        }
        if let Some(cta) = &revision.call_to_action {
            next.call_to_action = cta.clone();
        }
        if let Some(snippet) = &revision.direct_answer_snippet {
            next.direct_answer_snippet = Some(snippet.clone());
        }
        next
    }
}

/// Partial update to a slice's editable text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceRevision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_answer_snippet: Option<String>,
}

impl SliceRevision {
    pub fn is_empty(&self) -> bool {
        self.hook.is_none()
            && self.body.is_none()
            && self.call_to_action.is_none()
            && self.direct_answer_snippet.is_none()
    }
}

// ---------------------------------------------------------------------------
// PlanId / ContentPlan
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for plan identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub Uuid);

impl PlanId {
    /// Generate a new time-sortable plan identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PlanId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Aggregate root: one generated content strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPlan {
    pub id: PlanId,
    pub created_at: DateTime<Utc>,
    pub strategy_name: String,
    pub executive_summary: String,
    pub brand_analysis: BrandAnalysis,
    /// Display and export order.
    pub slices: Vec<ContentSlice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implementation_steps: Vec<String>,
}

impl ContentPlan {
    pub fn slice(&self, id: &str) -> Option<&ContentSlice> {
        self.slices.iter().find(|s| s.id == id)
    }

    pub fn slice_ids(&self) -> Vec<&str> {
        self.slices.iter().map(|s| s.id.as_str()).collect()
    }

    /// Number of slices that already carry an image.
    pub fn illustrated_count(&self) -> usize {
        self.slices.iter().filter(|s| s.image.is_some()).count()
    }

    /// Load a plan previously written with [`ContentPlan::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ContenizeError::validation(format!("invalid plan file: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
