//! Gemini `generateContent` request/response bodies.

use serde::Deserialize;
use serde_json::{Value, json};

use contenize_shared::{Attachment, InlineImage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<Blob>,
    /// Set on reasoning parts, which are not part of the answer.
    #[serde(default)]
    pub thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.first_candidate()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|c| c.parts.iter())
    }

    /// Concatenated answer text of the first candidate.
    pub fn text(&self) -> String {
        self.parts()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    pub fn finish_reason(&self) -> Option<String> {
        self.first_candidate().and_then(|c| c.finish_reason.clone())
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }

    /// First inline image of the first candidate.
    pub fn image(&self) -> Option<InlineImage> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|b| b.mime_type.starts_with("image/"))
            .map(|b| InlineImage {
                mime_type: b.mime_type.clone(),
                data: b.data.clone(),
            })
    }
}

/// Body for a schema-constrained JSON request.
pub(crate) fn structured_body(
    prompt: &str,
    schema: &Value,
    attachments: &[Attachment],
    grounded: bool,
) -> Value {
    let mut parts = vec![json!({ "text": prompt })];
    parts.extend(attachments.iter().map(|a| {
        json!({
            "inlineData": { "mimeType": a.mime_type, "data": a.data }
        })
    }));

    let mut body = json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema,
        },
    });

    if grounded {
        body["tools"] = json!([{ "googleSearch": {} }]);
    }

    body
}

/// Body for an image request.
pub(crate) fn image_body(prompt: &str, aspect_ratio: &str) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": { "aspectRatio": aspect_ratio },
        },
    })
}
