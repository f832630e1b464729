//! AI-assisted slice editing.
//!
//! Failures always propagate as [`ContenizeError::Edit`]. There is no
//! fallback to the unmodified slice; the caller decides what to show.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, instrument};

use contenize_genai::{GenerativeModel, StructuredRequest, decode_json};
use contenize_shared::{ContenizeError, ContentSlice, Result, SliceRevision};

/// Rewrites a slice's text fields from a free-text instruction.
#[derive(Clone)]
pub struct SliceEditor {
    model: Arc<dyn GenerativeModel>,
}

impl SliceEditor {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Ask the model for a partial update of `slice` following `instruction`.
    #[instrument(skip_all, fields(slice = %slice.id))]
    pub async fn revise_slice(&self, slice: &ContentSlice, instruction: &str) -> Result<SliceRevision> {
        if instruction.trim().is_empty() {
            return Err(ContenizeError::validation("edit instruction is empty"));
        }

        let request = StructuredRequest {
            prompt: build_prompt(slice, instruction),
            schema: revision_schema(),
            attachments: vec![],
            grounded: false,
        };

        let response = self
            .model
            .generate_structured(request)
            .await
            .map_err(|e| ContenizeError::Edit(e.to_string()))?;

        let revision: SliceRevision =
            decode_json(&response).map_err(|e| ContenizeError::Edit(e.to_string()))?;

        if revision.is_empty() {
            return Err(ContenizeError::Edit(
                "the model returned no editable fields".into(),
            ));
        }

        info!(
            hook = revision.hook.is_some(),
            body = revision.body.is_some(),
            cta = revision.call_to_action.is_some(),
            snippet = revision.direct_answer_snippet.is_some(),
            "slice revision received"
        );

        Ok(revision)
    }
}

fn build_prompt(slice: &ContentSlice, instruction: &str) -> String {
    format!(
        r#"
    Rewrite this {channel} content according to the instruction. Return only the fields you change.

    Current hook: {hook}
    Current body: {body}
    Current call to action: {cta}
    Current answer snippet: {snippet}

    Instruction: {instruction}
  "#,
        channel = slice.channel,
        hook = slice.hook,
        body = slice.body,
        cta = slice.call_to_action,
        snippet = slice.direct_answer_snippet.as_deref().unwrap_or(""),
    )
}

fn revision_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "hook": { "type": "STRING" },
            "body": { "type": "STRING" },
            "callToAction": { "type": "STRING" },
            "directAnswerSnippet": { "type": "STRING" }
        }
    })
}
