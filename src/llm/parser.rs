use crate::error::{ClaimError, Result};
use crate::schema::{ExtractionResult, ResponseStatus};
use log::{debug, error};

/// Removes Markdown code fences (with or without a language tag) around a reply.
pub fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag on the opening fence line, e.g. "```json".
        text = match rest.find('\n') {
            Some(idx) if rest[..idx].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
                &rest[idx + 1..]
            }
            _ => rest.trim_start_matches("json"),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}

/// Outermost `{...}` span, for replies that wrap the JSON in prose.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decodes the model reply into an [`ExtractionResult`].
pub fn parse_extraction(raw: &str) -> Result<ExtractionResult> {
    let cleaned = strip_code_fences(raw);

    let parsed = serde_json::from_str::<ExtractionResult>(&cleaned).or_else(|first_err| {
        match outer_object(&cleaned) {
            Some(inner) if inner.len() < cleaned.len() => {
                debug!("Reply had text around the JSON object; retrying on the inner span");
                serde_json::from_str::<ExtractionResult>(inner)
            }
            _ => Err(first_err),
        }
    });

    let result = parsed.map_err(|e| {
        error!(
            "Model reply is not a valid extraction ({} chars): {}",
            cleaned.len(),
            e
        );
        ClaimError::MalformedResponse(e.to_string())
    })?;

    if result.status == ResponseStatus::Error {
        let reason = if result.verification.reason.trim().is_empty() {
            "model reported an error".to_string()
        } else {
            result.verification.reason.clone()
        };
        error!("Model declined the claim: {}", reason);
        return Err(ClaimError::Inference(reason));
    }

    Ok(result)
}
