use serde_json::Value;

use crate::error::{AnalysisError, SchemaViolation};
use crate::models::{AnalysisRecord, Category, Sentiment};

/// Reduce raw model output to the JSON object it should contain. Tolerates
/// Markdown fencing and prose wrapped around the payload.
pub fn normalize(raw: &str) -> Result<String, AnalysisError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }

    let without_fences = trimmed.replace("```json", "").replace("```", "");
    let cleaned = without_fences.trim();
    if cleaned.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }

    // When the text is not itself a complete object, carve out the first
    // balanced span; otherwise let the parser reject the text as-is.
    Ok(match extract_object(cleaned) {
        Some(span) => span.to_string(),
        None => cleaned.to_string(),
    })
}

/// First balanced `{...}` span. Brace depth is tracked outside string
/// literals so braces inside field values do not end the span early.
fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Enforce the structural and enumeration contract on a candidate payload.
/// Runs exactly once per invocation; a violation here is terminal for the
/// request even though other candidate models were never tried.
pub fn validate(candidate: &str) -> Result<AnalysisRecord, AnalysisError> {
    let parsed: Value = serde_json::from_str(candidate).map_err(SchemaViolation::Parse)?;

    let sentiment_raw = require_string(&parsed, "sentiment")?;
    let category_raw = require_string(&parsed, "category")?;
    let summary = require_string(&parsed, "summary")?;

    let sentiment = Sentiment::from_exact(&sentiment_raw).ok_or(SchemaViolation::UnknownValue {
        field: "sentiment",
        value: sentiment_raw,
    })?;
    let category = Category::from_exact(&category_raw).ok_or(SchemaViolation::UnknownValue {
        field: "category",
        value: category_raw,
    })?;

    let suggestions_value = parsed
        .get("suggestions")
        .ok_or(SchemaViolation::MissingField("suggestions"))?;
    let entries = suggestions_value
        .as_array()
        .ok_or(SchemaViolation::NotAnArray("suggestions"))?;

    let mut suggestions = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let text = entry.as_str().ok_or(SchemaViolation::NonStringEntry {
            field: "suggestions",
            index,
        })?;
        let text = text.trim();
        if !text.is_empty() {
            suggestions.push(text.to_string());
        }
    }

    Ok(AnalysisRecord {
        sentiment,
        category,
        summary,
        suggestions,
    })
}

/// Normalize then validate in one step.
pub fn parse_analysis(raw: &str) -> Result<AnalysisRecord, AnalysisError> {
    validate(&normalize(raw)?)
}

fn require_string(value: &Value, field: &'static str) -> Result<String, SchemaViolation> {
    let raw = value.get(field).ok_or(SchemaViolation::MissingField(field))?;
    let text = raw
        .as_str()
        .ok_or(SchemaViolation::NotAString(field))?
        .trim();
    if text.is_empty() {
        return Err(SchemaViolation::EmptyField(field));
    }
    Ok(text.to_string())
}
