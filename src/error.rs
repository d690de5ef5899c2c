use thiserror::Error;

/// Ways a model payload can fail the analysis schema. Each variant names the
/// offending field so callers can report precisely what the model got wrong.
#[derive(Debug, Error)]
pub enum SchemaViolation {
    #[error("response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` must be a string")]
    NotAString(&'static str),
    #[error("field `{0}` must be an array")]
    NotAnArray(&'static str),
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
    #[error("field `{field}` has unsupported value `{value}`")]
    UnknownValue { field: &'static str, value: String },
    #[error("entry {index} in `{field}` must be a string")]
    NonStringEntry { field: &'static str, index: usize },
}

impl SchemaViolation {
    /// The field the violation points at, when one can be named.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SchemaViolation::Parse(_) => None,
            SchemaViolation::MissingField(field)
            | SchemaViolation::NotAString(field)
            | SchemaViolation::NotAnArray(field)
            | SchemaViolation::EmptyField(field) => Some(field),
            SchemaViolation::UnknownValue { field, .. }
            | SchemaViolation::NonStringEntry { field, .. } => Some(field),
        }
    }
}

/// Error taxonomy for the analysis pipeline. Callers branch on the variant,
/// never on message text.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Backend credential missing or unusable; raised before any network call.
    #[error("backend is not configured: {0}")]
    Configuration(String),

    /// Model discovery failed. Recovered internally by the fallback candidate
    /// list; never surfaced to callers of the invocation engine.
    #[error("model discovery failed: {0}")]
    Discovery(String),

    /// A single attempt's network or backend failure. Recovered by trying the
    /// next model or transport.
    #[error("backend call failed: {0}")]
    Transport(String),

    /// Every transport and model combination failed; wraps the last failure.
    #[error("all transport and model combinations failed: {0}")]
    InvocationExhausted(#[source] Box<AnalysisError>),

    /// The model returned nothing usable.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The model's output does not conform to the analysis record schema.
    #[error("model response violates the analysis schema: {0}")]
    Schema(#[from] SchemaViolation),

    #[error("history store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The history log exists but holds data we cannot interpret.
    #[error("history store holds malformed data: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_violations_name_their_field() {
        assert_eq!(SchemaViolation::MissingField("sentiment").field(), Some("sentiment"));
        assert_eq!(
            SchemaViolation::UnknownValue {
                field: "category",
                value: "Gardening".to_string(),
            }
            .field(),
            Some("category")
        );
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        assert_eq!(SchemaViolation::Parse(parse_err).field(), None);
    }

    #[test]
    fn exhausted_error_reports_its_cause() {
        let last = AnalysisError::Transport("status 503".to_string());
        let err = AnalysisError::InvocationExhausted(Box::new(last));
        assert!(err.to_string().contains("status 503"));
    }
}
