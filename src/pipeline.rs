use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::AnalysisError;
use crate::gemini::{self, GenerativeBackend};
use crate::models::{AnalysisRecord, HistoricalEntry, TrendEntry};
use crate::parse;
use crate::store::TrendStore;
use crate::trend;

/// Pause between batch items to stay under backend rate limits.
const BATCH_PAUSE_MS: u64 = 100;

/// Instruction prompt demanding raw JSON with the exact record structure.
pub fn build_prompt(feedback: &str) -> String {
    format!(
        r#"Analyze the following feedback and return ONLY a valid JSON object. Do not include any markdown, code blocks, or additional text - just the raw JSON.

FEEDBACK:
{feedback}

Return a JSON object with this exact structure:
{{
  "sentiment": "Positive | Neutral | Negative",
  "category": "Infrastructure | Teaching | Support | Service | Other",
  "summary": "Short summary",
  "suggestions": ["string"]
}}

Requirements:
- sentiment: Must be exactly one of: "Positive", "Neutral", or "Negative"
- category: Must be exactly one of: "Infrastructure", "Teaching", "Support", "Service", or "Other"
- summary: A concise summary (2-3 sentences)
- suggestions: An array of 3-5 actionable suggestion strings

Return ONLY the JSON object now:"#
    )
}

/// Classify one feedback text end to end: invoke, normalize, validate. A
/// schema violation here is terminal; remaining candidate models are not
/// retried against.
pub async fn analyze_feedback<B: GenerativeBackend>(
    backend: &B,
    feedback: &str,
) -> Result<AnalysisRecord, AnalysisError> {
    let prompt = build_prompt(feedback);
    let raw = gemini::invoke(backend, &prompt).await?;
    parse::parse_analysis(&raw)
}

/// A classification together with the negative trends it confirms.
#[derive(Debug, Serialize)]
pub struct AnalysisOutcome {
    pub record: AnalysisRecord,
    pub trends: Vec<TrendEntry>,
}

/// Classify, compute trends, and fold the result into the history. Trends are
/// computed against the history as it stood before this record, so the
/// current observation is counted exactly once, as cycle 1. A storage failure
/// after a successful classification is logged, not fatal.
pub async fn analyze_and_track<B: GenerativeBackend>(
    backend: &B,
    store: &mut TrendStore,
    feedback: &str,
) -> Result<AnalysisOutcome, AnalysisError> {
    let record = analyze_feedback(backend, feedback).await?;

    let history = store.recent()?;
    let entry = HistoricalEntry::from_record(&record, Utc::now());
    let trends = trend::detect_trends(&entry.category_analysis, &history);

    if let Err(err) = store.append(entry) {
        warn!("failed to store analysis history: {err}");
    }

    Ok(AnalysisOutcome { record, trends })
}

/// One row of a batch run: either the flattened record fields or an error.
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub row: usize,
    pub feedback: String,
    #[serde(flatten)]
    pub analysis: Option<AnalysisRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
}

/// Process feedback texts strictly one at a time with a fixed inter-item
/// pause. A failure on one item is caught and recorded; the rest of the
/// batch continues.
pub async fn analyze_batch<B: GenerativeBackend>(
    backend: &B,
    store: &mut TrendStore,
    feedbacks: &[String],
) -> BatchReport {
    let mut results = Vec::with_capacity(feedbacks.len());

    for (index, feedback) in feedbacks.iter().enumerate() {
        let row = index + 1;
        info!("processing batch item {row}/{}", feedbacks.len());

        let item = match analyze_and_track(backend, store, feedback).await {
            Ok(outcome) => BatchItem {
                row,
                feedback: feedback.clone(),
                analysis: Some(outcome.record),
                error: None,
            },
            Err(err) => {
                warn!("batch item {row} failed: {err}");
                BatchItem {
                    row,
                    feedback: feedback.clone(),
                    analysis: None,
                    error: Some(err.to_string()),
                }
            }
        };
        results.push(item);

        if index + 1 < feedbacks.len() {
            sleep(Duration::from_millis(BATCH_PAUSE_MS)).await;
        }
    }

    let processed = results.iter().filter(|item| item.error.is_none()).count();
    BatchReport {
        processed,
        failed: results.len() - processed,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::Transport;
    use crate::models::{Category, Priority, Sentiment};
    use async_trait::async_trait;

    /// Returns a canned classification unless the feedback contains "fail".
    struct CannedBackend {
        sentiment: &'static str,
        category: &'static str,
    }

    #[async_trait]
    impl GenerativeBackend for CannedBackend {
        fn ensure_ready(&self) -> Result<(), AnalysisError> {
            Ok(())
        }

        async fn discover_models(&self) -> Result<Vec<String>, AnalysisError> {
            Ok(vec!["test-model".to_string()])
        }

        async fn attempt(
            &self,
            _transport: Transport,
            _model: &str,
            prompt: &str,
        ) -> Result<String, AnalysisError> {
            if prompt.contains("fail") {
                return Err(AnalysisError::Transport("scripted outage".to_string()));
            }
            Ok(format!(
                "```json\n{{\"sentiment\": \"{}\", \"category\": \"{}\", \"summary\": \"canned summary\", \"suggestions\": [\"do the thing\"]}}\n```",
                self.sentiment, self.category
            ))
        }
    }

    fn negative_backend() -> CannedBackend {
        CannedBackend {
            sentiment: "Negative",
            category: "Support",
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> TrendStore {
        TrendStore::open(dir.path().join("analyses.json"))
    }

    #[tokio::test]
    async fn fenced_backend_output_still_yields_a_valid_record() {
        let record = analyze_feedback(&negative_backend(), "the help desk never answers")
            .await
            .unwrap();
        assert_eq!(record.sentiment, Sentiment::Negative);
        assert_eq!(record.category, Category::Support);
        assert_eq!(record.suggestions, vec!["do the thing"]);
    }

    #[tokio::test]
    async fn streaks_accumulate_across_tracked_analyses() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let backend = negative_backend();

        let first = analyze_and_track(&backend, &mut store, "slow responses")
            .await
            .unwrap();
        assert_eq!(first.trends[0].consecutive_negative_cycles, 1);
        assert_eq!(first.trends[0].priority, Priority::Low);

        let second = analyze_and_track(&backend, &mut store, "still slow")
            .await
            .unwrap();
        assert_eq!(second.trends[0].consecutive_negative_cycles, 2);

        let third = analyze_and_track(&backend, &mut store, "no change at all")
            .await
            .unwrap();
        assert_eq!(third.trends[0].consecutive_negative_cycles, 3);
        assert_eq!(third.trends[0].priority, Priority::Medium);

        assert_eq!(store.recent().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn positive_classifications_report_no_trends() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let backend = CannedBackend {
            sentiment: "Positive",
            category: "Teaching",
        };

        let outcome = analyze_and_track(&backend, &mut store, "wonderful seminar")
            .await
            .unwrap();
        assert!(outcome.trends.is_empty());
        assert_eq!(store.recent().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_failing_item_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let backend = negative_backend();

        let feedbacks = vec![
            "printers keep jamming".to_string(),
            "please fail this one".to_string(),
            "cafeteria queue is endless".to_string(),
        ];
        let report = analyze_batch(&backend, &mut store, &feedbacks).await;

        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.results.len(), 3);
        assert!(report.results[0].error.is_none());
        assert!(report.results[1].error.is_some());
        assert!(report.results[1].analysis.is_none());
        assert!(report.results[2].error.is_none());

        // Only successful items reach the history.
        assert_eq!(store.recent().unwrap().len(), 2);
    }

    #[test]
    fn batch_rows_serialize_like_the_outbound_contract() {
        let item = BatchItem {
            row: 1,
            feedback: "text".to_string(),
            analysis: Some(AnalysisRecord {
                sentiment: Sentiment::Negative,
                category: Category::Service,
                summary: "s".to_string(),
                suggestions: vec!["a".to_string()],
            }),
            error: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["sentiment"], "Negative");
        assert_eq!(json["category"], "Service");
        assert!(json.get("error").is_none());

        let failed = BatchItem {
            row: 2,
            feedback: "text".to_string(),
            analysis: None,
            error: Some("boom".to_string()),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["error"], "boom");
        assert!(json.get("sentiment").is_none());
    }

    #[test]
    fn prompt_embeds_the_feedback_and_the_contract() {
        let prompt = build_prompt("the projector died mid-lecture");
        assert!(prompt.contains("the projector died mid-lecture"));
        assert!(prompt.contains("\"sentiment\": \"Positive | Neutral | Negative\""));
        assert!(prompt.contains("ONLY a valid JSON object"));
    }
}
