use std::fmt::Write;

use crate::models::HistoricalEntry;
use crate::trend;

/// Render the retained history as a markdown report: latest sentiment mix,
/// latest category scores, continuous negative trends, and recent summaries.
/// Trends treat the newest entry as the current observation against the rest.
pub fn build_report(history: &[HistoricalEntry]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Feedback Intelligence Report");

    let Some((current, past)) = history.split_last() else {
        let _ = writeln!(output, "No analyses recorded yet.");
        return output;
    };

    let _ = writeln!(
        output,
        "Generated from {} retained analyses (last recorded {})",
        history.len(),
        current.timestamp.format("%Y-%m-%d %H:%M UTC")
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sentiment Overview");
    let _ = writeln!(
        output,
        "- positive {}% / neutral {}% / negative {}%",
        current.overall_sentiment.positive,
        current.overall_sentiment.neutral,
        current.overall_sentiment.negative
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Scores");
    let mut signals = current.category_analysis.clone();
    signals.sort_by(|a, b| b.score.cmp(&a.score));
    if signals.is_empty() {
        let _ = writeln!(output, "No categories observed in the latest analysis.");
    } else {
        for signal in &signals {
            let _ = writeln!(
                output,
                "- {}: {} (score {}/100)",
                signal.category, signal.sentiment, signal.score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Continuous Negative Trends");
    let trends = trend::detect_trends(&current.category_analysis, past);
    if trends.is_empty() {
        let _ = writeln!(output, "No categories are trending negative.");
    } else {
        for entry in &trends {
            let _ = writeln!(
                output,
                "- {}: {} consecutive negative cycles ({} priority, current score {}/100)",
                entry.category,
                entry.consecutive_negative_cycles,
                entry.priority,
                entry.current_sentiment_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Summaries");
    for entry in history.iter().rev().take(5) {
        let _ = writeln!(
            output,
            "- {}: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M UTC"),
            entry.summary
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, CategorySignal, Sentiment, SentimentBreakdown};
    use chrono::{TimeZone, Utc};

    fn entry(minute: u32, sentiment: Sentiment, summary: &str) -> HistoricalEntry {
        HistoricalEntry {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0).unwrap(),
            overall_sentiment: SentimentBreakdown::from(sentiment),
            category_analysis: vec![CategorySignal {
                category: Category::Infrastructure,
                sentiment,
                score: sentiment.score(),
            }],
            summary: summary.to_string(),
        }
    }

    #[test]
    fn empty_history_renders_an_explicit_notice() {
        let report = build_report(&[]);
        assert!(report.contains("# Feedback Intelligence Report"));
        assert!(report.contains("No analyses recorded yet."));
    }

    #[test]
    fn sustained_negatives_show_up_in_the_trend_section() {
        let history: Vec<HistoricalEntry> = (0..5)
            .map(|minute| entry(minute, Sentiment::Negative, &format!("complaint {minute}")))
            .collect();

        let report = build_report(&history);
        assert!(report.contains("## Continuous Negative Trends"));
        assert!(report.contains("Infrastructure: 5 consecutive negative cycles (High priority"));
        assert!(report.contains("negative 100%"));
        assert!(report.contains("complaint 4"));
    }

    #[test]
    fn calm_history_reports_no_trends() {
        let history = vec![
            entry(0, Sentiment::Negative, "rough start"),
            entry(1, Sentiment::Positive, "much better now"),
        ];

        let report = build_report(&history);
        assert!(report.contains("No categories are trending negative."));
        assert!(report.contains("Infrastructure: Positive (score 80/100)"));
    }
}
