use crate::models::{CategorySignal, HistoricalEntry, Priority, Sentiment, TrendEntry};

/// Computes per-category consecutive-negative streaks for the current
/// observation against the stored history, newest first. The current
/// observation counts as cycle 1; a non-negative or absent reading in a
/// historical entry ends that category's streak. Categories that are not
/// currently negative produce no entry.
pub fn detect_trends(
    current: &[CategorySignal],
    history: &[HistoricalEntry],
) -> Vec<TrendEntry> {
    let mut trends = Vec::new();

    for signal in current {
        if signal.sentiment != Sentiment::Negative {
            continue;
        }

        let mut streak = 1u32;
        for entry in history.iter().rev() {
            let past = entry
                .category_analysis
                .iter()
                .find(|candidate| candidate.category == signal.category);
            match past {
                Some(observation) if observation.sentiment == Sentiment::Negative => {
                    streak += 1;
                }
                _ => break,
            }
        }

        trends.push(TrendEntry {
            category: signal.category,
            consecutive_negative_cycles: streak,
            priority: Priority::from_streak(streak),
            current_sentiment_score: signal.score,
        });
    }

    // Stable sort keeps input order for exact ties.
    trends.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then(b.consecutive_negative_cycles.cmp(&a.consecutive_negative_cycles))
    });
    trends
}
