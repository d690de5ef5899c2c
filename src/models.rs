use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Closed sentiment set. Serialized in canonical PascalCase; parsing via
/// `FromStr` folds case so legacy history entries read back cleanly, while
/// `from_exact` is the strict form used when validating model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }

    /// Case-exact match against the canonical names.
    pub fn from_exact(value: &str) -> Option<Self> {
        match value {
            "Positive" => Some(Sentiment::Positive),
            "Neutral" => Some(Sentiment::Neutral),
            "Negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    /// Baseline 0-100 score a single classification contributes to its
    /// category in aggregate views.
    pub fn score(&self) -> u8 {
        match self {
            Sentiment::Positive => 80,
            Sentiment::Neutral => 50,
            Sentiment::Negative => 20,
        }
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(format!("unknown sentiment `{other}`")),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Sentiment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Closed category set; same canonical/folding rules as [`Sentiment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Infrastructure,
    Teaching,
    Support,
    Service,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Infrastructure => "Infrastructure",
            Category::Teaching => "Teaching",
            Category::Support => "Support",
            Category::Service => "Service",
            Category::Other => "Other",
        }
    }

    /// Case-exact match against the canonical names.
    pub fn from_exact(value: &str) -> Option<Self> {
        match value {
            "Infrastructure" => Some(Category::Infrastructure),
            "Teaching" => Some(Category::Teaching),
            "Support" => Some(Category::Support),
            "Service" => Some(Category::Service),
            "Other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "infrastructure" => Ok(Category::Infrastructure),
            "teaching" => Ok(Category::Teaching),
            "support" => Ok(Category::Support),
            "service" => Ok(Category::Service),
            "other" => Ok(Category::Other),
            unknown => Err(format!("unknown category `{unknown}`")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Escalation level derived from a category's consecutive negative streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn from_streak(consecutive: u32) -> Self {
        if consecutive >= 5 {
            Priority::High
        } else if consecutive >= 3 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated classification result for one feedback text. Only fully valid
/// records are ever constructed; see `parse::validate`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub sentiment: Sentiment,
    pub category: Category,
    pub summary: String,
    pub suggestions: Vec<String>,
}

/// Aggregate sentiment percentages for one stored entry. Not consumed by the
/// trend detector; kept for dashboards and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: u8,
    pub neutral: u8,
    pub negative: u8,
}

impl From<Sentiment> for SentimentBreakdown {
    fn from(sentiment: Sentiment) -> Self {
        SentimentBreakdown {
            positive: if sentiment == Sentiment::Positive { 100 } else { 0 },
            neutral: if sentiment == Sentiment::Neutral { 100 } else { 0 },
            negative: if sentiment == Sentiment::Negative { 100 } else { 0 },
        }
    }
}

/// One category's observation inside a stored entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySignal {
    pub category: Category,
    pub sentiment: Sentiment,
    pub score: u8,
}

impl CategorySignal {
    pub fn from_record(record: &AnalysisRecord) -> Self {
        CategorySignal {
            category: record.category,
            sentiment: record.sentiment,
            score: record.sentiment.score(),
        }
    }
}

/// Durable snapshot of one past classification's aggregate result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalEntry {
    pub timestamp: DateTime<Utc>,
    pub overall_sentiment: SentimentBreakdown,
    pub category_analysis: Vec<CategorySignal>,
    pub summary: String,
}

impl HistoricalEntry {
    pub fn from_record(record: &AnalysisRecord, timestamp: DateTime<Utc>) -> Self {
        HistoricalEntry {
            timestamp,
            overall_sentiment: SentimentBreakdown::from(record.sentiment),
            category_analysis: vec![CategorySignal::from_record(record)],
            summary: record.summary.clone(),
        }
    }
}

/// Trend detector output for one category currently trending negative.
#[derive(Debug, Clone, Serialize)]
pub struct TrendEntry {
    pub category: Category,
    pub consecutive_negative_cycles: u32,
    pub priority: Priority,
    pub current_sentiment_score: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matching_rejects_case_variants() {
        assert_eq!(Sentiment::from_exact("Negative"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_exact("negative"), None);
        assert_eq!(Category::from_exact("Support"), Some(Category::Support));
        assert_eq!(Category::from_exact("SUPPORT"), None);
    }

    #[test]
    fn parsing_folds_case_for_history_read_back() {
        assert_eq!("NEGATIVE".parse::<Sentiment>(), Ok(Sentiment::Negative));
        assert_eq!(" infrastructure ".parse::<Category>(), Ok(Category::Infrastructure));
        assert!("mixed".parse::<Sentiment>().is_err());
    }

    #[test]
    fn sentiment_scores_match_aggregate_baselines() {
        assert_eq!(Sentiment::Positive.score(), 80);
        assert_eq!(Sentiment::Neutral.score(), 50);
        assert_eq!(Sentiment::Negative.score(), 20);
    }

    #[test]
    fn priority_is_a_pure_function_of_the_streak() {
        assert_eq!(Priority::from_streak(1), Priority::Low);
        assert_eq!(Priority::from_streak(2), Priority::Low);
        assert_eq!(Priority::from_streak(3), Priority::Medium);
        assert_eq!(Priority::from_streak(4), Priority::Medium);
        assert_eq!(Priority::from_streak(5), Priority::High);
        assert_eq!(Priority::from_streak(12), Priority::High);
    }

    #[test]
    fn breakdown_reflects_the_single_observed_sentiment() {
        let breakdown = SentimentBreakdown::from(Sentiment::Negative);
        assert_eq!(breakdown.negative, 100);
        assert_eq!(breakdown.positive, 0);
        assert_eq!(breakdown.neutral, 0);
    }

    #[test]
    fn enums_serialize_in_canonical_form() {
        let signal = CategorySignal {
            category: Category::Teaching,
            sentiment: Sentiment::Neutral,
            score: 50,
        };
        let json = serde_json::to_string(&signal).unwrap();
        assert!(json.contains("\"Teaching\""));
        assert!(json.contains("\"Neutral\""));
    }
}
