//! The three-way sentiment label set and its mapping from raw model
//! output labels.

use crate::oracle::LabelScore;

/// Declared order doubles as the tie-break order for the dominant label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Total mapping from the model's label vocabulary. Some model
    /// revisions emit positional `LABEL_n` names instead of words.
    /// Unrecognized labels map to `None` and are dropped by the caller,
    /// never coerced to a near-match.
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label {
            "LABEL_0" => Some(Sentiment::Negative),
            "LABEL_1" => Some(Sentiment::Neutral),
            "LABEL_2" => Some(Sentiment::Positive),
            other => match other.to_lowercase().as_str() {
                "positive" => Some(Sentiment::Positive),
                "negative" => Some(Sentiment::Negative),
                "neutral" => Some(Sentiment::Neutral),
                _ => None,
            },
        }
    }
}

/// Projects raw label/score pairs onto the fixed set, indexed by
/// [`Sentiment::ALL`] order. Missing labels stay at zero.
pub fn scores_by_sentiment(scores: &[LabelScore]) -> [f64; 3] {
    let mut projected = [0.0; 3];
    for entry in scores {
        if let Some(sentiment) = Sentiment::from_model_label(&entry.label) {
            let index = Sentiment::ALL
                .iter()
                .position(|s| *s == sentiment)
                .unwrap_or(0);
            projected[index] = entry.score;
        }
    }
    projected
}
