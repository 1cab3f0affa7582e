//! The seven-emotion label set, mirroring the sentiment mapping.

use crate::oracle::LabelScore;

/// Declared order doubles as the tie-break order for the dominant label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emotion {
    Anger,
    Disgust,
    Fear,
    Joy,
    Neutral,
    Sadness,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Anger,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Joy,
        Emotion::Neutral,
        Emotion::Sadness,
        Emotion::Surprise,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Anger => "anger",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Joy => "joy",
            Emotion::Neutral => "neutral",
            Emotion::Sadness => "sadness",
            Emotion::Surprise => "surprise",
        }
    }

    /// Unrecognized labels map to `None` and are dropped by the caller.
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "anger" => Some(Emotion::Anger),
            "disgust" => Some(Emotion::Disgust),
            "fear" => Some(Emotion::Fear),
            "joy" => Some(Emotion::Joy),
            "neutral" => Some(Emotion::Neutral),
            "sadness" => Some(Emotion::Sadness),
            "surprise" => Some(Emotion::Surprise),
            _ => None,
        }
    }
}

/// Projects raw label/score pairs onto the fixed set, indexed by
/// [`Emotion::ALL`] order. Missing labels stay at zero.
pub fn scores_by_emotion(scores: &[LabelScore]) -> [f64; 7] {
    let mut projected = [0.0; 7];
    for entry in scores {
        if let Some(emotion) = Emotion::from_model_label(&entry.label) {
            let index = Emotion::ALL
                .iter()
                .position(|e| *e == emotion)
                .unwrap_or(0);
            projected[index] = entry.score;
        }
    }
    projected
}
