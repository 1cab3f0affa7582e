//! Combines per-chunk classifier scores into one document-level result.

use crate::oracle::LabelScore;

/// Unweighted arithmetic mean of each label's score across chunks, in
/// the first chunk's label order. Every chunk carries the same fixed
/// label set. A single chunk passes through unchanged, so short
/// documents see no floating-point drift from a no-op average.
pub fn aggregate_scores(chunk_scores: &[Vec<LabelScore>]) -> Vec<LabelScore> {
    match chunk_scores {
        [] => Vec::new(),
        [single] => single.clone(),
        chunks => {
            let count = chunks.len() as f64;
            chunks[0]
                .iter()
                .map(|first| {
                    let sum: f64 = chunks
                        .iter()
                        .filter_map(|chunk| {
                            chunk.iter().find(|score| score.label == first.label)
                        })
                        .map(|score| score.score)
                        .sum();
                    LabelScore {
                        label: first.label.clone(),
                        score: sum / count,
                    }
                })
                .collect()
        }
    }
}

/// Index of the highest score. The strictly-greater scan makes ties
/// resolve to the earliest label in declared order.
pub fn dominant_index(scores: &[f64]) -> Option<usize> {
    if scores.is_empty() {
        return None;
    }
    let mut best = 0;
    for (index, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = index;
        }
    }
    Some(best)
}
