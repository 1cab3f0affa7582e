//! Batch driver: pulls unprocessed rows through the chunk/score/aggregate
//! path and stores one result per `(source, model)` pair.

use std::sync::Arc;

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            blog_post::BlogPost,
            emotion_result::EmotionResult,
            linguistic_features::LinguisticFeatures,
            oral_history_segment::{OralHistorySegment, Speaker},
            sentiment_result::SentimentResult,
            SourceType, StoredObject,
        },
    },
};
use tracing::{info, warn};

use crate::{
    aggregate::{aggregate_scores, dominant_index},
    chunker::{chunk_text, DEFAULT_MAX_WINDOW_TOKENS, DEFAULT_OVERLAP_TOKENS},
    emotion::{scores_by_emotion, Emotion},
    linguistic::linguistic_features,
    oracle::{LabelScore, TextClassifier, TokenCodec},
    sentiment::{scores_by_sentiment, Sentiment},
};

/// Rows with fewer words than this carry too little signal to score.
pub const MIN_WORDS_FOR_ANALYSIS: usize = 10;
/// Hard context bound passed to the scoring oracle.
pub const TRUNCATION_LIMIT: usize = 512;

/// A classifier paired with the tokenizer that bounds its input.
#[derive(Clone)]
pub struct Analyzer {
    pub classifier: Arc<dyn TextClassifier>,
    pub codec: Arc<dyn TokenCodec>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub sentiment_stored: usize,
    pub emotion_stored: usize,
    pub linguistic_stored: usize,
    pub skipped_short: usize,
    pub failed: usize,
}

struct SourceRow {
    id: String,
    text: String,
    word_count: usize,
}

/// Runs any subset of the three analyses over both source tables. The
/// analyses are mutually independent; a failure in one never blocks the
/// others for the same row.
pub struct AnalysisRunner<'a> {
    db: &'a SurrealDbClient,
    sentiment: Option<Analyzer>,
    emotion: Option<Analyzer>,
    linguistic_enabled: bool,
}

impl<'a> AnalysisRunner<'a> {
    pub fn new(
        db: &'a SurrealDbClient,
        sentiment: Option<Analyzer>,
        emotion: Option<Analyzer>,
        linguistic_enabled: bool,
    ) -> Self {
        Self {
            db,
            sentiment,
            emotion,
            linguistic_enabled,
        }
    }

    pub async fn run(&self) -> Result<AnalysisSummary, AppError> {
        let mut summary = AnalysisSummary::default();
        for source_type in [SourceType::Blog, SourceType::OralHistory] {
            if let Some(analyzer) = self.sentiment.clone() {
                self.run_sentiment(source_type, &analyzer, &mut summary)
                    .await?;
            }
            if let Some(analyzer) = self.emotion.clone() {
                self.run_emotion(source_type, &analyzer, &mut summary)
                    .await?;
            }
            if self.linguistic_enabled {
                self.run_linguistic(source_type, &mut summary).await?;
            }
        }

        info!(
            sentiment = summary.sentiment_stored,
            emotion = summary.emotion_stored,
            linguistic = summary.linguistic_stored,
            skipped = summary.skipped_short,
            failed = summary.failed,
            "analysis run finished"
        );
        Ok(summary)
    }

    async fn run_sentiment(
        &self,
        source_type: SourceType,
        analyzer: &Analyzer,
        summary: &mut AnalysisSummary,
    ) -> Result<(), AppError> {
        let model = analyzer.classifier.model_name().to_string();
        let rows = self
            .pending_rows(source_type, SentimentResult::table_name(), Some(&model))
            .await?;
        info!(source = %source_type, model, pending = rows.len(), "sentiment batch");

        for row in rows {
            if row.word_count < MIN_WORDS_FOR_ANALYSIS {
                summary.skipped_short += 1;
                continue;
            }
            let combined = match self.score_document(&row.text, analyzer).await {
                Ok(combined) => combined,
                Err(AppError::Database(err)) => return Err(AppError::Database(err)),
                Err(err) => {
                    warn!(source = %source_type, id = %row.id, error = %err, "sentiment scoring failed");
                    summary.failed += 1;
                    continue;
                }
            };

            let projected = scores_by_sentiment(&combined);
            let label = dominant_index(&projected)
                .map_or(Sentiment::Neutral, |index| Sentiment::ALL[index]);
            let [positive, negative, neutral] = projected;
            let result = SentimentResult::new(
                source_type,
                row.id,
                label.as_str().to_string(),
                positive,
                negative,
                neutral,
                model.clone(),
            );
            if self.db.insert_ignore(result).await? {
                summary.sentiment_stored += 1;
            }
        }
        Ok(())
    }

    async fn run_emotion(
        &self,
        source_type: SourceType,
        analyzer: &Analyzer,
        summary: &mut AnalysisSummary,
    ) -> Result<(), AppError> {
        let model = analyzer.classifier.model_name().to_string();
        let rows = self
            .pending_rows(source_type, EmotionResult::table_name(), Some(&model))
            .await?;
        info!(source = %source_type, model, pending = rows.len(), "emotion batch");

        for row in rows {
            if row.word_count < MIN_WORDS_FOR_ANALYSIS {
                summary.skipped_short += 1;
                continue;
            }
            let combined = match self.score_document(&row.text, analyzer).await {
                Ok(combined) => combined,
                Err(AppError::Database(err)) => return Err(AppError::Database(err)),
                Err(err) => {
                    warn!(source = %source_type, id = %row.id, error = %err, "emotion scoring failed");
                    summary.failed += 1;
                    continue;
                }
            };

            let projected = scores_by_emotion(&combined);
            let dominant = dominant_index(&projected)
                .map_or(Emotion::Neutral, |index| Emotion::ALL[index]);
            let result = EmotionResult::new(
                source_type,
                row.id,
                projected,
                dominant.as_str().to_string(),
                model.clone(),
            );
            if self.db.insert_ignore(result).await? {
                summary.emotion_stored += 1;
            }
        }
        Ok(())
    }

    async fn run_linguistic(
        &self,
        source_type: SourceType,
        summary: &mut AnalysisSummary,
    ) -> Result<(), AppError> {
        let rows = self
            .pending_rows(source_type, LinguisticFeatures::table_name(), None)
            .await?;
        info!(source = %source_type, pending = rows.len(), "linguistic batch");

        for row in rows {
            if row.word_count < MIN_WORDS_FOR_ANALYSIS {
                summary.skipped_short += 1;
                continue;
            }
            let snapshot = linguistic_features(&row.text);
            let result = LinguisticFeatures::new(
                source_type,
                row.id,
                snapshot.flesch_reading_ease,
                snapshot.avg_sentence_length,
                snapshot.lexical_diversity,
                snapshot.first_person_ratio,
                snapshot.exclamation_count,
                snapshot.question_count,
            );
            if self.db.insert_ignore(result).await? {
                summary.linguistic_stored += 1;
            }
        }
        Ok(())
    }

    /// Chunk, score each chunk, aggregate. Single-chunk documents skip
    /// the averaging path entirely.
    async fn score_document(
        &self,
        text: &str,
        analyzer: &Analyzer,
    ) -> Result<Vec<LabelScore>, AppError> {
        let chunks = chunk_text(
            text,
            analyzer.codec.as_ref(),
            DEFAULT_MAX_WINDOW_TOKENS,
            DEFAULT_OVERLAP_TOKENS,
        )?;

        let mut chunk_scores = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            chunk_scores.push(
                analyzer
                    .classifier
                    .score(chunk, TRUNCATION_LIMIT)
                    .await?,
            );
        }
        Ok(aggregate_scores(&chunk_scores))
    }

    /// Unprocessed rows for one `(source, analysis, model)` combination.
    /// Oral-history rows narrow to astronaut turns; interviewer questions
    /// are never scored.
    async fn pending_rows(
        &self,
        source_type: SourceType,
        results_table: &str,
        model_name: Option<&str>,
    ) -> Result<Vec<SourceRow>, AppError> {
        match source_type {
            SourceType::Blog => {
                let posts: Vec<BlogPost> = self
                    .db
                    .find_unprocessed(
                        BlogPost::table_name(),
                        results_table,
                        source_type.as_str(),
                        model_name,
                    )
                    .await?;
                Ok(posts
                    .into_iter()
                    .map(|post| SourceRow {
                        id: post.id,
                        text: post.text,
                        word_count: post.word_count,
                    })
                    .collect())
            }
            SourceType::OralHistory => {
                let segments: Vec<OralHistorySegment> = self
                    .db
                    .find_unprocessed(
                        OralHistorySegment::table_name(),
                        results_table,
                        source_type.as_str(),
                        model_name,
                    )
                    .await?;
                Ok(segments
                    .into_iter()
                    .filter(|segment| segment.speaker == Speaker::Astronaut)
                    .map(|segment| SourceRow {
                        id: segment.id,
                        text: segment.text,
                        word_count: segment.word_count,
                    })
                    .collect())
            }
        }
    }
}
