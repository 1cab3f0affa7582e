//! Scoring and tokenizer oracles as injectable trait objects, so the
//! runner and chunker can be exercised with fakes.

use async_trait::async_trait;
use common::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One `(label, score)` pair from a classifier over its fixed label set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Token encode/decode used by the chunker. Decode need not exactly
/// invert encode; it only has to stay scoreable.
pub trait TokenCodec: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>, AppError>;
    fn decode(&self, ids: &[u32]) -> Result<String, AppError>;
}

impl TokenCodec for tokenizers::Tokenizer {
    // `Tokenizer`'s own encode/decode live on its deref target; calling
    // them through `self` would resolve back to this impl.
    fn encode(&self, text: &str) -> Result<Vec<u32>, AppError> {
        let encoding = std::ops::Deref::deref(self)
            .encode(text, false)
            .map_err(|err| AppError::Processing(format!("tokenizer encode: {err}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String, AppError> {
        std::ops::Deref::deref(self)
            .decode(ids, true)
            .map_err(|err| AppError::Processing(format!("tokenizer decode: {err}")))
    }
}

/// A classifier producing scores over a fixed label set. Implementations
/// must truncate oversize input rather than fail; the chunker already
/// bounds size, so truncation is a second line of defense.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    fn model_name(&self) -> &str;

    async fn score(
        &self,
        text: &str,
        truncation_limit: usize,
    ) -> Result<Vec<LabelScore>, AppError>;
}

/// Hosted-inference classifier speaking the HuggingFace text
/// classification protocol.
pub struct HttpClassifier {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

/// The API returns either a flat label/score list or one list per input.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassifierResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl HttpClassifier {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        model: String,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            model,
            api_key,
        }
    }
}

#[async_trait]
impl TextClassifier for HttpClassifier {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn score(
        &self,
        text: &str,
        truncation_limit: usize,
    ) -> Result<Vec<LabelScore>, AppError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let mut request = self.client.post(&url).json(&json!({
            "inputs": text,
            "parameters": { "truncation": true, "max_length": truncation_limit },
            "options": { "wait_for_model": true },
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AppError::Scoring(format!("{}: {err}", self.model)))?
            .error_for_status()
            .map_err(|err| AppError::Scoring(format!("{}: {err}", self.model)))?;

        let parsed: ClassifierResponse = response
            .json()
            .await
            .map_err(|err| AppError::Scoring(format!("{}: {err}", self.model)))?;

        let scores = match parsed {
            ClassifierResponse::Flat(scores) => scores,
            ClassifierResponse::Nested(mut batches) => {
                if batches.is_empty() {
                    return Err(AppError::Scoring(format!(
                        "{}: empty response batch",
                        self.model
                    )));
                }
                batches.swap_remove(0)
            }
        };
        Ok(scores)
    }
}
