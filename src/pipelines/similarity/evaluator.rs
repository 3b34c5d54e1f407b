// Copyright 2019 Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use tch::{Device, Kind};
use tracing::debug;

use crate::pipelines::sentence_embeddings::{
    SentenceEncoder, SentenceTokenizer, TokenizedBatch, TokenizedSentence,
};
use crate::pipelines::similarity::{
    cosine_similarity_tensor, pearson_correlation, spearman_correlation,
};
use crate::Text2VecError;

/// Default number of sentence pairs per forward pass
pub const DEFAULT_EVAL_BATCH_SIZE: usize = 16;

pub const EVAL_PEARSON_KEY: &str = "eval_pearson";
pub const EVAL_SPEARMAN_KEY: &str = "eval_spearman";

/// Number of labels and predictions shown in debug logs
const PREVIEW_SIZE: usize = 10;

/// # Labelled sentence pair
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityExample {
    pub source: TokenizedSentence,
    pub target: TokenizedSentence,
    /// Gold similarity score. Only its ordering and linear relationship to the
    /// predictions matter, any scale can be used.
    pub label: f64,
}

impl SimilarityExample {
    pub fn new(source: TokenizedSentence, target: TokenizedSentence, label: f64) -> Self {
        Self {
            source,
            target,
            label,
        }
    }

    /// Tokenizes a raw sentence pair.
    ///
    /// # Arguments
    ///
    /// * `tokenizer` - tokenizer matching the evaluated encoder
    /// * `source` - first sentence
    /// * `target` - second sentence
    /// * `label` - gold similarity score
    /// * `max_length` - sentences are truncated to this number of tokens
    pub fn from_texts(
        tokenizer: &dyn SentenceTokenizer,
        source: &str,
        target: &str,
        label: f64,
        max_length: usize,
    ) -> Result<Self, Text2VecError> {
        Ok(Self {
            source: tokenizer.tokenize_sentence(source, max_length)?,
            target: tokenizer.tokenize_sentence(target, max_length)?,
            label,
        })
    }
}

/// # Correlation between predicted similarities and gold labels
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationResult {
    pub pearson: f64,
    pub spearman: f64,
    /// Named metrics (`eval_pearson`, `eval_spearman`)
    pub metrics: BTreeMap<String, f64>,
}

impl CorrelationResult {
    pub fn new(pearson: f64, spearman: f64) -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert(EVAL_PEARSON_KEY.to_string(), pearson);
        metrics.insert(EVAL_SPEARMAN_KEY.to_string(), spearman);
        Self {
            pearson,
            spearman,
            metrics,
        }
    }
}

/// # Semantic textual similarity evaluator
/// Embeds both sides of each labelled pair, scores the pair with the cosine similarity of
/// the two embeddings, and reports the Pearson and Spearman correlations between the
/// scores and the labels.
pub struct SimilarityEvaluator<'a> {
    encoder: &'a SentenceEncoder<'a>,
}

impl<'a> SimilarityEvaluator<'a> {
    pub fn new(encoder: &'a SentenceEncoder<'a>) -> Self {
        Self { encoder }
    }

    /// Cosine similarity of each example pair, in example order. Examples with a sentence
    /// longer than the encoder's `max_seq_length` are rejected.
    pub fn predict(
        &self,
        examples: &[SimilarityExample],
        batch_size: usize,
    ) -> Result<Vec<f64>, Text2VecError> {
        if examples.is_empty() {
            return Err(Text2VecError::InvalidInputError(
                "no example to evaluate".into(),
            ));
        }
        if batch_size == 0 {
            return Err(Text2VecError::InvalidInputError(
                "batch size must be strictly positive".into(),
            ));
        }

        let max_seq_length = self.encoder.config().max_seq_length;
        if let Some(position) = examples.iter().position(|example| {
            example.source.len() > max_seq_length || example.target.len() > max_seq_length
        }) {
            return Err(Text2VecError::InvalidInputError(format!(
                "example {} exceeds the maximum sequence length of {} tokens",
                position, max_seq_length
            )));
        }

        let pad_token_id = self.encoder.tokenizer().pad_token_id();
        let mut predictions = Vec::with_capacity(examples.len());
        for batch in examples.chunks(batch_size) {
            let sources = batch
                .iter()
                .map(|example| &example.source)
                .collect::<Vec<&TokenizedSentence>>();
            let targets = batch
                .iter()
                .map(|example| &example.target)
                .collect::<Vec<&TokenizedSentence>>();

            let source_embeddings = self
                .encoder
                .embed(&TokenizedBatch::from_sentences(&sources, pad_token_id)?)?;
            let target_embeddings = self
                .encoder
                .embed(&TokenizedBatch::from_sentences(&targets, pad_token_id)?)?;
            let similarities = cosine_similarity_tensor(&source_embeddings, &target_embeddings);
            predictions.extend(Vec::<f64>::try_from(
                similarities.to_kind(Kind::Double).to_device(Device::Cpu),
            )?);
        }
        Ok(predictions)
    }

    /// Evaluates the encoder on labelled sentence pairs.
    ///
    /// # Arguments
    ///
    /// * `examples` - labelled sentence pairs, at least two with distinct labels
    /// * `batch_size` - number of pairs per forward pass (`DEFAULT_EVAL_BATCH_SIZE` is a sensible default)
    ///
    /// # Returns
    ///
    /// * `CorrelationResult`, or a `DegenerateMetricError` if the labels or the predicted
    ///   similarities are constant
    pub fn evaluate(
        &self,
        examples: &[SimilarityExample],
        batch_size: usize,
    ) -> Result<CorrelationResult, Text2VecError> {
        let predictions = self.predict(examples, batch_size)?;
        let labels = examples
            .iter()
            .map(|example| example.label)
            .collect::<Vec<f64>>();
        debug!(
            labels = ?&labels[..labels.len().min(PREVIEW_SIZE)],
            predictions = ?&predictions[..predictions.len().min(PREVIEW_SIZE)],
            "similarity predictions"
        );

        let pearson = pearson_correlation(&labels, &predictions)?;
        let spearman = spearman_correlation(&labels, &predictions)?;
        debug!(pearson, spearman, examples = examples.len(), "similarity correlation");
        Ok(CorrelationResult::new(pearson, spearman))
    }
}
