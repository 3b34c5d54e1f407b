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
use std::fmt;
use std::path::Path;

use tracing::info;

use crate::pipelines::sentence_embeddings::{
    BertEncoderAdapter, BertSentenceTokenizer, EmbeddingsOutput, EncoderAdapter, EncoderType,
    ModelArch, ModelInfo, OutputFormat, SentenceEncoder, SentenceEncoderConfig,
    SentenceTokenizer, Sentences,
};
use crate::pipelines::similarity::{
    write_eval_results, CorrelationResult, SimilarityEvaluator, SimilarityExample,
};
use crate::{Config, Text2VecError};

/// Name of the model description file written by `SentenceModel::save_model`
pub const MODEL_INFO_FILE: &str = "model_info.json";

/// # Sentence embeddings model
/// Owns an encoder and its tokenizer, and exposes encoding and evaluation on top of a
/// `SentenceEncoder`. Evaluation results are accumulated across calls to `eval_model`.
///
/// Models backed by a BERT checkpoint are usually created with a `SentenceModelBuilder`.
pub struct SentenceModel<E = BertEncoderAdapter, T = BertSentenceTokenizer> {
    encoder: E,
    tokenizer: T,
    config: SentenceEncoderConfig,
    model_arch: ModelArch,
    model_name_or_path: Option<String>,
    results: BTreeMap<String, f64>,
}

impl<E: EncoderAdapter, T: SentenceTokenizer> SentenceModel<E, T> {
    /// Build a new `SentenceModel` from an encoder and a tokenizer
    ///
    /// # Arguments
    ///
    /// * `encoder` - transformer encoder
    /// * `tokenizer` - tokenizer matching the encoder vocabulary
    /// * `config` - `SentenceEncoderConfig` with the pooling strategy and maximum sequence length
    ///
    /// Fails with an `InvalidConfigurationError` if the `Pooler` strategy is selected and
    /// the encoder has no pooling head.
    pub fn new(
        encoder: E,
        tokenizer: T,
        config: SentenceEncoderConfig,
    ) -> Result<Self, Text2VecError> {
        SentenceEncoder::new(&encoder, &tokenizer, config.clone())?;
        Ok(Self {
            encoder,
            tokenizer,
            config,
            model_arch: ModelArch::default(),
            model_name_or_path: None,
            results: BTreeMap::new(),
        })
    }

    pub fn with_model_arch(mut self, model_arch: ModelArch) -> Self {
        self.model_arch = model_arch;
        self
    }

    pub fn with_model_name_or_path<S: Into<String>>(mut self, model_name_or_path: S) -> Self {
        self.model_name_or_path = Some(model_name_or_path.into());
        self
    }

    /// Returns a `SentenceEncoder` borrowing the model's encoder and tokenizer.
    pub fn encoder(&self) -> Result<SentenceEncoder<'_>, Text2VecError> {
        SentenceEncoder::new(&self.encoder, &self.tokenizer, self.config.clone())
    }

    pub fn get_encoder(&self) -> &E {
        &self.encoder
    }

    pub fn get_tokenizer(&self) -> &T {
        &self.tokenizer
    }

    pub fn config(&self) -> &SentenceEncoderConfig {
        &self.config
    }

    pub fn model_arch(&self) -> ModelArch {
        self.model_arch
    }

    pub fn encoder_type(&self) -> EncoderType {
        self.config.encoder_type
    }

    pub fn max_seq_length(&self) -> usize {
        self.config.max_seq_length
    }

    pub fn model_name_or_path(&self) -> Option<&str> {
        self.model_name_or_path.as_deref()
    }

    /// Dimension of the sentence embeddings
    pub fn embedding_dimension(&self) -> i64 {
        self.encoder.hidden_size()
    }

    /// Computes sentence embeddings, see `SentenceEncoder::encode`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use text2vec::pipelines::sentence_embeddings::{OutputFormat, SentenceModelBuilder};
    /// # fn main() -> Result<(), text2vec::Text2VecError> {
    /// let model = SentenceModelBuilder::local("path/to/text2vec-base-chinese").create_model()?;
    /// let embeddings = model
    ///     .encode(&["如何更换花呗绑定银行卡", "花呗更改绑定银行卡"], 32, OutputFormat::Vectors)?
    ///     .into_embeddings()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn encode<'s, S>(
        &self,
        sentences: S,
        batch_size: usize,
        output_format: OutputFormat,
    ) -> Result<EmbeddingsOutput, Text2VecError>
    where
        S: Into<Sentences<'s>>,
    {
        self.encoder()?.encode(sentences, batch_size, output_format)
    }

    /// Tokenizes a raw sentence pair with the model's tokenizer and maximum sequence length.
    pub fn example(
        &self,
        source: &str,
        target: &str,
        label: f64,
    ) -> Result<SimilarityExample, Text2VecError> {
        SimilarityExample::from_texts(
            &self.tokenizer,
            source,
            target,
            label,
            self.config.max_seq_length,
        )
    }

    /// Correlation between the cosine similarities of the example pairs and their labels.
    /// Does not update the accumulated results.
    pub fn evaluate(
        &self,
        examples: &[SimilarityExample],
        batch_size: usize,
    ) -> Result<CorrelationResult, Text2VecError> {
        let encoder = self.encoder()?;
        SimilarityEvaluator::new(&encoder).evaluate(examples, batch_size)
    }

    /// Evaluates the model and merges the metrics into `results()`.
    ///
    /// # Arguments
    ///
    /// * `examples` - labelled sentence pairs
    /// * `output_dir` - if given, the evaluation report is written to `output_dir/eval_results.txt`
    /// * `verbose` - log the accumulated results
    /// * `batch_size` - number of pairs per forward pass
    pub fn eval_model(
        &mut self,
        examples: &[SimilarityExample],
        output_dir: Option<&Path>,
        verbose: bool,
        batch_size: usize,
    ) -> Result<CorrelationResult, Text2VecError> {
        let result = self.evaluate(examples, batch_size)?;
        self.results.extend(result.metrics.clone());
        if verbose {
            info!(results = ?self.results, "evaluation results");
        }
        if let Some(output_dir) = output_dir {
            write_eval_results(output_dir, &result.metrics)?;
        }
        Ok(result)
    }

    /// Metrics accumulated by `eval_model`
    pub fn results(&self) -> &BTreeMap<String, f64> {
        &self.results
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo::new(self.model_arch, Some(self.config.encoder_type))
    }
}

impl<E, T> fmt::Display for SentenceModel<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<model_arch: {}, model_name_or_path: {}, max_seq_length: {}, encoder_type: {}>",
            self.model_arch,
            self.model_name_or_path.as_deref().unwrap_or("None"),
            self.config.max_seq_length,
            self.config.encoder_type
        )
    }
}

impl SentenceModel<BertEncoderAdapter, BertSentenceTokenizer> {
    /// Saves the model to `output_dir`: weights (`rust_model.ot`), transformer
    /// configuration (`config.json`), vocabulary (`vocab.txt`), model description
    /// (`model_info.json`) and, if given, an evaluation report (`eval_results.txt`).
    pub fn save_model<P: AsRef<Path>>(
        &self,
        output_dir: P,
        results: Option<&BTreeMap<String, f64>>,
    ) -> Result<(), Text2VecError> {
        let output_dir = output_dir.as_ref();
        info!(output_dir = %output_dir.display(), "saving model");

        self.encoder.save(output_dir)?;
        let vocab_path = output_dir.join("vocab.txt");
        if self.tokenizer.vocab_path() != vocab_path.as_path() {
            std::fs::copy(self.tokenizer.vocab_path(), &vocab_path)?;
        }
        self.model_info().to_file(output_dir.join(MODEL_INFO_FILE))?;
        if let Some(results) = results {
            write_eval_results(output_dir, results)?;
        }
        Ok(())
    }
}
