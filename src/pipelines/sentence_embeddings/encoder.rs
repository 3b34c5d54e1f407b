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

use std::cmp::Reverse;
use std::convert::TryFrom;

use tch::{Device, Kind, Tensor};
use tracing::debug;

use crate::pipelines::sentence_embeddings::{
    Embedding, EncoderAdapter, SentenceEncoderConfig, SentenceTokenizer, TokenizedBatch,
};
use crate::Text2VecError;

/// Batch size used by the `encode_single` and `encode_list` helpers
pub const DEFAULT_ENCODE_BATCH_SIZE: usize = 64;

/// # Sentences to encode
/// Either a single sentence, encoded to a single embedding, or an ordered list of sentences.
#[derive(Debug, Clone)]
pub enum Sentences<'a> {
    Single(&'a str),
    List(Vec<&'a str>),
}

impl<'a> From<&'a str> for Sentences<'a> {
    fn from(sentence: &'a str) -> Self {
        Sentences::Single(sentence)
    }
}

impl<'a> From<&'a String> for Sentences<'a> {
    fn from(sentence: &'a String) -> Self {
        Sentences::Single(sentence.as_str())
    }
}

impl<'a, S: AsRef<str>> From<&'a [S]> for Sentences<'a> {
    fn from(sentences: &'a [S]) -> Self {
        Sentences::List(sentences.iter().map(AsRef::as_ref).collect())
    }
}

impl<'a, S: AsRef<str>, const N: usize> From<&'a [S; N]> for Sentences<'a> {
    fn from(sentences: &'a [S; N]) -> Self {
        Sentences::from(&sentences[..])
    }
}

impl<'a, S: AsRef<str>> From<&'a Vec<S>> for Sentences<'a> {
    fn from(sentences: &'a Vec<S>) -> Self {
        Sentences::from(sentences.as_slice())
    }
}

/// # Output format of `SentenceEncoder::encode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One `Vec<f32>` per sentence, copied to CPU memory
    Vectors,
    /// A single tensor left on the encoder's device
    Tensor,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Vectors
    }
}

/// # Embeddings returned by `SentenceEncoder::encode`
pub enum EmbeddingsOutput {
    /// Embedding of a single input sentence
    Embedding(Embedding),
    /// Embeddings of a list of sentences, in input order
    Embeddings(Vec<Embedding>),
    /// Tensor of shape (*hidden_size*) for a single sentence or (*num sentences*, *hidden_size*) for a list
    Tensor(Tensor),
}

impl EmbeddingsOutput {
    /// Returns the embedding of a single sentence.
    pub fn into_embedding(self) -> Result<Embedding, Text2VecError> {
        match self {
            EmbeddingsOutput::Embedding(embedding) => Ok(embedding),
            EmbeddingsOutput::Tensor(tensor) if tensor.dim() == 1 => Ok(Vec::<f32>::try_from(
                tensor.to_kind(Kind::Float).to_device(Device::Cpu),
            )?),
            _ => Err(Text2VecError::InvalidInputError(
                "output holds the embeddings of a list of sentences".into(),
            )),
        }
    }

    /// Returns the embeddings of a list of sentences.
    pub fn into_embeddings(self) -> Result<Vec<Embedding>, Text2VecError> {
        match self {
            EmbeddingsOutput::Embeddings(embeddings) => Ok(embeddings),
            EmbeddingsOutput::Tensor(tensor) if tensor.dim() == 2 => Ok(
                Vec::<Vec<f32>>::try_from(tensor.to_kind(Kind::Float).to_device(Device::Cpu))?,
            ),
            _ => Err(Text2VecError::InvalidInputError(
                "output holds the embedding of a single sentence".into(),
            )),
        }
    }

    /// Returns the embeddings as a tensor. An empty list of embeddings gives a tensor
    /// of shape (0, 0).
    pub fn into_tensor(self) -> Tensor {
        match self {
            EmbeddingsOutput::Embedding(embedding) => Tensor::from_slice(&embedding),
            EmbeddingsOutput::Embeddings(embeddings) if embeddings.is_empty() => {
                Tensor::zeros([0, 0], (Kind::Float, Device::Cpu))
            }
            EmbeddingsOutput::Embeddings(embeddings) => Tensor::stack(
                &embeddings
                    .iter()
                    .map(|embedding| Tensor::from_slice(embedding))
                    .collect::<Vec<Tensor>>(),
                0,
            ),
            EmbeddingsOutput::Tensor(tensor) => tensor,
        }
    }
}

/// # Batched sentence encoder
/// Tokenizes sentences, runs them through an `EncoderAdapter` batch by batch and pools
/// the hidden states with the configured `EncoderType`. The encoder and tokenizer are
/// borrowed for the lifetime of the `SentenceEncoder`.
pub struct SentenceEncoder<'a> {
    encoder: &'a dyn EncoderAdapter,
    tokenizer: &'a dyn SentenceTokenizer,
    config: SentenceEncoderConfig,
}

impl<'a> SentenceEncoder<'a> {
    /// Build a new `SentenceEncoder`
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
        encoder: &'a dyn EncoderAdapter,
        tokenizer: &'a dyn SentenceTokenizer,
        config: SentenceEncoderConfig,
    ) -> Result<Self, Text2VecError> {
        if config.encoder_type.requires_pooler() && !encoder.has_pooler() {
            return Err(Text2VecError::InvalidConfigurationError(format!(
                "{} encoder type requires an encoder with a pooling layer",
                config.encoder_type
            )));
        }
        Ok(Self {
            encoder,
            tokenizer,
            config,
        })
    }

    pub fn config(&self) -> &SentenceEncoderConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &'a dyn SentenceTokenizer {
        self.tokenizer
    }

    /// Runs inference on a tokenized batch and pools the output.
    ///
    /// # Returns
    ///
    /// * `Tensor` of shape (*batch size*, *hidden_size*) on the encoder's device
    pub fn embed(&self, batch: &TokenizedBatch) -> Result<Tensor, Text2VecError> {
        let batch = batch.to_device(self.encoder.device());
        let encoder_type = self.config.encoder_type;
        tch::no_grad(|| {
            let output = self
                .encoder
                .forward(&batch, encoder_type.requires_all_layers())?;
            encoder_type.pool(&output, batch.attention_mask())
        })
    }

    /// Computes sentence embeddings.
    ///
    /// Sentences are sorted by decreasing length and processed in batches of at most
    /// `batch_size` sentences. The output follows the input order.
    ///
    /// # Arguments
    ///
    /// * `sentences` - a single sentence (`&str`) or a list of sentences
    /// * `batch_size` - maximum number of sentences per forward pass
    /// * `output_format` - `OutputFormat::Vectors` or `OutputFormat::Tensor`
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use text2vec::pipelines::sentence_embeddings::{SentenceModelBuilder, OutputFormat};
    /// # fn main() -> Result<(), text2vec::Text2VecError> {
    /// let model = SentenceModelBuilder::local("path/to/model").create_model()?;
    /// let encoder = model.encoder()?;
    /// let embeddings = encoder
    ///     .encode(&["This is an example sentence", "Each sentence is converted"], 64, OutputFormat::Vectors)?
    ///     .into_embeddings()?;
    /// let embedding = encoder
    ///     .encode("hi", 64, OutputFormat::Vectors)?
    ///     .into_embedding()?;
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
        let (sentences, single_input) = match sentences.into() {
            Sentences::Single(sentence) => (vec![sentence], true),
            Sentences::List(sentences) => (sentences, false),
        };
        let embeddings = self.encode_sorted(&sentences, batch_size)?;

        Ok(match (output_format, single_input) {
            (OutputFormat::Tensor, true) => EmbeddingsOutput::Tensor(embeddings.get(0)),
            (OutputFormat::Tensor, false) => EmbeddingsOutput::Tensor(embeddings),
            (OutputFormat::Vectors, single_input) => {
                let mut embeddings = Vec::<Embedding>::try_from(
                    embeddings.to_kind(Kind::Float).to_device(Device::Cpu),
                )?;
                if single_input {
                    EmbeddingsOutput::Embedding(embeddings.swap_remove(0))
                } else {
                    EmbeddingsOutput::Embeddings(embeddings)
                }
            }
        })
    }

    /// Computes the embedding of a single sentence.
    pub fn encode_single(&self, sentence: &str) -> Result<Embedding, Text2VecError> {
        self.encode(sentence, DEFAULT_ENCODE_BATCH_SIZE, OutputFormat::Vectors)?
            .into_embedding()
    }

    /// Computes the embeddings of a list of sentences.
    pub fn encode_list<S: AsRef<str>>(
        &self,
        sentences: &[S],
    ) -> Result<Vec<Embedding>, Text2VecError> {
        self.encode(sentences, DEFAULT_ENCODE_BATCH_SIZE, OutputFormat::Vectors)?
            .into_embeddings()
    }

    fn encode_sorted(
        &self,
        sentences: &[&str],
        batch_size: usize,
    ) -> Result<Tensor, Text2VecError> {
        if sentences.is_empty() {
            return Err(Text2VecError::InvalidInputError("no sentence to encode".into()));
        }
        if batch_size == 0 {
            return Err(Text2VecError::InvalidInputError(
                "batch size must be strictly positive".into(),
            ));
        }

        let mut length_sorted_idx = (0..sentences.len()).collect::<Vec<usize>>();
        length_sorted_idx.sort_by_key(|&idx| Reverse(sentences[idx].chars().count()));
        debug!(
            sentences = sentences.len(),
            batch_size,
            encoder_type = %self.config.encoder_type,
            "encoding sentences"
        );

        let mut batch_embeddings = Vec::with_capacity(sentences.len() / batch_size + 1);
        for batch_idx in length_sorted_idx.chunks(batch_size) {
            let batch_sentences = batch_idx
                .iter()
                .map(|&idx| sentences[idx])
                .collect::<Vec<&str>>();
            let tokenized = self
                .tokenizer
                .tokenize(&batch_sentences, self.config.max_seq_length)?;
            batch_embeddings.push(self.embed(&tokenized)?);
        }
        let sorted_embeddings = Tensor::cat(&batch_embeddings, 0);

        let mut restore_idx = vec![0i64; sentences.len()];
        for (position, &idx) in length_sorted_idx.iter().enumerate() {
            restore_idx[idx] = position as i64;
        }
        let restore_idx = Tensor::from_slice(&restore_idx).to_device(sorted_embeddings.device());
        Ok(sorted_embeddings.index_select(0, &restore_idx))
    }
}
