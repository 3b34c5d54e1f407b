//! # Sentence Embeddings pipeline
//!
//! Compute fixed-size sentence embeddings from the hidden states of a transformer
//! encoder. Embeddings can be compared with cosine similarity to find sentences with a
//! similar meaning (semantic textual similarity, semantic search, paraphrase mining).
//!
//! Five pooling strategies are available (`EncoderType`):
//! - `FirstLastAvg`: average of the first and last layers, then average over tokens
//! - `LastAvg`: average of the last layer over tokens
//! - `Cls`: hidden state of the first token of the last layer
//! - `Pooler`: output of the model's pooling head
//! - `Mean`: average of the last layer over non-padding tokens
//!
//! Models trained with CoSENT or Sentence-BERT on top of a BERT checkpoint can be
//! loaded from a local directory after conversion of their weights to the `rust_model.ot`
//! format.
//!
//! ```no_run
//! use text2vec::pipelines::sentence_embeddings::{OutputFormat, SentenceModelBuilder};
//!
//! # fn main() -> anyhow::Result<()> {
//! let model = SentenceModelBuilder::local("local/path/to/text2vec-base-chinese")
//!     .with_device(tch::Device::cuda_if_available())
//!     .create_model()?;
//!
//! let sentences = ["如何更换花呗绑定银行卡", "花呗更改绑定银行卡"];
//! let embeddings = model
//!     .encode(&sentences, 64, OutputFormat::Vectors)?
//!     .into_embeddings()?;
//! # Ok(())
//! # }
//! ```
//!
//! Any encoder or tokenizer can be plugged in by implementing the `EncoderAdapter` and
//! `SentenceTokenizer` traits.

mod adapter;
pub mod builder;
mod config;
mod encoder;
mod model;
mod pooling;
mod tokenizer;

pub use adapter::{BertEncoderAdapter, EncoderAdapter, EncoderOutput};
pub use builder::SentenceModelBuilder;
pub use config::{
    ModelArch, ModelInfo, SentenceEncoderConfig, TokenizerConfig, DEFAULT_MAX_SEQ_LENGTH,
};
pub use encoder::{
    EmbeddingsOutput, OutputFormat, SentenceEncoder, Sentences, DEFAULT_ENCODE_BATCH_SIZE,
};
pub use model::{SentenceModel, MODEL_INFO_FILE};
pub use pooling::EncoderType;
pub use tokenizer::{BertSentenceTokenizer, SentenceTokenizer, TokenizedBatch, TokenizedSentence};

/// Length = hidden size
pub type Embedding = Vec<f32>;
