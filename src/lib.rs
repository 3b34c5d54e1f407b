//! # text2vec
//!
//! Sentence embeddings computed from pretrained transformer encoders, with an evaluator
//! measuring how well embedding similarities agree with human similarity judgements.
//!
//! - Five pooling strategies turning token representations into sentence embeddings
//!   (`FIRST_LAST_AVG`, `LAST_AVG`, `CLS`, `POOLER`, `MEAN`)
//! - Batched encoding of sentences sorted by length, with the output in input order
//! - Evaluation on labelled sentence pairs with Pearson and Spearman correlations
//! - Loading and saving of BERT-based models converted to the `rust_model.ot` format
//!
//! The encoder runs on [tch-rs](https://github.com/LaurentMazare/tch-rs) (libtorch) and
//! the BERT implementation of [rust-bert](https://github.com/guillaume-be/rust-bert).
//! Tokenization relies on [rust_tokenizers](https://github.com/guillaume-be/rust-tokenizers).
//!
//! ```no_run
//! use text2vec::pipelines::sentence_embeddings::{OutputFormat, SentenceModelBuilder};
//! use text2vec::pipelines::similarity::cosine_similarity;
//!
//! # fn main() -> anyhow::Result<()> {
//! let model = SentenceModelBuilder::local("path/to/text2vec-base-chinese").create_model()?;
//! let embeddings = model
//!     .encode(&["如何更换花呗绑定银行卡", "花呗更改绑定银行卡"], 64, OutputFormat::Vectors)?
//!     .into_embeddings()?;
//! let score = cosine_similarity(&embeddings[0], &embeddings[1]);
//! # Ok(())
//! # }
//! ```
//!
//! Encoders and tokenizers other than BERT can be used by implementing the
//! `EncoderAdapter` and `SentenceTokenizer` traits of the `sentence_embeddings` module.

pub mod common;
pub mod pipelines;

pub use common::error::Text2VecError;
pub use common::Config;
