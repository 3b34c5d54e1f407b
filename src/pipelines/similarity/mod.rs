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

//! # Semantic textual similarity evaluation
//!
//! Scores labelled sentence pairs with the cosine similarity of their embeddings and
//! measures how well the scores agree with the labels (Pearson and Spearman correlations).
//!
//! ```no_run
//! use text2vec::pipelines::sentence_embeddings::SentenceModelBuilder;
//! use text2vec::pipelines::similarity::{load_similarity_pairs, DEFAULT_EVAL_BATCH_SIZE};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut model = SentenceModelBuilder::local("path/to/text2vec-base-chinese").create_model()?;
//! let examples = load_similarity_pairs("path/to/STS-B.test.data")?
//!     .iter()
//!     .map(|(source, target, label)| model.example(source, target, *label))
//!     .collect::<Result<Vec<_>, _>>()?;
//! let result = model.eval_model(&examples, None, true, DEFAULT_EVAL_BATCH_SIZE)?;
//! println!("spearman: {}", result.spearman);
//! # Ok(())
//! # }
//! ```

mod data;
mod evaluator;
mod metrics;
mod report;

pub use data::load_similarity_pairs;
pub use evaluator::{
    CorrelationResult, SimilarityEvaluator, SimilarityExample, DEFAULT_EVAL_BATCH_SIZE,
    EVAL_PEARSON_KEY, EVAL_SPEARMAN_KEY,
};
pub use metrics::{
    cosine_similarity, cosine_similarity_tensor, pearson_correlation, spearman_correlation,
    COSINE_EPS, ZERO_VARIANCE_TOLERANCE,
};
pub use report::{format_results, write_eval_results, EVAL_RESULTS_FILE};
