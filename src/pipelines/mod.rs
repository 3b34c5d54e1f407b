//! # Sentence embedding pipelines
//!
//! #### 1. Sentence embeddings
//! Encode sentences into fixed-size vectors with a transformer encoder and a pooling
//! strategy. See `sentence_embeddings` for the available strategies and model loading.
//!
//! #### 2. Similarity evaluation
//! Score labelled sentence pairs with the cosine similarity of their embeddings and
//! report Pearson and Spearman correlations with the labels. See `similarity`.

pub mod sentence_embeddings;
pub mod similarity;
