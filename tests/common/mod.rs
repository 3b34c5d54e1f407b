#![allow(dead_code)]

use std::cell::Cell;

use tch::{Device, Kind, Tensor};
use text2vec::pipelines::sentence_embeddings::{
    EncoderAdapter, EncoderOutput, SentenceTokenizer, TokenizedBatch, TokenizedSentence,
};
use text2vec::Text2VecError;

pub const CLS_TOKEN_ID: i64 = 101;
pub const SEP_TOKEN_ID: i64 = 102;
pub const PAD_TOKEN_ID: i64 = 0;

/// Whitespace tokenizer: every word gets an id derived from its characters,
/// wrapped in `[CLS]` / `[SEP]`.
pub struct WhitespaceTokenizer;

impl WhitespaceTokenizer {
    fn word_id(word: &str) -> i64 {
        3 + word.chars().map(|c| c as i64).sum::<i64>() % 97
    }
}

impl SentenceTokenizer for WhitespaceTokenizer {
    fn tokenize_sentences(
        &self,
        sentences: &[&str],
        max_length: usize,
    ) -> Result<Vec<TokenizedSentence>, Text2VecError> {
        sentences
            .iter()
            .map(|sentence| {
                let mut token_ids = vec![CLS_TOKEN_ID];
                token_ids.extend(
                    sentence
                        .split_whitespace()
                        .map(Self::word_id)
                        .take(max_length.saturating_sub(2)),
                );
                token_ids.push(SEP_TOKEN_ID);
                TokenizedSentence::from_token_ids(token_ids)
            })
            .collect()
    }

    fn pad_token_id(&self) -> i64 {
        PAD_TOKEN_ID
    }
}

/// Deterministic encoder: layer `l` maps token id `t` to `(l + 1) * sin(t * [1, 2, .., h] / 10)`.
/// The pooled output is `tanh` of the last layer's first position.
pub struct MockEncoder {
    pub hidden_size: i64,
    pub num_layers: i64,
    pub with_pooler: bool,
    pub failing: bool,
    pub forward_calls: Cell<usize>,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self {
            hidden_size: 8,
            num_layers: 3,
            with_pooler: true,
            failing: false,
            forward_calls: Cell::new(0),
        }
    }

    pub fn without_pooler() -> Self {
        Self {
            with_pooler: false,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }
}

impl EncoderAdapter for MockEncoder {
    fn forward(
        &self,
        input: &TokenizedBatch,
        output_all_layers: bool,
    ) -> Result<EncoderOutput, Text2VecError> {
        self.forward_calls.set(self.forward_calls.get() + 1);
        if self.failing {
            return Err(Text2VecError::AdapterError("mock encoder failure".into()));
        }

        let frequencies =
            Tensor::arange_start(1, self.hidden_size + 1, (Kind::Float, Device::Cpu)) / 10.0;
        let base = (input.input_ids().to_kind(Kind::Float).unsqueeze(-1) * frequencies).sin();
        let layers = (0..self.num_layers)
            .map(|layer| &base * (layer + 1) as f64)
            .collect::<Vec<Tensor>>();

        let last_hidden_state = layers[layers.len() - 1].shallow_clone();
        let pooled_output = if self.with_pooler {
            Some(last_hidden_state.select(1, 0).tanh())
        } else {
            None
        };
        Ok(EncoderOutput {
            last_hidden_state,
            all_hidden_states: if output_all_layers { Some(layers) } else { None },
            pooled_output,
        })
    }

    fn has_pooler(&self) -> bool {
        self.with_pooler
    }

    fn hidden_size(&self) -> i64 {
        self.hidden_size
    }

    fn device(&self) -> Device {
        Device::Cpu
    }
}

pub fn assert_embeddings_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!((a - e).abs() < 1e-4, "expected {:?}, got {:?}", expected, actual);
    }
}
