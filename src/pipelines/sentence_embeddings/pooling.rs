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

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tch::{Kind, Tensor};

use crate::pipelines::sentence_embeddings::EncoderOutput;
use crate::Text2VecError;

/// # Sentence embedding pooling strategy
/// Reduces the token representations returned by the encoder to a single vector per sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncoderType {
    /// Average of the sequence means of the first and last transformer layers
    FirstLastAvg,
    /// Sequence mean of the last layer, padding positions included
    LastAvg,
    /// Last layer representation of the first (`[CLS]`) token
    Cls,
    /// Output of the encoder's pooling head
    Pooler,
    /// Attention-mask weighted mean of the last layer
    Mean,
}

impl EncoderType {
    /// Pools the encoder output into one embedding per sentence.
    ///
    /// # Arguments
    ///
    /// * `output` - `EncoderOutput` for a batch. `FirstLastAvg` needs at least two entries in `all_hidden_states`,
    ///   `Pooler` needs a `pooled_output`.
    /// * `attention_mask` - mask of shape (*batch size*, *sequence_length*), every row must contain a non-zero entry
    ///
    /// # Returns
    ///
    /// * `Tensor` of shape (*batch size*, *hidden_size*)
    pub fn pool(
        &self,
        output: &EncoderOutput,
        attention_mask: &Tensor,
    ) -> Result<Tensor, Text2VecError> {
        check_attention_mask(attention_mask, &output.last_hidden_state)?;

        let pooled = match self {
            EncoderType::FirstLastAvg => {
                let layers = output
                    .all_hidden_states
                    .as_ref()
                    .filter(|layers| layers.len() >= 2)
                    .ok_or_else(|| {
                        Text2VecError::InvalidInputError(
                            "FIRST_LAST_AVG pooling requires the hidden states of at least 2 layers"
                                .into(),
                        )
                    })?;
                let first_avg = sequence_mean(&layers[0]);
                let last_avg = sequence_mean(&layers[layers.len() - 1]);
                (first_avg + last_avg) / 2.0
            }
            EncoderType::LastAvg => sequence_mean(&output.last_hidden_state),
            EncoderType::Cls => output.last_hidden_state.select(1, 0),
            EncoderType::Pooler => output
                .pooled_output
                .as_ref()
                .map(Tensor::shallow_clone)
                .ok_or_else(|| {
                    Text2VecError::InvalidConfigurationError(
                        "POOLER encoder type selected but the encoder provides no pooled output"
                            .into(),
                    )
                })?,
            EncoderType::Mean => masked_mean(&output.last_hidden_state, attention_mask),
        };
        Ok(pooled)
    }

    /// Whether the hidden states of every layer are needed, not only the last one
    pub fn requires_all_layers(&self) -> bool {
        matches!(self, EncoderType::FirstLastAvg)
    }

    /// Whether the encoder must expose a pooling head
    pub fn requires_pooler(&self) -> bool {
        matches!(self, EncoderType::Pooler)
    }

    fn name(&self) -> &'static str {
        match self {
            EncoderType::FirstLastAvg => "FIRST_LAST_AVG",
            EncoderType::LastAvg => "LAST_AVG",
            EncoderType::Cls => "CLS",
            EncoderType::Pooler => "POOLER",
            EncoderType::Mean => "MEAN",
        }
    }
}

impl Default for EncoderType {
    fn default() -> Self {
        EncoderType::FirstLastAvg
    }
}

impl fmt::Display for EncoderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncoderType {
    type Err = Text2VecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FIRST_LAST_AVG" => Ok(EncoderType::FirstLastAvg),
            "LAST_AVG" => Ok(EncoderType::LastAvg),
            "CLS" => Ok(EncoderType::Cls),
            "POOLER" => Ok(EncoderType::Pooler),
            "MEAN" => Ok(EncoderType::Mean),
            _ => Err(Text2VecError::InvalidConfigurationError(format!(
                "unknown encoder type `{}`, expected one of FIRST_LAST_AVG, LAST_AVG, CLS, POOLER, MEAN",
                s
            ))),
        }
    }
}

fn check_attention_mask(
    attention_mask: &Tensor,
    hidden_state: &Tensor,
) -> Result<(), Text2VecError> {
    let mask_shape = attention_mask.size();
    let hidden_shape = hidden_state.size();
    if mask_shape.len() != 2 || mask_shape.iter().any(|&dim| dim == 0) {
        return Err(Text2VecError::InvalidInputError(format!(
            "attention mask must be a non-empty (batch, sequence) tensor, got shape {:?}",
            mask_shape
        )));
    }
    if hidden_shape.len() != 3 || hidden_shape[..2] != mask_shape[..] {
        return Err(Text2VecError::InvalidInputError(format!(
            "attention mask shape {:?} does not match hidden states shape {:?}",
            mask_shape, hidden_shape
        )));
    }
    let tokens_per_sentence = attention_mask
        .ne(0)
        .sum_dim_intlist([1i64].as_slice(), false, Kind::Int64);
    let empty_sentences = i64::try_from(tokens_per_sentence.eq(0).sum(Kind::Int64))?;
    if empty_sentences > 0 {
        return Err(Text2VecError::InvalidInputError(format!(
            "{} sentence(s) with an all-zero attention mask",
            empty_sentences
        )));
    }
    Ok(())
}

/// Unweighted mean over the sequence dimension, padding positions included.
fn sequence_mean(hidden_state: &Tensor) -> Tensor {
    hidden_state.mean_dim([1i64].as_slice(), false, hidden_state.kind())
}

fn masked_mean(token_embeddings: &Tensor, attention_mask: &Tensor) -> Tensor {
    let input_mask_expanded = attention_mask
        .unsqueeze(-1)
        .expand_as(token_embeddings)
        .to_kind(token_embeddings.kind());
    let sum_embeddings = (token_embeddings * &input_mask_expanded).sum_dim_intlist(
        [1i64].as_slice(),
        false,
        token_embeddings.kind(),
    );
    let sum_mask = input_mask_expanded
        .sum_dim_intlist([1i64].as_slice(), false, token_embeddings.kind())
        .clamp_min(1e-9);
    sum_embeddings / sum_mask
}
