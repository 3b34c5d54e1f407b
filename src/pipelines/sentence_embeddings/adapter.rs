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

use std::path::Path;

use rust_bert::bert::{BertConfig, BertEmbeddings, BertModel};
use tch::{nn, Device, Tensor};

use crate::pipelines::sentence_embeddings::TokenizedBatch;
use crate::{Config, Text2VecError};

impl Config for BertConfig {}

/// Container for the encoder adapter output.
pub struct EncoderOutput {
    /// Last hidden states, shape (*batch size*, *sequence_length*, *hidden_size*)
    pub last_hidden_state: Tensor,
    /// Outputs of every transformer layer, first layer first. The embedding layer output is not included.
    pub all_hidden_states: Option<Vec<Tensor>>,
    /// Output of the model's pooling head, shape (*batch size*, *hidden_size*)
    pub pooled_output: Option<Tensor>,
}

/// # Transformer encoder capability
/// Runs the forward pass of a pretrained encoder. Implementations are expected to be
/// deterministic for identical inputs and never to update their weights.
pub trait EncoderAdapter {
    /// Forward pass on a tokenized batch.
    ///
    /// # Arguments
    ///
    /// * `input` - padded `TokenizedBatch`, already placed on the adapter's device
    /// * `output_all_layers` - return the hidden states of every layer, not only the last one
    fn forward(
        &self,
        input: &TokenizedBatch,
        output_all_layers: bool,
    ) -> Result<EncoderOutput, Text2VecError>;

    /// Whether the encoder has a learned pooling head
    fn has_pooler(&self) -> bool;

    /// Size of the token representations
    fn hidden_size(&self) -> i64;

    /// Device the weights are placed on
    fn device(&self) -> Device;
}

/// # BERT encoder
/// `EncoderAdapter` backed by a `rust-bert` `BertModel`, with weights loaded from a
/// `rust_model.ot` file.
pub struct BertEncoderAdapter {
    var_store: nn::VarStore,
    model: BertModel<BertEmbeddings>,
    config: BertConfig,
    has_pooler: bool,
}

impl BertEncoderAdapter {
    /// Build a new `BertEncoderAdapter`
    ///
    /// # Arguments
    ///
    /// * `config_path` - path to the transformer `config.json`
    /// * `weights_path` - path to the converted `rust_model.ot` weights
    /// * `device` - device to place the model on
    /// * `add_pooling_layer` - create (and load) the model's pooling head
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tch::Device;
    /// use text2vec::pipelines::sentence_embeddings::BertEncoderAdapter;
    ///
    /// let encoder = BertEncoderAdapter::new(
    ///     "path/to/config.json",
    ///     "path/to/rust_model.ot",
    ///     Device::cuda_if_available(),
    ///     true,
    /// )?;
    /// # Ok::<(), text2vec::Text2VecError>(())
    /// ```
    pub fn new<C: AsRef<Path>, W: AsRef<Path>>(
        config_path: C,
        weights_path: W,
        device: Device,
        add_pooling_layer: bool,
    ) -> Result<Self, Text2VecError> {
        let config = BertConfig::from_file(config_path)?;
        Self::from_config(config, weights_path, device, add_pooling_layer)
    }

    /// Build a new `BertEncoderAdapter` from an already loaded configuration.
    pub fn from_config<W: AsRef<Path>>(
        mut config: BertConfig,
        weights_path: W,
        device: Device,
        add_pooling_layer: bool,
    ) -> Result<Self, Text2VecError> {
        config.output_hidden_states = Some(true);
        config.output_attentions = Some(false);

        let mut var_store = nn::VarStore::new(device);
        let model = BertModel::<BertEmbeddings>::new_with_optional_pooler(
            var_store.root(),
            &config,
            add_pooling_layer,
        );
        var_store.load(weights_path)?;

        Ok(Self {
            var_store,
            model,
            config,
            has_pooler: add_pooling_layer,
        })
    }

    /// Transformer configuration of the loaded model
    pub fn config(&self) -> &BertConfig {
        &self.config
    }

    /// Saves the model weights (`rust_model.ot`) and configuration (`config.json`) to `output_dir`.
    pub fn save<P: AsRef<Path>>(&self, output_dir: P) -> Result<(), Text2VecError> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;
        self.var_store.save(output_dir.join("rust_model.ot"))?;
        self.config.to_file(output_dir.join("config.json"))
    }
}

impl EncoderAdapter for BertEncoderAdapter {
    fn forward(
        &self,
        input: &TokenizedBatch,
        output_all_layers: bool,
    ) -> Result<EncoderOutput, Text2VecError> {
        let output = self.model.forward_t(
            Some(input.input_ids()),
            Some(input.attention_mask()),
            Some(input.token_type_ids()),
            None,
            None,
            None,
            None,
            false,
        )?;

        let all_hidden_states = if output_all_layers {
            Some(output.all_hidden_states.ok_or_else(|| {
                Text2VecError::AdapterError("BERT model returned no intermediate layer".into())
            })?)
        } else {
            None
        };

        Ok(EncoderOutput {
            last_hidden_state: output.hidden_state,
            all_hidden_states,
            pooled_output: output.pooled_output,
        })
    }

    fn has_pooler(&self) -> bool {
        self.has_pooler
    }

    fn hidden_size(&self) -> i64 {
        self.config.hidden_size
    }

    fn device(&self) -> Device {
        self.var_store.device()
    }
}
