use std::path::PathBuf;

use rust_bert::bert::BertConfig;
use tch::Device;
use tracing::debug;

use crate::pipelines::sentence_embeddings::{
    BertEncoderAdapter, BertSentenceTokenizer, EncoderType, ModelArch, SentenceEncoderConfig,
    SentenceModel, TokenizerConfig, DEFAULT_MAX_SEQ_LENGTH,
};
use crate::{Config, Text2VecError};

/// # Sentence model builder
///
/// Builds a BERT-backed `SentenceModel` from a local directory holding the converted
/// transformer files:
/// - `config.json`: transformer configuration
/// - `rust_model.ot`: weights
/// - `vocab.txt`: tokenizer vocabulary
/// - `tokenizer_config.json` (optional): `do_lower_case` and `strip_accents` flags
///
/// # Example
///
/// ```no_run
/// use text2vec::pipelines::sentence_embeddings::{EncoderType, SentenceModelBuilder};
///
/// # fn main() -> Result<(), text2vec::Text2VecError> {
/// let model = SentenceModelBuilder::local("path/to/text2vec-base-chinese")
///     .with_device(tch::Device::Cpu)
///     .with_encoder_type(EncoderType::Mean)
///     .create_model()?;
/// # Ok(())
/// # }
/// ```
pub struct SentenceModelBuilder {
    model_dir: PathBuf,
    device: Device,
    model_arch: ModelArch,
    encoder_type: Option<EncoderType>,
    max_seq_length: usize,
    tokenizer_parallelism: bool,
    add_pooling_layer: bool,
}

impl SentenceModelBuilder {
    pub fn local<P: Into<PathBuf>>(model_dir: P) -> Self {
        Self {
            model_dir: model_dir.into(),
            device: Device::cuda_if_available(),
            model_arch: ModelArch::default(),
            encoder_type: None,
            max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
            tokenizer_parallelism: true,
            add_pooling_layer: true,
        }
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Architecture the weights were trained with. Selects the default pooling strategy.
    pub fn with_model_arch(mut self, model_arch: ModelArch) -> Self {
        self.model_arch = model_arch;
        self
    }

    /// Pooling strategy, overriding the architecture default
    pub fn with_encoder_type(mut self, encoder_type: EncoderType) -> Self {
        self.encoder_type = Some(encoder_type);
        self
    }

    pub fn with_max_seq_length(mut self, max_seq_length: usize) -> Self {
        self.max_seq_length = max_seq_length;
        self
    }

    /// Tokenize batches on multiple threads (enabled by default)
    pub fn with_tokenizer_parallelism(mut self, tokenizer_parallelism: bool) -> Self {
        self.tokenizer_parallelism = tokenizer_parallelism;
        self
    }

    /// Load the model's pooling head (enabled by default). Required by `EncoderType::Pooler`.
    pub fn with_pooler(mut self, add_pooling_layer: bool) -> Self {
        self.add_pooling_layer = add_pooling_layer;
        self
    }

    pub fn create_model(self) -> Result<SentenceModel, Text2VecError> {
        let model_dir = &self.model_dir;
        let encoder_type = self
            .encoder_type
            .unwrap_or_else(|| self.model_arch.default_encoder_type());
        if encoder_type.requires_pooler() && !self.add_pooling_layer {
            return Err(Text2VecError::InvalidConfigurationError(format!(
                "{} encoder type requires the pooling layer to be loaded",
                encoder_type
            )));
        }

        let transformer_config = BertConfig::from_file(model_dir.join("config.json"))?;
        let transformer_weights = model_dir.join("rust_model.ot");
        let tokenizer_vocab = model_dir.join("vocab.txt");
        let tokenizer_config_path = model_dir.join("tokenizer_config.json");
        let tokenizer_config = if tokenizer_config_path.is_file() {
            TokenizerConfig::from_file(&tokenizer_config_path)?
        } else {
            TokenizerConfig::default()
        };
        let lower_case = tokenizer_config.do_lower_case.unwrap_or(true);
        let strip_accents = tokenizer_config.strip_accents.unwrap_or(lower_case);

        debug!(
            model_dir = %model_dir.display(),
            model_arch = %self.model_arch,
            encoder_type = %encoder_type,
            lower_case,
            strip_accents,
            "loading sentence model"
        );

        let encoder = BertEncoderAdapter::from_config(
            transformer_config,
            transformer_weights,
            self.device,
            self.add_pooling_layer,
        )?;
        let tokenizer = BertSentenceTokenizer::from_file(tokenizer_vocab, lower_case, strip_accents)?
            .with_parallelism(self.tokenizer_parallelism);
        let config = SentenceEncoderConfig {
            encoder_type,
            max_seq_length: self.max_seq_length,
        };

        Ok(SentenceModel::new(encoder, tokenizer, config)?
            .with_model_arch(self.model_arch)
            .with_model_name_or_path(model_dir.to_string_lossy()))
    }
}
