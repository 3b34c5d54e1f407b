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

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pipelines::sentence_embeddings::EncoderType;
use crate::{Config, Text2VecError};

/// Default maximum number of tokens per sentence, special tokens included
pub const DEFAULT_MAX_SEQ_LENGTH: usize = 128;

/// # Training architecture the sentence model weights come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelArch {
    #[serde(rename = "COSENT")]
    CoSENT,
    #[serde(rename = "SENTENCEBERT")]
    SentenceBert,
    #[serde(rename = "BERT")]
    Bert,
}

impl ModelArch {
    /// Pooling strategy the architecture is trained with
    pub fn default_encoder_type(&self) -> EncoderType {
        match self {
            ModelArch::CoSENT | ModelArch::Bert => EncoderType::FirstLastAvg,
            ModelArch::SentenceBert => EncoderType::Mean,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ModelArch::CoSENT => "COSENT",
            ModelArch::SentenceBert => "SENTENCEBERT",
            ModelArch::Bert => "BERT",
        }
    }
}

impl Default for ModelArch {
    fn default() -> Self {
        ModelArch::CoSENT
    }
}

impl fmt::Display for ModelArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelArch {
    type Err = Text2VecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "COSENT" => Ok(ModelArch::CoSENT),
            "SENTENCEBERT" => Ok(ModelArch::SentenceBert),
            "BERT" => Ok(ModelArch::Bert),
            _ => Err(Text2VecError::InvalidConfigurationError(format!(
                "unknown model architecture `{}`, expected one of COSENT, SENTENCEBERT, BERT",
                s
            ))),
        }
    }
}

/// # Configuration of a `SentenceEncoder`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceEncoderConfig {
    /// Pooling strategy
    pub encoder_type: EncoderType,
    /// Sentences are truncated to this number of tokens
    pub max_seq_length: usize,
}

impl Config for SentenceEncoderConfig {}

impl Default for SentenceEncoderConfig {
    fn default() -> Self {
        SentenceEncoderConfig {
            encoder_type: EncoderType::default(),
            max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
        }
    }
}

/// # Sentence model description
/// Written next to saved model weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub module: String,
    pub model_arch: ModelArch,
    pub encoder_type: Option<EncoderType>,
}

impl Config for ModelInfo {}

impl ModelInfo {
    pub fn new(model_arch: ModelArch, encoder_type: Option<EncoderType>) -> Self {
        ModelInfo {
            module: "TEXT2VEC".to_string(),
            model_arch,
            encoder_type,
        }
    }
}

/// Configuration for the transformer's tokenizer (`tokenizer_config.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub do_lower_case: Option<bool>,
    pub strip_accents: Option<bool>,
}

impl Config for TokenizerConfig {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn model_arch_names() -> Result<(), Text2VecError> {
        assert_eq!("cosent".parse::<ModelArch>()?, ModelArch::CoSENT);
        assert_eq!("SentenceBert".parse::<ModelArch>()?, ModelArch::SentenceBert);
        assert_eq!(ModelArch::Bert.to_string(), "BERT");
        assert!("ernie".parse::<ModelArch>().is_err());
        assert_eq!(
            ModelArch::SentenceBert.default_encoder_type(),
            EncoderType::Mean
        );
        Ok(())
    }

    #[test]
    fn model_info_serialization() -> Result<(), Text2VecError> {
        let info = ModelInfo::new(ModelArch::CoSENT, Some(EncoderType::Cls));
        let json = serde_json::to_value(&info)?;
        assert_eq!(
            json,
            serde_json::json!({
                "module": "TEXT2VEC",
                "model_arch": "COSENT",
                "encoder_type": "CLS",
            })
        );
        Ok(())
    }

    #[test]
    fn tokenizer_config_ignores_unknown_fields() -> Result<(), Text2VecError> {
        let config: TokenizerConfig =
            serde_json::from_str(r#"{"do_lower_case": true, "model_max_length": 512}"#)?;
        assert_eq!(config.do_lower_case, Some(true));
        assert_eq!(config.strip_accents, None);
        Ok(())
    }
}
