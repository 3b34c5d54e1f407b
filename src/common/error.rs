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

use rust_bert::RustBertError;
use rust_tokenizers::error::TokenizerError;
use tch::TchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Text2VecError {
    #[error("Invalid configuration error: {0}")]
    InvalidConfigurationError(String),

    #[error("Invalid input error: {0}")]
    InvalidInputError(String),

    #[error("Encoder adapter error: {0}")]
    AdapterError(String),

    #[error("Degenerate metric error: {0}")]
    DegenerateMetricError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Tch tensor error: {0}")]
    TchError(String),

    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for Text2VecError {
    fn from(error: std::io::Error) -> Self {
        Text2VecError::IOError(error.to_string())
    }
}

impl From<TokenizerError> for Text2VecError {
    fn from(error: TokenizerError) -> Self {
        Text2VecError::TokenizerError(error.to_string())
    }
}

impl From<TchError> for Text2VecError {
    fn from(error: TchError) -> Self {
        Text2VecError::TchError(error.to_string())
    }
}

impl From<RustBertError> for Text2VecError {
    fn from(error: RustBertError) -> Self {
        Text2VecError::AdapterError(error.to_string())
    }
}

impl From<serde_json::Error> for Text2VecError {
    fn from(error: serde_json::Error) -> Self {
        Text2VecError::SerializationError(error.to_string())
    }
}

impl From<csv::Error> for Text2VecError {
    fn from(error: csv::Error) -> Self {
        if error.is_io_error() {
            Text2VecError::IOError(error.to_string())
        } else {
            Text2VecError::SerializationError(error.to_string())
        }
    }
}
