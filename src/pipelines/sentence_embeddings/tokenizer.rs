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

use std::borrow::Borrow;
use std::convert::TryFrom;
use std::path::{Path, PathBuf};

use rust_tokenizers::tokenizer::{
    BertTokenizer, MultiThreadedTokenizer, Tokenizer, TruncationStrategy,
};
use rust_tokenizers::vocab::Vocab;
use rust_tokenizers::TokenizedInput;
use tch::{Device, Kind, Tensor};

use crate::Text2VecError;

const BERT_PAD_TOKEN: &str = "[PAD]";

/// # Tokenized sentence
/// Token ids, attention mask and segment ids of a single sentence. The three
/// sequences always share the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedSentence {
    token_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl TokenizedSentence {
    /// Build a new `TokenizedSentence`, checking that the three sequences are non-empty
    /// and of equal length, and that the attention mask is binary.
    pub fn new(
        token_ids: Vec<i64>,
        attention_mask: Vec<i64>,
        token_type_ids: Vec<i64>,
    ) -> Result<Self, Text2VecError> {
        if token_ids.is_empty() {
            return Err(Text2VecError::InvalidInputError(
                "tokenized sentence contains no token".into(),
            ));
        }
        if token_ids.len() != attention_mask.len() || token_ids.len() != token_type_ids.len() {
            return Err(Text2VecError::InvalidInputError(format!(
                "length mismatch between token ids ({}), attention mask ({}) and segment ids ({})",
                token_ids.len(),
                attention_mask.len(),
                token_type_ids.len()
            )));
        }
        if let Some(value) = attention_mask.iter().find(|&&value| value != 0 && value != 1) {
            return Err(Text2VecError::InvalidInputError(format!(
                "attention mask values must be 0 or 1, got {}",
                value
            )));
        }
        Ok(Self {
            token_ids,
            attention_mask,
            token_type_ids,
        })
    }

    /// Sentence made of real tokens only: mask set to 1 and segment ids to 0.
    pub fn from_token_ids(token_ids: Vec<i64>) -> Result<Self, Text2VecError> {
        let attention_mask = vec![1; token_ids.len()];
        let token_type_ids = vec![0; token_ids.len()];
        Self::new(token_ids, attention_mask, token_type_ids)
    }

    pub fn token_ids(&self) -> &[i64] {
        &self.token_ids
    }

    pub fn attention_mask(&self) -> &[i64] {
        &self.attention_mask
    }

    pub fn token_type_ids(&self) -> &[i64] {
        &self.token_type_ids
    }

    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }
}

impl From<TokenizedInput> for TokenizedSentence {
    fn from(input: TokenizedInput) -> Self {
        let attention_mask = vec![1; input.token_ids.len()];
        let token_type_ids = input
            .segment_ids
            .iter()
            .map(|&segment_id| segment_id as i64)
            .collect();
        Self {
            token_ids: input.token_ids,
            attention_mask,
            token_type_ids,
        }
    }
}

/// # Padded batch of tokenized sentences
/// Holds `input_ids`, `attention_mask` and `token_type_ids` tensors of shape
/// (*batch size*, *sequence_length*) and kind `Int64`.
#[derive(Debug)]
pub struct TokenizedBatch {
    input_ids: Tensor,
    attention_mask: Tensor,
    token_type_ids: Tensor,
}

impl TokenizedBatch {
    /// Build a batch from pre-computed tensors, validating their shapes.
    pub fn new(
        input_ids: Tensor,
        attention_mask: Tensor,
        token_type_ids: Tensor,
    ) -> Result<Self, Text2VecError> {
        let shape = input_ids.size();
        if shape.len() != 2 || shape.iter().any(|&dim| dim == 0) {
            return Err(Text2VecError::InvalidInputError(format!(
                "token ids must be a non-empty (batch, sequence) tensor, got shape {:?}",
                shape
            )));
        }
        if attention_mask.size() != shape || token_type_ids.size() != shape {
            return Err(Text2VecError::InvalidInputError(format!(
                "shape mismatch between token ids {:?}, attention mask {:?} and segment ids {:?}",
                shape,
                attention_mask.size(),
                token_type_ids.size()
            )));
        }
        let non_binary = attention_mask.ne(0).logical_and(&attention_mask.ne(1));
        if i64::try_from(non_binary.sum(Kind::Int64))? > 0 {
            return Err(Text2VecError::InvalidInputError(
                "attention mask values must be 0 or 1".into(),
            ));
        }
        Ok(Self {
            input_ids,
            attention_mask,
            token_type_ids,
        })
    }

    /// Pads a list of sentences to the longest one. Padding positions get
    /// `pad_token_id`, an attention mask of 0 and a segment id of 0.
    pub fn from_sentences<S: Borrow<TokenizedSentence>>(
        sentences: &[S],
        pad_token_id: i64,
    ) -> Result<Self, Text2VecError> {
        let max_len = sentences
            .iter()
            .map(|sentence| sentence.borrow().len())
            .max()
            .ok_or_else(|| Text2VecError::InvalidInputError("no sentence to batch".into()))?;

        let capacity = sentences.len() * max_len;
        let mut input_ids = Vec::with_capacity(capacity);
        let mut attention_mask = Vec::with_capacity(capacity);
        let mut token_type_ids = Vec::with_capacity(capacity);
        for sentence in sentences {
            let sentence = sentence.borrow();
            let padding = max_len - sentence.len();
            input_ids.extend_from_slice(sentence.token_ids());
            input_ids.extend(std::iter::repeat(pad_token_id).take(padding));
            attention_mask.extend_from_slice(sentence.attention_mask());
            attention_mask.extend(std::iter::repeat(0).take(padding));
            token_type_ids.extend_from_slice(sentence.token_type_ids());
            token_type_ids.extend(std::iter::repeat(0).take(padding));
        }

        let shape = [sentences.len() as i64, max_len as i64];
        Self::new(
            Tensor::from_slice(&input_ids).view(shape),
            Tensor::from_slice(&attention_mask).view(shape),
            Tensor::from_slice(&token_type_ids).view(shape),
        )
    }

    pub fn input_ids(&self) -> &Tensor {
        &self.input_ids
    }

    pub fn attention_mask(&self) -> &Tensor {
        &self.attention_mask
    }

    pub fn token_type_ids(&self) -> &Tensor {
        &self.token_type_ids
    }

    /// Number of sentences in the batch
    pub fn batch_size(&self) -> i64 {
        self.input_ids.size()[0]
    }

    /// Padded sequence length shared by all sentences of the batch
    pub fn sequence_length(&self) -> i64 {
        self.input_ids.size()[1]
    }

    /// Moves the three tensors to `device`.
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            input_ids: self.input_ids.to_device(device),
            attention_mask: self.attention_mask.to_device(device),
            token_type_ids: self.token_type_ids.to_device(device),
        }
    }
}

/// # Tokenizer capability used by the sentence encoder
pub trait SentenceTokenizer {
    /// Tokenizes each sentence, truncating to `max_length` tokens (special tokens included).
    fn tokenize_sentences(
        &self,
        sentences: &[&str],
        max_length: usize,
    ) -> Result<Vec<TokenizedSentence>, Text2VecError>;

    /// Token id used for padding positions
    fn pad_token_id(&self) -> i64;

    /// Tokenizes a single sentence.
    fn tokenize_sentence(
        &self,
        sentence: &str,
        max_length: usize,
    ) -> Result<TokenizedSentence, Text2VecError> {
        self.tokenize_sentences(&[sentence], max_length)?
            .pop()
            .ok_or_else(|| Text2VecError::InvalidInputError("tokenizer returned no output".into()))
    }

    /// Tokenizes and pads `sentences` to the longest of them.
    fn tokenize(
        &self,
        sentences: &[&str],
        max_length: usize,
    ) -> Result<TokenizedBatch, Text2VecError> {
        let tokenized = self.tokenize_sentences(sentences, max_length)?;
        if tokenized.len() != sentences.len() {
            return Err(Text2VecError::InvalidInputError(format!(
                "tokenizer returned {} outputs for {} sentences",
                tokenized.len(),
                sentences.len()
            )));
        }
        TokenizedBatch::from_sentences(&tokenized, self.pad_token_id())
    }
}

/// # BERT WordPiece tokenizer
/// Wraps a `rust_tokenizers` `BertTokenizer`. When `parallelism` is set, lists of
/// sentences are tokenized with the multi-threaded implementation.
pub struct BertSentenceTokenizer {
    tokenizer: BertTokenizer,
    vocab_path: PathBuf,
    truncation_strategy: TruncationStrategy,
    parallelism: bool,
    pad_token_id: i64,
}

impl BertSentenceTokenizer {
    /// Loads a tokenizer from a `vocab.txt` file.
    ///
    /// # Arguments
    ///
    /// * `vocab_path` - path to the WordPiece vocabulary
    /// * `lower_case` - lower-case inputs before tokenization
    /// * `strip_accents` - remove accents before tokenization
    pub fn from_file<P: AsRef<Path>>(
        vocab_path: P,
        lower_case: bool,
        strip_accents: bool,
    ) -> Result<Self, Text2VecError> {
        let vocab_path = vocab_path.as_ref().to_path_buf();
        let tokenizer = BertTokenizer::from_file(&vocab_path, lower_case, strip_accents)?;
        let pad_token_id = Tokenizer::vocab(&tokenizer).token_to_id(BERT_PAD_TOKEN);
        Ok(Self {
            tokenizer,
            vocab_path,
            truncation_strategy: TruncationStrategy::LongestFirst,
            parallelism: true,
            pad_token_id,
        })
    }

    pub fn with_parallelism(mut self, parallelism: bool) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn set_truncation_strategy(&mut self, truncation_strategy: TruncationStrategy) {
        self.truncation_strategy = truncation_strategy;
    }

    /// Location of the vocabulary the tokenizer was loaded from
    pub fn vocab_path(&self) -> &Path {
        &self.vocab_path
    }
}

impl SentenceTokenizer for BertSentenceTokenizer {
    fn tokenize_sentences(
        &self,
        sentences: &[&str],
        max_length: usize,
    ) -> Result<Vec<TokenizedSentence>, Text2VecError> {
        let tokenized = if self.parallelism {
            MultiThreadedTokenizer::encode_list(
                &self.tokenizer,
                sentences,
                max_length,
                &self.truncation_strategy,
                0,
            )
        } else {
            Tokenizer::encode_list(
                &self.tokenizer,
                sentences,
                max_length,
                &self.truncation_strategy,
                0,
            )
        };
        tokenized
            .into_iter()
            .map(TokenizedSentence::from)
            .map(|sentence| {
                if sentence.is_empty() {
                    Err(Text2VecError::InvalidInputError(
                        "tokenizer produced an empty sequence".into(),
                    ))
                } else {
                    Ok(sentence)
                }
            })
            .collect()
    }

    fn pad_token_id(&self) -> i64 {
        self.pad_token_id
    }
}
