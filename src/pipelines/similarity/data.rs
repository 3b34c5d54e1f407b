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

use csv::ReaderBuilder;
use tracing::debug;

use crate::Text2VecError;

/// Reads labelled sentence pairs from a tab-separated file with one
/// `sentence1<TAB>sentence2<TAB>score` row per line and no header.
///
/// # Example
///
/// ```no_run
/// use text2vec::pipelines::similarity::load_similarity_pairs;
///
/// let pairs = load_similarity_pairs("path/to/STS-B.test.data")?;
/// # Ok::<(), text2vec::Text2VecError>(())
/// ```
pub fn load_similarity_pairs<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<(String, String, f64)>, Text2VecError> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .from_path(path)?;

    let pairs = reader
        .deserialize::<(String, String, f64)>()
        .collect::<Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), pairs = pairs.len(), "similarity pairs loaded");
    Ok(pairs)
}
