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

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::Text2VecError;

/// Name of the evaluation report file
pub const EVAL_RESULTS_FILE: &str = "eval_results.txt";

/// Formats metrics as one `key = value` line per entry, sorted by key.
/// Values always carry a decimal point (`1.0`, `0.5`).
pub fn format_results(results: &BTreeMap<String, f64>) -> String {
    results
        .iter()
        .map(|(key, value)| format!("{} = {:?}\n", key, value))
        .collect()
}

/// Writes the metrics report to `output_dir/eval_results.txt`, creating the directory
/// if needed. Returns the path of the written file.
pub fn write_eval_results<P: AsRef<Path>>(
    output_dir: P,
    results: &BTreeMap<String, f64>,
) -> Result<PathBuf, Text2VecError> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;
    let output_file = output_dir.join(EVAL_RESULTS_FILE);

    let mut writer = BufWriter::new(File::create(&output_file)?);
    writer.write_all(format_results(results).as_bytes())?;
    writer.flush()?;
    debug!(path = %output_file.display(), "evaluation results written");
    Ok(output_file)
}
