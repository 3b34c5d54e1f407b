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

use ordered_float::OrderedFloat;
use tch::{Kind, Tensor};

use crate::Text2VecError;

/// Lower bound applied to each vector norm in cosine similarity computations
pub const COSINE_EPS: f64 = 1e-8;

/// Sequences whose standard deviation is at or below this fraction of their largest
/// absolute value are considered constant (a couple of f32 ulps)
pub const ZERO_VARIANCE_TOLERANCE: f64 = 2.0 * f32::EPSILON as f64;

/// Cosine similarity between two vectors of the same length.
/// A zero vector has a similarity of 0 with any vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denominator = norm_a.sqrt().max(COSINE_EPS) * norm_b.sqrt().max(COSINE_EPS);
    (dot / denominator) as f32
}

/// Row-wise cosine similarity between two tensors of shape (*batch size*, *hidden_size*).
///
/// # Returns
///
/// * `Tensor` of shape (*batch size*) and kind `Float`
pub fn cosine_similarity_tensor(a: &Tensor, b: &Tensor) -> Tensor {
    let a = a.to_kind(Kind::Float);
    let b = b.to_kind(Kind::Float);
    let dim = [-1i64];
    let dot = (&a * &b).sum_dim_intlist(dim.as_slice(), false, Kind::Float);
    let norm_a = a
        .norm_scalaropt_dim(2, dim.as_slice(), false)
        .clamp_min(COSINE_EPS);
    let norm_b = b
        .norm_scalaropt_dim(2, dim.as_slice(), false)
        .clamp_min(COSINE_EPS);
    dot / (norm_a * norm_b)
}

/// Pearson correlation coefficient between two sequences.
///
/// Fails with an `InvalidInputError` if the sequences differ in length or contain
/// non-finite values, and with a `DegenerateMetricError` if they hold fewer than two
/// values or one of them is constant.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64, Text2VecError> {
    check_inputs(x, y)?;
    Ok(pearson(x, y))
}

/// Spearman rank correlation coefficient between two sequences. Tied values get
/// the average of the ranks they span.
///
/// Fails under the same conditions as `pearson_correlation`.
pub fn spearman_correlation(x: &[f64], y: &[f64]) -> Result<f64, Text2VecError> {
    check_inputs(x, y)?;
    Ok(pearson(&rank(x), &rank(y)))
}

fn check_inputs(x: &[f64], y: &[f64]) -> Result<(), Text2VecError> {
    if x.len() != y.len() {
        return Err(Text2VecError::InvalidInputError(format!(
            "correlation inputs differ in length ({} and {})",
            x.len(),
            y.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|value| !value.is_finite()) {
        return Err(Text2VecError::InvalidInputError(
            "correlation inputs contain non-finite values".into(),
        ));
    }
    if x.len() < 2 {
        return Err(Text2VecError::DegenerateMetricError(format!(
            "correlation requires at least two values, got {}",
            x.len()
        )));
    }
    for (name, values) in [("first", x), ("second", y)] {
        let std = standard_deviation(values);
        let scale = values
            .iter()
            .fold(f64::MIN_POSITIVE, |scale, value| scale.max(value.abs()));
        if std <= ZERO_VARIANCE_TOLERANCE * scale {
            return Err(Text2VecError::DegenerateMetricError(format!(
                "correlation is undefined for a constant sequence ({} input has standard deviation {:e})",
                name, std
            )));
        }
    }
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn standard_deviation(values: &[f64]) -> f64 {
    let mean = mean(values);
    let variance = values
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut num = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;
    for (&x, &y) in x.iter().zip(y.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        num += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }
    (num / (denom_x * denom_y).sqrt()).clamp(-1.0, 1.0)
}

/// 1-based ranks, ties sharing their average rank
fn rank(values: &[f64]) -> Vec<f64> {
    let mut sorted_idx = (0..values.len()).collect::<Vec<usize>>();
    sorted_idx.sort_by_key(|&idx| OrderedFloat(values[idx]));

    let mut ranks = vec![0f64; values.len()];
    let mut start = 0;
    while start < sorted_idx.len() {
        let mut end = start + 1;
        while end < sorted_idx.len() && values[sorted_idx[end]] == values[sorted_idx[start]] {
            end += 1;
        }
        // positions start..end hold ranks start + 1..=end
        let average_rank = (start + end + 1) as f64 / 2.0;
        for &idx in &sorted_idx[start..end] {
            ranks[idx] = average_rank;
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::TryFrom;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn cosine_similarity_of_vector_with_itself_is_one() {
        let v = [0.3f32, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        let w = [-0.3f32, 1.2, -4.0];
        assert!((cosine_similarity(&v, &w) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_with_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_similarity_tensor_matches_slices() -> Result<(), Text2VecError> {
        let a = [1.0f32, 2.0, 3.0, 0.0, 1.0, 0.0];
        let b = [2.0f32, 4.0, 6.0, 1.0, 0.0, 0.0];
        let similarities = cosine_similarity_tensor(
            &Tensor::from_slice(&a).view([2, 3]),
            &Tensor::from_slice(&b).view([2, 3]),
        );
        let similarities = Vec::<f32>::try_from(similarities)?;
        assert_eq!(similarities.len(), 2);
        assert!((similarities[0] - cosine_similarity(&a[..3], &b[..3])).abs() < 1e-6);
        assert!((similarities[1] - cosine_similarity(&a[3..], &b[3..])).abs() < 1e-6);
        assert!(similarities[1].abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn pearson_of_linear_relationship() -> Result<(), Text2VecError> {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        assert_close(pearson_correlation(&x, &y)?, 1.0);
        let negated = y.iter().map(|v| -v).collect::<Vec<f64>>();
        assert_close(pearson_correlation(&x, &negated)?, -1.0);
        assert_close(pearson_correlation(&y, &y)?, 1.0);
        Ok(())
    }

    #[test]
    fn pearson_reference_value() -> Result<(), Text2VecError> {
        // cov = 1.2, var(x) = 2.0, var(y) = 1.36
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 1.0, 4.0, 3.0, 4.0];
        assert_close(pearson_correlation(&x, &y)?, 1.2 / (2.0f64 * 1.36).sqrt());
        Ok(())
    }

    #[test]
    fn spearman_is_invariant_to_monotonic_transforms() -> Result<(), Text2VecError> {
        let x = [0.1, 0.5, 0.3, 0.9];
        let y = x.iter().map(|v: &f64| v.exp() * 10.0).collect::<Vec<f64>>();
        assert_close(spearman_correlation(&x, &y)?, 1.0);
        assert_close(spearman_correlation(&x, &x)?, 1.0);
        let negated = x.iter().map(|v| -v).collect::<Vec<f64>>();
        assert_close(spearman_correlation(&x, &negated)?, -1.0);
        Ok(())
    }

    #[test]
    fn ties_share_average_rank() -> Result<(), Text2VecError> {
        assert_eq!(rank(&[10.0, 20.0, 20.0, 5.0]), vec![2.0, 3.5, 3.5, 1.0]);
        // ranks: x = [1, 2, 3, 4], y = [1, 2.5, 2.5, 4]
        let rho = spearman_correlation(&[1.0, 2.0, 3.0, 4.0], &[0.0, 1.0, 1.0, 2.0])?;
        assert_close(rho, 4.5 / (5.0f64 * 4.5).sqrt());
        Ok(())
    }

    #[test]
    fn constant_sequences_are_degenerate() {
        for metric in [pearson_correlation, spearman_correlation] {
            assert!(matches!(
                metric(&[1.0, 1.0, 1.0], &[5.0, 4.0, 3.0]),
                Err(Text2VecError::DegenerateMetricError(_))
            ));
            assert!(matches!(
                metric(&[0.5], &[0.2]),
                Err(Text2VecError::DegenerateMetricError(_))
            ));
        }
    }

    #[test]
    fn float_noise_is_treated_as_constant() {
        let predictions = [1.0, 0.99999994, 1.0000001];
        let labels = [5.0, 4.0, 3.0];
        assert!(matches!(
            spearman_correlation(&predictions, &labels),
            Err(Text2VecError::DegenerateMetricError(_))
        ));
    }

    #[test]
    fn small_scale_sequences_are_not_degenerate() -> Result<(), Text2VecError> {
        let tiny = [1e-7, 2e-7, 3e-7];
        let labels = [1.0, 2.0, 3.0];
        assert_close(pearson_correlation(&tiny, &labels)?, 1.0);
        assert_close(spearman_correlation(&tiny, &labels)?, 1.0);

        let clustered = [0.9999990, 0.9999995, 1.0];
        assert_close(spearman_correlation(&clustered, &labels)?, 1.0);
        assert!(pearson_correlation(&clustered, &labels)? > 0.99);
        Ok(())
    }

    #[test]
    fn all_zero_sequence_is_degenerate() {
        assert!(matches!(
            pearson_correlation(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]),
            Err(Text2VecError::DegenerateMetricError(_))
        ));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(
            pearson_correlation(&[1.0, 2.0], &[1.0]),
            Err(Text2VecError::InvalidInputError(_))
        ));
        assert!(matches!(
            spearman_correlation(&[1.0, f64::NAN], &[1.0, 2.0]),
            Err(Text2VecError::InvalidInputError(_))
        ));
    }
}
