extern crate anyhow;

mod common;

use std::io::Write;

use common::{MockEncoder, WhitespaceTokenizer};
use text2vec::pipelines::sentence_embeddings::{
    EncoderType, SentenceEncoder, SentenceEncoderConfig, SentenceModel, TokenizedSentence,
};
use text2vec::pipelines::similarity::{
    cosine_similarity, load_similarity_pairs, SimilarityEvaluator, SimilarityExample,
    DEFAULT_EVAL_BATCH_SIZE, EVAL_RESULTS_FILE,
};
use text2vec::Text2VecError;

const PAIRS: [(&str, &str, f64); 6] = [
    ("a man is playing a flute", "a man plays the flute", 4.8),
    ("a cat sits on the mat", "a dog runs in the park", 0.4),
    ("the weather is nice today", "it is sunny outside", 3.6),
    ("she is cooking dinner", "he reads a book", 0.2),
    ("two kids are playing", "children play together", 4.0),
    ("the stock market fell", "a woman slices an onion", 1.0),
];

fn mean_config() -> SentenceEncoderConfig {
    SentenceEncoderConfig {
        encoder_type: EncoderType::Mean,
        max_seq_length: 32,
    }
}

fn examples() -> Result<Vec<SimilarityExample>, Text2VecError> {
    PAIRS
        .iter()
        .map(|(source, target, label)| {
            SimilarityExample::from_texts(&WhitespaceTokenizer, source, target, *label, 32)
        })
        .collect()
}

#[test]
fn identical_pairs_give_degenerate_correlation() -> anyhow::Result<()> {
    let adapter = MockEncoder::new();
    let encoder = SentenceEncoder::new(&adapter, &WhitespaceTokenizer, mean_config())?;
    let examples = [("好", 5.0), ("好", 4.0), ("好", 3.0)]
        .iter()
        .map(|(text, label)| SimilarityExample::from_texts(&WhitespaceTokenizer, text, text, *label, 32))
        .collect::<Result<Vec<_>, _>>()?;

    let evaluator = SimilarityEvaluator::new(&encoder);
    let predictions = evaluator.predict(&examples, DEFAULT_EVAL_BATCH_SIZE)?;
    assert!(predictions.iter().all(|score| (score - 1.0).abs() < 1e-5));
    assert!(matches!(
        evaluator.evaluate(&examples, DEFAULT_EVAL_BATCH_SIZE),
        Err(Text2VecError::DegenerateMetricError(_))
    ));
    Ok(())
}

#[test]
fn predictions_are_cosine_similarities_of_embeddings() -> anyhow::Result<()> {
    let adapter = MockEncoder::new();
    let encoder = SentenceEncoder::new(&adapter, &WhitespaceTokenizer, mean_config())?;
    let evaluator = SimilarityEvaluator::new(&encoder);

    let predictions = evaluator.predict(&examples()?, 4)?;
    assert_eq!(predictions.len(), PAIRS.len());
    for ((source, target, _), prediction) in PAIRS.iter().zip(predictions.iter()) {
        let expected = cosine_similarity(&encoder.encode_single(source)?, &encoder.encode_single(target)?);
        assert!((*prediction as f32 - expected).abs() < 1e-4);
        assert!(*prediction >= -1.0 - 1e-6 && *prediction <= 1.0 + 1e-6);
    }
    Ok(())
}

#[test]
fn evaluation_does_not_depend_on_batch_size() -> anyhow::Result<()> {
    let adapter = MockEncoder::new();
    let encoder = SentenceEncoder::new(&adapter, &WhitespaceTokenizer, mean_config())?;
    let evaluator = SimilarityEvaluator::new(&encoder);
    let examples = examples()?;

    let batched = evaluator.evaluate(&examples, DEFAULT_EVAL_BATCH_SIZE)?;
    let unbatched = evaluator.evaluate(&examples, 1)?;
    assert!((batched.pearson - unbatched.pearson).abs() < 1e-5);
    assert!((batched.spearman - unbatched.spearman).abs() < 1e-9);
    assert!(batched.pearson.abs() <= 1.0 && batched.spearman.abs() <= 1.0);
    Ok(())
}

#[test]
fn labels_equal_to_predictions_correlate_perfectly() -> anyhow::Result<()> {
    let adapter = MockEncoder::new();
    let encoder = SentenceEncoder::new(&adapter, &WhitespaceTokenizer, mean_config())?;
    let evaluator = SimilarityEvaluator::new(&encoder);

    let predictions = evaluator.predict(&examples()?, DEFAULT_EVAL_BATCH_SIZE)?;
    let relabelled = examples()?
        .into_iter()
        .zip(predictions.iter())
        .map(|(example, prediction)| SimilarityExample {
            label: *prediction,
            ..example
        })
        .collect::<Vec<_>>();

    let result = evaluator.evaluate(&relabelled, DEFAULT_EVAL_BATCH_SIZE)?;
    assert!((result.pearson - 1.0).abs() < 1e-6);
    assert!((result.spearman - 1.0).abs() < 1e-6);
    assert_eq!(result.metrics.get("eval_pearson"), Some(&result.pearson));
    assert_eq!(result.metrics.get("eval_spearman"), Some(&result.spearman));
    Ok(())
}

#[test]
fn empty_examples_are_rejected() -> anyhow::Result<()> {
    let adapter = MockEncoder::new();
    let encoder = SentenceEncoder::new(&adapter, &WhitespaceTokenizer, mean_config())?;
    assert!(matches!(
        SimilarityEvaluator::new(&encoder).evaluate(&[], DEFAULT_EVAL_BATCH_SIZE),
        Err(Text2VecError::InvalidInputError(_))
    ));
    Ok(())
}

#[test]
fn over_long_examples_are_rejected() -> anyhow::Result<()> {
    let adapter = MockEncoder::new();
    let encoder = SentenceEncoder::new(&adapter, &WhitespaceTokenizer, mean_config())?;
    let long_source = TokenizedSentence::from_token_ids((0..40).collect())?;
    let target = TokenizedSentence::from_token_ids(vec![101, 7, 102])?;
    let mut examples = examples()?;
    examples.push(SimilarityExample::new(long_source, target, 2.0));

    assert!(matches!(
        SimilarityEvaluator::new(&encoder).predict(&examples, DEFAULT_EVAL_BATCH_SIZE),
        Err(Text2VecError::InvalidInputError(_))
    ));
    assert_eq!(adapter.forward_calls.get(), 0);
    Ok(())
}

#[test]
fn eval_model_accumulates_results_and_writes_report() -> anyhow::Result<()> {
    let mut model = SentenceModel::new(MockEncoder::new(), WhitespaceTokenizer, mean_config())?;
    assert!(model.results().is_empty());

    let examples = PAIRS
        .iter()
        .map(|(source, target, label)| model.example(source, target, *label))
        .collect::<Result<Vec<_>, _>>()?;
    let output_dir = tempfile::tempdir()?;

    let result = model.eval_model(&examples, Some(output_dir.path()), true, 2)?;
    assert_eq!(model.results().get("eval_pearson"), Some(&result.pearson));
    assert_eq!(model.results().get("eval_spearman"), Some(&result.spearman));

    let report = std::fs::read_to_string(output_dir.path().join(EVAL_RESULTS_FILE))?;
    let lines = report.lines().collect::<Vec<&str>>();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("eval_pearson = "));
    assert!(lines[1].starts_with("eval_spearman = "));

    let second = model.eval_model(&examples[..4], None, false, 2)?;
    assert_eq!(model.results().len(), 2);
    assert_eq!(model.results().get("eval_spearman"), Some(&second.spearman));
    Ok(())
}

#[test]
fn similarity_pairs_from_tab_separated_file() -> anyhow::Result<()> {
    let mut data_file = tempfile::NamedTempFile::new()?;
    writeln!(data_file, "一个男人在吹一支大笛子。\t一个人在吹长笛。\t3")?;
    writeln!(data_file, "a \"quoted\" sentence\tanother one\t0.5")?;
    let pairs = load_similarity_pairs(data_file.path())?;
    assert_eq!(
        pairs,
        vec![
            (
                "一个男人在吹一支大笛子。".to_string(),
                "一个人在吹长笛。".to_string(),
                3.0
            ),
            (
                "a \"quoted\" sentence".to_string(),
                "another one".to_string(),
                0.5
            ),
        ]
    );

    let mut malformed = tempfile::NamedTempFile::new()?;
    writeln!(malformed, "only one column")?;
    assert!(load_similarity_pairs(malformed.path()).is_err());
    assert!(matches!(
        load_similarity_pairs("missing/data/file.tsv"),
        Err(Text2VecError::IOError(_))
    ));
    Ok(())
}
