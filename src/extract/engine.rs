//! Corpus drivers for the extraction baselines
//!
//! Fans the per-sample oracle and lead-k functions out over a corpus. With
//! more than one worker the samples go through the ordered pool; results
//! come back in corpus order either way. An optional disk sink streams one
//! JSON line per sample instead of accumulating results in memory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::oracle::{ext_oracle_single, lead_k_single, OracleParams, OracleResult};
use super::pool::{ordered_map, PoolConfig, WorkerFn};
use crate::utils::{word_count, ContractError, Result};

/// Similarity between a candidate summary and a reference
pub type SimFn = Arc<dyn Fn(&str, &str) -> f64 + Send + Sync>;

/// Token counter used for the oracle's length budget
pub type TokenCountFn = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Driver configuration shared by both baselines
#[derive(Clone)]
pub struct ExtractOptions {
    pub num_workers: usize,
    /// Samples handed to a worker per dispatch
    pub chunk_size: usize,
    /// Stream results to this file as JSON lines instead of keeping them
    pub out_path: Option<PathBuf>,
    /// Maximum wait for the next completed chunk in pooled runs
    pub timeout: Option<Duration>,
    pub progress: bool,
    /// Overrides whitespace word counting for the length budget
    pub tokenizer: Option<TokenCountFn>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            num_workers: 4,
            chunk_size: 64,
            out_path: None,
            timeout: None,
            progress: false,
            tokenizer: None,
        }
    }
}

/// Corpus-level oracle output. Per-sample vectors are empty when results
/// were streamed to disk.
#[derive(Debug, Clone, Default)]
pub struct ExtractOutput {
    pub oracles: Vec<String>,
    pub labels: Vec<Vec<u8>>,
    pub scores: Vec<f64>,
    pub average: f64,
}

/// Corpus-level lead-k output
#[derive(Debug, Clone, Default)]
pub struct LeadOutput {
    pub summaries: Vec<String>,
    pub scores: Vec<f64>,
    pub average: f64,
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    bar
}

fn align<S, R>(mut src: Vec<S>, mut refs: Vec<R>) -> (Vec<S>, Vec<R>) {
    if src.len() != refs.len() {
        let err = ContractError::LengthMismatch {
            src: src.len(),
            refs: refs.len(),
        };
        warn!("{err}");
        let n = src.len().min(refs.len());
        src.truncate(n);
        refs.truncate(n);
    }
    (src, refs)
}

fn open_sink(opts: &ExtractOptions) -> Result<Option<BufWriter<File>>> {
    match &opts.out_path {
        Some(path) => Ok(Some(BufWriter::new(File::create(path)?))),
        None => Ok(None),
    }
}

/// Run the greedy extractive oracle over a corpus.
///
/// `src` holds one sentence list per sample, `refs` the matching reference
/// summaries. Length mismatches are logged and truncated to the shorter
/// side. Returns per-sample results and the corpus average score; with
/// `out_path` set the per-sample vectors stay empty and results go to disk.
pub fn ext_oracle(
    src: Vec<Vec<String>>,
    refs: Vec<String>,
    sim: SimFn,
    params: OracleParams,
    opts: &ExtractOptions,
) -> Result<ExtractOutput> {
    let (src, refs) = align(src, refs);
    let total = src.len();
    let tokens: TokenCountFn = opts
        .tokenizer
        .clone()
        .unwrap_or_else(|| Arc::new(word_count));
    let mut sink = open_sink(opts)?;
    let bar = opts.progress.then(|| progress_bar(total as u64));

    let mut output = ExtractOutput::default();
    let mut score_sum = 0.0;
    let mut consume = |result: OracleResult, output: &mut ExtractOutput| -> Result<()> {
        score_sum += result.score;
        if let Some(w) = sink.as_mut() {
            let line = serde_json::json!({
                "label": result.labels,
                "oracle": result.oracle,
                "score": result.score,
            });
            writeln!(w, "{line}")?;
        } else {
            output.oracles.push(result.oracle);
            output.labels.push(result.labels);
            output.scores.push(result.score);
        }
        if let Some(bar) = &bar {
            bar.inc(1);
        }
        Ok(())
    };

    if opts.num_workers <= 1 {
        for (sentences, reference) in src.into_iter().zip(refs) {
            let result = ext_oracle_single(
                &sentences,
                &reference,
                |a, b| sim(a, b),
                |t| tokens(t),
                params,
            );
            consume(result, &mut output)?;
        }
    } else {
        let worker_sim = Arc::clone(&sim);
        let worker_tokens = Arc::clone(&tokens);
        let worker: WorkerFn<(Vec<String>, String), OracleResult> =
            Arc::new(move |(sentences, reference)| {
                Ok(ext_oracle_single(
                    &sentences,
                    &reference,
                    |a, b| worker_sim(a, b),
                    |t| worker_tokens(t),
                    params,
                ))
            });
        let tasks: Vec<(Vec<String>, String)> = src.into_iter().zip(refs).collect();
        let config = PoolConfig {
            num_workers: opts.num_workers,
            chunk_size: opts.chunk_size,
            timeout: opts.timeout,
        };
        for chunk in ordered_map(tasks, worker, &config) {
            for result in chunk? {
                consume(result, &mut output)?;
            }
        }
    }

    if let Some(mut w) = sink {
        w.flush()?;
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    output.average = if total == 0 {
        0.0
    } else {
        score_sum / total as f64
    };
    info!("extractive oracle score: {:.7}", output.average);
    Ok(output)
}

/// Run the lead-k baseline over a corpus.
///
/// Same contract as [`ext_oracle`]: mismatched lengths truncate with a
/// warning, and `out_path` switches to streaming JSON lines.
pub fn lead_k(
    src: Vec<Vec<String>>,
    refs: Vec<String>,
    k: usize,
    sim: SimFn,
    opts: &ExtractOptions,
) -> Result<LeadOutput> {
    let (src, refs) = align(src, refs);
    let total = src.len();
    let mut sink = open_sink(opts)?;
    let bar = opts.progress.then(|| progress_bar(total as u64));

    let mut output = LeadOutput::default();
    let mut score_sum = 0.0;
    let mut consume = |summary: String, score: f64, output: &mut LeadOutput| -> Result<()> {
        score_sum += score;
        if let Some(w) = sink.as_mut() {
            let line = serde_json::json!({ "k-lead": summary, "score": score });
            writeln!(w, "{line}")?;
        } else {
            output.summaries.push(summary);
            output.scores.push(score);
        }
        if let Some(bar) = &bar {
            bar.inc(1);
        }
        Ok(())
    };

    if opts.num_workers <= 1 {
        for (sentences, reference) in src.into_iter().zip(refs) {
            let (summary, score) = lead_k_single(&sentences, &reference, k, |a, b| sim(a, b));
            consume(summary, score, &mut output)?;
        }
    } else {
        let worker_sim = Arc::clone(&sim);
        let worker: WorkerFn<(Vec<String>, String), (String, f64)> =
            Arc::new(move |(sentences, reference)| {
                Ok(lead_k_single(&sentences, &reference, k, |a, b| {
                    worker_sim(a, b)
                }))
            });
        let tasks: Vec<(Vec<String>, String)> = src.into_iter().zip(refs).collect();
        let config = PoolConfig {
            num_workers: opts.num_workers,
            chunk_size: opts.chunk_size,
            timeout: opts.timeout,
        };
        for chunk in ordered_map(tasks, worker, &config) {
            for (summary, score) in chunk? {
                consume(summary, score, &mut output)?;
            }
        }
    }

    if let Some(mut w) = sink {
        w.flush()?;
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    output.average = if total == 0 {
        0.0
    } else {
        score_sum / total as f64
    };
    info!("lead-{k} score: {:.7}", output.average);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn init_logs() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn token_overlap() -> SimFn {
        Arc::new(|cand: &str, reference: &str| {
            let ref_tokens: HashSet<&str> = reference.split_whitespace().collect();
            if ref_tokens.is_empty() {
                return 0.0;
            }
            let cand_tokens: HashSet<&str> = cand.split_whitespace().collect();
            ref_tokens.intersection(&cand_tokens).count() as f64 / ref_tokens.len() as f64
        })
    }

    fn sentences(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn small_corpus() -> (Vec<Vec<String>>, Vec<String>) {
        let src = vec![
            sentences(&["A cat sat.", "The dog barked.", "Birds fly high."]),
            sentences(&["Rain fell all day.", "The river rose."]),
            sentences(&["One.", "Two.", "Three.", "Four."]),
        ];
        let refs = vec![
            "A cat sat.".to_string(),
            "The river rose.".to_string(),
            "Two. Four.".to_string(),
        ];
        (src, refs)
    }

    fn sequential() -> ExtractOptions {
        ExtractOptions {
            num_workers: 1,
            ..ExtractOptions::default()
        }
    }

    #[test]
    fn test_oracle_picks_matching_sentence() {
        let src = vec![sentences(&["A cat sat.", "The dog barked.", "Birds fly high."])];
        let refs = vec!["A cat sat.".to_string()];
        let params = OracleParams {
            max_sent: 1,
            ..OracleParams::default()
        };

        let out = ext_oracle(src, refs, token_overlap(), params, &sequential()).unwrap();
        assert_eq!(out.oracles, ["A cat sat."]);
        assert_eq!(out.labels, [vec![1, 0, 0]]);
        assert!((out.average - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pooled_matches_sequential() {
        let (src, refs) = small_corpus();
        let params = OracleParams::default();

        let seq = ext_oracle(src.clone(), refs.clone(), token_overlap(), params, &sequential())
            .unwrap();
        let pooled_opts = ExtractOptions {
            num_workers: 4,
            chunk_size: 2,
            ..ExtractOptions::default()
        };
        let pooled = ext_oracle(src, refs, token_overlap(), params, &pooled_opts).unwrap();

        assert_eq!(seq.oracles, pooled.oracles);
        assert_eq!(seq.labels, pooled.labels);
        assert_eq!(seq.scores, pooled.scores);
    }

    #[test]
    fn test_streaming_matches_in_memory() {
        let (src, refs) = small_corpus();
        let params = OracleParams::default();
        let in_memory =
            ext_oracle(src.clone(), refs.clone(), token_overlap(), params, &sequential()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.jsonl");
        let streamed_opts = ExtractOptions {
            num_workers: 1,
            out_path: Some(path.clone()),
            ..ExtractOptions::default()
        };
        let streamed = ext_oracle(src, refs, token_overlap(), params, &streamed_opts).unwrap();

        assert!(streamed.oracles.is_empty());
        assert_eq!(streamed.average, in_memory.average);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), in_memory.oracles.len());
        for (line, oracle) in lines.iter().zip(&in_memory.oracles) {
            assert_eq!(line["oracle"].as_str().unwrap(), oracle);
            assert!(line["score"].is_number());
            assert!(line["label"].is_array());
        }
    }

    #[test]
    fn test_length_mismatch_truncates() {
        init_logs();
        let src = vec![
            sentences(&["a"]),
            sentences(&["b"]),
            sentences(&["c"]),
        ];
        let refs = vec!["a".to_string(), "b".to_string()];

        let out = ext_oracle(
            src,
            refs,
            token_overlap(),
            OracleParams::default(),
            &sequential(),
        )
        .unwrap();
        assert_eq!(out.scores.len(), 2);
    }

    #[test]
    fn test_empty_corpus_average_is_zero() {
        let out = ext_oracle(
            Vec::new(),
            Vec::new(),
            token_overlap(),
            OracleParams::default(),
            &sequential(),
        )
        .unwrap();
        assert_eq!(out.average, 0.0);
        assert!(out.scores.is_empty());
    }

    #[test]
    fn test_lead_k_corpus() {
        let src = vec![
            sentences(&["s1", "s2", "s3"]),
            sentences(&["t1", "t2"]),
        ];
        let refs = vec!["s1 s2".to_string(), "t1".to_string()];

        let out = lead_k(src, refs, 2, token_overlap(), &sequential()).unwrap();
        assert_eq!(out.summaries, ["s1 s2", "t1 t2"]);
        assert!((out.scores[0] - 1.0).abs() < 1e-9);
        assert!((out.scores[1] - 1.0).abs() < 1e-9);
        assert!((out.average - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_lead_k_streams_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lead.jsonl");
        let opts = ExtractOptions {
            num_workers: 1,
            out_path: Some(path.clone()),
            ..ExtractOptions::default()
        };

        let src = vec![sentences(&["s1", "s2", "s3"])];
        let refs = vec!["s1 s2".to_string()];
        let out = lead_k(src, refs, 2, token_overlap(), &opts).unwrap();
        assert!(out.summaries.is_empty());

        let text = std::fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(line["k-lead"].as_str().unwrap(), "s1 s2");
        assert!((line["score"].as_f64().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pooled_lead_k_matches_sequential() {
        let src: Vec<Vec<String>> = (0..9)
            .map(|i| sentences(&[&format!("w{i} x"), "y", "z"]))
            .collect();
        let refs: Vec<String> = (0..9).map(|i| format!("w{i} x y")).collect();

        let seq = lead_k(src.clone(), refs.clone(), 2, token_overlap(), &sequential()).unwrap();
        let pooled_opts = ExtractOptions {
            num_workers: 3,
            chunk_size: 2,
            ..ExtractOptions::default()
        };
        let pooled = lead_k(src, refs, 2, token_overlap(), &pooled_opts).unwrap();

        assert_eq!(seq.summaries, pooled.summaries);
        assert_eq!(seq.scores, pooled.scores);
    }
}
