//! Greedy extractive oracle and lead-k baselines, one sample at a time
//!
//! Both functions are pure: scoring is delegated to a caller-supplied
//! similarity function and neither touches I/O or shared state, so they can
//! run on pool workers without coordination.

use serde::{Deserialize, Serialize};

/// Stopping criteria for the greedy oracle.
///
/// Negative values mean "no limit" for the sentence and token caps, and
/// "any improvement" for the threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OracleParams {
    /// Maximum sentences in the extracted summary
    pub max_sent: i64,
    /// Token budget for the running summary, checked before each growth step
    pub max_len: i64,
    /// Minimum score gain a candidate must bring to be committed
    pub threshold: f64,
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            max_sent: -1,
            max_len: -1,
            threshold: -1.0,
        }
    }
}

/// One sample's extraction: summary text, per-sentence selection labels,
/// and the similarity of the summary against the reference
#[derive(Debug, Clone, Serialize)]
pub struct OracleResult {
    pub oracle: String,
    /// One label per source sentence, 1 if selected
    pub labels: Vec<u8>,
    pub score: f64,
}

/// Greedily grow an extractive summary from `src` sentences against a
/// reference, maximizing `sim` at each step.
///
/// Sentences are committed one at a time: the seed is the best-scoring
/// single sentence, after which each round appends the candidate whose
/// addition maximizes the similarity of the joined summary. Growth stops at
/// the sentence cap, the token budget, a gain below the threshold, or
/// candidate exhaustion. Ties break toward the earlier sentence.
pub fn ext_oracle_single<F, C>(
    src: &[String],
    reference: &str,
    sim: F,
    token_count: C,
    params: OracleParams,
) -> OracleResult
where
    F: Fn(&str, &str) -> f64,
    C: Fn(&str) -> usize,
{
    let mut sentences: Vec<String> = src.iter().map(|s| s.trim().to_string()).collect();
    if sentences.is_empty() {
        sentences.push("#".to_string());
    }
    let reference = reference.trim();
    let reference = if reference.is_empty() { "#" } else { reference };

    let n = sentences.len();
    let mut labels = vec![0u8; n];

    // seed with the best single sentence, earliest index on ties
    let mut best_idx = 0;
    let mut max_score = f64::NEG_INFINITY;
    for (idx, sentence) in sentences.iter().enumerate() {
        let score = sim(sentence, reference);
        if score > max_score {
            max_score = score;
            best_idx = idx;
        }
    }
    labels[best_idx] = 1;
    let mut oracle: Vec<String> = vec![sentences[best_idx].clone()];

    let max_sent = if params.max_sent < 0 {
        n
    } else {
        (params.max_sent as usize).min(n)
    };
    let threshold = if params.threshold < 0.0 {
        0.0
    } else {
        params.threshold
    };

    let mut cands: Vec<(usize, String)> = sentences
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| *idx != best_idx)
        .collect();

    while oracle.len() < max_sent && !cands.is_empty() {
        let joined = oracle.join(" ");
        if params.max_len > 0 && token_count(&joined) > params.max_len as usize {
            break;
        }

        let mut best_at = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (at, (_, cand)) in cands.iter().enumerate() {
            let score = sim(&format!("{joined} {cand}"), reference);
            if score > best_score {
                best_score = score;
                best_at = at;
            }
        }

        if best_score - max_score < threshold {
            break;
        }
        max_score = best_score;
        let (orig_idx, cand) = cands.remove(best_at);
        labels[orig_idx] = 1;
        oracle.push(cand);
    }

    OracleResult {
        oracle: oracle.join(" "),
        labels,
        score: max_score,
    }
}

/// Lead baseline: the first `k` source sentences joined as the summary,
/// scored once against the reference
pub fn lead_k_single<F>(src: &[String], reference: &str, k: usize, sim: F) -> (String, f64)
where
    F: Fn(&str, &str) -> f64,
{
    let mut sentences: Vec<String> = src.iter().map(|s| s.trim().to_string()).collect();
    if sentences.is_empty() {
        sentences.push("#".to_string());
    }
    let reference = reference.trim();
    let reference = if reference.is_empty() { "#" } else { reference };

    let summary = sentences
        .iter()
        .take(k)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    let score = sim(&summary, reference);
    (summary, score)
}
