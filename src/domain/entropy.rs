//! Information-theoretic scores over discretized sequences.
//!
//! All entropies are in bits. Probabilities are observed frequencies; no
//! smoothing is applied. Ratios with a zero denominator are reported as 0.

use crate::domain::error::{Diagnostic, InfogainError};
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InformationScore {
    pub information_gain: f64,
    pub gain_ratio: f64,
    pub symmetric_uncertainty: f64,
    pub normalized_mutual_information: f64,
    pub target_entropy: f64,
    pub conditional_entropy: f64,
    pub indicator_entropy: f64,
    pub sample_size: usize,
}

impl InformationScore {
    /// Score how much `indicator` labels reduce uncertainty about `target` labels.
    pub fn compute(indicator: &[usize], target: &[usize]) -> Result<Self, InfogainError> {
        check_lengths(indicator.len(), target.len())?;

        let target_entropy = entropy(target);
        let indicator_entropy = entropy(indicator);
        let conditional = conditional_entropy(indicator, target);
        let information_gain = (target_entropy - conditional).max(0.0);

        Ok(Self {
            information_gain,
            gain_ratio: ratio_or_zero(information_gain, indicator_entropy),
            symmetric_uncertainty: ratio_or_zero(
                2.0 * information_gain,
                indicator_entropy + target_entropy,
            )
            .min(1.0),
            normalized_mutual_information: ratio_or_zero(information_gain, target_entropy).min(1.0),
            target_entropy,
            conditional_entropy: conditional,
            indicator_entropy,
            sample_size: target.len(),
        })
    }

    /// `DivisionDegenerate` diagnostics for every ratio that fell back to 0.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        if self.indicator_entropy <= 0.0 {
            out.push(Diagnostic::DivisionDegenerate {
                metric: "gain_ratio",
            });
        }
        if self.indicator_entropy + self.target_entropy <= 0.0 {
            out.push(Diagnostic::DivisionDegenerate {
                metric: "symmetric_uncertainty",
            });
        }
        if self.target_entropy <= 0.0 {
            out.push(Diagnostic::DivisionDegenerate {
                metric: "normalized_mutual_information",
            });
        }
        out
    }
}

/// H(X) = -Σ p(x)·log2 p(x).
pub fn entropy<T: Eq + Hash>(labels: &[T]) -> f64 {
    entropy_of_counts(frequencies(labels.iter()).into_values(), labels.len())
}

/// H(Y|X) = Σ_x p(x)·H(Y|X=x).
///
/// Groups with a single member have zero entropy but still carry weight p(x).
pub fn conditional_entropy<X, Y>(given: &[X], target: &[Y]) -> f64
where
    X: Eq + Hash,
    Y: Eq + Hash,
{
    let n = given.len().min(target.len());
    if n == 0 {
        return 0.0;
    }

    let mut groups: HashMap<&X, HashMap<&Y, usize>> = HashMap::new();
    for (x, y) in given.iter().zip(target.iter()) {
        *groups.entry(x).or_default().entry(y).or_insert(0) += 1;
    }

    let mut terms: Vec<f64> = groups
        .values()
        .map(|ys| {
            let group_size: usize = ys.values().sum();
            let weight = group_size as f64 / n as f64;
            weight * entropy_of_counts(ys.values().copied(), group_size)
        })
        .collect();
    terms.sort_by(f64::total_cmp);
    terms.into_iter().sum::<f64>().max(0.0)
}

/// I(X;Y) = H(Y) - H(Y|X), clamped at 0.
pub fn mutual_information(x: &[usize], y: &[usize]) -> f64 {
    let n = x.len().min(y.len());
    (entropy(&y[..n]) - conditional_entropy(&x[..n], &y[..n])).max(0.0)
}

/// I(X;Y|Z) = H(X|Z) - H(X|Y,Z), clamped at 0.
pub fn conditional_mutual_information(
    x: &[usize],
    y: &[usize],
    z: &[usize],
) -> Result<f64, InfogainError> {
    check_lengths(x.len(), y.len())?;
    check_lengths(x.len(), z.len())?;

    let yz: Vec<(usize, usize)> = y.iter().copied().zip(z.iter().copied()).collect();
    let h_x_given_z = conditional_entropy(z, x);
    let h_x_given_yz = conditional_entropy(&yz, x);
    Ok((h_x_given_z - h_x_given_yz).max(0.0))
}

/// Transfer entropy from `source` to `target` at `lag`:
/// TE = I(target[t] ; source[t-lag] | target[t-lag]).
///
/// Both sequences must be aligned on the same time index. Returns 0 when
/// fewer than one lagged triple exists.
pub fn transfer_entropy(source: &[usize], target: &[usize], lag: usize) -> Result<f64, InfogainError> {
    check_lengths(source.len(), target.len())?;
    if lag == 0 || target.len() <= lag {
        return Ok(0.0);
    }

    let current = &target[lag..];
    let target_past = &target[..target.len() - lag];
    let source_past = &source[..source.len() - lag];
    conditional_mutual_information(current, source_past, target_past)
}

fn frequencies<'a, T: Eq + Hash + 'a>(labels: impl Iterator<Item = &'a T>) -> HashMap<&'a T, usize> {
    let mut counts = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

// Counts are summed in sorted order so one distribution always gives the same
// bits. Callers summing several of these must fix their own order too.
fn entropy_of_counts(counts: impl IntoIterator<Item = usize>, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let mut counts: Vec<usize> = counts.into_iter().filter(|&c| c > 0).collect();
    counts.sort_unstable();
    let h: f64 = counts
        .into_iter()
        .map(|c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum();
    h.max(0.0)
}

fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn check_lengths(a: usize, b: usize) -> Result<(), InfogainError> {
    if a != b {
        return Err(InfogainError::InvalidSeries {
            name: "label sequences".to_string(),
            reason: format!("length mismatch: {} vs {}", a, b),
        });
    }
    Ok(())
}
