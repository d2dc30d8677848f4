use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Tolerance used when deciding whether raw model output is already a
/// probability distribution.
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// Probabilities below this (or above `1 - LOW_PROBABILITY`) are reported as
/// suspicious, they usually mean the model saturated on one class.
const LOW_PROBABILITY: f32 = 0.0001;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Prediction {
    pub class: String,
    pub confidence: f32,
    pub probabilities: BTreeMap<String, f32>,
}

/// Labels become the keys of `probabilities`, so they must be non-empty and
/// unique.
pub fn check_labels(labels: &[String]) -> Result<()> {
    if labels.is_empty() {
        return Err(AppError::Model("no class labels configured".to_string()));
    }
    let mut seen = HashSet::new();
    for label in labels {
        if label.trim().is_empty() {
            return Err(AppError::Model("class labels must not be empty".to_string()));
        }
        if !seen.insert(label.as_str()) {
            return Err(AppError::Model(format!("duplicate class label: {}", label)));
        }
    }
    Ok(())
}

impl Prediction {
    /// Build a prediction from the raw output vector of the model.
    ///
    /// `scores[i]` belongs to `labels[i]`. Output that is not already a
    /// distribution (logits) goes through a softmax first.
    pub fn from_scores(labels: &[String], scores: &[f32]) -> Result<Self> {
        check_labels(labels)?;
        if scores.is_empty() || scores.len() != labels.len() {
            return Err(AppError::Model(format!(
                "model produced {} outputs for {} labels",
                scores.len(),
                labels.len()
            )));
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(AppError::Inference(format!(
                "model produced a non-finite score: {}",
                bad
            )));
        }

        let probabilities = if is_distribution(scores) {
            scores.to_vec()
        } else {
            debug!("Raw output is not a distribution, applying softmax");
            softmax(scores)
        };

        let (index, confidence) = argmax(&probabilities);

        for (label, &prob) in labels.iter().zip(&probabilities) {
            debug!("{}: {:.4}", label, prob);
            if prob < LOW_PROBABILITY {
                warn!("{} has very low probability: {:.4}", label, prob);
            } else if prob > 1.0 - LOW_PROBABILITY {
                warn!("{} has very high probability: {:.4}", label, prob);
            }
        }
        debug!(
            "Sum of probabilities: {:.4}",
            probabilities.iter().sum::<f32>()
        );

        Ok(Self {
            class: labels[index].clone(),
            confidence,
            probabilities: labels.iter().cloned().zip(probabilities).collect(),
        })
    }

    /// Class probabilities, highest first.
    pub fn ranked(&self) -> Vec<(&str, f32)> {
        let mut ranked: Vec<(&str, f32)> = self
            .probabilities
            .iter()
            .map(|(label, &prob)| (label.as_str(), prob))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked
    }
}

fn is_distribution(scores: &[f32]) -> bool {
    let sum: f32 = scores.iter().sum();
    scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Index and value of the largest element; the first one wins on ties.
fn argmax(values: &[f32]) -> (usize, f32) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
}
