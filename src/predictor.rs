use std::path::PathBuf;

use log::{debug, info};

use crate::classifier::{Classifier, OnnxClassifier};
use crate::error::{AppError, Result};
use crate::models::{check_labels, Prediction};
use crate::preprocess::Preprocessor;

/// Everything needed to load the model at startup.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Class names in the order of the model's output vector
    pub labels: Vec<String>,
    pub preprocessor: Preprocessor,
}

/// Process-wide inference state, read-only once built.
pub struct Predictor {
    labels: Vec<String>,
    preprocessor: Preprocessor,
    classifier: Box<dyn Classifier>,
}

impl Predictor {
    pub fn new(
        labels: Vec<String>,
        preprocessor: Preprocessor,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        Self {
            labels,
            preprocessor,
            classifier,
        }
    }

    /// Like `new`, but fails if `labels` cannot key the probabilities or
    /// do not match the output size the classifier reports.
    pub fn checked(
        labels: Vec<String>,
        preprocessor: Preprocessor,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self> {
        check_labels(&labels)?;
        if let Some(outputs) = classifier.output_len() {
            if outputs != labels.len() {
                return Err(AppError::Model(format!(
                    "model produces {} outputs but {} labels are configured",
                    outputs,
                    labels.len()
                )));
            }
        }
        Ok(Self::new(labels, preprocessor, classifier))
    }

    pub fn load(config: &ModelConfig) -> Result<Self> {
        check_labels(&config.labels)?;
        let classifier =
            OnnxClassifier::load(&config.path, config.preprocessor.input_shape())?;
        info!("Classes: {}", config.labels.join(", "));
        Self::checked(
            config.labels.clone(),
            config.preprocessor.clone(),
            Box::new(classifier),
        )
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn predict(&self, bytes: &[u8]) -> Result<Prediction> {
        let input = self.preprocessor.tensor(bytes)?;
        debug!("Input tensor shape: {:?}", input.shape());

        let scores = self.classifier.forward(input)?;
        debug!("Raw model output ({} values): {:?}", scores.len(), scores);

        let prediction = Prediction::from_scores(&self.labels, &scores)?;
        info!(
            "Predicted class: {} (confidence {:.4})",
            prediction.class, prediction.confidence
        );
        Ok(prediction)
    }
}
