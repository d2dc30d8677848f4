//! The seam between request handling and the numerical engine.

use std::path::Path;

use log::info;
use ndarray::Array4;
use tract_onnx::prelude::*;

use crate::error::{AppError, Result};

/// Runs the forward pass of a pretrained network.
pub trait Classifier: Send + Sync {
    /// Returns one raw score per class for the single image in `input`.
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>>;

    /// Number of scores `forward` returns, when known before running it.
    fn output_len(&self) -> Option<usize> {
        None
    }
}

/// An ONNX model loaded and planned once with tract.
pub struct OnnxClassifier {
    model: TypedRunnableModel<TypedModel>,
    output_len: Option<usize>,
}

impl OnnxClassifier {
    pub fn load(path: &Path, input_shape: [usize; 4]) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::ModelNotFound(path.to_path_buf()));
        }

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| AppError::Model(format!("failed to load {:?}: {}", path, e)))?
            .with_input_fact(0, f32::fact(input_shape).into())
            .map_err(|e| AppError::Model(format!("input shape {:?} rejected: {}", input_shape, e)))?
            .into_optimized()
            .map_err(|e| AppError::Model(format!("optimization failed: {}", e)))?;

        let output_len = model
            .output_fact(0)
            .map_err(|e| AppError::Model(format!("model has no output: {}", e)))?
            .shape
            .as_concrete()
            .map(|dims| dims.iter().product());

        let model = model
            .into_runnable()
            .map_err(|e| AppError::Model(format!("planning failed: {}", e)))?;

        info!(
            "Loaded model {:?} with input {:?}, {:?} outputs",
            path, input_shape, output_len
        );
        Ok(Self { model, output_len })
    }
}

impl Classifier for OnnxClassifier {
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let tensor: Tensor = input.into();
        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(|e| AppError::Inference(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| AppError::Inference("model returned no outputs".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| AppError::Inference(e.to_string()))?;

        Ok(view.iter().copied().collect())
    }

    fn output_len(&self) -> Option<usize> {
        self.output_len
    }
}

/// Returns the same scores for every input.
#[cfg(test)]
pub(crate) struct FixedClassifier(pub Vec<f32>);

#[cfg(test)]
impl Classifier for FixedClassifier {
    fn forward(&self, _input: Array4<f32>) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }

    fn output_len(&self) -> Option<usize> {
        Some(self.0.len())
    }
}
