use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::client::DEFAULT_PREDICT_URL;
use crate::predictor::ModelConfig;
use crate::preprocess::{Layout, Normalization, Preprocessor, ResizeMode};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Potato leaf disease classifier
#[derive(Parser, Debug)]
#[command(name = "leaf-classifier")]
#[command(version)]
#[command(about = "Classify potato leaf photos as Early Blight, Late Blight or Healthy")]
pub struct Cli {
    /// Default log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the inference API
    Serve(ServeArgs),
    /// Run the upload UI
    Ui(UiArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value = "localhost")]
    pub host: String,

    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Pretrained ONNX model
    #[arg(long, env = "LEAF_MODEL", default_value = "model.onnx")]
    pub model: PathBuf,

    /// Class names in model output order (repeat for each class)
    #[arg(
        long = "label",
        default_values_t = ["Early Blight".to_string(), "Late Blight".to_string(), "Healthy".to_string()]
    )]
    pub labels: Vec<String>,

    /// Side length of the square model input
    #[arg(long, default_value_t = 224)]
    pub input_size: u32,

    #[arg(long, value_enum, default_value_t = Layout::Nhwc)]
    pub layout: Layout,

    #[arg(long, value_enum, default_value_t = Normalization::Unit)]
    pub normalization: Normalization,

    #[arg(long, value_enum, default_value_t = ResizeMode::Stretch)]
    pub resize: ResizeMode,

    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Origins allowed to call the API from a browser (repeatable)
    #[arg(
        long = "allow-origin",
        default_values_t = [
            "http://localhost".to_string(),
            "http://localhost:3000".to_string(),
            "http://127.0.0.1:3000".to_string(),
            "http://localhost:8501".to_string(),
        ]
    )]
    pub allowed_origins: Vec<String>,
}

impl ServeArgs {
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            path: self.model.clone(),
            labels: self.labels.clone(),
            preprocessor: Preprocessor {
                size: self.input_size,
                layout: self.layout,
                normalization: self.normalization,
                resize: self.resize,
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct UiArgs {
    #[arg(long, default_value = "localhost")]
    pub host: String,

    #[arg(short, long, default_value_t = 8501)]
    pub port: u16,

    /// Where uploads are sent for classification
    #[arg(long, env = "LEAF_PREDICT_URL", default_value = DEFAULT_PREDICT_URL)]
    pub predict_url: String,

    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}
