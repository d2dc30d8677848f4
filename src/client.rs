//! HTTP client the upload UI uses to reach the inference API.

use std::time::Duration;

use log::debug;
use reqwest::multipart::{Form, Part};
use thiserror::Error;

use crate::models::Prediction;

pub const DEFAULT_PREDICT_URL: &str = "http://localhost:8000/predict";

#[derive(Error, Debug)]
pub enum ClientError {
    /// The API answered with something other than 200
    #[error("prediction API returned status {0}")]
    Status(u16),

    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct PredictClient {
    url: String,
    client: reqwest::Client,
}

impl PredictClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Upload `bytes` as multipart field `file` and parse the prediction.
    pub async fn predict(&self, file_name: &str, bytes: Vec<u8>) -> Result<Prediction, ClientError> {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        let response = self.client.post(&self.url).multipart(form).send().await?;

        let status = response.status();
        debug!("POST {} -> {}", self.url, status);
        if status != reqwest::StatusCode::OK {
            return Err(ClientError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}
