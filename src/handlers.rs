use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use log::{debug, error};

use crate::error::{AppError, Result};
use crate::predictor::Predictor;

pub const PING_MESSAGE: &str = "Hello, I am alive";

/// Largest accepted upload, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

/// The `file` field of a multipart upload, held in memory.
#[derive(Debug)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Collect the `file` field of `payload`, draining every other field.
pub async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Upload> {
    let mut upload = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::Upload(e.to_string()))?;
        let disposition = field.content_disposition();
        let is_file = disposition.get_name() == Some("file");
        let file_name = disposition.get_filename().map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| AppError::Upload(e.to_string()))?;
            if !is_file {
                continue;
            }
            if bytes.len() + data.len() > limit {
                return Err(AppError::PayloadTooLarge { limit });
            }
            bytes.extend_from_slice(&data);
        }

        if is_file && upload.is_none() {
            debug!("Received file {:?} ({} bytes)", file_name, bytes.len());
            upload = Some(Upload { file_name, bytes });
        }
    }

    match upload {
        Some(upload) if !upload.bytes.is_empty() => Ok(upload),
        _ => Err(AppError::MissingFile),
    }
}

pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(PING_MESSAGE)
}

pub async fn predict(
    predictor: web::Data<Predictor>,
    limit: web::Data<UploadLimit>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let upload = read_upload(payload, limit.0).await?;

    let prediction = web::block(move || predictor.predict(&upload.bytes))
        .await
        .map_err(|e| AppError::Inference(e.to_string()))?
        .map_err(|e| {
            error!("Prediction failed: {}", e);
            e
        })?;

    Ok(HttpResponse::Ok().json(prediction))
}

/// Routes of the inference API.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ping").route(web::get().to(ping)))
        .service(web::resource("/predict").route(web::post().to(predict)));
}

#[cfg(test)]
pub(crate) mod tests {
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};

    use super::*;
    use crate::classifier::FixedClassifier;
    use crate::models::Prediction;
    use crate::preprocess::tests::png_bytes;
    use crate::preprocess::Preprocessor;

    pub(crate) const BOUNDARY: &str = "----leafboundary";

    /// Build a multipart body with one part per `(name, filename, bytes)`.
    pub(crate) fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, bytes) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    name, filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    pub(crate) fn multipart_request(uri: &str, body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    pub(crate) fn stub_predictor(scores: Vec<f32>) -> web::Data<Predictor> {
        web::Data::new(Predictor::new(
            vec!["Early Blight".into(), "Late Blight".into(), "Healthy".into()],
            Preprocessor::default(),
            Box::new(FixedClassifier(scores)),
        ))
    }

    macro_rules! api {
        ($scores:expr, $limit:expr) => {
            test::init_service(
                App::new()
                    .app_data(stub_predictor($scores))
                    .app_data(web::Data::new(UploadLimit($limit)))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_ping() {
        let app = api!(vec![0.2, 0.3, 0.5], 1024);
        let req = test::TestRequest::get().uri("/ping").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = test::read_body(resp).await;
        let message: String = serde_json::from_slice(&body).unwrap();
        assert_eq!(message, PING_MESSAGE);
    }

    #[actix_web::test]
    async fn test_predict_returns_prediction() {
        let app = api!(vec![0.05, 0.9, 0.05], 1 << 20);
        let image = png_bytes(120, 80, [90, 120, 30]);
        let req = multipart_request("/predict", multipart_body(&[("file", "leaf.png", &image[..])]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let prediction: Prediction = test::read_body_json(resp).await;
        assert_eq!(prediction.class, "Late Blight");
        assert_eq!(prediction.confidence, 0.9);
        let sum: f32 = prediction.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[actix_web::test]
    async fn test_predict_ignores_other_fields() {
        let app = api!(vec![0.6, 0.3, 0.1], 1 << 20);
        let image = png_bytes(10, 10, [0, 0, 0]);
        let body = multipart_body(&[("note", "note.txt", &b"hello"[..]), ("file", "leaf.png", &image[..])]);
        let resp = test::call_service(&app, multipart_request("/predict", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let prediction: Prediction = test::read_body_json(resp).await;
        assert_eq!(prediction.class, "Early Blight");
    }

    #[actix_web::test]
    async fn test_predict_without_file_field() {
        let app = api!(vec![0.2, 0.3, 0.5], 1 << 20);
        let body = multipart_body(&[("image", "leaf.png", &b"abc"[..])]);
        let resp = test::call_service(&app, multipart_request("/predict", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_predict_with_invalid_image() {
        let app = api!(vec![0.2, 0.3, 0.5], 1 << 20);
        let body = multipart_body(&[("file", "leaf.jpg", &b"not really a jpeg"[..])]);
        let resp = test::call_service(&app, multipart_request("/predict", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert!(json["error"].as_str().unwrap().starts_with("Invalid image file"));
    }

    #[actix_web::test]
    async fn test_predict_rejects_oversized_upload() {
        let app = api!(vec![0.2, 0.3, 0.5], 32);
        let image = png_bytes(64, 64, [200, 10, 10]);
        assert!(image.len() > 32);
        let body = multipart_body(&[("file", "leaf.png", &image[..])]);
        let resp = test::call_service(&app, multipart_request("/predict", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn test_predict_model_mismatch_is_server_error() {
        let app = api!(vec![1.0], 1 << 20);
        let image = png_bytes(10, 10, [0, 0, 0]);
        let body = multipart_body(&[("file", "leaf.png", &image[..])]);
        let resp = test::call_service(&app, multipart_request("/predict", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
