//! The upload UI: an HTML form that forwards images to the inference API.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use base64::Engine;
use log::{info, warn};

use crate::client::{ClientError, PredictClient};
use crate::handlers::{read_upload, UploadLimit};
use crate::render::{self, Outcome, Preview, GENERIC_ERROR};

const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn has_accepted_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false)
}

fn data_uri(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes)
        .map(|format| match format {
            image::ImageFormat::Png => "image/png",
            image::ImageFormat::Jpeg => "image/jpeg",
            _ => "application/octet-stream",
        })
        .unwrap_or("application/octet-stream");
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

pub async fn index() -> HttpResponse {
    html(render::index_page())
}

pub async fn analyze(
    client: web::Data<PredictClient>,
    limit: web::Data<UploadLimit>,
    payload: Multipart,
) -> HttpResponse {
    let upload = match read_upload(payload, limit.0).await {
        Ok(upload) => upload,
        Err(e) => {
            warn!("Rejected upload: {}", e);
            return html(render::result_page(
                None,
                &Outcome::Failed(format!("❌ Error: {}", e)),
            ));
        }
    };

    let file_name = upload.file_name.unwrap_or_else(|| "upload".to_string());
    if !has_accepted_extension(&file_name) {
        return html(render::result_page(
            None,
            &Outcome::Failed(format!(
                "❌ Error: {} is not a supported file type (jpg, jpeg, png)",
                file_name
            )),
        ));
    }

    let preview = Preview {
        file_name: &file_name,
        data_uri: data_uri(&upload.bytes),
    };

    match client.predict(&file_name, upload.bytes).await {
        Ok(prediction) => {
            info!("{} -> {}", file_name, prediction.class);
            html(render::result_page(
                Some(&preview),
                &Outcome::Predicted(&prediction),
            ))
        }
        Err(ClientError::Status(status)) => {
            warn!("{} answered {} for {}", client.url(), status, file_name);
            html(render::result_page(
                Some(&preview),
                &Outcome::Failed(GENERIC_ERROR.to_string()),
            ))
        }
        Err(e) => {
            warn!("Request to {} failed: {}", client.url(), e);
            html(render::result_page(
                Some(&preview),
                &Outcome::Failed(format!("❌ Error: {}", e)),
            ))
        }
    }
}

/// Routes of the upload UI.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/analyze").route(web::post().to(analyze)));
}
