mod classifier;
mod client;
mod config;
mod error;
mod handlers;
mod models;
mod predictor;
mod preprocess;
mod render;
mod ui;

use std::io;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use log::{error, info};

use crate::client::PredictClient;
use crate::config::{Cli, Command, ServeArgs, UiArgs};
use crate::handlers::UploadLimit;
use crate::predictor::Predictor;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Ui(args) => serve_ui(args).await,
    }
}

/// Browser access to the API: the listed origins, with credentials.
fn cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
}

async fn serve(args: ServeArgs) -> io::Result<()> {
    let config = args.model_config();
    let predictor = Predictor::load(&config).map_err(|e| {
        error!("Could not start: {}", e);
        io::Error::new(io::ErrorKind::Other, e)
    })?;
    info!("Serving {} classes", predictor.labels().len());

    let predictor = web::Data::new(predictor);
    let limit = web::Data::new(UploadLimit(args.max_upload_bytes));
    let origins = args.allowed_origins.clone();

    info!("Inference API running at http://{}:{}", args.host, args.port);
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(Logger::default())
            .app_data(predictor.clone())
            .app_data(limit.clone())
            .configure(handlers::configure)
    })
    .bind((args.host.as_str(), args.port))?
    .run()
    .await
}

async fn serve_ui(args: UiArgs) -> io::Result<()> {
    let client = PredictClient::new(&args.predict_url, Duration::from_secs(args.timeout_secs))
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let client = web::Data::new(client);
    let limit = web::Data::new(UploadLimit(args.max_upload_bytes));

    info!(
        "Upload UI running at http://{}:{} (predictions from {})",
        args.host, args.port, args.predict_url
    );
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(client.clone())
            .app_data(limit.clone())
            .configure(ui::configure)
    })
    .bind((args.host.as_str(), args.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use actix_web::dev::Service;
    use actix_web::http::header;
    use actix_web::test::{self, TestRequest};

    use super::*;

    fn default_origins() -> Vec<String> {
        let cli = Cli::try_parse_from(["leaf-classifier", "serve"]).unwrap();
        match cli.command {
            Command::Serve(args) => args.allowed_origins,
            Command::Ui(_) => unreachable!(),
        }
    }

    #[actix_web::test]
    async fn test_cors_allows_listed_origin_with_credentials() {
        let app = test::init_service(
            App::new()
                .wrap(cors(&default_origins()))
                .route("/ping", web::get().to(handlers::ping)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/ping")
            .insert_header((header::ORIGIN, "http://localhost:3000"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let headers = resp.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[actix_web::test]
    async fn test_cors_preflight_for_listed_origin() {
        let app = test::init_service(
            App::new()
                .wrap(cors(&default_origins()))
                .route("/predict", web::post().to(handlers::ping)),
        )
        .await;

        let req = TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/predict")
            .insert_header((header::ORIGIN, "http://127.0.0.1:3000"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://127.0.0.1:3000"
        );
    }

    #[actix_web::test]
    async fn test_cors_ignores_unlisted_origin() {
        let app = test::init_service(
            App::new()
                .wrap(cors(&default_origins()))
                .route("/ping", web::get().to(handlers::ping)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/ping")
            .insert_header((header::ORIGIN, "http://evil.example"))
            .to_request();
        // the middleware may answer with an error response or an error
        if let Ok(resp) = app.call(req).await {
            assert!(resp
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none());
        }
    }
}
