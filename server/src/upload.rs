//! HTTP endpoints for uploading and toggling the custom map
//!
//! - `POST /upload` stores the first multipart part that carries a filename
//!   as the active map.
//! - `POST /activateRandomMap` moves a disabled map back into place.
//! - `POST /deactivateRandomMap` moves the active map aside.
//!
//! Every request is answered with a short plain-text body. When a command
//! sender is attached, a stored upload asks the track driver to reload. Toggling
//! activation never reloads, so replay resumes where it stopped.

use crate::game::TrackCommand;
use crate::map_source::{MapSource, MapSourceError};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::routing::post;
use axum::Router;
use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

type Reply = (StatusCode, &'static str);

#[derive(Clone)]
pub struct UploadState {
    source: MapSource,
    commands: Option<mpsc::UnboundedSender<TrackCommand>>,
}

impl UploadState {
    pub fn new(source: MapSource) -> Self {
        Self {
            source,
            commands: None,
        }
    }

    pub fn with_commands(mut self, commands: mpsc::UnboundedSender<TrackCommand>) -> Self {
        self.commands = Some(commands);
        self
    }

    fn request_reload(&self) {
        if let Some(commands) = &self.commands {
            if let Err(e) = commands.send(TrackCommand::ReloadMap) {
                warn!("Track driver is gone, map reload not requested: {}", e);
            }
        }
    }
}

pub fn router(state: UploadState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/upload", post(upload).get(use_post))
        .route("/activateRandomMap", post(activate).get(use_post))
        .route("/deactivateRandomMap", post(deactivate).get(use_post))
        .fallback(fallback)
        .layer(cors)
        .with_state(state)
}

/// Binds `addr` and serves the upload endpoints until the listener fails.
pub async fn serve(
    addr: &str,
    state: UploadState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Map upload service listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn upload(
    State(state): State<UploadState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Reply {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("multipart/form-data") {
        return (StatusCode::BAD_REQUEST, "Invalid content type");
    }
    if !content_type.contains("boundary=") {
        return (StatusCode::BAD_REQUEST, "Missing boundary");
    }

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            warn!("Rejected upload: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid multipart body");
        }
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart body: {}", e);
                return (StatusCode::BAD_REQUEST, "Invalid multipart body");
            }
        };

        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read uploaded file {}: {}", file_name, e);
                return (StatusCode::BAD_REQUEST, "Invalid multipart body");
            }
        };

        if let Err(e) = state.source.store_upload(&bytes) {
            error!("Failed to store uploaded map {}: {}", file_name, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to store map");
        }

        info!("Received map upload {}", file_name);
        state.request_reload();
        return (StatusCode::OK, "File uploaded successfully.");
    }

    (StatusCode::BAD_REQUEST, "No valid file part found")
}

async fn activate(State(state): State<UploadState>) -> Reply {
    match state.source.activate() {
        Ok(()) => (StatusCode::OK, "Map activated"),
        Err(MapSourceError::NotFound(_)) => (StatusCode::NOT_FOUND, "custom_map.csv not found"),
        Err(e) => {
            error!("Failed to activate map: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to activate map")
        }
    }
}

async fn deactivate(State(state): State<UploadState>) -> Reply {
    match state.source.deactivate() {
        Ok(()) => (StatusCode::OK, "Map deactivated"),
        Err(e) => {
            error!("Failed to deactivate map: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to deactivate map")
        }
    }
}

async fn use_post() -> Reply {
    (StatusCode::METHOD_NOT_ALLOWED, "Use POST for all operations")
}

async fn fallback(method: Method) -> Reply {
    if method == Method::GET {
        use_post().await
    } else {
        (StatusCode::NOT_FOUND, "Endpoint not found")
    }
}
