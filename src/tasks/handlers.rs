//! # Handlers HTTP para Tareas
//! src/tasks/handlers.rs
//!
//! Implementa los endpoints del servicio de compilación:
//! - GET  /queue
//! - POST /upload
//! - GET  /status/{id}
//! - GET  /download/{id}
//! - POST /cleanup

use crate::http::multipart;
use crate::http::{Request, Response, StatusCode};
use crate::router::PathParams;
use crate::tasks::error::SubmitError;
use crate::tasks::manager::TaskManager;
use serde_json::json;
use std::path::Path;
use tracing::{error, info, warn};

/// Campo del formulario que trae el archivo
pub const UPLOAD_FIELD: &str = "file";

/// Handler para GET /queue
///
/// # Ejemplo de response
/// ```json
/// {"queue": [{"id": "3f2a...", "status": "compiling", "source_dir": "uploads/3f2a..._files"}]}
/// ```
pub fn queue_handler(_req: &Request, _params: &PathParams, manager: &TaskManager) -> Response {
    Response::json_value(StatusCode::Ok, &json!({ "queue": manager.list_queue() }))
}

/// Extrae los bytes del `.zip` del request
///
/// Acepta `multipart/form-data` con el campo `file`, o el zip crudo como body.
fn archive_bytes(req: &Request) -> Result<Vec<u8>, SubmitError> {
    match req.content_type().as_deref() {
        Some("multipart/form-data") => multipart::find_part(req, UPLOAD_FIELD)?
            .map(|part| part.data)
            .ok_or(SubmitError::MissingArchive),
        Some("application/zip")
        | Some("application/x-zip-compressed")
        | Some("application/octet-stream") => Ok(req.body().to_vec()),
        _ => Err(SubmitError::MissingArchive),
    }
}

/// Handler para POST /upload
///
/// # Ejemplo de response
/// ```json
/// {"message": "File uploaded and queued for compilation.", "id": "3f2a...", "status": "queued"}
/// ```
pub fn upload_handler(req: &Request, _params: &PathParams, manager: &TaskManager) -> Response {
    let submitted = archive_bytes(req).and_then(|bytes| manager.submit_archive(&bytes));

    match submitted {
        Ok(id) => Response::json_value(
            StatusCode::Ok,
            &json!({
                "message": "File uploaded and queued for compilation.",
                "id": id,
                "status": "queued",
            }),
        ),
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "Upload rejected");
            Response::error(StatusCode::BadRequest, &e.to_string())
        }
        Err(e) => {
            error!(error = %e, "Upload failed");
            Response::error(StatusCode::InternalServerError, "Failed to handle the file.")
        }
    }
}

/// Handler para GET /status/{id}
///
/// Una tarea `failed` se limpia después de reportarla.
pub fn status_handler(_req: &Request, params: &PathParams, manager: &TaskManager) -> Response {
    let id = params.get("id").unwrap_or_default();

    match manager.observe_status(id) {
        Some(status) => Response::json_value(StatusCode::Ok, &json!({ "status": status })),
        None => Response::error(StatusCode::NotFound, "Task not found."),
    }
}

/// Content-Type según la extensión del artefacto
fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("dvi") => "application/x-dvi",
        Some("ps") => "application/postscript",
        Some("html") | Some("htm") => "text/html",
        _ => "application/octet-stream",
    }
}

/// Handler para GET /download/{id}
///
/// Transmite el artefacto; la tarea se limpia sólo si la transferencia
/// completa terminó bien.
pub fn download_handler(_req: &Request, params: &PathParams, manager: &TaskManager) -> Response {
    let id = params.get("id").unwrap_or_default();

    let artifact = match manager.artifact(id) {
        Ok(path) => path,
        Err(_) => return Response::error(StatusCode::NotFound, "PDF file not available."),
    };

    match Response::file(&artifact, content_type_for(&artifact)) {
        Ok(response) => {
            info!(task = %id, path = %artifact.display(), "Serving artifact");
            response.on_sent(manager.download_finisher(id))
        }
        Err(e) => {
            warn!(task = %id, error = %e, "Artifact missing on disk");
            Response::error(StatusCode::NotFound, "PDF file not found.")
        }
    }
}

/// Handler para POST /cleanup
///
/// # Ejemplo de response
/// ```json
/// {"message": "All tasks and uploads have been cleaned up.", "completed": 1, "queued": 2, "dropped": 0}
/// ```
pub fn cleanup_handler(_req: &Request, _params: &PathParams, manager: &TaskManager) -> Response {
    let summary = manager.bulk_reset();

    Response::json_value(
        StatusCode::Ok,
        &json!({
            "message": "All tasks and uploads have been cleaned up.",
            "completed": summary.completed,
            "queued": summary.queued,
            "dropped": summary.dropped,
        }),
    )
}
