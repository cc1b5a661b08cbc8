//! Errores del sistema de tareas.

use super::task::TaskStatus;
use crate::http::multipart::MultipartError;
use crate::upload::UploadError;
use thiserror::Error;

/// Errores sobre tareas ya creadas
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task already exists: {0}")]
    AlreadyExists(String),

    #[error("Task {id}: invalid transition {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// La tarea no existe o todavía no terminó con éxito
    #[error("Artifact not available for task {0}")]
    ArtifactUnavailable(String),
}

/// Errores al aceptar un upload
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("No file uploaded.")]
    MissingArchive,

    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    #[error("No entry document found in the archive.")]
    NoEntryFile,

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Task(#[from] TaskError),
}

impl SubmitError {
    /// El problema está en la entrada del cliente (400), no en el servidor
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SubmitError::MissingArchive
                | SubmitError::MalformedArchive(_)
                | SubmitError::NoEntryFile
                | SubmitError::Multipart(_)
        )
    }
}

impl From<UploadError> for SubmitError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Archive(e) => SubmitError::MalformedArchive(e.to_string()),
            UploadError::Io(e) => SubmitError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(SubmitError::MissingArchive.is_client_error());
        assert!(SubmitError::NoEntryFile.is_client_error());
        assert!(SubmitError::MalformedArchive("bad".into()).is_client_error());
        assert!(SubmitError::Multipart(MultipartError::MissingBoundary).is_client_error());

        let io = SubmitError::Io(std::io::Error::other("disk full"));
        assert!(!io.is_client_error());
    }

    #[test]
    fn test_zip_error_maps_to_malformed() {
        let err: SubmitError =
            UploadError::Archive(zip::result::ZipError::InvalidArchive("bad".into())).into();
        assert!(matches!(err, SubmitError::MalformedArchive(_)));
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = TaskError::InvalidTransition {
            id: "t1".into(),
            from: TaskStatus::Failed,
            to: TaskStatus::Compiling,
        };
        assert_eq!(err.to_string(), "Task t1: invalid transition failed -> compiling");
    }
}
