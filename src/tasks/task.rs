//! # Tipos del Sistema de Tareas
//! src/tasks/task.rs
//!
//! Define una tarea de compilación y su máquina de estados:
//!
//! ```text
//! queued ──▶ compiling ──┬──▶ completed
//!                        └──▶ failed
//! ```
//!
//! Cualquier otra transición se rechaza y deja la tarea sin cambios.

use super::error::TaskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Estado de una tarea
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// En cola esperando compilación
    Queued,

    /// El compilador está corriendo
    Compiling,

    /// Artefacto generado
    Completed,

    /// El compilador falló, no arrancó o excedió el timeout
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Compiling => "compiling",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// `completed` o `failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Queued, TaskStatus::Compiling)
                | (TaskStatus::Compiling, TaskStatus::Completed)
                | (TaskStatus::Compiling, TaskStatus::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp UNIX en segundos
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Una tarea de compilación
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// ID opaco, inmutable
    pub id: String,

    /// Directorio con el árbol extraído; pertenece sólo a esta tarea
    pub source_dir: PathBuf,

    /// Documento a compilar
    pub entry_file: PathBuf,

    /// Ruta esperada del artefacto
    pub output_file: PathBuf,

    /// Artefacto registrado al completar
    pub artifact: Option<PathBuf>,

    pub status: TaskStatus,

    pub created_at: u64,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,

    /// Diagnóstico de la falla (sólo se registra en el servidor)
    pub error: Option<String>,
}

impl Task {
    /// Crea una tarea en estado `queued`
    ///
    /// `output_file` es `entry_file` con la extensión `artifact_ext`.
    pub fn new(id: String, source_dir: PathBuf, entry_file: PathBuf, artifact_ext: &str) -> Self {
        let output_file = entry_file.with_extension(artifact_ext);

        Self {
            id,
            source_dir,
            entry_file,
            output_file,
            artifact: None,
            status: TaskStatus::Queued,
            created_at: now_secs(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    fn transition(&mut self, next: TaskStatus) -> Result<(), TaskError> {
        if !self.status.can_transition_to(next) {
            return Err(TaskError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_compiling(&mut self) -> Result<(), TaskError> {
        self.transition(TaskStatus::Compiling)?;
        self.started_at = Some(now_secs());
        Ok(())
    }

    pub fn mark_completed(&mut self, artifact: &Path) -> Result<(), TaskError> {
        self.transition(TaskStatus::Completed)?;
        self.artifact = Some(artifact.to_path_buf());
        self.finished_at = Some(now_secs());
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: String) -> Result<(), TaskError> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(reason);
        self.finished_at = Some(now_secs());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
