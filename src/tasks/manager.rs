//! # Gestor Central de Tareas
//! src/tasks/manager.rs
//!
//! Objeto de servicio que es dueño del store, la cola, el planificador y la
//! limpieza. Se construye una vez al arrancar el servidor y los handlers HTTP
//! sólo hablan con él.

use super::cleanup::{CleanupManager, ResetSummary};
use super::error::{SubmitError, TaskError};
use super::queue::TaskQueue;
use super::runner::{CompilerCommand, Compile, ProcessRunner};
use super::scheduler::QueueScheduler;
use super::store::TaskStore;
use super::task::{Task, TaskStatus};
use crate::config::Config;
use crate::upload;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Configuración del Task Manager
#[derive(Debug, Clone)]
pub struct TaskManagerConfig {
    /// Raíz donde se extraen los uploads
    pub uploads_dir: PathBuf,

    pub compiler: CompilerCommand,

    /// Regex sobre el nombre de archivo del documento de entrada
    pub entry_pattern: String,

    /// Extensión del artefacto generado
    pub artifact_ext: String,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("./uploads"),
            compiler: CompilerCommand::default(),
            entry_pattern: r"(?i)\.tex$".to_string(),
            artifact_ext: "pdf".to_string(),
        }
    }
}

impl TaskManagerConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &Config) -> Self {
        let output_dir_flag = Some(config.output_dir_flag.trim())
            .filter(|flag| !flag.is_empty())
            .map(str::to_string);

        Self {
            uploads_dir: config.uploads_dir.clone(),
            compiler: CompilerCommand {
                program: config.compiler.clone(),
                args: config.compiler_args.clone(),
                output_dir_flag,
                timeout: config.compile_timeout(),
            },
            entry_pattern: config.entry_pattern.clone(),
            artifact_ext: config.artifact_ext.clone(),
        }
    }
}

/// Fila del listado de la cola
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub id: String,
    pub status: TaskStatus,
    pub source_dir: PathBuf,
}

pub struct TaskManager {
    config: TaskManagerConfig,
    entry_pattern: Regex,
    store: TaskStore,
    queue: TaskQueue,
    scheduler: QueueScheduler,
    cleanup: CleanupManager,
}

impl TaskManager {
    /// Crea el manager con el compilador configurado
    pub fn new(config: TaskManagerConfig) -> io::Result<Self> {
        let runner = ProcessRunner::new(config.compiler.clone());
        Self::with_compiler(config, Arc::new(runner))
    }

    /// Crea el manager con un compilador arbitrario
    pub fn with_compiler(config: TaskManagerConfig, compiler: Arc<dyn Compile>) -> io::Result<Self> {
        fs::create_dir_all(&config.uploads_dir)?;

        let entry_pattern = Regex::new(&config.entry_pattern)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let store = TaskStore::new();
        let queue = TaskQueue::new();
        let scheduler = QueueScheduler::start(store.clone(), queue.clone(), compiler)?;
        let cleanup = CleanupManager::new(store.clone(), queue.clone(), config.uploads_dir.clone());

        Ok(Self {
            config,
            entry_pattern,
            store,
            queue,
            scheduler,
            cleanup,
        })
    }

    /// Acepta un `.zip`, crea la tarea y la encola
    ///
    /// Si algo falla no queda ni registro ni directorio.
    pub fn submit_archive(&self, archive: &[u8]) -> Result<String, SubmitError> {
        if archive.is_empty() {
            return Err(SubmitError::MissingArchive);
        }

        let id = upload::generate_task_id();
        let dir = upload::task_dir(&self.config.uploads_dir, &id);

        let result = self.prepare_and_submit(&id, &dir, archive);
        if result.is_err() {
            CleanupManager::remove_dir_best_effort(&dir);
        }

        result.map(|()| id)
    }

    fn prepare_and_submit(&self, id: &str, dir: &Path, archive: &[u8]) -> Result<(), SubmitError> {
        let entries = upload::extract_archive(archive, dir)?;

        let entry = upload::find_entry_file(dir, &self.entry_pattern)?
            .ok_or(SubmitError::NoEntryFile)?;

        info!(task = %id, entries, entry = %entry.display(), "Archive accepted");

        let task = Task::new(
            id.to_string(),
            dir.to_path_buf(),
            entry,
            &self.config.artifact_ext,
        );
        self.scheduler.submit(task)?;
        Ok(())
    }

    /// Lectura sin efectos secundarios
    pub fn task(&self, id: &str) -> Option<Task> {
        self.store.get(id)
    }

    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        self.store.status(id)
    }

    /// Estado para un cliente que consulta
    ///
    /// Una tarea `failed` se reporta una vez y se recupera su espacio.
    pub fn observe_status(&self, id: &str) -> Option<TaskStatus> {
        let status = self.store.status(id)?;

        if status == TaskStatus::Failed {
            self.reclaim_failed(id);
        }

        Some(status)
    }

    /// Limpia la tarea sólo si está `failed`
    pub fn reclaim_failed(&self, id: &str) -> bool {
        match self.store.status(id) {
            Some(TaskStatus::Failed) => self.cleanup.cleanup_task(id),
            _ => false,
        }
    }

    /// Ruta del artefacto de una tarea completada
    pub fn artifact(&self, id: &str) -> Result<PathBuf, TaskError> {
        self.store
            .get(id)
            .filter(|task| task.status == TaskStatus::Completed)
            .and_then(|task| task.artifact)
            .ok_or_else(|| TaskError::ArtifactUnavailable(id.to_string()))
    }

    /// Acción a ejecutar cuando la descarga terminó completa
    pub fn download_finisher(&self, id: &str) -> impl FnOnce() + Send + 'static {
        let cleanup = self.cleanup.clone();
        let id = id.to_string();

        move || {
            cleanup.cleanup_task(&id);
        }
    }

    /// Tareas en la cola, en orden
    pub fn list_queue(&self) -> Vec<QueueEntry> {
        self.queue
            .snapshot()
            .into_iter()
            .filter_map(|id| self.store.get(&id))
            .map(|task| QueueEntry {
                id: task.id,
                status: task.status,
                source_dir: task.source_dir,
            })
            .collect()
    }

    pub fn bulk_reset(&self) -> ResetSummary {
        self.cleanup.bulk_reset()
    }

    pub fn task_count(&self) -> usize {
        self.store.count()
    }

    /// Detiene el worker después de la compilación en curso
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
