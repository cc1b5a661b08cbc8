//! # Limpieza de Tareas
//! src/tasks/cleanup.rs
//!
//! Borra el directorio de una tarea (que también contiene el artefacto) y su
//! registro en el store. Todo es best-effort: los errores de filesystem se
//! registran en el log y nunca llegan al llamador.

use super::queue::TaskQueue;
use super::store::TaskStore;
use super::task::TaskStatus;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resultado de un reset total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    /// Tareas completadas limpiadas
    pub completed: usize,

    /// Tareas que estaban en la cola
    pub queued: usize,

    /// Registros restantes descartados (fallidas sin consultar, etc.)
    pub dropped: usize,
}

#[derive(Clone)]
pub struct CleanupManager {
    store: TaskStore,
    queue: TaskQueue,
    root: PathBuf,
}

impl CleanupManager {
    pub fn new(store: TaskStore, queue: TaskQueue, root: PathBuf) -> Self {
        Self { store, queue, root }
    }

    #[cfg(test)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Borra directorio y registro de una tarea
    ///
    /// Retorna `false` si la tarea no existía (no-op).
    pub fn cleanup_task(&self, id: &str) -> bool {
        let Some(task) = self.store.get(id) else {
            debug!(task = %id, "Cleanup skipped, task not tracked");
            return false;
        };

        Self::remove_dir_best_effort(&task.source_dir);
        self.store.remove(id);

        info!(task = %id, status = %task.status, "Task cleaned up");
        true
    }

    /// Borra todas las tareas, la cola y el contenido del directorio raíz
    pub fn bulk_reset(&self) -> ResetSummary {
        let mut summary = ResetSummary::default();

        let queued = self.queue.clear();

        for task in self.store.all() {
            if task.status == TaskStatus::Completed && self.cleanup_task(&task.id) {
                summary.completed += 1;
            }
        }

        for id in &queued {
            if let Some(task) = self.store.get(id) {
                Self::remove_dir_best_effort(&task.source_dir);
            }
        }
        summary.queued = queued.len();

        let remaining = self.store.clear();
        summary.dropped = remaining
            .iter()
            .filter(|task| !queued.contains(&task.id))
            .count();

        self.reset_root();

        info!(
            completed = summary.completed,
            queued = summary.queued,
            dropped = summary.dropped,
            "Bulk reset finished"
        );
        summary
    }

    /// Deja el directorio raíz vacío
    fn reset_root(&self) {
        Self::remove_dir_best_effort(&self.root);

        if let Err(e) = fs::create_dir_all(&self.root) {
            warn!(path = %self.root.display(), error = %e, "Could not recreate uploads directory");
        }
    }

    /// Borrado recursivo; un directorio inexistente no es error
    pub fn remove_dir_best_effort(path: &Path) {
        match fs::remove_dir_all(path) {
            Ok(()) => debug!(path = %path.display(), "Directory removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove directory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::task::Task;

    struct Fixture {
        _root: tempfile::TempDir,
        store: TaskStore,
        queue: TaskQueue,
        cleanup: CleanupManager,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let store = TaskStore::new();
        let queue = TaskQueue::new();
        let cleanup = CleanupManager::new(store.clone(), queue.clone(), root.path().to_path_buf());
        Fixture {
            _root: root,
            store,
            queue,
            cleanup,
        }
    }

    /// Crea el directorio de la tarea y la registra
    fn add_task(f: &Fixture, id: &str) -> Task {
        let dir = f.cleanup.root().join(format!("{}_files", id));
        fs::create_dir_all(&dir).unwrap();
        let entry = dir.join("doc.tex");
        fs::write(&entry, "x").unwrap();

        let task = Task::new(id.to_string(), dir, entry, "pdf");
        f.store.create(task.clone()).unwrap();
        task
    }

    fn complete(f: &Fixture, id: &str) {
        f.store.set_status(id, TaskStatus::Compiling).unwrap();
        f.store.set_status(id, TaskStatus::Completed).unwrap();
    }

    // ==================== Limpieza individual ====================

    #[test]
    fn test_cleanup_removes_dir_and_record() {
        let f = fixture();
        let task = add_task(&f, "a");

        assert!(f.cleanup.cleanup_task("a"));
        assert!(!task.source_dir.exists());
        assert!(f.store.get("a").is_none());
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let f = fixture();
        add_task(&f, "a");

        assert!(f.cleanup.cleanup_task("a"));
        assert!(!f.cleanup.cleanup_task("a"));
        assert!(!f.cleanup.cleanup_task("never-existed"));
    }

    #[test]
    fn test_cleanup_with_missing_dir_still_drops_record() {
        let f = fixture();
        let task = add_task(&f, "a");
        fs::remove_dir_all(&task.source_dir).unwrap();

        assert!(f.cleanup.cleanup_task("a"));
        assert_eq!(f.store.count(), 0);
    }

    #[test]
    fn test_cleanup_survives_filesystem_error() {
        let f = fixture();
        let file = f.cleanup.root().join("not_a_dir");
        fs::write(&file, "x").unwrap();

        // `remove_dir_all` sobre un archivo regular falla
        let task = Task::new("a".to_string(), file.clone(), file.join("doc.tex"), "pdf");
        f.store.create(task).unwrap();

        assert!(f.cleanup.cleanup_task("a"));
        assert!(f.store.get("a").is_none());
        assert!(file.exists());
    }

    // ==================== Reset total ====================

    #[test]
    fn test_bulk_reset_completed_and_queued() {
        let f = fixture();
        let done = add_task(&f, "done");
        complete(&f, "done");

        let waiting = add_task(&f, "waiting");
        f.queue.push("waiting".to_string());

        let summary = f.cleanup.bulk_reset();

        assert_eq!(
            summary,
            ResetSummary {
                completed: 1,
                queued: 1,
                dropped: 0
            }
        );
        assert!(!done.source_dir.exists());
        assert!(!waiting.source_dir.exists());
        assert_eq!(f.store.count(), 0);
        assert!(f.queue.is_empty());

        // La raíz queda vacía pero existe
        assert!(f.cleanup.root().is_dir());
        assert_eq!(fs::read_dir(f.cleanup.root()).unwrap().count(), 0);
    }

    #[test]
    fn test_bulk_reset_drops_unqueued_records_and_stray_files() {
        let f = fixture();
        add_task(&f, "failed");
        f.store.set_status("failed", TaskStatus::Compiling).unwrap();
        f.store.fail("failed", "exit 1".to_string()).unwrap();

        fs::write(f.cleanup.root().join("stray.bin"), "junk").unwrap();

        let summary = f.cleanup.bulk_reset();

        assert_eq!(summary.dropped, 1);
        assert_eq!(f.store.count(), 0);
        assert_eq!(fs::read_dir(f.cleanup.root()).unwrap().count(), 0);
    }

    #[test]
    fn test_bulk_reset_on_empty_state() {
        let f = fixture();
        assert_eq!(f.cleanup.bulk_reset(), ResetSummary::default());
        assert!(f.cleanup.root().is_dir());
    }
}
