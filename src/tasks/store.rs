//! # Almacén de Tareas
//! src/tasks/store.rs
//!
//! Mapa en memoria `id → Task`. Es la única fuente de verdad para consultar
//! el estado de una tarea; la cola sólo guarda ids.
//!
//! Clonar el store comparte el mismo mapa.

use super::error::TaskError;
use super::task::{Task, TaskStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct TaskStore {
    tasks: Arc<Mutex<HashMap<String, Task>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una tarea nueva
    pub fn create(&self, task: Task) -> Result<(), TaskError> {
        let mut tasks = self.tasks.lock();

        if tasks.contains_key(&task.id) {
            return Err(TaskError::AlreadyExists(task.id));
        }

        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Copia de la tarea, o `None` si no existe
    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks.lock().get(id).cloned()
    }

    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        self.tasks.lock().get(id).map(|task| task.status)
    }

    /// Aplica una mutación sobre la tarea bajo el lock
    fn update<F>(&self, id: &str, apply: F) -> Result<(), TaskError>
    where
        F: FnOnce(&mut Task) -> Result<(), TaskError>,
    {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        apply(task)
    }

    /// Cambia el estado respetando la máquina de estados
    ///
    /// Para `completed` el artefacto registrado es `output_file`; para
    /// `failed` no queda diagnóstico. Usar `complete`/`fail` para dar detalles.
    pub fn set_status(&self, id: &str, status: TaskStatus) -> Result<(), TaskError> {
        self.update(id, |task| match status {
            TaskStatus::Compiling => task.mark_compiling(),
            TaskStatus::Completed => {
                let output = task.output_file.clone();
                task.mark_completed(&output)
            }
            TaskStatus::Failed => task.mark_failed(String::new()),
            TaskStatus::Queued => Err(TaskError::InvalidTransition {
                id: task.id.clone(),
                from: task.status,
                to: TaskStatus::Queued,
            }),
        })
    }

    pub fn complete(&self, id: &str, artifact: &Path) -> Result<(), TaskError> {
        self.update(id, |task| task.mark_completed(artifact))
    }

    pub fn fail(&self, id: &str, reason: String) -> Result<(), TaskError> {
        self.update(id, |task| task.mark_failed(reason))
    }

    pub fn remove(&self, id: &str) -> Option<Task> {
        self.tasks.lock().remove(id)
    }

    /// Todas las tareas, ordenadas por creación
    pub fn all(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.lock().values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        tasks
    }

    pub fn count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Vacía el store y retorna lo que había
    pub fn clear(&self) -> Vec<Task> {
        self.tasks.lock().drain().map(|(_, task)| task).collect()
    }
}
