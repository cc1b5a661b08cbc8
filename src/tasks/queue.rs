//! # Cola FIFO de Tareas
//! src/tasks/queue.rs
//!
//! Secuencia ordenada de ids pendientes. La cabeza es la tarea que se está
//! compilando o la próxima en hacerlo, y sólo se retira cuando esa tarea
//! llegó a un estado terminal.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Default)]
struct QueueState {
    ids: VecDeque<String>,
    closed: bool,
}

/// Cola FIFO thread-safe de ids de tareas
#[derive(Clone, Default)]
pub struct TaskQueue {
    state: Arc<Mutex<QueueState>>,

    /// Notifica cuando llega una tarea o se cierra la cola
    condvar: Arc<Condvar>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega al final de la cola
    pub fn push(&self, id: String) {
        let mut state = self.state.lock();
        state.ids.push_back(id);
        self.condvar.notify_all();
    }

    /// Espera hasta que haya una cabeza y retorna su id sin retirarla
    ///
    /// Retorna `None` cuando la cola fue cerrada.
    pub fn wait_head(&self) -> Option<String> {
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return None;
            }
            if let Some(head) = state.ids.front() {
                return Some(head.clone());
            }
            self.condvar.wait(&mut state);
        }
    }

    #[cfg(test)]
    pub fn peek(&self) -> Option<String> {
        self.state.lock().ids.front().cloned()
    }

    /// Retira la tarea ya terminada
    ///
    /// Si un reset vació la cola mientras compilaba, no hace nada.
    pub fn complete_head(&self, id: &str) -> bool {
        let mut state = self.state.lock();

        match state.ids.iter().position(|queued| queued == id) {
            Some(index) => {
                state.ids.remove(index);
                true
            }
            None => false,
        }
    }

    /// Ids en orden de llegada
    pub fn snapshot(&self) -> Vec<String> {
        self.state.lock().ids.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().ids.iter().any(|queued| queued == id)
    }

    /// Vacía la cola y retorna los ids que tenía
    pub fn clear(&self) -> Vec<String> {
        self.state.lock().ids.drain(..).collect()
    }

    /// Despierta al consumidor para que termine
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.condvar.notify_all();
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
