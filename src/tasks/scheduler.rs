//! # Planificador de la Cola
//! src/tasks/scheduler.rs
//!
//! Un único worker drena la cola en orden de llegada. Nunca hay más de una
//! compilación en vuelo porque sólo existe ese thread.
//!
//! ```text
//! loop:
//!   head = queue.wait_head()
//!   store: queued → compiling
//!   runner.compile(entry, dir)
//!   store: compiling → completed | failed
//!   queue.complete_head(head)
//! ```
//!
//! Ninguna falla de una tarea sale del loop: se registra como `failed`.

use super::error::TaskError;
use super::queue::TaskQueue;
use super::runner::Compile;
use super::store::TaskStore;
use super::task::{Task, TaskStatus};
use parking_lot::Mutex;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, info_span, warn};

pub struct QueueScheduler {
    store: TaskStore,
    queue: TaskQueue,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueueScheduler {
    /// Arranca el worker de compilación
    pub fn start(
        store: TaskStore,
        queue: TaskQueue,
        compiler: Arc<dyn Compile>,
    ) -> io::Result<Self> {
        let worker = {
            let store = store.clone();
            let queue = queue.clone();

            thread::Builder::new()
                .name("compile-queue".to_string())
                .spawn(move || Self::drain_loop(store, queue, compiler))?
        };

        Ok(Self {
            store,
            queue,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Registra la tarea como `queued` y la pone al final de la cola
    pub fn submit(&self, task: Task) -> Result<(), TaskError> {
        let id = task.id.clone();
        self.store.create(task)?;
        self.queue.push(id.clone());

        info!(task = %id, position = self.queue.len(), "Task queued");
        Ok(())
    }

    /// Cierra la cola y espera a que termine la compilación en curso
    pub fn shutdown(&self) {
        self.queue.close();

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("Compile worker panicked");
            }
        }
    }

    fn drain_loop(store: TaskStore, queue: TaskQueue, compiler: Arc<dyn Compile>) {
        info!("Compile worker started");

        while let Some(id) = queue.wait_head() {
            Self::process(&store, &id, compiler.as_ref());
            queue.complete_head(&id);
        }

        info!("Compile worker stopped");
    }

    /// Lleva una tarea de `queued` a un estado terminal
    fn process(store: &TaskStore, id: &str, compiler: &dyn Compile) {
        let span = info_span!("task", id = %id);
        let _entered = span.enter();

        if let Err(e) = store.set_status(id, TaskStatus::Compiling) {
            // Un reset pudo borrar el registro mientras esperaba
            warn!(error = %e, "Skipping task");
            return;
        }

        let Some(task) = store.get(id) else {
            warn!("Task vanished before compiling");
            return;
        };

        info!(entry = %task.entry_file.display(), "Compiling");

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            compiler.compile(&task.entry_file, &task.source_dir)
        }));

        let outcome = match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("compiler panicked".to_string()),
        };

        let recorded = match outcome {
            Ok(output) => {
                info!(elapsed_ms = output.elapsed.as_millis() as u64, "Compilation completed");
                store.complete(id, &task.output_file)
            }
            Err(reason) => {
                error!(%reason, "Compilation failed");
                store.fail(id, reason)
            }
        };

        if let Err(e) = recorded {
            warn!(error = %e, "Could not record compilation result");
        }
    }
}

impl Drop for QueueScheduler {
    fn drop(&mut self) {
        self.queue.close();
    }
}
