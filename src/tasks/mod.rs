//! # Sistema de Tareas de Compilación
//! src/tasks/mod.rs
//!
//! Ciclo de vida de una compilación: store en memoria, cola FIFO, un único
//! worker que ejecuta el compilador, y limpieza de archivos.

pub mod cleanup;
pub mod error;
pub mod handlers;
pub mod manager;
pub mod queue;
pub mod runner;
pub mod scheduler;
pub mod store;
pub mod task;

pub use cleanup::{CleanupManager, ResetSummary};
pub use error::{SubmitError, TaskError};
pub use manager::{QueueEntry, TaskManager, TaskManagerConfig};
pub use queue::TaskQueue;
pub use runner::{Compile, CompilerCommand, ProcessRunner, RunError, RunOutput};
pub use scheduler::QueueScheduler;
pub use store::TaskStore;
pub use task::{Task, TaskStatus};
