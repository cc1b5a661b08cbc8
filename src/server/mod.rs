//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones, cada una en su propio thread
//! 3. Lee el request completo (cabecera + body acotado)
//! 4. Lo rutea a los handlers de tareas y envía la respuesta

pub mod tcp;

pub use tcp::Server;
