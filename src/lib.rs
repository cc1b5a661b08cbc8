//! # LaTeX Compile Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 que recibe proyectos LaTeX como `.zip`, los compila de
//! a uno en orden de llegada y entrega el PDF resultante.
//!
//! ## Arquitectura
//!
//! - `http`: Parsing y construcción de mensajes HTTP/1.0, multipart
//! - `router`: Enrutamiento de peticiones a handlers
//! - `server`: Servidor TCP y manejo de conexiones
//! - `tasks`: Store, cola FIFO, worker de compilación y limpieza
//! - `upload`: IDs de tareas y extracción de archivos subidos
//! - `config` / `logging`: Configuración CLI/env y subscriber de `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use latex_server::config::Config;
//! use latex_server::server::Server;
//!
//! let config = Config::default();
//! let mut server = Server::new(config).expect("Error al crear servidor");
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod http;
pub mod logging;
pub mod router;
pub mod server;
pub mod tasks;
pub mod upload;
