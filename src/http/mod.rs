//! # Módulo HTTP
//!
//! Implementa el protocolo HTTP/1.0 desde cero, sin librerías de alto nivel:
//!
//! - Parsing de requests (cabecera de texto, body binario)
//! - Construcción de responses, incluyendo archivos transmitidos desde disco
//! - Códigos de estado
//! - Extracción de partes `multipart/form-data`
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 20\r\n
//! \r\n
//! {"status":"queued"}
//! ```

pub mod multipart;
pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, Request};
pub use response::Response;
pub use status::StatusCode;
