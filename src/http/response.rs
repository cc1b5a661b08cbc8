//! # Construcción de Respuestas HTTP
//!
//! API para construir respuestas HTTP/1.0 y escribirlas al socket.
//!
//! El body puede estar en memoria (JSON) o ser un archivo en disco, que se
//! transmite con `io::copy` sin cargarlo completo. Una respuesta puede llevar
//! una acción `on_sent` que el servidor ejecuta sólo si la transferencia
//! completa terminó sin errores.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use latex_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "application/json")
//!     .with_body(r#"{"status": "queued"}"#);
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.0 200 OK\r\n"));
//! ```

use super::StatusCode;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Acción diferida hasta que el body se haya enviado completo
pub type SentHook = Box<dyn FnOnce() + Send + 'static>;

/// Contenido de la respuesta
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Bytes(Vec<u8>),
    File { path: PathBuf, len: u64 },
}

/// Representa una respuesta HTTP/1.0 completa
pub struct Response {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Body,
    on_sent: Option<SentHook>,
}

impl Response {
    /// Crea una respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Body::Bytes(Vec::new()),
            on_sent: None,
        }
    }

    /// Agrega un header (si ya existe, se sobrescribe)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de `with_header`
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el body desde un string y calcula `Content-Length`
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    /// Establece el body desde bytes
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.add_header("Content-Length", &body.len().to_string());
        self.body = Body::Bytes(body);
        self
    }

    /// Respuesta 200 que transmite un archivo del disco como adjunto
    ///
    /// Falla si el archivo no existe o no se puede leer su metadata.
    pub fn file(path: &Path, content_type: &str) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let mut response = Self::new(StatusCode::Ok)
            .with_header("Content-Type", content_type)
            .with_header("Content-Length", &metadata.len().to_string());

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            response.add_header(
                "Content-Disposition",
                &format!("attachment; filename=\"{}\"", name),
            );
        }

        response.body = Body::File {
            path: path.to_path_buf(),
            len: metadata.len(),
        };
        Ok(response)
    }

    /// Respuesta JSON exitosa (200 OK)
    pub fn json(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    /// Respuesta JSON desde un `serde_json::Value`
    pub fn json_value(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(&value.to_string())
    }

    /// Respuesta de error con formato `{"error": "mensaje"}`
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json_value(status, &serde_json::json!({ "error": message }))
    }

    /// Registra una acción a ejecutar tras enviar el body completo
    pub fn on_sent<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_sent = Some(Box::new(hook));
        self
    }

    /// Extrae la acción `on_sent`, si existe
    pub fn take_on_sent(&mut self) -> Option<SentHook> {
        self.on_sent.take()
    }

    /// Status line + headers + línea vacía
    fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.0 {}\r\n", self.status).into_bytes();

        for (name, value) in &self.headers {
            head.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        head.extend_from_slice(b"\r\n");
        head
    }

    /// Convierte la respuesta a bytes
    ///
    /// Para bodies de archivo sólo incluye la cabecera; usar `write_to`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = self.head_bytes();
        if let Body::Bytes(bytes) = &self.body {
            result.extend_from_slice(bytes);
        }
        result
    }

    /// Escribe la respuesta completa, transmitiendo archivos por bloques
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.head_bytes())?;

        match &self.body {
            Body::Bytes(bytes) => writer.write_all(bytes)?,
            Body::File { path, len } => {
                let mut file = File::open(path)?;
                let copied = io::copy(&mut file, writer)?;
                if copied != *len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("sent {} of {} bytes", copied, len),
                    ));
                }
            }
        }

        writer.flush()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[cfg(test)]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Body en memoria (vacío si es un archivo)
    pub fn body(&self) -> &[u8] {
        match &self.body {
            Body::Bytes(bytes) => bytes,
            Body::File { .. } => &[],
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("on_sent", &self.on_sent.is_some())
            .finish()
    }
}
