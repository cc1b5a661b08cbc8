//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servicio de compilación con soporte para argumentos CLI
//! y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./latex_server --port 3000 \
//!   --uploads-dir /var/lib/latex/uploads \
//!   --compiler latexmk \
//!   --compiler-arg -pdf --compiler-arg -xelatex \
//!   --compile-timeout-ms 120000
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=3000 COMPILER_ARGS="-pdf -lualatex" ./latex_server
//! ```

use clap::Parser;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Compiler program must not be empty")]
    EmptyCompiler,

    #[error("Invalid entry pattern `{pattern}`: {reason}")]
    InvalidEntryPattern { pattern: String, reason: String },

    #[error("Artifact extension must be a bare extension like `pdf`, got `{0}`")]
    InvalidArtifactExt(String),

    #[error("Max upload size must be > 0")]
    InvalidUploadLimit,

    #[error("Invalid log level `{0}`")]
    InvalidLogLevel(String),
}

/// Configuración del servidor de compilación
#[derive(Debug, Clone, Parser)]
#[command(name = "latex_server")]
#[command(about = "Servidor HTTP/1.0 que compila proyectos LaTeX subidos como .zip")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "3000", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio donde se extraen los uploads
    #[arg(long = "uploads-dir", default_value = "./uploads", env = "UPLOADS_DIR")]
    pub uploads_dir: PathBuf,

    // === Compilador ===

    /// Programa que compila el documento
    #[arg(long, default_value = "latexmk", env = "COMPILER")]
    pub compiler: String,

    /// Argumentos del compilador, antes del directorio de salida y el documento
    #[arg(
        long = "compiler-arg",
        env = "COMPILER_ARGS",
        value_delimiter = ' ',
        allow_hyphen_values = true,
        default_values_t = ["-pdf".to_string(), "-xelatex".to_string()]
    )]
    pub compiler_args: Vec<String>,

    /// Flag del directorio de salida (vacío = no se pasa)
    #[arg(
        long = "output-dir-flag",
        default_value = "-output-directory",
        env = "OUTPUT_DIR_FLAG",
        allow_hyphen_values = true
    )]
    pub output_dir_flag: String,

    /// Regex sobre el nombre del documento de entrada
    #[arg(long = "entry-pattern", default_value = r"(?i)\.tex$", env = "ENTRY_PATTERN")]
    pub entry_pattern: String,

    /// Extensión del artefacto que produce el compilador
    #[arg(long = "artifact-ext", default_value = "pdf", env = "ARTIFACT_EXT")]
    pub artifact_ext: String,

    /// Timeout de compilación en milisegundos (0 = sin límite)
    #[arg(long = "compile-timeout-ms", default_value = "0", env = "COMPILE_TIMEOUT_MS")]
    pub compile_timeout_ms: u64,

    // === Límites ===

    /// Tamaño máximo del body de un request en bytes
    #[arg(long = "max-upload-bytes", default_value = "52428800", env = "MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // === Logging ===

    /// Nivel de log (`RUST_LOG` tiene prioridad)
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use latex_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:3000");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `None` si no hay timeout configurado
    pub fn compile_timeout(&self) -> Option<Duration> {
        match self.compile_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compiler.trim().is_empty() {
            return Err(ConfigError::EmptyCompiler);
        }

        if let Err(e) = Regex::new(&self.entry_pattern) {
            return Err(ConfigError::InvalidEntryPattern {
                pattern: self.entry_pattern.clone(),
                reason: e.to_string(),
            });
        }

        let ext = &self.artifact_ext;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(ConfigError::InvalidArtifactExt(ext.clone()));
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidUploadLimit);
        }

        if EnvFilter::try_new(&self.log_level).is_err() {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }

        Ok(())
    }

    /// Registra un resumen de la configuración
    pub fn print_summary(&self) {
        let timeout = match self.compile_timeout() {
            Some(t) => format!("{} ms", t.as_millis()),
            None => "none".to_string(),
        };

        info!(address = %self.address(), uploads_dir = %self.uploads_dir.display(), "Network");
        info!(
            compiler = %self.compiler,
            args = %self.compiler_args.join(" "),
            output_dir_flag = %self.output_dir_flag,
            timeout = %timeout,
            "Compiler"
        );
        info!(
            entry_pattern = %self.entry_pattern,
            artifact_ext = %self.artifact_ext,
            max_upload_mib = self.max_upload_bytes as f64 / (1024.0 * 1024.0),
            "Uploads"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            uploads_dir: PathBuf::from("./uploads"),
            compiler: "latexmk".to_string(),
            compiler_args: vec!["-pdf".to_string(), "-xelatex".to_string()],
            output_dir_flag: "-output-directory".to_string(),
            entry_pattern: r"(?i)\.tex$".to_string(),
            artifact_ext: "pdf".to_string(),
            compile_timeout_ms: 0,
            max_upload_bytes: 50 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}
