//! # Manejo de Uploads
//! src/upload.rs
//!
//! Convierte un archivo `.zip` subido en un directorio local listo para
//! compilar: genera el id de la tarea, extrae el árbol y elige el documento
//! de entrada.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;
use zip::ZipArchive;

/// Longitud del id en caracteres hexadecimales
pub const TASK_ID_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Genera un id opaco: SHA-256 de un UUIDv4, truncado
pub fn generate_task_id() -> String {
    let digest = Sha256::digest(Uuid::new_v4().as_bytes());
    let mut id = format!("{:x}", digest);
    id.truncate(TASK_ID_LEN);
    id
}

/// Directorio de trabajo de una tarea
pub fn task_dir(root: &Path, id: &str) -> PathBuf {
    root.join(format!("{}_files", id))
}

/// Extrae el zip en `dest` y retorna la cantidad de entradas
///
/// Las rutas que escapan de `dest` se rechazan.
pub fn extract_archive(bytes: &[u8], dest: &Path) -> Result<usize, UploadError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let entries = archive.len();

    fs::create_dir_all(dest)?;
    archive.extract(dest)?;

    Ok(entries)
}

/// Primer archivo del nivel superior (orden por nombre) que coincide con `pattern`
pub fn find_entry_file(dir: &Path, pattern: &Regex) -> io::Result<Option<PathBuf>> {
    let mut candidates = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name();
        if pattern.is_match(&name.to_string_lossy()) {
            candidates.push(entry.path());
        }
    }

    candidates.sort();
    Ok(candidates.into_iter().next())
}
