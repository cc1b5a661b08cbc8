//! # Parsing de multipart/form-data
//! src/http/multipart.rs
//!
//! Extrae las partes de un body `multipart/form-data` ya leído en memoria.
//! Sólo se usa para el campo del archivo subido en `/upload`.
//!
//! ```text
//! --BOUNDARY\r\n
//! Content-Disposition: form-data; name="file"; filename="doc.zip"\r\n
//! Content-Type: application/zip\r\n
//! \r\n
//! <bytes>\r\n
//! --BOUNDARY--\r\n
//! ```

use super::Request;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultipartError {
    #[error("Request is not multipart/form-data")]
    NotMultipart,

    #[error("Missing multipart boundary")]
    MissingBoundary,

    #[error("Malformed multipart body: {0}")]
    Malformed(&'static str),
}

/// Una parte del formulario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// `name="value"` o `name=value` dentro de un header
fn param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b([a-z*-]+)\s*=\s*(?:"([^"]*)"|([^;\s]+))"#)
            .expect("static multipart parameter regex")
    })
}

/// Obtiene un parámetro de un header (ej: `boundary` de `Content-Type`)
fn header_param(header: &str, key: &str) -> Option<String> {
    param_regex().captures_iter(header).find_map(|caps| {
        let name = caps.get(1)?.as_str();
        if !name.eq_ignore_ascii_case(key) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .map(|value| value.as_str().to_string())
    })
}

/// Busca `needle` en `haystack` a partir de `from`
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Extrae el boundary del header `Content-Type`
pub fn boundary(content_type: &str) -> Result<String, MultipartError> {
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return Err(MultipartError::NotMultipart);
    }

    header_param(content_type, "boundary")
        .filter(|b| !b.is_empty())
        .ok_or(MultipartError::MissingBoundary)
}

/// Separa el body en sus partes
pub fn parse(body: &[u8], boundary: &str) -> Result<Vec<Part>, MultipartError> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let separator = format!("\r\n--{}", boundary).into_bytes();

    let mut cursor = find(body, &delimiter, 0)
        .ok_or(MultipartError::Malformed("opening boundary not found"))?
        + delimiter.len();

    let mut parts = Vec::new();

    loop {
        // `--BOUNDARY--` cierra el formulario
        if body[cursor..].starts_with(b"--") {
            break;
        }
        if !body[cursor..].starts_with(b"\r\n") {
            return Err(MultipartError::Malformed("boundary not followed by CRLF"));
        }
        cursor += 2;

        let headers_end = find(body, b"\r\n\r\n", cursor)
            .ok_or(MultipartError::Malformed("part headers not terminated"))?;
        let headers = String::from_utf8_lossy(&body[cursor..headers_end]);

        let data_start = headers_end + 4;
        let data_end = find(body, &separator, data_start)
            .ok_or(MultipartError::Malformed("closing boundary not found"))?;

        let mut part = Part {
            name: None,
            filename: None,
            content_type: None,
            data: body[data_start..data_end].to_vec(),
        };

        for line in headers.split("\r\n") {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name.eq_ignore_ascii_case("Content-Disposition") {
                part.name = header_param(value, "name");
                part.filename = header_param(value, "filename");
            } else if name.eq_ignore_ascii_case("Content-Type") {
                part.content_type = Some(value.trim().to_string());
            }
        }

        parts.push(part);
        cursor = data_end + separator.len();
    }

    Ok(parts)
}

/// Busca la parte con nombre `field` en un request multipart
pub fn find_part(request: &Request, field: &str) -> Result<Option<Part>, MultipartError> {
    let content_type = request
        .header("Content-Type")
        .ok_or(MultipartError::NotMultipart)?;
    let boundary = boundary(content_type)?;

    Ok(parse(request.body(), &boundary)?
        .into_iter()
        .find(|part| part.name.as_deref() == Some(field)))
}
