//! Tests de integración para el servidor de compilación
//! tests/integration_test.rs
//!
//! Cada test levanta su propio servidor en un puerto efímero, con `sh` en
//! lugar de `latexmk` como compilador:
//! - documentos que contienen `FAIL` terminan con código 3
//! - documentos que contienen `SLOW` tardan un segundo
//! - el resto produce `<documento>.pdf` junto al `.tex`

#![cfg(unix)]

use latex_server::config::Config;
use latex_server::server::Server;
use serde_json::Value;
use std::io::{Cursor, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const FAKE_COMPILER: &str =
    "grep -q FAIL \"$1\" && exit 3; grep -q SLOW \"$1\" && sleep 1; echo fake-pdf > \"${1%.*}.pdf\"";

/// Levanta un servidor en background y retorna su dirección
fn start_server(uploads: &Path) -> SocketAddr {
    let config = Config {
        port: 0,
        uploads_dir: uploads.to_path_buf(),
        compiler: "sh".to_string(),
        compiler_args: vec!["-c".to_string(), FAKE_COMPILER.to_string(), "sh".to_string()],
        output_dir_flag: String::new(),
        compile_timeout_ms: 10_000,
        ..Config::default()
    };

    let mut server = Server::new(config).expect("server");
    let addr = server.bind().expect("bind");
    thread::spawn(move || server.run());
    addr
}

fn zip_with(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Envía bytes crudos y retorna (status, headers, body)
fn send(addr: SocketAddr, raw: &[u8]) -> (u16, String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    stream.write_all(raw).unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();

    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header end");
    let head = String::from_utf8_lossy(&response[..split]).to_string();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("status code");

    (status, head, response[split + 4..].to_vec())
}

fn get(addr: SocketAddr, path: &str) -> (u16, String, Vec<u8>) {
    send(addr, format!("GET {} HTTP/1.0\r\n\r\n", path).as_bytes())
}

fn post(addr: SocketAddr, path: &str) -> (u16, Value) {
    let (status, _, body) = send(addr, format!("POST {} HTTP/1.0\r\n\r\n", path).as_bytes());
    (status, serde_json::from_slice(&body).unwrap())
}

/// POST /upload con el `.zip` en el campo `file` de un multipart
fn upload(addr: SocketAddr, archive: &[u8]) -> (u16, Value) {
    let boundary = "----latexboundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"project.zip\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/zip\r\n\r\n");
    body.extend_from_slice(archive);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let mut raw = format!(
        "POST /upload HTTP/1.0\r\nContent-Type: multipart/form-data; boundary={}\r\nContent-Length: {}\r\n\r\n",
        boundary,
        body.len()
    )
    .into_bytes();
    raw.extend_from_slice(&body);

    let (status, _, body) = send(addr, &raw);
    (status, serde_json::from_slice(&body).unwrap())
}

fn status_of(addr: SocketAddr, id: &str) -> (u16, Value) {
    let (status, _, body) = get(addr, &format!("/status/{}", id));
    (status, serde_json::from_slice(&body).unwrap())
}

fn queue_of(addr: SocketAddr) -> Vec<Value> {
    let (status, _, body) = get(addr, "/queue");
    assert_eq!(status, 200);
    let json: Value = serde_json::from_slice(&body).unwrap();
    json["queue"].as_array().cloned().unwrap_or_default()
}

/// Espera hasta que el ID deje la cola
fn wait_dequeued(addr: SocketAddr, id: &str) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while queue_of(addr).iter().any(|entry| entry["id"] == id) {
        assert!(Instant::now() < deadline, "task {} never left the queue", id);
        thread::sleep(Duration::from_millis(20));
    }
}

// ==================== Flujo completo ====================

#[test]
fn test_upload_compile_download() {
    let uploads = tempfile::tempdir().unwrap();
    let addr = start_server(uploads.path());

    let (status, json) = upload(addr, &zip_with(&[("paper.tex", "\\documentclass{article}")]));
    assert_eq!(status, 200);
    assert_eq!(json["status"], "queued");
    assert_eq!(json["message"], "File uploaded and queued for compilation.");
    let id = json["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 32);

    wait_dequeued(addr, &id);
    let (status, json) = status_of(addr, &id);
    assert_eq!(status, 200);
    assert_eq!(json["status"], "completed");

    let (status, head, body) = get(addr, &format!("/download/{}", id));
    assert_eq!(status, 200);
    assert!(head.contains("application/pdf"));
    assert_eq!(body, b"fake-pdf\n");

    // La descarga consume la tarea y sus archivos
    let (status, _, _) = get(addr, &format!("/download/{}", id));
    assert_eq!(status, 404);
    let (status, json) = status_of(addr, &id);
    assert_eq!(status, 404);
    assert_eq!(json["error"], "Task not found.");
    assert!(!uploads.path().join(format!("{}_files", id)).exists());
}

#[test]
fn test_failed_compile_is_reclaimed_on_status() {
    let uploads = tempfile::tempdir().unwrap();
    let addr = start_server(uploads.path());

    let (_, json) = upload(addr, &zip_with(&[("broken.tex", "FAIL")]));
    let id = json["id"].as_str().unwrap().to_string();
    wait_dequeued(addr, &id);

    let (status, json) = status_of(addr, &id);
    assert_eq!(status, 200);
    assert_eq!(json["status"], "failed");
    assert!(!uploads.path().join(format!("{}_files", id)).exists());

    let (status, _) = status_of(addr, &id);
    assert_eq!(status, 404);
}

// ==================== Rechazos ====================

#[test]
fn test_upload_without_tex_is_rejected() {
    let uploads = tempfile::tempdir().unwrap();
    let addr = start_server(uploads.path());

    let (status, json) = upload(addr, &zip_with(&[("notes.txt", "hello")]));
    assert_eq!(status, 400);
    assert!(json["error"].is_string());
    assert!(queue_of(addr).is_empty());
    assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
}

#[test]
fn test_upload_without_file_field() {
    let uploads = tempfile::tempdir().unwrap();
    let addr = start_server(uploads.path());

    let (status, json) = post(addr, "/upload");
    assert_eq!(status, 400);
    assert_eq!(json["error"], "No file uploaded.");
}

#[test]
fn test_download_before_completion() {
    let uploads = tempfile::tempdir().unwrap();
    let addr = start_server(uploads.path());

    let (_, json) = upload(addr, &zip_with(&[("slow.tex", "SLOW")]));
    let id = json["id"].as_str().unwrap().to_string();

    let (status, _, body) = get(addr, &format!("/download/{}", id));
    assert_eq!(status, 404);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "PDF file not available.");

    let (status, _, _) = get(addr, "/download/does-not-exist");
    assert_eq!(status, 404);
}

// ==================== Cola ====================

#[test]
fn test_queue_is_fifo_and_single_flight() {
    let uploads = tempfile::tempdir().unwrap();
    let addr = start_server(uploads.path());

    let (_, first) = upload(addr, &zip_with(&[("a.tex", "SLOW")]));
    let (_, second) = upload(addr, &zip_with(&[("b.tex", "plain")]));
    let first = first["id"].as_str().unwrap().to_string();
    let second = second["id"].as_str().unwrap().to_string();

    // El worker toma la cabeza apenas llega; esperar a verla compilando
    let deadline = Instant::now() + Duration::from_secs(5);
    let queue = loop {
        let queue = queue_of(addr);
        if queue.first().map(|head| head["status"] == "compiling") == Some(true) {
            break queue;
        }
        assert!(Instant::now() < deadline, "head never started compiling");
        thread::sleep(Duration::from_millis(10));
    };

    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0]["id"], first.as_str());
    assert_eq!(queue[0]["status"], "compiling");
    assert_eq!(queue[1]["id"], second.as_str());
    assert_eq!(queue[1]["status"], "queued");

    wait_dequeued(addr, &second);
    assert_eq!(status_of(addr, &first).1["status"], "completed");
    assert_eq!(status_of(addr, &second).1["status"], "completed");
}

#[test]
fn test_bulk_cleanup() {
    let uploads = tempfile::tempdir().unwrap();
    let addr = start_server(uploads.path());

    let (_, json) = upload(addr, &zip_with(&[("done.tex", "ok")]));
    let id = json["id"].as_str().unwrap().to_string();
    wait_dequeued(addr, &id);

    let (status, json) = post(addr, "/cleanup");
    assert_eq!(status, 200);
    assert_eq!(json["message"], "All tasks and uploads have been cleaned up.");
    assert_eq!(json["completed"], 1);

    assert!(queue_of(addr).is_empty());
    assert_eq!(status_of(addr, &id).0, 404);
    assert!(uploads.path().exists());
    assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
}

#[test]
fn test_unknown_route_and_method() {
    let uploads = tempfile::tempdir().unwrap();
    let addr = start_server(uploads.path());

    assert_eq!(get(addr, "/nope").0, 404);
    assert_eq!(get(addr, "/upload").0, 405);
}
