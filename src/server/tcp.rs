//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Servidor TCP que atiende cada conexión en su propio thread. Las
//! compilaciones corren aparte, en el único worker del `TaskManager`, así que
//! consultar estado o la cola nunca espera a un compilador.

use crate::config::Config;
use crate::http::request::find_header_end;
use crate::http::{Method, Request, Response, StatusCode};
use crate::router::Router;
use crate::tasks::handlers;
use crate::tasks::{TaskManager, TaskManagerConfig};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Límite para la cabecera de un request
const MAX_HEADER_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 8192;

/// Resultado de leer un request del socket
#[derive(Debug, PartialEq, Eq)]
enum Incoming {
    /// El peer cerró sin mandar nada
    Closed,
    Complete(Vec<u8>),
    /// `Content-Length` supera el máximo
    TooLarge,
    /// Cabecera sin terminar dentro del límite
    HeaderTooLarge,
}

/// `Content-Length` de una cabecera cruda (0 si falta o es inválido)
fn declared_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Lee cabecera + body completo según `Content-Length`
fn read_request<R: Read>(stream: &mut R, max_body: usize) -> io::Result<Incoming> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    let header_end = loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(if buffer.is_empty() {
                Incoming::Closed
            } else {
                Incoming::Complete(buffer)
            });
        }
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(end) = find_header_end(&buffer) {
            break end;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return Ok(Incoming::HeaderTooLarge);
        }
    };

    let body_len = declared_length(&buffer[..header_end]);
    if body_len > max_body {
        return Ok(Incoming::TooLarge);
    }

    let total = header_end + 4 + body_len;
    while buffer.len() < total {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    buffer.truncate(total);

    Ok(Incoming::Complete(buffer))
}

/// Escribe la respuesta y, sólo si salió completa, corre su `on_sent`
fn send<W: Write>(response: &mut Response, writer: &mut W) -> io::Result<()> {
    let on_sent = response.take_on_sent();

    response.write_to(writer)?;

    if let Some(hook) = on_sent {
        hook();
    }
    Ok(())
}

/// Servidor HTTP/1.0 del servicio de compilación
pub struct Server {
    config: Config,
    router: Arc<Router<TaskManager>>,
    manager: Arc<TaskManager>,
    listener: Option<TcpListener>,
}

impl Server {
    /// Crea el servidor y arranca el worker de compilación
    pub fn new(config: Config) -> io::Result<Self> {
        let manager = TaskManager::new(TaskManagerConfig::from_config(&config))?;
        Ok(Self::with_manager(config, manager))
    }

    /// Crea el servidor sobre un manager ya construido
    pub fn with_manager(config: Config, manager: TaskManager) -> Self {
        Self {
            config,
            router: Arc::new(Self::build_router()),
            manager: Arc::new(manager),
            listener: None,
        }
    }

    /// Rutas del servicio
    pub fn build_router() -> Router<TaskManager> {
        let mut router = Router::new();

        router.register(Method::GET, "/queue", handlers::queue_handler);
        router.register(Method::POST, "/upload", handlers::upload_handler);
        router.register(Method::GET, "/status/{id}", handlers::status_handler);
        router.register(Method::GET, "/download/{id}", handlers::download_handler);
        router.register(Method::POST, "/cleanup", handlers::cleanup_handler);

        router
    }

    /// Abre el socket; con puerto 0 el sistema elige uno libre
    pub fn bind(&mut self) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.address())?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);

        info!(%addr, "Listening");
        Ok(addr)
    }

    /// Acepta conexiones indefinidamente, un thread por conexión
    pub fn run(&mut self) -> io::Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let Some(listener) = self.listener.as_ref() else {
            return Err(io::Error::other("listener not bound"));
        };

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);
                    let manager = Arc::clone(&self.manager);
                    let max_upload_bytes = self.config.max_upload_bytes;

                    thread::spawn(move || {
                        if let Err(e) = Self::handle_connection_static(
                            stream,
                            router,
                            manager,
                            max_upload_bytes,
                        ) {
                            warn!(error = %e, "Connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }

        Ok(())
    }

    /// Atiende una conexión completa: leer, rutear, responder
    ///
    /// La acción `on_sent` de la respuesta corre sólo si se escribió entera.
    pub fn handle_connection_static(
        mut stream: TcpStream,
        router: Arc<Router<TaskManager>>,
        manager: Arc<TaskManager>,
        max_upload_bytes: usize,
    ) -> io::Result<()> {
        let start = Instant::now();
        let request_id = Uuid::new_v4().simple().to_string();

        let span = info_span!("request", id = %&request_id[..8]);
        let _entered = span.enter();

        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let mut response = match read_request(&mut stream, max_upload_bytes)? {
            Incoming::Closed => {
                debug!(%peer, "Connection closed without data");
                return Ok(());
            }
            Incoming::TooLarge => {
                warn!(%peer, max_upload_bytes, "Request body too large");
                Response::error(
                    StatusCode::PayloadTooLarge,
                    "Upload exceeds the maximum allowed size.",
                )
            }
            Incoming::HeaderTooLarge => {
                warn!(%peer, "Request header too large");
                Response::error(StatusCode::BadRequest, "Invalid: header too large")
            }
            Incoming::Complete(bytes) => match Request::parse(&bytes) {
                Ok(request) => {
                    info!(%peer, method = request.method().as_str(), path = request.path(), "Request");
                    router.route(&request, &manager)
                }
                Err(e) => {
                    warn!(%peer, error = %e, "Parse error");
                    Response::error(StatusCode::BadRequest, &format!("Invalid: {}", e))
                }
            },
        };

        response.add_header("X-Request-Id", &request_id);
        send(&mut response, &mut stream)?;

        let status = response.status();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        if status.is_server_error() {
            warn!(status = status.as_u16(), elapsed_ms, "Response sent");
        } else if status.is_client_error() {
            info!(status = status.as_u16(), elapsed_ms, rejected = true, "Response sent");
        } else {
            info!(status = status.as_u16(), elapsed_ms, "Response sent");
        }
        Ok(())
    }
}
