//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a handlers. Los patrones pueden tener segmentos
//! variables, por ejemplo `/status/{id}`.
//!
//! ```text
//! Request → Router → Handler(&Request, &PathParams, &S) → Response
//! ```
//!
//! - Path sin ruta registrada → 404 Not Found
//! - Path registrado con otro método → 405 Method Not Allowed
//! - `OPTIONS` sobre un path registrado → 204 (preflight CORS)

use crate::http::{Method, Request, Response, StatusCode};
use std::collections::HashMap;

/// Un handler recibe el request, los parámetros del path y el estado compartido
pub type Handler<S> = fn(&Request, &PathParams, &S) -> Response;

/// Segmentos variables capturados del path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|s| s.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct Route<S> {
    method: Method,
    segments: Vec<Segment>,
    handler: Handler<S>,
}

impl<S> Route<S> {
    fn matches(&self, path: &str) -> Option<PathParams> {
        let parts = split_path(path);
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(PathParams(params))
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Router que mapea rutas a handlers sobre un estado compartido `S`
pub struct Router<S> {
    routes: Vec<Route<S>>,
}

impl<S> Router<S> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta
    ///
    /// # Ejemplo
    /// ```
    /// use latex_server::router::{PathParams, Router};
    /// use latex_server::http::{Method, Request, Response};
    ///
    /// fn hello(_req: &Request, params: &PathParams, _state: &()) -> Response {
    ///     Response::json(&format!(r#"{{"name": "{}"}}"#, params.get("name").unwrap_or("")))
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello/{name}", hello);
    ///
    /// let request = Request::parse(b"GET /hello/ana HTTP/1.0\r\n\r\n").unwrap();
    /// let response = router.route(&request, &());
    /// assert_eq!(response.body(), br#"{"name": "ana"}"#);
    /// ```
    pub fn register(&mut self, method: Method, pattern: &str, handler: Handler<S>) {
        let segments = split_path(pattern)
            .into_iter()
            .map(|segment| {
                match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(name) => Segment::Param(name.to_string()),
                    None => Segment::Literal(segment.to_string()),
                }
            })
            .collect();

        self.routes.push(Route {
            method,
            segments,
            handler,
        });
    }

    /// Encuentra y ejecuta el handler apropiado para un request
    pub fn route(&self, request: &Request, state: &S) -> Response {
        let path = request.path();
        let mut path_known = false;

        for route in &self.routes {
            let Some(params) = route.matches(path) else {
                continue;
            };
            path_known = true;

            if route.method == request.method() {
                let mut response = (route.handler)(request, &params, state);
                self.add_common_headers(&mut response);
                return response;
            }
        }

        let mut response = if path_known && request.method() == Method::OPTIONS {
            Response::new(StatusCode::NoContent)
                .with_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
                .with_header("Access-Control-Allow-Headers", "Content-Type")
        } else if path_known {
            Response::error(
                StatusCode::MethodNotAllowed,
                &format!("Method {} not allowed on {}", request.method().as_str(), path),
            )
        } else {
            Response::error(StatusCode::NotFound, &format!("Route not found: {}", path))
        };

        self.add_common_headers(&mut response);
        response
    }

    /// Headers comunes a todas las respuestas
    fn add_common_headers(&self, response: &mut Response) {
        response.add_header("Server", "latex_server/0.1");
        response.add_header("Connection", "close");
        response.add_header("Access-Control-Allow-Origin", "*");
    }
}

impl<S> Default for Router<S> {
    fn default() -> Self {
        Self::new()
    }
}
