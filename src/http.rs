//! HTTP read path
//!
//! Serves stored files on every registered public host:
//!
//! - `GET /{category}/{filename}` - file bytes with cache headers
//! - `HEAD /{category}/{filename}` - headers only
//! - `OPTIONS /{category}/{filename}` - CORS preflight
//!
//! The Host header picks the domain; the first path segment picks the
//! category. Success responses carry an ETag (truncated SHA-256 of the
//! content), a year-long immutable Cache-Control, and echo the request
//! Origin. Everything that fails - unknown host, malformed path,
//! missing file, unsupported method, disk fault - collapses into one
//! uniform 404 with a short negative-cache header.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::file_store::{generate_etag, FileStore};
use crate::registry::Registry;

/// HTTP server state
pub struct HttpServer {
    registry: Arc<Registry>,
    file_store: Arc<FileStore>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(registry: Arc<Registry>, file_store: Arc<FileStore>, bind_addr: SocketAddr) -> Self {
        Self {
            registry,
            file_store,
            bind_addr,
        }
    }

    /// Run the accept loop, one task per connection.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    /// Resolve and answer one request. Every internal failure becomes
    /// the uniform 404; the error type only satisfies the service
    /// signature.
    async fn handle_request<B>(
        &self,
        req: Request<B>,
    ) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        let host = host.strip_prefix("http://").unwrap_or(host);
        let host = host.strip_prefix("https://").unwrap_or(host);

        debug!(method = %req.method(), path = %req.uri().path(), host = %host, "Incoming request");

        let Some((domain, _)) = self.registry.domain_by_host(host).await else {
            return Ok(not_found());
        };

        let path = req.uri().path();
        let path = path.strip_prefix('/').unwrap_or(path);
        let Some((category, filename)) = path.split_once('/') else {
            return Ok(not_found());
        };

        if req.method() == Method::OPTIONS {
            return Ok(preflight());
        }

        // Writes never happen through this path; anything but GET or
        // HEAD is answered 404, not 405.
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Ok(not_found());
        }

        let (data, content_type) = match self.file_store.get(&domain, category, filename).await {
            Ok(Some(found)) => found,
            Ok(None) => return Ok(not_found()),
            Err(e) => {
                debug!(domain = %domain, category = %category, error = %e, "File lookup failed");
                return Ok(not_found());
            }
        };

        let etag = generate_etag(&data);
        let if_none_match = req
            .headers()
            .get(header::IF_NONE_MATCH)
            .and_then(|value| value.to_str().ok());
        if if_none_match == Some(etag.as_str()) {
            return Ok(Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .body(Full::new(Bytes::new()))
                .unwrap());
        }

        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::ETAG, etag)
            .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
            .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");

        if let Some(origin) = req.headers().get(header::ORIGIN) {
            if !origin.is_empty() {
                builder = builder.header(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            }
        }

        let body = if req.method() == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(data)
        };
        Ok(builder.body(Full::new(body)).unwrap())
    }
}

/// Uniform negative response, cached briefly so a later upload becomes
/// visible.
fn not_found() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "public, max-age=60")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Full::new(Bytes::from("404 page not found\n")))
        .unwrap()
}

fn preflight() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET, HEAD, OPTIONS")
        .header(header::ACCESS_CONTROL_MAX_AGE, "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    const HOST: &str = "cdn.example.com";

    async fn server_with_file(temp_dir: &TempDir, data: &[u8]) -> (Arc<HttpServer>, String) {
        let registry = Arc::new(Registry::new());
        registry.add_domain("main", "Main CDN", HOST).await.unwrap();

        let file_store = Arc::new(FileStore::new(temp_dir.path()).await.unwrap());
        let stored = file_store
            .store("main", "docs", data, "text/plain", ".txt")
            .await
            .unwrap();

        let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
        let server = Arc::new(HttpServer::new(registry, file_store, addr));
        (server, format!("/docs/{}", stored.filename))
    }

    fn request(method: Method, path: &str, host: &str) -> Request<()> {
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, host)
            .body(())
            .unwrap()
    }

    async fn body_bytes(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    fn header_str<'a>(response: &'a Response<Full<Bytes>>, name: header::HeaderName) -> &'a str {
        response
            .headers()
            .get(name)
            .map(|value| value.to_str().unwrap())
            .unwrap_or("")
    }

    #[tokio::test]
    async fn test_serves_stored_file() {
        let temp_dir = TempDir::new().unwrap();
        let (server, path) = server_with_file(&temp_dir, b"file body").await;

        let response = server
            .handle_request(request(Method::GET, &path, HOST))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "text/plain");
        assert_eq!(
            header_str(&response, header::CACHE_CONTROL),
            "public, max-age=31536000, immutable"
        );
        assert_eq!(header_str(&response, header::X_CONTENT_TYPE_OPTIONS), "nosniff");
        assert_eq!(header_str(&response, header::ETAG), generate_etag(b"file body"));
        assert_eq!(body_bytes(response).await.as_ref(), b"file body");
    }

    #[tokio::test]
    async fn test_matching_etag_yields_304() {
        let temp_dir = TempDir::new().unwrap();
        let (server, path) = server_with_file(&temp_dir, b"cached body").await;
        let etag = generate_etag(b"cached body");

        let mut req = request(Method::GET, &path, HOST);
        req.headers_mut()
            .insert(header::IF_NONE_MATCH, etag.parse().unwrap());
        let response = server.handle_request(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(body_bytes(response).await.is_empty());

        // A stale validator gets the full body again.
        let mut req = request(Method::GET, &path, HOST);
        req.headers_mut()
            .insert(header::IF_NONE_MATCH, "\"0011223344556677\"".parse().unwrap());
        let response = server.handle_request(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.as_ref(), b"cached body");
    }

    #[tokio::test]
    async fn test_head_carries_headers_without_body() {
        let temp_dir = TempDir::new().unwrap();
        let (server, path) = server_with_file(&temp_dir, b"head test").await;

        let response = server
            .handle_request(request(Method::HEAD, &path, HOST))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::ETAG), generate_etag(b"head test"));
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_host_is_404_with_short_cache() {
        let temp_dir = TempDir::new().unwrap();
        let (server, path) = server_with_file(&temp_dir, b"x").await;

        let response = server
            .handle_request(request(Method::GET, &path, "other.example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(header_str(&response, header::CACHE_CONTROL), "public, max-age=60");
    }

    #[tokio::test]
    async fn test_host_protocol_prefix_is_stripped() {
        let temp_dir = TempDir::new().unwrap();
        let (server, path) = server_with_file(&temp_dir, b"x").await;

        let response = server
            .handle_request(request(Method::GET, &path, &format!("https://{HOST}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_single_segment_path_is_404() {
        let temp_dir = TempDir::new().unwrap();
        let (server, _) = server_with_file(&temp_dir, b"x").await;

        let response = server
            .handle_request(request(Method::GET, "/onlyonesegment", HOST))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_file_is_404_with_short_cache() {
        let temp_dir = TempDir::new().unwrap();
        let (server, _) = server_with_file(&temp_dir, b"x").await;

        let response = server
            .handle_request(request(Method::GET, "/docs/no-such-file.txt", HOST))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(header_str(&response, header::CACHE_CONTROL), "public, max-age=60");
        assert_eq!(body_bytes(response).await.as_ref(), b"404 page not found\n");
    }

    #[tokio::test]
    async fn test_post_is_404_not_405() {
        let temp_dir = TempDir::new().unwrap();
        let (server, path) = server_with_file(&temp_dir, b"x").await;

        let response = server
            .handle_request(request(Method::POST, &path, HOST))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let temp_dir = TempDir::new().unwrap();
        let (server, path) = server_with_file(&temp_dir, b"x").await;

        let response = server
            .handle_request(request(Method::OPTIONS, &path, HOST))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_METHODS),
            "GET, HEAD, OPTIONS"
        );
        assert_eq!(header_str(&response, header::ACCESS_CONTROL_MAX_AGE), "86400");
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_origin_echoed_only_when_present() {
        let temp_dir = TempDir::new().unwrap();
        let (server, path) = server_with_file(&temp_dir, b"x").await;

        let mut req = request(Method::GET, &path, HOST);
        req.headers_mut()
            .insert(header::ORIGIN, "https://app.example.com".parse().unwrap());
        let response = server.handle_request(req).await.unwrap();
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
            "https://app.example.com"
        );

        let response = server
            .handle_request(request(Method::GET, &path, HOST))
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_traversal_attempts_collapse_to_404() {
        let temp_dir = TempDir::new().unwrap();
        let (server, _) = server_with_file(&temp_dir, b"x").await;

        for path in [
            "/docs/../../../etc/passwd",
            "/../docs/file.txt",
            "/docs/..",
            "/docs/nested/file.txt",
        ] {
            let response = server
                .handle_request(request(Method::GET, path, HOST))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {path}");
        }
    }
}
