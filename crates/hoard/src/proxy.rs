//! # Proxy Server
//!
//! The request pipeline: resolve the URL path to a store location,
//! probe for a HIT, otherwise fetch the origin, persist the body, and
//! only then answer the client. Every response carries the `X-Cache`
//! header.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use percent_encoding::percent_decode_str;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::cache::{reader, writer, CacheHit, CacheLocation, CacheStatus, CACHE_STATUS_HEADER};
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::fetch::{FetchError, OriginClient};
use crate::flight::{self, Flight, PathFlights};

struct ProxyState {
    origin: OriginClient,
    store_root: std::path::PathBuf,
    flights: PathFlights,
    single_flight: bool,
}

/// The caching reverse proxy, ready to serve.
pub struct CacheProxy {
    router: Router,
}

impl CacheProxy {
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let origin = OriginClient::new(&config)?;
        let state = Arc::new(ProxyState {
            origin,
            store_root: config.cache_dir,
            flights: PathFlights::default(),
            single_flight: config.single_flight,
        });

        let router = Router::new()
            .route("/", get(handle_request))
            .route("/{*path}", get(handle_request))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        Ok(Self { router })
    }

    /// Run the proxy on an already-bound listener until shutdown.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ProxyError> {
        info!(addr = %listener.local_addr()?, "caching proxy running");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

async fn handle_request(State(state): State<Arc<ProxyState>>, uri: Uri) -> Response {
    let decoded = match percent_decode_str(uri.path()).decode_utf8() {
        Ok(path) => path.into_owned(),
        Err(e) => {
            warn!(path = uri.path(), error = %e, "request path is not valid UTF-8 after decoding");
            return error_response(StatusCode::BAD_REQUEST);
        }
    };

    let location = match CacheLocation::resolve(&state.store_root, &decoded) {
        Ok(location) => location,
        Err(e) => {
            warn!(path = %decoded, error = %e, "refusing request path");
            return error_response(StatusCode::BAD_REQUEST);
        }
    };

    // The origin sees exactly what the client sent, still encoded and
    // with the query string intact.
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    loop {
        if let Some(hit) = reader::lookup(&location).await {
            info!(path = %decoded, cache = %CacheStatus::Hit, "serving from store");
            return hit_response(hit);
        }

        if !state.single_flight {
            return fetch_and_store(&state, &location, path_and_query, &decoded).await;
        }

        match state.flights.join(location.key()) {
            Flight::Leader(_permit) => {
                // Permit held for the duration of the fetch; dropped on
                // return, waking any followers.
                return fetch_and_store(&state, &location, path_and_query, &decoded).await;
            }
            Flight::Follower(done) => {
                // A concurrent miss is already fetching this path;
                // wait for it and re-probe the store.
                flight::wait(done).await;
            }
        }
    }
}

async fn fetch_and_store(
    state: &ProxyState,
    location: &CacheLocation,
    path_and_query: &str,
    decoded: &str,
) -> Response {
    let upstream = match state.origin.fetch(path_and_query).await {
        Ok(response) => response,
        Err(FetchError::Status(status)) => {
            info!(path = %decoded, %status, "passing origin status through");
            return compose(status, None, CacheStatus::Miss, Body::empty());
        }
        Err(FetchError::Unreachable(e)) => {
            error!(path = %decoded, error = %e, "origin unreachable");
            return error_response(StatusCode::BAD_GATEWAY);
        }
        Err(FetchError::Other(e)) => {
            error!(path = %decoded, error = %e, "origin request failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();

    let content_type = match upstream_headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    {
        Some(ct) => ct.to_owned(),
        None => {
            error!(path = %decoded, "origin response has no Content-Type header");
            return error_response(StatusCode::BAD_GATEWAY);
        }
    };

    let body_stream = Box::pin(upstream.bytes_stream());
    let entry_path = match writer::store(location, &content_type, body_stream).await {
        Ok(path) => path,
        Err(e) => {
            error!(path = %decoded, error = %e, "failed to persist origin response");
            return error_response(match e {
                ProxyError::UnmappedContentType(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
    };

    // The client response is read back from the just-written entry,
    // so a response is only ever sent for a fully persisted body.
    let file = match tokio::fs::File::open(&entry_path).await {
        Ok(file) => file,
        Err(e) => {
            error!(entry = %entry_path.display(), error = %e, "failed to open freshly written entry");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    info!(path = %decoded, cache = %CacheStatus::Miss, entry = %entry_path.display(), "cached origin response");
    compose(
        status,
        Some(upstream_headers),
        CacheStatus::Miss,
        Body::from_stream(ReaderStream::new(file)),
    )
}

fn hit_response(hit: CacheHit) -> Response {
    let mut response = compose(
        StatusCode::OK,
        None,
        CacheStatus::Hit,
        Body::from_stream(ReaderStream::new(hit.file)),
    );
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(hit.content_type),
    );
    response
}

/// Merge upstream headers with the cache-status header. Upstream
/// headers pass through verbatim; only `X-Cache` is overwritten.
fn compose(
    status: StatusCode,
    upstream_headers: Option<HeaderMap>,
    cache_status: CacheStatus,
    body: Body,
) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    if let Some(headers) = upstream_headers {
        *response.headers_mut() = headers;
    }
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, cache_status.as_header_value());
    response
}

fn error_response(status: StatusCode) -> Response {
    compose(status, None, CacheStatus::Miss, Body::empty())
}
