//! axum adapter for [`RequestGate`](lorekeep_core::RequestGate).
//!
//! Every request is classified by path, keyed by client, and admitted or
//! rejected before the handler runs. Gate headers are attached to the
//! response either way.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lorekeep_core::{ClientIdentity, GateHeaders, GateRejection};
use lorekeep_domain::RouteClass;
use tracing::warn;

use crate::context::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";
const CLIENT_ID: &str = "x-client-id";

/// Gate middleware; install with `axum::middleware::from_fn_with_state`.
pub async fn request_gate(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let route = RouteClass::for_path(request.uri().path());
    let identity = client_identity(&request);
    let operation = format!("{} {}", request.method(), request.uri().path());

    let mut gate_headers = GateHeaders::new();
    let admission = match state.gate.admit(&identity, route, &mut gate_headers) {
        Ok(admission) => admission,
        Err(rejection) => {
            let mut response = rejection_response(rejection);
            apply_headers(response.headers_mut(), &gate_headers);
            return response;
        }
    };

    // Dropped with this future if the client goes away mid-handler.
    let pending = state.gate.track(admission, operation);
    let mut response = next.run(request).await;

    let status = response.status();
    // Stubbed procedures answer 501; that is not a store failure.
    let success = !status.is_server_error() || status == StatusCode::NOT_IMPLEMENTED;
    let error_text = (!success).then(|| format!("HTTP {}", status.as_u16()));
    pending.finish(success, error_text);

    apply_headers(response.headers_mut(), &gate_headers);
    response
}

/// What the transport knows about the caller.
///
/// The leftmost `X-Forwarded-For` entry wins over the socket address.
pub fn client_identity(request: &Request<Body>) -> ClientIdentity {
    let headers = request.headers();
    let forwarded = header_str(headers, FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    let address = forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    });

    ClientIdentity {
        address,
        user_agent: header_str(headers, USER_AGENT.as_str()).map(str::to_string),
        client_id: header_str(headers, CLIENT_ID).map(str::to_string),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn rejection_response(rejection: GateRejection) -> Response {
    let status =
        StatusCode::from_u16(rejection.status_code()).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
    (status, Json(rejection)).into_response()
}

fn apply_headers(headers: &mut HeaderMap, gate_headers: &GateHeaders) {
    for (name, value) in gate_headers.iter() {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(name), value);
            }
            Err(err) => warn!(header = name, error = %err, "dropping unencodable gate header"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/v1/status");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).expect("request builds")
    }

    #[test]
    fn leftmost_forwarded_address_wins() {
        let mut req = request(&[("x-forwarded-for", "203.0.113.9, 10.0.0.1")]);
        req.extensions_mut().insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));

        let identity = client_identity(&req);
        assert_eq!(identity.address.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn falls_back_to_socket_address() {
        let mut req = request(&[("user-agent", "curl/8.0"), ("x-client-id", "dm-7")]);
        req.extensions_mut().insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 9000))));

        let identity = client_identity(&req);
        assert_eq!(identity.address.as_deref(), Some("192.0.2.4"));
        assert_eq!(identity.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(identity.client_id.as_deref(), Some("dm-7"));
    }

    #[test]
    fn no_transport_info_means_no_address() {
        let identity = client_identity(&request(&[("x-forwarded-for", " ")]));
        assert!(identity.address.is_none());
    }

    #[test]
    fn gate_headers_are_copied_onto_response() {
        let mut gate_headers = GateHeaders::new();
        lorekeep_core::ResponseSink::attach(&mut gate_headers, "x-ratelimit-limit", "100".into());
        let mut headers = HeaderMap::new();
        apply_headers(&mut headers, &gate_headers);
        assert_eq!(headers.get("x-ratelimit-limit").map(|v| v.as_bytes()), Some(&b"100"[..]));
    }
}
