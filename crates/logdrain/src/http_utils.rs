// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    header,
    http::{self, HeaderMap},
    Response, StatusCode,
};
use serde_json::json;
use tracing::{debug, error, warn};

pub type HttpResponse = Response<Full<Bytes>>;

/// Logs `message` and returns it as a JSON body `{"message": message}` with `status`.
/// Success statuses log at debug, client errors at warn and everything else at error.
pub fn log_and_create_http_response(message: &str, status: StatusCode) -> http::Result<HttpResponse> {
    if status.is_success() {
        debug!("{message}");
    } else if status.is_client_error() {
        warn!("{message}");
    } else {
        error!("{message}");
    }
    let body = json!({ "message": message }).to_string();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
}

/// A response with an empty body and an explicit `Content-Length: 0`.
pub fn empty_response(status: StatusCode) -> http::Result<HttpResponse> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_LENGTH, 0)
        .body(Full::new(Bytes::new()))
}

/// Verifies that the `Content-Length` header, when present, is valid and no larger than
/// `max_content_length`. Chunked requests without one pass here and are bounded while the
/// body is read.
///
/// Returns `None` when the request may proceed, or the error response to send back.
pub fn verify_request_content_length(
    header_map: &HeaderMap,
    max_content_length: usize,
    error_message_prefix: &str,
) -> Option<http::Result<HttpResponse>> {
    let content_length_header = header_map.get(header::CONTENT_LENGTH)?;
    let content_length = match content_length_header
        .to_str()
        .ok()
        .and_then(|raw| raw.parse::<usize>().ok())
    {
        Some(length) => length,
        None => {
            return Some(log_and_create_http_response(
                &format!("{error_message_prefix}: Invalid Content-Length header"),
                StatusCode::BAD_REQUEST,
            ));
        }
    };
    if content_length > max_content_length {
        return Some(log_and_create_http_response(
            &format!("{error_message_prefix}: Payload too large"),
            StatusCode::PAYLOAD_TOO_LARGE,
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use hyper::header;
    use hyper::HeaderMap;
    use hyper::StatusCode;

    use super::*;

    fn create_test_headers_with_content_length(val: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(header::CONTENT_LENGTH, val.parse().unwrap());
        map
    }

    async fn get_response_body_as_string(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_request_content_length_missing_is_allowed() {
        assert!(verify_request_content_length(&HeaderMap::new(), 1, "Drain").is_none());
    }

    #[tokio::test]
    async fn test_request_content_length_not_a_number() {
        let response = verify_request_content_length(
            &create_test_headers_with_content_length("not_an_int"),
            1,
            "Drain",
        )
        .unwrap()
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_response_body_as_string(response).await,
            "{\"message\":\"Drain: Invalid Content-Length header\"}"
        );
    }

    #[tokio::test]
    async fn test_request_content_length_too_long() {
        let response = verify_request_content_length(
            &create_test_headers_with_content_length("100"),
            1,
            "Drain",
        )
        .unwrap()
        .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            get_response_body_as_string(response).await,
            "{\"message\":\"Drain: Payload too large\"}"
        );
    }

    #[test]
    fn test_request_content_length_within_limit() {
        assert!(verify_request_content_length(
            &create_test_headers_with_content_length("100"),
            100,
            "Drain"
        )
        .is_none());
    }

    #[tokio::test]
    async fn test_empty_response() {
        let response = empty_response(StatusCode::NO_CONTENT).unwrap();
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "0");
        assert!(get_response_body_as_string(response).await.is_empty());
    }
}
