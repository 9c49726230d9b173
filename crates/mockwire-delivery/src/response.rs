use std::time::Duration;

use bytes::Bytes;

use crate::chunk::ChunkPlan;
use crate::error::TransportError;
use crate::header::HeaderMap;

/// What a [`ResponseSpec`] plays back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    /// A connection-level failure. No status, headers or body.
    Error(TransportError),
    /// A complete HTTP response.
    Success(SuccessResponse),
}

/// The status, headers and body of a successful canned response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub chunk_count_hint: usize,
    pub inter_chunk_delay: Duration,
}

/// An immutable description of a canned response.
///
/// Built through one of the named constructors, which cover every legal
/// combination of fields. None of them validate their input: status codes
/// outside the registered HTTP ranges and odd header names are kept as
/// given. Once built, a spec is never modified and can be shared freely
/// behind an `Arc`.
///
/// # Chunking
///
/// [`chunked()`](ResponseSpec::chunked) and
/// [`chunked_with_delay()`](ResponseSpec::chunked_with_delay) ask the
/// engine to split the body across several data events. See
/// [`ChunkPlan`] for the exact splitting rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSpec {
    kind: ResponseKind,
}

impl ResponseSpec {
    /// A response that fails with `error` instead of producing a status.
    pub fn error(error: impl Into<TransportError>) -> Self {
        Self {
            kind: ResponseKind::Error(error.into()),
        }
    }

    /// A response with no headers and an empty body.
    pub fn status(status: u16) -> Self {
        Self::chunked_with_delay(status, HeaderMap::new(), Bytes::new(), 0, Duration::ZERO)
    }

    pub fn with_headers(status: u16, headers: HeaderMap) -> Self {
        Self::chunked_with_delay(status, headers, Bytes::new(), 0, Duration::ZERO)
    }

    pub fn with_body(status: u16, body: impl Into<Bytes>) -> Self {
        Self::chunked_with_delay(status, HeaderMap::new(), body, 0, Duration::ZERO)
    }

    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self::chunked_with_delay(status, headers, body, 0, Duration::ZERO)
    }

    /// A response whose body is split into `hint` data events.
    pub fn chunked(status: u16, headers: HeaderMap, body: impl Into<Bytes>, hint: usize) -> Self {
        Self::chunked_with_delay(status, headers, body, hint, Duration::ZERO)
    }

    /// A response whose body is split into `hint` data events spaced at
    /// least `delay` apart.
    pub fn chunked_with_delay(
        status: u16,
        headers: HeaderMap,
        body: impl Into<Bytes>,
        hint: usize,
        delay: Duration,
    ) -> Self {
        Self {
            kind: ResponseKind::Success(SuccessResponse {
                status,
                headers,
                body: body.into(),
                chunk_count_hint: hint,
                inter_chunk_delay: delay,
            }),
        }
    }

    pub fn kind(&self) -> &ResponseKind {
        &self.kind
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ResponseKind::Error(_))
    }

    pub fn transport_error(&self) -> Option<&TransportError> {
        match &self.kind {
            ResponseKind::Error(err) => Some(err),
            ResponseKind::Success(_) => None,
        }
    }

    pub fn success(&self) -> Option<&SuccessResponse> {
        match &self.kind {
            ResponseKind::Error(_) => None,
            ResponseKind::Success(resp) => Some(resp),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.success().map(|r| r.status)
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.success().map(|r| &r.headers)
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.success().map(|r| &r.body)
    }

    /// The chunk-count hint. Always 0 for error responses.
    pub fn chunk_count_hint(&self) -> usize {
        self.success().map_or(0, |r| r.chunk_count_hint)
    }

    /// The inter-chunk delay. Always zero for error responses.
    pub fn inter_chunk_delay(&self) -> Duration {
        self.success().map_or(Duration::ZERO, |r| r.inter_chunk_delay)
    }

    /// The data events this response would produce, or `None` for an
    /// error response.
    pub fn chunk_plan(&self) -> Option<ChunkPlan> {
        self.success()
            .map(|r| ChunkPlan::new(&r.body, r.chunk_count_hint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_has_no_http_fields() {
        let spec = ResponseSpec::error("connection refused");
        assert!(spec.is_error());
        assert_eq!(spec.transport_error().unwrap().message(), "connection refused");
        assert_eq!(spec.status_code(), None);
        assert!(spec.headers().is_none());
        assert!(spec.body().is_none());
        assert!(spec.chunk_plan().is_none());
        assert_eq!(spec.chunk_count_hint(), 0);
    }

    #[test]
    fn status_only_has_empty_body_and_headers() {
        let spec = ResponseSpec::status(204);
        assert!(!spec.is_error());
        assert_eq!(spec.status_code(), Some(204));
        assert!(spec.headers().unwrap().is_empty());
        assert!(spec.body().unwrap().is_empty());
        assert_eq!(spec.chunk_plan().unwrap().lengths(), vec![0]);
    }

    #[test]
    fn constructors_fill_expected_fields() {
        let headers = HeaderMap::new().with("Content-Type", "text/plain");

        let spec = ResponseSpec::with_headers(301, headers.clone());
        assert_eq!(spec.headers(), Some(&headers));

        let spec = ResponseSpec::with_body(200, "hello");
        assert_eq!(spec.body().unwrap().as_ref(), b"hello");

        let spec = ResponseSpec::new(201, headers.clone(), &b"{}"[..]);
        assert_eq!(spec.status_code(), Some(201));
        assert_eq!(spec.headers(), Some(&headers));
        assert_eq!(spec.chunk_count_hint(), 0);
        assert_eq!(spec.inter_chunk_delay(), Duration::ZERO);
    }

    #[test]
    fn chunked_constructors_keep_hint_and_delay() {
        let spec = ResponseSpec::chunked(200, HeaderMap::new(), "0123456789", 3);
        assert_eq!(spec.chunk_count_hint(), 3);
        assert_eq!(spec.chunk_plan().unwrap().lengths(), vec![4, 3, 3]);

        let spec = ResponseSpec::chunked_with_delay(
            200,
            HeaderMap::new(),
            "abc",
            2,
            Duration::from_millis(50),
        );
        assert_eq!(spec.inter_chunk_delay(), Duration::from_millis(50));
    }

    #[test]
    fn unusual_status_codes_pass_through() {
        for status in [0, 99, 600, 999, u16::MAX] {
            assert_eq!(ResponseSpec::status(status).status_code(), Some(status));
        }
    }
}
