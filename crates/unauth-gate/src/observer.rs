//! Status capture around a transport's response channel.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode};

/// Response-writing capability handed to the gate by a transport.
#[async_trait]
pub trait ResponseWriter: Send {
    fn set_status(&mut self, status: StatusCode);
    fn insert_header(&mut self, name: HeaderName, value: HeaderValue);
    async fn write_body(&mut self, chunk: Bytes) -> io::Result<()>;
}

/// Pass-through writer that remembers the first status set on it.
///
/// Nothing is buffered: headers and body chunks go straight to the wrapped
/// writer. Build one per request.
pub struct StatusRecorder<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<StatusCode>,
}

impl<'a> StatusRecorder<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            status: None,
        }
    }

    /// Recorded status; `200 OK` when downstream never set one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn explicit_status(&self) -> Option<StatusCode> {
        self.status
    }
}

#[async_trait]
impl ResponseWriter for StatusRecorder<'_> {
    fn set_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
        self.inner.set_status(status);
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.inner.insert_header(name, value);
    }

    async fn write_body(&mut self, chunk: Bytes) -> io::Result<()> {
        self.inner.write_body(chunk).await
    }
}
