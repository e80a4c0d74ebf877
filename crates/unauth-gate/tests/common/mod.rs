#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use parking_lot::Mutex;
use unauth_gate::ResponseWriter;

/// In-memory response channel standing in for a transport.
#[derive(Default)]
pub struct MemoryResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[async_trait]
impl ResponseWriter for MemoryResponse {
    fn set_status(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    async fn write_body(&mut self, chunk: Bytes) -> io::Result<()> {
        self.body.extend_from_slice(&chunk);
        Ok(())
    }
}

/// Notice sink that tests can read back.
#[derive(Clone, Default)]
pub struct SharedLog(pub Arc<Mutex<Vec<u8>>>);

impl SharedLog {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
