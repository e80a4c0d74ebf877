//! Append-only sink for human-readable block notices.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use http::StatusCode;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::client::ClientAddr;
use crate::config::NotifyTarget;

const MARKER: &str = "!!!!";

/// One observed authorization failure.
#[derive(Clone, Copy, Debug)]
pub struct BlockNotice<'a> {
    pub status: StatusCode,
    pub client: &'a ClientAddr,
    pub attempts: u32,
}

impl fmt::Display for BlockNotice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{MARKER} {}, {}, {}, attempts={}",
            self.status.as_u16(),
            self.client.key(),
            self.client.port_display(),
            self.attempts
        )
    }
}

/// Shared writer for block notices. Cloning shares the underlying sink.
///
/// [`Notifier::notify`] writes synchronously on the calling thread, which is a
/// request-path async task. Use sinks that do not block for long: stdout,
/// stderr, a local file, or an in-memory buffer. Never a pipe or a network
/// stream that can stall.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Notifier {
    pub fn from_writer<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::from_writer(io::stderr())
    }

    pub fn discard() -> Self {
        Self::from_writer(io::sink())
    }

    pub fn append_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self::from_writer(file))
    }

    pub fn from_target(target: &NotifyTarget) -> io::Result<Self> {
        Ok(match target {
            NotifyTarget::Stdout => Self::stdout(),
            NotifyTarget::Stderr => Self::stderr(),
            NotifyTarget::Discard => Self::discard(),
            NotifyTarget::File(path) => Self::append_file(path)?,
        })
    }

    /// Write one notice line. Sink failures are logged, never returned.
    pub fn notify(&self, notice: &BlockNotice<'_>) {
        info!(
            target: "unauth-gate",
            status = notice.status.as_u16(),
            client = notice.client.key(),
            port = %notice.client.port_display(),
            attempts = notice.attempts,
            "authorization failure recorded"
        );

        let line = format!("{notice}\n");
        let mut sink = self.sink.lock();
        if let Err(err) = sink.write_all(line.as_bytes()).and_then(|_| sink.flush()) {
            warn!(target: "unauth-gate", "failed to write block notice: {err}");
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn notice_line_carries_status_host_and_port() {
        let buf = SharedBuf::default();
        let notifier = Notifier::from_writer(buf.clone());
        let client = ClientAddr::parse("10.0.0.1:51234");
        notifier.notify(&BlockNotice {
            status: StatusCode::UNAUTHORIZED,
            client: &client,
            attempts: 1,
        });

        let out = String::from_utf8(buf.0.lock().clone()).unwrap();
        assert_eq!(out, "!!!! 401, 10.0.0.1, 51234, attempts=1\n");
    }

    #[test]
    fn notice_line_carries_split_error_when_port_is_missing() {
        let client = ClientAddr::parse("10.0.0.1");
        let line = BlockNotice {
            status: StatusCode::FORBIDDEN,
            client: &client,
            attempts: 2,
        }
        .to_string();
        assert!(line.starts_with("!!!! 403, 10.0.0.1, "));
        assert!(line.contains("missing port in address"));
    }

    #[test]
    fn sink_errors_are_swallowed() {
        let notifier = Notifier::from_writer(Broken);
        let client = ClientAddr::parse("10.0.0.1:1");
        notifier.notify(&BlockNotice {
            status: StatusCode::UNAUTHORIZED,
            client: &client,
            attempts: 1,
        });
    }

    #[test]
    fn concurrent_notices_stay_line_aligned() {
        let buf = SharedBuf::default();
        let notifier = Notifier::from_writer(buf.clone());
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let notifier = notifier.clone();
                std::thread::spawn(move || {
                    let client = ClientAddr::parse(&format!("10.0.0.{worker}:80"));
                    for attempt in 1..=50 {
                        notifier.notify(&BlockNotice {
                            status: StatusCode::UNAUTHORIZED,
                            client: &client,
                            attempts: attempt,
                        });
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let out = String::from_utf8(buf.0.lock().clone()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|line| line.starts_with("!!!! 401, 10.0.0.")));
    }

    #[derive(Clone, Default)]
    struct CountingSink(Arc<Mutex<(usize, usize)>>);

    impl Write for CountingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().0 += 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.0.lock().1 += 1;
            Ok(())
        }
    }

    #[test]
    fn each_notice_is_one_write_and_one_flush() {
        let sink = CountingSink::default();
        let notifier = Notifier::from_writer(sink.clone());
        let client = ClientAddr::parse("10.0.0.1:1");
        for attempts in 1..=3 {
            notifier.notify(&BlockNotice {
                status: StatusCode::UNAUTHORIZED,
                client: &client,
                attempts,
            });
        }
        assert_eq!(*sink.0.lock(), (3, 3));
    }

    #[test]
    fn appends_to_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notices.log");
        std::fs::write(&path, "existing\n").unwrap();

        let notifier = Notifier::from_target(&NotifyTarget::File(path.clone())).unwrap();
        let client = ClientAddr::parse("192.0.2.4:443");
        notifier.notify(&BlockNotice {
            status: StatusCode::UNAUTHORIZED,
            client: &client,
            attempts: 5,
        });

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "existing\n!!!! 401, 192.0.2.4, 443, attempts=5\n");
    }
}
