use std::path::Path;

/// Record a path as a `tracing` field value.
pub fn traceable_path(p: impl AsRef<Path>) -> impl tracing::Value {
    p.as_ref().display().to_string()
}

#[cfg(any(test, feature = "tests"))]
pub mod test_helpers {
    use std::io;
    use std::sync::{Arc, Mutex, MutexGuard};

    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory sink for formatted log lines.
    #[derive(Clone, Debug, Default)]
    pub struct LogCapture {
        lines: Arc<Mutex<Vec<u8>>>,
    }

    impl LogCapture {
        /// Everything logged so far.
        pub fn contents(&self) -> String {
            let lines = self.lines.lock().unwrap();
            String::from_utf8_lossy(&lines).into_owned()
        }
    }

    pub struct LogCaptureWriter<'a>(MutexGuard<'a, Vec<u8>>);

    impl io::Write for LogCaptureWriter<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogCapture {
        type Writer = LogCaptureWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LogCaptureWriter(self.lines.lock().unwrap())
        }
    }

    /// A subscriber capturing debug events as plain messages with their fields.
    ///
    /// Install it with [tracing::subscriber::set_default] for the duration
    /// of a test.
    pub fn test_subscriber() -> (impl tracing::Subscriber, LogCapture) {
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .with_level(false)
            .with_target(false)
            .compact()
            .finish();

        (subscriber, capture)
    }
}
