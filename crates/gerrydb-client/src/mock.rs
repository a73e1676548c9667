//! Record and replay of API traffic.
//!
//! In record mode requests are proxied to the configured host through a
//! local `httpmock` server and the exchanges are written to a file when the
//! client is dropped. In replay mode the local server answers from such a
//! file without touching the network.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use httpmock::{MockServer, Recording as HttpmockRecording};
use tracing::{debug, warn};

use crate::config::{ClientConfig, MockMode, origin};

/// Keeps the local server alive for as long as the `ApiClient` holding it.
pub(crate) struct MockGuard {
    server: MockServer,
    recording: Option<Recording>,
}

struct Recording {
    id: usize,
    path: PathBuf,
}

impl MockGuard {
    pub(crate) fn new(config: &ClientConfig) -> Option<Self> {
        let guard = match &config.mock_mode {
            MockMode::None => return None,
            MockMode::Record(path) => Self::record(&origin(&config.host), path),
            MockMode::Replay(path) => Self::replay(path),
        };
        Some(guard)
    }

    fn record(upstream: &str, path: &Path) -> Self {
        let server = MockServer::start();
        server.forward_to(upstream, |rule| {
            rule.filter(|when| {
                when.any_request();
            });
        });
        let id = server
            .record(|rule| {
                rule.filter(|when| {
                    when.any_request();
                });
            })
            .id;
        debug!(?path, %upstream, local = server.base_url(), "recording API traffic");

        Self {
            server,
            recording: Some(Recording {
                id,
                path: path.to_path_buf(),
            }),
        }
    }

    fn replay(path: &Path) -> Self {
        let server = MockServer::start();
        server.playback(path);
        debug!(?path, local = server.base_url(), "replaying API traffic");

        Self {
            server,
            recording: None,
        }
    }

    /// Host the client talks to instead of the configured one.
    pub(crate) fn host(&self) -> String {
        self.server.base_url()
    }
}

impl Debug for MockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGuard")
            .field("host", &self.host())
            .field("recording", &self.recording.as_ref().map(|r| &r.path))
            .finish()
    }
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        let Some(recording) = self.recording.take() else {
            return;
        };
        let Some(name) = recording.path.file_name() else {
            warn!(path = ?recording.path, "recording path has no file name, discarding recording");
            return;
        };

        // `record_save` picks its own timestamped file name.
        let saved = match HttpmockRecording::new(recording.id, &self.server)
            .save(format!("gerrydb_{}", name.to_string_lossy()))
        {
            Ok(saved) => saved,
            Err(err) => {
                warn!(%err, "failed to save API recording");
                return;
            },
        };
        match fs::rename(&saved, &recording.path) {
            Ok(()) => debug!(path = ?recording.path, "saved API recording"),
            Err(err) => warn!(%err, from = ?saved, to = ?recording.path, "failed to move API recording"),
        }
    }
}
