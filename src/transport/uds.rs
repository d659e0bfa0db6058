//! # Unix-socket line transport.
//!
//! ```text
//! UI client ──"start_app:pong\n"──► reader ─► parse_message ─► TaskSender
//!                                                └─ input ─► InteractionFeedback
//! UI client ◄──"app_started:true\n"── send_status
//! ```
//!
//! One client at a time: a new connection replaces the previous one. With no
//! client connected `send_status` returns 0.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::tasks::{parse_message, InteractionFeedback, Message, TaskSender};

use super::StatusSink;

struct Client {
    id: u64,
    writer: OwnedWriteHalf,
}

/// Unix-socket server feeding the task queue.
pub struct UdsServer {
    path: PathBuf,
    client: Mutex<Option<Client>>,
    next_id: AtomicU64,
    tasks: TaskSender,
    feedback: Arc<InteractionFeedback>,
}

impl UdsServer {
    /// Binds `path` (replacing a stale socket file) and starts accepting.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(
        path: impl Into<PathBuf>,
        tasks: TaskSender,
        feedback: Arc<InteractionFeedback>,
        token: CancellationToken,
    ) -> io::Result<Arc<Self>> {
        let path = path.into();
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "stale socket removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        let listener = UnixListener::bind(&path)?;
        info!(path = %path.display(), "ui socket listening");

        let server = Arc::new(Self {
            path,
            client: Mutex::new(None),
            next_id: AtomicU64::new(1),
            tasks,
            feedback,
        });
        tokio::spawn(server.clone().accept_loop(listener, token));
        Ok(server)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a UI client is connected.
    pub async fn is_connected(&self) -> bool {
        self.client.lock().await.is_some()
    }

    async fn accept_loop(self: Arc<Self>, listener: UnixListener, token: CancellationToken) {
        loop {
            let accepted = tokio::select! {
                _ = token.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, _)) => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let (reader, writer) = stream.into_split();
                    if self.client.lock().await.replace(Client { id, writer }).is_some() {
                        info!("ui client replaced");
                    } else {
                        info!("ui client connected");
                    }
                    tokio::spawn(self.clone().read_loop(id, reader, token.clone()));
                }
                Err(e) => warn!(error = %e, "ui socket accept failed"),
            }
        }
        let _ = std::fs::remove_file(&self.path);
        debug!("ui socket closed");
    }

    async fn read_loop(self: Arc<Self>, id: u64, reader: OwnedReadHalf, token: CancellationToken) {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = tokio::select! {
                _ = token.cancelled() => break,
                read = reader.read_until(b'\n', &mut buf) => read,
            };
            match read {
                Ok(0) => break,
                Ok(_) => {
                    let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
                    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                    match std::str::from_utf8(raw) {
                        Ok(line) => self.dispatch(line),
                        Err(_) => warn!(
                            line = %String::from_utf8_lossy(raw),
                            "ui message is not utf-8; skipped"
                        ),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "ui socket read failed");
                    break;
                }
            }
        }

        let mut client = self.client.lock().await;
        if client.as_ref().is_some_and(|c| c.id == id) {
            *client = None;
            info!("ui client disconnected");
        }
    }

    fn dispatch(&self, line: &str) {
        debug!(message = line, "ui message");
        match parse_message(line) {
            Some(Message::Task(task)) => {
                self.tasks.post(task);
            }
            Some(Message::Input) => {
                self.feedback.notify_input();
            }
            None => {}
        }
    }
}

#[async_trait]
impl StatusSink for UdsServer {
    async fn send_status(&self, text: &str) -> usize {
        let mut client = self.client.lock().await;
        let Some(c) = client.as_mut() else {
            return 0;
        };
        let line = format!("{text}\n");
        match c.writer.write_all(line.as_bytes()).await {
            Ok(()) => line.len(),
            Err(e) => {
                warn!(error = %e, "ui send failed; dropping client");
                *client = None;
                0
            }
        }
    }
}
