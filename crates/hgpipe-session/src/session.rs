//! The command-server session: subprocess lifecycle, command dispatch, and
//! channel event delivery.

use std::collections::BTreeSet;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use bytes::BytesMut;
use tracing::{debug, warn};

use hgpipe_frame::{
    decode_message, encode_command, group_by_channel, Channel, ChannelGroup, FrameError, Message,
    TextEncoding,
};
use hgpipe_process::{ChildHandle, SpawnSpec, Spawner, StdSpawner};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::handshake::parse_banner;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Lifecycle state of a [`CommandServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Starting,
    Running,
    Stopped,
}

/// One event observed from the running server.
#[derive(Debug)]
pub enum SessionEvent {
    /// A demultiplexed group of same-channel messages
    /// (output/result/error/debug).
    Channel(ChannelGroup),
    /// Text the server wrote to stderr after the handshake completed.
    Stderr(String),
    /// A protocol violation in the stdout stream. Aborts the in-flight
    /// command; the session still attempts clean shutdown.
    Protocol(FrameError),
    /// The server's stdout closed. No further channel events will arrive.
    Eof,
}

/// Aggregated result of one `runcommand` invocation.
#[derive(Debug)]
pub struct CommandOutput {
    /// Output-channel text, groups joined with newlines.
    pub output: String,
    /// Return code from the result frame.
    pub exit_code: i32,
    /// Every collected message in arrival order, including downgraded
    /// warnings, debug output, and the result frame.
    pub messages: Vec<Message>,
}

/// A session owning one `hg serve --cmdserver pipe` subprocess.
///
/// The session is the exclusive owner of the child and its stdio. Exactly
/// one logical command may be in flight at a time; [`issue_command`] rejects
/// a second command with [`SessionError::CommandInFlight`] until a result
/// group has been observed. Callers needing concurrency use multiple
/// sessions.
///
/// [`issue_command`]: CommandServer::issue_command
pub struct CommandServer {
    config: SessionConfig,
    spawner: Box<dyn Spawner>,
    state: SessionState,
    child: Option<Box<dyn ChildHandle>>,
    stdin: Option<Box<dyn Write + Send>>,
    events: Option<Receiver<SessionEvent>>,
    reader: Option<JoinHandle<()>>,
    stderr_watcher: Option<JoinHandle<()>>,
    stderr_seen: Arc<Mutex<String>>,
    capabilities: BTreeSet<String>,
    encoding: TextEncoding,
    encoding_label: String,
    in_flight: bool,
    exit_code: Option<i32>,
}

impl CommandServer {
    /// Create a session using the production spawner.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_spawner(config, Box::new(StdSpawner))
    }

    /// Create a session with an explicit spawner (tests substitute a
    /// scripted child here).
    pub fn with_spawner(config: SessionConfig, spawner: Box<dyn Spawner>) -> Self {
        Self {
            config,
            spawner,
            state: SessionState::NotStarted,
            child: None,
            stdin: None,
            events: None,
            reader: None,
            stderr_watcher: None,
            stderr_seen: Arc::new(Mutex::new(String::new())),
            capabilities: BTreeSet::new(),
            encoding: TextEncoding::default(),
            encoding_label: String::new(),
            in_flight: false,
            exit_code: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Capabilities advertised by the handshake. Empty before `start`.
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    /// Encoding label declared by the handshake. Empty before `start`.
    pub fn encoding(&self) -> &str {
        &self.encoding_label
    }

    /// Start the command server with its working directory set to `path`
    /// (which must already be a Mercurial repository).
    ///
    /// Returns the advertised capabilities and encoding label. Fails with a
    /// spawn error, [`SessionError::StartupFailed`] if the server writes to
    /// stderr or exits before completing its handshake, or
    /// [`SessionError::HandshakeParse`] if the banner is unrecognized.
    pub fn start(&mut self, path: impl AsRef<Path>) -> Result<(BTreeSet<String>, String)> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.state = SessionState::Starting;

        let spec = SpawnSpec {
            program: self.config.hg_binary.clone(),
            args: self.config.server_args.clone(),
            cwd: path.as_ref().to_path_buf(),
            env: vec![(
                SessionConfig::ENCODING_VAR.to_string(),
                self.config.forced_encoding.clone(),
            )],
        };

        let mut child = match self.spawner.spawn(&spec) {
            Ok(child) => child,
            Err(err) => {
                self.state = SessionState::Stopped;
                return Err(err.into());
            }
        };

        let stdout = child.take_stdout();
        let stderr = child.take_stderr();
        let stdin = child.take_stdin();
        self.child = Some(child);

        let (Some(mut stdout), Some(stderr), Some(stdin)) = (stdout, stderr, stdin) else {
            self.abort_startup();
            return Err(SessionError::StdioUnavailable);
        };
        self.stdin = Some(stdin);

        let (tx, rx) = mpsc::channel();
        self.events = Some(rx);
        self.stderr_watcher = Some(spawn_stderr_watcher(
            stderr,
            tx.clone(),
            Arc::clone(&self.stderr_seen),
        ));

        // The banner arrives as the first stdout chunk, before framing
        // begins.
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        let read = loop {
            match stdout.read(&mut chunk) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.abort_startup();
                    return Err(SessionError::Io(err));
                }
            }
        };

        if read == 0 {
            // The server died before speaking; its stderr says why.
            let stderr_text = self.collect_startup_stderr();
            self.abort_startup();
            return Err(SessionError::StartupFailed {
                stderr: stderr_text,
            });
        }

        let early_stderr = self.stderr_seen.lock().expect("stderr lock").clone();
        if !early_stderr.is_empty() {
            self.abort_startup();
            return Err(SessionError::StartupFailed {
                stderr: early_stderr,
            });
        }

        let banner = String::from_utf8_lossy(&chunk[..read]).into_owned();
        let handshake = match parse_banner(&banner) {
            Ok(handshake) => handshake,
            Err(err) => {
                self.abort_startup();
                return Err(err);
            }
        };

        self.encoding = match TextEncoding::from_label(&handshake.encoding) {
            Some(encoding) => encoding,
            None => {
                warn!(
                    encoding = %handshake.encoding,
                    "server declared an unsupported encoding, decoding as UTF-8"
                );
                TextEncoding::Utf8
            }
        };
        self.encoding_label = handshake.encoding.clone();
        self.capabilities = handshake.capabilities.clone();

        self.reader = Some(spawn_stdout_reader(stdout, tx, self.encoding));
        self.state = SessionState::Running;

        debug!(
            capabilities = ?self.capabilities,
            encoding = %self.encoding_label,
            "command server running"
        );
        Ok((handshake.capabilities, handshake.encoding))
    }

    /// Encode a command and write it to the server's stdin.
    ///
    /// Does not block for the response; observe events through
    /// [`next_event`](Self::next_event) or use
    /// [`run_command`](Self::run_command). `name` must be a capability
    /// advertised by the handshake. Issuing a second command while one
    /// awaits its result is rejected with [`SessionError::CommandInFlight`];
    /// the flight ends when a result group is observed or the session stops.
    pub fn issue_command(&mut self, name: &str, args: &[String]) -> Result<()> {
        if self.state != SessionState::Running {
            return Err(SessionError::NotRunning);
        }
        if self.in_flight {
            return Err(SessionError::CommandInFlight);
        }
        if !self.capabilities.contains(name) {
            return Err(SessionError::UnsupportedCommand(name.to_string()));
        }

        let mut wire = BytesMut::new();
        encode_command(name, args, self.encoding, &mut wire)?;

        let stdin = self.stdin.as_mut().ok_or(SessionError::NotRunning)?;
        stdin.write_all(&wire)?;
        stdin.flush()?;

        self.in_flight = true;
        debug!(command = name, args = args.len(), "issued command");
        Ok(())
    }

    /// Block until the next event from the server.
    ///
    /// Returns [`SessionEvent::Eof`] once the stdout stream has closed and
    /// all queued events have been consumed.
    pub fn next_event(&mut self) -> Result<SessionEvent> {
        let rx = self.events.as_ref().ok_or(SessionError::NotRunning)?;
        let event = match rx.recv() {
            Ok(event) => event,
            Err(_) => SessionEvent::Eof,
        };

        if let SessionEvent::Channel(group) = &event {
            if group.channel == Channel::Result {
                self.in_flight = false;
            }
        }
        Ok(event)
    }

    /// Run one `runcommand` to completion and aggregate its output.
    ///
    /// Output and debug groups accumulate; an error group whose body starts
    /// with `warning` is downgraded to output and joins the aggregated text
    /// in arrival order; any other error group (or
    /// stderr text) fails the command with the raw diagnostic. The result
    /// group records the exit code and triggers a graceful stop: stdin is
    /// closed, trailing frames are drained until EOF, and the subprocess
    /// exit — not the result frame alone — completes the call. The session
    /// is `Stopped` afterwards; a fresh session runs the next command.
    pub fn run_command<S: AsRef<str>>(&mut self, args: &[S]) -> Result<CommandOutput> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        self.issue_command("runcommand", &args)?;

        let mut messages: Vec<Message> = Vec::new();
        let mut failure: Option<SessionError> = None;
        let mut exit_code: Option<i32> = None;

        while exit_code.is_none() && failure.is_none() {
            match self.next_event()? {
                SessionEvent::Channel(group) => match group.channel {
                    Channel::Output | Channel::Debug => messages.extend(group.messages),
                    Channel::Error => {
                        if group.body().starts_with("warning") {
                            messages.extend(downgrade_to_output(group.messages));
                        } else {
                            failure = Some(SessionError::CommandFailed(group.body()));
                        }
                    }
                    Channel::Result => {
                        exit_code = Some(group.return_code().unwrap_or(0));
                        messages.extend(group.messages);
                    }
                },
                SessionEvent::Stderr(text) => {
                    failure = Some(SessionError::CommandFailed(text));
                }
                SessionEvent::Protocol(err) => {
                    failure = Some(SessionError::Frame(err));
                }
                SessionEvent::Eof => {
                    failure = Some(SessionError::UnexpectedExit);
                }
            }
        }

        // Graceful stop: close stdin and drain whatever trails the result
        // (warning or debug frames may still arrive before exit).
        self.stdin.take();
        loop {
            match self.next_event()? {
                SessionEvent::Channel(group) if failure.is_none() => match group.channel {
                    Channel::Output | Channel::Debug => messages.extend(group.messages),
                    Channel::Error => {
                        if group.body().starts_with("warning") {
                            messages.extend(downgrade_to_output(group.messages));
                        } else {
                            failure = Some(SessionError::CommandFailed(group.body()));
                        }
                    }
                    Channel::Result => messages.extend(group.messages),
                },
                SessionEvent::Channel(_) => {}
                SessionEvent::Stderr(text) if failure.is_none() => {
                    failure = Some(SessionError::CommandFailed(text));
                }
                SessionEvent::Protocol(err) if failure.is_none() => {
                    failure = Some(SessionError::Frame(err));
                }
                SessionEvent::Stderr(_) | SessionEvent::Protocol(_) => {}
                SessionEvent::Eof => break,
            }
        }

        self.stop()?;

        if let Some(err) = failure {
            return Err(err);
        }

        let exit_code = exit_code.expect("loop exits with a result or a failure");
        let output = join_output_text(&messages);
        Ok(CommandOutput {
            output,
            exit_code,
            messages,
        })
    }

    /// Stop the session. Idempotent; a no-op if never started.
    ///
    /// Closes the server's stdin (signalling end-of-commands), waits for the
    /// subprocess to exit, and releases all resources. Returns the process
    /// exit code, or `None` if it was killed by a signal or never ran.
    pub fn stop(&mut self) -> Result<Option<i32>> {
        if self.state == SessionState::Stopped || self.state == SessionState::NotStarted {
            return Ok(self.exit_code);
        }

        self.stdin.take();
        let waited = match self.child.as_mut() {
            Some(child) => child.wait(),
            None => Ok(None),
        };

        self.join_threads();
        self.events.take();
        self.child.take();
        self.in_flight = false;
        self.state = SessionState::Stopped;

        let code = waited?;
        self.exit_code = code;
        debug!(exit_code = ?code, "command server stopped");
        Ok(code)
    }

    /// Startup failure path: make sure the child is gone, then settle into
    /// the terminal state.
    fn abort_startup(&mut self) {
        self.stdin.take();
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.join_threads();
        self.events.take();
        self.child.take();
        self.state = SessionState::Stopped;
    }

    /// Wait for the stderr stream to drain (the child is already dead) and
    /// return everything it wrote.
    fn collect_startup_stderr(&mut self) -> String {
        if let Some(handle) = self.stderr_watcher.take() {
            let _ = handle.join();
        }
        self.stderr_seen.lock().expect("stderr lock").clone()
    }

    fn join_threads(&mut self) {
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_watcher.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort_startup();
        }
    }
}

/// Downgraded warnings become output-channel messages, so they appear in the
/// aggregated text exactly where the server emitted them.
fn downgrade_to_output(messages: Vec<Message>) -> Vec<Message> {
    messages
        .into_iter()
        .map(|m| Message {
            channel: Channel::Output,
            ..m
        })
        .collect()
}

fn join_output_text(messages: &[Message]) -> String {
    let texts: Vec<&str> = messages
        .iter()
        .filter(|m| m.channel == Channel::Output)
        .map(Message::text)
        .collect();
    texts.join("\n")
}

/// Read stdout chunks, decode complete frames (buffering partial tails
/// across reads), demultiplex, and deliver channel groups in arrival order.
fn spawn_stdout_reader(
    mut stdout: Box<dyn Read + Send>,
    tx: Sender<SessionEvent>,
    encoding: TextEncoding,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            let read = match stdout.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(_) => 0,
            };

            if read == 0 {
                // EOF with a partial frame left over is a truncation.
                if !buf.is_empty() {
                    if let Err(err) = decode_message(&buf, 0, encoding) {
                        let _ = tx.send(SessionEvent::Protocol(err));
                    }
                }
                let _ = tx.send(SessionEvent::Eof);
                return;
            }

            buf.extend_from_slice(&chunk[..read]);
            match drain_messages(&mut buf, encoding) {
                Ok(messages) => {
                    for group in group_by_channel(messages) {
                        if tx.send(SessionEvent::Channel(group)).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    // Desynchronized stream: report and drop the buffer; the
                    // next chunk starts framing fresh.
                    if tx.send(SessionEvent::Protocol(err)).is_err() {
                        return;
                    }
                }
            }
        }
    })
}

/// Decode every complete message at the front of `buf`, leaving a partial
/// tail in place for the next read. An unknown channel tag poisons the
/// buffer: it is cleared and the error returned.
fn drain_messages(
    buf: &mut BytesMut,
    encoding: TextEncoding,
) -> std::result::Result<Vec<Message>, FrameError> {
    let mut messages = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        match decode_message(buf, offset, encoding) {
            Ok((message, consumed)) => {
                messages.push(message);
                offset += consumed;
            }
            Err(FrameError::MalformedFrame { .. }) => break,
            Err(err) => {
                buf.clear();
                return Err(err);
            }
        }
    }

    let _ = buf.split_to(offset);
    Ok(messages)
}

/// Drain the child's stderr. Everything observed is recorded (for startup
/// diagnostics) and forwarded as an event (for mid-command failures).
fn spawn_stderr_watcher(
    mut stderr: Box<dyn Read + Send>,
    tx: Sender<SessionEvent>,
    seen: Arc<Mutex<String>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let read = match stderr.read(&mut chunk) {
                Ok(0) => return,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(_) => return,
            };

            let text = String::from_utf8_lossy(&chunk[..read]).into_owned();
            seen.lock().expect("stderr lock").push_str(&text);
            if tx.send(SessionEvent::Stderr(text)).is_err() {
                return;
            }
        }
    })
}
