use crate::device_message::{Command, DeviceMessage};
use crate::line_framer::{FramedLine, LineFramer};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to start reader thread: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct TerminalConfig {
    pub baud_rate: u32,
    /// Read timeout of the port. Bounds how long the reader takes to notice a stop.
    pub poll_timeout: Duration,
    /// Sleep after a read that returned nothing.
    pub idle_backoff: Duration,
    /// How long `close` waits for the reader before releasing the port anyway.
    pub close_timeout: Duration,
    pub max_line_len: usize,
    pub read_chunk: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            poll_timeout: Duration::from_millis(100),
            idle_backoff: Duration::from_millis(10),
            close_timeout: Duration::from_millis(500),
            max_line_len: LineFramer::DEFAULT_MAX_LINE_LEN,
            read_chunk: 1024,
        }
    }
}

/// Write half of an open link, able to hand out an independent read half for
/// the reader thread.
pub trait SerialLink: Write + Send {
    fn try_clone_reader(&self) -> Result<Box<dyn Read + Send>, TerminalError>;
}

impl SerialLink for Box<dyn SerialPort> {
    fn try_clone_reader(&self) -> Result<Box<dyn Read + Send>, TerminalError> {
        Ok(Box::new(self.try_clone()?))
    }
}

/// Opens links by port name.
pub trait PortOpener: Send {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        poll_timeout: Duration,
    ) -> Result<Box<dyn SerialLink>, TerminalError>;
}

/// Opens real serial ports through `serialport`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortOpener for SystemPorts {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        poll_timeout: Duration,
    ) -> Result<Box<dyn SerialLink>, TerminalError> {
        let serial = serialport::new(port, baud_rate)
            .timeout(poll_timeout)
            .open()?;
        Ok(Box::new(serial))
    }
}

/// Everything the terminal reports, successes and failures alike.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalEvent {
    Connected { port: String },
    ConnectFailed { reason: String },
    Disconnected,
    Message(DeviceMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Opening,
    Open,
}

struct Session {
    port: String,
    link: Box<dyn SerialLink>,
    stop: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    /// Disconnects when the reader thread exits.
    exited: Receiver<()>,
}

/// Newline-delimited JSON terminal to the radio.
///
/// All outcomes, including failures, are delivered on the event receiver
/// returned by [`RadioTerminal::new`]. No method returns an error.
pub struct RadioTerminal {
    config: TerminalConfig,
    opener: Box<dyn PortOpener>,
    events: Sender<TerminalEvent>,
    state: ConnectionState,
    session: Option<Session>,
}

impl RadioTerminal {
    pub fn new(config: TerminalConfig) -> (Self, Receiver<TerminalEvent>) {
        Self::with_opener(config, SystemPorts)
    }

    pub fn with_opener(
        config: TerminalConfig,
        opener: impl PortOpener + 'static,
    ) -> (Self, Receiver<TerminalEvent>) {
        let (events, receiver) = mpsc::channel();
        let terminal = Self {
            config,
            opener: Box::new(opener),
            events,
            state: ConnectionState::Closed,
            session: None,
        };
        (terminal, receiver)
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn port(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.port.as_str())
    }

    /// Whether a reader thread is still running for the open port. Turns false
    /// after a fatal read error until the port is reopened.
    pub fn is_listening(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.reader.is_finished())
    }

    /// Open `port` at the configured baud rate.
    pub fn open_default(&mut self, port: &str) {
        let baud_rate = self.config.baud_rate;
        self.open(port, baud_rate);
    }

    /// Open `port`, replacing any current connection. The previous reader is
    /// joined before the new one starts. Reports `Connected` or `ConnectFailed`.
    pub fn open(&mut self, port: &str, baud_rate: u32) {
        if self.session.is_some() {
            self.shutdown(None);
        }

        self.state = ConnectionState::Opening;
        log::debug!("Opening {} at {} baud", port, baud_rate);

        match self.start_session(port, baud_rate) {
            Ok(session) => {
                self.session = Some(session);
                self.state = ConnectionState::Open;
                self.notify(TerminalEvent::Connected {
                    port: port.to_string(),
                });
            }
            Err(e) => {
                self.state = ConnectionState::Closed;
                log::warn!("Connect to {} failed: {}", port, e);
                self.notify(TerminalEvent::ConnectFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn start_session(&self, port: &str, baud_rate: u32) -> Result<Session, TerminalError> {
        let link = self
            .opener
            .open(port, baud_rate, self.config.poll_timeout)?;
        let reader = link.try_clone_reader()?;

        let stop = Arc::new(AtomicBool::new(false));
        let (exit_guard, exited) = mpsc::channel::<()>();
        let worker = ReaderWorker {
            port: port.to_string(),
            reader,
            framer: LineFramer::new(self.config.max_line_len),
            events: self.events.clone(),
            stop: Arc::clone(&stop),
            idle_backoff: self.config.idle_backoff,
            read_chunk: self.config.read_chunk.max(1),
        };

        let handle = thread::Builder::new()
            .name(format!("radio-reader:{port}"))
            .spawn(move || {
                let _exit_guard = exit_guard;
                worker.run();
            })
            .map_err(|source| TerminalError::Spawn { source })?;

        Ok(Session {
            port: port.to_string(),
            link,
            stop,
            reader: handle,
            exited,
        })
    }

    /// Stop the reader and release the port. Waits at most `close_timeout` for
    /// the reader; the write half is released either way. Idempotent.
    ///
    /// A reader that misses the deadline is detached. It still holds its read
    /// handle until its blocked read returns, at most one `poll_timeout` on a
    /// real port, and exits on its own after that.
    pub fn close(&mut self) {
        let timeout = self.config.close_timeout;
        self.shutdown(Some(timeout));
    }

    /// `wait: None` joins the reader without a bound.
    fn shutdown(&mut self, wait: Option<Duration>) {
        let Some(session) = self.session.take() else {
            return;
        };
        session.stop.store(true, Ordering::SeqCst);

        let finished = match wait {
            Some(timeout) => !matches!(
                session.exited.recv_timeout(timeout),
                Err(RecvTimeoutError::Timeout)
            ),
            None => true,
        };

        if finished {
            if session.reader.join().is_err() {
                log::warn!("Reader for {} panicked", session.port);
            }
        } else {
            log::warn!(
                "Reader for {} did not stop within {:?}, releasing port anyway",
                session.port,
                wait.unwrap_or_default()
            );
        }

        drop(session.link);
        self.state = ConnectionState::Closed;
        log::debug!("Closed {}", session.port);
        self.notify(TerminalEvent::Disconnected);
    }

    /// Write one command line and flush. Blocks for the duration of the write.
    /// Failures are reported as `Error` messages; a failed write leaves the
    /// connection open.
    pub fn send(&mut self, command: &Command) {
        let Some(session) = self.session.as_mut() else {
            self.notify(TerminalEvent::Message(DeviceMessage::error("Not connected")));
            return;
        };

        if let Err(e) = Self::write_command(session.link.as_mut(), command) {
            log::warn!("Serial write error: {}", e);
            self.notify(TerminalEvent::Message(DeviceMessage::error(format!(
                "Serial write error: {e}"
            ))));
        }
    }

    fn write_command(link: &mut dyn SerialLink, command: &Command) -> Result<(), TerminalError> {
        let line = command.encode()?;
        link.write_all(line.as_bytes())?;
        link.flush()?;
        Ok(())
    }

    fn notify(&self, event: TerminalEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Event receiver dropped");
        }
    }
}

impl Drop for RadioTerminal {
    fn drop(&mut self) {
        self.close();
    }
}

struct ReaderWorker {
    port: String,
    reader: Box<dyn Read + Send>,
    framer: LineFramer,
    events: Sender<TerminalEvent>,
    stop: Arc<AtomicBool>,
    idle_backoff: Duration,
    read_chunk: usize,
}

impl ReaderWorker {
    fn run(mut self) {
        let span = tracing::debug_span!("radio_reader", port = %self.port);
        let _enter = span.enter();
        tracing::debug!("reader started");

        let mut chunk = vec![0u8; self.read_chunk];
        while !self.stop.load(Ordering::SeqCst) {
            match self.reader.read(&mut chunk) {
                Ok(0) => thread::sleep(self.idle_backoff),
                Ok(n) => {
                    if !self.dispatch(&chunk[..n]) {
                        tracing::debug!("event receiver gone");
                        break;
                    }
                }
                Err(e) if is_idle(&e) => thread::sleep(self.idle_backoff),
                Err(e) => {
                    // A read failing because close() released the port is not an error.
                    if !self.stop.load(Ordering::SeqCst) {
                        tracing::warn!(error = %e, "serial read failed");
                        self.emit(DeviceMessage::error(format!("Serial read error: {e}")));
                    }
                    break;
                }
            }
        }

        tracing::debug!("reader stopped");
    }

    /// Frame and decode `data`. Returns false once nobody is listening.
    fn dispatch(&mut self, data: &[u8]) -> bool {
        for frame in self.framer.feed(data) {
            let message = match frame {
                FramedLine::Line(line) => DeviceMessage::decode(&line),
                FramedLine::Overflow { discarded, head } => DeviceMessage::Error {
                    msg: format!("Discarded {discarded} bytes without a line terminator"),
                    raw: Some(head),
                },
            };
            if !self.emit(message) {
                return false;
            }
        }
        true
    }

    fn emit(&self, message: DeviceMessage) -> bool {
        self.events.send(TerminalEvent::Message(message)).is_ok()
    }
}

fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
