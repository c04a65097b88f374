//! Session Controller: owns one connection end to end — transport, telnet
//! negotiation, and 3270 data-stream interpretation — behind a small set of
//! operations a caller drives from a single cooperative loop.
//!
//! There's no host precedent for a component shaped quite like this one;
//! the host's `network.rs` ran one worker thread per connection and talked
//! to it over a channel, and that's the pattern this follows, collapsed
//! into a single-threaded loop plus a [`SessionHandle`] for callers that do
//! want to hand commands in from another thread.

pub mod file_transfer;

use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use crate::codec::{self, CodePage};
use crate::config::SessionConfig;
use crate::error::{Error, InputError, Result};
use crate::lib3270::{AidKey, Display3270, ProtocolProcessor3270, ScreenSize};
use crate::telnet::{self, DataType, Phase};
use crate::transport::{ReadOutcome, SecLevel, Transport, TlsConfig};

pub use file_transfer::{Direction, FileTransferState};

/// Where a session sits in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Connecting,
    Negotiating,
    Bound,
    Idle,
    PendingInput,
    Closing,
    Closed,
}

/// What a call to [`Session::wait`] observed.
#[derive(Debug)]
pub enum SessionEvent {
    /// The host painted (part of) a new screen.
    HostWrite,
    /// The keyboard went from locked to unlocked.
    KeyboardUnlocked,
    /// The session ended, with the error that caused it if abnormal.
    Closed(Option<Error>),
    /// Nothing happened before the deadline.
    Idle,
}

enum Command {
    SendKeys(String),
    SendAid(AidKey),
    MoveCursor(u16),
    ToggleInsert,
    Close,
}

/// A cloneable handle for driving a session's keyboard/AID input from
/// another thread. Commands are queued and applied on the next
/// [`Session::wait`].
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub fn send_keys(&self, text: impl Into<String>) -> Result<()> {
        self.tx.send(Command::SendKeys(text.into())).map_err(|_| Error::SessionClosed)
    }

    pub fn send_aid(&self, aid: AidKey) -> Result<()> {
        self.tx.send(Command::SendAid(aid)).map_err(|_| Error::SessionClosed)
    }

    pub fn move_cursor(&self, address: u16) -> Result<()> {
        self.tx.send(Command::MoveCursor(address)).map_err(|_| Error::SessionClosed)
    }

    pub fn toggle_insert(&self) -> Result<()> {
        self.tx.send(Command::ToggleInsert).map_err(|_| Error::SessionClosed)
    }

    pub fn close(&self) -> Result<()> {
        self.tx.send(Command::Close).map_err(|_| Error::SessionClosed)
    }
}

/// A bound TN3270(E) session: transport, telnet negotiation, and the 3270
/// presentation space, driven one [`Session::wait`] at a time.
pub struct Session {
    state: SessionState,
    transport: Transport,
    engine: telnet::Engine,
    processor: ProtocolProcessor3270,
    display: Display3270,
    codepage: CodePage,
    insert_mode: bool,
    file_transfer: FileTransferState,
    transfer_payload: Vec<u8>,
    command_tx: mpsc::Sender<Command>,
    command_rx: mpsc::Receiver<Command>,
}

impl Session {
    /// Connect and negotiate telnet/TN3270E options, blocking until the
    /// connection reaches `Active` or negotiation fails outright.
    pub fn connect(host: &str, port: u16, config: &SessionConfig) -> Result<Self> {
        log::info!("session: connecting to {host}:{port}");

        let tls = if config.ssl_enabled() {
            Some(TlsConfig {
                seclevel: SecLevel::from_level(config.seclevel().clamp(0, 255) as u8),
                verify: config.ssl_verify().parse().unwrap_or_default(),
                ca_bundle_path: config.get_string_property("session.caBundlePath"),
            })
        } else {
            None
        };

        let mut transport = Transport::connect(host, port, tls.as_ref())?;

        let terminal_type = config.get_string_property_or("session.terminalType", "IBM-3278-2-E");
        let mut engine = telnet::Engine::new(terminal_type);
        let offer = engine.initial_offer();
        transport.write(&offer)?;

        let codepage: CodePage = config.get_string_property_or("session.codepage", "037").parse().unwrap_or_default();

        let model = ScreenSize::Model2;
        let (rows, cols) = crate::config::resolve_ps_size(&config.ps_size_raw(), model.rows(), model.cols());
        let size = screen_size_for(rows, cols);

        let (command_tx, command_rx) = mpsc::channel();

        let mut session = Self {
            state: SessionState::Connecting,
            transport,
            engine,
            processor: ProtocolProcessor3270::new(),
            display: Display3270::with_size(size),
            codepage,
            insert_mode: false,
            file_transfer: FileTransferState::Idle,
            transfer_payload: Vec::new(),
            command_tx,
            command_rx,
        };

        session.state = SessionState::Negotiating;
        session.negotiate(Duration::from_millis(config.get_int_property_or("session.negotiationTimeoutMs", 5000) as u64))?;
        Ok(session)
    }

    /// A handle other threads can use to feed input into this session.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle { tx: self.command_tx.clone() }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive negotiation to completion (or failure) before returning control
    /// to the caller. Bounded by `timeout` overall, not per read.
    fn negotiate(&mut self, timeout: Duration) -> Result<()> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if self.engine.phase() == Phase::Active {
                self.state = SessionState::Bound;
                log::info!("session: negotiation complete, device type {:?}", self.engine.device_type());
                self.state = SessionState::Idle;
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }
            match self.transport.read(4096, remaining.min(Duration::from_millis(500)))? {
                ReadOutcome::Data(bytes) => {
                    let (reply, records) = self.engine.receive(&bytes)?;
                    if !reply.is_empty() {
                        self.transport.write(&reply)?;
                    }
                    for record in records {
                        self.apply_record(&record.payload)?;
                    }
                }
                ReadOutcome::Timeout => continue,
                ReadOutcome::Closed => {
                    self.state = SessionState::Closed;
                    return Err(Error::Transport(crate::error::TransportError::ConnectionLost {
                        reason: "closed during negotiation".into(),
                    }));
                }
            }
        }
    }

    /// Run one iteration of the cooperative loop: drain queued commands,
    /// then read from the transport for up to `timeout`.
    pub fn wait(&mut self, timeout: Duration) -> Result<SessionEvent> {
        if self.state == SessionState::Closed {
            return Err(Error::SessionClosed);
        }

        let was_locked = self.display.is_keyboard_locked();
        self.drain_commands()?;
        if self.state == SessionState::Closing {
            self.transport.close();
            self.state = SessionState::Closed;
            return Ok(SessionEvent::Closed(None));
        }

        match self.transport.read(4096, timeout)? {
            ReadOutcome::Data(bytes) => {
                let (reply, records) = self.engine.receive(&bytes)?;
                if !reply.is_empty() {
                    self.transport.write(&reply)?;
                }
                let mut wrote = false;
                for record in records {
                    self.apply_record(&record.payload)?;
                    wrote = true;
                }
                if wrote {
                    self.state = if self.display.is_keyboard_locked() { SessionState::PendingInput } else { SessionState::Idle };
                    if was_locked && !self.display.is_keyboard_locked() {
                        return Ok(SessionEvent::KeyboardUnlocked);
                    }
                    Ok(SessionEvent::HostWrite)
                } else {
                    Ok(SessionEvent::Idle)
                }
            }
            ReadOutcome::Timeout => Ok(SessionEvent::Idle),
            ReadOutcome::Closed => {
                self.state = SessionState::Closed;
                Ok(SessionEvent::Closed(None))
            }
        }
    }

    fn apply_record(&mut self, payload: &[u8]) -> Result<()> {
        self.processor
            .process_data(payload, &mut self.display)
            .map_err(|reason| Error::Protocol(crate::error::ProtocolError::InvalidStructuredField { field_type: 0, reason }))?;

        if let Some(response) = self.processor.generate_response() {
            let framed = self.engine.frame_outbound(DataType::ThreeTwoSeventyData, &response);
            self.transport.write(&framed)?;
        }

        self.file_transfer = file_transfer::on_host_write(std::mem::replace(&mut self.file_transfer, FileTransferState::Idle), &self.display, &mut self.transfer_payload);
        if let FileTransferState::Complete { direction: Direction::Download, local_path } = &self.file_transfer {
            file_transfer::finish_download(local_path, &self.transfer_payload)?;
            self.transfer_payload.clear();
        }

        Ok(())
    }

    fn drain_commands(&mut self) -> Result<()> {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                Command::SendKeys(text) => self.type_text(&text)?,
                Command::SendAid(aid) => self.dispatch_aid(aid)?,
                Command::MoveCursor(addr) => self.display.set_cursor(addr),
                Command::ToggleInsert => self.insert_mode = !self.insert_mode,
                Command::Close => {
                    self.engine.begin_closing();
                    self.state = SessionState::Closing;
                }
            }
        }
        Ok(())
    }

    /// Type text into the presentation space at the cursor, honoring the
    /// keyboard lock and protected-field rules a real 3278 enforces.
    fn type_text(&mut self, text: &str) -> Result<()> {
        if self.display.is_keyboard_locked() {
            return Err(InputError::KeyboardLocked.into());
        }
        let bytes = codec::encode(text, self.codepage, Some(0x40)).map_err(Error::Encode)?;
        for byte in bytes {
            let addr = self.display.cursor_address();
            if let Some(field) = self.display.field_manager().find_field_at(addr) {
                if field.is_protected() {
                    return Err(InputError::ProtectedField { address: addr as usize }.into());
                }
            }
            self.display.write_char(byte);
        }
        Ok(())
    }

    /// Submit the current screen's modified fields under the given AID,
    /// then lock the keyboard until the host responds — exactly what a real
    /// terminal does the instant an attention key is pressed.
    fn dispatch_aid(&mut self, aid: AidKey) -> Result<()> {
        if self.display.is_keyboard_locked() {
            return Err(InputError::KeyboardLocked.into());
        }
        self.processor.set_aid(aid);
        let response = self.processor.create_read_modified_response(&self.display, aid);
        let framed = self.engine.frame_outbound(DataType::ThreeTwoSeventyData, &response);
        self.transport.write(&framed)?;
        self.display.lock_keyboard();
        self.state = SessionState::PendingInput;
        Ok(())
    }

    /// Decoded text of the current screen, one line per row.
    pub fn screen_text(&self) -> String {
        (0..self.display.rows())
            .filter_map(|row| self.display.get_row(row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn file_transfer_state(&self) -> &FileTransferState {
        &self.file_transfer
    }

    /// Kick off an IND$FILE PUT: types the command line and presses Enter.
    /// The transfer itself plays out across subsequent [`Session::wait`]
    /// calls as the host paints status screens.
    pub fn upload(&mut self, local_path: &Path) -> Result<()> {
        if !self.file_transfer.is_idle() {
            return Err(Error::Input(InputError::KeyboardLocked));
        }
        let command = file_transfer::put_command(local_path);
        self.type_text(&command)?;
        self.dispatch_aid(AidKey::Enter)?;
        self.file_transfer = FileTransferState::Requested { direction: Direction::Upload, local_path: local_path.to_path_buf() };
        Ok(())
    }

    /// Kick off an IND$FILE GET. See [`Session::upload`] for the shape of
    /// the exchange that follows.
    pub fn receive(&mut self, local_path: &Path) -> Result<()> {
        if !self.file_transfer.is_idle() {
            return Err(Error::Input(InputError::KeyboardLocked));
        }
        let command = file_transfer::get_command(local_path);
        self.type_text(&command)?;
        self.dispatch_aid(AidKey::Enter)?;
        self.transfer_payload.clear();
        self.file_transfer = FileTransferState::Requested { direction: Direction::Download, local_path: local_path.to_path_buf() };
        Ok(())
    }

    /// Begin a graceful close: tells the telnet engine to stop negotiating
    /// further and closes the transport on the next `wait`.
    pub fn close(&mut self) {
        self.engine.begin_closing();
        self.state = SessionState::Closing;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            self.engine.mark_closed();
            self.transport.close();
        }
    }
}

fn screen_size_for(rows: usize, cols: usize) -> ScreenSize {
    match (rows, cols) {
        (24, 80) => ScreenSize::Model2,
        (32, 80) => ScreenSize::Model3,
        (43, 80) => ScreenSize::Model4,
        (27, 132) => ScreenSize::Model5,
        _ => ScreenSize::Model2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_size_for_matches_known_models() {
        assert_eq!(screen_size_for(24, 80), ScreenSize::Model2);
        assert_eq!(screen_size_for(43, 80), ScreenSize::Model4);
        assert_eq!(screen_size_for(10, 10), ScreenSize::Model2);
    }

    #[test]
    fn handle_send_keys_fails_after_session_dropped() {
        let (tx, rx) = mpsc::channel::<Command>();
        drop(rx);
        let handle = SessionHandle { tx };
        assert!(handle.send_keys("hello").is_err());
    }
}
