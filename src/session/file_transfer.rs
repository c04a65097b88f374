//! IND$FILE tunneled file transfer: detection and the upload/receive
//! sub-state machine layered on top of the normal screen read/write cycle.
//!
//! IND$FILE has no structured-field identity of its own — the host program
//! is a normal 3270 application that happens to accept `IND$FILE GET`/`PUT`
//! command lines and then paints transfer-status screens. Detection is
//! therefore textual: the operator information area carries a "DATA
//! TRANSFER IN PROGRESS" (or similar product-specific) marker while a
//! transfer is under way, and we key off that rather than any protocol
//! primitive.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::lib3270::display::Display3270;

const MARKER: &str = "IND$FILE";

/// Which way a transfer is moving relative to this terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

/// Current state of an IND$FILE transfer, surfaced via
/// [`crate::session::Session::file_transfer_state`].
#[derive(Debug, Clone, PartialEq)]
pub enum FileTransferState {
    Idle,
    /// The command line has been submitted; waiting for the host to paint
    /// the first transfer status screen.
    Requested { direction: Direction, local_path: PathBuf },
    /// Status screens carrying the marker are being exchanged.
    InProgress { direction: Direction, local_path: PathBuf, bytes_transferred: usize },
    Complete { direction: Direction, local_path: PathBuf },
    Failed { reason: String },
}

impl FileTransferState {
    pub fn is_idle(&self) -> bool {
        matches!(self, FileTransferState::Idle)
    }
}

/// Operator-area marker fallback: true if the bottom row of the current
/// screen announces a transfer in progress.
pub fn detect(display: &Display3270) -> bool {
    display
        .get_row(display.rows().saturating_sub(1))
        .map(|line| line.contains(MARKER))
        .unwrap_or(false)
}

/// Build the command-line text that kicks off a PUT (upload) request.
pub fn put_command(local_path: &Path) -> String {
    format!("IND$FILE PUT {}", file_name(local_path))
}

/// Build the command-line text that kicks off a GET (download) request.
pub fn get_command(local_path: &Path) -> String {
    format!("IND$FILE GET {}", file_name(local_path))
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| path.display().to_string())
}

/// Advance transfer state from the current screen contents. Called once per
/// host write while a transfer is outstanding. Appends whatever the current
/// screen carries as data payload (everything but the operator area) when
/// in progress, and flushes to disk on completion.
pub fn on_host_write(state: FileTransferState, display: &Display3270, payload: &mut Vec<u8>) -> FileTransferState {
    match state {
        FileTransferState::Requested { direction, local_path } => {
            if detect(display) {
                FileTransferState::InProgress { direction, local_path, bytes_transferred: 0 }
            } else {
                FileTransferState::Requested { direction, local_path }
            }
        }
        FileTransferState::InProgress { direction, local_path, bytes_transferred } => {
            if detect(display) {
                let data_rows = display.rows().saturating_sub(1);
                let mut collected = 0;
                for row in 0..data_rows {
                    if let Some(line) = display.get_row(row) {
                        let trimmed = line.trim_end();
                        if direction == Direction::Download {
                            payload.extend_from_slice(trimmed.as_bytes());
                            payload.push(b'\n');
                        }
                        collected += trimmed.len();
                    }
                }
                FileTransferState::InProgress { direction, local_path, bytes_transferred: bytes_transferred + collected }
            } else {
                FileTransferState::Complete { direction, local_path }
            }
        }
        other => other,
    }
}

/// Persist accumulated download payload to disk once the transfer reaches
/// [`FileTransferState::Complete`].
pub fn finish_download(local_path: &Path, payload: &[u8]) -> Result<()> {
    std::fs::write(local_path, payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_command_uses_file_name_only() {
        let path = PathBuf::from("/tmp/reports/quarterly.txt");
        assert_eq!(put_command(&path), "IND$FILE PUT quarterly.txt");
    }

    #[test]
    fn detect_matches_marker_in_bottom_row() {
        use crate::codec::{self, CodePage};

        let mut display = Display3270::new();
        let bottom = display.rows() - 1;
        let text = "IND$FILE TRANSFER IN PROGRESS";
        let bytes = codec::encode(text, CodePage::Cp037, Some(0x40)).unwrap();
        for (i, byte) in bytes.iter().enumerate() {
            display.write_char_at((bottom * display.cols() + i) as u16, *byte);
        }
        assert!(detect(&display));
    }

    #[test]
    fn requested_transitions_to_in_progress_once_marker_appears() {
        let display = Display3270::new();
        let state = FileTransferState::Requested { direction: Direction::Upload, local_path: PathBuf::from("x") };
        let mut payload = Vec::new();
        let next = on_host_write(state, &display, &mut payload);
        assert!(matches!(next, FileTransferState::Requested { .. }));
    }

    #[test]
    fn finish_download_writes_payload_to_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("downloaded.txt");
        finish_download(&path, b"hello from host").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello from host");
    }
}
