//! Off-thread logo decoding.
//!
//! Each drop is decoded on its own worker thread and reported back over a channel together
//! with the ticket it was issued. The state owner drains the channel whenever it is ready;
//! [`QrState::finish_logo_drop`] throws away any report whose ticket has been superseded.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::intake::{decode_logo, DroppedFile, LogoAsset};
use crate::state::{LogoTicket, QrState};

/// A finished decode, successful or not.
#[derive(Debug)]
pub struct DecodedLogo {
    pub ticket: LogoTicket,
    pub result: Result<LogoAsset>,
}

/// Turns dropped bytes into a logo. [`decode_logo`] unless a loader is built with another one.
pub type DecodeFn = fn(&[u8]) -> Result<LogoAsset>;

pub struct LogoLoader {
    sender: mpsc::Sender<DecodedLogo>,
    receiver: mpsc::Receiver<DecodedLogo>,
    decode: DecodeFn,
}

impl Default for LogoLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LogoLoader {
    pub fn new() -> Self {
        Self::with_decoder(decode_logo)
    }

    pub fn with_decoder(decode: DecodeFn) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            decode,
        }
    }

    /// Starts decoding `file` for `ticket`. Returns immediately.
    ///
    /// Every submission reports exactly once: a decoder that panics is reported as
    /// [`Error::DecodeAborted`].
    pub fn submit(&self, ticket: LogoTicket, file: DroppedFile) {
        let sender = self.sender.clone();
        let decode = self.decode;
        debug!(seq = ticket.sequence(), name = %file.name, bytes = file.bytes.len(), "logo decode submitted");
        thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| decode(&file.bytes)))
                .unwrap_or_else(|_| {
                    warn!(seq = ticket.sequence(), "logo decoder panicked");
                    Err(Error::DecodeAborted)
                });
            // The receiver lives as long as the loader; a send error only means it was dropped.
            let _ = sender.send(DecodedLogo { ticket, result });
        });
    }

    /// Applies every decode that has already finished, without blocking.
    pub fn drain(&self, mut state: QrState) -> QrState {
        while let Ok(done) = self.receiver.try_recv() {
            state = state.finish_logo_drop(done.ticket, done.result);
        }
        state
    }

    /// Applies finished decodes until the one for `ticket` has landed or `timeout` elapses.
    pub fn settle(&self, mut state: QrState, ticket: LogoTicket, timeout: Duration) -> QrState {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(done) => {
                    let reached = done.ticket == ticket;
                    state = state.finish_logo_drop(done.ticket, done.result);
                    if reached {
                        return state;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(seq = ticket.sequence(), ?timeout, "logo decode still pending");
                    return state;
                }
                Err(RecvTimeoutError::Disconnected) => return state,
            }
        }
    }
}
