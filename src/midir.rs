//! Output ports backed by the [`midir`](https://docs.rs/midir) crate.
//!
//! Only available with the `midir-io` feature.

use crate::output::{MidiConnection, MidiOutput};
use ::midir::{ConnectErrorKind, InitError, MidiOutputConnection, PortInfoError, SendError};
use thiserror::Error as ThisError;

/// Name this crate registers itself with on the host MIDI API.
pub const CLIENT_NAME: &str = "midiplay";

#[derive(Debug, ThisError)]
pub enum MidirError {
    #[error("failed to initialize midi output: {0}")]
    Init(#[from] InitError),
    #[error("failed to query midi port: {0}")]
    PortInfo(#[from] PortInfoError),
    #[error("no midi output port with index {0}")]
    NoSuchPort(usize),
    #[error("failed to connect to midi port: {0:?}")]
    Connect(ConnectErrorKind),
    #[error("failed to send midi message: {0}")]
    Send(#[from] SendError),
}

/// The host MIDI output API.
pub struct MidirOutput {
    inner: ::midir::MidiOutput,
}
impl MidirOutput {
    pub fn new() -> Result<MidirOutput, MidirError> {
        Ok(MidirOutput {
            inner: ::midir::MidiOutput::new(CLIENT_NAME)?,
        })
    }
}
impl MidiOutput for MidirOutput {
    type Connection = MidirConnection;
    type Error = MidirError;

    fn port_names(&self) -> Result<Vec<String>, MidirError> {
        self.inner
            .ports()
            .iter()
            .map(|port| self.inner.port_name(port).map_err(MidirError::from))
            .collect()
    }

    fn open(self, index: usize) -> Result<MidirConnection, MidirError> {
        let ports = self.inner.ports();
        let port = ports.get(index).ok_or(MidirError::NoSuchPort(index))?;
        let name = self.inner.port_name(port)?;
        log::info!("opening midi output port {}: {}", index, name);
        let conn = self
            .inner
            .connect(port, CLIENT_NAME)
            .map_err(|err| MidirError::Connect(err.kind()))?;
        Ok(MidirConnection { inner: conn })
    }
}

/// An open `midir` output port.
pub struct MidirConnection {
    inner: MidiOutputConnection,
}
impl MidiConnection for MidirConnection {
    type Error = MidirError;

    fn send(&mut self, message: &[u8]) -> Result<(), MidirError> {
        self.inner.send(message)?;
        Ok(())
    }

    fn close(self) {
        self.inner.close();
    }
}
