//! The capabilities playback needs from a MIDI output device.
//!
//! The player only ever talks to these traits, so it has no dependency on any concrete device
//! API. Real ports are provided by the [`midir`](../midir/index.html) module (with the
//! `midir-io` feature), and [`RecordingConnection`](struct.RecordingConnection.html) keeps every
//! message in memory.

use std::{
    convert::Infallible,
    time::{Duration, Instant},
};

/// A MIDI output API that can list its ports and open one of them.
pub trait MidiOutput {
    type Connection: MidiConnection;
    type Error;

    /// Names of the available output ports, in port index order.
    fn port_names(&self) -> Result<Vec<String>, Self::Error>;

    /// Open the port at `index`.
    fn open(self, index: usize) -> Result<Self::Connection, Self::Error>;
}

/// An open output port.
pub trait MidiConnection {
    type Error;

    /// Send one complete MIDI message (a status byte and its data bytes, or a SysEx block).
    fn send(&mut self, message: &[u8]) -> Result<(), Self::Error>;

    /// Close the port. Dropping the connection closes it as well.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// A message captured by a [`RecordingConnection`](struct.RecordingConnection.html).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedMessage {
    /// Time since the connection was created.
    pub at: Duration,
    pub bytes: Vec<u8>,
}

/// A connection that records every message sent to it, along with the time it arrived.
#[derive(Clone, Debug)]
pub struct RecordingConnection {
    created: Instant,
    messages: Vec<RecordedMessage>,
}
impl RecordingConnection {
    pub fn new() -> RecordingConnection {
        RecordingConnection {
            created: Instant::now(),
            messages: Vec::new(),
        }
    }

    /// Messages in the order they were sent.
    pub fn messages(&self) -> &[RecordedMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<RecordedMessage> {
        self.messages
    }
}
impl Default for RecordingConnection {
    fn default() -> RecordingConnection {
        RecordingConnection::new()
    }
}
impl MidiConnection for RecordingConnection {
    type Error = Infallible;

    fn send(&mut self, message: &[u8]) -> Result<(), Infallible> {
        self.messages.push(RecordedMessage {
            at: self.created.elapsed(),
            bytes: message.to_vec(),
        });
        Ok(())
    }
}
