//! # Overview
//!
//! `midiplay` is a strict Standard Midi File (SMF) decoder paired with a real-time, multi-track
//! player.
//!
//! Parsing is as simple as:
//!
//! ```rust
//! use midiplay::MidiDocument;
//!
//! let doc = MidiDocument::parse(include_bytes!("../test-asset/scale.mid")).unwrap();
//!
//! for (i, track) in doc.tracks.iter().enumerate() {
//!     println!("track {} has {} events", i, track.events.len());
//! }
//! ```
//!
//! The [`MidiDocument`](struct.MidiDocument.html) struct is the main type in the crate.
//! See its documentation for the structure of parsed MIDI files.
//!
//! # About lifetimes
//!
//! A `MidiDocument` stores references to the raw file bytes (text meta events, SysEx payloads) in
//! order to avoid allocations, so the byte buffer must outlive the document:
//!
//! ```rust,no_run
//! use midiplay::MidiDocument;
//!
//! // Load bytes into a buffer
//! let bytes = std::fs::read("song.mid").unwrap();
//!
//! // Parse bytes in a separate step
//! let doc = MidiDocument::parse(&bytes).unwrap();
//! ```
//!
//! # Strictness
//!
//! Parsing is all-or-nothing.
//! Every violation of the file format is reported as an [`Error`](struct.Error.html) carrying an
//! [`ErrorKind`](enum.ErrorKind.html) and the byte offset where it was detected, and no partial
//! document is ever produced.
//! The only tolerated deviations are a header chunk longer than 6 bytes and unknown chunk types,
//! which are skipped.
//!
//! # Playback
//!
//! A parsed document can be replayed in real time through a
//! [`Player`](playback/struct.Player.html), which runs one thread per track and paces them from
//! a shared tempo.
//! Output goes to anything implementing [`MidiConnection`](output/trait.MidiConnection.html):
//! a real port through the `midir-io` feature, or a
//! [`RecordingConnection`](output/struct.RecordingConnection.html) for tests and dry runs.
//!
//! ```rust
//! use midiplay::{
//!     output::RecordingConnection,
//!     playback::{PlaybackConfig, Player},
//!     MidiDocument,
//! };
//!
//! let doc = MidiDocument::parse(include_bytes!("../test-asset/scale.mid")).unwrap();
//! let mut sink = RecordingConnection::new();
//! // A time scale of zero plays everything back to back, without sleeping.
//! let player = Player::new(PlaybackConfig { time_scale: 0.0, ..Default::default() });
//! player.play(&doc, &mut sink).unwrap();
//! assert!(!sink.messages().is_empty());
//! ```
//!
//! # About features
//!
//! - `parallel` (default): decode track chunks on several threads through `rayon`.
//! - `midir-io` (default): [`midir`](midir/index.html) backed output ports.
//! - `cli` (default): the `midiplay` command line player.

macro_rules! bail {
    ($err:expr) => {{
        return Err($err.into());
    }};
}
macro_rules! ensure {
    ($cond:expr, $err:expr) => {{
        if !$cond {
            bail!($err)
        }
    }};
}

/// All of the errors this crate produces.
mod error;

mod prelude {
    pub(crate) use crate::{
        cursor::ByteCursor,
        error::{Error, ErrorKind, Result, ResultExt, StdResult},
        primitive::{u14, u15, u24, u28, u4, u7},
    };
    pub(crate) use std::{borrow::Cow, fmt, ops};

    pub(crate) fn bit_range<T>(val: T, range: ops::Range<u32>) -> T
    where
        T: From<u8>
            + ops::Shr<u32, Output = T>
            + ops::Shl<u32, Output = T>
            + ops::Not<Output = T>
            + ops::BitAnd<Output = T>,
    {
        let mask = !((!T::from(0)) << (range.end - range.start));
        (val >> range.start) & mask
    }
}

pub mod cursor;
mod event;
#[cfg(feature = "midir-io")]
pub mod midir;
pub mod output;
pub mod playback;
mod primitive;
mod riff;
mod smf;
pub mod varlen;

pub use crate::{
    error::{Error, ErrorKind, Result},
    event::{Event, EventDecoder, EventKind, MetaMessage, MidiMessage, PitchBend, Scale},
    primitive::{Division, Format, Fps, SmpteTime},
    smf::{Header, MidiDocument, Track},
};

/// Exotically-sized integers used by the MIDI standard.
pub mod num {
    pub use crate::primitive::{u14, u15, u24, u28, u4, u7};
}
