use std::fmt;
use thiserror::Error as ThisError;

/// Represents an error while parsing an SMF file.
///
/// Wraps an [`ErrorKind`](enum.ErrorKind.html) together with the byte offset (relative to the
/// start of the parsed buffer) where the problem was detected, and a chain of static context
/// messages describing what the parser was doing at the time.
///
/// `Display` prints the outermost context and the kind, `Debug` prints the whole chain.
#[derive(Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    offset: usize,
    context: Vec<&'static str>,
}
impl Error {
    /// Create a new error with the given `ErrorKind` detected at the given byte offset.
    #[inline]
    pub fn new(kind: ErrorKind, offset: usize) -> Error {
        Error {
            kind,
            offset,
            context: Vec::new(),
        }
    }

    /// More information about the error itself.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Byte offset into the parsed buffer where the error was detected.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// What the parser was doing when the error occurred, outermost first.
    pub fn context(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.context.iter().rev().copied()
    }

    fn chain_ctx(mut self, ctx: &'static str) -> Error {
        self.context.push(ctx);
        self
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ctx) = self.context.last() {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{} (at byte {})", self.kind, self.offset)
    }
}
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (at byte {})", self.kind, self.offset)?;
        for ctx in self.context.iter() {
            writeln!(f)?;
            write!(f, "  while {}", ctx)?;
        }
        Ok(())
    }
}
impl std::error::Error for Error {}

/// The type of error that occurred while parsing.
///
/// There is no recovery: any of these aborts the whole parse.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, ThisError)]
pub enum ErrorKind {
    /// The input does not start with an `MThd` chunk (or an RMID wrapper around one).
    #[error("not a standard midi file")]
    NotAnSmfFile,
    /// The input ended in the middle of a chunk header, chunk or event.
    #[error("unexpected end of input")]
    TruncatedInput,
    /// An event needs more bytes than its chunk declares.
    #[error("read past the declared chunk length")]
    ChunkLengthExceeded,
    /// A variable-length quantity did not terminate within 4 bytes.
    #[error("variable-length quantity longer than 4 bytes")]
    MalformedVariableLength,
    /// A track event omits its status byte but no running status is active.
    #[error("event without status byte and no running status")]
    MissingRunningStatus,
    /// A data byte has its top bit set, or is otherwise out of range.
    #[error("invalid data byte {0:#04x}")]
    InvalidDataByte(u8),
    /// A fixed-length meta event declares a different length.
    #[error("meta event {meta_type:#04x} has length {found}, expected {expected}")]
    InvalidMetaLength {
        meta_type: u8,
        expected: u8,
        found: u32,
    },
    /// A track chunk has bytes left after its End Of Track event.
    #[error("{0} bytes of track data after end of track")]
    TrailingTrackData(usize),
    /// The header declares a different amount of tracks than there are track chunks.
    #[error("header declares {declared} tracks, found {found}")]
    TrackCountMismatch { declared: u16, found: usize },
    /// Header fields outside of their valid range.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),
    /// System Common or System Realtime status bytes, which cannot appear in a track chunk.
    #[error("unexpected status byte {0:#04x} in track data")]
    UnexpectedStatus(u8),
    /// A malformed RMID (RIFF) wrapper.
    #[error("invalid rmid wrapper: {0}")]
    InvalidRiff(&'static str),
}

pub(crate) trait ResultExt<T> {
    fn context(self, ctx: &'static str) -> StdResult<T, Error>;
}
impl<T> ResultExt<T> for StdResult<T, Error> {
    #[inline]
    fn context(self, ctx: &'static str) -> StdResult<T, Error> {
        self.map_err(|err| err.chain_ctx(ctx))
    }
}

/// The result type used by the MIDI parser.
pub type Result<T> = StdResult<T, Error>;
pub(crate) use std::result::Result as StdResult;
