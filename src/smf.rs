//! Specific to the SMF packaging of MIDI streams: chunk framing, the header and tracks.

use crate::{
    event::{Event, EventDecoder, EventKind, MetaMessage},
    prelude::*,
    primitive::{Division, Format},
    riff,
};

/// Track chunks smaller than this (in total) are decoded on the calling thread.
#[cfg(feature = "parallel")]
const PARALLEL_ENABLE_THRESHOLD: usize = 3 * 1024;

/// A parsed Standard Midi File.
///
/// Borrows text and SysEx payloads from the raw file bytes.
/// Immutable once parsed: a failed parse produces no document at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiDocument<'a> {
    pub header: Header,
    /// Tracks in file order.
    pub tracks: Vec<Track<'a>>,
    /// Payload of the last Copyright meta event found in any track.
    pub copyright: Option<&'a [u8]>,
}
impl<'a> MidiDocument<'a> {
    /// Parse a complete `.mid` (or RMID `.rmi`) file.
    pub fn parse(raw: &'a [u8]) -> Result<MidiDocument<'a>> {
        let raw = riff::unwrap(raw)?;
        let mut cursor = ByteCursor::new(raw);
        let header = Header::read(&mut cursor).context("reading header chunk")?;
        let chunks = read_track_chunks(&mut cursor)?;
        ensure!(
            chunks.len() == header.track_count as usize,
            cursor.error(ErrorKind::TrackCountMismatch {
                declared: header.track_count,
                found: chunks.len(),
            })
        );
        if header.format == Format::SingleTrack && chunks.len() != 1 {
            log::warn!("format 0 file has {} tracks", chunks.len());
        }
        let tracks = decode_tracks(chunks)?;
        let copyright = tracks
            .iter()
            .flat_map(|track| track.events.iter())
            .filter_map(|ev| match ev.kind {
                EventKind::Meta(MetaMessage::Copyright(text)) => Some(text),
                _ => None,
            })
            .last();
        Ok(MidiDocument {
            header,
            tracks,
            copyright,
        })
    }

    /// The copyright notice as lossy UTF-8 text.
    pub fn copyright(&self) -> Option<Cow<'a, str>> {
        self.copyright.map(String::from_utf8_lossy)
    }
}

/// Collect the cursors of every `MTrk` chunk, skipping unknown chunks, until end of input.
fn read_track_chunks<'a>(cursor: &mut ByteCursor<'a>) -> Result<Vec<ByteCursor<'a>>> {
    let mut chunks = Vec::new();
    while !cursor.is_empty() {
        let id = cursor.read_exact(4).context("reading chunk id")?;
        let len = cursor.read_u32().context("reading chunk length")? as usize;
        let chunk = cursor.split_chunk(len);
        if id == b"MTrk" {
            chunks.push(chunk);
        } else {
            //Unknown chunk, skip it wholesale
            ensure!(
                chunk.unread().len() == len,
                cursor.error(ErrorKind::TruncatedInput)
            );
            log::debug!(
                "skipping unknown {:?} chunk of {} bytes",
                String::from_utf8_lossy(id),
                len
            );
        }
    }
    Ok(chunks)
}

fn decode_tracks(chunks: Vec<ByteCursor>) -> Result<Vec<Track>> {
    #[cfg(feature = "parallel")]
    {
        let total: usize = chunks.iter().map(|chunk| chunk.unread().len()).sum();
        if chunks.len() > 1 && total >= PARALLEL_ENABLE_THRESHOLD {
            use rayon::prelude::*;

            return chunks.into_par_iter().map(Track::decode).collect();
        }
    }
    chunks.into_iter().map(Track::decode).collect()
}

/// A MIDI file header.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Header {
    pub format: Format,
    /// Amount of track chunks declared by the header.
    pub track_count: u16,
    pub division: Division,
}
impl Header {
    pub fn new(format: Format, track_count: u16, division: Division) -> Header {
        Header {
            format,
            track_count,
            division,
        }
    }

    /// Read the complete `MThd` chunk, including its id and length.
    fn read(cursor: &mut ByteCursor) -> Result<Header> {
        ensure!(
            cursor.unread().starts_with(b"MThd"),
            cursor.error(ErrorKind::NotAnSmfFile)
        );
        cursor.read_exact(4)?;
        let len = cursor.read_u32()? as usize;
        if len != 6 {
            log::warn!("header chunk is {} bytes long, expected 6", len);
        }
        let mut raw = cursor.split_chunk(len);
        let format = Format::read(&mut raw)?;
        let track_count = raw.read_u16()?;
        let division = Division::read(&mut raw)?;
        Ok(Header::new(format, track_count, division))
    }

    /// Ticks per quarter note, if the division is metrical.
    pub fn ticks_per_quarter(&self) -> Option<u16> {
        match self.division {
            Division::TicksPerQuarterNote(tpq) => Some(tpq.as_int()),
            Division::TimeCode(..) => None,
        }
    }
}

/// A single track: its events in file order, plus metadata mirrored from its meta events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Track<'a> {
    /// Payload of the last Track Name meta event.
    pub name: Option<&'a [u8]>,
    /// Payload of the last Instrument Name meta event.
    pub instrument: Option<&'a [u8]>,
    /// Value of the last Sequence Number meta event.
    pub sequence_number: Option<u16>,
    pub events: Vec<Event<'a>>,
}
impl<'a> Track<'a> {
    /// Decode every event in a track chunk, until its byte budget is exhausted.
    fn decode(mut raw: ByteCursor<'a>) -> Result<Track<'a>> {
        let mut track = Track {
            events: Vec::with_capacity(raw.unread().len() / 3),
            ..Track::default()
        };
        let mut decoder = EventDecoder::new();
        while !raw.is_empty() {
            let ev = decoder.decode(&mut raw).context("reading track chunk")?;
            if let EventKind::Meta(meta) = ev.kind {
                match meta {
                    MetaMessage::TrackName(name) => track.name = Some(name),
                    MetaMessage::InstrumentName(name) => track.instrument = Some(name),
                    MetaMessage::SequenceNumber(num) => track.sequence_number = Some(num),
                    _ => {}
                }
            }
            track.events.push(ev);
        }
        if track.events.last().map(|ev| ev.kind) != Some(EventKind::Meta(MetaMessage::EndOfTrack))
        {
            log::warn!("track chunk ends without an end of track event");
        }
        Ok(track)
    }

    /// The track name as lossy UTF-8 text.
    pub fn name(&self) -> Option<Cow<'a, str>> {
        self.name.map(String::from_utf8_lossy)
    }

    /// The instrument name as lossy UTF-8 text.
    pub fn instrument(&self) -> Option<Cow<'a, str>> {
        self.instrument.map(String::from_utf8_lossy)
    }

    /// Iterate over the events along with their absolute position in ticks from the start of
    /// the track.
    pub fn timeline(&self) -> impl Iterator<Item = (u64, &Event<'a>)> + '_ {
        self.events.iter().scan(0u64, |tick, ev| {
            *tick += ev.delta.as_int() as u64;
            Some((*tick, ev))
        })
    }

    /// Absolute tick of the last event.
    pub fn duration_ticks(&self) -> u64 {
        self.events.iter().map(|ev| ev.delta.as_int() as u64).sum()
    }
}
