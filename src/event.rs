//! All sort of events and their parsers.

use crate::{prelude::*, primitive::SmpteTime, varlen};

/// Represents a parsed SMF track event.
///
/// Consists of a delta time (in MIDI ticks relative to the previous event in the same track) and
/// the actual track event.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Event<'a> {
    /// How many MIDI ticks after the previous event should this event fire.
    pub delta: u28,
    /// The type of event along with event-specific data.
    pub kind: EventKind<'a>,
}

/// Represents the different kinds of SMF events and their associated data.
///
/// It notably does *not* include the timing of the event; the `Event` struct is responsible
/// for this.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum EventKind<'a> {
    /// A message associated to a MIDI channel carrying musical data.
    ///
    /// Usually, the bulk of MIDI data is these kind of messages.
    Midi {
        /// The MIDI channel that this event is associated with.
        channel: u4,
        /// The MIDI message type and associated data.
        message: MidiMessage,
    },
    /// A System Exclusive message (status `0xF0`), carrying arbitrary data.
    ///
    /// The data bytes included here do not include the implicit `0xF0` prefix.
    SystemExclusive(&'a [u8]),
    /// A continuation packet or escape sequence (status `0xF7`).
    EndOfExclusive(&'a [u8]),
    /// A meta-message, giving extra information for correct playback, like tempo, song name,
    /// lyrics, etc...
    Meta(MetaMessage<'a>),
}

/// Represents a MIDI channel voice message.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum MidiMessage {
    /// Stop playing a note.
    NoteOff {
        /// The MIDI key to stop playing.
        key: u7,
        /// The velocity with which to stop playing it.
        vel: u7,
    },
    /// Start playing a note.
    NoteOn {
        /// The key to start playing.
        key: u7,
        /// The velocity (strength) with which to press it.
        ///
        /// Note that by convention a `NoteOn` message with a velocity of 0 is equivalent to a
        /// `NoteOff`.
        vel: u7,
    },
    /// Modify the velocity of a note after it has been played.
    PolyphonicAftertouch {
        /// The key for which to modify its velocity.
        key: u7,
        /// The new velocity for the key.
        vel: u7,
    },
    /// Modify the value of a MIDI controller.
    ControlChange {
        /// The controller to modify.
        controller: u7,
        /// The value to set it to.
        value: u7,
    },
    /// Change the program (also known as instrument) for a channel.
    ProgramChange { program: u7 },
    /// Change the note velocity of a whole channel at once, without starting new notes.
    ChannelAftertouch { vel: u7 },
    /// Set the pitch bend value for the entire channel.
    PitchBend { bend: PitchBend },
}
impl MidiMessage {
    /// Midi messages have a known length.
    pub(crate) fn msg_length(status: u8) -> usize {
        const LENGTH_BY_STATUS: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 1, 1, 2, 0];
        LENGTH_BY_STATUS[(status >> 4) as usize] as usize
    }

    /// Read the data bytes following `status`, which must be in `0x80 ..= 0xEF`.
    fn read(status: u8, raw: &mut ByteCursor) -> Result<(u4, MidiMessage)> {
        let mut data = [u7::new(0); 2];
        for byte in data.iter_mut().take(Self::msg_length(status)) {
            *byte = raw.read_u7()?;
        }
        let channel = u4::from(status);
        let msg = match status >> 4 {
            0x8 => MidiMessage::NoteOff {
                key: data[0],
                vel: data[1],
            },
            0x9 => MidiMessage::NoteOn {
                key: data[0],
                vel: data[1],
            },
            0xA => MidiMessage::PolyphonicAftertouch {
                key: data[0],
                vel: data[1],
            },
            0xB => MidiMessage::ControlChange {
                controller: data[0],
                value: data[1],
            },
            0xC => MidiMessage::ProgramChange { program: data[0] },
            0xD => MidiMessage::ChannelAftertouch { vel: data[0] },
            _ => {
                //Note the little-endian order, contrasting with the default big-endian order of
                //Standard Midi Files
                let lsb = data[0].as_int() as u16;
                let msb = data[1].as_int() as u16;
                MidiMessage::PitchBend {
                    bend: PitchBend(u14::from(msb << 7 | lsb)),
                }
            }
        };
        Ok((channel, msg))
    }

    /// Get the raw status nibble for this MIDI message type.
    pub fn status_nibble(&self) -> u8 {
        match self {
            MidiMessage::NoteOff { .. } => 0x8,
            MidiMessage::NoteOn { .. } => 0x9,
            MidiMessage::PolyphonicAftertouch { .. } => 0xA,
            MidiMessage::ControlChange { .. } => 0xB,
            MidiMessage::ProgramChange { .. } => 0xC,
            MidiMessage::ChannelAftertouch { .. } => 0xD,
            MidiMessage::PitchBend { .. } => 0xE,
        }
    }

    /// Write the complete wire message (status byte plus data bytes) into `buf`, returning the
    /// used part of it.
    pub fn encode<'b>(&self, channel: u4, buf: &'b mut [u8; 3]) -> &'b [u8] {
        buf[0] = self.status_nibble() << 4 | channel.as_int();
        let len = match *self {
            MidiMessage::NoteOff { key, vel }
            | MidiMessage::NoteOn { key, vel }
            | MidiMessage::PolyphonicAftertouch { key, vel } => {
                buf[1] = key.as_int();
                buf[2] = vel.as_int();
                3
            }
            MidiMessage::ControlChange { controller, value } => {
                buf[1] = controller.as_int();
                buf[2] = value.as_int();
                3
            }
            MidiMessage::ProgramChange { program } => {
                buf[1] = program.as_int();
                2
            }
            MidiMessage::ChannelAftertouch { vel } => {
                buf[1] = vel.as_int();
                2
            }
            MidiMessage::PitchBend { bend } => {
                let raw = bend.0.as_int();
                buf[1] = (raw & 0x7F) as u8;
                buf[2] = (raw >> 7) as u8;
                3
            }
        };
        &buf[..len]
    }
}

/// The value of a pitch bend, represented as 14 bits.
///
/// A value of `0x0000` indicates full bend downwards.
/// A value of `0x2000` indicates no bend.
/// A value of `0x3FFF` indicates full bend upwards.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct PitchBend(pub u14);
impl PitchBend {
    /// Returns an int in the range `[-0x2000, 0x1FFF]`.
    #[inline]
    pub fn as_int(self) -> i16 {
        self.0.as_int() as i16 - 0x2000
    }

    /// Returns an `f32` in the range `[-1.0, 1.0)`.
    #[inline]
    pub fn as_f32(self) -> f32 {
        self.as_int() as f32 * (1.0 / 0x2000 as f32)
    }
}

/// Major or minor, as carried by the Key Signature meta event.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Scale {
    Major,
    Minor,
}

/// A "meta message", as defined by the SMF format.
/// These events carry metadata about the track, such as tempo, time signature, copyright, etc...
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum MetaMessage<'a> {
    /// Number of the sequence, for identifying patterns in format 2 files.
    SequenceNumber(u16),
    /// Arbitrary text associated to an instant.
    Text(&'a [u8]),
    /// A copyright notice.
    Copyright(&'a [u8]),
    /// Information about the name of the track.
    TrackName(&'a [u8]),
    /// Information about the name of the current instrument.
    InstrumentName(&'a [u8]),
    /// Arbitrary lyric information associated to an instant.
    Lyric(&'a [u8]),
    /// Arbitrary marker text associated to an instant.
    Marker(&'a [u8]),
    /// Arbitrary cue point text associated to an instant.
    CuePoint(&'a [u8]),
    /// Information about the name of the current program.
    ProgramName(&'a [u8]),
    /// Name of the device that this file was intended to be played with.
    DeviceName(&'a [u8]),
    /// The MIDI channel that following meta and sysex events refer to.
    ChannelPrefix(u4),
    /// Number of the MIDI port that this file was intended to be played with.
    MidiPort(u7),
    /// Obligatory at track end.
    EndOfTrack,
    /// Amount of microseconds per quarter note.
    ///
    /// Usually appears at the beginning of a track, before any midi events are sent, but there
    /// are no guarantees.
    SetTempo(u24),
    /// Offset of the track start from the start of the sequence, in SMPTE time.
    SmpteOffset(SmpteTime),
    TimeSignature {
        numerator: u8,
        /// The denominator is `2^denominator_pow2`.
        denominator_pow2: u8,
        /// MIDI clocks per metronome click.
        clocks_per_tick: u8,
        notated_32nd_per_beat: u8,
    },
    KeySignature {
        /// Negative numbers indicate number of flats and positive numbers number of sharps.
        sharps_or_flats: i8,
        scale: Scale,
    },
    /// Arbitrary data intended for the sequencer.
    /// This data is never sent to a device.
    SequencerSpecific(&'a [u8]),
    /// A meta-message of unknown type.
    ///
    /// The first `u8` is the raw meta-message identifier byte.
    /// The slice is the actual payload of the meta-message.
    Unknown(u8, &'a [u8]),
}
impl<'a> MetaMessage<'a> {
    /// Meta types with a length fixed by the standard.
    fn fixed_length(type_byte: u8) -> Option<u8> {
        Some(match type_byte {
            0x00 => 2,
            0x20 => 1,
            0x21 => 1,
            0x2F => 0,
            0x51 => 3,
            0x54 => 5,
            0x58 => 4,
            0x59 => 2,
            _ => return None,
        })
    }

    /// Read everything after the `0xFF` status: type byte, variable length and payload.
    fn read(raw: &mut ByteCursor<'a>) -> Result<MetaMessage<'a>> {
        let type_byte = raw.read_u8()?;
        let len_at = raw.offset();
        let len = varlen::read(raw)?.as_int();
        if let Some(expected) = Self::fixed_length(type_byte) {
            ensure!(
                len == expected as u32,
                Error::new(
                    ErrorKind::InvalidMetaLength {
                        meta_type: type_byte,
                        expected,
                        found: len,
                    },
                    len_at,
                )
            );
        }
        let mut data = raw.read_cursor(len as usize)?;
        Ok(match type_byte {
            0x00 => MetaMessage::SequenceNumber(data.read_u16()?),
            0x01 => MetaMessage::Text(data.unread()),
            0x02 => MetaMessage::Copyright(data.unread()),
            0x03 => MetaMessage::TrackName(data.unread()),
            0x04 => MetaMessage::InstrumentName(data.unread()),
            0x05 => MetaMessage::Lyric(data.unread()),
            0x06 => MetaMessage::Marker(data.unread()),
            0x07 => MetaMessage::CuePoint(data.unread()),
            0x08 => MetaMessage::ProgramName(data.unread()),
            0x09 => MetaMessage::DeviceName(data.unread()),
            0x20 => {
                let channel = data.peek_byte()?;
                MetaMessage::ChannelPrefix(
                    u4::try_from(channel)
                        .ok_or_else(|| data.error(ErrorKind::InvalidDataByte(channel)))?,
                )
            }
            0x21 => MetaMessage::MidiPort(data.read_u7()?),
            0x2F => MetaMessage::EndOfTrack,
            0x51 => MetaMessage::SetTempo(data.read_u24()?),
            0x54 => {
                let mut bytes = [0; 5];
                bytes.copy_from_slice(data.read_exact(5)?);
                MetaMessage::SmpteOffset(SmpteTime::decode(&bytes))
            }
            0x58 => MetaMessage::TimeSignature {
                numerator: data.read_u8()?,
                denominator_pow2: data.read_u8()?,
                clocks_per_tick: data.read_u8()?,
                notated_32nd_per_beat: data.read_u8()?,
            },
            0x59 => MetaMessage::KeySignature {
                sharps_or_flats: data.read_u8()? as i8,
                scale: if data.read_u8()? == 0 {
                    Scale::Major
                } else {
                    Scale::Minor
                },
            },
            0x7F => MetaMessage::SequencerSpecific(data.unread()),
            _ => MetaMessage::Unknown(type_byte, data.unread()),
        })
    }

    /// Text carried by text-like meta events, decoded as lossy UTF-8.
    pub fn text(&self) -> Option<Cow<'a, str>> {
        match *self {
            MetaMessage::Text(raw)
            | MetaMessage::Copyright(raw)
            | MetaMessage::TrackName(raw)
            | MetaMessage::InstrumentName(raw)
            | MetaMessage::Lyric(raw)
            | MetaMessage::Marker(raw)
            | MetaMessage::CuePoint(raw)
            | MetaMessage::ProgramName(raw)
            | MetaMessage::DeviceName(raw) => Some(String::from_utf8_lossy(raw)),
            _ => None,
        }
    }
}

/// Decodes the events of a single track, one at a time.
///
/// Keeps the running status of the track between calls, so each track chunk needs its own
/// decoder.
#[derive(Clone, Debug, Default)]
pub struct EventDecoder {
    running_status: Option<u8>,
}
impl EventDecoder {
    pub fn new() -> EventDecoder {
        EventDecoder::default()
    }

    /// Get the current running status of the track.
    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// Decode the next event from a cursor scoped to the track chunk.
    ///
    /// In case of failure the cursor might be left in the middle of an event!
    pub fn decode<'a>(&mut self, raw: &mut ByteCursor<'a>) -> Result<Event<'a>> {
        let delta = varlen::read(raw).context("reading event delta time")?;
        let kind = self.decode_kind(raw).context("reading event")?;
        Ok(Event { delta, kind })
    }

    fn decode_kind<'a>(&mut self, raw: &mut ByteCursor<'a>) -> Result<EventKind<'a>> {
        let status_at = raw.offset();
        let mut status = raw.peek_byte()?;
        if status < 0x80 {
            //Running status! Leave the data byte in place
            status = self
                .running_status
                .ok_or_else(|| raw.error(ErrorKind::MissingRunningStatus))?;
        } else {
            raw.read_u8()?;
        }
        //Delegate further parsing depending on status
        let kind = match status {
            0x80..=0xEF => {
                self.running_status = Some(status);
                let (channel, message) = MidiMessage::read(status, raw)?;
                EventKind::Midi { channel, message }
            }
            0xFF => {
                let meta = MetaMessage::read(raw).context("reading meta event")?;
                if meta == MetaMessage::EndOfTrack {
                    //A chunk cut short by the end of input is missing bytes, not trailing them
                    ensure!(
                        raw.unread().len() >= raw.remaining(),
                        Error::new(ErrorKind::TruncatedInput, raw.offset() + raw.unread().len())
                    );
                    ensure!(
                        raw.is_empty(),
                        raw.error(ErrorKind::TrailingTrackData(raw.remaining()))
                    );
                }
                EventKind::Meta(meta)
            }
            0xF0 => EventKind::SystemExclusive(
                varlen::read_slice(raw).context("reading sysex event")?,
            ),
            0xF7 => EventKind::EndOfExclusive(
                varlen::read_slice(raw).context("reading escape event")?,
            ),
            _ => bail!(Error::new(ErrorKind::UnexpectedStatus(status), status_at)),
        };
        Ok(kind)
    }
}
