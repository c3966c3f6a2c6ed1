//! Simple building-block data that can be read in one go.
//! All primitives have a known, fixed size.

use crate::prelude::*;

/// Slightly restricted integers.
macro_rules! restricted_int {
    {$(#[$attr:meta])* $name:ident : $inner:tt => $bits:expr} => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default)]
        #[repr(transparent)]
        #[allow(non_camel_case_types)]
        pub struct $name($inner);
        impl From<$inner> for $name {
            /// Lossy conversion, loses top bits.
            #[inline]
            fn from(raw: $inner) -> $name {
                $name::from_int_lossy(raw)
            }
        }
        impl From<$name> for $inner {
            #[inline]
            fn from(restricted: $name) -> $inner {restricted.0}
        }
        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
        impl $name {
            const MASK: $inner = (1 << $bits) - 1;

            /// The maximum value that this restricted integer can hold.
            #[inline]
            pub const fn max_value() -> $name {
                $name (Self::MASK)
            }

            /// Creates a restricted int from its non-restricted counterpart by masking off the
            /// extra bits.
            #[inline]
            pub const fn new(raw: $inner) -> $name {
                $name (raw & Self::MASK)
            }

            /// Creates a restricted int from its non-restricted counterpart by masking off the
            /// extra bits.
            #[inline]
            pub const fn from_int_lossy(raw: $inner) -> $name {
                $name (raw & Self::MASK)
            }

            /// Returns `Some` if the raw integer is within range of the restricted integer, and
            /// `None` otherwise.
            #[inline]
            pub fn try_from(raw: $inner) -> Option<$name> {
                if raw <= Self::MASK {
                    Some($name(raw))
                }else{
                    None
                }
            }

            /// Get the inner integer out of the wrapper.
            /// The inner integer is guaranteed to be in range of the restricted wrapper.
            #[inline]
            pub fn as_int(self) -> $inner {
                Into::into(self)
            }
        }
        impl PartialEq<$inner> for $name {
            fn eq(&self, rhs: &$inner) -> bool {
                self.as_int() == *rhs
            }
        }
        impl PartialEq<$name> for $inner {
            fn eq(&self, rhs: &$name) -> bool {
                *self == rhs.as_int()
            }
        }
    };
}
restricted_int! {
    /// A 15-bit integer type.
    ///
    /// Wraps the `u16` type and ensures that the top bit is always zero.
    u15: u16 => 15
}
restricted_int! {
    /// A 14-bit integer type.
    ///
    /// Wraps the `u16` type and ensures that the top two bits are always zero.
    u14: u16 => 14
}
restricted_int! {
    /// A 7-bit integer type, the range of MIDI data bytes.
    ///
    /// Wraps the `u8` type and ensures that the top bit is always zero.
    u7: u8 => 7
}
restricted_int! {
    /// A 4-bit integer type, the range of MIDI channels.
    ///
    /// Wraps the `u8` type and ensures that the top 4 bits are always zero.
    u4: u8 => 4
}
restricted_int! {
    /// A 2-bit integer type.
    ///
    /// Wraps the `u8` type and ensures that the top 6 bits are always zero.
    u2: u8 => 2
}
restricted_int! {
    /// A 24-bit integer type.
    ///
    /// Wraps the `u32` type and ensures that the top 8 bits are always zero.
    u24: u32 => 24
}
restricted_int! {
    /// Referred to in the MIDI standard as "variable length int".
    u28: u32 => 28
}

/// The order in which tracks should be laid out when playing back this SMF file.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Format {
    /// Format 0: this file should have a single track only.
    SingleTrack,
    /// Format 1: this file has several tracks that should be played simultaneously.
    ///
    /// Usually the first track controls tempo and other song metadata.
    Parallel,
    /// Format 2: this file has several tracks, each one a separate song.
    Sequential,
}
impl Format {
    pub(crate) fn read(raw: &mut ByteCursor) -> Result<Format> {
        let at = raw.offset();
        let format = raw.read_u16()?;
        Ok(match format {
            0 => Format::SingleTrack,
            1 => Format::Parallel,
            2 => Format::Sequential,
            _ => bail!(Error::new(ErrorKind::InvalidHeader("invalid smf format"), at)),
        })
    }

    /// The numeric format code as stored in the header chunk.
    pub fn as_int(self) -> u16 {
        match self {
            Format::SingleTrack => 0,
            Format::Parallel => 1,
            Format::Sequential => 2,
        }
    }
}

/// The timing for an SMF file.
/// This can be in ticks/beat or ticks/second.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Division {
    /// Specifies ticks per quarter note as a 15-bit integer.
    ///
    /// The length of a quarter note is given by the tempo, which is set through
    /// [`MetaMessage::SetTempo`](enum.MetaMessage.html#variant.SetTempo) events.
    TicksPerQuarterNote(u15),
    /// Specifies ticks/second by dividing a second into frames and then into subframes.
    /// Therefore the length of a tick is `1/fps/ticks_per_frame`.
    TimeCode(Fps, u8),
}
impl Division {
    /// The top bit of the 2-byte field selects between the two variants.
    pub(crate) fn read(raw: &mut ByteCursor) -> Result<Division> {
        let at = raw.offset();
        let field = raw.read_u16()?;
        if bit_range(field, 15..16) != 0 {
            // Upper byte is the negated fps as a two's complement `i8`
            let fps = (bit_range(field, 8..16) as u8 as i8).wrapping_neg() as u8;
            let ticks_per_frame = bit_range(field, 0..8) as u8;
            let fps = Fps::from_int(fps)
                .ok_or_else(|| Error::new(ErrorKind::InvalidHeader("invalid smpte fps"), at))?;
            Ok(Division::TimeCode(fps, ticks_per_frame))
        } else {
            Ok(Division::TicksPerQuarterNote(u15::from(field)))
        }
    }

    /// Encode into the 2-byte header representation.
    pub fn encode(&self) -> [u8; 2] {
        match self {
            Division::TicksPerQuarterNote(tpq) => tpq.as_int().to_be_bytes(),
            Division::TimeCode(fps, ticks_per_frame) => {
                [(fps.as_int() as i8).wrapping_neg() as u8, *ticks_per_frame]
            }
        }
    }
}

/// A timestamp encoding an SMPTE time of the day, as found in the SMPTE Offset meta event.
///
/// Fields are stored as found in the file; see [`SmpteTime::new`](#method.new) for a validating
/// constructor.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct SmpteTime {
    hour: u8,
    minute: u8,
    second: u8,
    frame: u8,
    subframe: u8,
    fps: Fps,
}
impl SmpteTime {
    /// Create a new SMPTE timestamp, checking that every component is in range:
    ///
    /// - `hour` is inside [0, 23]
    /// - `minute` is inside [0, 59]
    /// - `second` is inside [0, 59]
    /// - `frame` is inside [0, fps - 1]
    /// - `subframe` is inside [0, 99]
    pub fn new(
        hour: u8,
        minute: u8,
        second: u8,
        frame: u8,
        subframe: u8,
        fps: Fps,
    ) -> Option<SmpteTime> {
        let in_range =
            hour < 24 && minute < 60 && second < 60 && frame < fps.as_int() && subframe < 100;
        if in_range {
            Some(SmpteTime {
                hour,
                minute,
                second,
                frame,
                subframe,
                fps,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    #[inline]
    pub fn minute(&self) -> u8 {
        self.minute
    }

    #[inline]
    pub fn second(&self) -> u8 {
        self.second
    }

    /// The meaning of this value depends on the value of `fps`.
    #[inline]
    pub fn frame(&self) -> u8 {
        self.frame
    }

    /// Hundredths of a frame.
    #[inline]
    pub fn subframe(&self) -> u8 {
        self.subframe
    }

    #[inline]
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Convert the second + frame + subframe components of this timestamp into a single
    /// floating-point number of seconds.
    /// Note that this does not include the hour and minute components.
    pub fn second_f32(&self) -> f32 {
        self.second as f32
            + ((self.frame as f32 + self.subframe as f32 / 100.0) / self.fps.as_f32())
    }

    /// Decode the 5-byte payload of an SMPTE Offset meta event.
    pub(crate) fn decode(data: &[u8; 5]) -> SmpteTime {
        let hour_fps = data[0];
        SmpteTime {
            hour: bit_range(hour_fps, 0..5),
            minute: data[1],
            second: data[2],
            frame: data[3],
            subframe: data[4],
            fps: Fps::from_code(u2::from(bit_range(hour_fps, 5..7))),
        }
    }
}

/// One of the four FPS values available for SMPTE times, as defined by the MIDI standard.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Fps {
    /// 24 frames per second.
    Fps24,
    /// 25 frames per second.
    Fps25,
    /// Actually `29.97 = 30 / 1.001` frames per second.
    Fps29,
    /// 30 frames per second.
    Fps30,
}
impl Fps {
    /// Does the conversion from a 2-bit fps code to an `Fps` value.
    pub(crate) fn from_code(code: u2) -> Fps {
        match code.as_int() {
            0 => Fps::Fps24,
            1 => Fps::Fps25,
            2 => Fps::Fps29,
            _ => Fps::Fps30,
        }
    }

    /// Converts an integer representing the semantic fps to an `Fps` value (ie. `24` -> `Fps24`).
    #[inline]
    pub fn from_int(raw: u8) -> Option<Fps> {
        Some(match raw {
            24 => Fps::Fps24,
            25 => Fps::Fps25,
            29 => Fps::Fps29,
            30 => Fps::Fps30,
            _ => return None,
        })
    }

    /// Get the integral approximate fps out.
    #[inline]
    pub fn as_int(self) -> u8 {
        match self {
            Fps::Fps24 => 24,
            Fps::Fps25 => 25,
            Fps::Fps29 => 29,
            Fps::Fps30 => 30,
        }
    }

    /// Get the actual `f32` fps out.
    #[inline]
    pub fn as_f32(self) -> f32 {
        match self {
            Fps::Fps29 => 30.0 / 1.001,
            other => other.as_int() as f32,
        }
    }
}
