//! Real-time playback of a parsed document.
//!
//! Every track runs on its own thread, walking its events in order and sleeping for each
//! event's delta time before emitting it. All track threads share a single
//! [`TempoState`](struct.TempoState.html), so a Set Tempo event in any track changes the pace of
//! every track from their next event onwards.

use crate::{
    event::{EventKind, MetaMessage},
    output::MidiConnection,
    prelude::*,
    primitive::Division,
    smf::{MidiDocument, Track},
};
use crossbeam_channel::{self as channel, select, Receiver, Sender};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread,
    time::{Duration, Instant},
};
use thiserror::Error as ThisError;

/// Tempo assumed until the first Set Tempo event: 120 beats per minute.
pub const DEFAULT_TEMPO: u24 = u24::new(500_000);

#[derive(Debug, ThisError)]
pub enum PlayError<E> {
    /// Only metrical (ticks per quarter note) timing can be paced.
    #[error("unsupported timing division for playback: {0:?}")]
    UnsupportedTimingDivision(Division),
    /// The time scale is negative, infinite or NaN.
    #[error("invalid playback time scale {0}")]
    InvalidTimeScale(f64),
    /// The output connection failed to send a message.
    #[error("failed to send midi message")]
    Sink(#[source] E),
}

/// Playback settings.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Microseconds per quarter note until a Set Tempo event is played.
    pub initial_tempo: u24,
    /// Multiplier applied to every sleep.
    ///
    /// `1.0` is real time, `0.5` twice as fast, `0.0` sends everything without sleeping.
    /// Must be finite and not negative.
    pub time_scale: f64,
}
impl Default for PlaybackConfig {
    fn default() -> PlaybackConfig {
        PlaybackConfig {
            initial_tempo: DEFAULT_TEMPO,
            time_scale: 1.0,
        }
    }
}

/// What happened during a completed playback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlaybackSummary {
    /// Amount of messages sent to the output.
    pub messages_sent: usize,
    /// Whether playback was cut short through a [`PlayHandle`](struct.PlayHandle.html).
    pub stopped: bool,
}

/// The current tempo and the tick length derived from it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TempoState {
    micros_per_quarter: u24,
    ticks_per_quarter: u16,
    seconds_per_tick: f64,
}
impl TempoState {
    pub fn new(micros_per_quarter: u24, ticks_per_quarter: u16) -> TempoState {
        TempoState {
            micros_per_quarter,
            ticks_per_quarter,
            seconds_per_tick: seconds_per_tick(micros_per_quarter, ticks_per_quarter),
        }
    }

    pub fn micros_per_quarter(&self) -> u24 {
        self.micros_per_quarter
    }

    pub fn seconds_per_tick(&self) -> f64 {
        self.seconds_per_tick
    }

    /// Change the tempo, recomputing the tick length.
    pub fn set_tempo(&mut self, micros_per_quarter: u24) {
        *self = TempoState::new(micros_per_quarter, self.ticks_per_quarter);
    }

    /// How long `ticks` last at the current tempo.
    pub fn duration_of(&self, ticks: u28) -> Duration {
        Duration::from_secs_f64(ticks.as_int() as f64 * self.seconds_per_tick)
    }
}

/// Seconds per tick for a tempo in microseconds per quarter note.
pub fn seconds_per_tick(micros_per_quarter: u24, ticks_per_quarter: u16) -> f64 {
    micros_per_quarter.as_int() as f64 / (1_000_000.0 * ticks_per_quarter as f64)
}

/// Stops a playback in progress from any thread.
///
/// Cloning the handle is cheap, and all clones control the same [`Player`](struct.Player.html).
/// Stopping is permanent: later calls to `Player::play` return right away.
#[derive(Clone, Debug)]
pub struct PlayHandle {
    stop: Arc<Mutex<Option<Sender<()>>>>,
    stopped: Receiver<()>,
}
impl PlayHandle {
    fn new() -> PlayHandle {
        //Nothing is ever sent, dropping the sender wakes every receiver at once
        let (stop, stopped) = channel::bounded(0);
        PlayHandle {
            stop: Arc::new(Mutex::new(Some(stop))),
            stopped,
        }
    }

    /// Interrupt every track at its next sleep.
    pub fn stop(&self) {
        if lock(&self.stop).take().is_some() {
            log::debug!("playback stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        lock(&self.stop).is_none()
    }
}

/// Plays documents to a MIDI connection, one thread per track.
#[derive(Debug)]
pub struct Player {
    config: PlaybackConfig,
    handle: PlayHandle,
}
impl Default for Player {
    fn default() -> Player {
        Player::new(PlaybackConfig::default())
    }
}
impl Player {
    pub fn new(config: PlaybackConfig) -> Player {
        Player {
            config,
            handle: PlayHandle::new(),
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// A handle that can stop this player from another thread.
    pub fn handle(&self) -> PlayHandle {
        self.handle.clone()
    }

    /// Play every track of `doc` simultaneously, returning once all of them are done.
    ///
    /// The first send failure stops every other track and is returned. Messages that were
    /// already sent stay sent.
    pub fn play<C>(
        &self,
        doc: &MidiDocument,
        conn: &mut C,
    ) -> StdResult<PlaybackSummary, PlayError<C::Error>>
    where
        C: MidiConnection + Send,
        C::Error: Send,
    {
        let ticks_per_quarter = match doc.header.division {
            Division::TicksPerQuarterNote(tpq) if tpq.as_int() > 0 => tpq.as_int(),
            division => return Err(PlayError::UnsupportedTimingDivision(division)),
        };
        let time_scale = self.config.time_scale;
        if !time_scale.is_finite() || time_scale < 0.0 {
            return Err(PlayError::InvalidTimeScale(time_scale));
        }
        log::info!(
            "playing {} tracks at {} ticks per quarter note",
            doc.tracks.len(),
            ticks_per_quarter
        );
        let (abort, aborted) = channel::bounded(0);
        let session = Session {
            tempo: Mutex::new(TempoState::new(self.config.initial_tempo, ticks_per_quarter)),
            time_scale,
            conn: Mutex::new(conn),
            sent: AtomicUsize::new(0),
            start: Instant::now(),
            stopped: self.handle.stopped.clone(),
            abort: Mutex::new(Some(abort)),
            aborted,
        };
        let first_err = thread::scope(|scope| {
            let units = doc
                .tracks
                .iter()
                .enumerate()
                .map(|(idx, track)| {
                    let session = &session;
                    scope.spawn(move || session.run_track(idx, track))
                })
                .collect::<Vec<_>>();
            let mut first_err = None;
            for unit in units {
                match unit.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        first_err.get_or_insert(err);
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            first_err
        });
        if let Some(err) = first_err {
            return Err(PlayError::Sink(err));
        }
        let summary = PlaybackSummary {
            messages_sent: session.sent.load(Ordering::Relaxed),
            stopped: self.handle.is_stopped(),
        };
        log::info!(
            "playback {} after {:.2?}, {} messages sent",
            if summary.stopped { "stopped" } else { "finished" },
            session.start.elapsed(),
            summary.messages_sent
        );
        Ok(summary)
    }
}

/// State shared by the track threads of one `play` call.
struct Session<'c, C> {
    tempo: Mutex<TempoState>,
    time_scale: f64,
    conn: Mutex<&'c mut C>,
    sent: AtomicUsize,
    start: Instant,
    /// Disconnected when the user stops playback.
    stopped: Receiver<()>,
    /// Dropped by the first track that fails, to wake up the others.
    abort: Mutex<Option<Sender<()>>>,
    aborted: Receiver<()>,
}
impl<C: MidiConnection> Session<'_, C> {
    fn run_track(&self, idx: usize, track: &Track) -> StdResult<(), C::Error> {
        let result = self.play_events(idx, track);
        if result.is_err() {
            lock(&self.abort).take();
        }
        result
    }

    fn play_events(&self, idx: usize, track: &Track) -> StdResult<(), C::Error> {
        //`None` once the deadline is too far away to represent
        let mut deadline = Some(self.start);
        for ev in track.events.iter() {
            deadline = deadline.and_then(|at| at.checked_add(self.delay(ev.delta)?));
            if self.sleep_until(deadline) {
                log::debug!("track {} interrupted", idx);
                return Ok(());
            }
            match ev.kind {
                EventKind::Midi { channel, message } => {
                    let mut buf = [0; 3];
                    let bytes = message.encode(channel, &mut buf);
                    lock(&self.conn).send(bytes)?;
                    self.sent.fetch_add(1, Ordering::Relaxed);
                }
                EventKind::Meta(MetaMessage::SetTempo(micros)) => {
                    lock(&self.tempo).set_tempo(micros);
                    log::debug!(
                        "track {} set tempo to {} us per quarter note ({:.1} bpm)",
                        idx,
                        micros,
                        60_000_000.0 / micros.as_int().max(1) as f64
                    );
                }
                _ => {}
            }
        }
        log::debug!("track {} done, {} events", idx, track.events.len());
        Ok(())
    }

    /// Read the current tempo and compute the delay under a single lock.
    ///
    /// Returns `None` if the scaled delay does not fit in a `Duration`.
    fn delay(&self, ticks: u28) -> Option<Duration> {
        let delay = lock(&self.tempo).duration_of(ticks);
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.time_scale).ok()
    }

    /// Sleep until `deadline`, returning `true` if playback should end instead.
    ///
    /// Without a deadline, waits until playback is stopped or aborted.
    fn sleep_until(&self, deadline: Option<Instant>) -> bool {
        let deadline = match deadline {
            Some(deadline) => deadline,
            None => {
                select! {
                    recv(self.stopped) -> _ => {},
                    recv(self.aborted) -> _ => {},
                }
                return true;
            }
        };
        let timeout = deadline.saturating_duration_since(Instant::now());
        select! {
            recv(self.stopped) -> _ => true,
            recv(self.aborted) -> _ => true,
            default(timeout) => false,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
