use anyhow::{Context, Result};
use clap::Parser;
use midiplay::{
    midir::MidirOutput,
    num::u24,
    output::{MidiConnection, MidiOutput, RecordingConnection},
    playback::{PlaybackConfig, Player, DEFAULT_TEMPO},
    EventKind, MetaMessage, MidiDocument,
};
use std::{fs, path::PathBuf};

const DEFAULT_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/test-asset/scale.mid");

/// Play a Standard Midi File through a MIDI output port.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// File to play.
    #[arg(default_value = DEFAULT_FILE)]
    file: PathBuf,
    /// Index of the output port to play through.
    #[arg(short, long, default_value_t = 0)]
    port: usize,
    /// List the available output ports and exit.
    #[arg(short, long)]
    list_ports: bool,
    /// Tempo in microseconds per quarter note until the file sets one.
    #[arg(short, long, default_value_t = DEFAULT_TEMPO.as_int())]
    tempo: u32,
    /// Playback speed multiplier for sleeps (2.0 plays at half speed, must be finite and not
    /// negative).
    #[arg(long, default_value_t = 1.0)]
    time_scale: f64,
    /// Print the messages that would be sent instead of opening a port.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_ports {
        let output = MidirOutput::new()?;
        for (i, name) in output.port_names()?.iter().enumerate() {
            println!("{}: {}", i, name);
        }
        return Ok(());
    }

    let raw = fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let doc = MidiDocument::parse(&raw)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    describe(&doc);

    let tempo = u24::try_from(args.tempo)
        .with_context(|| format!("tempo {} does not fit in 24 bits", args.tempo))?;
    let player = Player::new(PlaybackConfig {
        initial_tempo: tempo,
        time_scale: args.time_scale,
    });

    if args.dry_run {
        let mut recording = RecordingConnection::new();
        player.play(&doc, &mut recording)?;
        for msg in recording.messages() {
            println!("{:>10.3?} {:02X?}", msg.at, msg.bytes);
        }
    } else {
        let output = MidirOutput::new()?;
        let mut conn = output.open(args.port)?;
        player.play(&doc, &mut conn)?;
        conn.close();
    }
    Ok(())
}

fn describe(doc: &MidiDocument) {
    log::info!(
        "format {}, {} tracks, division {:?}",
        doc.header.format.as_int(),
        doc.tracks.len(),
        doc.header.division
    );
    if let Some(copyright) = doc.copyright() {
        log::info!("copyright: {}", copyright);
    }
    for (i, track) in doc.tracks.iter().enumerate() {
        let tempo_changes = track
            .events
            .iter()
            .filter(|ev| matches!(ev.kind, EventKind::Meta(MetaMessage::SetTempo(_))))
            .count();
        log::info!(
            "track {}: {:?} ({}), {} events over {} ticks, {} tempo changes",
            i,
            track.name().unwrap_or_default(),
            track.instrument().unwrap_or_default(),
            track.events.len(),
            track.duration_ticks(),
            tempo_changes
        );
    }
}
