use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

use midi_keyframes::{JsonSidecar, MidiDocument, Options, Recorder, animate};

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
struct Opt {
    /// Path to the MIDI file (format 0 or 1)
    midi: PathBuf,
    /// Frames per second of the animation
    #[arg(long, default_value_t = 24)]
    fps: u32,
    /// One channel per MIDI channel instead of one per track
    #[arg(long)]
    by_channel: bool,
    /// Channel configuration file, defaults to the MIDI file with a .json extension
    #[arg(long)]
    config: Option<PathBuf>,
    /// Where to write the recorded entities and keyframes as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct Export<'a> {
    frame_end: f64,
    #[serde(flatten)]
    scene: &'a Recorder,
}

fn setup_tracing() {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::builder().parse_lossy(directives))
        .init();
}

fn main() -> Result<()> {
    setup_tracing();
    let opt = Opt::parse();

    let doc = MidiDocument::open(&opt.midi).with_context(|| format!("loading {}", opt.midi.display()))?;
    let mut store = match &opt.config {
        Some(path) => JsonSidecar::new(path),
        None => JsonSidecar::beside(&opt.midi),
    };
    println!("Using channel configuration: {}", store.path().display());

    let options = Options { framerate: opt.fps, group_by_native_channel: opt.by_channel };
    let mut scene = Recorder::new();
    let outcome = animate(&doc, &options, &mut store, &mut scene).context("animating")?;

    let tempo = &outcome.tempo;
    println!("PPQ: {}", tempo.ppq());
    println!(
        "Tempo changes: {} (initial ~{:.1} BPM)",
        tempo.breakpoints().len(),
        tempo.breakpoints()[0].bpm()
    );
    println!("\nChannels:");
    for ch in &outcome.channels {
        println!(
            "  {:>3} {:<24} {} {:>3} note(s){}{}",
            ch.id,
            ch.display_name,
            ch.visual.tag(),
            ch.notes.len(),
            if ch.locked { " [locked]" } else { "" },
            if ch.animate { "" } else { " [static]" },
        );
    }
    println!("\nEntities: {}, keyframes: {}", scene.entities.len(), scene.samples.len());
    println!("Frame end: {:.2} @ {} fps", outcome.frame_end, opt.fps);

    if let Some(path) = &opt.output {
        let json = serde_json::to_string_pretty(&Export { frame_end: outcome.frame_end, scene: &scene })?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}
