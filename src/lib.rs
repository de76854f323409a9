//! Turn a Standard MIDI File into 3D scene animation.
//!
//! The file is read with `midly`, its ticks converted to frames through the tempo map,
//! notes grouped into channels, and every note event of a channel turned into keyframes
//! by the channel's visualization. The scene itself stays behind the [`scene::Scene`]
//! trait; [`scene::Recorder`] keeps everything in memory.
//!
//! ```no_run
//! use midi_keyframes::{animate, JsonSidecar, MidiDocument, Options, Recorder};
//!
//! # fn main() -> midi_keyframes::Result<()> {
//! let doc = MidiDocument::open("song.mid")?;
//! let mut store = JsonSidecar::beside(std::path::Path::new("song.mid"));
//! let mut scene = Recorder::new();
//! let outcome = animate(&doc, &Options::default(), &mut store, &mut scene)?;
//! println!("{} samples, ends at frame {}", scene.samples.len(), outcome.frame_end);
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod discovery;
pub mod error;
pub mod keyframe;
pub mod midi;
pub mod pipeline;
pub mod pitch;
pub mod scene;
pub mod tempo;
pub mod visual;

pub use config::{ChannelConfig, ConfigStore, JsonSidecar, MemoryStore, VisualType};
pub use error::{AnimError, Result};
pub use midi::MidiDocument;
pub use pipeline::{Options, Outcome, animate};
pub use scene::{Recorder, Scene};
