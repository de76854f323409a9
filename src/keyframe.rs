//! keyframe.rs
//!
//! Step-shaped keyframes. Playback systems interpolate between keys, so a lone key at
//! the note-on frame would make a bar slowly grow from the previous note. Re-asserting
//! the previous value `step_width` frames earlier keeps the change (almost) instantaneous.

use crate::scene::{AnimationSample, EntityRef, Scene};

/// Frames between the re-asserted previous value and the new value.
pub fn step_width(framerate: u32) -> u32 {
    framerate / 8
}

/// Emit `value` at `frame`, preceded by `previous` at `frame - step_width` when they
/// differ. At most two samples; the early one is clamped to frame 0.
pub fn emit(
    scene: &mut dyn Scene,
    entity: &EntityRef,
    property: &str,
    frame: f64,
    value: f64,
    previous: f64,
    step_width: u32,
) {
    if value != previous {
        let before = (frame - step_width as f64).max(0.0);
        scene.key(AnimationSample::new(entity, property, before, previous));
    }
    scene.key(AnimationSample::new(entity, property, frame, value));
}
