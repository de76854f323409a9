use std::collections::BTreeMap;

use super::{NoteEvent, NoteHandles, PropertyChange, Stage, Visualization};
use super::{base_name, create_group, entity_name};
use crate::channel::Channel;
use crate::scene::{EntityKind, EntityRef, EntityRequest};

/// 12 notes x 11 octaves laid out on a 37 x 34 grid, each note pulling one face.
const X_SEGMENTS: u32 = 37;
const Y_SEGMENTS: u32 = 34;

/// A single grid mesh whose faces are pushed up by their notes.
///
/// Unlike the other strategies the offset is relative: each event moves the hook by
/// `(velocity - previous) / 6`, and the position accumulates over the whole pass.
#[derive(Debug, Default, Clone)]
pub struct Grid {
    offsets: BTreeMap<u8, f64>,
}

/// Grid face hooked to `note`. Three columns per note, one octave per band of rows.
///
/// The layout starts at note 1; note 0 falls before the first face and is pinned to
/// face 0, which no other note uses.
pub fn face_for(note: u8) -> i32 {
    let n = note as i32;
    let face = (n * 3 - 2) + ((n - 1).div_euclid(12) + 1) * 72 - 36;
    face.clamp(0, (X_SEGMENTS * Y_SEGMENTS) as i32 - 1)
}

impl Visualization for Grid {
    fn setup(&mut self, channel: &Channel, stage: &mut Stage<'_>) -> NoteHandles {
        let group = create_group(channel, stage);
        let grid = stage.create(
            EntityRequest::new(base_name(channel), EntityKind::Grid { x_segments: X_SEGMENTS, y_segments: Y_SEGMENTS })
                .parent(&group),
        );

        let mut handles = NoteHandles::new(grid.clone());
        for &note in &channel.notes {
            let hook = stage.create(
                EntityRequest::new(entity_name(channel, note), EntityKind::Hook { grid: grid.clone(), face: face_for(note) })
                    .parent(&group),
            );
            handles.notes.insert(note, hook);
        }
        handles
    }

    fn map_event(&mut self, handle: &EntityRef, event: &NoteEvent, _stage: &mut Stage<'_>) -> Vec<PropertyChange> {
        let offset = self.offsets.entry(event.note).or_insert(0.0);
        let before = *offset;
        *offset += (event.velocity as f64 - event.previous as f64) / 6.0;
        vec![PropertyChange::new(handle, "location.z", before, *offset)]
    }
}
