use super::{NoteEvent, NoteHandles, PropertyChange, SPACING, Stage, Visualization};
use super::{create_group, entity_name, model_location, note_place};
use crate::channel::Channel;
use crate::scene::{EntityKind, EntityRef, EntityRequest, Shape};

/// Crumpled spheres: velocity drives the strength of a displacement.
#[derive(Debug, Default, Clone, Copy)]
pub struct PaperBall;

fn strength(velocity: u8) -> f64 {
    velocity as f64 / 127.0 * 5.0
}

impl Visualization for PaperBall {
    fn setup(&mut self, channel: &Channel, stage: &mut Stage<'_>) -> NoteHandles {
        let group = create_group(channel, stage);
        let [x, y, z] = model_location(channel);
        let model = stage.create(
            EntityRequest::new(
                entity_name(channel, "template"),
                EntityKind::Model { shape: Shape::UvSphere, source: channel.template.clone() },
            )
            .parent(&group)
            .at(x, y, z),
        );

        let mut handles = NoteHandles::new(model.clone());
        for &note in &channel.notes {
            let ball = stage.create(
                EntityRequest::new(entity_name(channel, note), EntityKind::Instance { model: model.clone() })
                    .parent(&group)
                    .at(note_place(channel, note) * SPACING, 0.0, 0.0),
            );
            handles.notes.insert(note, ball);
        }
        handles
    }

    fn map_event(&mut self, handle: &EntityRef, event: &NoteEvent, _stage: &mut Stage<'_>) -> Vec<PropertyChange> {
        vec![PropertyChange::new(
            handle,
            "displace.strength",
            strength(event.previous),
            strength(event.velocity),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_velocity_is_full_strength() {
        assert_eq!(strength(127), 5.0);
        assert_eq!(strength(0), 0.0);
    }
}
