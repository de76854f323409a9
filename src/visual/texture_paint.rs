use super::{NoteEvent, NoteHandles, PropertyChange, Stage, Visualization};
use super::{base_name, create_group};
use crate::channel::Channel;
use crate::scene::{EntityKind, EntityRef, EntityRequest, Shape};

/// Canvas plane shared by every note. The host paints it; note events add no keyframes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TexturePaint;

impl Visualization for TexturePaint {
    fn setup(&mut self, channel: &Channel, stage: &mut Stage<'_>) -> NoteHandles {
        let group = create_group(channel, stage);
        let canvas = stage.create(
            EntityRequest::new(
                base_name(channel),
                EntityKind::Model { shape: Shape::Plane, source: channel.template.clone() },
            )
            .parent(&group),
        );
        NoteHandles::shared(channel, canvas.clone(), &canvas)
    }

    fn map_event(&mut self, _handle: &EntityRef, _event: &NoteEvent, _stage: &mut Stage<'_>) -> Vec<PropertyChange> {
        Vec::new()
    }
}
