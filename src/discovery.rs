//! discovery.rs
//!
//! Finds the channels of a document and merges them with the persisted configuration.
//!
//! Two ways to group notes into channels:
//!  - by track: one channel per track index, name from the track, even for tracks that
//!    never play a note (tempo tracks show up as empty channels)
//!  - by native MIDI channel: note-ons are pooled across tracks by their channel number
//!    (0-15), the name is the one of the track where the channel first plays

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::channel::Channel;
use crate::config::{ChannelConfig, ConfigStore};
use crate::error::Result;
use crate::midi::{EventKind, MidiDocument};

/// A channel as found in the file, before configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredChannel {
    pub id: u32,
    pub display_name: String,
    pub notes: BTreeSet<u8>,
}

/// Channels of `doc`, sorted by id.
pub fn discover(doc: &MidiDocument, group_by_native_channel: bool) -> Vec<DiscoveredChannel> {
    let mut found: BTreeMap<u32, DiscoveredChannel> = BTreeMap::new();

    for (index, track) in doc.tracks.iter().enumerate() {
        if !group_by_native_channel {
            found.insert(
                index as u32,
                DiscoveredChannel { id: index as u32, display_name: track.name.clone(), notes: BTreeSet::new() },
            );
        }
        for ev in &track.events {
            let EventKind::NoteOn { channel, note, .. } = ev.kind else {
                continue;
            };
            let id = if group_by_native_channel { channel as u32 } else { index as u32 };
            found
                .entry(id)
                .or_insert_with(|| DiscoveredChannel {
                    id,
                    display_name: track.name.clone(),
                    notes: BTreeSet::new(),
                })
                .notes
                .insert(note);
        }
    }

    let channels: Vec<_> = found.into_values().collect();
    debug!(
        "discovered {} channel(s) grouping by {}",
        channels.len(),
        if group_by_native_channel { "MIDI channel" } else { "track" }
    );
    channels
}

/// Attach configuration to every discovered channel.
///
/// The first stored entry with a matching id wins. The name always comes from the file,
/// the stored `Name` is informative only. Channels without an entry get the default
/// one; if any were added, the full list (stored entries first, then the new ones by
/// id) is written back. Nothing is written when every channel was known.
pub fn merge(discovered: Vec<DiscoveredChannel>, store: &mut dyn ConfigStore) -> Result<Vec<Channel>> {
    let mut entries = store.load()?.unwrap_or_default();
    let known = entries.len();

    let mut channels = Vec::with_capacity(discovered.len());
    for found in discovered {
        let config = match entries.iter().find(|e| e.channel_id == found.id) {
            Some(entry) => entry.clone(),
            None => {
                info!("new channel {} ({:?}), using defaults", found.id, found.display_name);
                let entry = ChannelConfig::default_for(found.id, &found.display_name);
                entries.push(entry.clone());
                entry
            }
        };
        channels.push(Channel {
            id: found.id,
            display_name: found.display_name,
            visual: config.visual_type,
            template: config.template,
            locked: config.locked,
            animate: config.animate,
            notes: found.notes,
        });
    }

    if entries.len() > known {
        store.persist(&entries)?;
    }
    Ok(channels)
}
