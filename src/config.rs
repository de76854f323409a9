//! config.rs
//!
//! Per-channel configuration, persisted as a JSON "sidecar" file next to the MIDI file.
//!
//! The sidecar is a plain JSON array, one object per channel:
//!
//! ```json
//! [
//!   { "Channel": 1, "Name": "Piano", "Locked": false, "Animate": true, "Type": "BG", "Template": "" }
//! ]
//! ```
//!
//! `Locked` and `Animate` also accept the strings `"True"` / `"False"` written by older
//! sidecars, and an empty `Template` means "build the default model". There is no schema
//! version: the file is read as-is and rewritten only when new channels show up.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AnimError, Result};

/// Visual behaviour of a channel, tagged with the short codes used in the sidecar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisualType {
    #[default]
    #[serde(rename = "BG")]
    Bargraph,
    #[serde(rename = "GD")]
    Grid,
    #[serde(rename = "LT")]
    Light,
    #[serde(rename = "FT")]
    Fountain,
    #[serde(rename = "FS")]
    FountainSolo,
    #[serde(rename = "SW")]
    SplashWall,
    #[serde(rename = "PB")]
    PaperBall,
    #[serde(rename = "TP")]
    TexturePaint,
}

impl VisualType {
    pub const ALL: [VisualType; 8] = [
        VisualType::Bargraph,
        VisualType::Grid,
        VisualType::Light,
        VisualType::Fountain,
        VisualType::FountainSolo,
        VisualType::SplashWall,
        VisualType::PaperBall,
        VisualType::TexturePaint,
    ];

    /// Two-letter code, also used as prefix of every entity name of the channel.
    pub fn tag(self) -> &'static str {
        match self {
            VisualType::Bargraph => "BG",
            VisualType::Grid => "GD",
            VisualType::Light => "LT",
            VisualType::Fountain => "FT",
            VisualType::FountainSolo => "FS",
            VisualType::SplashWall => "SW",
            VisualType::PaperBall => "PB",
            VisualType::TexturePaint => "TP",
        }
    }
}

/// One persisted channel entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(rename = "Channel")]
    pub channel_id: u32,
    #[serde(rename = "Name")]
    pub display_name: String,
    #[serde(rename = "Locked", with = "flag")]
    pub locked: bool,
    #[serde(rename = "Animate", with = "flag")]
    pub animate: bool,
    #[serde(rename = "Type")]
    pub visual_type: VisualType,
    #[serde(rename = "Template", default, with = "template")]
    pub template: Option<String>,
}

impl ChannelConfig {
    /// Entry synthesized for a channel seen for the first time.
    pub fn default_for(channel_id: u32, display_name: &str) -> Self {
        Self {
            channel_id,
            display_name: display_name.to_string(),
            locked: false,
            animate: true,
            visual_type: VisualType::Bargraph,
            template: None,
        }
    }
}

/// Where channel configuration comes from and goes to.
pub trait ConfigStore {
    /// `Ok(None)` when nothing was ever persisted.
    fn load(&mut self) -> Result<Option<Vec<ChannelConfig>>>;
    fn persist(&mut self, entries: &[ChannelConfig]) -> Result<()>;
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct JsonSidecar {
    path: PathBuf,
}

impl JsonSidecar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `song.mid` → `song.json`
    pub fn beside(midi_path: &Path) -> Self {
        Self::new(midi_path.with_extension("json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonSidecar {
    fn load(&mut self) -> Result<Option<Vec<ChannelConfig>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path).map_err(|e| AnimError::io(&self.path, e))?;
        let entries = serde_json::from_str(&text).map_err(|e| {
            AnimError::Configuration(format!("{}: {e}", self.path.display()))
        })?;
        Ok(Some(entries))
    }

    fn persist(&mut self, entries: &[ChannelConfig]) -> Result<()> {
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| AnimError::Configuration(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| AnimError::io(&self.path, e))?;
        info!("wrote channel configuration {}", self.path.display());
        Ok(())
    }
}

/// In-memory store for hosts that keep configuration themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub entries: Option<Vec<ChannelConfig>>,
    /// Number of `persist` calls so far.
    pub writes: usize,
}

impl MemoryStore {
    pub fn with_entries(entries: Vec<ChannelConfig>) -> Self {
        Self { entries: Some(entries), writes: 0 }
    }
}

impl ConfigStore for MemoryStore {
    fn load(&mut self) -> Result<Option<Vec<ChannelConfig>>> {
        Ok(self.entries.clone())
    }

    fn persist(&mut self, entries: &[ChannelConfig]) -> Result<()> {
        self.entries = Some(entries.to_vec());
        self.writes += 1;
        Ok(())
    }
}

/// Booleans written either as JSON booleans or as "True"/"False" strings.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Bool(b) => Ok(b),
            Raw::Text(t) if t.eq_ignore_ascii_case("true") => Ok(true),
            Raw::Text(t) if t.eq_ignore_ascii_case("false") => Ok(false),
            Raw::Text(t) => Err(D::Error::custom(format!("expected True or False, got {t:?}"))),
        }
    }
}

/// `Option<String>` stored as a string where "" means `None`.
mod template {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.filter(|t| !t.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn reads_legacy_string_flags() {
        let json = r#"[
            {"Channel": 3, "Locked": "False", "Name": "Bass", "Type": "LT", "Template": "", "Animate": "True"},
            {"Channel": 4, "Locked": true, "Name": "Drums", "Type": "FS", "Template": "Cube.001", "Animate": false}
        ]"#;
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f.flush().unwrap();

        let entries = JsonSidecar::new(f.path()).load().unwrap().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].channel_id, 3);
        assert!(!entries[0].locked);
        assert!(entries[0].animate);
        assert_eq!(entries[0].visual_type, VisualType::Light);
        assert_eq!(entries[0].template, None);
        assert!(entries[1].locked);
        assert_eq!(entries[1].visual_type, VisualType::FountainSolo);
        assert_eq!(entries[1].template.as_deref(), Some("Cube.001"));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let mut store = JsonSidecar::new(dir.path().join("nope.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn missing_required_field_is_a_configuration_error() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(br#"[{"Channel": 1, "Name": "x", "Locked": false, "Type": "BG"}]"#).unwrap();
        f.flush().unwrap();

        let err = JsonSidecar::new(f.path()).load().unwrap_err();
        assert!(matches!(err, AnimError::Configuration(ref m) if m.contains("Animate")));
    }

    #[test]
    fn unknown_type_tag_is_a_configuration_error() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(br#"[{"Channel": 1, "Name": "x", "Locked": false, "Animate": true, "Type": "XX"}]"#)
            .unwrap();
        f.flush().unwrap();

        let err = JsonSidecar::new(f.path()).load().unwrap_err();
        assert!(matches!(err, AnimError::Configuration(_)));
    }

    #[test]
    fn persisted_entries_load_back() {
        let dir = tempdir().unwrap();
        let mut store = JsonSidecar::beside(&dir.path().join("song.mid"));
        assert_eq!(store.path(), dir.path().join("song.json"));

        let mut grid = ChannelConfig::default_for(2, "Pads");
        grid.visual_type = VisualType::Grid;
        grid.template = Some("Pad.Template".into());
        let entries = vec![ChannelConfig::default_for(0, "Lead"), grid];
        store.persist(&entries).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains(r#""Type": "GD""#));
        assert!(text.contains(r#""Template": """#));
        assert_eq!(store.load().unwrap().unwrap(), entries);
    }

    #[test]
    fn tags_are_unique() {
        let mut tags: Vec<_> = VisualType::ALL.iter().map(|v| v.tag()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), 8);
    }
}
