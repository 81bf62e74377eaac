use crate::atom::Atom;
use crate::boxes::TrackId;
use crate::error::{PropertyError, Result};
use crate::path::{self, PathStep, PropertyPath};
use crate::timing::track_id;
use crate::tree::{AtomTree, collapse};
use serde::Serialize;
use std::fmt;

pub const OD_PROFILE_LEVEL: &str = "moov.iods.ODProfileLevelId";
pub const SCENE_PROFILE_LEVEL: &str = "moov.iods.sceneProfileLevelId";
pub const AUDIO_PROFILE_LEVEL: &str = "moov.iods.audioProfileLevelId";
pub const VISUAL_PROFILE_LEVEL: &str = "moov.iods.visualProfileLevelId";
pub const GRAPHICS_PROFILE_LEVEL: &str = "moov.iods.graphicsProfileLevelId";

/// Which decoder capability a profile-level code describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProfileCategory {
    ObjectDescriptor,
    Scene,
    Video,
    Audio,
    Graphics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProfileLevelClass {
    Reserved,
    Defined,
    UserPrivate,
    Unspecified,
    NotRequired,
}

/// An 8-bit MPEG-4 Systems profile-level indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProfileLevel(pub u8);

impl ProfileLevel {
    pub const UNSPECIFIED: ProfileLevel = ProfileLevel(0xFE);
    pub const NOT_REQUIRED: ProfileLevel = ProfileLevel(0xFF);

    pub fn class(self, category: ProfileCategory) -> ProfileLevelClass {
        match self.0 {
            0xFE => ProfileLevelClass::Unspecified,
            0xFF => ProfileLevelClass::NotRequired,
            0x80..=0xFD => ProfileLevelClass::UserPrivate,
            _ if self.describe(category).is_some() => ProfileLevelClass::Defined,
            _ => ProfileLevelClass::Reserved,
        }
    }

    /// Name of a code defined by ISO/IEC 14496-1 for `category`.
    pub fn describe(self, category: ProfileCategory) -> Option<&'static str> {
        let table: &[&str] = match category {
            ProfileCategory::ObjectDescriptor => &[],
            ProfileCategory::Scene | ProfileCategory::Graphics => &["Simple 2D Profile @ Level 1"],
            ProfileCategory::Video => VIDEO_PROFILES,
            ProfileCategory::Audio => AUDIO_PROFILES,
        };
        match self.0 {
            0 => None,
            n => table.get(usize::from(n) - 1).copied(),
        }
    }
}

impl fmt::Display for ProfileLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

// Codes 0x01.. in order.
const VIDEO_PROFILES: &[&str] = &[
    "Simple Profile @ Level 3",
    "Simple Profile @ Level 2",
    "Simple Profile @ Level 1",
    "Simple Scalable Profile @ Level 2",
    "Simple Scalable Profile @ Level 1",
    "Core Profile @ Level 2",
    "Core Profile @ Level 1",
    "Main Profile @ Level 4",
    "Main Profile @ Level 3",
    "Main Profile @ Level 2",
    "N-Bit Profile @ Level 2",
    "Hybrid Profile @ Level 2",
    "Hybrid Profile @ Level 1",
    "Basic Animated Texture @ Level 2",
    "Basic Animated Texture @ Level 1",
    "Scalable Texture @ Level 3",
    "Scalable Texture @ Level 2",
    "Scalable Texture @ Level 1",
    "Simple Face Animation @ Level 2",
    "Simple Face Animation @ Level 1",
];

const AUDIO_PROFILES: &[&str] = &[
    "Main Profile @ Level 1",
    "Main Profile @ Level 2",
    "Main Profile @ Level 3",
    "Main Profile @ Level 4",
    "Scalable Profile @ Level 1",
    "Scalable Profile @ Level 2",
    "Scalable Profile @ Level 3",
    "Scalable Profile @ Level 4",
    "Speech Profile @ Level 1",
    "Speech Profile @ Level 2",
    "Synthesis Profile @ Level 1",
    "Synthesis Profile @ Level 2",
    "Synthesis Profile @ Level 3",
];

impl AtomTree {
    pub fn od_profile_level(&self) -> Option<u8> {
        self.profile_level(OD_PROFILE_LEVEL)
    }

    pub fn set_od_profile_level(&mut self, value: u8) -> bool {
        self.set_profile_level(OD_PROFILE_LEVEL, value)
    }

    pub fn scene_profile_level(&self) -> Option<u8> {
        self.profile_level(SCENE_PROFILE_LEVEL)
    }

    pub fn set_scene_profile_level(&mut self, value: u8) -> bool {
        self.set_profile_level(SCENE_PROFILE_LEVEL, value)
    }

    pub fn audio_profile_level(&self) -> Option<u8> {
        self.profile_level(AUDIO_PROFILE_LEVEL)
    }

    pub fn set_audio_profile_level(&mut self, value: u8) -> bool {
        self.set_profile_level(AUDIO_PROFILE_LEVEL, value)
    }

    pub fn graphics_profile_level(&self) -> Option<u8> {
        self.profile_level(GRAPHICS_PROFILE_LEVEL)
    }

    pub fn set_graphics_profile_level(&mut self, value: u8) -> bool {
        self.set_profile_level(GRAPHICS_PROFILE_LEVEL, value)
    }

    /// Video profile-level of one track.
    ///
    /// `TrackId::INVALID` selects the first video track; if the file has none
    /// carrying an `esds` box the file-level `iods` value is used instead.
    pub fn video_profile_level(&self, track: TrackId) -> Option<u8> {
        let value = self
            .video_profile_path(track)
            .and_then(|p| path::resolve_property(self.root(), &p)?.get::<u8>());
        collapse(VISUAL_PROFILE_LEVEL, "get video profile", value)
    }

    pub fn set_video_profile_level(&mut self, track: TrackId, value: u8) -> bool {
        let r = self
            .video_profile_path(track)
            .and_then(|p| self.update(&p, |cell| cell.set(value)));
        collapse(VISUAL_PROFILE_LEVEL, "set video profile", r).is_some()
    }

    fn profile_level(&self, path: &str) -> Option<u8> {
        collapse(path, "get profile", self.try_get::<u8>(path))
    }

    fn set_profile_level(&mut self, path: &str, value: u8) -> bool {
        let r = self.try_set(path, value);
        collapse(path, "set profile", r).is_some()
    }

    fn video_profile_path(&self, track: TrackId) -> Result<PropertyPath> {
        if track.is_valid() {
            let (index, trak) = self.track(track)?;
            return esds_path(index, trak);
        }
        let moov = self.atom("moov")?;
        let from_track = match moov.children_of("trak").enumerate().find(|(_, t)| is_video(t)) {
            Some((index, trak)) => esds_path(index, trak),
            None => Err(PropertyError::not_found("video track")),
        };
        match from_track {
            Ok(path) => Ok(path),
            Err(e) if self.have_atom(VISUAL_PROFILE_LEVEL) => {
                tracing::debug!(error = %e, "no per-track video profile, using iods");
                PropertyPath::parse(VISUAL_PROFILE_LEVEL)
            }
            Err(e) => Err(e),
        }
    }
}

fn is_video(trak: &Atom) -> bool {
    let Ok(path) = PropertyPath::parse("mdia.hdlr.handlerType") else {
        return false;
    };
    path::resolve_property(trak, &path)
        .and_then(|p| p.as_str())
        .is_ok_and(|h| h == "vide")
}

/// Path to the profile-level cell of the first sample entry in the track's
/// `stsd` that carries an `esds` box.
fn esds_path(trak_index: usize, trak: &Atom) -> Result<PropertyPath> {
    let stsd_path = PropertyPath::parse("mdia.minf.stbl.stsd")?;
    let stsd = path::resolve_atom(trak, &stsd_path)?;
    let entries = stsd.children();
    let (pos, entry) = entries
        .iter()
        .enumerate()
        .find(|(_, e)| e.has_child_group("esds"))
        .ok_or_else(|| {
            PropertyError::not_found(format!("esds in track {:?}", track_id(trak).ok()))
        })?;
    let typ = entry.typ().to_string();
    let group_index = entries[..pos].iter().filter(|e| e.typ() == entry.typ()).count();

    let mut steps = vec![PathStep::new("moov"), PathStep::indexed("trak", trak_index)];
    steps.extend(stsd_path.steps().iter().cloned());
    steps.extend([
        PathStep::indexed(typ, group_index),
        PathStep::new("esds"),
        PathStep::new("profileLevelId"),
    ]);
    Ok(PropertyPath::from_steps(steps))
}
