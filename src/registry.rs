use crate::atom::Atom;
use crate::boxes::FourCC;
use crate::known_boxes::KnownBox;
use crate::property::{Property, PropertyValue, TimeRole};
use std::collections::HashMap;

/// Field layout of one box type.
///
/// A layout lists the property cells an atom of that type starts with, in
/// declaration order, with their default values. Versioned boxes widen their
/// time fields to 64 bits in version 1.
pub trait BoxLayout: Send + Sync {
    fn properties(&self, version: u8) -> Vec<Property>;
}

/// Registry of layouts keyed by box type.
///
/// The registry is immutable once constructed; use [`Registry::with_layout`]
/// to build it fluently.
pub struct Registry {
    map: HashMap<FourCC, BoxLayoutEntry>,
}

struct BoxLayoutEntry {
    inner: Box<dyn BoxLayout>,
    name: String,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Return a new registry with the given layout added.
    ///
    /// `name` is human-readable and used only for logging.
    pub fn with_layout(mut self, key: FourCC, name: &str, layout: Box<dyn BoxLayout>) -> Self {
        self.map.insert(
            key,
            BoxLayoutEntry {
                inner: layout,
                name: name.to_string(),
            },
        );
        self
    }

    pub fn has_layout(&self, key: FourCC) -> bool {
        self.map.contains_key(&key)
    }

    /// A new atom of type `typ` holding the default cells of its layout.
    ///
    /// Full boxes without a registered layout still get `version` and
    /// `flags`; anything else unregistered starts empty.
    pub fn instantiate(&self, typ: FourCC, version: u8) -> Atom {
        let props = match self.map.get(&typ) {
            Some(entry) => {
                tracing::trace!(box_type = %typ, layout = %entry.name, version, "instantiating");
                entry.inner.properties(version)
            }
            None if KnownBox::from(typ).is_full_box() => full_box(version),
            None => {
                if !KnownBox::from(typ).is_container() {
                    tracing::debug!(box_type = %typ, "no layout registered");
                }
                Vec::new()
            }
        };
        props
            .into_iter()
            .fold(Atom::new(typ), |atom, p| atom.with_property(p))
    }

    /// Version 0 instance of `typ`.
    pub fn atom(&self, typ: &[u8; 4]) -> Atom {
        self.instantiate(FourCC::from(typ), 0)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------- Helpers ----------

fn full_box(version: u8) -> Vec<Property> {
    vec![
        Property::unsigned("version", 8).with_default(PropertyValue::Unsigned(version.into())),
        Property::unsigned("flags", 24),
    ]
}

/// 32-bit in version 0, 64-bit otherwise.
fn time_field(name: &str, version: u8, role: TimeRole) -> Property {
    let bits = if version == 1 { 64 } else { 32 };
    Property::unsigned(name, bits).with_role(role)
}

fn identity_matrix() -> Vec<u8> {
    [0x0001_0000u32, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000]
        .iter()
        .flat_map(|v| v.to_be_bytes())
        .collect()
}

fn matrix() -> Property {
    Property::fixed_bytes("matrix", 36).with_default(PropertyValue::Bytes(identity_matrix()))
}

// ---------- Layouts ----------

// mvhd: movie timescale + duration
pub struct MvhdLayout;

impl BoxLayout for MvhdLayout {
    fn properties(&self, version: u8) -> Vec<Property> {
        let mut p = full_box(version);
        p.extend([
            time_field("creationTime", version, TimeRole::None),
            time_field("modificationTime", version, TimeRole::None),
            Property::unsigned("timeScale", 32)
                .with_role(TimeRole::MovieTimescale)
                .with_default(PropertyValue::Unsigned(1000)),
            time_field("duration", version, TimeRole::MovieTicks),
            Property::float32("rate").with_default(PropertyValue::Float32(1.0)),
            Property::float32("volume").with_default(PropertyValue::Float32(1.0)),
            Property::fixed_bytes("reserved", 10),
            matrix(),
            Property::fixed_bytes("predefined", 24),
            Property::unsigned("nextTrackId", 32).with_default(PropertyValue::Unsigned(1)),
        ]);
        p
    }
}

// tkhd: track id + duration in movie ticks
pub struct TkhdLayout;

impl BoxLayout for TkhdLayout {
    fn properties(&self, version: u8) -> Vec<Property> {
        let mut p = full_box(version);
        p[1] = Property::unsigned("flags", 24).with_default(PropertyValue::Unsigned(1));
        p.extend([
            time_field("creationTime", version, TimeRole::None),
            time_field("modificationTime", version, TimeRole::None),
            Property::unsigned("trackId", 32),
            Property::fixed_bytes("reserved1", 4),
            time_field("duration", version, TimeRole::MovieTicks),
            Property::fixed_bytes("reserved2", 8),
            Property::signed("layer", 16),
            Property::signed("alternateGroup", 16),
            Property::float32("volume"),
            Property::fixed_bytes("reserved3", 2),
            matrix(),
            Property::float32("width"),
            Property::float32("height"),
        ]);
        p
    }
}

// mdhd: media timescale + duration in media ticks
pub struct MdhdLayout;

impl BoxLayout for MdhdLayout {
    fn properties(&self, version: u8) -> Vec<Property> {
        let mut p = full_box(version);
        p.extend([
            time_field("creationTime", version, TimeRole::None),
            time_field("modificationTime", version, TimeRole::None),
            Property::unsigned("timeScale", 32)
                .with_role(TimeRole::MediaTimescale)
                .with_default(PropertyValue::Unsigned(1000)),
            time_field("duration", version, TimeRole::MediaTicks),
            // packed ISO-639-2/T code, three 5-bit letters
            Property::unsigned("language", 15),
            Property::unsigned("quality", 16),
        ]);
        p
    }
}

pub struct HdlrLayout;

impl BoxLayout for HdlrLayout {
    fn properties(&self, version: u8) -> Vec<Property> {
        let mut p = full_box(version);
        p.extend([
            Property::fixed_bytes("reserved1", 4),
            Property::string("handlerType"),
            Property::fixed_bytes("reserved2", 12),
            Property::string("name"),
        ]);
        p
    }
}

// elst: segment durations are movie ticks, media times are media ticks
pub struct ElstLayout;

impl BoxLayout for ElstLayout {
    fn properties(&self, version: u8) -> Vec<Property> {
        let wide = if version == 1 { 64 } else { 32 };
        let mut p = full_box(version);
        p.push(Property::table(
            "entries",
            vec![
                time_field("segmentDuration", version, TimeRole::MovieTicks),
                Property::signed("mediaTime", wide).with_role(TimeRole::MediaTicks),
                Property::signed("mediaRate", 16).with_default(PropertyValue::Signed(1)),
                Property::signed("mediaRateFraction", 16),
            ],
        ));
        p
    }
}

pub struct MehdLayout;

impl BoxLayout for MehdLayout {
    fn properties(&self, version: u8) -> Vec<Property> {
        let mut p = full_box(version);
        p.push(time_field("fragmentDuration", version, TimeRole::MovieTicks));
        p
    }
}

// iods: file-level profile-level indications, 0xFF = none required
pub struct IodsLayout;

impl BoxLayout for IodsLayout {
    fn properties(&self, version: u8) -> Vec<Property> {
        let mut p = full_box(version);
        p.push(Property::unsigned("objectDescriptorId", 10).with_default(PropertyValue::Unsigned(1)));
        p.extend(
            [
                "ODProfileLevelId",
                "sceneProfileLevelId",
                "audioProfileLevelId",
                "visualProfileLevelId",
                "graphicsProfileLevelId",
            ]
            .map(|name| Property::unsigned(name, 8).with_default(PropertyValue::Unsigned(0xFF))),
        );
        p
    }
}

// esds: only the decoder-config fields; the descriptor payload stays opaque
pub struct EsdsLayout;

impl BoxLayout for EsdsLayout {
    fn properties(&self, version: u8) -> Vec<Property> {
        let mut p = full_box(version);
        p.extend([
            Property::unsigned("ESID", 16),
            Property::unsigned("objectTypeId", 8),
            Property::unsigned("streamType", 6),
            Property::unsigned("bufferSizeDB", 24),
            Property::unsigned("maxBitrate", 32),
            Property::unsigned("avgBitrate", 32),
            Property::unsigned("profileLevelId", 8).with_default(PropertyValue::Unsigned(0xFE)),
            Property::bytes("decoderSpecificInfo"),
        ]);
        p
    }
}

pub struct VisualSampleEntryLayout;

impl BoxLayout for VisualSampleEntryLayout {
    fn properties(&self, _version: u8) -> Vec<Property> {
        vec![
            Property::fixed_bytes("reserved1", 6),
            Property::unsigned("dataReferenceIndex", 16).with_default(PropertyValue::Unsigned(1)),
            Property::unsigned("width", 16),
            Property::unsigned("height", 16),
            Property::string("compressorName"),
            Property::unsigned("depth", 16).with_default(PropertyValue::Unsigned(0x18)),
        ]
    }
}

pub struct AudioSampleEntryLayout;

impl BoxLayout for AudioSampleEntryLayout {
    fn properties(&self, _version: u8) -> Vec<Property> {
        vec![
            Property::fixed_bytes("reserved1", 6),
            Property::unsigned("dataReferenceIndex", 16).with_default(PropertyValue::Unsigned(1)),
            Property::unsigned("channels", 16).with_default(PropertyValue::Unsigned(2)),
            Property::unsigned("sampleSize", 16).with_default(PropertyValue::Unsigned(16)),
            // 16.16 fixed point
            Property::unsigned("sampleRate", 32),
        ]
    }
}

/// Registry pre-populated with the layouts of every box the timing and
/// profile-level accessors read or write.
pub fn default_registry() -> Registry {
    Registry::new()
        .with_layout(FourCC(*b"mvhd"), "movie header", Box::new(MvhdLayout))
        .with_layout(FourCC(*b"tkhd"), "track header", Box::new(TkhdLayout))
        .with_layout(FourCC(*b"mdhd"), "media header", Box::new(MdhdLayout))
        .with_layout(FourCC(*b"hdlr"), "handler reference", Box::new(HdlrLayout))
        .with_layout(FourCC(*b"elst"), "edit list", Box::new(ElstLayout))
        .with_layout(FourCC(*b"mehd"), "movie extends header", Box::new(MehdLayout))
        .with_layout(FourCC(*b"iods"), "initial object descriptor", Box::new(IodsLayout))
        .with_layout(FourCC(*b"esds"), "elementary stream descriptor", Box::new(EsdsLayout))
        .with_layout(FourCC(*b"mp4v"), "mpeg-4 visual entry", Box::new(VisualSampleEntryLayout))
        .with_layout(FourCC(*b"avc1"), "avc entry", Box::new(VisualSampleEntryLayout))
        .with_layout(FourCC(*b"mp4a"), "mpeg-4 audio entry", Box::new(AudioSampleEntryLayout))
}
