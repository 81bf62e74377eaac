#![allow(dead_code)]

use mp4prop::{Atom, AtomTree, CellValue, FourCC, default_registry};

pub struct TrackSpec {
    pub id: u32,
    pub handler: &'static str,
    pub media_timescale: u32,
    pub media_duration: u64,
    /// `tkhd.duration` and the single edit's `segmentDuration`, movie ticks.
    pub movie_duration: u64,
    /// Sample entry type; `None` leaves `stsd` empty.
    pub entry: Option<&'static [u8; 4]>,
    pub profile_level: u8,
}

impl TrackSpec {
    pub fn video(id: u32) -> Self {
        Self {
            id,
            handler: "vide",
            media_timescale: 90000,
            media_duration: 90000,
            movie_duration: 600,
            entry: Some(b"mp4v"),
            profile_level: 0x01,
        }
    }

    pub fn audio(id: u32) -> Self {
        Self {
            id,
            handler: "soun",
            media_timescale: 48000,
            media_duration: 48000,
            movie_duration: 600,
            entry: Some(b"mp4a"),
            profile_level: 0xFE,
        }
    }
}

pub fn set<T: CellValue>(atom: &mut Atom, name: &str, value: T) {
    let typ = atom.typ();
    atom.property_mut(name)
        .unwrap_or_else(|| panic!("{typ} has no {name}"))
        .set(value)
        .expect("fixture value fits");
}

/// `ftyp` + `moov { mvhd iods }` with the given movie timescale and cached
/// duration, no tracks.
pub fn movie(timescale: u32, duration: u64) -> AtomTree {
    let reg = default_registry();
    let mut mvhd = reg.atom(b"mvhd");
    set(&mut mvhd, "timeScale", timescale);
    set(&mut mvhd, "duration", duration as u32);

    let moov = Atom::new(FourCC(*b"moov"))
        .with_child(mvhd)
        .with_child(reg.atom(b"iods"));
    AtomTree::new(Atom::root().with_child(reg.atom(b"ftyp")).with_child(moov))
}

pub fn trak(spec: &TrackSpec) -> Atom {
    let reg = default_registry();

    let mut tkhd = reg.atom(b"tkhd");
    set(&mut tkhd, "trackId", spec.id);
    set(&mut tkhd, "duration", spec.movie_duration as u32);

    let mut elst = reg.atom(b"elst");
    let row = elst
        .property_mut("entries")
        .expect("elst has entries")
        .push_row()
        .expect("entries is a table");
    row.cell_mut("segmentDuration")
        .expect("column")
        .set(spec.movie_duration as u32)
        .expect("fits");

    let mut mdhd = reg.atom(b"mdhd");
    set(&mut mdhd, "timeScale", spec.media_timescale);
    set(&mut mdhd, "duration", spec.media_duration as u32);

    let mut hdlr = reg.atom(b"hdlr");
    set(&mut hdlr, "handlerType", spec.handler.to_string());

    let mut stsd = reg.atom(b"stsd");
    if let Some(entry) = spec.entry {
        let mut esds = reg.atom(b"esds");
        set(&mut esds, "profileLevelId", spec.profile_level);
        stsd.push_child(reg.atom(entry).with_child(esds));
    }

    Atom::new(FourCC(*b"trak"))
        .with_child(tkhd)
        .with_child(Atom::new(FourCC(*b"edts")).with_child(elst))
        .with_child(
            Atom::new(FourCC(*b"mdia"))
                .with_child(mdhd)
                .with_child(hdlr)
                .with_child(
                    Atom::new(FourCC(*b"minf"))
                        .with_child(Atom::new(FourCC(*b"stbl")).with_child(stsd)),
                ),
        )
}

pub fn add_track(tree: &mut AtomTree, spec: &TrackSpec) {
    tree.root_mut()
        .child_at_mut("moov", 0)
        .expect("fixture has moov")
        .push_child(trak(spec));
}

/// Movie timescale 600, one video track (id 1) and one audio track (id 2),
/// each one second long.
pub fn av_movie() -> AtomTree {
    let mut tree = movie(600, 600);
    add_track(&mut tree, &TrackSpec::video(1));
    add_track(&mut tree, &TrackSpec::audio(2));
    tree
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
