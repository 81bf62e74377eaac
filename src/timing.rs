use crate::atom::Atom;
use crate::boxes::TrackId;
use crate::error::{PropertyError, Result};
use crate::path::{self, PropertyPath};
use crate::property::{CellValue, PropertyValue};
use crate::rescale::{self, convert_time};
use crate::tree::{AtomTree, collapse};

pub const MOVIE_TIMESCALE: &str = "moov.mvhd.timeScale";
pub const MOVIE_DURATION: &str = "moov.mvhd.duration";

impl AtomTree {
    /// Ticks per second of the movie (`moov.mvhd.timeScale`).
    pub fn time_scale(&self) -> Option<u32> {
        collapse(MOVIE_TIMESCALE, "get timescale", self.try_get::<u32>(MOVIE_TIMESCALE))
    }

    /// Overwrite the movie timescale without touching any other field.
    ///
    /// Durations elsewhere keep their tick counts and so change meaning; use
    /// [`AtomTree::change_movie_time_scale`] to keep them consistent.
    pub fn set_time_scale(&mut self, value: u32) -> bool {
        let r = self.try_set(MOVIE_TIMESCALE, value);
        collapse(MOVIE_TIMESCALE, "set timescale", r).is_some()
    }

    /// Movie duration in movie timescale ticks: the longest track, recomputed
    /// on every call. Tracks whose duration cannot be read are skipped; a
    /// movie without any readable track reports `mvhd.duration`.
    #[tracing::instrument(skip(self))]
    pub fn duration(&self) -> Result<u64> {
        let movie_ts = self.try_get::<u32>(MOVIE_TIMESCALE)?;
        let moov = self.atom("moov")?;
        let mut longest = None;
        for (index, trak) in moov.children_of("trak").enumerate() {
            let d = match track_movie_ticks(trak, movie_ts) {
                Ok(d) => d,
                Err(e) => {
                    tracing::debug!(trak = index, error = %e, "skipping track without a usable duration");
                    continue;
                }
            };
            longest = Some(longest.map_or(d, |m: u64| m.max(d)));
        }
        match longest {
            Some(d) => Ok(d),
            None => self.try_get::<u64>(MOVIE_DURATION),
        }
    }

    /// Duration of one track in movie timescale ticks.
    pub fn track_duration(&self, track: TrackId) -> Result<u64> {
        let movie_ts = self.try_get::<u32>(MOVIE_TIMESCALE)?;
        track_movie_ticks(self.track(track)?.1, movie_ts)
    }

    /// `tkhd.trackId` of every track, in declaration order.
    pub fn track_ids(&self) -> Vec<TrackId> {
        let Ok(moov) = self.atom("moov") else {
            return Vec::new();
        };
        moov.children_of("trak")
            .filter_map(|t| track_id(t).ok())
            .collect()
    }

    /// Group index under `moov` and the `trak` atom carrying `id`.
    pub(crate) fn track(&self, id: TrackId) -> Result<(usize, &Atom)> {
        self.atom("moov")?
            .children_of("trak")
            .enumerate()
            .find(|(_, t)| track_id(t).is_ok_and(|t| t == id))
            .ok_or_else(|| PropertyError::not_found(format!("track {id}")))
    }

    /// Change the movie timescale and rescale every field counted in movie
    /// ticks to match.
    ///
    /// Nothing happens when `value` equals the current timescale. Otherwise
    /// all dependent fields are rewritten first and the new timescale last;
    /// if any field would overflow its declared width the tree is left
    /// exactly as it was.
    #[tracing::instrument(skip(self))]
    pub fn change_movie_time_scale(&mut self, value: u32) -> Result<()> {
        let path = PropertyPath::parse(MOVIE_TIMESCALE)?;
        let cell = path::resolve_property(self.root(), &path)?;
        let current = cell.get::<u32>()?;
        if current == value {
            tracing::debug!(timescale = value, "movie timescale unchanged");
            return Ok(());
        }
        let stored = value.write(cell)?;
        let plan = rescale::plan(self.root(), current, value)?;
        rescale::commit(self.root_mut(), plan);
        self.update(&path, move |p| {
            p.replace(stored);
            Ok(())
        })
    }
}

pub(crate) fn track_id(trak: &Atom) -> Result<TrackId> {
    let path = PropertyPath::parse("tkhd.trackId")?;
    Ok(TrackId(path::resolve_property(trak, &path)?.get::<u32>()?))
}

/// Prefer the media header, which carries its own timescale; fall back to
/// `tkhd.duration`, which is already in movie ticks.
fn track_movie_ticks(trak: &Atom, movie_ts: u32) -> Result<u64> {
    let mdhd = PropertyPath::parse("mdia.mdhd")?;
    if let Ok(mdhd) = path::resolve_atom(trak, &mdhd) {
        let media_ts = mdhd
            .property("timeScale")
            .ok_or_else(|| PropertyError::not_found("mdhd.timeScale"))?
            .get::<u32>()?;
        let ticks = mdhd
            .property("duration")
            .ok_or_else(|| PropertyError::not_found("mdhd.duration"))?;
        if media_ts != 0 {
            let converted = convert_time(ticks.integer()?, media_ts, movie_ts)?;
            return u64::try_from(converted).map_err(|_| PropertyError::Overflow {
                name: "duration".into(),
                kind: ticks.kind(),
                value: converted.to_string(),
            });
        }
        tracing::debug!(track = ?track_id(trak).ok(), "media timescale is zero; using tkhd.duration");
    }
    let tkhd = PropertyPath::parse("tkhd.duration")?;
    match path::resolve_property(trak, &tkhd)?.value() {
        PropertyValue::Unsigned(v) => Ok(*v),
        _ => Err(PropertyError::not_found("tkhd.duration")),
    }
}
