mod common;

use common::{TrackSpec, add_track, av_movie, movie};
use mp4prop::{Atom, FourCC, PropertyError, Registry, TrackId};

#[test]
fn duration_is_longest_track_in_movie_ticks() -> anyhow::Result<()> {
    let mut tree = movie(1000, 0);
    // 500, 1500 and 900 movie ticks, each expressed in its own media timescale.
    add_track(
        &mut tree,
        &TrackSpec {
            media_timescale: 90000,
            media_duration: 45000,
            ..TrackSpec::video(1)
        },
    );
    add_track(
        &mut tree,
        &TrackSpec {
            media_timescale: 48000,
            media_duration: 72000,
            ..TrackSpec::audio(2)
        },
    );
    add_track(
        &mut tree,
        &TrackSpec {
            media_timescale: 1000,
            media_duration: 900,
            ..TrackSpec::audio(3)
        },
    );

    assert_eq!(tree.duration()?, 1500);
    assert_eq!(tree.track_duration(TrackId(1))?, 500);
    assert_eq!(tree.track_duration(TrackId(2))?, 1500);
    assert_eq!(tree.track_duration(TrackId(3))?, 900);
    Ok(())
}

#[test]
fn duration_is_recomputed_after_writes() -> anyhow::Result<()> {
    let mut tree = av_movie();
    assert_eq!(tree.duration()?, 600);

    assert!(tree.set_integer_property("moov.trak[1].mdia.mdhd.duration", 96000));
    assert_eq!(tree.duration()?, 1200);
    // The cached header value is not what duration() reports.
    assert_eq!(tree.get_integer_property("moov.mvhd.duration"), Some(600));
    Ok(())
}

#[test]
fn movie_without_tracks_reports_header_duration() -> anyhow::Result<()> {
    let tree = movie(600, 1234);
    assert_eq!(tree.duration()?, 1234);
    assert!(tree.track_ids().is_empty());
    Ok(())
}

#[test]
fn zero_media_timescale_falls_back_to_track_header() -> anyhow::Result<()> {
    let mut tree = movie(600, 0);
    add_track(
        &mut tree,
        &TrackSpec {
            media_timescale: 0,
            movie_duration: 777,
            ..TrackSpec::video(1)
        },
    );
    assert_eq!(tree.duration()?, 777);
    Ok(())
}

#[test]
fn track_ids_in_declaration_order() {
    let mut tree = movie(600, 0);
    for id in [7, 3, 5] {
        add_track(&mut tree, &TrackSpec::video(id));
    }
    assert_eq!(tree.track_ids(), vec![TrackId(7), TrackId(3), TrackId(5)]);
    assert!(matches!(
        tree.track_duration(TrackId(4)),
        Err(PropertyError::NotFound(_))
    ));
}

fn broken_trak() -> Atom {
    // tkhd with only version and flags, no mdia
    Atom::new(FourCC(*b"trak")).with_child(Registry::new().atom(b"tkhd"))
}

#[test]
fn unreadable_tracks_are_skipped() -> anyhow::Result<()> {
    let mut tree = av_movie();
    tree.root_mut().child_at_mut("moov", 0)?.push_child(broken_trak());
    assert_eq!(tree.duration()?, 600);

    let mut tree = movie(600, 4321);
    tree.root_mut().child_at_mut("moov", 0)?.push_child(broken_trak());
    assert_eq!(tree.duration()?, 4321);
    assert!(tree.track_ids().is_empty());
    Ok(())
}

#[test]
fn tree_hands_back_its_root() {
    let tree = av_movie();
    let root = tree.into_root();
    assert_eq!(root.typ(), FourCC::ROOT);
    assert_eq!(root.child_at("moov", 0).unwrap().child_count("trak"), 2);
}
