mod common;

use common::av_movie;
use mp4prop::PropertyError;

#[test]
fn integer_round_trip_marks_path_dirty() -> anyhow::Result<()> {
    let mut tree = av_movie();
    assert!(!tree.is_dirty());

    assert!(tree.set_integer_property("moov.mvhd.nextTrackId", 3));
    assert_eq!(tree.get_integer_property("moov.mvhd.nextTrackId"), Some(3));

    assert!(tree.is_dirty());
    assert!(tree.root().is_dirty());
    assert!(tree.atom("moov")?.is_dirty());
    assert!(tree.atom("moov.mvhd")?.is_dirty());
    assert!(!tree.atom("moov.trak")?.is_dirty());
    assert!(!tree.atom("moov.iods")?.is_dirty());

    tree.mark_clean();
    assert!(!tree.is_dirty());
    assert!(!tree.atom("moov.mvhd")?.is_dirty());
    Ok(())
}

#[test]
fn integer_overflow_leaves_cell_and_dirty_state_alone() {
    let mut tree = av_movie();
    let path = "moov.iods.audioProfileLevelId";

    assert!(!tree.set_integer_property(path, 300));
    assert!(!tree.set_integer_property(path, -1));
    assert_eq!(tree.get_integer_property(path), Some(0xFF));
    assert!(!tree.is_dirty());

    assert!(matches!(
        tree.try_set(path, 256u32),
        Err(PropertyError::Overflow { .. })
    ));
}

#[test]
fn bit_width_is_enforced_exactly() {
    let mut tree = av_movie();
    assert!(tree.set_integer_property("moov.mvhd.flags", 0xFF_FFFF));
    assert!(!tree.set_integer_property("moov.mvhd.flags", 0x100_0000));
    assert_eq!(tree.get_integer_property("moov.mvhd.flags"), Some(0xFF_FFFF));
}

#[test]
fn signed_cells_come_back_sign_extended() {
    let mut tree = av_movie();
    assert!(tree.set_integer_property("moov.trak.tkhd.layer", -1));
    let raw = tree.get_integer_property("moov.trak.tkhd.layer").unwrap();
    assert_eq!(raw as i64, -1);
    assert_eq!(tree.try_get::<i16>("moov.trak.tkhd.layer").unwrap(), -1);
    assert!(!tree.set_integer_property("moov.trak.tkhd.layer", 40000));
}

#[test]
fn kind_mismatch_fails_both_ways() {
    let mut tree = av_movie();
    assert_eq!(tree.get_float_property("moov.mvhd.timeScale"), None);
    assert_eq!(tree.get_string_property("moov.mvhd.timeScale"), None);
    assert_eq!(tree.get_integer_property("moov.mvhd.rate"), None);
    assert!(!tree.set_float_property("moov.mvhd.timeScale", 1.0));
    assert!(!tree.set_string_property("moov.mvhd.timeScale", "600"));
    assert!(!tree.set_bytes_property("moov.mvhd.timeScale", &[1]));
    assert!(matches!(
        tree.try_get::<f32>("moov.mvhd.timeScale"),
        Err(PropertyError::KindMismatch { .. })
    ));
    assert!(!tree.is_dirty());
}

#[test]
fn float_and_string_round_trip() {
    let mut tree = av_movie();

    assert_eq!(tree.get_float_property("moov.mvhd.rate"), Some(1.0));
    assert!(tree.set_float_property("moov.trak.tkhd.width", 1920.0));
    assert_eq!(tree.get_float_property("moov.trak.tkhd.width"), Some(1920.0));

    assert_eq!(tree.get_string_property("moov.trak[1].mdia.hdlr.handlerType"), Some("soun"));
    assert!(tree.set_string_property("moov.trak[1].mdia.hdlr.name", "SoundHandler"));
    assert_eq!(tree.get_string_property("moov.trak[1].mdia.hdlr.name"), Some("SoundHandler"));
}

#[test]
fn bytes_replace_whole_buffer() {
    let mut tree = av_movie();
    let path = "moov.trak.mdia.minf.stbl.stsd.mp4v.esds.decoderSpecificInfo";

    assert_eq!(tree.get_bytes_property(path), Some(&[][..]));
    assert!(tree.set_bytes_property(path, &[0xAA, 0xBB]));
    assert_eq!(tree.get_bytes_property(path), Some(&[0xAA, 0xBB][..]));
    assert!(tree.set_bytes_property(path, &[0x01]));
    assert_eq!(tree.get_bytes_property(path).map(<[u8]>::len), Some(1));
    assert_eq!(tree.get_bytes_property(path), Some(&[0x01][..]));
}

#[test]
fn fixed_length_bytes_reject_other_sizes() {
    let mut tree = av_movie();
    let path = "moov.mvhd.matrix";
    let before = tree.get_bytes_property(path).unwrap().to_vec();
    assert_eq!(before.len(), 36);

    assert!(!tree.set_bytes_property(path, &[0; 35]));
    assert_eq!(tree.get_bytes_property(path).unwrap(), &before[..]);
    assert!(matches!(
        tree.try_set(path, vec![0u8; 37]),
        Err(PropertyError::Overflow { .. })
    ));
    assert!(tree.set_bytes_property(path, &[0; 36]));
}

#[test]
fn table_cells_are_writable_through_paths() -> anyhow::Result<()> {
    let mut tree = av_movie();
    let path = "moov.trak[1].edts.elst.entries[0].mediaTime";

    assert!(tree.set_integer_property(path, -1));
    assert_eq!(tree.try_get::<i32>(path)?, -1);
    assert!(tree.atom("moov.trak[1].edts.elst")?.is_dirty());
    assert!(!tree.atom("moov.trak[0]")?.is_dirty());

    assert!(!tree.set_integer_property("moov.trak[1].edts.elst.entries[3].mediaTime", 0));
    assert!(!tree.set_integer_property("moov.trak[1].edts.elst.entries", 0));
    Ok(())
}

#[test]
fn missing_targets_fail_without_mutation() {
    let mut tree = av_movie();
    assert!(!tree.set_integer_property("moov.trak[5].tkhd.trackId", 5));
    assert!(!tree.set_integer_property("moov.mvhd", 5));
    assert!(!tree.set_string_property("moov..mvhd", "x"));
    assert!(!tree.is_dirty());
}
