use crate::boxes::FourCC;

/// Typed view over the boxes whose fields this crate addresses.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level / top-level
    Ftyp,
    Moov,
    Mdat,
    Free,

    // moov children
    Mvhd,
    Iods,
    Trak,
    Mvex,
    Udta,

    // mvex children
    Mehd,

    // trak children
    Tkhd,
    Edts,
    Mdia,

    // edts children
    Elst,

    // mdia children
    Mdhd,
    Hdlr,
    Minf,

    // minf children
    Vmhd,
    Smhd,
    Dinf,
    Stbl,

    // stbl children
    Stsd,

    // Sample entries and their descriptors
    Mp4v,
    Avc1,
    Mp4a,
    Esds,

    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"moov" => KnownBox::Moov,
            b"mdat" => KnownBox::Mdat,
            b"free" => KnownBox::Free,
            b"mvhd" => KnownBox::Mvhd,
            b"iods" => KnownBox::Iods,
            b"trak" => KnownBox::Trak,
            b"mvex" => KnownBox::Mvex,
            b"udta" => KnownBox::Udta,
            b"mehd" => KnownBox::Mehd,
            b"tkhd" => KnownBox::Tkhd,
            b"edts" => KnownBox::Edts,
            b"mdia" => KnownBox::Mdia,
            b"elst" => KnownBox::Elst,
            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,
            b"vmhd" => KnownBox::Vmhd,
            b"smhd" => KnownBox::Smhd,
            b"dinf" => KnownBox::Dinf,
            b"stbl" => KnownBox::Stbl,
            b"stsd" => KnownBox::Stsd,
            b"mp4v" => KnownBox::Mp4v,
            b"avc1" => KnownBox::Avc1,
            b"mp4a" => KnownBox::Mp4a,
            b"esds" => KnownBox::Esds,
            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Iods => "Initial Object Descriptor Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Mvex => "Movie Extends Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Mehd => "Movie Extends Header Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Elst => "Edit List Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Vmhd => "Video Media Header Box",
            KnownBox::Smhd => "Sound Media Header Box",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Mp4v => "MPEG-4 Visual Sample Entry",
            KnownBox::Avc1 => "AVC Sample Entry",
            KnownBox::Mp4a => "MPEG-4 Audio Sample Entry",
            KnownBox::Esds => "Elementary Stream Descriptor Box",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }

    /// Boxes whose payload is (or ends with) child boxes.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            KnownBox::Moov
                | KnownBox::Trak
                | KnownBox::Mvex
                | KnownBox::Udta
                | KnownBox::Edts
                | KnownBox::Mdia
                | KnownBox::Minf
                | KnownBox::Dinf
                | KnownBox::Stbl
                | KnownBox::Stsd
                | KnownBox::Mp4v
                | KnownBox::Avc1
                | KnownBox::Mp4a
        )
    }

    /// Boxes that start with a version byte and 24-bit flags.
    pub fn is_full_box(&self) -> bool {
        matches!(
            self,
            KnownBox::Mvhd
                | KnownBox::Iods
                | KnownBox::Mehd
                | KnownBox::Tkhd
                | KnownBox::Elst
                | KnownBox::Mdhd
                | KnownBox::Hdlr
                | KnownBox::Vmhd
                | KnownBox::Smhd
                | KnownBox::Stsd
                | KnownBox::Esds
        )
    }
}
