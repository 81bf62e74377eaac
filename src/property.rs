use crate::error::{PropertyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared kind of a property cell.
///
/// Integer kinds carry an explicit bit width (1..=64) so that fields such as
/// the 24-bit `flags` of a full box are range-checked exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Unsigned { bits: u8 },
    Signed { bits: u8 },
    Float32,
    String,
    /// Byte blob; `fixed` pins the length, `None` accepts any size.
    Bytes { fixed: Option<usize> },
    /// Rows of named cells sharing one column layout.
    Table,
}

impl PropertyKind {
    pub const U8: Self = Self::Unsigned { bits: 8 };
    pub const U16: Self = Self::Unsigned { bits: 16 };
    pub const U24: Self = Self::Unsigned { bits: 24 };
    pub const U32: Self = Self::Unsigned { bits: 32 };
    pub const U64: Self = Self::Unsigned { bits: 64 };
    pub const I8: Self = Self::Signed { bits: 8 };
    pub const I16: Self = Self::Signed { bits: 16 };
    pub const I32: Self = Self::Signed { bits: 32 };
    pub const I64: Self = Self::Signed { bits: 64 };

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Unsigned { .. } | Self::Signed { .. })
    }

    /// Inclusive value range of an integer kind.
    ///
    /// Widths outside 1..=64 are treated as the nearest supported width, so
    /// the range never exceeds what a `u64` or `i64` can store.
    pub fn integer_range(&self) -> Option<(i128, i128)> {
        match self.normalized() {
            Self::Unsigned { bits } => Some((0, (1i128 << bits) - 1)),
            Self::Signed { bits } => {
                let half = 1i128 << (bits - 1);
                Some((-half, half - 1))
            }
            _ => None,
        }
    }

    /// Integer widths clamped to 1..=64; other kinds unchanged.
    pub fn normalized(self) -> Self {
        match self {
            Self::Unsigned { bits } => Self::Unsigned { bits: bits.clamp(1, 64) },
            Self::Signed { bits } => Self::Signed { bits: bits.clamp(1, 64) },
            other => other,
        }
    }

    /// The zero value of this kind, used for new cells and table rows.
    pub fn zero(&self) -> PropertyValue {
        match *self {
            Self::Unsigned { .. } => PropertyValue::Unsigned(0),
            Self::Signed { .. } => PropertyValue::Signed(0),
            Self::Float32 => PropertyValue::Float32(0.0),
            Self::String => PropertyValue::String(String::new()),
            Self::Bytes { fixed } => PropertyValue::Bytes(vec![0; fixed.unwrap_or(0)]),
            Self::Table => PropertyValue::Table(Vec::new()),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned { bits } => write!(f, "u{bits}"),
            Self::Signed { bits } => write!(f, "i{bits}"),
            Self::Float32 => write!(f, "f32"),
            Self::String => write!(f, "string"),
            Self::Bytes { fixed: Some(n) } => write!(f, "bytes[{n}]"),
            Self::Bytes { fixed: None } => write!(f, "bytes"),
            Self::Table => write!(f, "table"),
        }
    }
}

/// What a cell's value is measured in, as far as timing is concerned.
///
/// The rescaling engine selects fields by role, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRole {
    #[default]
    None,
    /// Ticks per second of the movie (`mvhd.timeScale`).
    MovieTimescale,
    /// A duration or timestamp counted in movie timescale ticks.
    MovieTicks,
    /// Ticks per second of a track's media (`mdhd.timeScale`).
    MediaTimescale,
    /// A duration or timestamp counted in media timescale ticks.
    MediaTicks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Unsigned(u64),
    Signed(i64),
    Float32(f32),
    String(String),
    Bytes(Vec<u8>),
    Table(Vec<Row>),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{}>", hex::encode(b)),
            Self::Table(rows) => write!(f, "[{} rows]", rows.len()),
        }
    }
}

/// One row of a table property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<Property>,
}

impl Row {
    pub fn cells(&self) -> &[Property] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Property] {
        &mut self.cells
    }

    pub fn cell(&self, name: &str) -> Option<&Property> {
        self.cells.iter().find(|c| c.name == name)
    }

    pub fn cell_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.cells.iter_mut().find(|c| c.name == name)
    }
}

/// A named, typed leaf value inside an atom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    name: String,
    kind: PropertyKind,
    value: PropertyValue,
    role: TimeRole,
    /// Column layout of a table; empty for scalar cells.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    columns: Vec<Property>,
}

impl Property {
    /// A cell holding the zero value of `kind`. Integer widths outside
    /// 1..=64 are clamped into that range.
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        let name = name.into();
        let kind = match kind.normalized() {
            k if k != kind => {
                tracing::warn!(property = %name, requested = %kind, using = %k, "unsupported integer width");
                k
            }
            k => k,
        };
        Self {
            name,
            kind,
            value: kind.zero(),
            role: TimeRole::None,
            columns: Vec::new(),
        }
    }

    pub fn unsigned(name: impl Into<String>, bits: u8) -> Self {
        Self::new(name, PropertyKind::Unsigned { bits })
    }

    pub fn signed(name: impl Into<String>, bits: u8) -> Self {
        Self::new(name, PropertyKind::Signed { bits })
    }

    pub fn float32(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Float32)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::String)
    }

    pub fn bytes(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Bytes { fixed: None })
    }

    pub fn fixed_bytes(name: impl Into<String>, len: usize) -> Self {
        Self::new(name, PropertyKind::Bytes { fixed: Some(len) })
    }

    /// A table whose rows are laid out like `columns`.
    pub fn table(name: impl Into<String>, columns: Vec<Property>) -> Self {
        let mut p = Self::new(name, PropertyKind::Table);
        p.columns = columns;
        p
    }

    pub fn with_role(mut self, role: TimeRole) -> Self {
        self.role = role;
        self
    }

    /// Replace the initial value. Intended for layout defaults; a value that
    /// does not fit the declared kind is rejected and the zero value kept.
    pub fn with_default(mut self, value: PropertyValue) -> Self {
        match self.check(value) {
            Ok(v) => self.value = v,
            Err(e) => tracing::warn!(property = %self.name, error = %e, "ignoring layout default"),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn role(&self) -> TimeRole {
        self.role
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn get<T: CellValue>(&self) -> Result<T> {
        T::read(self)
    }

    /// All-or-nothing: on error the cell keeps its previous value.
    pub fn set<T: CellValue>(&mut self, value: T) -> Result<()> {
        let v = value.write(self)?;
        self.value = v;
        Ok(())
    }

    /// Borrowed view of a string cell.
    pub fn as_str(&self) -> Result<&str> {
        match &self.value {
            PropertyValue::String(s) => Ok(s),
            _ => Err(self.mismatch("string")),
        }
    }

    /// Borrowed view of a bytes cell; valid until the cell is next mutated.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match &self.value {
            PropertyValue::Bytes(b) => Ok(b),
            _ => Err(self.mismatch("bytes")),
        }
    }

    /// Raw integer value regardless of declared width or signedness.
    pub fn integer(&self) -> Result<i128> {
        match self.value {
            PropertyValue::Unsigned(v) => Ok(v as i128),
            PropertyValue::Signed(v) => Ok(v as i128),
            _ => Err(self.mismatch("integer")),
        }
    }

    /// Validate an integer against the declared width without storing it.
    pub fn integer_value(&self, value: i128) -> Result<PropertyValue> {
        let (min, max) = self
            .kind
            .integer_range()
            .ok_or_else(|| self.mismatch("integer"))?;
        if value < min || value > max {
            return Err(self.overflow(value));
        }
        Ok(match self.kind {
            PropertyKind::Signed { .. } => PropertyValue::Signed(value as i64),
            _ => PropertyValue::Unsigned(value as u64),
        })
    }

    /// Store a value already produced by [`Property::integer_value`] or
    /// [`CellValue::write`] for this cell.
    pub(crate) fn replace(&mut self, value: PropertyValue) {
        self.value = value;
    }

    pub fn rows(&self) -> &[Row] {
        match &self.value {
            PropertyValue::Table(rows) => rows,
            _ => &[],
        }
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Row] {
        match &mut self.value {
            PropertyValue::Table(rows) => rows,
            _ => &mut [],
        }
    }

    pub fn row(&self, index: usize) -> Result<&Row> {
        let len = self.row_count()?;
        self.rows().get(index).ok_or_else(|| self.out_of_range(index, len))
    }

    pub fn row_mut(&mut self, index: usize) -> Result<&mut Row> {
        let len = self.row_count()?;
        let err = self.out_of_range(index, len);
        self.rows_mut().get_mut(index).ok_or(err)
    }

    pub fn row_count(&self) -> Result<usize> {
        match &self.value {
            PropertyValue::Table(rows) => Ok(rows.len()),
            _ => Err(self.mismatch("table")),
        }
    }

    /// Append a row of column defaults and return it for filling in.
    ///
    /// Rows are created by whoever builds the tree; the accessors never add them.
    pub fn push_row(&mut self) -> Result<&mut Row> {
        let Self { name, kind, value, columns, .. } = self;
        match value {
            PropertyValue::Table(rows) => {
                rows.push(Row { cells: columns.clone() });
                let last = rows.len() - 1;
                Ok(&mut rows[last])
            }
            _ => Err(PropertyError::KindMismatch {
                name: name.clone(),
                found: *kind,
                requested: "table",
            }),
        }
    }

    fn check(&self, value: PropertyValue) -> Result<PropertyValue> {
        match value {
            PropertyValue::Unsigned(v) => self.integer_value(v as i128),
            PropertyValue::Signed(v) => self.integer_value(v as i128),
            PropertyValue::Float32(v) => v.write(self),
            PropertyValue::String(s) => s.write(self),
            PropertyValue::Bytes(b) => b.write(self),
            PropertyValue::Table(_) => Err(self.mismatch("table")),
        }
    }

    pub(crate) fn mismatch(&self, requested: &'static str) -> PropertyError {
        PropertyError::KindMismatch {
            name: self.name.clone(),
            found: self.kind,
            requested,
        }
    }

    fn overflow(&self, value: impl fmt::Display) -> PropertyError {
        PropertyError::Overflow {
            name: self.name.clone(),
            kind: self.kind,
            value: value.to_string(),
        }
    }

    fn out_of_range(&self, index: usize, len: usize) -> PropertyError {
        PropertyError::OutOfRange {
            name: self.name.clone(),
            index,
            len,
        }
    }
}

/// A Rust type that can be read from and written to a property cell.
///
/// Reads only widen: an integer cell can be read as any integer type that
/// holds every value of its declared width. Writes range-check the value
/// against the cell's declared width instead.
pub trait CellValue: Sized {
    const NAME: &'static str;

    fn read(prop: &Property) -> Result<Self>;

    /// Convert into the stored representation for `prop`, or fail.
    fn write(self, prop: &Property) -> Result<PropertyValue>;
}

macro_rules! unsigned_cell {
    ($($t:ty => $name:literal),*) => {$(
        impl CellValue for $t {
            const NAME: &'static str = $name;

            fn read(prop: &Property) -> Result<Self> {
                match (prop.kind.normalized(), &prop.value) {
                    (PropertyKind::Unsigned { bits }, PropertyValue::Unsigned(v))
                        if u32::from(bits) <= <$t>::BITS => Ok(*v as $t),
                    _ => Err(prop.mismatch(Self::NAME)),
                }
            }

            fn write(self, prop: &Property) -> Result<PropertyValue> {
                prop.integer_value(self as i128)
            }
        }
    )*};
}

macro_rules! signed_cell {
    ($($t:ty => $name:literal),*) => {$(
        impl CellValue for $t {
            const NAME: &'static str = $name;

            fn read(prop: &Property) -> Result<Self> {
                match (prop.kind.normalized(), &prop.value) {
                    (PropertyKind::Signed { bits }, PropertyValue::Signed(v))
                        if u32::from(bits) <= <$t>::BITS => Ok(*v as $t),
                    (PropertyKind::Unsigned { bits }, PropertyValue::Unsigned(v))
                        if u32::from(bits) < <$t>::BITS => Ok(*v as $t),
                    _ => Err(prop.mismatch(Self::NAME)),
                }
            }

            fn write(self, prop: &Property) -> Result<PropertyValue> {
                prop.integer_value(self as i128)
            }
        }
    )*};
}

unsigned_cell!(u8 => "u8", u16 => "u16", u32 => "u32", u64 => "u64");
signed_cell!(i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64");

impl CellValue for f32 {
    const NAME: &'static str = "f32";

    fn read(prop: &Property) -> Result<Self> {
        match prop.value {
            PropertyValue::Float32(v) => Ok(v),
            _ => Err(prop.mismatch(Self::NAME)),
        }
    }

    fn write(self, prop: &Property) -> Result<PropertyValue> {
        match prop.kind {
            PropertyKind::Float32 => Ok(PropertyValue::Float32(self)),
            _ => Err(prop.mismatch(Self::NAME)),
        }
    }
}

impl CellValue for String {
    const NAME: &'static str = "string";

    fn read(prop: &Property) -> Result<Self> {
        prop.as_str().map(str::to_owned)
    }

    fn write(self, prop: &Property) -> Result<PropertyValue> {
        match prop.kind {
            PropertyKind::String => Ok(PropertyValue::String(self)),
            _ => Err(prop.mismatch(Self::NAME)),
        }
    }
}

impl CellValue for Vec<u8> {
    const NAME: &'static str = "bytes";

    fn read(prop: &Property) -> Result<Self> {
        prop.as_bytes().map(<[u8]>::to_vec)
    }

    fn write(self, prop: &Property) -> Result<PropertyValue> {
        match prop.kind {
            PropertyKind::Bytes { fixed: Some(n) } if self.len() != n => {
                Err(prop.overflow(format!("{} bytes", self.len())))
            }
            PropertyKind::Bytes { .. } => Ok(PropertyValue::Bytes(self)),
            _ => Err(prop.mismatch(Self::NAME)),
        }
    }
}
