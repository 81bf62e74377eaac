use crate::atom::Atom;
use crate::error::Result;
use crate::path::{self, PropertyPath, Target};
use crate::property::{CellValue, Property, PropertyValue};

/// Exclusively owned atom tree of one open file.
///
/// Reads take `&self` and never mutate, so concurrent readers are fine;
/// writes take `&mut self`. Every successful write raises the dirty signal
/// for the external serializer.
#[derive(Debug, Clone)]
pub struct AtomTree {
    root: Atom,
    dirty: bool,
}

impl AtomTree {
    /// Wrap a tree produced by the box reader. `root` is the synthetic parent
    /// of the top-level boxes.
    pub fn new(root: Atom) -> Self {
        Self { root, dirty: false }
    }

    pub fn root(&self) -> &Atom {
        &self.root
    }

    /// Structural access for the tree builder. Writes through this reference
    /// bypass the dirty signal.
    pub fn root_mut(&mut self) -> &mut Atom {
        &mut self.root
    }

    pub fn into_root(self) -> Atom {
        self.root
    }

    /// True when the tree holds writes that have not been persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the writer once the tree has been serialized.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
        self.root.mark_clean();
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    // ---------- typed access with full error reporting ----------

    pub fn resolve(&self, path: &str) -> Result<Target<'_>> {
        path::resolve(&self.root, &PropertyPath::parse(path)?)
    }

    pub fn property(&self, path: &str) -> Result<&Property> {
        path::resolve_property(&self.root, &PropertyPath::parse(path)?)
    }

    pub fn atom(&self, path: &str) -> Result<&Atom> {
        path::resolve_atom(&self.root, &PropertyPath::parse(path)?)
    }

    /// Like [`AtomTree::have_atom`], but says why the path does not resolve.
    pub fn try_have(&self, path: &str) -> Result<()> {
        self.resolve(path).map(|_| ())
    }

    pub fn try_get<T: CellValue>(&self, path: &str) -> Result<T> {
        self.property(path)?.get()
    }

    pub fn try_get_str(&self, path: &str) -> Result<&str> {
        self.property(path)?.as_str()
    }

    pub fn try_get_bytes(&self, path: &str) -> Result<&[u8]> {
        self.property(path)?.as_bytes()
    }

    pub fn try_set<T: CellValue>(&mut self, path: &str, value: T) -> Result<()> {
        let path = PropertyPath::parse(path)?;
        self.update(&path, |prop| prop.set(value))
    }

    /// Run `f` on the cell at `path`; a success marks the path and tree dirty.
    pub(crate) fn update<R>(
        &mut self,
        path: &PropertyPath,
        f: impl FnOnce(&mut Property) -> Result<R>,
    ) -> Result<R> {
        let out = path::update_property(&mut self.root, path, f)?;
        self.mark_dirty();
        Ok(out)
    }

    // ---------- generic accessors ----------
    //
    // These keep the boolean shape of the classic API: every failure kind
    // collapses to `false` / `None`. The reason is logged at debug level.

    /// True when `path` resolves to an atom or a property.
    pub fn have_atom(&self, path: &str) -> bool {
        collapse(path, "have", self.try_have(path)).is_some()
    }

    /// Integer value of any width. Signed cells are returned sign-extended
    /// to 64 bits, so `v as i64` recovers the stored value.
    pub fn get_integer_property(&self, path: &str) -> Option<u64> {
        let value = self.property(path).and_then(|p| match p.value() {
            PropertyValue::Unsigned(v) => Ok(*v),
            PropertyValue::Signed(v) => Ok(*v as u64),
            _ => Err(p.mismatch("integer")),
        });
        collapse(path, "get integer", value)
    }

    pub fn get_float_property(&self, path: &str) -> Option<f32> {
        collapse(path, "get float", self.try_get::<f32>(path))
    }

    /// Borrowed from the tree; valid until the next write to the tree.
    pub fn get_string_property(&self, path: &str) -> Option<&str> {
        collapse(path, "get string", self.try_get_str(path))
    }

    /// Borrowed from the tree; valid until the next write to the tree.
    pub fn get_bytes_property(&self, path: &str) -> Option<&[u8]> {
        collapse(path, "get bytes", self.try_get_bytes(path))
    }

    /// Fails without modification when `value` does not fit the declared width.
    pub fn set_integer_property(&mut self, path: &str, value: i64) -> bool {
        let r = self.try_set(path, value);
        collapse(path, "set integer", r).is_some()
    }

    pub fn set_float_property(&mut self, path: &str, value: f32) -> bool {
        let r = self.try_set(path, value);
        collapse(path, "set float", r).is_some()
    }

    pub fn set_string_property(&mut self, path: &str, value: &str) -> bool {
        let r = self.try_set(path, value.to_string());
        collapse(path, "set string", r).is_some()
    }

    /// Replaces the whole buffer; the cell reports the new size afterwards.
    pub fn set_bytes_property(&mut self, path: &str, value: &[u8]) -> bool {
        let r = self.try_set(path, value.to_vec());
        collapse(path, "set bytes", r).is_some()
    }
}

pub(crate) fn collapse<T>(path: &str, op: &'static str, r: Result<T>) -> Option<T> {
    match r {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!(path, op, error = %e, "property access failed");
            None
        }
    }
}
