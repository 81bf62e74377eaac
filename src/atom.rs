use crate::boxes::FourCC;
use crate::error::{PropertyError, Result};
use crate::property::Property;
use std::collections::HashMap;

/// One box instance in the tree.
///
/// Children keep their insertion order; same-typed siblings form a group that
/// is indexed from zero. Property names are unique within an atom.
#[derive(Debug, Clone)]
pub struct Atom {
    typ: FourCC,
    properties: Vec<Property>,
    children: Vec<Atom>,
    groups: HashMap<FourCC, Vec<usize>>,
    dirty: bool,
}

impl Atom {
    pub fn new(typ: FourCC) -> Self {
        Self {
            typ,
            properties: Vec::new(),
            children: Vec::new(),
            groups: HashMap::new(),
            dirty: false,
        }
    }

    /// Synthetic parent of the top-level boxes (`ftyp`, `moov`, ...).
    pub fn root() -> Self {
        Self::new(FourCC::ROOT)
    }

    pub fn typ(&self) -> FourCC {
        self.typ
    }

    // ---------- construction (used by the tree builder, not by the accessors) ----------

    pub fn with_child(mut self, child: Atom) -> Self {
        self.push_child(child);
        self
    }

    pub fn with_property(mut self, prop: Property) -> Self {
        self.push_property(prop);
        self
    }

    pub fn push_child(&mut self, child: Atom) -> &mut Atom {
        let idx = self.children.len();
        self.groups.entry(child.typ).or_default().push(idx);
        self.children.push(child);
        &mut self.children[idx]
    }

    /// Add a property, replacing any existing one of the same name.
    pub fn push_property(&mut self, prop: Property) {
        match self.properties.iter_mut().find(|p| p.name() == prop.name()) {
            Some(existing) => {
                tracing::debug!(atom = %self.typ, property = prop.name(), "replacing property");
                *existing = prop;
            }
            None => self.properties.push(prop),
        }
    }

    // ---------- lookups ----------

    fn group(&self, name: &str) -> Option<&[usize]> {
        FourCC::from_str(name)
            .and_then(|cc| self.groups.get(&cc))
            .map(Vec::as_slice)
    }

    pub fn has_child_group(&self, name: &str) -> bool {
        self.group(name).is_some()
    }

    pub fn child_count(&self, name: &str) -> usize {
        self.group(name).map_or(0, <[usize]>::len)
    }

    pub fn child_at(&self, name: &str, index: usize) -> Result<&Atom> {
        let idx = self.child_slot(name, index)?;
        Ok(&self.children[idx])
    }

    pub fn child_at_mut(&mut self, name: &str, index: usize) -> Result<&mut Atom> {
        let idx = self.child_slot(name, index)?;
        Ok(&mut self.children[idx])
    }

    fn child_slot(&self, name: &str, index: usize) -> Result<usize> {
        let group = self
            .group(name)
            .ok_or_else(|| PropertyError::not_found(name))?;
        group.get(index).copied().ok_or_else(|| PropertyError::OutOfRange {
            name: name.to_string(),
            index,
            len: group.len(),
        })
    }

    /// Children of one type in declaration order.
    pub fn children_of<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Atom> + use<'a> {
        let group = self.group(name).unwrap_or(&[]);
        group.iter().map(move |&i| &self.children[i])
    }

    pub fn children(&self) -> &[Atom] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Atom] {
        &mut self.children
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name() == name)
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut [Property] {
        &mut self.properties
    }

    // ---------- dirty tracking ----------

    /// True once any property in this atom or below it has been written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
        for c in &mut self.children {
            c.mark_clean();
        }
    }
}
