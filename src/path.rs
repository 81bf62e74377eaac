//! Textual property paths and their resolution against an atom tree.
//!
//! A path is a dot-separated list of steps, e.g. `moov.trak[1].tkhd.duration`.
//! Each step names a child atom group or a property of the current atom and
//! may carry a bracketed zero-based index (default 0). Table properties are
//! indexed by row and followed by a column name:
//! `moov.trak.edts.elst.entries[2].segmentDuration`.
//!
//! Only brackets introduce an index; box codes such as `avc1` or `co64` end in
//! digits that are part of the name.

use crate::atom::Atom;
use crate::error::{PropertyError, Result};
use crate::property::{Property, PropertyKind, Row};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub name: String,
    pub index: Option<usize>,
}

impl PathStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), index: None }
    }

    pub fn indexed(name: impl Into<String>, index: usize) -> Self {
        Self { name: name.into(), index: Some(index) }
    }

    /// Effective index; an omitted index selects the first entry.
    pub fn index(&self) -> usize {
        self.index.unwrap_or(0)
    }

    fn parse(raw: &str, whole: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(PropertyError::invalid(format!("empty step in {whole:?}")));
        }
        let Some(open) = raw.find('[') else {
            if raw.contains(']') {
                return Err(PropertyError::invalid(format!("stray ']' in {whole:?}")));
            }
            return Ok(Self::new(raw));
        };
        if !raw.ends_with(']') {
            return Err(PropertyError::invalid(format!("unterminated index in {whole:?}")));
        }
        let name = &raw[..open];
        let digits = &raw[open + 1..raw.len() - 1];
        if name.is_empty() {
            return Err(PropertyError::invalid(format!("index without a name in {whole:?}")));
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PropertyError::invalid(format!("bad index {digits:?} in {whole:?}")));
        }
        let index = digits
            .parse::<usize>()
            .map_err(|e| PropertyError::invalid(format!("bad index {digits:?}: {e}")))?;
        Ok(Self::indexed(name, index))
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.name, i),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    steps: Vec<PathStep>,
}

impl PropertyPath {
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(PropertyError::invalid("empty path"));
        }
        let steps = s
            .split('.')
            .map(|raw| PathStep::parse(raw, s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps })
    }

    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }
}

impl FromStr for PropertyPath {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// What a path resolved to.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Atom(&'a Atom),
    Property(&'a Property),
    /// An indexed row of a table property, with no column named.
    Row(&'a Row),
}

/// Walk `path` starting at `start`. Never mutates the tree.
pub fn resolve<'a>(start: &'a Atom, path: &PropertyPath) -> Result<Target<'a>> {
    let mut atom = start;
    let mut steps = path.steps();
    while let Some((step, rest)) = steps.split_first() {
        if atom.has_child_group(&step.name) {
            atom = atom.child_at(&step.name, step.index())?;
            steps = rest;
            continue;
        }
        let prop = atom
            .property(&step.name)
            .ok_or_else(|| PropertyError::not_found(&step.name))?;
        return resolve_in_property(prop, step, rest);
    }
    Ok(Target::Atom(atom))
}

fn resolve_in_property<'a>(
    prop: &'a Property,
    step: &PathStep,
    rest: &[PathStep],
) -> Result<Target<'a>> {
    match (prop.kind(), rest.split_first()) {
        (PropertyKind::Table, None) => match step.index {
            Some(i) => prop.row(i).map(Target::Row),
            None => Ok(Target::Property(prop)),
        },
        (PropertyKind::Table, Some((column, rest))) => {
            let cell = prop
                .row(step.index())?
                .cell(&column.name)
                .ok_or_else(|| PropertyError::not_found(&column.name))?;
            resolve_in_property(cell, column, rest)
        }
        (_, Some((next, _))) => Err(PropertyError::not_found(&next.name)),
        (_, None) => {
            scalar_index(step)?;
            Ok(Target::Property(prop))
        }
    }
}

/// A scalar cell behaves as a group of one.
fn scalar_index(step: &PathStep) -> Result<()> {
    if step.index() == 0 {
        Ok(())
    } else {
        Err(PropertyError::OutOfRange {
            name: step.name.clone(),
            index: step.index(),
            len: 1,
        })
    }
}

/// Resolve `path` to a property cell; atoms and bare rows are rejected.
pub fn resolve_property<'a>(start: &'a Atom, path: &PropertyPath) -> Result<&'a Property> {
    match resolve(start, path)? {
        Target::Property(p) => Ok(p),
        Target::Atom(a) => Err(PropertyError::not_found(format!("{path}: {} is an atom", a.typ()))),
        Target::Row(_) => Err(PropertyError::not_found(format!("{path}: names a row, not a cell"))),
    }
}

/// Resolve `path` to an atom.
pub fn resolve_atom<'a>(start: &'a Atom, path: &PropertyPath) -> Result<&'a Atom> {
    match resolve(start, path)? {
        Target::Atom(a) => Ok(a),
        _ => Err(PropertyError::not_found(format!("{path}: not an atom"))),
    }
}

/// Resolve `path` mutably and hand the cell to `f`.
///
/// When `f` succeeds every atom on the way down is marked dirty. When any
/// step or `f` fails nothing is marked.
pub fn update_property<R>(
    start: &mut Atom,
    path: &PropertyPath,
    f: impl FnOnce(&mut Property) -> Result<R>,
) -> Result<R> {
    update_in_atom(start, path.steps(), f)
}

fn update_in_atom<R>(
    atom: &mut Atom,
    steps: &[PathStep],
    f: impl FnOnce(&mut Property) -> Result<R>,
) -> Result<R> {
    let Some((step, rest)) = steps.split_first() else {
        return Err(PropertyError::not_found(format!("{} is an atom", atom.typ())));
    };
    let out = if atom.has_child_group(&step.name) {
        let child = atom.child_at_mut(&step.name, step.index())?;
        update_in_atom(child, rest, f)?
    } else {
        let prop = atom
            .property_mut(&step.name)
            .ok_or_else(|| PropertyError::not_found(&step.name))?;
        update_in_property(prop, step, rest, f)?
    };
    atom.mark_dirty();
    Ok(out)
}

fn update_in_property<R>(
    prop: &mut Property,
    step: &PathStep,
    rest: &[PathStep],
    f: impl FnOnce(&mut Property) -> Result<R>,
) -> Result<R> {
    match (prop.kind(), rest.split_first()) {
        (PropertyKind::Table, Some((column, rest))) => {
            let cell = prop
                .row_mut(step.index())?
                .cell_mut(&column.name)
                .ok_or_else(|| PropertyError::not_found(&column.name))?;
            update_in_property(cell, column, rest, f)
        }
        (_, Some((next, _))) => Err(PropertyError::not_found(&next.name)),
        (PropertyKind::Table, None) => f(prop),
        (_, None) => {
            scalar_index(step)?;
            f(prop)
        }
    }
}
