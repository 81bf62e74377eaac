//! Rewriting movie-timescale fields when the movie timescale changes.
//!
//! Rescaling runs in two phases. [`plan`] walks the tree read-only, computes
//! the new value of every cell whose role is [`TimeRole::MovieTicks`] and
//! checks it against the cell's declared width. [`commit`] then writes the
//! planned values in the same traversal order. Any overflow surfaces from
//! `plan`, before a single cell has been touched.

use crate::atom::Atom;
use crate::error::{PropertyError, Result};
use crate::property::{Property, PropertyKind, PropertyValue, TimeRole};

/// `value * to / from`, rounded half to even.
pub fn convert_time(value: i128, from: u32, to: u32) -> Result<i128> {
    if from == 0 || to == 0 {
        return Err(PropertyError::invalid(format!(
            "cannot convert between timescales {from} and {to}"
        )));
    }
    if from == to {
        return Ok(value);
    }
    let magnitude = value.unsigned_abs();
    let num = magnitude
        .checked_mul(u128::from(to))
        .ok_or_else(|| too_large(value, from, to))?;
    let den = u128::from(from);
    let mut q = num / den;
    let r = num % den;
    if r * 2 > den || (r * 2 == den && q % 2 == 1) {
        q += 1;
    }
    let q = i128::try_from(q).map_err(|_| too_large(value, from, to))?;
    Ok(if value < 0 { -q } else { q })
}

fn too_large(value: i128, from: u32, to: u32) -> PropertyError {
    PropertyError::Overflow {
        name: format!("ticks at timescale {from} -> {to}"),
        kind: PropertyKind::I64,
        value: value.to_string(),
    }
}

/// New values for every movie-tick cell, in traversal order.
#[derive(Debug, Clone)]
pub struct RescalePlan {
    from: u32,
    to: u32,
    values: Vec<PropertyValue>,
}

impl RescalePlan {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }
}

/// Compute the rescaled value of every movie-tick cell below `root`.
pub fn plan(root: &Atom, from: u32, to: u32) -> Result<RescalePlan> {
    convert_time(0, from, to)?;
    let mut values = Vec::new();
    visit(root, &mut |prop: &Property| {
        if prop.role() != TimeRole::MovieTicks || !prop.kind().is_integer() {
            return Ok(());
        }
        let new = convert_time(prop.integer()?, from, to)?;
        match prop.integer_value(new) {
            Ok(v) => {
                values.push(v);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(property = prop.name(), from, to, error = %e, "rescale would overflow");
                Err(e)
            }
        }
    })?;
    tracing::debug!(from, to, fields = values.len(), "rescale planned");
    Ok(RescalePlan { from, to, values })
}

/// Write a plan produced by [`plan`] against the same, unmodified tree.
///
/// Returns the number of cells written. Atoms holding a rewritten cell, and
/// their ancestors, are marked dirty.
pub fn commit(root: &mut Atom, plan: RescalePlan) -> usize {
    let RescalePlan { from, to, values } = plan;
    let mut values = values.into_iter();
    let mut written = 0;
    visit_mut(root, &mut |prop: &mut Property| {
        if prop.role() != TimeRole::MovieTicks || !prop.kind().is_integer() {
            return false;
        }
        match values.next() {
            Some(v) => {
                prop.replace(v);
                written += 1;
                true
            }
            None => false,
        }
    });
    tracing::info!(from, to, fields = written, "rescaled movie timescale fields");
    written
}

/// Plan and commit in one step; the tree is untouched when this fails.
pub fn rescale(root: &mut Atom, from: u32, to: u32) -> Result<usize> {
    let plan = plan(root, from, to)?;
    Ok(commit(root, plan))
}

fn visit(atom: &Atom, f: &mut dyn FnMut(&Property) -> Result<()>) -> Result<()> {
    for prop in atom.properties() {
        visit_property(prop, f)?;
    }
    for child in atom.children() {
        visit(child, f)?;
    }
    Ok(())
}

fn visit_property(prop: &Property, f: &mut dyn FnMut(&Property) -> Result<()>) -> Result<()> {
    if prop.kind() == PropertyKind::Table {
        for row in prop.rows() {
            for cell in row.cells() {
                visit_property(cell, f)?;
            }
        }
        return Ok(());
    }
    f(prop)
}

fn visit_mut(atom: &mut Atom, f: &mut dyn FnMut(&mut Property) -> bool) -> bool {
    let mut touched = false;
    for prop in atom.properties_mut() {
        touched |= visit_property_mut(prop, f);
    }
    for child in atom.children_mut() {
        touched |= visit_mut(child, f);
    }
    if touched {
        atom.mark_dirty();
    }
    touched
}

fn visit_property_mut(prop: &mut Property, f: &mut dyn FnMut(&mut Property) -> bool) -> bool {
    if prop.kind() == PropertyKind::Table {
        let mut touched = false;
        for row in prop.rows_mut() {
            for cell in row.cells_mut() {
                touched |= visit_property_mut(cell, f);
            }
        }
        return touched;
    }
    f(prop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_exact_ratios() {
        assert_eq!(convert_time(1200, 600, 1000).unwrap(), 2000);
        assert_eq!(convert_time(48000, 48000, 1000).unwrap(), 1000);
        assert_eq!(convert_time(7, 90000, 90000).unwrap(), 7);
    }

    #[test]
    fn rounds_half_to_even() {
        // 1 * 1 / 2 = 0.5 -> 0, 3 * 1 / 2 = 1.5 -> 2, 5 * 1 / 2 = 2.5 -> 2
        assert_eq!(convert_time(1, 2, 1).unwrap(), 0);
        assert_eq!(convert_time(3, 2, 1).unwrap(), 2);
        assert_eq!(convert_time(5, 2, 1).unwrap(), 2);
        assert_eq!(convert_time(-3, 2, 1).unwrap(), -2);
        // 10 * 1 / 3 = 3.33 -> 3, 20 * 1 / 3 = 6.67 -> 7
        assert_eq!(convert_time(10, 3, 1).unwrap(), 3);
        assert_eq!(convert_time(20, 3, 1).unwrap(), 7);
    }

    #[test]
    fn zero_timescale_is_rejected() {
        assert!(matches!(convert_time(1, 0, 1), Err(PropertyError::InvalidArgument(_))));
        assert!(matches!(convert_time(1, 1, 0), Err(PropertyError::InvalidArgument(_))));
    }

    #[test]
    fn u64_range_does_not_overflow_intermediate() {
        let v = convert_time(u64::MAX as i128, 1, u32::MAX).unwrap();
        assert_eq!(v, u64::MAX as i128 * u32::MAX as i128);
    }

    #[test]
    fn oversized_results_are_overflow() {
        assert!(matches!(convert_time(i128::MAX, 1, 2), Err(PropertyError::Overflow { .. })));
        assert!(matches!(
            convert_time(i128::MIN, 1, u32::MAX),
            Err(PropertyError::Overflow { .. })
        ));
    }

    fn movie_header(duration: u64, bits: u8) -> Atom {
        let mut duration_cell = Property::unsigned("duration", bits).with_role(TimeRole::MovieTicks);
        duration_cell.set(duration).unwrap();
        Atom::new(crate::boxes::FourCC(*b"mvhd"))
            .with_property(Property::unsigned("timeScale", 32).with_role(TimeRole::MovieTimescale))
            .with_property(duration_cell)
    }

    #[test]
    fn plan_lists_new_values_then_commit_writes_them() {
        let mut root = Atom::root().with_child(movie_header(1200, 32));
        let plan = plan(&root, 600, 1000).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(!plan.is_empty());
        assert_eq!(plan.values(), &[PropertyValue::Unsigned(2000)]);
        assert!(!root.is_dirty());

        assert_eq!(commit(&mut root, plan), 1);
        assert!(root.is_dirty());
        let mvhd = root.child_at("mvhd", 0).unwrap();
        assert_eq!(mvhd.property("duration").unwrap().get::<u32>().unwrap(), 2000);
        // timescale cells are left to the caller
        assert_eq!(mvhd.property("timeScale").unwrap().get::<u32>().unwrap(), 0);
    }

    #[test]
    fn empty_plan_without_movie_ticks() {
        let root = Atom::root();
        assert!(plan(&root, 1, 2).unwrap().is_empty());
    }

    #[test]
    fn widths_past_64_bits_still_overflow() {
        let mut root = Atom::root().with_child(movie_header(u64::MAX, 80));
        let err = rescale(&mut root, 1, 2).unwrap_err();
        assert!(matches!(err, PropertyError::Overflow { .. }));
        let mvhd = root.child_at("mvhd", 0).unwrap();
        assert_eq!(mvhd.property("duration").unwrap().get::<u64>().unwrap(), u64::MAX);
        assert!(!root.is_dirty());

        assert_eq!(rescale(&mut root, 2, 1).unwrap(), 1);
        let mvhd = root.child_at("mvhd", 0).unwrap();
        assert_eq!(mvhd.property("duration").unwrap().get::<u64>().unwrap(), u64::MAX / 2 + 1);
    }
}
