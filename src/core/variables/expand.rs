//! Cartesian expansion of aligned axes into bindings.

use indexmap::IndexMap;

use super::groups::Axis;
use crate::binding::Binding;
use crate::error::Result;
use crate::template;

/// Cross product over all axes, in axis order, then per-binding resolution.
pub fn expand(axes: &IndexMap<String, Axis>) -> Result<Vec<Binding>> {
    let mut bindings = cross_product(axes);
    for binding in &mut bindings {
        template::resolve_in_place(binding.values_mut())?;
    }
    Ok(bindings)
}

pub fn cross_product(axes: &IndexMap<String, Axis>) -> Vec<Binding> {
    let mut bindings = vec![Binding::default()];

    for (key, axis) in axes {
        let mut next = Vec::with_capacity(bindings.len() * axis.len());
        for partial in &bindings {
            match axis {
                Axis::Scalar(value) => {
                    let mut binding = partial.clone();
                    binding.insert_if_absent(key, value);
                    next.push(binding);
                }
                Axis::List(values) => {
                    for value in values {
                        let mut binding = partial.clone();
                        binding.insert_if_absent(key, value);
                        next.push(binding);
                    }
                }
                Axis::Group(records) => {
                    for record in records {
                        let mut binding = partial.clone();
                        for (field, value) in record {
                            binding.insert_if_absent(field, value);
                        }
                        next.push(binding);
                    }
                }
            }
        }
        bindings = next;
    }

    bindings
}
