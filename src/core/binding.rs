//! Bindings and the projection/filter operations over binding sets.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::error::Result;
use crate::template;

/// Ordered set of variable names a step depends on.
pub type ParamSet = IndexSet<String>;

/// One fully resolved assignment of variable name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Binding {
    values: IndexMap<String, String>,
}

impl Binding {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn insert_if_absent(&mut self, name: &str, value: &str) {
        if !self.values.contains_key(name) {
            self.values.insert(name.to_string(), value.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &IndexMap<String, String> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut IndexMap<String, String> {
        &mut self.values
    }

    /// Keep only `params`, in `params` order. Names the binding lacks are skipped.
    pub fn project(&self, params: &ParamSet) -> Binding {
        Binding {
            values: params
                .iter()
                .filter_map(|name| {
                    self.values
                        .get(name)
                        .map(|value| (name.clone(), value.clone()))
                })
                .collect(),
        }
    }

    /// True when every key present in both bindings has the same value.
    pub fn agrees_with(&self, fixed: &Binding) -> bool {
        fixed
            .values
            .iter()
            .all(|(name, value)| self.values.get(name).is_none_or(|own| own == value))
    }

    /// This binding overlaid with `other`; `other` wins on shared keys.
    pub fn merged_with(&self, other: &Binding) -> Binding {
        let mut merged = self.clone();
        for (name, value) in &other.values {
            merged.values.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Substitute this binding's values into `template`.
    pub fn format(&self, template_str: &str) -> Result<String> {
        template::render_fully(template_str, &self.values)
    }
}

/// Distinct projections of `bindings` onto `params`, first-seen order.
pub fn distinct_subset(params: &ParamSet, bindings: &[Binding]) -> Vec<Binding> {
    let mut distinct: Vec<Binding> = Vec::new();
    for binding in bindings {
        let projection = binding.project(params);
        if !distinct.contains(&projection) {
            distinct.push(projection);
        }
    }
    distinct
}

/// Bindings that agree with `fixed` on every shared key.
pub fn filter_by(fixed: &Binding, bindings: &[Binding]) -> Vec<Binding> {
    bindings
        .iter()
        .filter(|binding| binding.agrees_with(fixed))
        .cloned()
        .collect()
}
