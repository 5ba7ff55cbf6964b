//! `{name}` placeholder parsing, rendering and recursive resolution.
//!
//! A placeholder is a word wrapped in braces, optionally padded with spaces
//! or tabs: `{host}`, `{ host }`. Anything else in braces is literal text.

use std::ops::Range;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Error, Result};

/// Maximum substitution passes before a value is declared cyclic.
pub const MAX_PASSES: usize = 10;

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[ \t]*(\w+)[ \t]*\}").unwrap());

/// One placeholder occurrence inside a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    /// Byte range of the whole `{ name }` token.
    pub span: Range<usize>,
}

impl Reference {
    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.name)
    }
}

pub fn references(template: &str) -> Vec<Reference> {
    PLACEHOLDER_PATTERN
        .captures_iter(template)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(Reference {
                name: name.as_str().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

pub fn has_references(template: &str) -> bool {
    PLACEHOLDER_PATTERN.is_match(template)
}

/// Substitute every placeholder once. Fails on the first unknown name.
pub fn render(template: &str, values: &IndexMap<String, String>) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut cursor = 0;

    for reference in references(template) {
        let value = values
            .get(&reference.name)
            .ok_or_else(|| Error::variable_unresolved(reference.placeholder(), template))?;
        result.push_str(&template[cursor..reference.span.start]);
        result.push_str(value);
        cursor = reference.span.end;
    }
    result.push_str(&template[cursor..]);

    Ok(result)
}

/// Render repeatedly until no placeholder remains.
pub fn render_fully(template: &str, values: &IndexMap<String, String>) -> Result<String> {
    let mut current = template.to_string();
    let mut passes = 0;

    while has_references(&current) {
        if passes == MAX_PASSES {
            let name = references(&current)
                .first()
                .map(Reference::placeholder)
                .unwrap_or_default();
            return Err(Error::variable_cyclic(name, template));
        }
        current = render(&current, values)?;
        passes += 1;
    }

    Ok(current)
}

/// Resolve every value of a binding against the binding itself.
///
/// Values are resolved in key order and written back as they settle, so later
/// values see already-resolved earlier ones.
pub fn resolve_in_place(values: &mut IndexMap<String, String>) -> Result<()> {
    let keys: Vec<String> = values.keys().cloned().collect();

    for key in keys {
        let mut current = match values.get(&key) {
            Some(value) if has_references(value) => value.clone(),
            _ => continue,
        };
        let original = current.clone();
        let mut passes = 0;

        while has_references(&current) {
            if passes == MAX_PASSES {
                let name = references(&current)
                    .first()
                    .map(Reference::placeholder)
                    .unwrap_or_default();
                return Err(Error::variable_cyclic(name, original));
            }
            current = render(&current, values)?;
            values.insert(key.clone(), current.clone());
            passes += 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn map(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn references_accept_padding() {
        let refs = references("cd { dir }; ls {\tpattern}");
        let names: Vec<&str> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["dir", "pattern"]);
        assert_eq!(refs[0].span, 3..10);
    }

    #[test]
    fn non_placeholder_braces_are_literal() {
        let values = map(&[("file", "a.log")]);
        let out = render("awk '{print $1}' {file}", &values).unwrap();
        assert_eq!(out, "awk '{print $1}' a.log");
    }

    #[test]
    fn render_reports_unknown_placeholder() {
        let err = render("ls {missing}", &map(&[])).unwrap_err();
        assert_eq!(err.code, ErrorCode::VariableUnresolved);
        assert_eq!(err.details["placeholder"], "{missing}");
    }

    #[test]
    fn render_fully_follows_chains() {
        let values = map(&[("a", "{b}/x"), ("b", "{c}"), ("c", "root")]);
        assert_eq!(render_fully("{a}", &values).unwrap(), "root/x");
    }

    #[test]
    fn resolve_in_place_is_idempotent() {
        let mut values = map(&[("dir", "/var/{app}"), ("app", "web"), ("log", "{dir}/out")]);
        resolve_in_place(&mut values).unwrap();
        let settled = values.clone();
        resolve_in_place(&mut values).unwrap();
        assert_eq!(values, settled);
        assert_eq!(values["log"], "/var/web/out");
    }

    #[test]
    fn cyclic_values_fail_after_max_passes() {
        let mut values = map(&[("a", "{b}"), ("b", "{a}")]);
        let err = resolve_in_place(&mut values).unwrap_err();
        assert_eq!(err.code, ErrorCode::VariableCyclic);
    }

    #[test]
    fn chain_of_exactly_max_passes_resolves() {
        // {v1} -> {v2} -> ... -> {v10} -> end takes ten passes.
        let mut pairs: Vec<(String, String)> = (0..MAX_PASSES)
            .map(|i| (format!("v{}", i), format!("{{v{}}}", i + 1)))
            .collect();
        pairs.push((format!("v{}", MAX_PASSES), "end".to_string()));
        let values: IndexMap<String, String> = pairs.into_iter().collect();
        assert_eq!(render_fully("{v1}", &values).unwrap(), "end");
    }

    #[test]
    fn chain_longer_than_max_passes_is_cyclic() {
        let mut pairs: Vec<(String, String)> = (0..=MAX_PASSES)
            .map(|i| (format!("v{}", i), format!("{{v{}}}", i + 1)))
            .collect();
        pairs.push((format!("v{}", MAX_PASSES + 1), "end".to_string()));
        let values: IndexMap<String, String> = pairs.into_iter().collect();
        let err = render_fully("{v0}", &values).unwrap_err();
        assert_eq!(err.code, ErrorCode::VariableCyclic);
    }
}
