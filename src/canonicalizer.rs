//! Component naming for the definition table.
//!
//! Each distinct [`DeclarationKey`] gets exactly one component name. The first key (in
//! discovery order) with a given symbol keeps the bare name; later keys with the same
//! symbol from other modules get `Name_1`, `Name_2`, ... skipping names that some other
//! declaration already owns.

use indexmap::IndexMap;
use log::debug;
use std::collections::{HashMap, HashSet};

use crate::ir::{CanonicalType, DeclarationKey};

/// A reference to a declaration that has no entry in the table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reference to {0} has no component definition")]
pub struct DanglingReference(pub DeclarationKey);

/// Definition table after naming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalTable {
    /// Declaration key to component name
    pub names: IndexMap<DeclarationKey, String>,
    /// Component name to body, references already rewritten
    pub components: IndexMap<String, CanonicalType<String>>,
    /// Component name to the doc comment of its declaration
    pub descriptions: IndexMap<String, String>,
}

impl CanonicalTable {
    /// Rewrites the references of `ty` to component names.
    pub fn rewrite(&self, ty: &CanonicalType) -> Result<CanonicalType<String>, DanglingReference> {
        ty.try_map_refs(&mut |key: &DeclarationKey| {
            self.names
                .get(key)
                .cloned()
                .ok_or_else(|| DanglingReference(key.clone()))
        })
    }

    pub fn name_of(&self, key: &DeclarationKey) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    /// Attaches doc comments to the components of the described declarations.
    pub fn describe(&mut self, descriptions: &IndexMap<DeclarationKey, String>) {
        for (key, description) in descriptions {
            if let Some(name) = self.names.get(key) {
                self.descriptions.insert(name.clone(), description.clone());
            }
        }
    }
}

/// Replaces characters that are not allowed in a component name.
pub fn sanitize_name(symbol: &str) -> String {
    let name: String = symbol
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() {
        "_".to_string()
    } else {
        name
    }
}

/// Names every definition and rewrites all bodies.
pub fn canonicalize(definitions: &IndexMap<DeclarationKey, CanonicalType>) -> Result<CanonicalTable, DanglingReference> {
    let bare: Vec<String> = definitions.keys().map(|k| sanitize_name(&k.symbol)).collect();
    let reserved: HashSet<&str> = bare.iter().map(String::as_str).collect();

    let mut assigned: Vec<Option<String>> = vec![None; bare.len()];
    let mut taken: HashSet<String> = HashSet::new();
    for (slot, name) in assigned.iter_mut().zip(&bare) {
        if taken.insert(name.clone()) {
            *slot = Some(name.clone());
        }
    }

    let mut counters: HashMap<&str, usize> = HashMap::new();
    for (slot, name) in assigned.iter_mut().zip(&bare) {
        if slot.is_some() {
            continue;
        }
        let counter = counters.entry(name.as_str()).or_insert(0);
        let candidate = loop {
            *counter += 1;
            let candidate = format!("{}_{}", name, counter);
            if !reserved.contains(candidate.as_str()) && !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(candidate.clone());
        *slot = Some(candidate);
    }

    let mut table = CanonicalTable::default();
    for (key, name) in definitions.keys().zip(assigned.into_iter().flatten()) {
        if name != key.symbol {
            debug!("Component for {} is named {}", key, name);
        }
        table.names.insert(key.clone(), name);
    }
    for (key, body) in definitions {
        let rewritten = table.rewrite(body)?;
        let name = table.names[key].clone();
        table.components.insert(name, rewritten);
    }
    Ok(table)
}
