//! Data model shared by every pipeline stage.
//!
//! [`CanonicalType`] is the structural intermediate representation produced by the
//! expander. It is generic over the reference type: before canonicalization a nominal type
//! is referenced by its [`DeclarationKey`], afterwards by its component name.
//!
//! # Example
//!
//! ```
//! use openapi_from_handlers::ir::{CanonicalType, Primitive};
//!
//! let ty: CanonicalType = CanonicalType::union(vec![
//!     CanonicalType::Primitive(Primitive::String),
//!     CanonicalType::Excluded,
//!     CanonicalType::Primitive(Primitive::String),
//! ]);
//! assert_eq!(ty, CanonicalType::Primitive(Primitive::String));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;

use crate::syntax::TypeNode;

/// Root-relative module path with `/` separators and without extension, e.g. `src/action/GetInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModulePath(String);

impl ModulePath {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into().replace('\\', "/");
        ModulePath(path.trim_start_matches("./").trim_end_matches('/').to_string())
    }

    /// Builds the module path of `file` relative to `root`, dropping the extension.
    pub fn from_file(root: &Path, file: &Path) -> Self {
        let relative = file.strip_prefix(root).unwrap_or(file);
        let mut segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        if let Some(last) = segments.last_mut() {
            *last = strip_source_extension(last).to_string();
        }
        ModulePath(segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory part of the path, empty for a module at the root.
    pub fn directory(&self) -> &str {
        match self.0.rfind('/') {
            Some(index) => &self.0[..index],
            None => "",
        }
    }

    /// Joins a `./` or `../` relative specifier onto this module's directory.
    ///
    /// Returns `None` when the specifier climbs above the project root.
    pub fn join_relative(&self, specifier: &str) -> Option<ModulePath> {
        join_segments(self.directory(), specifier)
    }
}

/// Joins `relative` onto `base`, resolving `.` and `..` segments.
pub(crate) fn join_segments(base: &str, relative: &str) -> Option<ModulePath> {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(ModulePath(segments.join("/")))
}

/// Strips a TypeScript or JavaScript extension from a file name or specifier.
pub(crate) fn strip_source_extension(name: &str) -> &str {
    for extension in [".d.ts", ".tsx", ".ts", ".mts", ".cts", ".jsx", ".js", ".mjs", ".cjs"] {
        if let Some(stripped) = name.strip_suffix(extension) {
            return stripped;
        }
    }
    name
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a named declaration: the module that declares it plus its local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclarationKey {
    pub module: ModulePath,
    pub symbol: String,
}

impl DeclarationKey {
    pub fn new(module: ModulePath, symbol: impl Into<String>) -> Self {
        Self {
            module,
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for DeclarationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.module, self.symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Undefined,
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Number(serde_json::Number),
    Boolean(bool),
}

impl LiteralValue {
    /// JSON schema type name of the literal
    pub fn type_name(&self) -> &'static str {
        match self {
            LiteralValue::String(_) => "string",
            LiteralValue::Number(number) if number.is_f64() => "number",
            LiteralValue::Number(_) => "integer",
            LiteralValue::Boolean(_) => "boolean",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            LiteralValue::String(value) => serde_json::Value::String(value.clone()),
            LiteralValue::Number(value) => serde_json::Value::Number(value.clone()),
            LiteralValue::Boolean(value) => serde_json::Value::Bool(*value),
        }
    }

    /// Parses a numeric literal in source form (`42`, `-1.5`, `0x1F`, `1e3`).
    pub fn parse_number(text: &str) -> Option<Self> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let radix = match digits.get(..2) {
            Some("0x") | Some("0X") => Some(16),
            Some("0o") | Some("0O") => Some(8),
            Some("0b") | Some("0B") => Some(2),
            _ => None,
        };
        let number = if let Some(radix) = radix {
            let value = i64::from_str_radix(&digits[2..], radix).ok()?;
            serde_json::Number::from(if negative { -value } else { value })
        } else if let Ok(value) = text.parse::<i64>() {
            serde_json::Number::from(value)
        } else {
            serde_json::Number::from_f64(text.parse::<f64>().ok()?)?
        };
        Some(LiteralValue::Number(number))
    }
}

/// A named member of an [`ObjectShape`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field<R = DeclarationKey> {
    pub ty: CanonicalType<R>,
    pub required: bool,
    /// Doc comment of the member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectShape<R = DeclarationKey> {
    pub fields: IndexMap<String, Field<R>>,
    /// Value type of an index signature or `Record<string, V>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional: Option<Box<CanonicalType<R>>>,
}

impl<R> Default for ObjectShape<R> {
    fn default() -> Self {
        Self {
            fields: IndexMap::new(),
            additional: None,
        }
    }
}

impl<R> ObjectShape<R> {
    /// Copies `other` into `self`. Fields of `other` replace same-named fields.
    pub fn extend(&mut self, other: ObjectShape<R>) {
        for (name, field) in other.fields {
            self.fields.insert(name, field);
        }
        if other.additional.is_some() {
            self.additional = other.additional;
        }
    }
}

/// Canonical structural type.
///
/// Acyclic: a nominal type only ever appears as [`CanonicalType::NamedRef`], its body is
/// stored once in the definition table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CanonicalType<R = DeclarationKey> {
    Primitive(Primitive),
    Literal(LiteralValue),
    Object(ObjectShape<R>),
    Array(Box<CanonicalType<R>>),
    Tuple {
        items: Vec<CanonicalType<R>>,
        /// Number of leading items that must be present
        required: usize,
    },
    /// Flattened, deduplicated, in order of first appearance. Built through [`CanonicalType::union`].
    Union(Vec<CanonicalType<R>>),
    NamedRef(R),
    /// Callable or otherwise unrepresentable; dropped from fields and unions
    Excluded,
}

impl<R: PartialEq> CanonicalType<R> {
    /// Normalizing union constructor.
    ///
    /// Nested unions are flattened, `Excluded` members dropped and duplicates removed.
    /// `Any` absorbs every other member. No members yields `Excluded`, one member yields
    /// that member.
    pub fn union(members: impl IntoIterator<Item = CanonicalType<R>>) -> Self {
        let mut flat: Vec<CanonicalType<R>> = Vec::new();
        let push = |member: CanonicalType<R>, flat: &mut Vec<CanonicalType<R>>| {
            if !flat.contains(&member) {
                flat.push(member);
            }
        };
        for member in members {
            match member {
                CanonicalType::Union(inner) => {
                    for nested in inner {
                        push(nested, &mut flat);
                    }
                }
                CanonicalType::Excluded => {}
                other => push(other, &mut flat),
            }
        }
        if flat.contains(&CanonicalType::Primitive(Primitive::Any)) {
            return CanonicalType::Primitive(Primitive::Any);
        }
        match flat.len() {
            0 => CanonicalType::Excluded,
            1 => flat.remove(0),
            _ => CanonicalType::Union(flat),
        }
    }

    /// Removes `undefined` from the type. The flag tells whether it was present.
    pub fn strip_undefined(self) -> (Self, bool) {
        self.strip(|member| matches!(member, CanonicalType::Primitive(Primitive::Undefined)))
    }

    /// Removes `null` and `undefined` from the type.
    pub fn strip_nullish(self) -> Self {
        self.strip(|member| {
            matches!(
                member,
                CanonicalType::Primitive(Primitive::Undefined | Primitive::Null)
            )
        })
        .0
    }

    fn strip(self, remove: impl Fn(&CanonicalType<R>) -> bool) -> (Self, bool) {
        match self {
            CanonicalType::Union(members) => {
                let before = members.len();
                let kept: Vec<_> = members.into_iter().filter(|m| !remove(m)).collect();
                let removed = kept.len() != before;
                (CanonicalType::union(kept), removed)
            }
            other if remove(&other) => (CanonicalType::Excluded, true),
            other => (other, false),
        }
    }
}

impl<R> CanonicalType<R> {
    /// Rebuilds the type with every reference mapped through `map`.
    pub fn try_map_refs<S, E>(
        &self,
        map: &mut impl FnMut(&R) -> Result<S, E>,
    ) -> Result<CanonicalType<S>, E> {
        Ok(match self {
            CanonicalType::Primitive(primitive) => CanonicalType::Primitive(*primitive),
            CanonicalType::Literal(literal) => CanonicalType::Literal(literal.clone()),
            CanonicalType::Object(shape) => {
                let mut fields = IndexMap::with_capacity(shape.fields.len());
                for (name, field) in &shape.fields {
                    fields.insert(
                        name.clone(),
                        Field {
                            ty: field.ty.try_map_refs(map)?,
                            required: field.required,
                            description: field.description.clone(),
                        },
                    );
                }
                let additional = match &shape.additional {
                    Some(additional) => Some(Box::new(additional.try_map_refs(map)?)),
                    None => None,
                };
                CanonicalType::Object(ObjectShape { fields, additional })
            }
            CanonicalType::Array(inner) => CanonicalType::Array(Box::new(inner.try_map_refs(map)?)),
            CanonicalType::Tuple { items, required } => CanonicalType::Tuple {
                items: items
                    .iter()
                    .map(|item| item.try_map_refs(map))
                    .collect::<Result<_, _>>()?,
                required: *required,
            },
            CanonicalType::Union(members) => CanonicalType::Union(
                members
                    .iter()
                    .map(|member| member.try_map_refs(map))
                    .collect::<Result<_, _>>()?,
            ),
            CanonicalType::NamedRef(reference) => CanonicalType::NamedRef(map(reference)?),
            CanonicalType::Excluded => CanonicalType::Excluded,
        })
    }

    /// Every reference in pre-order.
    pub fn references(&self) -> Vec<&R> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references<'a>(&'a self, found: &mut Vec<&'a R>) {
        match self {
            CanonicalType::Object(shape) => {
                for field in shape.fields.values() {
                    field.ty.collect_references(found);
                }
                if let Some(additional) = &shape.additional {
                    additional.collect_references(found);
                }
            }
            CanonicalType::Array(inner) => inner.collect_references(found),
            CanonicalType::Tuple { items, .. } => {
                items.iter().for_each(|item| item.collect_references(found))
            }
            CanonicalType::Union(members) => {
                members.iter().for_each(|member| member.collect_references(found))
            }
            CanonicalType::NamedRef(reference) => found.push(reference),
            CanonicalType::Primitive(_) | CanonicalType::Literal(_) | CanonicalType::Excluded => {}
        }
    }
}

/// Value bound to a type parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Argument written by a subclass, evaluated lazily in the subclass's scope
    Deferred(TypeExpression),
    /// Argument that has already been expanded
    Expanded(CanonicalType),
}

/// Where a type expression is evaluated: a module plus the type-parameter bindings in force.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub module: ModulePath,
    pub bindings: Arc<Vec<(String, Binding)>>,
}

impl Scope {
    pub fn new(module: ModulePath) -> Self {
        Self {
            module,
            bindings: Arc::new(Vec::new()),
        }
    }

    pub fn with_bindings(module: ModulePath, bindings: Vec<(String, Binding)>) -> Self {
        Self {
            module,
            bindings: Arc::new(bindings),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, binding)| binding)
    }
}

/// An unevaluated type term together with the scope it must be evaluated in.
///
/// Equality includes the scope: the same text in two modules is two expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpression {
    pub node: TypeNode,
    pub scope: Scope,
}

impl fmt::Display for TypeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (in {})", self.node, self.scope.module)
    }
}

/// One registered handler operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub operation: String,
    /// Handler class declaration
    pub class: DeclarationKey,
    /// Module the handler class is declared in
    pub scope: ModulePath,
}
