//! Structural expansion of type expressions into [`CanonicalType`].
//!
//! One [`ResolutionContext`] is shared by every handler of a run. It owns the definition
//! table: each non-generic named declaration (interface, class, alias, enum) that an
//! expansion reaches is expanded once, stored under its [`DeclarationKey`], and referenced
//! as [`CanonicalType::NamedRef`] everywhere else. Generic declarations are instantiated
//! inline with their arguments. An instantiation that refers back to itself with the same
//! arguments, like `Tree<string>` inside `type Tree<T> = { children: Tree<T>[] }`, is
//! hoisted into the table under the key `Tree<string>` instead.
//!
//! # Example
//!
//! ```
//! use indexmap::IndexMap;
//! use openapi_from_handlers::expander::{ExpansionOptions, ResolutionContext};
//! use openapi_from_handlers::ir::{ModulePath, Scope, TypeExpression};
//! use openapi_from_handlers::oracle::ProjectIndex;
//! use openapi_from_handlers::parser::SourceParser;
//! use openapi_from_handlers::syntax::parse_type;
//!
//! let module = ModulePath::new("src/types");
//! let file = SourceParser::parse_source(module.clone(), "export interface User { name: string }").unwrap();
//! let index = ProjectIndex::build(vec![file], &IndexMap::new()).unwrap();
//!
//! let mut context = ResolutionContext::new(&index, ExpansionOptions::default());
//! let expression = TypeExpression {
//!     node: parse_type("{ users: User[]; onClick: () => void }").unwrap(),
//!     scope: Scope::new(module),
//! };
//! let ty = context.expand(&expression).unwrap();
//! assert_eq!(context.into_definitions().len(), 1);
//! # let _ = ty;
//! ```

use indexmap::IndexMap;
use log::debug;

use crate::ir::{
    Binding, CanonicalType, DeclarationKey, Field, LiteralValue, ModulePath, ObjectShape,
    Primitive, Scope, TypeExpression,
};
use crate::oracle::{Declaration, OracleError, TypeOracle};
use crate::syntax::{
    DeclarationBody, EnumMember, Keyword, LiteralType, ObjectTypeNode, TypeNode, TypeReference,
};

/// Global generic and wrapper types understood without a declaration in the project.
const BUILTIN_TYPES: &[&str] = &[
    "Array",
    "ReadonlyArray",
    "Set",
    "ReadonlySet",
    "Iterable",
    "Promise",
    "PromiseLike",
    "Awaited",
    "Readonly",
    "NonNullable",
    "Partial",
    "Required",
    "Pick",
    "Omit",
    "Record",
    "Map",
    "ReadonlyMap",
    "WeakMap",
    "Function",
    "CallableFunction",
    "NewableFunction",
    "Object",
    "String",
    "Number",
    "Boolean",
    "BigInt",
];

/// Knobs of the expansion rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionOptions {
    /// Type names serialized as strings (instants)
    pub date_types: Vec<String>,
    /// Type names serialized as strings (binary payloads)
    pub binary_types: Vec<String>,
    /// Maximum nesting of type terms inside one definition
    pub max_depth: usize,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            date_types: vec!["Date".to_string()],
            binary_types: vec![
                "Buffer".to_string(),
                "Uint8Array".to_string(),
                "ArrayBuffer".to_string(),
            ],
            max_depth: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpansionError {
    #[error("cannot resolve type `{name}` in {module}")]
    Unresolved { name: String, module: ModulePath },
    #[error("unsupported type `{text}`")]
    Unsupported { text: String },
    #[error("type nesting exceeds the limit of {limit}")]
    DepthExceeded { limit: usize },
    #[error("`{text}` is not an object type")]
    NotAnObject { text: String },
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl ExpansionError {
    /// Oracle failures abort the run, everything else only skips the handler.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExpansionError::Oracle(_))
    }
}

type Expansion = Result<CanonicalType, ExpansionError>;

#[derive(Debug)]
enum Definition {
    /// Body expansion in progress
    Pending,
    Ready(CanonicalType),
}

/// Per-walk state: nesting depth and the generic instantiations being expanded.
#[derive(Default)]
struct Walk {
    depth: usize,
    instantiations: Vec<(DeclarationKey, Vec<CanonicalType>)>,
}

pub struct ResolutionContext<'o> {
    oracle: &'o dyn TypeOracle,
    options: ExpansionOptions,
    definitions: IndexMap<DeclarationKey, Definition>,
    /// Doc comments of the declarations in the table
    descriptions: IndexMap<DeclarationKey, String>,
}

impl<'o> ResolutionContext<'o> {
    pub fn new(oracle: &'o dyn TypeOracle, options: ExpansionOptions) -> Self {
        Self {
            oracle,
            options,
            definitions: IndexMap::new(),
            descriptions: IndexMap::new(),
        }
    }

    /// Expands one expression.
    ///
    /// On failure every definition discovered during this call is removed again, so a
    /// failed handler leaves the table as it found it.
    pub fn expand(&mut self, expression: &TypeExpression) -> Expansion {
        let mark = self.definitions.len();
        let result = self.node(&expression.node, &expression.scope, &mut Walk::default());
        if result.is_err() {
            self.definitions.truncate(mark);
        }
        result
    }

    /// Puts a declaration into the table under its own key, so it becomes a component even
    /// when nothing references it.
    ///
    /// Generic declarations are stored with their parameters bound to their defaults, or
    /// to `unknown`. Like [`ResolutionContext::expand`], a failure leaves the table untouched.
    pub fn expand_declaration(&mut self, key: &DeclarationKey) -> Result<(), ExpansionError> {
        let mark = self.definitions.len();
        let result = self.declaration_root(key);
        if result.is_err() {
            self.definitions.truncate(mark);
        }
        result
    }

    fn declaration_root(&mut self, key: &DeclarationKey) -> Result<(), ExpansionError> {
        let oracle = self.oracle;
        let declaration = oracle.declaration(key)?;
        if declaration.syntax.type_params.is_empty() {
            return self.ensure_definition(declaration);
        }
        if self.definitions.contains_key(key) {
            return Ok(());
        }
        debug!("Expanding generic {} with default arguments", key);
        self.definitions.insert(key.clone(), Definition::Pending);
        let scope = Scope::new(key.module.clone());
        let body = self.declared(key.clone(), &[], &scope, &mut Walk::default())?;
        self.definitions.insert(key.clone(), Definition::Ready(body));
        self.record_description(declaration);
        Ok(())
    }

    /// Doc comments of the declarations in the table, by key.
    pub fn descriptions(&self) -> &IndexMap<DeclarationKey, String> {
        &self.descriptions
    }

    /// The finished body of a named declaration, if it has been expanded.
    pub fn definition(&self, key: &DeclarationKey) -> Option<&CanonicalType> {
        match self.definitions.get(key) {
            Some(Definition::Ready(ty)) => Some(ty),
            _ => None,
        }
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Consumes the context and returns the definition table in discovery order.
    pub fn into_definitions(self) -> IndexMap<DeclarationKey, CanonicalType> {
        self.definitions
            .into_iter()
            .filter_map(|(key, definition)| match definition {
                Definition::Ready(ty) => Some((key, ty)),
                Definition::Pending => None,
            })
            .collect()
    }

    fn node(&mut self, node: &TypeNode, scope: &Scope, walk: &mut Walk) -> Expansion {
        if walk.depth >= self.options.max_depth {
            return Err(ExpansionError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        walk.depth += 1;
        let result = self.node_inner(node, scope, walk);
        walk.depth -= 1;
        result
    }

    fn node_inner(&mut self, node: &TypeNode, scope: &Scope, walk: &mut Walk) -> Expansion {
        match node {
            TypeNode::Keyword(keyword) => Ok(keyword_type(*keyword)),
            TypeNode::Literal(literal) => literal_type(literal),
            TypeNode::TemplateLiteral => Ok(CanonicalType::Primitive(Primitive::String)),
            TypeNode::Function => Ok(CanonicalType::Excluded),
            TypeNode::Reference(reference) => self.reference(reference, scope, walk),
            TypeNode::Object(object) => Ok(CanonicalType::Object(self.object(object, scope, walk)?)),
            TypeNode::Array(inner) => Ok(array_of(self.node(inner, scope, walk)?)),
            TypeNode::Tuple(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                let mut required = 0;
                let mut rest = None;
                for element in elements {
                    let ty = self.node(&element.ty, scope, walk)?;
                    if element.rest {
                        rest = Some(match ty {
                            CanonicalType::Array(inner) => *inner,
                            other => other,
                        });
                        continue;
                    }
                    if !element.optional && items.len() == required {
                        required += 1;
                    }
                    items.push(ty);
                }
                Ok(match rest {
                    // a rest element makes the length open-ended
                    Some(rest) => array_of(CanonicalType::union(items.into_iter().chain([rest]))),
                    None => CanonicalType::Tuple { items, required },
                })
            }
            TypeNode::Union(members) => {
                let mut expanded = Vec::with_capacity(members.len());
                for member in members {
                    expanded.push(self.node(member, scope, walk)?);
                }
                Ok(CanonicalType::union(expanded))
            }
            TypeNode::Intersection(members) => self.intersection(members, scope, walk),
            TypeNode::IndexedAccess { object, index } => {
                let target = self.node(object, scope, walk)?;
                let key = self.node(index, scope, walk)?;
                self.indexed_access(target, key, node)
            }
            TypeNode::Unsupported(text) => Err(ExpansionError::Unsupported { text: text.clone() }),
        }
    }

    fn object(&mut self, object: &ObjectTypeNode, scope: &Scope, walk: &mut Walk) -> Result<ObjectShape, ExpansionError> {
        let mut shape = ObjectShape::default();
        for member in &object.members {
            let ty = self.node(&member.ty, scope, walk)?;
            insert_field(&mut shape, &member.name, ty, member.optional);
            if let Some(field) = shape.fields.get_mut(&member.name) {
                field.description = member.description.clone();
            }
        }
        if let Some(index) = &object.index {
            match self.node(index, scope, walk)? {
                CanonicalType::Excluded => {}
                value => shape.additional = Some(Box::new(value)),
            }
        }
        Ok(shape)
    }

    fn intersection(&mut self, members: &[TypeNode], scope: &Scope, walk: &mut Walk) -> Expansion {
        let mut parts = Vec::with_capacity(members.len());
        for member in members {
            parts.push(self.node(member, scope, walk)?);
        }

        // `string & { __brand: 'Id' }` keeps the primitive
        if let Some(scalar) = parts.iter().find(|p| {
            matches!(
                p,
                CanonicalType::Primitive(primitive) if *primitive != Primitive::Any
            ) || matches!(p, CanonicalType::Literal(_))
        }) {
            return Ok(scalar.clone());
        }

        let mut merged = ObjectShape::default();
        let mut saw_structure = false;
        for part in parts {
            match part {
                CanonicalType::Primitive(Primitive::Any) | CanonicalType::Excluded => continue,
                other => {
                    saw_structure = true;
                    let shape = self.structure(other)?;
                    for (name, field) in shape.fields {
                        let required = field.required || merged.fields.get(&name).is_some_and(|f| f.required);
                        merged.fields.insert(
                            name,
                            Field {
                                ty: field.ty,
                                required,
                                description: field.description,
                            },
                        );
                    }
                    if shape.additional.is_some() {
                        merged.additional = shape.additional;
                    }
                }
            }
        }
        if !saw_structure {
            return Ok(CanonicalType::Primitive(Primitive::Any));
        }
        Ok(CanonicalType::Object(merged))
    }

    fn indexed_access(&mut self, target: CanonicalType, key: CanonicalType, node: &TypeNode) -> Expansion {
        let shape = self.structure(target)?;
        let keys = match key {
            CanonicalType::Union(members) => members,
            single => vec![single],
        };
        let mut picked = Vec::with_capacity(keys.len());
        for key in keys {
            let ty = match &key {
                CanonicalType::Literal(LiteralValue::String(name)) => shape.fields.get(name).map(|f| f.ty.clone()),
                CanonicalType::Primitive(Primitive::String) => shape.additional.as_deref().cloned(),
                _ => None,
            };
            match ty {
                Some(ty) => picked.push(ty),
                None => {
                    return Err(ExpansionError::Unsupported {
                        text: node.to_string(),
                    })
                }
            }
        }
        Ok(CanonicalType::union(picked))
    }

    /// Dereferences a type to its object structure.
    fn structure(&self, ty: CanonicalType) -> Result<ObjectShape, ExpansionError> {
        match ty {
            CanonicalType::Object(shape) => Ok(shape),
            CanonicalType::Primitive(Primitive::Any) => Ok(ObjectShape::default()),
            CanonicalType::NamedRef(key) => match self.definitions.get(&key) {
                Some(Definition::Ready(body)) => self.structure(body.clone()),
                Some(Definition::Pending) => Err(ExpansionError::NotAnObject {
                    text: format!("{} (still being expanded)", key),
                }),
                None => Err(ExpansionError::NotAnObject { text: key.to_string() }),
            },
            other => Err(ExpansionError::NotAnObject {
                text: format!("{:?}", other),
            }),
        }
    }

    fn reference(&mut self, reference: &TypeReference, scope: &Scope, walk: &mut Walk) -> Expansion {
        let oracle = self.oracle;

        if let Some(specifier) = &reference.specifier {
            return match oracle.resolve_import(&scope.module, specifier, &reference.name) {
                Some(key) => self.declared(key, &reference.args, scope, walk),
                None => Err(ExpansionError::Unresolved {
                    name: reference.to_string(),
                    module: scope.module.clone(),
                }),
            };
        }

        if reference.args.is_empty() {
            if let Some(binding) = scope.lookup(&reference.name) {
                return match binding {
                    Binding::Expanded(ty) => Ok(ty.clone()),
                    Binding::Deferred(expression) => {
                        let expression = expression.clone();
                        self.node(&expression.node, &expression.scope, walk)
                    }
                };
            }
        }

        if let Some(key) = oracle.resolve_name(&scope.module, &reference.name) {
            return self.declared(key, &reference.args, scope, walk);
        }

        if let Some((owner, member)) = reference.name.rsplit_once('.') {
            if let Some(key) = oracle.resolve_name(&scope.module, owner) {
                if let DeclarationBody::Enum(members) = &oracle.declaration(&key)?.syntax.body {
                    return enum_member(members, member).ok_or_else(|| ExpansionError::Unresolved {
                        name: reference.name.clone(),
                        module: scope.module.clone(),
                    });
                }
            }
        }

        match self.builtin(reference, scope, walk)? {
            Some(ty) => Ok(ty),
            None => Err(ExpansionError::Unresolved {
                name: reference.name.clone(),
                module: scope.module.clone(),
            }),
        }
    }

    /// A reference that resolved to a project declaration.
    fn declared(&mut self, key: DeclarationKey, args: &[TypeNode], scope: &Scope, walk: &mut Walk) -> Expansion {
        let oracle = self.oracle;
        let declaration = oracle.declaration(&key)?;

        if declaration.syntax.type_params.is_empty() {
            if !args.is_empty() {
                debug!("Ignoring type arguments passed to non-generic {}", key);
            }
            self.ensure_definition(declaration)?;
            return Ok(CanonicalType::NamedRef(key));
        }

        let mut expanded_args = Vec::with_capacity(args.len());
        for arg in args {
            expanded_args.push(self.node(arg, scope, walk)?);
        }
        let instance = instance_key(&key, &expanded_args);
        if self.definitions.contains_key(&instance) {
            return Ok(CanonicalType::NamedRef(instance));
        }
        if walk
            .instantiations
            .iter()
            .any(|(k, a)| *k == key && *a == expanded_args)
        {
            debug!("Hoisting recursive instantiation {}", instance);
            self.definitions.insert(instance.clone(), Definition::Pending);
            return Ok(CanonicalType::NamedRef(instance));
        }

        let mut bindings = Vec::with_capacity(declaration.syntax.type_params.len());
        for (index, param) in declaration.syntax.type_params.iter().enumerate() {
            let binding = match (expanded_args.get(index), &param.default) {
                (Some(arg), _) => Binding::Expanded(arg.clone()),
                (None, Some(default)) => Binding::Deferred(TypeExpression {
                    node: default.clone(),
                    scope: Scope::with_bindings(key.module.clone(), bindings.clone()),
                }),
                (None, None) => Binding::Expanded(CanonicalType::Primitive(Primitive::Any)),
            };
            bindings.push((param.name.clone(), binding));
        }

        debug!("Instantiating {} inline", key);
        let body_scope = Scope::with_bindings(key.module.clone(), bindings);
        walk.instantiations.push((key, expanded_args));
        let result = self.body(declaration, &body_scope, walk);
        walk.instantiations.pop();
        let body = result?;
        if matches!(self.definitions.get(&instance), Some(Definition::Pending)) {
            self.definitions.insert(instance.clone(), Definition::Ready(body));
            return Ok(CanonicalType::NamedRef(instance));
        }
        Ok(body)
    }

    /// Expands a non-generic declaration into the table unless it is already there.
    fn ensure_definition(&mut self, declaration: &Declaration) -> Result<(), ExpansionError> {
        if self.definitions.contains_key(&declaration.key) {
            return Ok(());
        }
        debug!("Expanding definition {}", declaration.key);
        self.definitions.insert(declaration.key.clone(), Definition::Pending);
        let scope = Scope::new(declaration.key.module.clone());
        let body = self.body(declaration, &scope, &mut Walk::default())?;
        self.definitions.insert(declaration.key.clone(), Definition::Ready(body));
        self.record_description(declaration);
        Ok(())
    }

    fn record_description(&mut self, declaration: &Declaration) {
        if let Some(description) = &declaration.syntax.description {
            self.descriptions.insert(declaration.key.clone(), description.clone());
        }
    }

    fn body(&mut self, declaration: &Declaration, scope: &Scope, walk: &mut Walk) -> Expansion {
        match &declaration.syntax.body {
            DeclarationBody::Alias(node) => self.node(node, scope, walk),
            DeclarationBody::Interface { extends, members } => {
                let mut shape = ObjectShape::default();
                for parent in extends {
                    let parent = self.reference(parent, scope, walk)?;
                    shape.extend(self.structure(parent)?);
                }
                shape.extend(self.object(members, scope, walk)?);
                Ok(CanonicalType::Object(shape))
            }
            DeclarationBody::Class { extends, members, .. } => {
                let mut shape = ObjectShape::default();
                if let Some(parent) = extends {
                    let mark = self.definitions.len();
                    match self.reference(parent, scope, walk) {
                        Ok(inherited) => shape.extend(self.structure(inherited)?),
                        // framework base classes are usually outside the project
                        Err(ExpansionError::Unresolved { name, .. }) if name == parent.name => {
                            debug!("Not inheriting members of {} into {}: not in the project", parent, declaration.key);
                            self.definitions.truncate(mark);
                        }
                        Err(e) => return Err(e),
                    }
                }
                shape.extend(self.object(members, scope, walk)?);
                Ok(CanonicalType::Object(shape))
            }
            DeclarationBody::Enum(members) => Ok(CanonicalType::union(enum_values(members))),
        }
    }

    /// Built-in generic and global types. `None` when the name is not a known built-in.
    fn builtin(&mut self, reference: &TypeReference, scope: &Scope, walk: &mut Walk) -> Result<Option<CanonicalType>, ExpansionError> {
        let name = reference.name.as_str();
        if self.options.date_types.iter().any(|t| t == name) || self.options.binary_types.iter().any(|t| t == name) {
            return Ok(Some(CanonicalType::Primitive(Primitive::String)));
        }
        if !BUILTIN_TYPES.contains(&name) {
            return Ok(None);
        }

        let mut args = Vec::with_capacity(reference.args.len());
        for arg in &reference.args {
            args.push(self.node(arg, scope, walk)?);
        }
        let arg = |index: usize| {
            args.get(index)
                .cloned()
                .unwrap_or(CanonicalType::Primitive(Primitive::Any))
        };

        let ty = match name {
            "Array" | "ReadonlyArray" | "Set" | "ReadonlySet" | "Iterable" => array_of(arg(0)),
            "Promise" | "PromiseLike" | "Awaited" | "Readonly" => arg(0),
            "NonNullable" => arg(0).strip_nullish(),
            "Partial" | "Required" => {
                let mut shape = self.structure(arg(0))?;
                let required = name == "Required";
                for field in shape.fields.values_mut() {
                    field.required = required;
                }
                CanonicalType::Object(shape)
            }
            "Pick" | "Omit" => {
                let mut shape = self.structure(arg(0))?;
                let keys = literal_keys(&arg(1)).ok_or_else(|| ExpansionError::Unsupported {
                    text: reference.to_string(),
                })?;
                let keep = name == "Pick";
                shape.fields.retain(|field, _| keys.contains(field) == keep);
                CanonicalType::Object(shape)
            }
            "Record" => {
                let value = arg(1);
                match literal_keys(&arg(0)) {
                    Some(keys) => {
                        let mut shape = ObjectShape::default();
                        for key in keys {
                            insert_field(&mut shape, &key, value.clone(), false);
                        }
                        CanonicalType::Object(shape)
                    }
                    None => map_of(value),
                }
            }
            "Map" | "ReadonlyMap" | "WeakMap" => map_of(arg(1)),
            "Function" | "CallableFunction" | "NewableFunction" => CanonicalType::Excluded,
            "Object" => CanonicalType::Object(ObjectShape::default()),
            "String" => CanonicalType::Primitive(Primitive::String),
            "Number" => CanonicalType::Primitive(Primitive::Number),
            "Boolean" => CanonicalType::Primitive(Primitive::Boolean),
            "BigInt" => CanonicalType::Primitive(Primitive::Integer),
            _ => return Ok(None),
        };
        Ok(Some(ty))
    }
}

fn keyword_type(keyword: Keyword) -> CanonicalType {
    match keyword {
        Keyword::String => CanonicalType::Primitive(Primitive::String),
        Keyword::Number => CanonicalType::Primitive(Primitive::Number),
        Keyword::Boolean => CanonicalType::Primitive(Primitive::Boolean),
        Keyword::BigInt => CanonicalType::Primitive(Primitive::Integer),
        Keyword::Null => CanonicalType::Primitive(Primitive::Null),
        Keyword::Undefined | Keyword::Void => CanonicalType::Primitive(Primitive::Undefined),
        Keyword::Any | Keyword::Unknown => CanonicalType::Primitive(Primitive::Any),
        Keyword::Object => CanonicalType::Object(ObjectShape::default()),
        Keyword::Never | Keyword::Symbol => CanonicalType::Excluded,
    }
}

fn literal_type(literal: &LiteralType) -> Expansion {
    Ok(CanonicalType::Literal(match literal {
        LiteralType::String(value) => LiteralValue::String(value.clone()),
        LiteralType::Boolean(value) => LiteralValue::Boolean(*value),
        LiteralType::Number(text) => LiteralValue::parse_number(text).ok_or_else(|| ExpansionError::Unsupported {
            text: text.clone(),
        })?,
    }))
}

fn array_of(item: CanonicalType) -> CanonicalType {
    match item {
        CanonicalType::Excluded => CanonicalType::Excluded,
        item => CanonicalType::Array(Box::new(item)),
    }
}

fn map_of(value: CanonicalType) -> CanonicalType {
    CanonicalType::Object(ObjectShape {
        fields: IndexMap::new(),
        additional: match value {
            CanonicalType::Excluded => None,
            value => Some(Box::new(value)),
        },
    })
}

/// Adds a member. Optional when marked `?` or when the type admits `undefined`;
/// callable and undefined-only members are dropped.
fn insert_field(shape: &mut ObjectShape, name: &str, ty: CanonicalType, optional: bool) {
    let (ty, had_undefined) = ty.strip_undefined();
    if ty == CanonicalType::Excluded {
        return;
    }
    shape.fields.insert(
        name.to_string(),
        Field {
            ty,
            required: !optional && !had_undefined,
            description: None,
        },
    );
}

/// Table key of a hoisted generic instantiation, e.g. `Tree<string>`.
fn instance_key(key: &DeclarationKey, args: &[CanonicalType]) -> DeclarationKey {
    let args: Vec<String> = args.iter().map(label).collect();
    DeclarationKey::new(key.module.clone(), format!("{}<{}>", key.symbol, args.join(", ")))
}

/// Short TypeScript-like rendering of an expanded type.
fn label(ty: &CanonicalType) -> String {
    match ty {
        CanonicalType::Primitive(primitive) => match primitive {
            Primitive::String => "string",
            Primitive::Number => "number",
            Primitive::Integer => "bigint",
            Primitive::Boolean => "boolean",
            Primitive::Null => "null",
            Primitive::Undefined => "undefined",
            Primitive::Any => "any",
        }
        .to_string(),
        CanonicalType::Literal(literal) => literal.to_json().to_string(),
        CanonicalType::Object(_) => "object".to_string(),
        CanonicalType::Array(inner) => format!("{}[]", label(inner)),
        CanonicalType::Tuple { items, .. } => {
            format!("[{}]", items.iter().map(label).collect::<Vec<_>>().join(", "))
        }
        CanonicalType::Union(members) => members.iter().map(label).collect::<Vec<_>>().join(" | "),
        CanonicalType::NamedRef(key) => key.symbol.clone(),
        CanonicalType::Excluded => "never".to_string(),
    }
}

/// String literal keys of `'a' | 'b'`, `None` for anything wider.
fn literal_keys(ty: &CanonicalType) -> Option<Vec<String>> {
    let members = match ty {
        CanonicalType::Union(members) => members.as_slice(),
        single => std::slice::from_ref(single),
    };
    members
        .iter()
        .map(|member| match member {
            CanonicalType::Literal(LiteralValue::String(key)) => Some(key.clone()),
            CanonicalType::Literal(LiteralValue::Number(key)) => Some(key.to_string()),
            _ => None,
        })
        .collect()
}

/// Enum members as literals. Members without initializer count up from the previous
/// numeric value, starting at 0.
fn enum_values(members: &[EnumMember]) -> Vec<CanonicalType> {
    let mut next: i64 = 0;
    members
        .iter()
        .map(|member| {
            let value = match &member.value {
                Some(LiteralType::String(value)) => LiteralValue::String(value.clone()),
                Some(LiteralType::Boolean(value)) => LiteralValue::Boolean(*value),
                Some(LiteralType::Number(text)) => {
                    let value = LiteralValue::parse_number(text).unwrap_or(LiteralValue::Number(next.into()));
                    if let LiteralValue::Number(number) = &value {
                        if let Some(integer) = number.as_i64() {
                            next = integer + 1;
                        }
                    }
                    value
                }
                None => {
                    let value = LiteralValue::Number(next.into());
                    next += 1;
                    value
                }
            };
            CanonicalType::Literal(value)
        })
        .collect()
}

fn enum_member(members: &[EnumMember], name: &str) -> Option<CanonicalType> {
    let index = members.iter().position(|m| m.name == name)?;
    enum_values(members).into_iter().nth(index)
}
