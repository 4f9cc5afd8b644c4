//! Declaration-level syntax tree for the TypeScript handler projects are written in.
//!
//! Sources are parsed with `deno_ast` and lowered into a tree that only keeps what type
//! resolution needs: imports, exports, classes (supertype and property members), interfaces,
//! type aliases, enums and type expressions. Function bodies, initializers and statements
//! are dropped during lowering.
//!
//! # Example
//!
//! ```
//! use openapi_from_handlers::syntax::{parse_module, DeclarationBody};
//!
//! let module = parse_module("export class GetInfo extends Base<Req, { id: string }> {}").unwrap();
//! let decl = &module.declarations[0];
//! assert_eq!(decl.name, "GetInfo");
//! assert!(matches!(decl.body, DeclarationBody::Class { .. }));
//! ```

pub mod lower;

use std::fmt;

pub use lower::{parse_module, parse_module_at, parse_type};

/// Error raised when a source file cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    /// 1-based line the error was detected on
    pub line: usize,
    /// Human readable description
    pub message: String,
}

/// Everything a single module declares, imports and exports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleSyntax {
    pub imports: Vec<ImportBinding>,
    pub exports: Vec<ExportClause>,
    pub declarations: Vec<DeclarationSyntax>,
    /// Heritage clauses that name no type
    pub diagnostics: Vec<SyntaxError>,
}

/// One local name introduced by an `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Name the binding is visible under in the importing module
    pub local: String,
    /// What the binding refers to in the imported module
    pub imported: Imported,
    /// Module specifier, e.g. `./types` or `napcat-onebot/action`
    pub specifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Imported {
    /// `import { Name } from` or `import { Name as Local } from`
    Named(String),
    /// `import Local from`
    Default,
    /// `import * as Local from`
    Namespace,
}

/// Export statements that are not attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportClause {
    /// `export { local as exported }`
    Local { local: String, exported: String },
    /// `export { imported as exported } from 'specifier'`
    ReExport {
        specifier: String,
        imported: String,
        exported: String,
    },
    /// `export * from 'specifier'`
    ReExportAll { specifier: String },
    /// `export * as exported from 'specifier'`
    ReExportNamespace { specifier: String, exported: String },
    /// `export default local;`
    Default { local: String },
}

/// A named type-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationSyntax {
    pub name: String,
    pub exported: bool,
    pub default_export: bool,
    pub type_params: Vec<TypeParam>,
    pub body: DeclarationBody,
    /// Text of the leading `/** ... */` comment, block tags excluded
    pub description: Option<String>,
}

impl DeclarationSyntax {
    pub fn new(name: impl Into<String>, type_params: Vec<TypeParam>, body: DeclarationBody) -> Self {
        Self {
            name: name.into(),
            exported: false,
            default_export: false,
            type_params,
            body,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationBody {
    Class {
        extends: Option<TypeReference>,
        /// Recorded but never resolved; interfaces add no fields to a class
        implements: Vec<TypeReference>,
        /// Public instance properties
        members: ObjectTypeNode,
    },
    Interface {
        extends: Vec<TypeReference>,
        members: ObjectTypeNode,
    },
    Alias(TypeNode),
    Enum(Vec<EnumMember>),
}

impl DeclarationBody {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DeclarationBody::Class { .. } => "class",
            DeclarationBody::Interface { .. } => "interface",
            DeclarationBody::Alias(_) => "type alias",
            DeclarationBody::Enum(_) => "enum",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Option<TypeNode>,
    pub default: Option<TypeNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    /// Explicit initializer when it is a literal; `None` means auto-numbered
    pub value: Option<LiteralType>,
}

/// A source-level type term, unevaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    Keyword(Keyword),
    Literal(LiteralType),
    /// `` `prefix-${string}` ``
    TemplateLiteral,
    Reference(TypeReference),
    Object(ObjectTypeNode),
    Array(Box<TypeNode>),
    Tuple(Vec<TupleElement>),
    Union(Vec<TypeNode>),
    Intersection(Vec<TypeNode>),
    IndexedAccess {
        object: Box<TypeNode>,
        index: Box<TypeNode>,
    },
    /// Function, constructor and method types
    Function,
    /// Type syntax the reader recognises but cannot evaluate (conditional, mapped, `keyof`, ...)
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    String,
    Number,
    Boolean,
    BigInt,
    Symbol,
    Object,
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::String => "string",
            Keyword::Number => "number",
            Keyword::Boolean => "boolean",
            Keyword::BigInt => "bigint",
            Keyword::Symbol => "symbol",
            Keyword::Object => "object",
            Keyword::Any => "any",
            Keyword::Unknown => "unknown",
            Keyword::Never => "never",
            Keyword::Void => "void",
            Keyword::Undefined => "undefined",
            Keyword::Null => "null",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralType {
    String(String),
    /// Numeric literal kept in source form
    Number(String),
    Boolean(bool),
}

/// A (possibly qualified, possibly generic) type name.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeReference {
    /// Dotted name as written, e.g. `SharedPayload` or `ns.Payload`
    pub name: String,
    /// Specifier of an inline `import("...")` type
    pub specifier: Option<String>,
    pub args: Vec<TypeNode>,
}

impl TypeReference {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specifier: None,
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectTypeNode {
    pub members: Vec<PropertySignature>,
    /// Value type of a `[key: string]: T` index signature
    pub index: Option<Box<TypeNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySignature {
    pub name: String,
    pub ty: TypeNode,
    pub optional: bool,
    pub readonly: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleElement {
    pub ty: TypeNode,
    pub optional: bool,
    pub rest: bool,
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(specifier) = &self.specifier {
            write!(f, "import(\"{}\").", specifier)?;
        }
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            write_joined(f, &self.args, ", ")?;
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralType::String(value) => write!(f, "{:?}", value),
            LiteralType::Number(value) => f.write_str(value),
            LiteralType::Boolean(value) => write!(f, "{}", value),
        }
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Keyword(keyword) => f.write_str(keyword.as_str()),
            TypeNode::Literal(literal) => write!(f, "{}", literal),
            TypeNode::TemplateLiteral => f.write_str("`${string}`"),
            TypeNode::Reference(reference) => write!(f, "{}", reference),
            TypeNode::Object(object) => {
                if object.members.is_empty() && object.index.is_none() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for member in &object.members {
                    if member.readonly {
                        f.write_str("readonly ")?;
                    }
                    let marker = if member.optional { "?" } else { "" };
                    write!(f, "{}{}: {}; ", member.name, marker, member.ty)?;
                }
                if let Some(index) = &object.index {
                    write!(f, "[key: string]: {}; ", index)?;
                }
                f.write_str("}")
            }
            TypeNode::Array(inner) => match inner.as_ref() {
                TypeNode::Union(_) | TypeNode::Intersection(_) | TypeNode::Function => {
                    write!(f, "({})[]", inner)
                }
                _ => write!(f, "{}[]", inner),
            },
            TypeNode::Tuple(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if element.rest {
                        f.write_str("...")?;
                    }
                    write!(f, "{}", element.ty)?;
                    if element.optional {
                        f.write_str("?")?;
                    }
                }
                f.write_str("]")
            }
            TypeNode::Union(members) => write_joined(f, members, " | "),
            TypeNode::Intersection(members) => write_joined(f, members, " & "),
            TypeNode::IndexedAccess { object, index } => write!(f, "{}[{}]", object, index),
            TypeNode::Function => f.write_str("(...args: any[]) => any"),
            TypeNode::Unsupported(text) => f.write_str(text),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, nodes: &[TypeNode], separator: &str) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_object_type() {
        let node = parse_type("{ id: string; time?: Date }").unwrap();
        assert_eq!(node.to_string(), "{ id: string; time?: Date; }");
    }

    #[test]
    fn test_display_generic_reference() {
        let node = parse_type("Base<Req, Array<string | number>>").unwrap();
        assert_eq!(node.to_string(), "Base<Req, Array<string | number>>");
    }

    #[test]
    fn test_display_keywords_and_literals() {
        let node = parse_type("null | undefined | 'a' | -2.5 | unknown").unwrap();
        assert_eq!(node.to_string(), "null | undefined | \"a\" | -2.5 | unknown");
    }
}
