use deno_ast::swc::ast;
use deno_ast::swc::common::comments::CommentKind;
use deno_ast::swc::common::{Span, Spanned};
use deno_ast::diagnostics::Diagnostic;
use deno_ast::{MediaType, ModuleSpecifier, ParseDiagnostic, ParseParams, ParsedSource, SourcePos};
use log::debug;
use std::path::Path;

use super::{
    DeclarationBody, DeclarationSyntax, EnumMember, ExportClause, ImportBinding, Imported, Keyword,
    LiteralType, ModuleSyntax, ObjectTypeNode, PropertySignature, SyntaxError, TupleElement,
    TypeNode, TypeParam, TypeReference,
};

/// Alias that [`parse_type`] wraps its input in
const TYPE_HOLDER: &str = "__TypeHolder";

/// Parses a whole TypeScript module.
pub fn parse_module(source: &str) -> Result<ModuleSyntax, SyntaxError> {
    parse_module_at(Path::new("module.ts"), source)
}

/// Parses a module in the dialect its file name asks for (`.ts`, `.tsx`, `.d.ts`, ...).
///
/// Any syntax error fails the whole module, including those the parser could recover from.
/// Heritage clauses that name no type are recorded in [`ModuleSyntax::diagnostics`].
pub fn parse_module_at(path: &Path, source: &str) -> Result<ModuleSyntax, SyntaxError> {
    let parsed = parse_source(path, source)?;
    if let Some(diagnostic) = parsed.diagnostics().first() {
        return Err(syntax_error(diagnostic));
    }
    let mut lowering = Lowering {
        parsed: &parsed,
        source,
        module: ModuleSyntax::default(),
    };
    lowering.program();
    Ok(lowering.module)
}

/// Parses a single type expression, e.g. `{ id: string; time: Date }`.
pub fn parse_type(source: &str) -> Result<TypeNode, SyntaxError> {
    let module = parse_module(&format!("type {} = {};", TYPE_HOLDER, source))?;
    if let Some(error) = module.diagnostics.into_iter().next() {
        return Err(error);
    }
    module
        .declarations
        .into_iter()
        .find_map(|declaration| match declaration.body {
            DeclarationBody::Alias(node) if declaration.name == TYPE_HOLDER => Some(node),
            _ => None,
        })
        .ok_or_else(|| SyntaxError {
            line: 1,
            message: format!("`{}` is not a single type", source),
        })
}

fn parse_source(path: &Path, source: &str) -> Result<ParsedSource, SyntaxError> {
    let url = format!("file:///module{}", dialect_suffix(path));
    let specifier = ModuleSpecifier::parse(&url).map_err(|e| SyntaxError {
        line: 0,
        message: format!("cannot name {}: {}", path.display(), e),
    })?;
    let media_type = match MediaType::from_specifier(&specifier) {
        MediaType::Unknown => MediaType::TypeScript,
        media_type => media_type,
    };
    deno_ast::parse_module(ParseParams {
        specifier,
        text: source.into(),
        media_type,
        capture_tokens: false,
        scope_analysis: false,
        maybe_syntax: None,
    })
    .map_err(|diagnostic| syntax_error(&diagnostic))
}

/// Extension that selects the parser dialect. Declaration files keep their double suffix.
fn dialect_suffix(path: &Path) -> String {
    let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
    if let Some(suffix) = [".d.ts", ".d.mts", ".d.cts"].iter().find(|s| name.ends_with(*s)) {
        return suffix.to_string();
    }
    match path.extension().and_then(|extension| extension.to_str()) {
        Some(extension) if extension.chars().all(|c| c.is_ascii_alphanumeric()) => format!(".{}", extension),
        _ => ".ts".to_string(),
    }
}

fn syntax_error(diagnostic: &ParseDiagnostic) -> SyntaxError {
    SyntaxError {
        line: diagnostic.display_position().line_number,
        message: diagnostic.message().to_string(),
    }
}

struct Lowering<'a> {
    parsed: &'a ParsedSource,
    source: &'a str,
    module: ModuleSyntax,
}

impl Lowering<'_> {
    fn program(&mut self) {
        let program = self.parsed.program();
        match program.as_ref() {
            ast::Program::Module(module) => {
                for item in &module.body {
                    match item {
                        ast::ModuleItem::ModuleDecl(decl) => self.module_decl(decl),
                        ast::ModuleItem::Stmt(stmt) => self.statement(stmt),
                    }
                }
            }
            ast::Program::Script(script) => script.body.iter().for_each(|stmt| self.statement(stmt)),
        }
    }

    fn statement(&mut self, stmt: &ast::Stmt) {
        if let ast::Stmt::Decl(decl) = stmt {
            if let Some(declaration) = self.declaration(decl, decl.span()) {
                self.module.declarations.push(declaration);
            }
        }
    }

    fn module_decl(&mut self, decl: &ast::ModuleDecl) {
        match decl {
            ast::ModuleDecl::Import(import) => self.import(import),
            ast::ModuleDecl::ExportDecl(export) => {
                if let Some(mut declaration) = self.declaration(&export.decl, export.span) {
                    declaration.exported = true;
                    self.module.declarations.push(declaration);
                }
            }
            ast::ModuleDecl::ExportNamed(export) => self.named_export(export),
            ast::ModuleDecl::ExportAll(export) => self.module.exports.push(ExportClause::ReExportAll {
                specifier: string_value(&export.src),
            }),
            ast::ModuleDecl::ExportDefaultDecl(export) => {
                let mut declaration = match &export.decl {
                    ast::DefaultDecl::Class(class) => {
                        let name = class
                            .ident
                            .as_ref()
                            .map(|ident| ident.sym.to_string())
                            .unwrap_or_else(|| "default".to_string());
                        self.class(name, &class.class)
                    }
                    ast::DefaultDecl::TsInterfaceDecl(interface) => self.interface(interface),
                    ast::DefaultDecl::Fn(_) => return,
                };
                declaration.exported = true;
                declaration.default_export = true;
                declaration.description = self.doc(export.span);
                self.module.declarations.push(declaration);
            }
            ast::ModuleDecl::ExportDefaultExpr(export) => match export.expr.as_ref() {
                ast::Expr::Ident(ident) => self.module.exports.push(ExportClause::Default {
                    local: ident.sym.to_string(),
                }),
                _ => debug!("Ignoring default export of an expression"),
            },
            // `import x = require(...)`, `export = x`, `export as namespace x`
            _ => {}
        }
    }

    fn import(&mut self, import: &ast::ImportDecl) {
        let specifier = string_value(&import.src);
        for binding in &import.specifiers {
            let (local, imported) = match binding {
                ast::ImportSpecifier::Named(named) => {
                    let imported = match &named.imported {
                        Some(name) => export_name(name),
                        None => named.local.sym.to_string(),
                    };
                    (named.local.sym.to_string(), Imported::Named(imported))
                }
                ast::ImportSpecifier::Default(default) => (default.local.sym.to_string(), Imported::Default),
                ast::ImportSpecifier::Namespace(namespace) => (namespace.local.sym.to_string(), Imported::Namespace),
            };
            self.module.imports.push(ImportBinding {
                local,
                imported,
                specifier: specifier.clone(),
            });
        }
    }

    fn named_export(&mut self, export: &ast::NamedExport) {
        let source = export.src.as_deref().map(string_value);
        for specifier in &export.specifiers {
            let clause = match (specifier, &source) {
                (ast::ExportSpecifier::Named(named), Some(source)) => {
                    let imported = export_name(&named.orig);
                    ExportClause::ReExport {
                        specifier: source.clone(),
                        exported: named.exported.as_ref().map(export_name).unwrap_or_else(|| imported.clone()),
                        imported,
                    }
                }
                (ast::ExportSpecifier::Named(named), None) => {
                    let local = export_name(&named.orig);
                    ExportClause::Local {
                        exported: named.exported.as_ref().map(export_name).unwrap_or_else(|| local.clone()),
                        local,
                    }
                }
                (ast::ExportSpecifier::Namespace(namespace), Some(source)) => ExportClause::ReExportNamespace {
                    specifier: source.clone(),
                    exported: export_name(&namespace.name),
                },
                _ => continue,
            };
            self.module.exports.push(clause);
        }
    }

    /// Type-level declarations. Functions, variables and namespaces yield `None`.
    fn declaration(&mut self, decl: &ast::Decl, doc_span: Span) -> Option<DeclarationSyntax> {
        let mut declaration = match decl {
            ast::Decl::Class(class) => self.class(class.ident.sym.to_string(), &class.class),
            ast::Decl::TsInterface(interface) => self.interface(interface),
            ast::Decl::TsTypeAlias(alias) => DeclarationSyntax::new(
                alias.id.sym.to_string(),
                self.type_params(alias.type_params.as_deref()),
                DeclarationBody::Alias(self.ty(&alias.type_ann)),
            ),
            ast::Decl::TsEnum(enumeration) => DeclarationSyntax::new(
                enumeration.id.sym.to_string(),
                Vec::new(),
                DeclarationBody::Enum(enumeration.members.iter().map(enum_member).collect()),
            ),
            _ => return None,
        };
        declaration.description = self.doc(doc_span).or_else(|| self.doc(decl.span()));
        Some(declaration)
    }

    fn class(&mut self, name: String, class: &ast::Class) -> DeclarationSyntax {
        let extends = class.super_class.as_deref().and_then(|parent| {
            let target = self.heritage_target(parent, class.super_type_params.as_deref());
            if target.is_none() {
                let line = self.line_of(parent.span());
                self.module.diagnostics.push(SyntaxError {
                    line,
                    message: format!("supertype of class `{}` is not a type name", name),
                });
            }
            target
        });
        let implements = class
            .implements
            .iter()
            .filter_map(|clause| self.heritage_target(&clause.expr, clause.type_args.as_deref()))
            .collect();

        let mut members = ObjectTypeNode::default();
        for member in &class.body {
            self.class_member(member, &mut members);
        }
        DeclarationSyntax::new(
            name,
            self.type_params(class.type_params.as_deref()),
            DeclarationBody::Class {
                extends,
                implements,
                members,
            },
        )
    }

    /// Public instance properties and the index signature; methods, accessors,
    /// constructors, static and private members are left out.
    fn class_member(&self, member: &ast::ClassMember, members: &mut ObjectTypeNode) {
        match member {
            ast::ClassMember::ClassProp(prop) => {
                let hidden = matches!(
                    prop.accessibility,
                    Some(ast::Accessibility::Private | ast::Accessibility::Protected)
                );
                if prop.is_static || hidden {
                    return;
                }
                let Some(name) = prop_name(&prop.key) else {
                    return;
                };
                members.members.push(PropertySignature {
                    name,
                    ty: self.annotation(prop.type_ann.as_deref()),
                    optional: prop.is_optional,
                    readonly: prop.readonly,
                    description: self.doc(prop.span),
                });
            }
            ast::ClassMember::TsIndexSignature(index) if !index.is_static => {
                if let Some(value) = &index.type_ann {
                    members.index = Some(Box::new(self.ty(&value.type_ann)));
                }
            }
            _ => {}
        }
    }

    fn interface(&self, interface: &ast::TsInterfaceDecl) -> DeclarationSyntax {
        let extends = interface
            .extends
            .iter()
            .filter_map(|clause| self.heritage_target(&clause.expr, clause.type_args.as_deref()))
            .collect();
        DeclarationSyntax::new(
            interface.id.sym.to_string(),
            self.type_params(interface.type_params.as_deref()),
            DeclarationBody::Interface {
                extends,
                members: self.object_members(&interface.body.body),
            },
        )
    }

    /// `Base<A, B>`, `ns.Base<A, B>` or a mixin call `Mixin(Base)`.
    fn heritage_target(&self, expr: &ast::Expr, args: Option<&ast::TsTypeParamInstantiation>) -> Option<TypeReference> {
        let name = match expr {
            ast::Expr::Call(call) => match &call.callee {
                ast::Callee::Expr(callee) => expression_name(callee)?,
                _ => return None,
            },
            other => expression_name(other)?,
        };
        Some(TypeReference {
            name,
            specifier: None,
            args: self.type_args(args),
        })
    }

    fn object_members(&self, elements: &[ast::TsTypeElement]) -> ObjectTypeNode {
        let mut object = ObjectTypeNode::default();
        for element in elements {
            match element {
                ast::TsTypeElement::TsPropertySignature(prop) if !prop.computed => {
                    let Some(name) = key_name(&prop.key) else {
                        continue;
                    };
                    object.members.push(PropertySignature {
                        name,
                        ty: self.annotation(prop.type_ann.as_deref()),
                        optional: prop.optional,
                        readonly: prop.readonly,
                        description: self.doc(prop.span),
                    });
                }
                ast::TsTypeElement::TsMethodSignature(method) if !method.computed => {
                    let Some(name) = key_name(&method.key) else {
                        continue;
                    };
                    object.members.push(PropertySignature {
                        name,
                        ty: TypeNode::Function,
                        optional: method.optional,
                        readonly: false,
                        description: None,
                    });
                }
                ast::TsTypeElement::TsIndexSignature(index) => {
                    if let Some(value) = &index.type_ann {
                        object.index = Some(Box::new(self.ty(&value.type_ann)));
                    }
                }
                // call, construct and accessor signatures
                _ => {}
            }
        }
        object
    }

    fn type_params(&self, params: Option<&ast::TsTypeParamDecl>) -> Vec<TypeParam> {
        params
            .map(|decl| {
                decl.params
                    .iter()
                    .map(|param| TypeParam {
                        name: param.name.sym.to_string(),
                        constraint: param.constraint.as_deref().map(|ty| self.ty(ty)),
                        default: param.default.as_deref().map(|ty| self.ty(ty)),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn type_args(&self, args: Option<&ast::TsTypeParamInstantiation>) -> Vec<TypeNode> {
        args.map(|args| args.params.iter().map(|ty| self.ty(ty)).collect())
            .unwrap_or_default()
    }

    fn annotation(&self, annotation: Option<&ast::TsTypeAnn>) -> TypeNode {
        match annotation {
            Some(annotation) => self.ty(&annotation.type_ann),
            None => TypeNode::Keyword(Keyword::Any),
        }
    }

    fn ty(&self, ty: &ast::TsType) -> TypeNode {
        match ty {
            ast::TsType::TsKeywordType(keyword) => TypeNode::Keyword(keyword_of(keyword.kind)),
            ast::TsType::TsThisType(_) => TypeNode::Unsupported("this".to_string()),
            ast::TsType::TsFnOrConstructorType(_) => TypeNode::Function,
            ast::TsType::TsTypeRef(reference) => TypeNode::Reference(TypeReference {
                name: entity_name(&reference.type_name),
                specifier: None,
                args: self.type_args(reference.type_params.as_deref()),
            }),
            ast::TsType::TsTypeQuery(query) => {
                let target = match &query.expr_name {
                    ast::TsTypeQueryExpr::TsEntityName(name) => entity_name(name),
                    ast::TsTypeQueryExpr::Import(import) => format!("import(\"{}\")", string_value(&import.arg)),
                };
                TypeNode::Unsupported(format!("typeof {}", target))
            }
            ast::TsType::TsTypeLit(literal) => TypeNode::Object(self.object_members(&literal.members)),
            ast::TsType::TsArrayType(array) => TypeNode::Array(Box::new(self.ty(&array.elem_type))),
            ast::TsType::TsTupleType(tuple) => {
                TypeNode::Tuple(tuple.elem_types.iter().map(|element| self.tuple_element(element)).collect())
            }
            ast::TsType::TsOptionalType(optional) => self.ty(&optional.type_ann),
            ast::TsType::TsRestType(rest) => self.ty(&rest.type_ann),
            ast::TsType::TsUnionOrIntersectionType(ast::TsUnionOrIntersectionType::TsUnionType(union)) => {
                flatten(union.types.iter().map(|member| self.ty(member)).collect(), TypeNode::Union)
            }
            ast::TsType::TsUnionOrIntersectionType(ast::TsUnionOrIntersectionType::TsIntersectionType(
                intersection,
            )) => flatten(
                intersection.types.iter().map(|member| self.ty(member)).collect(),
                TypeNode::Intersection,
            ),
            ast::TsType::TsConditionalType(conditional) => TypeNode::Unsupported(format!(
                "{} extends {} ? ... : ... (conditional type)",
                self.ty(&conditional.check_type),
                self.ty(&conditional.extends_type)
            )),
            ast::TsType::TsInferType(infer) => TypeNode::Unsupported(format!("infer {}", infer.type_param.name.sym)),
            ast::TsType::TsParenthesizedType(inner) => self.ty(&inner.type_ann),
            ast::TsType::TsTypeOperator(operator) => match operator.op {
                ast::TsTypeOperatorOp::KeyOf => {
                    TypeNode::Unsupported(format!("keyof {}", self.ty(&operator.type_ann)))
                }
                ast::TsTypeOperatorOp::Unique => TypeNode::Keyword(Keyword::Symbol),
                ast::TsTypeOperatorOp::ReadOnly => self.ty(&operator.type_ann),
            },
            ast::TsType::TsIndexedAccessType(indexed) => TypeNode::IndexedAccess {
                object: Box::new(self.ty(&indexed.obj_type)),
                index: Box::new(self.ty(&indexed.index_type)),
            },
            ast::TsType::TsMappedType(_) => TypeNode::Unsupported("mapped type".to_string()),
            ast::TsType::TsLitType(literal) => match &literal.lit {
                ast::TsLit::Number(number) => TypeNode::Literal(LiteralType::Number(number_text(number.value))),
                ast::TsLit::Str(value) => TypeNode::Literal(LiteralType::String(string_value(value))),
                ast::TsLit::Bool(value) => TypeNode::Literal(LiteralType::Boolean(value.value)),
                ast::TsLit::BigInt(_) => TypeNode::Keyword(Keyword::BigInt),
                ast::TsLit::Tpl(_) => TypeNode::TemplateLiteral,
            },
            ast::TsType::TsTypePredicate(_) => TypeNode::Keyword(Keyword::Boolean),
            ast::TsType::TsImportType(import) => {
                let specifier = string_value(&import.arg);
                match &import.qualifier {
                    Some(qualifier) => TypeNode::Reference(TypeReference {
                        name: entity_name(qualifier),
                        specifier: Some(specifier),
                        args: self.type_args(import.type_args.as_deref()),
                    }),
                    None => TypeNode::Unsupported(format!("import(\"{}\")", specifier)),
                }
            }
        }
    }

    fn tuple_element(&self, element: &ast::TsTupleElement) -> TupleElement {
        let (labeled_optional, labeled_rest) = match &element.label {
            Some(ast::Pat::Ident(binding)) => (binding.id.optional, false),
            Some(ast::Pat::Rest(_)) => (false, true),
            _ => (false, false),
        };
        match element.ty.as_ref() {
            ast::TsType::TsRestType(rest) => TupleElement {
                ty: self.ty(&rest.type_ann),
                optional: false,
                rest: true,
            },
            ast::TsType::TsOptionalType(optional) => TupleElement {
                ty: self.ty(&optional.type_ann),
                optional: true,
                rest: false,
            },
            other => TupleElement {
                ty: self.ty(other),
                optional: labeled_optional,
                rest: labeled_rest,
            },
        }
    }

    /// Description of the `/** ... */` comment right before `span`.
    fn doc(&self, span: Span) -> Option<String> {
        let comments = self.parsed.comments().get_leading(SourcePos::unsafely_from_byte_pos(span.lo))?;
        let comment = comments
            .iter()
            .rev()
            .find(|comment| matches!(comment.kind, CommentKind::Block) && comment.text.starts_with('*'))?;
        jsdoc_description(&comment.text)
    }

    fn line_of(&self, span: Span) -> usize {
        // source positions start at 1
        let offset = (span.lo.0 as usize).saturating_sub(1).min(self.source.len());
        self.source.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1
    }
}

/// Text before the first block tag, with the leading `*` of every line removed.
fn jsdoc_description(text: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in text.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        if line.starts_with('@') {
            break;
        }
        lines.push(line);
    }
    let description = lines.join("\n").trim().to_string();
    (!description.is_empty()).then_some(description)
}

fn flatten(mut members: Vec<TypeNode>, combine: fn(Vec<TypeNode>) -> TypeNode) -> TypeNode {
    if members.len() == 1 {
        members.remove(0)
    } else {
        combine(members)
    }
}

fn keyword_of(kind: ast::TsKeywordTypeKind) -> Keyword {
    match kind {
        ast::TsKeywordTypeKind::TsAnyKeyword => Keyword::Any,
        ast::TsKeywordTypeKind::TsUnknownKeyword | ast::TsKeywordTypeKind::TsIntrinsicKeyword => Keyword::Unknown,
        ast::TsKeywordTypeKind::TsNumberKeyword => Keyword::Number,
        ast::TsKeywordTypeKind::TsObjectKeyword => Keyword::Object,
        ast::TsKeywordTypeKind::TsBooleanKeyword => Keyword::Boolean,
        ast::TsKeywordTypeKind::TsBigIntKeyword => Keyword::BigInt,
        ast::TsKeywordTypeKind::TsStringKeyword => Keyword::String,
        ast::TsKeywordTypeKind::TsSymbolKeyword => Keyword::Symbol,
        ast::TsKeywordTypeKind::TsVoidKeyword => Keyword::Void,
        ast::TsKeywordTypeKind::TsUndefinedKeyword => Keyword::Undefined,
        ast::TsKeywordTypeKind::TsNullKeyword => Keyword::Null,
        ast::TsKeywordTypeKind::TsNeverKeyword => Keyword::Never,
    }
}

fn enum_member(member: &ast::TsEnumMember) -> EnumMember {
    let name = match &member.id {
        ast::TsEnumMemberId::Ident(ident) => ident.sym.to_string(),
        ast::TsEnumMemberId::Str(value) => string_value(value),
    };
    EnumMember {
        name,
        value: member.init.as_deref().and_then(enum_initializer),
    }
}

/// Literal initializers only; computed members count as auto-numbered.
fn enum_initializer(expr: &ast::Expr) -> Option<LiteralType> {
    match expr {
        ast::Expr::Lit(ast::Lit::Str(value)) => Some(LiteralType::String(string_value(value))),
        ast::Expr::Lit(ast::Lit::Num(number)) => Some(LiteralType::Number(number_text(number.value))),
        ast::Expr::Unary(unary) if matches!(unary.op, ast::UnaryOp::Minus) => match unary.arg.as_ref() {
            ast::Expr::Lit(ast::Lit::Num(number)) => Some(LiteralType::Number(number_text(-number.value))),
            _ => None,
        },
        ast::Expr::Paren(paren) => enum_initializer(&paren.expr),
        _ => None,
    }
}

fn entity_name(name: &ast::TsEntityName) -> String {
    match name {
        ast::TsEntityName::Ident(ident) => ident.sym.to_string(),
        ast::TsEntityName::TsQualifiedName(qualified) => {
            format!("{}.{}", entity_name(&qualified.left), qualified.right.sym)
        }
    }
}

/// Dotted name of `Base` or `ns.Base`.
fn expression_name(expr: &ast::Expr) -> Option<String> {
    match expr {
        ast::Expr::Ident(ident) => Some(ident.sym.to_string()),
        ast::Expr::Member(member) => match &member.prop {
            ast::MemberProp::Ident(prop) => Some(format!("{}.{}", expression_name(&member.obj)?, prop.sym)),
            _ => None,
        },
        ast::Expr::Paren(paren) => expression_name(&paren.expr),
        _ => None,
    }
}

fn prop_name(key: &ast::PropName) -> Option<String> {
    match key {
        ast::PropName::Ident(ident) => Some(ident.sym.to_string()),
        ast::PropName::Str(value) => Some(string_value(value)),
        ast::PropName::Num(number) => Some(number_text(number.value)),
        _ => None,
    }
}

fn key_name(key: &ast::Expr) -> Option<String> {
    match key {
        ast::Expr::Ident(ident) => Some(ident.sym.to_string()),
        ast::Expr::Lit(ast::Lit::Str(value)) => Some(string_value(value)),
        ast::Expr::Lit(ast::Lit::Num(number)) => Some(number_text(number.value)),
        _ => None,
    }
}

fn export_name(name: &ast::ModuleExportName) -> String {
    match name {
        ast::ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ast::ModuleExportName::Str(value) => string_value(value),
    }
}

fn string_value(value: &ast::Str) -> String {
    String::from_utf8_lossy(value.value.as_bytes()).to_string()
}

/// Integral values print without a fraction, so `3` stays `3` rather than `3.0`.
fn number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
