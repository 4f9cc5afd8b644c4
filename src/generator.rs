//! The per-run pipeline: enumerate handlers, resolve and expand each response, add the
//! requested named types, then name the shared definitions and assemble the document.
//!
//! One handler's failure never stops the others, and neither does a named type that
//! cannot be found or expanded. The only errors that abort a run are
//! failures of the type oracle itself.

use indexmap::IndexMap;
use log::{debug, info, warn};
use std::collections::HashSet;

use crate::canonicalizer::canonicalize;
use crate::error::{Error, Result};
use crate::expander::{ExpansionError, ExpansionOptions, ResolutionContext};
use crate::hierarchy::{HierarchyError, HierarchyResolver};
use crate::ir::{CanonicalType, DeclarationKey, HandlerDescriptor};
use crate::openapi_builder::{dangling_references, Info, OpenApiBuilder, OpenApiDocument};
use crate::oracle::{OracleError, TypeOracle};
use crate::registry::HandlerRegistry;

/// Why an operation is missing from the document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("operation name already emitted")]
    Duplicate,
    #[error("registry has no handler for it")]
    HandlerMissing,
    #[error("no declaration with that name in the project")]
    TypeNotFound,
    #[error(transparent)]
    Hierarchy(HierarchyError),
    #[error(transparent)]
    Expansion(ExpansionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOperation {
    /// Operation name, or the type name for a skipped named type
    pub operation: String,
    pub reason: SkipReason,
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub document: OpenApiDocument,
    /// Emitted operations in enumeration order
    pub operations: Vec<String>,
    /// Component names of the requested named types that were emitted
    pub types: Vec<String>,
    pub skipped: Vec<SkippedOperation>,
}

impl GenerationReport {
    pub fn component_count(&self) -> usize {
        self.document.components.schemas.len()
    }
}

/// A handler whose response has been expanded but not yet named.
struct PendingOperation {
    handler: HandlerDescriptor,
    request_schema: serde_json::Value,
    response: CanonicalType,
}

/// Drives one extraction run over a type oracle.
///
/// # Example
///
/// ```no_run
/// use openapi_from_handlers::expander::ExpansionOptions;
/// use openapi_from_handlers::generator::ContractGenerator;
/// use openapi_from_handlers::oracle::ProjectIndex;
/// use openapi_from_handlers::parser::SourceParser;
/// use openapi_from_handlers::registry::ManifestRegistry;
/// use openapi_from_handlers::scanner::FileScanner;
/// use indexmap::IndexMap;
/// use std::path::{Path, PathBuf};
///
/// let root = PathBuf::from("./napcat");
/// let files = FileScanner::new(root.clone()).scan().unwrap().source_files;
/// let parsed = SourceParser::parse_files(&root, &files).into_iter().filter_map(Result::ok).collect();
/// let index = ProjectIndex::build(parsed, &IndexMap::new()).unwrap();
/// let registry = ManifestRegistry::load(Path::new("./napcat/handlers.yaml")).unwrap();
///
/// let report = ContractGenerator::new(&index, ExpansionOptions::default())
///     .generate(&registry)
///     .unwrap();
/// println!("{} operations, {} skipped", report.operations.len(), report.skipped.len());
/// ```
pub struct ContractGenerator<'o> {
    oracle: &'o dyn TypeOracle,
    options: ExpansionOptions,
    info: Option<Info>,
    types: Vec<String>,
}

impl<'o> ContractGenerator<'o> {
    pub fn new(oracle: &'o dyn TypeOracle, options: ExpansionOptions) -> Self {
        Self {
            oracle,
            options,
            info: None,
            types: Vec::new(),
        }
    }

    /// Declarations emitted as components whether or not a handler references them.
    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    /// Overrides the document info section.
    pub fn with_info(mut self, info: Info) -> Self {
        self.info = Some(info);
        self
    }

    /// Runs the whole pipeline against the handlers of `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Oracle`] when the type oracle fails, naming the operation that
    /// triggered it. Problems with individual handlers are reported in
    /// [`GenerationReport::skipped`] instead.
    pub fn generate(&self, registry: &dyn HandlerRegistry) -> Result<GenerationReport> {
        let resolver = HierarchyResolver::new(self.oracle);
        let mut context = ResolutionContext::new(self.oracle, self.options.clone());
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending: Vec<PendingOperation> = Vec::new();
        let mut skipped: Vec<SkippedOperation> = Vec::new();

        let names = registry.operation_names();
        info!("Resolving {} handler operation(s)...", names.len());

        for operation in names {
            let mut skip = |reason: SkipReason| {
                warn!("Skipping operation `{}`: {}", operation, reason);
                skipped.push(SkippedOperation {
                    operation: operation.clone(),
                    reason,
                });
            };

            if seen.contains(&operation) {
                skip(SkipReason::Duplicate);
                continue;
            }
            let Some(instance) = registry.instantiate(&operation) else {
                skip(SkipReason::HandlerMissing);
                continue;
            };

            let binding = match resolver.resolve(&instance.class_name) {
                Ok(binding) => binding,
                Err(HierarchyError::Oracle(source)) => return Err(oracle_failure(&operation, source)),
                Err(e) => {
                    skip(SkipReason::Hierarchy(e));
                    continue;
                }
            };
            debug!(
                "`{}`: response of {} is {}",
                operation, binding.class, binding.expression
            );

            let response = match context.expand(&binding.expression) {
                Ok(response) => response,
                Err(ExpansionError::Oracle(source)) => return Err(oracle_failure(&operation, source)),
                Err(e) => {
                    skip(SkipReason::Expansion(e));
                    continue;
                }
            };

            seen.insert(operation.clone());
            pending.push(PendingOperation {
                handler: HandlerDescriptor {
                    operation,
                    scope: binding.class.module.clone(),
                    class: binding.class,
                },
                request_schema: instance.request_schema,
                response,
            });
        }

        let mut roots: Vec<DeclarationKey> = Vec::new();
        if !self.types.is_empty() {
            info!("Expanding {} named type(s)...", self.types.len());
        }
        for name in &self.types {
            let mut skip = |reason: SkipReason| {
                warn!("Skipping type `{}`: {}", name, reason);
                skipped.push(SkippedOperation {
                    operation: name.clone(),
                    reason,
                });
            };
            let Some(key) = self.oracle.find_type(name) else {
                skip(SkipReason::TypeNotFound);
                continue;
            };
            match context.expand_declaration(&key) {
                Ok(()) if !roots.contains(&key) => roots.push(key),
                Ok(()) => {}
                Err(ExpansionError::Oracle(source)) => return Err(oracle_failure(name, source)),
                Err(e) => skip(SkipReason::Expansion(e)),
            }
        }

        let descriptions = context.descriptions().clone();
        let definitions: IndexMap<_, _> = context.into_definitions();
        info!("Naming {} shared definition(s)...", definitions.len());
        let mut table = canonicalize(&definitions)?;
        table.describe(&descriptions);
        let types = roots
            .iter()
            .filter_map(|key| table.name_of(key).map(str::to_string))
            .collect();

        let mut builder = OpenApiBuilder::new();
        if let Some(info) = &self.info {
            builder = builder.with_info(info.title.clone(), info.version.clone(), info.description.clone());
        }
        let mut operations = Vec::with_capacity(pending.len());
        for entry in pending {
            let response = table.rewrite(&entry.response)?;
            let summary = Some(entry.handler.class.symbol.clone());
            builder.add_operation(&entry.handler, summary, entry.request_schema, &response)?;
            operations.push(entry.handler.operation);
        }

        let document = builder.build(&table);
        for target in dangling_references(&document) {
            // only request schemas come from outside the pipeline
            warn!("Request schema points at a missing component: {}", target);
        }

        Ok(GenerationReport {
            document,
            operations,
            types,
            skipped,
        })
    }
}

fn oracle_failure(operation: &str, source: OracleError) -> Error {
    Error::Oracle {
        operation: operation.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DeclarationKey, ModulePath};
    use crate::oracle::{Declaration, ProjectIndex};
    use crate::parser::SourceParser;
    use crate::registry::{HandlerInstance, ManifestEntry, ManifestRegistry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn index(files: &[(&str, &str)]) -> ProjectIndex {
        let parsed = files
            .iter()
            .map(|(module, source)| SourceParser::parse_source(ModulePath::new(*module), source).unwrap())
            .collect();
        ProjectIndex::build(parsed, &IndexMap::new()).unwrap()
    }

    fn entry(operation: &str, class: Option<&str>) -> ManifestEntry {
        ManifestEntry {
            operation: operation.to_string(),
            class: class.map(str::to_string),
            request_schema: None,
        }
    }

    const BASE: (&str, &str) = ("src/base", "export abstract class Base<Req, Res> {}");

    #[test]
    fn test_shared_type_becomes_one_component() {
        let index = index(&[
            BASE,
            ("src/types", "export interface Peer { id: number; nick?: string }"),
            (
                "src/a",
                "import { Base } from './base';\nimport { Peer } from './types';\nexport class A extends Base<void, Peer> {}",
            ),
            (
                "src/b",
                "import { Base } from './base';\nimport { Peer } from './types';\nexport class B extends Base<void, Peer[]> {}",
            ),
        ]);
        let registry = ManifestRegistry::from_entries(vec![entry("a", Some("A")), entry("b", Some("B"))]);

        let report = ContractGenerator::new(&index, ExpansionOptions::default())
            .generate(&registry)
            .unwrap();

        assert_eq!(report.operations, vec!["a", "b"]);
        assert_eq!(report.component_count(), 1);
        let value = serde_json::to_value(&report.document).unwrap();
        assert_eq!(
            value["paths"]["/b"]["post"]["responses"]["200"]["content"]["application/json"]["schema"],
            json!({"type": "array", "items": {"$ref": "#/components/schemas/Peer"}})
        );
        assert_eq!(value["paths"]["/a"]["post"]["summary"], json!("A"));
        assert!(dangling_references(&report.document).is_empty());
    }

    #[test]
    fn test_skips_are_reported_and_run_continues() {
        let index = index(&[
            BASE,
            ("src/ok", "import { Base } from './base';\nexport class Ok extends Base<void, string> {}"),
            ("src/broken", "import { Gone } from './gone';\nexport class Broken extends Gone {}"),
            (
                "src/bad",
                "import { Base } from './base';\nexport class Bad extends Base<void, Missing> {}",
            ),
        ]);
        let registry = ManifestRegistry::from_entries(vec![
            entry("ok", Some("Ok")),
            entry("broken", Some("Broken")),
            entry("bad", Some("Bad")),
            entry("ok", Some("Ok")),
            entry("ghost", None),
        ]);

        let report = ContractGenerator::new(&index, ExpansionOptions::default())
            .generate(&registry)
            .unwrap();

        assert_eq!(report.operations, vec!["ok"]);
        let reasons: Vec<(&str, bool)> = report
            .skipped
            .iter()
            .map(|s| (s.operation.as_str(), matches!(s.reason, SkipReason::Hierarchy(_) | SkipReason::Expansion(_))))
            .collect();
        assert_eq!(
            reasons,
            vec![("broken", true), ("bad", true), ("ok", false), ("ghost", false)]
        );
        assert_eq!(report.skipped[2].reason, SkipReason::Duplicate);
        assert_eq!(report.skipped[3].reason, SkipReason::HandlerMissing);
    }

    #[test]
    fn test_custom_info_and_request_schema() {
        let index = index(&[
            BASE,
            ("src/ok", "import { Base } from './base';\nexport class Ok extends Base<void, boolean> {}"),
        ]);
        let registry = ManifestRegistry::from_entries(vec![ManifestEntry {
            operation: "ok".to_string(),
            class: Some("Ok".to_string()),
            request_schema: Some(json!({"type": "object", "properties": {"id": {"type": "number"}}})),
        }]);
        let report = ContractGenerator::new(&index, ExpansionOptions::default())
            .with_info(Info {
                title: "NapCat OneBot 11 API".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            })
            .generate(&registry)
            .unwrap();

        assert_eq!(report.document.info.title, "NapCat OneBot 11 API");
        let value = serde_json::to_value(&report.document).unwrap();
        assert_eq!(
            value["paths"]["/ok"]["post"]["requestBody"]["content"]["application/json"]["schema"]["properties"]["id"],
            json!({"type": "number"})
        );
    }

    #[test]
    fn test_named_types_become_components() {
        let index = index(&[
            BASE,
            (
                "src/types",
                r#"
                /** Any OneBot message */
                export interface OB11Message { message_id: number; sender: OB11Sender }
                export interface OB11Sender {
                    /** QQ number */
                    user_id: number;
                }
                export type Tree<T> = { value: T; children: Tree<T>[] }
                export type Broken = keyof OB11Message;
                "#,
            ),
            ("src/ok", "import { Base } from './base';\nexport class Ok extends Base<void, string> {}"),
        ]);
        let registry = ManifestRegistry::from_entries(vec![entry("ok", Some("Ok"))]);

        let report = ContractGenerator::new(&index, ExpansionOptions::default())
            .with_types(vec![
                "OB11Message".to_string(),
                "Missing".to_string(),
                "Broken".to_string(),
                "Tree".to_string(),
                "OB11Message".to_string(),
            ])
            .generate(&registry)
            .unwrap();

        assert_eq!(report.operations, vec!["ok"]);
        assert_eq!(report.types, vec!["OB11Message", "Tree"]);
        let skipped: Vec<(&str, &SkipReason)> = report
            .skipped
            .iter()
            .map(|s| (s.operation.as_str(), &s.reason))
            .collect();
        assert_eq!(skipped[0], ("Missing", &SkipReason::TypeNotFound));
        assert!(matches!(skipped[1], ("Broken", SkipReason::Expansion(_))));

        let schemas: Vec<&String> = report.document.components.schemas.keys().collect();
        assert_eq!(schemas, vec!["OB11Message", "OB11Sender", "Tree", "Tree_any_"]);
        let value = serde_json::to_value(&report.document).unwrap();
        assert_eq!(value["components"]["schemas"]["OB11Message"]["description"], json!("Any OneBot message"));
        assert_eq!(
            value["components"]["schemas"]["OB11Sender"]["properties"]["user_id"],
            json!({"type": "number", "description": "QQ number"})
        );
        assert_eq!(
            value["components"]["schemas"]["Tree"]["properties"]["children"],
            json!({"type": "array", "items": {"$ref": "#/components/schemas/Tree_any_"}})
        );
        assert!(dangling_references(&report.document).is_empty());
    }

    /// Oracle that finds a class but cannot produce its declaration.
    struct BrokenOracle;

    impl TypeOracle for BrokenOracle {
        fn find_class(&self, name: &str) -> Option<DeclarationKey> {
            Some(DeclarationKey::new(ModulePath::new("src/x"), name))
        }

        fn find_type(&self, name: &str) -> Option<DeclarationKey> {
            self.find_class(name)
        }

        fn declaration(&self, key: &DeclarationKey) -> std::result::Result<&Declaration, OracleError> {
            Err(OracleError::UnknownDeclaration(key.clone()))
        }

        fn resolve_name(&self, _module: &ModulePath, _name: &str) -> Option<DeclarationKey> {
            None
        }

        fn resolve_import(&self, _module: &ModulePath, _specifier: &str, _name: &str) -> Option<DeclarationKey> {
            None
        }
    }

    struct SingleRegistry;

    impl HandlerRegistry for SingleRegistry {
        fn operation_names(&self) -> Vec<String> {
            vec!["get_status".to_string()]
        }

        fn instantiate(&self, _operation: &str) -> Option<HandlerInstance> {
            Some(HandlerInstance {
                class_name: "GetStatus".to_string(),
                request_schema: json!({}),
            })
        }
    }

    #[test]
    fn test_oracle_failure_aborts_and_names_operation() {
        let err = ContractGenerator::new(&BrokenOracle, ExpansionOptions::default())
            .generate(&SingleRegistry)
            .unwrap_err();
        assert!(matches!(err, Error::Oracle { ref operation, .. } if operation == "get_status"));
    }
}
