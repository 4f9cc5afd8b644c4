//! OpenAPI contracts from handler classes.
//!
//! Many RPC-style TypeScript services declare each action as a class whose request and
//! response types are the generic arguments of a shared base class:
//!
//! ```text
//! export class GetLoginInfo extends OneBotAction<void, OB11User> { ... }
//! ```
//!
//! This library reads such a project statically and turns every registered handler into a
//! `POST /<operation>` entry of an OpenAPI 3.0 document, with the response type expanded to
//! a JSON schema and every named type shared through `components/schemas`.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Finds the TypeScript sources of a project
//! 2. [`parser`] / [`syntax`] - Parses sources with `deno_ast` and keeps declarations, imports and exports
//! 3. [`oracle`] - Indexes declarations and resolves names across modules
//! 4. [`hierarchy`] - Walks from a handler class to the type argument carrying its response
//! 5. [`expander`] - Expands type expressions into the [`ir::CanonicalType`] form
//! 6. [`canonicalizer`] - Gives every shared definition a unique component name
//! 7. [`schema_generator`] / [`openapi_builder`] - Assemble the OpenAPI document
//! 8. [`serializer`] - Writes the document as YAML or JSON
//!
//! [`generator::ContractGenerator`] drives steps 4 to 7 for every handler a
//! [`registry::HandlerRegistry`] lists, plus any types requested by name.
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_handlers::{
//!     expander::ExpansionOptions,
//!     generator::ContractGenerator,
//!     oracle::ProjectIndex,
//!     parser::SourceParser,
//!     registry::ManifestRegistry,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//! };
//! use indexmap::IndexMap;
//! use std::path::{Path, PathBuf};
//!
//! // Scan and parse the project
//! let root = PathBuf::from("./napcat");
//! let scan_result = FileScanner::new(root.clone()).scan().unwrap();
//! let parsed_files: Vec<_> = SourceParser::parse_files(&root, &scan_result.source_files)
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//!
//! // Index declarations and list the handlers
//! let index = ProjectIndex::build(parsed_files, &IndexMap::new()).unwrap();
//! let registry = ManifestRegistry::load(Path::new("./napcat/handlers.yaml")).unwrap();
//!
//! // Generate and serialize
//! let report = ContractGenerator::new(&index, ExpansionOptions::default())
//!     .generate(&registry)
//!     .unwrap();
//! println!("{}", serialize_yaml(&report.document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod canonicalizer;
pub mod cli;
pub mod config;
pub mod error;
pub mod expander;
pub mod generator;
pub mod hierarchy;
pub mod ir;
pub mod openapi_builder;
pub mod oracle;
pub mod parser;
pub mod registry;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod syntax;
