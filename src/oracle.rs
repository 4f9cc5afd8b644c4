//! Type oracle: answers "where is this name declared?" for the resolution core.
//!
//! The core only talks to the [`TypeOracle`] trait. [`ProjectIndex`] is the implementation
//! built from parsed source files; it follows local declarations, named/default/namespace
//! imports, `export { .. } from`, `export *` and path aliases.

use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::{BTreeMap, HashSet};

use crate::ir::{join_segments, strip_source_extension, DeclarationKey, ModulePath};
use crate::parser::ParsedFile;
use crate::syntax::{DeclarationBody, DeclarationSyntax, ExportClause, ImportBinding, Imported};

/// Failures of the oracle itself. These abort the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("no source files to index")]
    NoSources,
    #[error("invalid path alias `{prefix}`: {reason}")]
    InvalidAlias { prefix: String, reason: String },
    #[error("declaration {0} is not in the project index")]
    UnknownDeclaration(DeclarationKey),
}

/// A declaration together with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub key: DeclarationKey,
    pub syntax: DeclarationSyntax,
}

/// Symbol-resolution services consumed by the hierarchy resolver and the expander.
pub trait TypeOracle {
    /// Finds a class declaration by bare name anywhere in the project.
    fn find_class(&self, name: &str) -> Option<DeclarationKey>;

    /// Finds a declaration of any kind by bare name anywhere in the project.
    fn find_type(&self, name: &str) -> Option<DeclarationKey>;

    /// Looks up a declaration by key.
    fn declaration(&self, key: &DeclarationKey) -> Result<&Declaration, OracleError>;

    /// Resolves a (possibly dotted) name as seen from inside `module`.
    fn resolve_name(&self, module: &ModulePath, name: &str) -> Option<DeclarationKey>;

    /// Resolves the export `name` of the module `specifier` refers to from `module`.
    fn resolve_import(&self, module: &ModulePath, specifier: &str, name: &str) -> Option<DeclarationKey>;
}

struct ModuleEntry {
    imports: Vec<ImportBinding>,
    exports: Vec<ExportClause>,
    declarations: IndexMap<String, Declaration>,
}

type Visited = HashSet<(ModulePath, String)>;

/// One path alias: specifier prefix and the root-relative directory it stands for.
struct PathAlias {
    prefix: String,
    target: String,
    /// Written with a trailing `*`, so any continuation of the prefix matches
    wildcard: bool,
}

impl PathAlias {
    /// Part of `specifier` after the alias, `None` when the alias does not apply.
    ///
    /// Without a wildcard or trailing `/` the prefix only matches whole path segments:
    /// `@common` covers `@common` and `@common/x` but not `@commonality`.
    fn remainder<'s>(&self, specifier: &'s str) -> Option<&'s str> {
        let bare = self.prefix.trim_end_matches('/');
        if specifier == bare {
            return Some("");
        }
        if self.wildcard || self.prefix.ends_with('/') {
            return specifier.strip_prefix(self.prefix.as_str());
        }
        specifier.strip_prefix(bare)?.strip_prefix('/')
    }
}

/// Declaration index over every parsed module of a project.
pub struct ProjectIndex {
    modules: BTreeMap<ModulePath, ModuleEntry>,
    /// Longest prefix first
    aliases: Vec<PathAlias>,
}

impl ProjectIndex {
    /// Builds the index.
    ///
    /// `aliases` maps specifier prefixes to root-relative directories, e.g. `@/` → `src/`.
    /// A trailing `*` on either side is accepted, so tsconfig `paths` entries can be used
    /// as they are.
    pub fn build(files: Vec<ParsedFile>, aliases: &IndexMap<String, String>) -> Result<Self, OracleError> {
        if files.is_empty() {
            return Err(OracleError::NoSources);
        }

        let mut alias_table = Vec::with_capacity(aliases.len());
        for (pattern, target) in aliases {
            let prefix = pattern.trim_end_matches('*');
            if prefix.is_empty() {
                return Err(OracleError::InvalidAlias {
                    prefix: pattern.to_string(),
                    reason: "prefix must not be empty".to_string(),
                });
            }
            alias_table.push(PathAlias {
                prefix: prefix.to_string(),
                target: target.trim_end_matches('*').trim_start_matches("./").to_string(),
                wildcard: prefix.len() != pattern.len(),
            });
        }
        alias_table.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        let mut modules = BTreeMap::new();
        for file in files {
            if modules.contains_key(&file.module) {
                warn!(
                    "Module {} is defined by more than one file, ignoring {}",
                    file.module,
                    file.path.display()
                );
                continue;
            }
            let mut declarations = IndexMap::new();
            for syntax in file.syntax.declarations {
                if declarations.contains_key(&syntax.name) {
                    debug!("Ignoring redeclaration of {} in {}", syntax.name, file.module);
                    continue;
                }
                let key = DeclarationKey::new(file.module.clone(), syntax.name.clone());
                declarations.insert(syntax.name.clone(), Declaration { key, syntax });
            }
            modules.insert(
                file.module,
                ModuleEntry {
                    imports: file.syntax.imports,
                    exports: file.syntax.exports,
                    declarations,
                },
            );
        }

        debug!("Indexed {} modules", modules.len());
        Ok(Self {
            modules,
            aliases: alias_table,
        })
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn declaration_count(&self) -> usize {
        self.modules.values().map(|m| m.declarations.len()).sum()
    }

    /// Maps a specifier to an indexed module, trying `<path>` and then `<path>/index`.
    fn resolve_specifier(&self, from: &ModulePath, specifier: &str) -> Option<ModulePath> {
        let specifier = strip_source_extension(specifier);
        let base = if specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../") {
            from.join_relative(specifier)?
        } else {
            let (alias, rest) = self
                .aliases
                .iter()
                .find_map(|alias| alias.remainder(specifier).map(|rest| (alias, rest)))?;
            join_segments(&alias.target, rest)?
        };

        if self.modules.contains_key(&base) {
            return Some(base);
        }
        let index = join_segments(base.as_str(), "index")?;
        if self.modules.contains_key(&index) {
            return Some(index);
        }
        debug!("Specifier '{}' from {} does not match an indexed module", specifier, from);
        None
    }

    fn lookup_local(&self, module: &ModulePath, name: &str, visited: &mut Visited) -> Option<DeclarationKey> {
        let entry = self.modules.get(module)?;
        if let Some(declaration) = entry.declarations.get(name) {
            return Some(declaration.key.clone());
        }
        let import = entry.imports.iter().find(|i| i.local == name)?;
        let target = self.resolve_specifier(module, &import.specifier)?;
        match &import.imported {
            Imported::Named(imported) => self.resolve_export(&target, imported, visited),
            Imported::Default => self.resolve_export(&target, "default", visited),
            Imported::Namespace => None,
        }
    }

    fn resolve_export(&self, module: &ModulePath, name: &str, visited: &mut Visited) -> Option<DeclarationKey> {
        if !visited.insert((module.clone(), name.to_string())) {
            return None;
        }
        let entry = self.modules.get(module)?;

        let declared = entry.declarations.values().find(|d| {
            if name == "default" {
                d.syntax.default_export
            } else {
                d.syntax.exported && !d.syntax.default_export && d.syntax.name == name
            }
        });
        if let Some(declaration) = declared {
            return Some(declaration.key.clone());
        }

        for clause in &entry.exports {
            match clause {
                ExportClause::Local { local, exported } if exported == name => {
                    return self.lookup_local(module, local, visited);
                }
                ExportClause::Default { local } if name == "default" => {
                    return self.lookup_local(module, local, visited);
                }
                ExportClause::ReExport {
                    specifier,
                    imported,
                    exported,
                } if exported == name => {
                    let target = self.resolve_specifier(module, specifier)?;
                    return self.resolve_export(&target, imported, visited);
                }
                _ => {}
            }
        }

        if name == "default" {
            return None;
        }
        entry.exports.iter().find_map(|clause| match clause {
            ExportClause::ReExportAll { specifier } => {
                let target = self.resolve_specifier(module, specifier)?;
                self.resolve_export(&target, name, visited)
            }
            _ => None,
        })
    }

    /// Resolves `ns.Name` (and deeper) where `ns` is a namespace import or re-export.
    fn resolve_qualified(&self, module: &ModulePath, head: &str, rest: &str, visited: &mut Visited) -> Option<DeclarationKey> {
        let entry = self.modules.get(module)?;
        let namespace_target = entry
            .imports
            .iter()
            .find(|i| i.local == head && i.imported == Imported::Namespace)
            .map(|i| i.specifier.as_str())
            .or_else(|| {
                entry.exports.iter().find_map(|clause| match clause {
                    ExportClause::ReExportNamespace { specifier, exported } if exported == head => {
                        Some(specifier.as_str())
                    }
                    _ => None,
                })
            })?;
        let target = self.resolve_specifier(module, namespace_target)?;
        match rest.split_once('.') {
            Some((next, remainder)) => self.resolve_qualified(&target, next, remainder, visited),
            None => self.resolve_export(&target, rest, visited),
        }
    }
}

impl ProjectIndex {
    /// First declaration called `name` in module order that passes `accept`.
    fn find_declaration(&self, name: &str, accept: impl Fn(&DeclarationBody) -> bool) -> Option<DeclarationKey> {
        let mut matches = self.modules.values().filter_map(|entry| {
            entry
                .declarations
                .get(name)
                .filter(|d| accept(&d.syntax.body))
                .map(|d| d.key.clone())
        });
        let first = matches.next()?;
        let others: Vec<String> = matches.map(|k| k.to_string()).collect();
        if !others.is_empty() {
            debug!("{} is declared more than once, using {} (also in {})", name, first, others.join(", "));
        }
        Some(first)
    }
}

impl TypeOracle for ProjectIndex {
    fn find_class(&self, name: &str) -> Option<DeclarationKey> {
        self.find_declaration(name, |body| matches!(body, DeclarationBody::Class { .. }))
    }

    fn find_type(&self, name: &str) -> Option<DeclarationKey> {
        self.find_declaration(name, |_| true)
    }

    fn declaration(&self, key: &DeclarationKey) -> Result<&Declaration, OracleError> {
        self.modules
            .get(&key.module)
            .and_then(|entry| entry.declarations.get(&key.symbol))
            .ok_or_else(|| OracleError::UnknownDeclaration(key.clone()))
    }

    fn resolve_name(&self, module: &ModulePath, name: &str) -> Option<DeclarationKey> {
        let mut visited = Visited::new();
        match name.split_once('.') {
            Some((head, rest)) => self.resolve_qualified(module, head, rest, &mut visited),
            None => self.lookup_local(module, name, &mut visited),
        }
    }

    fn resolve_import(&self, module: &ModulePath, specifier: &str, name: &str) -> Option<DeclarationKey> {
        let target = self.resolve_specifier(module, specifier)?;
        let mut visited = Visited::new();
        match name.split_once('.') {
            Some((head, rest)) => {
                // `import("./x").ns.Name` goes through a namespace re-export of ./x
                self.resolve_qualified(&target, head, rest, &mut visited)
            }
            None => self.resolve_export(&target, name, &mut visited),
        }
    }
}
