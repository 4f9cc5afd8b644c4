use anyhow::Result;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::ir::ModulePath;
use crate::syntax::{self, ModuleSyntax};

/// Declaration parser for TypeScript source files.
///
/// The `SourceParser` reads a file, derives its [`ModulePath`] from the path relative to the
/// project root, and parses it into a [`ModuleSyntax`] that the project index can consume.
///
/// # Example
///
/// ```no_run
/// use openapi_from_handlers::parser::SourceParser;
/// use std::path::Path;
///
/// let root = Path::new("./napcat");
/// let parsed = SourceParser::parse_file(root, &root.join("src/action/GetInfo.ts")).unwrap();
/// println!("{} declares {} types", parsed.module, parsed.syntax.declarations.len());
/// ```
pub struct SourceParser;

/// A successfully parsed source file.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Module path the file is known by inside the project
    pub module: ModulePath,
    /// Imports, exports and declarations of the file
    pub syntax: ModuleSyntax,
}

impl SourceParser {
    /// Parses a single source file.
    ///
    /// The parser dialect follows the file name, so `.tsx` and `.d.ts` files parse as such.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains a syntax error
    pub fn parse_file(root: &Path, path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| Error::Parse {
            file: path.to_path_buf(),
            message: format!("failed to read file: {}", e),
        })?;

        let module = ModulePath::from_file(root, path);
        let syntax = syntax::parse_module_at(path, &content).map_err(|e| Error::Parse {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let parsed = Self::lowered(path.to_path_buf(), module, syntax);

        debug!(
            "Parsed {} ({} declarations, {} imports)",
            path.display(),
            parsed.syntax.declarations.len(),
            parsed.syntax.imports.len()
        );
        Ok(parsed)
    }

    /// Parses in-memory TypeScript source under the given module path.
    pub fn parse_source(module: ModulePath, source: &str) -> Result<ParsedFile> {
        let syntax = syntax::parse_module(source)?;
        Ok(Self::lowered(PathBuf::from(module.as_str()), module, syntax))
    }

    fn lowered(path: PathBuf, module: ModulePath, syntax: ModuleSyntax) -> ParsedFile {
        for diagnostic in &syntax.diagnostics {
            warn!("Ignoring supertype in {}: {}", module, diagnostic);
        }
        ParsedFile { path, module, syntax }
    }

    /// Parses multiple files, continuing even if some fail.
    ///
    /// Returns one result per input path, in input order.
    pub fn parse_files(root: &Path, paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<ParsedFile>> = paths
            .iter()
            .map(|path| {
                Self::parse_file(root, path).inspect_err(|e| {
                    warn!("Failed to parse {}: {}", path.display(), e);
                })
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    #[test]
    fn test_parse_valid_file() {
        let temp_dir = TempDir::new().unwrap();
        let code = r#"
            import { Base } from './base';
            export interface Res { ok: boolean }
            export class Ping extends Base<void, Res> {}
        "#;

        let file_path = create_temp_file(&temp_dir, "src/action/Ping.ts", code);
        let parsed = SourceParser::parse_file(temp_dir.path(), &file_path).unwrap();

        assert_eq!(parsed.path, file_path);
        assert_eq!(parsed.module.as_str(), "src/action/Ping");
        assert_eq!(parsed.syntax.declarations.len(), 2);
        assert_eq!(parsed.syntax.imports.len(), 1);
    }

    #[test]
    fn test_parse_unterminated_string_fails() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "bad.ts", "const a = 'oops\n");

        let err = SourceParser::parse_file(temp_dir.path(), &file_path).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("unterminated"), "{}", err);
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.ts");
        let err = SourceParser::parse_file(temp_dir.path(), &missing).unwrap_err();
        assert!(err.to_string().contains("failed to read file"));
    }

    #[test]
    fn test_parse_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "empty.ts", "");
        let parsed = SourceParser::parse_file(temp_dir.path(), &file_path).unwrap();
        assert!(parsed.syntax.declarations.is_empty());
    }

    #[test]
    fn test_parse_files_batch_keeps_going() {
        let temp_dir = TempDir::new().unwrap();
        let file1 = create_temp_file(&temp_dir, "a.ts", "export type A = string;");
        let file2 = create_temp_file(&temp_dir, "b.ts", "/* never closed");
        let file3 = create_temp_file(&temp_dir, "c.ts", "export interface C { c: number }");

        let results = SourceParser::parse_files(temp_dir.path(), &[file1, file2, file3]);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert_eq!(results[2].as_ref().unwrap().module.as_str(), "c");
    }

    #[test]
    fn test_parse_tsx_and_declaration_files() {
        let temp_dir = TempDir::new().unwrap();
        let view = create_temp_file(
            &temp_dir,
            "src/View.tsx",
            "export interface Props { title: string }\nexport const View = (p: Props) => <h1>{p.title}</h1>;",
        );
        let types = create_temp_file(&temp_dir, "src/types.d.ts", "export declare class Info { id: string }");

        let parsed = SourceParser::parse_file(temp_dir.path(), &view).unwrap();
        assert_eq!(parsed.syntax.declarations[0].name, "Props");
        let parsed = SourceParser::parse_file(temp_dir.path(), &types).unwrap();
        assert_eq!(parsed.syntax.declarations[0].name, "Info");
    }

    #[test]
    fn test_parse_source_in_memory() {
        let parsed = SourceParser::parse_source(ModulePath::new("src/types"), "export type Id = string").unwrap();
        assert_eq!(parsed.module.as_str(), "src/types");
        assert_eq!(parsed.syntax.declarations[0].name, "Id");
    }
}
