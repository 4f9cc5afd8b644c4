use anyhow::Result;
use log::warn;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Extensions of the source files the scanner collects.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

/// File scanner for traversing project directories.
///
/// The `FileScanner` recursively walks a project directory to find all TypeScript source
/// files. It skips `node_modules`, hidden directories (those starting with `.`) and any
/// directory or file name listed in the exclude set.
///
/// # Example
///
/// ```no_run
/// use openapi_from_handlers::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./napcat"))
///     .with_excludes(vec!["dist".to_string()]);
/// let result = scanner.scan().unwrap();
/// println!("Found {} source files", result.source_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    excludes: Vec<String>,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Discovered source files, sorted by path
    pub source_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            excludes: Vec::new(),
        }
    }

    /// Adds directory or file names to skip wherever they appear in the tree.
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Scans the directory tree and collects all source files.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    /// The result is sorted so that module order does not depend on the file system.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut source_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path).into_iter().filter_entry(|e| {
            if e.path() == self.root_path {
                return true;
            }
            let file_name = e.file_name().to_string_lossy();
            let is_hidden = file_name.starts_with('.');
            let is_dependency = file_name == "node_modules";
            let is_excluded = self.excludes.iter().any(|x| x.as_str() == file_name);
            !is_hidden && !is_dependency && !is_excluded
        }) {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let is_source = path
                        .extension()
                        .and_then(|s| s.to_str())
                        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
                    if entry.file_type().is_file() && is_source {
                        source_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        source_files.sort();
        Ok(ScanResult {
            source_files,
            warnings,
        })
    }
}
