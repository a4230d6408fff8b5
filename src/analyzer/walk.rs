//! Repository file enumeration

use super::AnalyzeError;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions the static checks run on
pub const ANALYZED_EXTENSIONS: &[&str] = &["java", "js", "ts", "py"];

/// Extensions eligible for per-file AI enrichment
pub const CODE_EXTENSIONS: &[&str] = &["java", "js", "ts", "py", "jsx", "tsx"];

/// Extensions counted in the `filesScanned` statistic
pub const SCANNED_EXTENSIONS: &[&str] = &["java", "js", "ts", "py", "go", "rs", "cpp", "c", "cs"];

/// A regular file found under the analyzed root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the root, `/`-separated
    pub relative: String,
    /// Lowercased extension, empty when there is none
    pub extension: String,
}

impl SourceFile {
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        extensions.contains(&self.extension.as_str())
    }
}

/// Result of walking a repository
#[derive(Debug, Default)]
pub struct Walk {
    pub root: PathBuf,
    /// Regular files sorted by relative path
    pub files: Vec<SourceFile>,
    /// Entries that could not be read; the walk continues past them
    pub diagnostics: Vec<String>,
}

impl Walk {
    pub fn with_extensions<'a>(
        &'a self,
        extensions: &'a [&'a str],
    ) -> impl Iterator<Item = &'a SourceFile> + 'a {
        self.files.iter().filter(move |f| f.has_extension(extensions))
    }
}

/// Walk every regular file below `root`.
///
/// Fails only when the root itself cannot be listed. `.git` directories are
/// never entered; hidden and ignored files are included unless
/// `respect_ignore_files` is set.
pub fn walk_files(root: &Path, respect_ignore_files: bool) -> Result<Walk, AnalyzeError> {
    let meta = fs::metadata(root).map_err(|source| AnalyzeError::Walk {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(AnalyzeError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| AnalyzeError::Walk {
        path: root.to_path_buf(),
        source,
    })?;

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(respect_ignore_files)
        .require_git(false)
        .follow_links(false)
        .filter_entry(|entry| entry.file_name() != ".git");

    let mut walk = Walk {
        root: root.to_path_buf(),
        ..Default::default()
    };

    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                walk.diagnostics.push(format!("walk: {}", e));
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.path().to_path_buf();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        walk.files.push(SourceFile {
            relative: relative_path(root, &path),
            path,
            extension,
        });
    }

    walk.files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(walk)
}

/// Render `path` relative to `root` with `/` separators
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_walk_collects_nested_files_sorted() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/b")).unwrap();
        fs::write(dir.path().join("src/b/Two.java"), "class Two {}").unwrap();
        fs::write(dir.path().join("src/One.JAVA"), "class One {}").unwrap();
        fs::write(dir.path().join("README.md"), "# readme").unwrap();

        let walk = walk_files(dir.path(), false).unwrap();
        let rels: Vec<_> = walk.files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(rels, vec!["README.md", "src/One.JAVA", "src/b/Two.java"]);

        let java: Vec<_> = walk.with_extensions(&["java"]).collect();
        assert_eq!(java.len(), 2);
    }

    #[test]
    fn test_walk_skips_git_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git/hooks")).unwrap();
        fs::write(dir.path().join(".git/hooks/pre-commit.py"), "print(1)").unwrap();
        fs::write(dir.path().join("app.py"), "print(1)").unwrap();

        let walk = walk_files(dir.path(), false).unwrap();
        assert_eq!(walk.files.len(), 1);
        assert_eq!(walk.files[0].relative, "app.py");
    }

    #[test]
    fn test_walk_missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            walk_files(&missing, false),
            Err(AnalyzeError::Walk { .. })
        ));
    }

    #[test]
    fn test_walk_file_root_is_fatal() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.py");
        fs::write(&file, "x = 1").unwrap();
        assert!(matches!(
            walk_files(&file, false),
            Err(AnalyzeError::NotADirectory(_))
        ));
    }
}
