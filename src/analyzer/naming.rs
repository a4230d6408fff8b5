//! Filename heuristics for pairing source files with their tests

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static TEST_SUFFIX: OnceLock<Regex> = OnceLock::new();

fn test_suffix() -> &'static Regex {
    TEST_SUFFIX.get_or_init(|| Regex::new(r"[._-]?(?:tests?|specs?)$").expect("valid regex"))
}

/// Whether a relative path names a test file.
///
/// Any path mentioning `test` or `spec` counts, which also covers
/// `src/test/java/...` layouts.
pub fn is_test_file(relative: &str) -> bool {
    let lower = relative.to_lowercase();
    lower.contains("test") || lower.contains("spec")
}

fn lower_stem(relative: &str) -> String {
    Path::new(relative)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Base name of a source file: lowercase stem.
pub fn source_base_name(relative: &str) -> String {
    lower_stem(relative)
}

/// Base name of a test file: lowercase stem without test/spec markers.
///
/// `FooTest.java`, `FooTests.java`, `foo.test.ts`, `foo_spec.js` and
/// `test_foo.py` all map to `foo`.
pub fn test_base_name(relative: &str) -> String {
    let stem = lower_stem(relative);
    let stem = stem.strip_prefix("test_").unwrap_or(&stem);
    test_suffix().replace(stem, "").into_owned()
}

/// Normalized base name used for source/test pairing
pub fn base_name(relative: &str) -> String {
    if is_test_file(relative) {
        test_base_name(relative)
    } else {
        source_base_name(relative)
    }
}

/// Names that are configuration or entry points and need no dedicated test
pub fn is_config_or_entry_point(base: &str) -> bool {
    base.contains("config")
        || base.contains("application")
        || base.contains("main")
        || base.contains("app")
        || base == "index"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_test_file() {
        assert!(is_test_file("src/FooTest.java"));
        assert!(is_test_file("src/test/java/Helper.java"));
        assert!(is_test_file("web/foo.spec.ts"));
        assert!(is_test_file("tests/test_foo.py"));
        assert!(!is_test_file("src/Foo.java"));
    }

    #[test]
    fn test_base_names() {
        assert_eq!(source_base_name("src/Foo.java"), "foo");
        assert_eq!(test_base_name("src/FooTest.java"), "foo");
        assert_eq!(test_base_name("src/FooTests.java"), "foo");
        assert_eq!(test_base_name("web/foo.test.ts"), "foo");
        assert_eq!(test_base_name("web/foo_spec.js"), "foo");
        assert_eq!(test_base_name("tests/test_foo.py"), "foo");
        assert_eq!(base_name("src/test/java/FooTest.java"), "foo");
        assert_eq!(base_name("src/Foo.java"), "foo");
    }

    #[test]
    fn test_config_or_entry_point() {
        for name in ["config", "main", "app", "index", "appconfig", "application"] {
            assert!(is_config_or_entry_point(name), "{name}");
        }
        assert!(!is_config_or_entry_point("foo"));
        assert!(!is_config_or_entry_point("indexer"));
    }
}
