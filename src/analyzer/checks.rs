//! Per-file heuristic checks
//!
//! Every check takes the whole file content and returns zero or more
//! findings of one fixed kind. Checks are line/regex heuristics.

use super::metrics::{max_nesting, ControlCounts};
use crate::models::{Finding, FindingKind};
use regex::Regex;
use std::sync::OnceLock;

const MAX_FILE_LINES: usize = 500;
const MAX_METHOD_LINES: usize = 50;
const MAX_COMMENTED_CODE_LINES: usize = 3;
const MAX_COMPLEXITY: usize = 20;
const MAX_NESTING: usize = 4;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

fn method_signature() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^(?:.*\b(?:public|private|protected|static)\b.*\(.*\).*|(?:export\s+)?(?:default\s+)?(?:async\s+)?function\b.*\(.*\).*)$",
    )
}

fn empty_catch() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"catch\s*(?:\([^)]*\))?\s*\{\s*\}|(?m:^[ \t]*except\b[^:\n]*:\s*pass[ \t]*$)",
    )
}

fn print_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"System\.(?:out|err)\.print|\bconsole\.(?:log|error|warn|info|debug)\s*\(|(?m:^[ \t]*print\s*\()",
    )
}

fn hardcoded_secret() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r#"(?i)(?:password|secret|api[_-]?key|token)\s*[=:]\s*["'][^"'\n]+["']"#,
    )
}

fn sql_concat() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r#"(?i)\b(?:select|insert|update|delete)\b[^\n]*(?:["'`]\s*\+|\+\s*["'`]|\+[^\n]*\$)"#,
    )
}

fn query_exec_concat() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\b(?:executeQuery|executeUpdate|execute)\s*\([^\n]*\+")
}

fn process_exit() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\b(?:System\.exit|process\.exit|sys\.exit|os\._exit)\s*\(")
}

fn debt_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)\b(?:TODO|FIXME|XXX|HACK)\b")
}

fn commented_declaration() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"(?m)^[ \t]*//.*\b(?:public|private|class|function|def|const|let|var)\b",
    )
}

/// Run every check against one file's content
pub fn check_file(relative: &str, content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    check_file_length(relative, content, &mut findings);
    check_long_methods(relative, content, &mut findings);
    check_code_smells(relative, content, &mut findings);
    check_security(relative, content, &mut findings);
    check_best_practices(relative, content, &mut findings);
    check_complexity(relative, content, &mut findings);
    findings
}

fn check_file_length(file: &str, content: &str, out: &mut Vec<Finding>) {
    let lines = content.lines().count();
    if lines > MAX_FILE_LINES {
        out.push(Finding::new(file, FindingKind::LongFile).with_details(format!(
            "File has {} lines (max recommended: {})",
            lines, MAX_FILE_LINES
        )));
    }
}

/// Open method being tracked by the brace heuristic
struct MethodSpan {
    start: usize,
    depth: i64,
    opened: bool,
}

fn brace_delta(line: &str) -> (i64, i64) {
    let opens = line.matches('{').count() as i64;
    let closes = line.matches('}').count() as i64;
    (opens, closes)
}

fn check_long_methods(file: &str, content: &str, out: &mut Vec<Finding>) {
    let mut current: Option<MethodSpan> = None;

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        let (opens, closes) = brace_delta(line);

        if !line.ends_with(';') && method_signature().is_match(line) {
            let span = MethodSpan {
                start: i,
                depth: opens - closes,
                opened: opens > 0,
            };
            // One-line bodies close on the signature line
            current = if span.opened && span.depth <= 0 {
                None
            } else {
                Some(span)
            };
            continue;
        }

        let Some(span) = current.as_mut() else {
            continue;
        };
        span.depth += opens - closes;
        span.opened |= opens > 0;
        if span.opened && span.depth <= 0 {
            let length = i - span.start;
            if length > MAX_METHOD_LINES {
                out.push(Finding::new(file, FindingKind::LongMethod).with_details(format!(
                    "Method starting at line {} has {} lines",
                    span.start + 1,
                    length
                )));
            }
            current = None;
        }
    }
}

fn check_code_smells(file: &str, content: &str, out: &mut Vec<Finding>) {
    if empty_catch().is_match(content) {
        out.push(
            Finding::new(file, FindingKind::EmptyCatchBlock)
                .with_details("Empty catch blocks hide errors"),
        );
    }

    if print_call().is_match(content) {
        out.push(
            Finding::new(file, FindingKind::PrintStatement)
                .with_details("Use structured logging instead of printing to the console"),
        );
    }
}

fn check_security(file: &str, content: &str, out: &mut Vec<Finding>) {
    if hardcoded_secret().is_match(content) {
        out.push(
            Finding::new(file, FindingKind::HardcodedSecret)
                .with_details("Potential hardcoded credentials detected"),
        );
    }

    if sql_concat().is_match(content) || query_exec_concat().is_match(content) {
        out.push(
            Finding::new(file, FindingKind::SqlInjectionRisk).with_details(
                "Potential SQL injection vulnerability - use parameterized queries",
            ),
        );
    }
}

fn check_best_practices(file: &str, content: &str, out: &mut Vec<Finding>) {
    if process_exit().is_match(content) {
        out.push(
            Finding::new(file, FindingKind::SystemExitUsage)
                .with_details("Process termination should not be used in application code"),
        );
    }

    let markers = debt_marker().find_iter(content).count();
    if markers > 0 {
        out.push(
            Finding::new(file, FindingKind::TechnicalDebtMarker)
                .with_details(format!("Found {} TODO/FIXME comments", markers)),
        );
    }

    let commented = commented_declaration().find_iter(content).count();
    if commented > MAX_COMMENTED_CODE_LINES {
        out.push(
            Finding::new(file, FindingKind::CommentedCode).with_details(format!(
                "Large amount of commented code detected ({} lines)",
                commented
            )),
        );
    }
}

fn check_complexity(file: &str, content: &str, out: &mut Vec<Finding>) {
    let complexity = ControlCounts::scan(content).total();
    if complexity > MAX_COMPLEXITY {
        out.push(Finding::new(file, FindingKind::HighComplexity).with_details(format!(
            "High cyclomatic complexity: {} control flow statements",
            complexity
        )));
    }

    let nesting = max_nesting(content);
    if nesting > MAX_NESTING {
        out.push(Finding::new(file, FindingKind::DeepNesting).with_details(format!(
            "Code has nesting depth of {} levels",
            nesting
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(content: &str) -> Vec<FindingKind> {
        check_file("src/Sample.java", content)
            .into_iter()
            .map(|f| f.kind)
            .collect()
    }

    fn has(content: &str, kind: FindingKind) -> bool {
        kinds(content).contains(&kind)
    }

    #[test]
    fn test_clean_file_has_no_findings() {
        let code = "public class Clean {\n    public int add(int a, int b) {\n        return a + b;\n    }\n}\n";
        assert!(kinds(code).is_empty(), "{:?}", kinds(code));
    }

    #[test]
    fn test_long_file() {
        let code = "int x = 1;\n".repeat(501);
        assert!(has(&code, FindingKind::LongFile));
        let code = "int x = 1;\n".repeat(500);
        assert!(!has(&code, FindingKind::LongFile));
    }

    #[test]
    fn test_long_method_detected_once_braces_balance() {
        let mut code = String::from("public class A {\n    public void big() {\n");
        code.push_str(&"        x++;\n".repeat(55));
        code.push_str("    }\n}\n");
        let findings = check_file("A.java", &code);
        let long: Vec<_> = findings
            .iter()
            .filter(|f| f.kind == FindingKind::LongMethod)
            .collect();
        assert_eq!(long.len(), 1);
        assert_eq!(
            long[0].details.as_deref(),
            Some("Method starting at line 2 has 56 lines")
        );
    }

    #[test]
    fn test_short_method_not_flagged() {
        let mut code = String::from("public void small() {\n");
        code.push_str(&"    x++;\n".repeat(10));
        code.push_str("}\n");
        assert!(!has(&code, FindingKind::LongMethod));
    }

    #[test]
    fn test_abstract_declaration_does_not_start_method() {
        let mut code = String::from("public abstract void run();\n");
        code.push_str(&"int y = 0;\n".repeat(60));
        code.push_str("}\n");
        assert!(!has(&code, FindingKind::LongMethod));
    }

    #[test]
    fn test_js_function_long_method() {
        let mut code = String::from("export async function load(url) {\n");
        code.push_str(&"  step();\n".repeat(60));
        code.push_str("}\n");
        assert!(has(&code, FindingKind::LongMethod));
    }

    #[test]
    fn test_empty_catch() {
        assert!(has("try { a(); } catch (Exception e) { }", FindingKind::EmptyCatchBlock));
        assert!(has("try { a(); } catch (e) {\n}", FindingKind::EmptyCatchBlock));
        assert!(has("try { a() } catch {}", FindingKind::EmptyCatchBlock));
        assert!(has(
            "try:\n    a()\nexcept ValueError as e:\n    pass\n",
            FindingKind::EmptyCatchBlock
        ));
        assert!(!has(
            "try { a(); } catch (Exception e) { log(e); }",
            FindingKind::EmptyCatchBlock
        ));
    }

    #[test]
    fn test_print_statements() {
        assert!(has("System.out.println(\"hi\");", FindingKind::PrintStatement));
        assert!(has("console.log('hi');", FindingKind::PrintStatement));
        assert!(has("def f():\n    print('hi')\n", FindingKind::PrintStatement));
        assert!(!has("logger.info(\"hi\");", FindingKind::PrintStatement));
    }

    #[test]
    fn test_hardcoded_secret() {
        assert!(has("String password = \"hunter2\";", FindingKind::HardcodedSecret));
        assert!(has("API_KEY = 'sk-123'", FindingKind::HardcodedSecret));
        assert!(has("{ token: \"abc\" }", FindingKind::HardcodedSecret));
        assert!(!has("String password = System.getenv(\"PW\");", FindingKind::HardcodedSecret));
    }

    #[test]
    fn test_sql_injection() {
        assert!(has(
            "String q = \"SELECT * FROM users WHERE id = \" + id;",
            FindingKind::SqlInjectionRisk
        ));
        assert!(has("stmt.executeQuery(base + id);", FindingKind::SqlInjectionRisk));
        assert!(!has(
            "ps = conn.prepareStatement(\"SELECT * FROM users WHERE id = ?\");",
            FindingKind::SqlInjectionRisk
        ));
    }

    #[test]
    fn test_system_exit() {
        assert!(has("System.exit(1);", FindingKind::SystemExitUsage));
        assert!(has("process.exit(0)", FindingKind::SystemExitUsage));
        assert!(has("sys.exit(2)", FindingKind::SystemExitUsage));
        assert!(!has("onExit();", FindingKind::SystemExitUsage));
    }

    #[test]
    fn test_debt_markers_counted() {
        let findings = check_file("a.py", "# TODO: one\n# fixme two\n# HACK three\nx = 1\n");
        let marker = findings
            .iter()
            .find(|f| f.kind == FindingKind::TechnicalDebtMarker)
            .unwrap();
        assert_eq!(marker.details.as_deref(), Some("Found 3 TODO/FIXME comments"));
    }

    #[test]
    fn test_commented_code_threshold() {
        let three = "// public void a()\n// private int b;\n// class C\n";
        assert!(!has(three, FindingKind::CommentedCode));
        let four = format!("{three}// const d = 1;\n");
        assert!(has(&four, FindingKind::CommentedCode));
    }

    #[test]
    fn test_high_complexity() {
        let code = "if (a) {}\n".repeat(21);
        assert!(has(&code, FindingKind::HighComplexity));
        let code = "if (a) {}\n".repeat(20);
        assert!(!has(&code, FindingKind::HighComplexity));
    }

    #[test]
    fn test_deep_nesting() {
        assert!(has("{{{{{ }}}}}", FindingKind::DeepNesting));
        assert!(!has("{{{{ }}}}", FindingKind::DeepNesting));
    }
}
