//! SQLite function-call extraction and classification (L3).
//!
//! SQLite has no stored routines; its L3 story is knowing which functions a
//! view or trigger calls and whether those exist on the target: core
//! builtins, loadable extensions (JSON1, FTS), or nothing at all.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Core builtin functions, including math (3.35+) and window functions.
const SQLITE_BUILTIN_FUNCTIONS: &[&str] = &[
    "abs", "changes", "char", "coalesce", "glob", "hex", "ifnull", "instr", "last_insert_rowid",
    "length", "like", "likelihood", "likely", "load_extension", "lower", "ltrim", "max", "min",
    "nullif", "printf", "quote", "random", "randomblob", "replace", "round", "rtrim", "soundex",
    "sqlite_compileoption_get", "sqlite_compileoption_used", "sqlite_offset", "sqlite_source_id",
    "sqlite_version", "substr", "substring", "total_changes", "trim", "typeof", "unicode",
    "unlikely", "upper", "zeroblob",
    // Aggregates
    "avg", "count", "group_concat", "sum", "total",
    // Date/time
    "date", "time", "datetime", "julianday", "strftime", "unixepoch", "timediff",
    // Math (3.35+)
    "acos", "acosh", "asin", "asinh", "atan", "atan2", "atanh", "ceil", "ceiling", "cos", "cosh",
    "degrees", "exp", "floor", "ln", "log", "log10", "log2", "mod", "pi", "pow", "power",
    "radians", "sign", "sin", "sinh", "sqrt", "tan", "tanh", "trunc",
    // Window
    "row_number", "rank", "dense_rank", "ntile", "lag", "lead", "first_value", "last_value",
    "nth_value", "cume_dist", "percent_rank",
];

const SQLITE_JSON_FUNCTIONS: &[&str] = &[
    "json", "json_array", "json_array_length", "json_extract", "json_insert", "json_object",
    "json_patch", "json_remove", "json_replace", "json_set", "json_type", "json_valid",
    "json_quote", "json_group_array", "json_group_object", "json_each", "json_tree",
];

const SQLITE_FTS_FUNCTIONS: &[&str] =
    &["match", "highlight", "snippet", "offsets", "matchinfo", "bm25"];

/// Keywords that look like function calls in `kw (` position but are not.
const SQL_KEYWORDS: &[&str] = &[
    "select", "from", "where", "join", "left", "right", "inner", "outer", "on", "and", "or",
    "not", "in", "exists", "case", "when", "then", "else", "end", "as", "create", "view",
    "table", "insert", "update", "delete", "values", "set", "group", "order", "by", "having",
    "union", "except", "intersect", "limit", "offset", "distinct", "all", "trigger", "begin",
    "after", "before", "instead", "of", "for", "each", "row", "new", "old", "raise", "abort",
    "rollback", "fail", "ignore", "references", "primary", "key", "foreign",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionClass {
    Builtin,
    JsonExtension,
    FtsExtension,
    Unknown,
}

impl FunctionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::JsonExtension => "json_extension",
            Self::FtsExtension => "fts_extension",
            Self::Unknown => "unknown",
        }
    }
}

/// Function dependencies of one SQL definition, classified.
#[derive(Debug, Clone, Default)]
pub struct FunctionDependencyAnalysis {
    pub builtin: Vec<String>,
    pub json_extension: Vec<String>,
    pub fts_extension: Vec<String>,
    pub unknown: Vec<String>,
    pub total: usize,
    /// True iff no unknown functions are referenced.
    pub is_safe: bool,
    /// True iff JSON1 or FTS extensions must be present on the target.
    pub needs_extension: bool,
}

/// Extract function names called in a SQL definition, sorted and deduplicated.
pub fn extract_function_calls(sql: &str) -> Vec<String> {
    static CALL_RE: OnceLock<Regex> = OnceLock::new();
    let re = CALL_RE
        .get_or_init(|| Regex::new(r"\b([a-zA-Z_][a-zA-Z0-9_]*)\s*\(").expect("invalid regex"));

    if sql.is_empty() {
        return Vec::new();
    }

    let mut names: BTreeSet<String> = BTreeSet::new();
    for caps in re.captures_iter(sql) {
        if let Some(m) = caps.get(1) {
            let name = m.as_str().to_lowercase();
            if !SQL_KEYWORDS.contains(&name.as_str()) {
                names.insert(name);
            }
        }
    }
    names.into_iter().collect()
}

pub fn classify_function(name: &str) -> FunctionClass {
    let lower = name.to_lowercase();
    if SQLITE_BUILTIN_FUNCTIONS.contains(&lower.as_str()) {
        FunctionClass::Builtin
    } else if SQLITE_JSON_FUNCTIONS.contains(&lower.as_str()) {
        FunctionClass::JsonExtension
    } else if SQLITE_FTS_FUNCTIONS.contains(&lower.as_str()) {
        FunctionClass::FtsExtension
    } else {
        FunctionClass::Unknown
    }
}

/// Classify every function a definition calls.
pub fn analyze_dependencies(sql: &str) -> FunctionDependencyAnalysis {
    let functions = extract_function_calls(sql);
    let mut analysis = FunctionDependencyAnalysis {
        total: functions.len(),
        ..Default::default()
    };

    for func in functions {
        match classify_function(&func) {
            FunctionClass::Builtin => analysis.builtin.push(func),
            FunctionClass::JsonExtension => analysis.json_extension.push(func),
            FunctionClass::FtsExtension => analysis.fts_extension.push(func),
            FunctionClass::Unknown => analysis.unknown.push(func),
        }
    }

    analysis.is_safe = analysis.unknown.is_empty();
    analysis.needs_extension =
        !analysis.json_extension.is_empty() || !analysis.fts_extension.is_empty();
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_and_builtin() {
        let calls =
            extract_function_calls("SELECT JSON_OBJECT('key', value), UPPER(name) FROM t");
        assert_eq!(calls, vec!["json_object", "upper"]);
    }

    #[test]
    fn test_extract_skips_keywords() {
        let calls = extract_function_calls(
            "SELECT CASE WHEN (a = 1) THEN lower(b) ELSE c END FROM t WHERE (d = 2)",
        );
        assert_eq!(calls, vec!["lower"]);
    }

    #[test]
    fn test_extract_empty_input() {
        assert!(extract_function_calls("").is_empty());
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify_function("upper"), FunctionClass::Builtin);
        assert_eq!(classify_function("json_object"), FunctionClass::JsonExtension);
        assert_eq!(classify_function("bm25"), FunctionClass::FtsExtension);
        assert_eq!(classify_function("my_custom_udf"), FunctionClass::Unknown);
    }

    #[test]
    fn test_analysis_safe_with_extension() {
        let analysis =
            analyze_dependencies("SELECT JSON_OBJECT('key', value), UPPER(name) FROM t");
        assert_eq!(analysis.json_extension, vec!["json_object"]);
        assert_eq!(analysis.builtin, vec!["upper"]);
        assert!(analysis.is_safe);
        assert!(analysis.needs_extension);
        assert_eq!(analysis.total, 2);
    }

    #[test]
    fn test_analysis_unknown_udf_is_unsafe() {
        let analysis = analyze_dependencies("SELECT my_custom_udf(v) FROM t");
        assert!(!analysis.is_safe);
        assert_eq!(analysis.unknown, vec!["my_custom_udf"]);
        assert!(!analysis.needs_extension);
    }

    #[test]
    fn test_builtin_only_needs_no_extension() {
        let analysis = analyze_dependencies("SELECT TRIM(a), ROUND(b, 2) FROM t");
        assert!(analysis.is_safe);
        assert!(!analysis.needs_extension);
        assert_eq!(analysis.builtin.len(), 2);
    }
}
