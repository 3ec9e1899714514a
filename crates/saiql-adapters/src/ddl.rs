//! DDL normalization helpers shared by the adapters.
//!
//! Every DDL-returning call strips `DEFINER=`, ownership and storage-engine
//! clauses down to a portable baseline; owner restoration is an explicit,
//! off-by-default concern outside this layer.

use regex::Regex;
use std::sync::OnceLock;

/// Strip a `DEFINER=user@host` clause (backtick-, quote- or bare-form) so
/// emitted views, routines and triggers do not pin a source identity.
pub fn strip_definer(sql: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\s*DEFINER\s*=\s*[`']?[\w%]+[`']?\s*@\s*[`']?[\w%.]+[`']?\s*")
            .expect("invalid definer regex")
    });
    re.replace_all(sql, " ").trim().to_string()
}

/// Strip a `SQL SECURITY DEFINER|INVOKER` clause.
pub fn strip_sql_security(sql: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\s*SQL\s+SECURITY\s+(?:DEFINER|INVOKER)\s*")
            .expect("invalid sql-security regex")
    });
    re.replace_all(sql, " ").trim().to_string()
}

/// Strip MySQL storage-engine and charset table options from CREATE output.
pub fn strip_storage_clauses(sql: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\s*(ENGINE|DEFAULT CHARSET|CHARSET|COLLATE|AUTO_INCREMENT)\s*=\s*\w+")
            .expect("invalid storage-clause regex")
    });
    re.replace_all(sql, "").trim().to_string()
}

/// Reconstruct a full native type string from catalog columns, e.g.
/// `("varchar", Some(255), None, None)` → `varchar(255)` and
/// `("numeric", None, Some(10), Some(2))` → `numeric(10,2)`.
pub fn compose_type_string(
    data_type: &str,
    char_length: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> String {
    if let Some(len) = char_length {
        return format!("{data_type}({len})");
    }
    match (precision, scale) {
        (Some(p), Some(s)) if s > 0 => format!("{data_type}({p},{s})"),
        (Some(p), _) if uses_bare_precision(data_type) => format!("{data_type}({p})"),
        _ => data_type.to_string(),
    }
}

/// Types whose precision alone is meaningful in a rendered string. Integer
/// family types report a numeric precision in catalogs without it being
/// part of the declared type.
fn uses_bare_precision(data_type: &str) -> bool {
    matches!(
        data_type.to_lowercase().as_str(),
        "numeric" | "decimal" | "number" | "dec"
    )
}

/// Scan a view definition for FROM/JOIN references and split them into
/// table and view dependencies, for engines whose catalog does not track
/// view dependencies itself.
pub fn scan_view_dependencies(
    definition: &str,
    tables: &std::collections::BTreeSet<String>,
    views: &std::collections::BTreeSet<String>,
    own_name: &str,
) -> Vec<saiql_core::ViewDependency> {
    use saiql_core::{DependencyKind, ViewDependency};

    static REF_RE: OnceLock<Regex> = OnceLock::new();
    let re = REF_RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:FROM|JOIN)\s+["`]?(\w+)["`]?"#).expect("invalid ref regex")
    });

    let mut deps: std::collections::BTreeMap<String, DependencyKind> =
        std::collections::BTreeMap::new();
    for caps in re.captures_iter(definition) {
        let name = caps
            .get(1)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        if name == own_name {
            continue;
        }
        if views.contains(&name) {
            deps.insert(name, DependencyKind::View);
        } else if tables.contains(&name) {
            deps.insert(name, DependencyKind::Table);
        }
    }
    deps.into_iter()
        .map(|(name, kind)| ViewDependency { kind, name })
        .collect()
}
