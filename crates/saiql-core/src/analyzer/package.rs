//! Package and routine structure analyzer (L3).
//!
//! Packages are never translated. This analyzer extracts structure, scans
//! dependencies, scores complexity and produces the manual-migration
//! checklist. The dependency scan is regex-approximate and advisory only: it
//! misses dynamic SQL and schema-qualified references, and is never used for
//! topological ordering.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Weights for the 0-100 complexity score.
const MEMBER_WEIGHT: u32 = 5;
const MEMBER_CAP: u32 = 20;
const LINES_PER_POINT: u32 = 10;
const LINES_CAP: u32 = 30;
const CONTROL_FLOW_WEIGHT: u32 = 2;
const CONTROL_FLOW_CAP: u32 = 20;
const DML_WEIGHT: u32 = 3;
const DML_CAP: u32 = 15;
const CURSOR_WEIGHT: u32 = 5;
const CURSOR_CAP: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Procedure,
    Function,
}

/// A procedure or function declared within a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMember {
    pub kind: MemberKind,
    pub name: String,
    pub parameters: Vec<String>,
    /// Only functions carry a return type.
    pub return_type: Option<String>,
}

/// Analysis result for one package (or standalone routine body).
#[derive(Debug, Clone)]
pub struct PackageAnalysis {
    pub package_name: String,
    pub has_spec: bool,
    pub has_body: bool,
    pub procedures: Vec<PackageMember>,
    pub functions: Vec<PackageMember>,
    /// Tables/views referenced via FROM/JOIN/INSERT/UPDATE. Advisory only.
    pub dependencies: Vec<String>,
    pub complexity_score: u32,
    pub warnings: Vec<String>,
    pub manual_steps: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PackageAnalyzer {
    target_dialect: String,
}

impl PackageAnalyzer {
    pub fn new(target_dialect: impl Into<String>) -> Self {
        Self {
            target_dialect: target_dialect.into(),
        }
    }

    /// Analyze package structure without attempting translation.
    pub fn analyze(&self, definition: &str, package_name: &str) -> PackageAnalysis {
        let procedures = extract_members(definition, MemberKind::Procedure);
        let functions = extract_members(definition, MemberKind::Function);
        let dependencies = extract_dependencies(definition);
        let complexity_score = calculate_complexity(definition, &procedures, &functions);
        let warnings = generate_warnings(definition, &procedures, &functions);
        let manual_steps =
            self.generate_manual_steps(package_name, &procedures, &functions);

        PackageAnalysis {
            package_name: package_name.to_string(),
            has_spec: has_package_spec(definition),
            has_body: has_package_body(definition),
            procedures,
            functions,
            dependencies,
            complexity_score,
            warnings,
            manual_steps,
        }
    }

    fn generate_manual_steps(
        &self,
        package_name: &str,
        procedures: &[PackageMember],
        functions: &[PackageMember],
    ) -> Vec<String> {
        let mut steps = vec![
            format!("Review {package_name} package specification and body"),
            "Identify dependencies on other packages or schemas".to_string(),
        ];
        if !procedures.is_empty() {
            steps.push(format!(
                "Manually rewrite {} procedures in target dialect",
                procedures.len()
            ));
        }
        if !functions.is_empty() {
            steps.push(format!(
                "Manually rewrite {} functions in target dialect",
                functions.len()
            ));
        }
        steps.push(format!(
            "Consider refactoring package into separate modules for {}",
            self.target_dialect
        ));
        steps.push("Create comprehensive test suite for package behavior".to_string());
        steps.push("Validate business logic equivalence after rewrite".to_string());
        steps
    }
}

fn has_package_spec(definition: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)CREATE\s+(OR\s+REPLACE\s+)?PACKAGE\s+\w+").expect("invalid regex")
    })
    .is_match(definition)
}

fn has_package_body(definition: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)CREATE\s+(OR\s+REPLACE\s+)?PACKAGE\s+BODY\s+\w+").expect("invalid regex")
    })
    .is_match(definition)
}

fn extract_members(definition: &str, kind: MemberKind) -> Vec<PackageMember> {
    static PROC_WITH_PARAMS: OnceLock<Regex> = OnceLock::new();
    static PROC_NO_PARAMS: OnceLock<Regex> = OnceLock::new();
    static FUNC_WITH_PARAMS: OnceLock<Regex> = OnceLock::new();
    static FUNC_NO_PARAMS: OnceLock<Regex> = OnceLock::new();

    // Return types cover schema.type, VARCHAR2(10), table.column%TYPE.
    const RETURN_TYPE: &str = r"[\w.]+(?:\s*\(\s*\d+(?:\s*,\s*\d+)?\s*\))?(?:%TYPE|%ROWTYPE)?";

    let (with_params, no_params) = match kind {
        MemberKind::Procedure => (
            PROC_WITH_PARAMS.get_or_init(|| {
                Regex::new(r"(?is)PROCEDURE\s+(\w+)\s*\((.*?)\)").expect("invalid regex")
            }),
            PROC_NO_PARAMS.get_or_init(|| {
                Regex::new(r"(?i)PROCEDURE\s+(\w+)\s*(?:;|IS|AS)").expect("invalid regex")
            }),
        ),
        MemberKind::Function => (
            FUNC_WITH_PARAMS.get_or_init(|| {
                Regex::new(&format!(
                    r"(?is)FUNCTION\s+(\w+)\s*\((.*?)\)\s+RETURN\s+({RETURN_TYPE})"
                ))
                .expect("invalid regex")
            }),
            FUNC_NO_PARAMS.get_or_init(|| {
                Regex::new(&format!(r"(?i)FUNCTION\s+(\w+)\s+RETURN\s+({RETURN_TYPE})"))
                    .expect("invalid regex")
            }),
        ),
    };

    let mut members = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for caps in with_params.captures_iter(definition) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if !seen.insert(name.to_uppercase()) {
            continue;
        }
        let parameters = parse_parameters(caps.get(2).map(|m| m.as_str()).unwrap_or_default());
        let return_type = match kind {
            MemberKind::Function => caps.get(3).map(|m| m.as_str().trim().to_string()),
            MemberKind::Procedure => None,
        };
        members.push(PackageMember {
            kind,
            name: name.to_string(),
            parameters,
            return_type,
        });
    }

    for caps in no_params.captures_iter(definition) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if !seen.insert(name.to_uppercase()) {
            continue;
        }
        let return_type = match kind {
            MemberKind::Function => caps.get(2).map(|m| m.as_str().trim().to_string()),
            MemberKind::Procedure => None,
        };
        members.push(PackageMember {
            kind,
            name: name.to_string(),
            parameters: Vec::new(),
            return_type,
        });
    }

    members
}

fn parse_parameters(params_str: &str) -> Vec<String> {
    params_str
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Table/view references via FROM, JOIN, INSERT INTO and UPDATE.
fn extract_dependencies(definition: &str) -> Vec<String> {
    static FROM_RE: OnceLock<Regex> = OnceLock::new();
    static JOIN_RE: OnceLock<Regex> = OnceLock::new();
    static INSERT_RE: OnceLock<Regex> = OnceLock::new();
    static UPDATE_RE: OnceLock<Regex> = OnceLock::new();

    let patterns = [
        FROM_RE.get_or_init(|| Regex::new(r"(?i)FROM\s+(\w+)").expect("invalid regex")),
        JOIN_RE.get_or_init(|| Regex::new(r"(?i)JOIN\s+(\w+)").expect("invalid regex")),
        INSERT_RE
            .get_or_init(|| Regex::new(r"(?i)INSERT\s+INTO\s+(\w+)").expect("invalid regex")),
        UPDATE_RE.get_or_init(|| Regex::new(r"(?i)UPDATE\s+(\w+)").expect("invalid regex")),
    ];

    let mut dependencies: BTreeSet<String> = BTreeSet::new();
    for re in patterns {
        for caps in re.captures_iter(definition) {
            if let Some(m) = caps.get(1) {
                dependencies.insert(m.as_str().to_lowercase());
            }
        }
    }
    dependencies.into_iter().collect()
}

fn calculate_complexity(
    definition: &str,
    procedures: &[PackageMember],
    functions: &[PackageMember],
) -> u32 {
    static CONTROL_RE: OnceLock<Regex> = OnceLock::new();
    static DML_RE: OnceLock<Regex> = OnceLock::new();
    static CURSOR_RE: OnceLock<Regex> = OnceLock::new();

    let member_count = (procedures.len() + functions.len()) as u32;
    let mut score = (member_count * MEMBER_WEIGHT).min(MEMBER_CAP);

    let lines = definition.lines().filter(|l| !l.trim().is_empty()).count() as u32;
    score += (lines / LINES_PER_POINT).min(LINES_CAP);

    let control_re = CONTROL_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(IF|LOOP|CASE|FOR|WHILE)\b").expect("invalid regex")
    });
    let control_flow = control_re.find_iter(definition).count() as u32;
    score += (control_flow * CONTROL_FLOW_WEIGHT).min(CONTROL_FLOW_CAP);

    let dml_re = DML_RE
        .get_or_init(|| Regex::new(r"(?i)\b(INSERT|UPDATE|DELETE)\b").expect("invalid regex"));
    let dml_ops = dml_re.find_iter(definition).count() as u32;
    score += (dml_ops * DML_WEIGHT).min(DML_CAP);

    let cursor_re =
        CURSOR_RE.get_or_init(|| Regex::new(r"(?i)\bCURSOR\b").expect("invalid regex"));
    let cursors = cursor_re.find_iter(definition).count() as u32;
    score += (cursors * CURSOR_WEIGHT).min(CURSOR_CAP);

    score.min(100)
}

fn generate_warnings(
    definition: &str,
    procedures: &[PackageMember],
    functions: &[PackageMember],
) -> Vec<String> {
    let upper = definition.to_uppercase();
    let mut warnings = Vec::new();

    if procedures.len() + functions.len() > 10 {
        warnings.push(format!(
            "High member count: {} procedures, {} functions",
            procedures.len(),
            functions.len()
        ));
    }
    if upper.contains("CURSOR") {
        warnings.push("Package uses cursors (requires manual rewrite)".to_string());
    }
    if ["INSERT", "UPDATE", "DELETE"].iter().any(|kw| upper.contains(kw)) {
        warnings.push("Package contains DML operations (review for side effects)".to_string());
    }
    if upper.contains("PRAGMA AUTONOMOUS_TRANSACTION") {
        warnings.push("Package uses autonomous transactions (not portable)".to_string());
    }
    if upper.contains("ROWNUM") {
        warnings.push("Package uses ROWNUM (Oracle-specific)".to_string());
    }
    if upper.contains("CONNECT BY") {
        warnings.push("Package uses hierarchical queries (CONNECT BY)".to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PACKAGE: &str = r#"
CREATE OR REPLACE PACKAGE order_mgmt AS
    PROCEDURE place_order(p_customer_id NUMBER, p_amount NUMBER);
    FUNCTION order_total(p_order_id NUMBER) RETURN NUMBER;
END order_mgmt;

CREATE OR REPLACE PACKAGE BODY order_mgmt AS
    PROCEDURE place_order(p_customer_id NUMBER, p_amount NUMBER) IS
    BEGIN
        INSERT INTO orders (customer_id, amount) VALUES (p_customer_id, p_amount);
        UPDATE customers SET order_count = order_count + 1 WHERE id = p_customer_id;
    END place_order;

    FUNCTION order_total(p_order_id NUMBER) RETURN NUMBER IS
        v_total NUMBER;
    BEGIN
        SELECT SUM(amount) INTO v_total FROM order_items WHERE order_id = p_order_id;
        RETURN v_total;
    END order_total;
END order_mgmt;
"#;

    #[test]
    fn test_detects_spec_and_body() {
        let analysis = PackageAnalyzer::new("postgres").analyze(SAMPLE_PACKAGE, "order_mgmt");
        assert!(analysis.has_spec);
        assert!(analysis.has_body);
    }

    #[test]
    fn test_extracts_members() {
        let analysis = PackageAnalyzer::new("postgres").analyze(SAMPLE_PACKAGE, "order_mgmt");
        assert_eq!(analysis.procedures.len(), 1);
        assert_eq!(analysis.procedures[0].name, "place_order");
        assert_eq!(analysis.procedures[0].parameters.len(), 2);
        assert_eq!(analysis.functions.len(), 1);
        assert_eq!(analysis.functions[0].return_type.as_deref(), Some("NUMBER"));
    }

    #[test]
    fn test_dependencies_are_sorted_and_deduplicated() {
        let analysis = PackageAnalyzer::new("postgres").analyze(SAMPLE_PACKAGE, "order_mgmt");
        assert_eq!(
            analysis.dependencies,
            vec!["customers", "order_items", "orders"]
        );
    }

    #[test]
    fn test_complexity_in_range_and_monotone() {
        let analyzer = PackageAnalyzer::new("postgres");
        let small = analyzer.analyze("CREATE PACKAGE p AS END;", "p");
        let large = analyzer.analyze(SAMPLE_PACKAGE, "order_mgmt");
        assert!(small.complexity_score <= large.complexity_score);
        assert!(large.complexity_score <= 100);
    }

    #[test]
    fn test_cursor_warning() {
        let def = r#"
            CREATE PACKAGE BODY p AS
                PROCEDURE walk IS
                    CURSOR c IS SELECT id FROM t;
                BEGIN
                    NULL;
                END;
            END;
        "#;
        let analysis = PackageAnalyzer::new("postgres").analyze(def, "p");
        assert!(analysis
            .warnings
            .iter()
            .any(|w| w.contains("cursors")));
    }

    #[test]
    fn test_oracle_specific_warnings() {
        let def = "CREATE PACKAGE BODY p AS PROCEDURE q IS BEGIN \
                   SELECT 1 FROM t WHERE ROWNUM < 10 CONNECT BY PRIOR id = parent_id; END; END;";
        let analysis = PackageAnalyzer::new("postgres").analyze(def, "p");
        assert!(analysis.warnings.iter().any(|w| w.contains("ROWNUM")));
        assert!(analysis.warnings.iter().any(|w| w.contains("CONNECT BY")));
    }

    #[test]
    fn test_manual_steps_mention_counts() {
        let analysis = PackageAnalyzer::new("postgres").analyze(SAMPLE_PACKAGE, "order_mgmt");
        assert!(analysis
            .manual_steps
            .iter()
            .any(|s| s.contains("1 procedures")));
        assert!(analysis
            .manual_steps
            .iter()
            .any(|s| s.contains("1 functions")));
        assert!(analysis.manual_steps[0].contains("order_mgmt"));
    }

    #[test]
    fn test_function_without_parameters() {
        let def = "CREATE PACKAGE p AS FUNCTION version RETURN VARCHAR2; END;";
        let analysis = PackageAnalyzer::new("postgres").analyze(def, "p");
        assert_eq!(analysis.functions.len(), 1);
        assert_eq!(analysis.functions[0].name, "version");
        assert!(analysis.functions[0].parameters.is_empty());
    }
}
