//! View pattern classifier (L2).
//!
//! Whitelist approach: a view is admitted only when it matches one of three
//! proven-safe shapes. Everything else is `Unsupported` with a precise reason.
//!
//! Classification prefers the sqlparser AST (which catches computed columns
//! like `a+b` with no whitespace for free); when the dialect text does not
//! parse, a conservative regex fallback takes over so classification never
//! fails outright.

use crate::types::{Dialect, ReasonCode, RiskLevel};
use regex::Regex;
use sqlparser::ast::{
    BinaryOperator, Expr, GroupByExpr, JoinConstraint, JoinOperator, Query, Select, SelectItem,
    SetExpr, Statement, TableFactor,
};
use sqlparser::parser::Parser;
use std::sync::OnceLock;

/// The recognized safe view shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPattern {
    /// Single table, plain column projection only.
    SimpleSelect,
    /// As above plus a WHERE clause without nested SELECTs.
    SelectWhere,
    /// Exactly two tables via INNER JOIN with an equality-only ON clause.
    BasicJoin,
    Unsupported,
}

/// Outcome of classifying one view definition.
#[derive(Debug, Clone)]
pub struct ViewAnalysis {
    pub pattern: ViewPattern,
    pub risk_level: RiskLevel,
    /// Non-empty iff `pattern == Unsupported`.
    pub reason_codes: Vec<ReasonCode>,
    /// Human-readable denial reason for reports.
    pub reason: Option<String>,
}

impl ViewAnalysis {
    pub fn is_supported(&self) -> bool {
        self.pattern != ViewPattern::Unsupported
    }

    fn supported(pattern: ViewPattern, risk_level: RiskLevel) -> Self {
        Self {
            pattern,
            risk_level,
            reason_codes: Vec::new(),
            reason: None,
        }
    }

    fn unsupported(reason_codes: Vec<ReasonCode>) -> Self {
        debug_assert!(!reason_codes.is_empty());
        // Window functions, set operations and CTEs restructure the result
        // set entirely; everything else is a rewrite of one query block.
        let critical = reason_codes.iter().any(|c| {
            matches!(
                c,
                ReasonCode::WindowFunction
                    | ReasonCode::SetOperation
                    | ReasonCode::CommonTableExpression
            )
        });
        let reason = Some(format!(
            "Contains {} (not in supported subset)",
            reason_codes[0].as_str()
        ));
        Self {
            pattern: ViewPattern::Unsupported,
            risk_level: if critical {
                RiskLevel::Critical
            } else {
                RiskLevel::High
            },
            reason_codes,
            reason,
        }
    }
}

/// Functions whose presence in a projection marks an aggregate query.
const AGGREGATE_FUNCTIONS: &[&str] = &["count", "sum", "avg", "max", "min"];

/// Function names that always mean a computed column, checked by the regex
/// fallback path (the AST path rejects any non-identifier expression).
const COMPUTED_FUNCTIONS: &[&str] = &[
    "cast", "concat", "coalesce", "nvl", "ifnull", "substr", "substring", "trim", "ltrim",
    "rtrim", "upper", "lower", "initcap", "extract", "date_part", "to_char", "to_date", "round",
    "trunc", "floor", "ceil", "length", "char_length", "replace", "translate", "case",
];

#[derive(Debug, Clone)]
pub struct ViewAnalyzer {
    dialect: Dialect,
}

impl ViewAnalyzer {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn is_supported_pattern(&self, definition: &str) -> bool {
        self.analyze(definition).is_supported()
    }

    /// Classify a view definition against the whitelist.
    pub fn analyze(&self, definition: &str) -> ViewAnalysis {
        let query_text = extract_query_text(definition);

        if let Some(codes) = keyword_rejections(query_text) {
            return ViewAnalysis::unsupported(codes);
        }

        let dialect = self.dialect.to_sqlparser_dialect();
        match Parser::parse_sql(dialect.as_ref(), query_text) {
            Ok(statements) => classify_statements(&statements),
            // Dialect-specific text the parser cannot handle: fall back to
            // the conservative textual classification.
            Err(_) => classify_textual(query_text),
        }
    }
}

/// Strip a `CREATE [OR REPLACE] [FORCE] [EDITIONABLE] VIEW ... AS` prefix,
/// leaving the query text. Bare queries pass through unchanged.
fn extract_query_text(definition: &str) -> &str {
    static CREATE_RE: OnceLock<Regex> = OnceLock::new();
    let re = CREATE_RE.get_or_init(|| {
        Regex::new(
            r#"(?is)^\s*create\s+(?:or\s+replace\s+)?(?:force\s+)?(?:editionable\s+)?view\s+[\w".$]+\s*(?:\([^)]*\)\s*)?\bas\b\s*(.*)$"#,
        )
        .expect("invalid create-view regex")
    });
    match re.captures(definition) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(definition),
        None => definition,
    }
}

/// Textual pre-scan for constructs that are unsupported regardless of shape.
fn keyword_rejections(query_text: &str) -> Option<Vec<ReasonCode>> {
    static OVER_RE: OnceLock<Regex> = OnceLock::new();
    static CTE_RE: OnceLock<Regex> = OnceLock::new();

    let lower = query_text.to_lowercase();
    let mut codes = Vec::new();

    if contains_word(&lower, "union") || contains_word(&lower, "intersect") || contains_word(&lower, "except") {
        codes.push(ReasonCode::SetOperation);
    }
    let over_re = OVER_RE.get_or_init(|| Regex::new(r"\bover\s*\(").expect("invalid over regex"));
    if over_re.is_match(&lower) || lower.contains("partition by") {
        codes.push(ReasonCode::WindowFunction);
    }
    let cte_re = CTE_RE.get_or_init(|| Regex::new(r"^\s*with\b").expect("invalid cte regex"));
    if cte_re.is_match(&lower) {
        codes.push(ReasonCode::CommonTableExpression);
    }
    if lower.contains("materialized") {
        codes.push(ReasonCode::MaterializedView);
    }
    if query_text.contains("(+)") {
        codes.push(ReasonCode::OracleOuterJoinSyntax);
    }
    if lower.contains("left join")
        || lower.contains("right join")
        || lower.contains("full join")
        || lower.contains("left outer join")
        || lower.contains("right outer join")
        || lower.contains("full outer join")
    {
        codes.push(ReasonCode::OuterJoin);
    }
    if lower.contains("cross join") {
        codes.push(ReasonCode::CrossJoin);
    }
    if contains_word(&lower, "distinct") {
        codes.push(ReasonCode::DistinctClause);
    }
    if lower.contains("group by") {
        codes.push(ReasonCode::GroupByClause);
    }
    if contains_word(&lower, "having") {
        codes.push(ReasonCode::HavingClause);
    }
    if lower.contains("order by") {
        codes.push(ReasonCode::OrderByClause);
    }

    if codes.is_empty() {
        None
    } else {
        Some(codes)
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .match_indices(word)
        .any(|(idx, _)| {
            let before_ok = idx == 0
                || !haystack[..idx]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_');
            let after = idx + word.len();
            let after_ok = after >= haystack.len()
                || !haystack[after..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_');
            before_ok && after_ok
        })
}

fn classify_statements(statements: &[Statement]) -> ViewAnalysis {
    if statements.len() != 1 {
        return ViewAnalysis::unsupported(vec![ReasonCode::MultipleStatements]);
    }
    let query = match &statements[0] {
        Statement::Query(query) => query,
        Statement::CreateView { query, .. } => query,
        _ => return ViewAnalysis::unsupported(vec![ReasonCode::UnparseableDefinition]),
    };
    classify_query(query)
}

fn classify_query(query: &Query) -> ViewAnalysis {
    if query.with.is_some() {
        return ViewAnalysis::unsupported(vec![ReasonCode::CommonTableExpression]);
    }
    if query.order_by.is_some() {
        return ViewAnalysis::unsupported(vec![ReasonCode::OrderByClause]);
    }

    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select,
        SetExpr::SetOperation { .. } => {
            return ViewAnalysis::unsupported(vec![ReasonCode::SetOperation])
        }
        _ => return ViewAnalysis::unsupported(vec![ReasonCode::Subquery]),
    };

    classify_select(select)
}

fn classify_select(select: &Select) -> ViewAnalysis {
    if select.distinct.is_some() {
        return ViewAnalysis::unsupported(vec![ReasonCode::DistinctClause]);
    }
    match &select.group_by {
        GroupByExpr::Expressions(exprs, _) if !exprs.is_empty() => {
            return ViewAnalysis::unsupported(vec![ReasonCode::GroupByClause])
        }
        GroupByExpr::All(_) => return ViewAnalysis::unsupported(vec![ReasonCode::GroupByClause]),
        _ => {}
    }
    if select.having.is_some() {
        return ViewAnalysis::unsupported(vec![ReasonCode::HavingClause]);
    }

    for item in &select.projection {
        if let Some(code) = projection_rejection(item) {
            return ViewAnalysis::unsupported(vec![code]);
        }
    }

    if select.from.len() != 1 {
        // Comma-separated FROM lists are implicit cross joins.
        return ViewAnalysis::unsupported(vec![ReasonCode::CrossJoin]);
    }
    let table = &select.from[0];
    if !matches!(table.relation, TableFactor::Table { .. }) {
        return ViewAnalysis::unsupported(vec![ReasonCode::Subquery]);
    }

    if let Some(selection) = &select.selection {
        if let Some(code) = where_rejection(selection) {
            return ViewAnalysis::unsupported(vec![code]);
        }
    }

    match table.joins.len() {
        0 => {
            if select.selection.is_some() {
                ViewAnalysis::supported(ViewPattern::SelectWhere, RiskLevel::Low)
            } else {
                ViewAnalysis::supported(ViewPattern::SimpleSelect, RiskLevel::Safe)
            }
        }
        1 => {
            let join = &table.joins[0];
            if !matches!(join.relation, TableFactor::Table { .. }) {
                return ViewAnalysis::unsupported(vec![ReasonCode::Subquery]);
            }
            match &join.join_operator {
                JoinOperator::Join(constraint) | JoinOperator::Inner(constraint) => {
                    match constraint {
                        JoinConstraint::On(expr) if equality_only(expr) => {
                            ViewAnalysis::supported(ViewPattern::BasicJoin, RiskLevel::Medium)
                        }
                        _ => ViewAnalysis::unsupported(vec![ReasonCode::NonEqualityJoin]),
                    }
                }
                JoinOperator::CrossJoin(..) => {
                    ViewAnalysis::unsupported(vec![ReasonCode::CrossJoin])
                }
                _ => ViewAnalysis::unsupported(vec![ReasonCode::OuterJoin]),
            }
        }
        // Three or more tables.
        _ => ViewAnalysis::unsupported(vec![ReasonCode::NonEqualityJoin]),
    }
}

/// Anything that is not a plain column reference or wildcard is computed.
fn projection_rejection(item: &SelectItem) -> Option<ReasonCode> {
    match item {
        SelectItem::Wildcard(..) | SelectItem::QualifiedWildcard(..) => None,
        SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
            projection_expr_rejection(expr)
        }
    }
}

fn projection_expr_rejection(expr: &Expr) -> Option<ReasonCode> {
    match expr {
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) => None,
        Expr::Function(func) => {
            let name = func.name.to_string().to_lowercase();
            if AGGREGATE_FUNCTIONS.contains(&name.as_str()) {
                Some(ReasonCode::Aggregate)
            } else {
                Some(ReasonCode::ComputedExpression)
            }
        }
        Expr::Subquery(_) => Some(ReasonCode::Subquery),
        _ => Some(ReasonCode::ComputedExpression),
    }
}

/// Reject subqueries anywhere inside the WHERE clause.
fn where_rejection(expr: &Expr) -> Option<ReasonCode> {
    match expr {
        Expr::Subquery(_) | Expr::InSubquery { .. } | Expr::Exists { .. } => {
            Some(ReasonCode::Subquery)
        }
        Expr::BinaryOp { left, right, .. } => {
            where_rejection(left).or_else(|| where_rejection(right))
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) => where_rejection(expr),
        Expr::Between {
            expr, low, high, ..
        } => where_rejection(expr)
            .or_else(|| where_rejection(low))
            .or_else(|| where_rejection(high)),
        Expr::InList { expr, list, .. } => {
            where_rejection(expr).or_else(|| list.iter().find_map(where_rejection))
        }
        _ => None,
    }
}

/// An ON clause is admissible when it is a conjunction of column equalities.
fn equality_only(expr: &Expr) -> bool {
    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => equality_only(left) && equality_only(right),
            BinaryOperator::Eq => is_column_ref(left) && is_column_ref(right),
            _ => false,
        },
        Expr::Nested(inner) => equality_only(inner),
        _ => false,
    }
}

fn is_column_ref(expr: &Expr) -> bool {
    matches!(expr, Expr::Identifier(_) | Expr::CompoundIdentifier(_))
}

/// Regex classification for definitions sqlparser cannot handle.
///
/// Mirrors the AST path conservatively: on any doubt, unsupported.
fn classify_textual(query_text: &str) -> ViewAnalysis {
    let lower = query_text.to_lowercase();

    if lower.matches("select").count() > 1 {
        return ViewAnalysis::unsupported(vec![ReasonCode::Subquery]);
    }
    if !lower.contains("select") || !lower.contains("from") {
        return ViewAnalysis::unsupported(vec![ReasonCode::UnparseableDefinition]);
    }

    if contains_word(&lower, "join") {
        if lower.contains("inner join")
            && lower.matches("from").count() == 1
            && lower.matches("join").count() == 1
        {
            if textual_on_clause_is_equality_only(&lower) {
                return ViewAnalysis::supported(ViewPattern::BasicJoin, RiskLevel::Medium);
            }
            return ViewAnalysis::unsupported(vec![ReasonCode::NonEqualityJoin]);
        }
        return ViewAnalysis::unsupported(vec![ReasonCode::NonEqualityJoin]);
    }

    if textual_has_computed_columns(&lower) {
        return ViewAnalysis::unsupported(vec![ReasonCode::ComputedExpression]);
    }

    if contains_word(&lower, "where") {
        let after_where = lower.split("where").nth(1).unwrap_or("");
        if after_where.contains("select") {
            return ViewAnalysis::unsupported(vec![ReasonCode::Subquery]);
        }
        return ViewAnalysis::supported(ViewPattern::SelectWhere, RiskLevel::Low);
    }

    ViewAnalysis::supported(ViewPattern::SimpleSelect, RiskLevel::Safe)
}

/// Computed-column scan over the projection text between SELECT and FROM.
/// Recognises arithmetic with no surrounding whitespace (`a+b`), string
/// concatenation, CASE and the usual scalar functions.
fn textual_has_computed_columns(lower: &str) -> bool {
    static WILDCARD_RE: OnceLock<Regex> = OnceLock::new();
    static CASE_RE: OnceLock<Regex> = OnceLock::new();

    let Some(select_pos) = lower.find("select") else {
        return false;
    };
    let Some(from_pos) = lower.find("from") else {
        return false;
    };
    if from_pos <= select_pos + 6 {
        return false;
    }
    let projection = &lower[select_pos + 6..from_pos];

    // Wildcard projections (`*`, `t.*`) are valid, not multiplication.
    let wildcard_re = WILDCARD_RE
        .get_or_init(|| Regex::new(r"(?:^|,\s*)(?:\w+\.)*\*(?:\s*,|\s*$)").expect("invalid regex"));
    let without_wildcards = wildcard_re.replace_all(projection.trim(), " ");

    if without_wildcards.contains(['+', '-', '*', '/']) {
        return true;
    }
    if projection.contains("||") {
        return true;
    }
    let case_re =
        CASE_RE.get_or_init(|| Regex::new(r"\bcase\s+when\b").expect("invalid regex"));
    if case_re.is_match(projection) {
        return true;
    }
    COMPUTED_FUNCTIONS.iter().any(|func| {
        Regex::new(&format!(r"\b{func}\s*\("))
            .map(|re| re.is_match(projection))
            .unwrap_or(false)
    }) || AGGREGATE_FUNCTIONS.iter().any(|func| {
        Regex::new(&format!(r"\b{func}\s*\("))
            .map(|re| re.is_match(projection))
            .unwrap_or(false)
    })
}

fn textual_on_clause_is_equality_only(lower: &str) -> bool {
    let Some(on_pos) = lower.find(" on ") else {
        return false;
    };
    let after_on = &lower[on_pos + 4..];
    let end = ["where", "group by", "having", "order by", "union", "limit"]
        .iter()
        .filter_map(|kw| after_on.find(kw))
        .min()
        .unwrap_or(after_on.len());
    let on_clause = &after_on[..end];

    for op in [">", "<", ">=", "<=", "!=", "<>"] {
        if on_clause.contains(op) {
            return false;
        }
    }
    if contains_word(on_clause, "between")
        || contains_word(on_clause, "like")
        || Regex::new(r"\bin\s*\(")
            .map(|re| re.is_match(on_clause))
            .unwrap_or(false)
    {
        return false;
    }
    on_clause.contains('=')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn analyzer() -> ViewAnalyzer {
        ViewAnalyzer::new(Dialect::Postgres)
    }

    #[rstest]
    #[case("SELECT id, name FROM employees", ViewPattern::SimpleSelect, RiskLevel::Safe)]
    #[case("SELECT * FROM employees", ViewPattern::SimpleSelect, RiskLevel::Safe)]
    #[case(
        "SELECT id, name FROM employees WHERE active = true",
        ViewPattern::SelectWhere,
        RiskLevel::Low
    )]
    #[case(
        "SELECT e.id, d.name FROM employees e INNER JOIN departments d ON e.dept_id = d.id",
        ViewPattern::BasicJoin,
        RiskLevel::Medium
    )]
    fn test_supported_patterns(
        #[case] sql: &str,
        #[case] pattern: ViewPattern,
        #[case] risk: RiskLevel,
    ) {
        let analysis = analyzer().analyze(sql);
        assert_eq!(analysis.pattern, pattern, "{sql}");
        assert_eq!(analysis.risk_level, risk);
        assert!(analysis.reason_codes.is_empty());
    }

    #[rstest]
    #[case("SELECT a+b FROM t", ReasonCode::ComputedExpression)]
    #[case("SELECT salary * 2 AS doubled FROM t", ReasonCode::ComputedExpression)]
    #[case("SELECT UPPER(name) FROM t", ReasonCode::ComputedExpression)]
    #[case("SELECT COALESCE(a, b) FROM t", ReasonCode::ComputedExpression)]
    #[case("SELECT first_name || last_name FROM t", ReasonCode::ComputedExpression)]
    #[case("SELECT CASE WHEN a = 1 THEN 'x' ELSE 'y' END FROM t", ReasonCode::ComputedExpression)]
    #[case("SELECT COUNT(*) FROM t", ReasonCode::Aggregate)]
    fn test_computed_and_aggregate_projections(#[case] sql: &str, #[case] code: ReasonCode) {
        let analysis = analyzer().analyze(sql);
        assert_eq!(analysis.pattern, ViewPattern::Unsupported, "{sql}");
        assert!(analysis.reason_codes.contains(&code), "{sql}: {:?}", analysis.reason_codes);
    }

    #[rstest]
    #[case("SELECT id FROM a UNION SELECT id FROM b", ReasonCode::SetOperation)]
    #[case("SELECT id FROM a INTERSECT SELECT id FROM b", ReasonCode::SetOperation)]
    #[case(
        "SELECT id, ROW_NUMBER() OVER(ORDER BY id) FROM t",
        ReasonCode::WindowFunction
    )]
    #[case("WITH x AS (SELECT 1) SELECT * FROM x", ReasonCode::CommonTableExpression)]
    #[case("SELECT DISTINCT id FROM t", ReasonCode::DistinctClause)]
    #[case("SELECT id FROM t GROUP BY id", ReasonCode::GroupByClause)]
    #[case("SELECT id FROM t ORDER BY id", ReasonCode::OrderByClause)]
    #[case(
        "SELECT a.id FROM a LEFT JOIN b ON a.id = b.id",
        ReasonCode::OuterJoin
    )]
    #[case("SELECT a.id FROM a CROSS JOIN b", ReasonCode::CrossJoin)]
    #[case(
        "SELECT a.id FROM a INNER JOIN b ON a.id > b.id",
        ReasonCode::NonEqualityJoin
    )]
    #[case(
        "SELECT a.id FROM a INNER JOIN b ON a.id LIKE b.id",
        ReasonCode::NonEqualityJoin
    )]
    #[case(
        "SELECT id FROM t WHERE id IN (SELECT id FROM u)",
        ReasonCode::Subquery
    )]
    fn test_unsupported_constructs(#[case] sql: &str, #[case] code: ReasonCode) {
        let analysis = analyzer().analyze(sql);
        assert_eq!(analysis.pattern, ViewPattern::Unsupported, "{sql}");
        assert!(analysis.reason_codes.contains(&code), "{sql}: {:?}", analysis.reason_codes);
    }

    #[test]
    fn test_oracle_outer_join_syntax_rejected() {
        let analyzer = ViewAnalyzer::new(Dialect::Oracle);
        let analysis =
            analyzer.analyze("SELECT a.id, b.name FROM a, b WHERE a.id = b.id(+)");
        assert_eq!(analysis.pattern, ViewPattern::Unsupported);
        assert!(analysis
            .reason_codes
            .contains(&ReasonCode::OracleOuterJoinSyntax));
    }

    #[test]
    fn test_create_view_prefix_is_stripped() {
        let analysis = analyzer().analyze("CREATE VIEW v_emp AS SELECT id, name FROM employees");
        assert_eq!(analysis.pattern, ViewPattern::SimpleSelect);
    }

    #[test]
    fn test_create_or_replace_force_editionable_prefix() {
        let analysis = ViewAnalyzer::new(Dialect::Oracle).analyze(
            "CREATE OR REPLACE FORCE EDITIONABLE VIEW v_emp AS SELECT id FROM employees WHERE active = 1",
        );
        assert_eq!(analysis.pattern, ViewPattern::SelectWhere);
    }

    #[test]
    fn test_window_function_is_critical() {
        let analysis = analyzer().analyze("SELECT id, RANK() OVER(PARTITION BY d ORDER BY s) FROM t");
        assert_eq!(analysis.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_plain_non_equality_is_high() {
        let analysis = analyzer().analyze("SELECT a.id FROM a INNER JOIN b ON a.id > b.id");
        assert_eq!(analysis.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_unsupported_carries_reason_text() {
        let analysis = analyzer().analyze("SELECT id FROM a UNION SELECT id FROM b");
        let reason = analysis.reason.unwrap();
        assert!(reason.contains("set operation"));
        assert!(reason.contains("not in supported subset"));
    }

    #[test]
    fn test_admitted_views_contain_no_forbidden_keywords() {
        // The whitelist invariant: every admitted definition is free of the
        // restructuring constructs.
        let admitted = [
            "SELECT id, name FROM employees",
            "SELECT id FROM employees WHERE dept = 'eng'",
            "SELECT e.id, d.name FROM employees e INNER JOIN departments d ON e.dept_id = d.id",
        ];
        let forbidden = [
            "union", "intersect", "except", "over", "window", "partition by", "with ", "group by",
            "having", "order by", "distinct", "left join", "right join", "full join",
            "cross join",
        ];
        for sql in admitted {
            let analysis = analyzer().analyze(sql);
            assert!(analysis.is_supported(), "{sql}");
            let lower = sql.to_lowercase();
            for kw in forbidden {
                assert!(!lower.contains(kw), "{sql} contains {kw}");
            }
        }
    }

    #[test]
    fn test_three_way_join_rejected() {
        let analysis = analyzer().analyze(
            "SELECT a.id FROM a INNER JOIN b ON a.id = b.id INNER JOIN c ON b.id = c.id",
        );
        assert_eq!(analysis.pattern, ViewPattern::Unsupported);
    }

    #[test]
    fn test_textual_fallback_computed_columns() {
        // Force the textual path with a definition the parser rejects.
        let analysis = classify_textual("select nvl(a,b) from t connect by prior id = parent_id");
        assert_eq!(analysis.pattern, ViewPattern::Unsupported);
        assert!(analysis
            .reason_codes
            .contains(&ReasonCode::ComputedExpression));
    }

    #[test]
    fn test_textual_fallback_simple_select() {
        let analysis = classify_textual("select id, name from employees");
        assert_eq!(analysis.pattern, ViewPattern::SimpleSelect);
    }
}
