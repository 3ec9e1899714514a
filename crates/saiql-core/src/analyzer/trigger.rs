//! Trigger pattern classifier (L4).
//!
//! The behavioural-safe subset admits exactly two shapes: row-level
//! `BEFORE INSERT` and `BEFORE UPDATE` triggers whose body is a single
//! assignment to a `NEW` column through UPPER/LOWER/TRIM/LTRIM/RTRIM.
//! Trigger bodies are procedural text no ANSI parser handles uniformly, so
//! classification is regex-driven throughout.

use crate::types::{Dialect, ReasonCode, RiskLevel};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPattern {
    BeforeInsertNormalize,
    BeforeUpdateNormalize,
    Unsupported,
}

#[derive(Debug, Clone)]
pub struct TriggerAnalysis {
    pub pattern: TriggerPattern,
    pub risk_level: RiskLevel,
    /// Non-empty iff `pattern == Unsupported`.
    pub reason_codes: Vec<ReasonCode>,
    pub reason: Option<String>,
}

impl TriggerAnalysis {
    pub fn is_supported(&self) -> bool {
        self.pattern != TriggerPattern::Unsupported
    }

    fn supported(pattern: TriggerPattern) -> Self {
        Self {
            pattern,
            risk_level: RiskLevel::Low,
            reason_codes: Vec::new(),
            reason: None,
        }
    }

    fn unsupported(reason_codes: Vec<ReasonCode>) -> Self {
        debug_assert!(!reason_codes.is_empty());
        // DML and control flow inside a trigger can silently corrupt data;
        // simple structural mismatches only need a manual port.
        let critical = reason_codes.iter().any(|c| {
            matches!(
                c,
                ReasonCode::DmlInBody
                    | ReasonCode::LoopOrCursor
                    | ReasonCode::ExceptionHandling
                    | ReasonCode::DynamicSql
            )
        });
        let reason = Some(format!(
            "Contains {} (not in supported subset)",
            reason_codes[0].as_str()
        ));
        Self {
            pattern: TriggerPattern::Unsupported,
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

const ALLOWED_FUNCTIONS: &[&str] = &["upper", "lower", "trim", "ltrim", "rtrim"];

#[derive(Debug, Clone)]
pub struct TriggerAnalyzer {
    #[allow(dead_code)]
    dialect: Dialect,
}

impl TriggerAnalyzer {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn is_supported_pattern(&self, definition: &str) -> bool {
        self.analyze(definition).is_supported()
    }

    /// Classify a trigger definition against the whitelist.
    pub fn analyze(&self, definition: &str) -> TriggerAnalysis {
        let lower = definition.to_lowercase();

        // Timing and scope gates first.
        if lower.contains("instead of") {
            return TriggerAnalysis::unsupported(vec![ReasonCode::InsteadOfTrigger]);
        }
        if lower.contains("after")
            && (lower.contains("insert") || lower.contains("update") || lower.contains("delete"))
        {
            return TriggerAnalysis::unsupported(vec![ReasonCode::AfterTrigger]);
        }
        if lower.contains("for each statement") || lower.contains("statement level") {
            return TriggerAnalysis::unsupported(vec![ReasonCode::StatementLevelTrigger]);
        }

        let body = extract_trigger_body(definition);
        if body.is_empty() {
            return TriggerAnalysis::unsupported(vec![ReasonCode::MissingNewAssignment]);
        }
        let body_lower = body.to_lowercase();

        if let Some(codes) = body_rejections(&body_lower) {
            return TriggerAnalysis::unsupported(codes);
        }

        if word_re(r"\bif\b").is_match(&lower) || word_re(r"\bcase\b").is_match(&lower) {
            return TriggerAnalysis::unsupported(vec![ReasonCode::ConditionalLogic]);
        }

        let pattern = if lower.contains("before insert") {
            TriggerPattern::BeforeInsertNormalize
        } else if lower.contains("before update") {
            TriggerPattern::BeforeUpdateNormalize
        } else {
            return TriggerAnalysis::unsupported(vec![ReasonCode::MissingNewAssignment]);
        };

        match normalization_rejection(&body, &body_lower) {
            None => TriggerAnalysis::supported(pattern),
            Some(code) => TriggerAnalysis::unsupported(vec![code]),
        }
    }
}

fn word_re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid word regex")
}

/// Constructs in the body that disqualify a trigger outright.
fn body_rejections(body_lower: &str) -> Option<Vec<ReasonCode>> {
    static UPDATE_SET_RE: OnceLock<Regex> = OnceLock::new();

    let mut codes = Vec::new();

    if ["cursor", "loop", "while", "for "]
        .iter()
        .any(|kw| body_lower.contains(kw))
    {
        codes.push(ReasonCode::LoopOrCursor);
    }
    if ["exception", "raise", "rollback", "signal"]
        .iter()
        .any(|kw| body_lower.contains(kw))
    {
        codes.push(ReasonCode::ExceptionHandling);
    }
    if body_lower.contains("prepare ") || body_lower.contains("execute immediate") {
        codes.push(ReasonCode::DynamicSql);
    }
    if body_lower.contains("select")
        || body_lower.contains("delete")
        || body_lower.contains("merge")
        || body_lower.contains("insert into")
    {
        codes.push(ReasonCode::DmlInBody);
    }
    // An UPDATE statement, as opposed to the UPDATE event in the header.
    let update_set =
        UPDATE_SET_RE.get_or_init(|| Regex::new(r"update\s+\w+\s+set").expect("invalid regex"));
    if update_set.is_match(body_lower) {
        codes.push(ReasonCode::DmlInBody);
    }

    if codes.is_empty() {
        None
    } else {
        codes.dedup();
        Some(codes)
    }
}

/// Verify the body is one assignment to a NEW column using only the allowed
/// normalization functions.
fn normalization_rejection(body: &str, body_lower: &str) -> Option<ReasonCode> {
    static CALL_RE: OnceLock<Regex> = OnceLock::new();

    // One statement only: split on semicolons, ignore a trailing END.
    let statements: Vec<&str> = body_lower
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "end")
        .collect();
    if statements.len() > 1 {
        return Some(ReasonCode::MultipleStatements);
    }

    if !body_lower.contains(":new.") && !body_lower.contains("new.") {
        return Some(ReasonCode::MissingNewAssignment);
    }
    if !body.contains(":=") && !body.contains('=') {
        return Some(ReasonCode::MissingNewAssignment);
    }

    let call_re = CALL_RE
        .get_or_init(|| Regex::new(r"\b([a-zA-Z_][a-zA-Z0-9_]*)\s*\(").expect("invalid regex"));
    let mut call_count = 0;
    for caps in call_re.captures_iter(body_lower) {
        let func = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if !ALLOWED_FUNCTIONS.contains(&func) {
            return Some(ReasonCode::DisallowedFunction);
        }
        call_count += 1;
    }
    if call_count == 0 {
        return Some(ReasonCode::DisallowedFunction);
    }

    None
}

/// Extract the trigger body from a definition.
///
/// Oracle and Postgres inline form: between BEGIN and END. Postgres function
/// form: between the dollar quotes. Simple form: after AS.
pub fn extract_trigger_body(definition: &str) -> String {
    static BEGIN_RE: OnceLock<Regex> = OnceLock::new();
    static DOLLAR_RE: OnceLock<Regex> = OnceLock::new();
    static AS_RE: OnceLock<Regex> = OnceLock::new();
    static END_RE: OnceLock<Regex> = OnceLock::new();

    let begin_re = BEGIN_RE.get_or_init(|| {
        Regex::new(r"(?is)\bbegin\b(.+?)\bend\b").expect("invalid begin regex")
    });
    if let Some(caps) = begin_re.captures(definition) {
        return caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
    }

    let dollar_re =
        DOLLAR_RE.get_or_init(|| Regex::new(r"(?s)\$\$(.+?)\$\$").expect("invalid dollar regex"));
    if let Some(caps) = dollar_re.captures(definition) {
        return caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
    }

    let as_re = AS_RE
        .get_or_init(|| Regex::new(r"(?is)\bas\s+(.+?)(?:;|$)").expect("invalid as regex"));
    if let Some(caps) = as_re.captures(definition) {
        let body = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let end_re = END_RE
            .get_or_init(|| Regex::new(r"(?i)\bend\s*;?\s*$").expect("invalid end regex"));
        return end_re.replace(body, "").trim().to_string();
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn analyzer() -> TriggerAnalyzer {
        TriggerAnalyzer::new(Dialect::Oracle)
    }

    const LOWERCASE_EMAIL: &str = r#"
        CREATE TRIGGER trg_lowercase_email
        BEFORE INSERT ON customers
        FOR EACH ROW
        BEGIN
            :NEW.email := LOWER(:NEW.email);
        END;
    "#;

    const UPPERCASE_CODE_UPDATE: &str = r#"
        CREATE TRIGGER trg_upper_code
        BEFORE UPDATE ON products
        FOR EACH ROW
        BEGIN
            :NEW.code := UPPER(:NEW.code);
        END;
    "#;

    #[test]
    fn test_before_insert_normalize_admitted() {
        let analysis = analyzer().analyze(LOWERCASE_EMAIL);
        assert_eq!(analysis.pattern, TriggerPattern::BeforeInsertNormalize);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_before_update_normalize_admitted() {
        let analysis = analyzer().analyze(UPPERCASE_CODE_UPDATE);
        assert_eq!(analysis.pattern, TriggerPattern::BeforeUpdateNormalize);
    }

    #[rstest]
    #[case(
        "CREATE TRIGGER t AFTER INSERT ON c FOR EACH ROW BEGIN INSERT INTO audit VALUES (1); END;",
        ReasonCode::AfterTrigger
    )]
    #[case(
        "CREATE TRIGGER t INSTEAD OF INSERT ON v BEGIN SELECT 1; END;",
        ReasonCode::InsteadOfTrigger
    )]
    #[case(
        "CREATE TRIGGER t BEFORE INSERT ON c FOR EACH STATEMENT BEGIN :NEW.a := LOWER(:NEW.a); END;",
        ReasonCode::StatementLevelTrigger
    )]
    fn test_timing_and_scope_gates(#[case] sql: &str, #[case] code: ReasonCode) {
        let analysis = analyzer().analyze(sql);
        assert_eq!(analysis.pattern, TriggerPattern::Unsupported, "{sql}");
        assert!(analysis.reason_codes.contains(&code));
    }

    #[test]
    fn test_dml_in_body_is_critical() {
        let sql = r#"
            CREATE TRIGGER t BEFORE INSERT ON orders FOR EACH ROW
            BEGIN
                DELETE FROM stale_orders WHERE id = :NEW.id;
            END;
        "#;
        let analysis = analyzer().analyze(sql);
        assert!(analysis.reason_codes.contains(&ReasonCode::DmlInBody));
        assert_eq!(analysis.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_loop_is_critical() {
        let sql = r#"
            CREATE TRIGGER t BEFORE INSERT ON orders FOR EACH ROW
            BEGIN
                LOOP :NEW.x := LOWER(:NEW.x); END LOOP;
            END;
        "#;
        let analysis = analyzer().analyze(sql);
        assert!(analysis.reason_codes.contains(&ReasonCode::LoopOrCursor));
        assert_eq!(analysis.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_conditional_logic_rejected() {
        let sql = r#"
            CREATE TRIGGER t BEFORE UPDATE ON accounts FOR EACH ROW
            BEGIN
                IF :NEW.credit_limit < 0 THEN :NEW.credit_limit := 0; END IF;
            END;
        "#;
        let analysis = analyzer().analyze(sql);
        assert_eq!(analysis.pattern, TriggerPattern::Unsupported);
        assert!(analysis
            .reason_codes
            .contains(&ReasonCode::ConditionalLogic));
    }

    #[test]
    fn test_disallowed_function_rejected() {
        let sql = r#"
            CREATE TRIGGER t BEFORE INSERT ON c FOR EACH ROW
            BEGIN
                :NEW.name := INITCAP(:NEW.name);
            END;
        "#;
        let analysis = analyzer().analyze(sql);
        assert!(analysis
            .reason_codes
            .contains(&ReasonCode::DisallowedFunction));
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let sql = r#"
            CREATE TRIGGER t BEFORE INSERT ON c FOR EACH ROW
            BEGIN
                :NEW.a := LOWER(:NEW.a);
                :NEW.b := UPPER(:NEW.b);
            END;
        "#;
        let analysis = analyzer().analyze(sql);
        assert!(analysis
            .reason_codes
            .contains(&ReasonCode::MultipleStatements));
    }

    #[test]
    fn test_body_extraction_begin_end() {
        let body = extract_trigger_body(LOWERCASE_EMAIL);
        assert!(body.contains(":NEW.email := LOWER(:NEW.email)"));
        assert!(!body.to_lowercase().contains("create trigger"));
    }

    #[test]
    fn test_body_extraction_dollar_quotes() {
        let sql = "CREATE FUNCTION f() RETURNS trigger AS $$ NEW.a = TRIM(NEW.a); $$ LANGUAGE plpgsql;";
        let body = extract_trigger_body(sql);
        assert_eq!(body, "NEW.a = TRIM(NEW.a);");
    }

    #[test]
    fn test_allowed_function_set() {
        for func in ["UPPER", "LOWER", "TRIM", "LTRIM", "RTRIM"] {
            let sql = format!(
                "CREATE TRIGGER t BEFORE INSERT ON c FOR EACH ROW BEGIN :NEW.a := {func}(:NEW.a); END;"
            );
            let analysis = analyzer().analyze(&sql);
            assert!(analysis.is_supported(), "{func} should be admitted");
        }
    }
}
