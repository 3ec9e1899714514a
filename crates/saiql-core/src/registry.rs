//! The type registry: `source type string ⇄ IR ⇄ target type string`.
//!
//! The registry is a process-wide immutable table. It never fails on unknown
//! input; unmappable types come back as [`IrType::Unknown`] with the original
//! string preserved by the caller for reporting.

use crate::types::{Dialect, IrType, TypeInfo};
use regex::Regex;
use std::sync::OnceLock;

/// How a registry row obtains precision or scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// Take the value parsed out of the source type string.
    Extract,
    /// A fixed value independent of the source string (e.g. MSSQL money).
    Fixed(u32),
    /// Not applicable for this type.
    Absent,
}

impl Rule {
    fn apply(self, parsed: Option<u32>) -> Option<u32> {
        match self {
            Rule::Extract => parsed,
            Rule::Fixed(v) => Some(v),
            Rule::Absent => None,
        }
    }
}

/// Classification of a cross-dialect type conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionClass {
    Lossless,
    /// The value domain survives but semantics change; the reason names the
    /// concrete change.
    Lossy,
    /// The type maps but a capability is dropped.
    Partial,
    Unsupported,
}

/// Parse a native type string into `(base, precision, scale, length)`.
///
/// `varchar(255)` → `("varchar", Some(255), None, Some(255))`;
/// `timestamp(6) with time zone` → `("timestamp with time zone", Some(6), ..)`;
/// `character varying(64)` → `("character varying", Some(64), ..)`.
/// The parenthesised arguments may appear anywhere; trailing modifiers are
/// folded into the base lookup key.
pub fn parse_type_string(type_str: &str) -> (String, Option<u32>, Option<u32>, Option<u32>) {
    static ARGS_RE: OnceLock<Regex> = OnceLock::new();
    let re = ARGS_RE.get_or_init(|| {
        Regex::new(r"\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\)").expect("invalid type-args regex")
    });

    let lowered = type_str.trim().to_lowercase();
    let (precision, scale, without_args) = match re.captures(&lowered) {
        Some(caps) => {
            let precision: Option<u32> = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let scale: Option<u32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
            let span = caps.get(0).expect("whole match");
            let mut rest = String::with_capacity(lowered.len());
            rest.push_str(&lowered[..span.start()]);
            rest.push(' ');
            rest.push_str(&lowered[span.end()..]);
            (precision, scale, rest)
        }
        None => (None, None, lowered.clone()),
    };

    let base = without_args.split_whitespace().collect::<Vec<_>>().join(" ");
    (base, precision, scale, precision)
}

/// Map a source-dialect type string into the IR.
///
/// Never errors: anything the registry cannot place maps to
/// [`TypeInfo::unknown`].
pub fn map_to_ir(source: Dialect, source_type: &str) -> TypeInfo {
    let lowered = source_type.trim().to_lowercase();
    let (base, precision, scale, length) = parse_type_string(&lowered);

    // 1. Exact match of the full string (catches e.g. mysql `tinyint(1)`).
    let mut mapping = source_row(source, &lowered)
        // 2. Base name with trailing modifiers folded in.
        .or_else(|| source_row(source, &base));

    // 3. Longest token prefix (catches `int unsigned`, `character varying`
    //    when a modifier trails the registered key).
    if mapping.is_none() {
        let tokens: Vec<&str> = base.split_whitespace().collect();
        for take in (1..tokens.len().max(1)).rev() {
            if let Some(row) = source_row(source, &tokens[..take].join(" ")) {
                mapping = Some(row);
                break;
            }
        }
    }

    let Some((ir_type, p_rule, s_rule)) = mapping else {
        return TypeInfo::unknown();
    };

    TypeInfo {
        ir_type,
        precision: p_rule.apply(precision),
        scale: s_rule.apply(scale),
        length,
    }
}

/// Render the target dialect's canonical DDL type string for an IR type.
pub fn render_type(target: Dialect, info: &TypeInfo) -> String {
    let base = target_base(target, info.ir_type);

    match info.ir_type {
        IrType::Decimal => match (info.precision, info.scale) {
            (Some(p), Some(s)) if s > 0 => format!("{base}({p},{s})"),
            (Some(p), _) => format!("{base}({p})"),
            _ => base.to_string(),
        },
        IrType::Varchar | IrType::Char => match info.length {
            Some(len) => format!("{base}({len})"),
            None => base.to_string(),
        },
        _ => base.to_string(),
    }
}

/// Classify the conversion of a source type towards a target dialect.
///
/// Returns the class and, for lossy/partial conversions, the concrete
/// semantic change.
pub fn classify_conversion(
    source: Dialect,
    source_type: &str,
    target: Dialect,
) -> (ConversionClass, Option<String>) {
    let info = map_to_ir(source, source_type);
    if info.is_unknown() {
        return (
            ConversionClass::Unsupported,
            Some(format!(
                "{source} type '{source_type}' is not mapped into the IR"
            )),
        );
    }

    let (base, ..) = parse_type_string(source_type);

    // HANA three-tier classes (exact / lossy / partial).
    if source == Dialect::Hana {
        match base.as_str() {
            "shorttext" => {
                return (
                    ConversionClass::Partial,
                    Some("HANA SHORTTEXT loses fuzzy-search capability on conversion".to_string()),
                )
            }
            "smalldecimal" => {
                return (
                    ConversionClass::Lossy,
                    Some("HANA SMALLDECIMAL precision capped at 16 digits".to_string()),
                )
            }
            "seconddate" => {
                return (
                    ConversionClass::Lossy,
                    Some("HANA SECONDDATE truncates sub-second precision".to_string()),
                )
            }
            "blob" => {
                return (
                    ConversionClass::Lossy,
                    Some("HANA BLOB size limit differs from target binary type".to_string()),
                )
            }
            _ => {}
        }
    }

    // Fixed-point collapses to floating point on SQLite.
    if info.ir_type == IrType::Decimal && target == Dialect::Sqlite {
        return (
            ConversionClass::Lossy,
            Some("Fixed-point precision replaced by floating point (SQLite REAL)".to_string()),
        );
    }

    // Timezone-aware timestamps lose their zone on MySQL and SQLite.
    if info.ir_type == IrType::TimestampTz
        && matches!(target, Dialect::Mysql | Dialect::Sqlite)
    {
        return (
            ConversionClass::Lossy,
            Some("Timezone dropped: target normalises to UTC".to_string()),
        );
    }

    // Oracle treats '' as NULL; every other engine distinguishes them.
    if source == Dialect::Oracle
        && target != Dialect::Oracle
        && matches!(info.ir_type, IrType::Varchar | IrType::Char | IrType::Text)
    {
        return (
            ConversionClass::Lossy,
            Some("Oracle empty-string-as-NULL semantics are not preserved".to_string()),
        );
    }

    (ConversionClass::Lossless, None)
}

/// Source type → IR row for one dialect. Keys are lowercase.
fn source_row(dialect: Dialect, key: &str) -> Option<(IrType, Rule, Rule)> {
    use IrType::*;
    use Rule::{Absent as A, Extract as E};

    let row = match dialect {
        Dialect::Postgres => match key {
            "smallint" => (SmallInt, A, A),
            "integer" | "int" | "int4" => (Integer, A, A),
            "bigint" | "int8" => (BigInt, A, A),
            "numeric" | "decimal" => (Decimal, E, E),
            "real" => (Real, A, A),
            "double precision" => (Double, A, A),
            "varchar" | "character varying" => (Varchar, E, A),
            "char" | "character" => (Char, E, A),
            "text" => (Text, A, A),
            "bytea" => (Bytea, A, A),
            "boolean" | "bool" => (Boolean, A, A),
            "date" => (Date, A, A),
            "time" | "time without time zone" => (Time, A, A),
            "timestamp" | "timestamp without time zone" => (Timestamp, A, A),
            "timestamp with time zone" | "timestamptz" => (TimestampTz, A, A),
            "uuid" => (Uuid, A, A),
            "json" => (Json, A, A),
            "jsonb" => (Jsonb, A, A),
            _ => return None,
        },
        Dialect::Mysql => match key {
            "tinyint(1)" => (Boolean, A, A),
            "tinyint" | "smallint" => (SmallInt, A, A),
            "int" | "integer" | "mediumint" => (Integer, A, A),
            "bigint" => (BigInt, A, A),
            "decimal" | "numeric" => (Decimal, E, E),
            "float" => (Real, A, A),
            "double" => (Double, A, A),
            "varchar" => (Varchar, E, A),
            "char" => (Char, E, A),
            "text" | "mediumtext" | "longtext" | "tinytext" => (Text, A, A),
            "blob" | "mediumblob" | "longblob" | "tinyblob" => (Bytea, A, A),
            "binary" | "varbinary" => (Bytea, E, A),
            "date" => (Date, A, A),
            "time" => (Time, A, A),
            "datetime" => (Timestamp, A, A),
            "timestamp" => (TimestampTz, A, A),
            "json" => (Json, A, A),
            _ => return None,
        },
        Dialect::Sqlite => match key {
            "integer" | "int" => (Integer, A, A),
            "real" => (Double, A, A),
            "text" => (Text, A, A),
            "blob" => (Bytea, A, A),
            "boolean" => (Boolean, A, A),
            "date" => (Date, A, A),
            "datetime" | "timestamp" => (Timestamp, A, A),
            "numeric" => (Decimal, E, E),
            "varchar" => (Varchar, E, A),
            _ => return None,
        },
        Dialect::Oracle => match key {
            "number" => (Decimal, E, E),
            "float" => (Double, A, A),
            "binary_float" => (Real, A, A),
            "binary_double" => (Double, A, A),
            "varchar2" | "nvarchar2" => (Varchar, E, A),
            "char" | "nchar" => (Char, E, A),
            "clob" | "nclob" | "long" => (Text, A, A),
            "blob" | "raw" | "long raw" => (Bytea, A, A),
            // Oracle DATE carries a time component.
            "date" => (Timestamp, A, A),
            "timestamp" => (Timestamp, A, A),
            "timestamp with time zone" | "timestamp with local time zone" => (TimestampTz, A, A),
            _ => return None,
        },
        Dialect::Mssql => match key {
            "tinyint" | "smallint" => (SmallInt, A, A),
            "int" => (Integer, A, A),
            "bigint" => (BigInt, A, A),
            "bit" => (Boolean, A, A),
            "decimal" | "numeric" => (Decimal, E, E),
            "money" => (Decimal, Rule::Fixed(19), Rule::Fixed(4)),
            "smallmoney" => (Decimal, Rule::Fixed(10), Rule::Fixed(4)),
            "float" => (Double, A, A),
            "real" => (Real, A, A),
            "date" => (Date, A, A),
            "time" => (Time, A, A),
            "datetime" | "datetime2" | "smalldatetime" => (Timestamp, A, A),
            "datetimeoffset" => (TimestampTz, A, A),
            "char" | "nchar" => (Char, E, A),
            "varchar" | "nvarchar" => (Varchar, E, A),
            "text" | "ntext" | "xml" => (Text, A, A),
            "binary" | "varbinary" | "image" => (Bytea, A, A),
            "uniqueidentifier" => (Uuid, A, A),
            _ => return None,
        },
        Dialect::Hana => match key {
            "boolean" => (Boolean, A, A),
            // Upcast for safety: HANA TINYINT is unsigned.
            "tinyint" | "smallint" => (SmallInt, A, A),
            "integer" | "int" => (Integer, A, A),
            "bigint" => (BigInt, A, A),
            "real" => (Real, A, A),
            "double" => (Double, A, A),
            "char" | "nchar" => (Char, E, A),
            "varchar" | "nvarchar" => (Varchar, E, A),
            "clob" | "nclob" => (Text, A, A),
            "date" => (Date, A, A),
            "time" => (Time, A, A),
            "timestamp" => (Timestamp, A, A),
            "binary" | "varbinary" => (Bytea, E, A),
            "decimal" => (Decimal, E, E),
            "smalldecimal" => (Decimal, Rule::Fixed(16), Rule::Fixed(0)),
            "seconddate" => (Timestamp, A, A),
            "blob" => (Bytea, A, A),
            "shorttext" => (Varchar, E, A),
            // ST_GEOMETRY, ALPHANUM, BINTEXT and full-text TEXT stay unmapped.
            _ => return None,
        },
    };
    Some(row)
}

/// IR type → target base type string.
///
/// Emission targets are postgres, mysql, sqlite and mssql; other dialects
/// fall back to TEXT, matching the conservative default for unmapped targets.
fn target_base(target: Dialect, ir: IrType) -> &'static str {
    use IrType::*;
    match target {
        Dialect::Postgres => match ir {
            SmallInt => "SMALLINT",
            Integer => "INTEGER",
            BigInt => "BIGINT",
            Decimal => "NUMERIC",
            Real => "REAL",
            Double => "DOUBLE PRECISION",
            Varchar => "VARCHAR",
            Char => "CHAR",
            Text => "TEXT",
            Bytea => "BYTEA",
            Boolean => "BOOLEAN",
            Date => "DATE",
            Time => "TIME",
            Timestamp => "TIMESTAMP",
            TimestampTz => "TIMESTAMP WITH TIME ZONE",
            Uuid => "UUID",
            Json => "JSON",
            Jsonb => "JSONB",
            Unknown => "TEXT",
        },
        Dialect::Mysql => match ir {
            SmallInt => "SMALLINT",
            Integer => "INT",
            BigInt => "BIGINT",
            Decimal => "DECIMAL",
            Real => "FLOAT",
            Double => "DOUBLE",
            Varchar => "VARCHAR",
            Char => "CHAR",
            Text => "TEXT",
            Bytea => "LONGBLOB",
            Boolean => "TINYINT(1)",
            Date => "DATE",
            Time => "TIME",
            Timestamp => "DATETIME",
            TimestampTz => "TIMESTAMP",
            Uuid => "CHAR(36)",
            Json | Jsonb => "JSON",
            Unknown => "TEXT",
        },
        Dialect::Sqlite => match ir {
            SmallInt | Integer | BigInt | Boolean => "INTEGER",
            Decimal | Real | Double => "REAL",
            Bytea => "BLOB",
            // SQLite stores temporal values as ISO-8601 text.
            _ => "TEXT",
        },
        Dialect::Mssql => match ir {
            SmallInt => "SMALLINT",
            Integer => "INT",
            BigInt => "BIGINT",
            Decimal => "DECIMAL",
            Real => "REAL",
            Double => "FLOAT",
            Varchar => "NVARCHAR",
            Char => "NCHAR",
            Text => "NVARCHAR(MAX)",
            Bytea => "VARBINARY(MAX)",
            Boolean => "BIT",
            Date => "DATE",
            Time => "TIME",
            Timestamp => "DATETIME2",
            TimestampTz => "DATETIMEOFFSET",
            Uuid => "UNIQUEIDENTIFIER",
            Json | Jsonb => "NVARCHAR(MAX)",
            Unknown => "NVARCHAR(MAX)",
        },
        Dialect::Oracle | Dialect::Hana => "TEXT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_simple() {
        assert_eq!(
            parse_type_string("varchar(255)"),
            ("varchar".to_string(), Some(255), None, Some(255))
        );
    }

    #[test]
    fn test_parse_precision_scale() {
        let (base, p, s, _) = parse_type_string("NUMBER(10,2)");
        assert_eq!(base, "number");
        assert_eq!(p, Some(10));
        assert_eq!(s, Some(2));
    }

    #[test]
    fn test_parse_trailing_modifier_folds_into_base() {
        let (base, p, _, _) = parse_type_string("TIMESTAMP(6) WITH TIME ZONE");
        assert_eq!(base, "timestamp with time zone");
        assert_eq!(p, Some(6));
    }

    #[test]
    fn test_parse_bare_type() {
        assert_eq!(parse_type_string("text"), ("text".to_string(), None, None, None));
    }

    #[rstest]
    #[case(Dialect::Postgres, "integer", IrType::Integer)]
    #[case(Dialect::Postgres, "character varying(64)", IrType::Varchar)]
    #[case(Dialect::Postgres, "timestamptz", IrType::TimestampTz)]
    #[case(Dialect::Postgres, "jsonb", IrType::Jsonb)]
    #[case(Dialect::Mysql, "tinyint(1)", IrType::Boolean)]
    #[case(Dialect::Mysql, "tinyint", IrType::SmallInt)]
    #[case(Dialect::Mysql, "longtext", IrType::Text)]
    #[case(Dialect::Mysql, "timestamp", IrType::TimestampTz)]
    #[case(Dialect::Sqlite, "INTEGER", IrType::Integer)]
    #[case(Dialect::Oracle, "NUMBER(10,2)", IrType::Decimal)]
    #[case(Dialect::Oracle, "VARCHAR2(100)", IrType::Varchar)]
    #[case(Dialect::Oracle, "DATE", IrType::Timestamp)]
    #[case(Dialect::Mssql, "uniqueidentifier", IrType::Uuid)]
    #[case(Dialect::Mssql, "datetimeoffset", IrType::TimestampTz)]
    #[case(Dialect::Hana, "NVARCHAR(50)", IrType::Varchar)]
    #[case(Dialect::Hana, "SECONDDATE", IrType::Timestamp)]
    fn test_map_to_ir(#[case] dialect: Dialect, #[case] input: &str, #[case] expected: IrType) {
        assert_eq!(map_to_ir(dialect, input).ir_type, expected);
    }

    #[test]
    fn test_map_unknown_type_is_a_value_not_an_error() {
        let info = map_to_ir(Dialect::Postgres, "tsvector");
        assert!(info.is_unknown());
        let info = map_to_ir(Dialect::Hana, "ST_GEOMETRY");
        assert!(info.is_unknown());
    }

    #[test]
    fn test_map_extracts_precision_and_scale() {
        let info = map_to_ir(Dialect::Oracle, "NUMBER(10,2)");
        assert_eq!(info.precision, Some(10));
        assert_eq!(info.scale, Some(2));
    }

    #[test]
    fn test_map_fixed_rule_overrides_source() {
        let info = map_to_ir(Dialect::Mssql, "money");
        assert_eq!(info.ir_type, IrType::Decimal);
        assert_eq!(info.precision, Some(19));
        assert_eq!(info.scale, Some(4));
    }

    #[test]
    fn test_map_unsigned_modifier_falls_back_to_first_token() {
        let info = map_to_ir(Dialect::Mysql, "int unsigned");
        assert_eq!(info.ir_type, IrType::Integer);
    }

    #[rstest]
    #[case(Dialect::Postgres, IrType::Double, "DOUBLE PRECISION")]
    #[case(Dialect::Mysql, IrType::Boolean, "TINYINT(1)")]
    #[case(Dialect::Sqlite, IrType::Varchar, "TEXT")]
    #[case(Dialect::Mssql, IrType::Text, "NVARCHAR(MAX)")]
    fn test_render_base(#[case] target: Dialect, #[case] ir: IrType, #[case] expected: &str) {
        assert_eq!(render_type(target, &TypeInfo::new(ir)), expected);
    }

    #[test]
    fn test_render_decimal_variants() {
        let full = TypeInfo::new(IrType::Decimal).with_precision(10).with_scale(2);
        assert_eq!(render_type(Dialect::Postgres, &full), "NUMERIC(10,2)");

        let p_only = TypeInfo::new(IrType::Decimal).with_precision(10);
        assert_eq!(render_type(Dialect::Postgres, &p_only), "NUMERIC(10)");

        let bare = TypeInfo::new(IrType::Decimal);
        assert_eq!(render_type(Dialect::Postgres, &bare), "NUMERIC");
    }

    #[test]
    fn test_render_varchar_length() {
        let info = TypeInfo::new(IrType::Varchar).with_length(255);
        assert_eq!(render_type(Dialect::Mysql, &info), "VARCHAR(255)");
    }

    #[test]
    fn test_round_trip_through_ir() {
        // postgres varchar(64) -> IR -> mysql VARCHAR(64)
        let info = map_to_ir(Dialect::Postgres, "varchar(64)");
        assert_eq!(render_type(Dialect::Mysql, &info), "VARCHAR(64)");
    }

    #[test]
    fn test_lossy_decimal_to_sqlite() {
        let (class, reason) = classify_conversion(Dialect::Oracle, "NUMBER(10,2)", Dialect::Sqlite);
        assert_eq!(class, ConversionClass::Lossy);
        assert!(reason.unwrap().contains("floating point"));
    }

    #[test]
    fn test_lossy_timestamptz_to_mysql() {
        let (class, reason) =
            classify_conversion(Dialect::Postgres, "timestamptz", Dialect::Mysql);
        assert_eq!(class, ConversionClass::Lossy);
        assert!(reason.unwrap().contains("Timezone dropped"));
    }

    #[test]
    fn test_lossy_oracle_empty_string() {
        let (class, reason) =
            classify_conversion(Dialect::Oracle, "VARCHAR2(10)", Dialect::Postgres);
        assert_eq!(class, ConversionClass::Lossy);
        assert!(reason.unwrap().contains("empty-string-as-NULL"));
    }

    #[test]
    fn test_partial_hana_shorttext() {
        let (class, _) = classify_conversion(Dialect::Hana, "SHORTTEXT(100)", Dialect::Postgres);
        assert_eq!(class, ConversionClass::Partial);
    }

    #[test]
    fn test_unsupported_conversion_for_unknown_type() {
        let (class, _) = classify_conversion(Dialect::Hana, "ALPHANUM(8)", Dialect::Postgres);
        assert_eq!(class, ConversionClass::Unsupported);
    }

    #[test]
    fn test_lossless_conversion() {
        let (class, reason) = classify_conversion(Dialect::Postgres, "integer", Dialect::Mysql);
        assert_eq!(class, ConversionClass::Lossless);
        assert!(reason.is_none());
    }
}
