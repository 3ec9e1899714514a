//! Core data model: the dialect-neutral IR and the translation result types.
//!
//! Everything the harness, adapters and reports exchange is defined here as
//! closed sum types. String tags only appear at serialization boundaries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Supported database engines.
///
/// MariaDB is folded into `Mysql`: the introspection surface and the safety
/// subsets are identical for the levels this crate covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Mysql,
    Sqlite,
    Oracle,
    Mssql,
    Hana,
}

impl Dialect {
    /// Parse a dialect name, accepting common aliases
    /// (`postgresql`, `mariadb`, `sqlserver`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "mysql" | "mariadb" => Some(Self::Mysql),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "oracle" => Some(Self::Oracle),
            "mssql" | "sqlserver" => Some(Self::Mssql),
            "hana" => Some(Self::Hana),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Oracle => "oracle",
            Self::Mssql => "mssql",
            Self::Hana => "hana",
        }
    }

    /// The sqlparser dialect used when parsing DDL text from this engine.
    ///
    /// Oracle and HANA have no dedicated sqlparser dialect; the generic
    /// dialect is close enough for the conservative subsets we classify.
    pub fn to_sqlparser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        use sqlparser::dialect::{
            GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
        };
        match self {
            Self::Postgres => Box::new(PostgreSqlDialect {}),
            Self::Mysql => Box::new(MySqlDialect {}),
            Self::Sqlite => Box::new(SQLiteDialect {}),
            Self::Mssql => Box::new(MsSqlDialect {}),
            Self::Oracle | Self::Hana => Box::new(GenericDialect {}),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Migration capability tiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum MigrationLevel {
    /// Tables: existence, columns, types.
    L0,
    /// Constraints and physical structure.
    L1,
    /// Views.
    L2,
    /// Routines.
    L3,
    /// Triggers.
    L4,
}

impl MigrationLevel {
    pub const ALL: [MigrationLevel; 5] = [Self::L0, Self::L1, Self::L2, Self::L3, Self::L4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L0 => "l0",
            Self::L1 => "l1",
            Self::L2 => "l2",
            Self::L3 => "l3",
            Self::L4 => "l4",
        }
    }
}

impl fmt::Display for MigrationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dialect-neutral intermediate type system.
///
/// `Unknown` marks a type the registry refuses to map. It is a value, not an
/// error: adapters decide whether it aborts a table under strict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IrType {
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Real,
    Double,
    Char,
    Varchar,
    Text,
    Bytea,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Boolean,
    Uuid,
    Json,
    Jsonb,
    Unknown,
}

impl IrType {
    /// Canonical SQL spelling of the IR type.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Real => "REAL",
            Self::Double => "DOUBLE PRECISION",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::Text => "TEXT",
            Self::Bytea => "BYTEA",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::TimestampTz => "TIMESTAMP WITH TIME ZONE",
            Self::Boolean => "BOOLEAN",
            Self::Uuid => "UUID",
            Self::Json => "JSON",
            Self::Jsonb => "JSONB",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// An IR type with optional precision, scale and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TypeInfo {
    pub ir_type: IrType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
}

impl TypeInfo {
    pub fn new(ir_type: IrType) -> Self {
        Self {
            ir_type,
            precision: None,
            scale: None,
            length: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new(IrType::Unknown)
    }

    pub fn is_unknown(&self) -> bool {
        self.ir_type == IrType::Unknown
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }
}

/// One table column as introspected from a source engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    /// Column name, case-folded to lowercase at the adapter boundary.
    pub name: String,
    /// The source engine's native type string, preserved for reporting.
    pub native_type: String,
    pub type_info: TypeInfo,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// True iff the registry mapped the native type to `Unknown`.
    pub is_unsupported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKey {
    pub constraint_name: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
}

/// Full table shape. Column order is significant and must round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TableSchema {
    pub columns: Vec<Column>,
    pub pk: Vec<String>,
    pub fks: Vec<ForeignKey>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub indexes: Vec<IndexDef>,
}

impl TableSchema {
    /// Columns whose source type did not map into the IR.
    pub fn unsupported_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_unsupported)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Table,
    View,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ViewDependency {
    pub kind: DependencyKind,
    pub name: String,
}

/// A view with its definition text and its dependency set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ViewDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
    pub definition: String,
    pub dependencies: Vec<ViewDependency>,
}

impl ViewDef {
    /// Names of the views this view reads from.
    pub fn view_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::View)
            .map(|d| d.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    Function,
    Procedure,
    Package,
}

impl RoutineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Procedure => "procedure",
            Self::Package => "package",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    Immutable,
    Stable,
    Volatile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataAccess {
    /// No SQL statements at all.
    None,
    /// Contains SQL but touches no data.
    Contains,
    Reads,
    Modifies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    Invoker,
    Definer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParameterMode {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RoutineParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ParameterMode>,
    pub data_type: String,
}

/// A stored function, procedure or package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Routine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
    pub kind: RoutineKind,
    pub language: String,
    pub volatility: Volatility,
    pub data_access: DataAccess,
    pub security: SecurityMode,
    pub parameters: Vec<RoutineParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub body: String,
    pub definition: String,
    pub classification: Classification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TriggerScope {
    Row,
    Statement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
    pub table: String,
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,
    pub scope: TriggerScope,
    pub body: String,
    pub definition: String,
    pub classification: Classification,
}

/// Whether an object is in the automatically-migratable subset, and why not.
///
/// A denied classification always carries at least one reason code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Classification {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason_codes: Vec<ReasonCode>,
}

impl Classification {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason_codes: Vec::new(),
        }
    }

    pub fn denied(reason_codes: Vec<ReasonCode>) -> Self {
        debug_assert!(!reason_codes.is_empty());
        Self {
            allowed: false,
            reason_codes,
        }
    }
}

/// Enumerated denial/warning reasons. Free-text messages supplement these
/// but never replace them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ReasonCode {
    #[serde(rename = "not deterministic")]
    NotDeterministic,
    #[serde(rename = "modifies sql data")]
    ModifiesSqlData,
    #[serde(rename = "security definer")]
    SecurityDefiner,
    #[serde(rename = "dynamic sql")]
    DynamicSql,
    #[serde(rename = "volatile function")]
    VolatileFunction,
    #[serde(rename = "unsupported language")]
    UnsupportedLanguage,
    #[serde(rename = "after trigger")]
    AfterTrigger,
    #[serde(rename = "instead of trigger")]
    InsteadOfTrigger,
    #[serde(rename = "statement-level trigger")]
    StatementLevelTrigger,
    #[serde(rename = "window function")]
    WindowFunction,
    #[serde(rename = "set operation")]
    SetOperation,
    #[serde(rename = "common table expression")]
    CommonTableExpression,
    #[serde(rename = "outer join")]
    OuterJoin,
    #[serde(rename = "cross join")]
    CrossJoin,
    #[serde(rename = "subquery")]
    Subquery,
    #[serde(rename = "computed expression")]
    ComputedExpression,
    #[serde(rename = "aggregate")]
    Aggregate,
    #[serde(rename = "distinct")]
    DistinctClause,
    #[serde(rename = "group by")]
    GroupByClause,
    #[serde(rename = "having")]
    HavingClause,
    #[serde(rename = "order by")]
    OrderByClause,
    #[serde(rename = "non-equality join")]
    NonEqualityJoin,
    #[serde(rename = "oracle outer join syntax")]
    OracleOuterJoinSyntax,
    #[serde(rename = "dml in body")]
    DmlInBody,
    #[serde(rename = "loop or cursor")]
    LoopOrCursor,
    #[serde(rename = "exception handling")]
    ExceptionHandling,
    #[serde(rename = "conditional logic")]
    ConditionalLogic,
    #[serde(rename = "multiple statements")]
    MultipleStatements,
    #[serde(rename = "disallowed function")]
    DisallowedFunction,
    #[serde(rename = "missing new-column assignment")]
    MissingNewAssignment,
    #[serde(rename = "unknown function")]
    UnknownFunction,
    #[serde(rename = "unsupported type")]
    UnsupportedType,
    #[serde(rename = "package object")]
    PackageObject,
    #[serde(rename = "materialized view")]
    MaterializedView,
    #[serde(rename = "unparseable definition")]
    UnparseableDefinition,
    #[serde(rename = "complexity threshold exceeded")]
    ComplexityExceeded,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotDeterministic => "not deterministic",
            Self::ModifiesSqlData => "modifies sql data",
            Self::SecurityDefiner => "security definer",
            Self::DynamicSql => "dynamic sql",
            Self::VolatileFunction => "volatile function",
            Self::UnsupportedLanguage => "unsupported language",
            Self::AfterTrigger => "after trigger",
            Self::InsteadOfTrigger => "instead of trigger",
            Self::StatementLevelTrigger => "statement-level trigger",
            Self::WindowFunction => "window function",
            Self::SetOperation => "set operation",
            Self::CommonTableExpression => "common table expression",
            Self::OuterJoin => "outer join",
            Self::CrossJoin => "cross join",
            Self::Subquery => "subquery",
            Self::ComputedExpression => "computed expression",
            Self::Aggregate => "aggregate",
            Self::DistinctClause => "distinct",
            Self::GroupByClause => "group by",
            Self::HavingClause => "having",
            Self::OrderByClause => "order by",
            Self::NonEqualityJoin => "non-equality join",
            Self::OracleOuterJoinSyntax => "oracle outer join syntax",
            Self::DmlInBody => "dml in body",
            Self::LoopOrCursor => "loop or cursor",
            Self::ExceptionHandling => "exception handling",
            Self::ConditionalLogic => "conditional logic",
            Self::MultipleStatements => "multiple statements",
            Self::DisallowedFunction => "disallowed function",
            Self::MissingNewAssignment => "missing new-column assignment",
            Self::UnknownFunction => "unknown function",
            Self::UnsupportedType => "unsupported type",
            Self::PackageObject => "package object",
            Self::MaterializedView => "materialized view",
            Self::UnparseableDefinition => "unparseable definition",
            Self::ComplexityExceeded => "complexity threshold exceeded",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Higher-order database object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    View,
    MaterializedView,
    Procedure,
    Function,
    Trigger,
    Package,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::MaterializedView => "materialized_view",
            Self::Procedure => "procedure",
            Self::Function => "function",
            Self::Trigger => "trigger",
            Self::Package => "package",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit translation capability modes. The default is the safest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TranslateMode {
    /// Parse and report only. No SQL output, ever.
    #[default]
    Analyze,
    /// Emit deliberately non-functional DDL that fails loudly where possible.
    Stub,
    /// Translate proven-safe patterns; fall back to stub behaviour otherwise.
    SubsetTranslate,
}

impl TranslateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Stub => "stub",
            Self::SubsetTranslate => "subset_translate",
        }
    }
}

impl fmt::Display for TranslateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk assessment for translation operations.
///
/// The derived `Ord` goes from `Safe` up to `Critical`; warning ordering
/// sorts by descending severity (see [`crate::order`]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        Self::Safe,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A translation warning with a deterministic total order:
/// severity (most severe first), then object name, then message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Warning {
    pub severity: RiskLevel,
    pub object_name: String,
    pub message: String,
    pub reason: String,
}

impl Warning {
    pub fn new(
        severity: RiskLevel,
        object_name: impl Into<String>,
        message: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            object_name: object_name.into(),
            message: message.into(),
            reason: reason.into(),
        }
    }
}

impl Ord for Warning {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .severity
            .cmp(&self.severity)
            .then_with(|| self.object_name.cmp(&other.object_name))
            .then_with(|| self.message.cmp(&other.message))
    }
}

impl PartialOrd for Warning {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A manual action the operator must take. Deduplicated on
/// `(object_name, action)` and totally ordered by the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ManualStep {
    pub object_name: String,
    pub action: String,
    pub reason: String,
}

impl ManualStep {
    pub fn new(
        object_name: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            object_name: object_name.into(),
            action: action.into(),
            reason: reason.into(),
        }
    }
}

impl Ord for ManualStep {
    fn cmp(&self, other: &Self) -> Ordering {
        self.object_name
            .cmp(&other.object_name)
            .then_with(|| self.action.cmp(&other.action))
    }
}

impl PartialOrd for ManualStep {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The outcome of translating one object.
///
/// `sql_output` is `None` iff the result was produced under
/// [`TranslateMode::Analyze`]; that boundary is inviolable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranslationResult {
    pub object_type: ObjectType,
    pub object_name: String,
    pub mode: TranslateMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_output: Option<String>,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_steps: Vec<ManualStep>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TranslationResult {
    /// A fresh result with the conservative default risk.
    pub fn new(object_type: ObjectType, object_name: impl Into<String>, mode: TranslateMode) -> Self {
        Self {
            object_type,
            object_name: object_name.into(),
            mode,
            sql_output: None,
            risk_level: RiskLevel::High,
            warnings: Vec::new(),
            manual_steps: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// True iff the emitted SQL is a stub (contains the literal `STUB` token).
    pub fn is_stubbed(&self) -> bool {
        self.sql_output
            .as_deref()
            .is_some_and(|sql| sql.contains("STUB"))
    }
}
