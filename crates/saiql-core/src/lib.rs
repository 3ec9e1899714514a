pub mod analyzer;
pub mod order;
pub mod registry;
pub mod report;
pub mod translator;
pub mod types;

// Re-export main types and functions
pub use registry::{classify_conversion, map_to_ir, parse_type_string, render_type, ConversionClass};
pub use report::{ReportCounts, ReportStep, ReportWarning, RiskSummary, TranslationReport};
pub use translator::Translator;

// Re-export types explicitly
pub use types::{
    Classification,
    Column,
    DataAccess,
    DependencyKind,
    Dialect,
    ForeignKey,
    IndexDef,
    IrType,
    ManualStep,
    MigrationLevel,
    ObjectType,
    ParameterMode,
    ReasonCode,
    RiskLevel,
    Routine,
    RoutineKind,
    RoutineParameter,
    SecurityMode,
    TableSchema,
    TranslateMode,
    TranslationResult,
    Trigger,
    TriggerEvent,
    TriggerScope,
    TriggerTiming,
    TypeInfo,
    UniqueConstraint,
    ViewDef,
    ViewDependency,
    Volatility,
    Warning,
};
