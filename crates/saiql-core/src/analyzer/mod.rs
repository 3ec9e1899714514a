//! Dialect-aware static analyzers over object DDL text.
//!
//! Analyzers classify; they never execute. Each produces a pattern from a
//! small whitelist, a risk score and enumerated denial reasons.

pub mod functions;
pub mod package;
pub mod trigger;
pub mod view;

pub use functions::{FunctionClass, FunctionDependencyAnalysis};
pub use package::{PackageAnalysis, PackageAnalyzer, PackageMember};
pub use trigger::{TriggerAnalysis, TriggerAnalyzer, TriggerPattern};
pub use view::{ViewAnalysis, ViewAnalyzer, ViewPattern};
