pub mod bundle;
pub mod error;
pub mod redact;
pub mod reports;
pub mod run;

mod emit;

// Re-export the harness surface
pub use bundle::write_bundle;
pub use error::HarnessError;
pub use redact::{is_clean, scrub};
pub use reports::{
    LevelParity, LevelValidation, LimitationsReport, ParitySummary, ParityVerdict,
    ValidationReport,
};
pub use run::{
    DdlArtifact, LevelResult, LevelStatus, Limitation, RunBundle, RunHarness, RunOptions,
    RunStatus,
};
