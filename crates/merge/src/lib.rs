//! `jaws-merge`: Sector PiN/Severity merge and analytics engine.
//!
//! Pure engine crate: receives pre-loaded tables, validates join keys,
//! left-joins every ready sector onto the template and derives per-row
//! rankings and threshold flags. No CLI or IO dependencies.

pub mod analytics;
pub mod audit;
pub mod columns;
pub mod config;
pub mod engine;
pub mod error;
pub mod formulas;
pub mod integrity;
pub mod join;
pub mod model;
pub mod value;

pub use audit::{AuditEvent, AuditLog, AuditSink, NullSink};
pub use columns::{ColumnCategory, ColumnFormat, ColumnInfo};
pub use config::{MergeConfig, MergeManifest, ThresholdConfig};
pub use engine::{merge, MergeState, Merger};
pub use error::MergeError;
pub use model::{MergeInput, MergeOutput, Row, SectorDataset, TemplateDataset, UnmatchedReport};
pub use value::CellValue;
