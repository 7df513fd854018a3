//! Report rendering and export.

pub mod export;
pub mod generator;

pub use export::{write_csv, Exportable};
pub use generator::{generate_json_report, MarkdownReport};
