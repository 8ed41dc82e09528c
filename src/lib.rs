//! Name to organization enrichment and classification.
//!
//! A searched name is resolved to candidate profile URLs (local directory
//! first, research oracle second); each candidate is enriched into an
//! organization with revenue, headcount and type, then classified.

pub mod attributes;
pub mod batch;
pub mod classify;
pub mod cli;
pub mod config;
pub mod directory;
pub mod export;
pub mod extract;
pub mod logger;
pub mod oracle;
pub mod organization;
pub mod pipeline;
pub mod profile;
pub mod record;

pub use classify::EntityClass;
pub use directory::{Directory, DirectoryCache};
pub use export::{export_results, ExportBundle};
pub use oracle::{ResearchOracle, ScriptedOracle};
pub use pipeline::{run_search, RunEvent, RunReport};
pub use record::{Diagnostic, ResultRecord, Stage};
