//! Proposal documents for roofing estimates.
//!
//! Fills a Word template with a project's details and line-item total,
//! hands the result out as a download and cleans up afterwards.
//!
//! Modules:
//! - `placeholders`: template tokens and their resolved values
//! - `docx`: template filling (zip I/O, XML tree, substitution, traversal)
//! - `generator`: template → uniquely named output file
//! - `janitor`: deletion of generated files after delivery and on a timer
//! - `project`, `catalog`, `scope`: project records, item prices, scope text
//! - `server`: HTTP endpoints
//!
//! Binaries:
//! - `proposal-server`: HTTP service with the background sweeper
//! - `proposal-gen`: offline generation and cleanup from the shell

pub mod catalog;
pub mod docx;
pub mod generator;
pub mod janitor;
pub mod placeholders;
pub mod project;
pub mod scope;
pub mod server;

pub use generator::{DocumentGenerator, GeneratedDocument, GenerationError, GeneratorConfig};
pub use janitor::{CleanupGuard, Janitor, JanitorConfig};
pub use placeholders::{Field, PlaceholderMap};
pub use project::{Item, Project, ProjectStore};
