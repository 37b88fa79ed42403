//! # wf_spec
//!
//! Input models for Website Factory.
//!
//! A generation run starts from a [`Checklist`]: the site's branding, its
//! pages and the sections each page is built from. The orchestrator turns the
//! checklist into a [`ProjectPlan`] of [`Task`]s, each one a unit of
//! generation work with a kind, a name and a kind-specific payload.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wf_spec::{SpecReader, SpecValidator};
//!
//! let request = SpecReader::read_request("site.json").unwrap();
//! let result = SpecValidator::validate_checklist(&request.checklist);
//! if !result.valid {
//!     for error in &result.errors {
//!         eprintln!("Error: {}", error);
//!     }
//! }
//! ```

pub mod error;
pub mod models;
pub mod plan;
pub mod reader;
pub mod validator;

pub use error::{SpecError, SpecResult};
pub use models::{Branding, Checklist, GenerateRequest, PageSpec, Section};
pub use plan::{ProjectPlan, Task, TaskKind};
pub use reader::SpecReader;
pub use validator::{SpecValidator, ValidationResult};
