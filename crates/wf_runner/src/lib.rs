//! # wf_runner
//!
//! Build and test command execution for Website Factory.
//!
//! Every verification gate of a generation run (dependency install, build,
//! unit tests, end-to-end tests, quality gate) goes through a
//! [`CommandRunner`]: run a shell command in a working directory under a
//! timeout, capture stdout and stderr, and report whether it exited cleanly.
//!
//! # Features
//!
//! - **Shell Runner**: `sh -c` (or `cmd /C` on Windows) via `tokio::process`
//! - **Timeouts**: commands that overrun are killed and reported as failed
//! - **Toolchain Presets**: the command set for a Next.js + Express stack
//! - **Mock Runner**: scripted responses for tests without subprocesses
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use wf_runner::{CommandRunner, RunConfig, ShellRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ShellRunner::new();
//!     let result = runner
//!         .run("npm run build", Path::new("output/site"), &RunConfig::default().timeout(600))
//!         .await?;
//!     println!("Build passed: {}", result.success());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod runner;
pub mod shell;
pub mod toolchain;

pub use config::RunConfig;
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use runner::{CommandRunner, ExecutionResult};
pub use shell::ShellRunner;
pub use toolchain::{presets, Toolchain};
