//! Output directory setup for a new run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs_extra::dir::CopyOptions;
use regex::{NoExpand, Regex};
use tracing::{debug, info};
use uuid::Uuid;
use wf_spec::Branding;

use crate::error::{CoreError, CoreResult};

/// Brand colors hard-coded in the scaffold's tailwind config.
const SCAFFOLD_PRIMARY: &str = "#6366F1";
const SCAFFOLD_SECONDARY: &str = "#10B981";

const TAILWIND_CONFIGS: &[&str] = &[
    "tailwind.config.js",
    "tailwind.config.ts",
    "tailwind.config.mjs",
    "tailwind.config.cjs",
];

/// Create `<base>/site-<timestamp>-<short id>`.
pub fn create_output_dir(base: &Path) -> CoreResult<PathBuf> {
    let short_id: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    let name = format!("site-{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), short_id);
    let dir = base.join(name);
    fs::create_dir_all(&dir)?;
    info!("Created output directory {:?}", dir);
    Ok(dir)
}

/// Copy the scaffold's contents into `dest`.
pub fn copy_scaffold(scaffold: &Path, dest: &Path) -> CoreResult<()> {
    if !scaffold.is_dir() {
        return Err(CoreError::Scaffold(format!(
            "scaffold directory not found: {}",
            scaffold.display()
        )));
    }
    fs::create_dir_all(dest)?;

    let mut options = CopyOptions::new();
    options.content_only = true;
    options.overwrite = true;
    let copied = fs_extra::dir::copy(scaffold, dest, &options)
        .map_err(|e| CoreError::Scaffold(e.to_string()))?;
    debug!(bytes = copied, "Scaffold copied from {:?}", scaffold);
    Ok(())
}

/// Replace the scaffold brand colors in the tailwind config with the
/// checklist branding. Returns whether a config file was rewritten.
pub fn apply_branding(dest: &Path, branding: &Branding) -> CoreResult<bool> {
    let Some(config) = TAILWIND_CONFIGS
        .iter()
        .map(|name| dest.join(name))
        .find(|path| path.is_file())
    else {
        debug!("No tailwind config found, branding not applied");
        return Ok(false);
    };

    let content = fs::read_to_string(&config)?;
    let primary = Regex::new(&format!("(?i){}", SCAFFOLD_PRIMARY))
        .map_err(|e| CoreError::Scaffold(e.to_string()))?;
    let secondary = Regex::new(&format!("(?i){}", SCAFFOLD_SECONDARY))
        .map_err(|e| CoreError::Scaffold(e.to_string()))?;

    let updated = primary.replace_all(&content, NoExpand(branding.primary_color()));
    let updated = secondary.replace_all(&updated, NoExpand(branding.secondary_color()));
    if updated == content {
        return Ok(false);
    }

    fs::write(&config, updated.as_bytes())?;
    info!(
        primary = branding.primary_color(),
        secondary = branding.secondary_color(),
        "Applied branding to {:?}",
        config
    );
    Ok(true)
}
