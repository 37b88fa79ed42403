//! Checklist validation.

use regex::Regex;

use crate::models::Checklist;

/// Validation result with details.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Validator for website checklists.
pub struct SpecValidator;

impl SpecValidator {
    /// Validate a checklist before a run starts.
    pub fn validate_checklist(checklist: &Checklist) -> ValidationResult {
        let mut result = ValidationResult::new();

        let hex = Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").ok();
        for (name, color) in &checklist.branding.colors {
            let ok = hex.as_ref().map_or(true, |re| re.is_match(color));
            if !ok {
                result.add_error(format!("Branding color '{}' is not a hex color: {}", name, color));
            }
        }
        if !checklist.branding.colors.contains_key("primary") {
            result.add_warning("Branding has no primary color, a default will be used");
        }

        if checklist.pages.is_empty() {
            result.add_error("Checklist must declare at least one page");
        }

        let mut seen_paths: Vec<&str> = Vec::new();
        for page in &checklist.pages {
            if page.name.trim().is_empty() {
                result.add_error(format!("Page at '{}' has an empty name", page.path));
            }
            if !page.path.starts_with('/') {
                result.add_error(format!(
                    "Page '{}' path must start with '/': {}",
                    page.name, page.path
                ));
            }
            if seen_paths.contains(&page.path.as_str()) {
                result.add_error(format!("Duplicate page path: {}", page.path));
            }
            seen_paths.push(&page.path);

            if page.sections.is_empty() {
                result.add_warning(format!("Page '{}' has no sections", page.name));
            }
            for section in &page.sections {
                if section.component.trim().is_empty() {
                    result.add_error(format!(
                        "Page '{}' has a section without a component name",
                        page.name
                    ));
                }
            }
        }

        if checklist.component_names().is_empty() && !checklist.pages.is_empty() {
            result.add_error("Checklist does not reference any component");
        }

        result
    }
}
