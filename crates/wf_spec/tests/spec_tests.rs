//! Integration tests for reading and validating checklist files.

use std::fs;

use tempfile::TempDir;
use wf_spec::{SpecError, SpecReader, SpecValidator};

const CHECKLIST_JSON: &str = r##"{
  "checklist": {
    "branding": { "colors": { "primary": "#1D4ED8", "secondary": "#F59E0B" } },
    "pages": [
      { "name": "Home", "path": "/", "sections": [
        { "component": "Hero", "props": { "headline": "Fresh bread daily" } },
        { "component": "Footer" }
      ]}
    ]
  }
}"##;

const CHECKLIST_YAML: &str = r##"
branding:
  colors:
    primary: "#1D4ED8"
pages:
  - name: Menu
    path: /menu
    sections:
      - component: MenuGrid
        props:
          columns: 3
"##;

const CHECKLIST_TOML: &str = r##"
[branding.colors]
primary = "#123"

[[pages]]
name = "About"
path = "/about"

[[pages.sections]]
component = "Story"
"##;

#[test]
fn test_read_json_request() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("site.json");
    fs::write(&path, CHECKLIST_JSON).unwrap();

    let request = SpecReader::read_request(&path).unwrap();
    assert_eq!(request.checklist.pages.len(), 1);
    assert_eq!(request.checklist.branding.primary_color(), "#1D4ED8");
    assert_eq!(
        request.checklist.pages[0].sections[0].props["headline"],
        "Fresh bread daily"
    );
}

#[test]
fn test_read_yaml_checklist() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("site.yaml");
    fs::write(&path, CHECKLIST_YAML).unwrap();

    let checklist = SpecReader::read_checklist(&path).unwrap();
    assert_eq!(checklist.component_names(), vec!["MenuGrid"]);
    assert!(SpecValidator::validate_checklist(&checklist).valid);
}

#[test]
fn test_read_toml_checklist() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("site.toml");
    fs::write(&path, CHECKLIST_TOML).unwrap();

    let checklist = SpecReader::read_checklist(&path).unwrap();
    assert_eq!(checklist.pages[0].path, "/about");
    assert_eq!(checklist.pages[0].sections[0].component, "Story");
}

#[test]
fn test_missing_file() {
    let result = SpecReader::read_request("/nonexistent/site.json");
    assert!(matches!(result, Err(SpecError::NotFound(_))));
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("site.txt");
    fs::write(&path, CHECKLIST_JSON).unwrap();

    let result = SpecReader::read_request(&path);
    assert!(matches!(result, Err(SpecError::UnsupportedFormat(_))));
}

#[test]
fn test_validation_reports_bad_pages_and_colors() {
    let request = SpecReader::parse_json(
        r##"{
          "branding": { "colors": { "primary": "blue" } },
          "pages": [
            { "name": "Home", "path": "home", "sections": [ { "component": "" } ] },
            { "name": "Dup", "path": "home", "sections": [] }
          ]
        }"##,
    )
    .unwrap();

    let result = SpecValidator::validate_checklist(&request.checklist);
    assert!(!result.valid);
    assert!(result.errors.iter().any(|e| e.contains("not a hex color")));
    assert!(result.errors.iter().any(|e| e.contains("must start with '/'")));
    assert!(result.errors.iter().any(|e| e.contains("Duplicate page path")));
    assert!(result.errors.iter().any(|e| e.contains("without a component name")));
}

#[test]
fn test_validation_requires_pages() {
    let request = SpecReader::parse_json(r#"{"branding": {"colors": {}}, "pages": []}"#).unwrap();
    let result = SpecValidator::validate_checklist(&request.checklist);
    assert!(!result.valid);
}
