//! Data models for the website checklist.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default primary brand color used when a checklist omits one.
pub const DEFAULT_PRIMARY_COLOR: &str = "#000000";

/// Default secondary brand color used when a checklist omits one.
pub const DEFAULT_SECONDARY_COLOR: &str = "#FFFFFF";

/// A request to generate one website.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub checklist: Checklist,
}

impl GenerateRequest {
    pub fn new(checklist: Checklist) -> Self {
        Self { checklist }
    }
}

/// Structured description of the site to build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checklist {
    pub branding: Branding,
    pub pages: Vec<PageSpec>,
}

impl Checklist {
    /// All distinct component names referenced by page sections, in first-seen order.
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for section in self.pages.iter().flat_map(|p| p.sections.iter()) {
            if !names.iter().any(|n| n == &section.component) {
                names.push(section.component.clone());
            }
        }
        names
    }

    /// Serialize the checklist as an opaque JSON value for oracles and the ledger.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Brand identity of the site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Branding {
    /// Named colors, e.g. `primary` and `secondary`, as hex strings.
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

impl Branding {
    pub fn primary_color(&self) -> &str {
        self.colors
            .get("primary")
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_PRIMARY_COLOR)
    }

    pub fn secondary_color(&self) -> &str {
        self.colors
            .get("secondary")
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SECONDARY_COLOR)
    }
}

/// One page of the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSpec {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A section of a page, rendered by one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub component: String,
    #[serde(default)]
    pub props: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Checklist {
        serde_json::from_value(serde_json::json!({
            "branding": { "colors": { "primary": "#112233" } },
            "pages": [
                { "name": "Home", "path": "/", "sections": [
                    { "component": "Hero", "props": { "title": "Hi" } },
                    { "component": "Footer" }
                ]},
                { "name": "Contact", "path": "/contact", "sections": [
                    { "component": "ContactForm" },
                    { "component": "Footer" }
                ]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_component_names_are_deduplicated_in_order() {
        assert_eq!(sample().component_names(), vec!["Hero", "Footer", "ContactForm"]);
    }

    #[test]
    fn test_branding_defaults() {
        let checklist = sample();
        assert_eq!(checklist.branding.primary_color(), "#112233");
        assert_eq!(checklist.branding.secondary_color(), DEFAULT_SECONDARY_COLOR);
    }
}
