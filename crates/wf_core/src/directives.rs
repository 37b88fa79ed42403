//! Role directives with stored prompt overrides applied.

use tracing::{info, warn};
use wf_kb::PromptStore;
use wf_oracle::{AgentRole, DirectiveSet};

/// Built-in directives, replaced by the active stored prompt of each role.
/// When the store cannot be read, the built-ins are used as they are.
pub fn load_directives(prompts: &dyn PromptStore) -> DirectiveSet {
    let mut directives = DirectiveSet::builtin();
    for role in AgentRole::all() {
        match prompts.active_prompt(role.as_str()) {
            Ok(Some(prompt)) => {
                info!(role = %role, version = prompt.version, "Using stored prompt");
                directives = directives.with_override(*role, prompt.prompt_text);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Prompt overrides unavailable, using built-in directives: {}", e);
                return DirectiveSet::builtin();
            }
        }
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_kb::{KnowledgeBase, OfflineStore};

    #[test]
    fn test_stored_prompt_overrides_role() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        kb.set_prompt("debugger", "Find the root cause.").unwrap();

        let directives = load_directives(&kb);
        assert!(directives.is_overridden(AgentRole::Debugger));
        assert!(!directives.is_overridden(AgentRole::Pm));
        assert_eq!(
            directives.directive(AgentRole::Debugger).text,
            "Find the root cause."
        );
    }

    #[test]
    fn test_offline_store_keeps_builtins() {
        let directives = load_directives(&OfflineStore::new("no database"));
        for role in AgentRole::all() {
            assert!(!directives.is_overridden(*role));
        }
    }
}
