//! Scripted oracle client for tests.
//!
//! Responses are queued per role and handed out in order. A role can also
//! have a standing reply used once its queue is empty. Calls are recorded so
//! tests can inspect the task payloads the pipeline sent.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::client::LlmClient;
use crate::config::Provider;
use crate::error::{OracleError, OracleResult};
use crate::roles::{AgentRole, RoleDirective};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
    Stall(Duration),
}

/// One recorded oracle call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub role: AgentRole,
    pub directive: String,
    pub task: Value,
}

#[derive(Default)]
struct Script {
    queues: HashMap<AgentRole, VecDeque<Reply>>,
    standing: HashMap<AgentRole, Reply>,
    calls: Vec<RecordedCall>,
}

/// Oracle client that replays scripted replies.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    script: Arc<Mutex<Script>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw text reply for a role.
    pub fn reply_text(self, role: AgentRole, text: impl Into<String>) -> Self {
        self.push(role, Reply::Text(text.into()));
        self
    }

    /// Queue a JSON reply for a role.
    pub fn reply(self, role: AgentRole, value: Value) -> Self {
        self.push(role, Reply::Text(value.to_string()));
        self
    }

    /// Queue a transport failure for a role.
    pub fn fail(self, role: AgentRole, message: impl Into<String>) -> Self {
        self.push(role, Reply::Fail(message.into()));
        self
    }

    /// Queue a reply that never arrives within `delay`.
    pub fn stall(self, role: AgentRole, delay: Duration) -> Self {
        self.push(role, Reply::Stall(delay));
        self
    }

    /// Reply used for a role whenever its queue is empty.
    pub fn always(self, role: AgentRole, value: Value) -> Self {
        self.script
            .lock()
            .standing
            .insert(role, Reply::Text(value.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script.lock().calls.clone()
    }

    pub fn calls_for(&self, role: AgentRole) -> Vec<RecordedCall> {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| c.role == role)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, role: AgentRole) -> usize {
        self.script.lock().calls.iter().filter(|c| c.role == role).count()
    }

    fn push(&self, role: AgentRole, reply: Reply) {
        self.script
            .lock()
            .queues
            .entry(role)
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, directive: &RoleDirective, task: &Value) -> Option<Reply> {
        let mut script = self.script.lock();
        script.calls.push(RecordedCall {
            role: directive.role,
            directive: directive.text.clone(),
            task: task.clone(),
        });
        let queued = script
            .queues
            .get_mut(&directive.role)
            .and_then(VecDeque::pop_front);
        queued.or_else(|| script.standing.get(&directive.role).cloned())
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn execute(&self, directive: &RoleDirective, task: &Value) -> OracleResult<String> {
        match self.next_reply(directive, task) {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(OracleError::Http(message)),
            Some(Reply::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Err(OracleError::Timeout(delay.as_secs()))
            }
            None => Err(OracleError::Unscripted(directive.role.to_string())),
        }
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
