use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::Connector;
use crate::error::{GameError, Result};

/// Replays canned replies instead of calling a provider.
///
/// Used for offline runs (`"provider": "scripted"` in the roster) and in tests. Every prompt it
/// receives is kept, see [`ScriptedConnector::prompt_log`].
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    replies: VecDeque<String>,
    cycle: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConnector {
    /// Answer with `replies` in order, then fail.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            cycle: false,
            prompts: Arc::default(),
        }
    }

    /// Answer with `replies` in order, starting over when exhausted.
    pub fn cycling<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cycle: true,
            ..Self::new(replies)
        }
    }

    /// Shared handle on the prompts received so far. Stays valid after the connector is moved
    /// into an agent.
    pub fn prompt_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }
}

impl Connector for ScriptedConnector {
    fn send(&mut self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let reply = self.replies.pop_front().ok_or_else(|| GameError::FatalProvider {
            provider: "scripted".to_string(),
            message: "script exhausted".to_string(),
        })?;
        if self.cycle {
            self.replies.push_back(reply.clone());
        }
        Ok(reply)
    }
}
