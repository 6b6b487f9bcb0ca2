//! Agent rename: validation, submission and failure classification

use thiserror::Error;

use crate::gateway::Gateway;
use crate::types::{AgentWithCount, DashError};

/// Alert shown when an agent list read is refused
pub const READ_PERMISSION_ALERT: &str = "Permission denied. Please contact your administrator.";

/// User-facing rename failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenameError {
    #[error("Please enter a valid name")]
    InvalidName,

    #[error("Permission denied. You do not have permission to update this agent.")]
    PermissionDenied,

    #[error("Failed to update agent. Please try again.")]
    Failed,
}

/// Gateway messages mentioning permissions or row-level policies
pub fn is_permission_error(error: &DashError) -> bool {
    let message = error.message().to_lowercase();
    message.contains("permission") || message.contains("policy")
}

fn classify(error: &DashError) -> RenameError {
    if is_permission_error(error) {
        RenameError::PermissionDenied
    } else {
        RenameError::Failed
    }
}

/// Trim and submit a new agent name. Returns the name as stored.
pub fn rename_agent(
    gateway: &dyn Gateway,
    agent_id: i64,
    new_name: &str,
) -> std::result::Result<String, RenameError> {
    let name = new_name.trim();
    if name.is_empty() {
        return Err(RenameError::InvalidName);
    }

    gateway.update_agent_name(agent_id, name).map_err(|e| {
        tracing::warn!(agent_id, error = %e, "Agent rename failed");
        classify(&e)
    })?;
    Ok(name.to_string())
}

/// Reflect a successful rename in an already loaded list
pub fn apply_rename(agents: &mut [AgentWithCount], agent_id: i64, new_name: &str) -> bool {
    let mut changed = false;
    for row in agents.iter_mut().filter(|a| a.agent.id == agent_id) {
        row.agent.full_name = new_name.to_string();
        changed = true;
    }
    changed
}

/// Rename dialog state. Only one submission may be in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameForm {
    pub agent_id: i64,
    pub original: String,
    pub input: String,
    saving: bool,
}

impl RenameForm {
    pub fn new(agent_id: i64, current_name: &str) -> Self {
        Self {
            agent_id,
            original: current_name.to_string(),
            input: current_name.to_string(),
            saving: false,
        }
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Save is offered only for a non-blank name while idle
    pub fn can_submit(&self) -> bool {
        !self.saving && !self.input.trim().is_empty()
    }

    /// Mark the form as saving. Returns false when a save is already running.
    pub fn begin_submit(&mut self) -> bool {
        if self.saving {
            return false;
        }
        self.saving = true;
        true
    }

    pub fn finish(&mut self) {
        self.saving = false;
    }

    pub fn push(&mut self, c: char) {
        if !self.saving {
            self.input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if !self.saving {
            self.input.pop();
        }
    }
}
