//! Fixed-size pool of agents (servers)

use crate::error::{CallCenterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    /// Serving the call with this id
    Busy(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: usize,
    pub status: AgentStatus,
}

/// Agents numbered `1..=N`
///
/// Assignment never blocks: it either hands out the lowest-numbered idle agent or
/// reports that none is free.
#[derive(Debug, Clone)]
pub struct AgentPool {
    agents: Vec<Agent>,
}

impl AgentPool {
    pub fn new(agent_count: usize) -> Self {
        AgentPool {
            agents: (1..=agent_count)
                .map(|id| Agent {
                    id,
                    status: AgentStatus::Idle,
                })
                .collect(),
        }
    }

    /// Mark the lowest-numbered idle agent busy with `call_id`
    pub fn try_assign(&mut self, call_id: usize) -> Option<usize> {
        let agent = self
            .agents
            .iter_mut()
            .find(|agent| agent.status == AgentStatus::Idle)?;
        agent.status = AgentStatus::Busy(call_id);
        Some(agent.id)
    }

    /// Return a busy agent to the pool, yielding the call it was serving
    pub fn release(&mut self, agent_id: usize) -> Result<usize> {
        let agent = agent_id
            .checked_sub(1)
            .and_then(|index| self.agents.get_mut(index))
            .ok_or(CallCenterError::NotBusy { agent_id })?;
        match agent.status {
            AgentStatus::Busy(call_id) => {
                agent.status = AgentStatus::Idle;
                Ok(call_id)
            }
            AgentStatus::Idle => Err(CallCenterError::NotBusy { agent_id }),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn busy_count(&self) -> usize {
        self.agents
            .iter()
            .filter(|agent| agent.status != AgentStatus::Idle)
            .count()
    }

    pub fn idle_count(&self) -> usize {
        self.len() - self.busy_count()
    }
}
