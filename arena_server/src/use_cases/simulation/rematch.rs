// Rematch coordinator: post-match readiness votes and the countdown to a fresh room.

use super::{COLOR_INFO, Simulation};
use crate::domain::entity::SessionId;
use crate::domain::state::Phase;
use crate::use_cases::types::RosterEntry;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RematchError {
    /// Votes only count once the match is over.
    NotEnded,
    UnknownSession,
}

impl Simulation {
    pub fn mark_ready(&mut self, session_id: SessionId) -> Result<(), RematchError> {
        if self.state.phase != Phase::Ended {
            return Err(RematchError::NotEnded);
        }
        let Some(session) = self.sessions.get(&session_id) else {
            return Err(RematchError::UnknownSession);
        };
        let username = session.username.clone();
        let already = self
            .state
            .rematch_ready
            .insert(session_id, true)
            .unwrap_or(false);
        if !already {
            self.notify(None, format!("{username} is ready for a rematch"), COLOR_INFO);
        }
        self.refresh_rematch_readiness();
        Ok(())
    }

    /// Starts the countdown the first time every connected session is ready. A started
    /// countdown keeps running.
    pub(crate) fn refresh_rematch_readiness(&mut self) {
        if self.state.phase != Phase::Ended || self.state.rematch_countdown.is_some() {
            return;
        }
        if self.sessions.is_empty() {
            return;
        }
        let all_ready = self
            .sessions
            .keys()
            .all(|id| self.state.rematch_ready.get(id).copied().unwrap_or(false));
        if all_ready {
            let seconds = self.tuning.phase.rematch_countdown_secs;
            info!(sessions = self.sessions.len(), seconds, "rematch countdown started");
            self.state.rematch_countdown = Some(seconds);
        }
    }

    pub(crate) fn tick_rematch(&mut self, dt_secs: f64) {
        if self.rematch_requested {
            return;
        }
        let Some(left) = self.state.rematch_countdown.as_mut() else {
            return;
        };
        *left = (*left - dt_secs).max(0.0);
        if *left <= 1e-9 {
            self.rematch_requested = true;
            info!(tick = self.tick, "rematch requested");
        }
    }

    /// Usernames and teams of everyone still connected.
    pub(crate) fn roster_snapshot(&self) -> Vec<RosterEntry> {
        self.sessions
            .values()
            .map(|s| RosterEntry {
                username: s.username.clone(),
                team: s.team,
            })
            .collect()
    }

    pub fn rematch_requested(&self) -> bool {
        self.rematch_requested
    }
}
