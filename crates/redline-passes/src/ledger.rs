//! Synchronous pass bookkeeping.
//!
//! The ledger owns the checklist, the statuses, and the counters of the
//! running pass. It does no I/O and never waits; the coordinator drives it
//! and turns its answers into outputs.
//!
//! Counting works in two phases. While annotations are still being inserted
//! the pending counter does not exist, and resolution events for the running
//! pass go to an early-resolution accumulator. When insertion finishes the
//! counter is set to `inserted - early` and later events decrement it. The
//! pass completes when the counter reaches zero.

use std::collections::HashSet;

use redline_core::{ResolveAction, SmolStr};
use serde::{Deserialize, Serialize};
use smol_str::format_smolstr;
use web_time::Instant;

use crate::error::CoordinatorError;
use crate::pass::{Pass, PassStatus};

/// A human accepted or rejected one annotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionEvent {
    pub issue_id: SmolStr,
    pub pass_id: SmolStr,
    pub action: ResolveAction,
}

impl ResolutionEvent {
    pub fn new(issue_id: impl Into<SmolStr>, pass_id: impl Into<SmolStr>, action: ResolveAction) -> Self {
        Self {
            issue_id: issue_id.into(),
            pass_id: pass_id.into(),
            action,
        }
    }
}

/// What the ledger did with a resolution event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Not counted: wrong pass, unknown id, or already counted.
    Ignored,
    /// Counted into the early-resolution accumulator.
    Early,
    /// Counted against the pending counter.
    Counted { remaining: usize },
    /// The counter reached zero and the pass completed.
    Completed { pass_id: SmolStr },
}

/// Result of finishing insertion for the running pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertionOutcome {
    /// Nothing left to resolve; the pass completed.
    Completed { pass_id: SmolStr },
    /// Waiting on `remaining` resolutions.
    Waiting { remaining: usize },
}

/// Completed over enabled passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub enabled: usize,
}

impl Progress {
    /// Percentage complete, 0 when nothing is enabled.
    pub fn percent(&self) -> f64 {
        if self.enabled == 0 {
            0.0
        } else {
            self.completed as f64 / self.enabled as f64 * 100.0
        }
    }
}

/// Read-only view of the ledger.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub passes: Vec<Pass>,
    pub running: Option<SmolStr>,
    /// Pending count of the running pass, once insertion has finished.
    pub pending: Option<usize>,
    pub progress: Progress,
}

impl LedgerSnapshot {
    /// True while a pass is waiting on the human.
    pub fn is_awaiting_resolution(&self) -> bool {
        self.pending.is_some_and(|n| n > 0)
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_none()
    }

    pub fn status_of(&self, pass_id: &str) -> Option<&PassStatus> {
        self.passes.iter().find(|p| p.id == pass_id).map(|p| &p.status)
    }
}

#[derive(Debug)]
struct RunState {
    pass_id: SmolStr,
    inserting: bool,
    inserted: HashSet<SmolStr>,
    counted: HashSet<SmolStr>,
    early: usize,
    pending: Option<usize>,
    started: Instant,
}

impl RunState {
    fn new(pass_id: SmolStr) -> Self {
        Self {
            pass_id,
            inserting: true,
            inserted: HashSet::new(),
            counted: HashSet::new(),
            early: 0,
            pending: None,
            started: Instant::now(),
        }
    }
}

/// Checklist plus the bookkeeping of at most one running pass.
#[derive(Debug, Default)]
pub struct PassLedger {
    passes: Vec<Pass>,
    running: Option<RunState>,
    next_custom: u64,
}

impl PassLedger {
    pub fn new(passes: Vec<Pass>) -> Self {
        Self {
            passes,
            running: None,
            next_custom: 1,
        }
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn pass(&self, id: &str) -> Option<&Pass> {
        self.passes.iter().find(|p| p.id == id)
    }

    fn pass_mut(&mut self, id: &str) -> Result<&mut Pass, CoordinatorError> {
        self.passes
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoordinatorError::UnknownPass(id.into()))
    }

    /// Id of the running pass, if any.
    pub fn running(&self) -> Option<&SmolStr> {
        self.running.as_ref().map(|r| &r.pass_id)
    }

    /// Pending count of the running pass. None while idle or inserting.
    pub fn pending_count(&self) -> Option<usize> {
        self.running.as_ref().and_then(|r| r.pending)
    }

    /// Ids of enabled passes in checklist order.
    pub fn enabled_ids(&self) -> Vec<SmolStr> {
        self.passes
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn progress(&self) -> Progress {
        let enabled = self.passes.iter().filter(|p| p.enabled);
        Progress {
            completed: enabled.clone().filter(|p| p.status.is_completed()).count(),
            enabled: enabled.count(),
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            passes: self.passes.clone(),
            running: self.running().cloned(),
            pending: self.pending_count(),
            progress: self.progress(),
        }
    }

    /// Check that `id` could start now, without starting it.
    pub fn check_startable(&self, id: &str) -> Result<(), CoordinatorError> {
        if let Some(running) = self.running() {
            return Err(CoordinatorError::PassRunning {
                running: running.clone(),
            });
        }
        let pass = self
            .pass(id)
            .ok_or_else(|| CoordinatorError::UnknownPass(id.into()))?;
        if !pass.enabled {
            return Err(CoordinatorError::PassDisabled(id.into()));
        }
        if pass.status.is_failed() {
            return Err(CoordinatorError::PassFailed(id.into()));
        }
        Ok(())
    }

    /// Mark `id` running and open its bookkeeping.
    pub fn begin(&mut self, id: &str) -> Result<Pass, CoordinatorError> {
        self.check_startable(id)?;
        let pass = self.pass_mut(id)?;
        pass.status = PassStatus::Running;
        let pass = pass.clone();
        self.running = Some(RunState::new(pass.id.clone()));
        tracing::info!(target: "redline::pass", pass = %pass.id, command = %pass.command, "pass started");
        Ok(pass)
    }

    /// Record annotations inserted for the running pass.
    pub fn record_inserted<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = SmolStr>,
    {
        if let Some(run) = &mut self.running {
            run.inserted.extend(ids);
        }
    }

    /// Close insertion for the running pass and set its pending counter.
    ///
    /// Returns None when no pass is running.
    pub fn finish_insertion(&mut self) -> Option<InsertionOutcome> {
        let run = self.running.as_mut()?;
        let remaining = run.inserted.len().saturating_sub(run.early);
        tracing::debug!(
            target: "redline::pass",
            pass = %run.pass_id,
            inserted = run.inserted.len(),
            early = run.early,
            remaining,
            "insertion finished"
        );
        run.early = 0;
        run.inserting = false;
        run.pending = Some(remaining);

        if remaining == 0 {
            let pass_id = self.complete_running()?;
            Some(InsertionOutcome::Completed { pass_id })
        } else {
            Some(InsertionOutcome::Waiting { remaining })
        }
    }

    /// Count a resolution event.
    pub fn resolve(&mut self, event: &ResolutionEvent) -> ResolutionOutcome {
        let Some(run) = self.running.as_mut() else {
            tracing::debug!(target: "redline::pass", issue = %event.issue_id, "resolution while idle ignored");
            return ResolutionOutcome::Ignored;
        };
        if run.pass_id != event.pass_id
            || !run.inserted.contains(&event.issue_id)
            || !run.counted.insert(event.issue_id.clone())
        {
            tracing::debug!(
                target: "redline::pass",
                issue = %event.issue_id,
                pass = %event.pass_id,
                running = %run.pass_id,
                "resolution ignored"
            );
            return ResolutionOutcome::Ignored;
        }

        let pending = if run.inserting { None } else { run.pending };
        let Some(pending) = pending else {
            run.early += 1;
            return ResolutionOutcome::Early;
        };

        let remaining = pending.saturating_sub(1);
        run.pending = Some(remaining);
        if remaining > 0 {
            return ResolutionOutcome::Counted { remaining };
        }
        match self.complete_running() {
            Some(pass_id) => ResolutionOutcome::Completed { pass_id },
            None => ResolutionOutcome::Ignored,
        }
    }

    fn complete_running(&mut self) -> Option<SmolStr> {
        let run = self.running.take()?;
        let elapsed_ms = run.started.elapsed().as_secs_f64() * 1000.0;
        if let Some(pass) = self.passes.iter_mut().find(|p| p.id == run.pass_id) {
            pass.status = PassStatus::Completed;
        }
        tracing::info!(
            target: "redline::pass",
            pass = %run.pass_id,
            annotations = run.inserted.len(),
            elapsed_ms,
            "pass completed"
        );
        Some(run.pass_id)
    }

    /// Fail the running pass. Returns its id.
    pub fn fail(&mut self, message: impl Into<SmolStr>) -> Option<SmolStr> {
        let run = self.running.take()?;
        let message = message.into();
        tracing::warn!(target: "redline::pass", pass = %run.pass_id, %message, "pass failed");
        if let Some(pass) = self.passes.iter_mut().find(|p| p.id == run.pass_id) {
            pass.status = PassStatus::Failed(message);
        }
        Some(run.pass_id)
    }

    /// Abandon the running pass and return it to pending. Returns its id.
    pub fn cancel_running(&mut self) -> Option<SmolStr> {
        let run = self.running.take()?;
        tracing::warn!(target: "redline::pass", pass = %run.pass_id, "pass cancelled");
        if let Some(pass) = self.passes.iter_mut().find(|p| p.id == run.pass_id) {
            pass.status = PassStatus::Pending;
        }
        Some(run.pass_id)
    }

    /// Reset a failed pass to pending.
    pub fn retry(&mut self, id: &str) -> Result<(), CoordinatorError> {
        let pass = self.pass_mut(id)?;
        if !pass.status.is_failed() {
            return Err(CoordinatorError::NotRetryable(id.into()));
        }
        pass.status = PassStatus::Pending;
        Ok(())
    }

    /// Reset every idle pass to pending, ready for a new run.
    pub fn reset_statuses(&mut self) {
        let running = self.running().cloned();
        for pass in &mut self.passes {
            if running.as_ref() != Some(&pass.id) {
                pass.status = PassStatus::Pending;
            }
        }
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), CoordinatorError> {
        self.pass_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Move a pass to `index` in the checklist, clamped to the end.
    pub fn move_pass(&mut self, id: &str, index: usize) -> Result<(), CoordinatorError> {
        let from = self
            .passes
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CoordinatorError::UnknownPass(id.into()))?;
        let pass = self.passes.remove(from);
        let index = index.min(self.passes.len());
        self.passes.insert(index, pass);
        Ok(())
    }

    /// Append a custom pass. Returns its id.
    pub fn add_custom(&mut self, name: &str, command: Option<&str>) -> Result<SmolStr, CoordinatorError> {
        if name.trim().is_empty() {
            return Err(CoordinatorError::EmptyName);
        }
        let id = loop {
            let candidate = format_smolstr!("custom-{}", self.next_custom);
            self.next_custom += 1;
            if self.pass(&candidate).is_none() {
                break candidate;
            }
        };
        self.passes.push(Pass::custom(id.clone(), name, command));
        Ok(id)
    }

    /// Remove a custom pass. Built-in and running passes stay.
    pub fn remove_custom(&mut self, id: &str) -> Result<Pass, CoordinatorError> {
        let index = self
            .passes
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CoordinatorError::UnknownPass(id.into()))?;
        if !self.passes[index].custom {
            return Err(CoordinatorError::NotCustom(id.into()));
        }
        if self.running().is_some_and(|r| r == id) {
            return Err(CoordinatorError::PassRunning { running: id.into() });
        }
        Ok(self.passes.remove(index))
    }
}
