//! Sequential pass coordinator.
//!
//! One [`PassCoordinator`] task owns the document, the checklist and the
//! bookkeeping of the running pass. Everything else talks to it through a
//! [`CoordinatorHandle`], whose commands land in the coordinator's inbox,
//! and listens to [`CoordinatorOutput`]s on the output channel.
//!
//! A pass runs in two stages. First the document is flattened, analyzed and
//! annotated. While the analyzer call is in flight the inbox is still
//! served, so resolutions, snapshots and cancellations are never stuck
//! behind a slow analyzer. Then the pass waits, with no timeout, until every
//! annotation it inserted has been resolved. Only then does the next pass
//! in the sequence start.

use std::collections::VecDeque;
use std::sync::Arc;

use n0_future::FutureExt;
use n0_future::boxed::BoxStream;
use n0_future::stream;
use redline_core::{
    AnnotationOwner, Document, FlatText, IdSource, Issue, ResolveAction, SmolStr, UuidIds,
    annotate, flatten, flatten_block, map_issues, resolve_annotation, strip_annotations,
};
use smol_str::ToSmolStr;
use tokio::sync::{mpsc, oneshot};

use crate::analyzer::Analyzer;
use crate::config::{AnalysisScope, EngineConfig};
use crate::error::{AnalysisError, CoordinatorError};
use crate::ledger::{InsertionOutcome, LedgerSnapshot, PassLedger, ResolutionEvent, ResolutionOutcome};
use crate::pass::{Pass, PassStatus};

/// Input messages to the coordinator.
#[derive(Debug)]
pub enum Command {
    /// Reset statuses and run every enabled pass in checklist order.
    RunAll,
    /// Run one pass out of sequence.
    RunPass(SmolStr),
    /// A human resolved an annotation.
    Resolve(ResolutionEvent),
    /// Swap in a document edited elsewhere. Cancels a running pass. Markers
    /// left in the new document stay resolvable.
    ReplaceDocument(Document),
    SetEnabled { id: SmolStr, enabled: bool },
    MovePass { id: SmolStr, index: usize },
    AddCustom { name: SmolStr, command: Option<SmolStr> },
    RemoveCustom(SmolStr),
    /// Reset a failed pass to pending.
    Retry(SmolStr),
    Snapshot(oneshot::Sender<CoordinatorSnapshot>),
    Shutdown,
}

/// Who caused a document change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeOrigin {
    /// A pass inserted annotations.
    Annotation,
    /// An annotation was accepted or rejected.
    Resolution,
    /// A failed pass's annotations were reverted.
    Rollback,
    /// The caller replaced the document.
    External,
}

impl ChangeOrigin {
    /// Whether the change came from the engine itself. Callers should not
    /// start new analysis in response to these.
    pub fn is_internal(&self) -> bool {
        !matches!(self, Self::External)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annotation => "annotation",
            Self::Resolution => "resolution",
            Self::Rollback => "rollback",
            Self::External => "external",
        }
    }
}

/// How a run-all sequence ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Every enabled pass completed.
    Completed,
    /// The named pass failed and the rest were not started.
    Failed(SmolStr),
    /// The named pass was cancelled by a document replacement.
    Cancelled(SmolStr),
}

/// Output messages from the coordinator.
#[derive(Clone, Debug)]
pub enum CoordinatorOutput {
    PassStatusChanged { pass_id: SmolStr, status: PassStatus },
    DocumentChanged { document: Document, origin: ChangeOrigin },
    /// A command was refused.
    Rejected { error: CoordinatorError },
    PassCancelled { pass_id: SmolStr },
    SequenceFinished { outcome: SequenceOutcome },
}

/// Ledger view plus the current document.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinatorSnapshot {
    pub ledger: LedgerSnapshot,
    pub document: Document,
}

/// Cloneable sender for coordinator commands.
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    pub fn send(&self, command: Command) -> Result<(), CoordinatorError> {
        self.tx.send(command).map_err(|_| CoordinatorError::ChannelClosed)
    }

    pub fn run_all(&self) -> Result<(), CoordinatorError> {
        self.send(Command::RunAll)
    }

    pub fn run_pass(&self, id: impl Into<SmolStr>) -> Result<(), CoordinatorError> {
        self.send(Command::RunPass(id.into()))
    }

    pub fn resolve(&self, event: ResolutionEvent) -> Result<(), CoordinatorError> {
        self.send(Command::Resolve(event))
    }

    pub fn accept(
        &self,
        issue_id: impl Into<SmolStr>,
        pass_id: impl Into<SmolStr>,
    ) -> Result<(), CoordinatorError> {
        self.resolve(ResolutionEvent::new(issue_id, pass_id, ResolveAction::Applied))
    }

    pub fn reject(
        &self,
        issue_id: impl Into<SmolStr>,
        pass_id: impl Into<SmolStr>,
    ) -> Result<(), CoordinatorError> {
        self.resolve(ResolutionEvent::new(issue_id, pass_id, ResolveAction::Rejected))
    }

    pub fn replace_document(&self, document: Document) -> Result<(), CoordinatorError> {
        self.send(Command::ReplaceDocument(document))
    }

    pub fn set_enabled(&self, id: impl Into<SmolStr>, enabled: bool) -> Result<(), CoordinatorError> {
        self.send(Command::SetEnabled {
            id: id.into(),
            enabled,
        })
    }

    pub fn move_pass(&self, id: impl Into<SmolStr>, index: usize) -> Result<(), CoordinatorError> {
        self.send(Command::MovePass {
            id: id.into(),
            index,
        })
    }

    pub fn add_custom(
        &self,
        name: impl Into<SmolStr>,
        command: Option<SmolStr>,
    ) -> Result<(), CoordinatorError> {
        self.send(Command::AddCustom {
            name: name.into(),
            command,
        })
    }

    pub fn remove_custom(&self, id: impl Into<SmolStr>) -> Result<(), CoordinatorError> {
        self.send(Command::RemoveCustom(id.into()))
    }

    pub fn retry(&self, id: impl Into<SmolStr>) -> Result<(), CoordinatorError> {
        self.send(Command::Retry(id.into()))
    }

    /// Ask for the current state. Answered even while a pass is analyzing.
    pub async fn snapshot(&self) -> Result<CoordinatorSnapshot, CoordinatorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        rx.await.map_err(|_| CoordinatorError::ChannelClosed)
    }

    pub fn shutdown(&self) -> Result<(), CoordinatorError> {
        self.send(Command::Shutdown)
    }
}

/// Adapt the output receiver into a stream.
pub fn output_stream(rx: mpsc::UnboundedReceiver<CoordinatorOutput>) -> BoxStream<CoordinatorOutput> {
    let stream = stream::unfold(rx, |mut rx| async move {
        let output = rx.recv().await?;
        Some((output, rx))
    });
    Box::pin(stream)
}

/// What the coordinator loop should do after a command.
enum Step {
    Idle,
    /// Start the next queued pass, if nothing is running.
    Advance,
    /// The running pass was cancelled.
    Cancelled,
    Stop,
}

/// How running one pass ended.
enum PassRun {
    Completed,
    Waiting,
    Failed,
    Cancelled,
    Skipped,
    Stopped,
}

/// Why annotation stopped before finishing.
enum Interrupt {
    Failed(AnalysisError),
    Cancelled,
    Stopped,
}

/// Helper enum for racing the analyzer against the inbox.
enum RaceResult {
    Analysis(Result<Vec<Issue>, AnalysisError>),
    Inbox(Option<Command>),
}

/// The coordinator task state.
pub struct PassCoordinator<A> {
    config: EngineConfig,
    ledger: PassLedger,
    document: Document,
    analyzer: Arc<A>,
    ids: Box<dyn IdSource + Send>,
    inbox: mpsc::UnboundedReceiver<Command>,
    outputs: mpsc::UnboundedSender<CoordinatorOutput>,
    queue: VecDeque<SmolStr>,
    in_sequence: bool,
}

impl<A> PassCoordinator<A>
where
    A: Analyzer + Send + Sync + 'static,
{
    /// Build a coordinator. The checklist comes from `config.passes`.
    ///
    /// Returns the coordinator (drive it with [`run`](Self::run)), a handle
    /// for sending commands, and the output receiver.
    pub fn new(
        mut config: EngineConfig,
        document: Document,
        analyzer: A,
    ) -> (Self, CoordinatorHandle, mpsc::UnboundedReceiver<CoordinatorOutput>) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let (outputs, output_rx) = mpsc::unbounded_channel();
        let passes = std::mem::take(&mut config.passes);

        let coordinator = Self {
            config,
            ledger: PassLedger::new(passes),
            document,
            analyzer: Arc::new(analyzer),
            ids: Box::new(UuidIds),
            inbox,
            outputs,
            queue: VecDeque::new(),
            in_sequence: false,
        };
        (coordinator, CoordinatorHandle { tx }, output_rx)
    }

    /// Use a different id generator for inserted annotations.
    pub fn with_ids(mut self, ids: impl IdSource + Send + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Process commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(
            target: "redline::coordinator",
            passes = self.ledger.passes().len(),
            scope = ?self.config.scope,
            "coordinator started"
        );

        while let Some(command) = self.inbox.recv().await {
            tracing::trace!(target: "redline::coordinator", ?command, "received command");
            match self.apply(command) {
                Step::Idle | Step::Cancelled => {}
                Step::Advance => {
                    if !self.advance().await {
                        break;
                    }
                }
                Step::Stop => break,
            }
        }

        tracing::info!(target: "redline::coordinator", "coordinator stopped");
    }

    /// Handle one command without waiting on anything.
    fn apply(&mut self, command: Command) -> Step {
        match command {
            Command::RunAll => {
                if let Some(running) = self.ledger.running() {
                    let running = running.clone();
                    self.reject(CoordinatorError::PassRunning { running });
                    return Step::Idle;
                }
                let previous: Vec<(SmolStr, bool)> = self
                    .ledger
                    .passes()
                    .iter()
                    .map(|p| (p.id.clone(), p.status.is_pending()))
                    .collect();
                self.ledger.reset_statuses();
                for (id, was_pending) in previous {
                    if !was_pending {
                        self.emit_status(&id);
                    }
                }
                self.queue = self.ledger.enabled_ids().into();
                self.in_sequence = true;
                Step::Advance
            }

            Command::RunPass(id) => match self.ledger.check_startable(&id) {
                Ok(()) => {
                    self.queue.push_front(id);
                    Step::Advance
                }
                Err(error) => {
                    self.reject(error);
                    Step::Idle
                }
            },

            Command::Resolve(event) => self.apply_resolution(event),

            Command::ReplaceDocument(document) => {
                self.document = document;
                self.emit_document(ChangeOrigin::External);
                match self.ledger.cancel_running() {
                    Some(pass_id) => {
                        self.emit_status(&pass_id);
                        self.emit(CoordinatorOutput::PassCancelled {
                            pass_id: pass_id.clone(),
                        });
                        self.end_sequence(SequenceOutcome::Cancelled(pass_id));
                        Step::Cancelled
                    }
                    None => Step::Idle,
                }
            }

            Command::SetEnabled { id, enabled } => {
                let result = self.ledger.set_enabled(&id, enabled);
                self.check(result);
                Step::Idle
            }

            Command::MovePass { id, index } => {
                let result = self.ledger.move_pass(&id, index);
                self.check(result);
                Step::Idle
            }

            Command::AddCustom { name, command } => {
                match self.ledger.add_custom(&name, command.as_deref()) {
                    Ok(id) => tracing::info!(target: "redline::coordinator", pass = %id, %name, "custom pass added"),
                    Err(error) => self.reject(error),
                }
                Step::Idle
            }

            Command::RemoveCustom(id) => {
                let result = self.ledger.remove_custom(&id).map(drop);
                self.check(result);
                Step::Idle
            }

            Command::Retry(id) => {
                match self.ledger.retry(&id) {
                    Ok(()) => self.emit_status(&id),
                    Err(error) => self.reject(error),
                }
                Step::Idle
            }

            Command::Snapshot(reply) => {
                let snapshot = CoordinatorSnapshot {
                    ledger: self.ledger.snapshot(),
                    document: self.document.clone(),
                };
                if reply.send(snapshot).is_err() {
                    tracing::trace!(target: "redline::coordinator", "snapshot requester went away");
                }
                Step::Idle
            }

            Command::Shutdown => Step::Stop,
        }
    }

    /// Apply a human's accept/reject to the document, and count it against
    /// the running pass when that pass inserted the annotation.
    fn apply_resolution(&mut self, event: ResolutionEvent) -> Step {
        let Some(location) = self.document.find_annotation(&event.issue_id) else {
            self.reject(CoordinatorError::UnknownAnnotation(event.issue_id));
            return Step::Idle;
        };
        if let Some(owner) = &location.annotation.pass_id {
            if *owner != event.pass_id {
                let owner = owner.clone();
                self.reject(CoordinatorError::WrongPass {
                    issue_id: event.issue_id,
                    pass_id: event.pass_id,
                    owner,
                });
                return Step::Idle;
            }
        }

        let Some(document) = resolve_annotation(&self.document, &event.issue_id, event.action) else {
            return Step::Idle;
        };
        self.document = document;
        let outcome = self.ledger.resolve(&event);
        if outcome == ResolutionOutcome::Ignored {
            tracing::debug!(
                target: "redline::coordinator",
                issue = %event.issue_id,
                "resolved annotation outside the running pass"
            );
        }
        self.emit_document(ChangeOrigin::Resolution);

        match outcome {
            ResolutionOutcome::Completed { pass_id } => {
                self.emit_status(&pass_id);
                Step::Advance
            }
            _ => Step::Idle,
        }
    }

    /// Start queued passes until one has to wait. Returns false on stop.
    async fn advance(&mut self) -> bool {
        while self.ledger.running().is_none() {
            let Some(id) = self.queue.pop_front() else {
                self.end_sequence(SequenceOutcome::Completed);
                return true;
            };
            match self.execute(&id).await {
                PassRun::Completed | PassRun::Skipped => continue,
                PassRun::Waiting | PassRun::Cancelled => return true,
                PassRun::Failed => {
                    self.end_sequence(SequenceOutcome::Failed(id));
                    return true;
                }
                PassRun::Stopped => return false,
            }
        }
        true
    }

    async fn execute(&mut self, id: &SmolStr) -> PassRun {
        let pass = match self.ledger.begin(id) {
            Ok(pass) => pass,
            Err(error) => {
                self.reject(error);
                return PassRun::Skipped;
            }
        };
        self.emit_status(&pass.id);
        let owner = AnnotationOwner::pass(pass.id.clone(), pass.command.clone());

        let annotated = match self.config.scope {
            AnalysisScope::Document => self.annotate_document(&pass, &owner).await,
            AnalysisScope::PerBlock => self.annotate_blocks(&pass, &owner).await,
        };

        match annotated {
            Ok(()) => {}
            Err(Interrupt::Failed(error)) => {
                let (document, reverted) = strip_annotations(&self.document, Some(pass.id.as_str()));
                if reverted > 0 {
                    tracing::info!(target: "redline::coordinator", pass = %pass.id, reverted, "rolled back annotations");
                    self.document = document;
                    self.emit_document(ChangeOrigin::Rollback);
                }
                self.ledger.fail(error.to_smolstr());
                self.emit_status(&pass.id);
                return PassRun::Failed;
            }
            Err(Interrupt::Cancelled) => return PassRun::Cancelled,
            Err(Interrupt::Stopped) => return PassRun::Stopped,
        }

        match self.ledger.finish_insertion() {
            Some(InsertionOutcome::Completed { pass_id }) => {
                self.emit_status(&pass_id);
                PassRun::Completed
            }
            Some(InsertionOutcome::Waiting { remaining }) => {
                tracing::info!(
                    target: "redline::coordinator",
                    pass = %pass.id,
                    remaining,
                    "waiting on resolutions"
                );
                PassRun::Waiting
            }
            None => PassRun::Cancelled,
        }
    }

    async fn annotate_document(&mut self, pass: &Pass, owner: &AnnotationOwner) -> Result<(), Interrupt> {
        let text = flatten(&self.document).text;
        let issues = self.analyze(pass, text).await?;
        let flat = flatten(&self.document);
        self.insert(&flat, &issues, owner);
        Ok(())
    }

    async fn annotate_blocks(&mut self, pass: &Pass, owner: &AnnotationOwner) -> Result<(), Interrupt> {
        let count = self.document.blocks().len();
        for index in 0..count {
            let Some(flat) = flatten_block(&self.document, index) else {
                break;
            };
            if flat.is_empty() {
                continue;
            }
            let issues = self.analyze(pass, flat.text).await?;
            // Resolutions during analysis only touch earlier blocks.
            if let Some(flat) = flatten_block(&self.document, index) {
                self.insert(&flat, &issues, owner);
            }
        }
        Ok(())
    }

    /// Map, rewrite, and publish one batch of issues.
    fn insert(&mut self, flat: &FlatText, issues: &[Issue], owner: &AnnotationOwner) {
        let spans = map_issues(issues, flat, &self.config.mapper);
        tracing::debug!(
            target: "redline::coordinator",
            issues = issues.len(),
            spans = spans.len(),
            "mapped issues"
        );
        if spans.is_empty() {
            return;
        }
        let annotated = annotate(&self.document, &spans, owner, self.ids.as_mut());
        if annotated.inserted.is_empty() {
            return;
        }
        self.ledger.record_inserted(annotated.inserted);
        self.document = annotated.document;
        self.emit_document(ChangeOrigin::Annotation);
    }

    /// Run the analyzer while still serving the inbox.
    async fn analyze(&mut self, pass: &Pass, text: String) -> Result<Vec<Issue>, Interrupt> {
        let analyzer = Arc::clone(&self.analyzer);
        let pass = pass.clone();
        let policy = self.config.suggestion_policy;
        let mut analysis =
            std::pin::pin!(async move { analyzer.check(&pass, &text, policy).await });

        loop {
            let race = {
                let inbox = &mut self.inbox;
                let analysis_fut = async { RaceResult::Analysis(analysis.as_mut().await) };
                let inbox_fut = async { RaceResult::Inbox(inbox.recv().await) };
                analysis_fut.race(inbox_fut).await
            };

            match race {
                RaceResult::Analysis(result) => return result.map_err(Interrupt::Failed),
                RaceResult::Inbox(None) => return Err(Interrupt::Stopped),
                RaceResult::Inbox(Some(command)) => match self.apply(command) {
                    Step::Idle | Step::Advance => {}
                    Step::Cancelled => return Err(Interrupt::Cancelled),
                    Step::Stop => return Err(Interrupt::Stopped),
                },
            }
        }
    }

    fn end_sequence(&mut self, outcome: SequenceOutcome) {
        self.queue.clear();
        if std::mem::take(&mut self.in_sequence) {
            tracing::info!(target: "redline::coordinator", ?outcome, "sequence finished");
            self.emit(CoordinatorOutput::SequenceFinished { outcome });
        }
    }

    fn check(&self, result: Result<(), CoordinatorError>) {
        if let Err(error) = result {
            self.reject(error);
        }
    }

    fn reject(&self, error: CoordinatorError) {
        tracing::warn!(target: "redline::coordinator", %error, "command rejected");
        self.emit(CoordinatorOutput::Rejected { error });
    }

    fn emit_status(&self, pass_id: &str) {
        if let Some(pass) = self.ledger.pass(pass_id) {
            self.emit(CoordinatorOutput::PassStatusChanged {
                pass_id: pass.id.clone(),
                status: pass.status.clone(),
            });
        }
    }

    fn emit_document(&self, origin: ChangeOrigin) {
        self.emit(CoordinatorOutput::DocumentChanged {
            document: self.document.clone(),
            origin,
        });
    }

    fn emit(&self, output: CoordinatorOutput) {
        if self.outputs.send(output).is_err() {
            tracing::trace!(target: "redline::coordinator", "output receiver dropped");
        }
    }
}
