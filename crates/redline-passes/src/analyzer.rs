//! The external analysis capability.
//!
//! An [`Analyzer`] takes the flattened text for one pass and reports issues
//! against it. The coordinator does not care how: a grammar linter behind
//! [`LintAnalyzer`], a remote rewrite service behind [`DiffAnalyzer`], or a
//! test script.

use std::future::Future;

use redline_core::{Issue, LintReport, SmolStr, SuggestionPolicy, text_differences};
use smol_str::format_smolstr;

use crate::error::AnalysisError;
use crate::pass::Pass;

/// Reports issues in flattened text.
pub trait Analyzer {
    /// Analyze `text` for `pass`. Offsets in the returned issues are chars
    /// into `text`. Analyzers that see several candidate replacements
    /// collapse them with `policy`.
    fn check(
        &self,
        pass: &Pass,
        text: &str,
        policy: SuggestionPolicy,
    ) -> impl Future<Output = Result<Vec<Issue>, AnalysisError>> + Send;
}

/// A grammar checker that reports raw lints for a command.
pub trait Linter {
    fn lint(
        &self,
        command: &str,
        text: &str,
    ) -> impl Future<Output = Result<Vec<LintReport>, AnalysisError>> + Send;
}

/// A service that returns a corrected copy of the text for a command.
pub trait FixService {
    fn fix(
        &self,
        command: &str,
        text: &str,
    ) -> impl Future<Output = Result<String, AnalysisError>> + Send;
}

/// Adapts a [`FixService`] into an [`Analyzer`] by diffing the original
/// text against the corrected copy.
#[derive(Clone, Debug, Default)]
pub struct DiffAnalyzer<S> {
    service: S,
}

impl<S> DiffAnalyzer<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}

impl<S> Analyzer for DiffAnalyzer<S>
where
    S: FixService + Sync,
{
    fn check(
        &self,
        pass: &Pass,
        text: &str,
        _policy: SuggestionPolicy,
    ) -> impl Future<Output = Result<Vec<Issue>, AnalysisError>> + Send {
        let command = pass_command(pass);
        let message: SmolStr = format_smolstr!("{} suggestion", pass.name);
        async move {
            let fixed = self.service.fix(&command, text).await?;
            let issues = text_differences(text, &fixed)
                .into_iter()
                .filter(|diff| !diff.range.is_empty())
                .map(|diff| diff.into_issue(message.clone(), command.clone()))
                .collect::<Vec<_>>();
            tracing::debug!(
                target: "redline::analysis",
                command = %command,
                issues = issues.len(),
                "diffed fixed text"
            );
            Ok(issues)
        }
    }
}

/// Adapts a [`Linter`] into an [`Analyzer`], turning each lint into an
/// issue with [`Issue::from_lint`].
#[derive(Clone, Debug, Default)]
pub struct LintAnalyzer<L> {
    linter: L,
}

impl<L> LintAnalyzer<L> {
    pub fn new(linter: L) -> Self {
        Self { linter }
    }

    pub fn linter(&self) -> &L {
        &self.linter
    }
}

impl<L> Analyzer for LintAnalyzer<L>
where
    L: Linter + Sync,
{
    fn check(
        &self,
        pass: &Pass,
        text: &str,
        policy: SuggestionPolicy,
    ) -> impl Future<Output = Result<Vec<Issue>, AnalysisError>> + Send {
        let command = pass_command(pass);
        async move {
            let reports = self.linter.lint(&command, text).await?;
            let total = reports.len();
            let issues: Vec<Issue> = reports
                .iter()
                .filter_map(|report| Issue::from_lint(text, report, policy))
                .collect();
            if issues.len() < total {
                tracing::debug!(
                    target: "redline::analysis",
                    dropped = total - issues.len(),
                    "lints outside the text"
                );
            }
            Ok(issues)
        }
    }
}

/// The pass command, falling back to `grammar` when none is set.
fn pass_command(pass: &Pass) -> SmolStr {
    if pass.command.is_empty() {
        SmolStr::new_static("grammar")
    } else {
        pass.command.clone()
    }
}
