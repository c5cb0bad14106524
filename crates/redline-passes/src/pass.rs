//! Check passes and their status.

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, ToSmolStr};

/// Lifecycle of one pass within a coordinator run.
///
/// `Pending -> Running -> Completed | Failed`. A failed pass returns to
/// `Pending` when retried; a cancelled pass returns to `Pending` directly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "message")]
pub enum PassStatus {
    #[default]
    Pending,
    Running,
    Completed,
    /// Analysis failed, with the analyzer's message.
    Failed(SmolStr),
}

impl PassStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the failure message if failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed(msg) => Some(msg.as_str()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed(_) => "failed",
        }
    }
}

/// One check in the checklist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pass {
    pub id: SmolStr,
    pub name: SmolStr,
    #[serde(default)]
    pub description: SmolStr,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Analyzer command, e.g. `brevity`. Also the annotation kind.
    #[serde(default)]
    pub command: SmolStr,
    /// User-added rather than built in.
    #[serde(default)]
    pub custom: bool,
    #[serde(default, skip_deserializing)]
    pub status: PassStatus,
}

fn enabled_by_default() -> bool {
    true
}

impl Pass {
    pub fn new(
        id: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        description: impl Into<SmolStr>,
        command: impl Into<SmolStr>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            enabled: true,
            command: command.into(),
            custom: false,
            status: PassStatus::Pending,
        }
    }

    /// A user-defined pass. Without an explicit command, the command is the
    /// lowercased name with whitespace runs replaced by `_`.
    pub fn custom(id: impl Into<SmolStr>, name: &str, command: Option<&str>) -> Self {
        let name = name.trim();
        let command = match command.map(str::trim).filter(|c| !c.is_empty()) {
            Some(command) => command.to_smolstr(),
            None => command_from_name(name),
        };
        Self {
            custom: true,
            ..Self::new(id, name, smol_str::format_smolstr!("Custom check: {name}"), command)
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn command_from_name(name: &str) -> SmolStr {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .into()
}

/// The stock checklist: brevity and cliches on, the rest off.
pub fn default_passes() -> Vec<Pass> {
    vec![
        Pass::new("1", "Brevity", "Omit needless words", "brevity"),
        Pass::new("2", "Cliches", "Replace over-used phrases", "cliches"),
        Pass::new("3", "Readability", "Simplify convoluted sentences", "readability").disabled(),
        Pass::new(
            "4",
            "Passive Voice",
            "Convert passive voice to active voice",
            "passive_voice",
        )
        .disabled(),
        Pass::new(
            "5",
            "Confidence",
            "Remove excessive hedging (I think, probably, etc)",
            "confidence",
        )
        .disabled(),
        Pass::new("6", "Citation", "Identify claims that need evidence", "citation").disabled(),
        Pass::new("7", "Repetition", "Remove repeated words", "repetition").disabled(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_helpers() {
        assert!(PassStatus::default().is_pending());
        assert!(PassStatus::Running.is_running());
        let failed = PassStatus::Failed("boom".into());
        assert!(failed.is_failed());
        assert_eq!(failed.error_message(), Some("boom"));
        assert_eq!(PassStatus::Completed.error_message(), None);
    }

    #[test]
    fn test_default_passes() {
        let passes = default_passes();
        assert_eq!(passes.len(), 7);
        let enabled: Vec<&str> = passes
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.command.as_str())
            .collect();
        assert_eq!(enabled, vec!["brevity", "cliches"]);
    }

    #[test]
    fn test_custom_command_from_name() {
        let pass = Pass::custom("c1", "  Jargon   Check ", None);
        assert_eq!(pass.name, "Jargon   Check");
        assert_eq!(pass.command, "jargon_check");
        assert!(pass.custom);
        assert_eq!(pass.description, "Custom check: Jargon   Check");

        let explicit = Pass::custom("c2", "Tone", Some("tone_v2"));
        assert_eq!(explicit.command, "tone_v2");
    }

    #[test]
    fn test_status_json() {
        let json = serde_json::to_string(&PassStatus::Failed("timeout".into())).unwrap();
        assert_eq!(json, r#"{"state":"failed","message":"timeout"}"#);
    }
}
