//! Free-text command parsing.
//!
//! Commands are matched by prefix; dispatch lives on [`crate::Engine`].

/// Pipeline id used by the continuous vision commands
pub const DEFAULT_PIPELINE_ID: &str = "default_vision_speech";

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `say <text>`
    Say(String),
    /// `see and say`
    SeeAndSay,
    /// `start continuous vision`
    StartContinuousVision,
    /// `stop continuous`
    StopContinuous,
    Unknown,
}

impl Command {
    pub fn parse(input: &str) -> Self {
        if let Some(text) = input.strip_prefix("say ") {
            Self::Say(text.to_string())
        } else if input.starts_with("see and say") {
            Self::SeeAndSay
        } else if input.starts_with("start continuous vision") {
            Self::StartContinuousVision
        } else if input.starts_with("stop continuous") {
            Self::StopContinuous
        } else {
            Self::Unknown
        }
    }

    /// Result text for an executed command
    pub fn reply(&self, success: bool) -> &'static str {
        match (self, success) {
            (Self::Say(_), true) => "Spoken successfully",
            (Self::Say(_), false) => "Failed to speak",
            (Self::SeeAndSay, true) => "Vision→Speech pipeline executed",
            (Self::SeeAndSay, false) => "Pipeline execution failed",
            (Self::StartContinuousVision, true) => "Continuous vision→speech started",
            (Self::StartContinuousVision, false) => "Failed to start pipeline",
            (Self::StopContinuous, true) => "Continuous pipeline stopped",
            (Self::StopContinuous, false) => "Failed to stop pipeline",
            (Self::Unknown, _) => "Unknown command",
        }
    }
}
