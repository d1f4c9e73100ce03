use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The presentation layouts the stage can switch between.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutMode {
    #[default]
    #[serde(rename = "CHAT_MODE")]
    Chat,
    #[serde(rename = "SPLIT_MODE")]
    Split,
    #[serde(rename = "FOCUS_MODE")]
    Focus,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Chat => "CHAT_MODE",
            LayoutMode::Split => "SPLIT_MODE",
            LayoutMode::Focus => "FOCUS_MODE",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHAT_MODE" => Ok(LayoutMode::Chat),
            "SPLIT_MODE" => Ok(LayoutMode::Split),
            "FOCUS_MODE" => Ok(LayoutMode::Focus),
            other => Err(other.to_string()),
        }
    }
}

/// Title and body shown in the concept panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub title: String,
    pub text: String,
}

/// One teaching instruction executed by the director.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Speak(String),
    Layout(LayoutMode),
    Code(String),
    Concept(Concept),
    Highlight(String),
    Wait(Duration),
}

impl Action {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Speak(_) => "speak",
            Action::Layout(_) => "layout",
            Action::Code(_) => "code",
            Action::Concept(_) => "concept",
            Action::Highlight(_) => "highlight",
            Action::Wait(_) => "wait",
        }
    }
}
