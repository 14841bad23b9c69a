use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of per-tile labels used by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LabelCode {
    #[default]
    None = 0,
    Ball = 1,
    Bat = 2,
    Stump = 3,
}

impl LabelCode {
    pub const ALL: [LabelCode; 4] = [
        LabelCode::None,
        LabelCode::Ball,
        LabelCode::Bat,
        LabelCode::Stump,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(LabelCode::None),
            1 => Some(LabelCode::Ball),
            2 => Some(LabelCode::Bat),
            3 => Some(LabelCode::Stump),
            _ => None,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            LabelCode::None => "none",
            LabelCode::Ball => "ball",
            LabelCode::Bat => "bat",
            LabelCode::Stump => "stump",
        }
    }

    /// Parses a label name; "stumps" is accepted as an alias of "stump"
    pub fn from_text(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(LabelCode::None),
            "ball" => Some(LabelCode::Ball),
            "bat" => Some(LabelCode::Bat),
            "stump" | "stumps" => Some(LabelCode::Stump),
            _ => None,
        }
    }
}

impl TryFrom<u8> for LabelCode {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        LabelCode::from_code(code).ok_or_else(|| format!("unknown label code {}", code))
    }
}

impl From<LabelCode> for u8 {
    fn from(label: LabelCode) -> Self {
        label.code()
    }
}

impl fmt::Display for LabelCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
