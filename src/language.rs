use std::fmt;

use serde::{Deserialize, Serialize};

/// Language of the dialog shown on the user's phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    EST,
    ENG,
    RUS,
    LIT,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::EST => "EST",
            Self::ENG => "ENG",
            Self::RUS => "RUS",
            Self::LIT => "LIT",
        };
        f.write_str(code)
    }
}

/// Encoding of the display text. UCS-2 is needed for non-Latin scripts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayTextFormat {
    #[default]
    GSM7,
    UCS2,
}
