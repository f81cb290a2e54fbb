//! Masked-language-model families and their special-token spelling.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::PromptOreError;

/// Model family the prompts are written for. Only the special tokens differ; the
/// template catalogue is shared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    #[default]
    Bert,
    Roberta,
}

impl ModelFamily {
    pub fn mask_token(self) -> &'static str {
        match self {
            Self::Bert => "[MASK]",
            Self::Roberta => "<mask>",
        }
    }

    pub fn begin_token(self) -> &'static str {
        match self {
            Self::Bert => "[CLS]",
            Self::Roberta => "<s>",
        }
    }

    pub fn end_token(self) -> &'static str {
        match self {
            Self::Bert => "[SEP]",
            Self::Roberta => "</s>",
        }
    }

    pub fn pad_token(self) -> &'static str {
        match self {
            Self::Bert => "[PAD]",
            Self::Roberta => "<pad>",
        }
    }

    fn special_tokens(self) -> [&'static str; 4] {
        [
            self.mask_token(),
            self.begin_token(),
            self.end_token(),
            self.pad_token(),
        ]
    }

    /// Remove every special token of this family from document text.
    pub fn strip_special_tokens(self, text: &str) -> String {
        let mut out = text.to_string();
        for token in self.special_tokens() {
            while out.contains(token) {
                out = out.replace(token, "");
            }
        }
        out
    }

    /// Hub identifier of the Spanish checkpoint each family was evaluated with.
    pub fn default_model(self, size: ModelSize) -> String {
        match self {
            Self::Bert => "dccuchile/bert-base-spanish-wwm-uncased".to_string(),
            Self::Roberta => format!("PlanTL-GOB-ES/roberta-{size}-bne"),
        }
    }

    /// Surround a prompt body with the begin and end tokens.
    pub fn wrap(self, body: &str) -> String {
        format!("{} {} {}", self.begin_token(), body, self.end_token())
    }

    /// Inverse of [`ModelFamily::wrap`]; text without the tokens is returned trimmed.
    pub fn unwrap_prompt(self, prompt: &str) -> String {
        let inner = prompt.trim();
        let inner = inner.strip_prefix(self.begin_token()).unwrap_or(inner);
        let inner = inner.strip_suffix(self.end_token()).unwrap_or(inner);
        inner.trim().to_string()
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bert => "bert",
            Self::Roberta => "roberta",
        })
    }
}

impl FromStr for ModelFamily {
    type Err = PromptOreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bert" | "beto" => Ok(Self::Bert),
            "roberta" => Ok(Self::Roberta),
            other => Err(PromptOreError::config(format!(
                "unsupported model family {other:?} (expected bert or roberta)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    #[default]
    Base,
    Large,
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Base => "base",
            Self::Large => "large",
        })
    }
}

impl FromStr for ModelSize {
    type Err = PromptOreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(Self::Base),
            "large" => Ok(Self::Large),
            other => Err(PromptOreError::config(format!(
                "unsupported model size {other:?} (expected base or large)"
            ))),
        }
    }
}
