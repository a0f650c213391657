use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// One unit of lesson material.
///
/// Serialized with an internal `type` tag and camelCase field names, which is
/// the shape both the generator is asked to produce and the client renders:
///
/// ```json
/// { "type": "quiz", "content": "2 + 2?", "options": ["3", "4"], "correctAnswer": "4" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Markdown paragraph.
    Text { content: String },
    Heading { content: String },
    Code {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    /// `content` is a search query for a relevant video, not a URL.
    Video { content: String },
    #[serde(rename_all = "camelCase")]
    Quiz {
        /// The question.
        content: String,
        options: Vec<String>,
        correct_answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    List {
        #[serde(deserialize_with = "string_or_items")]
        content: Vec<String>,
        #[serde(default)]
        list_type: ListType,
    },
    #[serde(rename_all = "camelCase")]
    Callout {
        content: String,
        #[serde(default, deserialize_with = "lenient_callout_type")]
        callout_type: CalloutType,
    },
    Exercise {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    #[default]
    Bullet,
    Numbered,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalloutType {
    #[default]
    Info,
    Warning,
    Tip,
    Success,
    Danger,
}

impl CalloutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Tip => "tip",
            Self::Success => "success",
            Self::Danger => "danger",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "tip" => Some(Self::Tip),
            "success" => Some(Self::Success),
            "danger" => Some(Self::Danger),
            _ => None,
        }
    }
}

/// Why a generated block was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("block {index} ({kind}) has no content")]
    EmptyContent { index: usize, kind: &'static str },

    #[error("quiz block {index} needs at least two options")]
    TooFewOptions { index: usize },

    #[error("quiz block {index} answer {answer:?} is not one of its options")]
    AnswerNotAnOption { index: usize, answer: String },
}

impl ContentBlock {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Heading { .. } => "heading",
            Self::Code { .. } => "code",
            Self::Video { .. } => "video",
            Self::Quiz { .. } => "quiz",
            Self::List { .. } => "list",
            Self::Callout { .. } => "callout",
            Self::Exercise { .. } => "exercise",
        }
    }

    fn validate(&self, index: usize) -> Result<(), BlockError> {
        let empty = || BlockError::EmptyContent {
            index,
            kind: self.kind(),
        };

        match self {
            Self::List { content, .. } => {
                if content.is_empty() || content.iter().any(|item| item.trim().is_empty()) {
                    return Err(empty());
                }
            }
            Self::Quiz {
                content,
                options,
                correct_answer,
                ..
            } => {
                if content.trim().is_empty() {
                    return Err(empty());
                }
                if options.len() < 2 {
                    return Err(BlockError::TooFewOptions { index });
                }
                if !options.iter().any(|o| o == correct_answer) {
                    return Err(BlockError::AnswerNotAnOption {
                        index,
                        answer: correct_answer.clone(),
                    });
                }
            }
            Self::Text { content }
            | Self::Heading { content }
            | Self::Code { content, .. }
            | Self::Video { content }
            | Self::Callout { content, .. }
            | Self::Exercise { content, .. } => {
                if content.trim().is_empty() {
                    return Err(empty());
                }
            }
        }

        Ok(())
    }
}

/// Check every block of a candidate lesson body, stopping at the first problem.
pub fn validate_blocks(blocks: &[ContentBlock]) -> Result<(), BlockError> {
    blocks
        .iter()
        .enumerate()
        .try_for_each(|(index, block)| block.validate(index))
}

/// Models sometimes emit a list body as a single newline-separated string.
fn string_or_items<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Items {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Items::deserialize(deserializer)? {
        Items::Many(items) => items,
        Items::One(text) => text
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*']).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
    })
}

/// Unknown callout styles fall back to `info` rather than failing the lesson.
fn lenient_callout_type<'de, D>(deserializer: D) -> Result<CalloutType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .map(str::to_ascii_lowercase)
        .and_then(|s| CalloutType::from_str(&s))
        .unwrap_or_default())
}
