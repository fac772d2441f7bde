//! Gateway request and response shapes

use serde::{Deserialize, Serialize};

/// Status tag on every answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Success,
    /// The service does not know the answer and asks to be taught
    TeachMe,
    Error,
}

/// Reply to a plain question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskReply {
    #[serde(default)]
    pub answer: String,
    pub status: AnswerStatus,
    /// Authoritative bound query when `status` is `TeachMe`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[cfg(test)]
impl AskReply {
    pub fn success(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            status: AnswerStatus::Success,
            query: None,
        }
    }

    pub fn teach_me(answer: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            status: AnswerStatus::TeachMe,
            query: Some(query.into()),
        }
    }
}

/// Reply to a teaching or feedback submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionReply {
    #[serde(default)]
    pub answer: String,
    pub status: AnswerStatus,
}

impl From<CorrectionReply> for AskReply {
    fn from(reply: CorrectionReply) -> Self {
        Self {
            answer: reply.answer,
            status: reply.status,
            query: None,
        }
    }
}

/// Session greeting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    #[serde(alias = "message")]
    pub response: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AskBody<'a> {
    pub question: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeachBody<'a> {
    pub original_query: &'a str,
    pub teach_response: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedbackBody<'a> {
    pub original_query: &'a str,
    pub feedback: &'a str,
}

/// Body of a non-2xx response
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
