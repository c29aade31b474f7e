use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Like or dislike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteKind::Like => "like",
            VoteKind::Dislike => "dislike",
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(VoteKind::Like),
            "dislike" => Ok(VoteKind::Dislike),
            other => Err(format!("Unknown vote kind '{other}'")),
        }
    }
}

/// Request body for casting a vote.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct VoteRequest {
    /// `like` or `dislike`. Voting the current kind again removes the vote.
    #[serde(alias = "tipo")]
    pub kind: VoteKind,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VoteSummary {
    #[schema(example = 4)]
    pub likes: u64,
    #[schema(example = 1)]
    pub dislikes: u64,
    /// The caller's vote after this request, if any.
    pub current_vote: Option<VoteKind>,
}
