use serde::{Serialize, Deserialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct Poll {
    pub id: i64,
    pub question: String,
    #[cfg_attr(feature = "backend", sqlx(rename = "created_by_id"))]
    pub created_by: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    #[cfg_attr(feature = "backend", sqlx(skip))]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct Choice {
    pub id: i64,
    #[cfg_attr(feature = "backend", sqlx(rename = "poll_id"))]
    pub poll: i64,
    pub choice_text: String,
    #[serde(default)]
    #[cfg_attr(feature = "backend", sqlx(skip))]
    pub votes: Vec<Vote>,
    #[serde(default)]
    #[cfg_attr(feature = "backend", sqlx(skip))]
    pub vote_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct Vote {
    pub id: i64,
    #[cfg_attr(feature = "backend", sqlx(rename = "choice_id"))]
    pub choice: i64,
    #[cfg_attr(feature = "backend", sqlx(rename = "poll_id"))]
    pub poll: i64,
    #[cfg_attr(feature = "backend", sqlx(rename = "voted_by_id"))]
    pub voted_by: i64,
}

/// Public view of an account. Credential material never appears here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollPage {
    pub count: i64,
    pub limit: i64,
    pub offset: i64,
    pub results: Vec<Poll>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePollRequest {
    pub question: String,
    pub created_by: i64,
    #[serde(default)]
    pub choice_strings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVoteRequest {
    #[serde(default)]
    pub poll: Option<i64>,
    pub choice: i64,
    pub voted_by: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastVoteRequest {
    pub voted_by: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceTextRequest {
    pub choice_text: String,
}

/// Account signup payload. The password is accepted on input only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// A validated poll ready to be written, choices in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoll {
    pub question: String,
    pub created_by: i64,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl Choice {
    pub fn with_votes(mut self, votes: Vec<Vote>) -> Self {
        self.vote_count = votes.len();
        self.votes = votes;
        self
    }
}
