use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use time::OffsetDateTime;
use shared::models::*;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Vote already recorded for this poll and voter")]
    DuplicateVote,
    #[error("Username already taken")]
    DuplicateUsername,
    #[error("Referenced {0} does not exist")]
    MissingReference(&'static str),
    #[error("Database error: {0}")]
    Database(String),
}

/// Persistence seam for every handler. Multi-row writes are atomic:
/// `create_poll` writes the poll and all of its choices or nothing, and
/// `create_vote` checks and inserts as one unit.
#[rocket::async_trait]
pub trait PollStore: Send + Sync {
    async fn create_poll(&self, poll: &NewPoll) -> Result<Poll, StoreError>;
    async fn list_polls(&self, limit: i64, offset: i64) -> Result<(i64, Vec<Poll>), StoreError>;
    async fn get_poll(&self, id: i64) -> Result<Option<Poll>, StoreError>;
    /// Returns false when no poll had that id.
    async fn delete_poll(&self, id: i64) -> Result<bool, StoreError>;

    async fn list_choices(&self, poll_id: i64) -> Result<Option<Vec<Choice>>, StoreError>;
    async fn create_choice(&self, poll_id: i64, choice_text: &str) -> Result<Choice, StoreError>;
    async fn get_choice(&self, id: i64) -> Result<Option<Choice>, StoreError>;
    async fn update_choice(&self, id: i64, choice_text: &str) -> Result<Option<Choice>, StoreError>;

    async fn create_vote(&self, choice_id: i64, poll_id: i64, voted_by: i64) -> Result<Vote, StoreError>;

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError>;
    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError>;
    async fn get_password_hash(&self, username: &str) -> Result<Option<String>, StoreError>;
}

#[derive(Debug)]
struct StoredAccount {
    account: Account,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    accounts: BTreeMap<i64, StoredAccount>,
    polls: BTreeMap<i64, Poll>,
    choices: BTreeMap<i64, Choice>,
    votes: BTreeMap<i64, Vote>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn choice_with_votes(&self, choice: &Choice) -> Choice {
        let votes = self.votes.values()
            .filter(|v| v.choice == choice.id)
            .cloned()
            .collect();
        choice.clone().with_votes(votes)
    }

    fn choices_of(&self, poll_id: i64) -> Vec<Choice> {
        self.choices.values()
            .filter(|c| c.poll == poll_id)
            .map(|c| self.choice_with_votes(c))
            .collect()
    }

    fn poll_with_choices(&self, poll: &Poll) -> Poll {
        Poll { choices: self.choices_of(poll.id), ..poll.clone() }
    }
}

/// Process-local store with the same contract as the PostgreSQL one. Every
/// operation runs under a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|e| StoreError::Database(format!("store lock poisoned: {e}")))
    }

    pub fn vote_count(&self) -> usize {
        self.tables.lock().map(|t| t.votes.len()).unwrap_or(0)
    }

    pub fn choice_count(&self) -> usize {
        self.tables.lock().map(|t| t.choices.len()).unwrap_or(0)
    }

    pub fn poll_count(&self) -> usize {
        self.tables.lock().map(|t| t.polls.len()).unwrap_or(0)
    }
}

#[rocket::async_trait]
impl PollStore for MemoryStore {
    async fn create_poll(&self, poll: &NewPoll) -> Result<Poll, StoreError> {
        let mut tables = self.lock()?;
        if !tables.accounts.contains_key(&poll.created_by) {
            return Err(StoreError::MissingReference("account"));
        }

        let id = tables.allocate_id();
        let record = Poll {
            id,
            question: poll.question.clone(),
            created_by: poll.created_by,
            created_at: OffsetDateTime::now_utc(),
            choices: Vec::new(),
        };
        tables.polls.insert(id, record.clone());

        for text in &poll.choices {
            let choice_id = tables.allocate_id();
            tables.choices.insert(choice_id, Choice {
                id: choice_id,
                poll: id,
                choice_text: text.clone(),
                votes: Vec::new(),
                vote_count: 0,
            });
        }

        Ok(tables.poll_with_choices(&record))
    }

    async fn list_polls(&self, limit: i64, offset: i64) -> Result<(i64, Vec<Poll>), StoreError> {
        let tables = self.lock()?;
        let page = tables.polls.values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|p| tables.poll_with_choices(p))
            .collect();
        Ok((tables.polls.len() as i64, page))
    }

    async fn get_poll(&self, id: i64) -> Result<Option<Poll>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.polls.get(&id).map(|p| tables.poll_with_choices(p)))
    }

    async fn delete_poll(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        if tables.polls.remove(&id).is_none() {
            return Ok(false);
        }
        tables.choices.retain(|_, c| c.poll != id);
        tables.votes.retain(|_, v| v.poll != id);
        Ok(true)
    }

    async fn list_choices(&self, poll_id: i64) -> Result<Option<Vec<Choice>>, StoreError> {
        let tables = self.lock()?;
        if !tables.polls.contains_key(&poll_id) {
            return Ok(None);
        }
        Ok(Some(tables.choices_of(poll_id)))
    }

    async fn create_choice(&self, poll_id: i64, choice_text: &str) -> Result<Choice, StoreError> {
        let mut tables = self.lock()?;
        if !tables.polls.contains_key(&poll_id) {
            return Err(StoreError::MissingReference("poll"));
        }

        let id = tables.allocate_id();
        let choice = Choice {
            id,
            poll: poll_id,
            choice_text: choice_text.into(),
            votes: Vec::new(),
            vote_count: 0,
        };
        tables.choices.insert(id, choice.clone());
        Ok(choice)
    }

    async fn get_choice(&self, id: i64) -> Result<Option<Choice>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.choices.get(&id).map(|c| tables.choice_with_votes(c)))
    }

    async fn update_choice(&self, id: i64, choice_text: &str) -> Result<Option<Choice>, StoreError> {
        let mut tables = self.lock()?;
        let Some(choice) = tables.choices.get_mut(&id) else { return Ok(None) };
        choice.choice_text = choice_text.into();
        let choice = choice.clone();
        Ok(Some(tables.choice_with_votes(&choice)))
    }

    async fn create_vote(&self, choice_id: i64, poll_id: i64, voted_by: i64) -> Result<Vote, StoreError> {
        let mut tables = self.lock()?;

        match tables.choices.get(&choice_id) {
            Some(choice) if choice.poll == poll_id => {}
            _ => return Err(StoreError::MissingReference("choice")),
        }
        if !tables.accounts.contains_key(&voted_by) {
            return Err(StoreError::MissingReference("account"));
        }
        if tables.votes.values().any(|v| v.poll == poll_id && v.voted_by == voted_by) {
            return Err(StoreError::DuplicateVote);
        }

        let id = tables.allocate_id();
        let vote = Vote { id, choice: choice_id, poll: poll_id, voted_by };
        tables.votes.insert(id, vote.clone());
        Ok(vote)
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.lock()?;
        if tables.accounts.values().any(|a| a.account.username == account.username) {
            return Err(StoreError::DuplicateUsername);
        }

        let id = tables.allocate_id();
        let public = Account {
            id,
            username: account.username.clone(),
            email: account.email.clone(),
        };
        tables.accounts.insert(id, StoredAccount {
            account: public.clone(),
            password_hash: account.password_hash.clone(),
        });
        Ok(public)
    }

    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.accounts.get(&id).map(|a| a.account.clone()))
    }

    async fn get_password_hash(&self, username: &str) -> Result<Option<String>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.accounts.values()
            .find(|a| a.account.username == username)
            .map(|a| a.password_hash.clone()))
    }
}
