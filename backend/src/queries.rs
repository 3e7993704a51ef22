use std::collections::HashMap;

use sqlx::PgPool;
use tracing::debug;
use shared::models::*;
use crate::store::{PollStore, StoreError};

const VOTE_UNIQUE_CONSTRAINT: &str = "votes_poll_voter_unique";
const USERNAME_UNIQUE_CONSTRAINT: &str = "accounts_username_key";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_choices(&self, polls: &mut [Poll]) -> Result<(), StoreError> {
        if polls.is_empty() {
            return Ok(());
        }
        let poll_ids: Vec<i64> = polls.iter().map(|p| p.id).collect();

        let choices = sqlx::query_as::<_, Choice>(
            "SELECT id, poll_id, choice_text FROM choices WHERE poll_id = ANY($1) ORDER BY id"
        )
        .bind(&poll_ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let votes = sqlx::query_as::<_, Vote>(
            "SELECT id, choice_id, poll_id, voted_by_id FROM votes WHERE poll_id = ANY($1) ORDER BY id"
        )
        .bind(&poll_ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut by_poll = group_choices(choices, votes);
        for poll in polls.iter_mut() {
            poll.choices = by_poll.remove(&poll.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn votes_for_choice(&self, choice_id: i64) -> Result<Vec<Vote>, StoreError> {
        sqlx::query_as::<_, Vote>(
            "SELECT id, choice_id, poll_id, voted_by_id FROM votes WHERE choice_id = $1 ORDER BY id"
        )
        .bind(choice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }
}

fn group_choices(choices: Vec<Choice>, votes: Vec<Vote>) -> HashMap<i64, Vec<Choice>> {
    let mut votes_by_choice: HashMap<i64, Vec<Vote>> = HashMap::new();
    for vote in votes {
        votes_by_choice.entry(vote.choice).or_default().push(vote);
    }

    let mut by_poll: HashMap<i64, Vec<Choice>> = HashMap::new();
    for choice in choices {
        let votes = votes_by_choice.remove(&choice.id).unwrap_or_default();
        by_poll.entry(choice.poll).or_default().push(choice.with_votes(votes));
    }
    by_poll
}

fn map_db_error(e: sqlx::Error) -> StoreError {
    e.as_database_error()
        .and_then(|db_err| constraint_error(db_err.constraint()?))
        .unwrap_or_else(|| StoreError::Database(e.to_string()))
}

/// Maps a violated constraint from the migrations to the store error it
/// stands for. Unlisted constraints stay database errors.
pub(crate) fn constraint_error(constraint: &str) -> Option<StoreError> {
    let error = match constraint {
        VOTE_UNIQUE_CONSTRAINT => StoreError::DuplicateVote,
        USERNAME_UNIQUE_CONSTRAINT => StoreError::DuplicateUsername,
        "votes_voted_by_fkey" | "polls_created_by_fkey" => StoreError::MissingReference("account"),
        "votes_choice_in_poll_fkey" => StoreError::MissingReference("choice"),
        "choices_poll_fkey" => StoreError::MissingReference("poll"),
        _ => return None,
    };
    Some(error)
}

#[rocket::async_trait]
impl PollStore for PgStore {
    async fn create_poll(&self, poll: &NewPoll) -> Result<Poll, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut record = sqlx::query_as::<_, Poll>(
            "INSERT INTO polls (question, created_by_id) VALUES ($1, $2)
             RETURNING id, question, created_by_id, created_at"
        )
        .bind(&poll.question)
        .bind(poll.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        for text in &poll.choices {
            let choice = sqlx::query_as::<_, Choice>(
                "INSERT INTO choices (poll_id, choice_text) VALUES ($1, $2)
                 RETURNING id, poll_id, choice_text"
            )
            .bind(record.id)
            .bind(text)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;
            record.choices.push(choice);
        }

        tx.commit().await.map_err(map_db_error)?;
        debug!(poll_id = record.id, choices = record.choices.len(), "poll committed");
        Ok(record)
    }

    async fn list_polls(&self, limit: i64, offset: i64) -> Result<(i64, Vec<Poll>), StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM polls")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        let mut polls = sqlx::query_as::<_, Poll>(
            "SELECT id, question, created_by_id, created_at FROM polls
             ORDER BY id LIMIT $1 OFFSET $2"
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.attach_choices(&mut polls).await?;
        Ok((count, polls))
    }

    async fn get_poll(&self, id: i64) -> Result<Option<Poll>, StoreError> {
        let record = sqlx::query_as::<_, Poll>(
            "SELECT id, question, created_by_id, created_at FROM polls WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        let Some(poll) = record else { return Ok(None) };
        let mut polls = [poll];
        self.attach_choices(&mut polls).await?;
        let [poll] = polls;
        Ok(Some(poll))
    }

    async fn delete_poll(&self, id: i64) -> Result<bool, StoreError> {
        // choices and votes go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_choices(&self, poll_id: i64) -> Result<Option<Vec<Choice>>, StoreError> {
        Ok(self.get_poll(poll_id).await?.map(|p| p.choices))
    }

    async fn create_choice(&self, poll_id: i64, choice_text: &str) -> Result<Choice, StoreError> {
        sqlx::query_as::<_, Choice>(
            "INSERT INTO choices (poll_id, choice_text) VALUES ($1, $2)
             RETURNING id, poll_id, choice_text"
        )
        .bind(poll_id)
        .bind(choice_text)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_choice(&self, id: i64) -> Result<Option<Choice>, StoreError> {
        let record = sqlx::query_as::<_, Choice>(
            "SELECT id, poll_id, choice_text FROM choices WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        let Some(choice) = record else { return Ok(None) };
        let votes = self.votes_for_choice(choice.id).await?;
        Ok(Some(choice.with_votes(votes)))
    }

    async fn update_choice(&self, id: i64, choice_text: &str) -> Result<Option<Choice>, StoreError> {
        let record = sqlx::query_as::<_, Choice>(
            "UPDATE choices SET choice_text = $2 WHERE id = $1
             RETURNING id, poll_id, choice_text"
        )
        .bind(id)
        .bind(choice_text)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        let Some(choice) = record else { return Ok(None) };
        let votes = self.votes_for_choice(choice.id).await?;
        Ok(Some(choice.with_votes(votes)))
    }

    async fn create_vote(&self, choice_id: i64, poll_id: i64, voted_by: i64) -> Result<Vote, StoreError> {
        // the unique (poll_id, voted_by_id) index arbitrates concurrent
        // submissions: the loser inserts nothing and gets no row back
        let inserted = sqlx::query_as::<_, Vote>(
            "INSERT INTO votes (choice_id, poll_id, voted_by_id) VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT votes_poll_voter_unique DO NOTHING
             RETURNING id, choice_id, poll_id, voted_by_id"
        )
        .bind(choice_id)
        .bind(poll_id)
        .bind(voted_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        inserted.ok_or(StoreError::DuplicateVote)
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (username, email, password_hash) VALUES ($1, $2, $3)
             RETURNING id, username, email"
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>("SELECT id, username, email FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_password_hash(&self, username: &str) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar("SELECT password_hash FROM accounts WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }
}
