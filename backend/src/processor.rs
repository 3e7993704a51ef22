use rocket::tokio::task::spawn_blocking;
use tracing::{debug, info, warn};
use shared::models::*;
use shared::validation::{
    page_bounds, validate_account_request, validate_choice_text, validate_poll_request,
    validate_vote_target,
};
use crate::config::AppConfig;
use crate::credentials::{check_password, hash_password};
use crate::error::ApiError;
use crate::store::PollStore;

pub struct PollProcessor;

impl PollProcessor {
    /// Validates the payload, confirms the author exists, then writes the
    /// poll together with its choices as one unit.
    pub async fn create_poll(store: &dyn PollStore, request: CreatePollRequest) -> Result<Poll, ApiError> {
        let new_poll = validate_poll_request(request)?;

        if store.get_account(new_poll.created_by).await?.is_none() {
            return Err(ApiError::not_found("Account", new_poll.created_by));
        }

        let poll = store.create_poll(&new_poll).await?;
        info!(poll_id = poll.id, choices = poll.choices.len(), "Created poll");
        Ok(poll)
    }

    pub async fn list_polls(
        store: &dyn PollStore,
        config: &AppConfig,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<PollPage, ApiError> {
        let (limit, offset) = page_bounds(limit, offset, config.page_size, config.max_page_size);
        let (count, results) = store.list_polls(limit, offset).await?;
        Ok(PollPage { count, limit, offset, results })
    }

    pub async fn get_poll(store: &dyn PollStore, id: i64) -> Result<Poll, ApiError> {
        store.get_poll(id).await?.ok_or_else(|| ApiError::not_found("Poll", id))
    }

    pub async fn delete_poll(store: &dyn PollStore, id: i64) -> Result<(), ApiError> {
        if !store.delete_poll(id).await? {
            return Err(ApiError::not_found("Poll", id));
        }
        info!(poll_id = id, "Deleted poll");
        Ok(())
    }

    pub async fn list_choices(store: &dyn PollStore, poll_id: i64) -> Result<Vec<Choice>, ApiError> {
        store.list_choices(poll_id).await?.ok_or_else(|| ApiError::not_found("Poll", poll_id))
    }

    pub async fn add_choice(store: &dyn PollStore, poll_id: i64, request: ChoiceTextRequest) -> Result<Choice, ApiError> {
        validate_choice_text(&request.choice_text)?;
        if store.get_poll(poll_id).await?.is_none() {
            return Err(ApiError::not_found("Poll", poll_id));
        }
        Ok(store.create_choice(poll_id, &request.choice_text).await?)
    }

    pub async fn get_choice(store: &dyn PollStore, id: i64) -> Result<Choice, ApiError> {
        store.get_choice(id).await?.ok_or_else(|| ApiError::not_found("Choice", id))
    }

    pub async fn update_choice(store: &dyn PollStore, id: i64, request: ChoiceTextRequest) -> Result<Choice, ApiError> {
        validate_choice_text(&request.choice_text)?;
        store.update_choice(id, &request.choice_text).await?
            .ok_or_else(|| ApiError::not_found("Choice", id))
    }

    /// Records a vote. The poll is taken from the choice; a poll named in the
    /// request must agree with it. Uniqueness per (poll, voter) is decided by
    /// the store's atomic insert.
    pub async fn submit_vote(store: &dyn PollStore, request: CreateVoteRequest) -> Result<Vote, ApiError> {
        let choice = store.get_choice(request.choice).await?
            .ok_or_else(|| ApiError::not_found("Choice", request.choice))?;

        let poll_id = validate_vote_target(&choice, request.poll).map_err(|e| {
            debug!(choice_id = choice.id, claimed = ?request.poll, actual = choice.poll, "Choice/poll mismatch");
            e
        })?;

        if store.get_account(request.voted_by).await?.is_none() {
            return Err(ApiError::not_found("Account", request.voted_by));
        }

        let vote = store.create_vote(choice.id, poll_id, request.voted_by).await.map_err(|e| {
            let err = ApiError::from(e);
            if matches!(err, ApiError::Validation(_)) {
                warn!(poll_id, voter = request.voted_by, "Rejected duplicate vote");
            }
            err
        })?;
        info!(vote_id = vote.id, poll_id, choice_id = vote.choice, "Recorded vote");
        Ok(vote)
    }

    pub async fn cast_vote_for_choice(
        store: &dyn PollStore,
        poll_id: i64,
        choice_id: i64,
        request: CastVoteRequest,
    ) -> Result<Vote, ApiError> {
        Self::submit_vote(store, CreateVoteRequest {
            poll: Some(poll_id),
            choice: choice_id,
            voted_by: request.voted_by,
        }).await
    }

    pub async fn create_account(
        store: &dyn PollStore,
        config: &AppConfig,
        request: CreateAccountRequest,
    ) -> Result<Account, ApiError> {
        validate_account_request(&request)?;
        let CreateAccountRequest { username, email, password } = request;

        // PBKDF2 runs on the blocking pool
        let iterations = config.hash_iterations;
        let password_hash = spawn_blocking(move || hash_password(&password, iterations))
            .await
            .map_err(|e| ApiError::Storage(format!("hashing task failed: {e}")))?
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        let account = store.create_account(&NewAccount { username, email, password_hash }).await?;
        info!(account_id = account.id, "Created account");
        Ok(account)
    }

    pub async fn get_account(store: &dyn PollStore, id: i64) -> Result<Account, ApiError> {
        store.get_account(id).await?.ok_or_else(|| ApiError::not_found("Account", id))
    }

    /// Credential check for an external session layer. Unknown usernames and
    /// wrong passwords are indistinguishable.
    pub async fn verify_credentials(store: &dyn PollStore, username: &str, password: &str) -> Result<bool, ApiError> {
        let Some(hash) = store.get_password_hash(username).await? else { return Ok(false) };
        let password = password.to_owned();
        spawn_blocking(move || check_password(&password, &hash))
            .await
            .map_err(|e| ApiError::Storage(format!("hashing task failed: {e}")))
    }
}
