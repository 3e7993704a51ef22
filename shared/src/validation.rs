use crate::models::{Choice, CreateAccountRequest, CreatePollRequest, NewPoll};

pub const MAX_QUESTION_LENGTH: usize = 100;
pub const MAX_CHOICE_TEXT_LENGTH: usize = 100;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("choice_strings needed")]
    ChoiceStringsNeeded,
    #[error("Choice must be valid")]
    ChoiceNotInPoll,
    #[error("User already voted for this poll")]
    AlreadyVoted,
    #[error("question may not be blank")]
    BlankQuestion,
    #[error("question may not exceed {MAX_QUESTION_LENGTH} characters")]
    QuestionTooLong,
    #[error("choice_text may not be blank")]
    BlankChoiceText,
    #[error("choice_text may not exceed {MAX_CHOICE_TEXT_LENGTH} characters")]
    ChoiceTextTooLong,
    #[error("username may not be blank")]
    BlankUsername,
    #[error("username may not exceed {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,
    #[error("A user with that username already exists.")]
    UsernameTaken,
    #[error("Enter a valid email address.")]
    InvalidEmail,
    #[error("email may not exceed {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,
    #[error("password may not be blank")]
    BlankPassword,
}

pub fn validate_poll_request(request: CreatePollRequest) -> Result<NewPoll, ValidationError> {
    let choices = match request.choice_strings {
        Some(choices) if !choices.is_empty() => choices,
        _ => return Err(ValidationError::ChoiceStringsNeeded),
    };

    if request.question.trim().is_empty() { return Err(ValidationError::BlankQuestion); }
    if request.question.chars().count() > MAX_QUESTION_LENGTH { return Err(ValidationError::QuestionTooLong); }

    for choice in &choices {
        validate_choice_text(choice)?;
    }

    Ok(NewPoll {
        question: request.question,
        created_by: request.created_by,
        choices,
    })
}

pub fn validate_choice_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() { return Err(ValidationError::BlankChoiceText); }
    if text.chars().count() > MAX_CHOICE_TEXT_LENGTH { return Err(ValidationError::ChoiceTextTooLong); }
    Ok(())
}

/// Resolves the poll a vote counts toward. The poll always comes from the
/// choice; a poll named by the client is only compared against it.
pub fn validate_vote_target(choice: &Choice, claimed_poll: Option<i64>) -> Result<i64, ValidationError> {
    match claimed_poll {
        Some(poll) if poll != choice.poll => Err(ValidationError::ChoiceNotInPoll),
        _ => Ok(choice.poll),
    }
}

pub fn validate_account_request(request: &CreateAccountRequest) -> Result<(), ValidationError> {
    if request.username.trim().is_empty() { return Err(ValidationError::BlankUsername); }
    if request.username.chars().count() > MAX_USERNAME_LENGTH { return Err(ValidationError::UsernameTooLong); }
    if !is_valid_email(&request.email) { return Err(ValidationError::InvalidEmail); }
    if request.email.chars().count() > MAX_EMAIL_LENGTH { return Err(ValidationError::EmailTooLong); }
    if request.password.is_empty() { return Err(ValidationError::BlankPassword); }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.rsplit_once('@') else { return false };
    if local.is_empty() || local.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

/// Normalizes listing bounds: `limit` falls back to `default_limit`, is raised
/// to at least 1 and capped at `max_limit`; a negative offset becomes 0.
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>, default_limit: i64, max_limit: i64) -> (i64, i64) {
    let max_limit = max_limit.max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, max_limit);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}
