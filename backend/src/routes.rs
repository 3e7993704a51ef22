use std::sync::Arc;

use rocket::{State, get, post, put, delete, http::Status, serde::json::Json};
use rocket::response::status::Created;
use serde_json::{json, Value};
use tracing::instrument;
use shared::models::*;
use crate::{
    config::AppConfig,
    error::ApiError,
    processor::PollProcessor,
    store::PollStore,
};

pub struct AppState {
    pub store: Arc<dyn PollStore>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn PollStore>, config: AppConfig) -> Self {
        Self { store, config }
    }

    fn store(&self) -> &dyn PollStore {
        self.store.as_ref()
    }
}

#[get("/")]
pub async fn index() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Polls API is running"
    }))
}

#[instrument(skip(state, request))]
#[post("/polls", format = "json", data = "<request>")]
pub async fn create_poll(
    state: &State<AppState>,
    request: Json<CreatePollRequest>,
) -> Result<Created<Json<Poll>>, ApiError> {
    let poll = PollProcessor::create_poll(state.store(), request.into_inner()).await?;
    Ok(Created::new(format!("/polls/{}", poll.id)).body(Json(poll)))
}

#[get("/polls?<limit>&<offset>")]
pub async fn list_polls(
    state: &State<AppState>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<Json<PollPage>, ApiError> {
    PollProcessor::list_polls(state.store(), &state.config, limit, offset)
        .await
        .map(Json)
}

#[get("/polls/<id>")]
pub async fn get_poll(state: &State<AppState>, id: i64) -> Result<Json<Poll>, ApiError> {
    PollProcessor::get_poll(state.store(), id).await.map(Json)
}

#[instrument(skip(state))]
#[delete("/polls/<id>")]
pub async fn delete_poll(state: &State<AppState>, id: i64) -> Result<Status, ApiError> {
    PollProcessor::delete_poll(state.store(), id).await?;
    Ok(Status::NoContent)
}

#[get("/polls/<id>/choices")]
pub async fn list_choices(state: &State<AppState>, id: i64) -> Result<Json<Vec<Choice>>, ApiError> {
    PollProcessor::list_choices(state.store(), id).await.map(Json)
}

#[instrument(skip(state, request))]
#[post("/polls/<id>/choices", format = "json", data = "<request>")]
pub async fn add_choice(
    state: &State<AppState>,
    id: i64,
    request: Json<ChoiceTextRequest>,
) -> Result<Created<Json<Choice>>, ApiError> {
    let choice = PollProcessor::add_choice(state.store(), id, request.into_inner()).await?;
    Ok(Created::new(format!("/choices/{}", choice.id)).body(Json(choice)))
}

#[instrument(skip(state, request))]
#[post("/polls/<poll_id>/choices/<choice_id>/vote", format = "json", data = "<request>")]
pub async fn cast_vote(
    state: &State<AppState>,
    poll_id: i64,
    choice_id: i64,
    request: Json<CastVoteRequest>,
) -> Result<Created<Json<Vote>>, ApiError> {
    let vote = PollProcessor::cast_vote_for_choice(state.store(), poll_id, choice_id, request.into_inner()).await?;
    Ok(Created::new(format!("/votes/{}", vote.id)).body(Json(vote)))
}

#[get("/choices/<id>")]
pub async fn get_choice(state: &State<AppState>, id: i64) -> Result<Json<Choice>, ApiError> {
    PollProcessor::get_choice(state.store(), id).await.map(Json)
}

#[instrument(skip(state, request))]
#[put("/choices/<id>", format = "json", data = "<request>")]
pub async fn update_choice(
    state: &State<AppState>,
    id: i64,
    request: Json<ChoiceTextRequest>,
) -> Result<Json<Choice>, ApiError> {
    PollProcessor::update_choice(state.store(), id, request.into_inner()).await.map(Json)
}

#[instrument(skip(state, request))]
#[post("/votes", format = "json", data = "<request>")]
pub async fn create_vote(
    state: &State<AppState>,
    request: Json<CreateVoteRequest>,
) -> Result<Created<Json<Vote>>, ApiError> {
    let vote = PollProcessor::submit_vote(state.store(), request.into_inner()).await?;
    Ok(Created::new(format!("/votes/{}", vote.id)).body(Json(vote)))
}

#[instrument(skip(state, request))]
#[post("/users", format = "json", data = "<request>")]
pub async fn create_user(
    state: &State<AppState>,
    request: Json<CreateAccountRequest>,
) -> Result<Created<Json<Account>>, ApiError> {
    let account = PollProcessor::create_account(state.store(), &state.config, request.into_inner()).await?;
    Ok(Created::new(format!("/users/{}", account.id)).body(Json(account)))
}

#[get("/users/<id>")]
pub async fn get_user(state: &State<AppState>, id: i64) -> Result<Json<Account>, ApiError> {
    PollProcessor::get_account(state.store(), id).await.map(Json)
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}
