use std::path::PathBuf;

use include_dir::{include_dir, Dir};
use rocket::{
    form::Form,
    get,
    http::ContentType,
    post,
    response::{content::RawHtml, Redirect},
    serde::json::{json, Value},
    uri, State,
};
use shared::{ValidationError, VoteChoice};
use tracing::{debug, error, instrument, warn};

use crate::{error::ApiError, processor::VoteProcessor, render::render_index, request_info::RequestInfo};

static STATIC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

pub struct AppState {
    pub processor: VoteProcessor,
}

impl AppState {
    pub fn new(processor: VoteProcessor) -> Self {
        Self { processor }
    }
}

#[derive(Debug, rocket::FromForm)]
pub struct VoteForm {
    pub vote: Option<String>,
}

#[instrument(skip(state))]
#[get("/")]
pub async fn index(state: &State<AppState>) -> Result<RawHtml<String>, ApiError> {
    let counts = state.processor.fetch_counts().await.map_err(|e| {
        error!("Failed to read vote counts: {}", e);
        e
    })?;

    debug!("Rendering index with {} total votes", counts.total());
    Ok(RawHtml(render_index(state.processor.settings(), &counts)))
}

#[instrument(skip(state, form, request), fields(request_id = %request.id, client_ip = %request.ip))]
#[post("/", data = "<form>")]
pub async fn cast_vote(
    state: &State<AppState>,
    form: Form<VoteForm>,
    request: RequestInfo,
) -> Result<Redirect, ApiError> {
    let options = &state.processor.settings().options;

    let choice = VoteChoice::parse(form.vote.as_deref(), options).map_err(|e| {
        warn!("Rejected vote: {}", e);
        ApiError::from(e)
    })?;

    state.processor.apply(choice).await.map_err(|e| {
        error!("Failed to apply vote: {}", e);
        e
    })?;

    Ok(Redirect::to(uri!(index)))
}

/// Reached when the POST carries no form body (the form guard forwards
/// on any other content type), which leaves `vote` absent.
#[instrument(skip(request), fields(request_id = %request.id, client_ip = %request.ip))]
#[post("/", rank = 2)]
pub fn cast_vote_without_form(request: RequestInfo) -> ApiError {
    warn!("Rejected vote: request has no form body");
    ApiError::from(ValidationError::MissingVote)
}

#[get("/static/<path..>")]
pub fn static_asset(path: PathBuf) -> Option<(ContentType, &'static [u8])> {
    let file = STATIC_DIR.get_file(&path)?;
    let content_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ContentType::from_extension)
        .unwrap_or(ContentType::Binary);

    Some((content_type, file.contents()))
}

#[get("/health")]
pub fn health() -> Value {
    json!({ "status": "ok" })
}
