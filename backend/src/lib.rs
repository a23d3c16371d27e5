pub mod catchers;
pub mod config;
pub mod error;
pub mod processor;
pub mod render;
pub mod request_info;
pub mod request_tracing;
pub mod routes;
pub mod store;
pub mod telemetry;
pub use shared::{models::*, validation::*};

use rocket::{catchers, figment::Provider, routes, Build, Rocket};

use crate::catchers::{bad_request, internal_error, not_found, unprocessable, unsupported_media_type};
use crate::request_tracing::RequestTracing;
use crate::routes::{cast_vote, cast_vote_without_form, health, index, static_asset, AppState};

/// Assembles the application around an already initialized state.
pub fn build_rocket<T: Provider>(figment: T, state: AppState) -> Rocket<Build> {
    let request_tracing = RequestTracing::new(state.processor.telemetry());

    rocket::custom(figment)
        .attach(request_tracing)
        .manage(state)
        .mount("/", routes![index, cast_vote, cast_vote_without_form, static_asset, health])
        .register(
            "/",
            catchers![bad_request, not_found, unsupported_media_type, unprocessable, internal_error],
        )
}
