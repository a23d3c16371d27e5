use rocket::http::Status;
use rocket::response::Responder;
use shared::ValidationError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid vote: {0}")]
    InvalidVote(#[from] ValidationError),
    #[error("Counter {0} is missing from the store")]
    MissingCounter(String),
    #[error("Counter {key} holds a non-numeric value: {value:?}")]
    MalformedCounter { key: String, value: String },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = match self {
            ApiError::InvalidVote(_) => Status::BadRequest,
            ApiError::MissingCounter(_) => Status::InternalServerError,
            ApiError::MalformedCounter { .. } => Status::InternalServerError,
            ApiError::Store(_) => Status::InternalServerError,
        };

        rocket::Response::build_from(self.to_string().respond_to(req)?)
            .status(status)
            .ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Figment(#[from] Box<rocket::figment::Error>),
    #[error("Invalid configuration value: {0}")]
    Invalid(#[from] ValidationError),
    #[error("Failed to resolve hostname: {0}")]
    Hostname(#[from] std::io::Error),
}

impl From<rocket::figment::Error> for ConfigError {
    fn from(e: rocket::figment::Error) -> Self {
        ConfigError::Figment(Box::new(e))
    }
}
