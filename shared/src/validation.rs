use crate::models::{VoteChoice, VoteOptions, RESET_VOTE};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty option text")]
    EmptyOption,
    #[error("Duplicate option: {0}")]
    DuplicateOption(String),
    #[error("Option may not be named \"{RESET_VOTE}\"")]
    ReservedOption,
    #[error("Missing vote")]
    MissingVote,
    #[error("Unrecognized vote: {0}")]
    UnrecognizedVote(String),
}

pub fn validate_options(options: &VoteOptions) -> Result<(), ValidationError> {
    for option in options.keys() {
        if option.trim().is_empty() { return Err(ValidationError::EmptyOption); }
        if option == RESET_VOTE { return Err(ValidationError::ReservedOption); }
    }

    if options.first == options.second {
        return Err(ValidationError::DuplicateOption(options.first.clone()));
    }

    Ok(())
}

impl VoteChoice {
    /// Anything other than `reset` or one of the two configured options is
    /// rejected, so a form can never create a counter under an arbitrary key.
    pub fn parse(raw: Option<&str>, options: &VoteOptions) -> Result<Self, ValidationError> {
        let value = raw.ok_or(ValidationError::MissingVote)?;

        if value == RESET_VOTE {
            return Ok(VoteChoice::Reset);
        }

        options
            .slot_of(value)
            .map(VoteChoice::Cast)
            .ok_or_else(|| ValidationError::UnrecognizedVote(value.to_string()))
    }
}
