#[cfg(test)]
mod tests {
    use crate::models::{OptionSlot, VoteChoice, VoteCounts, VoteOptions};
    use crate::validation::{validate_options, ValidationError};

    fn options() -> VoteOptions {
        VoteOptions::new("Cats", "Dogs")
    }

    #[test]
    fn test_parse_choices() {
        let opts = options();
        assert_eq!(VoteChoice::parse(Some("reset"), &opts), Ok(VoteChoice::Reset));
        assert_eq!(VoteChoice::parse(Some("Cats"), &opts), Ok(VoteChoice::Cast(OptionSlot::First)));
        assert_eq!(VoteChoice::parse(Some("Dogs"), &opts), Ok(VoteChoice::Cast(OptionSlot::Second)));
    }

    #[test]
    fn test_parse_rejects_unknown_and_missing() {
        let opts = options();
        assert_eq!(VoteChoice::parse(None, &opts), Err(ValidationError::MissingVote));
        assert!(matches!(
            VoteChoice::parse(Some("Birds"), &opts),
            Err(ValidationError::UnrecognizedVote(v)) if v == "Birds"
        ));
        // matching is exact, labels are store keys
        assert!(VoteChoice::parse(Some("cats"), &opts).is_err());
        assert!(VoteChoice::parse(Some("RESET"), &opts).is_err());
        assert!(VoteChoice::parse(Some(""), &opts).is_err());
    }

    #[test]
    fn test_validate_options() {
        assert!(validate_options(&options()).is_ok());
        assert_eq!(validate_options(&VoteOptions::new("", "Dogs")), Err(ValidationError::EmptyOption));
        assert_eq!(validate_options(&VoteOptions::new("Cats", "   ")), Err(ValidationError::EmptyOption));
        assert_eq!(validate_options(&VoteOptions::new("reset", "Dogs")), Err(ValidationError::ReservedOption));
        assert_eq!(
            validate_options(&VoteOptions::new("Cats", "Cats")),
            Err(ValidationError::DuplicateOption("Cats".into()))
        );
        // no length cap, long labels are valid store keys
        assert!(validate_options(&VoteOptions::new("x".repeat(500), "Dogs")).is_ok());
    }

    #[test]
    fn test_option_helpers() {
        let opts = options();
        assert_eq!(opts.key(OptionSlot::Second), "Dogs");
        assert_eq!(opts.event_name(OptionSlot::First), "Cats Vote");
        assert_eq!(opts.slot_of("Dogs"), Some(OptionSlot::Second));
        assert_eq!(opts.slot_of("Fish"), None);

        let counts = VoteCounts { first: 3, second: 4 };
        assert_eq!(counts.get(OptionSlot::First), 3);
        assert_eq!(counts.total(), 7);
        assert_eq!(VoteCounts::default(), VoteCounts { first: 0, second: 0 });
    }
}
