use crate::repo::Strategy;

/// Explicit flag > persisted config default > hardcoded rebase.
pub fn resolve_strategy(explicit: Option<Strategy>, config_default: Option<Strategy>) -> Strategy {
    explicit.or(config_default).unwrap_or(Strategy::Rebase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flag_wins_over_config() {
        assert_eq!(
            resolve_strategy(Some(Strategy::Merge), Some(Strategy::Rebase)),
            Strategy::Merge
        );
        assert_eq!(
            resolve_strategy(Some(Strategy::Rebase), Some(Strategy::Merge)),
            Strategy::Rebase
        );
    }

    #[test]
    fn config_default_wins_over_fallback() {
        assert_eq!(
            resolve_strategy(None, Some(Strategy::Merge)),
            Strategy::Merge
        );
    }

    #[test]
    fn fallback_is_rebase() {
        assert_eq!(resolve_strategy(None, None), Strategy::Rebase);
    }
}
