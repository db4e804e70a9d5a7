//! The durable user account: ratio, hit-and-run, and bonus-point state.
use privateer_tracker_configuration::RatioPolicy;
use privateer_tracker_primitives::passkey::Passkey;

/// A tracker account, identified by its unique [`Passkey`].
///
/// Mutated only by the stats pipeline, the HnR detector, and the bonus
/// calculator (§3 ownership). The request path only ever reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub passkey: Passkey,
    pub uploaded: u64,
    pub downloaded: u64,
    pub hnr_warnings: u32,
    pub can_leech: bool,
    /// Per-user override of the global minimum ratio. `0.0` means "use the
    /// global policy".
    pub required_ratio: f64,
    pub bonus_points: f64,
}

/// Why a leecher announce was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeechDenied {
    LeechingDisabled,
    RatioTooLow,
}

impl LeechDenied {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            LeechDenied::LeechingDisabled => "Leeching disabled — please contact staff",
            LeechDenied::RatioTooLow => "Ratio too low — seed more before downloading",
        }
    }
}

impl std::fmt::Display for LeechDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for LeechDenied {}

impl User {
    /// The ratio this user must meet: their own override when set, else the
    /// tracker's global minimum.
    #[must_use]
    pub fn required_ratio(&self, policy: &RatioPolicy) -> f64 {
        if self.required_ratio > 0.0 {
            self.required_ratio
        } else {
            policy.min_ratio
        }
    }

    /// Leech eligibility check (§4.10). Seeders never call this: only
    /// evaluated for announces with `left > 0`.
    ///
    /// # Errors
    ///
    /// Returns [`LeechDenied`] when the user may not download further.
    pub fn check_leech_eligibility(&self, policy: &RatioPolicy) -> Result<(), LeechDenied> {
        if !self.can_leech {
            return Err(LeechDenied::LeechingDisabled);
        }

        if self.downloaded == 0 || self.downloaded < policy.grace_bytes {
            return Ok(());
        }

        let ratio = self.uploaded as f64 / self.downloaded as f64;

        if ratio >= self.required_ratio(policy) {
            Ok(())
        } else {
            Err(LeechDenied::RatioTooLow)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LeechDenied, User};
    use privateer_tracker_configuration::RatioPolicy;
    use privateer_tracker_primitives::passkey::Passkey;

    fn sample_user() -> User {
        User {
            id: 1,
            passkey: "00000000000000000000000000000001".parse::<Passkey>().unwrap(),
            uploaded: 0,
            downloaded: 0,
            hnr_warnings: 0,
            can_leech: true,
            required_ratio: 0.0,
            bonus_points: 0.0,
        }
    }

    #[test]
    fn a_user_who_has_not_downloaded_anything_may_always_leech() {
        let user = sample_user();
        let policy = RatioPolicy {
            min_ratio: 1.0,
            grace_bytes: 0,
        };

        assert!(user.check_leech_eligibility(&policy).is_ok());
    }

    #[test]
    fn a_user_under_the_grace_allowance_may_leech_regardless_of_ratio() {
        let user = User {
            downloaded: 100,
            ..sample_user()
        };
        let policy = RatioPolicy {
            min_ratio: 1.0,
            grace_bytes: 1_000,
        };

        assert!(user.check_leech_eligibility(&policy).is_ok());
    }

    #[test]
    fn a_user_below_the_required_ratio_past_grace_is_denied() {
        let user = User {
            uploaded: 100_000_000,
            downloaded: 10_000_000_000,
            ..sample_user()
        };
        let policy = RatioPolicy {
            min_ratio: 0.3,
            grace_bytes: 0,
        };

        assert_eq!(user.check_leech_eligibility(&policy), Err(LeechDenied::RatioTooLow));
    }

    #[test]
    fn a_user_with_leeching_disabled_is_always_denied() {
        let user = User {
            can_leech: false,
            ..sample_user()
        };
        let policy = RatioPolicy {
            min_ratio: 0.0,
            grace_bytes: 0,
        };

        assert_eq!(user.check_leech_eligibility(&policy), Err(LeechDenied::LeechingDisabled));
    }

    #[test]
    fn a_per_user_required_ratio_overrides_the_global_policy() {
        let user = User {
            uploaded: 50,
            downloaded: 100,
            required_ratio: 0.4,
            ..sample_user()
        };
        let policy = RatioPolicy {
            min_ratio: 1.0,
            grace_bytes: 0,
        };

        assert!(user.check_leech_eligibility(&policy).is_ok());
    }
}
