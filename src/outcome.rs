//! Action outcomes and the status tolerance policy.
//!
//! Some non-2xx responses are the expected result of an action, e.g. a 401
//! for a deliberately wrong password. Those are downgraded to
//! [`ActionOutcome::Tolerated`]; everything else non-2xx becomes an
//! [`ActionError::UnexpectedStatus`].

use crate::errors::ActionError;

/// Default basket total above which a 406 on checkout is expected.
pub const DEFAULT_CHECKOUT_TOTAL_THRESHOLD: f64 = 100.0;

/// Final classification of one leaf action.
#[derive(Debug)]
pub enum ActionOutcome {
    /// Every call returned the status it was expected to.
    Success,

    /// A non-2xx status that the tolerance rules accept for this action.
    Tolerated { status: u16, reason: &'static str },

    /// The action failed; the session carries on with its next task.
    Failed(ActionError),
}

impl ActionOutcome {
    /// True for both `Success` and `Tolerated`.
    pub fn is_success(&self) -> bool {
        !matches!(self, ActionOutcome::Failed(_))
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            ActionOutcome::Success => "success",
            ActionOutcome::Tolerated { .. } => "tolerated",
            ActionOutcome::Failed(_) => "failed",
        }
    }
}

impl From<Result<ActionOutcome, ActionError>> for ActionOutcome {
    fn from(result: Result<ActionOutcome, ActionError>) -> Self {
        result.unwrap_or_else(ActionOutcome::Failed)
    }
}

/// A condition under which a non-2xx status counts as a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToleranceRule {
    /// The status is always acceptable for this action.
    Always { status: u16, reason: &'static str },

    /// The status is acceptable only when the basket total is known and
    /// strictly greater than `threshold`.
    BasketTotalAbove { status: u16, threshold: f64 },
}

impl ToleranceRule {
    pub fn status(&self) -> u16 {
        match self {
            ToleranceRule::Always { status, .. } => *status,
            ToleranceRule::BasketTotalAbove { status, .. } => *status,
        }
    }

    fn accepts(&self, status: u16, basket_total: Option<f64>) -> Option<&'static str> {
        match *self {
            ToleranceRule::Always { status: s, reason } if s == status => Some(reason),
            ToleranceRule::BasketTotalAbove { status: s, threshold } if s == status => {
                match basket_total {
                    Some(total) if total > threshold => Some("basket total too high"),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Classify a response status for an action.
///
/// 2xx is success. A status matched by one of `rules` is tolerated. Anything
/// else is an unexpected status error.
pub fn classify(
    endpoint: &str,
    status: u16,
    rules: &[ToleranceRule],
    basket_total: Option<f64>,
) -> Result<ActionOutcome, ActionError> {
    if (200..300).contains(&status) {
        return Ok(ActionOutcome::Success);
    }

    if let Some(reason) = rules
        .iter()
        .find_map(|rule| rule.accepts(status, basket_total))
    {
        return Ok(ActionOutcome::Tolerated { status, reason });
    }

    Err(ActionError::UnexpectedStatus {
        endpoint: endpoint.to_string(),
        status,
    })
}

/// Tunable parts of the tolerance rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TolerancePolicy {
    /// A 406 on web checkout is expected only above this basket total.
    pub checkout_total_threshold: f64,
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        Self {
            checkout_total_threshold: DEFAULT_CHECKOUT_TOTAL_THRESHOLD,
        }
    }
}

impl TolerancePolicy {
    /// Web checkout: 406 means the order was refused for its total.
    pub fn checkout(&self) -> [ToleranceRule; 1] {
        [ToleranceRule::BasketTotalAbove {
            status: 406,
            threshold: self.checkout_total_threshold,
        }]
    }

    /// API order placement: any 406 is accepted.
    pub fn api_order(&self) -> [ToleranceRule; 1] {
        [ToleranceRule::Always {
            status: 406,
            reason: "order refused",
        }]
    }

    /// Login with credentials that cannot exist.
    pub fn bad_login(&self) -> [ToleranceRule; 1] {
        [ToleranceRule::Always {
            status: 401,
            reason: "invalid credentials rejected",
        }]
    }

    /// Checkout with an empty payload.
    pub fn empty_checkout(&self) -> [ToleranceRule; 1] {
        [ToleranceRule::Always {
            status: 500,
            reason: "empty order rejected",
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_2xx_is_success() {
        for status in [200, 201, 202, 204] {
            let outcome = classify("/orders", status, &[], None).unwrap();
            assert!(matches!(outcome, ActionOutcome::Success));
        }
    }

    #[test]
    fn test_unmatched_status_is_unexpected() {
        let err = classify("/orders", 503, &TolerancePolicy::default().api_order(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::UnexpectedStatus { status: 503, .. }
        ));
    }

    #[test]
    fn test_redirect_is_not_success() {
        assert!(classify("/", 302, &[], None).is_err());
    }

    #[test]
    fn test_always_rule() {
        let policy = TolerancePolicy::default();
        let outcome = classify("/login", 401, &policy.bad_login(), None).unwrap();
        match outcome {
            ActionOutcome::Tolerated { status, .. } => assert_eq!(status, 401),
            other => panic!("expected tolerated, got {:?}", other),
        }
    }

    #[test]
    fn test_basket_total_threshold_boundary() {
        let policy = TolerancePolicy::default();
        let rules = policy.checkout();

        assert!(classify("/orders", 406, &rules, Some(100.01)).is_ok());
        assert!(classify("/orders", 406, &rules, Some(100.0)).is_err());
        assert!(classify("/orders", 406, &rules, Some(12.5)).is_err());
        assert!(classify("/orders", 406, &rules, None).is_err());
    }

    #[test]
    fn test_threshold_is_configurable() {
        let policy = TolerancePolicy {
            checkout_total_threshold: 10.0,
        };
        assert!(classify("/orders", 406, &policy.checkout(), Some(12.5)).is_ok());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ActionOutcome::Success.label(), "success");
        assert!(ActionOutcome::Tolerated {
            status: 401,
            reason: "x"
        }
        .is_success());

        let failed: ActionOutcome = Err(ActionError::UnexpectedStatus {
            endpoint: "/".to_string(),
            status: 500,
        })
        .into();
        assert!(!failed.is_success());
        assert_eq!(failed.label(), "failed");
    }
}
