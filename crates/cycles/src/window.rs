use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use foodflow_core::ValueObject;

/// The ordering window of an order cycle.
///
/// Both bounds are optional: an unset bound is unbounded, and a window with
/// neither bound is "undated" and accepts orders forever. The window never
/// changes state on its own; callers pass `now` and get a pure answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWindow {
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
}

/// Where a window stands relative to a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    /// No bounds at all; always open.
    Undated,
    /// Opens in the future.
    Upcoming,
    /// Accepting orders now.
    Open,
    /// Closing bound has passed.
    Closed,
}

impl OrderWindow {
    pub fn new(opens_at: Option<DateTime<Utc>>, closes_at: Option<DateTime<Utc>>) -> Self {
        Self { opens_at, closes_at }
    }

    pub fn undated() -> Self {
        Self::default()
    }

    /// Classify the window at `now`.
    ///
    /// Open means `opens_at <= now < closes_at`, treating an unset bound as
    /// unbounded on that side.
    pub fn state_at(&self, now: DateTime<Utc>) -> WindowState {
        match (self.opens_at, self.closes_at) {
            (None, None) => WindowState::Undated,
            (opens, closes) => {
                if opens.is_some_and(|t| now < t) {
                    WindowState::Upcoming
                } else if closes.is_some_and(|t| now >= t) {
                    WindowState::Closed
                } else {
                    WindowState::Open
                }
            }
        }
    }

    /// Whether orders are accepted at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.state_at(now), WindowState::Undated | WindowState::Open)
    }
}

impl ValueObject for OrderWindow {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(now: DateTime<Utc>, opens: Option<i64>, closes: Option<i64>) -> OrderWindow {
        OrderWindow::new(
            opens.map(|h| now + Duration::hours(h)),
            closes.map(|h| now + Duration::hours(h)),
        )
    }

    #[test]
    fn undated_window_is_always_open() {
        let now = Utc::now();
        let window = OrderWindow::undated();
        assert_eq!(window.state_at(now), WindowState::Undated);
        assert!(window.is_open_at(now));
    }

    #[test]
    fn classifies_upcoming_open_and_closed() {
        let now = Utc::now();

        assert_eq!(at(now, Some(1), Some(2)).state_at(now), WindowState::Upcoming);
        assert_eq!(at(now, Some(-1), Some(1)).state_at(now), WindowState::Open);
        assert_eq!(at(now, Some(-2), Some(-1)).state_at(now), WindowState::Closed);
    }

    #[test]
    fn open_bound_is_inclusive_close_bound_is_exclusive() {
        let now = Utc::now();

        let opens_now = OrderWindow::new(Some(now), Some(now + Duration::hours(1)));
        assert_eq!(opens_now.state_at(now), WindowState::Open);

        let closes_now = OrderWindow::new(Some(now - Duration::hours(1)), Some(now));
        assert_eq!(closes_now.state_at(now), WindowState::Closed);
    }

    #[test]
    fn single_bound_is_unbounded_on_the_other_side() {
        let now = Utc::now();

        let only_close = at(now, None, Some(1));
        assert_eq!(only_close.state_at(now), WindowState::Open);

        let only_open = at(now, Some(-1), None);
        assert_eq!(only_open.state_at(now), WindowState::Open);

        let closed_long_ago = at(now, None, Some(-1));
        assert_eq!(closed_long_ago.state_at(now), WindowState::Closed);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: `is_open_at` agrees with the state classification.
            #[test]
            fn openness_matches_state(
                opens in proptest::option::of(-1000i64..1000),
                closes in proptest::option::of(-1000i64..1000)
            ) {
                let now = Utc::now();
                let window = OrderWindow::new(
                    opens.map(|m| now + Duration::minutes(m)),
                    closes.map(|m| now + Duration::minutes(m)),
                );

                let state = window.state_at(now);
                prop_assert_eq!(
                    window.is_open_at(now),
                    matches!(state, WindowState::Undated | WindowState::Open)
                );

                // Undated exactly when no bound is set.
                prop_assert_eq!(
                    state == WindowState::Undated,
                    opens.is_none() && closes.is_none()
                );
            }
        }
    }
}
