//! Intrabar ambiguity resolution.
//!
//! When one bar's high-low range reaches both the target and the stop, OHLC
//! data cannot say which came first. The tie-break policy decides:
//! CONSERVATIVE assumes the stop (the adverse level) filled first,
//! OPTIMISTIC assumes the target did.

use crate::config::TieBreakPolicy;
use crate::domain::PriceBar;
use crate::signal::Direction;

use super::outcome::{Outcome, TradeLevels};

impl TieBreakPolicy {
    /// Outcome assigned to a bar that straddles both levels.
    pub fn straddle_outcome(self) -> Outcome {
        match self {
            Self::Conservative => Outcome::SlFirst,
            Self::Optimistic => Outcome::TpFirst,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Conservative => "CONSERVATIVE",
            Self::Optimistic => "OPTIMISTIC",
        }
    }
}

/// Which level, if any, bar `bar` resolves.
pub(crate) fn resolve_bar(
    bar: &PriceBar,
    levels: &TradeLevels,
    policy: TieBreakPolicy,
) -> Option<Outcome> {
    let (tp_hit, sl_hit) = match levels.direction {
        Direction::Long => (bar.high >= levels.target, bar.low <= levels.stop),
        Direction::Short => (bar.low <= levels.target, bar.high >= levels.stop),
        Direction::Hold => return None,
    };
    match (tp_hit, sl_hit) {
        (true, true) => Some(policy.straddle_outcome()),
        (true, false) => Some(Outcome::TpFirst),
        (false, true) => Some(Outcome::SlFirst),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Distance;
    use crate::domain::test_support::ohlc;

    fn levels(direction: Direction) -> TradeLevels {
        TradeLevels::new(
            direction,
            100.0,
            Distance::percent(0.02),
            Distance::percent(0.01),
        )
        .unwrap()
    }

    #[test]
    fn conservative_straddle_is_stop_first() {
        let wide = ohlc(1, 100.0, 103.0, 97.0, 100.0);
        for direction in [Direction::Long, Direction::Short] {
            assert_eq!(
                resolve_bar(&wide, &levels(direction), TieBreakPolicy::Conservative),
                Some(Outcome::SlFirst)
            );
            assert_eq!(
                resolve_bar(&wide, &levels(direction), TieBreakPolicy::Optimistic),
                Some(Outcome::TpFirst)
            );
        }
    }

    #[test]
    fn single_level_hits() {
        // Long: target 102, stop 99.
        let up = ohlc(1, 100.0, 102.0, 99.5, 101.8);
        let down = ohlc(1, 100.0, 100.5, 99.0, 99.1);
        let inside = ohlc(1, 100.0, 101.0, 99.5, 100.2);
        let long = levels(Direction::Long);
        assert_eq!(resolve_bar(&up, &long, TieBreakPolicy::Conservative), Some(Outcome::TpFirst));
        assert_eq!(resolve_bar(&down, &long, TieBreakPolicy::Optimistic), Some(Outcome::SlFirst));
        assert_eq!(resolve_bar(&inside, &long, TieBreakPolicy::Conservative), None);
    }

    #[test]
    fn policy_names() {
        assert_eq!(TieBreakPolicy::Conservative.name(), "CONSERVATIVE");
        assert_eq!(TieBreakPolicy::Optimistic.name(), "OPTIMISTIC");
    }
}
