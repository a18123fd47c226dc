use rust_decimal::Decimal;

use crate::config::{TabulationConfig, WinnerElectionMode};
use crate::decimal::VoteArith;

/// Computes the tally a candidate must reach to be elected, from the sum of
/// continuing-candidate votes in the round the threshold is (re)set.
///
/// The divisor is `seats + 1` (Droop) unless the Hare quota is enabled, in
/// which case it is `seats`. Bottoms-up threshold contests instead take a
/// fixed share of the first-round votes.
pub(crate) fn winning_threshold(
    total_votes: Decimal,
    config: &TabulationConfig,
    arith: &VoteArith,
) -> Decimal {
    if config.winner_election_mode == WinnerElectionMode::MultiSeatBottomsUpThreshold {
        let percentage = config.bottoms_up_percentage_threshold.unwrap_or(Decimal::ONE);
        return arith.mul(total_votes, percentage);
    }
    let divisor = Decimal::from(if config.hare_quota {
        config.number_of_winners
    } else {
        config.number_of_winners + 1
    });
    if config.non_integer_winning_threshold {
        arith.div(total_votes, divisor) + arith.smallest_unit()
    } else {
        arith.div_integral(total_votes, divisor) + Decimal::ONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn integer_droop_threshold() {
        let config = TabulationConfig::default();
        let arith = VoteArith::new(4);
        assert_eq!(winning_threshold(d("10"), &config, &arith), d("6"));
        assert_eq!(winning_threshold(d("100"), &config, &arith), d("51"));
    }

    #[test]
    fn multi_seat_droop_threshold() {
        let mut config = TabulationConfig::default();
        config.winner_election_mode = WinnerElectionMode::MultiSeatAllowMultiplePerRound;
        config.number_of_winners = 2;
        let arith = VoteArith::new(4);
        assert_eq!(winning_threshold(d("100"), &config, &arith), d("34"));
    }

    #[test]
    fn non_integer_threshold_adds_one_smallest_unit() {
        let mut config = TabulationConfig::default();
        config.winner_election_mode = WinnerElectionMode::MultiSeatAllowMultiplePerRound;
        config.number_of_winners = 2;
        config.non_integer_winning_threshold = true;
        let arith = VoteArith::new(4);
        assert_eq!(winning_threshold(d("100"), &config, &arith), d("33.3334"));
    }

    #[test]
    fn hare_quota_divides_by_the_seat_count() {
        let mut config = TabulationConfig::default();
        config.winner_election_mode = WinnerElectionMode::MultiSeatAllowMultiplePerRound;
        config.number_of_winners = 2;
        config.hare_quota = true;
        let arith = VoteArith::new(4);
        assert_eq!(winning_threshold(d("100"), &config, &arith), d("51"));
    }

    #[test]
    fn bottoms_up_threshold_is_a_share_of_the_votes() {
        let mut config = TabulationConfig::default();
        config.winner_election_mode = WinnerElectionMode::MultiSeatBottomsUpThreshold;
        config.number_of_winners = 0;
        config.bottoms_up_percentage_threshold = Some(d("0.125"));
        let arith = VoteArith::new(4);
        assert_eq!(winning_threshold(d("200"), &config, &arith), d("25"));
    }
}
