// =============================================================================
// Vote-based Policies — Majority Vote and Consensus
// =============================================================================
//
// Both ignore weights and produce no continuous score.
//
// Majority vote: unweighted count of SELL / HOLD / BUY among contributors.
// The value with a strictly highest count wins; any tie for first place
// resolves to HOLD, never to a directional action.
//
// Consensus: BUY only if every contributor says BUY, SELL only if every
// contributor says SELL, otherwise HOLD. A single contributor is its own
// consensus.
// =============================================================================

use crate::signals::aggregator::{AggregatedSignal, AggregationPolicy};
use crate::signals::alignment::AlignedTable;
use crate::types::{AggregationMethod, Signal};

/// Per-row vote tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteCount {
    pub sell: usize,
    pub hold: usize,
    pub buy: usize,
}

impl VoteCount {
    pub fn tally(row: &[Option<Signal>]) -> Self {
        row.iter().flatten().fold(Self::default(), |mut acc, signal| {
            match signal {
                Signal::Sell => acc.sell += 1,
                Signal::Hold => acc.hold += 1,
                Signal::Buy => acc.buy += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.sell + self.hold + self.buy
    }

    /// Strict plurality winner; ties go to HOLD.
    pub fn winner(&self) -> Signal {
        if self.buy > self.sell && self.buy > self.hold {
            Signal::Buy
        } else if self.sell > self.buy && self.sell > self.hold {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    /// Unanimous direction, if any.
    pub fn unanimous(&self) -> Signal {
        let total = self.total();
        if total > 0 && self.buy == total {
            Signal::Buy
        } else if total > 0 && self.sell == total {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

fn vote_rows(
    table: &AlignedTable,
    method: AggregationMethod,
    decide: impl Fn(&VoteCount) -> Signal,
) -> Vec<AggregatedSignal> {
    table
        .rows()
        .map(|(timestamp, row)| AggregatedSignal {
            timestamp,
            aggregate_value: None,
            binary_signal: decide(&VoteCount::tally(row)),
            contributing_strategies: table.contributors(row),
            policy: method,
            strength_undefined: false,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityVote;

impl AggregationPolicy for MajorityVote {
    fn method(&self) -> AggregationMethod {
        AggregationMethod::MajorityVote
    }

    fn combine(&self, table: &AlignedTable) -> Vec<AggregatedSignal> {
        vote_rows(table, self.method(), VoteCount::winner)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Consensus;

impl AggregationPolicy for Consensus {
    fn method(&self) -> AggregationMethod {
        AggregationMethod::Consensus
    }

    fn combine(&self, table: &AlignedTable) -> Vec<AggregatedSignal> {
        vote_rows(table, self.method(), VoteCount::unanimous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use Signal::{Buy, Hold, Sell};

    fn count(row: &[Option<Signal>]) -> VoteCount {
        VoteCount::tally(row)
    }

    #[test]
    fn tally_skips_absent() {
        let c = count(&[Some(Buy), None, Some(Sell), Some(Buy), None]);
        assert_eq!(c, VoteCount { sell: 1, hold: 0, buy: 2 });
        assert_eq!(c.total(), 3);
    }

    #[test]
    fn majority_picks_strict_plurality() {
        assert_eq!(count(&[Some(Buy), Some(Buy), Some(Sell)]).winner(), Buy);
        assert_eq!(count(&[Some(Sell), Some(Sell), Some(Hold)]).winner(), Sell);
        assert_eq!(count(&[Some(Hold), Some(Hold), Some(Buy)]).winner(), Hold);
    }

    #[test]
    fn majority_ties_resolve_to_hold() {
        assert_eq!(count(&[Some(Buy), Some(Sell)]).winner(), Hold);
        assert_eq!(count(&[Some(Buy), Some(Buy), Some(Hold), Some(Hold)]).winner(), Hold);
        assert_eq!(count(&[Some(Buy), Some(Sell), Some(Hold)]).winner(), Hold);
    }

    #[test]
    fn consensus_requires_unanimity() {
        assert_eq!(count(&[Some(Buy), Some(Buy), None]).unanimous(), Buy);
        assert_eq!(count(&[Some(Sell), Some(Sell)]).unanimous(), Sell);
        assert_eq!(count(&[Some(Buy), Some(Hold), Some(Buy)]).unanimous(), Hold);
        assert_eq!(count(&[Some(Buy), Some(Sell)]).unanimous(), Hold);
    }

    #[test]
    fn consensus_of_one_is_itself() {
        assert_eq!(count(&[None, Some(Sell)]).unanimous(), Sell);
        assert_eq!(count(&[Some(Buy)]).unanimous(), Buy);
    }

    #[test]
    fn empty_tally_holds() {
        let c = count(&[None, None]);
        assert_eq!(c.winner(), Hold);
        assert_eq!(c.unanimous(), Hold);
    }
}
