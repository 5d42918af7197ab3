//! Tracker of the partition and the peer group of the current row

/// State of the partition that is being processed. It is created when the first
/// row of the partition reaches the head of the pending batches and lives across
/// the calls of the engine until all of its rows are processed.
///
/// Ranking values are computed incrementally: a new frame starts at the first
/// row of each peer group, all of the rows in the frame share the rank values
/// computed at its start
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Number of rows in the partition known so far
    length: u64,
    /// Number of rows that are not processed yet
    remaining: u64,
    /// Number of rows in the current frame that are not processed yet
    peers: u64,
    /// False if the partition may continue in the data blocks not received yet
    is_length_final: bool,
    row_number: u64,
    rank: u64,
    dense_rank: u64,
    percent_rank: f64,
    cume_dist: f64,
}

impl Partition {
    /// Create a new partition with `length` rows
    pub fn new(length: u64, is_length_final: bool) -> Self {
        debug_assert!(length > 0, "Partition has at least one row");
        Self {
            length,
            remaining: length,
            peers: 0,
            is_length_final,
            row_number: 1,
            rank: 0,
            dense_rank: 0,
            percent_rank: 0.0,
            cume_dist: 0.0,
        }
    }

    /// Start a new frame of `peers` rows at the current row
    pub fn new_frame(&mut self, peers: u64) {
        debug_assert!(peers > 0 && peers <= self.remaining);
        self.peers = peers;
        self.rank = self.row_number;
        self.dense_rank += 1;
        self.percent_rank = if self.length > 1 {
            (self.rank - 1) as f64 / (self.length - 1) as f64
        } else {
            0.0
        };
        self.cume_dist = (self.rank + peers - 1) as f64 / self.length as f64;
    }

    /// Current row is processed, move to the next row
    #[inline]
    pub fn row_aggregated(&mut self) {
        debug_assert!(self.peers > 0 && self.remaining > 0);
        self.remaining -= 1;
        self.peers -= 1;
        self.row_number += 1;
    }

    /// More rows of the partition are found
    #[inline]
    pub fn extend(&mut self, additional: u64, is_length_final: bool) {
        self.length += additional;
        self.remaining += additional;
        self.is_length_final = is_length_final;
    }

    /// All of the rows in the partition are processed
    #[inline]
    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// All of the rows in the current frame are processed
    #[inline]
    pub fn is_frame_done(&self) -> bool {
        self.peers == 0
    }

    /// Number of rows in the partition known so far
    #[inline]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Number of rows that are not processed yet
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Number of rows in the current frame that are not processed yet
    #[inline]
    pub fn peers(&self) -> u64 {
        self.peers
    }

    /// Returns true if all of the rows of the partition are known
    #[inline]
    pub fn is_length_final(&self) -> bool {
        self.is_length_final
    }

    /// `ROW_NUMBER` of the current row, starts from 1
    #[inline]
    pub fn row_number(&self) -> u64 {
        self.row_number
    }

    /// `RANK` of the current frame
    #[inline]
    pub fn rank(&self) -> u64 {
        self.rank
    }

    /// `DENSE_RANK` of the current frame
    #[inline]
    pub fn dense_rank(&self) -> u64 {
        self.dense_rank
    }

    /// `PERCENT_RANK` of the current frame
    #[inline]
    pub fn percent_rank(&self) -> f64 {
        self.percent_rank
    }

    /// `CUME_DIST` of the current frame
    #[inline]
    pub fn cume_dist(&self) -> f64 {
        self.cume_dist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Process the partition with given peer groups, returns
    /// `(row_number, rank, dense_rank)` of each row
    fn process(peer_groups: &[u64]) -> Vec<(u64, u64, u64)> {
        let mut partition = Partition::new(peer_groups.iter().sum(), true);
        let mut ranks = Vec::new();
        for &peers in peer_groups {
            partition.new_frame(peers);
            while !partition.is_frame_done() {
                ranks.push((
                    partition.row_number(),
                    partition.rank(),
                    partition.dense_rank(),
                ));
                partition.row_aggregated();
            }
        }
        assert!(partition.is_done());
        ranks
    }

    #[test]
    fn test_single_peer_group() {
        let ranks = process(&[4]);
        assert_eq!(ranks, vec![(1, 1, 1), (2, 1, 1), (3, 1, 1), (4, 1, 1)]);
    }

    #[test]
    fn test_multiple_peer_groups() {
        let ranks = process(&[2, 3, 1]);
        let row_numbers = ranks.iter().map(|r| r.0).collect::<Vec<_>>();
        let rank = ranks.iter().map(|r| r.1).collect::<Vec<_>>();
        let dense_rank = ranks.iter().map(|r| r.2).collect::<Vec<_>>();
        assert_eq!(row_numbers, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(rank, vec![1, 1, 3, 3, 3, 6]);
        assert_eq!(dense_rank, vec![1, 1, 2, 2, 2, 3]);
    }

    #[test]
    fn test_percent_rank_and_cume_dist() {
        let mut partition = Partition::new(5, true);
        partition.new_frame(2);
        assert_eq!(partition.percent_rank(), 0.0);
        assert_eq!(partition.cume_dist(), 0.4);
        partition.row_aggregated();
        partition.row_aggregated();

        partition.new_frame(3);
        assert_eq!(partition.percent_rank(), 0.5);
        assert_eq!(partition.cume_dist(), 1.0);

        let mut single = Partition::new(1, true);
        single.new_frame(1);
        assert_eq!(single.percent_rank(), 0.0);
        assert_eq!(single.cume_dist(), 1.0);
    }

    #[test]
    fn test_extend() {
        let mut partition = Partition::new(2, false);
        partition.new_frame(1);
        partition.row_aggregated();
        partition.extend(3, true);
        assert!(partition.is_length_final());
        assert_eq!(partition.length(), 5);
        assert_eq!(partition.remaining(), 4);
        assert!(partition.is_frame_done());
        assert!(!partition.is_done());
    }
}
