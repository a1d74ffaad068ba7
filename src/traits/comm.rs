//! Parallel communicators

/// A group of cooperating ranks.
///
/// Every method that communicates is collective: all ranks of the group must
/// call it, in the same order.
pub trait Comm {
    /// The rank of this process
    fn rank(&self) -> usize;

    /// The number of ranks
    fn size(&self) -> usize;

    /// Block until every rank has reached the barrier
    fn barrier(&self);

    /// Sum a value over all ranks
    fn all_reduce_sum(&self, value: f64) -> f64;

    /// Sum a count over all ranks
    fn all_reduce_sum_count(&self, value: usize) -> usize;

    /// Send `outgoing[p]` to rank `p`; returns the vector received from each rank.
    ///
    /// `outgoing` must have one entry per rank. The entry for this rank is
    /// returned unchanged.
    fn all_to_all_indices(&self, outgoing: &[Vec<usize>]) -> Vec<Vec<usize>>;

    /// Send each `(rank, values)` message and receive one message from each rank in `sources`.
    ///
    /// The received vectors are returned in the order of `sources`.
    fn neighbor_exchange(&self, outgoing: &[(usize, Vec<f64>)], sources: &[usize])
        -> Vec<Vec<f64>>;
}
