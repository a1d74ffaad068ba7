//! Single process communicator
use crate::traits::Comm;

/// A communicator containing only the calling process
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfComm;

impl Comm for SelfComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_reduce_sum(&self, value: f64) -> f64 {
        value
    }

    fn all_reduce_sum_count(&self, value: usize) -> usize {
        value
    }

    fn all_to_all_indices(&self, outgoing: &[Vec<usize>]) -> Vec<Vec<usize>> {
        assert_eq!(outgoing.len(), 1, "one outgoing vector per rank is required");
        outgoing.to_vec()
    }

    fn neighbor_exchange(
        &self,
        outgoing: &[(usize, Vec<f64>)],
        sources: &[usize],
    ) -> Vec<Vec<f64>> {
        assert!(
            outgoing.is_empty() && sources.is_empty(),
            "a single process has no neighbours"
        );
        vec![]
    }
}
