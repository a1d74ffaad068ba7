//! MPI communicator
use crate::traits::Comm;
use mpi::collective::SystemOperation;
use mpi::request::WaitGuard;
use mpi::topology::SimpleCommunicator;
use mpi::traits::{Communicator, CommunicatorCollectives, Destination, Source};
use mpi::Rank;

impl Comm for SimpleCommunicator {
    fn rank(&self) -> usize {
        Communicator::rank(self) as usize
    }

    fn size(&self) -> usize {
        Communicator::size(self) as usize
    }

    fn barrier(&self) {
        CommunicatorCollectives::barrier(self);
    }

    fn all_reduce_sum(&self, value: f64) -> f64 {
        let mut sum = 0.0;
        self.all_reduce_into(&value, &mut sum, SystemOperation::sum());
        sum
    }

    fn all_reduce_sum_count(&self, value: usize) -> usize {
        let value = value as u64;
        let mut sum = 0u64;
        self.all_reduce_into(&value, &mut sum, SystemOperation::sum());
        sum as usize
    }

    fn all_to_all_indices(&self, outgoing: &[Vec<usize>]) -> Vec<Vec<usize>> {
        let rank = Comm::rank(self);
        let size = Comm::size(self);
        assert_eq!(outgoing.len(), size, "one outgoing vector per rank is required");
        mpi::request::scope(|scope| {
            let _guards = outgoing
                .iter()
                .enumerate()
                .filter(|(p, _)| *p != rank)
                .map(|(p, data)| {
                    WaitGuard::from(
                        self.process_at_rank(p as Rank)
                            .immediate_send(scope, &data[..]),
                    )
                })
                .collect::<Vec<_>>();
            let received = (0..size)
                .map(|p| {
                    if p == rank {
                        outgoing[p].clone()
                    } else {
                        let (data, _status) =
                            self.process_at_rank(p as Rank).receive_vec::<usize>();
                        data
                    }
                })
                .collect::<Vec<_>>();
            received
        })
    }

    fn neighbor_exchange(
        &self,
        outgoing: &[(usize, Vec<f64>)],
        sources: &[usize],
    ) -> Vec<Vec<f64>> {
        mpi::request::scope(|scope| {
            let _guards = outgoing
                .iter()
                .map(|(p, data)| {
                    WaitGuard::from(
                        self.process_at_rank(*p as Rank)
                            .immediate_send(scope, &data[..]),
                    )
                })
                .collect::<Vec<_>>();
            let received = sources
                .iter()
                .map(|p| {
                    let (data, _status) = self.process_at_rank(*p as Rank).receive_vec::<f64>();
                    data
                })
                .collect::<Vec<_>>();
            received
        })
    }
}
