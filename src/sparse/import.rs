//! Import patterns
use crate::traits::{Comm, DistributedMap};
use crate::types::{Error, Result};
use itertools::Itertools;

/// Communication schedule that brings the entries of a one-to-one source map
/// into an overlapping target map.
///
/// Exports are entries of the source map sent to other ranks; remotes are
/// entries of the target map received from their owners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    export_lids: Vec<usize>,
    export_pids: Vec<usize>,
    remote_pids: Vec<Option<usize>>,
    send_ranks: Vec<usize>,
    recv_ranks: Vec<usize>,
}

impl Import {
    /// Create an import pattern from its parts.
    ///
    /// `export_lids[k]` (a source local index) is sent to rank `export_pids[k]`.
    /// `remote_pids[i]` is the rank that owns target local index `i`, or `None`
    /// if it is held on this process.
    pub fn new(
        export_lids: Vec<usize>,
        export_pids: Vec<usize>,
        remote_pids: Vec<Option<usize>>,
    ) -> Result<Self> {
        if export_lids.len() != export_pids.len() {
            return Err(Error::InvalidMatrix(format!(
                "{} export indices but {} export ranks",
                export_lids.len(),
                export_pids.len()
            )));
        }
        let send_ranks = export_pids.iter().copied().sorted().dedup().collect();
        let recv_ranks = remote_pids.iter().flatten().copied().sorted().dedup().collect();
        Ok(Self {
            export_lids,
            export_pids,
            remote_pids,
            send_ranks,
            recv_ranks,
        })
    }

    /// Build the import from `source` to `target` by asking the owner of every
    /// remote target index for it.
    ///
    /// `owner` gives the rank holding a global index in the source map. This is
    /// collective over `comm`.
    pub fn build<C: Comm>(
        comm: &C,
        source: &dyn DistributedMap,
        target: &dyn DistributedMap,
        owner: impl Fn(usize) -> Option<usize>,
    ) -> Result<Self> {
        let rank = comm.rank();
        let size = comm.size();
        let mut error = None;
        let mut requests = vec![vec![]; size];
        let mut remote_pids = vec![None; target.local_size()];
        for (lid, gid) in target.global_indices().into_iter().enumerate() {
            if source.contains(gid) {
                continue;
            }
            match owner(gid) {
                Some(p) if p < size && p != rank => {
                    requests[p].push(gid);
                    remote_pids[lid] = Some(p);
                }
                _ => {
                    error.get_or_insert(Error::InvalidMap(format!(
                        "no owner for global index {gid} on rank {rank}"
                    )));
                }
            }
        }

        // Every rank takes part in the exchange, even after an error
        let incoming = comm.all_to_all_indices(&requests);
        if let Some(e) = error {
            return Err(e);
        }

        let mut export_lids = vec![];
        let mut export_pids = vec![];
        for (p, gids) in incoming.iter().enumerate() {
            if p == rank {
                continue;
            }
            for gid in gids {
                match source.local_index(*gid) {
                    Some(lid) => {
                        export_lids.push(lid);
                        export_pids.push(p);
                    }
                    None => {
                        return Err(Error::InvalidMap(format!(
                            "rank {p} asked rank {rank} for global index {gid}, which it does not hold"
                        )))
                    }
                }
            }
        }
        Self::new(export_lids, export_pids, remote_pids)
    }

    /// Source local indices that are sent to other ranks
    pub fn export_lids(&self) -> &[usize] {
        &self.export_lids
    }

    /// The rank each export is sent to
    pub fn export_pids(&self) -> &[usize] {
        &self.export_pids
    }

    /// The owning rank of each target local index, `None` if it is held on this process
    pub fn remote_pids(&self) -> &[Option<usize>] {
        &self.remote_pids
    }

    /// The ranks this process sends to, sorted
    pub fn send_ranks(&self) -> &[usize] {
        &self.send_ranks
    }

    /// The ranks this process receives from, sorted
    pub fn recv_ranks(&self) -> &[usize] {
        &self.recv_ranks
    }

    /// The number of target indices received from other ranks
    pub fn num_remotes(&self) -> usize {
        self.remote_pids.iter().flatten().count()
    }

    /// Gather the values to send to each rank in [Import::send_ranks]
    pub fn gather_exports<T: Copy>(&self, source_values: &[T]) -> Vec<(usize, Vec<T>)> {
        self.send_ranks
            .iter()
            .map(|&p| {
                let values = self
                    .export_lids
                    .iter()
                    .zip(&self.export_pids)
                    .filter(|(_, q)| **q == p)
                    .map(|(lid, _)| source_values[*lid])
                    .collect();
                (p, values)
            })
            .collect()
    }

    /// Place values received from each rank in [Import::recv_ranks] into the target vector
    pub fn scatter_remotes<T: Copy>(&self, received: &[Vec<T>], target_values: &mut [T]) {
        for (&p, values) in self.recv_ranks.iter().zip(received) {
            let lids = self
                .remote_pids
                .iter()
                .enumerate()
                .filter(|(_, q)| **q == Some(p))
                .map(|(lid, _)| lid);
            for (lid, value) in lids.zip(values) {
                target_values[lid] = *value;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::Import;
    use crate::comm::ThreadComm;
    use crate::map::HashedMap;
    use crate::traits::Comm;
    use std::thread;

    #[test]
    fn test_ranks() {
        let import = Import::new(
            vec![3, 2, 3],
            vec![2, 0, 0],
            vec![None, None, Some(2), Some(1), Some(2)],
        )
        .unwrap();
        assert_eq!(import.send_ranks(), &[0, 2]);
        assert_eq!(import.recv_ranks(), &[1, 2]);
        assert_eq!(import.num_remotes(), 3);
        assert!(Import::new(vec![1], vec![], vec![]).is_err());
    }

    #[test]
    fn test_gather_scatter() {
        let import = Import::new(vec![0, 1, 1], vec![1, 2, 1], vec![None, Some(2), Some(1)])
            .unwrap();
        let sends = import.gather_exports(&[10.0, 20.0]);
        assert_eq!(sends, vec![(1, vec![10.0, 20.0]), (2, vec![20.0])]);
        let mut target = vec![5.0, 0.0, 0.0];
        import.scatter_remotes(&[vec![7.0], vec![8.0]], &mut target);
        assert_eq!(target, vec![5.0, 8.0, 7.0]);
    }

    #[test]
    fn test_build_on_ring() {
        // Rank p holds index p and needs index (p + 1) % 3
        let imports = thread::scope(|s| {
            let handles = ThreadComm::world(3)
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let p = comm.rank();
                        let next = (p + 1) % 3;
                        let source = HashedMap::new(Some(3), &[p], 0, &comm).unwrap();
                        let target = HashedMap::new(None, &[p, next], 0, &comm).unwrap();
                        Import::build(&comm, &source, &target, Some).unwrap()
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });
        for (p, import) in imports.iter().enumerate() {
            let prev = (p + 2) % 3;
            let next = (p + 1) % 3;
            assert_eq!(import.export_lids(), &[0]);
            assert_eq!(import.export_pids(), &[prev]);
            assert_eq!(import.remote_pids(), &[None, Some(next)]);
            assert_eq!(import.send_ranks(), &[prev]);
            assert_eq!(import.recv_ranks(), &[next]);
        }
    }
}
