//! Communicator connecting threads of one process
use crate::traits::Comm;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Barrier};

#[derive(Debug)]
enum Message {
    Value(f64),
    Count(usize),
    Indices(Vec<usize>),
    Values(Vec<f64>),
}

/// A communicator whose ranks are threads of the calling process.
///
/// Each pair of ranks is connected by an unbounded channel, so sends never
/// block. Messages between two ranks arrive in the order they were sent.
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    senders: Vec<Sender<Message>>,
    receivers: Vec<Receiver<Message>>,
    barrier: Arc<Barrier>,
}

impl ThreadComm {
    /// Create the communicators of a group of `size` ranks.
    ///
    /// The communicator at position `p` has rank `p`; move each one into its own thread.
    pub fn world(size: usize) -> Vec<Self> {
        assert!(size > 0, "a communicator needs at least one rank");
        let channels = (0..size)
            .map(|_| (0..size).map(|_| unbounded()).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let barrier = Arc::new(Barrier::new(size));
        (0..size)
            .map(|rank| Self {
                rank,
                senders: (0..size).map(|to| channels[rank][to].0.clone()).collect(),
                receivers: (0..size)
                    .map(|from| channels[from][rank].1.clone())
                    .collect(),
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }

    fn send(&self, to: usize, message: Message) {
        if self.senders[to].send(message).is_err() {
            panic!("rank {} could not send to rank {to}: peer has exited", self.rank);
        }
    }

    fn receive(&self, from: usize) -> Message {
        match self.receivers[from].recv() {
            Ok(message) => message,
            Err(_) => panic!(
                "rank {} could not receive from rank {from}: peer has exited",
                self.rank
            ),
        }
    }

    fn mismatch(&self, from: usize, message: &Message) -> ! {
        panic!(
            "rank {} received an unexpected message from rank {from}: {message:?}",
            self.rank
        )
    }
}

impl Comm for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn barrier(&self) {
        self.barrier.wait();
    }

    fn all_reduce_sum(&self, value: f64) -> f64 {
        for p in (0..self.size()).filter(|p| *p != self.rank) {
            self.send(p, Message::Value(value));
        }
        // Summing in rank order gives the same result on every rank
        let mut sum = 0.0;
        for p in 0..self.size() {
            sum += if p == self.rank {
                value
            } else {
                match self.receive(p) {
                    Message::Value(v) => v,
                    other => self.mismatch(p, &other),
                }
            };
        }
        sum
    }

    fn all_reduce_sum_count(&self, value: usize) -> usize {
        for p in (0..self.size()).filter(|p| *p != self.rank) {
            self.send(p, Message::Count(value));
        }
        let mut sum = value;
        for p in (0..self.size()).filter(|p| *p != self.rank) {
            sum += match self.receive(p) {
                Message::Count(v) => v,
                other => self.mismatch(p, &other),
            };
        }
        sum
    }

    fn all_to_all_indices(&self, outgoing: &[Vec<usize>]) -> Vec<Vec<usize>> {
        assert_eq!(
            outgoing.len(),
            self.size(),
            "one outgoing vector per rank is required"
        );
        for (p, data) in outgoing.iter().enumerate() {
            if p != self.rank {
                self.send(p, Message::Indices(data.clone()));
            }
        }
        (0..self.size())
            .map(|p| {
                if p == self.rank {
                    outgoing[p].clone()
                } else {
                    match self.receive(p) {
                        Message::Indices(v) => v,
                        other => self.mismatch(p, &other),
                    }
                }
            })
            .collect()
    }

    fn neighbor_exchange(
        &self,
        outgoing: &[(usize, Vec<f64>)],
        sources: &[usize],
    ) -> Vec<Vec<f64>> {
        for (p, data) in outgoing {
            self.send(*p, Message::Values(data.clone()));
        }
        sources
            .iter()
            .map(|&p| match self.receive(p) {
                Message::Values(v) => v,
                other => self.mismatch(p, &other),
            })
            .collect()
    }
}
