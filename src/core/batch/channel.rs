//! Bounded pair channel using crossbeam-channel.
//!
//! Carries pairs from the batch worker to whoever consumes them. The buffer
//! is bounded so a slow consumer applies backpressure instead of letting
//! results pile up in memory.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::panic;
use std::thread::{self, JoinHandle};

use super::Pair;

/// Sending half, owned by the batch worker
pub struct PairSender<Id> {
    inner: Sender<Pair<Id>>,
}

impl<Id> PairSender<Id> {
    /// Send a pair, blocking while the buffer is full.
    ///
    /// Returns `false` once the receiver has been dropped, meaning nobody
    /// will ever read further pairs.
    pub fn send(&self, pair: Pair<Id>) -> bool {
        self.inner.send(pair).is_ok()
    }
}

/// Receiving half, handed to the caller.
///
/// Iterating yields pairs as soon as they are found and ends once the worker
/// has processed its last image. If the worker panicked, the panic is
/// re-raised on the caller's thread when the stream ends instead of looking
/// like a normal end of stream.
pub struct PairReceiver<Id> {
    inner: Receiver<Pair<Id>>,
    worker: Option<JoinHandle<()>>,
}

impl<Id> PairReceiver<Id> {
    /// Tie the stream's end to the thread producing it
    pub(super) fn attach_worker(&mut self, worker: JoinHandle<()>) {
        self.worker = Some(worker);
    }

    /// Block until the next pair arrives, or `None` when the run is over
    pub fn recv(&mut self) -> Option<Pair<Id>> {
        match self.inner.recv() {
            Ok(pair) => Some(pair),
            Err(_) => {
                self.join_worker();
                None
            }
        }
    }

    /// Take a pair if one is buffered right now
    pub fn try_recv(&self) -> Option<Pair<Id>> {
        self.inner.try_recv().ok()
    }

    /// Stop reading and wait for the worker to exit.
    ///
    /// The worker notices at its next send, so this returns once it finds
    /// another pair or runs out of input.
    pub fn close(mut self) {
        let worker = self.worker.take();
        drop(self);
        if let Some(worker) = worker {
            resume_worker_panic(worker.join());
        }
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            resume_worker_panic(worker.join());
        }
    }
}

fn resume_worker_panic(outcome: thread::Result<()>) {
    if let Err(payload) = outcome {
        tracing::error!("batch worker panicked, re-raising on the caller");
        panic::resume_unwind(payload);
    }
}

impl<Id> Iterator for PairReceiver<Id> {
    type Item = Pair<Id>;

    fn next(&mut self) -> Option<Pair<Id>> {
        self.recv()
    }
}

/// Create a bounded pair channel. A capacity of 0 is raised to 1 so the
/// worker never runs in lockstep with the consumer.
pub fn pair_channel<Id>(capacity: usize) -> (PairSender<Id>, PairReceiver<Id>) {
    let (sender, receiver) = bounded(capacity.max(1));
    (
        PairSender { inner: sender },
        PairReceiver {
            inner: receiver,
            worker: None,
        },
    )
}
