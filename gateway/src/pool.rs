//! Fixed-size worker pool reading tasks off a bounded channel (`spec.md`
//! §4.4/§5). Capacity equals pool size, so [`WorkerPool::enqueue`] blocks the
//! listener thread once every worker is busy — the "producer blocks" backpressure
//! policy the invariant in `spec.md` §5 calls for, gotten for free from
//! `crossbeam_channel::bounded` rather than a hand-rolled ring buffer.

use std::net::TcpStream;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};
use slog::{error, o, Logger};

use crate::context::Context;
use crate::handler;

type Job = (TcpStream, Vec<u8>);

pub struct WorkerPool {
    sender: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: u8, ctx: Arc<Context>) -> WorkerPool {
        let size = size.max(1) as usize;
        let (sender, receiver): (Sender<Job>, Receiver<Job>) = bounded(size);

        let workers = (0..size)
            .map(|id| {
                let receiver = receiver.clone();
                let ctx = Arc::clone(&ctx);
                let log = ctx.log.new(o!("component" => "worker", "worker_id" => id));
                std::thread::spawn(move || Self::run(receiver, ctx, log))
            })
            .collect();

        WorkerPool { sender, workers }
    }

    /// Enqueues one accepted connection's request bytes for handling. Blocks
    /// if every worker is currently busy, which is the pool's entire
    /// backpressure story.
    pub fn enqueue(&self, stream: TcpStream, bytes: Vec<u8>) {
        // A full channel only means every worker is mid-request; the send
        // unblocks as soon as one finishes. An error here means every
        // receiver was dropped, i.e. the pool is shutting down.
        let _ = self.sender.send((stream, bytes));
    }

    fn run(receiver: Receiver<Job>, ctx: Arc<Context>, log: Logger) {
        while let Ok((stream, bytes)) = receiver.recv() {
            if let Err(e) = handler::handle(stream, &bytes, &ctx) {
                error!(log, "request handling failed"; "error" => %e);
            }
        }
    }

    /// Drops the sending half so every worker's `recv` loop exits once the
    /// channel drains, then joins all worker threads.
    pub fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}
