//! A queue that runs deferred and delayed work on a background thread.

use std::{
    cmp,
    collections::BinaryHeap,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// A unit of work.
type Job = Box<dyn FnOnce() + Send>;

/// Messages understood by the worker.
enum Message {
    /// Runs the job as soon as possible.
    Run(Job),
    /// Runs the job once the deadline has passed.
    RunAt(Instant, Job),
    /// Acknowledges once everything queued before has run.
    Flush(Sender<()>),
    /// Stops the worker.
    Shutdown,
}

/// A job waiting for its deadline.
struct Delayed {
    /// When the job should run.
    deadline: Instant,
    /// Keeps jobs with the same deadline in submission order.
    seq: u64,
    /// The job itself.
    job: Job,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == cmp::Ordering::Equal
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        // Reversed, so the max-heap pops the earliest deadline first
        (other.deadline, other.seq).cmp(&(self.deadline, self.seq))
    }
}

/// Runs jobs one at a time, in submission order, on a dedicated worker.
pub(crate) struct WorkQueue {
    /// Sends messages to the worker.
    sender: Sender<Message>,
    /// Set once the queue is shutting down, so queued jobs are skipped.
    cancelled: Arc<AtomicBool>,
    /// The worker, until it was joined.
    worker: Option<thread::JoinHandle<()>>,
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("cancelled", &self.cancelled.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl WorkQueue {
    /// Starts a new work queue with a worker of the given name.
    pub(crate) fn new(name: &str) -> anyhow::Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker = thread::Builder::new().name(name.to_owned()).spawn({
            let cancelled = Arc::clone(&cancelled);
            move || run(receiver, cancelled)
        })?;

        Ok(Self {
            sender,
            cancelled,
            worker: Some(worker),
        })
    }

    /// Queues a job to run as soon as the worker is free.
    pub(crate) fn queue(&self, job: impl FnOnce() + Send + 'static) {
        self.post(Message::Run(Box::new(job)));
    }

    /// Queues a job to run after the given delay.
    pub(crate) fn queue_delayed(&self, delay: Duration, job: impl FnOnce() + Send + 'static) {
        self.post(Message::RunAt(Instant::now() + delay, Box::new(job)));
    }

    /// Blocks until every job queued so far and every delayed job already due has run.
    ///
    /// Must not be called from a job, that would wait for itself.
    pub(crate) fn flush(&self) {
        let (ack, done) = crossbeam_channel::bounded(1);

        self.post(Message::Flush(ack));

        // An error means the worker is gone, so there is nothing left to wait for
        done.recv().ok();
    }

    /// Cancels all queued and delayed jobs and waits for the running one to finish.
    pub(crate) fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.cancelled.store(true, Ordering::Release);
        self.post(Message::Shutdown);

        if worker.join().is_err() {
            log::error!("work queue worker panicked");
        }
    }

    /// Sends a message to the worker.
    fn post(&self, msg: Message) {
        if self.sender.send(msg).is_err() {
            log::debug!("work queue is shut down, dropping message");
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The worker loop.
fn run(receiver: Receiver<Message>, cancelled: Arc<AtomicBool>) {
    let mut delayed = BinaryHeap::<Delayed>::new();
    let mut seq = 0;

    loop {
        while delayed
            .peek()
            .map_or(false, |next| next.deadline <= Instant::now())
        {
            if cancelled.load(Ordering::Acquire) {
                return;
            }

            if let Some(next) = delayed.pop() {
                (next.job)();
            }
        }

        let msg = match delayed.peek() {
            Some(next) => {
                match receiver.recv_timeout(next.deadline.saturating_duration_since(Instant::now()))
                {
                    Ok(msg) => msg,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
            None => match receiver.recv() {
                Ok(msg) => msg,
                Err(_) => return,
            },
        };

        if cancelled.load(Ordering::Acquire) {
            log::trace!("dropping {} delayed jobs", delayed.len());
            return;
        }

        match msg {
            Message::Run(job) => job(),
            Message::RunAt(deadline, job) => {
                delayed.push(Delayed { deadline, seq, job });
                seq += 1;
            }
            Message::Flush(ack) => {
                ack.send(()).ok();
            }
            Message::Shutdown => return,
        }
    }
}
