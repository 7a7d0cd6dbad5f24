/// Parallel processing utilities
///
/// `TaskPool` runs a handler over a fixed set of work items on `T` worker
/// threads fed from a shared queue. A single reporter thread drains the
/// results queue, advances the progress bar and collects handler outputs.
/// Workers stop on an explicit end-of-work sentinel; the reporter stops on a
/// final sentinel sent once after every worker has joined.
use crate::utils::progress::create_progress_bar;
use anyhow::{anyhow, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

pub fn configure_thread_pool(threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    let threads = resolve_threads(threads);

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
}

/// 0 means "all available cores"
pub fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        num_cpus::get()
    } else {
        threads
    }
}

enum Job<T> {
    Item(T),
    Stop,
}

enum Report<R> {
    Done(R),
    Finished,
}

pub struct TaskPool {
    threads: usize,
    label: String,
    show_progress: bool,
}

impl TaskPool {
    pub fn new(threads: usize, label: impl Into<String>) -> Self {
        Self {
            threads: resolve_threads(threads),
            label: label.into(),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, visible: bool) -> Self {
        self.show_progress = visible;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `handler` over every item with at most `threads` in flight.
    ///
    /// Results come back in completion order. The first handler error (or
    /// worker panic) stops every worker from taking further items, ends the
    /// reporter and is returned; outputs of items that already finished are
    /// discarded with it.
    pub fn run<T, R, F>(&self, items: Vec<T>, handler: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Sync,
    {
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let workers = self.threads.min(total).max(1);
        tracing::debug!("{}: {} items on {} workers", self.label, total, workers);

        let (job_tx, job_rx): (Sender<Job<T>>, Receiver<Job<T>>) = unbounded();
        let (report_tx, report_rx): (Sender<Report<R>>, Receiver<Report<R>>) = unbounded();

        for item in items {
            job_tx
                .send(Job::Item(item))
                .map_err(|_| anyhow!("{}: work queue closed early", self.label))?;
        }
        for _ in 0..workers {
            job_tx
                .send(Job::Stop)
                .map_err(|_| anyhow!("{}: work queue closed early", self.label))?;
        }
        drop(job_tx);

        let abort = AtomicBool::new(false);
        let bar = create_progress_bar(total, &self.label, self.show_progress);

        let (worker_results, collected) = thread::scope(|scope| {
            let reporter = {
                let bar = bar.clone();
                scope.spawn(move || {
                    let mut collected = Vec::with_capacity(total);
                    while let Ok(Report::Done(result)) = report_rx.recv() {
                        collected.push(result);
                        bar.inc(1);
                    }
                    collected
                })
            };

            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let job_rx = job_rx.clone();
                    let report_tx = report_tx.clone();
                    let handler = &handler;
                    let abort = &abort;
                    scope.spawn(move || -> Result<()> {
                        while !abort.load(Ordering::SeqCst) {
                            match job_rx.recv() {
                                Ok(Job::Item(item)) => match handler(item) {
                                    Ok(result) => {
                                        if report_tx.send(Report::Done(result)).is_err() {
                                            abort.store(true, Ordering::SeqCst);
                                            return Err(anyhow!("results queue closed"));
                                        }
                                    }
                                    Err(e) => {
                                        abort.store(true, Ordering::SeqCst);
                                        return Err(e);
                                    }
                                },
                                Ok(Job::Stop) | Err(_) => break,
                            }
                        }
                        Ok(())
                    })
                })
                .collect();

            let worker_results: Vec<Result<()>> = handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        abort.store(true, Ordering::SeqCst);
                        Err(anyhow!(crate::BinqcError::WorkerPool(
                            "a worker thread panicked".to_string()
                        )))
                    })
                })
                .collect();

            // Final sentinel: every worker has joined, nothing else will arrive
            let _ = report_tx.send(Report::Finished);
            let collected = reporter.join().unwrap_or_default();

            (worker_results, collected)
        });

        if let Some(err) = worker_results.into_iter().find_map(|r| r.err()) {
            bar.abandon_with_message(format!("{} aborted", self.label));
            tracing::error!("{} aborted: {}", self.label, err);
            return Err(err);
        }

        bar.finish_and_clear();
        tracing::info!("{}: finished {} of {} items", self.label, collected.len(), total);

        if collected.len() != total {
            return Err(anyhow!(crate::BinqcError::WorkerPool(format!(
                "{}: collected {} results for {} items",
                self.label,
                collected.len(),
                total
            ))));
        }

        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_resolve_threads_auto() {
        assert!(resolve_threads(0) >= 1);
        assert_eq!(resolve_threads(3), 3);
    }

    #[test]
    fn test_run_collects_every_result() {
        let pool = TaskPool::new(4, "squares").with_progress(false);
        let mut results = pool.run((0..100u64).collect(), |x| Ok(x * x)).unwrap();
        results.sort_unstable();
        assert_eq!(results.len(), 100);
        assert_eq!(results[99], 99 * 99);
    }

    #[test]
    fn test_run_empty() {
        let pool = TaskPool::new(2, "empty").with_progress(false);
        let results: Vec<u8> = pool.run(Vec::<u8>::new(), |x| Ok(x)).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_more_threads_than_items() {
        let pool = TaskPool::new(16, "few").with_progress(false);
        let results = pool.run(vec![1, 2], |x: i32| Ok(x + 1)).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_error_stops_pool() {
        let processed = AtomicUsize::new(0);
        let pool = TaskPool::new(2, "failing").with_progress(false);
        let result = pool.run((0..1000).collect(), |x: usize| {
            processed.fetch_add(1, Ordering::SeqCst);
            if x == 3 {
                anyhow::bail!("bad item {}", x);
            }
            Ok(x)
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("bad item 3"));
        assert!(processed.load(Ordering::SeqCst) < 1000);
    }

    #[test]
    fn test_panic_is_reported_not_hung() {
        let pool = TaskPool::new(3, "panicking").with_progress(false);
        let result = pool.run((0..10).collect(), |x: usize| {
            if x == 5 {
                panic!("worker blew up");
            }
            Ok(x)
        });
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::BinqcError>(),
            Some(crate::BinqcError::WorkerPool(_))
        ));
    }
}
