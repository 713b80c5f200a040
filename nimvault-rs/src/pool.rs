//! Bounded worker pool for independent jobs.

use crate::error::Result;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::sync::mpsc;

/// Run `work` over every item on a pool of `workers` threads, handing each
/// result to `on_done` on the calling thread as soon as it completes.
///
/// Completion order is whatever the scheduler yields. `on_done` receives the
/// number of results seen so far (1-based) alongside the result.
pub fn for_each_completed<T, R, F, C>(items: Vec<T>, workers: usize, work: F, mut on_done: C) -> Result<()>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
    C: FnMut(usize, R),
{
    let pool = ThreadPoolBuilder::new().num_threads(workers.max(1)).build()?;
    let (tx, rx) = mpsc::channel();

    let pool = &pool;
    let work = &work;
    std::thread::scope(|scope| {
        scope.spawn(move || {
            pool.install(|| {
                items.into_par_iter().for_each_with(tx, |tx, item| {
                    // The receiver outlives every sender
                    let _ = tx.send(work(item));
                });
            });
        });

        for (done, result) in rx.iter().enumerate() {
            on_done(done + 1, result);
        }
    });

    Ok(())
}
