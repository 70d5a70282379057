//! Bounded parallel map over independent items (e.g. many CMH roots).

use std::any::Any;
use std::fmt::Debug;
use std::panic::{AssertUnwindSafe, catch_unwind};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::error::{HaloError, Result};
use crate::runtime::RunContext;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn run_one<T, R, F>(index: usize, item: &T, f: &F) -> Result<R>
where
    T: Debug,
    F: Fn(&T) -> Result<R>,
{
    let cause = match catch_unwind(AssertUnwindSafe(|| f(item))) {
        Ok(Ok(out)) => return Ok(out),
        Ok(Err(err)) => err,
        Err(payload) => HaloError::Panicked(panic_message(payload.as_ref())),
    };
    tracing::warn!(index, input = ?item, error = %cause, "batch item failed");
    Err(HaloError::WorkerFailure {
        index,
        input: format!("{item:?}"),
        cause: Box::new(cause),
    })
}

fn progress_bar(ctx: &RunContext, len: usize) -> ProgressBar {
    if !ctx.progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    match ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} haloes {msg}") {
        Ok(style) => pb.set_style(style.progress_chars("=>-")),
        Err(err) => tracing::debug!(%err, "default progress style"),
    }
    pb
}

/// Applies `f` to every item on a pool of `ctx.workers()` threads.
///
/// Output `i` belongs to `items[i]`. An error or panic inside `f` becomes a
/// `WorkerFailure` for that item alone; the rest of the batch still runs.
pub fn par_map<T, R, F>(ctx: &RunContext, items: &[T], f: F) -> Vec<Result<R>>
where
    T: Sync + Debug,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    let pool = match ThreadPoolBuilder::new()
        .num_threads(ctx.workers())
        .thread_name(|i| format!("dhalo-worker-{i}"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(err) => {
            tracing::warn!(%err, "failed to build worker pool; using the global rayon pool");
            None
        }
    };

    let pb = progress_bar(ctx, items.len());
    let work = || -> Vec<(usize, Result<R>)> {
        items
            .par_iter()
            .enumerate()
            .map(|(i, item)| {
                let out = run_one(i, item, &f);
                pb.inc(1);
                (i, out)
            })
            .collect()
    };
    let mut tagged = match &pool {
        Some(pool) => pool.install(work),
        None => work(),
    };
    pb.finish_and_clear();

    // reassemble by submission index
    tagged.sort_unstable_by_key(|(i, _)| *i);
    debug_assert!(tagged.iter().enumerate().all(|(pos, (i, _))| pos == *i));
    tagged.into_iter().map(|(_, out)| out).collect()
}
