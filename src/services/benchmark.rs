//! Request-throughput benchmark worker.

use crate::instrument::BenchmarkRunner;
use crate::models::{ComProtocol, Selection};
use crate::tasks::TaskKind;
use crate::ui::event_loop::UiHandle;
use std::sync::Arc;

/// Inputs for one benchmark run, snapshotted at launch.
pub struct BenchmarkJob {
    pub ui: UiHandle,
    pub runner: Arc<dyn BenchmarkRunner>,
    pub selection: Option<Selection>,
    pub protocol: ComProtocol,
    pub raw_port: u16,
    pub requests: u32,
}

/// Benchmark worker body.
pub fn run_benchmark(job: BenchmarkJob) {
    bench_inner(&job);
    job.ui
        .post(|state| state.task_finished(TaskKind::Benchmark));
}

fn bench_inner(job: &BenchmarkJob) {
    job.ui.post(|state| state.reset_benchmark());

    let Some(selection) = &job.selection else {
        job.ui.post(|state| state.show_error("No instrument selected"));
        return;
    };

    let port = match job.protocol {
        ComProtocol::Vxi11 => 0,
        ComProtocol::Raw => job.raw_port,
    };

    // Post a progress fraction roughly every 5%. The step is clamped so
    // request counts below 20 still divide cleanly.
    let total = job.requests;
    let step = (total / 20).max(1);
    let ui = job.ui.clone();
    let mut progress = move |count: u32| {
        let done = count + 1;
        if done % step == 0 || done == total {
            let fraction = f64::from(done) / f64::from(total.max(1));
            ui.post(move |state| state.set_benchmark_fraction(fraction));
        }
    };

    match job
        .runner
        .run(&selection.address, port, job.protocol, total, &mut progress)
    {
        Ok(result) => {
            let text = format!("{result:.1} requests/s");
            tracing::info!("benchmark finished: {text}");
            job.ui.post(move |state| state.set_benchmark_result(text));
        }
        Err(e) => {
            tracing::warn!("benchmark failed: {e}");
            let text = e.to_string();
            job.ui.post(move |state| state.show_error(text));
        }
    }
}
