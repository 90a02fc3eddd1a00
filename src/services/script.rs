//! Scripting engine bridge.
//!
//! One engine per run: build, register the host API, execute, tear down.
//! Nothing survives into the next run. The engine runs on a worker thread;
//! host calls that need a UI-side effect committed before the script can
//! continue (chart creation, file saves) go through the synchronous
//! handoff, everything else is posted fire-and-forget.
//!
//! Cancellation is cooperative: the engine's progress hook polls a
//! [`CancelToken`] at every evaluation step and unwinds through the
//! engine's distinguished termination result, so a stop request takes
//! effect within one statement and is never mistaken for a script-authored
//! error. A blocking host call that is already underway finishes first.

use crate::charts::ChartHandle;
use crate::models::{ChartKind, ChartSpec, Selection};
use crate::tasks::TaskKind;
use crate::ui::event_loop::UiHandle;
use camino::Utf8PathBuf;
use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Position};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Message reported when a run is stopped by user request.
pub const STOP_MESSAGE: &str = "stopped by user";

/// Cooperative cancellation flag for the current script run.
///
/// Reset at the start of each run, set by the UI stop action, read by the
/// engine's progress hook.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a script run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// Ran to completion.
    Finished,
    /// Terminated by a stop request.
    Stopped,
    /// The source failed to compile.
    LoadError(String),
    /// An uncaught runtime error unwound the run.
    RuntimeError(String),
}

/// Inputs for one script run, snapshotted at launch.
pub struct ScriptJob {
    pub ui: UiHandle,
    pub selection: Option<Selection>,
    pub source: String,
    /// Name reported in error positions, usually the script file name.
    pub chunk_name: String,
    pub cancel: CancelToken,
}

/// Host-side context captured by every registered function.
struct ScriptHost {
    ui: UiHandle,
    selection: Option<Selection>,
}

fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        Position::NONE,
    ))
}

fn as_f64(value: &Dynamic, call: &str, what: &str) -> Result<f64, Box<EvalAltResult>> {
    if let Some(f) = value.clone().try_cast::<f64>() {
        return Ok(f);
    }
    if let Some(i) = value.clone().try_cast::<i64>() {
        return Ok(i as f64);
    }
    Err(runtime_error(format!("{call}: {what} must be a number")))
}

fn as_width(value: &Dynamic, call: &str) -> Result<u32, Box<EvalAltResult>> {
    if let Some(i) = value.clone().try_cast::<i64>() {
        if (0..=i64::from(u32::MAX)).contains(&i) {
            return Ok(i as u32);
        }
    } else if let Some(f) = value.clone().try_cast::<f64>() {
        if f.is_finite() && f >= 0.0 && f <= f64::from(u32::MAX) {
            return Ok(f as u32);
        }
    }
    Err(runtime_error(format!(
        "{call}: width must be a non-negative integer"
    )))
}

impl ScriptHost {
    fn resolve(raw: i64) -> Result<ChartHandle, Box<EvalAltResult>> {
        ChartHandle::from_raw(raw)
            .ok_or_else(|| runtime_error(format!("invalid chart handle {raw}")))
    }

    /// Blocks until the window is fully constructed and visible; the
    /// returned handle is live the moment the script sees it.
    fn chart_new(&self, spec: ChartSpec) -> Result<i64, Box<EvalAltResult>> {
        let created = self
            .ui
            .call(move |state| state.create_chart(spec))
            .map_err(|e| runtime_error(format!("chart_new: {e}")))?;
        let handle = created.map_err(|e| runtime_error(format!("chart_new: {e}")))?;
        Ok(handle.to_raw())
    }

    fn chart_plot(&self, raw: i64, x: f64, y: f64) -> Result<(), Box<EvalAltResult>> {
        let handle = Self::resolve(raw)?;
        self.ui.post(move |state| {
            if let Err(e) = state.charts.plot(handle, x, y) {
                state.append_script_log(format!("chart_plot: {e}"));
            }
        });
        Ok(())
    }

    fn chart_set_value(&self, raw: i64, value: f64) -> Result<(), Box<EvalAltResult>> {
        let handle = Self::resolve(raw)?;
        self.ui.post(move |state| {
            if let Err(e) = state.charts.set_value(handle, value) {
                state.append_script_log(format!("chart_set_value: {e}"));
            }
        });
        Ok(())
    }

    fn chart_close(&self, raw: i64) -> Result<(), Box<EvalAltResult>> {
        let handle = Self::resolve(raw)?;
        self.ui.post(move |state| {
            if let Err(e) = state.close_chart(handle) {
                state.append_script_log(format!("chart_close: {e}"));
            }
        });
        Ok(())
    }

    /// Blocks until the file is on storage; `png` selects the format.
    fn chart_save(&self, raw: i64, path: &str, png: bool) -> Result<(), Box<EvalAltResult>> {
        let handle = Self::resolve(raw)?;
        let call = if png { "chart_save_png" } else { "chart_save_csv" };
        let path = Utf8PathBuf::from(path);

        let status_line = format!("Saving {path}");
        self.ui.post(move |state| state.append_script_log(status_line));

        let saved = self
            .ui
            .call(move |state| {
                if png {
                    state.charts.save_png(handle, &path)
                } else {
                    state.charts.save_csv(handle, &path)
                }
            })
            .map_err(|e| runtime_error(format!("{call}: {e}")))?;
        saved.map_err(|e| runtime_error(format!("{call}: {e}")))
    }
}

/// Build an engine wired to the host context for one run.
fn build_engine(host: Arc<ScriptHost>, cancel: CancelToken) -> Engine {
    let mut engine = Engine::new();

    // Stop polling at every evaluation step bounds cancellation latency to
    // one statement.
    engine.on_progress(move |_ops| {
        if cancel.is_stop_requested() {
            Some(Dynamic::from(STOP_MESSAGE))
        } else {
            None
        }
    });

    // print() goes to the script log view instead of stdout.
    let ui = host.ui.clone();
    engine.on_print(move |text| {
        let line = text.to_string();
        ui.post(move |state| state.append_script_log(line));
    });

    // chart_new dispatches on the kind string; each kind has its own arity.
    let h = host.clone();
    engine.register_fn(
        "chart_new",
        move |kind: ImmutableString,
              title: ImmutableString,
              x_label: ImmutableString,
              y_label: ImmutableString,
              x_max: Dynamic,
              y_max: Dynamic,
              width: Dynamic,
              autoscale: bool|
              -> Result<i64, Box<EvalAltResult>> {
            let spec = match ChartKind::parse(kind.as_str()) {
                ChartKind::Line => ChartSpec::line(
                    title.as_str(),
                    x_label.as_str(),
                    y_label.as_str(),
                    as_f64(&x_max, "chart_new", "x_max")?,
                    as_f64(&y_max, "chart_new", "y_max")?,
                    as_width(&width, "chart_new")?,
                    autoscale,
                ),
                ChartKind::Scatter => ChartSpec::scatter(
                    title.as_str(),
                    x_label.as_str(),
                    y_label.as_str(),
                    as_f64(&x_max, "chart_new", "x_max")?,
                    as_f64(&y_max, "chart_new", "y_max")?,
                    as_width(&width, "chart_new")?,
                    autoscale,
                ),
                ChartKind::Unknown => {
                    return Err(runtime_error(format!(
                        "chart_new: unknown chart kind '{kind}'"
                    )));
                }
                other => {
                    return Err(runtime_error(format!(
                        "chart_new: wrong argument count for '{other}' chart"
                    )));
                }
            };
            h.chart_new(spec)
        },
    );

    let h = host.clone();
    engine.register_fn(
        "chart_new",
        move |kind: ImmutableString,
              title: ImmutableString,
              label: ImmutableString,
              width: Dynamic|
              -> Result<i64, Box<EvalAltResult>> {
            let spec = match ChartKind::parse(kind.as_str()) {
                ChartKind::Number => ChartSpec::number(
                    title.as_str(),
                    label.as_str(),
                    as_width(&width, "chart_new")?,
                ),
                ChartKind::Unknown => {
                    return Err(runtime_error(format!(
                        "chart_new: unknown chart kind '{kind}'"
                    )));
                }
                other => {
                    return Err(runtime_error(format!(
                        "chart_new: wrong argument count for '{other}' chart"
                    )));
                }
            };
            h.chart_new(spec)
        },
    );

    let h = host.clone();
    engine.register_fn(
        "chart_new",
        move |kind: ImmutableString,
              title: ImmutableString,
              label: ImmutableString,
              value_min: Dynamic,
              value_max: Dynamic,
              width: Dynamic|
              -> Result<i64, Box<EvalAltResult>> {
            let spec = match ChartKind::parse(kind.as_str()) {
                ChartKind::LinearGauge => ChartSpec::linear_gauge(
                    title.as_str(),
                    label.as_str(),
                    as_f64(&value_min, "chart_new", "value_min")?,
                    as_f64(&value_max, "chart_new", "value_max")?,
                    as_width(&width, "chart_new")?,
                ),
                ChartKind::AngularGauge => ChartSpec::angular_gauge(
                    title.as_str(),
                    label.as_str(),
                    as_f64(&value_min, "chart_new", "value_min")?,
                    as_f64(&value_max, "chart_new", "value_max")?,
                    as_width(&width, "chart_new")?,
                ),
                ChartKind::Unknown => {
                    return Err(runtime_error(format!(
                        "chart_new: unknown chart kind '{kind}'"
                    )));
                }
                other => {
                    return Err(runtime_error(format!(
                        "chart_new: wrong argument count for '{other}' chart"
                    )));
                }
            };
            h.chart_new(spec)
        },
    );

    let h = host.clone();
    engine.register_fn(
        "chart_plot",
        move |handle: i64, x: Dynamic, y: Dynamic| -> Result<(), Box<EvalAltResult>> {
            h.chart_plot(
                handle,
                as_f64(&x, "chart_plot", "x")?,
                as_f64(&y, "chart_plot", "y")?,
            )
        },
    );

    let h = host.clone();
    engine.register_fn(
        "chart_set_value",
        move |handle: i64, value: Dynamic| -> Result<(), Box<EvalAltResult>> {
            h.chart_set_value(handle, as_f64(&value, "chart_set_value", "value")?)
        },
    );

    let h = host.clone();
    engine.register_fn(
        "chart_close",
        move |handle: i64| -> Result<(), Box<EvalAltResult>> { h.chart_close(handle) },
    );

    let h = host.clone();
    engine.register_fn(
        "chart_save_csv",
        move |handle: i64, path: ImmutableString| -> Result<(), Box<EvalAltResult>> {
            h.chart_save(handle, path.as_str(), false)
        },
    );

    let h = host.clone();
    engine.register_fn(
        "chart_save_png",
        move |handle: i64, path: ImmutableString| -> Result<(), Box<EvalAltResult>> {
            h.chart_save(handle, path.as_str(), true)
        },
    );

    let h = host.clone();
    engine.register_fn("selected_ip", move || -> String {
        h.selection
            .as_ref()
            .map(|s| s.address.clone())
            .unwrap_or_default()
    });

    let h = host.clone();
    engine.register_fn("selected_id", move || -> String {
        h.selection.as_ref().map(|s| s.id.clone()).unwrap_or_default()
    });

    engine.register_fn("version", || -> String { crate::VERSION.to_string() });

    engine
}

/// Script run worker body.
///
/// Returns the outcome for callers that launched the run directly; the
/// outcome is also reported to the script log, and the completion item is
/// posted on every path.
pub fn run_script(job: ScriptJob) -> ScriptOutcome {
    job.cancel.reset();

    let ui = job.ui.clone();
    let host = Arc::new(ScriptHost {
        ui: job.ui.clone(),
        selection: job.selection.clone(),
    });
    let engine = build_engine(host, job.cancel.clone());

    ui.post(|state| state.append_script_log("Script engine ready"));
    tracing::info!(chunk = %job.chunk_name, "script run started");

    let outcome = match engine.compile(&job.source) {
        Err(e) => ScriptOutcome::LoadError(format!("{}: {e}", job.chunk_name)),
        Ok(mut ast) => {
            ast.set_source(job.chunk_name.as_str());
            match engine.run_ast(&ast) {
                Ok(()) => ScriptOutcome::Finished,
                Err(e) if matches!(*e, EvalAltResult::ErrorTerminated(..)) => {
                    ScriptOutcome::Stopped
                }
                Err(e) => ScriptOutcome::RuntimeError(e.to_string()),
            }
        }
    };

    match &outcome {
        ScriptOutcome::Finished => {
            tracing::info!("script run finished");
        }
        ScriptOutcome::Stopped => {
            tracing::info!("script run stopped by user");
            ui.post(|state| state.append_script_log(STOP_MESSAGE));
        }
        ScriptOutcome::LoadError(message) | ScriptOutcome::RuntimeError(message) => {
            tracing::warn!("script run failed: {message}");
            let line = message.clone();
            ui.post(move |state| state.append_script_log(line));
        }
    }

    // The engine, its registered host functions and every script value die
    // with this run.
    drop(engine);

    ui.post(|state| state.task_finished(TaskKind::Script));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_reset_and_stop() {
        let token = CancelToken::new();
        assert!(!token.is_stop_requested());

        token.request_stop();
        assert!(token.is_stop_requested());

        token.reset();
        assert!(!token.is_stop_requested());
    }

    #[test]
    fn test_as_f64_accepts_int_and_float() {
        assert_eq!(as_f64(&Dynamic::from(3_i64), "t", "v").unwrap(), 3.0);
        assert_eq!(as_f64(&Dynamic::from(2.5_f64), "t", "v").unwrap(), 2.5);
        assert!(as_f64(&Dynamic::from("nope"), "t", "v").is_err());
    }

    #[test]
    fn test_as_width_bounds() {
        assert_eq!(as_width(&Dynamic::from(640_i64), "t").unwrap(), 640);
        assert_eq!(as_width(&Dynamic::from(640.0_f64), "t").unwrap(), 640);
        assert!(as_width(&Dynamic::from(-1_i64), "t").is_err());
        assert!(as_width(&Dynamic::from("wide"), "t").is_err());
    }
}
