//! Screenshot grab worker.

use crate::instrument::ScreenshotCapture;
use crate::models::Selection;
use crate::tasks::TaskKind;
use crate::ui::event_loop::UiHandle;
use std::sync::Arc;
use std::time::Duration;

/// Inputs for one grab worker run, snapshotted at launch.
pub struct ScreenshotJob {
    pub ui: UiHandle,
    pub capture: Arc<dyn ScreenshotCapture>,
    pub selection: Option<Selection>,
    pub timeout: Duration,
}

/// Grab worker body.
pub fn run_grab(job: ScreenshotJob) {
    grab_inner(&job);
    job.ui
        .post(|state| state.task_finished(TaskKind::Screenshot));
}

fn grab_inner(job: &ScreenshotJob) {
    let Some(selection) = &job.selection else {
        job.ui.post(|state| state.show_error("No instrument selected"));
        return;
    };

    match job.capture.capture(&selection.address, job.timeout) {
        Ok(image) => {
            tracing::info!(
                format = %image.format,
                bytes = image.data.len(),
                "screenshot captured"
            );
            job.ui.post(move |state| state.set_screenshot(image));
        }
        Err(e) => {
            tracing::warn!("screenshot capture failed: {e}");
            job.ui
                .post(|state| state.show_error("Failed to grab screenshot"));
        }
    }
}
