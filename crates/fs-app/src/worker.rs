//! Background sweep worker for interactive front-ends.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};

use fs_sweep::{CancelToken, SweepProgressEvent};

use crate::sweep_service::{self, SweepOverrides};

#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Progress(SweepProgressEvent),
    Complete {
        run_id: String,
        csv_path: Option<PathBuf>,
        rows: usize,
        /// 0 for a completed sweep, otherwise the failure's exit code.
        exit_code: i32,
        message: Option<String>,
    },
    Error {
        message: String,
        exit_code: i32,
    },
}

/// Runs one sweep on its own thread. The engine session is created on that
/// thread and never leaves it; the caller only holds the cancel token and
/// the message receiver.
pub struct SweepWorker {
    pub progress_rx: Receiver<WorkerMessage>,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl SweepWorker {
    pub fn start(config_path: &Path, overrides: SweepOverrides) -> Self {
        let (tx, rx) = channel();
        let cancel = CancelToken::new();
        let config_path = config_path.to_path_buf();
        let token = cancel.clone();

        let handle = thread::spawn(move || {
            Self::run(&config_path, &overrides, &token, &tx);
        });

        Self {
            progress_rx: rx,
            cancel,
            handle: Some(handle),
        }
    }

    fn run(
        config_path: &Path,
        overrides: &SweepOverrides,
        cancel: &CancelToken,
        tx: &Sender<WorkerMessage>,
    ) {
        let progress_tx = tx.clone();
        let mut forward = move |event: SweepProgressEvent| {
            let _ = progress_tx.send(WorkerMessage::Progress(event));
        };
        let cb: &mut dyn FnMut(SweepProgressEvent) = &mut forward;
        let result = sweep_service::run_sweep_file(config_path, overrides, cancel, Some(cb));
        let message = match result {
            Ok(response) => WorkerMessage::Complete {
                rows: response.report.table.row_count(),
                exit_code: response.exit_code(),
                message: response.error().map(|e| e.to_string()),
                run_id: response.run_id,
                csv_path: response.csv_path,
            },
            Err(e) => WorkerMessage::Error {
                message: format!("Worker error: {e}"),
                exit_code: e.exit_code(),
            },
        };
        let _ = tx.send(message);
    }

    /// Request cancellation; the sweep stops at its next case or position
    /// boundary and still restores the baseline.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Wait for the worker thread to exit.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
