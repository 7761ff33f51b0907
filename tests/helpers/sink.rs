use std::sync::Mutex;

use gatehouse::gates::errors::{ErrorSink, GateError};
use miette::Diagnostic;

/// One call to the sink: the logged message plus the error's diagnostic
/// code and source.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedError {
    pub message: String,
    pub code: Option<String>,
    pub source: Option<String>,
}

/// Error sink that keeps everything reported to it.
#[derive(Default)]
pub struct RecordingSink {
    reported: Mutex<Vec<ReportedError>>,
}

impl RecordingSink {
    pub fn reported(&self) -> Vec<ReportedError> {
        self.reported.lock().expect("sink lock poisoned").clone()
    }
}

impl ErrorSink for RecordingSink {
    fn error(&self, message: &str, error: &GateError) {
        self.reported
            .lock()
            .expect("sink lock poisoned")
            .push(ReportedError {
                message: message.to_string(),
                code: error.code().map(|c| c.to_string()),
                source: std::error::Error::source(error).map(|s| s.to_string()),
            });
    }
}
