//! Custom test assertions
//!
//! Assertions return errors instead of panicking so the orchestrator can
//! record a failure and move on to the next test.

use std::fmt;

use kafka_demo::{DemoReport, StageOutcome};

/// Custom assertion error with detailed information
#[derive(Debug)]
pub struct AssertionError {
    pub message: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  Expected: {}\n  Actual: {}",
            self.message, self.expected, self.actual
        )
    }
}

impl std::error::Error for AssertionError {}

impl AssertionError {
    pub fn new(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Assert two values are equal
pub fn assert_equal<T>(message: &str, expected: T, actual: T) -> Result<(), Box<dyn std::error::Error>>
where
    T: PartialEq + fmt::Debug,
{
    if expected != actual {
        return Err(Box::new(AssertionError::new(
            message,
            format!("{:?}", expected),
            format!("{:?}", actual),
        )));
    }
    Ok(())
}

/// Assert every stage of a demo run completed
pub fn assert_all_stages_completed(report: &DemoReport) -> Result<(), Box<dyn std::error::Error>> {
    for stage in &report.stages {
        if let StageOutcome::TimedOut { remaining } = stage.outcome {
            return Err(Box::new(AssertionError::new(
                format!("Stage '{}' did not complete", stage.name),
                format!("{} deliveries", stage.expected),
                format!("{} missing", remaining),
            )));
        }
    }
    Ok(())
}
