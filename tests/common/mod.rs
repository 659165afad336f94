//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use nodeflow::pipeline::{PipelineStatus, StatusSink};
use std::cell::RefCell;
use std::rc::Rc;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Status sink that keeps every status it sees; clones share the same list.
#[derive(Clone, Default)]
pub struct RecordingSink {
    seen: Rc<RefCell<Vec<PipelineStatus>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<PipelineStatus> {
        self.seen.borrow().clone()
    }

    pub fn last(&self) -> Option<PipelineStatus> {
        self.seen.borrow().last().cloned()
    }
}

impl StatusSink for RecordingSink {
    fn update(&self, status: &PipelineStatus) {
        self.seen.borrow_mut().push(status.clone());
    }
}
