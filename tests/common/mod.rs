#![allow(dead_code)]

use std::sync::Once;

pub mod cli;
pub mod fixtures;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        qa_pulse::logging::init_test_logging();
    });
}
