//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the peripheral through
//! [`mock_stack::RecordingStack`].  All tests run on the host (x86_64)
//! with no radio or hardware required.

mod advertising_tests;
mod bring_up_tests;
mod mock_stack;
mod session_tests;
mod task_tests;
