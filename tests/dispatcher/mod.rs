//! Scenario tests for the reserved-thread dispatcher.
//!
//! Most scenarios use a manual backing executor: worker loops submitted by
//! the dispatcher sit in a queue until the test starts them on a thread, so
//! lazy startup can be observed step by step.


mod concurrency;
mod lifecycle;
mod pending;
mod shrink;
