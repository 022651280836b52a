//! TaskLoom is an in-process background task orchestrator.
//!
//! Application code registers callables as named tasks, enqueues invocations
//! of them (immediately, at a future ETA, or on an interval/cron schedule)
//! and drives execution from a supervisor loop that ticks the scheduler,
//! drains the queues, serializes invocations sharing an exclusive key and
//! records the outcome of every invocation in a state store.
//!
//! The [`orchestrator::TaskLoom`] façade wires all the parts together from a
//! [`settings::LoomSettings`] object and is the intended entrypoint.

pub mod errors;

pub mod executor;

pub mod locking;

pub mod orchestrator;

pub mod queue;

pub mod registry;

pub mod schedule;

pub mod scheduler;

pub mod settings;

pub mod state_store;

pub mod task;
