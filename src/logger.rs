//! Structured tracing of node/transition lifecycle events.
//!
//! Grounded on the teacher's own `Log` trait (`log_new`/`log_drop` injected
//! as a generic parameter with a no-op default): widened here to cover every
//! lifecycle event this crate's components produce, so implementors can fan
//! the hooks out to whatever backend they like (`log`, `defmt`, a test
//! counter) without this crate depending on one itself.

use crate::object_id::ObjectId;

/// Hooks fired by `dlist`, `ntree`, `fsm`, and `hsm` as they run. All hooks
/// take primitive data, never formatted strings, so a `no_std` implementor
/// can route them anywhere.
pub trait Log {
    /// A list or tree node was constructed.
    fn log_node_ctor(_id: ObjectId) {}

    /// A list or tree node was destroyed (after its user callback ran).
    fn log_node_destroy(_id: ObjectId) {}

    /// A node was spliced into a list/tree.
    fn log_link(_id: ObjectId) {}

    /// A node was unlinked from a list/tree (not destroyed, just removed).
    fn log_unlink(_id: ObjectId) {}

    /// An FSM or HSM entry hook ran for the state with the given id.
    fn log_entry(_id: ObjectId) {}

    /// An FSM or HSM exit hook ran for the state with the given id.
    fn log_exit(_id: ObjectId) {}

    /// A dispatch caused a transition between two state ids.
    fn log_transition(_from: ObjectId, _to: ObjectId) {}

    /// The assertion trap fired at the given call site.
    fn log_trap(_file: &'static str, _line: u32) {}
}

/// Zero-cost default logger; every hook is an empty, inlined body.
pub struct NoopLogger;

impl Log for NoopLogger {}
