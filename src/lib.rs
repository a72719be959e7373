//! Embedded C utilities, reworked as a Rust crate: an intrusive doubly
//! linked list, an intrusive n-ary tree built on top of it, a flat
//! event-dispatched state machine, and a hierarchical (UML-style) state
//! machine with LCA-based transitions.
//!
//! See `DESIGN.md` for the grounding behind each module.

#[macro_use]
pub mod assert;

pub mod dlist;
pub mod event;
pub mod fsm;
pub mod hsm;
pub mod logger;
pub mod ntree;
pub mod object_id;

pub use assert::{set_trap, Trap};
pub use dlist::{DList, DNode};
pub use event::{Event, EventId};
pub use fsm::{Fsm, FsmState, Status as FsmStatus};
pub use hsm::{Hsm, HsmState};
pub use logger::{Log, NoopLogger};
pub use ntree::NtNode;
pub use object_id::ObjectId;
