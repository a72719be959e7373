//! Flat, event-dispatched finite state machine.
//!
//! Grounded on `ecu/fsm.h`: a state's handler, entry, and exit hooks all
//! receive the machine itself (mirroring the C handler's `struct ecu_fsm *`
//! parameter), so a handler can reach the context object and call
//! [`Fsm::change_state`] in the same place. `change_state` only records a
//! one-shot pending transition — it is only legal to call from within a
//! handler or an entry hook, never from exit — and `dispatch` drains that
//! slot afterwards, running exit then entry in sequence. A bounded
//! consecutive-transition counter catches the "entry calls change_state on
//! itself" infinite loop the header's own doc comment warns about.

use crate::logger::{Log, NoopLogger};
use crate::object_id::ObjectId;

/// Outcome of a single state handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The event was handled and consumed.
    Handled,
    /// The state had no reaction to this event.
    Ignored,
    /// The handler called [`Fsm::change_state`]; a transition is pending.
    Transition,
}

/// A state's event handler.
pub type HandlerFn<T, E, L> = fn(&mut Fsm<T, E, L>, &E) -> Status;

/// An entry or exit hook.
pub type HookFn<T, E, L> = fn(&mut Fsm<T, E, L>);

/// One state in a flat machine: a mandatory handler plus optional lifecycle
/// hooks. States are plain data, typically `'static`.
pub struct FsmState<T, E, L: Log = NoopLogger> {
    id: ObjectId,
    handler: HandlerFn<T, E, L>,
    entry: Option<HookFn<T, E, L>>,
    exit: Option<HookFn<T, E, L>>,
}

impl<T, E, L: Log> FsmState<T, E, L> {
    /// Constructs a state descriptor.
    pub const fn new(
        id: ObjectId,
        handler: HandlerFn<T, E, L>,
        entry: Option<HookFn<T, E, L>>,
        exit: Option<HookFn<T, E, L>>,
    ) -> Self {
        Self {
            id,
            handler,
            entry,
            exit,
        }
    }

    /// This state's object id, used for logging.
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Handler,
    Entry,
    Exit,
}

/// Consecutive transitions allowed within one `dispatch`/`start` call before
/// the library assumes a `change_state` cycle (e.g. an entry hook that
/// immediately re-triggers itself) and traps.
pub const MAX_CHAINED_TRANSITIONS: u32 = 64;

/// A flat state machine: a context object `T`, a current state, and a
/// one-shot pending-transition slot.
pub struct Fsm<'s, T, E, L: Log = NoopLogger> {
    object: T,
    current: &'s FsmState<T, E, L>,
    pending: Option<&'s FsmState<T, E, L>>,
    phase: Phase,
}

impl<'s, T, E, L: Log> Fsm<'s, T, E, L> {
    /// Constructs a machine with `object` as its context and `initial` as
    /// its first state. Does not run `initial`'s entry hook — call
    /// [`Fsm::start`] for that.
    pub fn new(object: T, initial: &'s FsmState<T, E, L>) -> Self {
        Self {
            object,
            current: initial,
            pending: None,
            phase: Phase::Idle,
        }
    }

    /// The machine's context object.
    pub fn object(&self) -> &T {
        &self.object
    }

    /// The machine's context object, mutably.
    pub fn object_mut(&mut self) -> &mut T {
        &mut self.object
    }

    /// The currently active state.
    pub fn current(&self) -> &'s FsmState<T, E, L> {
        self.current
    }

    /// Runs the initial state's entry hook, then drains any transition it
    /// triggers. Nothing was ever active before `start`, so this chain runs
    /// entries only — it never calls an exit hook, even if an entry hook
    /// chains to another state via [`Fsm::change_state`]. Call exactly once,
    /// before the first [`Fsm::dispatch`].
    pub fn start(&mut self) {
        self.run_entry(self.current);
        self.drain_pending(false);
    }

    /// Dispatches `event` to the current state's handler, walks any pending
    /// transition to completion, and returns the final status.
    pub fn dispatch(&mut self, event: &E) -> Status {
        self.phase = Phase::Handler;
        let status = (self.current.handler)(self, event);
        self.phase = Phase::Idle;
        ecu_assert!(status != Status::Transition || self.pending.is_some());

        if self.drain_pending(true) {
            Status::Transition
        } else {
            status
        }
    }

    /// Records a one-shot pending transition to `next`.
    ///
    /// Only legal while a handler or entry hook is running (never from
    /// exit), and only once per dispatch step.
    pub fn change_state(&mut self, next: &'s FsmState<T, E, L>) {
        ecu_assert!(matches!(self.phase, Phase::Handler | Phase::Entry));
        ecu_assert!(self.pending.is_none());
        self.pending = Some(next);
    }

    fn run_entry(&mut self, state: &'s FsmState<T, E, L>) {
        if let Some(entry) = state.entry {
            self.phase = Phase::Entry;
            entry(self);
            self.phase = Phase::Idle;
        }
        L::log_entry(state.id);
    }

    fn run_exit(&mut self, state: &'s FsmState<T, E, L>) {
        if let Some(exit) = state.exit {
            self.phase = Phase::Exit;
            exit(self);
            self.phase = Phase::Idle;
        }
        L::log_exit(state.id);
    }

    /// Returns true if at least one transition was drained. `run_exits`
    /// controls whether `current` is exited before each chained transition —
    /// `false` for [`Fsm::start`]'s initial chain, `true` for
    /// [`Fsm::dispatch`].
    fn drain_pending(&mut self, run_exits: bool) -> bool {
        let mut chained = 0u32;
        let mut transitioned = false;
        while let Some(next) = self.pending.take() {
            chained += 1;
            ecu_assert!(chained <= MAX_CHAINED_TRANSITIONS);
            L::log_transition(self.current.id, next.id);
            if run_exits {
                self.run_exit(self.current);
            }
            self.current = next;
            self.run_entry(next);
            transitioned = true;
        }
        transitioned
    }
}
