//! Hierarchical, UML-style state machine with LCA-based transitions.
//!
//! Grounded on `ecu/hsm.h`/`ecu/hsm.c`: states additionally carry a `parent`
//! pointer; a handler returns `bool` (true = handled, false = propagate to
//! the parent); every ancestor walk is bounded by `height` as a loop-safety
//! cap; transitions exit from the active leaf state (not the ancestor whose
//! handler actually fired) up to (but not including) the lowest common
//! ancestor of that leaf and the target, then enter from the LCA's child
//! down to (and including) the target.
//!
//! `ecu/hsm.c`'s own `ecu_hsm_ctor` takes `(me, state, height)`, while
//! `ecu/hsm.h` has an unresolved `#warning` about also taking a `top` state
//! — the two disagree in `original_source/`. This module follows the
//! fully-specified four-argument contract (`ctor(initial, top, height)`),
//! since `start` needs an explicit top to know where its top-down entry
//! walk begins.
//!
//! `transition` uses a three-way enum (none / self / to-target) rather than
//! the original's two-bit flag bitmap — same states, clearer in Rust.

use crate::logger::{Log, NoopLogger};
use crate::object_id::ObjectId;

/// A state's event handler. Returns `true` if it handled the event (or
/// triggered a transition), `false` to let the parent state try.
pub type HsmHandlerFn<T, E, L> = fn(&mut Hsm<T, E, L>, &E) -> bool;

/// An entry or exit hook.
pub type HsmHookFn<T, E, L> = fn(&mut Hsm<T, E, L>);

/// One state in a hierarchical machine.
pub struct HsmState<T, E, L: Log = NoopLogger> {
    id: ObjectId,
    handler: HsmHandlerFn<T, E, L>,
    entry: Option<HsmHookFn<T, E, L>>,
    exit: Option<HsmHookFn<T, E, L>>,
    parent: Option<&'static HsmState<T, E, L>>,
}

impl<T, E, L: Log> HsmState<T, E, L> {
    /// Constructs a state descriptor. `parent` is `None` only for the top
    /// state.
    pub const fn new(
        id: ObjectId,
        handler: HsmHandlerFn<T, E, L>,
        entry: Option<HsmHookFn<T, E, L>>,
        exit: Option<HsmHookFn<T, E, L>>,
        parent: Option<&'static HsmState<T, E, L>>,
    ) -> Self {
        Self {
            id,
            handler,
            entry,
            exit,
            parent,
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

enum Transition<T, E, L: Log> {
    None,
    SelfTransition,
    To(&'static HsmState<T, E, L>),
}

/// A hierarchical state machine: a context object `T`, a current state, the
/// top state of the hierarchy, and a bound on ancestor-walk depth.
pub struct Hsm<T, E, L: Log = NoopLogger> {
    object: T,
    current: &'static HsmState<T, E, L>,
    top: &'static HsmState<T, E, L>,
    height: usize,
    transition: Transition<T, E, L>,
    phase: Phase,
}

impl<T, E, L: Log> Hsm<T, E, L> {
    /// Constructs a machine. `initial` must be `top` or a descendant of it,
    /// reachable from `top` by following `parent` no more than `height`
    /// times. Does not run any entry hooks — call [`Hsm::start`] for that.
    pub fn new(
        object: T,
        initial: &'static HsmState<T, E, L>,
        top: &'static HsmState<T, E, L>,
        height: usize,
    ) -> Self {
        Self {
            object,
            current: initial,
            top,
            height,
            transition: Transition::None,
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

    /// The currently active (innermost) state.
    pub fn current(&self) -> &'static HsmState<T, E, L> {
        self.current
    }

    /// Runs entry hooks top-down from the top state through `current`
    /// inclusive. Call exactly once, before the first [`Hsm::dispatch`].
    pub fn start(&mut self) {
        let chain = self.ancestors_inclusive_up_to(self.current, self.top);
        for state in chain.into_iter().rev() {
            self.run_entry(state);
        }
    }

    /// Dispatches `event`, starting at the current state and propagating to
    /// ancestors until one handles it or the top state is reached, then
    /// drains any transition [`Hsm::change_state`] triggered. Returns
    /// whether the event was handled anywhere in the chain.
    pub fn dispatch(&mut self, event: &E) -> bool {
        // The active leaf before any of this event's handlers run. A
        // transition exits from here up to the LCA, never from `trace`
        // (the ancestor whose handler happened to fire) — `change_state`
        // moves `self.current` to the target immediately, so `trace` is
        // lost as a usable exit boundary the moment a non-self transition
        // is recorded.
        let leaf = self.current;
        let mut trace = self.current;
        self.phase = Phase::Handler;
        let mut handled = (trace.handler)(self, event);

        let mut steps = 0usize;
        while matches!(self.transition, Transition::None) && !handled {
            let Some(parent) = trace.parent else {
                break;
            };
            steps += 1;
            ecu_assert!(steps <= self.height);
            trace = parent;
            handled = (trace.handler)(self, event);
        }
        self.phase = Phase::Idle;

        match std::mem::replace(&mut self.transition, Transition::None) {
            Transition::None => {}
            Transition::SelfTransition => {
                L::log_transition(self.current.id, self.current.id);
                self.run_exit(self.current);
                self.run_entry(self.current);
            }
            Transition::To(target) => {
                L::log_transition(leaf.id, target.id);
                let lca = self
                    .lca(leaf, target)
                    .expect("hsm transition: source and target share no ancestor");
                for state in self.ancestors_exclusive_up_to(leaf, lca) {
                    self.run_exit(state);
                }
                let mut entry_chain = self.ancestors_exclusive_up_to(target, lca);
                entry_chain.reverse();
                for state in entry_chain {
                    self.run_entry(state);
                }
            }
        }

        handled
    }

    /// Records a transition to `next`.
    ///
    /// Only legal while a handler or entry hook is running (never from
    /// exit), and only once per dispatch step. If `next` is the current
    /// state, this is a self-transition (exit then re-entry of the same
    /// state); otherwise `current` updates to `next` immediately and the
    /// exit/entry sequence runs once the handler chain finishes.
    pub fn change_state(&mut self, next: &'static HsmState<T, E, L>) {
        ecu_assert!(matches!(self.phase, Phase::Handler | Phase::Entry));
        ecu_assert!(matches!(self.transition, Transition::None));
        if std::ptr::eq(next, self.current) {
            self.transition = Transition::SelfTransition;
        } else {
            self.transition = Transition::To(next);
            self.current = next;
        }
    }

    fn run_entry(&mut self, state: &'static HsmState<T, E, L>) {
        if let Some(entry) = state.entry {
            self.phase = Phase::Entry;
            entry(self);
            self.phase = Phase::Idle;
        }
        L::log_entry(state.id);
    }

    fn run_exit(&mut self, state: &'static HsmState<T, E, L>) {
        if let Some(exit) = state.exit {
            self.phase = Phase::Exit;
            exit(self);
            self.phase = Phase::Idle;
        }
        L::log_exit(state.id);
    }

    /// `other` is `anc` or a descendant of it, bounded by `self.height`.
    fn is_ancestor_or_self(
        &self,
        anc: &'static HsmState<T, E, L>,
        other: &'static HsmState<T, E, L>,
    ) -> bool {
        let mut cur = Some(other);
        let mut steps = 0usize;
        while let Some(c) = cur {
            if std::ptr::eq(c, anc) {
                return true;
            }
            steps += 1;
            ecu_assert!(steps <= self.height);
            cur = c.parent;
        }
        false
    }

    /// Lowest common ancestor of `a` and `b`, found by walking up from `a`
    /// and checking ancestry of `b` at each step — O(height^2), the same
    /// nested-walk shape `ecu_hsm.c`'s `get_lca` uses.
    fn lca(
        &self,
        a: &'static HsmState<T, E, L>,
        b: &'static HsmState<T, E, L>,
    ) -> Option<&'static HsmState<T, E, L>> {
        let mut candidate = Some(a);
        let mut steps = 0usize;
        while let Some(c) = candidate {
            if self.is_ancestor_or_self(c, b) {
                return Some(c);
            }
            steps += 1;
            ecu_assert!(steps <= self.height);
            candidate = c.parent;
        }
        None
    }

    /// `[start, ..., stop]` inclusive, walking `parent` pointers.
    fn ancestors_inclusive_up_to(
        &self,
        start: &'static HsmState<T, E, L>,
        stop: &'static HsmState<T, E, L>,
    ) -> Vec<&'static HsmState<T, E, L>> {
        let mut chain = vec![start];
        let mut cur = start;
        let mut steps = 0usize;
        while !std::ptr::eq(cur, stop) {
            cur = cur
                .parent
                .expect("hsm: state is not a descendant of the expected ancestor");
            chain.push(cur);
            steps += 1;
            ecu_assert!(steps <= self.height);
        }
        chain
    }

    /// `[start, ..., stop)` — `stop` excluded.
    fn ancestors_exclusive_up_to(
        &self,
        start: &'static HsmState<T, E, L>,
        stop: &'static HsmState<T, E, L>,
    ) -> Vec<&'static HsmState<T, E, L>> {
        let mut chain = Vec::new();
        let mut cur = Some(start);
        let mut steps = 0usize;
        while let Some(c) = cur {
            if std::ptr::eq(c, stop) {
                break;
            }
            chain.push(c);
            steps += 1;
            ecu_assert!(steps <= self.height);
            cur = c.parent;
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::test_support::CountingLogger;

    #[derive(Default)]
    struct Ctx {
        log: Vec<String>,
    }

    #[derive(Debug)]
    enum Ev {
        Deep,
        ToSibling,
        SelfEv,
    }

    type TestHsm = Hsm<Ctx, Ev, CountingLogger>;

    fn push(fsm: &mut TestHsm, s: &str) {
        fsm.object_mut().log.push(s.to_string());
    }

    // TOP
    //  |-- S5
    //  |    `-- S6
    //  `-- S0
    //       `-- S1
    fn top_handler(fsm: &mut TestHsm, ev: &Ev) -> bool {
        push(fsm, "top_handler");
        match ev {
            Ev::ToSibling => {
                fsm.change_state(&S1);
                true
            }
            _ => false,
        }
    }
    fn top_entry(fsm: &mut TestHsm) {
        push(fsm, "top_entry");
    }
    fn top_exit(fsm: &mut TestHsm) {
        push(fsm, "top_exit");
    }
    static TOP: HsmState<Ctx, Ev, CountingLogger> =
        HsmState::new(0, top_handler, Some(top_entry), Some(top_exit), None);

    fn s0_handler(fsm: &mut TestHsm, ev: &Ev) -> bool {
        push(fsm, "s0_handler");
        let _ = ev;
        false
    }
    fn s0_entry(fsm: &mut TestHsm) {
        push(fsm, "s0_entry");
    }
    fn s0_exit(fsm: &mut TestHsm) {
        push(fsm, "s0_exit");
    }
    static S0: HsmState<Ctx, Ev, CountingLogger> =
        HsmState::new(1, s0_handler, Some(s0_entry), Some(s0_exit), Some(&TOP));

    fn s1_handler(fsm: &mut TestHsm, ev: &Ev) -> bool {
        push(fsm, "s1_handler");
        let _ = ev;
        false
    }
    fn s1_entry(fsm: &mut TestHsm) {
        push(fsm, "s1_entry");
    }
    fn s1_exit(fsm: &mut TestHsm) {
        push(fsm, "s1_exit");
    }
    static S1: HsmState<Ctx, Ev, CountingLogger> =
        HsmState::new(4, s1_handler, Some(s1_entry), Some(s1_exit), Some(&S0));

    fn s5_handler(fsm: &mut TestHsm, ev: &Ev) -> bool {
        push(fsm, "s5_handler");
        let _ = ev;
        false
    }
    fn s5_entry(fsm: &mut TestHsm) {
        push(fsm, "s5_entry");
    }
    fn s5_exit(fsm: &mut TestHsm) {
        push(fsm, "s5_exit");
    }
    static S5: HsmState<Ctx, Ev, CountingLogger> =
        HsmState::new(2, s5_handler, Some(s5_entry), Some(s5_exit), Some(&TOP));

    fn s6_handler(fsm: &mut TestHsm, ev: &Ev) -> bool {
        push(fsm, "s6_handler");
        match ev {
            Ev::Deep => false,
            Ev::SelfEv => {
                fsm.change_state(&S6);
                true
            }
            Ev::ToSibling => false,
        }
    }
    fn s6_entry(fsm: &mut TestHsm) {
        push(fsm, "s6_entry");
    }
    fn s6_exit(fsm: &mut TestHsm) {
        push(fsm, "s6_exit");
    }
    static S6: HsmState<Ctx, Ev, CountingLogger> =
        HsmState::new(3, s6_handler, Some(s6_entry), Some(s6_exit), Some(&S5));

    #[test]
    fn start_enters_top_down_inclusive() {
        let mut hsm = TestHsm::new(Ctx::default(), &S6, &TOP, 8);
        hsm.start();
        assert_eq!(
            hsm.object().log,
            vec!["top_entry", "s5_entry", "s6_entry"]
        );
    }

    #[test]
    fn unhandled_event_propagates_to_top() {
        let mut hsm = TestHsm::new(Ctx::default(), &S6, &TOP, 8);
        hsm.start();
        hsm.object_mut().log.clear();
        let handled = hsm.dispatch(&Ev::Deep);
        assert!(!handled);
        assert_eq!(
            hsm.object().log,
            vec!["s6_handler", "s5_handler", "top_handler"]
        );
    }

    #[test]
    fn transition_exits_and_enters_across_lca() {
        let mut hsm = TestHsm::new(Ctx::default(), &S6, &TOP, 8);
        hsm.start();
        hsm.object_mut().log.clear();

        // S6 and S5 both decline, so TOP's handler fires and changes state
        // to S1. The exit chain must start from the leaf that was actually
        // active (S6) when dispatch began, not from TOP (the ancestor whose
        // handler happened to fire) — otherwise S6 and S5 would never be
        // exited at all. LCA(S6, S1) is TOP, so the exit chain is S6's own
        // chain up to (not including) TOP: [S6, S5]. The entry chain is
        // S1's chain up to (not including) TOP, reversed: [S0, S1].
        let handled = hsm.dispatch(&Ev::ToSibling);
        assert!(handled);
        assert_eq!(
            hsm.object().log,
            vec![
                "s6_handler",
                "s5_handler",
                "top_handler",
                "s6_exit",
                "s5_exit",
                "s0_entry",
                "s1_entry",
            ]
        );
        assert_eq!(hsm.current().id(), S1.id());
    }

    #[test]
    fn self_transition_exits_then_reenters_same_state() {
        let mut hsm = TestHsm::new(Ctx::default(), &S6, &TOP, 8);
        hsm.start();
        hsm.object_mut().log.clear();
        let handled = hsm.dispatch(&Ev::SelfEv);
        assert!(handled);
        assert_eq!(hsm.object().log, vec!["s6_handler", "s6_exit", "s6_entry"]);
        assert_eq!(hsm.current().id(), S6.id());
    }

    #[test]
    fn logger_records_transition() {
        CountingLogger::clear();
        let mut hsm = TestHsm::new(Ctx::default(), &S6, &TOP, 8);
        hsm.start();
        hsm.dispatch(&Ev::ToSibling);
        let events = CountingLogger::events();
        assert!(events.iter().any(|e| e.starts_with("transition(")));
    }
}
