//! Runtime assertion / trap contract.
//!
//! Every precondition violation in this crate traps through a single,
//! installable function instead of returning a recoverable error. This
//! mirrors `ecu/asserter.h`: the library calls one trap point on invariant
//! violation and never attempts to recover.

use std::sync::OnceLock;

use crate::logger::{Log, NoopLogger};

/// A trap never returns. `file`/`line` identify the call site that detected
/// the violation.
pub type Trap = fn(file: &'static str, line: u32) -> !;

static TRAP: OnceLock<Trap> = OnceLock::new();

/// Installs the process-wide trap function.
///
/// # Panics
///
/// Panics if a trap has already been installed. The contract is write-once:
/// embedders install exactly one global trap at startup.
pub fn set_trap(trap: Trap) {
    TRAP.set(trap)
        .unwrap_or_else(|_| panic!("ecu::assert trap already installed"));
}

/// Default trap: logs the site, then panics so a backtrace is inspectable.
fn default_trap(file: &'static str, line: u32) -> ! {
    NoopLogger::log_trap(file, line);
    panic!("ecu assertion failed at {file}:{line}");
}

/// Fires the installed trap (or the default one if none was installed).
///
/// Not intended to be called directly; use [`crate::ecu_assert`].
#[cold]
#[doc(hidden)]
pub fn fire(file: &'static str, line: u32) -> ! {
    let trap = *TRAP.get_or_init(|| default_trap);
    trap(file, line)
}

/// Asserts a condition, trapping through [`fire`] on failure.
///
/// Compiles to nothing when the `disable-asserts` feature is enabled; under
/// that feature, behavior of a violated precondition is unspecified, per the
/// library's documented conditional-compilation escape hatch.
#[macro_export]
macro_rules! ecu_assert {
    ($cond:expr $(,)?) => {{
        #[cfg(not(feature = "disable-asserts"))]
        if !($cond) {
            $crate::assert::fire(file!(), line!());
        }
    }};
    ($cond:expr, $($arg:tt)+) => {{
        #[cfg(not(feature = "disable-asserts"))]
        if !($cond) {
            $crate::assert::fire(file!(), line!());
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn fire_without_installed_trap_panics_with_site() {
        let result = panic::catch_unwind(|| fire("some/file.rs", 42));
        let message = *result.unwrap_err().downcast::<String>().unwrap();
        assert!(message.contains("some/file.rs:42"));
    }

    #[test]
    fn ecu_assert_passes_through_on_true() {
        // Must not panic.
        ecu_assert!(1 + 1 == 2);
    }
}
