//! `web_sys::console`-backed logging, the only sink available inside a wasm
//! module running in a browser with no OS-level stdio. Mirrors
//! `beamterm-renderer`'s direct `console::log_1`/`error_1` calls, wrapped
//! behind a pair of macros so call sites read like a normal log statement.

/// Recover-locally-and-note-it-for-debugging (§7): used where a condition is
/// handled without surfacing anything to the UI, but is still worth a trace
/// when investigating from devtools.
macro_rules! log_debug {
    ($($arg:tt)*) => {
        web_sys::console::log_1(&format!($($arg)*).into())
    };
}

/// Surface-a-warning (§7): used alongside a `RenderWarning`/similar data
/// value, for conditions the UI should also be able to react to.
macro_rules! log_warn {
    ($($arg:tt)*) => {
        web_sys::console::warn_1(&format!($($arg)*).into())
    };
}

pub(crate) use log_debug;
pub(crate) use log_warn;
