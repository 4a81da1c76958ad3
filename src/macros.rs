//! Request timing macros
//!
//! Timing and per-chunk logging are useful while developing against a live
//! service but noisy in release builds, where these compile to plain code.

/// Await `$fut`, logging its latency under `$label` in debug builds.
#[cfg(debug_assertions)]
macro_rules! timed {
    ($label:expr, $fut:expr) => {{
        let started = std::time::Instant::now();
        let out = $fut.await;
        log::debug!("{} took {:?}", $label, started.elapsed());
        out
    }};
}

/// Await `$fut` without timing in release builds.
#[cfg(not(debug_assertions))]
macro_rules! timed {
    ($label:expr, $fut:expr) => {{
        let _ = &$label;
        $fut.await
    }};
}

/// Trace-level logging that disappears from release builds
#[cfg(debug_assertions)]
macro_rules! perf_trace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}

#[cfg(not(debug_assertions))]
macro_rules! perf_trace {
    ($($arg:tt)*) => {};
}
