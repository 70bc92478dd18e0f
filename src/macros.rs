/// Checks a hot-path precondition in debug builds.
///
/// A failed check is logged and execution continues; release builds compile
/// the check out entirely. Callers must still handle the bad input gracefully.
macro_rules! debug_check {
    ($cond:expr, $($arg:tt)+) => {
        if cfg!(debug_assertions) && !($cond) {
            tracing::error!(condition = stringify!($cond), $($arg)+);
        }
    };
}
