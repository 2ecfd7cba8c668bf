/// Emits a `tracing` event when the `tracing` feature is enabled.
///
/// `arena_event!(debug, chunk = 3, "grew arena")` expands to
/// `tracing::debug!(chunk = 3, "grew arena")`, or to nothing without the feature.
macro_rules! arena_event {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        {
            ::tracing::$level!($($arg)+);
        }
    }};
}
