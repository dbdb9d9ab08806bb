//! Logging shim.
//!
//! Forwards to `defmt` on target and `tracing` on the host. With neither
//! feature enabled the arguments are still borrowed, so values that only
//! exist for logging do not trigger unused warnings.
//!
//! Only pass arguments that are both `defmt::Format` and `Display`
//! (integers, `bool`, `&str`).

macro_rules! log_debug {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($s $(, $x)*);
        #[cfg(feature = "tracing")]
        ::tracing::debug!($s $(, $x)*);
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        { $( let _ = &$x; )* }
    }};
}

macro_rules! log_info {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::info!($s $(, $x)*);
        #[cfg(feature = "tracing")]
        ::tracing::info!($s $(, $x)*);
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        { $( let _ = &$x; )* }
    }};
}

macro_rules! log_warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($s $(, $x)*);
        #[cfg(feature = "tracing")]
        ::tracing::warn!($s $(, $x)*);
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        { $( let _ = &$x; )* }
    }};
}
