//! Logging macros
//!
//! Call sites use `trace!`, `debug!`, `info!`, `warn!` and `error!` without
//! naming a backend. With the `log` feature the macros forward to the `log`
//! facade, otherwise they only type-check their arguments.

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::trace!($($arg)*);
        #[cfg(not(feature = "log"))]
        if false { let _ = ::std::format!($($arg)*); };
    }};
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::debug!($($arg)*);
        #[cfg(not(feature = "log"))]
        if false { let _ = ::std::format!($($arg)*); };
    }};
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::info!($($arg)*);
        #[cfg(not(feature = "log"))]
        if false { let _ = ::std::format!($($arg)*); };
    }};
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::warn!($($arg)*);
        #[cfg(not(feature = "log"))]
        if false { let _ = ::std::format!($($arg)*); };
    }};
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::error!($($arg)*);
        #[cfg(not(feature = "log"))]
        if false { let _ = ::std::format!($($arg)*); };
    }};
}
