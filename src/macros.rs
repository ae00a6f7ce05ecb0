//! Internal helper macros.

/// Emits a `tracing` event when the `tracing` feature is enabled and
/// compiles to nothing otherwise.
macro_rules! bolt_trace {
    ($($element:expr),* $(,)?) => {{
        #[cfg(feature = "tracing")]
        tracing::trace!($($element),*);
    }};
}

macro_rules! bolt_debug {
    ($($element:expr),* $(,)?) => {{
        #[cfg(feature = "tracing")]
        tracing::debug!($($element),*);
    }};
}

pub(crate) use {bolt_debug, bolt_trace};
