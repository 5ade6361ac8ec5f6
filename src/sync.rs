cfg_if::cfg_if! {
    if #[cfg(feature = "portable-atomic")] {
        pub(crate) use portable_atomic::{AtomicUsize, Ordering};
        pub(crate) use portable_atomic_util::Arc;
    } else {
        pub(crate) use alloc::sync::Arc;
        pub(crate) use core::sync::atomic::{AtomicUsize, Ordering};
    }
}
