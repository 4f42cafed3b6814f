//! Architecture-specific primitives.

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "aarch64", feature = "arm-el2"))] {
        mod aarch64;
        pub use self::aarch64::*;
    }
}
