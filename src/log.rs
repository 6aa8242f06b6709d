//! Logging facade.
//!
//! With the `defmt` feature the macros forward to `defmt`; otherwise they
//! only borrow their arguments, so the boot-section image carries nothing.
//!
//! `defmt` needs a `#[defmt::global_logger]` from the final binary. The AVR
//! image links none: USART0 belongs to the programmer and there is no debug
//! probe transport for this core. On-chip the feature only checks that the
//! log sites format; output needs a host harness or a board crate that
//! provides a logger.

#[cfg(feature = "defmt")]
pub(crate) use defmt::{info, trace, warn};

#[cfg(not(feature = "defmt"))]
mod noop {
    macro_rules! info {
        ( $fmt:literal $(, $x:expr )* $(,)? ) => {{ $( let _ = &$x; )* }};
    }
    pub(crate) use info;
    macro_rules! trace {
        ( $fmt:literal $(, $x:expr )* $(,)? ) => {{ $( let _ = &$x; )* }};
    }
    pub(crate) use trace;
    // A `macro_rules! warn` re-export collides with the built-in `warn`
    // lint attribute.
    macro_rules! warner {
        ( $fmt:literal $(, $x:expr )* $(,)? ) => {{ $( let _ = &$x; )* }};
    }
    pub(crate) use warner as warn;
}

#[cfg(not(feature = "defmt"))]
pub(crate) use noop::{info, trace, warn};

#[cfg(all(test, not(feature = "defmt")))]
mod tests {
    #[test]
    fn disabled_macros_leave_arguments_usable() {
        let owned = String::from("page");
        let mut evaluated = 0;
        super::warn!("{} {=u8}", owned, { evaluated += 1; 7u8 });
        super::info!("{}", owned);
        super::trace!("plain");
        assert_eq!(owned, "page");
        assert_eq!(evaluated, 1);
    }
}
