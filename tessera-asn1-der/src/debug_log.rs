#[cfg(not(feature = "debug_log"))]
macro_rules! debug_log {
    () => {};
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug_log")]
#[macro_use]
pub mod internal {
    use std::collections::HashMap;
    use std::sync::{LazyLock, Mutex};
    use std::thread::ThreadId;

    pub static CTX: LazyLock<Mutex<HashMap<ThreadId, u8>>> = LazyLock::new(|| Mutex::new(HashMap::new()));

    /// Nesting level of the current thread, raised while the guard is alive.
    pub struct Indenter;

    impl Indenter {
        pub fn indent() -> Indenter {
            if let Ok(mut ctx) = CTX.lock() {
                ctx.entry(::std::thread::current().id())
                    .and_modify(|c| *c = c.saturating_add(1))
                    .or_insert(1);
            }
            Self
        }

        pub fn level() -> u8 {
            CTX.lock()
                .ok()
                .and_then(|ctx| ctx.get(&::std::thread::current().id()).copied())
                .unwrap_or(0)
        }
    }

    impl Drop for Indenter {
        fn drop(&mut self) {
            if let Ok(mut ctx) = CTX.lock() {
                ctx.entry(::std::thread::current().id())
                    .and_modify(|c| *c = c.saturating_sub(1));
            }
        }
    }

    macro_rules! debug_log {
        () => {
            ::log::trace!(target: "tessera_asn1_der", "|");
        };
        ($($arg:tt)*) => {
            let indent = $crate::debug_log::internal::Indenter::level();
            let blanks = "| ".repeat(usize::from(indent));
            ::log::trace!(target: "tessera_asn1_der", "{}{}", blanks, format_args!($($arg)*));
            let _indenter = $crate::debug_log::internal::Indenter::indent();
        };
    }
}
