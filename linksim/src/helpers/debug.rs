// Userspace debugger
#[macro_export]
macro_rules! debug_component {
    ($($arg:tt)+) => {
        log::debug!("[Now: {} | C{}] {}", $crate::now(), $crate::rank(), format_args!($($arg)+));
    }
}
