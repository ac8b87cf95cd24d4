//! Level-guarded wrappers around the `log` facade.
//!
//! Every line is emitted under the `rapid_socket` target so applications can
//! filter the socket layer on its own, e.g. `RUST_LOG=rapid_socket=debug`.

#[macro_export]
macro_rules! rapid_trace {
    ($($arg:tt)*) => {
        if log::log_enabled!(target: "rapid_socket", log::Level::Trace) {
            log::trace!(target: "rapid_socket", $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! rapid_debug {
    ($($arg:tt)*) => {
        if log::log_enabled!(target: "rapid_socket", log::Level::Debug) {
            log::debug!(target: "rapid_socket", $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! rapid_info {
    ($($arg:tt)*) => {
        if log::log_enabled!(target: "rapid_socket", log::Level::Info) {
            log::info!(target: "rapid_socket", $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! rapid_warn {
    ($($arg:tt)*) => {
        if log::log_enabled!(target: "rapid_socket", log::Level::Warn) {
            log::warn!(target: "rapid_socket", $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! rapid_error {
    ($($arg:tt)*) => {
        if log::log_enabled!(target: "rapid_socket", log::Level::Error) {
            log::error!(target: "rapid_socket", $($arg)*);
        }
    };
}

/// Installs an `env_logger` reading `RUST_LOG`. Safe to call repeatedly;
/// only the first call has an effect.
pub fn init() {
    let _ = env_logger::builder().format_timestamp_millis().try_init();
}
