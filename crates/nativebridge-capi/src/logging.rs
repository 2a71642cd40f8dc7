use nativebridge_core::logging::{self, LoggingConfig};
use nativebridge_core::message::optional_str;
use nativebridge_core::{BridgeError, BridgeResult, ErrorRef, error::error_ref};
use std::ffi::c_char;

/// Installs the process-wide log subscriber.
///
/// `filter` uses `tracing` directive syntax (`info,nativebridge=debug`);
/// null or empty keeps the default level. `NATIVE_BRIDGE_LOG` overrides
/// both. Installing twice is not an error; the first subscriber stays.
///
/// # Safety
/// `filter` must be null or valid for `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_initialize_logging(filter: *const c_char, len: usize) -> ErrorRef {
    error_ref(unsafe { initialize(filter, len) })
}

unsafe fn initialize(filter: *const c_char, len: usize) -> BridgeResult<()> {
    let filter = unsafe { optional_str("filter", filter, len) }?;
    let mut config = LoggingConfig::default();
    if !filter.is_empty() {
        config = config.with_filter(filter);
    }
    let installed = logging::init(&config)
        .map_err(|e| BridgeError::message(format!("invalid log filter '{filter}': {e}")))?;
    if !installed {
        tracing::debug!(target: "nativebridge", "log subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_text;

    #[test]
    fn bad_directive_is_reported() {
        let filter = "nativebridge=loud";
        let error = unsafe { nb_initialize_logging(filter.as_ptr().cast(), filter.len()) };
        let text = error_text(error).unwrap_or_default();
        assert!(text.starts_with("invalid log filter"), "{text}");
    }

    #[test]
    fn null_filter_is_default() {
        let error = unsafe { nb_initialize_logging(std::ptr::null(), 0) };
        assert!(error.is_null());
    }
}
