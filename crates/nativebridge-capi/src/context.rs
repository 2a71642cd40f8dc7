use crate::types::ContextRef;
use nativebridge_core::handle::{from_c_bool, to_c_bool};
use nativebridge_host::Context;

/// Creates an empty context. Release with [`nb_context_dispose`].
#[unsafe(no_mangle)]
pub extern "C" fn nb_context_create() -> ContextRef {
    ContextRef::from_box(Context::new())
}

/// Releases a context with every object it owns. Null is ignored.
///
/// # Safety
/// `context` must be null or an undisposed result of [`nb_context_create`].
/// Value caches created for it must be disposed first.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_context_dispose(context: ContextRef) {
    unsafe { context.dispose() }
}

/// Whether debug-info types are uniqued by their ODR identifier.
///
/// # Safety
/// `context` must be null or a live context.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_context_get_is_odr_uniquing_debug_types(context: ContextRef) -> i32 {
    let context = unsafe { context.as_ref() };
    to_c_bool(context.is_some_and(|c| c.is_odr_uniquing_debug_types()))
}

/// # Safety
/// `context` must be null or a live context.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_context_set_is_odr_uniquing_debug_types(context: ContextRef, enabled: i32) {
    if let Some(context) = unsafe { context.as_ref() } {
        context.set_odr_uniquing_debug_types(from_c_bool(enabled));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odr_flag_round_trip() {
        let context = Context::new();
        let handle = ContextRef::wrap_ref(&context);
        assert_eq!(unsafe { nb_context_get_is_odr_uniquing_debug_types(handle) }, 0);
        unsafe { nb_context_set_is_odr_uniquing_debug_types(handle, 5) };
        assert_eq!(unsafe { nb_context_get_is_odr_uniquing_debug_types(handle) }, 1);
        assert!(context.is_odr_uniquing_debug_types());
    }

    #[test]
    fn null_context_is_ignored() {
        unsafe { nb_context_set_is_odr_uniquing_debug_types(ContextRef::null(), 1) };
        assert_eq!(
            unsafe { nb_context_get_is_odr_uniquing_debug_types(ContextRef::null()) },
            0
        );
    }

    #[test]
    fn created_context_is_usable_and_disposable() {
        let context = nb_context_create();
        assert!(!context.is_null());
        unsafe { nb_context_set_is_odr_uniquing_debug_types(context, 1) };
        assert_eq!(unsafe { nb_context_get_is_odr_uniquing_debug_types(context) }, 1);
        unsafe { nb_context_dispose(context) };
        unsafe { nb_context_dispose(ContextRef::null()) };
    }
}
