use nativebridge_core::message::borrowed;
use nativebridge_core::version::{self, VERSION_STRING};
use std::ffi::c_char;

/// Packed file version: `major << 48 | minor << 32 | build << 16 | revision`.
/// Bit 0 is set for CI builds.
#[unsafe(no_mangle)]
pub extern "C" fn nb_get_version() -> u64 {
    version::current().bits()
}

/// Static semantic version string; no terminator is promised and nothing is
/// released.
///
/// # Safety
/// `len` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_version_string(len: *mut usize) -> *const c_char {
    unsafe { borrowed(VERSION_STRING.as_bytes(), len) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nativebridge_core::FileVersion;

    #[test]
    fn packed_version_matches_string() {
        let version = FileVersion::from_bits(nb_get_version());
        let mut len = 0usize;
        let ptr = unsafe { nb_get_version_string(&mut len) };
        let text = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) };
        let text = std::str::from_utf8(text).unwrap();
        let core = text.split('-').next().unwrap();
        assert_eq!(
            core,
            format!("{}.{}.{}", version.major(), version.minor(), version.build())
        );
    }
}
