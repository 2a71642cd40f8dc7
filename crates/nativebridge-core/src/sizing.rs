//! Query-then-fill protocol for variable length results.
//!
//! A caller first asks for the required element count, allocates storage of
//! at least that size, then asks for the fill. The fill validates capacity
//! before touching the destination, so an undersized buffer is reported as
//! [`BridgeError::BufferTooSmall`] with nothing written.

use crate::error::{BridgeError, BridgeResult};

/// Copies `items` into the front of `dest`.
pub fn fill_slice<T: Copy>(name: &'static str, dest: &mut [T], items: &[T]) -> BridgeResult<()> {
    check_capacity(name, dest.len(), items.len())?;
    dest[..items.len()].copy_from_slice(items);
    Ok(())
}

/// Copies `items` into a caller-supplied array of `capacity` elements.
///
/// Exactly `items.len()` elements are written; any remaining capacity is
/// left untouched.
///
/// # Safety
/// When `capacity` is non-zero, `dest` must be null or valid for `capacity`
/// element writes.
pub unsafe fn fill_array<T: Copy>(
    name: &'static str,
    dest: *mut T,
    capacity: usize,
    items: &[T],
) -> BridgeResult<()> {
    check_capacity(name, capacity, items.len())?;
    if items.is_empty() {
        return Ok(());
    }
    if dest.is_null() {
        return Err(BridgeError::NullOutParam { name });
    }
    // SAFETY: capacity was checked above and the caller vouches for `dest`.
    unsafe { std::ptr::copy_nonoverlapping(items.as_ptr(), dest, items.len()) };
    Ok(())
}

/// Converts a signed C length into a capacity, rejecting negatives.
pub fn capacity_from_i32(name: &'static str, len: i32) -> BridgeResult<usize> {
    usize::try_from(len).map_err(|_| BridgeError::OutOfRange {
        name,
        value: i64::from(len),
    })
}

fn check_capacity(name: &'static str, provided: usize, required: usize) -> BridgeResult<()> {
    if provided < required {
        return Err(BridgeError::BufferTooSmall {
            name,
            required,
            provided,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS: [u32; 4] = [10, 20, 30, 40];

    #[test]
    fn exact_capacity_fills() {
        let mut dest = [0u32; 4];
        fill_slice("items", &mut dest, &ITEMS).unwrap();
        assert_eq!(dest, ITEMS);
    }

    #[test]
    fn extra_capacity_is_untouched() {
        let mut dest = [7u32; 6];
        unsafe { fill_array("items", dest.as_mut_ptr(), dest.len(), &ITEMS) }.unwrap();
        assert_eq!(dest, [10, 20, 30, 40, 7, 7]);
    }

    #[test]
    fn undersized_buffer_fails_without_partial_writes() {
        let mut dest = [0u32; 3];
        let err = unsafe { fill_array("items", dest.as_mut_ptr(), dest.len(), &ITEMS) }.unwrap_err();
        assert_eq!(
            err,
            BridgeError::BufferTooSmall {
                name: "items",
                required: 4,
                provided: 3
            }
        );
        assert_eq!(dest, [0, 0, 0]);
    }

    #[test]
    fn null_destination_only_allowed_when_nothing_to_write() {
        unsafe { fill_array::<u32>("items", std::ptr::null_mut(), 0, &[]) }.unwrap();
        let err = unsafe { fill_array("items", std::ptr::null_mut(), 4, &ITEMS) }.unwrap_err();
        assert_eq!(err, BridgeError::NullOutParam { name: "items" });
    }

    #[test]
    fn negative_lengths_are_rejected() {
        assert_eq!(capacity_from_i32("len", 3), Ok(3));
        assert!(matches!(
            capacity_from_i32("len", -1),
            Err(BridgeError::OutOfRange { value: -1, .. })
        ));
    }
}
