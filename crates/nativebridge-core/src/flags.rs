//! Query helpers for flag sets declared with `bitflags!`.
//!
//! The `bitflags!` macro already supplies `|`, `&`, `^`, `!` and the compound
//! assignment forms. Binary operators keep bits that no declared flag names;
//! complement is truncated to the declared bits. [`FlagsExt`] adds the named
//! queries used at the C boundary so call sites never drop down to raw
//! integers.
//!
//! ```
//! use bitflags::bitflags;
//! use nativebridge_core::FlagsExt;
//!
//! bitflags! {
//!     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//!     struct Steps: u32 {
//!         const TARGET = 0x01;
//!         const PRINTER = 0x02;
//!     }
//! }
//!
//! let steps = Steps::TARGET;
//! assert!(steps.is_flag_set::<0x01>());
//! assert!(steps.is_flag_clear::<0x02>());
//! assert!(steps.are_any_flags_set(Steps::all()));
//! ```
//!
//! Single-flag queries reject masks that are not exactly one bit:
//!
//! ```compile_fail
//! use bitflags::bitflags;
//! use nativebridge_core::FlagsExt;
//!
//! bitflags! {
//!     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//!     struct Steps: u32 {
//!         const TARGET = 0x01;
//!         const PRINTER = 0x02;
//!     }
//! }
//!
//! let _ = Steps::TARGET.is_flag_set::<0x03>();
//! ```

use bitflags::Flags;

/// Named bitmask queries for every `bitflags` type with an unsigned
/// representation of at most 64 bits.
pub trait FlagsExt: Sized {
    /// Underlying bits widened to `u64`, unknown bits included.
    fn raw_bits(self) -> u64;

    /// `true` when every bit of `mask` is set in `self`.
    fn are_all_flags_set(self, mask: Self) -> bool;

    /// `true` when at least one bit of `mask` is set in `self`.
    fn are_any_flags_set(self, mask: Self) -> bool;

    /// `true` when no bit of `mask` is set in `self`.
    fn are_all_flags_clear(self, mask: Self) -> bool;

    /// `self` with every bit of `mask` forced off.
    fn clear_flags(self, mask: Self) -> Self;

    /// Tests a single flag. `MASK` must have exactly one bit set.
    fn is_flag_set<const MASK: u64>(self) -> bool {
        const { assert!(MASK.count_ones() == 1, "mask must have exactly one bit set") };
        self.raw_bits() & MASK == MASK
    }

    /// Tests that a single flag is clear. `MASK` must have exactly one bit set.
    fn is_flag_clear<const MASK: u64>(self) -> bool {
        const { assert!(MASK.count_ones() == 1, "mask must have exactly one bit set") };
        self.raw_bits() & MASK == 0
    }

    fn has_single_bit_set(self) -> bool {
        self.raw_bits().count_ones() == 1
    }

    fn is_zero_or_has_single_bit_set(self) -> bool {
        self.raw_bits().count_ones() <= 1
    }
}

impl<F> FlagsExt for F
where
    F: Flags + Copy,
    F::Bits: Into<u64>,
{
    #[inline]
    fn raw_bits(self) -> u64 {
        self.bits().into()
    }

    #[inline]
    fn are_all_flags_set(self, mask: Self) -> bool {
        let mask = mask.raw_bits();
        self.raw_bits() & mask == mask
    }

    #[inline]
    fn are_any_flags_set(self, mask: Self) -> bool {
        self.raw_bits() & mask.raw_bits() != 0
    }

    #[inline]
    fn are_all_flags_clear(self, mask: Self) -> bool {
        self.raw_bits() & mask.raw_bits() == 0
    }

    #[inline]
    fn clear_flags(self, mask: Self) -> Self {
        self.difference(mask)
    }
}

/// Mask of `width` bits starting at bit `pos`.
pub const fn bit_mask(pos: u32, width: u32) -> u64 {
    assert!(pos + width <= u64::BITS, "bit field exceeds 64 bits");
    if width == 0 {
        0
    } else if width == u64::BITS {
        u64::MAX
    } else {
        ((1u64 << width) - 1) << pos
    }
}

/// Extracts the field at `pos..pos + width` in place (not shifted down).
pub const fn get_bit_field(value: u64, pos: u32, width: u32) -> u64 {
    value & bit_mask(pos, width)
}

const _: () = assert!(get_bit_field(0b1010_1010_1001_1111, 3, 2) == 0b0000_0000_0001_1000);
