//! Ordered 64-bit file version.
//!
//! Four 16-bit fields are packed as `major << 48 | minor << 32 | build << 16 |
//! revision`. The low bit of `revision` is reserved: odd values mark CI or
//! pre-release builds, even values mark releases. Comparing two versions
//! compares the packed integers; [`FileVersion::release_identity`] masks the
//! CI bit off when only the release/feature identity matters.

use std::fmt;

/// Set at build time to `true` for official release builds.
const RELEASE_BUILD: Option<&str> = option_env!("NATIVE_BRIDGE_RELEASE_BUILD");

/// Semantic version string of this library. Static, never freed.
pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FileVersion(u64);

impl FileVersion {
    /// Packs the four fields verbatim, CI bit included in `revision`.
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self(
            (major as u64) << 48 | (minor as u64) << 32 | (build as u64) << 16 | revision as u64,
        )
    }

    /// Packs a release revision (low bit ignored) and sets the CI bit from
    /// `is_ci`.
    pub const fn with_build_kind(
        major: u16,
        minor: u16,
        build: u16,
        revision: u16,
        is_ci: bool,
    ) -> Self {
        Self::new(major, minor, build, (revision & !1) | is_ci as u16)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn major(self) -> u16 {
        (self.0 >> 48) as u16
    }

    pub const fn minor(self) -> u16 {
        (self.0 >> 32) as u16
    }

    pub const fn build(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn revision(self) -> u16 {
        self.0 as u16
    }

    pub const fn is_ci_build(self) -> bool {
        self.0 & 1 == 1
    }

    pub const fn is_release(self) -> bool {
        !self.is_ci_build()
    }

    /// The version with the CI bit cleared.
    pub const fn release_identity(self) -> Self {
        Self(self.0 & !1)
    }

    /// Version ordinal without the CI bit.
    pub const fn ordered(self) -> u64 {
        self.0 >> 1
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major(),
            self.minor(),
            self.build(),
            self.revision()
        )
    }
}

/// File version of this library, derived from the crate version.
pub const fn current() -> FileVersion {
    FileVersion::with_build_kind(
        parse_u16(env!("CARGO_PKG_VERSION_MAJOR")),
        parse_u16(env!("CARGO_PKG_VERSION_MINOR")),
        parse_u16(env!("CARGO_PKG_VERSION_PATCH")),
        0,
        !is_true(RELEASE_BUILD),
    )
}

const fn parse_u16(text: &str) -> u16 {
    let bytes = text.as_bytes();
    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        assert!(digit.is_ascii_digit(), "version field is not numeric");
        value = value * 10 + (digit - b'0') as u32;
        assert!(value <= u16::MAX as u32, "version field exceeds 16 bits");
        i += 1;
    }
    value as u16
}

const fn is_true(value: Option<&str>) -> bool {
    let Some(value) = value else {
        return false;
    };
    let bytes = value.as_bytes();
    let expected = b"true";
    if bytes.len() != expected.len() {
        return false;
    }
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].to_ascii_lowercase() != expected[i] {
            return false;
        }
        i += 1;
    }
    true
}
