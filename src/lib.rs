//! This crate provides bounds-checked views over Windows ACL and ACE binary structures.
//!
//! The decoder ([`acl::decode`], [`acl::AclRef`]) works on plain byte slices and is available on
//! every platform. Handles backed by the operating system (`acl::Acl`, `sid::Sid`,
//! `trustee::Trustee`, `access::build_acl`) are only compiled on Windows.

#![warn(missing_debug_implementations)]

pub mod access;
pub mod ace;
pub mod acl;
pub mod builder;
#[cfg(windows)]
pub mod sid;
#[cfg(windows)]
pub mod trustee;
#[cfg(windows)]
mod utils;

#[cfg(windows)]
mod macros;


pub use ace::{Ace, AceFlags, AceHeader, AceShape, AceType, Guid, ObjectAceFlags};
pub use acl::{AceIter, AclHeader, AclRef, decode};
pub use builder::AclBuilder;
pub use error::{AclError, CorruptKind};

/// Contains error definitions
pub mod error {
    use std::fmt::{Debug, Display, Formatter};

    /// Result helper type
    pub type Result<T> = std::result::Result<T, WinError>;

    /// WinError represents a WinAPI error, typically in hexadecimal format as an HRESULT
    ///
    /// see: [MSDN](https://learn.microsoft.com/en-us/windows/win32/debug/system-error-codes--0-499-)
    ///
    #[derive(Clone, Eq, PartialEq, Default)]
    pub struct WinError {
        pub code: u32,
        pub message: Option<String>,
    }

    impl WinError {
        /// Captures the calling thread's last-error code.
        #[cfg(windows)]
        pub fn last() -> Self {
            unsafe { windows_sys::Win32::Foundation::GetLastError() }.into()
        }
    }

    impl Display for WinError {
        fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
            if let Some(msg) = &self.message {
                write!(f, "{}: ", msg)?
            }
            write!(f, "HRESULT: {:#010x}", self.code)
        }
    }

    impl Debug for WinError {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("WinError")
                .field("code", &format_args!("HRESULT: {:#010x}", self.code))
                .field("message", &format_args!("{:?}", self.message))
                .finish()
        }
    }

    impl std::error::Error for WinError {}

    impl From<u32> for WinError {
        fn from(value: u32) -> Self {
            WinError {
                code: value,
                message: None,
            }
        }
    }

    impl From<String> for WinError {
        fn from(value: String) -> Self {
            WinError {
                code: 0,
                message: Some(value),
            }
        }
    }

    impl From<&str> for WinError {
        fn from(value: &str) -> Self {
            WinError {
                code: 0,
                message: Some(value.to_owned()),
            }
        }
    }

    /// The structural inconsistency that made a buffer undecodable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
    pub enum CorruptKind {
        /// Fewer bytes than an ACL header were supplied.
        #[error("buffer of {len} bytes cannot hold an ACL header")]
        TruncatedAclHeader { len: usize },
        /// The ACL header's size field is below the header size or beyond the buffer.
        #[error("ACL declares {declared} bytes but {available} are available")]
        AclSizeMismatch { declared: usize, available: usize },
        /// The declared entry count runs past the end of the ACE region.
        #[error("only {remaining} bytes left where an ACE header was expected")]
        TruncatedAceHeader { remaining: usize },
        /// A record is too small for the fixed fields of its shape.
        #[error("ACE of {size} bytes is smaller than the {minimum} bytes its shape requires")]
        UndersizedAce { size: usize, minimum: usize },
        /// A record's size would move the cursor past the end of the ACE region.
        #[error("ACE of {size} bytes overruns the {remaining} bytes left in the sequence")]
        AceOverrun { size: usize, remaining: usize },
    }

    /// Errors produced while decoding, encoding or building ACLs.
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum AclError {
        /// Declared record or sequence sizes are inconsistent with the buffer bounds.
        ///
        /// The whole decode is aborted; no partial sequence is returned.
        #[error("corrupt ACE sequence at byte {offset}: {kind}")]
        CorruptSequence { offset: usize, kind: CorruptKind },
        /// An encoded ACE or ACL would not fit its 16-bit size field.
        #[error("encoded size of {size} bytes exceeds the 65535 byte limit")]
        AclTooLarge { size: usize },
        /// The operating system rejected a call.
        #[error(transparent)]
        Os(#[from] WinError),
    }

    impl AclError {
        pub(crate) fn corrupt(offset: usize, kind: CorruptKind) -> Self {
            AclError::CorruptSequence { offset, kind }
        }
    }
}
