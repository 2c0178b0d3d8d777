//! Access control entry views
//!
//! An [`Ace`] borrows the bytes of one record inside a packed ACE sequence. Every record starts
//! with an [`AceHeader`]; the type tag selects an [`AceShape`] which fixes where the access mask,
//! the object fields and the trustee SID live inside the record.
//!
//! see: [MSDN](https://learn.microsoft.com/en-us/windows/win32/api/winnt/ns-winnt-ace_header)

use crate::error::{AclError, CorruptKind};
use bitflags::bitflags;
use std::fmt::{Debug, Display, Formatter};

/// Size of the header every ACE starts with.
pub const ACE_HEADER_SIZE: usize = 4;

const MASK_SIZE: usize = 4;
const OBJECT_FLAGS_SIZE: usize = 4;
const GUID_SIZE: usize = 16;

bitflags! {
    /// `AceFlags` of the ACE header: inheritance and audit control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AceFlags: u8 {
        const OBJECT_INHERIT        = 0x01;
        const CONTAINER_INHERIT     = 0x02;
        const NO_PROPAGATE_INHERIT  = 0x04;
        const INHERIT_ONLY          = 0x08;
        const INHERITED             = 0x10;
        const CRITICAL              = 0x20;
        const SUCCESSFUL_ACCESS     = 0x40;
        const FAILED_ACCESS         = 0x80;
    }
}

bitflags! {
    /// Tells which of the two type GUIDs an object ACE carries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectAceFlags: u32 {
        const OBJECT_TYPE_PRESENT           = 0x1;
        const INHERITED_OBJECT_TYPE_PRESENT = 0x2;
    }
}

/// Fixed header shared by every ACE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AceHeader {
    pub ace_type: u8,
    pub flags: u8,
    /// Byte length of the whole record, header included.
    pub size: u16,
}

impl AceHeader {
    pub const SIZE: usize = ACE_HEADER_SIZE;

    /// Reads a header from the start of `bytes`, `None` if fewer than four bytes are available.
    pub fn read(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [ace_type, flags, lo, hi, ..] => Some(Self {
                ace_type: *ace_type,
                flags: *flags,
                size: u16::from_le_bytes([*lo, *hi]),
            }),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> [u8; ACE_HEADER_SIZE] {
        let [lo, hi] = self.size.to_le_bytes();
        [self.ace_type, self.flags, lo, hi]
    }
}

/// Record layout selected by an ACE type tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AceShape {
    /// Header, mask, SID.
    Basic,
    /// Header, mask, SID, application data up to the end of the record.
    Callback,
    /// Header, mask, object flags, optional object type GUIDs, SID.
    Object,
    /// Object layout followed by application data.
    CallbackObject,
    /// A layout this crate does not decode; only the header is meaningful.
    Opaque,
}

impl AceShape {
    pub fn has_object_fields(self) -> bool {
        matches!(self, AceShape::Object | AceShape::CallbackObject)
    }

    /// Bytes of fixed fields in front of the SID, not counting optional object type GUIDs.
    pub fn fixed_size(self) -> usize {
        match self {
            AceShape::Basic | AceShape::Callback => ACE_HEADER_SIZE + MASK_SIZE,
            AceShape::Object | AceShape::CallbackObject => ACE_HEADER_SIZE + MASK_SIZE + OBJECT_FLAGS_SIZE,
            AceShape::Opaque => ACE_HEADER_SIZE,
        }
    }
}

/// ACE type tag
///
/// see: [MSDN](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-dtyp/628ebb1d-c509-4ea0-a10f-77ef97ca4586)
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub enum AceType {
    AccessAllowed,
    AccessDenied,
    SystemAudit,
    SystemAlarm,
    AccessAllowedCompound,
    AccessAllowedObject,
    AccessDeniedObject,
    SystemAuditObject,
    SystemAlarmObject,
    AccessAllowedCallback,
    AccessDeniedCallback,
    AccessAllowedCallbackObject,
    AccessDeniedCallbackObject,
    SystemAuditCallback,
    SystemAlarmCallback,
    SystemAuditCallbackObject,
    SystemAlarmCallbackObject,
    SystemMandatoryLabel,
    SystemResourceAttribute,
    SystemScopedPolicyId,
    SystemProcessTrustLabel,
    SystemAccessFilter,
    Unknown(u8),
}

impl AceType {
    pub fn from_raw(tag: u8) -> Self {
        match tag {
            0x00 => AceType::AccessAllowed,
            0x01 => AceType::AccessDenied,
            0x02 => AceType::SystemAudit,
            0x03 => AceType::SystemAlarm,
            0x04 => AceType::AccessAllowedCompound,
            0x05 => AceType::AccessAllowedObject,
            0x06 => AceType::AccessDeniedObject,
            0x07 => AceType::SystemAuditObject,
            0x08 => AceType::SystemAlarmObject,
            0x09 => AceType::AccessAllowedCallback,
            0x0A => AceType::AccessDeniedCallback,
            0x0B => AceType::AccessAllowedCallbackObject,
            0x0C => AceType::AccessDeniedCallbackObject,
            0x0D => AceType::SystemAuditCallback,
            0x0E => AceType::SystemAlarmCallback,
            0x0F => AceType::SystemAuditCallbackObject,
            0x10 => AceType::SystemAlarmCallbackObject,
            0x11 => AceType::SystemMandatoryLabel,
            0x12 => AceType::SystemResourceAttribute,
            0x13 => AceType::SystemScopedPolicyId,
            0x14 => AceType::SystemProcessTrustLabel,
            0x15 => AceType::SystemAccessFilter,
            unknown => AceType::Unknown(unknown),
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            AceType::AccessAllowed => 0x00,
            AceType::AccessDenied => 0x01,
            AceType::SystemAudit => 0x02,
            AceType::SystemAlarm => 0x03,
            AceType::AccessAllowedCompound => 0x04,
            AceType::AccessAllowedObject => 0x05,
            AceType::AccessDeniedObject => 0x06,
            AceType::SystemAuditObject => 0x07,
            AceType::SystemAlarmObject => 0x08,
            AceType::AccessAllowedCallback => 0x09,
            AceType::AccessDeniedCallback => 0x0A,
            AceType::AccessAllowedCallbackObject => 0x0B,
            AceType::AccessDeniedCallbackObject => 0x0C,
            AceType::SystemAuditCallback => 0x0D,
            AceType::SystemAlarmCallback => 0x0E,
            AceType::SystemAuditCallbackObject => 0x0F,
            AceType::SystemAlarmCallbackObject => 0x10,
            AceType::SystemMandatoryLabel => 0x11,
            AceType::SystemResourceAttribute => 0x12,
            AceType::SystemScopedPolicyId => 0x13,
            AceType::SystemProcessTrustLabel => 0x14,
            AceType::SystemAccessFilter => 0x15,
            AceType::Unknown(tag) => tag,
        }
    }

    /// Resolves the record layout for this tag.
    ///
    /// `SystemAuditObject` uses the plain object layout, the same as the other object tags.
    pub fn shape(self) -> AceShape {
        match self {
            AceType::AccessAllowed
            | AceType::AccessDenied
            | AceType::SystemAudit
            | AceType::SystemAlarm
            | AceType::SystemMandatoryLabel
            | AceType::SystemScopedPolicyId
            | AceType::SystemProcessTrustLabel => AceShape::Basic,
            AceType::AccessAllowedCallback
            | AceType::AccessDeniedCallback
            | AceType::SystemAuditCallback
            | AceType::SystemAlarmCallback
            | AceType::SystemResourceAttribute
            | AceType::SystemAccessFilter => AceShape::Callback,
            AceType::AccessAllowedObject
            | AceType::AccessDeniedObject
            | AceType::SystemAuditObject
            | AceType::SystemAlarmObject => AceShape::Object,
            AceType::AccessAllowedCallbackObject
            | AceType::AccessDeniedCallbackObject
            | AceType::SystemAuditCallbackObject
            | AceType::SystemAlarmCallbackObject => AceShape::CallbackObject,
            AceType::AccessAllowedCompound | AceType::Unknown(_) => AceShape::Opaque,
        }
    }
}

impl From<u8> for AceType {
    fn from(tag: u8) -> Self {
        AceType::from_raw(tag)
    }
}

/// A 128-bit object type identifier as stored in object ACEs (little-endian fields).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Guid([u8; GUID_SIZE]);

impl Guid {
    pub const fn from_bytes(bytes: [u8; GUID_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; GUID_SIZE] {
        &self.0
    }

    fn read(bytes: &[u8]) -> Option<Self> {
        bytes.get(..GUID_SIZE)?.try_into().ok().map(Self)
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let b = &self.0;
        let data1 = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        let data2 = u16::from_le_bytes([b[4], b[5]]);
        let data3 = u16::from_le_bytes([b[6], b[7]]);
        write!(f, "{{{data1:08x}-{data2:04x}-{data3:04x}-{:02x}{:02x}-", b[8], b[9])?;
        for byte in &b[10..] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "}}")
    }
}

impl Debug for Guid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Guid({self})")
    }
}

/// Borrowed view of one ACE inside a packed sequence.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Ace<'a> {
    bytes: &'a [u8],
    offset: usize,
    header: AceHeader,
    ace_type: AceType,
    sid_offset: Option<usize>,
}

impl<'a> Ace<'a> {
    /// Validates and wraps the record starting at `bytes[0]`.
    ///
    /// `bytes` must end where the enclosing sequence ends; `offset` is only used for error
    /// reporting and [`Ace::offset`].
    pub(crate) fn parse(bytes: &'a [u8], offset: usize) -> Result<Self, AclError> {
        let header = AceHeader::read(bytes).ok_or_else(|| {
            AclError::corrupt(offset, CorruptKind::TruncatedAceHeader { remaining: bytes.len() })
        })?;
        let size = header.size as usize;
        if size < ACE_HEADER_SIZE {
            return Err(AclError::corrupt(
                offset,
                CorruptKind::UndersizedAce {
                    size,
                    minimum: ACE_HEADER_SIZE,
                },
            ));
        }
        if size > bytes.len() {
            return Err(AclError::corrupt(
                offset,
                CorruptKind::AceOverrun {
                    size,
                    remaining: bytes.len(),
                },
            ));
        }

        let bytes = &bytes[..size];
        let ace_type = AceType::from_raw(header.ace_type);
        let shape = ace_type.shape();
        if size < shape.fixed_size() {
            return Err(AclError::corrupt(
                offset,
                CorruptKind::UndersizedAce {
                    size,
                    minimum: shape.fixed_size(),
                },
            ));
        }

        let sid_offset = match shape {
            AceShape::Opaque => None,
            AceShape::Basic | AceShape::Callback => Some(shape.fixed_size()),
            AceShape::Object | AceShape::CallbackObject => {
                let flags = object_flags_at(bytes);
                let mut start = shape.fixed_size();
                if flags.contains(ObjectAceFlags::OBJECT_TYPE_PRESENT) {
                    start += GUID_SIZE;
                }
                if flags.contains(ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT) {
                    start += GUID_SIZE;
                }
                if size < start {
                    let kind = CorruptKind::UndersizedAce { size, minimum: start };
                    return Err(AclError::corrupt(offset, kind));
                }
                Some(start)
            }
        };

        Ok(Self {
            bytes,
            offset,
            header,
            ace_type,
            sid_offset,
        })
    }

    pub fn header(&self) -> AceHeader {
        self.header
    }

    pub fn ace_type(&self) -> AceType {
        self.ace_type
    }

    pub fn shape(&self) -> AceShape {
        self.ace_type.shape()
    }

    pub fn flags(&self) -> AceFlags {
        AceFlags::from_bits_retain(self.header.flags)
    }

    /// Declared record size, header included.
    pub fn size(&self) -> u16 {
        self.header.size
    }

    /// Byte position of this record inside the ACE region it was decoded from.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The raw record, header included.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn is_inherited(&self) -> bool {
        self.flags().contains(AceFlags::INHERITED)
    }

    /// Access mask, `None` for opaque records.
    pub fn mask(&self) -> Option<u32> {
        if self.shape() == AceShape::Opaque {
            return None;
        }
        let b = &self.bytes[ACE_HEADER_SIZE..ACE_HEADER_SIZE + MASK_SIZE];
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn object_flags(&self) -> Option<ObjectAceFlags> {
        self.shape().has_object_fields().then(|| object_flags_at(self.bytes))
    }

    pub fn object_type(&self) -> Option<Guid> {
        let flags = self.object_flags()?;
        if !flags.contains(ObjectAceFlags::OBJECT_TYPE_PRESENT) {
            return None;
        }
        Guid::read(&self.bytes[AceShape::Object.fixed_size()..])
    }

    pub fn inherited_object_type(&self) -> Option<Guid> {
        let flags = self.object_flags()?;
        if !flags.contains(ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT) {
            return None;
        }
        let mut start = AceShape::Object.fixed_size();
        if flags.contains(ObjectAceFlags::OBJECT_TYPE_PRESENT) {
            start += GUID_SIZE;
        }
        Guid::read(&self.bytes[start..])
    }

    /// Offset of the SID from the start of the record, `None` for opaque records.
    ///
    /// Object shapes only carry the GUIDs their object flags announce, so their SID starts at
    /// 12, 28 or 44 bytes.
    pub fn sid_offset(&self) -> Option<usize> {
        self.sid_offset
    }

    /// The trustee SID, borrowed from the owning buffer.
    ///
    /// The slice runs to the end of the record, so callback shapes include their application
    /// data after the SID. The SID itself is not interpreted.
    pub fn sid(&self) -> Option<&'a [u8]> {
        self.sid_offset.map(|start| &self.bytes[start..])
    }
}

fn object_flags_at(bytes: &[u8]) -> ObjectAceFlags {
    let start = ACE_HEADER_SIZE + MASK_SIZE;
    let b = &bytes[start..start + OBJECT_FLAGS_SIZE];
    ObjectAceFlags::from_bits_retain(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

impl Debug for Ace<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut fmt = f.debug_struct("Ace");
        fmt.field("ace_type", &self.ace_type)
            .field("flags", &self.flags())
            .field("size", &self.size())
            .field("offset", &self.offset);
        if let Some(mask) = self.mask() {
            fmt.field("mask", &format_args!("{:b}b, 0x{:X}", mask, mask));
        }
        if let Some(flags) = self.object_flags() {
            fmt.field("object_flags", &flags)
                .field("object_type", &self.object_type())
                .field("inherited_object_type", &self.inherited_object_type());
        }
        if let Some(sid) = self.sid() {
            fmt.field("sid_len", &sid.len());
        }
        fmt.finish()
    }
}
