use proptest::prelude::*;
use win_ace_rs::acl::AclHeader;
use win_ace_rs::{
    AceFlags, AceShape, AceType, AclBuilder, AclError, AclRef, CorruptKind, Guid, decode,
};

#[derive(Debug, Clone)]
enum Entry {
    Basic {
        tag: u8,
        flags: u8,
        mask: u32,
        sid: Vec<u8>,
    },
    Callback {
        tag: u8,
        mask: u32,
        sid: Vec<u8>,
        data: Vec<u8>,
    },
    Object {
        tag: u8,
        mask: u32,
        object_type: Option<[u8; 16]>,
        inherited: Option<[u8; 16]>,
        sid: Vec<u8>,
    },
    Opaque {
        tag: u8,
        body: Vec<u8>,
    },
}

impl Entry {
    fn tag(&self) -> u8 {
        match self {
            Entry::Basic { tag, .. }
            | Entry::Callback { tag, .. }
            | Entry::Object { tag, .. }
            | Entry::Opaque { tag, .. } => *tag,
        }
    }

    fn expected_sid_offset(&self) -> Option<usize> {
        match self {
            Entry::Basic { .. } | Entry::Callback { .. } => Some(8),
            Entry::Object { object_type, inherited, .. } => {
                Some(12 + 16 * object_type.is_some() as usize + 16 * inherited.is_some() as usize)
            }
            Entry::Opaque { .. } => None,
        }
    }

    fn add_to(&self, builder: AclBuilder) -> AclBuilder {
        match self {
            Entry::Basic { tag, flags, mask, sid } => {
                builder.ace(AceType::from_raw(*tag), AceFlags::from_bits_retain(*flags), *mask, sid)
            }
            Entry::Callback { tag, mask, sid, data } => {
                builder.callback(AceType::from_raw(*tag), AceFlags::empty(), *mask, sid, data)
            }
            Entry::Object { tag, mask, object_type, inherited, sid } => builder.object(
                AceType::from_raw(*tag),
                AceFlags::empty(),
                *mask,
                object_type.map(Guid::from_bytes),
                inherited.map(Guid::from_bytes),
                sid,
            ),
            Entry::Opaque { tag, body } => builder.raw(*tag, AceFlags::empty(), body),
        }
    }
}

fn sid() -> impl Strategy<Value = Vec<u8>> {
    (0u8..=5).prop_flat_map(|count| {
        proptest::collection::vec(any::<u8>(), 4 * count as usize + 6).prop_map(move |rest| {
            let mut sid = vec![1, count];
            sid.extend(rest);
            sid
        })
    })
}

fn entry() -> impl Strategy<Value = Entry> {
    prop_oneof![
        (
            prop::sample::select(vec![0x00u8, 0x01, 0x02, 0x03, 0x11, 0x13, 0x14]),
            any::<u8>(),
            any::<u32>(),
            sid()
        )
            .prop_map(|(tag, flags, mask, sid)| Entry::Basic { tag, flags, mask, sid }),
        (
            prop::sample::select(vec![0x09u8, 0x0A, 0x0D, 0x0E, 0x12, 0x15]),
            any::<u32>(),
            sid(),
            proptest::collection::vec(any::<u8>(), 0..16)
        )
            .prop_map(|(tag, mask, sid, data)| Entry::Callback { tag, mask, sid, data }),
        (
            prop::sample::select(vec![0x05u8, 0x06, 0x07, 0x08, 0x0B, 0x0C, 0x0F, 0x10]),
            any::<u32>(),
            proptest::option::of(any::<[u8; 16]>()),
            proptest::option::of(any::<[u8; 16]>()),
            sid()
        )
            .prop_map(|(tag, mask, object_type, inherited, sid)| Entry::Object {
                tag,
                mask,
                object_type,
                inherited,
                sid
            }),
        (
            prop_oneof![Just(0x04u8), 0x16u8..=0xFF],
            proptest::collection::vec(any::<u8>(), 0..24)
        )
            .prop_map(|(tag, body)| Entry::Opaque { tag, body }),
    ]
}

proptest! {
    #[test]
    fn decode_preserves_count_order_and_sizes(
        entries in proptest::collection::vec(entry(), 0..12),
    ) {
        let builder = entries.iter().fold(AclBuilder::new(), |b, e| e.add_to(b));
        let bytes = builder.build().unwrap();
        let acl = AclRef::from_bytes(&bytes).unwrap();
        let aces = acl.decode().unwrap();

        prop_assert_eq!(aces.len(), entries.len());
        let total: usize = aces.iter().map(|ace| ace.size() as usize).sum();
        prop_assert_eq!(total + AclHeader::SIZE, acl.size() as usize);

        for (ace, entry) in aces.iter().zip(&entries) {
            prop_assert_eq!(ace.ace_type().as_raw(), entry.tag());
            prop_assert_eq!(ace.sid_offset(), entry.expected_sid_offset());
            prop_assert_eq!(ace.size() % 4, 0);
        }
    }

    #[test]
    fn decode_returns_fields_that_were_encoded(
        entries in proptest::collection::vec(entry(), 1..8),
    ) {
        let builder = entries.iter().fold(AclBuilder::new(), |b, e| e.add_to(b));
        let bytes = builder.build().unwrap();
        let acl = AclRef::from_bytes(&bytes).unwrap();

        for (ace, entry) in acl.iter().map(Result::unwrap).zip(&entries) {
            match entry {
                Entry::Basic { flags, mask, sid, .. } => {
                    prop_assert_eq!(ace.flags().bits(), *flags);
                    prop_assert_eq!(ace.mask(), Some(*mask));
                    prop_assert_eq!(ace.sid().unwrap(), sid.as_slice());
                }
                Entry::Callback { mask, sid, data, .. } => {
                    prop_assert_eq!(ace.shape(), AceShape::Callback);
                    prop_assert_eq!(ace.mask(), Some(*mask));
                    let tail = ace.sid().unwrap();
                    let (head, rest) = tail.split_at(sid.len());
                    prop_assert_eq!(head, sid.as_slice());
                    prop_assert_eq!(&rest[..data.len()], data.as_slice());
                    prop_assert!(rest[data.len()..].iter().all(|b| *b == 0));
                }
                Entry::Object { mask, object_type, inherited, sid, .. } => {
                    prop_assert_eq!(ace.mask(), Some(*mask));
                    prop_assert_eq!(ace.object_type(), object_type.map(Guid::from_bytes));
                    prop_assert_eq!(ace.inherited_object_type(), inherited.map(Guid::from_bytes));
                    prop_assert_eq!(ace.sid().unwrap(), sid.as_slice());
                }
                Entry::Opaque { body, .. } => {
                    prop_assert_eq!(ace.shape(), AceShape::Opaque);
                    prop_assert_eq!(ace.mask(), None);
                    let (head, padding) = ace.as_bytes()[4..].split_at(body.len());
                    prop_assert_eq!(head, body.as_slice());
                    prop_assert!(padding.iter().all(|b| *b == 0));
                }
            }
        }
    }

    #[test]
    fn truncated_sequences_fail_as_a_whole(
        entries in proptest::collection::vec(entry(), 1..8),
        cut in 1usize..64,
    ) {
        let builder = entries.iter().fold(AclBuilder::new(), |b, e| e.add_to(b));
        let bytes = builder.build().unwrap();
        let aces = &bytes[AclHeader::SIZE..];
        let cut = cut.min(aces.len());

        let result = decode(&aces[..aces.len() - cut], entries.len());
        let is_corrupt = matches!(result, Err(AclError::CorruptSequence { .. }));
        prop_assert!(is_corrupt);
    }

    #[test]
    fn arbitrary_bytes_never_panic(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
        count in 0usize..64,
    ) {
        if let Ok(aces) = decode(&bytes, count) {
            let total: usize = aces.iter().map(|ace| ace.size() as usize).sum();
            prop_assert!(total <= bytes.len());
            prop_assert_eq!(aces.len(), count);
        }
        let _ = AclRef::from_bytes(&bytes).map(|acl| acl.decode());
    }
}

#[test]
fn test_decode_allow_and_deny_example() {
    // S-1-5-18
    let system = [1u8, 1, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0];
    let bytes = AclBuilder::new().allow(0x1F01FF, &system).deny(0, &system).build().unwrap();
    let aces = decode(&bytes[AclHeader::SIZE..], 2).unwrap();

    assert_eq!(aces.len(), 2);
    assert_eq!(aces[0].mask(), Some(0x1F01FF));
    assert_eq!(aces[0].sid().unwrap(), &bytes[AclHeader::SIZE + 8..AclHeader::SIZE + 20]);
    assert_eq!(aces[1].ace_type(), AceType::AccessDenied);
}

#[test]
fn test_corrupt_offsets_point_into_acl() {
    let system = [1u8, 1, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0];
    let mut bytes = AclBuilder::new().allow(1, &system).allow(2, &system).build().unwrap();
    // second record claims to be larger than the remaining ACL
    bytes[AclHeader::SIZE + 20 + 2] = 0x40;

    let acl = AclRef::from_bytes(&bytes).unwrap();
    let err = acl.decode().unwrap_err();
    assert_eq!(
        err,
        AclError::CorruptSequence {
            offset: 28,
            kind: CorruptKind::AceOverrun { size: 0x40, remaining: 20 },
        }
    );
}

#[test]
fn test_mandatory_label() {
    // S-1-16-12288, high integrity
    let high = [1u8, 1, 0, 0, 0, 0, 0, 16, 0x00, 0x30, 0, 0];
    let bytes = AclBuilder::new().mandatory_label(0x1, &high).build().unwrap();
    let acl = AclRef::from_bytes(&bytes).unwrap();
    let ace = acl.iter().next().unwrap().unwrap();

    assert_eq!(ace.ace_type(), AceType::SystemMandatoryLabel);
    assert_eq!(ace.shape(), AceShape::Basic);
    assert_eq!(ace.mask(), Some(0x1));
    assert_eq!(ace.sid().unwrap(), &high);
}
