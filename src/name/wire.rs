// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Encoding of names into, and decoding of names from, the DNS wire
//! format.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_POINTER_HOPS, MAX_WIRE_LEN};

/// The top two bits of a length octet that mark a compression pointer.
const POINTER_TAG: u8 = 0xc0;

////////////////////////////////////////////////////////////////////////
// ENCODING                                                           //
////////////////////////////////////////////////////////////////////////

/// Encodes a sequence of non-null labels as an uncompressed on-the-wire
/// name: each label prefixed by its length, followed by the null label.
///
/// Fails with [`Error::LabelTooLong`] if any label exceeds 63 octets,
/// with [`Error::NullNonTerminal`] if a label is empty, and with
/// [`Error::NameTooLong`] if the result would exceed 255 octets.
pub fn encode_name<'a, I>(labels: I) -> Result<Name, Error>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut wire_repr = ArrayVec::<u8, MAX_WIRE_LEN>::new();
    for label in labels {
        if label.is_empty() {
            return Err(Error::NullNonTerminal);
        } else if label.len() > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong);
        }
        // The length octet and the label must leave room for the null
        // label at the end.
        if wire_repr.len() + 1 + label.len() >= MAX_WIRE_LEN {
            return Err(Error::NameTooLong);
        }
        wire_repr.push(label.len() as u8);
        wire_repr.extend(label.iter().copied());
    }
    wire_repr.push(0);
    Ok(Name::from_wire_unchecked(wire_repr.as_slice().into()))
}

////////////////////////////////////////////////////////////////////////
// DECODING                                                           //
////////////////////////////////////////////////////////////////////////

/// Decodes a possibly compressed name starting at index `start` of
/// `octets`.
///
/// `octets` must be the whole DNS message, header included, since
/// compression pointers hold offsets from the start of the message.
/// Labels are read until the null label. When a pointer is found, its
/// 14-bit target becomes the new read position and the labels found
/// there are appended to the name being built. The returned index is
/// the one just past the octets the name occupies at `start`; if the
/// name contains a pointer, that is just past the first pointer.
///
/// Pointers are followed iteratively. A target that was already visited
/// while decoding this name fails with [`Error::PointerLoop`], and more
/// than [`MAX_POINTER_HOPS`] pointers fail with
/// [`Error::TooManyPointers`]. Reading past the end of `octets` fails
/// with [`Error::UnexpectedEom`].
pub fn decode_name(octets: &[u8], start: usize) -> Result<(Name, usize), Error> {
    let mut wire_repr = ArrayVec::<u8, MAX_WIRE_LEN>::new();
    let mut visited = ArrayVec::<usize, MAX_POINTER_HOPS>::new();
    let mut end_at_start = None;
    let mut index = start;

    loop {
        let len = *octets.get(index).ok_or(Error::UnexpectedEom)?;
        if len & POINTER_TAG == POINTER_TAG {
            let low = *octets.get(index + 1).ok_or(Error::UnexpectedEom)?;
            let target = u16::from_be_bytes([len & !POINTER_TAG, low]) as usize;
            end_at_start.get_or_insert(index + 2);
            if visited.contains(&target) {
                return Err(Error::PointerLoop);
            }
            visited
                .try_push(target)
                .or(Err(Error::TooManyPointers))?;
            index = target;
        } else if len as usize > MAX_LABEL_LEN {
            // The 0x40 and 0x80 label types are not defined by RFC
            // 1035 (and EDNS extended labels are obsolete).
            return Err(Error::LabelTooLong);
        } else {
            let end_of_label = index + 1 + len as usize;
            let label = octets
                .get(index..end_of_label)
                .ok_or(Error::UnexpectedEom)?;
            wire_repr
                .try_extend_from_slice(label)
                .or(Err(Error::NameTooLong))?;
            index = end_of_label;
            if len == 0 {
                end_at_start.get_or_insert(index);
                break;
            }
        }
    }

    let name = Name::from_wire_unchecked(wire_repr.as_slice().into());
    // The loop only exits after setting end_at_start.
    Ok((name, end_at_start.unwrap_or(index)))
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Three questions from RFC 1035 § 4.1.4's compression example,
    /// placed after a 12-octet header: F.ISI.ARPA in full,
    /// FOO.F.ISI.ARPA as a label plus a pointer to the first name, and
    /// ARPA as a pointer into the middle of the first name.
    const COMPRESSED_QUESTIONS: &[u8] = b"\x12\x34\x01\x00\x00\x03\x00\x00\x00\x00\x00\x00\
          \x01F\x03ISI\x04ARPA\x00\x00\x01\x00\x01\
          \x03FOO\xc0\x0c\x00\x01\x00\x01\
          \xc0\x12\x00\x01\x00\x01";

    #[test]
    fn encode_name_works() {
        let name = encode_name([&b"F"[..], b"ISI", b"ARPA"]).unwrap();
        assert_eq!(name.wire_repr(), b"\x01F\x03ISI\x04ARPA\x00");
        assert_eq!(encode_name(std::iter::empty()), Ok(Name::root()));
    }

    #[test]
    fn encode_name_rejects_long_label() {
        let label = [b'x'; 64];
        assert_eq!(encode_name([&label[..]]), Err(Error::LabelTooLong));
        let label = [b'x'; 63];
        assert!(encode_name([&label[..]]).is_ok());
    }

    #[test]
    fn encode_name_rejects_long_name() {
        // Four 63-octet labels need 4 * 64 + 1 = 257 octets.
        let label = [b'x'; 63];
        assert_eq!(encode_name([&label[..]; 4]), Err(Error::NameTooLong));

        // Three 63-octet labels and one 61-octet label need exactly 255.
        let short = [b'y'; 61];
        let name = encode_name([&label[..], &label, &label, &short]).unwrap();
        assert_eq!(name.wire_repr().len(), MAX_WIRE_LEN);
    }

    #[test]
    fn encode_name_rejects_empty_label() {
        assert_eq!(encode_name([&b"a"[..], b""]), Err(Error::NullNonTerminal));
    }

    #[test]
    fn decode_inverts_encode() {
        let mut labels: Vec<Vec<u8>> = (1..=20u8)
            .map(|n| vec![b'a' + n % 26; n as usize])
            .collect();
        labels.truncate(9); // 1 + 2 + ... + 9 octets plus 9 length octets
        let name = encode_name(labels.iter().map(Vec::as_slice)).unwrap();
        let (decoded, end) = decode_name(name.wire_repr(), 0).unwrap();
        assert_eq!(decoded, name);
        assert_eq!(end, name.wire_repr().len());

        let max_labels = encode_name([&b"x"[..]; 127]).unwrap();
        assert_eq!(max_labels.wire_repr().len(), MAX_WIRE_LEN);
        assert_eq!(
            decode_name(max_labels.wire_repr(), 0),
            Ok((max_labels, MAX_WIRE_LEN))
        );
    }

    #[test]
    fn decode_name_follows_pointers() {
        let (first, end) = decode_name(COMPRESSED_QUESTIONS, 12).unwrap();
        assert_eq!(first.to_string(), "F.ISI.ARPA.");
        assert_eq!(first.wire_repr(), b"\x01F\x03ISI\x04ARPA\x00");
        assert_eq!(end, 24);

        let (second, end) = decode_name(COMPRESSED_QUESTIONS, 28).unwrap();
        assert_eq!(second.to_string(), "FOO.F.ISI.ARPA.");
        assert_eq!(end, 34);

        let (third, end) = decode_name(COMPRESSED_QUESTIONS, 38).unwrap();
        assert_eq!(third.to_string(), "ARPA.");
        assert_eq!(end, 40);
    }

    #[test]
    fn pointer_only_name_equals_its_target() {
        let message = b"\x07example\x04test\x00\xc0\x00";
        let (full, _) = decode_name(message, 0).unwrap();
        let (pointed, end) = decode_name(message, 14).unwrap();
        assert_eq!(full, pointed);
        assert_eq!(end, 16);
    }

    #[test]
    fn decode_name_accepts_forward_pointers() {
        let message = b"\x01x\xc0\x08junk\x04test\x00";
        let (name, end) = decode_name(message, 0).unwrap();
        assert_eq!(name.to_string(), "x.test.");
        assert_eq!(end, 4);
    }

    #[test]
    fn decode_name_rejects_pointer_loops() {
        assert_eq!(decode_name(b"\xc0\x00", 0), Err(Error::PointerLoop));
        assert_eq!(
            decode_name(b"\x01a\x01b\xc0\x00", 2),
            Err(Error::PointerLoop)
        );
        assert_eq!(decode_name(b"\xc0\x02\xc0\x00", 0), Err(Error::PointerLoop));
    }

    #[test]
    fn decode_name_bounds_pointer_hops() {
        // A chain of 21 pointers, each to the next, ending at a null
        // label.
        let mut message = Vec::new();
        for i in 1..=21u8 {
            message.extend_from_slice(&[0xc0, 2 * i]);
        }
        message.push(0);
        assert_eq!(decode_name(&message, 0), Err(Error::TooManyPointers));

        // Twenty pointers are fine.
        assert_eq!(
            decode_name(&message, 2).map(|(name, _)| name),
            Ok(Name::root())
        );
    }

    #[test]
    fn decode_name_rejects_unexpected_eom() {
        assert_eq!(
            decode_name(b"\x07example\x04tes", 0),
            Err(Error::UnexpectedEom)
        );
        assert_eq!(decode_name(b"\x07example", 0), Err(Error::UnexpectedEom));
        assert_eq!(decode_name(b"\x01a\xc0", 0), Err(Error::UnexpectedEom));
        assert_eq!(decode_name(b"\x01a\xc0\x10", 0), Err(Error::UnexpectedEom));
        assert_eq!(decode_name(b"", 0), Err(Error::UnexpectedEom));
    }

    #[test]
    fn decode_name_rejects_reserved_label_types() {
        assert_eq!(decode_name(b"\x40xx\x00", 0), Err(Error::LabelTooLong));
        assert_eq!(decode_name(b"\x80xx\x00", 0), Err(Error::LabelTooLong));
    }

    #[test]
    fn decode_name_rejects_long_name_with_pointers() {
        // 100 one-octet labels, then a pointer back to the start of
        // them: 200 + 200 + 1 octets when expanded.
        let mut message = b"\x01x".repeat(100);
        message.push(0);
        message.extend_from_slice(&b"\x01x".repeat(100));
        message.extend_from_slice(b"\xc0\x00");
        assert_eq!(decode_name(&message, 201), Err(Error::NameTooLong));
    }
}
