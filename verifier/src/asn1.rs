// Copyright (c) 2023 The NemID Verifier Developers

//! Minimal DER reader and writer for the OCSP structures.
//!
//! Readers take the remaining input and return the decoded value together
//! with the bytes following the element. Only single byte tags are supported,
//! which covers every structure the OCSP request and response use.

use const_oid::ObjectIdentifier;
use der::DateTime;

/// Result of reading or writing DER.
pub type Result<T> = core::result::Result<T, Error>;

/// Error decoding or encoding DER
#[derive(Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The input ended before the element was complete
    Truncated,
    /// Expected tag {expected:#04x} but found {actual:#04x}
    UnexpectedTag {
        /// The tag the caller asked for
        expected: u8,
        /// The tag found in the input
        actual: u8,
    },
    /// High tag number form is not supported
    UnsupportedTag,
    /// The length is not encoded according to DER
    InvalidLength,
    /// The contents of the element are not valid
    InvalidValue,
    /// The contents are too long to be encoded
    LengthOverflow,
    /// Unexpected bytes follow the last field of a structure
    TrailingData,
}

/// Universal tags used by the OCSP structures.
pub mod tag {
    /// INTEGER
    pub const INTEGER: u8 = 0x02;
    /// BIT STRING
    pub const BIT_STRING: u8 = 0x03;
    /// OCTET STRING
    pub const OCTET_STRING: u8 = 0x04;
    /// NULL
    pub const NULL: u8 = 0x05;
    /// OBJECT IDENTIFIER
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    /// ENUMERATED
    pub const ENUMERATED: u8 = 0x0A;
    /// UTCTime
    pub const UTC_TIME: u8 = 0x17;
    /// GeneralizedTime
    pub const GENERALIZED_TIME: u8 = 0x18;
    /// SEQUENCE (constructed)
    pub const SEQUENCE: u8 = 0x30;

    const CONTEXT_SPECIFIC: u8 = 0x80;
    const CONSTRUCTED: u8 = 0x20;

    /// The tag of an explicitly tagged (constructed) context specific field.
    pub const fn explicit(number: u8) -> u8 {
        CONTEXT_SPECIFIC | CONSTRUCTED | number
    }

    /// Returns the tag number when `tag` is context specific.
    pub const fn context_number(tag: u8) -> Option<u8> {
        if tag & 0xC0 == CONTEXT_SPECIFIC {
            Some(tag & 0x1F)
        } else {
            None
        }
    }
}

/// A single decoded TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    /// The identifier octet
    pub tag: u8,
    /// The value octets
    pub contents: &'a [u8],
    /// The complete encoding, identifier and length included
    pub encoded: &'a [u8],
}

/// Reads the next element, whatever its tag.
pub fn read_element(input: &[u8]) -> Result<(Element<'_>, &[u8])> {
    let (&tag, rest) = input.split_first().ok_or(Error::Truncated)?;
    if tag & 0x1F == 0x1F {
        return Err(Error::UnsupportedTag);
    }
    let (length, rest) = read_length(rest)?;
    if rest.len() < length {
        return Err(Error::Truncated);
    }
    let header_len = input.len() - rest.len();
    let (contents, remaining) = rest.split_at(length);
    let element = Element {
        tag,
        contents,
        encoded: &input[..header_len + length],
    };
    Ok((element, remaining))
}

fn read_length(input: &[u8]) -> Result<(usize, &[u8])> {
    let (&first, rest) = input.split_first().ok_or(Error::Truncated)?;
    if first < 0x80 {
        return Ok((first as usize, rest));
    }
    let count = (first & 0x7F) as usize;
    // 0x80 is the BER indefinite form, anything over four octets is not
    // something these structures need.
    if count == 0 || count > 4 {
        return Err(Error::InvalidLength);
    }
    if rest.len() < count {
        return Err(Error::Truncated);
    }
    let (octets, rest) = rest.split_at(count);
    if octets[0] == 0 {
        return Err(Error::InvalidLength);
    }
    let length = octets
        .iter()
        .fold(0usize, |length, octet| (length << 8) | *octet as usize);
    if length < 0x80 {
        return Err(Error::InvalidLength);
    }
    Ok((length, rest))
}

/// Reads an element that must carry `expected` as its tag, returning its
/// contents.
pub fn read_tagged(input: &[u8], expected: u8) -> Result<(&[u8], &[u8])> {
    let (element, rest) = read_element(input)?;
    if element.tag != expected {
        return Err(Error::UnexpectedTag {
            expected,
            actual: element.tag,
        });
    }
    Ok((element.contents, rest))
}

/// Reads an element tagged `expected` if it is the next element.
///
/// An absent field, either because the input is exhausted or because the next
/// element has another tag, yields `None` and leaves the input untouched.
pub fn read_optional_tagged(input: &[u8], expected: u8) -> Result<(Option<&[u8]>, &[u8])> {
    match input.first() {
        Some(&tag) if tag == expected => {
            let (contents, rest) = read_tagged(input, expected)?;
            Ok((Some(contents), rest))
        }
        _ => Ok((None, input)),
    }
}

/// Checks that nothing is left after the last field of a structure.
pub fn expect_end(rest: &[u8]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::TrailingData)
    }
}

/// Steps over the remaining elements of a `SEQUENCE OF` without decoding
/// them, only their framing is checked.
pub fn skip_elements(mut input: &[u8]) -> Result<()> {
    while !input.is_empty() {
        let (_, rest) = read_element(input)?;
        input = rest;
    }
    Ok(())
}

/// Reads a SEQUENCE, returning its contents.
pub fn read_sequence(input: &[u8]) -> Result<(&[u8], &[u8])> {
    read_tagged(input, tag::SEQUENCE)
}

/// Reads an INTEGER, returning its two's complement content octets.
pub fn read_integer(input: &[u8]) -> Result<(&[u8], &[u8])> {
    let (contents, rest) = read_tagged(input, tag::INTEGER)?;
    if contents.is_empty() {
        return Err(Error::InvalidValue);
    }
    Ok((contents, rest))
}

/// Reads an OCTET STRING, returning its contents.
pub fn read_octet_string(input: &[u8]) -> Result<(&[u8], &[u8])> {
    read_tagged(input, tag::OCTET_STRING)
}

/// Reads a BIT STRING, dropping the leading "unused bits" octet.
///
/// Only octet aligned strings are accepted.
pub fn read_bit_string(input: &[u8]) -> Result<(&[u8], &[u8])> {
    let (contents, rest) = read_tagged(input, tag::BIT_STRING)?;
    match contents.split_first() {
        Some((0, bits)) => Ok((bits, rest)),
        _ => Err(Error::InvalidValue),
    }
}

/// Reads an OBJECT IDENTIFIER.
pub fn read_oid(input: &[u8]) -> Result<(ObjectIdentifier, &[u8])> {
    let (contents, rest) = read_tagged(input, tag::OBJECT_IDENTIFIER)?;
    let oid = ObjectIdentifier::from_bytes(contents).map_err(|_| Error::InvalidValue)?;
    Ok((oid, rest))
}

/// Reads an ENUMERATED small enough to fit in an `i64`.
pub fn read_enumerated(input: &[u8]) -> Result<(i64, &[u8])> {
    let (contents, rest) = read_tagged(input, tag::ENUMERATED)?;
    if contents.is_empty() || contents.len() > 8 {
        return Err(Error::InvalidValue);
    }
    let negative = contents[0] & 0x80 != 0;
    let initial = if negative { -1i64 } else { 0 };
    let value = contents
        .iter()
        .fold(initial, |value, octet| (value << 8) | *octet as i64);
    Ok((value, rest))
}

/// Reads a GeneralizedTime in the `yyyyMMddHHmmssZ` form.
pub fn read_generalized_time(input: &[u8]) -> Result<(DateTime, &[u8])> {
    let (contents, rest) = read_tagged(input, tag::GENERALIZED_TIME)?;
    Ok((parse_generalized_time(contents)?, rest))
}

fn parse_generalized_time(contents: &[u8]) -> Result<DateTime> {
    let digits = match contents {
        [digits @ .., b'Z'] if digits.len() == 14 => digits,
        _ => return Err(Error::InvalidValue),
    };
    let number = |range: core::ops::Range<usize>| -> Result<u16> {
        digits[range].iter().try_fold(0u16, |value, digit| {
            if digit.is_ascii_digit() {
                Ok(value * 10 + u16::from(digit - b'0'))
            } else {
                Err(Error::InvalidValue)
            }
        })
    };
    let year = number(0..4)?;
    // The remaining fields are two digits so they always fit in a `u8`.
    let field = |range| number(range).map(|value| value as u8);
    DateTime::new(
        year,
        field(4..6)?,
        field(6..8)?,
        field(8..10)?,
        field(10..12)?,
        field(12..14)?,
    )
    .map_err(|_| Error::InvalidValue)
}

/// Encodes `contents` under `tag`.
pub fn encode(tag: u8, contents: &[u8]) -> Result<Vec<u8>> {
    let length = contents.len();
    let mut encoded = Vec::with_capacity(length + 6);
    encoded.push(tag);
    if length < 0x80 {
        encoded.push(length as u8);
    } else {
        let length = u32::try_from(length).map_err(|_| Error::LengthOverflow)?;
        let octets = length.to_be_bytes();
        let skip = octets.iter().take_while(|octet| **octet == 0).count();
        encoded.push(0x80 | (octets.len() - skip) as u8);
        encoded.extend_from_slice(&octets[skip..]);
    }
    encoded.extend_from_slice(contents);
    Ok(encoded)
}

/// Encodes a SEQUENCE holding the already encoded `elements`.
pub fn sequence(elements: &[&[u8]]) -> Result<Vec<u8>> {
    encode(tag::SEQUENCE, &elements.concat())
}

/// Encodes an INTEGER from its two's complement content octets.
pub fn integer(contents: &[u8]) -> Result<Vec<u8>> {
    if contents.is_empty() {
        return Err(Error::InvalidValue);
    }
    encode(tag::INTEGER, contents)
}

/// Encodes an OCTET STRING.
pub fn octet_string(contents: &[u8]) -> Result<Vec<u8>> {
    encode(tag::OCTET_STRING, contents)
}

/// Encodes an OBJECT IDENTIFIER.
pub fn oid(oid: &ObjectIdentifier) -> Result<Vec<u8>> {
    encode(tag::OBJECT_IDENTIFIER, oid.as_bytes())
}

/// Encodes a NULL.
pub fn null() -> Result<Vec<u8>> {
    encode(tag::NULL, &[])
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use yare::parameterized;

    #[test]
    fn read_element_returns_remaining_bytes() {
        let input = [0x04, 0x02, 0xAA, 0xBB, 0x05, 0x00];
        let (element, rest) = read_element(&input).expect("Failed to read element");

        assert_eq!(element.tag, tag::OCTET_STRING);
        assert_eq!(element.contents, &[0xAA, 0xBB]);
        assert_eq!(element.encoded, &input[..4]);
        assert_eq!(rest, &[0x05, 0x00]);
    }

    #[test]
    fn read_long_form_length() {
        let mut input = vec![0x04, 0x81, 0x80];
        input.extend([0x11; 0x80]);
        let (contents, rest) = read_octet_string(&input).expect("Failed to read octet string");

        assert_eq!(contents.len(), 0x80);
        assert!(rest.is_empty());
    }

    #[parameterized(
        indefinite = { &[0x30, 0x80, 0x00, 0x00] },
        non_minimal_short = { &[0x04, 0x81, 0x01, 0xAA] },
        leading_zero = { &[0x04, 0x82, 0x00, 0x81] },
        too_many_octets = { &[0x04, 0x85, 0x01, 0x01, 0x01, 0x01, 0x01] },
    )]
    fn invalid_length_is_rejected(input: &[u8]) {
        assert_eq!(read_element(input), Err(Error::InvalidLength));
    }

    #[parameterized(
        empty = { &[] },
        missing_length = { &[0x30] },
        short_contents = { &[0x04, 0x03, 0x01, 0x02] },
        short_length = { &[0x04, 0x82, 0x01] },
    )]
    fn truncated_input_is_rejected(input: &[u8]) {
        assert_eq!(read_element(input), Err(Error::Truncated));
    }

    #[test]
    fn unexpected_tag_is_reported() {
        assert_eq!(
            read_sequence(&[0x04, 0x00]),
            Err(Error::UnexpectedTag {
                expected: tag::SEQUENCE,
                actual: tag::OCTET_STRING
            })
        );
    }

    #[parameterized(
        empty = { &[], Ok(()) },
        leftover = { &[0x05, 0x00], Err(Error::TrailingData) },
    )]
    fn end_of_structure(rest: &[u8], expected: Result<()>) {
        assert_eq!(expect_end(rest), expected);
    }

    #[parameterized(
        none = { &[], Ok(()) },
        two = { &[0x30, 0x01, 0xFF, 0x05, 0x00], Ok(()) },
        truncated_second = { &[0x05, 0x00, 0x30, 0x02, 0x01], Err(Error::Truncated) },
    )]
    fn skipped_elements_are_framed(input: &[u8], expected: Result<()>) {
        assert_eq!(skip_elements(input), expected);
    }

    #[test]
    fn high_tag_numbers_are_not_supported() {
        assert_eq!(read_element(&[0x1F, 0x81, 0x00]), Err(Error::UnsupportedTag));
    }

    #[test]
    fn optional_field_present() {
        let input = [0xA0, 0x01, 0x05, 0x02, 0x01, 0x00];
        let (contents, rest) =
            read_optional_tagged(&input, tag::explicit(0)).expect("Failed to read field");

        assert_eq!(contents, Some(&[0x05][..]));
        assert_eq!(rest, &[0x02, 0x01, 0x00]);
    }

    #[parameterized(
        other_tag = { &[0x02, 0x01, 0x00] },
        exhausted = { &[] },
    )]
    fn optional_field_absent(input: &[u8]) {
        let (contents, rest) =
            read_optional_tagged(input, tag::explicit(0)).expect("Failed to read field");

        assert_eq!(contents, None);
        assert_eq!(rest, input);
    }

    #[test]
    fn bit_string_drops_unused_bits_octet() {
        let (bits, _) = read_bit_string(&[0x03, 0x03, 0x00, 0xDE, 0xAD]).expect("Failed to read");
        assert_eq!(bits, &[0xDE, 0xAD]);
    }

    #[test]
    fn bit_string_with_unused_bits_is_rejected() {
        assert_eq!(
            read_bit_string(&[0x03, 0x02, 0x04, 0xF0]),
            Err(Error::InvalidValue)
        );
    }

    #[parameterized(
        zero = { &[0x0A, 0x01, 0x00], 0 },
        six = { &[0x0A, 0x01, 0x06], 6 },
        two_octets = { &[0x0A, 0x02, 0x01, 0x00], 256 },
        negative = { &[0x0A, 0x01, 0xFF], -1 },
    )]
    fn enumerated_values(input: &[u8], expected: i64) {
        let (value, _) = read_enumerated(input).expect("Failed to read enumerated");
        assert_eq!(value, expected);
    }

    #[test]
    fn oid_is_decoded() {
        let input = [
            0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
        ];
        let (oid, rest) = read_oid(&input).expect("Failed to read OID");

        assert_eq!(oid, ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1"));
        assert!(rest.is_empty());
    }

    #[test]
    fn generalized_time_is_decoded() {
        let mut input = vec![tag::GENERALIZED_TIME, 15];
        input.extend_from_slice(b"20210419113508Z");
        let (time, _) = read_generalized_time(&input).expect("Failed to read time");

        let expected = DateTime::new(2021, 4, 19, 11, 35, 8).expect("Invalid date");
        assert_eq!(time, expected);
    }

    #[parameterized(
        fractional_seconds = { b"20210419113508.5Z" },
        missing_zulu = { b"20210419113508" },
        local_offset = { b"20210419113508+0100" },
        not_digits = { b"2021O419113508Z" },
        bad_month = { b"20211319113508Z" },
    )]
    fn malformed_generalized_time_is_rejected(time: &[u8]) {
        let mut input = vec![tag::GENERALIZED_TIME, time.len() as u8];
        input.extend_from_slice(time);

        assert_matches!(read_generalized_time(&input), Err(Error::InvalidValue));
    }

    #[test]
    fn encode_short_and_long_lengths() {
        assert_eq!(encode(tag::OCTET_STRING, &[0xAB]), Ok(vec![0x04, 0x01, 0xAB]));

        let long = encode(tag::OCTET_STRING, &[0u8; 0x1234]).expect("Failed to encode");
        assert_eq!(&long[..4], &[0x04, 0x82, 0x12, 0x34]);
        assert_eq!(long.len(), 4 + 0x1234);
    }

    #[test]
    fn encoded_elements_read_back() {
        let integer = integer(&[0x5F, 0x9C, 0x32, 0x4B]).expect("Failed to encode integer");
        let null = null().expect("Failed to encode null");
        let encoded = sequence(&[&integer, &null]).expect("Failed to encode sequence");

        let (contents, rest) = read_sequence(&encoded).expect("Failed to read sequence");
        assert!(rest.is_empty());
        let (serial, contents) = read_integer(contents).expect("Failed to read integer");
        assert_eq!(serial, &[0x5F, 0x9C, 0x32, 0x4B]);
        assert_eq!(contents, &[0x05, 0x00]);
    }

    #[test]
    fn empty_integer_cannot_be_encoded() {
        assert_eq!(integer(&[]), Err(Error::InvalidValue));
    }
}
