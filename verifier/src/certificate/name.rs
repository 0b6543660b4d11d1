// Copyright (c) 2023 The NemID Verifier Developers

//! Attribute lookup in an X509 distinguished name as defined in section
//! [4.1.2.4](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.4) of
//! [RFC5280](https://datatracker.ietf.org/doc/html/rfc5280)
//!
//! ```ignore
//!     Name ::= RDNSequence
//!     RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
//!     RelativeDistinguishedName ::= SET OF AttributeTypeAndValue
//!     AttributeTypeAndValue ::= SEQUENCE {
//!         AttributeType,
//!         AttributeValue
//!     }
//!     AttributeType ::= OBJECT IDENTIFIER
//!     AttributeValue ::= DirectoryString
//!
//!     DirectoryString ::= CHOICE {
//!         TeletexString (Unsupported in this implementation).
//!         PrintableString
//!         UniversalString (Unsupported in this implementation)
//!         UTF8String
//!         BMPString (Unsupported in this implementation)
//!         IA5String
//!     }
//! ```
//!
//! NemID names carry the user's display name in the common name and the PID
//! in the `serialNumber` attribute, both as `PrintableString` or
//! `UTF8String`.

use const_oid::ObjectIdentifier;
use x509_cert::attr::AttributeValue;
use x509_cert::der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};
use x509_cert::der::ErrorKind::TagUnknown;
use x509_cert::der::{Length, Tag, Tagged};
use x509_cert::name::Name;

pub(crate) const OID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
pub(crate) const OID_SERIAL_NUMBER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.5");

#[derive(Debug)]
enum DirectoryString<'a> {
    Printable(PrintableStringRef<'a>),
    Utf8(Utf8StringRef<'a>),
    Ia5(Ia5StringRef<'a>),
}

impl<'a> TryFrom<&'a AttributeValue> for DirectoryString<'a> {
    type Error = x509_cert::der::Error;

    fn try_from(value: &'a AttributeValue) -> Result<Self, Self::Error> {
        match value.tag() {
            Tag::PrintableString => Ok(DirectoryString::Printable(PrintableStringRef::try_from(
                value,
            )?)),
            Tag::Utf8String => Ok(DirectoryString::Utf8(Utf8StringRef::try_from(value)?)),
            Tag::Ia5String => Ok(DirectoryString::Ia5(Ia5StringRef::try_from(value)?)),
            tag => Err(Self::Error::new(
                TagUnknown { byte: tag.octet() },
                Length::from(0u8),
            )),
        }
    }
}

impl<'a> From<&DirectoryString<'a>> for &'a str {
    fn from(value: &DirectoryString<'a>) -> &'a str {
        match value {
            DirectoryString::Printable(s) => s.as_str(),
            DirectoryString::Utf8(s) => s.as_str(),
            DirectoryString::Ia5(s) => s.as_str(),
        }
    }
}

/// The value of the attribute `oid` in `name`.
///
/// When the attribute occurs more than once the last occurrence wins.
pub(crate) fn attribute(name: &Name, oid: ObjectIdentifier) -> Result<Option<String>, der::Error> {
    let mut found = None;
    for rdn in name.0.iter() {
        for attribute in rdn.0.iter().filter(|attribute| attribute.oid == oid) {
            let value = DirectoryString::try_from(&attribute.value)?;
            let value: &str = (&value).into();
            found = Some(value.to_owned());
        }
    }
    Ok(found)
}
