//! Decoded answer model.
//!
//! The probe keeps a deliberately small projection of the answer section:
//! only the record types operators can assert on. Anything else in the
//! wire response is dropped here so comparison and reporting never see a
//! type the validator cannot express.

use hickory_proto::op::Message;
use hickory_proto::rr::rdata::TXT;
use hickory_proto::rr::{RData, Record};
use serde::Serialize;
use strum_macros::{Display, EnumString};

/// Record types the probe understands and can assert on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RecordKind {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Canonical name record.
    Cname,
    /// Text record.
    Txt,
}

/// One answer record as the probe reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsAnswer {
    /// Owner name, lower-cased, with the trailing dot the wire form carries.
    pub name: String,
    /// Record type tag.
    pub record_type: RecordKind,
    /// Decoded value, lower-cased. TXT character strings are joined with a
    /// single space.
    pub value: String,
    /// Remaining time-to-live in seconds.
    pub ttl: u32,
}

/// Projects the answer section of a decoded message.
///
/// Records of unsupported types are silently skipped.
pub fn project_answers(message: &Message) -> Vec<DnsAnswer> {
    message.answers().iter().filter_map(project_record).collect()
}

fn project_record(record: &Record) -> Option<DnsAnswer> {
    let (record_type, value) = match record.data()? {
        RData::A(address) => (RecordKind::A, address.0.to_string()),
        RData::AAAA(address) => (RecordKind::Aaaa, address.0.to_string()),
        RData::CNAME(target) => (RecordKind::Cname, target.0.to_utf8()),
        RData::TXT(text) => (RecordKind::Txt, join_txt(text)),
        _ => return None,
    };
    Some(DnsAnswer {
        name: record.name().to_utf8().to_lowercase(),
        record_type,
        value: value.to_lowercase(),
        ttl: record.ttl(),
    })
}

fn join_txt(text: &TXT) -> String {
    text.iter()
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
