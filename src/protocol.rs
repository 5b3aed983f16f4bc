//! JSON-over-HTTP query protocol.
//!
//! ```text
//! GET /dns-query?name=example.owndomain&type=A
//!
//! {"Status":0,"Answer":[{"name":"example.owndomain","type":1,"TTL":300,"data":"192.168.1.100"}]}
//! ```
//!
//! Each request is independent; there is no session state.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// Path of the query resource.
pub const QUERY_PATH: &str = "/dns-query";

/// Content type of query answers.
pub const DNS_JSON_CONTENT_TYPE: &str = "application/dns-json";

/// Answer status for success.
pub const STATUS_NOERROR: u8 = 0;

/// Answer status for "no such record".
pub const STATUS_NXDOMAIN: u8 = 3;

/// Numeric record type of an address answer.
pub const TYPE_A: u16 = 1;

/// Requested record type.
///
/// Only address lookups are meaningful; other values are accepted and
/// answered as address lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RecordType {
    /// Address lookup, `A` or `1`.
    #[default]
    A,
    /// Any other requested type, kept verbatim for logging.
    Other(String),
}

impl RecordType {
    /// Parses the optional `type` query parameter.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            None | Some("") => Self::A,
            Some(t) if t.eq_ignore_ascii_case("a") || t == "1" => Self::A,
            Some(t) => Self::Other(t.to_string()),
        }
    }

    /// Parameter value sent upstream.
    #[must_use]
    pub fn as_param(&self) -> &str {
        match self {
            Self::A => "A",
            Self::Other(t) => t,
        }
    }
}

/// Raw query-string parameters of a query request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    /// Hostname to look up.
    pub name: Option<String>,
    /// Optional record type.
    #[serde(rename = "type")]
    pub record_type: Option<String>,
}

/// A validated query request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Hostname to look up, as sent by the client.
    pub name: String,
    /// Requested record type.
    pub record_type: RecordType,
}

impl TryFrom<QueryParams> for QueryRequest {
    type Error = ProtocolError;

    fn try_from(params: QueryParams) -> Result<Self, Self::Error> {
        let name = params
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(ProtocolError::MissingName)?;
        Ok(Self {
            name,
            record_type: RecordType::from_param(params.record_type.as_deref()),
        })
    }
}

/// One answer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Owner name.
    pub name: String,
    /// Numeric record type (1 for addresses).
    #[serde(rename = "type")]
    pub record_type: u16,
    /// Time to live in seconds.
    #[serde(rename = "TTL", default)]
    pub ttl: u32,
    /// Record data, an address for type 1.
    pub data: String,
}

/// Response body of the query protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// `0` success, `3` no record; anything else is an upstream failure.
    #[serde(rename = "Status")]
    pub status: u8,
    /// Answer records; empty on NXDOMAIN.
    #[serde(rename = "Answer", default)]
    pub answers: Vec<Answer>,
}

impl QueryAnswer {
    /// A successful answer with a single address record.
    #[must_use]
    pub fn found(name: impl Into<String>, ttl: u32, address: impl Into<String>) -> Self {
        Self {
            status: STATUS_NOERROR,
            answers: vec![Answer {
                name: name.into(),
                record_type: TYPE_A,
                ttl,
                data: address.into(),
            }],
        }
    }

    /// The NXDOMAIN-equivalent answer.
    #[must_use]
    pub const fn nxdomain() -> Self {
        Self {
            status: STATUS_NXDOMAIN,
            answers: Vec::new(),
        }
    }

    /// Returns `true` if the status is success or NXDOMAIN.
    #[must_use]
    pub const fn is_definitive(&self) -> bool {
        self.status == STATUS_NOERROR || self.status == STATUS_NXDOMAIN
    }

    /// The first type-1 record of a successful answer.
    ///
    /// Public resolvers list CNAME records ahead of the final address; an
    /// answer made only of aliases has no address.
    #[must_use]
    pub fn address(&self) -> Option<&Answer> {
        if self.status != STATUS_NOERROR {
            return None;
        }
        self.answers
            .iter()
            .find(|a| a.record_type == TYPE_A && !a.data.is_empty())
    }
}
