use bon::Builder;
use der::Tag;
use serde_json::json;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::asn1::Asn1Node;
use crate::error::{PkiKitError, Result};
use crate::schema::{Captures, SchemaNode};
use crate::structure::PkiStructure;

/// Which of the two `Time` alternatives is used on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeKind {
    UtcTime,
    GeneralizedTime,
}

/// Capture labels for [`Time`].
#[derive(Clone, Debug, Builder)]
pub struct TimeNames {
    #[builder(default = "utcTimeName".to_string(), into)]
    pub utc_time_name: String,
    #[builder(default = "generalTimeName".to_string(), into)]
    pub general_time_name: String,
}

impl Default for TimeNames {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// `Time ::= CHOICE { utcTime UTCTime, generalTime GeneralizedTime }`
///
/// Values carry whole seconds in UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Time {
    pub kind: TimeKind,
    pub value: OffsetDateTime,
}

impl Default for Time {
    fn default() -> Self {
        Self::new(OffsetDateTime::now_utc())
    }
}

impl Time {
    /// Picks UTCTime for years 1950 through 2049 and GeneralizedTime
    /// otherwise, as RFC 5280 requires for certificate validity.
    pub fn new(value: OffsetDateTime) -> Self {
        let value = value.to_offset(UtcOffset::UTC)
            - time::Duration::nanoseconds(i64::from(value.nanosecond()));
        let kind = if (1950..2050).contains(&value.year()) {
            TimeKind::UtcTime
        } else {
            TimeKind::GeneralizedTime
        };
        Self { kind, value }
    }

    /// `YYMMDDHHMMSSZ` or `YYYYMMDDHHMMSSZ`.
    fn format(&self) -> Result<String> {
        let value = self.value.to_offset(UtcOffset::UTC);
        let year = value.year();
        let year = match self.kind {
            TimeKind::UtcTime if (1950..2050).contains(&year) => format!("{:02}", year % 100),
            TimeKind::GeneralizedTime if (0..=9999).contains(&year) => format!("{year:04}"),
            kind => {
                return Err(PkiKitError::EncodingError(format!(
                    "year {year} cannot be written as {kind:?}"
                )));
            }
        };
        Ok(format!(
            "{year}{:02}{:02}{:02}{:02}{:02}Z",
            u8::from(value.month()),
            value.day(),
            value.hour(),
            value.minute(),
            value.second()
        ))
    }

    /// Reads the text of either alternative. Two-digit UTCTime years below 50
    /// belong to the 2000s. Minutes, seconds and a numeric zone offset may be
    /// present or not, as BER allows; fractional seconds are dropped.
    fn parse(kind: TimeKind, text: &[u8]) -> Result<OffsetDateTime> {
        let malformed = || {
            PkiKitError::DecodingError(format!(
                "malformed {kind:?} value {:?}",
                String::from_utf8_lossy(text)
            ))
        };
        let mut cursor = TimeText { text, pos: 0 };

        let year = match kind {
            TimeKind::UtcTime => match cursor.number(2).ok_or_else(malformed)? {
                yy if yy < 50 => 2000 + yy,
                yy => 1900 + yy,
            },
            TimeKind::GeneralizedTime => cursor.number(4).ok_or_else(malformed)?,
        };
        let month = cursor.number(2).ok_or_else(malformed)?;
        let day = cursor.number(2).ok_or_else(malformed)?;
        let hour = cursor.number(2).ok_or_else(malformed)?;
        let minute = cursor.optional_number().ok_or_else(malformed)?;
        let second = cursor.optional_number().ok_or_else(malformed)?;
        if kind == TimeKind::GeneralizedTime && !cursor.skip_fraction() {
            return Err(malformed());
        }
        let offset = cursor.offset().ok_or_else(malformed)?;
        if cursor.pos != text.len() {
            return Err(malformed());
        }

        let component = |e: time::error::ComponentRange| {
            PkiKitError::DecodingError(format!("{kind:?} out of range: {e}"))
        };
        let month = u8::try_from(month)
            .ok()
            .and_then(|month| Month::try_from(month).ok())
            .ok_or_else(malformed)?;
        let narrow = |value: u32| u8::try_from(value).map_err(|_| malformed());
        let date = Date::from_calendar_date(year as i32, month, narrow(day)?).map_err(component)?;
        let clock = time::Time::from_hms(narrow(hour)?, narrow(minute)?, narrow(second)?)
            .map_err(component)?;
        Ok(PrimitiveDateTime::new(date, clock)
            .assume_offset(offset)
            .to_offset(UtcOffset::UTC))
    }
}

struct TimeText<'a> {
    text: &'a [u8],
    pos: usize,
}

impl TimeText<'_> {
    fn number(&mut self, width: usize) -> Option<u32> {
        let digits = self.text.get(self.pos..self.pos + width)?;
        if !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        self.pos += width;
        Some(digits.iter().fold(0, |acc, d| acc * 10 + u32::from(d - b'0')))
    }

    /// Two digits if the next octet is a digit, zero otherwise.
    fn optional_number(&mut self) -> Option<u32> {
        match self.text.get(self.pos) {
            Some(d) if d.is_ascii_digit() => self.number(2),
            _ => Some(0),
        }
    }

    /// Skips `.fff` or `,fff`; false when the separator has no digits.
    fn skip_fraction(&mut self) -> bool {
        if !matches!(self.text.get(self.pos), Some(b'.' | b',')) {
            return true;
        }
        self.pos += 1;
        let start = self.pos;
        while self.text.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn offset(&mut self) -> Option<UtcOffset> {
        let sign: i8 = match self.text.get(self.pos)? {
            b'Z' => {
                self.pos += 1;
                return Some(UtcOffset::UTC);
            }
            b'+' => 1,
            b'-' => -1,
            _ => return None,
        };
        self.pos += 1;
        let hours = i8::try_from(self.number(2)?).ok()?;
        let minutes = i8::try_from(self.number(2)?).ok()?;
        UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
    }
}

impl From<OffsetDateTime> for Time {
    fn from(value: OffsetDateTime) -> Self {
        Self::new(value)
    }
}

impl PkiStructure for Time {
    type Names = TimeNames;

    fn schema(names: &Self::Names) -> SchemaNode {
        SchemaNode::choice(vec![
            SchemaNode::primitive(Tag::UtcTime).labeled(&names.utc_time_name),
            SchemaNode::primitive(Tag::GeneralizedTime).labeled(&names.general_time_name),
        ])
    }

    /// Both labels may be the same; the alternative is told apart by tag.
    fn from_captures(captures: &Captures<'_>, names: &Self::Names) -> Result<Self> {
        let node = match captures.get(&names.utc_time_name) {
            Some(node) => node,
            None => captures.require(&names.general_time_name)?,
        };
        let kind = match node.tag() {
            Tag::UtcTime => TimeKind::UtcTime,
            Tag::GeneralizedTime => TimeKind::GeneralizedTime,
            other => {
                return Err(PkiKitError::SchemaMismatch(format!(
                    "expected UTCTime or GeneralizedTime, found {other}"
                )));
            }
        };
        let value = Self::parse(kind, node.content().unwrap_or_default())?;
        Ok(Self { kind, value })
    }

    fn to_node(&self) -> Result<Asn1Node> {
        let tag = match self.kind {
            TimeKind::UtcTime => Tag::UtcTime,
            TimeKind::GeneralizedTime => Tag::GeneralizedTime,
        };
        Asn1Node::primitive(tag, self.format()?.into_bytes())
    }

    fn to_json(&self) -> serde_json::Value {
        let kind = match self.kind {
            TimeKind::UtcTime => 0,
            TimeKind::GeneralizedTime => 1,
        };
        json!({ "type": kind, "value": self.value.to_string() })
    }
}
