//! Typed event records.
//!
//! `Event` is a closed union over the streamable commands. Every
//! structured variant keeps its originating `Frame` so callers can fall
//! back to raw field lookup for keys the typed view does not name.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use super::attributes::Attributes;
use super::frame::Frame;
use super::quote::{Price, Quantity, Quote};

/// Notice sequence number key (resume watermark).
pub const FIELD_EVENT_NO: &str = "p_ENO";

/// One decoded gateway event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Event {
    /// Status or error notice.
    St(St),
    /// Keep-alive.
    Kp(Kp),
    /// Board/quote update.
    Fd(Fd),
    /// Order or execution change.
    Ec(Ec),
    /// News.
    Ns(Ns),
    /// System status.
    Ss(Ss),
    /// Operation status.
    Us(Us),
    /// Reserved for allowed commands without a structured decoder.
    /// `decode_event` never yields it while every allowed command has one.
    Raw(Frame),
    /// Command outside the allow-list, seen at the read boundary.
    Unknown {
        #[serde(serialize_with = "serialize_lossy")]
        raw: Vec<u8>,
    },
}

impl Event {
    /// The originating frame, `None` for `Unknown`.
    pub const fn frame(&self) -> Option<&Frame> {
        match self {
            Self::St(e) => Some(&e.frame),
            Self::Kp(e) => Some(&e.frame),
            Self::Fd(e) => Some(&e.frame),
            Self::Ec(e) => Some(&e.frame),
            Self::Ns(e) => Some(&e.frame),
            Self::Ss(e) => Some(&e.frame),
            Self::Us(e) => Some(&e.frame),
            Self::Raw(frame) => Some(frame),
            Self::Unknown { .. } => None,
        }
    }

    /// Command tag text, or `"unknown"`.
    pub fn kind(&self) -> &str {
        self.frame().map_or("unknown", Frame::kind)
    }

    /// `p_ENO` of the event when present and positive.
    pub fn event_no(&self) -> Option<i64> {
        self.frame()
            .and_then(|frame| frame.value(FIELD_EVENT_NO).trim().parse::<i64>().ok())
            .filter(|eno| *eno > 0)
    }
}

fn serialize_lossy<S: serde::Serializer>(raw: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(raw))
}

/// Status / error notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct St {
    pub frame: Frame,
    /// `p_errno`, never blank.
    pub err_no: String,
    /// `p_err`.
    pub err: String,
}

/// Keep-alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kp {
    pub frame: Frame,
}

/// Fields shared by EC / NS / SS / US notices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoticeHeader {
    /// `p_PV`.
    pub provider: String,
    /// `p_ENO`.
    pub event_no: String,
    /// `p_ALT`.
    pub alert: bool,
}

impl NoticeHeader {
    pub(crate) fn from_attributes(fields: &Attributes) -> Self {
        Self {
            provider: fields.value("p_PV").to_string(),
            event_no: fields.value(FIELD_EVENT_NO).to_string(),
            alert: parse_bool(fields.value("p_ALT")),
        }
    }
}

/// One board row of an FD update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FdRow {
    pub row: i64,
    pub fields: Attributes,
}

/// Board / quote update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fd {
    pub frame: Frame,
    /// Rows in ascending order.
    pub rows: Vec<FdRow>,
}

impl Fd {
    /// Rows as quotes, labelled with the subscribed issue codes.
    pub fn quotes(&self, symbols: &BTreeMap<i64, String>) -> Vec<Quote> {
        self.rows
            .iter()
            .map(|row| Quote {
                symbol: symbols.get(&row.row).cloned().unwrap_or_default(),
                fields: row.fields.clone(),
            })
            .collect()
    }
}

/// Order view derived from an EC notice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: String,
    /// Absent when blank or not an integer-valued decimal.
    pub price: Option<Price>,
    pub quantity: Option<Quantity>,
    pub status: String,
    pub raw: Attributes,
}

/// Execution view derived from an EC notice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Execution {
    pub order_id: String,
    pub symbol: String,
    pub price: Option<Price>,
    pub quantity: Option<Quantity>,
    pub time: String,
    pub raw: Attributes,
}

/// Order / execution change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ec {
    pub frame: Frame,
    pub fields: Attributes,
    pub header: NoticeHeader,
    pub notice_type: String,
    pub order_number: String,
    pub business_day: String,
    pub parent_order_number: String,
    pub order_type: String,
    pub security_type: String,
    pub symbol: String,
    /// `p_IN`, decoded from Base64 Shift_JIS.
    pub issue_name: String,
    pub market_code: String,
    pub side: String,
    pub trade_type: String,
    pub order_price: String,
    pub order_quantity: String,
    pub executed_price: String,
    pub executed_quantity: String,
    pub executed_time: String,
    pub order_status: String,
}

impl Ec {
    /// Order state carried by this notice.
    pub fn order(&self) -> Order {
        Order {
            id: self.order_number.clone(),
            symbol: self.symbol.clone(),
            side: self.side.clone(),
            price: parse_price(&self.order_price),
            quantity: parse_quantity(&self.order_quantity),
            status: self.order_status.clone(),
            raw: self.fields.clone(),
        }
    }

    /// Fill carried by this notice, if any.
    ///
    /// `None` when price, quantity and time are all empty or zero.
    pub fn execution(&self) -> Option<Execution> {
        let price = parse_price(&self.executed_price);
        let quantity = parse_quantity(&self.executed_quantity);
        let time = self.executed_time.trim();

        let has_price = price.is_some_and(|p| p.0 != 0);
        let has_quantity = quantity.is_some_and(|q| q.0 != 0);
        if !has_price && !has_quantity && time.is_empty() {
            return None;
        }

        Some(Execution {
            order_id: self.order_number.clone(),
            symbol: self.symbol.clone(),
            price,
            quantity,
            time: time.to_string(),
            raw: self.fields.clone(),
        })
    }
}

/// News.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ns {
    pub frame: Frame,
    pub fields: Attributes,
    pub header: NoticeHeader,
    pub news_id: String,
    pub news_date: String,
    pub news_time: String,
    pub category_count: i64,
    pub categories: Vec<String>,
    pub genre_count: i64,
    pub genres: Vec<String>,
    pub issue_count: i64,
    pub issues: Vec<String>,
    pub skip_flag: String,
    pub update_flag: String,
    /// `p_HDL`, decoded from Base64 Shift_JIS.
    pub headline: String,
    /// `p_TX`, decoded from Base64 Shift_JIS.
    pub body: String,
}

/// System status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ss {
    pub frame: Frame,
    pub fields: Attributes,
    pub header: NoticeHeader,
    pub changed_at: String,
    pub login_kind: String,
    pub system_status: String,
}

/// Operation status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Us {
    pub frame: Frame,
    pub fields: Attributes,
    pub header: NoticeHeader,
    pub changed_at: String,
    pub market_code: String,
    pub underlying_code: String,
    pub instrument_kind: String,
    pub operation_code: String,
    pub operation_unit: String,
    pub business_day_kind: String,
    pub operation_status: String,
}

/// Parse an integer-valued decimal price (`"850.000000"` -> 850).
///
/// A non-zero fractional part makes the price absent; it is never
/// truncated.
pub fn parse_price(value: &str) -> Option<Price> {
    let value = value.trim();
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let digits = whole.strip_prefix(['-', '+']).unwrap_or(whole);
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b == b'0')
    {
        return None;
    }
    Decimal::from_str(whole).ok()?.to_i64().map(Price)
}

fn parse_quantity(value: &str) -> Option<Quantity> {
    value.trim().parse().ok().map(Quantity)
}

/// `"1"` or case-insensitive `"true"`.
pub(crate) fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}
