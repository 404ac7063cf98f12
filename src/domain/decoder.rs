//! Event Decoder - Frame to Typed Event Dispatch
//!
//! Decodes the frame, rejects commands outside the allow-list, expands
//! Base64 Shift_JIS payload fields, then hands the frame to the
//! per-command constructor.

use std::collections::BTreeMap;

use super::attributes::Attributes;
use super::command::Command;
use super::event::{Ec, Event, Fd, FdRow, Kp, NoticeHeader, Ns, Ss, St, Us};
use super::frame::{Frame, decode_frame, parse_i64_or_zero};
use super::text::{decode_base64_shift_jis, decode_hex_shift_jis};
use crate::error::{EventError, EventResult};

/// FD row fields with this prefix carry hex Shift_JIS text.
const HEX_PREFIX: char = 'x';

/// Decode raw bytes into a typed event.
///
/// # Errors
/// - Frame errors from [`decode_frame`].
/// - `Validation{p_cmd, unsupported}` for commands outside the allow-list.
/// - `TextDecode` for malformed Base64 in NS / EC text fields.
/// - `Validation{p_errno, required}` for an ST without an error code.
pub fn decode_event(data: &[u8]) -> EventResult<Event> {
    let mut frame = decode_frame(data)?;
    if !frame.command.is_allowed() {
        return Err(EventError::validation("p_cmd", "unsupported"));
    }
    decode_binary_fields(&mut frame)?;

    let event = match frame.command {
        Command::St => Event::St(parse_st(frame)?),
        Command::Kp => Event::Kp(Kp { frame }),
        Command::Fd => Event::Fd(parse_fd(frame)),
        Command::Ec => Event::Ec(parse_ec(frame)),
        Command::Ns => Event::Ns(parse_ns(frame)),
        Command::Ss => Event::Ss(parse_ss(frame)),
        Command::Us => Event::Us(parse_us(frame)),
        Command::Other(_) => Event::Raw(frame),
    };
    Ok(event)
}

fn binary_fields(command: &Command) -> &'static [&'static str] {
    match command {
        Command::Ec => &["p_IN"],
        Command::Ns => &["p_HDL", "p_TX"],
        _ => &[],
    }
}

fn decode_binary_fields(frame: &mut Frame) -> EventResult<()> {
    for key in binary_fields(&frame.command) {
        if let Some(values) = frame.fields.get_mut(*key) {
            for value in values.iter_mut() {
                *value = decode_base64_shift_jis(value)?;
            }
        }
    }
    Ok(())
}

/// First value of every key.
fn first_values(frame: &Frame) -> Attributes {
    frame
        .fields
        .iter()
        .map(|(key, values)| (key.clone(), values.first().cloned().unwrap_or_default()))
        .collect()
}

fn parse_st(frame: Frame) -> EventResult<St> {
    let err_no = frame.value("p_errno").trim().to_string();
    if err_no.is_empty() {
        return Err(EventError::validation("p_errno", "required"));
    }
    let err = frame.value("p_err").to_string();
    Ok(St { frame, err_no, err })
}

fn parse_fd(frame: Frame) -> Fd {
    let mut rows: BTreeMap<i64, Attributes> = BTreeMap::new();

    for (key, values) in &frame.fields {
        let Some((row, field)) = parse_fd_key(key) else {
            continue;
        };
        let value = values.first().map_or("", String::as_str);
        let value = if field.starts_with(HEX_PREFIX) {
            decode_hex_shift_jis(value)
        } else {
            value.to_string()
        };
        rows.entry(row).or_default().insert(field, value);
    }

    let rows = rows
        .into_iter()
        .map(|(row, fields)| FdRow { row, fields })
        .collect();
    Fd { frame, rows }
}

/// Split `p_12_DPP` into `(12, "pDPP")`.
pub(crate) fn parse_fd_key(key: &str) -> Option<(i64, String)> {
    if key.len() < 4 || key.as_bytes()[1] != b'_' || !key.is_char_boundary(2) {
        return None;
    }
    let prefix = &key[..1];
    let rest = &key[2..];
    let index = rest.find('_').filter(|i| *i > 0)?;
    let row = rest[..index].parse::<i64>().ok()?;
    Some((row, format!("{prefix}{}", &rest[index + 1..])))
}

fn parse_ec(frame: Frame) -> Ec {
    let fields = first_values(&frame);
    let get = |key: &str| fields.value(key).to_string();

    Ec {
        header: NoticeHeader::from_attributes(&fields),
        notice_type: get("p_NT"),
        order_number: get("p_ON"),
        business_day: get("p_ED"),
        parent_order_number: get("p_OON"),
        order_type: get("p_OT"),
        security_type: get("p_ST"),
        symbol: get("p_IC"),
        issue_name: get("p_IN"),
        market_code: get("p_MC"),
        side: get("p_BBKB"),
        trade_type: get("p_CRSJ"),
        order_price: get("p_CRPR"),
        order_quantity: get("p_CRSR"),
        executed_price: get("p_EXPR"),
        executed_quantity: get("p_EXSR"),
        executed_time: get("p_EXDT"),
        order_status: get("p_ODST"),
        fields,
        frame,
    }
}

fn parse_ns(frame: Frame) -> Ns {
    let fields = first_values(&frame);
    let get = |key: &str| fields.value(key).to_string();
    let count = |key: &str| parse_i64_or_zero(fields.value(key));

    Ns {
        header: NoticeHeader::from_attributes(&fields),
        news_id: get("p_ID"),
        news_date: get("p_DT"),
        news_time: get("p_TM"),
        category_count: count("p_CGN"),
        categories: frame.values("p_CGL"),
        genre_count: count("p_GRN"),
        genres: frame.values("p_GRL"),
        issue_count: count("p_ISN"),
        issues: frame.values("p_ISL"),
        skip_flag: get("p_SKF"),
        update_flag: get("p_UPD"),
        headline: get("p_HDL"),
        body: get("p_TX"),
        fields,
        frame,
    }
}

fn parse_ss(frame: Frame) -> Ss {
    let fields = first_values(&frame);
    let get = |key: &str| fields.value(key).to_string();

    Ss {
        header: NoticeHeader::from_attributes(&fields),
        changed_at: get("p_CT"),
        login_kind: get("p_LK"),
        system_status: get("p_SS"),
        fields,
        frame,
    }
}

fn parse_us(frame: Frame) -> Us {
    let fields = first_values(&frame);
    let get = |key: &str| fields.value(key).to_string();

    Us {
        header: NoticeHeader::from_attributes(&fields),
        changed_at: get("p_CT"),
        market_code: get("p_MC"),
        underlying_code: get("p_GSCD"),
        instrument_kind: get("p_SHSB"),
        operation_code: get("p_UC"),
        operation_unit: get("p_UU"),
        business_day_kind: get("p_EDK"),
        operation_status: get("p_US"),
        fields,
        frame,
    }
}
