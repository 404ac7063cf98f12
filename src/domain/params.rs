//! Subscription Parameters - Board Topology Validation and URL Building
//!
//! A subscription selects a board topology (`p_rid`), a board number,
//! the rows to watch, the (issue, market) pairs bound to those rows, a
//! resume position and the command set. Parameters are normalized, then
//! checked against the per-mode arity table before the endpoint URL is
//! assembled.

use url::Url;
use url::form_urlencoded::byte_serialize;

use super::command::{Command, DEFAULT_COMMANDS};
use crate::error::{EventError, EventResult};

/// Board number for the default topology and mode 22.
pub const DEFAULT_BOARD_NO: i32 = 1000;
/// Mode assumed when rows or codes are given without one.
pub const DEFAULT_RID: i32 = 22;
/// Max symbols per subscription.
pub const MAX_SYMBOLS: usize = 120;
/// Max rows (and max row number) for large boards.
pub const MAX_ROWS: i32 = 120;
/// Max rows (and max row number) for small boards.
pub const MAX_ROWS_SMALL: i32 = 20;

/// Query keys whose comma-joined values must keep literal commas.
const COMMA_KEYS: [&str; 4] = ["p_evt_cmd", "p_issue_code", "p_gyou_no", "p_mkt_code"];

/// Event subscription request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionParams {
    /// Board topology (`p_rid`).
    pub rid: i32,
    /// Board number (`p_board_no`).
    pub board_no: i32,
    /// Row numbers (`p_gyou_no`).
    pub rows: Vec<i32>,
    /// Issue codes (`p_issue_code`).
    pub issue_codes: Vec<String>,
    /// Market codes (`p_mkt_code`).
    pub market_codes: Vec<String>,
    /// Resume from this notice number (`p_eno`), 0 for live only.
    pub eno: i64,
    /// Requested commands (`p_evt_cmd`).
    pub commands: Vec<Command>,
}

impl SubscriptionParams {
    /// Status-only subscription with the default command set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Board quotes for `(issue, market)` pairs on rows 1..=n (mode 22).
    pub fn board<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let (issue_codes, market_codes): (Vec<String>, Vec<String>) = symbols
            .into_iter()
            .map(|(issue, market)| (issue.into(), market.into()))
            .unzip();
        let rows = (1..=i32::try_from(issue_codes.len()).unwrap_or(i32::MAX)).collect();
        Self {
            rid: DEFAULT_RID,
            board_no: DEFAULT_BOARD_NO,
            rows,
            issue_codes,
            market_codes,
            eno: 0,
            commands: vec![Command::Fd, Command::St, Command::Kp],
        }
    }

    /// Replace the command set from raw tags.
    #[must_use]
    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.commands = commands
            .into_iter()
            .filter_map(|c| Command::parse(c.as_ref()))
            .collect();
        self
    }

    /// Set the resume position.
    #[must_use]
    pub const fn with_eno(mut self, eno: i64) -> Self {
        self.eno = eno;
        self
    }

    /// Apply defaults and drop blank or non-positive entries.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();

        out.commands = normalize_commands(&out.commands);
        if out.commands.is_empty() {
            out.commands = DEFAULT_COMMANDS.to_vec();
        }
        out.rows.retain(|row| *row > 0);
        out.issue_codes = normalize_codes(&out.issue_codes);
        out.market_codes = normalize_codes(&out.market_codes);

        let has_targets =
            !out.rows.is_empty() || !out.issue_codes.is_empty() || !out.market_codes.is_empty();
        if out.rid == 0 && has_targets {
            out.rid = DEFAULT_RID;
        }
        if out.rid == 0 && out.board_no == 0 {
            out.board_no = DEFAULT_BOARD_NO;
        }
        out
    }

    /// Normalize, then check the mode arity rules.
    ///
    /// # Errors
    /// `Validation` naming the first offending parameter.
    pub fn validate(&self) -> EventResult<()> {
        validate_normalized(&self.normalized())
    }

    /// Whether the command set (after normalization) includes `command`.
    pub fn wants(&self, command: &Command) -> bool {
        self.normalized().commands.contains(command)
    }
}

fn normalize_commands(commands: &[Command]) -> Vec<Command> {
    let mut out: Vec<Command> = Vec::with_capacity(commands.len());
    for command in commands.iter().filter_map(|c| Command::parse(c.as_str())) {
        if !out.contains(&command) {
            out.push(command);
        }
    }
    out
}

fn normalize_codes(codes: &[String]) -> Vec<String> {
    codes
        .iter()
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_normalized(p: &SubscriptionParams) -> EventResult<()> {
    if p.eno < 0 {
        return Err(EventError::validation("eno", "must be >= 0"));
    }
    validate_commands(&p.commands)?;
    validate_board(p)
}

fn validate_commands(commands: &[Command]) -> EventResult<()> {
    if commands.is_empty() {
        return Err(EventError::validation("evt_cmd", "required"));
    }
    if commands.iter().any(|c| !c.is_allowed()) {
        return Err(EventError::validation("evt_cmd", "unsupported"));
    }
    Ok(())
}

fn validate_board(p: &SubscriptionParams) -> EventResult<()> {
    if p.rid == 0 && p.commands.contains(&Command::Fd) {
        return Err(EventError::validation("rid", "fd requires price board"));
    }

    let has_rows = !p.rows.is_empty();
    let has_codes = !p.issue_codes.is_empty() || !p.market_codes.is_empty();

    match p.rid {
        0 => {
            if p.board_no != DEFAULT_BOARD_NO {
                return Err(EventError::validation("board_no", "must be 1000 for rid=0"));
            }
            if has_rows || has_codes {
                return Err(EventError::validation("board_no", "rows/codes not allowed for rid=0"));
            }
        }
        10 | 11 => {
            if !(1..=10).contains(&p.board_no) {
                return Err(EventError::validation("board_no", "must be 1-10"));
            }
            if has_rows || has_codes {
                return Err(EventError::validation("gyou_no", "rows/codes not allowed"));
            }
        }
        12 => {
            if p.board_no != 120 {
                return Err(EventError::validation("board_no", "must be 120"));
            }
            if has_rows || has_codes {
                return Err(EventError::validation("gyou_no", "rows/codes not allowed"));
            }
        }
        13 => {
            if p.board_no != 20 && p.board_no != 30 {
                return Err(EventError::validation("board_no", "must be 20 or 30"));
            }
            validate_rows(&p.rows, MAX_ROWS)?;
            validate_symbols(&p.issue_codes, &p.market_codes, p.rows.len())?;
        }
        20 => {
            if !(1..=10).contains(&p.board_no) {
                return Err(EventError::validation("board_no", "must be 1-10"));
            }
            validate_rows(&p.rows, MAX_ROWS_SMALL)?;
            if has_codes {
                return Err(EventError::validation("issue_code", "not allowed for rid=20"));
            }
        }
        21 => {
            if p.board_no != 0 {
                return Err(EventError::validation("board_no", "must be 0"));
            }
            if p.rows.len() != 1 {
                return Err(EventError::validation("gyou_no", "must be a single row"));
            }
            validate_rows(&p.rows, MAX_ROWS_SMALL)?;
            if p.issue_codes.len() != 1 || p.market_codes.len() != 1 {
                return Err(EventError::validation("issue_code", "must be 1"));
            }
        }
        22 => {
            if p.board_no != DEFAULT_BOARD_NO {
                return Err(EventError::validation("board_no", "must be 1000 for rid=22"));
            }
            validate_rows(&p.rows, MAX_ROWS)?;
            validate_symbols(&p.issue_codes, &p.market_codes, p.rows.len())?;
        }
        _ => return Err(EventError::validation("rid", "unsupported")),
    }

    Ok(())
}

/// Rows must be present, at most `max` of them, each in `1..=max`.
fn validate_rows(rows: &[i32], max: i32) -> EventResult<()> {
    if rows.is_empty() {
        return Err(EventError::validation("gyou_no", "required"));
    }
    if rows.len() > usize::try_from(max).unwrap_or(usize::MAX) {
        return Err(EventError::validation("gyou_no", format!("max {max}")));
    }
    if rows.iter().any(|row| !(1..=max).contains(row)) {
        return Err(EventError::validation("gyou_no", "out of range"));
    }
    Ok(())
}

fn validate_symbols(issues: &[String], markets: &[String], rows: usize) -> EventResult<()> {
    if issues.is_empty() {
        return Err(EventError::validation("issue_code", "required"));
    }
    if issues.len() > MAX_SYMBOLS {
        return Err(EventError::validation("issue_code", "max 120"));
    }
    if markets.is_empty() {
        return Err(EventError::validation("mkt_code", "required"));
    }
    if markets.len() > MAX_SYMBOLS {
        return Err(EventError::validation("mkt_code", "max 120"));
    }
    if issues.len() != markets.len() {
        return Err(EventError::validation("mkt_code", "count mismatch"));
    }
    if rows > 0 && issues.len() != rows {
        return Err(EventError::validation("issue_code", "count mismatch"));
    }
    Ok(())
}

/// Build the streaming endpoint URL for `params` on top of `base`.
///
/// Any query already on `base` is replaced. Blank parameters are
/// omitted; commas inside the list parameters stay literal.
///
/// # Errors
/// - `EmptyBaseUrl` / `InvalidUrl` for a bad base.
/// - `Validation` when the parameters fail [`SubscriptionParams::validate`].
pub fn build_ws_url(base: &str, params: &SubscriptionParams) -> EventResult<String> {
    if base.trim().is_empty() {
        return Err(EventError::EmptyBaseUrl);
    }
    let p = params.normalized();
    validate_normalized(&p)?;

    let mut url = Url::parse(base.trim()).map_err(|e| EventError::InvalidUrl(e.to_string()))?;

    let mut query: Vec<String> = Vec::with_capacity(7);
    let mut add = |key: &str, value: String| {
        if value.trim().is_empty() {
            return;
        }
        let mut encoded: String = byte_serialize(value.as_bytes()).collect();
        if COMMA_KEYS.contains(&key) {
            encoded = encoded.replace("%2C", ",");
        }
        query.push(format!("{key}={encoded}"));
    };

    add("p_rid", p.rid.to_string());
    add("p_board_no", p.board_no.to_string());
    add("p_gyou_no", join(&p.rows));
    add("p_issue_code", p.issue_codes.join(","));
    add("p_mkt_code", p.market_codes.join(","));
    add("p_eno", p.eno.to_string());
    add("p_evt_cmd", join(&p.commands));

    url.set_query(Some(&query.join("&")));
    Ok(url.to_string())
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
