//! Text rendering of the quote board.

use std::collections::BTreeMap;

use crate::domain::quote::{BookSide, MAX_DEPTH, Quote};
use crate::domain::quote_book::QuoteRow;

/// Row number to issue code.
pub type SymbolMap = BTreeMap<i64, String>;

/// Render rows as `<label> last=<p> time=<t>` headers followed by ask
/// and bid ladders, `levels` deep.
pub fn render_board(rows: &[QuoteRow], symbols: &SymbolMap, levels: usize) -> Vec<String> {
    if rows.is_empty() {
        return vec!["board: (no data)".to_string()];
    }
    let levels = levels.min(MAX_DEPTH);
    let mut lines = Vec::with_capacity(rows.len() * 3);
    for row in rows {
        let last = row
            .quote
            .last_price()
            .map(|p| p.to_string())
            .unwrap_or_default();
        lines.push(format!(
            "{} last={last} time={}",
            row_label(row.row, symbols),
            row.quote.last_time()
        ));
        lines.push(format!("  ask {}", format_levels(&row.quote, BookSide::Ask, levels)));
        lines.push(format!("  bid {}", format_levels(&row.quote, BookSide::Bid, levels)));
    }
    lines
}

/// `price(size)` per level; `-` for a missing level or half.
fn format_levels(quote: &Quote, side: BookSide, levels: usize) -> String {
    let (price_prefix, size_prefix) = side.prefixes();
    (1..=levels)
        .map(|level| {
            let price = quote.value(&format!("{price_prefix}{level}"));
            let size = quote.value(&format!("{size_prefix}{level}"));
            if price.is_empty() && size.is_empty() {
                return "-".to_string();
            }
            let price = if price.is_empty() { "-" } else { price };
            let size = if size.is_empty() { "-" } else { size };
            format!("{price}({size})")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn row_label(row: i64, symbols: &SymbolMap) -> String {
    symbols
        .get(&row)
        .map(|symbol| symbol.trim())
        .filter(|symbol| row != 0 && !symbol.is_empty())
        .map_or_else(|| format!("row={row}"), str::to_string)
}

/// Pair rows with codes positionally; fall back to rows 1..=n when the
/// lengths differ.
pub fn build_symbol_map(rows: &[i32], codes: &[String]) -> SymbolMap {
    if !rows.is_empty() && rows.len() == codes.len() {
        return rows
            .iter()
            .zip(codes)
            .map(|(row, code)| (i64::from(*row), code.clone()))
            .collect();
    }
    (1_i64..).zip(codes.iter().cloned()).collect()
}
