//! Incremental quote board built from FD updates.

use std::collections::BTreeMap;

use serde::Serialize;

use super::attributes::Attributes;
use super::event::Fd;
use super::quote::Quote;

/// A quote paired with its board row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteRow {
    pub row: i64,
    pub quote: Quote,
}

/// Latest merged field set per board row.
///
/// FD updates are partial: a field omitted by a newer update keeps its
/// previous value.
#[derive(Debug, Clone, Default)]
pub struct QuoteBook {
    rows: BTreeMap<i64, Attributes>,
}

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every row of `update` and return the resulting quotes in
    /// row order.
    pub fn apply(&mut self, update: &Fd) -> Vec<Quote> {
        update
            .rows
            .iter()
            .map(|fd_row| {
                let merged = self.rows.entry(fd_row.row).or_default();
                merged.merge(&fd_row.fields);
                Quote::new(merged.clone())
            })
            .collect()
    }

    /// All rows ascending.
    pub fn snapshot(&self) -> Vec<Quote> {
        self.rows
            .values()
            .map(|fields| Quote::new(fields.clone()))
            .collect()
    }

    /// All rows ascending, with row numbers.
    pub fn snapshot_rows(&self) -> Vec<QuoteRow> {
        self.rows
            .iter()
            .map(|(row, fields)| QuoteRow {
                row: *row,
                quote: Quote::new(fields.clone()),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decoder::decode_event;
    use crate::domain::event::Event;

    fn fd(raw: &str) -> Fd {
        match decode_event(raw.as_bytes()).unwrap() {
            Event::Fd(fd) => fd,
            other => panic!("expected FD, got {other:?}"),
        }
    }

    #[test]
    fn partial_updates_merge() {
        let mut book = QuoteBook::new();
        book.apply(&fd(
            "p_cmd\x02FD\x01p_no\x021\x01p_date\x02d\x01p_1_DPP\x02100\x01t_1_DPP:T\x0210:00",
        ));
        let quotes = book.apply(&fd("p_cmd\x02FD\x01p_no\x022\x01p_date\x02d\x01p_1_DV\x02200"));

        assert_eq!(quotes.len(), 1);
        let snap = book.snapshot();
        assert_eq!(snap.len(), 1);
        let q = &snap[0];
        assert_eq!(q.value("pDPP"), "100");
        assert_eq!(q.value("tDPP:T"), "10:00");
        assert_eq!(q.value("pDV"), "200");
        assert_eq!(quotes[0], *q);
    }

    #[test]
    fn newer_values_overwrite() {
        let mut book = QuoteBook::new();
        book.apply(&fd("p_cmd\x02FD\x01p_2_DPP\x02100\x01p_1_DPP\x0290"));
        book.apply(&fd("p_cmd\x02FD\x01p_2_DPP\x02101"));

        let rows = book.snapshot_rows();
        assert_eq!(rows.iter().map(|r| r.row).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(rows[1].quote.value("pDPP"), "101");
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn snapshot_is_an_independent_copy() {
        let mut book = QuoteBook::new();
        book.apply(&fd("p_cmd\x02FD\x01p_1_DPP\x02100"));
        let mut snap = book.snapshot();
        snap[0].fields.insert("pDPP", "999");
        assert_eq!(book.snapshot()[0].value("pDPP"), "100");

        book.clear();
        assert!(book.is_empty());
    }
}
