//! Quote snapshots and board field keys.
//!
//! A quote is the merged field set of one board row. Field names are the
//! FD row names after prefix/suffix reconstruction (`pDPP`, `tDPP:T`, ...).

use serde::Serialize;

use super::attributes::Attributes;

/// Integer price in yen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Price(pub i64);

/// Integer share count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Quantity(pub i64);

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Board field keys.
pub const FIELD_LAST_PRICE: &str = "pDPP";
pub const FIELD_LAST_TIME: &str = "tDPP:T";
pub const FIELD_PREV_CLOSE: &str = "pPRP";
pub const FIELD_OPEN_PRICE: &str = "pDOP";
pub const FIELD_OPEN_TIME: &str = "tDOP:T";
pub const FIELD_HIGH_PRICE: &str = "pDHP";
pub const FIELD_HIGH_TIME: &str = "tDHP:T";
pub const FIELD_LOW_PRICE: &str = "pDLP";
pub const FIELD_LOW_TIME: &str = "tDLP:T";
pub const FIELD_VOLUME: &str = "pDV";
pub const FIELD_TURNOVER: &str = "pDJ";
pub const FIELD_CHANGE: &str = "pDYWP";
pub const FIELD_CHANGE_RATE: &str = "pDYRP";
pub const FIELD_VWAP: &str = "pVWAP";
pub const FIELD_PREV_COMPARE: &str = "pDPG";
pub const FIELD_ASK_PRICE: &str = "pQAP";
pub const FIELD_ASK_SIZE: &str = "pAV";
pub const FIELD_ASK_TYPE: &str = "pQAS";
pub const FIELD_BID_PRICE: &str = "pQBP";
pub const FIELD_BID_SIZE: &str = "pBV";
pub const FIELD_BID_TYPE: &str = "pQBS";
pub const FIELD_MARKET_ASK_SIZE: &str = "pAAV";
pub const FIELD_MARKET_BID_SIZE: &str = "pABV";

/// Depth level prefixes; the level number (1..=10) is appended.
pub const PREFIX_ASK_PRICE: &str = "pGAP";
pub const PREFIX_ASK_SIZE: &str = "pGAV";
pub const PREFIX_BID_PRICE: &str = "pGBP";
pub const PREFIX_BID_SIZE: &str = "pGBV";

/// Deepest level the board publishes.
pub const MAX_DEPTH: usize = 10;

/// One price level of the order book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BookLevel {
    pub price: Price,
    pub quantity: Quantity,
}

impl BookLevel {
    /// True when the level carries neither price nor size.
    pub const fn is_zero(&self) -> bool {
        self.price.0 == 0 && self.quantity.0 == 0
    }
}

/// Side of the depth ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
    Ask,
    Bid,
}

impl BookSide {
    /// Price and size key prefixes for this side.
    pub const fn prefixes(self) -> (&'static str, &'static str) {
        match self {
            Self::Ask => (PREFIX_ASK_PRICE, PREFIX_ASK_SIZE),
            Self::Bid => (PREFIX_BID_PRICE, PREFIX_BID_SIZE),
        }
    }
}

/// Field snapshot for one symbol / board row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Issue code, when the row could be labelled.
    pub symbol: String,
    /// Merged row fields.
    pub fields: Attributes,
}

impl Quote {
    /// Wrap a field set without a symbol.
    pub fn new(fields: Attributes) -> Self {
        Self {
            symbol: String::new(),
            fields,
        }
    }

    pub fn value(&self, key: &str) -> &str {
        self.fields.value(key)
    }

    pub fn price(&self, key: &str) -> Option<Price> {
        self.fields.int64(key).map(Price)
    }

    pub fn quantity(&self, key: &str) -> Option<Quantity> {
        self.fields.int64(key).map(Quantity)
    }

    pub fn last_price(&self) -> Option<Price> {
        self.price(FIELD_LAST_PRICE)
    }

    pub fn last_time(&self) -> &str {
        self.value(FIELD_LAST_TIME)
    }

    pub fn prev_close(&self) -> Option<Price> {
        self.price(FIELD_PREV_CLOSE)
    }

    pub fn open_price(&self) -> Option<Price> {
        self.price(FIELD_OPEN_PRICE)
    }

    pub fn open_time(&self) -> &str {
        self.value(FIELD_OPEN_TIME)
    }

    pub fn high_price(&self) -> Option<Price> {
        self.price(FIELD_HIGH_PRICE)
    }

    pub fn high_time(&self) -> &str {
        self.value(FIELD_HIGH_TIME)
    }

    pub fn low_price(&self) -> Option<Price> {
        self.price(FIELD_LOW_PRICE)
    }

    pub fn low_time(&self) -> &str {
        self.value(FIELD_LOW_TIME)
    }

    pub fn volume(&self) -> Option<Quantity> {
        self.quantity(FIELD_VOLUME)
    }

    pub fn turnover(&self) -> Option<i64> {
        self.fields.int64(FIELD_TURNOVER)
    }

    pub fn change(&self) -> Option<Price> {
        self.price(FIELD_CHANGE)
    }

    pub fn change_rate(&self) -> Option<f64> {
        self.fields.float64(FIELD_CHANGE_RATE)
    }

    pub fn vwap(&self) -> Option<Price> {
        self.price(FIELD_VWAP)
    }

    pub fn prev_compare(&self) -> &str {
        self.value(FIELD_PREV_COMPARE)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.price(FIELD_ASK_PRICE)
    }

    pub fn best_ask_size(&self) -> Option<Quantity> {
        self.quantity(FIELD_ASK_SIZE)
    }

    pub fn best_ask_type(&self) -> &str {
        self.value(FIELD_ASK_TYPE)
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.price(FIELD_BID_PRICE)
    }

    pub fn best_bid_size(&self) -> Option<Quantity> {
        self.quantity(FIELD_BID_SIZE)
    }

    pub fn best_bid_type(&self) -> &str {
        self.value(FIELD_BID_TYPE)
    }

    pub fn market_ask_size(&self) -> Option<Quantity> {
        self.quantity(FIELD_MARKET_ASK_SIZE)
    }

    pub fn market_bid_size(&self) -> Option<Quantity> {
        self.quantity(FIELD_MARKET_BID_SIZE)
    }

    /// Depth ladder for one side, `levels` deep (capped at 10).
    ///
    /// Missing levels come back as zero levels so indices stay aligned
    /// with level numbers.
    pub fn depth(&self, side: BookSide, levels: usize) -> Vec<BookLevel> {
        let (price_prefix, size_prefix) = side.prefixes();
        (1..=levels.min(MAX_DEPTH))
            .map(|level| BookLevel {
                price: self
                    .price(&format!("{price_prefix}{level}"))
                    .unwrap_or_default(),
                quantity: self
                    .quantity(&format!("{size_prefix}{level}"))
                    .unwrap_or_default(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(pairs: &[(&str, &str)]) -> Quote {
        Quote::new(pairs.iter().copied().collect())
    }

    #[test]
    fn typed_accessors() {
        let q = quote(&[
            ("pDPP", "6129"),
            ("tDPP:T", "14:10"),
            ("pDV", "120000"),
            ("pDYRP", "0.85"),
        ]);
        assert_eq!(q.last_price(), Some(Price(6129)));
        assert_eq!(q.last_time(), "14:10");
        assert_eq!(q.volume(), Some(Quantity(120_000)));
        assert_eq!(q.change_rate(), Some(0.85));
        assert_eq!(q.best_bid(), None);
    }

    #[test]
    fn depth_fills_missing_levels_with_zero() {
        let q = quote(&[("pGAP1", "101"), ("pGAV1", "300"), ("pGAP3", "103")]);
        let asks = q.depth(BookSide::Ask, 3);
        assert_eq!(asks.len(), 3);
        assert_eq!(asks[0], BookLevel { price: Price(101), quantity: Quantity(300) });
        assert!(asks[1].is_zero());
        assert_eq!(asks[2].price, Price(103));
        assert_eq!(q.depth(BookSide::Bid, 50).len(), MAX_DEPTH);
    }

    #[test]
    fn book_level_zero() {
        assert!(BookLevel::default().is_zero());
        assert!(!BookLevel { price: Price(100), quantity: Quantity(0) }.is_zero());
        assert!(!BookLevel { price: Price(0), quantity: Quantity(10) }.is_zero());
    }
}
