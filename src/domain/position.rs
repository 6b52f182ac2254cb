//! Open positions and the fields an expression can read from them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

/// One open (or historically opened) position, owned by the node that opened
/// it. `vpi` is unique within the owning node's position set; each re-entry
/// appends a fresh entry with a new vpi.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub vpi: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub pnl: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Short
    }

    /// Signed quantity: negative for shorts.
    pub fn signed_quantity(&self) -> f64 {
        match self.side {
            Side::Long => self.quantity,
            Side::Short => -self.quantity,
        }
    }

    /// Mark the position against a new price, recomputing pnl.
    pub fn mark(&mut self, price: f64) {
        self.current_price = price;
        self.pnl = self.signed_quantity() * (price - self.entry_price);
    }
}

/// Field selector carried by a `position_data` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionField {
    Pnl,
    Quantity,
    EntryPrice,
    CurrentPrice,
}

impl PositionField {
    pub fn extract(&self, position: &Position) -> f64 {
        match self {
            PositionField::Pnl => position.pnl,
            PositionField::Quantity => position.quantity,
            PositionField::EntryPrice => position.entry_price,
            PositionField::CurrentPrice => position.current_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_long() -> Position {
        Position {
            vpi: "p1".into(),
            symbol: "NIFTY".into(),
            side: Side::Long,
            quantity: 50.0,
            entry_price: 100.0,
            current_price: 102.0,
            pnl: 100.0,
        }
    }

    fn sample_short() -> Position {
        Position {
            vpi: "p2".into(),
            symbol: "NIFTY".into(),
            side: Side::Short,
            quantity: 50.0,
            entry_price: 100.0,
            current_price: 98.0,
            pnl: 100.0,
        }
    }

    #[test]
    fn side_predicates() {
        assert!(sample_long().is_long());
        assert!(!sample_long().is_short());
        assert!(sample_short().is_short());
    }

    #[test]
    fn signed_quantity_flips_for_shorts() {
        assert_relative_eq!(sample_long().signed_quantity(), 50.0);
        assert_relative_eq!(sample_short().signed_quantity(), -50.0);
    }

    #[test]
    fn mark_long_profit() {
        let mut pos = sample_long();
        pos.mark(105.0);
        assert_relative_eq!(pos.current_price, 105.0);
        assert_relative_eq!(pos.pnl, 250.0);
    }

    #[test]
    fn mark_short_profit() {
        let mut pos = sample_short();
        pos.mark(95.0);
        assert_relative_eq!(pos.pnl, 250.0);
    }

    #[test]
    fn mark_short_loss() {
        let mut pos = sample_short();
        pos.mark(104.0);
        assert_relative_eq!(pos.pnl, -200.0);
    }

    #[test]
    fn field_extraction() {
        let pos = sample_long();
        assert_relative_eq!(PositionField::Pnl.extract(&pos), 100.0);
        assert_relative_eq!(PositionField::Quantity.extract(&pos), 50.0);
        assert_relative_eq!(PositionField::EntryPrice.extract(&pos), 100.0);
        assert_relative_eq!(PositionField::CurrentPrice.extract(&pos), 102.0);
    }

    #[test]
    fn serde_field_tags() {
        let json = serde_json::to_string(&PositionField::EntryPrice).unwrap();
        assert_eq!(json, "\"entry_price\"");
        let side: Side = serde_json::from_str("\"short\"").unwrap();
        assert_eq!(side, Side::Short);
    }
}
