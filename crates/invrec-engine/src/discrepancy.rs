//! Discrepancy Calculator.

use invrec_records::ValidationKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Written to field 7 of every emitted stock line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indicator {
    Unchanged,
    Adjusted,
}

impl Indicator {
    pub fn code(&self) -> u8 {
        match self {
            Indicator::Unchanged => 1,
            Indicator::Adjusted => 2,
        }
    }

    pub fn as_field(&self) -> &'static str {
        match self {
            Indicator::Unchanged => "1",
            Indicator::Adjusted => "2",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscrepancyKind {
    /// Counted equals a positive theoretical quantity.
    Match,
    /// Positive theoretical quantity, different count.
    Correction,
    /// Nothing expected, something counted. Needs a lot to land on.
    SurplusOnEmpty,
    /// Nothing expected, nothing counted.
    Inert,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Discrepancy {
    pub adjusted: Decimal,
    /// `counted - theoretical`.
    pub delta: Decimal,
    pub indicator: Indicator,
    pub kind: DiscrepancyKind,
}

impl Discrepancy {
    pub fn needs_lot_synthesis(&self) -> bool {
        self.kind == DiscrepancyKind::SurplusOnEmpty
    }
}

pub fn compute(theoretical: Decimal, counted: Decimal) -> Result<Discrepancy, ValidationKind> {
    if theoretical < Decimal::ZERO {
        return Err(ValidationKind::NegativeQuantity {
            field: "theoretical",
            value: theoretical,
        });
    }
    if counted < Decimal::ZERO {
        return Err(ValidationKind::NegativeQuantity {
            field: "counted",
            value: counted,
        });
    }

    let delta = counted - theoretical;
    let (indicator, kind) = if theoretical.is_zero() && counted.is_zero() {
        (Indicator::Unchanged, DiscrepancyKind::Inert)
    } else if delta.is_zero() {
        (Indicator::Unchanged, DiscrepancyKind::Match)
    } else if theoretical.is_zero() {
        (Indicator::Adjusted, DiscrepancyKind::SurplusOnEmpty)
    } else {
        (Indicator::Adjusted, DiscrepancyKind::Correction)
    };

    Ok(Discrepancy {
        adjusted: if delta.is_zero() { theoretical } else { counted },
        delta,
        indicator,
        kind,
    })
}
