//! Quotes and product costing.
//!
//! All money is integer cents. Markup is applied per unit and rounded once,
//! so a quoted line extends exactly (units × rounded sell price) and the
//! totals a customer checks by hand come out right.

use std::fmt;

use chrono::NaiveDate;

use crate::entity::RecordId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: RecordId,
    pub site: RecordId,
    /// Customer-facing reference, e.g. "Q-2026-0142".
    pub reference: String,
    pub created: NaiveDate,
    #[serde(default)]
    pub lines: Vec<QuoteLine>,
    pub status: QuoteStatus,
}

impl Quote {
    pub fn new(site: RecordId, reference: impl Into<String>, created: NaiveDate) -> Quote {
        Quote {
            id: RecordId::generate("quote"),
            site,
            reference: reference.into(),
            created,
            lines: Vec::new(),
            status: QuoteStatus::Draft,
        }
    }

    pub fn subtotal_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.total_cents()).sum()
    }

    pub fn tax_cents(&self, tax_percent: f64) -> i64 {
        round_cents(self.subtotal_cents() as f64 * tax_percent / 100.0)
    }

    pub fn total_cents(&self, tax_percent: f64) -> i64 {
        self.subtotal_cents() + self.tax_cents(tax_percent)
    }

    /// A draft can be sent; a sent quote can be accepted or declined.
    pub fn advance_to(&mut self, next: QuoteStatus) -> bool {
        let legal = matches!(
            (self.status, next),
            (QuoteStatus::Draft, QuoteStatus::Sent)
                | (QuoteStatus::Sent, QuoteStatus::Accepted)
                | (QuoteStatus::Sent, QuoteStatus::Declined)
        );
        if legal {
            self.status = next;
        }
        legal
    }
}

/// One costed product line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub description: String,
    pub quantity: u32,
    pub unit_cost_cents: i64,
    pub markup_percent: f64,
}

impl QuoteLine {
    pub fn new(description: impl Into<String>, quantity: u32, unit_cost_cents: i64) -> QuoteLine {
        QuoteLine {
            description: description.into(),
            quantity,
            unit_cost_cents,
            markup_percent: 0.0,
        }
    }

    /// Per-unit sell price after markup.
    pub fn sell_unit_cents(&self) -> i64 {
        round_cents(self.unit_cost_cents as f64 * (1.0 + self.markup_percent / 100.0))
    }

    pub fn total_cents(&self) -> i64 {
        self.sell_unit_cents() * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Declined,
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Declined => "declined",
        };
        f.write_str(s)
    }
}

fn round_cents(value: f64) -> i64 {
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> Quote {
        Quote::new(
            RecordId::new("site-a"),
            "Q-2026-0001",
            NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
        )
    }

    #[test]
    fn markup_rounds_once_per_unit() {
        let mut line = QuoteLine::new("1050 belt, per metre", 3, 12_345);
        line.markup_percent = 35.0;
        // 12345 * 1.35 = 16665.75, rounds to 16666
        assert_eq!(line.sell_unit_cents(), 16_666);
        assert_eq!(line.total_cents(), 49_998);
    }

    #[test]
    fn zero_markup_passes_cost_through() {
        let line = QuoteLine::new("site labour, per hour", 8, 11_000);
        assert_eq!(line.sell_unit_cents(), 11_000);
        assert_eq!(line.total_cents(), 88_000);
    }

    #[test]
    fn totals_and_tax() {
        let mut q = quote();
        q.lines.push(QuoteLine::new("impact bed", 2, 48_000));
        let mut skirting = QuoteLine::new("skirting rubber", 10, 2_150);
        skirting.markup_percent = 20.0;
        q.lines.push(skirting);

        assert_eq!(q.subtotal_cents(), 96_000 + 25_800);
        assert_eq!(q.tax_cents(10.0), 12_180);
        assert_eq!(q.total_cents(10.0), 133_980);
    }

    #[test]
    fn status_workflow() {
        let mut q = quote();
        assert!(!q.advance_to(QuoteStatus::Accepted));
        assert!(q.advance_to(QuoteStatus::Sent));
        assert!(!q.advance_to(QuoteStatus::Draft));
        assert!(q.advance_to(QuoteStatus::Declined));
        assert_eq!(q.status, QuoteStatus::Declined);
        assert!(!q.advance_to(QuoteStatus::Accepted));
    }
}
