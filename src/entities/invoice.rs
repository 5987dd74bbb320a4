use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::entities::{Company, Customer, Product};
use crate::error::{StoreError, StoreResult};

/// Days of payment term added to the issue date when no explicit due date is
/// supplied.
const PAYMENT_TERM_DAYS: i64 = 30;

/// One (product, quantity, date) entry within an invoice. Lines are owned by
/// exactly one invoice and are unique per (invoice, product, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product: Product,
    pub quantity: u32,
    /// Delivery date, ISO-8601 (`YYYY-MM-DD`).
    pub date: String,
}

/// The invoice aggregate: header fields plus its full set of lines.
///
/// Derived fields (due date and the three monetary totals) are frozen at
/// construction time via [`InvoiceDraft::finalize`]; nothing recomputes them
/// afterwards, not even the stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Externally assigned invoice number; the primary key.
    pub number: String,
    pub customer: Customer,
    pub company: Company,
    /// Issue date, ISO-8601.
    pub issue_date: String,
    /// Due date, ISO-8601. Derived as issue date + 30 days when not supplied.
    pub due_date: String,
    /// Lines in insertion order.
    pub lines: Vec<InvoiceLine>,
    /// Sum of unit price x quantity over all lines.
    pub subtotal_excl: f64,
    /// Tax over all lines, rounded to 2 decimals after summation.
    pub tax_amount: f64,
    /// Subtotal plus tax.
    pub total_incl: f64,
    pub paid: bool,
    /// Rendered PDF document; absent until generated.
    pub pdf: Option<Vec<u8>>,
}

/// Invoice factory input: the caller-supplied fields, with every derived
/// field optional. [`finalize`](InvoiceDraft::finalize) computes each absent
/// derived field independently; an explicitly supplied value is kept as-is
/// and never forces recomputation of the others.
#[derive(Debug, Clone, Default)]
pub struct InvoiceDraft {
    pub number: String,
    pub customer: Option<Customer>,
    pub company: Option<Company>,
    pub issue_date: String,
    pub lines: Vec<InvoiceLine>,
    pub paid: bool,
    pub due_date: Option<String>,
    pub subtotal_excl: Option<f64>,
    pub tax_amount: Option<f64>,
    pub total_incl: Option<f64>,
    pub pdf: Option<Vec<u8>>,
}

impl InvoiceDraft {
    /// Draft with only the required fields; all derived fields left for
    /// `finalize` to compute.
    pub fn new(
        number: impl Into<String>,
        customer: Customer,
        company: Company,
        issue_date: impl Into<String>,
        lines: Vec<InvoiceLine>,
    ) -> Self {
        InvoiceDraft {
            number: number.into(),
            customer: Some(customer),
            company: Some(company),
            issue_date: issue_date.into(),
            lines,
            ..Default::default()
        }
    }

    /// Computes the absent derived fields and produces the finished
    /// aggregate. Runs before any store interaction; malformed input is a
    /// [`StoreError::Validation`].
    pub fn finalize(self) -> StoreResult<Invoice> {
        let customer = self
            .customer
            .ok_or_else(|| StoreError::validation("invoice requires a customer"))?;
        let company = self
            .company
            .ok_or_else(|| StoreError::validation("invoice requires a company"))?;

        if let Some(line) = self.lines.iter().find(|l| l.quantity == 0) {
            return Err(StoreError::validation(format!(
                "invoice line for product {} has zero quantity",
                line.product.id
            )));
        }

        let due_date = match self.due_date {
            Some(d) => d,
            None => due_date_from(&self.issue_date)?,
        };
        let subtotal_excl = self.subtotal_excl.unwrap_or_else(|| subtotal(&self.lines));
        let tax_amount = self.tax_amount.unwrap_or_else(|| tax(&self.lines));
        let total_incl = self.total_incl.unwrap_or(subtotal_excl + tax_amount);

        Ok(Invoice {
            number: self.number,
            customer,
            company,
            issue_date: self.issue_date,
            due_date,
            lines: self.lines,
            subtotal_excl,
            tax_amount,
            total_incl,
            paid: self.paid,
            pdf: self.pdf,
        })
    }
}

/// Issue date plus the standard payment term, both as ISO-8601 strings.
pub fn due_date_from(issue_date: &str) -> StoreResult<String> {
    let issued = NaiveDate::parse_from_str(issue_date, "%Y-%m-%d").map_err(|e| {
        StoreError::validation(format!("invalid issue date {issue_date:?}: {e}"))
    })?;
    let due = issued + Duration::days(PAYMENT_TERM_DAYS);
    Ok(due.format("%Y-%m-%d").to_string())
}

/// Sum of unit price x quantity over all lines. Empty lines yield 0.
pub fn subtotal(lines: &[InvoiceLine]) -> f64 {
    lines
        .iter()
        .map(|l| l.product.unit_price * f64::from(l.quantity))
        .sum()
}

/// Tax amount over all lines, rounded to 2 decimals after summation.
pub fn tax(lines: &[InvoiceLine]) -> f64 {
    let raw: f64 = lines
        .iter()
        .map(|l| l.product.unit_price * f64::from(l.quantity) * l.product.tax_rate / 100.0)
        .sum();
    round2(raw)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
