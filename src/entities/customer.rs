use serde::{Deserialize, Serialize};

/// A billable customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    /// Trading name printed on the invoice.
    pub name: String,
    /// Attention line ("t.a.v."), the person the invoice is addressed to.
    pub attention_of: String,
    pub street: String,
    pub house_number: String,
    pub postal_code: String,
    pub city: String,
}
