use serde::{Deserialize, Serialize};

/// The issuing company, including the registration and banking details the
/// rendered invoice must carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub street: String,
    pub house_number: String,
    pub postal_code: String,
    pub city: String,
    /// Chamber-of-commerce registration number (KVK).
    pub coc_number: String,
    pub vat_number: String,
    pub bank: String,
    pub iban: String,
    pub bic: String,
    pub phone: String,
    pub email: String,
    /// Logo image bytes; absent until uploaded. The PDF renderer requires it.
    pub logo: Option<Vec<u8>>,
}
