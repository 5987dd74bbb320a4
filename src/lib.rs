// Invoice Store - Core Library
//
// Invoicing records (products, customers, companies, invoices) over SQLite,
// plus a fixed-layout PDF renderer for finalized invoices. The caller opens
// the rusqlite connection and hands it to the stores; both stores borrow the
// same connection so entity lookups and invoice writes see one database.

pub mod entities;
pub mod entity_store;
pub mod error;
pub mod invoice_store;
pub mod render;
pub mod repository;
pub mod schema;

// Re-export commonly used types
pub use entities::{Company, Customer, Invoice, InvoiceDraft, InvoiceLine, Product};
pub use entity_store::{Entity, EntityStore};
pub use error::{RenderError, StoreError, StoreResult};
pub use invoice_store::InvoiceStore;
pub use render::{render, render_bytes};
pub use repository::Repository;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
