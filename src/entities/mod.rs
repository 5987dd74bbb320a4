// Entity Models
//
// Plain data records for the invoicing domain. Product, Customer and Company
// are reference data kept in single tables; Invoice is the aggregate that
// owns its lines. Equality is field-for-field (derived PartialEq), which is
// what the invoice store's referential checks compare against.

pub mod company;
pub mod customer;
pub mod invoice;
pub mod product;

pub use company::Company;
pub use customer::Customer;
pub use invoice::{Invoice, InvoiceDraft, InvoiceLine};
pub use product::Product;
