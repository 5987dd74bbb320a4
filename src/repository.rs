//! The narrow interface both stores expose.

use crate::error::StoreResult;

/// Keyed CRUD over one kind of record.
///
/// [`EntityStore`](crate::entity_store::EntityStore) implements this once per
/// entity type (keyed by integer id); [`InvoiceStore`](crate::invoice_store::InvoiceStore)
/// implements it for the invoice aggregate (keyed by invoice number).
pub trait Repository<T> {
    /// Lookup key accepted by [`get`](Repository::get).
    type Key: ?Sized;

    /// Idempotently creates the backing tables.
    fn initialize(&self) -> StoreResult<()>;

    /// Returns the unique record with the given key, or NotFound.
    fn get(&self, key: &Self::Key) -> StoreResult<T>;

    /// Returns all records, ordered deterministically.
    fn get_all(&self) -> StoreResult<Vec<T>>;

    /// Inserts a new record; Conflict when the key is already taken.
    fn add(&self, item: &T) -> StoreResult<()>;

    /// Overwrites all fields of the record with the item's key; NotFound
    /// when no row matches.
    fn update(&self, item: &T) -> StoreResult<()>;

    /// Removes the record with the item's key; NotFound when no row matches.
    fn delete(&self, item: &T) -> StoreResult<()>;
}
