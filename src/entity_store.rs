//! Generic keyed CRUD over the single-entity tables (Product, Klant,
//! Bedrijf).
//!
//! The kind selector is the type parameter: each entity type carries its own
//! fixed SQL and row mapping through the sealed [`Entity`] trait, so the set
//! of tables is closed at compile time and every query runs with bound
//! parameters only.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::entities::{Company, Customer, Product};
use crate::error::{is_constraint_violation, StoreError, StoreResult};
use crate::repository::Repository;
use crate::schema;

mod sealed {
    pub trait Sealed {}
    impl Sealed for crate::entities::Product {}
    impl Sealed for crate::entities::Customer {}
    impl Sealed for crate::entities::Company {}
}

/// Schema descriptor for a single-entity record. Implemented for exactly
/// Product, Customer and Company; the trait is sealed so no caller can point
/// the store at an arbitrary table.
pub trait Entity: Sized + PartialEq + sealed::Sealed {
    /// Kind name used in error messages.
    const KIND: &'static str;
    const SELECT_BY_ID: &'static str;
    const SELECT_ALL: &'static str;
    const DELETE_BY_ID: &'static str;

    fn id(&self) -> i64;
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize>;
    fn update_row(&self, conn: &Connection) -> rusqlite::Result<usize>;
}

impl Entity for Product {
    const KIND: &'static str = "product";
    const SELECT_BY_ID: &'static str = "SELECT id, naam, omschrijving, productcategorie, \
         eenheidsprijs, btw_percentage FROM Product WHERE id = ?1";
    const SELECT_ALL: &'static str = "SELECT id, naam, omschrijving, productcategorie, \
         eenheidsprijs, btw_percentage FROM Product ORDER BY id ASC";
    const DELETE_BY_ID: &'static str = "DELETE FROM Product WHERE id = ?1";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            unit_price: row.get(4)?,
            tax_rate: row.get(5)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO Product (id, naam, omschrijving, productcategorie, eenheidsprijs, btw_percentage)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.id,
                self.name,
                self.description,
                self.category,
                self.unit_price,
                self.tax_rate,
            ],
        )
    }

    fn update_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE Product SET naam = ?2, omschrijving = ?3, productcategorie = ?4,
                 eenheidsprijs = ?5, btw_percentage = ?6 WHERE id = ?1",
            params![
                self.id,
                self.name,
                self.description,
                self.category,
                self.unit_price,
                self.tax_rate,
            ],
        )
    }
}

impl Entity for Customer {
    const KIND: &'static str = "customer";
    const SELECT_BY_ID: &'static str = "SELECT id, handelsnaam, ten_aanzien_van, straatnaam, \
         huisnummer, postcode, plaats FROM Klant WHERE id = ?1";
    const SELECT_ALL: &'static str = "SELECT id, handelsnaam, ten_aanzien_van, straatnaam, \
         huisnummer, postcode, plaats FROM Klant ORDER BY id ASC";
    const DELETE_BY_ID: &'static str = "DELETE FROM Klant WHERE id = ?1";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Customer {
            id: row.get(0)?,
            name: row.get(1)?,
            attention_of: row.get(2)?,
            street: row.get(3)?,
            house_number: row.get(4)?,
            postal_code: row.get(5)?,
            city: row.get(6)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO Klant (id, handelsnaam, ten_aanzien_van, straatnaam, huisnummer, postcode, plaats)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.id,
                self.name,
                self.attention_of,
                self.street,
                self.house_number,
                self.postal_code,
                self.city,
            ],
        )
    }

    fn update_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE Klant SET handelsnaam = ?2, ten_aanzien_van = ?3, straatnaam = ?4,
                 huisnummer = ?5, postcode = ?6, plaats = ?7 WHERE id = ?1",
            params![
                self.id,
                self.name,
                self.attention_of,
                self.street,
                self.house_number,
                self.postal_code,
                self.city,
            ],
        )
    }
}

impl Entity for Company {
    const KIND: &'static str = "company";
    const SELECT_BY_ID: &'static str = "SELECT id, handelsnaam, straatnaam, huisnummer, postcode, \
         plaats, kvk_nummer, btw_nummer, bank, iban, bic, telefoonnummer, email, logo \
         FROM Bedrijf WHERE id = ?1";
    const SELECT_ALL: &'static str = "SELECT id, handelsnaam, straatnaam, huisnummer, postcode, \
         plaats, kvk_nummer, btw_nummer, bank, iban, bic, telefoonnummer, email, logo \
         FROM Bedrijf ORDER BY id ASC";
    const DELETE_BY_ID: &'static str = "DELETE FROM Bedrijf WHERE id = ?1";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Company {
            id: row.get(0)?,
            name: row.get(1)?,
            street: row.get(2)?,
            house_number: row.get(3)?,
            postal_code: row.get(4)?,
            city: row.get(5)?,
            coc_number: row.get(6)?,
            vat_number: row.get(7)?,
            bank: row.get(8)?,
            iban: row.get(9)?,
            bic: row.get(10)?,
            phone: row.get(11)?,
            email: row.get(12)?,
            logo: row.get(13)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO Bedrijf (id, handelsnaam, straatnaam, huisnummer, postcode, plaats,
                 kvk_nummer, btw_nummer, bank, iban, bic, telefoonnummer, email, logo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                self.id,
                self.name,
                self.street,
                self.house_number,
                self.postal_code,
                self.city,
                self.coc_number,
                self.vat_number,
                self.bank,
                self.iban,
                self.bic,
                self.phone,
                self.email,
                self.logo,
            ],
        )
    }

    fn update_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE Bedrijf SET handelsnaam = ?2, straatnaam = ?3, huisnummer = ?4,
                 postcode = ?5, plaats = ?6, kvk_nummer = ?7, btw_nummer = ?8, bank = ?9,
                 iban = ?10, bic = ?11, telefoonnummer = ?12, email = ?13, logo = ?14
             WHERE id = ?1",
            params![
                self.id,
                self.name,
                self.street,
                self.house_number,
                self.postal_code,
                self.city,
                self.coc_number,
                self.vat_number,
                self.bank,
                self.iban,
                self.bic,
                self.phone,
                self.email,
                self.logo,
            ],
        )
    }
}

/// CRUD over the three single-entity tables. Borrows one exclusive
/// connection; all operations are synchronous and complete or fail per call.
pub struct EntityStore<'c> {
    conn: &'c Connection,
}

impl<'c> EntityStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        EntityStore { conn }
    }

    /// Idempotently creates the Product, Klant and Bedrijf tables.
    pub fn initialize(&self) -> StoreResult<()> {
        schema::create_entity_tables(self.conn)
    }

    /// Returns the unique record of kind `E` with that id.
    pub fn get<E: Entity>(&self, id: i64) -> StoreResult<E> {
        self.conn
            .query_row(E::SELECT_BY_ID, params![id], |row| E::from_row(row))
            .optional()?
            .ok_or_else(|| StoreError::not_found(E::KIND, id))
    }

    /// Returns all records of kind `E`, ordered by id ascending.
    pub fn get_all<E: Entity>(&self) -> StoreResult<Vec<E>> {
        let mut stmt = self.conn.prepare(E::SELECT_ALL)?;
        let items = stmt
            .query_map([], |row| E::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Inserts a new record; duplicate ids surface as Conflict.
    pub fn add<E: Entity>(&self, item: &E) -> StoreResult<()> {
        match item.insert(self.conn) {
            Ok(_) => {
                debug!(kind = E::KIND, id = item.id(), "added entity");
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => {
                Err(StoreError::conflict(E::KIND, item.id()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrites all fields of the row matching the item's id. A row must
    /// exist: zero rows affected is NotFound.
    pub fn update<E: Entity>(&self, item: &E) -> StoreResult<()> {
        let affected = item.update_row(self.conn)?;
        if affected == 0 {
            return Err(StoreError::not_found(E::KIND, item.id()));
        }
        debug!(kind = E::KIND, id = item.id(), "updated entity");
        Ok(())
    }

    /// Removes the row matching the item's id; zero rows affected is
    /// NotFound.
    pub fn delete<E: Entity>(&self, item: &E) -> StoreResult<()> {
        let affected = self.conn.execute(E::DELETE_BY_ID, params![item.id()])?;
        if affected == 0 {
            return Err(StoreError::not_found(E::KIND, item.id()));
        }
        debug!(kind = E::KIND, id = item.id(), "deleted entity");
        Ok(())
    }
}

impl<'c, E: Entity> Repository<E> for EntityStore<'c> {
    type Key = i64;

    fn initialize(&self) -> StoreResult<()> {
        EntityStore::initialize(self)
    }

    fn get(&self, key: &i64) -> StoreResult<E> {
        EntityStore::get(self, *key)
    }

    fn get_all(&self) -> StoreResult<Vec<E>> {
        EntityStore::get_all(self)
    }

    fn add(&self, item: &E) -> StoreResult<()> {
        EntityStore::add(self, item)
    }

    fn update(&self, item: &E) -> StoreResult<()> {
        EntityStore::update(self, item)
    }

    fn delete(&self, item: &E) -> StoreResult<()> {
        EntityStore::delete(self, item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn test_store(conn: &Connection) -> EntityStore<'_> {
        let store = EntityStore::new(conn);
        store.initialize().unwrap();
        store
    }

    fn apple() -> Product {
        Product {
            id: 1,
            name: "Apple".to_string(),
            description: "An apple.".to_string(),
            category: "fruit".to_string(),
            unit_price: 0.50,
            tax_rate: 21.0,
        }
    }

    fn banana() -> Product {
        Product {
            id: 2,
            name: "Banana".to_string(),
            description: "A banana.".to_string(),
            category: "fruit".to_string(),
            unit_price: 0.75,
            tax_rate: 21.0,
        }
    }

    fn customer(id: i64) -> Customer {
        Customer {
            id,
            name: "John Doe Inc.".to_string(),
            attention_of: "John Doe".to_string(),
            street: "Pancake Street".to_string(),
            house_number: "1".to_string(),
            postal_code: "1234AB".to_string(),
            city: "New York".to_string(),
        }
    }

    fn company(id: i64, logo: Option<Vec<u8>>) -> Company {
        Company {
            id,
            name: "Greengrocer BV".to_string(),
            street: "Main Street".to_string(),
            house_number: "2".to_string(),
            postal_code: "1234AB".to_string(),
            city: "New York".to_string(),
            coc_number: "12345678".to_string(),
            vat_number: "12345678".to_string(),
            bank: "ING".to_string(),
            iban: "NL12INGB1234567890".to_string(),
            bic: "INGBNL2A".to_string(),
            phone: "123456789".to_string(),
            email: "info@greengrocer.com".to_string(),
            logo,
        }
    }

    #[test]
    fn add_then_get_returns_equal_record() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        store.add(&apple()).unwrap();
        let fetched: Product = store.get(1).unwrap();
        assert_eq!(fetched, apple());
    }

    #[test]
    fn add_duplicate_id_is_a_conflict() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        store.add(&apple()).unwrap();
        let err = store.add(&apple()).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { kind: "product", .. }));
    }

    #[test]
    fn get_all_returns_added_records_in_id_order() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        store.add(&banana()).unwrap();
        store.add(&apple()).unwrap();
        let all: Vec<Product> = store.get_all().unwrap();
        assert_eq!(all, vec![apple(), banana()]);
    }

    #[test]
    fn update_then_get_returns_updated_record() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        store.add(&banana()).unwrap();
        let mut changed = banana();
        changed.unit_price = 0.80;
        changed.description = "A ripe banana.".to_string();
        store.update(&changed).unwrap();

        let fetched: Product = store.get(2).unwrap();
        assert_eq!(fetched, changed);
        assert_ne!(fetched, banana());
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        let err = store.update(&apple()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "product", .. }));
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        store.add(&apple()).unwrap();
        store.delete(&apple()).unwrap();
        let err = store.get::<Product>(1).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "product", .. }));
    }

    #[test]
    fn delete_missing_row_is_not_found() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        let err = store.delete(&apple()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn customer_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        store.add(&customer(1)).unwrap();
        let fetched: Customer = store.get(1).unwrap();
        assert_eq!(fetched, customer(1));
    }

    #[test]
    fn company_round_trip_preserves_optional_logo() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        let with_logo = company(1, Some(vec![0x89, 0x50, 0x4e, 0x47]));
        let without_logo = company(2, None);
        store.add(&with_logo).unwrap();
        store.add(&without_logo).unwrap();

        assert_eq!(store.get::<Company>(1).unwrap(), with_logo);
        assert_eq!(store.get::<Company>(2).unwrap(), without_logo);
    }

    #[test]
    fn get_all_excludes_deleted_records() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        store.add(&apple()).unwrap();
        store.add(&banana()).unwrap();
        store.delete(&apple()).unwrap();
        let all: Vec<Product> = store.get_all().unwrap();
        assert_eq!(all, vec![banana()]);
    }

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);
        store.initialize().unwrap();
        store.add(&apple()).unwrap();
        store.initialize().unwrap();
        assert_eq!(store.get::<Product>(1).unwrap(), apple());
    }
}
