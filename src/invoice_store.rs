//! Composite CRUD for the invoice aggregate (header + line rows).
//!
//! The store persists only foreign-key ids for customer, company and
//! products, and rehydrates full records through the entity store on every
//! read. Writes validate that each referenced entity exists and matches the
//! stored record field-for-field, then run in a single transaction so a
//! mid-write failure leaves nothing behind.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::entities::{Company, Customer, Invoice, InvoiceLine, Product};
use crate::entity_store::EntityStore;
use crate::error::{is_constraint_violation, StoreError, StoreResult};
use crate::repository::Repository;
use crate::schema;

const KIND: &str = "invoice";

const SELECT_HEADER: &str = "SELECT factuurnummer, klant, bedrijf, factuurdatum, \
     uiterste_betaaldatum, totaalbedrag_excl, btw_bedrag, totaalbedrag_incl, betaalstatus, pdf \
     FROM Factuur WHERE factuurnummer = ?1";

const INSERT_HEADER: &str = "INSERT INTO Factuur (factuurnummer, klant, bedrijf, factuurdatum, \
     uiterste_betaaldatum, totaalbedrag_excl, btw_bedrag, totaalbedrag_incl, betaalstatus, pdf) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const UPDATE_HEADER: &str = "UPDATE Factuur SET klant = ?2, bedrijf = ?3, factuurdatum = ?4, \
     uiterste_betaaldatum = ?5, totaalbedrag_excl = ?6, btw_bedrag = ?7, totaalbedrag_incl = ?8, \
     betaalstatus = ?9, pdf = ?10 WHERE factuurnummer = ?1";

const INSERT_LINE: &str =
    "INSERT INTO BevatProduct (factuur, product, hoeveelheid, datum) VALUES (?1, ?2, ?3, ?4)";

/// Raw header row before entity rehydration.
struct HeaderRow {
    number: String,
    customer_id: i64,
    company_id: i64,
    issue_date: String,
    due_date: String,
    subtotal_excl: f64,
    tax_amount: f64,
    total_incl: f64,
    paid: bool,
    pdf: Option<Vec<u8>>,
}

/// CRUD for the invoice aggregate. Borrows the same exclusive connection the
/// entity store uses, so entity lookups and invoice writes see one database.
pub struct InvoiceStore<'c> {
    conn: &'c Connection,
}

impl<'c> InvoiceStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        InvoiceStore { conn }
    }

    fn entities(&self) -> EntityStore<'c> {
        EntityStore::new(self.conn)
    }

    /// Idempotently creates the Factuur and BevatProduct tables.
    pub fn initialize(&self) -> StoreResult<()> {
        schema::create_invoice_tables(self.conn)
    }

    /// Reads the header row, rehydrates customer, company and line products
    /// through the entity store and reassembles the aggregate. Derived
    /// fields come straight from the stored columns; nothing is recomputed.
    pub fn get(&self, number: &str) -> StoreResult<Invoice> {
        let header = self
            .conn
            .query_row(SELECT_HEADER, params![number], |row| {
                Ok(HeaderRow {
                    number: row.get(0)?,
                    customer_id: row.get(1)?,
                    company_id: row.get(2)?,
                    issue_date: row.get(3)?,
                    due_date: row.get(4)?,
                    subtotal_excl: row.get(5)?,
                    tax_amount: row.get(6)?,
                    total_incl: row.get(7)?,
                    paid: row.get(8)?,
                    pdf: row.get(9)?,
                })
            })
            .optional()?
            .ok_or_else(|| StoreError::not_found(KIND, number))?;

        let entities = self.entities();
        let customer: Customer = entities.get(header.customer_id)?;
        let company: Company = entities.get(header.company_id)?;

        // Line rows in insertion order.
        let mut stmt = self.conn.prepare(
            "SELECT product, hoeveelheid, datum FROM BevatProduct \
             WHERE factuur = ?1 ORDER BY rowid ASC",
        )?;
        let line_rows = stmt
            .query_map(params![number], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, u32>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut lines = Vec::with_capacity(line_rows.len());
        for (product_id, quantity, date) in line_rows {
            let product: Product = entities.get(product_id)?;
            lines.push(InvoiceLine { product, quantity, date });
        }

        Ok(Invoice {
            number: header.number,
            customer,
            company,
            issue_date: header.issue_date,
            due_date: header.due_date,
            lines,
            subtotal_excl: header.subtotal_excl,
            tax_amount: header.tax_amount,
            total_incl: header.total_incl,
            paid: header.paid,
            pdf: header.pdf,
        })
    }

    /// Lists all invoice numbers and materializes each via [`get`](Self::get).
    /// One full reconstruction per invoice; this is not a high-throughput
    /// path.
    pub fn get_all(&self) -> StoreResult<Vec<Invoice>> {
        let mut stmt = self
            .conn
            .prepare("SELECT factuurnummer FROM Factuur ORDER BY rowid ASC")?;
        let numbers = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        numbers.iter().map(|n| self.get(n)).collect()
    }

    /// Validates references, then writes the header row and every line row
    /// in one transaction.
    pub fn add(&self, item: &Invoice) -> StoreResult<()> {
        self.check_references(item)?;

        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            INSERT_HEADER,
            params![
                item.number,
                item.customer.id,
                item.company.id,
                item.issue_date,
                item.due_date,
                item.subtotal_excl,
                item.tax_amount,
                item.total_incl,
                item.paid,
                item.pdf,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(StoreError::conflict(KIND, &item.number));
            }
            Err(e) => return Err(e.into()),
        }
        insert_lines(&tx, item)?;
        tx.commit()?;

        debug!(number = %item.number, lines = item.lines.len(), "added invoice");
        Ok(())
    }

    /// Same reference validation as `add`, then overwrites the header row
    /// and fully replaces the line set (delete all, reinsert) in one
    /// transaction. NotFound when the header row is absent.
    pub fn update(&self, item: &Invoice) -> StoreResult<()> {
        self.check_references(item)?;

        let tx = self.conn.unchecked_transaction()?;
        let affected = tx.execute(
            UPDATE_HEADER,
            params![
                item.number,
                item.customer.id,
                item.company.id,
                item.issue_date,
                item.due_date,
                item.subtotal_excl,
                item.tax_amount,
                item.total_incl,
                item.paid,
                item.pdf,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::not_found(KIND, &item.number));
        }
        tx.execute(
            "DELETE FROM BevatProduct WHERE factuur = ?1",
            params![item.number],
        )?;
        insert_lines(&tx, item)?;
        tx.commit()?;

        debug!(number = %item.number, lines = item.lines.len(), "updated invoice");
        Ok(())
    }

    /// Deletes line rows before the header row (child before parent), in one
    /// transaction. NotFound when the header row is absent.
    pub fn delete(&self, item: &Invoice) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM BevatProduct WHERE factuur = ?1",
            params![item.number],
        )?;
        let affected = tx.execute(
            "DELETE FROM Factuur WHERE factuurnummer = ?1",
            params![item.number],
        )?;
        if affected == 0 {
            return Err(StoreError::not_found(KIND, &item.number));
        }
        tx.commit()?;

        debug!(number = %item.number, "deleted invoice");
        Ok(())
    }

    /// Checks that the invoice's customer, company and every line product
    /// exist and exactly match the stored records. Absent or mismatched
    /// entities are a Referential error naming the entity.
    fn check_references(&self, item: &Invoice) -> StoreResult<()> {
        let entities = self.entities();

        match entities.get::<Customer>(item.customer.id) {
            Ok(stored) if stored == item.customer => {}
            Ok(_) | Err(StoreError::NotFound { .. }) => {
                return Err(StoreError::referential("customer", item.customer.id));
            }
            Err(e) => return Err(e),
        }
        match entities.get::<Company>(item.company.id) {
            Ok(stored) if stored == item.company => {}
            Ok(_) | Err(StoreError::NotFound { .. }) => {
                return Err(StoreError::referential("company", item.company.id));
            }
            Err(e) => return Err(e),
        }
        for line in &item.lines {
            match entities.get::<Product>(line.product.id) {
                Ok(stored) if stored == line.product => {}
                Ok(_) | Err(StoreError::NotFound { .. }) => {
                    return Err(StoreError::referential("product", line.product.id));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

fn insert_lines(tx: &rusqlite::Transaction<'_>, item: &Invoice) -> StoreResult<()> {
    for line in &item.lines {
        let result = tx.execute(
            INSERT_LINE,
            params![item.number, line.product.id, line.quantity, line.date],
        );
        match result {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(StoreError::conflict(
                    "invoice line",
                    format!("{}/{}/{}", item.number, line.product.id, line.date),
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

impl<'c> Repository<Invoice> for InvoiceStore<'c> {
    type Key = str;

    fn initialize(&self) -> StoreResult<()> {
        InvoiceStore::initialize(self)
    }

    fn get(&self, key: &str) -> StoreResult<Invoice> {
        InvoiceStore::get(self, key)
    }

    fn get_all(&self) -> StoreResult<Vec<Invoice>> {
        InvoiceStore::get_all(self)
    }

    fn add(&self, item: &Invoice) -> StoreResult<()> {
        InvoiceStore::add(self, item)
    }

    fn update(&self, item: &Invoice) -> StoreResult<()> {
        InvoiceStore::update(self, item)
    }

    fn delete(&self, item: &Invoice) -> StoreResult<()> {
        InvoiceStore::delete(self, item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::InvoiceDraft;
    use rusqlite::Connection;

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

    fn mango() -> Product {
        Product {
            id: 3,
            name: "Mango".to_string(),
            description: "A mango.".to_string(),
            category: "fruit".to_string(),
            unit_price: 1.99,
            tax_rate: 21.0,
        }
    }

    fn john_doe() -> Customer {
        Customer {
            id: 1,
            name: "John Doe Inc.".to_string(),
            attention_of: "John Doe".to_string(),
            street: "Pancake Street".to_string(),
            house_number: "1".to_string(),
            postal_code: "1234AB".to_string(),
            city: "New York".to_string(),
        }
    }

    fn greengrocer() -> Company {
        Company {
            id: 1,
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
            logo: Some(vec![0x89, 0x50, 0x4e, 0x47]),
        }
    }

    fn seed_entities(conn: &Connection) {
        let entities = EntityStore::new(conn);
        entities.initialize().unwrap();
        entities.add(&apple()).unwrap();
        entities.add(&banana()).unwrap();
        entities.add(&john_doe()).unwrap();
        entities.add(&greengrocer()).unwrap();
    }

    fn test_store(conn: &Connection) -> InvoiceStore<'_> {
        seed_entities(conn);
        let store = InvoiceStore::new(conn);
        store.initialize().unwrap();
        store
    }

    fn invoice_f2024001() -> Invoice {
        InvoiceDraft::new(
            "f2024001",
            john_doe(),
            greengrocer(),
            "2021-01-01",
            vec![
                InvoiceLine { product: apple(), quantity: 3, date: "2021-01-01".to_string() },
                InvoiceLine { product: banana(), quantity: 2, date: "2021-01-02".to_string() },
            ],
        )
        .finalize()
        .unwrap()
    }

    fn invoice_f2024002() -> Invoice {
        InvoiceDraft::new(
            "f2024002",
            john_doe(),
            greengrocer(),
            "2022-04-01",
            vec![
                InvoiceLine { product: apple(), quantity: 1, date: "2022-04-01".to_string() },
                InvoiceLine { product: banana(), quantity: 2, date: "2022-04-01".to_string() },
            ],
        )
        .finalize()
        .unwrap()
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn add_then_get_round_trips_the_aggregate() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        let invoice = invoice_f2024001();
        store.add(&invoice).unwrap();
        let fetched = store.get("f2024001").unwrap();
        assert_eq!(fetched, invoice);
    }

    #[test]
    fn get_missing_invoice_is_not_found() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        let err = store.get("f1999999").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "invoice", .. }));
    }

    #[test]
    fn get_all_materializes_every_invoice() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        store.add(&invoice_f2024001()).unwrap();
        store.add(&invoice_f2024002()).unwrap();
        let all = store.get_all().unwrap();
        assert_eq!(all, vec![invoice_f2024001(), invoice_f2024002()]);
    }

    #[test]
    fn add_duplicate_number_is_a_conflict() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        store.add(&invoice_f2024001()).unwrap();
        let err = store.add(&invoice_f2024001()).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { kind: "invoice", .. }));
    }

    #[test]
    fn add_with_unknown_customer_fails_and_writes_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        let mut invoice = invoice_f2024001();
        invoice.customer.id = 99;
        let err = store.add(&invoice).unwrap_err();
        assert!(matches!(err, StoreError::Referential { kind: "customer", .. }));

        // No partial write: neither header nor lines exist.
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM Factuur"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM BevatProduct"), 0);
    }

    #[test]
    fn add_with_mismatched_customer_fields_is_referential() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        // Same id as the stored customer, different address.
        let mut invoice = invoice_f2024001();
        invoice.customer.street = "Elsewhere Street".to_string();
        let err = store.add(&invoice).unwrap_err();
        assert!(matches!(err, StoreError::Referential { kind: "customer", .. }));
    }

    #[test]
    fn add_with_mismatched_product_is_referential() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        let mut invoice = invoice_f2024001();
        invoice.lines[1].product.unit_price = 0.99;
        let err = store.add(&invoice).unwrap_err();
        assert!(matches!(err, StoreError::Referential { kind: "product", .. }));
    }

    #[test]
    fn update_replaces_the_line_set_entirely() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);
        store.add(&invoice_f2024001()).unwrap();

        EntityStore::new(&conn).add(&mango()).unwrap();
        let replacement = InvoiceDraft::new(
            "f2024001",
            john_doe(),
            greengrocer(),
            "2021-01-01",
            vec![
                InvoiceLine { product: apple(), quantity: 3, date: "2021-01-01".to_string() },
                InvoiceLine { product: mango(), quantity: 2, date: "2021-01-02".to_string() },
            ],
        )
        .finalize()
        .unwrap();

        store.update(&replacement).unwrap();
        let fetched = store.get("f2024001").unwrap();
        assert_eq!(fetched, replacement);
        // Exactly the new lines, none of the old ones.
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM BevatProduct"), 2);
        assert!(fetched.lines.iter().all(|l| l.product.id != banana().id));
    }

    #[test]
    fn update_missing_invoice_is_not_found() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        let err = store.update(&invoice_f2024001()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "invoice", .. }));
    }

    #[test]
    fn delete_removes_header_and_all_line_rows() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);
        store.add(&invoice_f2024001()).unwrap();
        store.add(&invoice_f2024002()).unwrap();

        store.delete(&invoice_f2024002()).unwrap();

        let err = store.get("f2024002").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        // No orphan lines: only f2024001's two rows remain.
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM BevatProduct"), 2);
        assert!(store.get("f2024001").is_ok());
    }

    #[test]
    fn delete_missing_invoice_is_not_found() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        let err = store.delete(&invoice_f2024001()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        // The rolled-back transaction must not have touched anything.
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM BevatProduct"), 0);
    }

    #[test]
    fn duplicate_line_key_rolls_back_the_whole_add() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        // Two lines with the same (invoice, product, date) key.
        let mut invoice = invoice_f2024001();
        invoice.lines[1] = invoice.lines[0].clone();
        let err = store.add(&invoice).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { kind: "invoice line", .. }));
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM Factuur"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM BevatProduct"), 0);
    }

    #[test]
    fn stored_derived_fields_survive_the_round_trip_unchanged() {
        let conn = Connection::open_in_memory().unwrap();
        let store = test_store(&conn);

        let invoice = invoice_f2024001();
        store.add(&invoice).unwrap();
        let fetched = store.get("f2024001").unwrap();
        assert_eq!(fetched.subtotal_excl, 3.00);
        assert_eq!(fetched.tax_amount, 0.63);
        assert_eq!(fetched.total_incl, 3.63);
        assert_eq!(fetched.due_date, "2021-01-31");
        assert!(!fetched.paid);
    }
}
