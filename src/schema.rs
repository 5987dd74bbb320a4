//! Table creation. Both stores call into here from `initialize`; every
//! statement is `IF NOT EXISTS` so initialization is idempotent.
//!
//! Table and column names are the persisted schema contract and stay fixed;
//! all values travel through bound parameters.

use rusqlite::Connection;

use crate::error::StoreResult;

/// Creates the three single-entity tables: Product, Klant (customer) and
/// Bedrijf (company).
pub fn create_entity_tables(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS Product (
            id INTEGER NOT NULL,
            naam TEXT NOT NULL,
            omschrijving TEXT NOT NULL,
            productcategorie TEXT NOT NULL,
            eenheidsprijs REAL NOT NULL,
            btw_percentage REAL NOT NULL,
            PRIMARY KEY (id)
        );

        CREATE TABLE IF NOT EXISTS Klant (
            id INTEGER NOT NULL,
            handelsnaam TEXT NOT NULL,
            ten_aanzien_van TEXT NOT NULL,
            straatnaam TEXT NOT NULL,
            huisnummer TEXT NOT NULL,
            postcode TEXT NOT NULL,
            plaats TEXT NOT NULL,
            PRIMARY KEY (id)
        );

        CREATE TABLE IF NOT EXISTS Bedrijf (
            id INTEGER NOT NULL,
            handelsnaam TEXT NOT NULL,
            straatnaam TEXT NOT NULL,
            huisnummer TEXT NOT NULL,
            postcode TEXT NOT NULL,
            plaats TEXT NOT NULL,
            kvk_nummer TEXT NOT NULL,
            btw_nummer TEXT NOT NULL,
            bank TEXT NOT NULL,
            iban TEXT NOT NULL,
            bic TEXT NOT NULL,
            telefoonnummer TEXT NOT NULL,
            email TEXT NOT NULL,
            logo BLOB,
            PRIMARY KEY (id)
        );
        "#,
    )?;
    Ok(())
}

/// Creates the invoice header table (Factuur) and the line table
/// (BevatProduct) with its composite natural key.
pub fn create_invoice_tables(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS Factuur (
            factuurnummer TEXT NOT NULL,
            klant INTEGER NOT NULL,
            bedrijf INTEGER NOT NULL,
            factuurdatum TEXT NOT NULL,
            uiterste_betaaldatum TEXT NOT NULL,
            totaalbedrag_excl REAL NOT NULL,
            btw_bedrag REAL NOT NULL,
            totaalbedrag_incl REAL NOT NULL,
            betaalstatus INTEGER NOT NULL DEFAULT 0,
            pdf BLOB,
            PRIMARY KEY (factuurnummer),
            FOREIGN KEY (klant) REFERENCES Klant (id),
            FOREIGN KEY (bedrijf) REFERENCES Bedrijf (id)
        );

        CREATE TABLE IF NOT EXISTS BevatProduct (
            factuur TEXT NOT NULL,
            product INTEGER NOT NULL,
            hoeveelheid INTEGER NOT NULL,
            datum TEXT NOT NULL,
            PRIMARY KEY (factuur, product, datum),
            FOREIGN KEY (factuur) REFERENCES Factuur (factuurnummer),
            FOREIGN KEY (product) REFERENCES Product (id)
        );
        "#,
    )?;
    Ok(())
}
