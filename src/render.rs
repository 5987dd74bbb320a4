//! Fixed-layout PDF rendering for a finalized invoice.
//!
//! The renderer is a collaborator of the stores, not part of them: it
//! consumes a fully-populated invoice (derived fields present, entities
//! hydrated) and hands back the same invoice with its `pdf` field filled.
//! The layout is a single A4 page: company and customer blocks, a line
//! table, totals and the payment instruction. A company without a logo
//! cannot be rendered.

use std::io::BufWriter;

use printpdf::{BuiltinFont, Mm, PdfDocument};
use tracing::debug;

use crate::entities::Invoice;
use crate::error::RenderError;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;

// Line table column positions.
const X_DATE: f32 = 15.0;
const X_NAME: f32 = 45.0;
const X_DESC: f32 = 85.0;
const X_QTY: f32 = 140.0;
const X_PRICE: f32 = 155.0;
const X_TOTAL: f32 = 175.0;

/// Renders the invoice and returns it with `pdf` populated.
pub fn render(mut invoice: Invoice) -> Result<Invoice, RenderError> {
    let bytes = render_bytes(&invoice)?;
    invoice.pdf = Some(bytes);
    Ok(invoice)
}

/// Produces the PDF document bytes for the invoice.
pub fn render_bytes(invoice: &Invoice) -> Result<Vec<u8>, RenderError> {
    if invoice.company.logo.is_none() {
        return Err(RenderError::MissingLogo(invoice.company.id));
    }
    debug!(number = %invoice.number, lines = invoice.lines.len(), "rendering invoice pdf");

    let (doc, page1, layer1) = PdfDocument::new(
        format!("Factuur {}", invoice.number),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let layer = doc.get_page(page1).get_layer(layer1);

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    let company = &invoice.company;
    let customer = &invoice.customer;
    let mut y: f32 = 280.0;

    // Customer block (left), company block (right).
    push_line(&layer, &font_bold, &customer.name, 11.0, X_DATE, y);
    push_line(&layer, &font_bold, &company.name, 11.0, 130.0, y);
    y -= 6.0;
    push_line(&layer, &font, &customer.attention_of, 10.0, X_DATE, y);
    push_line(
        &layer,
        &font,
        &format!("{}, {}", company.street, company.house_number),
        10.0,
        130.0,
        y,
    );
    y -= 6.0;
    push_line(
        &layer,
        &font,
        &format!("{}, {}", customer.street, customer.house_number),
        10.0,
        X_DATE,
        y,
    );
    push_line(
        &layer,
        &font,
        &format!("{}, {}", company.postal_code, company.city),
        10.0,
        130.0,
        y,
    );
    y -= 6.0;
    push_line(
        &layer,
        &font,
        &format!("{}, {}", customer.postal_code, customer.city),
        10.0,
        X_DATE,
        y,
    );
    push_line(&layer, &font, &format!("KVK-nummer: {}", company.coc_number), 10.0, 130.0, y);
    y -= 6.0;
    push_line(&layer, &font, &format!("BTW-nummer: {}", company.vat_number), 10.0, 130.0, y);
    y -= 6.0;
    push_line(&layer, &font, &format!("Factuurnummer: {}", invoice.number), 10.0, X_DATE, y);
    push_line(&layer, &font, &format!("Email: {}", company.email), 10.0, 130.0, y);
    y -= 6.0;
    push_line(&layer, &font, &format!("Factuurdatum: {}", invoice.issue_date), 10.0, X_DATE, y);
    push_line(&layer, &font, &format!("Telefoonnummer: {}", company.phone), 10.0, 130.0, y);

    // Line table.
    y -= 12.0;
    push_line(&layer, &font_bold, "Datum", 10.0, X_DATE, y);
    push_line(&layer, &font_bold, "Product", 10.0, X_NAME, y);
    push_line(&layer, &font_bold, "Omschrijving", 10.0, X_DESC, y);
    push_line(&layer, &font_bold, "Aantal", 10.0, X_QTY, y);
    push_line(&layer, &font_bold, "Prijs", 10.0, X_PRICE, y);
    push_line(&layer, &font_bold, "Totaal", 10.0, X_TOTAL, y);
    y -= 2.0;
    rule(&layer, y);
    y -= 5.0;

    for line in &invoice.lines {
        if y < 60.0 {
            return Err(RenderError::Pdf(format!(
                "invoice {} has too many lines for a single page",
                invoice.number
            )));
        }
        let row_total = line.product.unit_price * f64::from(line.quantity);
        push_line(&layer, &font, &line.date, 10.0, X_DATE, y);
        push_line(&layer, &font, &line.product.name, 10.0, X_NAME, y);
        push_line(&layer, &font, &line.product.description, 10.0, X_DESC, y);
        push_line(&layer, &font, &line.quantity.to_string(), 10.0, X_QTY, y);
        push_line(&layer, &font, &format_amount(line.product.unit_price), 10.0, X_PRICE, y);
        push_line(&layer, &font, &format_amount(row_total), 10.0, X_TOTAL, y);
        y -= 6.0;
    }
    rule(&layer, y);

    // Payment details (left), totals (right).
    y -= 8.0;
    push_line(&layer, &font_bold, "Betaalinformatie:", 10.0, X_DATE, y);
    y -= 6.0;
    push_line(&layer, &font, &format!("Bank: {}", company.bank), 10.0, X_DATE, y);
    push_line(
        &layer,
        &font,
        &format!("Totaal excl. BTW: {} EUR", format_amount(invoice.subtotal_excl)),
        10.0,
        120.0,
        y,
    );
    y -= 6.0;
    push_line(&layer, &font, &format!("IBAN: {}", company.iban), 10.0, X_DATE, y);
    push_line(
        &layer,
        &font,
        &format!("BTW: {} EUR", format_amount(invoice.tax_amount)),
        10.0,
        120.0,
        y,
    );
    y -= 6.0;
    push_line(&layer, &font, &format!("BIC: {}", company.bic), 10.0, X_DATE, y);
    push_line(
        &layer,
        &font_bold,
        &format!("Totaal incl. BTW: {} EUR", format_amount(invoice.total_incl)),
        10.0,
        120.0,
        y,
    );

    // Payment instruction.
    y -= 12.0;
    push_line(
        &layer,
        &font,
        &format!(
            "Gelieve het bedrag van {} EUR te betalen voor {},",
            format_amount(invoice.total_incl),
            invoice.due_date
        ),
        10.0,
        X_DATE,
        y,
    );
    y -= 6.0;
    push_line(
        &layer,
        &font,
        &format!("onder vermelding van het factuurnummer {}.", invoice.number),
        10.0,
        X_DATE,
        y,
    );
    y -= 6.0;
    push_line(&layer, &font, "Alvast bedankt!", 10.0, X_DATE, y);

    let mut writer = BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| RenderError::Pdf(e.to_string()))
}

fn push_line(
    layer: &printpdf::PdfLayerReference,
    font: &printpdf::IndirectFontRef,
    text: &str,
    font_size: f32,
    x: f32,
    y: f32,
) {
    layer.use_text(text, font_size, Mm(x), Mm(y), font);
}

fn rule(layer: &printpdf::PdfLayerReference, y: f32) {
    layer.add_line(printpdf::Line {
        points: vec![
            (printpdf::Point::new(Mm(15.0), Mm(y)), false),
            (printpdf::Point::new(Mm(195.0), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}
