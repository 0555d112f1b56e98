// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::ArchiveRecord;

pub const CSV_COLUMNS: [&str; 17] = [
    "id",
    "created_at",
    "date",
    "client",
    "place",
    "unit_type",
    "units_count",
    "status",
    "subtotal",
    "discount",
    "discount_type",
    "tax_mode",
    "tax",
    "currency",
    "pay_plan",
    "p1",
    "total",
];

/// Renders archive rows as CSV with a fixed header. Every cell is quoted so
/// commas and newlines inside client or place names survive.
pub fn export_csv(records: &[&ArchiveRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_COLUMNS.iter().map(|c| (*c).to_owned()));
    for record in records {
        push_row(&mut out, record_cells(record).into_iter());
    }
    out
}

fn record_cells(record: &ArchiveRecord) -> Vec<String> {
    vec![
        record.id.map(|id| id.get().to_string()).unwrap_or_default(),
        record.created_at.clone().unwrap_or_default(),
        record.date.clone().unwrap_or_default(),
        record.client.clone().unwrap_or_default(),
        record.place.clone().unwrap_or_default(),
        record.unit_type.clone().unwrap_or_default(),
        record.units_count.to_string(),
        record.status.clone(),
        record.subtotal.to_string(),
        record.discount.to_string(),
        record.discount_type.clone(),
        record.tax_mode.clone(),
        record.tax.to_string(),
        record.currency.clone(),
        record.pay_plan.to_string(),
        record.p1.to_string(),
        record.total.to_string(),
    ]
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    let mut first = true;
    for cell in cells {
        if !first {
            out.push(',');
        }
        first = false;
        out.push('"');
        out.push_str(&cell.replace('"', "\"\""));
        out.push('"');
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::{CSV_COLUMNS, export_csv};
    use crate::ids::QuoteId;
    use crate::model::QuoteDraft;

    #[test]
    fn header_matches_column_order() {
        let csv = export_csv(&[]);
        let header: Vec<String> = CSV_COLUMNS.iter().map(|c| format!("\"{c}\"")).collect();
        assert_eq!(csv, format!("{}\r\n", header.join(",")));
    }

    #[test]
    fn rows_follow_the_header() {
        let draft = QuoteDraft {
            date: "2026-03-14".to_owned(),
            client: "Acme".to_owned(),
            place: "Riyadh".to_owned(),
            subtotal: 1000.0,
            ..QuoteDraft::default()
        };
        let mut record = draft.to_archive_record(1138.5);
        record.id = Some(QuoteId::new(7));
        record.created_at = Some("2026-03-14T08:00:00Z".to_owned());

        let csv = export_csv(&[&record]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("\"7\",\"2026-03-14T08:00:00Z\",\"2026-03-14\",\"Acme\""));
        assert!(lines[1].ends_with("\"1138.5\""));
        assert_eq!(lines[1].split("\",\"").count(), CSV_COLUMNS.len());
    }

    #[test]
    fn embedded_quotes_and_commas_are_escaped() {
        let draft = QuoteDraft {
            client: "Say \"hello\", twice".to_owned(),
            ..QuoteDraft::default()
        };
        let record = draft.to_archive_record(0.0);
        let csv = export_csv(&[&record]);
        assert!(csv.contains("\"Say \"\"hello\"\", twice\""));
    }

    #[test]
    fn unset_id_exports_as_empty_cell() {
        let record = QuoteDraft::default().to_archive_record(0.0);
        let csv = export_csv(&[&record]);
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[1].starts_with("\"\",\"\",\"\""));
    }
}
