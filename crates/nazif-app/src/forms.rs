// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::error::Error;
use std::fmt;

use time::Date;
use time::format_description::well_known::Iso8601;

use crate::model::{DiscountType, MAX_ITEM_LEN, PaymentPlan, QuoteDraft};

/// Every rule that failed, not just the first one. Callers show the whole
/// list so the user fixes the form in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub issues: Vec<String>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.issues.join("; "))
    }
}

impl Error for ValidationFailure {}

/// Checks a draft before it is sent to the archive. Local draft saves are
/// never gated on this.
pub fn validate_for_archive(draft: &QuoteDraft) -> Result<(), ValidationFailure> {
    let mut issues = Vec::new();

    if draft.client.trim().is_empty() {
        issues.push("client name is required".to_owned());
    }
    if draft.place.trim().is_empty() {
        issues.push("place is required".to_owned());
    }
    if !(draft.subtotal.is_finite() && draft.subtotal > 0.0) {
        issues.push("subtotal must be greater than zero".to_owned());
    }
    if draft.units_count <= 0 {
        issues.push("units count must be at least one".to_owned());
    }
    if !(draft.discount.is_finite() && draft.discount >= 0.0) {
        issues.push("discount cannot be negative".to_owned());
    } else if draft.discount_type == DiscountType::Percent && draft.discount > 100.0 {
        issues.push("percent discount cannot exceed 100".to_owned());
    }
    if !(draft.tax_rate.is_finite() && (0.0..=100.0).contains(&draft.tax_rate)) {
        issues.push("tax rate must be between 0 and 100".to_owned());
    }
    if let PaymentPlan::Split { first_percent } = draft.pay_plan {
        if !(first_percent.is_finite() && (1.0..=99.0).contains(&first_percent)) {
            issues.push("first installment must be between 1 and 99 percent".to_owned());
        }
    }
    if !draft.date.trim().is_empty() && parse_iso_date(&draft.date).is_none() {
        issues.push("date must be a calendar date in YYYY-MM-DD form".to_owned());
    }
    if draft.validity_enabled && draft.validity_days <= 0 {
        issues.push("validity period must be at least one day".to_owned());
    }
    if !draft.signer_phone.trim().is_empty() && !is_valid_phone(&draft.signer_phone) {
        issues.push("signer phone must be a Saudi or international number".to_owned());
    }
    if !draft.iban.trim().is_empty() && !is_valid_saudi_iban(&draft.iban) {
        issues.push("IBAN must be SA followed by 22 digits".to_owned());
    }
    for item in &draft.items {
        if item.trim().is_empty() {
            issues.push("line items cannot be blank".to_owned());
            break;
        }
    }
    if draft.items.iter().any(|item| item.chars().count() > MAX_ITEM_LEN) {
        issues.push(format!("line items cannot exceed {MAX_ITEM_LEN} characters"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { issues })
    }
}

pub fn parse_iso_date(input: &str) -> Option<Date> {
    Date::parse(input.trim(), &Iso8601::DATE).ok()
}

/// Accepts local Saudi mobiles (05 plus eight digits), the +966 form, or a
/// generic international number of 8 to 15 digits.
pub fn is_valid_phone(input: &str) -> bool {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if let Some(rest) = compact.strip_prefix("05") {
        return rest.len() == 8 && rest.chars().all(|c| c.is_ascii_digit());
    }
    if let Some(rest) = compact.strip_prefix("+9665").or_else(|| compact.strip_prefix("9665")) {
        return rest.len() == 8 && rest.chars().all(|c| c.is_ascii_digit());
    }
    if let Some(rest) = compact.strip_prefix('+') {
        return (8..=15).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit());
    }
    false
}

pub fn is_valid_saudi_iban(input: &str) -> bool {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let Some(rest) = compact.strip_prefix("SA") else {
        return false;
    };
    rest.len() == 22 && rest.chars().all(|c| c.is_ascii_digit())
}
