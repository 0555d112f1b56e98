// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::QuoteId;

/// Shape marker for the locally persisted draft slot. Bump when the payload
/// layout changes; loaders treat an unknown version as no draft at all.
pub const DRAFT_SCHEMA_VERSION: i64 = 2;

pub const MAX_ITEM_LEN: usize = 200;

pub const DEFAULT_CURRENCY: &str = "SAR";
pub const DEFAULT_TAX_RATE: f64 = 15.0;
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

/// The standard cleaning checklist. An empty item list after restore is
/// replaced with these entries; the form is never presented blank.
pub const DEFAULT_CHECKLIST: [&str; 11] = [
    "تنظيف الأبواب",
    "تنظيف الجدران",
    "تنظيف وجلي الأرضيات",
    "تنظيف الزجاج والألمنيوم",
    "تنظيف المطابخ",
    "تنظيف مفاتيح الكهرباء",
    "تنظيف دورات المياه",
    "تنظيف السطح الخارجي",
    "تنظيف الحوش",
    "تنظيف الخزان العلوي",
    "تنظيف الخزان الأرضي",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStatus {
    Active,
    Inactive,
}

impl QuoteStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountType {
    Amount,
    Percent,
}

impl DiscountType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Percent => "percent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "amount" => Some(Self::Amount),
            "percent" => Some(Self::Percent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxMode {
    Inclusive,
    Exclusive,
}

impl TaxMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inclusive => "inclusive",
            Self::Exclusive => "exclusive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inclusive" => Some(Self::Inclusive),
            "exclusive" => Some(Self::Exclusive),
            _ => None,
        }
    }
}

/// One or two scheduled payments. The second installment is always derived
/// as `100 - first`; it is never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PaymentPlan {
    Single,
    Split { first_percent: f64 },
}

impl PaymentPlan {
    pub const fn count(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Split { .. } => 2,
        }
    }

    pub fn first_percent(self) -> f64 {
        match self {
            Self::Single => 100.0,
            Self::Split { first_percent } => clamp_percent(first_percent),
        }
    }

    /// Switching 2 -> 1 discards the stored split; 1 -> 2 starts at 50/50.
    pub fn with_count(self, count: u8) -> Self {
        match (self, count) {
            (Self::Split { .. }, 2) => self,
            (_, 2) => Self::Split {
                first_percent: 50.0,
            },
            _ => Self::Single,
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(1.0, 99.0)
    } else {
        50.0
    }
}

/// The working, not-yet-archived representation of one quote.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteDraft {
    pub remote_id: Option<QuoteId>,
    pub date: String,
    pub place: String,
    pub client: String,
    pub status: QuoteStatus,
    pub unit_type: String,
    pub units_count: i64,
    pub subtotal: f64,
    pub discount: f64,
    pub discount_type: DiscountType,
    pub tax_mode: TaxMode,
    pub tax_rate: f64,
    pub pay_plan: PaymentPlan,
    pub validity_enabled: bool,
    pub validity_days: i64,
    pub pay_to: String,
    pub iban: String,
    pub account: String,
    pub signer_name: String,
    pub signer_phone: String,
    pub items: Vec<String>,
    pub logo: Option<String>,
    pub currency: String,
}

impl Default for QuoteDraft {
    fn default() -> Self {
        Self {
            remote_id: None,
            date: String::new(),
            place: String::new(),
            client: String::new(),
            status: QuoteStatus::Active,
            unit_type: String::new(),
            units_count: 1,
            subtotal: 0.0,
            discount: 0.0,
            discount_type: DiscountType::Amount,
            tax_mode: TaxMode::Exclusive,
            tax_rate: DEFAULT_TAX_RATE,
            pay_plan: PaymentPlan::Single,
            validity_enabled: false,
            validity_days: DEFAULT_VALIDITY_DAYS,
            pay_to: String::new(),
            iban: String::new(),
            account: String::new(),
            signer_name: String::new(),
            signer_phone: String::new(),
            items: default_checklist(),
            logo: None,
            currency: DEFAULT_CURRENCY.to_owned(),
        }
    }
}

pub fn default_checklist() -> Vec<String> {
    DEFAULT_CHECKLIST.iter().map(|item| (*item).to_owned()).collect()
}

impl QuoteDraft {
    /// Appends a line item; blank or over-long entries are rejected.
    pub fn add_item(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_ITEM_LEN {
            return false;
        }
        self.items.push(trimmed.to_owned());
        true
    }

    pub fn set_plan_count(&mut self, count: u8) {
        self.pay_plan = self.pay_plan.with_count(count);
    }

    pub fn to_payload(&self) -> DraftPayload {
        DraftPayload {
            version: DRAFT_SCHEMA_VERSION,
            date: self.date.clone(),
            place: self.place.clone(),
            client: self.client.clone(),
            status: self.status.as_str().to_owned(),
            unit_type: self.unit_type.clone(),
            units_count: self.units_count.to_string(),
            subtotal: format_number(self.subtotal),
            currency: self.currency.clone(),
            discount: format_number(self.discount),
            discount_type: self.discount_type.as_str().to_owned(),
            tax_mode: self.tax_mode.as_str().to_owned(),
            tax: format_number(self.tax_rate),
            pay_plan: self.pay_plan.count().to_string(),
            p1: match self.pay_plan {
                PaymentPlan::Single => String::new(),
                PaymentPlan::Split { .. } => format_number(self.pay_plan.first_percent()),
            },
            valid: self.validity_enabled,
            valid_days: self.validity_days.to_string(),
            pay_to: self.pay_to.clone(),
            iban: self.iban.clone(),
            acct: self.account.clone(),
            signer: self.signer_name.clone(),
            signer_phone: self.signer_phone.clone(),
            bullets: self.items.clone(),
            logo: self.logo.clone().unwrap_or_default(),
        }
    }

    /// Exact inverse of [`QuoteDraft::to_payload`], with type defaults for
    /// missing or unparsable fields. An empty restored item list becomes the
    /// standard checklist.
    pub fn from_payload(payload: &DraftPayload) -> Self {
        let pay_plan = if payload.pay_plan.trim() == "2" {
            PaymentPlan::Split {
                first_percent: clamp_percent(parse_number(&payload.p1).unwrap_or(50.0)),
            }
        } else {
            PaymentPlan::Single
        };

        Self {
            remote_id: None,
            date: payload.date.clone(),
            place: payload.place.clone(),
            client: payload.client.clone(),
            status: QuoteStatus::parse(&payload.status).unwrap_or(QuoteStatus::Active),
            unit_type: payload.unit_type.clone(),
            units_count: parse_positive_int(&payload.units_count).unwrap_or(1),
            subtotal: parse_non_negative(&payload.subtotal),
            discount: parse_non_negative(&payload.discount),
            discount_type: DiscountType::parse(&payload.discount_type)
                .unwrap_or(DiscountType::Amount),
            tax_mode: TaxMode::parse(&payload.tax_mode).unwrap_or(TaxMode::Exclusive),
            tax_rate: parse_non_negative(&payload.tax),
            pay_plan,
            validity_enabled: payload.valid,
            validity_days: parse_positive_int(&payload.valid_days)
                .unwrap_or(DEFAULT_VALIDITY_DAYS),
            pay_to: payload.pay_to.clone(),
            iban: payload.iban.clone(),
            account: payload.acct.clone(),
            signer_name: payload.signer.clone(),
            signer_phone: payload.signer_phone.clone(),
            items: if payload.bullets.is_empty() {
                default_checklist()
            } else {
                payload.bullets.clone()
            },
            logo: if payload.logo.is_empty() {
                None
            } else {
                Some(payload.logo.clone())
            },
            currency: if payload.currency.trim().is_empty() {
                DEFAULT_CURRENCY.to_owned()
            } else {
                payload.currency.clone()
            },
        }
    }

    /// Maps the draft onto archive column names. The tenant is stamped by the
    /// archive client and `created_at` only at first insert, so both start
    /// unset here.
    pub fn to_archive_record(&self, total: f64) -> ArchiveRecord {
        ArchiveRecord {
            id: None,
            created_at: None,
            tenant: String::new(),
            date: none_if_empty(&self.date),
            client: none_if_empty(&self.client),
            place: none_if_empty(&self.place),
            status: self.status.as_str().to_owned(),
            unit_type: none_if_empty(&self.unit_type),
            units_count: self.units_count,
            subtotal: self.subtotal,
            discount: self.discount,
            discount_type: self.discount_type.as_str().to_owned(),
            tax_mode: self.tax_mode.as_str().to_owned(),
            tax: self.tax_rate,
            currency: self.currency.clone(),
            pay_plan: i64::from(self.pay_plan.count()),
            p1: self.pay_plan.first_percent(),
            total,
            valid: self.validity_enabled,
            valid_days: self.validity_days,
            pay_to: none_if_empty(&self.pay_to),
            iban: none_if_empty(&self.iban),
            acct: none_if_empty(&self.account),
            signer: none_if_empty(&self.signer_name),
            signer_phone: none_if_empty(&self.signer_phone),
            logo: self.logo.clone(),
            bullets: self.items.clone(),
        }
    }

    /// Re-hydrates a draft from an archived row for editing.
    pub fn from_archive_record(record: &ArchiveRecord) -> Self {
        let pay_plan = if record.pay_plan == 2 {
            PaymentPlan::Split {
                first_percent: clamp_percent(record.p1),
            }
        } else {
            PaymentPlan::Single
        };

        Self {
            remote_id: record.id,
            date: record.date.clone().unwrap_or_default(),
            place: record.place.clone().unwrap_or_default(),
            client: record.client.clone().unwrap_or_default(),
            status: QuoteStatus::parse(&record.status).unwrap_or(QuoteStatus::Active),
            unit_type: record.unit_type.clone().unwrap_or_default(),
            units_count: if record.units_count > 0 {
                record.units_count
            } else {
                1
            },
            subtotal: record.subtotal.max(0.0),
            discount: record.discount.max(0.0),
            discount_type: DiscountType::parse(&record.discount_type)
                .unwrap_or(DiscountType::Amount),
            tax_mode: TaxMode::parse(&record.tax_mode).unwrap_or(TaxMode::Exclusive),
            tax_rate: record.tax.max(0.0),
            pay_plan,
            validity_enabled: record.valid,
            validity_days: if record.valid_days > 0 {
                record.valid_days
            } else {
                DEFAULT_VALIDITY_DAYS
            },
            pay_to: record.pay_to.clone().unwrap_or_default(),
            iban: record.iban.clone().unwrap_or_default(),
            account: record.acct.clone().unwrap_or_default(),
            signer_name: record.signer.clone().unwrap_or_default(),
            signer_phone: record.signer_phone.clone().unwrap_or_default(),
            items: if record.bullets.is_empty() {
                default_checklist()
            } else {
                record.bullets.clone()
            },
            logo: record.logo.clone(),
            currency: if record.currency.trim().is_empty() {
                DEFAULT_CURRENCY.to_owned()
            } else {
                record.currency.clone()
            },
        }
    }
}

/// The serialized draft slot. All fields default so a payload written by an
/// older form (or hand-edited) still loads; field shapes mirror the form
/// inputs, hence the stringly numerics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPayload {
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub unit_type: String,
    #[serde(default)]
    pub units_count: String,
    #[serde(default)]
    pub subtotal: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub discount: String,
    #[serde(default)]
    pub discount_type: String,
    #[serde(default)]
    pub tax_mode: String,
    #[serde(default = "default_tax_field")]
    pub tax: String,
    #[serde(default)]
    pub pay_plan: String,
    #[serde(default)]
    pub p1: String,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub valid_days: String,
    #[serde(default)]
    pub pay_to: String,
    #[serde(default)]
    pub iban: String,
    #[serde(default)]
    pub acct: String,
    #[serde(default)]
    pub signer: String,
    #[serde(default)]
    pub signer_phone: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub logo: String,
}

impl DraftPayload {
    pub fn is_current_version(&self) -> bool {
        self.version == DRAFT_SCHEMA_VERSION
    }
}

fn default_tax_field() -> String {
    format_number(DEFAULT_TAX_RATE)
}

/// One row of the remote archive table. Column names match the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QuoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub units_count: i64,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub discount_type: String,
    #[serde(default)]
    pub tax_mode: String,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub pay_plan: i64,
    #[serde(default)]
    pub p1: f64,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub valid_days: i64,
    #[serde(default)]
    pub pay_to: Option<String>,
    #[serde(default)]
    pub iban: Option<String>,
    #[serde(default)]
    pub acct: Option<String>,
    #[serde(default)]
    pub signer: Option<String>,
    #[serde(default)]
    pub signer_phone: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

fn none_if_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn parse_number(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_non_negative(input: &str) -> f64 {
    parse_number(input).filter(|value| *value >= 0.0).unwrap_or(0.0)
}

fn parse_positive_int(input: &str) -> Option<i64> {
    let value = input.trim().parse::<i64>().ok()?;
    if value > 0 { Some(value) } else { None }
}
