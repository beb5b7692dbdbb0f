//! Ordered pattern-rule extraction over one page of DDT text.

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::patterns::{CITY_DX, CITY_SX, DOC_NUMBER, QUANTITY, VEHICLE};

/// One of the fixed extraction rules, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    DocNumber,
    City,
    Quantity,
    Vehicle,
}

impl Rule {
    /// Rule name as recorded in failure sets and discard messages.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::DocNumber => "DOC_NUMBER",
            Rule::City => "CITY",
            Rule::Quantity => "QUANTITY",
            Rule::Vehicle => "VEHICLE",
        }
    }
}

/// Raw fields pulled from one page.
///
/// Vehicle and driver are the verbatim upper-cased tokens; similarity
/// resolution against the fleet roster happens afterwards.
#[derive(Debug, Clone, Default)]
pub struct PageFields {
    pub document_number: Option<i64>,
    pub document_genre: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub company_name: Option<String>,
    pub delivery_city: Option<String>,
    pub quantity: Option<i64>,
    /// Always a copy of `document_date`, even when that is unset.
    pub delivery_date: Option<NaiveDate>,
    pub vehicle_token: Option<String>,
    pub driver_token: Option<String>,
}

/// Result of running every rule over one page.
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    pub fields: PageFields,
    /// Rules that failed, in application order.
    pub failed: Vec<Rule>,
}

/// Applies the fixed ordered rule set to page text.
///
/// Rules run independently and unconditionally; only the city rule has
/// an internal fallback. Multiple failures accumulate.
#[derive(Debug, Default)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> PageExtraction {
        let mut out = PageExtraction::default();

        self.extract_doc_number(text, &mut out);
        self.extract_city(text, &mut out);
        self.extract_quantity(text, &mut out);

        // Delivery date duplicates the document date by design; this is
        // not a rule and cannot fail.
        out.fields.delivery_date = out.fields.document_date;

        self.extract_vehicle(text, &mut out);

        out
    }

    fn extract_doc_number(&self, text: &str, out: &mut PageExtraction) {
        let parsed = DOC_NUMBER.captures(text).and_then(|caps| {
            let number: i64 = caps[1].replace('.', "").parse().ok()?;
            let genre = caps[2].to_uppercase();
            let date = NaiveDate::parse_from_str(&caps[3], "%d/%m/%Y").ok()?;
            Some((number, genre, date))
        });

        match parsed {
            Some((number, genre, date)) => {
                debug!("DOC_NUMBER matched: {number}/{genre} of {date}");
                out.fields.document_number = Some(number);
                out.fields.document_genre = Some(genre);
                out.fields.document_date = Some(date);
            }
            None => {
                warn!("DOC_NUMBER rule failed");
                out.failed.push(Rule::DocNumber);
            }
        }
    }

    fn extract_city(&self, text: &str, out: &mut PageExtraction) {
        // Right-hand delivery block first, left-hand departure block as
        // fallback; the rule fails only when both miss.
        let caps = CITY_DX.captures(text).or_else(|| {
            debug!("CITY_DX missed, falling back to CITY_SX");
            CITY_SX.captures(text)
        });

        match caps {
            Some(caps) => {
                let company = caps[1].to_uppercase().trim().to_string();
                let city = caps[2].to_uppercase().trim().to_string();
                debug!("CITY matched: {company} in {city}");
                out.fields.company_name = Some(company);
                out.fields.delivery_city = Some(city);
            }
            None => {
                warn!("CITY rule failed on both blocks");
                out.failed.push(Rule::City);
            }
        }
    }

    fn extract_quantity(&self, text: &str, out: &mut PageExtraction) {
        let quantity = QUANTITY
            .captures(text)
            .and_then(|caps| caps[1].replace('.', "").parse::<i64>().ok());

        match quantity {
            Some(quantity) => {
                debug!("QUANTITY matched: {quantity}");
                out.fields.quantity = Some(quantity);
            }
            None => {
                warn!("QUANTITY rule failed");
                out.failed.push(Rule::Quantity);
            }
        }
    }

    fn extract_vehicle(&self, text: &str, out: &mut PageExtraction) {
        match VEHICLE.captures(text) {
            Some(caps) => {
                let vehicle = caps[1].to_uppercase();
                let driver = caps.get(2).map(|m| m.as_str().to_uppercase());
                debug!("VEHICLE matched: {vehicle} ({driver:?})");
                out.fields.vehicle_token = Some(vehicle);
                out.fields.driver_token = driver;
            }
            None => {
                warn!("VEHICLE rule failed");
                out.failed.push(Rule::Vehicle);
            }
        }
    }
}
