//! Normalization of catalog service responses.
//!
//! The catalog returns `response.results` as an array of
//! `{ value, data: { id, slug?, image_url?, price fields } }` records whose
//! field types vary between indexes (ids as numbers or strings, prices as
//! cents or as dollar amounts). Each record is decoded on its own so that one
//! malformed record is dropped instead of failing the whole page.

use std::collections::HashSet;
use std::str::FromStr;

use kicks_core::{ProductId, ProductSummary};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::CatalogError;

/// Shown for products that have no image.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder-product.png";

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    results: Option<Vec<Value>>,
    total_num_results: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    value: Option<Value>,
    #[serde(default)]
    data: RawData,
}

#[derive(Debug, Default, Deserialize)]
struct RawData {
    id: Option<Value>,
    slug: Option<Value>,
    name: Option<Value>,
    image_url: Option<Value>,
    image: Option<Value>,
    lowest_price_cents: Option<Value>,
    price_cents: Option<Value>,
    lowest_price: Option<Value>,
    price: Option<Value>,
}

/// Products decoded from one response body.
#[derive(Debug, Clone)]
pub struct NormalizedResults {
    /// Usable products, in response order, de-duplicated by id.
    pub items: Vec<ProductSummary>,
    pub total_results: Option<u64>,
    /// Number of records in `response.results`, including dropped ones.
    pub returned: usize,
}

/// Decode a catalog response body.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidShape`] if the body is not JSON or has no
/// `response.results` array.
pub fn parse_results(body: &str) -> Result<NormalizedResults, CatalogError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| CatalogError::InvalidShape(e.to_string()))?;

    let response = envelope
        .response
        .ok_or_else(|| CatalogError::InvalidShape("missing `response` object".to_string()))?;
    let results = response
        .results
        .ok_or_else(|| CatalogError::InvalidShape("missing `response.results` array".to_string()))?;

    let returned = results.len();
    let mut seen = HashSet::with_capacity(returned);
    let items = results
        .into_iter()
        .filter_map(normalize_record)
        .filter(|product| seen.insert(product.id.clone()))
        .collect();

    Ok(NormalizedResults {
        items,
        total_results: response.total_num_results.as_ref().and_then(total_from_value),
        returned,
    })
}

/// Turn one raw record into a product, or `None` if it has no usable id.
fn normalize_record(record: Value) -> Option<ProductSummary> {
    let raw: RawResult = match serde_json::from_value(record) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "Dropping undecodable catalog record");
            return None;
        }
    };
    let data = raw.data;

    let Some(id) = data.id.as_ref().and_then(id_from_value) else {
        debug!("Dropping catalog record without id");
        return None;
    };

    let name = text(raw.value.as_ref())
        .or_else(|| text(data.name.as_ref()))
        .unwrap_or_default();

    let slug = text(data.slug.as_ref())
        .or_else(|| non_blank(&slugify(&name)))
        .unwrap_or_else(|| id.as_str().to_owned());

    let image_url = text(data.image_url.as_ref())
        .or_else(|| text(data.image.as_ref()))
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_owned());

    let price_minor_usd = [
        data.lowest_price_cents.as_ref().and_then(cents_from_value),
        data.price_cents.as_ref().and_then(cents_from_value),
        data.lowest_price.as_ref().and_then(dollars_from_value),
        data.price.as_ref().and_then(dollars_from_value),
    ]
    .into_iter()
    .flatten()
    .min();

    Some(ProductSummary {
        id,
        name: if name.is_empty() { slug.clone() } else { name },
        slug,
        image_url,
        price_minor_usd,
    })
}

fn id_from_value(value: &Value) -> Option<ProductId> {
    match value {
        Value::String(s) => ProductId::parse(s).ok(),
        Value::Number(n) => ProductId::parse(&n.to_string()).ok(),
        _ => None,
    }
}

/// A trimmed, non-empty string field. Other JSON types are ignored.
fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).and_then(non_blank)
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_owned())
}

/// A result count, as an integer, integral float or numeric string.
fn total_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .and_then(|f| Decimal::try_from(f).ok())
                .and_then(|d| d.to_u64())
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Lowercase ASCII alphanumerics joined by single dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// An integer cent amount, as a number or numeric string.
fn cents_from_value(value: &Value) -> Option<i64> {
    let cents = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .and_then(|f| Decimal::try_from(f).ok())
                .and_then(|d| d.to_i64())
        })?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (cents >= 0).then_some(cents)
}

/// A dollar amount, as a number or numeric string, converted to cents.
fn dollars_from_value(value: &Value) -> Option<i64> {
    let dollars = match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok()?,
        Value::String(s) => Decimal::from_str(s.trim()).ok()?,
        _ => return None,
    };
    if dollars.is_sign_negative() {
        return None;
    }
    dollars
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}
