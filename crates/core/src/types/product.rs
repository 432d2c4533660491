//! Normalized product record shown in listing views.

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A product as shown in a listing grid, regardless of the source shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Opaque, source-stable identifier.
    pub id: ProductId,
    /// Routing key for the product page. Never empty.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Primary image, or a placeholder path.
    pub image_url: String,
    /// Lowest known price in USD cents. `None` means no price is available,
    /// which is distinct from a price of zero.
    pub price_minor_usd: Option<i64>,
}
