//! Vendor partitioning of a multi-vendor cart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::{LineItem, Money, ProductId, VendorId};

/// Errors raised while validating a cart.
///
/// `index` is the zero-based position of the offending line in the cart.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Cart is empty")]
    Empty,

    #[error("Item {index} has no vendor")]
    MissingVendor { index: usize },

    #[error("Item {index} has an invalid vendor id: {value}")]
    MalformedVendor { index: usize, value: String },

    #[error("Item {index} references an unknown vendor: {vendor_id}")]
    UnknownVendor { index: usize, vendor_id: VendorId },

    #[error("Item {index} must have a quantity of at least 1")]
    InvalidQuantity { index: usize },

    #[error("Item {index} must not have a negative price")]
    InvalidPrice { index: usize },
}

/// One line of a submitted cart, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Vendor id as submitted; validated by [`partition_by_vendor`].
    pub vendor_id: Option<String>,
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl CartLine {
    pub fn new(
        vendor_id: impl Into<String>,
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        Self {
            vendor_id: Some(vendor_id.into()),
            product_id: product_id.into(),
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> Money {
        self.unit_price
            .multiply(u32::try_from(self.quantity).unwrap_or_default())
    }
}

/// The items of one vendor within a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorGroup {
    pub vendor_id: VendorId,
    pub items: Vec<LineItem>,

    /// Σ(unit_price × quantity) over this group's items.
    pub subtotal: Money,
}

/// Groups cart lines by vendor.
///
/// Groups appear in the order their vendor first appears in the cart and
/// keep the relative order of their items. The whole cart is validated
/// before any grouping, so one bad line rejects every line.
pub fn partition_by_vendor(lines: &[CartLine]) -> Result<Vec<VendorGroup>, CartError> {
    if lines.is_empty() {
        return Err(CartError::Empty);
    }

    let mut validated = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        let raw = line
            .vendor_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(CartError::MissingVendor { index })?;

        let vendor_id: VendorId = raw.parse().map_err(|_| CartError::MalformedVendor {
            index,
            value: raw.to_string(),
        })?;

        let quantity = u32::try_from(line.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(CartError::InvalidQuantity { index })?;

        if line.unit_price.is_negative() {
            return Err(CartError::InvalidPrice { index });
        }

        validated.push((
            vendor_id,
            LineItem::new(
                line.product_id.clone(),
                line.name.clone(),
                quantity,
                line.unit_price,
            ),
        ));
    }

    let mut groups: Vec<VendorGroup> = Vec::new();
    for (vendor_id, item) in validated {
        let subtotal = item.total_price();
        match groups.iter_mut().find(|g| g.vendor_id == vendor_id) {
            Some(group) => {
                group.subtotal += subtotal;
                group.items.push(item);
            }
            None => groups.push(VendorGroup {
                vendor_id,
                items: vec![item],
                subtotal,
            }),
        }
    }

    Ok(groups)
}
