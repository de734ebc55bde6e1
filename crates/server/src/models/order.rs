//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use neyisek_core::{Lira, OrderId, OrderStatus, PaymentMethod, ProductId, RestaurantId, UserId};

/// Snapshot of a product at the time it was ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Lira,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderItem {
    /// Price times quantity, or `None` if it does not fit.
    #[must_use]
    pub fn line_total(&self) -> Option<Lira> {
        self.price.checked_mul(self.quantity)
    }

    /// Sum of all line totals, or `None` on overflow.
    #[must_use]
    pub fn subtotal(items: &[Self]) -> Option<Lira> {
        items
            .iter()
            .try_fold(Lira::ZERO, |acc, item| acc.checked_add(item.line_total()?))
    }
}

/// Who placed the order and how to reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A validated order ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub restaurant_id: RestaurantId,
    pub items: Vec<OrderItem>,
    pub customer_info: CustomerInfo,
    pub delivery_address: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub subtotal: Lira,
    pub delivery_fee: Lira,
    pub total_amount: Lira,
}

impl NewOrder {
    /// Turn the request into a stored order with a fresh id.
    #[must_use]
    pub fn into_order(self, now: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::generate(),
            user_id: self.user_id,
            restaurant_id: self.restaurant_id,
            items: self.items,
            status: OrderStatus::Pending,
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total_amount: self.total_amount,
            customer_info: self.customer_info,
            delivery_address: self.delivery_address,
            payment_method: self.payment_method,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub restaurant_id: RestaurantId,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub subtotal: Lira,
    pub delivery_fee: Lira,
    pub total_amount: Lira,
    pub customer_info: CustomerInfo,
    pub delivery_address: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-customer aggregates used for audience segments.
///
/// Cancelled orders are excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerStats {
    pub user_id: UserId,
    pub order_count: u32,
    pub total_spent: Lira,
    pub last_order_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price_kurus: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::new("p1"),
            name: "Lahmacun".to_string(),
            price: Lira::from_kurus(price_kurus),
            quantity,
            notes: None,
        }
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let items = vec![item(6000, 2), item(2500, 1)];
        let subtotal = OrderItem::subtotal(&items).expect("fits");
        assert_eq!(subtotal, Lira::from_kurus(14500));

        let order = NewOrder {
            user_id: None,
            restaurant_id: RestaurantId::new("r1"),
            items,
            customer_info: CustomerInfo {
                name: "Mehmet".to_string(),
                phone: "05550000000".to_string(),
                email: None,
            },
            delivery_address: None,
            payment_method: PaymentMethod::Cash,
            notes: None,
            subtotal,
            delivery_fee: Lira::from_kurus(1500),
            total_amount: Lira::from_kurus(16000),
        };

        let stored = order.into_order(Utc::now());
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(stored.subtotal, Lira::from_kurus(14500));
    }

    #[test]
    fn test_subtotal_overflow_is_none() {
        let huge = OrderItem {
            price: Lira::new(rust_decimal::Decimal::MAX),
            ..item(100, 2)
        };
        assert_eq!(huge.line_total(), None);
        assert_eq!(OrderItem::subtotal(&[huge.clone(), huge]), None);
    }
}
