//! Admin dashboard aggregations over the orders read model.
//!
//! Days are UTC calendar days.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use domain::{Money, OrderStatus, ProductId};

use crate::views::OrderSummary;

/// Label reported when no product has been sold.
pub const NO_BEST_SELLER: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub orders_today: usize,
    pub delivered_orders: usize,
    pub pending_orders: usize,
    pub cancelled_orders: usize,
    pub today_sales: Money,
    pub yesterday_sales: Money,
    pub this_month_sales: Money,
    pub all_time_sales: Money,

    /// All-time sales divided by the order count, to the cent. Zero without orders.
    pub avg_order_value: Money,

    /// Name snapshot of the product with the highest summed quantity.
    pub best_selling_product: String,
}

/// Orders and sales of one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub orders: usize,
    pub sales: Money,
}

fn sales<'a>(orders: impl Iterator<Item = &'a OrderSummary>) -> Money {
    orders.map(|o| o.total_price).sum()
}

fn day_of(order: &OrderSummary) -> NaiveDate {
    order.created_at.date_naive()
}

/// Computes the dashboard figures as of `now`.
pub fn dashboard_stats(orders: &[OrderSummary], now: DateTime<Utc>) -> DashboardStats {
    let today = now.date_naive();
    let yesterday = today - Days::new(1);

    let count_status =
        |status: OrderStatus| orders.iter().filter(|o| o.status == status).count();

    let all_time_sales = sales(orders.iter());
    let avg_order_value = if orders.is_empty() {
        Money::zero()
    } else {
        let avg = all_time_sales.cents() as f64 / orders.len() as f64;
        Money::from_cents(avg.round() as i64)
    };

    DashboardStats {
        orders_today: orders.iter().filter(|o| day_of(o) == today).count(),
        delivered_orders: count_status(OrderStatus::Delivered),
        pending_orders: orders.iter().filter(|o| o.status.is_pending()).count(),
        cancelled_orders: count_status(OrderStatus::Cancelled),
        today_sales: sales(orders.iter().filter(|o| day_of(o) == today)),
        yesterday_sales: sales(orders.iter().filter(|o| day_of(o) == yesterday)),
        this_month_sales: sales(orders.iter().filter(|o| {
            let day = day_of(o);
            day.year() == today.year() && day.month() == today.month()
        })),
        all_time_sales,
        avg_order_value,
        best_selling_product: best_selling_product(orders),
    }
}

/// Product with the highest total quantity; the first to reach it wins ties.
fn best_selling_product(orders: &[OrderSummary]) -> String {
    let mut oldest_first: Vec<&OrderSummary> = orders.iter().collect();
    oldest_first.sort_by_key(|o| o.created_at);

    let mut totals: Vec<(&ProductId, &str, u64)> = Vec::new();
    for item in oldest_first.iter().flat_map(|o| o.items.iter()) {
        match totals.iter_mut().find(|(id, _, _)| *id == &item.product_id) {
            Some(entry) => entry.2 += u64::from(item.quantity),
            None => totals.push((&item.product_id, item.name.as_str(), u64::from(item.quantity))),
        }
    }

    let mut best: Option<(&str, u64)> = None;
    for (_, name, quantity) in totals {
        if best.is_none_or(|(_, max)| quantity > max) {
            best = Some((name, quantity));
        }
    }

    best.map(|(name, _)| name.to_string())
        .unwrap_or_else(|| NO_BEST_SELLER.to_string())
}

/// Orders and sales for each of the last seven days, oldest first, ending today.
pub fn weekly_trends(orders: &[OrderSummary], now: DateTime<Utc>) -> Vec<DailyTrend> {
    let today = now.date_naive();

    (0..7u64)
        .rev()
        .map(|days_ago| {
            let date = today - Days::new(days_ago);
            let on_day: Vec<_> = orders
                .iter()
                .filter(|o| day_of(o) == date)
                .collect();
            DailyTrend {
                date,
                orders: on_day.len(),
                sales: sales(on_day.into_iter()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use common::AggregateId;
    use domain::{LineItem, PaymentInfo, ShippingAddress, UserId, VendorId};

    fn order(
        created_at: DateTime<Utc>,
        status: OrderStatus,
        items: Vec<LineItem>,
    ) -> OrderSummary {
        let total_price = items.iter().map(LineItem::total_price).sum();
        OrderSummary {
            order_id: AggregateId::new(),
            user_id: UserId::new(),
            vendor_id: VendorId::new(),
            checkout_id: None,
            items,
            shipping_address: ShippingAddress::default(),
            total_price,
            status,
            payment: PaymentInfo::default(),
            created_at,
            paid_at: None,
            delivered_at: None,
            updated_at: created_at,
        }
    }

    fn item(sku: &str, quantity: u32, cents: i64) -> LineItem {
        LineItem::new(sku, format!("Product {sku}"), quantity, Money::from_cents(cents))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_empty_dashboard() {
        let stats = dashboard_stats(&[], now());

        assert_eq!(stats.orders_today, 0);
        assert_eq!(stats.all_time_sales, Money::zero());
        assert_eq!(stats.avg_order_value, Money::zero());
        assert_eq!(stats.best_selling_product, NO_BEST_SELLER);
    }

    #[test]
    fn test_dashboard_buckets_by_day_and_status() {
        let now = now();
        let orders = vec![
            order(now - Duration::hours(1), OrderStatus::Processing, vec![item("a", 2, 1000)]),
            order(now - Duration::hours(14), OrderStatus::Delivered, vec![item("b", 1, 5000)]),
            order(now - Duration::days(1), OrderStatus::Cancelled, vec![item("a", 1, 1000)]),
            order(now - Duration::days(20), OrderStatus::Shipped, vec![item("c", 1, 333)]),
        ];

        let stats = dashboard_stats(&orders, now);

        assert_eq!(stats.orders_today, 2);
        assert_eq!(stats.delivered_orders, 1);
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.cancelled_orders, 1);
        assert_eq!(stats.today_sales.cents(), 7000);
        assert_eq!(stats.yesterday_sales.cents(), 1000);
        assert_eq!(stats.this_month_sales.cents(), 8000);
        assert_eq!(stats.all_time_sales.cents(), 8333);
        assert_eq!(stats.avg_order_value.cents(), 2083);
        assert_eq!(stats.best_selling_product, "Product a");
    }

    #[test]
    fn test_best_seller_tie_goes_to_first_sold() {
        let now = now();
        let orders = vec![
            order(now - Duration::hours(1), OrderStatus::Processing, vec![item("late", 3, 100)]),
            order(now - Duration::hours(5), OrderStatus::Processing, vec![item("early", 3, 100)]),
        ];

        assert_eq!(dashboard_stats(&orders, now).best_selling_product, "Product early");
    }

    #[test]
    fn test_weekly_trends_cover_seven_days_oldest_first() {
        let now = now();
        let orders = vec![
            order(now, OrderStatus::Processing, vec![item("a", 1, 1000)]),
            order(now - Duration::hours(2), OrderStatus::Processing, vec![item("b", 1, 500)]),
            order(now - Duration::days(6), OrderStatus::Delivered, vec![item("c", 2, 100)]),
            order(now - Duration::days(7), OrderStatus::Delivered, vec![item("d", 1, 100)]),
        ];

        let trends = weekly_trends(&orders, now);

        assert_eq!(trends.len(), 7);
        assert_eq!(trends[0].date, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(trends[0].orders, 1);
        assert_eq!(trends[0].sales.cents(), 200);
        assert_eq!(trends[6].date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(trends[6].orders, 2);
        assert_eq!(trends[6].sales.cents(), 1500);
        assert!(trends[1..6].iter().all(|t| t.orders == 0));
    }
}
