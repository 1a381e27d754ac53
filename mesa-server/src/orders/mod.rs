//! 订单购物车 (Order Cart)
//!
//! Each occupied table has at most one active (non-terminal) order acting
//! as its cart. Lines snapshot the catalog name and price at add time;
//! adding the same product or menu again merges into the existing line.
//! Every mutation recomputes the order subtotal inside the same
//! transaction, so the stored subtotal always equals the sum of its lines.

use rust_decimal::prelude::*;
use sqlx::{Sqlite, SqlitePool};
use tracing::info;

use shared::models::{Order, OrderAddLine, OrderDetail, OrderLineUpdate};

use crate::billing::{self, BillingConfig};
use crate::db::repository::{catalog, dining_table, order};
use crate::utils::{AppError, AppResult};

/// Name + price snapshot resolved from the catalog at add time
struct ItemSnapshot {
    name: String,
    price: f64,
}

async fn resolve_item<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    product_id: Option<i64>,
    menu_id: Option<i64>,
) -> AppResult<ItemSnapshot> {
    match (product_id, menu_id) {
        (Some(id), None) => {
            let p = catalog::find_product(executor, id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))?;
            if !p.is_available {
                return Err(AppError::item_unavailable(format!(
                    "Product '{}' is unavailable",
                    p.name
                )));
            }
            Ok(ItemSnapshot { name: p.name, price: p.price })
        }
        (None, Some(id)) => {
            let m = catalog::find_menu(executor, id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Menu {id} not found")))?;
            if !m.is_available {
                return Err(AppError::item_unavailable(format!(
                    "Menu '{}' is unavailable",
                    m.name
                )));
            }
            Ok(ItemSnapshot { name: m.name, price: m.price })
        }
        _ => Err(AppError::validation(
            "Exactly one of product_id / menu_id must be set",
        )),
    }
}

/// Recompute and store the order subtotal from its lines
async fn refresh_subtotal(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    order_id: i64,
    now: i64,
) -> AppResult<()> {
    let items = order::items_for_order(&mut **tx, order_id).await?;
    let sum = items
        .iter()
        .fold(Decimal::ZERO, |acc, i| {
            acc + Decimal::from_f64(i.line_total).unwrap_or_default()
        });
    let subtotal = billing::round_money(sum.to_f64().unwrap_or_default());
    order::set_subtotal(&mut **tx, order_id, subtotal, now).await?;
    Ok(())
}

async fn detail(pool: &SqlitePool, order_id: i64) -> AppResult<OrderDetail> {
    let o = order::find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {order_id} not found")))?;
    let items = order::items_for_order(pool, order_id).await?;
    Ok(OrderDetail { order: o, items })
}

/// The table's active order with its lines, if any
pub async fn active_order_for_table(
    pool: &SqlitePool,
    table_id: i64,
) -> AppResult<Option<OrderDetail>> {
    match order::find_active_for_table(pool, table_id).await? {
        Some(o) => {
            let items = order::items_for_order(pool, o.id).await?;
            Ok(Some(OrderDetail { order: o, items }))
        }
        None => Ok(None),
    }
}

pub async fn get_order(pool: &SqlitePool, order_id: i64) -> AppResult<OrderDetail> {
    detail(pool, order_id).await
}

/// Add an item to the table's cart, creating the order if none is active.
///
/// Lookup-or-create and the line merge run in one transaction; that is
/// what keeps "at most one active order per table" true under concurrent
/// adds.
pub async fn add_line(pool: &SqlitePool, req: OrderAddLine) -> AppResult<OrderDetail> {
    if req.quantity <= 0 {
        return Err(AppError::validation("Quantity must be positive"));
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let table = dining_table::find_by_id(&mut *tx, req.table_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {} not found", req.table_id)))?;
    if !table.is_occupied {
        return Err(AppError::conflict(format!(
            "Table {} has no seated party",
            table.name
        )));
    }

    let order_id = match order::find_active_for_table(&mut *tx, req.table_id).await? {
        Some(o) => o.id,
        None => {
            let id = order::create_empty(&mut *tx, req.table_id).await?;
            info!(table = %table.name, order_id = id, "Order opened");
            id
        }
    };

    let snapshot = resolve_item(&mut *tx, req.product_id, req.menu_id).await?;

    match order::find_matching_line(&mut *tx, order_id, req.product_id, req.menu_id).await? {
        Some(line) => {
            let quantity = line.quantity + req.quantity;
            // The merged line keeps its original price snapshot
            let total = billing::line_total(line.unit_price, quantity);
            order::set_line_quantity(&mut *tx, line.id, quantity, total).await?;
        }
        None => {
            let total = billing::line_total(snapshot.price, req.quantity);
            order::insert_line(
                &mut *tx,
                order_id,
                req.product_id,
                req.menu_id,
                &snapshot.name,
                snapshot.price,
                req.quantity,
                total,
            )
            .await?;
        }
    }

    refresh_subtotal(&mut tx, order_id, now).await?;
    tx.commit().await?;

    detail(pool, order_id).await
}

/// Change a line's quantity; zero removes the line.
pub async fn update_line(
    pool: &SqlitePool,
    line_id: i64,
    req: OrderLineUpdate,
) -> AppResult<OrderDetail> {
    if req.quantity < 0 {
        return Err(AppError::validation("Quantity cannot be negative"));
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let line = order::find_item_by_id(&mut *tx, line_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order line {line_id} not found")))?;
    let o = order::find_by_id(&mut *tx, line.order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", line.order_id)))?;
    if o.status.is_terminal() {
        return Err(AppError::conflict(format!(
            "Order {} is {:?} and can no longer change",
            o.id, o.status
        )));
    }

    if req.quantity == 0 {
        order::delete_line(&mut *tx, line_id).await?;
    } else {
        let total = billing::line_total(line.unit_price, req.quantity);
        order::set_line_quantity(&mut *tx, line_id, req.quantity, total).await?;
    }

    refresh_subtotal(&mut tx, line.order_id, now).await?;
    tx.commit().await?;

    detail(pool, line.order_id).await
}

/// Close the order: freeze tax/service/total from the current subtotal and
/// release the table. A closed order is immutable; billing reads from it.
pub async fn close_order(
    pool: &SqlitePool,
    config: &BillingConfig,
    order_id: i64,
) -> AppResult<OrderDetail> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let o: Order = order::find_by_id(&mut *tx, order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {order_id} not found")))?;

    let breakdown = config.breakdown(o.subtotal, o.discount_amount);
    let closed = order::close_with_totals(
        &mut *tx,
        order_id,
        breakdown.tax_amount,
        breakdown.service_charge,
        breakdown.discount_amount,
        breakdown.total_amount,
        now,
    )
    .await?;
    if !closed {
        return Err(AppError::conflict(format!(
            "Order {} is already {:?}",
            order_id, o.status
        )));
    }

    // Closing the active order releases its table
    dining_table::clear_occupancy(&mut *tx, o.table_id, now).await?;
    tx.commit().await?;

    info!(order_id, total = breakdown.total_amount, "Order closed");
    detail(pool, order_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::seating;
    use shared::models::{DiningTableCreate, OrderStatus, SeatCustomer};

    async fn setup() -> (SqlitePool, i64) {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let table = dining_table::create(
            &pool,
            DiningTableCreate {
                section: "A".into(),
                table_number: 1,
                capacity: None,
            },
        )
        .await
        .unwrap();
        seating::seat_customer(&pool, table.id, SeatCustomer::default())
            .await
            .unwrap();
        (pool, table.id)
    }

    #[tokio::test]
    async fn add_creates_order_and_merges_lines() {
        let (pool, table_id) = setup().await;
        let p = catalog::create_product(&pool, "Noodles", 12.50, None).await.unwrap();

        let d1 = add_line(
            &pool,
            OrderAddLine {
                table_id,
                product_id: Some(p.id),
                menu_id: None,
                quantity: 2,
            },
        )
        .await
        .unwrap();
        assert_eq!(d1.items.len(), 1);
        assert_eq!(d1.order.subtotal, 25.0);

        // Same product again merges, no second line
        let d2 = add_line(
            &pool,
            OrderAddLine {
                table_id,
                product_id: Some(p.id),
                menu_id: None,
                quantity: 1,
            },
        )
        .await
        .unwrap();
        assert_eq!(d2.order.id, d1.order.id);
        assert_eq!(d2.items.len(), 1);
        assert_eq!(d2.items[0].quantity, 3);
        assert_eq!(d2.order.subtotal, 37.5);
    }

    #[tokio::test]
    async fn product_and_menu_lines_stay_separate() {
        let (pool, table_id) = setup().await;
        let p = catalog::create_product(&pool, "Tea", 3.0, None).await.unwrap();
        let m = catalog::create_menu(&pool, "Lunch Set", 18.0, None).await.unwrap();

        add_line(
            &pool,
            OrderAddLine { table_id, product_id: Some(p.id), menu_id: None, quantity: 1 },
        )
        .await
        .unwrap();
        let d = add_line(
            &pool,
            OrderAddLine { table_id, product_id: None, menu_id: Some(m.id), quantity: 1 },
        )
        .await
        .unwrap();

        assert_eq!(d.items.len(), 2);
        assert_eq!(d.order.subtotal, 21.0);
    }

    #[tokio::test]
    async fn unavailable_item_is_refused() {
        let (pool, table_id) = setup().await;
        let p = catalog::create_product(&pool, "Soup", 6.0, None).await.unwrap();
        catalog::set_product_availability(&pool, p.id, false).await.unwrap();

        let err = add_line(
            &pool,
            OrderAddLine { table_id, product_id: Some(p.id), menu_id: None, quantity: 1 },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::ItemUnavailable(_)));

        // No cart was left behind
        assert!(active_order_for_table(&pool, table_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn neither_or_both_ids_is_invalid() {
        let (pool, table_id) = setup().await;
        let err = add_line(
            &pool,
            OrderAddLine { table_id, product_id: None, menu_id: None, quantity: 1 },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = add_line(
            &pool,
            OrderAddLine { table_id, product_id: Some(1), menu_id: Some(2), quantity: 1 },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn vacant_table_cannot_order() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let table = dining_table::create(
            &pool,
            DiningTableCreate { section: "C".into(), table_number: 9, capacity: None },
        )
        .await
        .unwrap();

        let err = add_line(
            &pool,
            OrderAddLine { table_id: table.id, product_id: Some(1), menu_id: None, quantity: 1 },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn zero_quantity_removes_line() {
        let (pool, table_id) = setup().await;
        let p = catalog::create_product(&pool, "Rice", 2.0, None).await.unwrap();
        let d = add_line(
            &pool,
            OrderAddLine { table_id, product_id: Some(p.id), menu_id: None, quantity: 2 },
        )
        .await
        .unwrap();

        let d = update_line(&pool, d.items[0].id, OrderLineUpdate { quantity: 0 })
            .await
            .unwrap();
        assert!(d.items.is_empty());
        assert_eq!(d.order.subtotal, 0.0);
    }

    #[tokio::test]
    async fn close_freezes_totals_and_releases_table() {
        let (pool, table_id) = setup().await;
        let p = catalog::create_product(&pool, "Steak", 100.0, None).await.unwrap();
        let d = add_line(
            &pool,
            OrderAddLine { table_id, product_id: Some(p.id), menu_id: None, quantity: 1 },
        )
        .await
        .unwrap();

        let closed = close_order(&pool, &BillingConfig::default(), d.order.id)
            .await
            .unwrap();
        assert_eq!(closed.order.status, OrderStatus::Closed);
        assert_eq!(closed.order.tax_amount, 10.0);
        assert_eq!(closed.order.service_charge, 5.0);
        assert_eq!(closed.order.total_amount, 115.0);

        let table = dining_table::find_by_id(&pool, table_id).await.unwrap().unwrap();
        assert!(!table.is_occupied);

        // Closed order is immutable
        let err = update_line(&pool, closed.items[0].id, OrderLineUpdate { quantity: 5 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = close_order(&pool, &BillingConfig::default(), d.order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
