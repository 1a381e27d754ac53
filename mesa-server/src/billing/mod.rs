//! 账单计算 (Billing Calculator)
//!
//! Tax, service charge and bill generation. Uses rust_decimal for precise
//! calculations, stores as f64; every intermediate amount is rounded to 2
//! decimal places half-up before the next step, so the printed breakdown
//! always adds up to the printed total.
//!
//! Rates enter explicitly through [`BillingConfig`] — a generated bill
//! freezes its numbers and never re-derives them when rates change later.

use chrono::TimeZone;
use chrono_tz::Tz;
use rust_decimal::prelude::*;
use sqlx::SqlitePool;
use tracing::info;

use shared::models::{
    Bill, BillCreate, BillDetail, BillStatus, OrderStatus, PaymentStatus,
};

use crate::db::repository::{bill, order};
use crate::utils::{AppError, AppResult};

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// 账单费率配置
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// 增值税率 (0.10 = 10%)
    pub vat_rate: f64,
    /// 服务费率 (0.05 = 5%)
    pub service_rate: f64,
    /// 服务费上限
    pub service_cap: f64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            vat_rate: 0.10,
            service_rate: 0.05,
            service_cap: 100.00,
        }
    }
}

/// Convert f64 to Decimal for calculation
#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Round a monetary amount to 2 decimal places, half-up
pub fn round_money(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// unit_price × quantity, rounded — the cart's line-total rule
pub fn line_total(unit_price: f64, quantity: i32) -> f64 {
    to_f64(to_decimal(unit_price) * Decimal::from(quantity))
}

/// Full charge breakdown for a subtotal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeBreakdown {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub service_charge: f64,
    pub discount_amount: f64,
    pub total_amount: f64,
}

impl BillingConfig {
    /// Tax on a subtotal
    pub fn tax_amount(&self, subtotal: f64) -> f64 {
        to_f64(to_decimal(subtotal) * to_decimal(self.vat_rate))
    }

    /// Service charge on a subtotal, capped
    pub fn service_charge(&self, subtotal: f64) -> f64 {
        let charge = to_decimal(subtotal) * to_decimal(self.service_rate);
        let capped = charge.min(to_decimal(self.service_cap));
        to_f64(capped)
    }

    /// subtotal + tax + service − discount, never below zero.
    ///
    /// Tax and service are each rounded before summing, so the breakdown
    /// printed on the receipt reconciles with the total.
    pub fn breakdown(&self, subtotal: f64, discount_amount: f64) -> ChargeBreakdown {
        let subtotal = round_money(subtotal);
        let tax_amount = self.tax_amount(subtotal);
        let service_charge = self.service_charge(subtotal);
        let discount_amount = round_money(discount_amount.max(0.0));

        let total = to_decimal(subtotal) + to_decimal(tax_amount) + to_decimal(service_charge)
            - to_decimal(discount_amount);
        ChargeBreakdown {
            subtotal,
            tax_amount,
            service_charge,
            discount_amount,
            total_amount: to_f64(total.max(Decimal::ZERO)),
        }
    }
}

/// "B<yyyymmdd>-<snowflake>" — date in the business timezone, sortable and
/// globally unique without a counter table.
pub fn bill_number(tz: Tz, now_millis: i64, id: i64) -> String {
    let date = match tz.timestamp_millis_opt(now_millis) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.format("%Y%m%d").to_string()
        }
        chrono::LocalResult::None => "00000000".into(),
    };
    format!("B{date}-{id}")
}

/// Generate a bill from a closed order.
///
/// The bill snapshots the order's lines and recomputes the breakdown from
/// the frozen subtotal (an extra discount may be applied here). At most
/// one bill per order — a second request gets a `Conflict`.
pub async fn generate_bill(
    pool: &SqlitePool,
    config: &BillingConfig,
    tz: Tz,
    req: BillCreate,
) -> AppResult<BillDetail> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let src = order::find_by_id(&mut *tx, req.order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", req.order_id)))?;
    if src.status != OrderStatus::Closed {
        return Err(AppError::validation(format!(
            "Order {} is not closed (status {:?})",
            src.id, src.status
        )));
    }
    if bill::find_by_order(&mut *tx, src.id).await?.is_some() {
        return Err(AppError::conflict(format!(
            "Order {} already has a bill",
            src.id
        )));
    }

    let discount = req.discount_amount.unwrap_or(src.discount_amount);
    let breakdown = config.breakdown(src.subtotal, discount);

    let id = shared::util::snowflake_id();
    let new_bill = Bill {
        id,
        bill_number: bill_number(tz, now, id),
        order_id: Some(src.id),
        customer_name: req.customer_name.clone(),
        subtotal: breakdown.subtotal,
        tax_amount: breakdown.tax_amount,
        service_charge: breakdown.service_charge,
        discount_amount: breakdown.discount_amount,
        total_amount: breakdown.total_amount,
        payment_status: PaymentStatus::Pending,
        bill_status: BillStatus::Completed,
        created_at: now,
    };
    bill::insert(&mut *tx, &new_bill).await?;

    let items = order::items_for_order(&mut *tx, src.id).await?;
    for item in &items {
        bill::insert_line(
            &mut *tx,
            id,
            &item.item_name,
            item.unit_price,
            item.quantity,
            item.line_total,
        )
        .await?;
    }
    tx.commit().await?;

    info!(
        bill_number = %new_bill.bill_number,
        order_id = src.id,
        total = breakdown.total_amount,
        "Bill generated"
    );

    let lines = bill::lines_for_bill(pool, id).await?;
    Ok(BillDetail { bill: new_bill, lines })
}

pub async fn get_bill(pool: &SqlitePool, bill_id: i64) -> AppResult<BillDetail> {
    let b = bill::find_by_id(pool, bill_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Bill {bill_id} not found")))?;
    let lines = bill::lines_for_bill(pool, bill_id).await?;
    Ok(BillDetail { bill: b, lines })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_breakdown() {
        // ¥100 → tax ¥10, service ¥5, total ¥115
        let config = BillingConfig::default();
        let b = config.breakdown(100.0, 0.0);
        assert_eq!(b.tax_amount, 10.0);
        assert_eq!(b.service_charge, 5.0);
        assert_eq!(b.total_amount, 115.0);
    }

    #[test]
    fn service_charge_is_capped() {
        // ¥3000 → service would be ¥150, capped at ¥100
        let config = BillingConfig::default();
        let b = config.breakdown(3000.0, 0.0);
        assert_eq!(b.tax_amount, 300.0);
        assert_eq!(b.service_charge, 100.0);
        assert_eq!(b.total_amount, 3400.0);
    }

    #[test]
    fn discount_reduces_total_but_never_below_zero() {
        let config = BillingConfig::default();
        let b = config.breakdown(100.0, 15.0);
        assert_eq!(b.total_amount, 100.0);

        let b = config.breakdown(10.0, 500.0);
        assert_eq!(b.total_amount, 0.0);
    }

    #[test]
    fn intermediate_rounding_reconciles() {
        // tax and service each round half-up before summing
        let config = BillingConfig::default();
        let b = config.breakdown(10.05, 0.0);
        // 10.05 * 0.10 = 1.005 → 1.01 (half-up)
        assert_eq!(b.tax_amount, 1.01);
        // 10.05 * 0.05 = 0.5025 → 0.50
        assert_eq!(b.service_charge, 0.50);
        assert_eq!(b.total_amount, 11.56);
    }

    #[test]
    fn line_total_rounds_half_up() {
        assert_eq!(line_total(3.335, 2), 6.67);
        assert_eq!(line_total(9.99, 3), 29.97);
    }

    #[test]
    fn bill_number_shape() {
        let tz: Tz = "Asia/Shanghai".parse().unwrap();
        // 2024-06-01 00:30 UTC = 2024-06-01 08:30 in Shanghai
        let millis = 1_717_201_800_000;
        let n = bill_number(tz, millis, 42);
        assert_eq!(n, "B20240601-42");
    }

    mod db {
        use super::*;
        use crate::db::DbService;
        use crate::db::repository::dining_table;
        use shared::models::DiningTableCreate;

        async fn closed_order(pool: &SqlitePool, subtotal: f64) -> i64 {
            let table = dining_table::create(
                pool,
                DiningTableCreate {
                    section: "A".into(),
                    table_number: 1,
                    capacity: None,
                },
            )
            .await
            .unwrap();
            let order_id = order::create_empty(pool, table.id).await.unwrap();
            order::insert_line(pool, order_id, Some(1), None, "Noodles", subtotal, 1, subtotal)
                .await
                .unwrap();
            order::set_subtotal(pool, order_id, subtotal, shared::util::now_millis())
                .await
                .unwrap();
            let config = BillingConfig::default();
            let b = config.breakdown(subtotal, 0.0);
            order::close_with_totals(
                pool,
                order_id,
                b.tax_amount,
                b.service_charge,
                0.0,
                b.total_amount,
                shared::util::now_millis(),
            )
            .await
            .unwrap();
            order_id
        }

        #[tokio::test]
        async fn generates_bill_with_snapshot_lines() {
            let pool = DbService::new_in_memory().await.unwrap().pool;
            let order_id = closed_order(&pool, 100.0).await;

            let detail = generate_bill(
                &pool,
                &BillingConfig::default(),
                chrono_tz::UTC,
                BillCreate {
                    order_id,
                    discount_amount: None,
                    customer_name: Some("Ana".into()),
                },
            )
            .await
            .unwrap();

            assert_eq!(detail.bill.subtotal, 100.0);
            assert_eq!(detail.bill.total_amount, 115.0);
            assert_eq!(detail.bill.payment_status, PaymentStatus::Pending);
            assert!(detail.bill.bill_number.starts_with('B'));
            assert_eq!(detail.lines.len(), 1);
            assert_eq!(detail.lines[0].item_name, "Noodles");
        }

        #[tokio::test]
        async fn second_bill_for_same_order_conflicts() {
            let pool = DbService::new_in_memory().await.unwrap().pool;
            let order_id = closed_order(&pool, 50.0).await;
            let req = BillCreate {
                order_id,
                discount_amount: None,
                customer_name: None,
            };

            generate_bill(&pool, &BillingConfig::default(), chrono_tz::UTC, req.clone())
                .await
                .unwrap();
            let err = generate_bill(&pool, &BillingConfig::default(), chrono_tz::UTC, req)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
        }

        #[tokio::test]
        async fn open_order_cannot_be_billed() {
            let pool = DbService::new_in_memory().await.unwrap().pool;
            let table = dining_table::create(
                &pool,
                DiningTableCreate {
                    section: "B".into(),
                    table_number: 1,
                    capacity: None,
                },
            )
            .await
            .unwrap();
            let order_id = order::create_empty(&pool, table.id).await.unwrap();

            let err = generate_bill(
                &pool,
                &BillingConfig::default(),
                chrono_tz::UTC,
                BillCreate {
                    order_id,
                    discount_amount: None,
                    customer_name: None,
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }
}
