//! # Coupon Repository
//!
//! Coupon definitions and their redemption counters.
//!
//! ## Redemption Flow
//! ```text
//! checkout ──► get_by_code("DIWALI10") ──► Coupon snapshot ──► pricing
//!                                                                │
//!   BEGIN ◄──────────────────────────────────────────────────────┘
//!     ├── redeem("DIWALI10")   guarded: used_count < usage_limit
//!     │        └── 0 rows ──► CouponExhausted, ROLLBACK
//!     └── INSERT order + history
//!   COMMIT
//! ```
//! Redemption and order insert commit together, so a limit can't be
//! overrun by concurrent checkouts.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use emporium_core::{Coupon, CouponKind, Money};

/// Row shape of `coupons`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct CouponRow {
    code: String,
    kind: String,
    percent: Option<i64>,
    max_discount: Option<i64>,
    amount: Option<i64>,
    min_order_amount: i64,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
    usage_limit: Option<i64>,
    used_count: i64,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DbError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let kind = match (row.kind.as_str(), row.percent, row.amount) {
            ("percentage", Some(percent), _) => CouponKind::Percentage {
                percent: percent as u32,
                max_discount: row.max_discount.map(Money::from_minor),
            },
            ("fixed_amount", _, Some(amount)) => CouponKind::FixedAmount {
                amount: Money::from_minor(amount),
            },
            (kind, _, _) => {
                return Err(DbError::InvalidData(format!(
                    "coupon {} has malformed kind '{}'",
                    row.code, kind
                )))
            }
        };

        Ok(Coupon {
            code: row.code,
            kind,
            min_order_amount: Money::from_minor(row.min_order_amount),
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            usage_limit: row.usage_limit.map(|l| l as u32),
            used_count: row.used_count as u32,
        })
    }
}

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Looks a coupon up by code (case-insensitive; codes are stored upper-case).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(
            r#"
            SELECT
                code, kind, percent, max_discount, amount, min_order_amount,
                valid_from, valid_to, usage_limit, used_count
            FROM coupons
            WHERE code = ?1
            "#,
        )
        .bind(code.trim().to_ascii_uppercase())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Stores a new coupon definition.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        coupon.check_definition()?;

        debug!(code = %coupon.code, "Inserting coupon");

        let (kind, percent, max_discount, amount) = match coupon.kind {
            CouponKind::Percentage {
                percent,
                max_discount,
            } => (
                "percentage",
                Some(percent as i64),
                max_discount.map(|m| m.minor()),
                None,
            ),
            CouponKind::FixedAmount { amount } => {
                ("fixed_amount", None, None, Some(amount.minor()))
            }
        };

        sqlx::query(
            r#"
            INSERT INTO coupons (
                code, kind, percent, max_discount, amount, min_order_amount,
                valid_from, valid_to, usage_limit, used_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(coupon.code.to_ascii_uppercase())
        .bind(kind)
        .bind(percent)
        .bind(max_discount)
        .bind(amount)
        .bind(coupon.min_order_amount.minor())
        .bind(coupon.valid_from)
        .bind(coupon.valid_to)
        .bind(coupon.usage_limit.map(|l| l as i64))
        .bind(coupon.used_count as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("coupon code", &coupon.code),
            other => other,
        })?;

        Ok(())
    }
}

/// Records one redemption on `conn`, which is expected to be inside the
/// transaction that persists the order.
///
/// ## Errors
/// * `CouponExhausted` - the usage limit is already reached
/// * `NotFound` - no such coupon
pub(crate) async fn redeem(conn: &mut SqliteConnection, code: &str) -> DbResult<()> {
    let code = code.trim().to_ascii_uppercase();

    let result = sqlx::query(
        r#"
        UPDATE coupons
        SET used_count = used_count + 1
        WHERE code = ?1 AND (usage_limit IS NULL OR used_count < usage_limit)
        "#,
    )
    .bind(&code)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        debug!(code = %code, "Coupon redemption recorded");
        return Ok(());
    }

    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM coupons WHERE code = ?1")
        .bind(&code)
        .fetch_optional(&mut *conn)
        .await?;

    match exists {
        Some(_) => {
            warn!(code = %code, "Coupon usage limit reached during redemption");
            Err(DbError::CouponExhausted { code })
        }
        None => Err(DbError::not_found("Coupon", code)),
    }
}
