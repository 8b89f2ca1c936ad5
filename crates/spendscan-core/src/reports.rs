//! Month-scoped spend aggregation and budget reporting
//!
//! Every aggregate here sums only settled transactions (`confirmed` or
//! `corrected`); in-flight and errored rows never count toward spend.
//! All date math is calendar-month scoped on the receipt date.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use rusqlite::params;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    BudgetLine, CategorySpend, DashboardSummary, MonthlyTrend, TopVendor, Transaction,
    TransactionList,
};

/// Statuses whose amounts count toward spend
const SETTLED: &str = "('confirmed', 'corrected')";

/// Resolve a "YYYY-MM" month into its inclusive first and last day
pub fn month_bounds(month: &str) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || Error::Validation(format!("invalid month (expected YYYY-MM): {}", month));

    if month.len() != 7 || month.as_bytes()[4] != b'-' {
        return Err(invalid());
    }
    let first =
        NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").map_err(|_| invalid())?;

    let (y, m) = (first.year(), first.month());
    let next_first = if m == 12 {
        NaiveDate::from_ymd_opt(y + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(y, m + 1, 1)
    }
    .ok_or_else(|| Error::Invariant(format!("month arithmetic overflow for {}", month)))?;
    let last = next_first
        .pred_opt()
        .ok_or_else(|| Error::Invariant(format!("month arithmetic overflow for {}", month)))?;

    Ok((first, last))
}

/// The month immediately before (year, month)
fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Read-side reporting over settled transactions
#[derive(Clone)]
pub struct SpendReports {
    db: Database,
}

impl SpendReports {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Spend per category for one month, highest spend first
    pub fn spend_by_category(&self, owner_id: &str, month: &str) -> Result<Vec<CategorySpend>> {
        let (from, to) = month_bounds(month)?;
        let conn = self.db.conn()?;
        let sql = format!(
            "SELECT t.category_id, c.name, SUM(t.amount_cents), COUNT(*)
             FROM transactions t
             JOIN categories c ON c.id = t.category_id
             WHERE t.owner_id = ? AND t.status IN {} AND t.date BETWEEN ? AND ?
             GROUP BY t.category_id, c.name
             ORDER BY SUM(t.amount_cents) DESC, c.name ASC",
            SETTLED
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![owner_id, from.to_string(), to.to_string()],
                |row| {
                    Ok(CategorySpend {
                        category_id: row.get(0)?,
                        category_name: row.get(1)?,
                        spent_cents: row.get(2)?,
                        transaction_count: row.get(3)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Budget-vs-spend table for one month.
    ///
    /// The month's budget record wins; a category's default monthly
    /// budget fills in when no record exists. Categories with neither
    /// budget nor spend are omitted. `remaining_cents` goes negative on
    /// overspend rather than clamping.
    pub fn budget_vs_spend(&self, owner_id: &str, month: &str) -> Result<Vec<BudgetLine>> {
        let spends: HashMap<i64, CategorySpend> = self
            .spend_by_category(owner_id, month)?
            .into_iter()
            .map(|s| (s.category_id, s))
            .collect();
        let month_budgets: HashMap<i64, i64> = self
            .db
            .list_budgets_for_month(owner_id, month)?
            .into_iter()
            .map(|b| (b.category_id, b.budget_cents))
            .collect();

        let mut lines = Vec::new();
        for category in self.db.list_categories(owner_id)? {
            let budget_cents = month_budgets
                .get(&category.id)
                .copied()
                .or(category.monthly_budget_cents)
                .unwrap_or(0);
            let spent_cents = spends.get(&category.id).map(|s| s.spent_cents).unwrap_or(0);
            if budget_cents == 0 && spent_cents == 0 {
                continue;
            }

            let percentage_used = if budget_cents > 0 {
                Some(spent_cents as f64 / budget_cents as f64 * 100.0)
            } else {
                None
            };
            lines.push(BudgetLine {
                category_id: category.id,
                category_name: category.name,
                budget_cents,
                spent_cents,
                remaining_cents: budget_cents - spent_cents,
                percentage_used,
            });
        }

        lines.sort_by(|a, b| {
            b.spent_cents
                .cmp(&a.spent_cents)
                .then_with(|| a.category_name.cmp(&b.category_name))
        });
        Ok(lines)
    }

    /// Vendors ranked by monthly spend. Ties break by transaction count,
    /// then vendor name, so the ordering is stable.
    pub fn top_vendors(&self, owner_id: &str, month: &str, limit: i64) -> Result<Vec<TopVendor>> {
        let (from, to) = month_bounds(month)?;
        let conn = self.db.conn()?;
        let sql = format!(
            "SELECT vendor, SUM(amount_cents), COUNT(*)
             FROM transactions
             WHERE owner_id = ? AND status IN {} AND date BETWEEN ? AND ?
               AND vendor IS NOT NULL AND vendor != ''
             GROUP BY vendor
             ORDER BY SUM(amount_cents) DESC, COUNT(*) DESC, vendor ASC
             LIMIT ?",
            SETTLED
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![owner_id, from.to_string(), to.to_string(), limit],
                |row| {
                    Ok(TopVendor {
                        vendor: row.get(0)?,
                        amount_cents: row.get(1)?,
                        transaction_count: row.get(2)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Spend totals for the `months` calendar months ending at
    /// `end_month`, oldest first. Months with no settled spend appear
    /// with a zero total. The first month carries no delta; a zero
    /// prior month yields no percentage.
    pub fn monthly_trends(
        &self,
        owner_id: &str,
        end_month: &str,
        months: u32,
    ) -> Result<Vec<MonthlyTrend>> {
        if months == 0 {
            return Err(Error::Validation("trend window must cover at least one month".to_string()));
        }
        let (end_first, end_last) = month_bounds(end_month)?;

        // Month keys oldest -> newest
        let mut keys = Vec::with_capacity(months as usize);
        let (mut y, mut m) = (end_first.year(), end_first.month());
        for _ in 0..months {
            keys.push(format!("{:04}-{:02}", y, m));
            (y, m) = prev_month(y, m);
        }
        keys.reverse();

        let range_first = NaiveDate::parse_from_str(&format!("{}-01", keys[0]), "%Y-%m-%d")
            .map_err(|_| Error::Invariant(format!("bad month key {}", keys[0])))?;

        let conn = self.db.conn()?;
        let sql = format!(
            "SELECT substr(date, 1, 7), SUM(amount_cents)
             FROM transactions
             WHERE owner_id = ? AND status IN {} AND date BETWEEN ? AND ?
             GROUP BY substr(date, 1, 7)",
            SETTLED
        );
        let mut stmt = conn.prepare(&sql)?;
        let totals: HashMap<String, i64> = stmt
            .query_map(
                params![owner_id, range_first.to_string(), end_last.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;

        let mut trends: Vec<MonthlyTrend> = Vec::with_capacity(keys.len());
        let mut prior: Option<i64> = None;
        for key in keys {
            let total = totals.get(&key).copied().unwrap_or(0);
            let delta_cents = prior.map(|p| total - p);
            let delta_percent = match prior {
                Some(p) if p != 0 => Some((total - p) as f64 / p as f64 * 100.0),
                _ => None,
            };
            trends.push(MonthlyTrend {
                month: key,
                total_cents: total,
                delta_cents,
                delta_percent,
            });
            prior = Some(total);
        }
        Ok(trends)
    }

    /// One-call month overview for the dashboard view
    pub fn dashboard_summary(&self, owner_id: &str, month: &str) -> Result<DashboardSummary> {
        let (from, to) = month_bounds(month)?;
        let conn = self.db.conn()?;
        let sql = format!(
            "SELECT COALESCE(SUM(amount_cents), 0), COUNT(*)
             FROM transactions
             WHERE owner_id = ? AND status IN {} AND date BETWEEN ? AND ?",
            SETTLED
        );
        let (total_spent_cents, transaction_count) = conn.query_row(
            &sql,
            params![owner_id, from.to_string(), to.to_string()],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        drop(conn);

        Ok(DashboardSummary {
            month: month.to_string(),
            total_spent_cents,
            transaction_count,
            categories: self.budget_vs_spend(owner_id, month)?,
            top_vendors: self.top_vendors(owner_id, month, 5)?,
        })
    }

    /// Paginated month listing of all transactions, any status
    pub fn list_transactions(
        &self,
        owner_id: &str,
        month: &str,
        category_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<TransactionList> {
        let (from, to) = month_bounds(month)?;
        let (items, total): (Vec<Transaction>, i64) =
            self.db
                .list_transactions(owner_id, from, to, category_id, limit, offset)?;
        let has_more = offset + (items.len() as i64) < total;
        Ok(TransactionList {
            items,
            total,
            has_more,
        })
    }
}
