//! Diesel row structs. Never exposed outside the persistence adapter.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::subscription_records;

/// One row of `subscription_records`, used for reads and upserts alike.
///
/// `None` fields insert as `NULL`. On conflict the upsert copies every column
/// from `excluded`, so fields the domain cleared are cleared in storage too.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = subscription_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SubscriptionRecordRow {
    pub user_id: i64,
    pub username: String,
    pub email: Option<String>,
    pub disclaimer_sent_at: DateTime<Utc>,
    pub disclaimer_status: String,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub warned_at: Option<DateTime<Utc>>,
    pub payment_status: Option<String>,
    pub external_sale_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub last_update: DateTime<Utc>,
}
