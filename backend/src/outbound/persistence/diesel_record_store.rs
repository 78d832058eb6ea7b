//! PostgreSQL-backed [`RecordStore`] using Diesel.
//!
//! Upserts use `INSERT .. ON CONFLICT (user_id) DO UPDATE`, so each write
//! replaces the whole row atomically.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use tracing::{debug, warn};

use crate::domain::ports::{RecordStore, RecordStoreError};
use crate::domain::{
    DisclaimerStatus, EmailAddress, PaymentStatus, SubscriptionRecord, SubscriptionRecordParts,
    UserId,
};

use super::models::SubscriptionRecordRow;
use super::pool::{DbPool, PoolError};
use super::schema::subscription_records;

/// Diesel implementation of the record store port.
#[derive(Clone)]
pub struct DieselRecordStore {
    pool: DbPool,
}

impl DieselRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> RecordStoreError {
    RecordStoreError::connection(error.message())
}

fn map_diesel_error(error: diesel::result::Error) -> RecordStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(error = %other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RecordStoreError::connection("database connection closed")
        }
        DieselError::DeserializationError(err) => RecordStoreError::corrupt(err.to_string()),
        _ => RecordStoreError::query("database error"),
    }
}

/// Convert a stored row into a domain record.
pub(crate) fn row_to_record(row: SubscriptionRecordRow) -> Result<SubscriptionRecord, RecordStoreError> {
    let disclaimer_status = row
        .disclaimer_status
        .parse::<DisclaimerStatus>()
        .map_err(|err| RecordStoreError::corrupt(format!("user {}: {err}", row.user_id)))?;
    // Blank strings are what older rows hold before the trial starts.
    let payment_status = match row.payment_status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => Some(
            text.parse::<PaymentStatus>()
                .map_err(|err| RecordStoreError::corrupt(format!("user {}: {err}", row.user_id)))?,
        ),
    };
    let email = match row.email.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => match EmailAddress::parse(text) {
            Ok(email) => Some(email),
            Err(err) => {
                warn!(user_id = row.user_id, error = %err, "stored email is invalid; ignoring it");
                None
            }
        },
    };

    Ok(SubscriptionRecord::restore(SubscriptionRecordParts {
        user_id: UserId::new(row.user_id),
        username: row.username,
        email,
        disclaimer_status,
        payment_status,
        disclaimer_sent_at: row.disclaimer_sent_at,
        trial_start: row.trial_start,
        trial_end: row.trial_end,
        warned_at: row.warned_at,
        external_sale_id: row.external_sale_id,
        external_subscription_id: row.external_subscription_id,
        last_update: row.last_update,
    }))
}

/// Convert a domain record into a row for writing.
pub(crate) fn record_to_row(record: &SubscriptionRecord) -> SubscriptionRecordRow {
    SubscriptionRecordRow {
        user_id: record.user_id().get(),
        username: record.username().to_owned(),
        email: record.email().map(|email| email.as_str().to_owned()),
        disclaimer_sent_at: record.disclaimer_sent_at(),
        disclaimer_status: record.disclaimer_status().as_str().to_owned(),
        trial_start: record.trial_start(),
        trial_end: record.trial_end(),
        warned_at: record.warned_at(),
        payment_status: record.payment_status().map(|status| status.as_str().to_owned()),
        external_sale_id: record.external_sale_id().map(str::to_owned),
        external_subscription_id: record.external_subscription_id().map(str::to_owned),
        last_update: record.last_update(),
    }
}

#[async_trait]
impl RecordStore for DieselRecordStore {
    async fn get(&self, user_id: UserId) -> Result<Option<SubscriptionRecord>, RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = subscription_records::table
            .find(user_id.get())
            .select(SubscriptionRecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_record).transpose()
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<SubscriptionRecord>, RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = subscription_records::table
            .filter(subscription_records::email.eq(email.as_str()))
            .order(subscription_records::user_id.asc())
            .select(SubscriptionRecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_record).transpose()
    }

    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = record_to_row(record);
        diesel::insert_into(subscription_records::table)
            .values(&row)
            .on_conflict(subscription_records::user_id)
            .do_update()
            .set((
                subscription_records::username.eq(excluded(subscription_records::username)),
                subscription_records::email.eq(excluded(subscription_records::email)),
                subscription_records::disclaimer_sent_at
                    .eq(excluded(subscription_records::disclaimer_sent_at)),
                subscription_records::disclaimer_status
                    .eq(excluded(subscription_records::disclaimer_status)),
                subscription_records::trial_start.eq(excluded(subscription_records::trial_start)),
                subscription_records::trial_end.eq(excluded(subscription_records::trial_end)),
                subscription_records::warned_at.eq(excluded(subscription_records::warned_at)),
                subscription_records::payment_status
                    .eq(excluded(subscription_records::payment_status)),
                subscription_records::external_sale_id
                    .eq(excluded(subscription_records::external_sale_id)),
                subscription_records::external_subscription_id
                    .eq(excluded(subscription_records::external_subscription_id)),
                subscription_records::last_update.eq(excluded(subscription_records::last_update)),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn list_open(&self) -> Result<Vec<SubscriptionRecord>, RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = subscription_records::table
            .filter(
                subscription_records::disclaimer_status
                    .ne(DisclaimerStatus::CancelledNoResponse.as_str()),
            )
            .order(subscription_records::user_id.asc())
            .select(SubscriptionRecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let mut open = Vec::with_capacity(rows.len());
        for row in rows {
            let user_id = row.user_id;
            match row_to_record(row) {
                Ok(record) if !record.stage().is_terminal() => open.push(record),
                Ok(_) => {}
                // One bad row must not hide every other user from the sweep.
                Err(err) => warn!(user_id, error = %err, "skipping unreadable record"),
            }
        }
        Ok(open)
    }
}
