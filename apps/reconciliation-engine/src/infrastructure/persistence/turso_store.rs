//! Turso-backed payment store.
//!
//! Durable implementation of the store contract shared with the webhook
//! handler. Every status/linkage mutation is a conditional `UPDATE` whose
//! `WHERE` clause carries the compare-and-swap guard; the affected-row
//! count is the caller's signal for who won a race.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use turso::{Builder, Database, Value, params};

use crate::application::ports::{PaymentStorePort, StoreError, TerminalUpdate};
use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::domain::recovery::{BookingCandidate, LinkageResolution};
use crate::domain::shared::{
    BookingId, DoctorId, OrderCode, PatientId, RecordId, TransactionId,
};

/// Schema applied on connect.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS payments (
        order_code TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        amount TEXT NOT NULL,
        payment_method TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        patient_id TEXT,
        doctor_id TEXT,
        record_id TEXT,
        transaction_id TEXT,
        created_at TEXT NOT NULL,
        paid_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_payments_status_created
        ON payments (status, created_at)",
    "CREATE TABLE IF NOT EXISTS bookings (
        booking_id TEXT PRIMARY KEY,
        patient_id TEXT NOT NULL,
        doctor_id TEXT,
        record_id TEXT NOT NULL,
        amount TEXT NOT NULL,
        transaction_id TEXT,
        created_at TEXT NOT NULL
    )",
];

/// Payment store backed by a Turso database file.
pub struct TursoPaymentStore {
    db: Database,
}

impl TursoPaymentStore {
    /// Open (creating if needed) the database at `path` and apply the
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] when the database cannot be
    /// opened, or [`StoreError::Query`] when the schema fails to apply.
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(connection_error)?;

        let store = Self { db };
        store.migrate().await?;
        info!(path, "Payment store opened");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.db.connect().map_err(connection_error)?;
        for statement in SCHEMA {
            conn.execute(statement, ()).await.map_err(query_error)?;
        }
        Ok(())
    }

    fn connection(&self) -> Result<turso::Connection, StoreError> {
        self.db.connect().map_err(connection_error)
    }

    /// Add a booking candidate (used by tests and backfill tooling).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the insert fails.
    pub async fn insert_booking(&self, candidate: &BookingCandidate) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO bookings
                (booking_id, patient_id, doctor_id, record_id, amount, transaction_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                candidate.booking_id.as_str(),
                candidate.patient_id.as_str(),
                candidate.doctor_id.as_ref().map(|d| d.as_str().to_string()),
                candidate.record_id.as_str(),
                candidate.amount.to_string(),
                candidate
                    .transaction_id
                    .as_ref()
                    .map(|t| t.as_str().to_string()),
                candidate.created_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(query_error)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStorePort for TursoPaymentStore {
    async fn insert(&self, record: &PaymentRecord) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO payments
                (order_code, status, amount, payment_method, description,
                 patient_id, doctor_id, record_id, transaction_id, created_at, paid_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.order_code.as_str(),
                record.status.to_string(),
                record.amount.to_string(),
                record.payment_method.as_str(),
                record.description.as_str(),
                record.patient_id.as_ref().map(|v| v.as_str().to_string()),
                record.doctor_id.as_ref().map(|v| v.as_str().to_string()),
                record.record_id.as_ref().map(|v| v.as_str().to_string()),
                record
                    .transaction_id
                    .as_ref()
                    .map(|v| v.as_str().to_string()),
                record.created_at.to_rfc3339(),
                record.paid_at.map(|t| t.to_rfc3339()),
            ],
        )
        .await
        .map_err(query_error)?;
        Ok(())
    }

    async fn find_by_code(
        &self,
        order_code: &OrderCode,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT order_code, status, amount, payment_method, description,
                        patient_id, doctor_id, record_id, transaction_id, created_at, paid_at
                 FROM payments WHERE order_code = ?1",
                params![order_code.as_str()],
            )
            .await
            .map_err(query_error)?;

        match rows.next().await.map_err(query_error)? {
            Some(row) => Ok(Some(decode_payment(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_pending_page(&self, limit: usize) -> Result<Vec<PaymentRecord>, StoreError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT order_code, status, amount, payment_method, description,
                        patient_id, doctor_id, record_id, transaction_id, created_at, paid_at
                 FROM payments WHERE status = 'PENDING'
                 ORDER BY created_at ASC LIMIT ?1",
                params![limit as i64],
            )
            .await
            .map_err(query_error)?;

        let mut page = Vec::new();
        while let Some(row) = rows.next().await.map_err(query_error)? {
            page.push(decode_payment(&row)?);
        }
        Ok(page)
    }

    async fn complete_if_pending(
        &self,
        order_code: &OrderCode,
        update: &TerminalUpdate,
    ) -> Result<u64, StoreError> {
        let conn = self.connection()?;
        let rows = conn
            .execute(
                "UPDATE payments
                 SET status = ?1,
                     paid_at = ?2,
                     transaction_id = COALESCE(?3, transaction_id)
                 WHERE order_code = ?4 AND status = 'PENDING'",
                params![
                    update.new_status.to_string(),
                    update.paid_at.map(|t| t.to_rfc3339()),
                    update
                        .transaction_id
                        .as_ref()
                        .map(|t| t.as_str().to_string()),
                    order_code.as_str(),
                ],
            )
            .await
            .map_err(query_error)?;
        Ok(rows)
    }

    async fn count_orphans(&self) -> Result<u64, StoreError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM payments
                 WHERE status = 'COMPLETED'
                   AND (patient_id IS NULL OR record_id IS NULL)",
                (),
            )
            .await
            .map_err(query_error)?;

        match rows.next().await.map_err(query_error)? {
            Some(row) => Ok(decode_i64(&row, 0, "orphan count")? as u64),
            None => Ok(0),
        }
    }

    async fn find_orphans(&self, limit: usize) -> Result<Vec<PaymentRecord>, StoreError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT order_code, status, amount, payment_method, description,
                        patient_id, doctor_id, record_id, transaction_id, created_at, paid_at
                 FROM payments
                 WHERE status = 'COMPLETED'
                   AND (patient_id IS NULL OR record_id IS NULL)
                 ORDER BY created_at ASC LIMIT ?1",
                params![limit as i64],
            )
            .await
            .map_err(query_error)?;

        let mut orphans = Vec::new();
        while let Some(row) = rows.next().await.map_err(query_error)? {
            orphans.push(decode_payment(&row)?);
        }
        Ok(orphans)
    }

    async fn find_booking_candidates(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingCandidate>, StoreError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT booking_id, patient_id, doctor_id, record_id, amount,
                        transaction_id, created_at
                 FROM bookings
                 WHERE created_at >= ?1 AND created_at <= ?2",
                params![from.to_rfc3339(), to.to_rfc3339()],
            )
            .await
            .map_err(query_error)?;

        let mut candidates = Vec::new();
        while let Some(row) = rows.next().await.map_err(query_error)? {
            candidates.push(decode_booking(&row)?);
        }
        Ok(candidates)
    }

    async fn find_booking_by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<BookingCandidate>, StoreError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT booking_id, patient_id, doctor_id, record_id, amount,
                        transaction_id, created_at
                 FROM bookings WHERE transaction_id = ?1",
                params![transaction_id.as_str()],
            )
            .await
            .map_err(query_error)?;

        match rows.next().await.map_err(query_error)? {
            Some(row) => Ok(Some(decode_booking(&row)?)),
            None => Ok(None),
        }
    }

    async fn link_if_unlinked(
        &self,
        order_code: &OrderCode,
        resolution: &LinkageResolution,
    ) -> Result<u64, StoreError> {
        let conn = self.connection()?;
        let rows = conn
            .execute(
                "UPDATE payments
                 SET patient_id = ?1,
                     doctor_id = COALESCE(?2, doctor_id),
                     record_id = ?3
                 WHERE order_code = ?4 AND record_id IS NULL",
                params![
                    resolution.patient_id.as_str(),
                    resolution
                        .doctor_id
                        .as_ref()
                        .map(|d| d.as_str().to_string()),
                    resolution.record_id.as_str(),
                    order_code.as_str(),
                ],
            )
            .await
            .map_err(query_error)?;
        Ok(rows)
    }
}

fn connection_error(e: turso::Error) -> StoreError {
    StoreError::Connection {
        message: e.to_string(),
    }
}

fn query_error(e: turso::Error) -> StoreError {
    StoreError::Query {
        message: e.to_string(),
    }
}

fn corrupt(context: &str, message: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        context: context.to_string(),
        message: message.into(),
    }
}

fn decode_text(row: &turso::Row, index: usize, context: &str) -> Result<String, StoreError> {
    match row.get_value(index).map_err(|e| corrupt(context, e.to_string()))? {
        Value::Text(text) => Ok(text),
        other => Err(corrupt(context, format!("expected text, got {other:?}"))),
    }
}

fn decode_optional_text(
    row: &turso::Row,
    index: usize,
    context: &str,
) -> Result<Option<String>, StoreError> {
    match row.get_value(index).map_err(|e| corrupt(context, e.to_string()))? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(corrupt(context, format!("expected text, got {other:?}"))),
    }
}

fn decode_i64(row: &turso::Row, index: usize, context: &str) -> Result<i64, StoreError> {
    match row.get_value(index).map_err(|e| corrupt(context, e.to_string()))? {
        Value::Integer(value) => Ok(value),
        other => Err(corrupt(context, format!("expected integer, got {other:?}"))),
    }
}

fn parse_timestamp(raw: &str, context: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(context, e.to_string()))
}

fn parse_amount(raw: &str, context: &str) -> Result<Decimal, StoreError> {
    raw.parse::<Decimal>()
        .map_err(|e| corrupt(context, e.to_string()))
}

fn decode_payment(row: &turso::Row) -> Result<PaymentRecord, StoreError> {
    let order_code = decode_text(row, 0, "payments.order_code")?;
    let status_raw = decode_text(row, 1, "payments.status")?;
    let status = PaymentStatus::parse(&status_raw)
        .ok_or_else(|| corrupt("payments.status", format!("unknown status '{status_raw}'")))?;

    Ok(PaymentRecord {
        order_code: OrderCode::new(order_code),
        status,
        amount: parse_amount(&decode_text(row, 2, "payments.amount")?, "payments.amount")?,
        payment_method: decode_text(row, 3, "payments.payment_method")?,
        description: decode_text(row, 4, "payments.description")?,
        patient_id: decode_optional_text(row, 5, "payments.patient_id")?.map(PatientId::new),
        doctor_id: decode_optional_text(row, 6, "payments.doctor_id")?.map(DoctorId::new),
        record_id: decode_optional_text(row, 7, "payments.record_id")?.map(RecordId::new),
        transaction_id: decode_optional_text(row, 8, "payments.transaction_id")?
            .map(TransactionId::new),
        created_at: parse_timestamp(
            &decode_text(row, 9, "payments.created_at")?,
            "payments.created_at",
        )?,
        paid_at: decode_optional_text(row, 10, "payments.paid_at")?
            .map(|raw| parse_timestamp(&raw, "payments.paid_at"))
            .transpose()?,
    })
}

fn decode_booking(row: &turso::Row) -> Result<BookingCandidate, StoreError> {
    Ok(BookingCandidate {
        booking_id: BookingId::new(decode_text(row, 0, "bookings.booking_id")?),
        patient_id: PatientId::new(decode_text(row, 1, "bookings.patient_id")?),
        doctor_id: decode_optional_text(row, 2, "bookings.doctor_id")?.map(DoctorId::new),
        record_id: RecordId::new(decode_text(row, 3, "bookings.record_id")?),
        amount: parse_amount(&decode_text(row, 4, "bookings.amount")?, "bookings.amount")?,
        transaction_id: decode_optional_text(row, 5, "bookings.transaction_id")?
            .map(TransactionId::new),
        created_at: parse_timestamp(
            &decode_text(row, 6, "bookings.created_at")?,
            "bookings.created_at",
        )?,
    })
}
