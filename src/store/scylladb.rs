use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::response::query_result::QueryResult;
use scylla::serialize::row::SerializeRow;
use scylla::statement::batch::Batch;
use scylla::value::{CqlValue, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::network::{PostOffice, Shipper};
use crate::domain::notification::Notification;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::shipment::{HistoryEntry, Shipment};
use crate::domain::transaction::{cod_total, Transaction};
use super::{
    select_page, sort_directory, summarize, write_applies, ConditionalWrite, CounterStore, DirectoryStore,
    HistoryAppend, NotificationStore, OrderFilter, OrderStore, PageRequest, ShipmentStore, StatusCount,
    StoreError, TransactionStore,
};

// ============================================================================
// ScyllaDB Store
// ============================================================================
//
// Documents are kept as JSON next to the few columns that lightweight
// transactions condition on:
//
// - orders            (id)        status, is_deleted, version, doc
// - order_codes       (order_code)    -> owner_id, claimed IF NOT EXISTS
// - tracking_codes    (tracking_code) -> owner_id, claimed IF NOT EXISTS
// - shipments         (order_id)  history_len, doc
// - sequence_counters ((day_key), request_id) seq static, issued
// - notifications     ((order_code), created_at, id) doc
// - cod_transactions  (order_id)  status, doc
// - post_offices      (id) doc,   office_codes  (office_code)  -> owner_id
// - shippers          (id) doc,   shipper_codes (shipper_code) -> owner_id
//
// Every conditional write is a single LWT, so Paxos gives the same
// atomicity as the in-memory mutex.
//
// ============================================================================

/// Upper bound on compare-and-set rounds lost to concurrent writers
const MAX_CAS_ROUNDS: usize = 32;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS orders (
        id uuid PRIMARY KEY,
        order_code text,
        status text,
        is_deleted boolean,
        version bigint,
        doc text
    )",
    "CREATE TABLE IF NOT EXISTS order_codes (
        order_code text PRIMARY KEY,
        owner_id uuid
    )",
    "CREATE TABLE IF NOT EXISTS tracking_codes (
        tracking_code text PRIMARY KEY,
        owner_id uuid
    )",
    "CREATE TABLE IF NOT EXISTS shipments (
        order_id uuid PRIMARY KEY,
        tracking_code text,
        history_len int,
        doc text
    )",
    "CREATE TABLE IF NOT EXISTS sequence_counters (
        day_key text,
        request_id uuid,
        seq bigint static,
        issued bigint,
        PRIMARY KEY ((day_key), request_id)
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        order_code text,
        created_at timestamp,
        id uuid,
        doc text,
        PRIMARY KEY ((order_code), created_at, id)
    ) WITH CLUSTERING ORDER BY (created_at ASC, id ASC)",
    "CREATE TABLE IF NOT EXISTS cod_transactions (
        order_id uuid PRIMARY KEY,
        status text,
        doc text
    )",
    "CREATE TABLE IF NOT EXISTS post_offices (
        id uuid PRIMARY KEY,
        doc text
    )",
    "CREATE TABLE IF NOT EXISTS office_codes (
        office_code text PRIMARY KEY,
        owner_id uuid
    )",
    "CREATE TABLE IF NOT EXISTS shippers (
        id uuid PRIMARY KEY,
        doc text
    )",
    "CREATE TABLE IF NOT EXISTS shipper_codes (
        shipper_code text PRIMARY KEY,
        owner_id uuid
    )",
];

/// A uniqueness table mapping a code to the record that holds it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodeIndex {
    table: &'static str,
    column: &'static str,
}

const ORDER_CODES: CodeIndex = CodeIndex { table: "order_codes", column: "order_code" };
const TRACKING_CODES: CodeIndex = CodeIndex { table: "tracking_codes", column: "tracking_code" };
const OFFICE_CODES: CodeIndex = CodeIndex { table: "office_codes", column: "office_code" };
const SHIPPER_CODES: CodeIndex = CodeIndex { table: "shipper_codes", column: "shipper_code" };

impl CodeIndex {
    fn duplicate(&self, code: &str) -> StoreError {
        StoreError::Duplicate { field: self.column, value: code.to_string() }
    }
}

pub struct ScyllaStore {
    session: Arc<Session>,
}

fn driver_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn decode_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

fn to_doc<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(decode_error)
}

fn from_doc<T: DeserializeOwned>(doc: &str) -> Result<T, StoreError> {
    serde_json::from_str(doc).map_err(decode_error)
}

/// Read the `[applied]` flag every LWT response starts with
fn was_applied(result: QueryResult) -> Result<bool, StoreError> {
    let rows = result.into_rows_result().map_err(driver_error)?;
    let first = rows.maybe_first_row::<Row>().map_err(decode_error)?;

    match first.and_then(|row| row.columns.into_iter().next().flatten()) {
        Some(CqlValue::Boolean(applied)) => Ok(applied),
        _ => Err(StoreError::Corrupt("LWT response without [applied] column".to_string())),
    }
}

/// Outcome of a lost conditional order write, judged on a fresh read
fn lost_order_write(current: Option<Order>) -> ConditionalWrite {
    match current {
        Some(order) if !order.is_deleted => ConditionalWrite::Stale(order),
        _ => ConditionalWrite::Missing,
    }
}

/// Version column value a write prepared as `next_version` conditions on
fn read_version(next_version: u64) -> i64 {
    next_version.saturating_sub(1) as i64
}

// ============================================================================
// Code Claims
// ============================================================================
//
// Inserting a record with unique codes is several statements: claim each
// code, then write the record. Claims taken for a record that never landed
// are handed back so the codes stay usable.
//
// ============================================================================

#[async_trait]
trait CodeClaims: Sync {
    /// Claim `code` for `owner`; true when claimed now or already held by it
    async fn claim(&self, index: CodeIndex, code: &str, owner: Uuid) -> Result<bool, StoreError>;

    async fn release(&self, index: CodeIndex, code: &str, owner: Uuid) -> Result<(), StoreError>;
}

async fn release_all<C: CodeClaims + ?Sized>(claims: &C, held: &[(CodeIndex, &str)], owner: Uuid) {
    for (index, code) in held {
        if let Err(e) = claims.release(*index, code, owner).await {
            tracing::warn!(table = index.table, code = *code, owner = %owner, error = %e, "Could not release code claim");
        }
    }
}

/// Claim every code, then run `write` (true when the record row was created).
///
/// When the write fails, `landed` re-reads whether the record exists after
/// all; claims are only released once the record is known to be absent.
async fn insert_claimed<C, W, L>(
    claims: &C,
    codes: &[(CodeIndex, &str)],
    owner: Uuid,
    write: W,
    landed: L,
) -> Result<(), StoreError>
where
    C: CodeClaims + ?Sized,
    W: Future<Output = Result<bool, StoreError>>,
    L: Future<Output = Result<bool, StoreError>>,
{
    for (taken, (index, code)) in codes.iter().enumerate() {
        let claimed = match claims.claim(*index, code, owner).await {
            Ok(claimed) => claimed,
            Err(e) => {
                release_all(claims, &codes[..taken], owner).await;
                return Err(e);
            }
        };
        if !claimed {
            release_all(claims, &codes[..taken], owner).await;
            return Err(index.duplicate(code));
        }
    }

    match write.await {
        Ok(true) => Ok(()),
        Ok(false) => {
            release_all(claims, codes, owner).await;
            Err(StoreError::Duplicate { field: "id", value: owner.to_string() })
        }
        Err(e) => match landed.await {
            Ok(true) => Ok(()),
            Ok(false) => {
                release_all(claims, codes, owner).await;
                Err(e)
            }
            Err(_) => {
                tracing::warn!(owner = %owner, error = %e, "Insert outcome unknown, keeping code claims");
                Err(e)
            }
        },
    }
}

#[async_trait]
impl CodeClaims for ScyllaStore {
    async fn claim(&self, index: CodeIndex, code: &str, owner: Uuid) -> Result<bool, StoreError> {
        let statement = format!("INSERT INTO {} ({}, owner_id) VALUES (?, ?) IF NOT EXISTS", index.table, index.column);
        if self.lwt(&statement, (code, owner)).await? {
            return Ok(true);
        }
        Ok(self.code_owner(index, code).await? == Some(owner))
    }

    async fn release(&self, index: CodeIndex, code: &str, owner: Uuid) -> Result<(), StoreError> {
        let statement = format!("DELETE FROM {} WHERE {} = ? IF owner_id = ?", index.table, index.column);
        self.lwt(&statement, (code, owner)).await?;
        Ok(())
    }
}

// ============================================================================
// Directory Records
// ============================================================================

/// A record kept as a document in its own table with one unique code
trait DirectoryRecord: Serialize + DeserializeOwned + Send + Sync {
    const TABLE: &'static str;
    const CODES: CodeIndex;

    fn id(&self) -> Uuid;
    fn code(&self) -> &str;
}

impl DirectoryRecord for PostOffice {
    const TABLE: &'static str = "post_offices";
    const CODES: CodeIndex = OFFICE_CODES;

    fn id(&self) -> Uuid {
        self.id
    }

    fn code(&self) -> &str {
        &self.office_code
    }
}

impl DirectoryRecord for Shipper {
    const TABLE: &'static str = "shippers";
    const CODES: CodeIndex = SHIPPER_CODES;

    fn id(&self) -> Uuid {
        self.id
    }

    fn code(&self) -> &str {
        &self.shipper_code
    }
}

impl ScyllaStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Connect, make sure the keyspace and tables exist, and switch to the keyspace
    pub async fn connect(nodes: &[String], keyspace: &str) -> anyhow::Result<Self> {
        tracing::info!(nodes = ?nodes, keyspace = keyspace, "Connecting to ScyllaDB...");

        let session: Session = SessionBuilder::new().known_nodes(nodes).build().await?;

        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                (),
            )
            .await?;
        session.use_keyspace(keyspace, false).await?;

        let store = Self::new(Arc::new(session));
        store.init_schema().await?;

        tracing::info!(keyspace = keyspace, "✅ ScyllaDB schema ready");
        Ok(store)
    }

    pub async fn init_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            self.session.query_unpaged(*statement, ()).await?;
        }
        Ok(())
    }

    async fn lwt(&self, statement: &str, values: impl SerializeRow + Send) -> Result<bool, StoreError> {
        let result = self.session.query_unpaged(statement, values).await.map_err(driver_error)?;
        was_applied(result)
    }

    async fn fetch_doc(&self, statement: &str, values: impl SerializeRow + Send) -> Result<Option<String>, StoreError> {
        let result = self.session.query_unpaged(statement, values).await.map_err(driver_error)?;
        let rows = result.into_rows_result().map_err(driver_error)?;
        let row = rows.maybe_first_row::<(String,)>().map_err(decode_error)?;
        Ok(row.map(|(doc,)| doc))
    }

    async fn fetch_docs(&self, statement: &str, values: impl SerializeRow + Send) -> Result<Vec<String>, StoreError> {
        let result = self.session.query_unpaged(statement, values).await.map_err(driver_error)?;
        let rows = result.into_rows_result().map_err(driver_error)?;

        let mut docs = Vec::new();
        for row in rows.rows::<(String,)>().map_err(decode_error)? {
            let (doc,) = row.map_err(decode_error)?;
            docs.push(doc);
        }
        Ok(docs)
    }

    /// Full scan of a document table, fetched page by page
    async fn scan_docs<T: DeserializeOwned>(&self, statement: &str) -> Result<Vec<T>, StoreError> {
        let pager = self.session.query_iter(statement, ()).await.map_err(driver_error)?;

        let docs: Vec<(String,)> = pager
            .rows_stream::<(String,)>()
            .map_err(decode_error)?
            .try_collect()
            .await
            .map_err(driver_error)?;

        docs.iter().map(|(doc,)| from_doc(doc)).collect()
    }

    async fn code_owner(&self, index: CodeIndex, code: &str) -> Result<Option<Uuid>, StoreError> {
        let statement = format!("SELECT owner_id FROM {} WHERE {} = ?", index.table, index.column);
        let result = self.session.query_unpaged(statement, (code,)).await.map_err(driver_error)?;
        let rows = result.into_rows_result().map_err(driver_error)?;
        let row = rows.maybe_first_row::<(Uuid,)>().map_err(decode_error)?;
        Ok(row.map(|(id,)| id))
    }

    async fn load_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.scan_docs("SELECT doc FROM orders").await
    }

    /// Sequence value already handed to `request_id`, if any
    async fn issued_sequence(&self, day_key: &str, request_id: Uuid) -> Result<Option<i64>, StoreError> {
        let result = self
            .session
            .query_unpaged(
                "SELECT issued FROM sequence_counters WHERE day_key = ? AND request_id = ?",
                (day_key, request_id),
            )
            .await
            .map_err(driver_error)?;
        let rows = result.into_rows_result().map_err(driver_error)?;
        let row = rows.maybe_first_row::<(Option<i64>,)>().map_err(decode_error)?;
        Ok(row.and_then(|(issued,)| issued))
    }

    async fn current_sequence(&self, day_key: &str) -> Result<Option<i64>, StoreError> {
        let result = self
            .session
            .query_unpaged("SELECT seq FROM sequence_counters WHERE day_key = ? LIMIT 1", (day_key,))
            .await
            .map_err(driver_error)?;
        let rows = result.into_rows_result().map_err(driver_error)?;
        let row = rows.maybe_first_row::<(Option<i64>,)>().map_err(decode_error)?;
        Ok(row.and_then(|(seq,)| seq))
    }

    async fn find_record<T: DirectoryRecord>(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let statement = format!("SELECT doc FROM {} WHERE id = ?", T::TABLE);
        self.fetch_doc(&statement, (id,))
            .await?
            .map(|doc| from_doc(&doc))
            .transpose()
    }

    async fn insert_record<T: DirectoryRecord>(&self, record: &T) -> Result<(), StoreError> {
        let doc = to_doc(record)?;
        let insert = format!("INSERT INTO {} (id, doc) VALUES (?, ?) IF NOT EXISTS", T::TABLE);

        insert_claimed(
            self,
            &[(T::CODES, record.code())],
            record.id(),
            self.lwt(&insert, (record.id(), doc)),
            async { Ok(self.find_record::<T>(record.id()).await?.is_some()) },
        )
        .await
    }

    async fn update_record<T: DirectoryRecord>(&self, record: &T) -> Result<bool, StoreError> {
        let Some(current) = self.find_record::<T>(record.id()).await? else {
            return Ok(false);
        };

        let renamed = current.code() != record.code();
        if renamed && !self.claim(T::CODES, record.code(), record.id()).await? {
            return Err(T::CODES.duplicate(record.code()));
        }

        let update = format!("UPDATE {} SET doc = ? WHERE id = ? IF EXISTS", T::TABLE);
        let applied = self.lwt(&update, (to_doc(record)?, record.id())).await?;

        if renamed {
            let stale = if applied { current.code() } else { record.code() };
            release_all(self, &[(T::CODES, stale)], record.id()).await;
        }
        Ok(applied)
    }

    async fn delete_record<T: DirectoryRecord>(&self, id: Uuid) -> Result<bool, StoreError> {
        let Some(current) = self.find_record::<T>(id).await? else {
            return Ok(false);
        };

        let delete = format!("DELETE FROM {} WHERE id = ? IF EXISTS", T::TABLE);
        let applied = self.lwt(&delete, (id,)).await?;
        if applied {
            release_all(self, &[(T::CODES, current.code())], id).await;
        }
        Ok(applied)
    }

    async fn list_records<T: DirectoryRecord>(&self) -> Result<Vec<T>, StoreError> {
        let mut records: Vec<T> = self.scan_docs(&format!("SELECT doc FROM {}", T::TABLE)).await?;
        sort_directory(&mut records, |r| r.code());
        Ok(records)
    }
}

#[async_trait]
impl CounterStore for ScyllaStore {
    async fn increment(&self, day_key: &str, request_id: Uuid) -> Result<u64, StoreError> {
        for _ in 0..MAX_CAS_ROUNDS {
            if let Some(issued) = self.issued_sequence(day_key, request_id).await? {
                return Ok(issued as u64);
            }

            let seq = self.current_sequence(day_key).await?;
            let next = seq.unwrap_or(0) + 1;
            let applied = self
                .lwt(
                    "UPDATE sequence_counters SET seq = ?, issued = ? WHERE day_key = ? AND request_id = ? IF seq = ?",
                    (next, next, day_key, request_id, seq),
                )
                .await?;
            if applied {
                return Ok(next as u64);
            }

            tracing::debug!(day_key = day_key, "Counter compare-and-set lost, re-reading");
        }

        Err(StoreError::Unavailable(format!("counter {} under sustained contention", day_key)))
    }
}

#[async_trait]
impl OrderStore for ScyllaStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let doc = to_doc(order)?;

        insert_claimed(
            self,
            &[(ORDER_CODES, order.order_code.as_str()), (TRACKING_CODES, order.tracking_code.as_str())],
            order.id,
            self.lwt(
                "INSERT INTO orders (id, order_code, status, is_deleted, version, doc) VALUES (?, ?, ?, ?, ?, ?) IF NOT EXISTS",
                (
                    order.id,
                    &order.order_code,
                    order.current_status.as_str(),
                    order.is_deleted,
                    order.version as i64,
                    doc,
                ),
            ),
            async { Ok(self.find_order(order.id).await?.is_some()) },
        )
        .await
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        self.fetch_doc("SELECT doc FROM orders WHERE id = ?", (id,))
            .await?
            .map(|doc| from_doc(&doc))
            .transpose()
    }

    async fn find_order_by_code(&self, order_code: &str) -> Result<Option<Order>, StoreError> {
        match self.code_owner(ORDER_CODES, order_code).await? {
            Some(id) => self.find_order(id).await,
            None => Ok(None),
        }
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<ConditionalWrite, StoreError> {
        for _ in 0..MAX_CAS_ROUNDS {
            let current = match self.find_order(id).await? {
                Some(order) if !order.is_deleted => order,
                _ => return Ok(ConditionalWrite::Missing),
            };
            if current.current_status != expected {
                return Ok(ConditionalWrite::Stale(current));
            }

            let updated = current.with_status(next, at);
            let applied = self
                .lwt(
                    "UPDATE orders SET status = ?, version = ?, doc = ? WHERE id = ? IF version = ? AND is_deleted = false",
                    (next.as_str(), updated.version as i64, to_doc(&updated)?, id, read_version(updated.version)),
                )
                .await?;
            if applied {
                return Ok(ConditionalWrite::Applied(updated));
            }

            tracing::debug!(order_id = %id, "Status compare-and-set lost, re-reading");
        }

        Err(StoreError::Unavailable(format!("order {} under sustained contention", id)))
    }

    async fn replace_order(&self, order: &Order, expected: OrderStatus) -> Result<ConditionalWrite, StoreError> {
        let current = match self.find_order(order.id).await? {
            Some(current) if !current.is_deleted => current,
            _ => return Ok(ConditionalWrite::Missing),
        };
        if !write_applies(&current, expected, order.version) {
            return Ok(ConditionalWrite::Stale(current));
        }

        let renamed = current.order_code != order.order_code;
        if renamed && !self.claim(ORDER_CODES, &order.order_code, order.id).await? {
            return Err(ORDER_CODES.duplicate(&order.order_code));
        }

        let applied = self
            .lwt(
                "UPDATE orders SET order_code = ?, status = ?, version = ?, doc = ? WHERE id = ? \
                 IF version = ? AND is_deleted = false",
                (
                    &order.order_code,
                    order.current_status.as_str(),
                    order.version as i64,
                    to_doc(order)?,
                    order.id,
                    read_version(order.version),
                ),
            )
            .await?;

        if renamed {
            let stale = if applied { &current.order_code } else { &order.order_code };
            release_all(self, &[(ORDER_CODES, stale.as_str())], order.id).await;
        }

        if applied {
            Ok(ConditionalWrite::Applied(order.clone()))
        } else {
            Ok(lost_order_write(self.find_order(order.id).await?))
        }
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        for _ in 0..MAX_CAS_ROUNDS {
            let current = match self.find_order(id).await? {
                Some(order) if !order.is_deleted => order,
                _ => return Ok(false),
            };

            let deleted = current.deleted(at);
            let applied = self
                .lwt(
                    "UPDATE orders SET is_deleted = true, version = ?, doc = ? WHERE id = ? \
                     IF version = ? AND is_deleted = false",
                    (deleted.version as i64, to_doc(&deleted)?, id, read_version(deleted.version)),
                )
                .await?;
            if applied {
                return Ok(true);
            }
        }

        Err(StoreError::Unavailable(format!("order {} under sustained contention", id)))
    }

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Vec<Order>, StoreError> {
        Ok(select_page(self.load_orders().await?, filter, page))
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, StoreError> {
        let orders = self.load_orders().await?;
        Ok(orders.iter().filter(|o| filter.matches(o)).count() as u64)
    }

    async fn status_summary(&self) -> Result<Vec<StatusCount>, StoreError> {
        Ok(summarize(&self.load_orders().await?))
    }
}

#[async_trait]
impl ShipmentStore for ScyllaStore {
    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), StoreError> {
        let applied = self
            .lwt(
                "INSERT INTO shipments (order_id, tracking_code, history_len, doc) VALUES (?, ?, ?, ?) IF NOT EXISTS",
                (
                    shipment.order_id,
                    &shipment.tracking_code,
                    shipment.status_history.len() as i32,
                    to_doc(shipment)?,
                ),
            )
            .await?;

        if !applied {
            return Err(StoreError::Duplicate { field: "shipment", value: shipment.order_id.to_string() });
        }
        Ok(())
    }

    async fn find_shipment(&self, order_id: Uuid) -> Result<Option<Shipment>, StoreError> {
        self.fetch_doc("SELECT doc FROM shipments WHERE order_id = ?", (order_id,))
            .await?
            .map(|doc| from_doc(&doc))
            .transpose()
    }

    async fn find_shipment_by_tracking_code(&self, tracking_code: &str) -> Result<Option<Shipment>, StoreError> {
        match self.code_owner(TRACKING_CODES, tracking_code).await? {
            Some(order_id) => self.find_shipment(order_id).await,
            None => Ok(None),
        }
    }

    async fn append_history(
        &self,
        order_id: Uuid,
        entry: &HistoryEntry,
        expected_len: usize,
    ) -> Result<HistoryAppend, StoreError> {
        let Some(mut shipment) = self.find_shipment(order_id).await? else {
            return Ok(HistoryAppend::Missing);
        };
        if shipment.status_history.len() != expected_len {
            return Ok(HistoryAppend::LengthMismatch(shipment));
        }

        shipment.status_history.push(entry.clone());
        let applied = self
            .lwt(
                "UPDATE shipments SET history_len = ?, doc = ? WHERE order_id = ? IF history_len = ?",
                (
                    shipment.status_history.len() as i32,
                    to_doc(&shipment)?,
                    order_id,
                    expected_len as i32,
                ),
            )
            .await?;

        if applied {
            return Ok(HistoryAppend::Appended(shipment));
        }
        match self.find_shipment(order_id).await? {
            Some(found) => Ok(HistoryAppend::LengthMismatch(found)),
            None => Ok(HistoryAppend::Missing),
        }
    }
}

#[async_trait]
impl NotificationStore for ScyllaStore {
    async fn insert_notifications(&self, notifications: &[Notification]) -> Result<(), StoreError> {
        if notifications.is_empty() {
            return Ok(());
        }

        let mut batch = Batch::default();
        let mut values = Vec::with_capacity(notifications.len());
        for notification in notifications {
            batch.append_statement(
                "INSERT INTO notifications (order_code, created_at, id, doc) VALUES (?, ?, ?, ?)",
            );
            values.push((
                notification.order_code.clone(),
                notification.timestamp,
                notification.id,
                to_doc(notification)?,
            ));
        }

        self.session.batch(&batch, values).await.map_err(driver_error)?;
        Ok(())
    }

    async fn notifications_for_order(&self, order_code: &str) -> Result<Vec<Notification>, StoreError> {
        let docs = self
            .fetch_docs("SELECT doc FROM notifications WHERE order_code = ?", (order_code,))
            .await?;
        docs.iter().map(|doc| from_doc(doc)).collect()
    }
}

#[async_trait]
impl TransactionStore for ScyllaStore {
    async fn upsert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        self.session
            .query_unpaged(
                "INSERT INTO cod_transactions (order_id, status, doc) VALUES (?, ?, ?)",
                (transaction.order_id, transaction.status.as_str(), to_doc(transaction)?),
            )
            .await
            .map_err(driver_error)?;
        Ok(())
    }

    async fn find_transaction(&self, order_id: Uuid) -> Result<Option<Transaction>, StoreError> {
        self.fetch_doc("SELECT doc FROM cod_transactions WHERE order_id = ?", (order_id,))
            .await?
            .map(|doc| from_doc(&doc))
            .transpose()
    }

    async fn cod_total(&self) -> Result<f64, StoreError> {
        let transactions: Vec<Transaction> = self.scan_docs("SELECT doc FROM cod_transactions").await?;
        Ok(cod_total(&transactions))
    }
}

#[async_trait]
impl DirectoryStore for ScyllaStore {
    async fn insert_post_office(&self, office: &PostOffice) -> Result<(), StoreError> {
        self.insert_record(office).await
    }

    async fn update_post_office(&self, office: &PostOffice) -> Result<bool, StoreError> {
        self.update_record(office).await
    }

    async fn delete_post_office(&self, id: Uuid) -> Result<bool, StoreError> {
        self.delete_record::<PostOffice>(id).await
    }

    async fn find_post_office(&self, id: Uuid) -> Result<Option<PostOffice>, StoreError> {
        self.find_record(id).await
    }

    async fn list_post_offices(&self) -> Result<Vec<PostOffice>, StoreError> {
        self.list_records().await
    }

    async fn insert_shipper(&self, shipper: &Shipper) -> Result<(), StoreError> {
        self.insert_record(shipper).await
    }

    async fn update_shipper(&self, shipper: &Shipper) -> Result<bool, StoreError> {
        self.update_record(shipper).await
    }

    async fn delete_shipper(&self, id: Uuid) -> Result<bool, StoreError> {
        self.delete_record::<Shipper>(id).await
    }

    async fn find_shipper(&self, id: Uuid) -> Result<Option<Shipper>, StoreError> {
        self.find_record(id).await
    }

    async fn list_shippers(&self) -> Result<Vec<Shipper>, StoreError> {
        self.list_records().await
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
//
// Statement execution needs a live cluster; these cover the pure pieces.
//
// ============================================================================
