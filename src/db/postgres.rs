//! PostgreSQL connection
//!
//! Concrete implementation using tokio-postgres. The harness is synchronous,
//! so each [`PostgresConnection`] owns a current-thread runtime that drives
//! the client and its background connection task.

use crate::config::ConnectionConfig;
use crate::config::connections::SslMode;
use crate::db::connection::Connection;
use crate::db::types::{CellValue, ColumnDef, DataType, QueryResults, Row};
use crate::error::{DbError, DbResult};
use chrono::Timelike;
use std::error::Error;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::{Client, SimpleQueryMessage};

/// How long a dropped connection waits for the server to acknowledge Terminate
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// How a query reaches the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Prepare the statement and decode each value through its declared type
    Translated,
    /// Send the text through the simple-query protocol and keep the
    /// server's own rendering of every value
    Native,
}

/// Async half: the tokio-postgres client plus its loss notifications
struct PostgresClient {
    client: Client,
    /// Fires if the background connection is lost (server restart, idle timeout)
    conn_err_rx: mpsc::UnboundedReceiver<String>,
    /// Task driving the socket; it sends Terminate once `client` is gone
    driver: JoinHandle<()>,
}

/// Blocking connection to a PostgreSQL server
pub struct PostgresConnection {
    /// Only `None` while the connection is being dropped
    inner: Option<PostgresClient>,
    runtime: Runtime,
    mode: ExecutionMode,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database, blocking until the handshake completes.
    pub fn connect(config: &ConnectionConfig, mode: ExecutionMode) -> DbResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::ConnectionFailed(format!("Runtime: {}", e)))?;
        let inner = runtime.block_on(PostgresClient::connect(config))?;
        tracing::debug!(profile = %config.name, ?mode, "connected to postgres");
        Ok(Self {
            inner: Some(inner),
            runtime,
            mode,
        })
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            self.runtime.block_on(inner.close());
        }
    }
}

impl Connection for PostgresConnection {
    fn execute_query(&mut self, sql: &str) -> DbResult<QueryResults> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(DbError::ConnectionLost("connection closed".to_string()));
        };
        if let Ok(reason) = inner.conn_err_rx.try_recv() {
            return Err(DbError::ConnectionLost(reason));
        }
        let inner = &*inner;
        match self.mode {
            ExecutionMode::Translated => self.runtime.block_on(inner.execute_translated(sql)),
            ExecutionMode::Native => self.runtime.block_on(inner.execute_native(sql)),
        }
    }

    fn backend_name(&self) -> &str {
        match self.mode {
            ExecutionMode::Translated => "postgres",
            ExecutionMode::Native => "postgres-native",
        }
    }
}

impl PostgresClient {
    async fn connect(config: &ConnectionConfig) -> DbResult<Self> {
        let conn_string = config.to_libpq();
        let (conn_err_tx, conn_err_rx) = mpsc::unbounded_channel();

        let (client, driver) = match config.ssl_mode {
            SslMode::Disable => {
                let (client, connection) =
                    tokio_postgres::connect(&conn_string, tokio_postgres::NoTls)
                        .await
                        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                let driver = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        let _ = conn_err_tx.send(e.to_string());
                    }
                });
                (client, driver)
            }
            SslMode::Prefer | SslMode::Require => {
                let tls = tokio_postgres_rustls::MakeRustlsConnect::new(make_tls_config());
                let (client, connection) = tokio_postgres::connect(&conn_string, tls)
                    .await
                    .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                let driver = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        let _ = conn_err_tx.send(e.to_string());
                    }
                });
                (client, driver)
            }
        };

        Ok(Self {
            client,
            conn_err_rx,
            driver,
        })
    }

    /// Release the client and let the driver finish the Terminate handshake.
    async fn close(self) {
        let Self { client, driver, .. } = self;
        drop(client);
        if tokio::time::timeout(CLOSE_TIMEOUT, driver).await.is_err() {
            tracing::warn!("postgres connection did not close within {:?}", CLOSE_TIMEOUT);
        }
    }

    async fn execute_translated(&self, sql: &str) -> DbResult<QueryResults> {
        let stmt = self
            .client
            .prepare(sql)
            .await
            .map_err(DbError::Postgres)?;

        let columns: Vec<ColumnDef> = stmt
            .columns()
            .iter()
            .map(|col| ColumnDef {
                name: col.name().to_string(),
                data_type: pg_type_to_datatype(col.type_()),
            })
            .collect();

        let pg_rows = self
            .client
            .query(&stmt, &[])
            .await
            .map_err(DbError::Postgres)?;

        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in &pg_rows {
            let values = columns
                .iter()
                .enumerate()
                .map(|(i, col)| extract_cell_value(pg_row, i, &col.data_type))
                .collect::<DbResult<Vec<_>>>()?;
            rows.push(Row { values });
        }

        Ok(QueryResults::new(columns, rows))
    }

    /// Rows of the last statement in `sql`, every value as the server's text.
    async fn execute_native(&self, sql: &str) -> DbResult<QueryResults> {
        let messages = self
            .client
            .simple_query(sql)
            .await
            .map_err(DbError::Postgres)?;

        let mut columns: Vec<ColumnDef> = Vec::new();
        let mut rows = Vec::new();
        // Whether the statement in progress announced a row set
        let mut described = false;
        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(description) => {
                    columns = description
                        .iter()
                        .map(|col| text_column(col.name()))
                        .collect();
                    rows.clear();
                    described = true;
                }
                SimpleQueryMessage::CommandComplete(_) => {
                    if !described {
                        columns.clear();
                        rows.clear();
                    }
                    described = false;
                }
                SimpleQueryMessage::Row(row) => {
                    if columns.is_empty() {
                        columns = row.columns().iter().map(|col| text_column(col.name())).collect();
                    }
                    described = true;
                    let values = (0..row.len())
                        .map(|i| {
                            row.get(i)
                                .map_or(CellValue::Null, |s| CellValue::Text(s.to_string()))
                        })
                        .collect();
                    rows.push(Row { values });
                }
                _ => {}
            }
        }

        Ok(QueryResults::new(columns, rows))
    }
}

fn text_column(name: &str) -> ColumnDef {
    ColumnDef {
        name: name.to_string(),
        data_type: DataType::Text,
    }
}

/// Map tokio_postgres Type to our DataType enum
fn pg_type_to_datatype(pg_type: &Type) -> DataType {
    match *pg_type {
        Type::INT2 => DataType::SmallInt,
        Type::INT4 => DataType::Integer,
        Type::INT8 => DataType::BigInt,
        Type::OID => DataType::Oid,
        Type::FLOAT4 => DataType::Real,
        Type::FLOAT8 => DataType::Double,
        Type::NUMERIC => DataType::Numeric,
        Type::TEXT | Type::NAME => DataType::Text,
        Type::VARCHAR => DataType::Varchar,
        Type::CHAR | Type::BPCHAR => DataType::Char,
        Type::BOOL => DataType::Boolean,
        Type::DATE => DataType::Date,
        Type::TIME => DataType::Time,
        Type::TIMETZ => DataType::TimeTz,
        Type::TIMESTAMP => DataType::Timestamp,
        Type::TIMESTAMPTZ => DataType::TimestampTz,
        Type::INTERVAL => DataType::Interval,
        Type::JSON => DataType::Json,
        Type::JSONB => DataType::Jsonb,
        Type::BYTEA => DataType::Bytea,
        Type::UUID => DataType::Uuid,
        Type::INT2_ARRAY => DataType::Array(Box::new(DataType::SmallInt)),
        Type::INT4_ARRAY => DataType::Array(Box::new(DataType::Integer)),
        Type::INT8_ARRAY => DataType::Array(Box::new(DataType::BigInt)),
        Type::FLOAT8_ARRAY => DataType::Array(Box::new(DataType::Double)),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::NAME_ARRAY => {
            DataType::Array(Box::new(DataType::Text))
        }
        _ => DataType::Unknown(pg_type.name().to_string()),
    }
}

/// Build a rustls ClientConfig that trusts OS certificates (with Mozilla roots as fallback)
fn make_tls_config() -> rustls::ClientConfig {
    let mut root_store = rustls::RootCertStore::empty();

    let native_certs = rustls_native_certs::load_native_certs();
    let mut loaded = 0;
    for cert in native_certs.certs {
        if root_store.add(cert).is_ok() {
            loaded += 1;
        }
    }
    if loaded == 0 {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

/// Decode column `idx` as `T`, wrapping it with `wrap`. NULL becomes `CellValue::Null`.
///
/// # Errors
/// Returns `DbError::Undecodable` naming the column and its server type when
/// `T` cannot read the value.
fn typed<'a, T: FromSql<'a>>(
    row: &'a tokio_postgres::Row,
    idx: usize,
    wrap: impl FnOnce(T) -> CellValue,
) -> DbResult<CellValue> {
    match row.try_get::<_, Option<T>>(idx) {
        Ok(Some(v)) => Ok(wrap(v)),
        Ok(None) => Ok(CellValue::Null),
        Err(source) => {
            let (column, type_name) = row.columns().get(idx).map_or_else(
                || (idx.to_string(), "unknown".to_string()),
                |c| (c.name().to_string(), c.type_().name().to_string()),
            );
            Err(DbError::Undecodable {
                column,
                type_name,
                source,
            })
        }
    }
}

/// Extract a cell value from a tokio_postgres Row based on the column's DataType.
fn extract_cell_value(
    row: &tokio_postgres::Row,
    idx: usize,
    data_type: &DataType,
) -> DbResult<CellValue> {
    match data_type {
        DataType::SmallInt => typed(row, idx, |v: i16| CellValue::Integer(i64::from(v))),
        DataType::Integer => typed(row, idx, |v: i32| CellValue::Integer(i64::from(v))),
        DataType::BigInt => typed(row, idx, CellValue::Integer),
        DataType::Oid => typed(row, idx, |v: u32| CellValue::Integer(i64::from(v))),
        DataType::Real => typed(row, idx, |v: f32| CellValue::Float(f64::from(v))),
        DataType::Double => typed(row, idx, CellValue::Float),
        DataType::Numeric => typed(row, idx, |v: NumericText| CellValue::Text(v.0)),
        DataType::Boolean => typed(row, idx, CellValue::Boolean),
        DataType::Json | DataType::Jsonb => typed(row, idx, CellValue::Json),
        DataType::Bytea => typed(row, idx, CellValue::Binary),
        DataType::Uuid => typed(row, idx, |v: uuid::Uuid| CellValue::Uuid(v.to_string())),
        DataType::Timestamp => typed(row, idx, |v: chrono::NaiveDateTime| {
            CellValue::DateTime(format!("{} {}", v.date(), time_of_day(v.time())))
        }),
        // Rendered in UTC, which is the server's text under `TimeZone = 'UTC'`
        DataType::TimestampTz => typed(row, idx, |v: chrono::DateTime<chrono::Utc>| {
            let v = v.naive_utc();
            CellValue::DateTime(format!("{} {}+00", v.date(), time_of_day(v.time())))
        }),
        DataType::Date => typed(row, idx, |v: chrono::NaiveDate| {
            CellValue::DateTime(v.to_string())
        }),
        DataType::Time | DataType::TimeTz => {
            typed(row, idx, |v: ClockText| CellValue::DateTime(v.0))
        }
        DataType::Interval => typed(row, idx, |v: IntervalText| CellValue::Text(v.0)),
        DataType::Array(inner) => extract_array_value(row, idx, inner),
        DataType::Text | DataType::Varchar | DataType::Char | DataType::Unknown(_) => {
            typed(row, idx, |v: ServerText| CellValue::Text(v.0))
        }
    }
}

/// Extract an array value. Element types without a decoder are an error.
fn extract_array_value(
    row: &tokio_postgres::Row,
    idx: usize,
    inner: &DataType,
) -> DbResult<CellValue> {
    match inner {
        DataType::Text => typed(row, idx, |v: Vec<String>| {
            CellValue::Array(v.into_iter().map(CellValue::Text).collect())
        }),
        DataType::SmallInt => typed(row, idx, |v: Vec<i16>| {
            CellValue::Array(v.into_iter().map(|n| CellValue::Integer(i64::from(n))).collect())
        }),
        DataType::Integer => typed(row, idx, |v: Vec<i32>| {
            CellValue::Array(v.into_iter().map(|n| CellValue::Integer(i64::from(n))).collect())
        }),
        DataType::BigInt => typed(row, idx, |v: Vec<i64>| {
            CellValue::Array(v.into_iter().map(CellValue::Integer).collect())
        }),
        DataType::Double => typed(row, idx, |v: Vec<f64>| {
            CellValue::Array(v.into_iter().map(CellValue::Float).collect())
        }),
        _ => typed(row, idx, |v: ServerText| CellValue::Text(v.0)),
    }
}

type WireResult<T> = Result<T, Box<dyn Error + Sync + Send>>;

/// `N` big-endian bytes of `raw` starting at `at`
fn wire_bytes<const N: usize>(raw: &[u8], at: usize) -> WireResult<[u8; N]> {
    raw.get(at..at + N)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| "value shorter than its wire format".into())
}

/// Values whose binary form is already the server's text: character types,
/// enums and xml.
struct ServerText(String);

impl<'a> FromSql<'a> for ServerText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> WireResult<Self> {
        Ok(ServerText(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        <String as FromSql<'_>>::accepts(ty)
            || *ty == Type::XML
            || matches!(ty.kind(), Kind::Enum(_))
    }
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// `numeric` rendered digit for digit, at the column's display scale.
///
/// Wire layout: ndigits, weight, sign, dscale, then ndigits base-10000 digits.
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> WireResult<Self> {
        let ndigits = usize::from(u16::from_be_bytes(wire_bytes(raw, 0)?));
        let weight = i32::from(i16::from_be_bytes(wire_bytes(raw, 2)?));
        let sign = u16::from_be_bytes(wire_bytes(raw, 4)?);
        let dscale = usize::from(u16::from_be_bytes(wire_bytes(raw, 6)?));

        let special = match sign {
            NUMERIC_NAN => Some("NaN"),
            NUMERIC_PINF => Some("Infinity"),
            NUMERIC_NINF => Some("-Infinity"),
            _ => None,
        };
        if let Some(text) = special {
            return Ok(NumericText(text.to_string()));
        }

        let digits = (0..ndigits)
            .map(|i| wire_bytes(raw, 8 + 2 * i).map(u16::from_be_bytes))
            .collect::<WireResult<Vec<u16>>>()?;
        // Digit group at `i`; groups past either end are zero
        let group = |i: i32| {
            usize::try_from(i)
                .ok()
                .and_then(|i| digits.get(i).copied())
                .unwrap_or(0)
        };

        let mut text = String::new();
        if sign == NUMERIC_NEG {
            text.push('-');
        }
        if weight < 0 {
            text.push('0');
        } else {
            text.push_str(&group(0).to_string());
            for i in 1..=weight {
                text.push_str(&format!("{:04}", group(i)));
            }
        }
        if dscale > 0 {
            let mut fraction = String::new();
            let mut i = weight + 1;
            while fraction.len() < dscale {
                fraction.push_str(&format!("{:04}", group(i)));
                i += 1;
            }
            fraction.truncate(dscale);
            text.push('.');
            text.push_str(&fraction);
        }
        Ok(NumericText(text))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// `HH:MM:SS[.ffffff]` with trailing fractional zeros dropped
fn clock(micros: u64) -> String {
    let mut text = format!(
        "{:02}:{:02}:{:02}",
        micros / 3_600_000_000,
        micros / 60_000_000 % 60,
        micros / 1_000_000 % 60
    );
    let fraction = micros % 1_000_000;
    if fraction != 0 {
        text.push('.');
        text.push_str(format!("{:06}", fraction).trim_end_matches('0'));
    }
    text
}

fn time_of_day(time: chrono::NaiveTime) -> String {
    let micros = u64::from(time.num_seconds_from_midnight()) * 1_000_000
        + u64::from(time.nanosecond() / 1_000);
    clock(micros)
}

/// `interval` in the server's default (`postgres`) output style
struct IntervalText(String);

impl<'a> FromSql<'a> for IntervalText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> WireResult<Self> {
        let micros = i64::from_be_bytes(wire_bytes(raw, 0)?);
        let days = i32::from_be_bytes(wire_bytes(raw, 8)?);
        let months = i32::from_be_bytes(wire_bytes(raw, 12)?);

        let mut parts = Vec::new();
        let mut after_negative = false;
        for (value, unit) in [(months / 12, "year"), (months % 12, "mon"), (days, "day")] {
            if value == 0 {
                continue;
            }
            let plus = if after_negative && value > 0 { "+" } else { "" };
            let plural = if value == 1 { "" } else { "s" };
            parts.push(format!("{}{} {}{}", plus, value, unit, plural));
            after_negative = value < 0;
        }
        if parts.is_empty() || micros != 0 {
            let sign = if micros < 0 {
                "-"
            } else if after_negative {
                "+"
            } else {
                ""
            };
            parts.push(format!("{}{}", sign, clock(micros.unsigned_abs())));
        }
        Ok(IntervalText(parts.join(" ")))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

/// `time` and `timetz`. The zone travels as seconds west of UTC.
struct ClockText(String);

impl<'a> FromSql<'a> for ClockText {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> WireResult<Self> {
        let micros = i64::from_be_bytes(wire_bytes(raw, 0)?);
        let mut text = clock(micros.unsigned_abs());
        if *ty == Type::TIMETZ {
            let zone = i32::from_be_bytes(wire_bytes(raw, 8)?);
            let offset = zone.unsigned_abs();
            let (hours, minutes, seconds) = (offset / 3600, offset / 60 % 60, offset % 60);
            text.push(if zone <= 0 { '+' } else { '-' });
            if seconds != 0 {
                text.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
            } else if minutes != 0 {
                text.push_str(&format!("{:02}:{:02}", hours, minutes));
            } else {
                text.push_str(&format!("{:02}", hours));
            }
        }
        Ok(ClockText(text))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::TIME || *ty == Type::TIMETZ
    }
}
