//! Single-writer store thread and caller handle.

use crate::protocol::{
    OrderRecord, OrderSide, RunRecord, StoreOp, StoreReply, StoreRequest, StoreResponse,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::JoinHandle;
use thiserror::Error;

/// Errors that can occur operating the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database.
    #[error("Failed to open store '{path}': {source}")]
    Open {
        /// The database path that could not be opened.
        path: PathBuf,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// The store thread has exited.
    #[error("Store disconnected")]
    Disconnected,

    /// SQLite operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Caller endpoint of the two store queues.
///
/// Requests go out on the caller→store queue, responses come back on the
/// store→caller queue. Dropping the handle disconnects the request queue
/// and lets the store thread drain and exit.
#[derive(Debug)]
pub struct StoreHandle {
    tx: Sender<StoreRequest>,
    rx: Receiver<StoreResponse>,
}

impl StoreHandle {
    /// Sends one request packet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Disconnected`] when the store thread exited.
    pub fn send(&self, request: StoreRequest) -> Result<(), StoreError> {
        self.tx.send(request).map_err(|_| StoreError::Disconnected)
    }

    /// Receives the next response packet, blocking until one arrives.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Disconnected`] when the store thread exited.
    pub fn recv(&self) -> Result<StoreResponse, StoreError> {
        self.rx.recv().map_err(|_| StoreError::Disconnected)
    }

    /// Sends one operation and blocks for its reply.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Disconnected`] when the store thread exited.
    pub fn request(&self, sender: u64, op: StoreOp) -> Result<StoreReply, StoreError> {
        self.send(StoreRequest { sender, op })?;
        Ok(self.recv()?.reply)
    }
}

/// Single-writer run/order store.
///
/// All database access happens on one dedicated thread owning the
/// connection, so every operation is serialized regardless of how many
/// callers share the request queue.
#[derive(Debug)]
pub struct Store;

impl Store {
    /// Spawns the store thread over a database file.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened or the schema
    /// cannot be created.
    pub fn spawn(path: &Path) -> Result<(StoreHandle, JoinHandle<()>), StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::spawn_with(conn)
    }

    /// Spawns the store thread over an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error when the schema cannot be created.
    pub fn spawn_in_memory() -> Result<(StoreHandle, JoinHandle<()>), StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::spawn_with(conn)
    }

    fn spawn_with(conn: Connection) -> Result<(StoreHandle, JoinHandle<()>), StoreError> {
        create_schema(&conn)?;
        let (request_tx, request_rx) = channel::<StoreRequest>();
        let (response_tx, response_rx) = channel::<StoreResponse>();

        let handle = std::thread::spawn(move || {
            writer_loop(&conn, &request_rx, &response_tx);
        });

        Ok((
            StoreHandle {
                tx: request_tx,
                rx: response_rx,
            },
            handle,
        ))
    }
}

fn create_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS runs (
             id         INTEGER PRIMARY KEY AUTOINCREMENT,
             symbol     TEXT NOT NULL,
             strategy   TEXT NOT NULL,
             started_at TEXT NOT NULL,
             stopped_at TEXT
         );
         CREATE TABLE IF NOT EXISTS orders (
             run_id     INTEGER NOT NULL REFERENCES runs(id),
             order_id   INTEGER NOT NULL,
             side       TEXT NOT NULL,
             price      REAL NOT NULL,
             size       REAL NOT NULL,
             opened_at  TEXT NOT NULL,
             closed_at  TEXT,
             PRIMARY KEY (run_id, order_id)
         );",
    )
}

/// Serves request packets until the request queue disconnects.
fn writer_loop(
    conn: &Connection,
    requests: &Receiver<StoreRequest>,
    responses: &Sender<StoreResponse>,
) {
    while let Ok(request) = requests.recv() {
        let reply = apply(conn, request.op)
            .unwrap_or_else(|e| StoreReply::Failed(e.to_string()));
        if responses
            .send(StoreResponse {
                sender: request.sender,
                reply,
            })
            .is_err()
        {
            break;
        }
    }
    tracing::debug!("store writer thread exiting");
}

fn apply(conn: &Connection, op: StoreOp) -> Result<StoreReply, rusqlite::Error> {
    match op {
        StoreOp::OpenRun {
            symbol,
            strategy,
            started_at,
        } => {
            conn.execute(
                "INSERT INTO runs (symbol, strategy, started_at) VALUES (?1, ?2, ?3)",
                (&symbol, &strategy, started_at),
            )?;
            Ok(StoreReply::RunOpened(conn.last_insert_rowid()))
        }
        StoreOp::CloseRun { run_id, stopped_at } => {
            let changed = conn.execute(
                "UPDATE runs SET stopped_at = ?2 WHERE id = ?1",
                (run_id, stopped_at),
            )?;
            if changed == 0 {
                return Ok(StoreReply::Failed(format!("unknown run id {run_id}")));
            }
            Ok(StoreReply::RunClosed(run_id))
        }
        StoreOp::OpenOrder {
            run_id,
            order_id,
            side,
            price,
            size,
            opened_at,
        } => {
            conn.execute(
                "INSERT INTO orders (run_id, order_id, side, price, size, opened_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (run_id, order_id, side.as_str(), price, size, opened_at),
            )?;
            Ok(StoreReply::OrderOpened { run_id, order_id })
        }
        StoreOp::CloseOrder {
            run_id,
            order_id,
            closed_at,
        } => {
            let changed = conn.execute(
                "UPDATE orders SET closed_at = ?3 WHERE run_id = ?1 AND order_id = ?2",
                (run_id, order_id, closed_at),
            )?;
            if changed == 0 {
                return Ok(StoreReply::Failed(format!(
                    "unknown order ({run_id}, {order_id})"
                )));
            }
            Ok(StoreReply::OrderClosed { run_id, order_id })
        }
        StoreOp::ReadRuns => {
            let mut stmt = conn.prepare(
                "SELECT id, symbol, strategy, started_at, stopped_at FROM runs ORDER BY id",
            )?;
            let runs = stmt
                .query_map([], |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        symbol: row.get(1)?,
                        strategy: row.get(2)?,
                        started_at: row.get(3)?,
                        stopped_at: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(StoreReply::Runs(runs))
        }
        StoreOp::ReadOrders { run_id } => {
            let mut stmt = conn.prepare(
                "SELECT run_id, order_id, side, price, size, opened_at, closed_at
                 FROM orders WHERE run_id = ?1 ORDER BY order_id",
            )?;
            let orders = stmt
                .query_map([run_id], |row| {
                    let side: String = row.get(2)?;
                    let side = match side.as_str() {
                        "buy" => OrderSide::Buy,
                        "sell" => OrderSide::Sell,
                        other => {
                            return Err(rusqlite::Error::FromSqlConversionFailure(
                                2,
                                rusqlite::types::Type::Text,
                                format!("unknown order side '{other}'").into(),
                            ));
                        }
                    };
                    Ok(OrderRecord {
                        run_id: row.get(0)?,
                        order_id: row.get(1)?,
                        side,
                        price: row.get(3)?,
                        size: row.get(4)?,
                        opened_at: row.get(5)?,
                        closed_at: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(StoreReply::Orders(orders))
        }
    }
}
