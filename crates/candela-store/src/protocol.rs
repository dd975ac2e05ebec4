//! Request/response packet protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier routing a response back to its requester.
pub type SenderId = u64;

/// Surrogate key of a run row.
pub type RunId = i64;

/// Order number within one run.
pub type OrderId = i64;

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
}

impl OrderSide {
    /// Returns the side as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// One strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Surrogate id assigned by the store.
    pub id: RunId,
    /// Symbol the run traded.
    pub symbol: String,
    /// Strategy name.
    pub strategy: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run stopped, if it has.
    pub stopped_at: Option<DateTime<Utc>>,
}

/// One order within a run, keyed by (run, order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// The run this order belongs to.
    pub run_id: RunId,
    /// Order number within the run.
    pub order_id: OrderId,
    /// Order direction.
    pub side: OrderSide,
    /// Fill price.
    pub price: f64,
    /// Fill size.
    pub size: f64,
    /// When the order was opened.
    pub opened_at: DateTime<Utc>,
    /// When the order was closed, if it has been.
    pub closed_at: Option<DateTime<Utc>>,
}

/// Store operation carried by a request packet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreOp {
    /// Creates a run row, assigning its surrogate id.
    OpenRun {
        /// Symbol the run trades.
        symbol: String,
        /// Strategy name.
        strategy: String,
        /// Run start time.
        started_at: DateTime<Utc>,
    },
    /// Marks a run as stopped.
    CloseRun {
        /// The run to close.
        run_id: RunId,
        /// Run stop time.
        stopped_at: DateTime<Utc>,
    },
    /// Records a newly opened order.
    OpenOrder {
        /// The run the order belongs to.
        run_id: RunId,
        /// Order number within the run.
        order_id: OrderId,
        /// Order direction.
        side: OrderSide,
        /// Fill price.
        price: f64,
        /// Fill size.
        size: f64,
        /// Open time.
        opened_at: DateTime<Utc>,
    },
    /// Marks an order as closed.
    CloseOrder {
        /// The run the order belongs to.
        run_id: RunId,
        /// Order number within the run.
        order_id: OrderId,
        /// Close time.
        closed_at: DateTime<Utc>,
    },
    /// Reads all runs in id order.
    ReadRuns,
    /// Reads one run's orders in order-id order.
    ReadOrders {
        /// The run whose orders to read.
        run_id: RunId,
    },
}

/// Request packet on the caller→store queue.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    /// Identifier echoed back on the response.
    pub sender: SenderId,
    /// The operation to perform.
    pub op: StoreOp,
}

/// Outcome carried by a response packet.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreReply {
    /// A run was created with this id.
    RunOpened(RunId),
    /// The run was marked stopped.
    RunClosed(RunId),
    /// The order was recorded.
    OrderOpened {
        /// The run the order belongs to.
        run_id: RunId,
        /// Order number within the run.
        order_id: OrderId,
    },
    /// The order was marked closed.
    OrderClosed {
        /// The run the order belongs to.
        run_id: RunId,
        /// Order number within the run.
        order_id: OrderId,
    },
    /// All runs, in id order.
    Runs(Vec<RunRecord>),
    /// One run's orders, in order-id order.
    Orders(Vec<OrderRecord>),
    /// The operation failed.
    Failed(String),
}

/// Response packet on the store→caller queue.
#[derive(Debug, Clone)]
pub struct StoreResponse {
    /// The requester this response belongs to.
    pub sender: SenderId,
    /// The operation outcome.
    pub reply: StoreReply,
}
