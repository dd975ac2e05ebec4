//! Persistence collaborator for candela.
//!
//! A request/response packet protocol over two unidirectional queues:
//!
//! - [`StoreRequest`] / [`StoreResponse`] - the packet pair
//! - [`StoreOp`] / [`StoreReply`] - typed operations and outcomes
//! - [`Store`] - spawns the single-writer thread owning the database
//! - [`StoreHandle`] - caller endpoint of both queues
//!
//! The dedicated writer thread serializes every access to the backing
//! relational schema (`runs` keyed by a surrogate id, `orders` keyed by
//! run and order id).

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod protocol;
mod store;

pub use protocol::{
    OrderId, OrderRecord, OrderSide, RunId, RunRecord, SenderId, StoreOp, StoreReply,
    StoreRequest, StoreResponse,
};
pub use store::{Store, StoreError, StoreHandle};
