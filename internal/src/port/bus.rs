use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::domain::error::BusError;

/// Connection lifecycle of a bus instance; transitions happen only inside
/// the transport adapter.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Handler invoked when a request for a registered method arrives. The
/// `Err` string becomes the `error` field of the reply envelope.
pub type RpcHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// Handler invoked for every broadcast received on a subscribed path.
pub type SubscriptionHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Transport-agnostic request/reply + publish/subscribe contract.
///
/// Every send-type operation verifies the connection state first and returns
/// `Err(BusError::NotConnected)` as a value when disconnected; disconnection
/// is a recoverable signal, not a panic.
pub trait MessageBus {
    /// Establishes the connection, retrying with backoff until it succeeds,
    /// and begins serving registered RPC handlers. Starting an already
    /// started bus is an error.
    fn start(&self) -> impl Future<Output = Result<(), BusError>> + Send;

    /// Sends a correlated request to `target` and awaits the matching reply.
    fn req(
        &self,
        target: &str,
        method: &str,
        parameters: Value,
        timeout: Duration,
    ) -> impl Future<Output = Result<Value, BusError>> + Send;

    /// Registers `handler` for incoming requests naming `method`. Requests
    /// for methods nobody registered are answered with an error reply.
    fn reg_rep(
        &self,
        method: &str,
        handler: RpcHandler,
    ) -> impl Future<Output = Result<(), BusError>> + Send;

    /// Fire-and-forget broadcast on this bus's `<path>.pub` subject.
    fn publish(&self, payload: Value) -> impl Future<Output = Result<(), BusError>> + Send;

    /// Subscribes `handler` to broadcasts on `<path>.pub`.
    fn reg_sub(
        &self,
        path: &str,
        handler: SubscriptionHandler,
    ) -> impl Future<Output = Result<(), BusError>> + Send;
}
