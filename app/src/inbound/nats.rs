use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use log::{error, info, warn};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use internal::domain::error::BusError;
use internal::port::bus::{ConnectionState, MessageBus, RpcHandler, SubscriptionHandler};

use crate::config::bus_config::BusConfig;
use crate::inbound::model::rpc::{RpcRequest, RpcReply};

type Handlers = Arc<RwLock<HashMap<String, RpcHandler>>>;

struct BusState {
    connection: ConnectionState,
    client: Option<async_nats::Client>,
}

/// NATS realization of the bus contract: requests are served from a
/// subscription on `<path>`, replies correlate through the message's reply
/// subject, broadcasts travel on `<path>.pub`.
pub struct NatsBus {
    config: BusConfig,
    state: Arc<RwLock<BusState>>,
    handlers: Handlers,
}

impl NatsBus {
    pub fn new(config: BusConfig) -> Self {
        NatsBus {
            config,
            state: Arc::new(RwLock::new(BusState {
                connection: ConnectionState::Disconnected,
                client: None,
            })),
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.state.read().await.connection
    }

    async fn connected_client(&self) -> Result<async_nats::Client, BusError> {
        let state = self.state.read().await;
        if state.connection != ConnectionState::Connected {
            return Err(BusError::NotConnected);
        }
        state.client.clone().ok_or(BusError::NotConnected)
    }

    /// Resolves one incoming request envelope to the reply envelope going
    /// back out. Unknown methods and malformed payloads produce error
    /// replies; nothing is dropped silently.
    async fn dispatch(handlers: &Handlers, payload: &[u8]) -> RpcReply {
        let request: RpcRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(err) => return RpcReply::error(None, format!("malformed request: {err}")),
        };
        let handler = handlers.read().await.get(&request.method).cloned();
        match handler {
            Some(handler) => match handler(request.parameters).await {
                Ok(result) => RpcReply::result(request.id, result),
                Err(err) => RpcReply::error(Some(request.id), err),
            },
            None => RpcReply::error(
                Some(request.id),
                BusError::UnknownMethod(request.method).to_string(),
            ),
        }
    }

    fn serve_requests(
        client: async_nats::Client,
        handlers: Handlers,
        mut subscriber: async_nats::Subscriber,
    ) {
        tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                let reply = Self::dispatch(&handlers, &message.payload).await;
                let Some(subject) = message.reply else {
                    continue;
                };
                let payload = match serde_json::to_vec(&reply) {
                    Ok(payload) => payload,
                    Err(err) => {
                        error!("could not encode reply: {err}");
                        continue;
                    }
                };
                if let Err(err) = client.publish(subject, payload.into()).await {
                    error!("could not send reply: {err}");
                }
            }
        });
    }
}

impl MessageBus for NatsBus {
    async fn start(&self) -> Result<(), BusError> {
        {
            let mut state = self.state.write().await;
            if state.connection != ConnectionState::Disconnected {
                return Err(BusError::AlreadyStarted);
            }
            state.connection = ConnectionState::Connecting;
        }

        let url = format!("nats://{}:{}", self.config.host, self.config.port);
        let mut attempt: u32 = 0;
        let client = loop {
            attempt += 1;
            info!("connecting to nats server '{url}', attempt {attempt}");
            match async_nats::connect(&url).await {
                Ok(client) => break client,
                Err(err) => {
                    let delay = self.config.reconnect.delay_for(attempt);
                    error!("cannot connect to nats server '{url}': {err}, next try in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
            }
        };

        let subscriber = match client.subscribe(self.config.path.clone()).await {
            Ok(subscriber) => subscriber,
            Err(err) => {
                self.state.write().await.connection = ConnectionState::Disconnected;
                return Err(BusError::Transport(err.to_string()));
            }
        };
        Self::serve_requests(client.clone(), self.handlers.clone(), subscriber);

        let mut state = self.state.write().await;
        state.client = Some(client);
        state.connection = ConnectionState::Connected;
        info!("connected to nats server '{url}'");
        Ok(())
    }

    async fn req(
        &self,
        target: &str,
        method: &str,
        parameters: Value,
        timeout: Duration,
    ) -> Result<Value, BusError> {
        let client = self.connected_client().await?;
        let request = RpcRequest {
            id: Uuid::new_v4(),
            method: method.into(),
            parameters,
        };
        let payload =
            serde_json::to_vec(&request).map_err(|err| BusError::Transport(err.to_string()))?;

        let message = tokio::time::timeout(timeout, client.request(target.to_string(), payload.into()))
            .await
            .map_err(|_| BusError::Timeout(timeout))?
            .map_err(|err| BusError::Transport(err.to_string()))?;

        let reply: RpcReply = serde_json::from_slice(&message.payload)
            .map_err(|err| BusError::Transport(err.to_string()))?;
        if let Some(error) = reply.error {
            return Err(BusError::Rpc(error));
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }

    async fn reg_rep(&self, method: &str, handler: RpcHandler) -> Result<(), BusError> {
        let previous = self
            .handlers
            .write()
            .await
            .insert(method.to_string(), handler);
        if previous.is_some() {
            warn!("handler for method '{method}' was replaced");
        }
        Ok(())
    }

    async fn publish(&self, payload: Value) -> Result<(), BusError> {
        let client = self.connected_client().await?;
        let bytes =
            serde_json::to_vec(&payload).map_err(|err| BusError::Transport(err.to_string()))?;
        client
            .publish(format!("{}.pub", self.config.path), bytes.into())
            .await
            .map_err(|err| BusError::Transport(err.to_string()))
    }

    async fn reg_sub(&self, path: &str, handler: SubscriptionHandler) -> Result<(), BusError> {
        let client = self.connected_client().await?;
        let mut subscriber = client
            .subscribe(format!("{path}.pub"))
            .await
            .map_err(|err| BusError::Transport(err.to_string()))?;
        tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                match serde_json::from_slice::<Value>(&message.payload) {
                    Ok(payload) => handler(payload),
                    Err(err) => warn!("dropping malformed broadcast: {err}"),
                }
            }
        });
        Ok(())
    }
}
