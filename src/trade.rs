use crate::hooks::{PacketRegistrar, PacketType};
use crate::{Error, UntypedPromise, Value};
use std::{str::FromStr, sync::Arc};
use tracing::{debug, trace};

/// A trade event name no [`TradeListener`] understands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trade event {0:?}")]
pub struct UnknownTradeEvent(pub String);

/// Trade events a [`TradeListener`] understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeEvent {
    /// Another player asked to trade.
    Request,
    /// A trade window opened.
    NewTrade,
}

impl FromStr for TradeEvent {
    type Err = UnknownTradeEvent;

    /// Case-insensitive.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "request" => Ok(TradeEvent::Request),
            "newtrade" => Ok(TradeEvent::NewTrade),
            _ => Err(UnknownTradeEvent(name.to_string())),
        }
    }
}

impl TradeEvent {
    pub fn packet_type(self) -> PacketType {
        match self {
            TradeEvent::Request => PacketType::TradeRequested,
            TradeEvent::NewTrade => PacketType::TradeStart,
        }
    }
}

/// Turns trade packet hooks into an [`UntypedPromise`].
#[derive(Debug)]
pub struct TradeListener<R> {
    registrar: Arc<R>,
}

impl<R> Clone for TradeListener<R> {
    fn clone(&self) -> Self {
        Self {
            registrar: self.registrar.clone(),
        }
    }
}

impl<R> TradeListener<R>
where
    R: PacketRegistrar,
    R::Client: 'static,
    R::Packet: Clone + Send + Sync + 'static,
{
    pub fn new(registrar: Arc<R>) -> Self {
        Self { registrar }
    }

    /// Fails with [`Error::MissingRegistrar`] when no registrar is given.
    pub fn try_new(registrar: Option<Arc<R>>) -> Result<Self, Error> {
        registrar
            .map(Self::new)
            .ok_or(Error::MissingRegistrar("packet registrar"))
    }

    /// Subscribes to the packet behind `event` and returns a fresh promise.
    ///
    /// The promise is resolved with a single [`Value`] holding the packet,
    /// once per received packet. An unknown event name subscribes to nothing,
    /// so the promise never resolves.
    pub fn on(&self, event: &str) -> UntypedPromise {
        let promise = UntypedPromise::new();
        let event = match event.parse::<TradeEvent>() {
            Ok(event) => event,
            Err(unknown) => {
                debug!(%unknown, "nothing hooked");
                return promise;
            }
        };

        let packet_type = event.packet_type();
        debug!(?packet_type, "hooking trade packet");
        let target = promise.clone();
        self.registrar.hook_packet(
            packet_type,
            Box::new(move |_client: &R::Client, packet: &R::Packet| {
                trace!(?packet_type, "trade packet received");
                let value: Value = Arc::new(packet.clone());
                target.invoke_then((vec![value],))
            }),
        );
        promise
    }
}
