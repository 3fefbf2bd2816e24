//! The boundary with the proxy that owns the actual command and packet hooks.
//!
//! The proxy is an external collaborator. Listeners only need to hand it a
//! raw handler per command name or packet type; there is no unsubscribe.
//! A raw handler returns whatever the promise it drives returned, so an
//! unhandled rejection reaches the proxy instead of being dropped.
//!
use crate::Error;

/// Raw handler for a typed command: `(client, command, args)`. `args` is
/// `None` when the command was typed without arguments.
pub type CommandHook<C> = Box<dyn FnMut(&C, &str, Option<&[String]>) -> Result<(), Error> + Send>;

/// Raw handler for a received packet: `(client, packet)`.
pub type PacketHook<C, P> = Box<dyn FnMut(&C, &P) -> Result<(), Error> + Send>;

/// Packet types the listeners subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PacketType {
    TradeRequested,
    TradeStart,
}

pub trait CommandRegistrar {
    /// The connection a command was typed on.
    type Client;

    fn hook_command(&self, command: &str, hook: CommandHook<Self::Client>);
}

pub trait PacketRegistrar {
    type Client;
    type Packet;

    fn hook_packet(&self, packet_type: PacketType, hook: PacketHook<Self::Client, Self::Packet>);
}
