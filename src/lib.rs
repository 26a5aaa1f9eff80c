#![no_std]

// Bridging layer between a packet radio driver and the TCP/IP stack,
// with a byte-stream transport adapter for TLS on top

#[macro_use]
extern crate alloc;

pub mod addr;
pub mod bridge;
pub mod buffer;
pub mod driver;
pub mod error;
pub mod multicast;
pub mod stack;
pub mod transport;

// Re-export commonly used types
pub use bridge::{Activity, LogicalInterface, NetifBridge, TxStatus, LINK_MTU};
pub use buffer::{duplicate, OutboundPacket, PacketBuf};
pub use driver::RadioDriver;
pub use error::NetError;
pub use multicast::FilterAction;
pub use stack::{
    Connection, IfaceHandle, InterfaceConfig, IpStack, Ipv6AddrState, Protocol, StackError,
    StaticAddrConfig, StatusCallback,
};
pub use transport::NetContext;
