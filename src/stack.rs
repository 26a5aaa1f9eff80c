//! TCP/IP stack contract consumed by the bridge and the transport adapter.
//!
//! The stack's protocol machinery (ARP, DHCP client internals, neighbor
//! discovery, TCP state machines) stays behind these traits. The bridge
//! drives interface lifecycle and packet injection through [`IpStack`]; the
//! transport adapter drives connection objects through [`Connection`].

extern crate alloc;

use alloc::boxed::Box;
use smoltcp::wire::{EthernetAddress, IpAddress, Ipv4Address, Ipv4Cidr, Ipv6Address};
use thiserror::Error;

use crate::buffer::PacketBuf;

/// Opaque handle to an interface registered with the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfaceHandle(pub usize);

/// Lifecycle state of the interface's IPv6 link-local address.
///
/// A freshly created address is `Tentative` until duplicate address
/// detection settles it into `Valid` or `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv6AddrState {
    Tentative,
    Valid,
    Invalid,
}

/// Transport protocol for a connection object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

/// Low-level failure vocabulary of the stack.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// The stack refused the operation.
    #[error("operation rejected by stack")]
    Rejected,
    /// The peer reset the connection.
    #[error("connection reset")]
    Reset,
    /// The connection or receive queue is closed.
    #[error("connection closed")]
    Closed,
}

/// Callback invoked by the stack on interface status changes, including
/// address assignment and up/down transitions.
pub type StatusCallback = Box<dyn FnMut() + Send>;

/// A static IPv4 address triple supplied at attach time.
///
/// When absent, address assignment is delegated to DHCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticAddrConfig {
    /// Interface address and netmask.
    pub address: Ipv4Cidr,
    /// Default gateway for traffic leaving the subnet.
    pub gateway: Ipv4Address,
}

/// Parameters the bridge supplies when registering an interface.
#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    /// Hardware address obtained from the radio driver.
    pub hw_addr: EthernetAddress,
    /// Link MTU in bytes.
    pub mtu: usize,
    /// Static IPv4 configuration, or `None` to start unaddressed.
    pub ipv4: Option<StaticAddrConfig>,
}

/// One stack connection object: connection oriented, blocking, delivering
/// received data as a sequence of discrete buffers.
pub trait Connection {
    /// Buffer type delivered by [`recv`](Connection::recv). Released by drop,
    /// exactly once.
    type Buf: AsRef<[u8]>;

    fn connect(&mut self, addr: IpAddress, port: u16) -> Result<(), StackError>;

    fn bind(&mut self, addr: IpAddress, port: u16) -> Result<(), StackError>;

    /// Place a bound TCP connection into the listening state.
    fn listen(&mut self) -> Result<(), StackError>;

    /// Block until a peer connects; returns the accepted connection.
    fn accept(&mut self) -> Result<Self, StackError>
    where
        Self: Sized;

    /// Write the whole buffer. `StackError::Reset` reports a peer reset
    /// distinctly from other failures.
    fn write(&mut self, data: &[u8]) -> Result<(), StackError>;

    /// Block until the next received buffer is available and take ownership
    /// of it. Delivered buffers may be of any size, including empty.
    fn recv(&mut self) -> Result<Self::Buf, StackError>;

    /// Close the connection and release its resources.
    fn close(&mut self);
}

/// Interface-level and resolver operations consumed from the stack.
pub trait IpStack {
    type Conn: Connection;

    /// Register a network interface.
    ///
    /// # Returns
    /// * `Ok(handle)` used for all subsequent operations on the interface
    /// * `Err(StackError)` if the stack rejects the registration
    fn add_interface(&mut self, config: InterfaceConfig) -> Result<IfaceHandle, StackError>;

    fn remove_interface(&mut self, iface: IfaceHandle) -> Result<(), StackError>;

    /// Make the interface the stack's default route.
    fn set_default_interface(&mut self, iface: IfaceHandle);

    /// Install or clear the status-change callback for the interface.
    fn set_status_callback(&mut self, iface: IfaceHandle, callback: Option<StatusCallback>);

    fn set_up(&mut self, iface: IfaceHandle);
    fn set_down(&mut self, iface: IfaceHandle);
    fn set_link_up(&mut self, iface: IfaceHandle);
    fn set_link_down(&mut self, iface: IfaceHandle);

    /// Inject a received Ethernet frame into the stack.
    ///
    /// On success the stack takes ownership of the buffer. On rejection the
    /// buffer is handed back so the caller can release it.
    fn inject(&mut self, iface: IfaceHandle, frame: PacketBuf) -> Result<(), PacketBuf>;

    fn ipv4_address(&self, iface: IfaceHandle) -> Ipv4Address;
    fn set_ipv4_address(&mut self, iface: IfaceHandle, address: Ipv4Address);

    /// The interface's IPv6 link-local address, if one has been created.
    fn ipv6_link_local(&self, iface: IfaceHandle) -> Option<Ipv6Address>;

    /// Duplicate-address-detection state of the link-local address.
    fn ipv6_link_local_state(&self, iface: IfaceHandle) -> Ipv6AddrState;

    fn dhcp_start(&mut self, iface: IfaceHandle) -> Result<(), StackError>;
    fn dhcp_renew(&mut self, iface: IfaceHandle) -> Result<(), StackError>;
    fn dhcp_release_and_stop(&mut self, iface: IfaceHandle) -> Result<(), StackError>;

    /// Free the DHCP client's internal per-interface resources.
    fn dhcp_cleanup(&mut self, iface: IfaceHandle);

    /// Invalidate every address-resolution cache entry for the interface.
    fn flush_neighbor_cache(&mut self, iface: IfaceHandle);

    /// Resolve a host name to an IP address.
    fn resolve(&mut self, host: &str) -> Result<IpAddress, StackError>;

    /// Allocate a fresh, unconnected connection object.
    fn connection(&mut self, proto: Protocol) -> Result<Self::Conn, StackError>;
}
