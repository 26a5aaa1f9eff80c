// Radio driver contract consumed by the bridge

use smoltcp::wire::EthernetAddress;

use crate::buffer::PacketBuf;
use crate::error::NetError;

/// Trait for WLAN radio drivers.
///
/// The bridge consumes the driver through this narrow contract; scan, join,
/// and security negotiation stay inside the driver. Received frames travel
/// the other way: the driver's delivery context calls
/// [`NetifBridge::process_ethernet_data`](crate::bridge::NetifBridge::process_ethernet_data)
/// once per frame.
pub trait RadioDriver: Send {
    /// Whether the radio can currently accept a frame for transmission.
    fn ready_to_transmit(&self) -> bool;

    /// Queue an Ethernet frame for transmission.
    ///
    /// Ownership of the buffer moves to the driver. Transmission completes
    /// asynchronously on a driver-owned thread, which also releases the
    /// buffer; neither event is observable through this layer.
    fn send(&mut self, frame: PacketBuf);

    /// Read the hardware address of the radio interface.
    fn mac_address(&self) -> Result<EthernetAddress, NetError>;

    /// Ask the radio to accept frames sent to a link-layer multicast address.
    fn register_multicast(&mut self, addr: EthernetAddress) -> Result<(), NetError>;

    /// Remove a previously registered link-layer multicast address.
    fn unregister_multicast(&mut self, addr: EthernetAddress) -> Result<(), NetError>;
}
