// IP multicast group to link-layer multicast address mapping

use smoltcp::wire::{EthernetAddress, IpAddress};

/// Requested change to the radio's multicast address filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    Add,
    Delete,
}

/// Link-layer multicast address targeting all IPv6 nodes (ff02::1).
///
/// Registered with the radio at attach time so neighbor discovery traffic
/// is not filtered out.
pub const ALL_NODES_MAC: EthernetAddress =
    EthernetAddress([0x33, 0x33, 0x00, 0x00, 0x00, 0x01]);

/// Derive the link-layer multicast address for an IP multicast group.
///
/// IPv4 groups map to `01:00:5e` plus the low 23 bits of the group address
/// (RFC 1112); IPv6 groups map to `33:33` plus the low 32 bits (RFC 2464).
/// The mapping is deterministic and recomputed per request; nothing is
/// stored.
pub fn group_to_mac(group: IpAddress) -> EthernetAddress {
    match group {
        IpAddress::Ipv4(v4) => {
            let ip = v4.0;
            EthernetAddress([0x01, 0x00, 0x5e, ip[1] & 0x7f, ip[2], ip[3]])
        }
        IpAddress::Ipv6(v6) => {
            let ip = v6.0;
            EthernetAddress([0x33, 0x33, ip[12], ip[13], ip[14], ip[15]])
        }
    }
}

/// Solicited-node multicast MAC for the link-local address derived from a
/// hardware address: `33:33:ff` plus the last three octets of the MAC.
///
/// Neighbor discovery sends duplicate-address-detection probes to this
/// address, so the radio must pass it before the link-local address can
/// leave the tentative state.
pub fn solicited_node_mac(hw_addr: EthernetAddress) -> EthernetAddress {
    let mac = hw_addr.0;
    EthernetAddress([0x33, 0x33, 0xff, mac[3], mac[4], mac[5]])
}
