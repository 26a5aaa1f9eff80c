//! Address acquisition and teardown sequencing.
//!
//! Stateless helpers driven by the bridge at interface lifecycle points:
//! waiting out IPv6 duplicate address detection on bring-up, clearing a
//! stale lease before starting DHCP, and releasing the lease with a grace
//! period on bring-down. Callers inject `now_ms`/`sleep_ms` so the blocking
//! waits stay off this crate's packet paths and out of its dependencies.

use log::{info, warn};
use smoltcp::wire::Ipv4Address;

use crate::error::NetError;
use crate::stack::{IfaceHandle, IpStack, Ipv6AddrState};

/// Retry interval while the link-local address is tentative. Matches the
/// stack's neighbor-discovery timer tick.
pub const ND_TIMER_INTERVAL_MS: i64 = 1000;

/// Upper bound on the tentative-address wait. Duplicate address detection
/// normally settles within a few timer ticks; waiting forever would turn a
/// wedged stack into a hang.
pub const IPV6_DAD_TIMEOUT_MS: i64 = 10_000;

/// Pause after a successful DHCP start, giving the exchange a head start.
pub const DHCP_START_GRACE_MS: i64 = 10;

/// Pause after releasing the lease, letting the release message drain
/// before the link goes down.
pub const DHCP_STOP_GRACE_MS: i64 = 400;

/// Pause after requesting a DHCP renew.
pub const DHCP_RENEW_GRACE_MS: i64 = 100;

/// Terminal outcome of the tentative-address wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv6AddrOutcome {
    /// Duplicate address detection passed; the address is usable.
    Valid,
    /// Detection failed; IPv6 is not usable on this link.
    Invalid,
    /// The address never left the tentative state within
    /// [`IPV6_DAD_TIMEOUT_MS`].
    TimedOut,
}

/// Block until the interface's IPv6 link-local address leaves the tentative
/// state, polling every [`ND_TIMER_INTERVAL_MS`].
///
/// `Valid` and `Invalid` are both logged and both count as a completed
/// wait; only `TimedOut` indicates something is wrong.
pub fn wait_for_link_local<S, F, D>(
    stack: &S,
    iface: IfaceHandle,
    now_ms: &mut F,
    sleep_ms: &mut D,
) -> Ipv6AddrOutcome
where
    S: IpStack,
    F: FnMut() -> i64,
    D: FnMut(i64),
{
    let start = now_ms();
    loop {
        match stack.ipv6_link_local_state(iface) {
            Ipv6AddrState::Tentative => {
                if now_ms() - start >= IPV6_DAD_TIMEOUT_MS {
                    warn!("IPv6 link-local address still tentative after {} ms", IPV6_DAD_TIMEOUT_MS);
                    return Ipv6AddrOutcome::TimedOut;
                }
                sleep_ms(ND_TIMER_INTERVAL_MS);
            }
            Ipv6AddrState::Valid => {
                match stack.ipv6_link_local(iface) {
                    Some(addr) => info!("IPv6 network ready, address {}", addr),
                    None => info!("IPv6 network ready"),
                }
                return Ipv6AddrOutcome::Valid;
            }
            Ipv6AddrState::Invalid => {
                info!("IPv6 network not ready");
                return Ipv6AddrOutcome::Invalid;
            }
        }
    }
}

/// Clear any stale IPv4 address and start the DHCP client.
///
/// The previous lease's address must not linger on the interface while the
/// new exchange runs, so the address is zeroed first.
pub fn start_dhcp<S, D>(
    stack: &mut S,
    iface: IfaceHandle,
    sleep_ms: &mut D,
) -> Result<(), NetError>
where
    S: IpStack,
    D: FnMut(i64),
{
    stack.set_ipv4_address(iface, Ipv4Address::UNSPECIFIED);
    stack
        .dhcp_start(iface)
        .map_err(|_| NetError::DhcpStartFailed)?;
    sleep_ms(DHCP_START_GRACE_MS);
    Ok(())
}

/// Release the lease and stop the DHCP client, then wait out the teardown
/// grace period. A stack refusal is logged, not propagated: the interface
/// is on its way down regardless.
pub fn stop_dhcp<S, D>(stack: &mut S, iface: IfaceHandle, sleep_ms: &mut D)
where
    S: IpStack,
    D: FnMut(i64),
{
    if stack.dhcp_release_and_stop(iface).is_err() {
        warn!("DHCP release was rejected by the stack");
    }
    sleep_ms(DHCP_STOP_GRACE_MS);
}

/// Invalidate the address-resolution cache and request a DHCP renew.
///
/// Used after an authentication or handshake failure that may indicate the
/// network state underneath the lease has changed.
pub fn renew<S, D>(stack: &mut S, iface: IfaceHandle, sleep_ms: &mut D) -> Result<(), NetError>
where
    S: IpStack,
    D: FnMut(i64),
{
    stack.flush_neighbor_cache(iface);
    stack.dhcp_renew(iface).map_err(|_| NetError::RenewFailed)?;
    sleep_ms(DHCP_RENEW_GRACE_MS);
    Ok(())
}
