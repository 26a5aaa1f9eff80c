//! Network interface bridge between the radio driver and the TCP/IP stack.
//!
//! Owns the single logical interface: attach/detach against the stack,
//! up/down transitions with address acquisition, the receive path (driver
//! frames into the stack, EAPOL frames redirected), the transmit path
//! (stack frames duplicated and handed to the radio), and the multicast
//! filter relay. One interface is supported at a time; multiple concurrent
//! interfaces are a future extension.
//!
//! The bridge performs no internal locking beyond its callback registries.
//! The interface and its address state are a single mutually exclusive
//! resource: callers must serialize lifecycle and transport calls behind
//! one mutex or one coordinating task. The receive path never blocks and is
//! safe to call from the driver's delivery context once that serialization
//! is in place.

extern crate alloc;

use alloc::boxed::Box;
use alloc::sync::Arc;
use log::{debug, warn};
use smoltcp::wire::{EthernetAddress, EthernetFrame, EthernetProtocol, IpAddress};
use spin::Mutex;

use crate::addr::{self, Ipv6AddrOutcome};
use crate::buffer::{self, OutboundPacket, PacketBuf};
use crate::driver::RadioDriver;
use crate::error::NetError;
use crate::multicast::{self, FilterAction};
use crate::stack::{IfaceHandle, InterfaceConfig, IpStack, StaticAddrConfig};

/// Link MTU presented to the stack.
pub const LINK_MTU: usize = 1500;

/// Ethernet type field of link-layer authentication frames.
const ETHERTYPE_EAPOL: u16 = 0x888e;

/// Direction of packet activity reported to the activity callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Receive,
    Transmit,
}

/// Outcome of submitting an outbound frame to the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// The frame was duplicated and queued with the driver. Completion is
    /// asynchronous and not observable here.
    Submitted,
    /// The radio is not ready to transmit. The stack retains ownership of
    /// the frame and may retry.
    NotReady,
}

/// Callback invoked when the interface's IP address changes.
pub type IpChangeCallback = Box<dyn FnMut() + Send>;

/// Callback invoked once per packet moving through the bridge.
pub type ActivityCallback = Box<dyn FnMut(Activity) + Send>;

/// Handler receiving redirected EAPOL frames. The handler owns the buffer.
pub type EapolHandler = Box<dyn FnMut(PacketBuf) + Send>;

/// Single-slot callback registries. Last write wins; `None` deregisters.
#[derive(Default)]
struct Callbacks {
    ip_change: Option<IpChangeCallback>,
    activity: Option<ActivityCallback>,
    eapol: Option<EapolHandler>,
}

/// In-memory record of the one active network attachment point.
///
/// Assigned addresses live in the stack and are read through
/// [`IpStack`]; this record tracks identity and link state.
#[derive(Debug)]
pub struct LogicalInterface {
    handle: IfaceHandle,
    hw_addr: EthernetAddress,
    mtu: usize,
    static_config: Option<StaticAddrConfig>,
    link_up: bool,
}

impl LogicalInterface {
    pub fn handle(&self) -> IfaceHandle {
        self.handle
    }

    pub fn hw_addr(&self) -> EthernetAddress {
        self.hw_addr
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn is_link_up(&self) -> bool {
        self.link_up
    }

    /// The static address configuration copied in at attach time, if any.
    pub fn static_config(&self) -> Option<&StaticAddrConfig> {
        self.static_config.as_ref()
    }
}

/// Bridge between a [`RadioDriver`] and an [`IpStack`].
pub struct NetifBridge<D: RadioDriver, S: IpStack> {
    driver: D,
    stack: S,
    iface: Option<LogicalInterface>,
    dhcp_required: bool,
    dhcp_running: bool,
    callbacks: Arc<Mutex<Callbacks>>,
}

impl<D: RadioDriver, S: IpStack> NetifBridge<D, S> {
    pub fn new(driver: D, stack: S) -> Self {
        Self {
            driver,
            stack,
            iface: None,
            dhcp_required: false,
            dhcp_running: false,
            callbacks: Arc::new(Mutex::new(Callbacks::default())),
        }
    }

    /// The attached logical interface, if any.
    pub fn interface(&self) -> Option<&LogicalInterface> {
        self.iface.as_ref()
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    /// Mutable access to the stack, used by transport operations.
    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    /// Register the radio with the stack and make it the default route.
    ///
    /// The hardware address is read from the driver and supplied to the
    /// stack; a static IPv4 configuration, when given, is copied in,
    /// otherwise address assignment is deferred to DHCP at
    /// [`bring_up`](Self::bring_up). The IPv6 neighbor-discovery multicast
    /// addresses are pre-registered with the radio so detection probes get
    /// through.
    ///
    /// # Returns
    /// * `Err(NetError::AlreadyAttached)` if an interface already exists
    /// * `Err(NetError::AttachFailed)` if the stack rejects the registration
    pub fn attach(&mut self, config: Option<StaticAddrConfig>) -> Result<(), NetError> {
        if self.iface.is_some() {
            return Err(NetError::AlreadyAttached);
        }

        let hw_addr = self.driver.mac_address()?;
        let handle = self
            .stack
            .add_interface(InterfaceConfig {
                hw_addr,
                mtu: LINK_MTU,
                ipv4: config,
            })
            .map_err(|_| NetError::AttachFailed)?;
        self.stack.set_default_interface(handle);

        // Forward stack status changes to the registered ip-change slot.
        // The slot is taken out of the registry for the duration of the
        // call so the callback runs without the lock held; a replacement
        // registered during the call wins over the put-back.
        let callbacks = self.callbacks.clone();
        self.stack.set_status_callback(
            handle,
            Some(Box::new(move || {
                let cb = callbacks.lock().ip_change.take();
                if let Some(mut cb) = cb {
                    cb();
                    let mut slots = callbacks.lock();
                    if slots.ip_change.is_none() {
                        slots.ip_change = Some(cb);
                    }
                }
            })),
        );

        // Neighbor discovery probes arrive on these two multicast addresses.
        for mac in [multicast::solicited_node_mac(hw_addr), multicast::ALL_NODES_MAC] {
            if self.driver.register_multicast(mac).is_err() {
                warn!("failed to register neighbor discovery multicast address {}", mac);
            }
        }

        self.dhcp_required = config.is_none();
        self.dhcp_running = false;
        self.iface = Some(LogicalInterface {
            handle,
            hw_addr,
            mtu: LINK_MTU,
            static_config: config,
            link_up: false,
        });
        Ok(())
    }

    /// Remove the interface from the stack and release its record.
    ///
    /// # Returns
    /// * `Err(NetError::NotAttached)` if no interface exists
    pub fn detach(&mut self) -> Result<(), NetError> {
        let iface = self.iface.take().ok_or(NetError::NotAttached)?;
        self.stack.set_status_callback(iface.handle, None);
        if self.stack.remove_interface(iface.handle).is_err() {
            warn!("stack refused to remove interface");
        }
        self.dhcp_required = false;
        self.dhcp_running = false;
        Ok(())
    }

    /// Bring the interface and link up, wait for the IPv6 link-local
    /// address to settle, and start DHCP when no static address was given.
    ///
    /// Blocks on the tentative-address wait and the DHCP grace period;
    /// `now_ms`/`sleep_ms` supply the time base. Must not be called from
    /// the driver's packet delivery context.
    ///
    /// # Returns
    /// * `Err(NetError::NotAttached)` if no interface exists
    /// * `Err(NetError::Ipv6Timeout)` if duplicate address detection never settles
    /// * `Err(NetError::DhcpStartFailed)` if the stack rejects the DHCP start
    pub fn bring_up<F, Sl>(&mut self, mut now_ms: F, mut sleep_ms: Sl) -> Result<(), NetError>
    where
        F: FnMut() -> i64,
        Sl: FnMut(i64),
    {
        let handle = self.iface.as_ref().ok_or(NetError::NotAttached)?.handle;

        self.stack.set_up(handle);
        self.stack.set_link_up(handle);
        if let Some(iface) = self.iface.as_mut() {
            iface.link_up = true;
        }

        match addr::wait_for_link_local(&self.stack, handle, &mut now_ms, &mut sleep_ms) {
            Ipv6AddrOutcome::TimedOut => return Err(NetError::Ipv6Timeout),
            Ipv6AddrOutcome::Valid | Ipv6AddrOutcome::Invalid => {}
        }

        if self.dhcp_required {
            addr::start_dhcp(&mut self.stack, handle, &mut sleep_ms)?;
            self.dhcp_running = true;
        }
        Ok(())
    }

    /// Release the DHCP lease if one is held, then take the link and
    /// interface down. Safe to call again when already down; the lease is
    /// never released twice.
    ///
    /// # Returns
    /// * `Err(NetError::NotAttached)` if no interface exists
    pub fn bring_down<Sl>(&mut self, mut sleep_ms: Sl) -> Result<(), NetError>
    where
        Sl: FnMut(i64),
    {
        let handle = self.iface.as_ref().ok_or(NetError::NotAttached)?.handle;

        if self.dhcp_running {
            addr::stop_dhcp(&mut self.stack, handle, &mut sleep_ms);
            self.dhcp_running = false;
        }
        // A stale lease must not survive into the next bring_up.
        self.stack.dhcp_cleanup(handle);

        self.stack.set_link_down(handle);
        self.stack.set_down(handle);
        if let Some(iface) = self.iface.as_mut() {
            iface.link_up = false;
        }
        Ok(())
    }

    /// Invalidate address-resolution state and renew the DHCP lease.
    ///
    /// Intended for recovery after an authentication or handshake failure
    /// that suggests the network changed under the current lease.
    pub fn renew_address<Sl>(&mut self, mut sleep_ms: Sl) -> Result<(), NetError>
    where
        Sl: FnMut(i64),
    {
        let handle = self.iface.as_ref().ok_or(NetError::NotAttached)?.handle;
        addr::renew(&mut self.stack, handle, &mut sleep_ms)
    }

    /// Register or clear the IP address change callback. Last write wins.
    pub fn register_ip_change_callback(&mut self, callback: Option<IpChangeCallback>) {
        self.callbacks.lock().ip_change = callback;
    }

    /// Register or clear the packet activity callback. Last write wins.
    pub fn register_activity_callback(&mut self, callback: Option<ActivityCallback>) {
        self.callbacks.lock().activity = callback;
    }

    /// Register or clear the EAPOL frame handler. Last write wins.
    pub fn register_eapol_handler(&mut self, handler: Option<EapolHandler>) {
        self.callbacks.lock().eapol = handler;
    }

    /// Entry point for frames delivered by the radio driver.
    ///
    /// EAPOL frames are redirected to the registered handler, which takes
    /// ownership of the buffer; with no handler registered they are
    /// dropped. Everything else is injected into the stack, and released
    /// here only when the stack is absent or rejects the frame. Never
    /// blocks; delivery failures are logged, not propagated, because the
    /// driver's delivery callback has no error contract back to the radio.
    pub fn process_ethernet_data(&mut self, frame: PacketBuf) {
        let ethertype = match EthernetFrame::new_checked(frame.as_slice()) {
            Ok(parsed) => parsed.ethertype(),
            Err(_) => {
                debug!("dropping runt frame ({} bytes)", frame.len());
                return;
            }
        };

        if ethertype == EthernetProtocol::Unknown(ETHERTYPE_EAPOL) {
            // Bound to a local so the registry guard is released before
            // the handler runs.
            let handler = self.callbacks.lock().eapol.take();
            match handler {
                Some(mut handler) => {
                    // Run the handler without the registry lock held.
                    handler(frame);
                    let mut slots = self.callbacks.lock();
                    if slots.eapol.is_none() {
                        slots.eapol = Some(handler);
                    }
                }
                None => debug!("dropping EAPOL frame, no handler registered"),
            }
            return;
        }

        let handle = match self.iface.as_ref() {
            Some(iface) => iface.handle,
            // Stack not ready yet; drop the frame.
            None => return,
        };

        self.signal_activity(Activity::Receive);
        if let Err(frame) = self.stack.inject(handle, frame) {
            debug!("stack rejected inbound frame ({} bytes)", frame.len());
        }
    }

    /// Output path wired into the stack: duplicate an outbound frame into a
    /// driver-owned buffer and queue it with the radio.
    ///
    /// # Returns
    /// * `Ok(TxStatus::NotReady)` when the radio cannot take the frame; the
    ///   stack keeps ownership and may retry
    /// * `Err(NetError::OutOfMemory)` if the duplicate cannot be allocated
    pub fn output(&mut self, packet: &OutboundPacket) -> Result<TxStatus, NetError> {
        if self.iface.is_none() {
            return Err(NetError::NotAttached);
        }

        if !self.driver.ready_to_transmit() {
            warn!("radio is not ready, packet not sent");
            return Ok(TxStatus::NotReady);
        }

        let frame = match buffer::duplicate(packet) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("failed to allocate buffer for outgoing packet");
                return Err(e);
            }
        };

        self.signal_activity(Activity::Transmit);
        self.driver.send(frame);
        Ok(TxStatus::Submitted)
    }

    /// Relay a stack multicast filter change to the radio.
    ///
    /// Derives the link-layer multicast address for the group and registers
    /// or unregisters it with the driver.
    ///
    /// # Returns
    /// * `Err(NetError::NotAttached)` if no interface exists
    /// * `Err(NetError::FilterRejected)` if the driver refuses the change
    pub fn multicast_filter_change(
        &mut self,
        group: IpAddress,
        action: FilterAction,
    ) -> Result<(), NetError> {
        if self.iface.is_none() {
            return Err(NetError::NotAttached);
        }
        let mac = multicast::group_to_mac(group);
        let result = match action {
            FilterAction::Add => self.driver.register_multicast(mac),
            FilterAction::Delete => self.driver.unregister_multicast(mac),
        };
        result.map_err(|_| NetError::FilterRejected)
    }

    fn signal_activity(&self, activity: Activity) {
        // Same take/put-back discipline as the other slots: the callback
        // runs without the registry lock held.
        let cb = self.callbacks.lock().activity.take();
        if let Some(mut cb) = cb {
            cb(activity);
            let mut slots = self.callbacks.lock();
            if slots.activity.is_none() {
                slots.activity = Some(cb);
            }
        }
    }
}
