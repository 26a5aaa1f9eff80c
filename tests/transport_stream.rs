//! End-to-end exercise of the transport adapter over an in-memory loopback
//! stack: bind/listen/accept on one side, connect on the other, and byte
//! streams reassembled across arbitrarily sized buffers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use embedded_io::{Read, Write};
use netbridge::{
    Connection, IfaceHandle, InterfaceConfig, IpStack, Ipv6AddrState, NetContext, NetError,
    PacketBuf, Protocol, StackError, StatusCallback,
};
use smoltcp::wire::{IpAddress, Ipv4Address, Ipv6Address};

type Queue = Arc<Mutex<VecDeque<Vec<u8>>>>;

/// One side of an in-memory connection pair.
struct LoopConn {
    tx: Queue,
    rx: Queue,
    accept_queue: Arc<Mutex<VecDeque<LoopConn>>>,
    open: bool,
}

impl LoopConn {
    fn unwired(accept_queue: Arc<Mutex<VecDeque<LoopConn>>>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(VecDeque::new())),
            rx: Arc::new(Mutex::new(VecDeque::new())),
            accept_queue,
            open: false,
        }
    }
}

impl Connection for LoopConn {
    type Buf = Vec<u8>;

    fn connect(&mut self, _addr: IpAddress, _port: u16) -> Result<(), StackError> {
        // Wire up a fresh pair and park the peer side for the listener.
        let peer = LoopConn {
            tx: self.rx.clone(),
            rx: self.tx.clone(),
            accept_queue: self.accept_queue.clone(),
            open: true,
        };
        self.open = true;
        self.accept_queue.lock().unwrap().push_back(peer);
        Ok(())
    }

    fn bind(&mut self, _addr: IpAddress, _port: u16) -> Result<(), StackError> {
        Ok(())
    }

    fn listen(&mut self) -> Result<(), StackError> {
        Ok(())
    }

    fn accept(&mut self) -> Result<Self, StackError> {
        self.accept_queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(StackError::Closed)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StackError> {
        if !self.open {
            return Err(StackError::Closed);
        }
        self.tx.lock().unwrap().push_back(data.to_vec());
        Ok(())
    }

    fn recv(&mut self) -> Result<Self::Buf, StackError> {
        self.rx.lock().unwrap().pop_front().ok_or(StackError::Closed)
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Loopback stack: every resolution answers 127.0.0.1 and every connection
/// pair is an in-memory queue.
struct LoopStack {
    accept_queue: Arc<Mutex<VecDeque<LoopConn>>>,
}

impl LoopStack {
    fn new() -> Self {
        Self {
            accept_queue: Arc::new(Mutex::new(VecDeque::new())),
        }
    }
}

impl IpStack for LoopStack {
    type Conn = LoopConn;

    fn add_interface(&mut self, _config: InterfaceConfig) -> Result<IfaceHandle, StackError> {
        Ok(IfaceHandle(0))
    }

    fn remove_interface(&mut self, _iface: IfaceHandle) -> Result<(), StackError> {
        Ok(())
    }

    fn set_default_interface(&mut self, _iface: IfaceHandle) {}

    fn set_status_callback(&mut self, _iface: IfaceHandle, _callback: Option<StatusCallback>) {}

    fn set_up(&mut self, _iface: IfaceHandle) {}
    fn set_down(&mut self, _iface: IfaceHandle) {}
    fn set_link_up(&mut self, _iface: IfaceHandle) {}
    fn set_link_down(&mut self, _iface: IfaceHandle) {}

    fn inject(&mut self, _iface: IfaceHandle, frame: PacketBuf) -> Result<(), PacketBuf> {
        Err(frame)
    }

    fn ipv4_address(&self, _iface: IfaceHandle) -> Ipv4Address {
        Ipv4Address::new(127, 0, 0, 1)
    }

    fn set_ipv4_address(&mut self, _iface: IfaceHandle, _address: Ipv4Address) {}

    fn ipv6_link_local(&self, _iface: IfaceHandle) -> Option<Ipv6Address> {
        None
    }

    fn ipv6_link_local_state(&self, _iface: IfaceHandle) -> Ipv6AddrState {
        Ipv6AddrState::Invalid
    }

    fn dhcp_start(&mut self, _iface: IfaceHandle) -> Result<(), StackError> {
        Ok(())
    }

    fn dhcp_renew(&mut self, _iface: IfaceHandle) -> Result<(), StackError> {
        Ok(())
    }

    fn dhcp_release_and_stop(&mut self, _iface: IfaceHandle) -> Result<(), StackError> {
        Ok(())
    }

    fn dhcp_cleanup(&mut self, _iface: IfaceHandle) {}

    fn flush_neighbor_cache(&mut self, _iface: IfaceHandle) {}

    fn resolve(&mut self, _host: &str) -> Result<IpAddress, StackError> {
        Ok(IpAddress::Ipv4(Ipv4Address::new(127, 0, 0, 1)))
    }

    fn connection(&mut self, _proto: Protocol) -> Result<Self::Conn, StackError> {
        Ok(LoopConn::unwired(self.accept_queue.clone()))
    }
}

#[test]
fn client_server_roundtrip() {
    let mut stack = LoopStack::new();

    let mut listener = NetContext::bind(&mut stack, None, "4433", Protocol::Tcp).unwrap();
    let mut client = NetContext::connect(&mut stack, "localhost", "4433", Protocol::Tcp).unwrap();
    let mut server = listener.accept().unwrap();

    assert_eq!(client.send(b"client hello"), Ok(12));
    let mut request = [0u8; 12];
    server.receive(&mut request).unwrap();
    assert_eq!(&request, b"client hello");

    assert_eq!(server.send(b"server hello"), Ok(12));
    let mut reply = [0u8; 12];
    client.receive(&mut reply).unwrap();
    assert_eq!(&reply, b"server hello");
}

#[test]
fn stream_reassembles_fragmented_records() {
    let mut stack = LoopStack::new();

    let mut listener = NetContext::bind(&mut stack, None, "4433", Protocol::Tcp).unwrap();
    let mut client = NetContext::connect(&mut stack, "localhost", "4433", Protocol::Tcp).unwrap();
    let mut server = listener.accept().unwrap();

    // A record split across deliveries of uneven sizes, including an empty
    // one, arrives as one contiguous stream.
    server.send(&[0x17, 0x03]).unwrap();
    server.send(&[]).unwrap();
    server.send(&[0x03, 0x00, 0x05]).unwrap();
    server.send(&[0xde, 0xad, 0xbe, 0xef, 0x00]).unwrap();

    let mut header = [0u8; 5];
    assert_eq!(Read::read(&mut client, &mut header), Ok(5));
    assert_eq!(header, [0x17, 0x03, 0x03, 0x00, 0x05]);

    let mut body = [0u8; 5];
    assert_eq!(Read::read(&mut client, &mut body), Ok(5));
    assert_eq!(body, [0xde, 0xad, 0xbe, 0xef, 0x00]);
}

#[test]
fn stream_write_reaches_peer() {
    let mut stack = LoopStack::new();

    let mut listener = NetContext::bind(&mut stack, None, "4433", Protocol::Tcp).unwrap();
    let mut client = NetContext::connect(&mut stack, "localhost", "4433", Protocol::Tcp).unwrap();
    let mut server = listener.accept().unwrap();

    assert_eq!(Write::write(&mut client, b"abc"), Ok(3));
    Write::flush(&mut client).unwrap();

    let mut out = [0u8; 3];
    server.receive(&mut out).unwrap();
    assert_eq!(&out, b"abc");
}

#[test]
fn closed_context_rejects_io() {
    let mut stack = LoopStack::new();
    let mut client = NetContext::connect(&mut stack, "localhost", "4433", Protocol::Tcp).unwrap();
    client.close();
    assert_eq!(client.send(b"x"), Err(NetError::SendFailed));
    let mut out = [0u8; 1];
    assert_eq!(client.receive(&mut out), Err(NetError::RecvFailed));
}
