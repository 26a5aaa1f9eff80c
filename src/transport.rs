//! Byte-stream transport adapter over the stack's connection objects.
//!
//! TLS records want a plain read/write byte stream; the stack delivers
//! received data as discrete buffers of arbitrary size. [`NetContext`]
//! bridges the two: it holds at most one partially consumed receive buffer
//! with a cursor and splices it into a contiguous stream, and it maps the
//! stack's failure vocabulary into [`NetError`]. The adapter also carries
//! the connection lifecycle: name resolution and connect, bind/listen and
//! accept, and idempotent close.

extern crate alloc;

use crate::error::NetError;
use crate::stack::{Connection, IpStack, Protocol, StackError};
use smoltcp::wire::{IpAddress, Ipv4Address};

/// A receive buffer taken from the stack, consumed front to back.
struct HeldBuf<B> {
    data: B,
    used: usize,
}

/// One transport endpoint: a stack connection plus stream-reassembly state.
///
/// The remote peer's address is not exposed; connections are identified by
/// the context object itself.
pub struct NetContext<C: Connection> {
    conn: Option<C>,
    held: Option<HeldBuf<C::Buf>>,
    // Recorded but not enforced; the underlying connections only support
    // blocking operation.
    blocking: bool,
}

impl<C: Connection> NetContext<C> {
    /// An unconnected context. Every I/O operation fails until it is
    /// replaced by [`connect`](Self::connect) or [`bind`](Self::bind).
    pub fn unconnected() -> Self {
        Self {
            conn: None,
            held: None,
            blocking: true,
        }
    }

    fn wrap(conn: C) -> Self {
        Self {
            conn: Some(conn),
            held: None,
            blocking: true,
        }
    }

    /// Resolve `host` and open a connection to `host:port`.
    ///
    /// # Returns
    /// * `Err(NetError::BadInput)` if `port` is not a decimal port number
    /// * `Err(NetError::UnknownHost)` if resolution fails
    /// * `Err(NetError::ConnectFailed)` for any later failure; the
    ///   half-built connection is closed before returning
    pub fn connect<S>(
        stack: &mut S,
        host: &str,
        port: &str,
        proto: Protocol,
    ) -> Result<Self, NetError>
    where
        S: IpStack<Conn = C>,
    {
        let port = parse_port(port).ok_or(NetError::BadInput)?;
        let addr = stack.resolve(host).map_err(|_| NetError::UnknownHost)?;
        let mut conn = stack
            .connection(proto)
            .map_err(|_| NetError::ConnectFailed)?;
        if conn.connect(addr, port).is_err() {
            conn.close();
            return Err(NetError::ConnectFailed);
        }
        Ok(Self::wrap(conn))
    }

    /// Bind a local endpoint, listening for TCP.
    ///
    /// With `host` absent the wildcard address is used. Any failure after
    /// the port parse maps to `BindFailed` and closes the half-built
    /// connection.
    pub fn bind<S>(
        stack: &mut S,
        host: Option<&str>,
        port: &str,
        proto: Protocol,
    ) -> Result<Self, NetError>
    where
        S: IpStack<Conn = C>,
    {
        let port = parse_port(port).ok_or(NetError::BadInput)?;
        let addr = match host {
            Some(host) => stack.resolve(host).map_err(|_| NetError::UnknownHost)?,
            None => IpAddress::Ipv4(Ipv4Address::UNSPECIFIED),
        };
        let mut conn = stack.connection(proto).map_err(|_| NetError::BindFailed)?;
        if conn.bind(addr, port).is_err() {
            conn.close();
            return Err(NetError::BindFailed);
        }
        if proto == Protocol::Tcp {
            if conn.listen().is_err() {
                conn.close();
                return Err(NetError::BindFailed);
            }
        }
        Ok(Self::wrap(conn))
    }

    /// Block until a peer connects and return a context for the accepted
    /// connection. The listening context stays usable for further accepts.
    pub fn accept(&mut self) -> Result<Self, NetError> {
        let conn = self.conn.as_mut().ok_or(NetError::AcceptFailed)?;
        let accepted = conn.accept().map_err(|_| NetError::AcceptFailed)?;
        Ok(Self::wrap(accepted))
    }

    /// Write the whole buffer to the connection.
    ///
    /// # Returns
    /// * `Ok(len)` with the full buffer length on success
    /// * `Err(NetError::ConnectionReset)` if the peer reset the connection
    /// * `Err(NetError::SendFailed)` for any other failure
    pub fn send(&mut self, data: &[u8]) -> Result<usize, NetError> {
        let conn = self.conn.as_mut().ok_or(NetError::SendFailed)?;
        match conn.write(data) {
            Ok(()) => Ok(data.len()),
            Err(StackError::Reset) => Err(NetError::ConnectionReset),
            Err(_) => Err(NetError::SendFailed),
        }
    }

    /// Fill `out` from the received byte stream, blocking until the whole
    /// buffer is full.
    ///
    /// Buffers taken from the stack are consumed front to back across
    /// calls; a buffer is released the moment its last byte has been
    /// copied out. Zero-length buffers are released and the wait
    /// continues.
    pub fn receive(&mut self, out: &mut [u8]) -> Result<usize, NetError> {
        let conn = self.conn.as_mut().ok_or(NetError::RecvFailed)?;
        let mut copied = 0;
        while copied < out.len() {
            let held = match self.held.as_mut() {
                Some(held) => held,
                None => {
                    let data = conn.recv().map_err(|_| NetError::RecvFailed)?;
                    self.held.insert(HeldBuf { data, used: 0 })
                }
            };
            let data = held.data.as_ref();
            let remaining = &data[held.used..];
            if remaining.is_empty() {
                self.held = None;
                continue;
            }
            let n = remaining.len().min(out.len() - copied);
            out[copied..copied + n].copy_from_slice(&remaining[..n]);
            copied += n;
            held.used += n;
            if held.used == held.data.as_ref().len() {
                self.held = None;
            }
        }
        Ok(copied)
    }

    /// Readiness polling is not provided by the underlying connections.
    /// Fails fast instead of pretending readiness.
    pub fn poll(&mut self) -> Result<(), NetError> {
        Err(NetError::NotSupported)
    }

    /// Receive with a deadline is not provided by the underlying
    /// connections. Fails fast instead of blocking forever.
    pub fn receive_timeout(&mut self, _out: &mut [u8], _timeout_ms: u32) -> Result<usize, NetError> {
        Err(NetError::NotSupported)
    }

    /// Record the requested blocking mode. The connections themselves only
    /// operate blocking; the flag is reported back by
    /// [`is_blocking`](Self::is_blocking) and otherwise unused.
    pub fn set_blocking(&mut self, blocking: bool) {
        self.blocking = blocking;
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// Release the held receive buffer and close the connection. Calling
    /// again on a closed context is a no-op.
    pub fn close(&mut self) {
        self.held = None;
        if let Some(mut conn) = self.conn.take() {
            conn.close();
        }
    }
}

impl<C: Connection> Drop for NetContext<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Connection> embedded_io::ErrorType for NetContext<C> {
    type Error = NetError;
}

impl<C: Connection> embedded_io::Read for NetContext<C> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.receive(buf)
    }
}

impl<C: Connection> embedded_io::Write for NetContext<C> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.send(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Parse a decimal port string. Signs, whitespace, and anything beyond
/// `u16` are rejected.
fn parse_port(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
