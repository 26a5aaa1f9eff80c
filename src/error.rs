// Error types for the bridging layer

use thiserror::Error;

/// Errors surfaced by the interface lifecycle, the packet paths, and the
/// transport adapter.
///
/// Transient transmit backpressure is not represented here; it is reported
/// as [`TxStatus::NotReady`](crate::bridge::TxStatus) because the caller is
/// expected to retry rather than treat it as a failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    #[error("a network interface is already attached")]
    AlreadyAttached,

    #[error("no network interface is attached")]
    NotAttached,

    #[error("stack rejected the interface registration")]
    AttachFailed,

    #[error("failed to start the DHCP client")]
    DhcpStartFailed,

    #[error("DHCP renew was rejected")]
    RenewFailed,

    #[error("timed out waiting for the IPv6 link-local address to leave the tentative state")]
    Ipv6Timeout,

    #[error("malformed port string")]
    BadInput,

    #[error("host name resolution failed")]
    UnknownHost,

    #[error("failed to connect to remote host")]
    ConnectFailed,

    #[error("failed to bind local address")]
    BindFailed,

    #[error("failed to accept incoming connection")]
    AcceptFailed,

    #[error("connection reset by peer")]
    ConnectionReset,

    #[error("send failed")]
    SendFailed,

    #[error("receive failed")]
    RecvFailed,

    #[error("out of memory")]
    OutOfMemory,

    #[error("multicast filter update rejected by radio")]
    FilterRejected,

    #[error("radio driver error: {0}")]
    Driver(&'static str),

    #[error("operation not supported")]
    NotSupported,
}

impl embedded_io::Error for NetError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            NetError::ConnectionReset => embedded_io::ErrorKind::ConnectionReset,
            NetError::ConnectFailed => embedded_io::ErrorKind::ConnectionRefused,
            NetError::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            NetError::BadInput => embedded_io::ErrorKind::InvalidInput,
            NetError::NotSupported => embedded_io::ErrorKind::Unsupported,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}
