//! Network dial primitive consumed by the waiter.
//!
//! `Dialer` is the seam between the retry loop and the transport: the loop
//! decides when to dial and for how long, the dialer only opens a connection.

use std::future::Future;
use std::io;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::time::Duration;

use tokio::net::TcpStream;

/// Opens a connection to an address, optionally bounded by a timeout.
///
/// A returned connection is closed when dropped.
pub trait Dialer {
    type Connection: Send;

    /// Dial `address`. With `timeout = None` the attempt waits as long as the
    /// transport does.
    fn dial(
        &self,
        address: &str,
        timeout: Option<Duration>,
    ) -> impl Future<Output = io::Result<Self::Connection>> + Send;
}

/// Plain TCP dialer over `tokio::net::TcpStream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Connection = TcpStream;

    async fn dial(&self, address: &str, timeout: Option<Duration>) -> io::Result<TcpStream> {
        match timeout {
            None => connect(address).await,
            Some(limit) => tokio::time::timeout(limit, connect(address))
                .await
                .map_err(|_elapsed| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connect to {} timed out after {}ms", address, limit.as_millis()),
                    )
                })?,
        }
    }
}

/// Connect to `address`, resolving IPv6 zone names first.
async fn connect(address: &str) -> io::Result<TcpStream> {
    match scoped_ipv6(address) {
        Some(addr) => TcpStream::connect(addr).await,
        None => TcpStream::connect(address).await,
    }
}

/// Parse `[ip%zone]:port` into a socket address.
///
/// The zone may be an interface index (`%2`) or name (`%eth0`). Returns
/// `None` for anything else, including unknown interface names, which are
/// then left to the resolver.
fn scoped_ipv6(address: &str) -> Option<SocketAddr> {
    let (host, port) = address.strip_prefix('[')?.rsplit_once("]:")?;
    let (ip, zone) = host.split_once('%')?;
    let ip: Ipv6Addr = ip.parse().ok()?;
    let port: u16 = port.parse().ok()?;
    let scope_id = match zone.parse::<u32>() {
        Ok(index) => index,
        Err(_) => interface_index(zone)?,
    };
    Some(SocketAddr::V6(SocketAddrV6::new(ip, port, 0, scope_id)))
}

#[cfg(unix)]
fn interface_index(name: &str) -> Option<u32> {
    let name = std::ffi::CString::new(name).ok()?;
    // SAFETY: `name` is a valid NUL-terminated string that outlives the call.
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    (index != 0).then_some(index)
}

#[cfg(not(unix))]
fn interface_index(_name: &str) -> Option<u32> {
    None
}
