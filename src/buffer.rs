//! Packet buffers on either side of the driver/stack boundary.
//!
//! The radio driver and the TCP/IP stack never share a buffer: the stack
//! retains and reclaims its own transmit buffers on its own schedule, while
//! the driver releases a submitted buffer from its send thread whenever the
//! frame actually leaves the air interface. Outbound frames are therefore
//! always copied into a fresh driver-owned [`PacketBuf`] before handoff.

extern crate alloc;

use alloc::vec::Vec;

use crate::error::NetError;

/// A driver-owned packet buffer holding one Ethernet frame.
///
/// Moving a `PacketBuf` into [`RadioDriver::send`](crate::driver::RadioDriver::send)
/// transfers ownership to the driver; dropping it releases the buffer.
/// Ownership transfer by move makes use-after-handoff a compile error and
/// guarantees the buffer is released exactly once.
#[derive(Debug)]
pub struct PacketBuf {
    data: Vec<u8>,
}

impl PacketBuf {
    /// Wrap an already-filled frame, as delivered by the radio driver.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Allocate a zeroed buffer of `len` bytes.
    ///
    /// For drivers that land received frames in a preallocated buffer:
    /// allocate at the reported frame length, fill through
    /// [`as_mut_slice`](Self::as_mut_slice), then hand the buffer to
    /// [`NetifBridge::process_ethernet_data`](crate::bridge::NetifBridge::process_ethernet_data).
    /// Drivers that already hold the frame in an owned `Vec` use
    /// [`from_vec`](Self::from_vec) instead.
    ///
    /// # Returns
    /// * `Err(NetError::OutOfMemory)` if the allocation fails
    pub fn alloc(len: usize) -> Result<Self, NetError> {
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| NetError::OutOfMemory)?;
        data.resize(len, 0);
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view of the frame bytes, for drivers filling a buffer from
    /// [`alloc`](Self::alloc).
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for PacketBuf {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// A stack-owned outbound Ethernet frame, possibly split across several
/// chained segments.
///
/// The bridge never mutates an `OutboundPacket`; it copies the bytes out
/// via [`duplicate`] and leaves the original to the stack.
#[derive(Debug, Clone)]
pub struct OutboundPacket {
    segments: Vec<Vec<u8>>,
}

impl OutboundPacket {
    /// Build a frame from chained segments, in wire order.
    pub fn from_segments(segments: Vec<Vec<u8>>) -> Self {
        Self { segments }
    }

    /// Build a frame from a single contiguous segment.
    pub fn from_frame(frame: Vec<u8>) -> Self {
        Self {
            segments: vec![frame],
        }
    }

    /// Total byte length across all segments.
    pub fn total_len(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    /// Iterate the segments in wire order.
    pub fn segments(&self) -> impl Iterator<Item = &[u8]> {
        self.segments.iter().map(|s| s.as_slice())
    }
}

/// Copy a stack-owned frame into a single contiguous driver-owned buffer.
///
/// # Returns
/// * `Ok(PacketBuf)` holding the concatenated segment bytes
/// * `Err(NetError::OutOfMemory)` if the driver buffer cannot be allocated
pub fn duplicate(packet: &OutboundPacket) -> Result<PacketBuf, NetError> {
    let mut data = Vec::new();
    data.try_reserve_exact(packet.total_len())
        .map_err(|_| NetError::OutOfMemory)?;
    for segment in packet.segments() {
        data.extend_from_slice(segment);
    }
    Ok(PacketBuf::from_vec(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_concatenates_segments() {
        let packet = OutboundPacket::from_segments(vec![
            vec![1, 2, 3],
            vec![4],
            vec![5, 6],
        ]);
        assert_eq!(packet.total_len(), 6);

        let dup = duplicate(&packet).unwrap();
        assert_eq!(dup.as_slice(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn duplicate_of_empty_packet_is_empty() {
        let packet = OutboundPacket::from_segments(Vec::new());
        let dup = duplicate(&packet).unwrap();
        assert!(dup.is_empty());
    }

    #[test]
    fn duplicate_leaves_original_intact() {
        let packet = OutboundPacket::from_frame(vec![0xaa; 64]);
        let dup = duplicate(&packet).unwrap();
        assert_eq!(dup.len(), 64);
        assert_eq!(packet.total_len(), 64);
    }

    #[test]
    fn alloc_zeroes_the_buffer() {
        let buf = PacketBuf::alloc(16).unwrap();
        assert_eq!(buf.as_slice(), &[0u8; 16]);
    }
}
