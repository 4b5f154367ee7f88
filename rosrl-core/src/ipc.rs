use anyhow::Result;
use bincode::{Decode, Encode};
use std::io::{Read, Write};

/// Messages exchanged between the leader and its followers during a collective reduction.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub enum Packet {
    // Follower introduces itself after connecting
    Hello { rank: usize },
    // Follower contributes its local values
    Reduce { values: Vec<f64> },
    // Leader broadcasts the element-wise sum
    Reduced { values: Vec<f64> },
    // Leader gives up on the current reduction
    Abort { reason: String },
}

// Custom low level protocol to send data: a big endian u32 length, then the bincode payload
pub fn send_packet<W: Write, P: Encode>(conn: &mut W, packet: P) -> Result<()> {
    let payload = bincode::encode_to_vec(packet, bincode::config::standard())?;
    let payload_len = u32::try_from(payload.len())?.to_be_bytes();
    conn.write_all(&payload_len)?;
    conn.write_all(&payload)?;
    conn.flush()?;
    Ok(())
}

// Custom low level protocol to receive data
pub fn receive_packet<R: Read, P: Decode<()>>(conn: &mut R) -> Result<P> {
    let mut content_len = [0u8; 4];
    conn.read_exact(&mut content_len)?;
    let len = u32::from_be_bytes(content_len);
    let mut buffer = vec![0u8; len as usize];
    conn.read_exact(&mut buffer)?;
    let (packet, _): (P, _) = bincode::decode_from_slice(&buffer, bincode::config::standard())?;
    Ok(packet)
}
