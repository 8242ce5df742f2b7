//! Reassembly of encapsulation frames from a TCP byte stream

use crate::header::{ENCAPSULATION_HEADER_LENGTH, EncapsulationHeader};
use bytes::{Buf, Bytes, BytesMut};
use enip_core::EipResult;

/// Output of the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framed {
    /// A complete frame, header included
    Frame(Bytes),
    /// A frame larger than the receive limit. Its payload is skipped as it
    /// arrives; the header is kept so the peer can be told `InvalidLength`.
    Oversized(EncapsulationHeader),
}

/// Splits a byte stream into frames using the header length field
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    max_frame_size: usize,
    discard: usize,
}

impl FrameAssembler {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size: max_frame_size.max(ENCAPSULATION_HEADER_LENGTH),
            discard: 0,
        }
    }

    /// Bytes of an oversized payload still to be skipped
    pub fn discarding(&self) -> usize {
        self.discard
    }

    /// Take the next frame out of `buf`, if one is complete
    pub fn next_frame(&mut self, buf: &mut BytesMut) -> EipResult<Option<Framed>> {
        if self.discard > 0 {
            let n = self.discard.min(buf.len());
            buf.advance(n);
            self.discard -= n;
            if self.discard > 0 {
                return Ok(None);
            }
        }

        if buf.len() < ENCAPSULATION_HEADER_LENGTH {
            return Ok(None);
        }
        let header = EncapsulationHeader::decode(&buf[..ENCAPSULATION_HEADER_LENGTH])?;
        let total = header.frame_length();

        if total > self.max_frame_size {
            log::warn!(
                "Frame of {} bytes exceeds the {} byte limit, skipping payload",
                total,
                self.max_frame_size
            );
            buf.advance(ENCAPSULATION_HEADER_LENGTH);
            self.discard = header.length as usize;
            let n = self.discard.min(buf.len());
            buf.advance(n);
            self.discard -= n;
            return Ok(Some(Framed::Oversized(header)));
        }

        if buf.len() < total {
            return Ok(None);
        }
        Ok(Some(Framed::Frame(buf.split_to(total).freeze())))
    }
}
