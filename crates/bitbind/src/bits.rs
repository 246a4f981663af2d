//! Bit-addressable read cursor and write sink.
//!
//! Bits are addressed in MSB-first order: bit 0 is the high bit of the first byte.
//! Byte order only changes how the bits of one multi-bit value are grouped:
//! little-endian values are split into 8-bit groups, least significant group
//! first, with a trailing partial group holding the top `n % 8` bits.

use std::io;

use crate::errors::ReadError;

/// Byte order of a single multi-bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

/// Read cursor over a byte slice. Every read advances the position by the
/// number of bits read.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Current position in bits from the start of the data.
    pub fn position(&self) -> usize {
        self.bit_pos
    }

    /// Bits left before the end of the data.
    pub fn remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_pos)
    }

    fn read_bit(&mut self) -> Result<u8, ReadError> {
        let byte_index = self.bit_pos / 8;
        let bit_index = self.bit_pos % 8;

        let byte = *self.data.get(byte_index).ok_or(ReadError::OutOfBounds {
            needed: 1,
            available: 0,
        })?;
        let bit = (byte >> (7 - bit_index)) & 1;

        self.bit_pos += 1;

        Ok(bit)
    }

    fn read_msb(&mut self, n: usize) -> Result<u64, ReadError> {
        let mut value = 0u64;

        for _ in 0..n {
            let bit = self.read_bit()? as u64;
            value = (value << 1) | bit;
        }

        Ok(value)
    }

    /// Reads `n` bits (at most 64) as an unsigned value.
    pub fn read(&mut self, n: u32, order: ByteOrder) -> Result<u64, ReadError> {
        let n = n as usize;
        if n > 64 {
            return Err(ReadError::TooManyBitsRead(n));
        }

        let available = self.remaining();
        if n > available {
            return Err(ReadError::OutOfBounds {
                needed: n,
                available,
            });
        }

        match order {
            ByteOrder::BigEndian => self.read_msb(n),
            ByteOrder::LittleEndian => {
                let mut value = 0u64;
                let mut shift = 0;

                while shift < n {
                    let chunk = (n - shift).min(8);
                    value |= self.read_msb(chunk)? << shift;
                    shift += chunk;
                }

                Ok(value)
            }
        }
    }

    pub fn skip(&mut self, n: usize) {
        self.bit_pos += n;
    }

    pub fn align_to(&mut self, bits: usize) {
        if bits == 0 {
            return;
        }

        let rem = self.bit_pos % bits;
        if rem != 0 {
            self.bit_pos += bits - rem;
        }
    }
}

/// Destination for encoded bits.
pub trait BitSink {
    /// Writes the low `n` bits of `value`; higher bits are dropped.
    fn write_bits(&mut self, n: u32, value: u64, order: ByteOrder) -> io::Result<()>;

    /// Number of bits written so far.
    fn position(&self) -> usize;
}

/// [`BitSink`] over any [`io::Write`]. Complete bytes are forwarded as soon as
/// they fill up; [`BitWriter::finish`] flushes the last partial byte.
#[derive(Debug)]
pub struct BitWriter<W: io::Write> {
    inner: W,
    current: u8,
    filled: u8,
    bit_pos: usize,
}

impl<W: io::Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            current: 0,
            filled: 0,
            bit_pos: 0,
        }
    }

    fn write_msb(&mut self, n: usize, value: u64) -> io::Result<()> {
        for i in (0..n).rev() {
            self.current = (self.current << 1) | ((value >> i) & 1) as u8;
            self.filled += 1;
            self.bit_pos += 1;

            if self.filled == 8 {
                self.inner.write_all(&[self.current])?;
                self.current = 0;
                self.filled = 0;
            }
        }

        Ok(())
    }

    /// Pads the last partial byte with zero bits and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.filled > 0 {
            let byte = self.current << (8 - self.filled);
            self.inner.write_all(&[byte])?;
        }

        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: io::Write> BitSink for BitWriter<W> {
    fn write_bits(&mut self, n: u32, value: u64, order: ByteOrder) -> io::Result<()> {
        let n = n as usize;
        if n > 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot write {n} bits at once, at most 64"),
            ));
        }

        let value = value & low_mask(n);

        match order {
            ByteOrder::BigEndian => self.write_msb(n, value),
            ByteOrder::LittleEndian => {
                let mut shift = 0;

                while shift < n {
                    let chunk = (n - shift).min(8);
                    self.write_msb(chunk, (value >> shift) & low_mask(chunk))?;
                    shift += chunk;
                }

                Ok(())
            }
        }
    }

    fn position(&self) -> usize {
        self.bit_pos
    }
}

/// Mask selecting the low `n` bits.
pub fn low_mask(n: usize) -> u64 {
    match n {
        0 => 0,
        64.. => u64::MAX,
        n => (1u64 << n) - 1,
    }
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    if bits == 0 {
        return 0;
    }

    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}
