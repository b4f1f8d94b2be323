// Binary read/write helpers shared by the on-disk index codecs.

use std::io::{self, Read, Write};

pub trait BinaryWrite: Write {
    #[inline]
    fn write_u8_raw(&mut self, value: u8) -> io::Result<()> {
        self.write_all(&[value])
    }

    #[inline]
    fn write_u64_le(&mut self, value: u64) -> io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    /// Platform-endian write, used by the LCP codec.
    #[inline]
    fn write_u64_ne(&mut self, value: u64) -> io::Result<()> {
        self.write_all(&value.to_ne_bytes())
    }
}

impl<W: Write + ?Sized> BinaryWrite for W {}

pub trait BinaryRead: Read {
    #[inline]
    fn read_u8_raw(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    #[inline]
    fn read_u64_le(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    #[inline]
    fn read_u64_ne(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_ne_bytes(buf))
    }
}

impl<R: Read + ?Sized> BinaryRead for R {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_le() {
        let mut buf = Vec::new();
        buf.write_u64_le(0x0102030405060708).unwrap();
        buf.write_u8_raw(0x7f).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_u64_le().unwrap(), 0x0102030405060708);
        assert_eq!(cursor.read_u8_raw().unwrap(), 0x7f);
    }

    #[test]
    fn round_trip_ne() {
        let mut buf = Vec::new();
        buf.write_u64_ne(u64::MAX - 5).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_u64_ne().unwrap(), u64::MAX - 5);
    }
}
