use crate::{tag, EtfError, VERSION};

/// Term-level encoder.
///
/// In fixed-capacity mode every write checks the remaining room first, so a
/// rejected term leaves the buffer exactly as it was; a write either commits
/// whole or fails with [`EtfError::CapacityExceeded`].
pub struct Writer {
    buf: Vec<u8>,
    capacity: Option<usize>,
}

impl Writer {
    pub fn resizable() -> Self {
        Self {
            buf: Vec::new(),
            capacity: None,
        }
    }

    pub fn fixed(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn reserve(&mut self, extra: usize) -> Result<(), EtfError> {
        match self.capacity {
            Some(cap) if self.buf.len() + extra > cap => Err(EtfError::CapacityExceeded(cap)),
            _ => Ok(()),
        }
    }

    /// The leading version byte; call once before the first term.
    pub fn version(&mut self) -> Result<(), EtfError> {
        self.reserve(1)?;
        self.buf.push(VERSION);

        Ok(())
    }

    pub fn atom(&mut self, name: &str) -> Result<(), EtfError> {
        let bytes = name.as_bytes();

        if bytes.len() <= u8::MAX as usize {
            self.reserve(2 + bytes.len())?;
            self.buf.push(tag::SMALL_ATOM);
            self.buf.push(bytes.len() as u8);
        } else if bytes.len() <= u16::MAX as usize {
            self.reserve(3 + bytes.len())?;
            self.buf.push(tag::ATOM);
            self.buf.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        } else {
            return Err(EtfError::AtomTooLong(bytes.len()));
        }

        self.buf.extend_from_slice(bytes);

        Ok(())
    }

    pub fn boolean(&mut self, value: bool) -> Result<(), EtfError> {
        self.atom(if value { "true" } else { "false" })
    }

    /// The atom `nil`, the encoding of an absent value.
    pub fn nil(&mut self) -> Result<(), EtfError> {
        self.atom("nil")
    }

    pub fn binary(&mut self, bytes: &[u8]) -> Result<(), EtfError> {
        self.reserve(5 + bytes.len())?;
        self.buf.push(tag::BINARY);
        self.buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(bytes);

        Ok(())
    }

    pub fn float(&mut self, value: f64) -> Result<(), EtfError> {
        self.reserve(9)?;
        self.buf.push(tag::NEW_FLOAT);
        self.buf.extend_from_slice(&value.to_be_bytes());

        Ok(())
    }

    /// Length-minimal integer: small-int for `[0, 255]`, int within the
    /// signed 32 bit range, small-big beyond.
    pub fn integer(&mut self, value: i64) -> Result<(), EtfError> {
        if (0..=255).contains(&value) {
            self.reserve(2)?;
            self.buf.push(tag::SMALL_INT);
            self.buf.push(value as u8);
        } else if let Ok(value) = i32::try_from(value) {
            self.reserve(5)?;
            self.buf.push(tag::INT);
            self.buf.extend_from_slice(&value.to_be_bytes());
        } else {
            self.big(value < 0, value.unsigned_abs())?;
        }

        Ok(())
    }

    pub fn unsigned(&mut self, value: u64) -> Result<(), EtfError> {
        match i64::try_from(value) {
            Ok(value) => self.integer(value),
            Err(_) => self.big(false, value),
        }
    }

    /// Sign-magnitude little-endian with a minimal byte count.
    fn big(&mut self, negative: bool, magnitude: u64) -> Result<(), EtfError> {
        let len = ((u64::BITS - magnitude.leading_zeros() + 7) / 8).max(1) as usize;

        self.reserve(3 + len)?;
        self.buf.push(tag::SMALL_BIG);
        self.buf.push(len as u8);
        self.buf.push(u8::from(negative));
        self.buf.extend_from_slice(&magnitude.to_le_bytes()[..len]);

        Ok(())
    }

    /// The empty list, also used as the tail of a non-empty one.
    pub fn empty_list(&mut self) -> Result<(), EtfError> {
        self.reserve(1)?;
        self.buf.push(tag::NIL);

        Ok(())
    }

    /// Header of a list with `len` elements; append the elements, then close
    /// with [`Self::empty_list`] as the tail.
    pub fn list_header(&mut self, len: u32) -> Result<(), EtfError> {
        self.reserve(5)?;
        self.buf.push(tag::LIST);
        self.buf.extend_from_slice(&len.to_be_bytes());

        Ok(())
    }

    pub fn tuple_header(&mut self, arity: usize) -> Result<(), EtfError> {
        if arity <= u8::MAX as usize {
            self.reserve(2)?;
            self.buf.push(tag::SMALL_TUPLE);
            self.buf.push(arity as u8);
        } else {
            self.reserve(5)?;
            self.buf.push(tag::LARGE_TUPLE);
            self.buf.extend_from_slice(&(arity as u32).to_be_bytes());
        }

        Ok(())
    }

    /// Header of a map with `arity` key/value pairs.
    pub fn map_header(&mut self, arity: u32) -> Result<(), EtfError> {
        self.reserve(5)?;
        self.buf.push(tag::MAP);
        self.buf.extend_from_slice(&arity.to_be_bytes());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Writer;

    #[test]
    fn atom_golden() {
        let mut writer = Writer::resizable();
        writer.version().unwrap();
        writer.atom("Hello World").unwrap();

        let mut expected = vec![0x83, 0x73, 0x0B];
        expected.extend_from_slice(b"Hello World");
        assert_eq!(writer.into_bytes(), expected);
    }

    #[test]
    fn boolean_golden() {
        let mut writer = Writer::resizable();
        writer.version().unwrap();
        writer.boolean(true).unwrap();
        assert_eq!(writer.as_slice(), [&[131, 115, 4][..], b"true"].concat());

        let mut writer = Writer::resizable();
        writer.version().unwrap();
        writer.boolean(false).unwrap();
        assert_eq!(writer.as_slice(), [&[131, 115, 5][..], b"false"].concat());
    }

    #[test]
    fn float_golden() {
        let mut writer = Writer::resizable();
        writer.version().unwrap();
        writer.float(2.5).unwrap();

        let mut expected = vec![131, 70];
        expected.extend_from_slice(&2.5_f64.to_be_bytes());
        assert_eq!(writer.into_bytes(), expected);
    }

    #[test]
    fn integer_forms() {
        let mut writer = Writer::resizable();
        writer.integer(0).unwrap();
        writer.integer(255).unwrap();
        writer.integer(256).unwrap();
        writer.integer(-1).unwrap();
        writer.unsigned(u64::MAX).unwrap();

        let expected = [
            vec![97, 0],
            vec![97, 255],
            vec![98, 0, 0, 1, 0],
            vec![98, 255, 255, 255, 255],
            vec![110, 8, 0, 255, 255, 255, 255, 255, 255, 255, 255],
        ]
        .concat();

        assert_eq!(writer.into_bytes(), expected);
    }

    #[test]
    fn fixed_capacity_rejects_without_corruption() {
        let mut writer = Writer::fixed(4);
        writer.version().unwrap();
        writer.integer(7).unwrap();

        let before = writer.as_slice().to_vec();
        assert!(writer.binary(b"too much data").is_err());
        assert_eq!(writer.as_slice(), before);

        // still usable up to the remaining byte
        writer.empty_list().unwrap();
        assert_eq!(writer.len(), 4);
        assert!(writer.empty_list().is_err());
    }
}
