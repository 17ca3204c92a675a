use serde::{ser, Serialize};

use crate::{EtfError, Writer};

/// Encodes `value` into a fresh resizable buffer, version byte included.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, EtfError> {
    let mut writer = Writer::resizable();
    writer.version()?;
    value.serialize(&mut Serializer::new(&mut writer))?;

    Ok(writer.into_bytes())
}

/// Encodes into a fixed-capacity buffer; fails with
/// [`EtfError::CapacityExceeded`] instead of growing past `capacity`.
pub fn to_bytes_fixed<T: Serialize>(value: &T, capacity: usize) -> Result<Vec<u8>, EtfError> {
    let mut writer = Writer::fixed(capacity);
    writer.version()?;
    value.serialize(&mut Serializer::new(&mut writer))?;

    Ok(writer.into_bytes())
}

/// serde backend over a [`Writer`].
///
/// Reflective record emission: structs become maps with binary field-name
/// keys, `None` and unit become the atom `nil`, empty sequences the empty
/// list. Hand-written [`Writer`] calls always take precedence when a payload
/// needs a shape the derives cannot express.
pub struct Serializer<'w> {
    writer: &'w mut Writer,
}

impl<'w> Serializer<'w> {
    pub fn new(writer: &'w mut Writer) -> Self {
        Self { writer }
    }
}

impl<'a, 'w> ser::Serializer for &'a mut Serializer<'w> {
    type Ok = ();
    type Error = EtfError;

    type SerializeSeq = Compound<'a, 'w>;
    type SerializeTuple = Compound<'a, 'w>;
    type SerializeTupleStruct = Compound<'a, 'w>;
    type SerializeTupleVariant = Compound<'a, 'w>;
    type SerializeMap = Compound<'a, 'w>;
    type SerializeStruct = Compound<'a, 'w>;
    type SerializeStructVariant = Compound<'a, 'w>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<(), EtfError> {
        self.writer.boolean(v)
    }

    fn serialize_i8(self, v: i8) -> Result<(), EtfError> {
        self.writer.integer(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<(), EtfError> {
        self.writer.integer(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<(), EtfError> {
        self.writer.integer(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<(), EtfError> {
        self.writer.integer(v)
    }

    fn serialize_i128(self, v: i128) -> Result<(), EtfError> {
        i64::try_from(v)
            .map_err(|_| EtfError::IntOutOfRange)
            .and_then(|v| self.writer.integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<(), EtfError> {
        self.writer.unsigned(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<(), EtfError> {
        self.writer.unsigned(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<(), EtfError> {
        self.writer.unsigned(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<(), EtfError> {
        self.writer.unsigned(v)
    }

    fn serialize_u128(self, v: u128) -> Result<(), EtfError> {
        u64::try_from(v)
            .map_err(|_| EtfError::IntOutOfRange)
            .and_then(|v| self.writer.unsigned(v))
    }

    fn serialize_f32(self, v: f32) -> Result<(), EtfError> {
        self.writer.float(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<(), EtfError> {
        self.writer.float(v)
    }

    fn serialize_char(self, v: char) -> Result<(), EtfError> {
        let mut buf = [0; 4];

        self.writer.binary(v.encode_utf8(&mut buf).as_bytes())
    }

    fn serialize_str(self, v: &str) -> Result<(), EtfError> {
        self.writer.binary(v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), EtfError> {
        self.writer.binary(v)
    }

    fn serialize_none(self) -> Result<(), EtfError> {
        self.writer.nil()
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), EtfError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), EtfError> {
        self.writer.nil()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), EtfError> {
        self.writer.nil()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<(), EtfError> {
        self.writer.atom(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), EtfError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), EtfError> {
        self.writer.map_header(1)?;
        self.writer.binary(variant.as_bytes())?;
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, EtfError> {
        match len {
            Some(0) => {
                self.writer.empty_list()?;

                Ok(Compound::new(self, false))
            }
            Some(len) => {
                self.writer.list_header(len as u32)?;

                Ok(Compound::new(self, true))
            }
            None => Err(EtfError::UnsizedSequence),
        }
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, EtfError> {
        self.writer.tuple_header(len)?;

        Ok(Compound::new(self, false))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, EtfError> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, EtfError> {
        self.writer.map_header(1)?;
        self.writer.binary(variant.as_bytes())?;
        self.writer.tuple_header(len)?;

        Ok(Compound::new(self, false))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, EtfError> {
        match len {
            Some(len) => {
                self.writer.map_header(len as u32)?;

                Ok(Compound::new(self, false))
            }
            None => Err(EtfError::UnsizedSequence),
        }
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, EtfError> {
        self.writer.map_header(len as u32)?;

        Ok(Compound::new(self, false))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, EtfError> {
        self.writer.map_header(1)?;
        self.writer.binary(variant.as_bytes())?;
        self.writer.map_header(len as u32)?;

        Ok(Compound::new(self, false))
    }
}

pub struct Compound<'a, 'w> {
    ser: &'a mut Serializer<'w>,
    list_tail: bool,
}

impl<'a, 'w> Compound<'a, 'w> {
    fn new(ser: &'a mut Serializer<'w>, list_tail: bool) -> Self {
        Self { ser, list_tail }
    }

    fn close(self) -> Result<(), EtfError> {
        if self.list_tail {
            self.ser.writer.empty_list()?;
        }

        Ok(())
    }
}

impl ser::SerializeSeq for Compound<'_, '_> {
    type Ok = ();
    type Error = EtfError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EtfError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), EtfError> {
        self.close()
    }
}

impl ser::SerializeTuple for Compound<'_, '_> {
    type Ok = ();
    type Error = EtfError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EtfError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), EtfError> {
        self.close()
    }
}

impl ser::SerializeTupleStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = EtfError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EtfError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), EtfError> {
        self.close()
    }
}

impl ser::SerializeTupleVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = EtfError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EtfError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), EtfError> {
        self.close()
    }
}

impl ser::SerializeMap for Compound<'_, '_> {
    type Ok = ();
    type Error = EtfError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), EtfError> {
        key.serialize(&mut *self.ser)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EtfError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), EtfError> {
        self.close()
    }
}

impl ser::SerializeStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = EtfError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EtfError> {
        self.ser.writer.binary(key.as_bytes())?;
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), EtfError> {
        self.close()
    }
}

impl ser::SerializeStructVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = EtfError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EtfError> {
        self.ser.writer.binary(key.as_bytes())?;
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), EtfError> {
        self.close()
    }
}
