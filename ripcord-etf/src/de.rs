use std::borrow::Cow;

use serde::{
    de::{self, value::SeqDeserializer, IntoDeserializer, Visitor},
    Deserialize,
};

use crate::{tag, EtfError, VERSION};

/// Decodes a single term, version byte included; trailing bytes are an
/// error.
pub fn from_bytes<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T, EtfError> {
    let mut de = Deserializer::from_slice(bytes)?;
    let value = T::deserialize(&mut de)?;
    de.end()?;

    Ok(value)
}

enum Int {
    Pos(u64),
    Neg(i64),
}

fn expected(what: &str, t: u8) -> EtfError {
    EtfError::Message(format!("expected {what}, found tag {t}").into_boxed_str())
}

/// serde backend over an encoded term.
///
/// Deliberately tolerant where the wire is loose: any integer tag widens into
/// the target width (overflow errors out), any of binary/string/atom/nil
/// satisfies a textual slot, map keys may be atoms or binaries.
pub struct Deserializer<'de> {
    input: &'de [u8],
}

impl<'de> Deserializer<'de> {
    pub fn from_slice(bytes: &'de [u8]) -> Result<Self, EtfError> {
        match bytes.split_first() {
            Some((&VERSION, rest)) => Ok(Self { input: rest }),
            Some((&version, _)) => Err(EtfError::BadVersion(version)),
            None => Err(EtfError::UnexpectedEof),
        }
    }

    pub fn end(&self) -> Result<(), EtfError> {
        if self.input.is_empty() {
            Ok(())
        } else {
            Err(EtfError::TrailingBytes)
        }
    }

    fn take(&mut self, n: usize) -> Result<&'de [u8], EtfError> {
        if self.input.len() < n {
            return Err(EtfError::UnexpectedEof);
        }

        let (head, rest) = self.input.split_at(n);
        self.input = rest;

        Ok(head)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], EtfError> {
        let mut array = [0; N];
        array.copy_from_slice(self.take(N)?);

        Ok(array)
    }

    fn take_u8(&mut self) -> Result<u8, EtfError> {
        Ok(self.take_array::<1>()?[0])
    }

    fn take_u16(&mut self) -> Result<u16, EtfError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    fn take_u32(&mut self) -> Result<u32, EtfError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    fn peek_u8(&self) -> Result<u8, EtfError> {
        self.input.first().copied().ok_or(EtfError::UnexpectedEof)
    }

    fn parse_atom(&mut self, t: u8) -> Result<Cow<'de, str>, EtfError> {
        let len = match t {
            tag::SMALL_ATOM | tag::SMALL_ATOM_UTF8 => self.take_u8()? as usize,
            _ => self.take_u16()? as usize,
        };

        let bytes = self.take(len)?;

        match std::str::from_utf8(bytes) {
            Ok(name) => Ok(Cow::Borrowed(name)),
            // latin1 fallback for the non-utf8 atom tags
            Err(_) => Ok(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
        }
    }

    /// Widens any of the integer tags; errors once the value cannot fit 64
    /// bits.
    fn parse_int(&mut self, t: u8) -> Result<Int, EtfError> {
        match t {
            tag::SMALL_INT => Ok(Int::Pos(self.take_u8()?.into())),
            tag::INT => {
                let v = i32::from_be_bytes(self.take_array()?);

                if v < 0 {
                    Ok(Int::Neg(v.into()))
                } else {
                    Ok(Int::Pos(v as u64))
                }
            }
            tag::SMALL_BIG | tag::LARGE_BIG => {
                let len = if t == tag::SMALL_BIG {
                    self.take_u8()? as usize
                } else {
                    self.take_u32()? as usize
                };

                let negative = self.take_u8()? != 0;
                let mut magnitude = 0u64;

                for (i, &byte) in self.take(len)?.iter().enumerate() {
                    if byte == 0 {
                        continue;
                    }

                    if i >= 8 {
                        return Err(EtfError::IntOutOfRange);
                    }

                    magnitude |= u64::from(byte) << (8 * i);
                }

                if negative {
                    if magnitude > i64::MIN.unsigned_abs() {
                        return Err(EtfError::IntOutOfRange);
                    }

                    Ok(Int::Neg(magnitude.wrapping_neg() as i64))
                } else {
                    Ok(Int::Pos(magnitude))
                }
            }
            t => Err(expected("an integer", t)),
        }
    }

    /// Any textual term: binary, string, atom, or nil (the empty string).
    fn parse_text(&mut self) -> Result<Cow<'de, str>, EtfError> {
        let t = self.take_u8()?;

        let bytes = match t {
            tag::BINARY => {
                let len = self.take_u32()? as usize;

                self.take(len)?
            }
            tag::STRING => {
                let len = self.take_u16()? as usize;

                self.take(len)?
            }
            tag::ATOM | tag::ATOM_UTF8 | tag::SMALL_ATOM | tag::SMALL_ATOM_UTF8 => {
                return self.parse_atom(t)
            }
            tag::NIL => return Ok(Cow::Borrowed("")),
            t => return Err(expected("a textual term", t)),
        };

        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(Cow::Borrowed(s)),
            Err(_) => Ok(Cow::Owned(String::from_utf8_lossy(bytes).into_owned())),
        }
    }

    /// Consumes the atom `nil` if it is next.
    fn eat_nil(&mut self) -> bool {
        let save = self.input;

        let Ok(t) = self.take_u8() else {
            return false;
        };

        let is_nil = matches!(
            t,
            tag::ATOM | tag::ATOM_UTF8 | tag::SMALL_ATOM | tag::SMALL_ATOM_UTF8
        ) && matches!(self.parse_atom(t), Ok(name) if name == "nil");

        if !is_nil {
            self.input = save;
        }

        is_nil
    }

    fn skip_term(&mut self) -> Result<(), EtfError> {
        let t = self.take_u8()?;

        match t {
            tag::SMALL_INT => drop(self.take(1)?),
            tag::INT => drop(self.take(4)?),
            tag::NEW_FLOAT => drop(self.take(8)?),
            tag::NIL => {}
            tag::SMALL_ATOM | tag::SMALL_ATOM_UTF8 => {
                let len = self.take_u8()? as usize;
                self.take(len)?;
            }
            tag::ATOM | tag::ATOM_UTF8 => {
                let len = self.take_u16()? as usize;
                self.take(len)?;
            }
            tag::STRING => {
                let len = self.take_u16()? as usize;
                self.take(len)?;
            }
            tag::BINARY => {
                let len = self.take_u32()? as usize;
                self.take(len)?;
            }
            tag::SMALL_BIG => {
                let len = self.take_u8()? as usize;
                self.take(1 + len)?;
            }
            tag::LARGE_BIG => {
                let len = self.take_u32()? as usize;
                self.take(1 + len)?;
            }
            tag::SMALL_TUPLE => {
                let arity = self.take_u8()? as usize;

                for _ in 0..arity {
                    self.skip_term()?;
                }
            }
            tag::LARGE_TUPLE => {
                let arity = self.take_u32()? as usize;

                for _ in 0..arity {
                    self.skip_term()?;
                }
            }
            tag::LIST => {
                let len = self.take_u32()? as usize;

                for _ in 0..len {
                    self.skip_term()?;
                }

                self.skip_term()?;
            }
            tag::MAP => {
                let arity = self.take_u32()? as usize;

                for _ in 0..2 * arity {
                    self.skip_term()?;
                }
            }
            t => return Err(EtfError::BadTag(t)),
        }

        Ok(())
    }

    fn drive_seq<V: Visitor<'de>>(
        &mut self,
        len: usize,
        list_tail: bool,
        visitor: V,
    ) -> Result<V::Value, EtfError> {
        let mut remaining = len;

        let value = visitor.visit_seq(SeqReader {
            de: &mut *self,
            remaining: &mut remaining,
        })?;

        for _ in 0..remaining {
            self.skip_term()?;
        }

        if list_tail {
            self.skip_term()?;
        }

        Ok(value)
    }

    fn drive_map<V: Visitor<'de>>(&mut self, arity: usize, visitor: V) -> Result<V::Value, EtfError> {
        let mut remaining = arity;

        let value = visitor.visit_map(MapReader {
            de: &mut *self,
            remaining: &mut remaining,
        })?;

        for _ in 0..2 * remaining {
            self.skip_term()?;
        }

        Ok(value)
    }
}

macro_rules! deserialize_integers {
    ( $( $method:ident ),* ) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
                let t = self.take_u8()?;

                match self.parse_int(t)? {
                    Int::Pos(v) => visitor.visit_u64(v),
                    Int::Neg(v) => visitor.visit_i64(v),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = EtfError;

    fn is_human_readable(&self) -> bool {
        false
    }

    deserialize_integers!(
        deserialize_i8,
        deserialize_i16,
        deserialize_i32,
        deserialize_i64,
        deserialize_u8,
        deserialize_u16,
        deserialize_u32,
        deserialize_u64
    );

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        let t = self.take_u8()?;

        match t {
            tag::SMALL_INT | tag::INT | tag::SMALL_BIG | tag::LARGE_BIG => {
                match self.parse_int(t)? {
                    Int::Pos(v) => visitor.visit_u64(v),
                    Int::Neg(v) => visitor.visit_i64(v),
                }
            }
            tag::NEW_FLOAT => visitor.visit_f64(f64::from_be_bytes(self.take_array()?)),
            tag::ATOM | tag::ATOM_UTF8 | tag::SMALL_ATOM | tag::SMALL_ATOM_UTF8 => {
                let name = self.parse_atom(t)?;

                match name.as_ref() {
                    "true" => visitor.visit_bool(true),
                    "false" => visitor.visit_bool(false),
                    "nil" => visitor.visit_unit(),
                    _ => match name {
                        Cow::Borrowed(s) => visitor.visit_borrowed_str(s),
                        Cow::Owned(s) => visitor.visit_string(s),
                    },
                }
            }
            tag::NIL => self.drive_seq(0, false, visitor),
            tag::STRING => {
                let len = self.take_u16()? as usize;
                let bytes = self.take(len)?;

                match std::str::from_utf8(bytes) {
                    Ok(s) => visitor.visit_borrowed_str(s),
                    Err(_) => visitor.visit_seq(SeqDeserializer::new(bytes.iter().copied())),
                }
            }
            tag::BINARY => {
                let len = self.take_u32()? as usize;
                let bytes = self.take(len)?;

                match std::str::from_utf8(bytes) {
                    Ok(s) => visitor.visit_borrowed_str(s),
                    Err(_) => visitor.visit_borrowed_bytes(bytes),
                }
            }
            tag::LIST => {
                let len = self.take_u32()? as usize;

                self.drive_seq(len, true, visitor)
            }
            tag::SMALL_TUPLE => {
                let arity = self.take_u8()? as usize;

                self.drive_seq(arity, false, visitor)
            }
            tag::LARGE_TUPLE => {
                let arity = self.take_u32()? as usize;

                self.drive_seq(arity, false, visitor)
            }
            tag::MAP => {
                let arity = self.take_u32()? as usize;

                self.drive_map(arity, visitor)
            }
            t => Err(EtfError::BadTag(t)),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        self.deserialize_any(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        let t = self.take_u8()?;

        // integers widen into float slots
        match t {
            tag::NEW_FLOAT => visitor.visit_f64(f64::from_be_bytes(self.take_array()?)),
            _ => match self.parse_int(t)? {
                Int::Pos(v) => visitor.visit_f64(v as f64),
                Int::Neg(v) => visitor.visit_f64(v as f64),
            },
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        match self.parse_text()? {
            Cow::Borrowed(s) => visitor.visit_borrowed_str(s),
            Cow::Owned(s) => visitor.visit_string(s),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        let t = self.take_u8()?;

        let len = match t {
            tag::BINARY => self.take_u32()? as usize,
            tag::STRING => self.take_u16()? as usize,
            t => return Err(expected("a binary", t)),
        };

        visitor.visit_borrowed_bytes(self.take(len)?)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        if self.eat_nil() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        self.deserialize_any(visitor)
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, EtfError> {
        self.deserialize_any(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, EtfError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        let t = self.take_u8()?;

        match t {
            tag::NIL => self.drive_seq(0, false, visitor),
            tag::LIST => {
                let len = self.take_u32()? as usize;

                self.drive_seq(len, true, visitor)
            }
            tag::SMALL_TUPLE => {
                let arity = self.take_u8()? as usize;

                self.drive_seq(arity, false, visitor)
            }
            tag::LARGE_TUPLE => {
                let arity = self.take_u32()? as usize;

                self.drive_seq(arity, false, visitor)
            }
            // a char list that happened to take the compact form
            tag::STRING => {
                let len = self.take_u16()? as usize;
                let bytes = self.take(len)?;

                visitor.visit_seq(SeqDeserializer::new(bytes.iter().copied()))
            }
            t => Err(expected("a list", t)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, EtfError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, EtfError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        let t = self.take_u8()?;

        match t {
            tag::MAP => {
                let arity = self.take_u32()? as usize;

                self.drive_map(arity, visitor)
            }
            t => Err(expected("a map", t)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, EtfError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, EtfError> {
        if self.peek_u8()? == tag::MAP {
            self.take_u8()?;

            if self.take_u32()? != 1 {
                return Err(EtfError::Message(
                    "expected a single-entry map for an enum".into(),
                ));
            }

            visitor.visit_enum(EnumReader { de: self })
        } else {
            match self.parse_text()? {
                Cow::Borrowed(s) => visitor.visit_enum(s.into_deserializer()),
                Cow::Owned(s) => visitor.visit_enum(s.into_deserializer()),
            }
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, EtfError> {
        self.skip_term()?;
        visitor.visit_unit()
    }
}

struct SeqReader<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: &'a mut usize,
}

impl<'de> de::SeqAccess<'de> for SeqReader<'_, 'de> {
    type Error = EtfError;

    fn next_element_seed<T: de::DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, EtfError> {
        if *self.remaining == 0 {
            return Ok(None);
        }

        *self.remaining -= 1;

        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(*self.remaining)
    }
}

struct MapReader<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: &'a mut usize,
}

impl<'de> de::MapAccess<'de> for MapReader<'_, 'de> {
    type Error = EtfError;

    fn next_key_seed<K: de::DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, EtfError> {
        if *self.remaining == 0 {
            return Ok(None);
        }

        *self.remaining -= 1;

        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: de::DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, EtfError> {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(*self.remaining)
    }
}

struct EnumReader<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'de> de::EnumAccess<'de> for EnumReader<'_, 'de> {
    type Error = EtfError;
    type Variant = Self;

    fn variant_seed<V: de::DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), EtfError> {
        let EnumReader { de } = self;
        let variant = seed.deserialize(&mut *de)?;

        Ok((variant, EnumReader { de }))
    }
}

impl<'de> de::VariantAccess<'de> for EnumReader<'_, 'de> {
    type Error = EtfError;

    fn unit_variant(self) -> Result<(), EtfError> {
        self.de.skip_term()
    }

    fn newtype_variant_seed<T: de::DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, EtfError> {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, EtfError> {
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, EtfError> {
        de::Deserializer::deserialize_map(&mut *self.de, visitor)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use super::from_bytes;
    use crate::{to_bytes, EtfError, Writer};

    fn roundtrip<T>(value: T)
    where
        T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug,
    {
        let bytes = to_bytes(&value).unwrap();
        let back: T = from_bytes(&bytes).unwrap();
        assert_eq!(back, value, "bytes: {bytes:?}");
    }

    #[test]
    fn integer_roundtrips() {
        for v in [
            0i64,
            1,
            255,
            256,
            65_536,
            i32::MAX as i64,
            i32::MAX as i64 + 1,
            i64::MAX,
            -1,
            i32::MIN as i64,
            i32::MIN as i64 - 1,
            i64::MIN,
        ] {
            roundtrip(v);
        }

        roundtrip(u64::MAX);
        roundtrip(u8::MAX);
        roundtrip(i16::MIN);
    }

    #[test]
    fn float_roundtrips() {
        for v in [0.0f64, 2.5, -1.25e10, 1e-300, f64::MAX] {
            roundtrip(v);
        }
    }

    #[test]
    fn text_and_bool_roundtrips() {
        roundtrip(String::new());
        roundtrip(String::from("hello"));
        roundtrip(String::from("δοκιμή ✓"));
        roundtrip(true);
        roundtrip(false);
        roundtrip(Option::<String>::None);
        roundtrip(Some(String::from("set")));
    }

    #[test]
    fn container_roundtrips() {
        roundtrip(Vec::<i64>::new());
        roundtrip(vec![1i64, -5, 1 << 40]);
        roundtrip((3u8, String::from("tuple"), false));

        let mut map = HashMap::new();
        map.insert(String::from("a"), 1u32);
        map.insert(String::from("b"), 2);
        roundtrip(map);
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Record {
        id: u64,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tags: Vec<i64>,
        active: bool,
    }

    #[test]
    fn record_roundtrips() {
        roundtrip(Record {
            id: 1 << 62,
            name: String::from("general"),
            topic: None,
            tags: vec![],
            active: true,
        });

        roundtrip(Record {
            id: 9,
            name: String::from("general"),
            topic: Some(String::from("talk")),
            tags: vec![4, 5],
            active: false,
        });
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let mut writer = Writer::resizable();
        writer.version().unwrap();
        writer.map_header(3).unwrap();
        writer.binary(b"id").unwrap();
        writer.integer(7).unwrap();
        writer.binary(b"no_such_field").unwrap();
        writer.tuple_header(2).unwrap();
        writer.integer(1).unwrap();
        writer.integer(2).unwrap();
        writer.binary(b"name").unwrap();
        writer.binary(b"x").unwrap();

        let record: Record = from_bytes(writer.as_slice()).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.name, "x");
        assert_eq!(record.topic, None);
    }

    #[test]
    fn atom_satisfies_a_string_slot() {
        let mut writer = Writer::resizable();
        writer.version().unwrap();
        writer.atom("online").unwrap();

        let s: String = from_bytes(writer.as_slice()).unwrap();
        assert_eq!(s, "online");
    }

    #[test]
    fn atom_keys_match_struct_fields() {
        let mut writer = Writer::resizable();
        writer.version().unwrap();
        writer.map_header(1).unwrap();
        writer.atom("id").unwrap();
        writer.unsigned(42).unwrap();

        let record: Record = from_bytes(writer.as_slice()).unwrap();
        assert_eq!(record.id, 42);
    }

    #[test]
    fn integers_widen() {
        let mut writer = Writer::resizable();
        writer.version().unwrap();
        writer.integer(200).unwrap();

        let wide: u64 = from_bytes(writer.as_slice()).unwrap();
        assert_eq!(wide, 200);
    }

    #[test]
    fn out_of_range_integers_fail() {
        // nine significant little-endian bytes
        let mut bytes = vec![131, 110, 9, 0];
        bytes.extend_from_slice(&[0xFF; 9]);
        assert!(matches!(
            from_bytes::<u64>(&bytes),
            Err(EtfError::IntOutOfRange)
        ));

        // magnitude 2^63 is exactly i64::MIN
        let mut bytes = vec![131, 110, 8, 1];
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0x80]);
        assert_eq!(from_bytes::<i64>(&bytes).unwrap(), i64::MIN);

        // one beyond does not fit
        let mut bytes = vec![131, 110, 8, 1];
        bytes.extend_from_slice(&[0x01, 0, 0, 0, 0, 0, 0, 0x80]);
        assert!(matches!(
            from_bytes::<i64>(&bytes),
            Err(EtfError::IntOutOfRange)
        ));
    }

    #[test]
    fn malformed_input_errors() {
        assert!(matches!(
            from_bytes::<u8>(&[42, 97, 1]),
            Err(EtfError::BadVersion(42))
        ));

        assert!(matches!(
            from_bytes::<serde_json::Value>(&[131, 99]),
            Err(EtfError::BadTag(99))
        ));

        assert!(matches!(
            from_bytes::<String>(&[131, 109, 0, 0, 0, 5, b'a', b'b']),
            Err(EtfError::UnexpectedEof)
        ));

        assert!(matches!(
            from_bytes::<u8>(&[131, 97, 1, 97]),
            Err(EtfError::TrailingBytes)
        ));
    }

    #[test]
    fn decodes_into_a_json_value() {
        let mut writer = Writer::resizable();
        writer.version().unwrap();
        writer.map_header(3).unwrap();
        writer.atom("op").unwrap();
        writer.integer(10).unwrap();
        writer.atom("d").unwrap();
        writer.map_header(1).unwrap();
        writer.binary(b"heartbeat_interval").unwrap();
        writer.integer(41_250).unwrap();
        writer.atom("s").unwrap();
        writer.nil().unwrap();

        let value: serde_json::Value = from_bytes(writer.as_slice()).unwrap();
        assert_eq!(value["op"], 10);
        assert_eq!(value["d"]["heartbeat_interval"], 41_250);
        assert!(value["s"].is_null());
    }
}
