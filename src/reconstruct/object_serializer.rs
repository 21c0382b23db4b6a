//! PDF object serialization.
//!
//! Writes [`crate::object::Object`] values to their byte representation
//! per ISO 32000-1. No encryption hook — this crate's output is never
//! encrypted. Dictionary keys are always written in sorted order, which is
//! what makes the reconstructor's output deterministic given the same IR:
//! a `HashMap`'s iteration order is not, but a sorted key list is.

use crate::object::{Object, ObjectRef};
use std::collections::HashMap;
use std::io::Write;

/// Serializes [`Object`] values to bytes with deterministic, compact
/// formatting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

impl ObjectSerializer {
    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj).expect("writing to a Vec<u8> cannot fail");
        buf
    }

    /// Serialize an indirect object definition: `{id} {gen} obj\n{object}\nendobj\n`.
    pub fn serialize_indirect(&self, id: u32, gen: u16, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        writeln!(buf, "{id} {gen} obj").expect("writing to a Vec<u8> cannot fail");
        self.write_object(&mut buf, obj).expect("writing to a Vec<u8> cannot fail");
        write!(buf, "\nendobj\n").expect("writing to a Vec<u8> cannot fail");
        buf
    }

    fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> std::io::Result<()> {
        match obj {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" }),
            Object::Integer(i) => write!(w, "{i}"),
            Object::Real(r) => self.write_real(w, *r),
            Object::String(s) => self.write_string(w, s),
            Object::Name(n) => self.write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream { dict, data } => self.write_stream(w, dict, data),
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen),
        }
    }

    fn write_real<W: Write>(&self, w: &mut W, value: f64) -> std::io::Result<()> {
        if value.fract() == 0.0 {
            write!(w, "{}", value as i64)
        } else {
            let formatted = format!("{value:.5}");
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            write!(w, "{trimmed}")
        }
    }

    fn write_string<W: Write>(&self, w: &mut W, data: &[u8]) -> std::io::Result<()> {
        let is_printable =
            data.iter().all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));
        if is_printable {
            write!(w, "(")?;
            for &byte in data {
                match byte {
                    b'(' => write!(w, "\\(")?,
                    b')' => write!(w, "\\)")?,
                    b'\\' => write!(w, "\\\\")?,
                    b'\n' => write!(w, "\\n")?,
                    b'\r' => write!(w, "\\r")?,
                    b'\t' => write!(w, "\\t")?,
                    _ => w.write_all(&[byte])?,
                }
            }
            write!(w, ")")
        } else {
            write!(w, "<")?;
            for byte in data {
                write!(w, "{byte:02X}")?;
            }
            write!(w, ">")
        }
    }

    fn write_name<W: Write>(&self, w: &mut W, name: &str) -> std::io::Result<()> {
        write!(w, "/")?;
        for byte in name.bytes() {
            match byte {
                b'!'
                | b'"'
                | b'$'..=b'&'
                | b'\''..=b'.'
                | b'0'..=b'9'
                | b';'
                | b'<'
                | b'>'
                | b'?'
                | b'@'
                | b'A'..=b'Z'
                | b'^'..=b'z'
                | b'|'
                | b'~' => w.write_all(&[byte])?,
                _ => write!(w, "#{byte:02X}")?,
            }
        }
        Ok(())
    }

    fn write_array<W: Write>(&self, w: &mut W, arr: &[Object]) -> std::io::Result<()> {
        write!(w, "[")?;
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                write!(w, " ")?;
            }
            self.write_object(w, obj)?;
        }
        write!(w, "]")
    }

    fn write_dictionary<W: Write>(
        &self,
        w: &mut W,
        dict: &HashMap<String, Object>,
    ) -> std::io::Result<()> {
        write!(w, "<<")?;
        let mut keys: Vec<_> = dict.keys().collect();
        keys.sort();
        for key in keys {
            let value = &dict[key];
            write!(w, " ")?;
            self.write_name(w, key)?;
            write!(w, " ")?;
            self.write_object(w, value)?;
        }
        write!(w, " >>")
    }

    fn write_stream<W: Write>(
        &self,
        w: &mut W,
        dict: &HashMap<String, Object>,
        data: &[u8],
    ) -> std::io::Result<()> {
        let mut dict_with_length = dict.clone();
        dict_with_length.insert("Length".to_string(), Object::Integer(data.len() as i64));
        self.write_dictionary(w, &dict_with_length)?;
        write!(w, "\nstream\n")?;
        w.write_all(data)?;
        write!(w, "\nendstream")
    }
}

/// Build a [`Object::Dictionary`] from an ordered list of entries.
pub fn dict(entries: Vec<(&str, Object)>) -> Object {
    Object::Dictionary(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// Build a [`Object::Name`].
pub fn name(s: &str) -> Object {
    Object::Name(s.to_string())
}

/// Build a [`Object::Reference`].
pub fn reference(id: u32, gen: u16) -> Object {
    Object::Reference(ObjectRef::new(id, gen))
}
