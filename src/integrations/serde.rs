//! Serde support: responses serialize to transport JSON, raw variables
//! deserialize from it.

use std::fmt;

use indexmap::IndexMap;
use serde::{
    de,
    ser::{self, SerializeMap, SerializeSeq},
};

use crate::{
    ast::InputValue,
    parser::Spanning,
    value::{Object, ScalarValue, Value},
};

impl ser::Serialize for ScalarValue {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(i) => serializer.serialize_i32(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}

impl ser::Serialize for Value {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Scalar(s) => s.serialize(serializer),
            Self::List(l) => {
                let mut seq = serializer.serialize_seq(Some(l.len()))?;
                for element in l {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Self::Object(o) => {
                let mut map = serializer.serialize_map(Some(o.field_count()))?;
                for (key, value) in o.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl ser::Serialize for Object {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.field_count()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> de::Deserialize<'de> for InputValue {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct InputValueVisitor;

        impl<'de> de::Visitor<'de> for InputValueVisitor {
            type Value = InputValue;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a valid input value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<InputValue, E> {
                Ok(InputValue::scalar(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<InputValue, E> {
                if value >= i64::from(i32::MIN) && value <= i64::from(i32::MAX) {
                    Ok(InputValue::scalar(value as i32))
                } else {
                    // Out-of-range integers travel as floats; the Int
                    // coercion rules still reject them with a range error.
                    Ok(InputValue::scalar(value as f64))
                }
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<InputValue, E> {
                if value <= i32::MAX as u64 {
                    Ok(InputValue::scalar(value as i32))
                } else {
                    Ok(InputValue::scalar(value as f64))
                }
            }

            fn visit_f64<E>(self, value: f64) -> Result<InputValue, E> {
                Ok(InputValue::scalar(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<InputValue, E> {
                self.visit_string(value.into())
            }

            fn visit_string<E>(self, value: String) -> Result<InputValue, E> {
                Ok(InputValue::scalar(value))
            }

            fn visit_none<E>(self) -> Result<InputValue, E> {
                Ok(InputValue::null())
            }

            fn visit_unit<E>(self) -> Result<InputValue, E> {
                Ok(InputValue::null())
            }

            fn visit_seq<V: de::SeqAccess<'de>>(self, mut visitor: V) -> Result<InputValue, V::Error> {
                let mut values = Vec::new();
                while let Some(element) = visitor.next_element()? {
                    values.push(Spanning::unlocated(element));
                }
                Ok(InputValue::List(values))
            }

            fn visit_map<V: de::MapAccess<'de>>(self, mut visitor: V) -> Result<InputValue, V::Error> {
                let mut object = IndexMap::<String, InputValue>::new();
                while let Some((key, value)) = visitor.next_entry()? {
                    object.insert(key, value);
                }
                Ok(InputValue::object(object))
            }
        }

        deserializer.deserialize_any(InputValueVisitor)
    }
}
