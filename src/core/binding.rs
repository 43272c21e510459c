//! Rebuilds nested values from flattened property keys for typed binding.
//!
//! Keys keep their case. Leaves stay strings until a target type asks for a
//! number or a bool, so `port=8080` binds to both `u16` and `String`.

use serde::de::value::{
    Error, MapAccessDeserializer, MapDeserializer, SeqDeserializer, StrDeserializer,
};
use serde::de::{Deserializer, Error as _, IntoDeserializer, Unexpected, Visitor};
use serde::forward_to_deserialize_any;
use std::collections::BTreeMap;

/// A property tree: `a.b[0]=x` becomes `a -> b -> [x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Leaf(String),
    Table(BTreeMap<String, Node>),
    List(BTreeMap<usize, Node>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

impl Node {
    pub(crate) fn root() -> Self {
        Node::Table(BTreeMap::new())
    }

    /// Insert `value` under a flattened key.
    ///
    /// Returns `false` when the key cannot be parsed or collides with an
    /// existing entry, which is kept.
    pub(crate) fn insert(&mut self, key: &str, value: String) -> bool {
        let Some(path) = parse_path(key) else {
            return false;
        };
        let Some((last, parents)) = path.split_last() else {
            return false;
        };

        let mut node = self;
        for (i, segment) in parents.iter().enumerate() {
            let empty = match parents.get(i + 1).unwrap_or(last) {
                Segment::Key(_) => Node::Table(BTreeMap::new()),
                Segment::Index(_) => Node::List(BTreeMap::new()),
            };
            node = match (node, segment) {
                (Node::Table(table), Segment::Key(k)) => {
                    table.entry(k.clone()).or_insert(empty)
                }
                (Node::List(items), Segment::Index(index)) => {
                    items.entry(*index).or_insert(empty)
                }
                _ => return false,
            };
        }

        match (node, last) {
            (Node::Table(table), Segment::Key(k)) if !table.contains_key(k) => {
                table.insert(k.clone(), Node::Leaf(value));
                true
            }
            (Node::List(items), Segment::Index(index)) if !items.contains_key(index) => {
                items.insert(*index, Node::Leaf(value));
                true
            }
            _ => false,
        }
    }
}

/// Split `a.b[0].c` into `[Key(a), Key(b), Index(0), Key(c)]`.
fn parse_path(key: &str) -> Option<Vec<Segment>> {
    let mut path = Vec::new();
    for part in key.split('.') {
        let (name, mut rest) = match part.find('[') {
            Some(open) => part.split_at(open),
            None => (part, ""),
        };
        if name.is_empty() && path.is_empty() {
            return None;
        }
        if !name.is_empty() {
            path.push(Segment::Key(name.to_string()));
        }
        while let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']')?;
            path.push(Segment::Index(after[..close].trim().parse().ok()?));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }
    (!path.is_empty()).then_some(path)
}

/// Deserializer over a borrowed [`Node`].
pub(crate) struct NodeDeserializer<'a>(pub(crate) &'a Node);

macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident : $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match self.0 {
                    Node::Leaf(text) => {
                        let parsed: $ty = text.trim().parse().map_err(|_| {
                            Error::invalid_value(Unexpected::Str(text.as_str()), &stringify!($ty))
                        })?;
                        visitor.$visit(parsed)
                    }
                    _ => self.deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de, 'a> Deserializer<'de> for NodeDeserializer<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Node::Leaf(text) => visitor.visit_str(text),
            Node::Table(table) => visitor.visit_map(MapDeserializer::new(
                table.iter().map(|(k, v)| (k.as_str(), NodeDeserializer(v))),
            )),
            Node::List(items) => {
                visitor.visit_seq(SeqDeserializer::new(items.values().map(NodeDeserializer)))
            }
        }
    }

    deserialize_parsed! {
        deserialize_bool => visit_bool: bool,
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_u128 => visit_u128: u128,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Node::Leaf(text) if text.is_empty() => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            // `a,b,c` binds to a list as well as `key[0]`, `key[1]`, ...
            Node::Leaf(text) => {
                let items: Vec<Node> = text
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Node::Leaf(item.to_string()))
                    .collect();
                visitor.visit_seq(SeqDeserializer::new(items.iter().map(NodeDeserializer)))
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.0 {
            Node::Leaf(text) => {
                let variant: StrDeserializer<'_, Error> = text.trim().into_deserializer();
                visitor.visit_enum(variant)
            }
            Node::Table(table) => visitor.visit_enum(MapAccessDeserializer::new(
                MapDeserializer::new(
                    table.iter().map(|(k, v)| (k.as_str(), NodeDeserializer(v))),
                ),
            )),
            Node::List(_) => Err(Error::custom("expected an enum, found a list")),
        }
    }

    forward_to_deserialize_any! {
        char str string bytes byte_buf unit_struct tuple tuple_struct map struct
        identifier ignored_any
    }
}

impl<'de, 'a> IntoDeserializer<'de, Error> for NodeDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}
