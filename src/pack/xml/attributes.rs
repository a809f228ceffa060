use std::borrow::Cow;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ParseOptions;

/// a single attribute value. packs use hundreds of loosely typed attributes,
/// so we keep them in a bag instead of a rigid struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttrValue {
    /// Coerces raw attribute text according to `options`.
    /// numbers are only recognized when they format back into the exact same text,
    /// so `01` or `1.50` stay text and names never get mangled.
    pub fn coerce(raw: &str, options: &ParseOptions) -> Self {
        if options.coerce_booleans {
            match raw {
                "true" => return Self::Bool(true),
                "false" => return Self::Bool(false),
                _ => {}
            }
        }
        if options.coerce_numbers {
            if let Ok(number) = raw.parse::<f64>() {
                if number.is_finite() && format_number(number) == raw {
                    return Self::Number(number);
                }
            }
        }
        Self::Text(raw.to_string())
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            AttrValue::Bool(b) => Cow::Owned(b.to_string()),
            AttrValue::Number(n) => Cow::Owned(format_number(*n)),
            AttrValue::Text(t) => Cow::Borrowed(t.as_str()),
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            AttrValue::Bool(_) => None,
            AttrValue::Number(n) => Some(*n as f32),
            AttrValue::Text(t) => t.trim().parse().ok(),
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            AttrValue::Bool(_) => None,
            AttrValue::Number(n) => {
                if n.fract() == 0.0 && *n >= i32::MIN as f64 && *n <= i32::MAX as f64 {
                    Some(*n as i32)
                } else {
                    None
                }
            }
            AttrValue::Text(t) => t.trim().parse().ok(),
        }
    }
}

/// integers print without a fraction, everything else uses the shortest round trip form
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// attribute name -> value. insertion order is kept so documents can be dumped back in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(IndexMap<String, AttrValue>);

impl Attributes {
    pub fn insert(&mut self, name: impl Into<String>, value: AttrValue) {
        self.0.insert(name.into(), value);
    }
    /// packs are inconsistent with the case of attribute names (`iconFile`, `iconfile`, `IconFile`).
    /// an exact match wins, otherwise the first case insensitive match.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }
    pub fn text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(AttrValue::as_text)
    }
    /// empty strings count as missing, just like TacO does for file attributes
    pub fn non_empty_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.text(name).filter(|t| !t.is_empty())
    }
    pub fn f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(AttrValue::as_f32)
    }
    pub fn i32(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(AttrValue::as_i32)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, AttrValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, AttrValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
