//! Series tags.
//!
//! A [`Tag`] is rendered once, at construction, into its exposition form
//! (`key="escaped value"`) so the scrape path only copies bytes.

use std::fmt;

use crate::encoder::write_escaped;

/// Conversion of producer-supplied values into tag value text.
///
/// Booleans become `true`/`false`, `None` becomes the empty string and every
/// other value uses its `Display` form.
pub trait IntoTagValue {
    fn into_tag_value(self) -> String;
}

impl IntoTagValue for String {
    fn into_tag_value(self) -> String {
        self
    }
}

impl IntoTagValue for &str {
    fn into_tag_value(self) -> String {
        self.to_string()
    }
}

impl IntoTagValue for &String {
    fn into_tag_value(self) -> String {
        self.clone()
    }
}

impl IntoTagValue for bool {
    fn into_tag_value(self) -> String {
        String::from(if self { "true" } else { "false" })
    }
}

impl<T: IntoTagValue> IntoTagValue for Option<T> {
    fn into_tag_value(self) -> String {
        self.map(IntoTagValue::into_tag_value).unwrap_or_default()
    }
}

macro_rules! display_tag_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoTagValue for $ty {
                fn into_tag_value(self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_tag_value!(
    char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    std::net::IpAddr,
);

/// An immutable key/value label attached to a series.
#[derive(Clone, PartialEq, Eq)]
pub struct Tag {
    key: String,
    value: String,
    encoded: Box<[u8]>,
}

impl Tag {
    /// Build a tag. Keys are expected to already be valid label names
    /// (`[a-zA-Z_][a-zA-Z0-9_]*`) and are written verbatim.
    pub fn new(key: impl Into<String>, value: impl IntoTagValue) -> Self {
        let key = key.into();
        let value = value.into_tag_value();

        let mut encoded = Vec::with_capacity(key.len() + value.len() + 3);
        encoded.extend_from_slice(key.as_bytes());
        encoded.extend_from_slice(b"=\"");
        write_escaped(&mut encoded, &value);
        encoded.push(b'"');

        Self {
            key,
            value,
            encoded: encoded.into_boxed_slice(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The pre-rendered `key="value"` fragment, value already escaped.
    pub(crate) fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tag").field(&self.key).field(&self.value).finish()
    }
}
