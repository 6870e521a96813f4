// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Value attributes and their validity.
//!
//! Each attribute of a value is an [`Attr`], which couples the attribute with its
//! valid flag. Requests only carry the attributes they set; an update that resets an
//! attribute sends it as [`Attr::ValidNoValue`]. When serialized, a valid attribute is
//! its plain value, a reset attribute is `null` and an unset one is omitted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;

use crate::types::ValidFlag;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Attr<T> {
    #[default]
    Invalid,
    Valid(T),
    ValidNoValue,
    NotSupported,
    ValueNotModified,
}

impl<T> Attr<T> {
    #[must_use]
    pub fn flag(&self) -> ValidFlag {
        match self {
            Attr::Invalid => ValidFlag::Invalid,
            Attr::Valid(_) => ValidFlag::Valid,
            Attr::ValidNoValue => ValidFlag::ValidNoValue,
            Attr::NotSupported => ValidFlag::NotSupported,
            Attr::ValueNotModified => ValidFlag::ValueNotModified,
        }
    }
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Attr::Invalid)
    }
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Attr::Valid(_))
    }
    /// Tell if this attribute has something to apply: a value or a reset
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Attr::Valid(_) | Attr::ValidNoValue)
    }
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Attr::Valid(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Clone + PartialEq> Attr<T> {
    /// Update semantics: a valid attribute of `other` replaces ours, a reset clears it,
    /// anything else leaves it alone.
    pub fn merge_from(&mut self, other: &Attr<T>) {
        match other {
            Attr::Valid(v) => *self = Attr::Valid(v.clone()),
            Attr::ValidNoValue => *self = Attr::Invalid,
            _ => {}
        }
    }

    /// Compare against the attribute of a prior value and keep only what changed.
    /// An attribute present in both with equal values is downgraded; one present only in
    /// `prior` becomes a reset. Returns whether there is something left to apply.
    pub fn compare_with(&mut self, prior: &Attr<T>, audit: bool) -> bool {
        let unchanged = matches!((&*self, prior), (Attr::Valid(a), Attr::Valid(b)) if a == b);
        if unchanged {
            *self = if audit {
                Attr::ValueNotModified
            } else {
                Attr::Invalid
            };
        } else if self.is_invalid() && prior.is_valid() {
            *self = Attr::ValidNoValue;
        }
        self.is_pending()
    }
}

impl<T: Display> Display for Attr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attr::Valid(v) => write!(f, "{v}"),
            Attr::Invalid => write!(f, "-"),
            Attr::ValidNoValue => write!(f, "(reset)"),
            Attr::NotSupported => write!(f, "(not-supported)"),
            Attr::ValueNotModified => write!(f, "(not-modified)"),
        }
    }
}

impl<T> From<T> for Attr<T> {
    fn from(value: T) -> Self {
        Attr::Valid(value)
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attr::Valid(v) => serializer.serialize_some(v),
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.map_or(Attr::ValidNoValue, Attr::Valid))
    }
}

/// Generic operations over the attributes of a value struct
pub trait AttrVal {
    /// Attribute names, in declaration order
    const ATTRS: &'static [&'static str];

    fn valid_flags(&self) -> Vec<ValidFlag>;
    /// Apply an update: see [`Attr::merge_from`]
    fn merge_from(&mut self, other: &Self);
    /// Keep only the attributes that differ from `prior`: see [`Attr::compare_with`]
    fn compare_valid_value(&mut self, prior: &Self, audit: bool) -> bool;
    fn attr_strings(&self) -> Vec<String>;

    /// Tell if any attribute has something to apply
    fn any_pending(&self) -> bool {
        self.valid_flags()
            .iter()
            .any(|f| matches!(f, ValidFlag::Valid | ValidFlag::ValidNoValue))
    }
}

/// Implement [`AttrVal`] for a struct whose listed fields are all [`Attr`]s
#[macro_export]
macro_rules! attr_val {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::attr::AttrVal for $ty {
            const ATTRS: &'static [&'static str] = &[$(stringify!($field)),+];

            fn valid_flags(&self) -> Vec<$crate::types::ValidFlag> {
                vec![$(self.$field.flag()),+]
            }
            fn merge_from(&mut self, other: &Self) {
                $(self.$field.merge_from(&other.$field);)+
            }
            fn compare_valid_value(&mut self, prior: &Self, audit: bool) -> bool {
                let mut pending = false;
                $(pending |= self.$field.compare_with(&prior.$field, audit);)+
                pending
            }
            fn attr_strings(&self) -> Vec<String> {
                vec![$(self.$field.to_string()),+]
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_semantics() {
        let mut a: Attr<u8> = Attr::Valid(1);
        a.merge_from(&Attr::Invalid);
        assert_eq!(a, Attr::Valid(1));
        a.merge_from(&Attr::Valid(2));
        assert_eq!(a, Attr::Valid(2));
        a.merge_from(&Attr::ValidNoValue);
        assert_eq!(a, Attr::Invalid);
    }

    #[test]
    fn compare_semantics() {
        let mut a: Attr<u8> = Attr::Valid(1);
        assert!(!a.compare_with(&Attr::Valid(1), false));
        assert_eq!(a, Attr::Invalid);

        let mut a: Attr<u8> = Attr::Valid(1);
        assert!(!a.compare_with(&Attr::Valid(1), true));
        assert_eq!(a, Attr::ValueNotModified);

        let mut a: Attr<u8> = Attr::Valid(2);
        assert!(a.compare_with(&Attr::Valid(1), false));
        assert_eq!(a, Attr::Valid(2));

        let mut a: Attr<u8> = Attr::Invalid;
        assert!(a.compare_with(&Attr::Valid(1), false));
        assert_eq!(a, Attr::ValidNoValue);

        let mut a: Attr<u8> = Attr::Invalid;
        assert!(!a.compare_with(&Attr::Invalid, false));
    }

    #[test]
    fn serde_representation() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Sample {
            #[serde(default, skip_serializing_if = "Attr::is_invalid")]
            a: Attr<String>,
            #[serde(default, skip_serializing_if = "Attr::is_invalid")]
            b: Attr<u16>,
            #[serde(default, skip_serializing_if = "Attr::is_invalid")]
            c: Attr<u16>,
        }
        let sample: Sample = serde_yaml_ng::from_str("a: hello\nb: null\n").unwrap();
        assert_eq!(sample.a, Attr::Valid("hello".to_owned()));
        assert_eq!(sample.b, Attr::ValidNoValue);
        assert_eq!(sample.c, Attr::Invalid);
        let text = serde_yaml_ng::to_string(&sample).unwrap();
        assert!(text.contains("a: hello"));
        assert!(!text.contains("c:"));
    }
}
