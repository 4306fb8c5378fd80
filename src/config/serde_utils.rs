// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Serde helpers for parameter files

use core::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserializer, Serializer};

/// Serde "module" for switches written as `0` or `1`
///
/// Parameter files written for the capture tooling express switches as
/// integers. Booleans are accepted when reading. Switches are always written
/// as integers.
pub struct Flag;

impl Flag {
    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        deserializer.deserialize_any(Switch)
    }
}

/// [`Visitor`] for switches
struct Switch;

impl Switch {
    fn from_int<E: de::Error>(value: Option<u8>, unexpected: Unexpected<'_>) -> Result<bool, E> {
        match value {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(E::invalid_value(unexpected, &Switch)),
        }
    }
}

impl Visitor<'_> for Switch {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a switch: 0, 1, false or true")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
        Self::from_int(u8::try_from(v).ok(), Unexpected::Signed(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
        Self::from_int(u8::try_from(v).ok(), Unexpected::Unsigned(v))
    }
}
