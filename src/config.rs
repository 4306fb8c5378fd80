// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Configuration and utilities

#[cfg(feature = "serde")]
pub mod serde_utils;

#[cfg(all(test, feature = "serde"))]
mod tests;

/// Replay parameters
///
/// Parameters control how much diagnostic output is produced during replay
/// and bound the work spent on malformed input. They are consumed by the
/// [executor][crate::executor::Builder::with_params] and the
/// [reconstructor][crate::draw::Builder::with_params].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Parameters {
    /// Collect a description and log for every replayed packet
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub describe: bool,
    /// Resolve vertex streams and texture fetch constants at draws
    ///
    /// Only relevant if `describe` is set.
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub fetch_details: bool,
    /// Maximum number of control flow word triples visited per shader
    pub cf_limit: u32,
}

/// See [PARAMETERS] for default values of individual fields
impl Default for Parameters {
    fn default() -> Self {
        PARAMETERS
    }
}

/// Default [Parameters]
pub const PARAMETERS: Parameters = Parameters {
    describe: false,
    fetch_details: true,
    cf_limit: 4096,
};
