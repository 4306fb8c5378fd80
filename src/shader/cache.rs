// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Memoization of shader disassembly

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::config;
use crate::memory::{BlockId, MemoryBlock};

use super::{Shader, Stage};

type Entry = Arc<OnceLock<Option<Arc<Shader>>>>;

/// Cache of disassembled shaders
///
/// Shaders are keyed by stage and [`MemoryBlock`] identity. Each key is
/// decompiled at most once, even if requested concurrently. Failed
/// decompilations are cached as absent shaders.
///
/// A cache may be shared between threads and between replays of the same
/// capture, e.g. by wrapping it in an [`Arc`].
#[derive(Debug)]
pub struct ShaderCache {
    entries: Mutex<HashMap<(Stage, BlockId), Entry>>,
    cf_limit: u32,
}

impl ShaderCache {
    /// Create a new, empty cache with the default control flow limit
    pub fn new() -> Self {
        Self::with_cf_limit(config::PARAMETERS.cf_limit)
    }

    /// Create a new, empty cache with the given control flow limit
    pub fn with_cf_limit(cf_limit: u32) -> Self {
        Self {
            entries: Default::default(),
            cf_limit,
        }
    }

    /// Retrieve the shader for the given block, decompiling it if necessary
    ///
    /// Returns `None` if the microcode could not be decompiled.
    pub fn get_or_decompile(&self, stage: Stage, block: &MemoryBlock) -> Option<Arc<Shader>> {
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.entry((stage, block.id())).or_default().clone()
        };

        // The map lock is released here, so distinct keys decompile in parallel
        // while callers for the same key block on the entry.
        entry
            .get_or_init(|| {
                let words: Vec<u32> = block.words_be().collect();
                match super::decompile_bounded(stage, &words, self.cf_limit) {
                    Ok(shader) => Some(Arc::new(shader)),
                    Err(e) => {
                        tracing::warn!(%stage, block = %block.id(), "Failed to decompile shader: {e}");
                        None
                    }
                }
            })
            .clone()
    }

    /// Retrieve a previously decompiled shader without decompiling
    pub fn get(&self, stage: Stage, id: BlockId) -> Option<Arc<Shader>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&(stage, id))?.get()?.clone()
    }

    /// Retrieve the number of cached entries, including failed ones
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Check whether no shader was requested yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ShaderCache {
    fn default() -> Self {
        Self::new()
    }
}
