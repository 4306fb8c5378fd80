// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Symbolic register names
//!
//! Names are used for diagnostics only. Besides the individually named
//! registers, the shader constant banks are named systematically, e.g.
//! `SHADER_CONSTANT_012_Y` or `SHADER_CONSTANT_FETCH_03_1`.

use std::borrow::Cow;

pub const RB_SURFACE_INFO: u32 = 0x2000;
pub const RB_COLOR_INFO: u32 = 0x2001;
pub const RB_DEPTH_INFO: u32 = 0x2002;
pub const RB_COLOR1_INFO: u32 = 0x2003;
pub const RB_COLOR2_INFO: u32 = 0x2004;
pub const RB_COLOR3_INFO: u32 = 0x2005;
pub const PA_SC_WINDOW_OFFSET: u32 = 0x2080;
pub const PA_SC_WINDOW_SCISSOR_TL: u32 = 0x2081;
pub const PA_SC_WINDOW_SCISSOR_BR: u32 = 0x2082;
pub const VGT_MAX_VTX_INDX: u32 = 0x2100;
pub const VGT_MIN_VTX_INDX: u32 = 0x2101;
pub const VGT_INDX_OFFSET: u32 = 0x2102;
pub const RB_COLOR_MASK: u32 = 0x2104;
pub const RB_BLEND_RED: u32 = 0x2105;
pub const RB_BLEND_GREEN: u32 = 0x2106;
pub const RB_BLEND_BLUE: u32 = 0x2107;
pub const RB_BLEND_ALPHA: u32 = 0x2108;
pub const RB_STENCILREFMASK_BF: u32 = 0x210C;
pub const RB_STENCILREFMASK: u32 = 0x210D;
pub const RB_ALPHA_REF: u32 = 0x210E;
pub const PA_CL_VPORT_XSCALE: u32 = 0x210F;
pub const PA_CL_VPORT_XOFFSET: u32 = 0x2110;
pub const PA_CL_VPORT_YSCALE: u32 = 0x2111;
pub const PA_CL_VPORT_YOFFSET: u32 = 0x2112;
pub const PA_CL_VPORT_ZSCALE: u32 = 0x2113;
pub const PA_CL_VPORT_ZOFFSET: u32 = 0x2114;
pub const SQ_PROGRAM_CNTL: u32 = 0x2180;
pub const SQ_CONTEXT_MISC: u32 = 0x2181;
pub const VGT_EVENT_INITIATOR: u32 = 0x21F9;
pub const VGT_DMA_BASE: u32 = 0x21FA;
pub const VGT_DMA_SIZE: u32 = 0x21FB;
pub const VGT_DRAW_INITIATOR: u32 = 0x21FC;
pub const RB_DEPTHCONTROL: u32 = 0x2200;
pub const RB_BLENDCONTROL0: u32 = 0x2201;
pub const RB_COLORCONTROL: u32 = 0x2202;
pub const RB_HIZCONTROL: u32 = 0x2203;
pub const PA_CL_CLIP_CNTL: u32 = 0x2204;
pub const PA_SU_SC_MODE_CNTL: u32 = 0x2205;
pub const PA_CL_VTE_CNTL: u32 = 0x2206;
pub const RB_MODECONTROL: u32 = 0x2208;
pub const PA_SU_POINT_SIZE: u32 = 0x2280;
pub const RB_COPY_CONTROL: u32 = 0x2318;

pub const SHADER_CONSTANT_000_X: u32 = 0x4000;
pub const SHADER_CONSTANT_511_W: u32 = 0x47FF;
pub const SHADER_CONSTANT_FETCH_00_0: u32 = 0x4800;
pub const SHADER_CONSTANT_FETCH_31_5: u32 = 0x48BF;
pub const SHADER_CONSTANT_BOOL_000_031: u32 = 0x4900;
pub const SHADER_CONSTANT_BOOL_224_255: u32 = 0x4907;
pub const SHADER_CONSTANT_LOOP_00: u32 = 0x4908;
pub const SHADER_CONSTANT_LOOP_31: u32 = 0x4927;

/// Interpretation of a register's value
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Kind {
    #[default]
    Integer,
    /// The value's bit pattern is an IEEE-754 float
    Float,
}

/// Individually named registers, sorted by index
static TABLE: &[(u32, &str, Kind)] = &[
    (RB_SURFACE_INFO, "RB_SURFACE_INFO", Kind::Integer),
    (RB_COLOR_INFO, "RB_COLOR_INFO", Kind::Integer),
    (RB_DEPTH_INFO, "RB_DEPTH_INFO", Kind::Integer),
    (RB_COLOR1_INFO, "RB_COLOR1_INFO", Kind::Integer),
    (RB_COLOR2_INFO, "RB_COLOR2_INFO", Kind::Integer),
    (RB_COLOR3_INFO, "RB_COLOR3_INFO", Kind::Integer),
    (PA_SC_WINDOW_OFFSET, "PA_SC_WINDOW_OFFSET", Kind::Integer),
    (PA_SC_WINDOW_SCISSOR_TL, "PA_SC_WINDOW_SCISSOR_TL", Kind::Integer),
    (PA_SC_WINDOW_SCISSOR_BR, "PA_SC_WINDOW_SCISSOR_BR", Kind::Integer),
    (VGT_MAX_VTX_INDX, "VGT_MAX_VTX_INDX", Kind::Integer),
    (VGT_MIN_VTX_INDX, "VGT_MIN_VTX_INDX", Kind::Integer),
    (VGT_INDX_OFFSET, "VGT_INDX_OFFSET", Kind::Integer),
    (RB_COLOR_MASK, "RB_COLOR_MASK", Kind::Integer),
    (RB_BLEND_RED, "RB_BLEND_RED", Kind::Float),
    (RB_BLEND_GREEN, "RB_BLEND_GREEN", Kind::Float),
    (RB_BLEND_BLUE, "RB_BLEND_BLUE", Kind::Float),
    (RB_BLEND_ALPHA, "RB_BLEND_ALPHA", Kind::Float),
    (RB_STENCILREFMASK_BF, "RB_STENCILREFMASK_BF", Kind::Integer),
    (RB_STENCILREFMASK, "RB_STENCILREFMASK", Kind::Integer),
    (RB_ALPHA_REF, "RB_ALPHA_REF", Kind::Float),
    (PA_CL_VPORT_XSCALE, "PA_CL_VPORT_XSCALE", Kind::Float),
    (PA_CL_VPORT_XOFFSET, "PA_CL_VPORT_XOFFSET", Kind::Float),
    (PA_CL_VPORT_YSCALE, "PA_CL_VPORT_YSCALE", Kind::Float),
    (PA_CL_VPORT_YOFFSET, "PA_CL_VPORT_YOFFSET", Kind::Float),
    (PA_CL_VPORT_ZSCALE, "PA_CL_VPORT_ZSCALE", Kind::Float),
    (PA_CL_VPORT_ZOFFSET, "PA_CL_VPORT_ZOFFSET", Kind::Float),
    (SQ_PROGRAM_CNTL, "SQ_PROGRAM_CNTL", Kind::Integer),
    (SQ_CONTEXT_MISC, "SQ_CONTEXT_MISC", Kind::Integer),
    (VGT_EVENT_INITIATOR, "VGT_EVENT_INITIATOR", Kind::Integer),
    (VGT_DMA_BASE, "VGT_DMA_BASE", Kind::Integer),
    (VGT_DMA_SIZE, "VGT_DMA_SIZE", Kind::Integer),
    (VGT_DRAW_INITIATOR, "VGT_DRAW_INITIATOR", Kind::Integer),
    (RB_DEPTHCONTROL, "RB_DEPTHCONTROL", Kind::Integer),
    (RB_BLENDCONTROL0, "RB_BLENDCONTROL0", Kind::Integer),
    (RB_COLORCONTROL, "RB_COLORCONTROL", Kind::Integer),
    (RB_HIZCONTROL, "RB_HIZCONTROL", Kind::Integer),
    (PA_CL_CLIP_CNTL, "PA_CL_CLIP_CNTL", Kind::Integer),
    (PA_SU_SC_MODE_CNTL, "PA_SU_SC_MODE_CNTL", Kind::Integer),
    (PA_CL_VTE_CNTL, "PA_CL_VTE_CNTL", Kind::Integer),
    (RB_MODECONTROL, "RB_MODECONTROL", Kind::Integer),
    (PA_SU_POINT_SIZE, "PA_SU_POINT_SIZE", Kind::Integer),
    (RB_COPY_CONTROL, "RB_COPY_CONTROL", Kind::Integer),
];

const ALU_PREFIX: &str = "SHADER_CONSTANT_";
const FETCH_PREFIX: &str = "SHADER_CONSTANT_FETCH_";
const BOOL_PREFIX: &str = "SHADER_CONSTANT_BOOL_";
const LOOP_PREFIX: &str = "SHADER_CONSTANT_LOOP_";
const COMPONENTS: [char; 4] = ['X', 'Y', 'Z', 'W'];

/// Retrieve the name of the register with the given index
pub fn name(index: u32) -> Option<Cow<'static, str>> {
    if let Ok(pos) = TABLE.binary_search_by_key(&index, |(i, _, _)| *i) {
        return Some(Cow::Borrowed(TABLE[pos].1));
    }

    let name = match index {
        SHADER_CONSTANT_000_X..=SHADER_CONSTANT_511_W => {
            let offset = index - SHADER_CONSTANT_000_X;
            let component = COMPONENTS[(offset % 4) as usize];
            format!("{ALU_PREFIX}{:03}_{component}", offset / 4)
        }
        SHADER_CONSTANT_FETCH_00_0..=SHADER_CONSTANT_FETCH_31_5 => {
            let offset = index - SHADER_CONSTANT_FETCH_00_0;
            format!("{FETCH_PREFIX}{:02}_{}", offset / 6, offset % 6)
        }
        SHADER_CONSTANT_BOOL_000_031..=SHADER_CONSTANT_BOOL_224_255 => {
            let first = (index - SHADER_CONSTANT_BOOL_000_031) * 32;
            format!("{BOOL_PREFIX}{first:03}_{:03}", first + 31)
        }
        SHADER_CONSTANT_LOOP_00..=SHADER_CONSTANT_LOOP_31 => {
            format!("{LOOP_PREFIX}{:02}", index - SHADER_CONSTANT_LOOP_00)
        }
        _ => return None,
    };
    Some(Cow::Owned(name))
}

/// Retrieve the index of the register with the given name
pub fn lookup(name: &str) -> Option<u32> {
    if let Some((index, _, _)) = TABLE.iter().find(|(_, n, _)| *n == name) {
        return Some(*index);
    }

    let index = if let Some(rest) = name.strip_prefix(FETCH_PREFIX) {
        let (constant, dword) = rest.split_once('_')?;
        constant
            .parse::<u32>()
            .ok()?
            .checked_mul(6)?
            .checked_add(dword.parse().ok()?)?
            .checked_add(SHADER_CONSTANT_FETCH_00_0)?
    } else if let Some(rest) = name.strip_prefix(BOOL_PREFIX) {
        let (first, _) = rest.split_once('_')?;
        (first.parse::<u32>().ok()? / 32).checked_add(SHADER_CONSTANT_BOOL_000_031)?
    } else if let Some(rest) = name.strip_prefix(LOOP_PREFIX) {
        rest.parse::<u32>().ok()?.checked_add(SHADER_CONSTANT_LOOP_00)?
    } else if let Some(rest) = name.strip_prefix(ALU_PREFIX) {
        let (constant, component) = rest.split_once('_')?;
        let component = COMPONENTS
            .iter()
            .position(|c| component.len() == 1 && component.starts_with(*c))?;
        constant
            .parse::<u32>()
            .ok()?
            .checked_mul(4)?
            .checked_add(component as u32)?
            .checked_add(SHADER_CONSTANT_000_X)?
    } else {
        return None;
    };

    // Reject names which merely parse, e.g. out of range or non-canonical ones
    (self::name(index)? == name).then_some(index)
}

/// Retrieve the [`Kind`] of the register with the given index
pub fn kind(index: u32) -> Kind {
    if let Ok(pos) = TABLE.binary_search_by_key(&index, |(i, _, _)| *i) {
        return TABLE[pos].2;
    }
    match index {
        SHADER_CONSTANT_000_X..=SHADER_CONSTANT_511_W => Kind::Float,
        _ => Kind::Integer,
    }
}
