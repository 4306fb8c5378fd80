// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Render target state of a draw

use core::fmt;

use crate::bits::{field, flag};
use crate::registers::{Capture, names};

/// Value of `RB_MODECONTROL` enabling color and depth targets
pub const MODE_COLOR_DEPTH: u32 = 4;

/// Number of color render targets
pub const COLOR_TARGETS: usize = 4;

/// Multisampling mode
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Msaa {
    #[default]
    X1,
    X2,
    X4,
    Other(u8),
}

impl From<u32> for Msaa {
    fn from(raw: u32) -> Self {
        match raw & 0x3 {
            0 => Self::X1,
            1 => Self::X2,
            2 => Self::X4,
            other => Self::Other(other as u8),
        }
    }
}

impl fmt::Display for Msaa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X1 => write!(f, "MSAA1X"),
            Self::X2 => write!(f, "MSAA2X"),
            Self::X4 => write!(f, "MSAA4X"),
            Self::Other(raw) => write!(f, "MSAA_{raw}"),
        }
    }
}

/// Pixel format of a color render target
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    #[default]
    FMT_8_8_8_8,
    FMT_8_8_8_8_GAMMA,
    FMT_2_10_10_10,
    FMT_2_10_10_10_FLOAT,
    FMT_16_16,
    FMT_16_16_16_16,
    FMT_16_16_FLOAT,
    FMT_16_16_16_16_FLOAT,
    FMT_2_10_10_10_UNKNOWN,
    FMT_2_10_10_10_FLOAT_UNKNOWN,
    FMT_32_FLOAT,
    FMT_32_32_FLOAT,
    Other(u8),
}

impl From<u32> for ColorFormat {
    fn from(raw: u32) -> Self {
        match raw & 0xF {
            0 => Self::FMT_8_8_8_8,
            1 => Self::FMT_8_8_8_8_GAMMA,
            2 => Self::FMT_2_10_10_10,
            3 => Self::FMT_2_10_10_10_FLOAT,
            4 => Self::FMT_16_16,
            5 => Self::FMT_16_16_16_16,
            6 => Self::FMT_16_16_FLOAT,
            7 => Self::FMT_16_16_16_16_FLOAT,
            10 => Self::FMT_2_10_10_10_UNKNOWN,
            12 => Self::FMT_2_10_10_10_FLOAT_UNKNOWN,
            14 => Self::FMT_32_FLOAT,
            15 => Self::FMT_32_32_FLOAT,
            other => Self::Other(other as u8),
        }
    }
}

impl fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(raw) => write!(f, "FMT_{raw}"),
            known => fmt::Debug::fmt(known, f),
        }
    }
}

/// Pixel format of a depth/stencil render target
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthFormat {
    #[default]
    D24S8,
    D24FS8,
}

impl From<u32> for DepthFormat {
    fn from(raw: u32) -> Self {
        if raw & 1 == 0 {
            Self::D24S8
        } else {
            Self::D24FS8
        }
    }
}

/// A color render target slot
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorTarget {
    pub enabled: bool,
    /// EDRAM tile address
    pub edram_base: u32,
    /// Write enables for red, green, blue and alpha
    pub write: [bool; 4],
    pub format: ColorFormat,
}

/// The depth/stencil render target slot
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DepthTarget {
    pub enabled: bool,
    /// EDRAM tile address
    pub edram_base: u32,
    pub format: DepthFormat,
}

/// Render target descriptor derived from a [`Capture`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderTargets {
    pub pitch: u32,
    pub msaa: Msaa,
    pub color: [ColorTarget; COLOR_TARGETS],
    pub depth: DepthTarget,
}

impl From<&Capture> for RenderTargets {
    fn from(capture: &Capture) -> Self {
        let surface = capture.reg(names::RB_SURFACE_INFO);

        let mut color = [ColorTarget::default(); COLOR_TARGETS];
        if capture.reg(names::RB_MODECONTROL) & 0x7 == MODE_COLOR_DEPTH {
            let infos = [
                names::RB_COLOR_INFO,
                names::RB_COLOR1_INFO,
                names::RB_COLOR2_INFO,
                names::RB_COLOR3_INFO,
            ];
            let mask = capture.reg(names::RB_COLOR_MASK);
            for (shift, (slot, info)) in (0..).step_by(4).zip(color.iter_mut().zip(infos)) {
                let write = field(mask, shift, 4);
                if write == 0 {
                    continue;
                }
                let info = capture.reg(info);
                *slot = ColorTarget {
                    enabled: true,
                    edram_base: info & 0xFFF,
                    write: core::array::from_fn(|i| flag(write, i as u32)),
                    format: ColorFormat::from(field(info, 16, 4)),
                };
            }
        }

        let control = capture.reg(names::RB_DEPTHCONTROL);
        let stencil_write = field(capture.reg(names::RB_STENCILREFMASK), 16, 8);
        let uses_depth = flag(control, 1) || flag(control, 2);
        let uses_stencil = flag(control, 0) || stencil_write != 0;
        let depth = if uses_depth || uses_stencil {
            let info = capture.reg(names::RB_DEPTH_INFO);
            DepthTarget {
                enabled: true,
                edram_base: info & 0xFFF,
                format: DepthFormat::from(field(info, 16, 1)),
            }
        } else {
            Default::default()
        };

        Self {
            pitch: surface & 0x3FFF,
            msaa: Msaa::from(field(surface, 16, 2)),
            color,
            depth,
        }
    }
}

impl fmt::Display for RenderTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SurfacePitch: {}", self.pitch)?;
        write!(f, "MSAA: {}", self.msaa)?;
        for (i, color) in self.color.iter().enumerate() {
            if !color.enabled {
                write!(f, "\nColor{i}: Disabled")?;
                continue;
            }
            let [r, g, b, a] = color.write.map(u8::from);
            write!(
                f,
                "\nColor{i}: Enabled, EDRAM: 0x{:04X}, Format: {}, Write: [{r},{g},{b},{a}]",
                color.edram_base, color.format
            )?;
        }
        if self.depth.enabled {
            write!(
                f,
                "\nDepth: Enabled, EDRAM: 0x{:04X}, Format: {:?}",
                self.depth.edram_base, self.depth.format
            )
        } else {
            write!(f, "\nDepth: Disabled")
        }
    }
}
