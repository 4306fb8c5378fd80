// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Viewport state of a draw

use core::fmt;

use crate::bits::{self, field, flag};
use crate::registers::{Capture, names};

/// Scissor rectangle in pixels
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Scissor {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Scissor {
    /// Width of the rectangle, negative for inverted rectangles
    pub fn width(&self) -> i64 {
        i64::from(self.x2) - i64::from(self.x1)
    }

    /// Height of the rectangle, negative for inverted rectangles
    pub fn height(&self) -> i64 {
        i64::from(self.y2) - i64::from(self.y1)
    }
}

/// Scale or offset along one axis
///
/// The value is zero unless the axis is enabled.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Transform {
    pub enabled: bool,
    pub value: f32,
}

impl Transform {
    fn new(enabled: bool, raw: u32) -> Self {
        let value = if enabled { bits::as_f32(raw) } else { 0.0 };
        Self { enabled, value }
    }
}

/// Viewport descriptor derived from a [`Capture`]
///
/// Two draws share a group only if their viewports are equal in every field.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Viewport {
    pub xy_divided: bool,
    pub z_divided: bool,
    pub w_not_divided: bool,
    pub normalized: bool,
    /// Window offset, zero unless enabled in `PA_SU_SC_MODE_CNTL`
    pub window_offset: [i32; 2],
    pub scissor: Scissor,
    /// Scale along x, y and z
    pub scale: [Transform; 3],
    /// Offset along x, y and z
    pub offset: [Transform; 3],
}

impl From<&Capture> for Viewport {
    fn from(capture: &Capture) -> Self {
        let vte = capture.reg(names::PA_CL_VTE_CNTL);

        let window_offset = if flag(capture.reg(names::PA_SU_SC_MODE_CNTL), 16) {
            let raw = capture.reg(names::PA_SC_WINDOW_OFFSET);
            [
                bits::sign_extend(field(raw, 0, 15), 15),
                bits::sign_extend(field(raw, 16, 15), 15),
            ]
        } else {
            [0, 0]
        };

        let tl = capture.reg(names::PA_SC_WINDOW_SCISSOR_TL);
        let br = capture.reg(names::PA_SC_WINDOW_SCISSOR_BR);
        let scissor = Scissor {
            x1: field(tl, 0, 15),
            y1: field(tl, 16, 15),
            x2: field(br, 0, 15),
            y2: field(br, 16, 15),
        };

        let scale = [
            Transform::new(flag(vte, 0), capture.reg(names::PA_CL_VPORT_XSCALE)),
            Transform::new(flag(vte, 2), capture.reg(names::PA_CL_VPORT_YSCALE)),
            Transform::new(flag(vte, 4), capture.reg(names::PA_CL_VPORT_ZSCALE)),
        ];
        let offset = [
            Transform::new(flag(vte, 1), capture.reg(names::PA_CL_VPORT_XOFFSET)),
            Transform::new(flag(vte, 3), capture.reg(names::PA_CL_VPORT_YOFFSET)),
            Transform::new(flag(vte, 5), capture.reg(names::PA_CL_VPORT_ZOFFSET)),
        ];

        Self {
            xy_divided: flag(vte, 8),
            z_divided: flag(vte, 9),
            w_not_divided: flag(vte, 10),
            normalized: flag(vte, 0),
            window_offset,
            scissor,
            scale,
            offset,
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ViewportXYDivided: {}", self.xy_divided)?;
        writeln!(f, "ViewportZDivided: {}", self.z_divided)?;
        writeln!(f, "ViewportWNotDivided: {}", self.w_not_divided)?;
        writeln!(f, "NormalizedCoordinates: {}", self.normalized)?;
        let [x, y] = self.window_offset;
        writeln!(f, "WindowOffset: [{x},{y}]")?;
        let Scissor { x1, y1, x2, y2 } = self.scissor;
        write!(f, "Scissor: [{x1},{y1}] to [{x2},{y2}]")?;

        let axes = ["X", "Y", "Z"];
        for (axis, scale) in axes.iter().zip(self.scale).filter(|(_, s)| s.enabled) {
            write!(f, "\n{axis}Scale: {}", scale.value)?;
        }
        for (axis, offset) in axes.iter().zip(self.offset).filter(|(_, o)| o.enabled) {
            write!(f, "\n{axis}Offset: {}", offset.value)?;
        }
        Ok(())
    }
}
