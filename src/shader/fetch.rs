// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Vertex and texture fetch instructions

use core::fmt;

use crate::bits::Unpacker;

use super::Decompiler;
use super::swizzle::Pattern;

/// Fetch instruction sub-opcode for vertex fetches
pub const VTX_FETCH: u32 = 0;
/// Fetch instruction sub-opcode for texture fetches
pub const TEX_FETCH: u32 = 1;
/// Texture fetch sub-opcodes without a listing
const TEX_UNSUPPORTED: [u32; 7] = [16, 17, 18, 19, 24, 25, 26];

/// Raw vertex fetch instruction
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexFetchInstruction {
    pub src_reg: u32,
    pub dst_reg: u32,
    pub const_index: u32,
    pub const_index_sel: u32,
    pub src_swiz: u32,
    pub dst_swiz: u32,
    /// Components are signed
    pub format_comp_all: bool,
    /// Components are not normalized
    pub num_format_all: bool,
    pub signed_rf_mode_all: bool,
    pub format: u32,
    pub exp_adjust_all: u32,
    pub pred_select: bool,
    /// Stride in words
    pub stride: u32,
    /// Offset in words
    pub offset: u32,
    pub pred_condition: bool,
}

impl VertexFetchInstruction {
    /// Decode an instruction slot
    pub fn decode([w0, w1, w2]: [u32; 3]) -> Self {
        let mut a = Unpacker::new(w0);
        let mut b = Unpacker::new(w1);
        let mut c = Unpacker::new(w2);

        a.skip(5);
        let src_reg = a.take(6);
        let dst_reg = a.skip(1).take(6);
        let const_index = a.skip(2).take(5);
        let const_index_sel = a.take(2);
        let src_swiz = a.skip(3).take(2);

        let dst_swiz = b.take(12);
        let format_comp_all = b.flag();
        let num_format_all = b.flag();
        let signed_rf_mode_all = b.flag();
        let format = b.skip(1).take(6);
        let exp_adjust_all = b.skip(1).take(7);
        let pred_select = b.skip(1).flag();

        Self {
            src_reg,
            dst_reg,
            const_index,
            const_index_sel,
            src_swiz,
            dst_swiz,
            format_comp_all,
            num_format_all,
            signed_rf_mode_all,
            format,
            exp_adjust_all,
            pred_select,
            stride: c.take(8),
            offset: c.take(23),
            pred_condition: c.flag(),
        }
    }

    /// Fetch constant slot addressed
    pub fn slot(&self) -> u32 {
        self.const_index * 3 + self.const_index_sel
    }

    /// Derive the type of the fetched data
    pub fn data_type(&self) -> DataType {
        let normalized = !self.num_format_all;
        if FetchFormat::from(self.format).is_float() {
            DataType::Float
        } else if self.format_comp_all {
            if normalized { DataType::Snorm } else { DataType::Sint }
        } else if normalized {
            DataType::Unorm
        } else {
            DataType::Uint
        }
    }
}

/// Raw texture fetch instruction
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureFetchInstruction {
    pub src_reg: u32,
    pub dst_reg: u32,
    pub fetch_valid_only: bool,
    pub const_idx: u32,
    pub tx_coord_denorm: bool,
    pub src_swiz: u32,
    pub dst_swiz: u32,
    pub mag_filter: u32,
    pub min_filter: u32,
    pub mip_filter: u32,
    pub aniso_filter: u32,
    pub arbitrary_filter: u32,
    pub vol_mag_filter: u32,
    pub vol_min_filter: u32,
    pub use_comp_lod: bool,
    pub use_reg_lod: bool,
    pub pred_select: bool,
    pub use_reg_gradients: bool,
    pub sample_location: bool,
    pub lod_bias: u32,
    pub dimension: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub offset_z: u32,
    pub pred_condition: bool,
}

impl TextureFetchInstruction {
    /// Decode an instruction slot
    pub fn decode([w0, w1, w2]: [u32; 3]) -> Self {
        let mut a = Unpacker::new(w0);
        let mut b = Unpacker::new(w1);
        let mut c = Unpacker::new(w2);

        a.skip(5);
        let src_reg = a.take(6);
        let dst_reg = a.skip(1).take(6);
        let fetch_valid_only = a.skip(1).flag();
        let const_idx = a.take(5);
        let tx_coord_denorm = a.flag();
        let src_swiz = a.take(6);

        let dst_swiz = b.take(12);
        let mag_filter = b.take(2);
        let min_filter = b.take(2);
        let mip_filter = b.take(2);
        let aniso_filter = b.take(3);
        let arbitrary_filter = b.take(3);
        let vol_mag_filter = b.take(2);
        let vol_min_filter = b.take(2);
        let use_comp_lod = b.flag();
        let use_reg_lod = b.flag();
        let pred_select = b.skip(1).flag();

        let use_reg_gradients = c.flag();
        let sample_location = c.flag();
        let lod_bias = c.take(7);
        let dimension = c.skip(5).take(2);

        Self {
            src_reg,
            dst_reg,
            fetch_valid_only,
            const_idx,
            tx_coord_denorm,
            src_swiz,
            dst_swiz,
            mag_filter,
            min_filter,
            mip_filter,
            aniso_filter,
            arbitrary_filter,
            vol_mag_filter,
            vol_min_filter,
            use_comp_lod,
            use_reg_lod,
            pred_select,
            use_reg_gradients,
            sample_location,
            lod_bias,
            dimension,
            offset_x: c.take(5),
            offset_y: c.take(5),
            offset_z: c.take(5),
            pred_condition: c.flag(),
        }
    }
}

/// A vertex fetch performed by a shader
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexFetch {
    /// Vertex fetch constant slot
    pub slot: u32,
    /// Offset within a vertex in words
    pub offset: u32,
    /// Distance between vertices in words
    pub stride: u32,
    pub format: FetchFormat,
    pub data_type: DataType,
}

impl VertexFetch {
    /// Offset within a vertex in bytes
    pub fn byte_offset(&self) -> u32 {
        self.offset * 4
    }

    /// Distance between vertices in bytes
    pub fn byte_stride(&self) -> u32 {
        self.stride * 4
    }
}

impl fmt::Display for VertexFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Slot={} Offset={} Stride={} Format={} DataType={}",
            self.slot, self.offset, self.stride, self.format, self.data_type
        )
    }
}

/// Format of fetched vertex data
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FetchFormat {
    FMT_1_REVERSE,
    FMT_8,
    FMT_8_8_8_8,
    FMT_2_10_10_10,
    FMT_8_8,
    FMT_16,
    FMT_16_16,
    FMT_16_16_16_16,
    FMT_32,
    FMT_32_32,
    FMT_32_32_32_32,
    FMT_32_FLOAT,
    FMT_32_32_FLOAT,
    FMT_32_32_32_32_FLOAT,
    FMT_32_32_32_FLOAT,
    Other(u8),
}

impl FetchFormat {
    /// Check whether this format holds floating point components
    pub fn is_float(self) -> bool {
        matches!(
            self,
            Self::FMT_32_FLOAT
                | Self::FMT_32_32_FLOAT
                | Self::FMT_32_32_32_32_FLOAT
                | Self::FMT_32_32_32_FLOAT
        )
    }
}

impl From<u32> for FetchFormat {
    fn from(raw: u32) -> Self {
        match raw & 0x3F {
            0 => Self::FMT_1_REVERSE,
            2 => Self::FMT_8,
            6 => Self::FMT_8_8_8_8,
            7 => Self::FMT_2_10_10_10,
            10 => Self::FMT_8_8,
            24 => Self::FMT_16,
            25 => Self::FMT_16_16,
            26 => Self::FMT_16_16_16_16,
            33 => Self::FMT_32,
            34 => Self::FMT_32_32,
            35 => Self::FMT_32_32_32_32,
            36 => Self::FMT_32_FLOAT,
            37 => Self::FMT_32_32_FLOAT,
            38 => Self::FMT_32_32_32_32_FLOAT,
            57 => Self::FMT_32_32_32_FLOAT,
            other => Self::Other(other as u8),
        }
    }
}

impl fmt::Display for FetchFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(raw) => write!(f, "FMT_{raw}"),
            known => fmt::Debug::fmt(known, f),
        }
    }
}

/// Interpretation of fetched vertex data
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Unorm,
    Uint,
    Snorm,
    Sint,
    Float,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unorm => "UNORM",
            Self::Uint => "UINT",
            Self::Snorm => "SNORM",
            Self::Sint => "SINT",
            Self::Float => "FLOAT",
        };
        f.write_str(name)
    }
}

/// A texture fetch performed by a shader
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureFetch {
    /// Texture fetch constant slot
    pub slot: u32,
    pub dimension: Dimension,
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub mip_filter: Filter,
    pub aniso_filter: AnisoFilter,
    pub arbitrary_filter: ArbitraryFilter,
    pub vol_mag_filter: u32,
    pub vol_min_filter: u32,
    pub use_comp_lod: bool,
    pub use_reg_lod: bool,
    pub use_reg_gradients: bool,
    pub sample_location: bool,
    pub lod_bias: i32,
    /// Texel offsets along x, y and z
    pub offset: [i32; 3],
}

impl From<&TextureFetchInstruction> for TextureFetch {
    fn from(tex: &TextureFetchInstruction) -> Self {
        Self {
            slot: tex.const_idx & 0xF,
            dimension: Dimension::from(tex.dimension),
            mag_filter: Filter::from(tex.mag_filter),
            min_filter: Filter::from(tex.min_filter),
            mip_filter: Filter::from(tex.mip_filter),
            aniso_filter: AnisoFilter::from(tex.aniso_filter),
            arbitrary_filter: ArbitraryFilter::from(tex.arbitrary_filter),
            vol_mag_filter: tex.vol_mag_filter,
            vol_min_filter: tex.vol_min_filter,
            use_comp_lod: tex.use_comp_lod,
            use_reg_lod: tex.use_reg_lod,
            use_reg_gradients: tex.use_reg_gradients,
            sample_location: tex.sample_location,
            lod_bias: tex.lod_bias as i32 - 32,
            offset: [tex.offset_x, tex.offset_y, tex.offset_z].map(|o| o as i32 - 16),
        }
    }
}

impl fmt::Display for TextureFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Slot: {}", self.slot)?;
        writeln!(f, "Dimension: {}", self.dimension)?;
        writeln!(f, "MinFilter: {}", self.min_filter)?;
        writeln!(f, "MipFilter: {}", self.mip_filter)?;
        writeln!(f, "MagFilter: {}", self.mag_filter)?;
        writeln!(f, "AnisoFilter: {}", self.aniso_filter)?;
        writeln!(f, "ArbitraryFilter: {}", self.arbitrary_filter)?;
        writeln!(f, "VolMinFilter: {}", self.vol_min_filter)?;
        writeln!(f, "VolMagFilter: {}", self.vol_mag_filter)?;
        writeln!(f, "UseCompLod: {}", self.use_comp_lod as u8)?;
        writeln!(f, "UseRegLod: {}", self.use_reg_lod as u8)?;
        writeln!(f, "UseRegGradients: {}", self.use_reg_gradients as u8)?;
        writeln!(f, "SampleLocation: {}", self.sample_location as u8)?;
        writeln!(f, "LodBias: {}", self.lod_bias)?;
        let [x, y, z] = self.offset;
        write!(f, "Offset: [{x},{y},{z}]")
    }
}

/// Texture dimensionality
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    D1,
    D2,
    D3,
    Cube,
}

impl Dimension {
    /// Name of the sampling function
    pub fn sampler(self) -> &'static str {
        match self {
            Self::D1 => "TEX1D",
            Self::D2 => "TEX2D",
            Self::D3 => "TEX3D",
            Self::Cube => "TEXCUBE",
        }
    }
}

impl From<u32> for Dimension {
    fn from(raw: u32) -> Self {
        match raw & 0x3 {
            0 => Self::D1,
            1 => Self::D2,
            2 => Self::D3,
            _ => Self::Cube,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::D1 => "DIMENSION_1D",
            Self::D2 => "DIMENSION_2D",
            Self::D3 => "DIMENSION_3D",
            Self::Cube => "DIMENSION_CUBE",
        };
        f.write_str(name)
    }
}

/// Texture filter mode
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    Point,
    Linear,
    /// Only applicable for mip filtering
    BaseMap,
    UseFetchConst,
}

impl From<u32> for Filter {
    fn from(raw: u32) -> Self {
        match raw & 0x3 {
            0 => Self::Point,
            1 => Self::Linear,
            2 => Self::BaseMap,
            _ => Self::UseFetchConst,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Point => "TEX_FILTER_POINT",
            Self::Linear => "TEX_FILTER_LINEAR",
            Self::BaseMap => "TEX_FILTER_BASEMAP",
            Self::UseFetchConst => "TEX_FILTER_USE_FETCH_CONST",
        };
        f.write_str(name)
    }
}

/// Anisotropic filter mode
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnisoFilter {
    Disabled,
    Max1To1,
    Max2To1,
    Max4To1,
    Max8To1,
    Max16To1,
    UseFetchConst,
    Other(u8),
}

impl From<u32> for AnisoFilter {
    fn from(raw: u32) -> Self {
        match raw & 0x7 {
            0 => Self::Disabled,
            1 => Self::Max1To1,
            2 => Self::Max2To1,
            3 => Self::Max4To1,
            4 => Self::Max8To1,
            5 => Self::Max16To1,
            7 => Self::UseFetchConst,
            other => Self::Other(other as u8),
        }
    }
}

impl fmt::Display for AnisoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disabled => "ANISO_FILTER_DISABLED",
            Self::Max1To1 => "ANISO_FILTER_MAX_1_1",
            Self::Max2To1 => "ANISO_FILTER_MAX_2_1",
            Self::Max4To1 => "ANISO_FILTER_MAX_4_1",
            Self::Max8To1 => "ANISO_FILTER_MAX_8_1",
            Self::Max16To1 => "ANISO_FILTER_MAX_16_1",
            Self::UseFetchConst => "ANISO_FILTER_USE_FETCH_CONST",
            Self::Other(raw) => return write!(f, "ANISO_FILTER_{raw}"),
        };
        f.write_str(name)
    }
}

/// Arbitrary filter kernel
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArbitraryFilter {
    Sym2x4,
    Asym2x4,
    Sym4x2,
    Asym4x2,
    Sym4x4,
    Asym4x4,
    UseFetchConst,
    Other(u8),
}

impl From<u32> for ArbitraryFilter {
    fn from(raw: u32) -> Self {
        match raw & 0x7 {
            0 => Self::Sym2x4,
            1 => Self::Asym2x4,
            2 => Self::Sym4x2,
            3 => Self::Asym4x2,
            4 => Self::Sym4x4,
            5 => Self::Asym4x4,
            7 => Self::UseFetchConst,
            other => Self::Other(other as u8),
        }
    }
}

impl fmt::Display for ArbitraryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sym2x4 => "ARBITRARY_FILTER_2X4_SYM",
            Self::Asym2x4 => "ARBITRARY_FILTER_2X4_ASYM",
            Self::Sym4x2 => "ARBITRARY_FILTER_4X2_SYM",
            Self::Asym4x2 => "ARBITRARY_FILTER_4X2_ASYM",
            Self::Sym4x4 => "ARBITRARY_FILTER_4X4_SYM",
            Self::Asym4x4 => "ARBITRARY_FILTER_4X4_ASYM",
            Self::UseFetchConst => "ARBITRARY_FILTER_USE_FETCH_CONST",
            Self::Other(raw) => return write!(f, "ARBITRARY_FILTER_{raw}"),
        };
        f.write_str(name)
    }
}

impl Decompiler<'_> {
    /// Emit a fetch instruction slot
    pub(super) fn fetch(&mut self, words: [u32; 3], condition: &str, cf_condition: bool) {
        match words[0] & 0x1F {
            VTX_FETCH => {
                let vtx = VertexFetchInstruction::decode(words);
                let cnd =
                    super::predicate(condition, cf_condition, vtx.pred_select, vtx.pred_condition);
                self.vertex_fetch(vtx, cnd);
            }
            TEX_FETCH => {
                let tex = TextureFetchInstruction::decode(words);
                let cnd =
                    super::predicate(condition, cf_condition, tex.pred_select, tex.pred_condition);
                self.texture_fetch(&tex, cnd);
            }
            opcode if TEX_UNSUPPORTED.contains(&opcode) => {
                self.lines.push(format!("INVALID TEXTURE FETCH {opcode}"));
            }
            _ => (),
        }
    }

    fn vertex_fetch(&mut self, mut vtx: VertexFetchInstruction, cnd: &str) {
        // A zero stride continues the previous fetch's stream
        if vtx.stride != 0 {
            self.last_stride = vtx.stride;
        } else {
            vtx.stride = self.last_stride;
        }

        let fetch = VertexFetch {
            slot: vtx.slot(),
            offset: vtx.offset,
            stride: vtx.stride,
            format: FetchFormat::from(vtx.format),
            data_type: vtx.data_type(),
        };
        self.vertex_fetches.push(fetch);

        self.lines.push(format!(
            "{cnd}R{}.{} = VFETCH( SLOT={}, STRIDE={}, FORMAT={},{},{} );",
            vtx.dst_reg,
            Pattern::write(vtx.dst_swiz),
            fetch.slot,
            fetch.byte_stride(),
            fetch.byte_offset(),
            fetch.format,
            fetch.data_type,
        ));
    }

    fn texture_fetch(&mut self, tex: &TextureFetchInstruction, cnd: &str) {
        let fetch = TextureFetch::from(tex);
        self.texture_fetches.push(fetch);

        self.lines.push(format!(
            "{cnd}R{}.{} = {}( R{}.{}, {} );",
            tex.dst_reg,
            Pattern::write(tex.dst_swiz),
            fetch.dimension.sampler(),
            tex.src_reg,
            Pattern::direct(tex.src_swiz),
            tex.const_idx,
        ));
    }
}
