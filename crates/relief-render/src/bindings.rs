//! Binding-point numbering shared by every shader program
//!
//! Programs are compiled independently, so the only thing keeping them in
//! agreement about where shared data lives is this module. Shader setup
//! re-points resources by NAME onto these constants.

/// Bind group of the per-frame `SceneData` block, written only by the scene
pub const SCENE_UNIFORMS: u32 = 0;
/// Bind group of a per-object `ModelData` block
pub const MODEL_UNIFORMS: u32 = 1;
/// Bind group of surface texture/sampler pairs
pub const SURFACE_TEXTURES: u32 = 2;

/// Uniform block names as declared in WGSL (struct type names)
pub const SCENE_BLOCK: &str = "SceneData";
pub const MODEL_BLOCK: &str = "ModelData";

/// Binding index of a uniform block inside its group
pub const BLOCK_BINDING: u32 = 0;

/// Bind groups tracked per pass (wgpu's default `max_bind_groups`)
pub const MAX_BIND_GROUPS: usize = 4;
/// Vertex buffer slots tracked per pass
pub const MAX_VERTEX_SLOTS: usize = 8;

/// Fixed texture units of a surface material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Color,
    Normal,
    Gloss,
}

impl TextureSlot {
    pub const ALL: [Self; 3] = [Self::Color, Self::Normal, Self::Gloss];
    pub const COUNT: usize = Self::ALL.len();

    pub fn unit(self) -> u32 {
        match self {
            Self::Color => 0,
            Self::Normal => 1,
            Self::Gloss => 2,
        }
    }

    pub fn texture_binding(self) -> u32 {
        self.unit() * 2
    }

    pub fn sampler_binding(self) -> u32 {
        self.unit() * 2 + 1
    }

    /// WGSL variable name of the texture
    pub fn texture_name(self) -> &'static str {
        match self {
            Self::Color => "color_texture",
            Self::Normal => "normal_texture",
            Self::Gloss => "gloss_texture",
        }
    }

    /// WGSL variable name of the sampler
    pub fn sampler_name(self) -> &'static str {
        match self {
            Self::Color => "color_sampler",
            Self::Normal => "normal_sampler",
            Self::Gloss => "gloss_sampler",
        }
    }

    /// Albedo is authored in sRGB; normal and gloss maps hold linear data
    pub fn is_srgb(self) -> bool {
        matches!(self, Self::Color)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Normal => "normal",
            Self::Gloss => "gloss",
        }
    }
}

/// Named vertex attribute streams, one GPU buffer each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeStream {
    Position,
    Tangent,
    Bitangent,
    Normal,
    Uv,
}

impl AttributeStream {
    pub const ALL: [Self; 5] = [
        Self::Position,
        Self::Tangent,
        Self::Bitangent,
        Self::Normal,
        Self::Uv,
    ];
    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }

    /// Vertex input name a shader uses for this stream
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Tangent => "tangent",
            Self::Bitangent => "bitangent",
            Self::Normal => "normal",
            Self::Uv => "uv",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn format(self) -> wgpu::VertexFormat {
        match self {
            Self::Uv => wgpu::VertexFormat::Float32x2,
            _ => wgpu::VertexFormat::Float32x3,
        }
    }

    pub fn stride(self) -> wgpu::BufferAddress {
        self.format().size()
    }
}
