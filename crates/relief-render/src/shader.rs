//! Shader program lifecycle: compile, bind by name, build, hot reload
//!
//! WGSL sources are parsed with naga, then every uniform block and texture
//! they declare is re-pointed at the binding point named in the program's
//! rules, whatever `@group`/`@binding` the source happened to use. Vertex
//! inputs are looked up by name so each attribute stream lands in the slot
//! the shader actually reads it from.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use relief_core::{ReliefError, Result, ShaderFailure};

use crate::bindings::AttributeStream;
use crate::pass::DrawRequirements;
use crate::resource::ResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            Self::Vertex => naga::ShaderStage::Vertex,
            Self::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

/// Where a stage's WGSL comes from
#[derive(Debug, Clone)]
pub enum ShaderSource {
    /// Compiled into the binary
    Embedded {
        name: &'static str,
        code: &'static str,
    },
    /// Read from disk on every build, so edits are picked up by reload
    File(PathBuf),
}

impl ShaderSource {
    /// A file under `dir` when given, else the embedded fallback
    pub fn resolve(dir: Option<&Path>, name: &'static str, code: &'static str) -> Self {
        match dir {
            Some(dir) => Self::File(dir.join(name)),
            None => Self::Embedded { name, code },
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Embedded { name, .. } => (*name).to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Embedded { .. } => None,
        }
    }

    fn read(&self) -> Result<Cow<'static, str>> {
        match self {
            Self::Embedded { code, .. } => Ok(Cow::Borrowed(code)),
            Self::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|e| ReliefError::resource_load(path, e)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShaderPart {
    pub stage: ShaderStage,
    pub source: ShaderSource,
    pub entry_point: String,
}

impl ShaderPart {
    pub fn new(stage: ShaderStage, source: ShaderSource, entry_point: &str) -> Self {
        Self {
            stage,
            source,
            entry_point: entry_point.to_string(),
        }
    }
}

/// Pin the resource called `name` to `(group, binding)`.
///
/// Uniform blocks match on their struct type name; textures and samplers
/// match on their variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRule {
    pub name: String,
    pub group: u32,
    pub binding: u32,
}

impl BindingRule {
    pub fn new(name: &str, group: u32, binding: u32) -> Self {
        Self {
            name: name.to_string(),
            group,
            binding,
        }
    }
}

/// Color and depth formats a pipeline renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTarget {
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
}

/// Everything needed to (re)build a program
#[derive(Debug, Clone)]
pub struct ProgramDesc {
    pub label: String,
    pub parts: Vec<ShaderPart>,
    pub rules: Vec<BindingRule>,
    /// Streams the owning drawable can supply
    pub streams: Vec<AttributeStream>,
    pub target: PipelineTarget,
}

impl ProgramDesc {
    /// Distinct files on disk read by the parts, in part order
    pub fn source_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = Vec::new();
        for path in self.parts.iter().filter_map(|p| p.source.path()) {
            if !files.iter().any(|f| f == path) {
                files.push(path.to_path_buf());
            }
        }
        files
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    pub name: String,
    pub group: u32,
    pub binding: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAttribute {
    pub stream: AttributeStream,
    pub location: u32,
}

/// Binding metadata recovered from the compiled program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramBindings {
    /// Sorted by (group, binding)
    pub resources: Vec<ResolvedResource>,
    /// Vertex inputs; the index into this list is the vertex buffer slot
    pub attributes: Vec<ResolvedAttribute>,
}

impl ProgramBindings {
    pub fn slot_of(&self, stream: AttributeStream) -> Option<u32> {
        self.attributes
            .iter()
            .position(|a| a.stream == stream)
            .map(|i| i as u32)
    }

    pub fn resource(&self, name: &str) -> Option<&ResolvedResource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub file: String,
    pub entry_point: String,
    pub module: naga::Module,
}

/// Validated naga modules with their bindings rewritten
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub vertex: CompiledStage,
    pub fragment: Option<CompiledStage>,
    pub bindings: ProgramBindings,
}

/// Parse, rebind and validate every part of `desc` without touching the GPU
pub fn compile(desc: &ProgramDesc) -> Result<CompiledProgram> {
    let mut vertex: Option<CompiledStage> = None;
    let mut fragment: Option<CompiledStage> = None;
    let mut resources: Vec<ResolvedResource> = Vec::new();
    let mut attributes = Vec::new();

    for part in &desc.parts {
        let file = part.source.name();
        let link = |reason: String| ReliefError::shader(file.clone(), ShaderFailure::Link, reason);

        let code = part.source.read()?;
        let mut module = naga::front::wgsl::parse_str(&code).map_err(|e| {
            ReliefError::shader(file.clone(), ShaderFailure::Compile, e.emit_to_string(&code))
        })?;

        for resource in bind_resources(&mut module, &desc.rules).map_err(link)? {
            if !resources.contains(&resource) {
                resources.push(resource);
            }
        }

        let has_entry = module
            .entry_points
            .iter()
            .any(|ep| ep.name == part.entry_point && ep.stage == part.stage.naga());
        if !has_entry {
            return Err(link(format!(
                "no {:?} entry point named '{}'",
                part.stage, part.entry_point
            )));
        }

        if part.stage == ShaderStage::Vertex {
            attributes = resolve_attributes(&module, &part.entry_point, &desc.streams).map_err(link)?;
        }

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| link(e.as_inner().to_string()))?;

        let slot = match part.stage {
            ShaderStage::Vertex => &mut vertex,
            ShaderStage::Fragment => &mut fragment,
        };
        if slot.is_some() {
            return Err(link(format!("{:?} stage given twice", part.stage)));
        }
        *slot = Some(CompiledStage {
            file,
            entry_point: part.entry_point.clone(),
            module,
        });
    }

    let vertex = vertex.ok_or_else(|| {
        ReliefError::shader(desc.label.clone(), ShaderFailure::Link, "program has no vertex stage")
    })?;

    resources.sort_by_key(|r| (r.group, r.binding));
    Ok(CompiledProgram {
        vertex,
        fragment,
        bindings: ProgramBindings {
            resources,
            attributes,
        },
    })
}

/// Overwrite the binding of every bindable global according to `rules`
fn bind_resources(
    module: &mut naga::Module,
    rules: &[BindingRule],
) -> std::result::Result<Vec<ResolvedResource>, String> {
    let handles: Vec<_> = module.global_variables.iter().map(|(h, _)| h).collect();
    let mut resolved = Vec::new();

    for handle in handles {
        let var = &module.global_variables[handle];
        let key = match var.space {
            naga::AddressSpace::Uniform | naga::AddressSpace::Storage { .. } => {
                module.types[var.ty].name.clone()
            }
            naga::AddressSpace::Handle => var.name.clone(),
            _ => continue,
        };
        let key = key.ok_or_else(|| "unnamed shader resource".to_string())?;
        let rule = rules
            .iter()
            .find(|r| r.name == key)
            .ok_or_else(|| format!("no binding point assigned for '{key}'"))?;

        module.global_variables[handle].binding = Some(naga::ResourceBinding {
            group: rule.group,
            binding: rule.binding,
        });
        resolved.push(ResolvedResource {
            name: key,
            group: rule.group,
            binding: rule.binding,
        });
    }

    Ok(resolved)
}

/// Map the vertex entry point's inputs to attribute streams by name
fn resolve_attributes(
    module: &naga::Module,
    entry_point: &str,
    supplied: &[AttributeStream],
) -> std::result::Result<Vec<ResolvedAttribute>, String> {
    let ep = module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry_point && ep.stage == naga::ShaderStage::Vertex)
        .ok_or_else(|| format!("no vertex entry point named '{entry_point}'"))?;

    let mut inputs: Vec<(Option<&str>, u32)> = Vec::new();
    for arg in &ep.function.arguments {
        match &arg.binding {
            Some(naga::Binding::Location { location, .. }) => {
                inputs.push((arg.name.as_deref(), *location));
            }
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
                    for member in members {
                        if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                            inputs.push((member.name.as_deref(), *location));
                        }
                    }
                }
            }
        }
    }

    let mut attributes = inputs
        .into_iter()
        .map(|(name, location)| {
            let name = name.ok_or_else(|| format!("unnamed vertex input at location {location}"))?;
            let stream = AttributeStream::from_name(name)
                .filter(|s| supplied.contains(s))
                .ok_or_else(|| format!("vertex input '{name}' has no matching attribute stream"))?;
            Ok(ResolvedAttribute { stream, location })
        })
        .collect::<std::result::Result<Vec<_>, String>>()?;

    attributes.sort_by_key(|a| a.location);
    Ok(attributes)
}

/// A built render pipeline plus the metadata needed to feed it
pub struct ShaderProgram {
    id: ResourceId,
    desc: ProgramDesc,
    group_count: u32,
    pipeline: wgpu::RenderPipeline,
    bindings: ProgramBindings,
}

impl ShaderProgram {
    /// Compile and link. `layouts[i]` is the layout of bind group `i`.
    pub fn build(
        device: &wgpu::Device,
        desc: ProgramDesc,
        layouts: &[&wgpu::BindGroupLayout],
    ) -> Result<Self> {
        let compiled = compile(&desc)?;
        let pipeline = create_pipeline(device, &desc, &compiled, layouts)?;
        log::debug!(
            "Built shader program '{}' ({} resources, {} vertex streams)",
            desc.label,
            compiled.bindings.resources.len(),
            compiled.bindings.attributes.len()
        );
        Ok(Self {
            id: ResourceId::next(),
            desc,
            group_count: layouts.len() as u32,
            pipeline,
            bindings: compiled.bindings,
        })
    }

    /// Rebuild from the same sources. On failure the current pipeline stays in use.
    pub fn reload(&mut self, device: &wgpu::Device, layouts: &[&wgpu::BindGroupLayout]) -> Result<()> {
        let compiled = compile(&self.desc)?;
        let pipeline = create_pipeline(device, &self.desc, &compiled, layouts)?;

        self.pipeline = pipeline;
        self.bindings = compiled.bindings;
        self.group_count = layouts.len() as u32;
        self.id = ResourceId::next();
        log::info!("Reloaded shader program '{}'", self.desc.label);
        Ok(())
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.desc.label
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn bindings(&self) -> &ProgramBindings {
        &self.bindings
    }

    pub fn requirements(&self) -> DrawRequirements {
        DrawRequirements {
            groups: self.group_count,
            vertex_slots: self.bindings.attributes.len() as u32,
        }
    }

    /// Source files on disk this program reads
    pub fn source_files(&self) -> Vec<PathBuf> {
        self.desc.source_files()
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    desc: &ProgramDesc,
    compiled: &CompiledProgram,
    layouts: &[&wgpu::BindGroupLayout],
) -> Result<wgpu::RenderPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader_module = |stage: &CompiledStage| {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&stage.file),
            source: wgpu::ShaderSource::Naga(Cow::Owned(stage.module.clone())),
        })
    };
    let vs_module = shader_module(&compiled.vertex);
    let fs_module = compiled.fragment.as_ref().map(|fs| (shader_module(fs), fs));

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&desc.label),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });

    // one buffer per stream, each holding a single attribute
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = compiled
        .bindings
        .attributes
        .iter()
        .map(|a| {
            [wgpu::VertexAttribute {
                format: a.stream.format(),
                offset: 0,
                shader_location: a.location,
            }]
        })
        .collect();
    let buffers: Vec<wgpu::VertexBufferLayout> = compiled
        .bindings
        .attributes
        .iter()
        .zip(&attributes)
        .map(|(a, attr)| wgpu::VertexBufferLayout {
            array_stride: a.stream.stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attr,
        })
        .collect();

    let targets = [Some(wgpu::ColorTargetState {
        format: desc.target.color_format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    })];

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&desc.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &vs_module,
            entry_point: Some(&compiled.vertex.entry_point),
            buffers: &buffers,
            compilation_options: Default::default(),
        },
        fragment: fs_module.as_ref().map(|(module, stage)| wgpu::FragmentState {
            module,
            entry_point: Some(&stage.entry_point),
            targets: &targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: desc.target.depth_format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(ReliefError::shader(
            desc.label.clone(),
            ShaderFailure::Link,
            err,
        ));
    }
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: PipelineTarget = PipelineTarget {
        color_format: wgpu::TextureFormat::Rgba8UnormSrgb,
        depth_format: wgpu::TextureFormat::Depth32Float,
    };

    const FLAT_SHADER: &str = r#"
struct SceneData {
    tint: vec4<f32>,
}

@group(3) @binding(7) var<uniform> scene: SceneData;

struct VertexInput {
    @location(2) uv: vec2<f32>,
    @location(5) position: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.position, 1.0);
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return scene.tint * vec4<f32>(in.uv, 0.0, 1.0);
}
"#;

    fn desc_for(source: ShaderSource) -> ProgramDesc {
        ProgramDesc {
            label: "flat".into(),
            parts: vec![
                ShaderPart::new(ShaderStage::Vertex, source.clone(), "vs_main"),
                ShaderPart::new(ShaderStage::Fragment, source, "fs_main"),
            ],
            rules: vec![BindingRule::new("SceneData", 0, 0)],
            streams: AttributeStream::ALL.to_vec(),
            target: TARGET,
        }
    }

    fn embedded(code: &'static str) -> ShaderSource {
        ShaderSource::Embedded { name: "flat.wgsl", code }
    }

    fn err_kind(err: ReliefError) -> ShaderFailure {
        match err {
            ReliefError::ShaderBuild { kind, .. } => kind,
            other => panic!("expected shader error, got {other}"),
        }
    }

    #[test]
    fn resources_are_rebound_by_name() {
        let compiled = compile(&desc_for(embedded(FLAT_SHADER))).unwrap();

        assert_eq!(
            compiled.bindings.resources,
            vec![ResolvedResource {
                name: "SceneData".into(),
                group: 0,
                binding: 0,
            }]
        );

        let (_, var) = compiled
            .vertex
            .module
            .global_variables
            .iter()
            .find(|(_, v)| v.name.as_deref() == Some("scene"))
            .unwrap();
        assert_eq!(
            var.binding,
            Some(naga::ResourceBinding {
                group: 0,
                binding: 0
            })
        );
    }

    #[test]
    fn attributes_follow_shader_locations() {
        let compiled = compile(&desc_for(embedded(FLAT_SHADER))).unwrap();
        let attrs = &compiled.bindings.attributes;

        assert_eq!(
            attrs,
            &vec![
                ResolvedAttribute {
                    stream: AttributeStream::Uv,
                    location: 2
                },
                ResolvedAttribute {
                    stream: AttributeStream::Position,
                    location: 5
                },
            ]
        );
        assert_eq!(compiled.bindings.slot_of(AttributeStream::Position), Some(1));
        assert_eq!(compiled.bindings.slot_of(AttributeStream::Normal), None);
    }

    #[test]
    fn compile_is_idempotent() {
        let desc = desc_for(embedded(FLAT_SHADER));
        let a = compile(&desc).unwrap();
        let b = compile(&desc).unwrap();
        assert_eq!(a.bindings, b.bindings);
    }

    #[test]
    fn syntax_error_is_compile_failure() {
        let err = compile(&desc_for(embedded("fn vs_main( {"))).unwrap_err();
        assert_eq!(err_kind(err), ShaderFailure::Compile);
    }

    #[test]
    fn unknown_resource_is_link_failure() {
        let mut desc = desc_for(embedded(FLAT_SHADER));
        desc.rules.clear();
        let err = compile(&desc).unwrap_err();
        assert!(err.to_string().contains("SceneData"));
        assert_eq!(err_kind(err), ShaderFailure::Link);
    }

    #[test]
    fn missing_entry_point_is_link_failure() {
        let mut desc = desc_for(embedded(FLAT_SHADER));
        desc.parts[1].entry_point = "main".into();
        assert_eq!(err_kind(compile(&desc).unwrap_err()), ShaderFailure::Link);
    }

    #[test]
    fn unsupplied_stream_is_link_failure() {
        let mut desc = desc_for(embedded(FLAT_SHADER));
        desc.streams = vec![AttributeStream::Position];
        let err = compile(&desc).unwrap_err();
        assert!(err.to_string().contains("'uv'"));
        assert_eq!(err_kind(err), ShaderFailure::Link);
    }

    #[test]
    fn program_needs_a_vertex_stage() {
        let mut desc = desc_for(embedded(FLAT_SHADER));
        desc.parts.remove(0);
        assert_eq!(err_kind(compile(&desc).unwrap_err()), ShaderFailure::Link);
    }

    #[test]
    fn missing_file_is_resource_failure() {
        let desc = desc_for(ShaderSource::File("no/such/shader.wgsl".into()));
        assert!(matches!(
            compile(&desc),
            Err(ReliefError::ResourceLoad { .. })
        ));
    }

    #[test]
    fn file_sources_are_reread() {
        let dir = std::env::temp_dir().join(format!("relief-shader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("flat.wgsl");
        let desc = desc_for(ShaderSource::File(path.clone()));

        std::fs::write(&path, FLAT_SHADER).unwrap();
        assert!(compile(&desc).is_ok());

        std::fs::write(&path, "not wgsl at all").unwrap();
        assert_eq!(err_kind(compile(&desc).unwrap_err()), ShaderFailure::Compile);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn shared_file_is_listed_once() {
        let desc = desc_for(ShaderSource::File("shaders/flat.wgsl".into()));
        assert_eq!(desc.parts.len(), 2);
        assert_eq!(desc.source_files(), vec![PathBuf::from("shaders/flat.wgsl")]);

        assert!(desc_for(embedded(FLAT_SHADER)).source_files().is_empty());
    }

    #[test]
    fn resolve_prefers_directory() {
        let src = ShaderSource::resolve(Some(Path::new("shaders")), "terrain.wgsl", "");
        assert_eq!(src.path(), Some(Path::new("shaders/terrain.wgsl")));

        let src = ShaderSource::resolve(None, "terrain.wgsl", "");
        assert_eq!(src.path(), None);
        assert_eq!(src.name(), "terrain.wgsl");
    }
}
