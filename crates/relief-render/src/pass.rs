//! Render pass wrapper that tracks what is bound
//!
//! A [`FramePass`] owns the wgpu pass for one frame. Frame-wide resources
//! (the scene block) are bound on it directly and stay bound for the whole
//! pass. Each object draws inside a [`DrawScope`]; when the scope drops,
//! every binding it made is forgotten, so the next object sees exactly the
//! state that existed before this one and must bind what it needs itself.

use std::ops::Range;

use crate::bindings::{MAX_BIND_GROUPS, MAX_VERTEX_SLOTS};
use crate::context::RenderError;
use crate::resource::{GpuBindGroup, GpuBuffer, ResourceId, VertexStreams};
use crate::shader::ShaderProgram;

/// Snapshot of the resources bound on a pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingState {
    pub program: Option<ResourceId>,
    pub groups: [Option<ResourceId>; MAX_BIND_GROUPS],
    pub vertex_slots: [Option<ResourceId>; MAX_VERTEX_SLOTS],
    pub index_buffer: Option<ResourceId>,
}

/// What a program needs bound before an indexed draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRequirements {
    /// Groups `0..groups` must all be bound
    pub groups: u32,
    /// Vertex slots `0..vertex_slots` must all be bound
    pub vertex_slots: u32,
}

impl BindingState {
    /// Describe the first binding `req` needs that is not present
    pub fn missing(&self, req: &DrawRequirements) -> Option<String> {
        if self.program.is_none() {
            return Some("shader program".into());
        }
        for g in 0..req.groups as usize {
            if self.groups.get(g).copied().flatten().is_none() {
                return Some(format!("bind group {g}"));
            }
        }
        for s in 0..req.vertex_slots as usize {
            if self.vertex_slots.get(s).copied().flatten().is_none() {
                return Some(format!("vertex buffer slot {s}"));
            }
        }
        if self.index_buffer.is_none() {
            return Some("index buffer".into());
        }
        None
    }
}

pub struct FramePass<'e> {
    pass: wgpu::RenderPass<'e>,
    state: BindingState,
    frame_groups: [bool; MAX_BIND_GROUPS],
    draws: usize,
}

impl<'e> FramePass<'e> {
    pub fn new(pass: wgpu::RenderPass<'e>) -> Self {
        Self {
            pass,
            state: BindingState::default(),
            frame_groups: [false; MAX_BIND_GROUPS],
            draws: 0,
        }
    }

    /// Bind a group for the rest of the pass
    pub fn bind_frame_group(&mut self, index: u32, group: &GpuBindGroup) {
        let i = index as usize;
        if i >= MAX_BIND_GROUPS {
            log::warn!("Ignoring frame bind group at out-of-range index {index}");
            return;
        }
        self.pass.set_bind_group(index, &group.group, &[]);
        self.state.groups[i] = Some(group.id);
        self.frame_groups[i] = true;
    }

    /// Start drawing one object
    pub fn object(&mut self) -> DrawScope<'_, 'e> {
        let saved = self.state.clone();
        DrawScope {
            frame: self,
            saved,
            required: None,
        }
    }

    pub fn state(&self) -> &BindingState {
        &self.state
    }

    pub fn draw_count(&self) -> usize {
        self.draws
    }

    /// End the pass, returning the final binding state
    pub fn finish(self) -> BindingState {
        self.state
    }
}

/// Object-level binding scope; restores the prior state on drop
pub struct DrawScope<'f, 'e> {
    frame: &'f mut FramePass<'e>,
    saved: BindingState,
    required: Option<DrawRequirements>,
}

impl DrawScope<'_, '_> {
    pub fn use_program(&mut self, program: &ShaderProgram) {
        self.frame.pass.set_pipeline(program.pipeline());
        self.frame.state.program = Some(program.id());
        self.required = Some(program.requirements());
    }

    pub fn bind_group(&mut self, index: u32, group: &GpuBindGroup) -> Result<(), RenderError> {
        let i = index as usize;
        if i >= MAX_BIND_GROUPS || self.frame.frame_groups[i] {
            return Err(RenderError::FrameGroupOverride(index));
        }
        self.frame.pass.set_bind_group(index, &group.group, &[]);
        self.frame.state.groups[i] = Some(group.id);
        Ok(())
    }

    /// Bind one buffer per vertex input of `program`, in its slot order
    pub fn bind_vertex_streams(
        &mut self,
        program: &ShaderProgram,
        streams: &VertexStreams,
    ) -> Result<(), RenderError> {
        for (slot, attr) in program.bindings().attributes.iter().enumerate() {
            let buffer = streams.get(attr.stream).ok_or_else(|| {
                RenderError::UnboundResource(format!("vertex stream '{}'", attr.stream.name()))
            })?;
            let tracked = self.frame.state.vertex_slots.get_mut(slot).ok_or_else(|| {
                RenderError::UnboundResource(format!("vertex buffer slot {slot}"))
            })?;
            self.frame
                .pass
                .set_vertex_buffer(slot as u32, buffer.buffer.slice(..));
            *tracked = Some(buffer.id);
        }
        Ok(())
    }

    pub fn bind_index_buffer(&mut self, buffer: &GpuBuffer) {
        self.frame
            .pass
            .set_index_buffer(buffer.buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.frame.state.index_buffer = Some(buffer.id);
    }

    /// Issue an indexed draw, refusing if anything the program needs is unbound
    pub fn draw_indexed(&mut self, indices: Range<u32>) -> Result<(), RenderError> {
        let required = self
            .required
            .ok_or_else(|| RenderError::UnboundResource("shader program".into()))?;
        if let Some(missing) = self.frame.state.missing(&required) {
            return Err(RenderError::UnboundResource(missing));
        }
        self.frame.pass.draw_indexed(indices, 0, 0..1);
        self.frame.draws += 1;
        Ok(())
    }
}

impl Drop for DrawScope<'_, '_> {
    fn drop(&mut self) {
        self.frame.state = std::mem::take(&mut self.saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fully_bound(groups: usize, slots: usize) -> BindingState {
        let mut state = BindingState {
            program: Some(ResourceId::next()),
            index_buffer: Some(ResourceId::next()),
            ..Default::default()
        };
        for g in state.groups.iter_mut().take(groups) {
            *g = Some(ResourceId::next());
        }
        for s in state.vertex_slots.iter_mut().take(slots) {
            *s = Some(ResourceId::next());
        }
        state
    }

    #[test]
    fn complete_state_has_nothing_missing() {
        let req = DrawRequirements {
            groups: 3,
            vertex_slots: 5,
        };
        assert_eq!(fully_bound(3, 5).missing(&req), None);
    }

    #[test]
    fn reports_first_missing_binding() {
        let req = DrawRequirements {
            groups: 2,
            vertex_slots: 1,
        };

        let mut state = fully_bound(2, 1);
        state.groups[1] = None;
        assert_eq!(state.missing(&req).as_deref(), Some("bind group 1"));

        let mut state = fully_bound(2, 1);
        state.vertex_slots[0] = None;
        assert_eq!(state.missing(&req).as_deref(), Some("vertex buffer slot 0"));

        let mut state = fully_bound(2, 1);
        state.index_buffer = None;
        assert_eq!(state.missing(&req).as_deref(), Some("index buffer"));

        assert_eq!(
            BindingState::default().missing(&req).as_deref(),
            Some("shader program")
        );
    }

    #[test]
    fn extra_bindings_are_not_required() {
        let req = DrawRequirements {
            groups: 1,
            vertex_slots: 1,
        };
        let mut state = fully_bound(1, 1);
        state.groups[3] = None;
        state.vertex_slots[7] = None;
        assert_eq!(state.missing(&req), None);
    }
}
