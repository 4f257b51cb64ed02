//! Audio API seam.
//!
//! [`AudioBackend`] is the shape of a browser-style audio graph API: one
//! shared context, media-element sources, stereo panners, gains and a
//! destination. [`HeadlessAudio`] implements it in memory so the engine can
//! run (and be inspected) without a sound device.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::AudioError;
use crate::surface::TileHandle;

/// Lifecycle state reported by the shared context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

/// Result of asking a suspended context to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    Running,
    /// Resume was accepted; the state change arrives later as an event.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

pub trait AudioBackend {
    /// Whether the platform offers an audio context at all.
    fn is_supported(&self) -> bool;
    /// Creates the shared context, closing any previous one.
    fn create_context(&mut self) -> Result<ContextState, AudioError>;
    fn resume(&mut self) -> Result<ResumeOutcome, AudioError>;
    fn context_state(&self) -> Option<ContextState>;
    fn close(&mut self);

    fn has_audio_track(&self, tile: TileHandle) -> bool;
    fn create_media_source(&mut self, tile: TileHandle) -> Result<NodeId, AudioError>;
    fn create_panner(&mut self) -> Result<NodeId, AudioError>;
    fn create_gain(&mut self) -> Result<NodeId, AudioError>;
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), AudioError>;
    fn connect_destination(&mut self, node: NodeId) -> Result<(), AudioError>;
    /// Fails when the node is already disconnected.
    fn disconnect(&mut self, node: NodeId) -> Result<(), AudioError>;
    fn set_gain(&mut self, gain: NodeId, value: f32) -> Result<(), AudioError>;
    fn set_pan(&mut self, panner: NodeId, value: f32) -> Result<(), AudioError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Source(TileHandle),
    Panner,
    Gain,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    output: Option<Output>,
    value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Node(NodeId),
    Destination,
}

#[derive(Debug)]
struct HeadlessState {
    supported: bool,
    start_suspended: bool,
    resume_pending: bool,
    context: Option<ContextState>,
    contexts_created: usize,
    nodes: HashMap<NodeId, Node>,
    next_node: u64,
    silent: HashSet<TileHandle>,
    failures_left: u32,
}

/// In-memory audio graph. Clones share the same graph, so a caller can keep
/// one to inspect gains and pans while the engine owns the other.
#[derive(Debug, Clone)]
pub struct HeadlessAudio {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessAudio {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState {
                supported: true,
                start_suspended: false,
                resume_pending: false,
                context: None,
                contexts_created: 0,
                nodes: HashMap::new(),
                next_node: 0,
                silent: HashSet::new(),
                failures_left: 0,
            })),
        }
    }

    /// A platform without any audio API.
    pub fn unsupported() -> Self {
        let audio = Self::new();
        audio.state.lock().supported = false;
        audio
    }

    /// New contexts start suspended, as they do without a user gesture.
    /// With `pending`, resume is accepted but only completes on
    /// [`HeadlessAudio::finish_resume`].
    pub fn start_suspended(self, pending: bool) -> Self {
        {
            let mut state = self.state.lock();
            state.start_suspended = true;
            state.resume_pending = pending;
        }
        self
    }

    pub fn finish_resume(&self) {
        let mut state = self.state.lock();
        if state.context.is_some() {
            state.context = Some(ContextState::Running);
        }
    }

    /// Forces the context into a state, as the platform would on backgrounding.
    pub fn force_state(&self, context: ContextState) {
        self.state.lock().context = Some(context);
    }

    /// Marks a tile's media as having no audio track.
    pub fn silence(&self, tile: TileHandle) {
        self.state.lock().silent.insert(tile);
    }

    /// Makes the next `count` fallible operations fail.
    pub fn inject_failures(&self, count: u32) {
        self.state.lock().failures_left = count;
    }

    pub fn contexts_created(&self) -> usize {
        self.state.lock().contexts_created
    }

    /// Number of per-tile graphs currently wired to the destination.
    pub fn live_graphs(&self) -> usize {
        let state = self.state.lock();
        state
            .nodes
            .values()
            .filter(|n| matches!(n.kind, NodeKind::Source(_)) && n.output.is_some())
            .count()
    }

    /// Nodes that exist in the context, connected or not.
    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn connected_nodes(&self) -> usize {
        self.state
            .lock()
            .nodes
            .values()
            .filter(|n| n.output.is_some())
            .count()
    }

    pub fn gain_of(&self, tile: TileHandle) -> Option<f32> {
        self.downstream(tile, NodeKind::Gain)
    }

    pub fn pan_of(&self, tile: TileHandle) -> Option<f32> {
        self.downstream(tile, NodeKind::Panner)
    }

    fn downstream(&self, tile: TileHandle, wanted: NodeKind) -> Option<f32> {
        let state = self.state.lock();
        let (_, source) = state
            .nodes
            .iter()
            .find(|(_, n)| n.kind == NodeKind::Source(tile) && n.output.is_some())?;
        let mut next = source.output;
        while let Some(Output::Node(id)) = next {
            let node = state.nodes.get(&id)?;
            if node.kind == wanted {
                return Some(node.value);
            }
            next = node.output;
        }
        None
    }
}

impl Default for HeadlessAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessState {
    fn injected_failure(&mut self, op: &str) -> Result<(), AudioError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(AudioError::backend(format!("{op} failed")));
        }
        Ok(())
    }

    fn add_node(&mut self, kind: NodeKind) -> Result<NodeId, AudioError> {
        if self.context != Some(ContextState::Running) {
            return Err(AudioError::NotReady);
        }
        self.next_node += 1;
        let id = NodeId(self.next_node);
        self.nodes.insert(
            id,
            Node {
                kind,
                output: None,
                value: if kind == NodeKind::Gain { 1.0 } else { 0.0 },
            },
        );
        Ok(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, AudioError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| AudioError::backend(format!("unknown node {}", id.0)))
    }
}

impl AudioBackend for HeadlessAudio {
    fn is_supported(&self) -> bool {
        self.state.lock().supported
    }

    fn create_context(&mut self) -> Result<ContextState, AudioError> {
        let mut state = self.state.lock();
        if !state.supported {
            return Err(AudioError::Unsupported);
        }
        state.injected_failure("create context")?;
        state.nodes.clear();
        state.contexts_created += 1;
        let initial = if state.start_suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        state.context = Some(initial);
        Ok(initial)
    }

    fn resume(&mut self) -> Result<ResumeOutcome, AudioError> {
        let mut state = self.state.lock();
        state.injected_failure("resume")?;
        match state.context {
            None | Some(ContextState::Closed) => Err(AudioError::NotReady),
            Some(_) if state.resume_pending => Ok(ResumeOutcome::Pending),
            Some(_) => {
                state.context = Some(ContextState::Running);
                Ok(ResumeOutcome::Running)
            }
        }
    }

    fn context_state(&self) -> Option<ContextState> {
        self.state.lock().context
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        state.nodes.clear();
        if state.context.is_some() {
            state.context = Some(ContextState::Closed);
        }
    }

    fn has_audio_track(&self, tile: TileHandle) -> bool {
        !self.state.lock().silent.contains(&tile)
    }

    fn create_media_source(&mut self, tile: TileHandle) -> Result<NodeId, AudioError> {
        let mut state = self.state.lock();
        state.injected_failure("create media source")?;
        let already = state
            .nodes
            .values()
            .any(|n| n.kind == NodeKind::Source(tile) && n.output.is_some());
        if already {
            return Err(AudioError::backend("media element already connected"));
        }
        state.add_node(NodeKind::Source(tile))
    }

    fn create_panner(&mut self) -> Result<NodeId, AudioError> {
        let mut state = self.state.lock();
        state.injected_failure("create panner")?;
        state.add_node(NodeKind::Panner)
    }

    fn create_gain(&mut self) -> Result<NodeId, AudioError> {
        let mut state = self.state.lock();
        state.injected_failure("create gain")?;
        state.add_node(NodeKind::Gain)
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        state.injected_failure("connect")?;
        if !state.nodes.contains_key(&to) {
            return Err(AudioError::backend(format!("unknown node {}", to.0)));
        }
        state.node_mut(from)?.output = Some(Output::Node(to));
        Ok(())
    }

    fn connect_destination(&mut self, node: NodeId) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        state.injected_failure("connect destination")?;
        state.node_mut(node)?.output = Some(Output::Destination);
        Ok(())
    }

    /// Releases the node. A node that was never connected is still released
    /// but reported, and a released node is unknown from then on.
    fn disconnect(&mut self, node: NodeId) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        let removed = state
            .nodes
            .remove(&node)
            .ok_or_else(|| AudioError::backend(format!("unknown node {}", node.0)))?;
        if removed.output.is_none() {
            return Err(AudioError::backend("node not connected"));
        }
        Ok(())
    }

    fn set_gain(&mut self, gain: NodeId, value: f32) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        state.injected_failure("set gain")?;
        state.node_mut(gain)?.value = value;
        Ok(())
    }

    fn set_pan(&mut self, panner: NodeId, value: f32) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        state.injected_failure("set pan")?;
        state.node_mut(panner)?.value = value;
        Ok(())
    }
}
