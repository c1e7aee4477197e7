//! Events emitted by the painting core and the sinks that receive them.

use std::collections::VecDeque;
use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::{GizmoAxis, LayerId, PaintTool};
use crate::error::IpcError;

/// Notifications from the core to its host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CoreEvent {
    /// Layers changed and the flattened composite was redrawn
    CompositeRefreshRequested,

    /// A stroke began on a layer
    PaintGestureStarted {
        layer_id: LayerId,
        tool: PaintTool,
        /// Surface UV of the first sample
        uv: [f32; 2],
    },

    /// A stroke on a layer ended (pointer up or capture lost)
    PaintGestureEnded { layer_id: LayerId },

    /// All curve control points were removed
    CurveCleared,

    /// A projection bake finished and was composited into the layer
    ProjectionBaked { layer_id: LayerId },

    /// A gizmo drag ended
    GizmoDragEnded { axis: GizmoAxis },
}

impl CoreEvent {
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, IpcError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Receiver for core events, injected into the session at construction.
pub trait EventSink {
    fn emit(&mut self, event: CoreEvent);
}

/// Buffers events until the host drains them once per frame.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<CoreEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all queued events in emission order
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for EventQueue {
    fn emit(&mut self, event: CoreEvent) {
        self.events.push_back(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: CoreEvent) {}
}

impl EventSink for Sender<CoreEvent> {
    fn emit(&mut self, event: CoreEvent) {
        if let Err(err) = self.send(event) {
            debug!("EventSink: receiver dropped, discarding {:?}", err.0);
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: CoreEvent) {
        (**self).emit(event);
    }
}
