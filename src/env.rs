// ABOUTME: Lexical environment frames with descendant counting and a registry

use crate::value::{CellRef, Value};
use std::collections::HashMap;

/// Handle to a frame in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRef(u32);

impl FrameRef {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One name→value binding. The symbol cell is kept alongside the value so
/// debug output can render the binding without a reverse lookup.
#[derive(Debug)]
pub struct Binding {
    pub sym: CellRef,
    pub val: Value,
}

/// A lexical environment node. A frame is destroyed only when it is both
/// out of scope and has no descendants; closures over the frame count as
/// descendants and defer teardown past their own lifetime.
#[derive(Debug)]
pub struct Frame {
    pub(crate) bindings: HashMap<String, Binding>,
    pub(crate) parent: Option<FrameRef>,
    pub(crate) descendants: u32,
    pub(crate) in_scope: bool,
}

/// Registry of all live frames. Tracking every frame in one place keeps
/// teardown observable and leaves room for a future mark-and-sweep pass.
pub struct FrameSet {
    frames: Vec<Option<Frame>>,
    free_slots: Vec<usize>,
    global: FrameRef,
}

impl FrameSet {
    pub fn new() -> Self {
        let global = Frame {
            bindings: HashMap::new(),
            parent: None,
            descendants: 0,
            in_scope: true,
        };
        FrameSet {
            frames: vec![Some(global)],
            free_slots: Vec::new(),
            global: FrameRef(0),
        }
    }

    /// The root frame. It is never destroyed.
    pub fn global(&self) -> FrameRef {
        self.global
    }

    pub(crate) fn frame(&self, r: FrameRef) -> &Frame {
        self.frames[r.index()]
            .as_ref()
            .unwrap_or_else(|| panic!("frame {} used after teardown", r.0))
    }

    pub(crate) fn frame_mut(&mut self, r: FrameRef) -> &mut Frame {
        self.frames[r.index()]
            .as_mut()
            .unwrap_or_else(|| panic!("frame {} used after teardown", r.0))
    }

    /// Creates a fresh frame below `parent`, bumping the parent's
    /// descendant count and registering the new frame.
    pub fn new_frame_below(&mut self, parent: FrameRef) -> FrameRef {
        self.frame_mut(parent).descendants += 1;
        let frame = Frame {
            bindings: HashMap::new(),
            parent: Some(parent),
            descendants: 0,
            in_scope: true,
        };
        let r = match self.free_slots.pop() {
            Some(slot) => {
                self.frames[slot] = Some(frame);
                FrameRef(slot as u32)
            }
            None => {
                self.frames.push(Some(frame));
                FrameRef((self.frames.len() - 1) as u32)
            }
        };
        tracing::debug!("Environment {} created.", r.0);
        r
    }

    /// Unregisters a frame and hands its contents to the caller for
    /// release.
    pub(crate) fn remove(&mut self, r: FrameRef) -> Frame {
        let frame = self.frames[r.index()]
            .take()
            .unwrap_or_else(|| panic!("frame {} torn down twice", r.0));
        self.free_slots.push(r.index());
        frame
    }

    pub fn is_live(&self, r: FrameRef) -> bool {
        self.frames[r.index()].is_some()
    }

    pub fn live_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_some()).count()
    }

    /// Looks up a binding in this frame only.
    pub(crate) fn local_binding(&self, frame: FrameRef, name: &str) -> Option<&Binding> {
        self.frame(frame).bindings.get(name)
    }

    /// Walks up the parent chain until a binding is found; the empty
    /// reference means the name is unbound.
    pub fn value_of(&self, frame: FrameRef, name: &str) -> Value {
        let mut current = Some(frame);
        while let Some(f) = current {
            if let Some(binding) = self.frame(f).bindings.get(name) {
                return binding.val;
            }
            current = self.frame(f).parent;
        }
        None
    }

    /// First frame in the chain, starting at `frame`, that binds `name`.
    pub fn binding_frame(&self, frame: FrameRef, name: &str) -> Option<FrameRef> {
        let mut current = Some(frame);
        while let Some(f) = current {
            if self.frame(f).bindings.contains_key(name) {
                return Some(f);
            }
            current = self.frame(f).parent;
        }
        None
    }
}

impl Default for FrameSet {
    fn default() -> Self {
        Self::new()
    }
}
