#![forbid(unsafe_code)]

//! Window targets and the batched surface transaction they are driven by.
//!
//! Only the call contract of the platform surface mechanism is modelled:
//! a [`Transaction`] records operations for one frame and a
//! [`TransactionSink`] applies the whole batch atomically.

use recents_core::geometry::{Point, Rect};
use recents_core::transform::WindowTransformFrame;

use crate::task::TaskId;

/// Opaque handle to a platform window surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    Opening,
    Closing,
}

/// One window taking part in a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTarget {
    pub task_id: TaskId,
    pub mode: TargetMode,
    pub surface: SurfaceHandle,
    /// Offset of the surface within its parent.
    pub position: Point,
    /// Window bounds in screen space.
    pub source_bounds: Rect,
    /// Z-order of the window among the targets.
    pub stack_order: i32,
    /// The target is the launcher itself.
    pub is_launcher: bool,
}

impl WindowTarget {
    pub fn is_opening(&self) -> bool {
        self.mode == TargetMode::Opening
    }
}

/// A 2D affine matrix restricted to uniform scale plus translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMatrix {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    SetAlpha(SurfaceHandle, f32),
    SetMatrix(SurfaceHandle, SurfaceMatrix),
    SetWindowCrop(SurfaceHandle, Rect),
    SetLayer(SurfaceHandle, i32),
    Show(SurfaceHandle),
    /// Hold the other operations until `surface` draws frame `frame_number`.
    DeferUntilFrame {
        surface: SurfaceHandle,
        barrier: SurfaceHandle,
        frame_number: u64,
    },
}

/// Operations for one frame, applied together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    ops: Vec<SurfaceOp>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_alpha(&mut self, surface: SurfaceHandle, alpha: f32) -> &mut Self {
        self.ops.push(SurfaceOp::SetAlpha(surface, alpha));
        self
    }

    pub fn set_matrix(&mut self, surface: SurfaceHandle, matrix: SurfaceMatrix) -> &mut Self {
        self.ops.push(SurfaceOp::SetMatrix(surface, matrix));
        self
    }

    pub fn set_window_crop(&mut self, surface: SurfaceHandle, crop: Rect) -> &mut Self {
        self.ops.push(SurfaceOp::SetWindowCrop(surface, crop));
        self
    }

    pub fn set_layer(&mut self, surface: SurfaceHandle, layer: i32) -> &mut Self {
        self.ops.push(SurfaceOp::SetLayer(surface, layer));
        self
    }

    pub fn show(&mut self, surface: SurfaceHandle) -> &mut Self {
        self.ops.push(SurfaceOp::Show(surface));
        self
    }

    pub fn defer_until_frame(
        &mut self,
        surface: SurfaceHandle,
        barrier: SurfaceHandle,
        frame_number: u64,
    ) -> &mut Self {
        self.ops.push(SurfaceOp::DeferUntilFrame {
            surface,
            barrier,
            frame_number,
        });
        self
    }

    /// Record alpha, matrix and crop for `frame`.
    pub fn apply_frame(&mut self, surface: SurfaceHandle, frame: &WindowTransformFrame) -> &mut Self {
        self.set_alpha(surface, frame.alpha);
        self.set_matrix(
            surface,
            SurfaceMatrix {
                scale: frame.scale,
                translate_x: frame.translation.x,
                translate_y: frame.translation.y,
            },
        );
        if let Some(crop) = frame.crop {
            self.set_window_crop(surface, crop);
        }
        self
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Applies a transaction atomically.
pub trait TransactionSink {
    fn apply(&mut self, transaction: Transaction);
}

/// Frame bookkeeping for live surfaces.
pub trait SurfaceProvider {
    /// Next frame number of `surface`, or `None` once it is destroyed.
    fn next_frame_number(&self, surface: SurfaceHandle) -> Option<u64>;
}

/// A sink that keeps every applied transaction. Useful for tests and replay.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub applied: Vec<Transaction>,
}

impl TransactionSink for RecordingSink {
    fn apply(&mut self, transaction: Transaction) {
        self.applied.push(transaction);
    }
}
