//! Tracing diagnostics emitted by the runtime.
//!
//! A capture layer records every event so tests can assert on the level,
//! target and message of what the runtime logs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use recents_core::geometry::{Point, Rect};
use recents_runtime::RecentsConfig;
use recents_runtime::surface::{
    RecordingSink, SurfaceHandle, SurfaceProvider, TargetMode, WindowTarget,
};
use recents_runtime::task::TaskId;
use recents_runtime::transition::WindowTransition;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    message: String,
}

#[derive(Clone, Default)]
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn warnings_from(&self, target: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level == tracing::Level::WARN && event.target == target)
            .collect()
    }
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.0,
        });
    }
}

fn with_captured_events<F>(f: F) -> EventCapture
where
    F: FnOnce(),
{
    let capture = EventCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    capture
}

/// Alive for a fixed number of frames, destroyed afterwards.
struct DyingSurface {
    frames_left: Mutex<u32>,
}

impl SurfaceProvider for DyingSurface {
    fn next_frame_number(&self, _surface: SurfaceHandle) -> Option<u64> {
        let mut left = self.frames_left.lock().unwrap();
        if *left == 0 {
            return None;
        }
        *left -= 1;
        Some(u64::from(*left))
    }
}

fn closing_target() -> WindowTarget {
    WindowTarget {
        task_id: TaskId(3),
        mode: TargetMode::Closing,
        surface: SurfaceHandle(30),
        position: Point::new(0.0, 0.0),
        source_bounds: Rect::from_size(1080.0, 1920.0),
        stack_order: 0,
        is_launcher: false,
    }
}

#[test]
fn destroyed_surface_warns_once() {
    let mut sink = RecordingSink::default();
    let capture = with_captured_events(|| {
        let mut transition = WindowTransition::closing(
            Rect::from_size(1080.0, 1920.0),
            false,
            &RecentsConfig::default(),
            vec![closing_target()],
            SurfaceHandle(1),
        );
        let provider = DyingSurface {
            frames_left: Mutex::new(2),
        };
        for _ in 0..10 {
            transition.tick(Duration::from_millis(16), &provider, &mut sink);
        }
    });

    let warnings = capture.warnings_from("recents_runtime::transition");
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].message.contains("tracking surface destroyed"));
    assert_eq!(sink.applied.len(), 2);
}

#[test]
fn healthy_transition_does_not_warn() {
    let capture = with_captured_events(|| {
        let mut transition = WindowTransition::closing(
            Rect::from_size(1080.0, 1920.0),
            true,
            &RecentsConfig::default(),
            vec![closing_target()],
            SurfaceHandle(1),
        );
        let provider = DyingSurface {
            frames_left: Mutex::new(u32::MAX),
        };
        let mut sink = RecordingSink::default();
        while !transition.is_finished() {
            transition.tick(Duration::from_millis(16), &provider, &mut sink);
        }
    });

    assert!(capture.warnings_from("recents_runtime::transition").is_empty());
    assert!(
        capture
            .events()
            .iter()
            .any(|event| event.level == tracing::Level::DEBUG
                && event.message == "transition finished")
    );
}
