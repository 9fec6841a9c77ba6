//! A scripted [`NativeWindow`] for running the window loop without an OS
//! window.
//!
//! Native events are queued per frame and replayed on the matching poll; the
//! graphics context is a [`RecordingBackend`]. Because the native window
//! lives and dies on the window thread, observations are published through a
//! shared [`HeadlessMonitor`].

use crate::native::{NativeEvent, NativeWindow};
use parking_lot::Mutex;
use prism_render::BackendError;
use prism_render::headless::RecordingBackend;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct MonitorState {
    pub frames: u64,
    pub draws: usize,
    pub title: Option<String>,
    pub live_buffers_at_drop: Option<usize>,
    pub live_textures_at_drop: Option<usize>,
    pub dropped: bool,
}

/// Read side of a [`HeadlessWindow`]; cheap to clone.
#[derive(Debug, Default, Clone)]
pub struct HeadlessMonitor(Arc<Mutex<MonitorState>>);

impl HeadlessMonitor {
    pub fn snapshot(&self) -> MonitorState {
        self.0.lock().clone()
    }

    pub fn frames(&self) -> u64 {
        self.0.lock().frames
    }
}

#[derive(Debug)]
pub struct HeadlessWindow {
    size: (u32, u32),
    graphics: RecordingBackend,
    script: BTreeMap<u64, Vec<NativeEvent>>,
    queued: Vec<NativeEvent>,
    frame: u64,
    close_after: Option<u64>,
    close_requested: bool,
    frame_delay: Duration,
    monitor: HeadlessMonitor,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_graphics(width, height, RecordingBackend::new())
    }

    pub fn with_graphics(width: u32, height: u32, graphics: RecordingBackend) -> Self {
        Self {
            size: (width, height),
            graphics,
            script: BTreeMap::new(),
            queued: Vec::new(),
            frame: 0,
            close_after: None,
            close_requested: false,
            frame_delay: Duration::from_millis(1),
            monitor: HeadlessMonitor::default(),
        }
    }

    /// Deliver `events` on the poll that follows frame `frame` (0-based).
    pub fn on_frame(mut self, frame: u64, events: impl IntoIterator<Item = NativeEvent>) -> Self {
        self.script.entry(frame).or_default().extend(events);
        self
    }

    /// Raise the should-close flag once `frames` frames have been presented.
    pub fn close_after(mut self, frames: u64) -> Self {
        self.close_after = Some(frames);
        self
    }

    /// Sleep per swap, standing in for vsync.
    pub fn frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    pub fn monitor(&self) -> HeadlessMonitor {
        self.monitor.clone()
    }
}

impl NativeWindow for HeadlessWindow {
    type Graphics = RecordingBackend;

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn graphics(&mut self) -> &mut RecordingBackend {
        &mut self.graphics
    }

    fn should_close(&self) -> bool {
        self.close_requested || self.close_after.is_some_and(|n| self.frame >= n)
    }

    fn swap_buffers(&mut self) -> Result<(), BackendError> {
        let calls = self.graphics.take_calls();
        let draws = calls.iter().filter(|c| c.is_draw()).count();
        {
            let mut monitor = self.monitor.0.lock();
            monitor.frames += 1;
            monitor.draws += draws;
        }
        if !self.frame_delay.is_zero() {
            std::thread::sleep(self.frame_delay);
        }
        Ok(())
    }

    fn poll_events(&mut self, sink: &mut dyn FnMut(NativeEvent)) {
        let mut events = std::mem::take(&mut self.queued);
        if let Some(scripted) = self.script.remove(&self.frame) {
            events.extend(scripted);
        }
        self.frame += 1;
        for event in events {
            match event {
                NativeEvent::Resized { width, height } => self.size = (width, height),
                NativeEvent::CloseRequested => self.close_requested = true,
                _ => {}
            }
            sink(event);
        }
    }

    fn set_title(&mut self, title: &str) {
        self.monitor.0.lock().title = Some(title.to_owned());
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.queued.push(NativeEvent::Resized { width, height });
    }
}

impl Drop for HeadlessWindow {
    fn drop(&mut self) {
        let mut monitor = self.monitor.0.lock();
        monitor.live_buffers_at_drop = Some(self.graphics.live_buffers());
        monitor.live_textures_at_drop = Some(self.graphics.live_textures());
        monitor.dropped = true;
    }
}
