use crate::config::WindowConfig;
use crate::error::WindowError;
use crate::native::{NativeEvent, NativeWindow};
use crate::ticker::Ticker;
use crate::translate::InputTranslator;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use prism_common::ThreadAffinity;
use prism_ecs::Camera;
use prism_events::{EventManager, ListenerId, RenderEvent, bind_input};
use prism_input::InputManager;
use prism_render::Renderer;
use prism_scene::Scene;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique window number, also used in the window thread's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    fn next() -> Self {
        Self(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct PendingAttributes {
    title: Option<String>,
    size: Option<(u32, u32)>,
}

/// State published by the window thread and read from anywhere.
#[derive(Debug, Default)]
struct Shared {
    width: AtomicU32,
    height: AtomicU32,
    maximized: AtomicBool,
    close_requested: AtomicBool,
    running: AtomicBool,
    frames: AtomicU64,
    pending: Mutex<PendingAttributes>,
}

enum Startup {
    Ready {
        renderer: Arc<Mutex<Renderer>>,
        affinity: ThreadAffinity,
    },
    Failed(String),
}

/// Cloneable view of a running window.
///
/// Getters and [`WindowHandle::close`] work from any thread. Attribute
/// setters touch the native window and must be called on the window thread,
/// typically from an event listener; they take effect after the current
/// frame.
#[derive(Clone)]
pub struct WindowHandle {
    id: WindowId,
    affinity: ThreadAffinity,
    shared: Arc<Shared>,
    renderer: Arc<Mutex<Renderer>>,
    scene: Arc<Mutex<Scene>>,
    events: Arc<EventManager>,
    input: Arc<InputManager>,
}

impl WindowHandle {
    /// Process-unique id of this window.
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// The window thread.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    /// Client width in pixels, as last reported by the native window.
    pub fn width(&self) -> u32 {
        self.shared.width.load(Ordering::Acquire)
    }

    /// Client height in pixels, as last reported by the native window.
    pub fn height(&self) -> u32 {
        self.shared.height.load(Ordering::Acquire)
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Whether the native window last reported itself maximized.
    pub fn is_maximized(&self) -> bool {
        self.shared.maximized.load(Ordering::Acquire)
    }

    /// False once the render loop has exited.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.shared.frames.load(Ordering::Acquire)
    }

    /// The renderer drawing this window.
    ///
    /// When holding both locks, take the renderer before the scene. The
    /// window thread locks them in that order every frame.
    pub fn renderer(&self) -> &Arc<Mutex<Renderer>> {
        &self.renderer
    }

    /// The scene this window draws and ticks. Lock it after the renderer
    /// when both are needed.
    pub fn scene(&self) -> &Arc<Mutex<Scene>> {
        &self.scene
    }

    /// The bus native input, tick and render events are emitted on.
    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    /// Key and mouse state fed from this window's input events.
    pub fn input(&self) -> &Arc<InputManager> {
        &self.input
    }

    /// Queue a new title. Window thread only.
    pub fn set_title(&self, title: impl Into<String>) -> Result<(), WindowError> {
        self.affinity.check("Window::set_title")?;
        self.shared.pending.lock().title = Some(title.into());
        Ok(())
    }

    /// Queue a new client size. Window thread only.
    pub fn set_size(&self, width: u32, height: u32) -> Result<(), WindowError> {
        self.affinity.check("Window::set_size")?;
        self.shared.pending.lock().size = Some((width, height));
        Ok(())
    }

    /// Ask the loop to stop after the frame in flight.
    pub fn close(&self) {
        self.shared.close_requested.store(true, Ordering::Release);
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowHandle")
            .field("id", &self.id)
            .field("size", &self.size())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// A native window driven by its own thread.
///
/// [`Window::new`] spawns the window thread and blocks until the native
/// window exists, so size getters are valid as soon as it returns. The thread
/// then loops: render, emit a [`RenderEvent`], run render hooks, swap, poll
/// and translate native events. A second thread ticks the scene at the
/// configured fixed rate.
///
/// Dropping the window requests close and waits for the thread.
pub struct Window {
    handle: WindowHandle,
    thread: Option<JoinHandle<Result<(), WindowError>>>,
}

impl Window {
    pub fn new<N, F>(
        config: WindowConfig,
        scene: Arc<Mutex<Scene>>,
        events: Arc<EventManager>,
        factory: F,
    ) -> Result<Self, WindowError>
    where
        N: NativeWindow + 'static,
        F: FnOnce(&WindowConfig) -> Result<N, WindowError> + Send + 'static,
    {
        config.validate()?;
        let id = WindowId::next();
        let shared = Arc::new(Shared::default());
        let input = Arc::new(InputManager::new());
        let timeout = config.startup_timeout();
        let (ready_tx, ready_rx) = bounded(1);

        let context = LoopContext {
            id,
            config,
            shared: Arc::clone(&shared),
            scene: Arc::clone(&scene),
            events: Arc::clone(&events),
            input: Arc::clone(&input),
        };
        let thread = thread::Builder::new()
            .name(format!("prism-window-{id}"))
            .spawn(move || window_thread(context, factory, ready_tx))?;

        match ready_rx.recv_timeout(timeout) {
            Ok(Startup::Ready { renderer, affinity }) => {
                tracing::info!(
                    window = %id,
                    width = shared.width.load(Ordering::Acquire),
                    height = shared.height.load(Ordering::Acquire),
                    "window ready"
                );
                Ok(Self {
                    handle: WindowHandle {
                        id,
                        affinity,
                        shared,
                        renderer,
                        scene,
                        events,
                        input,
                    },
                    thread: Some(thread),
                })
            }
            Ok(Startup::Failed(reason)) => {
                // The thread returns right after reporting.
                let _ = thread.join();
                Err(WindowError::StartupFailed(reason))
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::error!(window = %id, ?timeout, "window thread did not start in time");
                shared.close_requested.store(true, Ordering::Release);
                Err(WindowError::StartupTimeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = thread.join();
                Err(WindowError::StartupFailed("window thread exited during startup".into()))
            }
        }
    }

    /// A cloneable handle for listeners and other threads.
    pub fn handle(&self) -> &WindowHandle {
        &self.handle
    }

    pub fn id(&self) -> WindowId {
        self.handle.id
    }

    pub fn width(&self) -> u32 {
        self.handle.width()
    }

    pub fn height(&self) -> u32 {
        self.handle.height()
    }

    pub fn is_maximized(&self) -> bool {
        self.handle.is_maximized()
    }

    /// See [`WindowHandle::renderer`] for lock ordering.
    pub fn renderer(&self) -> &Arc<Mutex<Renderer>> {
        self.handle.renderer()
    }

    pub fn input(&self) -> &Arc<InputManager> {
        self.handle.input()
    }

    /// Ask the loop to stop after the frame in flight.
    pub fn close(&self) {
        self.handle.close();
    }

    /// Wait for the window thread to finish and return how its loop ended.
    pub fn join(mut self) -> Result<(), WindowError> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| WindowError::Panicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.handle.close();
        if self.handle.affinity.is_current() {
            return;
        }
        match thread.join() {
            Ok(Err(e)) => {
                tracing::error!(window = %self.handle.id, error = %e, "window loop failed")
            }
            Err(_) => tracing::error!(window = %self.handle.id, "window thread panicked"),
            Ok(Ok(())) => {}
        }
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("handle", &self.handle)
            .finish()
    }
}

/// Everything the window thread needs from its creator.
struct LoopContext {
    id: WindowId,
    config: WindowConfig,
    shared: Arc<Shared>,
    scene: Arc<Mutex<Scene>>,
    events: Arc<EventManager>,
    input: Arc<InputManager>,
}

fn window_thread<N, F>(
    context: LoopContext,
    factory: F,
    ready: Sender<Startup>,
) -> Result<(), WindowError>
where
    N: NativeWindow,
    F: FnOnce(&WindowConfig) -> Result<N, WindowError>,
{
    let affinity = ThreadAffinity::current();
    let mut native = match factory(&context.config) {
        Ok(native) => native,
        Err(e) => {
            tracing::error!(window = %context.id, error = %e, "native window creation failed");
            let _ = ready.send(Startup::Failed(e.to_string()));
            return Err(e);
        }
    };

    let (width, height) = native.size();
    context.shared.width.store(width, Ordering::Release);
    context.shared.height.store(height, Ordering::Release);

    let renderer = Arc::new(Mutex::new(Renderer::with_affinity(affinity)));
    if let Err(e) = renderer.lock().init(native.graphics()) {
        let e = WindowError::from(e);
        let _ = ready.send(Startup::Failed(e.to_string()));
        return Err(e);
    }

    context.shared.running.store(true, Ordering::Release);
    if ready
        .send(Startup::Ready {
            renderer: Arc::clone(&renderer),
            affinity,
        })
        .is_err()
    {
        tracing::warn!(window = %context.id, "creator stopped waiting, shutting down");
        context.shared.close_requested.store(true, Ordering::Release);
    }

    let mut window_loop = RenderLoop {
        input_listeners: bind_input(&context.events, Arc::clone(&context.input)),
        context,
        native,
        renderer,
        translator: InputTranslator::default(),
        last_frame: Instant::now(),
    };
    window_loop.run()
}

struct RenderLoop<N: NativeWindow> {
    context: LoopContext,
    native: N,
    renderer: Arc<Mutex<Renderer>>,
    translator: InputTranslator,
    input_listeners: [ListenerId; 4],
    last_frame: Instant,
}

impl<N: NativeWindow> RenderLoop<N> {
    fn run(&mut self) -> Result<(), WindowError> {
        let ctx = &self.context;
        let mut ticker = Ticker::spawn(
            format!("prism-tick-{}", ctx.id),
            ctx.config.tick_interval(),
            Arc::clone(&ctx.scene),
            Arc::clone(&ctx.events),
        )?;

        let result = loop {
            let requested = self.context.shared.close_requested.load(Ordering::Acquire);
            if self.native.should_close() || requested {
                break Ok(());
            }
            if let Err(e) = self.frame() {
                tracing::error!(
                    window = %self.context.id,
                    error = %e,
                    "frame failed, stopping window loop"
                );
                break Err(e);
            }
        };

        ticker.stop();
        self.shutdown();
        result
    }

    fn frame(&mut self) -> Result<(), WindowError> {
        {
            let mut renderer = self.renderer.lock();
            let scene = self.context.scene.lock();
            renderer.render(self.native.graphics(), &scene)?;
        }

        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        self.context.events.emit(RenderEvent::new(delta));
        self.context.scene.lock().render_components(delta);
        self.context.input.reset_deltas();

        self.native.swap_buffers()?;
        self.context.shared.frames.fetch_add(1, Ordering::AcqRel);
        self.apply_pending();

        let Self {
            context,
            native,
            renderer,
            translator,
            ..
        } = self;
        native.poll_events(&mut |event| dispatch_native(context, renderer, translator, event));
        Ok(())
    }

    fn apply_pending(&mut self) {
        let pending = std::mem::take(&mut *self.context.shared.pending.lock());
        if let Some(title) = pending.title {
            self.native.set_title(&title);
        }
        if let Some((width, height)) = pending.size {
            self.native.set_size(width, height);
        }
    }

    fn shutdown(&mut self) {
        let ctx = &self.context;
        for id in self.input_listeners {
            ctx.events.remove_listener(id);
        }
        if let Err(e) = self.renderer.lock().dispose(self.native.graphics()) {
            tracing::warn!(window = %ctx.id, error = %e, "renderer dispose failed");
        }
        ctx.shared.running.store(false, Ordering::Release);
        tracing::info!(
            window = %ctx.id,
            frames = ctx.shared.frames.load(Ordering::Acquire),
            "window loop finished"
        );
    }
}

fn dispatch_native(
    ctx: &LoopContext,
    renderer: &Arc<Mutex<Renderer>>,
    translator: &mut InputTranslator,
    event: NativeEvent,
) {
    match event {
        NativeEvent::Resized { width, height } => {
            ctx.shared.width.store(width, Ordering::Release);
            ctx.shared.height.store(height, Ordering::Release);
            if width > 0 && height > 0 {
                resize_camera(ctx, renderer, width, height);
            }
        }
        NativeEvent::Maximized(maximized) => {
            ctx.shared.maximized.store(maximized, Ordering::Release);
        }
        NativeEvent::CloseRequested => {
            ctx.shared.close_requested.store(true, Ordering::Release);
        }
        input => {
            if let Some(event) = translator.translate(input) {
                ctx.events.emit(event);
            }
        }
    }
}

fn resize_camera(ctx: &LoopContext, renderer: &Arc<Mutex<Renderer>>, width: u32, height: u32) {
    let Some(camera_id) = renderer.lock().camera() else {
        return;
    };
    let mut scene = ctx.scene.lock();
    let camera = scene.get_mut(camera_id).and_then(|o| o.get_mut::<Camera>());
    if let Some(camera) = camera {
        camera.resize(width, height);
        tracing::debug!(width, height, "camera resized");
    }
}
