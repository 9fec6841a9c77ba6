use crate::backend::WgpuBackend;
use crate::keymap;
use prism_input::Modifiers;
use prism_render::BackendError;
use prism_window::{NativeEvent, NativeWindow, WindowConfig, WindowError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

/// Scroll offsets are reported in lines; trackpads deliver pixels.
const PIXELS_PER_LINE: f64 = 20.0;
const PUMP_SLICE: Duration = Duration::from_millis(10);

/// Collects winit callbacks into [`NativeEvent`]s between pumps.
struct Collector {
    attributes: WindowAttributes,
    window: Option<Arc<Window>>,
    create_error: Option<String>,
    modifiers: Modifiers,
    maximized: bool,
    events: Vec<NativeEvent>,
}

impl Collector {
    fn new(attributes: WindowAttributes) -> Self {
        Self {
            attributes,
            window: None,
            create_error: None,
            modifiers: Modifiers::NONE,
            maximized: false,
            events: Vec::new(),
        }
    }
}

impl ApplicationHandler for Collector {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => {
                self.maximized = window.is_maximized();
                self.window = Some(Arc::new(window));
            }
            Err(e) => self.create_error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.events.push(NativeEvent::CloseRequested),
            WindowEvent::Resized(size) => {
                self.events.push(NativeEvent::Resized {
                    width: size.width,
                    height: size.height,
                });
                // winit has no maximize event; a resize is when it can change.
                if let Some(window) = &self.window {
                    let maximized = window.is_maximized();
                    if maximized != self.maximized {
                        self.maximized = maximized;
                        self.events.push(NativeEvent::Maximized(maximized));
                    }
                }
            }
            WindowEvent::ModifiersChanged(mods) => self.modifiers = keymap::modifiers(mods.state()),
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let Some(key) = keymap::key(code) else {
                    tracing::trace!(?code, "unmapped key");
                    return;
                };
                self.events.push(NativeEvent::Key {
                    key,
                    action: keymap::key_action(event.state, event.repeat),
                    modifiers: self.modifiers,
                });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = keymap::mouse_button(button) {
                    self.events.push(NativeEvent::MouseButton {
                        button,
                        action: keymap::button_action(state),
                        modifiers: self.modifiers,
                    });
                }
            }
            WindowEvent::CursorMoved { position, .. } => self.events.push(NativeEvent::CursorMoved {
                x: position.x,
                y: position.y,
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let (x, y) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (f64::from(x), f64::from(y)),
                    MouseScrollDelta::PixelDelta(p) => {
                        (p.x / PIXELS_PER_LINE, p.y / PIXELS_PER_LINE)
                    }
                };
                self.events.push(NativeEvent::Scroll { x, y });
            }
            _ => {}
        }
    }
}

/// A winit window presenting through a wgpu surface.
///
/// The event loop is pumped from whichever thread opened the window, so it
/// is built with `any_thread` where the platform allows it. winit permits one
/// event loop per process; a second `open` fails with
/// [`WindowError::StartupFailed`].
pub struct WinitWindow {
    // Field order is drop order: GPU objects, then the surface, then the OS window.
    backend: WgpuBackend,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
    collector: Collector,
    event_loop: EventLoop<()>,
    exited: bool,
}

impl WinitWindow {
    /// Create the OS window and its GPU context. Matches the factory shape
    /// [`prism_window::Window::new`] expects.
    pub fn open(config: &WindowConfig) -> Result<Self, WindowError> {
        let mut event_loop = build_event_loop().map_err(|e| startup_failed("event loop", e))?;
        let attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);
        let mut collector = Collector::new(attributes);

        let deadline = Instant::now() + config.startup_timeout();
        let window = loop {
            let status = event_loop.pump_app_events(Some(PUMP_SLICE), &mut collector);
            if let PumpStatus::Exit(code) = status {
                return Err(WindowError::StartupFailed(format!(
                    "event loop exited with code {code} before the window opened"
                )));
            }
            if let Some(error) = collector.create_error.take() {
                return Err(WindowError::StartupFailed(error));
            }
            if let Some(window) = &collector.window {
                break Arc::clone(window);
            }
            if Instant::now() >= deadline {
                return Err(WindowError::StartupTimeout(config.startup_timeout()));
            }
        };

        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|e| startup_failed("surface", e))?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| WindowError::StartupFailed("no compatible GPU adapter".into()))?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("prism device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| startup_failed("device", e))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| WindowError::StartupFailed("surface reports no formats".into()))?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: if config.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        tracing::info!(
            adapter = %adapter.get_info().name,
            ?format,
            width,
            height,
            "native window ready"
        );

        Ok(Self {
            backend: WgpuBackend::new(device, queue, format, width, height),
            surface,
            surface_config,
            window,
            collector,
            event_loop,
            exited: false,
        })
    }

    fn reconfigure(&mut self, width: u32, height: u32) {
        // Minimized windows report zero; keep the last usable surface.
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(self.backend.device(), &self.surface_config);
        self.backend.resize(width, height);
    }
}

impl NativeWindow for WinitWindow {
    type Graphics = WgpuBackend;

    fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    fn graphics(&mut self) -> &mut WgpuBackend {
        &mut self.backend
    }

    fn should_close(&self) -> bool {
        self.exited
    }

    fn swap_buffers(&mut self) -> Result<(), BackendError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(self.backend.device(), &self.surface_config);
                self.backend.discard_frame();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timed out, frame dropped");
                self.backend.discard_frame();
                return Ok(());
            }
            Err(e) => return Err(BackendError::Device(e.to_string())),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.backend.present(&view);
        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }

    fn poll_events(&mut self, sink: &mut dyn FnMut(NativeEvent)) {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.collector);
        if let PumpStatus::Exit(code) = status {
            tracing::debug!(code, "event loop exited");
            self.exited = true;
        }
        for event in std::mem::take(&mut self.collector.events) {
            if let NativeEvent::Resized { width, height } = event {
                self.reconfigure(width, height);
            }
            sink(event);
        }
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    fn set_size(&mut self, width: u32, height: u32) {
        // Some platforms apply the size at once and send no Resized.
        if let Some(size) = self.window.request_inner_size(PhysicalSize::new(width, height)) {
            self.collector.events.push(NativeEvent::Resized {
                width: size.width,
                height: size.height,
            });
        }
    }
}

fn startup_failed(what: &str, error: impl std::fmt::Display) -> WindowError {
    WindowError::StartupFailed(format!("{what}: {error}"))
}

fn build_event_loop() -> Result<EventLoop<()>, winit::error::EventLoopError> {
    #[allow(unused_mut)]
    let mut builder = EventLoop::builder();
    #[cfg(target_os = "linux")]
    {
        // Also covers Wayland; both backends share the flag.
        use winit::platform::x11::EventLoopBuilderExtX11;
        builder.with_any_thread(true);
    }
    #[cfg(target_os = "windows")]
    {
        use winit::platform::windows::EventLoopBuilderExtWindows;
        builder.with_any_thread(true);
    }
    builder.build()
}
