use std::cell::{Cell, RefCell};
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use softbuffer::Surface;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, OwnedDisplayHandle};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use loupe_engine::coords::Vec2;
use loupe_engine::pipeline::{DispatchPriority, Scheduler, ViewChange, ViewManager};
use loupe_viewer::{ImageViewer, Layer, LayerId, Minimap, ViewerConfig};

use crate::raster;

/// Pixel-delta wheel events are divided by this to get zoom steps.
const PIXELS_PER_WHEEL_STEP: f32 = 60.0;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub viewer: ViewerConfig,
    pub minimap: Minimap,
}

/// Maps drain requests onto the winit loop.
///
/// `Render` requests a redraw and the pass runs at the top of
/// `RedrawRequested`; `Idle` runs in `about_to_wait`, after the pending input
/// batch has been handled. Either way a pass never runs inside the input
/// handler that requested it.
#[derive(Default)]
pub struct FrameScheduler {
    render: Cell<bool>,
    idle: Cell<bool>,
    window: RefCell<Option<Arc<Window>>>,
}

impl FrameScheduler {
    fn attach(&self, window: Arc<Window>) {
        if self.render.get() {
            window.request_redraw();
        }
        *self.window.borrow_mut() = Some(window);
    }

    fn detach(&self) {
        self.window.borrow_mut().take();
    }

    /// Consumes a pending request at `priority`.
    fn take(&self, priority: DispatchPriority) -> bool {
        match priority {
            DispatchPriority::Render => self.render.replace(false),
            DispatchPriority::Idle => self.idle.replace(false),
        }
    }
}

impl Scheduler for FrameScheduler {
    fn schedule_drain(&self, priority: DispatchPriority) {
        match priority {
            DispatchPriority::Render => {
                self.render.set(true);
                if let Some(window) = self.window.borrow().as_ref() {
                    window.request_redraw();
                }
            }
            DispatchPriority::Idle => self.idle.set(true),
        }
    }
}

struct WindowSurface {
    window: Arc<Window>,
    surface: Surface<OwnedDisplayHandle, Arc<Window>>,
}

/// Runs the viewer until its window closes.
pub fn run(config: StudioConfig, image: RgbaImage) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut studio = Studio::new(config, image)?;

    event_loop
        .run_app(&mut studio)
        .context("winit event loop terminated with error")?;

    Ok(())
}

struct Studio {
    config: StudioConfig,
    image: RgbaImage,
    scheduler: Rc<FrameScheduler>,
    view: ViewManager<ImageViewer>,
    minimap: Minimap,
    window: Option<WindowSurface>,

    cursor: Option<Vec2>,
    dragging: bool,
    painted_generation: u64,
    title_dirty: Rc<Cell<bool>>,
}

impl Studio {
    fn new(config: StudioConfig, image: RgbaImage) -> Result<Self> {
        let scheduler = Rc::new(FrameScheduler::default());
        let mut view = ImageViewer::managed(config.viewer.clone(), scheduler.clone());
        view.surface_mut()
            .push_layer(Layer::image(LayerId(0), image.width(), image.height()))
            .context("failed to add image layer")?;

        let title_dirty = Rc::new(Cell::new(true));
        let flag = title_dirty.clone();
        view.subscribe(move |change| {
            if matches!(change, ViewChange::Scale(_)) {
                flag.set(true);
            }
        });

        Ok(Self {
            minimap: config.minimap.clone(),
            config,
            image,
            scheduler,
            view,
            window: None,
            cursor: None,
            dragging: false,
            painted_generation: 0,
            title_dirty,
        })
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let context = softbuffer::Context::new(event_loop.owned_display_handle())
            .map_err(|e| anyhow!("failed to create softbuffer context: {e}"))?;
        let surface = Surface::new(&context, window.clone())
            .map_err(|e| anyhow!("failed to create softbuffer surface: {e}"))?;

        let size = window.inner_size();
        self.view.surface_mut().resize(size.width as f32, size.height as f32);
        self.scheduler.attach(window.clone());
        self.window = Some(WindowSurface { window, surface });
        Ok(())
    }

    fn drain(&mut self) {
        // The host loop is the catch boundary for stage failures.
        if let Err(e) = self.view.drain() {
            log::error!("view pipeline failed: {e:#}");
        }
    }

    fn request_redraw(&self) {
        if let Some(ws) = &self.window {
            ws.window.request_redraw();
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.view.shutdown();
        self.scheduler.detach();
        self.window = None;
        event_loop.exit();
    }

    fn minimap_hit(&self, p: Vec2) -> Option<Vec2> {
        let layout = self.minimap.layout(self.view.surface().size(), self.view.state())?;
        layout.contains(p).then(|| layout.to_content(p))
    }

    fn on_pointer_moved(&mut self, p: Vec2) {
        if self.dragging {
            if let Some(prev) = self.cursor {
                self.view.surface_mut().pan_by(p - prev);
            }
        }
        self.cursor = Some(p);
    }

    fn on_left_button(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                let target = self.cursor.and_then(|p| self.minimap_hit(p));
                match target {
                    Some(content) => self.view.surface_mut().navigate_to(content),
                    None => self.dragging = true,
                }
            }
            ElementState::Released => self.dragging = false,
        }
    }

    fn on_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_WHEEL_STEP,
        };
        if steps == 0.0 {
            return;
        }

        let viewer = self.view.surface_mut();
        let anchor = self.cursor.unwrap_or(viewer.size() * 0.5);
        let factor = viewer.config().zoom_step.powf(steps);
        if let Err(e) = viewer.zoom_at(factor, anchor) {
            log::warn!("zoom ignored: {e}");
        }
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        let result = match key {
            KeyCode::Digit0 | KeyCode::Numpad0 => {
                self.view.surface_mut().reset_view();
                Ok(())
            }
            KeyCode::Equal | KeyCode::NumpadAdd => self.view.surface_mut().zoom_steps(1.0),
            KeyCode::Minus | KeyCode::NumpadSubtract => self.view.surface_mut().zoom_steps(-1.0),
            KeyCode::KeyM => {
                self.minimap.toggle();
                self.request_redraw();
                Ok(())
            }
            KeyCode::Escape => {
                self.shutdown(event_loop);
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            log::warn!("key {key:?} ignored: {e}");
        }
    }

    fn redraw(&mut self) {
        if self.scheduler.take(DispatchPriority::Render) {
            self.drain();
        }
        if let Err(e) = self.paint() {
            log::error!("paint failed: {e:#}");
        }
    }

    fn paint(&mut self) -> Result<()> {
        let Some(ws) = self.window.as_mut() else {
            return Ok(());
        };

        let size = ws.window.inner_size();
        let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
            return Ok(());
        };

        ws.surface
            .resize(w, h)
            .map_err(|e| anyhow!("failed to resize softbuffer surface: {e}"))?;
        let mut buffer = ws
            .surface
            .buffer_mut()
            .map_err(|e| anyhow!("failed to map softbuffer buffer: {e}"))?;

        let state = self.view.state();
        let layout = self
            .minimap
            .layout(Vec2::new(size.width as f32, size.height as f32), state);

        raster::paint(
            &mut buffer,
            size.width,
            size.height,
            &self.image,
            state.viewport,
            layout.as_ref(),
        );

        ws.window.pre_present_notify();
        buffer
            .present()
            .map_err(|e| anyhow!("failed to present frame: {e}"))?;

        self.painted_generation = self.view.surface().render_generation();

        if self.title_dirty.replace(false) {
            ws.window
                .set_title(&format!("{} - {:.0}%", self.config.title, state.scale * 100.0));
        }
        Ok(())
    }
}

impl ApplicationHandler for Studio {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            log::error!("failed to create viewer window: {e:#}");
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.scheduler.take(DispatchPriority::Idle) {
            self.drain();
        }

        if self.view.surface().render_generation() != self.painted_generation {
            self.request_redraw();
        }

        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(size) => {
                self.view.surface_mut().resize(size.width as f32, size.height as f32);
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.on_pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.dragging = false;
            }

            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.on_left_button(state);
            }

            WindowEvent::MouseWheel { delta, .. } => self.on_wheel(delta),

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        self.on_key(event_loop, key);
                    }
                }
            }

            WindowEvent::RedrawRequested => self.redraw(),

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loupe_engine::pipeline::{CoalescingQueue, QueueConfig, Stage};

    // ── priorities ────────────────────────────────────────────────────────

    #[test]
    fn render_request_is_taken_once() {
        let s = FrameScheduler::default();
        s.schedule_drain(DispatchPriority::Render);
        assert!(!s.take(DispatchPriority::Idle));
        assert!(s.take(DispatchPriority::Render));
        assert!(!s.take(DispatchPriority::Render));
    }

    #[test]
    fn idle_request_is_taken_once() {
        let s = FrameScheduler::default();
        s.schedule_drain(DispatchPriority::Idle);
        assert!(!s.take(DispatchPriority::Render));
        assert!(s.take(DispatchPriority::Idle));
        assert!(!s.take(DispatchPriority::Idle));
    }

    #[test]
    fn priorities_are_tracked_separately() {
        let s = FrameScheduler::default();
        s.schedule_drain(DispatchPriority::Render);
        s.schedule_drain(DispatchPriority::Idle);
        assert!(s.take(DispatchPriority::Idle));
        assert!(s.take(DispatchPriority::Render));
    }

    #[test]
    fn nothing_scheduled_takes_nothing() {
        let s = FrameScheduler::default();
        assert!(!s.take(DispatchPriority::Render));
        assert!(!s.take(DispatchPriority::Idle));
    }

    // ── with a queue ──────────────────────────────────────────────────────

    #[test]
    fn burst_of_enqueues_yields_one_pass_per_frame() {
        let s = Rc::new(FrameScheduler::default());
        let q = CoalescingQueue::new(QueueConfig::default(), s.clone());

        q.enqueue(Stage::ContextLocation);
        q.enqueue(Stage::ComputeScale);
        q.enqueue(Stage::RenderCanvas);

        assert!(s.take(DispatchPriority::Render));
        let report = q.drain(|_| Ok(())).unwrap();
        assert_eq!(report.executed.len(), 3);
        assert!(!s.take(DispatchPriority::Render));

        // A later request schedules the next frame.
        q.enqueue(Stage::RenderCanvas);
        assert!(s.take(DispatchPriority::Render));
    }

    #[test]
    fn idle_queue_schedules_at_idle_priority() {
        let s = Rc::new(FrameScheduler::default());
        let q = CoalescingQueue::new(QueueConfig::default().priority(DispatchPriority::Idle), s.clone());
        q.enqueue(Stage::ContextSize);
        assert!(!s.take(DispatchPriority::Render));
        assert!(s.take(DispatchPriority::Idle));
    }
}
