use anyhow::Result;

use crate::coords::Rect;

use super::queue::{CoalescingQueue, DrainReport};
use super::stage::Stage;

/// Content bounds plus the scale at which they fit the surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundsBox {
    pub rect: Rect,
    pub fit_scale: f32,
}

/// View values owned by the manager and published to observers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewState {
    /// Content-space bounds of everything on the surface.
    pub view_box: Rect,
    /// Scale at which `view_box` fits the surface.
    pub fit_scale: f32,
    /// Effective content-to-screen scale.
    pub scale: f32,
    /// Visible content-space rectangle.
    pub viewport: Rect,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            view_box: Rect::default(),
            fit_scale: 1.0,
            scale: 1.0,
            viewport: Rect::default(),
        }
    }
}

/// Change notification, fired only when a value actually changes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ViewChange {
    ViewBox(Rect),
    FitScale(f32),
    Scale(f32),
    Viewport(Rect),
}

/// Work the owning surface performs for each stage.
///
/// Every method runs inside a drain pass on the owner thread. Implementations
/// may enqueue further stages through their own queue handle.
pub trait ViewSurface {
    /// Commits whatever size the host last reported.
    fn refresh_size(&mut self) -> Result<()>;

    fn compute_bounds_box(&mut self, state: &ViewState) -> Result<BoundsBox>;

    /// Re-validates the view location against `state.view_box`.
    fn refresh_offset(&mut self, state: &ViewState) -> Result<()>;

    fn compute_scale(&mut self, state: &ViewState) -> Result<f32>;

    fn compute_viewport(&mut self, state: &ViewState) -> Result<Rect>;

    /// Marks every render surface as needing a repaint.
    fn invalidate_render_surfaces(&mut self) -> Result<()>;
}

type Observer = Box<dyn FnMut(&ViewChange)>;

/// Binds a stage queue to one surface and runs the stage dependency table.
///
/// Every stage enqueues its [`Stage::successor`] once its work is done, even
/// when nothing it computed changed. The queue drops a stage whenever an
/// earlier-or-equal one sits right behind it, so a stage may only be dropped
/// if the chain from that earlier stage is guaranteed to reach it again.
/// Change detection gates observer notifications, not the chain.
pub struct ViewManager<T> {
    queue: CoalescingQueue<Stage>,
    surface: T,
    state: ViewState,
    observers: Vec<Observer>,
}

impl<T: ViewSurface> ViewManager<T> {
    /// `queue` should be the same queue the surface enqueues into.
    pub fn new(queue: CoalescingQueue<Stage>, surface: T) -> Self {
        Self {
            queue,
            surface,
            state: ViewState::default(),
            observers: Vec::new(),
        }
    }

    pub fn queue(&self) -> &CoalescingQueue<Stage> {
        &self.queue
    }

    pub fn surface(&self) -> &T {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut T {
        &mut self.surface
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&ViewChange) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn invalidate(&self, stage: Stage) {
        self.queue.enqueue(stage);
    }

    /// Requests a recompute of the whole pipeline.
    pub fn invalidate_all(&self) {
        self.queue.enqueue(Stage::ContextSize);
    }

    /// Scheduler callback: runs one drain pass against the surface.
    pub fn drain(&mut self) -> Result<DrainReport<Stage>> {
        let queue = self.queue.clone();
        queue.drain(|stage| self.run_stage(stage))
    }

    /// Host teardown: discards pending work and drops observers.
    pub fn shutdown(&mut self) {
        self.queue.shutdown();
        self.observers.clear();
    }

    fn run_stage(&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::ContextSize => self.surface.refresh_size()?,
            Stage::ComputeViewBox => {
                let bounds = self.surface.compute_bounds_box(&self.state)?;
                if self.state.view_box != bounds.rect {
                    self.state.view_box = bounds.rect;
                    self.notify(ViewChange::ViewBox(bounds.rect));
                }
                if self.state.fit_scale != bounds.fit_scale {
                    self.state.fit_scale = bounds.fit_scale;
                    self.notify(ViewChange::FitScale(bounds.fit_scale));
                }
            }
            Stage::ContextLocation => self.surface.refresh_offset(&self.state)?,
            Stage::ComputeScale => {
                let scale = self.surface.compute_scale(&self.state)?;
                anyhow::ensure!(
                    scale.is_finite() && scale > 0.0,
                    "surface produced invalid scale {scale}"
                );
                if self.state.scale != scale {
                    self.state.scale = scale;
                    self.notify(ViewChange::Scale(scale));
                }
            }
            Stage::ComputeViewport => {
                let viewport = self.surface.compute_viewport(&self.state)?;
                if self.state.viewport != viewport {
                    self.state.viewport = viewport;
                    self.notify(ViewChange::Viewport(viewport));
                }
            }
            Stage::RenderCanvas => self.surface.invalidate_render_surfaces()?,
        }

        if let Some(next) = stage.successor() {
            self.queue.enqueue(next);
        }
        Ok(())
    }

    fn notify(&mut self, change: ViewChange) {
        log::trace!("view change: {change:?}");
        for observer in &mut self.observers {
            observer(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::coords::Vec2;
    use crate::pipeline::queue::{QueueConfig, QueueState};
    use crate::pipeline::scheduler::ManualScheduler;
    use crate::pipeline::stage::Stage::*;

    /// Surface with scripted outputs that counts the work it is asked to do.
    #[derive(Default)]
    struct ScriptedSurface {
        bounds: Option<BoundsBox>,
        scale: f32,
        viewport: Rect,
        fail_scale: bool,
        sizes: usize,
        offsets: usize,
        renders: usize,
    }

    impl ViewSurface for ScriptedSurface {
        fn refresh_size(&mut self) -> Result<()> {
            self.sizes += 1;
            Ok(())
        }

        fn compute_bounds_box(&mut self, _state: &ViewState) -> Result<BoundsBox> {
            Ok(self.bounds.unwrap_or(BoundsBox { rect: Rect::default(), fit_scale: 1.0 }))
        }

        fn refresh_offset(&mut self, _state: &ViewState) -> Result<()> {
            self.offsets += 1;
            Ok(())
        }

        fn compute_scale(&mut self, state: &ViewState) -> Result<f32> {
            if self.fail_scale {
                anyhow::bail!("scale source unavailable");
            }
            Ok(state.fit_scale * self.scale)
        }

        fn compute_viewport(&mut self, _state: &ViewState) -> Result<Rect> {
            Ok(self.viewport)
        }

        fn invalidate_render_surfaces(&mut self) -> Result<()> {
            self.renders += 1;
            Ok(())
        }
    }

    fn manager(surface: ScriptedSurface) -> (ViewManager<ScriptedSurface>, Rc<ManualScheduler>) {
        let scheduler = Rc::new(ManualScheduler::new());
        let queue = CoalescingQueue::new(QueueConfig::default().label("test"), scheduler.clone());
        (ViewManager::new(queue, surface), scheduler)
    }

    fn fitted_surface() -> ScriptedSurface {
        ScriptedSurface {
            bounds: Some(BoundsBox { rect: Rect::new(0.0, 0.0, 400.0, 200.0), fit_scale: 2.0 }),
            scale: 1.0,
            viewport: Rect::new(0.0, 0.0, 400.0, 200.0),
            ..Default::default()
        }
    }

    // ── dependency chain ──────────────────────────────────────────────────

    #[test]
    fn full_invalidation_runs_every_stage_once() {
        let (mut m, scheduler) = manager(fitted_surface());
        m.invalidate_all();
        assert_eq!(scheduler.take_requests().len(), 1);

        let report = m.drain().unwrap();
        assert_eq!(report.executed, Stage::ALL.to_vec());
        assert_eq!(report.coalesced, 0);

        let state = m.state();
        assert_eq!(state.view_box, Rect::new(0.0, 0.0, 400.0, 200.0));
        assert_eq!(state.fit_scale, 2.0);
        assert_eq!(state.scale, 2.0);
        assert_eq!(m.surface().renders, 1);
        // Follow-ups were appended mid-pass, never scheduled.
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn chain_runs_even_when_nothing_changed() {
        let (mut m, _) = manager(fitted_surface());
        m.invalidate_all();
        m.drain().unwrap();

        m.invalidate_all();
        let report = m.drain().unwrap();
        assert_eq!(report.executed, Stage::ALL.to_vec());
        assert_eq!(m.surface().offsets, 2);
        assert_eq!(m.surface().renders, 2);
    }

    #[test]
    fn invalidation_starts_mid_pipeline() {
        let (mut m, _) = manager(fitted_surface());
        m.invalidate_all();
        m.drain().unwrap();

        m.surface_mut().scale = 3.0;
        m.surface_mut().viewport = Rect::new(100.0, 50.0, 133.0, 66.0);
        m.invalidate(ComputeScale);
        let report = m.drain().unwrap();
        assert_eq!(report.executed, vec![ComputeScale, ComputeViewport, RenderCanvas]);
        assert_eq!(m.state().scale, 6.0);
        assert_eq!(m.surface().sizes, 1);
    }

    #[test]
    fn earlier_request_behind_later_one_still_reaches_it() {
        let (mut m, _) = manager(fitted_surface());
        m.invalidate(ComputeScale);
        m.invalidate(ContextLocation);

        let report = m.drain().unwrap();
        // compute-scale is dropped at the head, then re-reached via location.
        assert_eq!(
            report.executed,
            vec![ContextLocation, ComputeScale, ComputeViewport, RenderCanvas]
        );
        assert_eq!(report.coalesced, 1);
    }

    #[test]
    fn rejects_non_finite_scale() {
        let mut surface = fitted_surface();
        surface.scale = f32::NAN;
        let (mut m, _) = manager(surface);
        m.invalidate(ComputeScale);
        let err = m.drain().unwrap_err();
        assert!(format!("{err:#}").contains("invalid scale"));
        assert_eq!(m.queue().state(), QueueState::Idle);
    }

    // ── observers ─────────────────────────────────────────────────────────

    #[test]
    fn observers_see_only_real_changes() {
        let (mut m, _) = manager(fitted_surface());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        m.subscribe(move |c| sink.borrow_mut().push(*c));

        m.invalidate_all();
        m.drain().unwrap();
        m.invalidate_all();
        m.drain().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                ViewChange::ViewBox(Rect::new(0.0, 0.0, 400.0, 200.0)),
                ViewChange::FitScale(2.0),
                ViewChange::Scale(2.0),
                ViewChange::Viewport(Rect::new(0.0, 0.0, 400.0, 200.0)),
            ]
        );
    }

    // ── failure / shutdown ────────────────────────────────────────────────

    #[test]
    fn failing_scale_does_not_wedge_the_pipeline() {
        let mut surface = fitted_surface();
        surface.fail_scale = true;
        let (mut m, scheduler) = manager(surface);

        m.invalidate_all();
        scheduler.take_requests();
        let err = m.drain().unwrap_err();
        assert!(format!("{err:#}").contains("scale source unavailable"));
        assert_eq!(m.queue().state(), QueueState::Idle);

        m.surface_mut().fail_scale = false;
        m.invalidate(RenderCanvas);
        assert_eq!(scheduler.request_count(), 1);

        let report = m.drain().unwrap();
        assert_eq!(report.executed.last(), Some(&RenderCanvas));
        assert_eq!(m.surface().renders, 1);
    }

    #[test]
    fn shutdown_discards_and_silences() {
        let (mut m, scheduler) = manager(fitted_surface());
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        m.subscribe(move |_| *counter.borrow_mut() += 1);

        m.invalidate_all();
        scheduler.take_requests();
        m.shutdown();

        m.invalidate(ContextSize);
        assert!(!scheduler.has_pending());
        assert!(m.drain().unwrap().is_empty());
        assert_eq!(m.surface().sizes, 0);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn default_state_is_unit_scale() {
        let state = ViewState::default();
        assert_eq!(state.scale, 1.0);
        assert_eq!(state.viewport.size, Vec2::new(0.0, 0.0));
    }
}
