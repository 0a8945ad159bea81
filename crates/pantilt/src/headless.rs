//! Headless runs for batch capture and tests.
//!
//! Creates a GPU context without a window, drives a fixed number of ticks
//! with a fixed time step and hands every captured gimbal frame to a sink.

use pollster::FutureExt;

use pantilt_core::{FrameSink, Result, SimOptions};
use pantilt_render::{AssetLoader, Camera, RenderEngine};

use crate::rig::Rig;
use crate::simulation::{Simulation, TickReport};

/// Runs `ticks` ticks of `dt` seconds each without a window.
///
/// The main view is rendered every tick into an offscreen primary target
/// of `options.primary_resolution`. Returns one report per tick.
///
/// # Example
/// ```no_run
/// use pantilt::{run_headless, RecordingSink, SimOptions};
///
/// let mut sink = RecordingSink::new();
/// let reports = run_headless(&SimOptions::default(), 10, 1.0 / 60.0, &mut sink).unwrap();
/// assert_eq!(reports.len(), 10);
/// assert_eq!(sink.frames().len(), 5);
/// ```
pub fn run_headless<S>(
    options: &SimOptions,
    ticks: u64,
    dt: f32,
    sink: &mut S,
) -> Result<Vec<TickReport>>
where
    S: FrameSink + ?Sized,
{
    let mut simulation = Simulation::new(options)?;
    let mut loader = AssetLoader::new();
    let rig = Rig::build(options, simulation.mechanism(), &mut loader)?;

    let mut engine = RenderEngine::new_headless(options.primary_resolution).block_on()?;
    engine.set_clear_color(options.background_color);
    let mut renderer = rig.into_renderer(engine);

    let camera = Camera::new(options.primary_resolution.aspect());
    let main_pose = camera.pose();

    log::info!("headless run: {ticks} ticks, dt = {dt}");
    let mut reports = Vec::with_capacity(usize::try_from(ticks).unwrap_or(0));
    for _ in 0..ticks {
        reports.push(simulation.tick(dt, &mut renderer, &main_pose, sink)?);
    }
    log::info!(
        "headless run finished at t = {:.3}s, pan = {:.4} rad",
        simulation.elapsed(),
        simulation.mechanism().pan_angle()
    );
    Ok(reports)
}
