//! The per-tick main loop.

use pantilt_core::{
    transcode, CameraPose, CaptureScheduler, FrameSink, MechanismModel, RenderTarget, Resolution,
    Result, SceneRenderer, SimOptions, SpeedProfile, VirtualFrame,
};

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Index of the tick that just ran.
    pub tick: u64,
    /// Elapsed time fed to the integrator.
    pub dt: f32,
    /// Simulation time after the tick, in seconds.
    pub elapsed: f64,
    /// Pan angle after integration, in radians.
    pub pan_angle: f32,
    /// Tilt angle after integration, in radians.
    pub tilt_angle: f32,
    /// Pan speed commanded this tick, before clamping.
    pub commanded_speed: f32,
    /// Whether the gimbal camera was captured and presented.
    pub captured: bool,
}

/// Drives the gimbal, the capture schedule and the main view.
#[derive(Debug, Clone)]
pub struct Simulation {
    mechanism: MechanismModel,
    profile: SpeedProfile,
    scheduler: CaptureScheduler,
    frame: VirtualFrame,
    elapsed: f64,
    primary: Resolution,
}

impl Simulation {
    /// Builds a simulation from validated options.
    pub fn new(options: &SimOptions) -> Result<Self> {
        options.validate()?;
        let mechanism =
            MechanismModel::new(options.max_speed, options.gimbal, options.virtual_lens())?;
        log::info!(
            "simulation: virtual {} {:?}, primary {}, max speed {} rad/s",
            options.virtual_resolution,
            options.pixel_format,
            options.primary_resolution,
            options.max_speed
        );
        Ok(Self {
            mechanism,
            profile: options.speed_profile(),
            scheduler: CaptureScheduler::new(options.virtual_resolution, options.pixel_format),
            frame: VirtualFrame::new(options.virtual_resolution, options.pixel_format),
            elapsed: 0.0,
            primary: options.primary_resolution,
        })
    }

    /// Runs one tick.
    ///
    /// The pan speed is taken from the profile at the simulation time before
    /// this tick's step. On even ticks the gimbal camera is rendered
    /// offscreen and the frame is handed to `sink` in display row order,
    /// after the main view has been rendered from `main_pose`.
    ///
    /// A non-positive `dt` leaves the angles and the clock alone but the
    /// tick still renders and counts.
    pub fn tick<R, S>(
        &mut self,
        dt: f32,
        renderer: &mut R,
        main_pose: &CameraPose,
        sink: &mut S,
    ) -> Result<TickReport>
    where
        R: SceneRenderer + ?Sized,
        S: FrameSink + ?Sized,
    {
        let tick = self.scheduler.tick();

        let commanded_speed = self.profile.speed_rad(self.elapsed);
        self.mechanism.set_pan_speed(commanded_speed);
        self.mechanism.update(dt);
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += f64::from(dt);
        }
        renderer.sync_mechanism(&self.mechanism);

        let captured = self.scheduler.capture_due();
        if captured {
            let pose = self.mechanism.camera_pose();
            self.scheduler.capture(renderer, &pose, &mut self.frame)?;
        }

        renderer.set_size(self.primary)?;
        renderer.render(main_pose, RenderTarget::Primary)?;

        if captured {
            transcode::to_top_down(&mut self.frame);
            sink.present(tick, &self.frame)?;
        }

        self.scheduler.advance();

        let report = TickReport {
            tick,
            dt,
            elapsed: self.elapsed,
            pan_angle: self.mechanism.pan_angle(),
            tilt_angle: self.mechanism.tilt_angle(),
            commanded_speed,
            captured,
        };
        log::trace!("{report:?}");
        Ok(report)
    }

    /// Restarts the speed profile from time zero. Angles are kept.
    pub fn reset_time(&mut self) {
        self.elapsed = 0.0;
    }

    /// Updates the primary size after a window resize.
    pub fn set_primary(&mut self, primary: Resolution) {
        self.primary = primary;
    }

    pub fn primary(&self) -> Resolution {
        self.primary
    }

    pub fn mechanism(&self) -> &MechanismModel {
        &self.mechanism
    }

    /// Tilt is not driven by the profile; hosts may command it directly.
    pub fn mechanism_mut(&mut self) -> &mut MechanismModel {
        &mut self.mechanism
    }

    pub fn profile(&self) -> SpeedProfile {
        self.profile
    }

    /// Simulation time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Index of the next tick.
    pub fn next_tick(&self) -> u64 {
        self.scheduler.tick()
    }

    /// The most recently captured frame.
    pub fn frame(&self) -> &VirtualFrame {
        &self.frame
    }
}
