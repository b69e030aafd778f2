//! Host plumbing for the rock/paper/scissors simulation: the per-frame
//! driver, the audio collaborator and the terminal front end.

pub mod driver;
pub mod sound;
pub mod terminal;

pub mod renderer {
    use std::{path::PathBuf, time::Duration};

    use anyhow::Result;
    use rps_core::SimulationConfig;

    /// Parameters for a run without a real terminal.
    #[derive(Debug, Clone, PartialEq)]
    pub struct HeadlessOptions {
        /// Number of host frames to simulate.
        pub frames: usize,
        /// Simulated wall time between frames.
        pub frame_duration: Duration,
        /// Where to write the JSON report, if anywhere.
        pub report_path: Option<PathBuf>,
    }

    /// Shared context passed to renderer implementations.
    #[derive(Debug, Clone)]
    pub struct RendererContext {
        pub config: SimulationConfig,
        pub headless: Option<HeadlessOptions>,
    }

    pub trait Renderer {
        /// Stable identifier describing the renderer implementation.
        fn name(&self) -> &'static str;

        /// Launch the renderer; blocks until the session completes.
        fn run(&self, ctx: RendererContext) -> Result<()>;
    }
}

pub use driver::{DriverError, FrameReport, MAX_CAPPED_FRAMES, Simulation};
pub use renderer::{HeadlessOptions, Renderer, RendererContext};
pub use sound::LoggedSound;
