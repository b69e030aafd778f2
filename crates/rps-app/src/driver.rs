//! Per-frame driver composing the fixed loop with the world.
//!
//! Host input arrives as [`ControlCommand`]s queued with [`Simulation::submit`];
//! they are applied at the start of the next frame, never mid-poll.

use std::collections::VecDeque;

use rps_clock::{ClockError, FixedLoop, LoopState, MonotonicTime, TimeSource};
use rps_core::{
    Census, ControlCommand, Kind, Position, SimulationConfig, Tick, WorldError, WorldState,
    apply_control_command,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sound::LoggedSound;

/// Consecutive capped frames tolerated before pending catch-up is dropped.
pub const MAX_CAPPED_FRAMES: u32 = 30;

/// Errors produced while building or steering a simulation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error(transparent)]
    World(#[from] WorldError),
}

/// What happened during one host frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub ticks: u32,
    pub blend: f64,
    pub state: LoopState,
    pub tick: Tick,
    pub conversions: usize,
    pub sounds: Vec<Kind>,
    pub census: Census,
    /// True when the driver gave up on catching up this frame.
    pub resynced: bool,
}

/// Clock, world and audio collaborator driven once per rendered frame.
#[derive(Debug)]
pub struct Simulation<T: TimeSource = MonotonicTime> {
    clock: FixedLoop<T>,
    world: WorldState,
    sound: LoggedSound,
    pending: VecDeque<ControlCommand>,
    paused: bool,
    capped_frames: u32,
}

impl Simulation<MonotonicTime> {
    /// Build a wall-clock driven simulation.
    pub fn new(config: SimulationConfig) -> Result<Self, DriverError> {
        Self::with_time_source(config, MonotonicTime::new())
    }
}

impl<T: TimeSource> Simulation<T> {
    pub fn with_time_source(config: SimulationConfig, time: T) -> Result<Self, DriverError> {
        let clock = FixedLoop::with_time_source(config.simulation_rate, time)?;
        let sound = LoggedSound::new(config.volume);
        let world = WorldState::new(config)?;
        info!(
            pieces = world.piece_count(),
            rate = clock.rate(),
            volume = sound.volume(),
            "simulation ready"
        );
        Ok(Self {
            clock,
            world,
            sound,
            pending: VecDeque::new(),
            paused: false,
            capped_frames: 0,
        })
    }

    /// Queue a command for the start of the next frame.
    pub fn submit(&mut self, command: ControlCommand) {
        self.pending.push_back(command);
    }

    /// Apply every queued command. Invalid commands are logged and dropped.
    pub fn drain_pending_commands(&mut self) {
        while let Some(command) = self.pending.pop_front() {
            debug!(?command, "applying control command");
            if let Err(err) = self.apply(command) {
                warn!(?command, %err, "rejected control command");
            }
        }
    }

    fn apply(&mut self, command: ControlCommand) -> Result<(), DriverError> {
        if let ControlCommand::SetRate(rate) = command {
            self.clock.set_rate(rate)?;
        }
        apply_control_command(&mut self.world, command)?;
        if matches!(command, ControlCommand::Reset) {
            self.clock.reset();
            self.capped_frames = 0;
        }
        Ok(())
    }

    /// Run one host frame: apply input, then let the clock spend elapsed time.
    pub fn frame(&mut self) -> FrameReport {
        self.drain_pending_commands();

        let mut conversions = 0;
        let mut gained = [false; 3];
        let mut ticks = 0;
        let mut resynced = false;

        if !self.paused {
            let max_ticks = self.world.config().max_ticks_per_poll;
            let world = &mut self.world;
            let sound = &mut self.sound;
            ticks = self.clock.poll(max_ticks, || {
                let events = world.step(sound);
                conversions += events.conversions;
                for kind in events.sounds {
                    gained[kind.index()] = true;
                }
            });

            if self.clock.state() == LoopState::Capped {
                self.capped_frames += 1;
                if self.capped_frames >= MAX_CAPPED_FRAMES {
                    warn!(
                        frames = self.capped_frames,
                        "simulation fell behind; dropping pending catch-up"
                    );
                    self.clock.reset();
                    self.capped_frames = 0;
                    resynced = true;
                }
            } else {
                self.capped_frames = 0;
            }
        }

        FrameReport {
            ticks,
            blend: self.clock.blend(),
            state: self.clock.state(),
            tick: self.world.tick(),
            conversions,
            sounds: Kind::ALL
                .into_iter()
                .filter(|kind| gained[kind.index()])
                .collect(),
            census: self.world.census(),
            resynced,
        }
    }

    /// Advance exactly one tick regardless of elapsed time.
    pub fn step_once(&mut self) {
        self.drain_pending_commands();
        self.world.step(&mut self.sound);
    }

    /// Pausing freezes the clock; resuming discards the time spent paused.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused && !paused {
            self.clock.reset();
            self.capped_frames = 0;
        }
        self.paused = paused;
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    #[must_use]
    pub fn clock(&self) -> &FixedLoop<T> {
        &self.clock
    }

    #[must_use]
    pub fn sound(&self) -> &LoggedSound {
        &self.sound
    }

    /// Every piece at its interpolated render position.
    pub fn render_pieces(&self) -> impl Iterator<Item = (Kind, Position)> + '_ {
        let blend = self.clock.blend() as f32;
        self.world
            .pieces()
            .iter()
            .map(move |piece| (piece.kind, piece.interpolated(blend)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rps_clock::ManualTime;
    use std::sync::Arc;
    use std::time::Duration;

    fn config() -> SimulationConfig {
        SimulationConfig {
            width: 320.0,
            height: 240.0,
            simulation_rate: 50.0,
            max_ticks_per_poll: 4,
            piece_count: 30,
            rng_seed: Some(0x5EED),
            ..SimulationConfig::default()
        }
    }

    fn manual() -> (Arc<ManualTime>, Simulation<Arc<ManualTime>>) {
        let time = Arc::new(ManualTime::new());
        let sim = Simulation::with_time_source(config(), Arc::clone(&time)).expect("simulation");
        (time, sim)
    }

    #[test]
    fn construction_errors_name_their_source() {
        let bad_rate = SimulationConfig {
            simulation_rate: 0.0,
            ..config()
        };
        let err = Simulation::with_time_source(bad_rate, Arc::new(ManualTime::new()))
            .err()
            .expect("zero rate must fail");
        assert!(matches!(err, DriverError::Clock(ClockError::InvalidRate(_))));
        assert!(err.to_string().contains("invalid tick rate"));

        let bad_size = SimulationConfig {
            piece_size: -1.0,
            ..config()
        };
        let err = Simulation::with_time_source(bad_size, Arc::new(ManualTime::new()))
            .err()
            .expect("negative size must fail");
        assert!(matches!(err, DriverError::World(_)));
        assert!(err.to_string().contains("piece_size"));
    }

    #[test]
    fn frame_runs_ticks_for_elapsed_time() {
        let (time, mut sim) = manual();
        time.advance(Duration::from_millis(50));
        let report = sim.frame();
        assert_eq!(report.ticks, 2);
        assert_eq!(report.tick, Tick(2));
        assert!((report.blend - 0.5).abs() < 1e-9);
        assert_eq!(report.state, LoopState::Idle);
        assert_eq!(report.census.total(), 30);
    }

    #[test]
    fn commands_apply_between_polls() {
        let (time, mut sim) = manual();
        sim.submit(ControlCommand::SetRate(100.0));
        sim.submit(ControlCommand::SetPieceCount(12));
        assert_eq!(sim.world().piece_count(), 30);

        time.advance(Duration::from_millis(30));
        let report = sim.frame();
        assert_eq!(report.ticks, 3);
        assert_eq!(sim.world().piece_count(), 12);
        assert_eq!(sim.clock().rate(), 100.0);
        assert_eq!(sim.world().config().simulation_rate, 100.0);
    }

    #[test]
    fn invalid_commands_are_dropped() {
        let (_time, mut sim) = manual();
        sim.submit(ControlCommand::SetRate(0.0));
        sim.submit(ControlCommand::SetPieceSize(-4.0));
        sim.drain_pending_commands();
        assert_eq!(sim.clock().rate(), 50.0);
        assert_eq!(sim.world().config().simulation_rate, 50.0);
        assert_eq!(sim.world().config().piece_size, 28.0);
    }

    #[test]
    fn long_stalls_are_capped_then_resynced() {
        let (time, mut sim) = manual();
        time.advance(Duration::from_secs(60));
        let mut capped = 0;
        let mut resynced = false;
        for _ in 0..MAX_CAPPED_FRAMES {
            let report = sim.frame();
            assert!(report.ticks <= 4);
            if report.state == LoopState::Capped {
                capped += 1;
            }
            resynced |= report.resynced;
        }
        assert_eq!(capped, MAX_CAPPED_FRAMES - 1);
        assert!(resynced);
        assert_eq!(sim.world().tick(), Tick(4 * u64::from(MAX_CAPPED_FRAMES)));
        assert_eq!(sim.clock().blend(), 0.0);

        let report = sim.frame();
        assert_eq!(report.ticks, 0);
    }

    #[test]
    fn pause_freezes_and_resume_discards_paused_time() {
        let (time, mut sim) = manual();
        sim.set_paused(true);
        time.advance(Duration::from_secs(5));
        assert_eq!(sim.frame().ticks, 0);
        sim.set_paused(false);
        assert_eq!(sim.frame().ticks, 0);
        time.advance(Duration::from_millis(20));
        assert_eq!(sim.frame().ticks, 1);
    }

    #[test]
    fn reset_command_restarts_time_and_population() {
        let (time, mut sim) = manual();
        time.advance(Duration::from_millis(70));
        sim.frame();
        assert_eq!(sim.world().tick(), Tick(3));
        sim.submit(ControlCommand::Reset);
        let report = sim.frame();
        assert_eq!(report.ticks, 0);
        assert_eq!(report.tick, Tick(0));
        assert_eq!(report.blend, 0.0);
    }

    #[test]
    fn render_positions_interpolate_with_blend() {
        let (time, mut sim) = manual();
        time.advance(Duration::from_millis(30));
        sim.frame();
        let blend = sim.clock().blend() as f32;
        for ((_, rendered), piece) in sim.render_pieces().zip(sim.world().pieces()) {
            let expected = piece.prev_position.lerp(piece.position, blend);
            assert_eq!(rendered, expected);
        }
    }
}
