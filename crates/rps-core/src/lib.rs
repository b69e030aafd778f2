//! Core types and tick pipeline for the rock/paper/scissors simulation.

use ordered_float::OrderedFloat;
use rand::{Rng, RngCore, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// Fraction of the piece size trimmed from each side of a collision box.
pub const DEFAULT_COLLISION_INSET: f32 = 0.1;

/// Rock/paper/scissors category of a piece.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum Kind {
    Rock,
    Paper,
    Scissors,
}

/// Result of pitting one kind against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    FirstWins,
    SecondWins,
    Draw,
}

impl Kind {
    /// Every kind, in a fixed order used for reporting and sound dispatch.
    pub const ALL: [Kind; 3] = [Kind::Rock, Kind::Paper, Kind::Scissors];

    /// Returns true when `self` converts `other` on contact.
    #[must_use]
    pub const fn beats(self, other: Kind) -> bool {
        matches!(
            (self, other),
            (Kind::Rock, Kind::Scissors) | (Kind::Paper, Kind::Rock) | (Kind::Scissors, Kind::Paper)
        )
    }

    /// The kind that beats `self`.
    #[must_use]
    pub const fn predator(self) -> Kind {
        match self {
            Kind::Rock => Kind::Paper,
            Kind::Paper => Kind::Scissors,
            Kind::Scissors => Kind::Rock,
        }
    }

    /// The kind `self` beats.
    #[must_use]
    pub const fn prey(self) -> Kind {
        match self {
            Kind::Rock => Kind::Scissors,
            Kind::Paper => Kind::Rock,
            Kind::Scissors => Kind::Paper,
        }
    }

    #[must_use]
    pub const fn versus(self, other: Kind) -> Outcome {
        if self.beats(other) {
            Outcome::FirstWins
        } else if other.beats(self) {
            Outcome::SecondWins
        } else {
            Outcome::Draw
        }
    }

    /// Stable index into per-kind tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Kind::Rock => 0,
            Kind::Paper => 1,
            Kind::Scissors => 2,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Kind::Rock => "rock",
            Kind::Paper => "paper",
            Kind::Scissors => "scissors",
        }
    }

    /// Draw a kind uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Logical ticks processed since the last reset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// 2D playfield coordinate of a piece's top-left corner.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_sq(self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Linear interpolation; `t = 0` yields `self`, `t = 1` yields `other`.
    #[must_use]
    pub fn lerp(self, other: Position, t: f32) -> Position {
        Position::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// One simulated entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Piece {
    pub kind: Kind,
    /// Position at the last tick boundary, used for interpolation and as the
    /// stable reference during movement.
    pub prev_position: Position,
    pub position: Position,
}

impl Piece {
    /// A resting piece (previous and current position coincide).
    #[must_use]
    pub const fn new(kind: Kind, position: Position) -> Self {
        Self {
            kind,
            prev_position: position,
            position,
        }
    }

    /// Render position between the last two ticks.
    #[must_use]
    pub fn interpolated(&self, blend: f32) -> Position {
        self.prev_position.lerp(self.position, blend)
    }
}

/// Drawable area that pieces are confined to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
    /// Height of the HUD strip along the bottom edge.
    pub hud_height: f32,
    pub hud_visible: bool,
}

impl Playfield {
    /// Height available to pieces once the HUD strip is accounted for.
    #[must_use]
    pub fn usable_height(&self) -> f32 {
        if self.hud_visible {
            self.height - self.hud_height
        } else {
            self.height
        }
    }

    #[must_use]
    pub fn max_x(&self, piece_size: f32) -> f32 {
        (self.width - piece_size).max(0.0)
    }

    #[must_use]
    pub fn max_y(&self, piece_size: f32) -> f32 {
        (self.usable_height() - piece_size).max(0.0)
    }

    /// Clamp a top-left position so the whole piece stays inside.
    #[must_use]
    pub fn clamp(&self, position: Position, piece_size: f32) -> Position {
        Position::new(
            position.x.clamp(0.0, self.max_x(piece_size)),
            position.y.clamp(0.0, self.max_y(piece_size)),
        )
    }

    #[must_use]
    pub fn contains(&self, position: Position, piece_size: f32) -> bool {
        (0.0..=self.max_x(piece_size)).contains(&position.x)
            && (0.0..=self.max_y(piece_size)).contains(&position.y)
    }
}

/// Which side of the dominance relation a piece moves toward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Polarity {
    /// Move toward a candidate that beats the piece, away from one it beats.
    #[default]
    SeekPredator,
    /// Move toward a candidate the piece beats, away from one that beats it.
    ChasePrey,
}

impl Polarity {
    /// Returns true when `piece` should close in on `candidate`.
    #[must_use]
    pub const fn attracts(self, piece: Kind, candidate: Kind) -> bool {
        match self {
            Polarity::SeekPredator => candidate.beats(piece),
            Polarity::ChasePrey => piece.beats(candidate),
        }
    }
}

/// Errors raised while building or reconfiguring a world.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Static configuration for a simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Width of the playfield.
    pub width: f32,
    /// Height of the playfield, HUD strip included.
    pub height: f32,
    /// Height of the HUD strip reserved along the bottom edge.
    pub hud_height: f32,
    /// Whether the HUD strip is currently shown.
    pub hud_visible: bool,
    /// Logical ticks per second.
    pub simulation_rate: f64,
    /// Upper bound on catch-up ticks per host frame.
    pub max_ticks_per_poll: u32,
    /// Side length of a piece sprite.
    pub piece_size: f32,
    /// Number of pieces in the population.
    pub piece_count: usize,
    /// Opponent candidates examined per piece per tick.
    pub piece_samples: usize,
    /// Distance moved toward an attracting candidate per tick.
    pub attract_speed: f32,
    /// Distance moved away from a repelling candidate per tick.
    pub repel_speed: f32,
    /// Fraction of the piece size trimmed from each side of a collision box.
    pub collision_inset: f32,
    pub polarity: Polarity,
    /// Playback volume handed to the sound collaborator.
    pub volume: f32,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            hud_height: 40.0,
            hud_visible: true,
            simulation_rate: 45.0,
            max_ticks_per_poll: 8,
            piece_size: 28.0,
            piece_count: 125,
            piece_samples: 10,
            attract_speed: 1.0,
            repel_speed: 1.0,
            collision_inset: DEFAULT_COLLISION_INSET,
            polarity: Polarity::SeekPredator,
            volume: 0.5,
            rng_seed: None,
        }
    }
}

impl SimulationConfig {
    /// Checks every field that could make the tick pipeline degenerate.
    pub fn validate(&self) -> Result<(), WorldError> {
        if !(self.width.is_finite() && self.width > 0.0)
            || !(self.height.is_finite() && self.height > 0.0)
        {
            return Err(WorldError::InvalidConfig(
                "playfield dimensions must be positive",
            ));
        }
        if !(self.hud_height.is_finite() && self.hud_height >= 0.0 && self.hud_height < self.height)
        {
            return Err(WorldError::InvalidConfig(
                "hud_height must be non-negative and smaller than the playfield height",
            ));
        }
        if !(self.simulation_rate.is_finite() && self.simulation_rate > 0.0) {
            return Err(WorldError::InvalidConfig(
                "simulation_rate must be positive",
            ));
        }
        if self.max_ticks_per_poll == 0 {
            return Err(WorldError::InvalidConfig(
                "max_ticks_per_poll must be non-zero",
            ));
        }
        validate_piece_size(self.piece_size)?;
        if !(self.attract_speed.is_finite() && self.attract_speed >= 0.0)
            || !(self.repel_speed.is_finite() && self.repel_speed >= 0.0)
        {
            return Err(WorldError::InvalidConfig(
                "attract and repel speeds must be non-negative",
            ));
        }
        if !(0.0..0.5).contains(&self.collision_inset) {
            return Err(WorldError::InvalidConfig(
                "collision_inset must lie in [0, 0.5)",
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(WorldError::InvalidConfig("volume must lie in [0, 1]"));
        }
        Ok(())
    }

    #[must_use]
    pub fn playfield(&self) -> Playfield {
        Playfield {
            width: self.width,
            height: self.height,
            hud_height: self.hud_height,
            hud_visible: self.hud_visible,
        }
    }

    #[must_use]
    pub fn movement_rules(&self) -> MovementRules {
        MovementRules {
            playfield: self.playfield(),
            piece_size: self.piece_size,
            samples: self.piece_samples,
            attract_speed: self.attract_speed,
            repel_speed: self.repel_speed,
            polarity: self.polarity,
        }
    }

    /// Returns the configured RNG, generating a seed from entropy if absent.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

fn validate_piece_size(size: f32) -> Result<(), WorldError> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(WorldError::InvalidConfig("piece_size must be positive"))
    }
}

/// Source of uniformly distributed indices for candidate sampling.
pub trait IndexSource {
    /// Returns an index in `[0, len)`; `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

impl<R: RngCore + ?Sized> IndexSource for R {
    fn pick(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }
}

/// Receives one-shot conversion sounds.
pub trait SoundSink {
    fn play(&mut self, kind: Kind);
}

/// Sound sink that discards every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSound;

impl SoundSink for NullSound {
    fn play(&mut self, _kind: Kind) {}
}

/// Parameters for the movement stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementRules {
    pub playfield: Playfield,
    pub piece_size: f32,
    pub samples: usize,
    pub attract_speed: f32,
    pub repel_speed: f32,
    pub polarity: Polarity,
}

/// Outcome of the collision stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// Pieces whose kind changed.
    pub conversions: usize,
    /// Kinds signalled to the sound sink, in [`Kind::ALL`] order.
    pub sounds: Vec<Kind>,
}

/// Events emitted after processing a tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TickEvents {
    pub tick: Tick,
    pub conversions: usize,
    pub sounds: Vec<Kind>,
}

/// Number of pieces of each kind.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Census {
    pub rock: usize,
    pub paper: usize,
    pub scissors: usize,
}

impl Census {
    #[must_use]
    pub fn from_pieces(pieces: &[Piece]) -> Self {
        let mut census = Census::default();
        for piece in pieces {
            match piece.kind {
                Kind::Rock => census.rock += 1,
                Kind::Paper => census.paper += 1,
                Kind::Scissors => census.scissors += 1,
            }
        }
        census
    }

    #[must_use]
    pub const fn count(&self, kind: Kind) -> usize {
        match kind {
            Kind::Rock => self.rock,
            Kind::Paper => self.paper,
            Kind::Scissors => self.scissors,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.rock + self.paper + self.scissors
    }

    /// The single remaining kind once every other kind has been converted.
    #[must_use]
    pub fn winner(&self) -> Option<Kind> {
        let mut present = Kind::ALL.into_iter().filter(|kind| self.count(*kind) > 0);
        match (present.next(), present.next()) {
            (Some(kind), None) => Some(kind),
            _ => None,
        }
    }
}

/// Phase A: snapshot positions, then move each piece relative to the nearest
/// opponent among a bounded random sample.
///
/// Candidates are drawn live from `pieces` while it is being updated, but
/// distances and directions are computed from `prev_position`, so the result
/// only depends on the order in which `indices` is consumed.
pub fn stage_movement<I: IndexSource + ?Sized>(
    pieces: &mut [Piece],
    indices: &mut I,
    rules: &MovementRules,
) {
    for piece in pieces.iter_mut() {
        piece.prev_position = piece.position;
    }

    for idx in 0..pieces.len() {
        let piece = pieces[idx];
        let mut next = piece.position;
        if let Some(target) = nearest_opponent(pieces, idx, indices, rules.samples) {
            let other = pieces[target];
            let dx = other.prev_position.x - piece.prev_position.x;
            let dy = other.prev_position.y - piece.prev_position.y;
            let distance = (dx * dx + dy * dy).sqrt();
            // Coincident pieces have no direction to move along.
            if distance > f32::EPSILON {
                let speed = if rules.polarity.attracts(piece.kind, other.kind) {
                    rules.attract_speed
                } else {
                    -rules.repel_speed
                };
                next.x += dx / distance * speed;
                next.y += dy / distance * speed;
            }
        }
        pieces[idx].position = rules.playfield.clamp(next, rules.piece_size);
    }
}

/// Nearest different-kind piece among at most `samples` examined candidates,
/// drawing no more than `pieces.len()` indices. Ties keep the first examined.
fn nearest_opponent<I: IndexSource + ?Sized>(
    pieces: &[Piece],
    idx: usize,
    indices: &mut I,
    samples: usize,
) -> Option<usize> {
    let origin = pieces[idx];
    let mut best: Option<(usize, f32)> = None;
    let mut examined = 0usize;

    for _ in 0..pieces.len() {
        if examined >= samples {
            break;
        }
        let candidate = indices.pick(pieces.len());
        let Some(other) = pieces.get(candidate) else {
            continue;
        };
        if other.kind == origin.kind {
            continue;
        }
        examined += 1;
        let distance_sq = origin.prev_position.distance_sq(other.prev_position);
        if best.is_none_or(|(_, best_sq)| distance_sq < best_sq) {
            best = Some((candidate, distance_sq));
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Phase B: convert losing pieces whose collision boxes overlap a winner.
///
/// Conversions are decided against the kinds held at the start of the stage
/// and applied afterwards, so pair enumeration order never matters. Each
/// kind that gained a piece is signalled once.
pub fn stage_collisions<S: SoundSink + ?Sized>(
    pieces: &mut [Piece],
    piece_size: f32,
    collision_inset: f32,
    sound: &mut S,
) -> CollisionReport {
    let reject_sq = 2.0 * piece_size * piece_size;
    let inner = piece_size * (1.0 - 2.0 * collision_inset);
    let mut staged: Vec<Option<Kind>> = vec![None; pieces.len()];

    for i in 0..pieces.len() {
        for j in (i + 1)..pieces.len() {
            let (a, b) = (&pieces[i], &pieces[j]);
            if a.position.distance_sq(b.position) > reject_sq {
                continue;
            }
            if !boxes_overlap(a.position, b.position, inner) {
                continue;
            }
            match a.kind.versus(b.kind) {
                Outcome::FirstWins => staged[j] = Some(a.kind),
                Outcome::SecondWins => staged[i] = Some(b.kind),
                Outcome::Draw => {}
            }
        }
    }

    let mut report = CollisionReport::default();
    let mut gained = [false; 3];
    for (piece, next) in pieces.iter_mut().zip(staged) {
        if let Some(kind) = next
            && piece.kind != kind
        {
            piece.kind = kind;
            gained[kind.index()] = true;
            report.conversions += 1;
        }
    }
    for kind in Kind::ALL {
        if gained[kind.index()] {
            sound.play(kind);
            report.sounds.push(kind);
        }
    }
    report
}

/// Overlap test for two equally sized boxes inset inside their sprites.
fn boxes_overlap(a: Position, b: Position, inner: f32) -> bool {
    inner > 0.0 && (a.x - b.x).abs() < inner && (a.y - b.y).abs() < inner
}

/// External mutations applied between polls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ControlCommand {
    /// Resample the whole population.
    Reset,
    /// Change the logical tick rate (applied to the clock by the driver).
    SetRate(f64),
    SetPieceCount(usize),
    SetPieceSize(f32),
    SetHudVisible(bool),
    SetSamples(usize),
    /// Select the piece under the pointer, if any.
    Select(Position),
    /// Move the selected piece so it is centred on the pointer.
    Drag(Position),
    Release,
}

/// Apply a control command to the world.
pub fn apply_control_command(
    world: &mut WorldState,
    command: ControlCommand,
) -> Result<(), WorldError> {
    match command {
        ControlCommand::Reset => world.reset(),
        ControlCommand::SetRate(rate) => {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(WorldError::InvalidConfig(
                    "simulation_rate must be positive",
                ));
            }
            world.config.simulation_rate = rate;
        }
        ControlCommand::SetPieceCount(count) => world.set_piece_count(count),
        ControlCommand::SetPieceSize(size) => world.set_piece_size(size)?,
        ControlCommand::SetHudVisible(visible) => world.set_hud_visible(visible),
        ControlCommand::SetSamples(samples) => world.set_samples(samples),
        ControlCommand::Select(point) => {
            world.selected = world.piece_at(point);
        }
        ControlCommand::Drag(point) => {
            if let Some(index) = world.selected {
                world.drag_piece(index, point);
            }
        }
        ControlCommand::Release => world.selected = None,
    }
    Ok(())
}

/// Population plus everything needed to advance it one tick.
pub struct WorldState {
    config: SimulationConfig,
    tick: Tick,
    rng: SmallRng,
    pieces: Vec<Piece>,
    selected: Option<usize>,
}

impl fmt::Debug for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldState")
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("piece_count", &self.pieces.len())
            .field("selected", &self.selected)
            .finish()
    }
}

impl WorldState {
    /// Instantiate a world with a freshly sampled population.
    pub fn new(config: SimulationConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let rng = config.seeded_rng();
        let mut world = Self {
            config,
            tick: Tick::zero(),
            rng,
            pieces: Vec::new(),
            selected: None,
        };
        world.reset();
        Ok(world)
    }

    /// Instantiate a world around an explicit population.
    pub fn with_pieces(config: SimulationConfig, pieces: Vec<Piece>) -> Result<Self, WorldError> {
        config.validate()?;
        let rng = config.seeded_rng();
        let mut config = config;
        config.piece_count = pieces.len();
        Ok(Self {
            config,
            tick: Tick::zero(),
            rng,
            pieces,
            selected: None,
        })
    }

    fn spawn_piece(&mut self) -> Piece {
        let playfield = self.config.playfield();
        let size = self.config.piece_size;
        let x = self.rng.random_range(0.0..=playfield.max_x(size));
        let y = self.rng.random_range(0.0..=playfield.max_y(size));
        Piece::new(Kind::random(&mut self.rng), Position::new(x, y))
    }

    /// Replace the population with `piece_count` freshly sampled pieces.
    pub fn reset(&mut self) {
        let count = self.config.piece_count;
        self.pieces.clear();
        self.pieces.reserve(count);
        for _ in 0..count {
            let piece = self.spawn_piece();
            self.pieces.push(piece);
        }
        self.tick = Tick::zero();
        self.selected = None;
        debug!(pieces = count, "population reset");
    }

    /// Grow or shrink the population; surviving pieces keep their index.
    pub fn set_piece_count(&mut self, count: usize) {
        let before = self.pieces.len();
        if count < before {
            self.pieces.truncate(count);
        } else {
            for _ in before..count {
                let piece = self.spawn_piece();
                self.pieces.push(piece);
            }
        }
        self.config.piece_count = count;
        if self.selected.is_some_and(|index| index >= count) {
            self.selected = None;
        }
        debug!(before, after = count, "piece count changed");
    }

    /// Resize every piece and pull them back inside the playfield.
    pub fn set_piece_size(&mut self, size: f32) -> Result<(), WorldError> {
        validate_piece_size(size)?;
        self.config.piece_size = size;
        self.reclamp();
        Ok(())
    }

    pub fn set_hud_visible(&mut self, visible: bool) {
        self.config.hud_visible = visible;
        self.reclamp();
    }

    pub fn set_samples(&mut self, samples: usize) {
        self.config.piece_samples = samples;
    }

    fn reclamp(&mut self) {
        let playfield = self.config.playfield();
        let size = self.config.piece_size;
        for piece in &mut self.pieces {
            piece.position = playfield.clamp(piece.position, size);
            piece.prev_position = playfield.clamp(piece.prev_position, size);
        }
    }

    /// Execute one tick using the world RNG for sampling.
    pub fn step<S: SoundSink + ?Sized>(&mut self, sound: &mut S) -> TickEvents {
        let rules = self.config.movement_rules();
        stage_movement(&mut self.pieces, &mut self.rng, &rules);
        self.finish_step(sound)
    }

    /// Execute one tick drawing candidate indices from `indices`.
    pub fn step_with<I, S>(&mut self, indices: &mut I, sound: &mut S) -> TickEvents
    where
        I: IndexSource + ?Sized,
        S: SoundSink + ?Sized,
    {
        let rules = self.config.movement_rules();
        stage_movement(&mut self.pieces, indices, &rules);
        self.finish_step(sound)
    }

    fn finish_step<S: SoundSink + ?Sized>(&mut self, sound: &mut S) -> TickEvents {
        let report = stage_collisions(
            &mut self.pieces,
            self.config.piece_size,
            self.config.collision_inset,
            sound,
        );
        self.tick = self.tick.next();
        if report.conversions > 0 {
            trace!(
                tick = self.tick.0,
                conversions = report.conversions,
                "pieces converted"
            );
        }
        TickEvents {
            tick: self.tick,
            conversions: report.conversions,
            sounds: report.sounds,
        }
    }

    /// Index of the piece under `point`: the one whose centre is nearest,
    /// preferring later (topmost) pieces on ties.
    #[must_use]
    pub fn piece_at(&self, point: Position) -> Option<usize> {
        let size = self.config.piece_size;
        let half = size * 0.5;
        self.pieces
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, piece)| {
                let p = piece.position;
                (p.x..=p.x + size).contains(&point.x) && (p.y..=p.y + size).contains(&point.y)
            })
            .min_by_key(|(_, piece)| {
                let centre = Position::new(piece.position.x + half, piece.position.y + half);
                OrderedFloat(centre.distance_sq(point))
            })
            .map(|(index, _)| index)
    }

    /// Centre piece `index` on `point`. Returns false for unknown indices.
    pub fn drag_piece(&mut self, index: usize, point: Position) -> bool {
        let playfield = self.config.playfield();
        let size = self.config.piece_size;
        let Some(piece) = self.pieces.get_mut(index) else {
            return false;
        };
        let target = Position::new(point.x - size * 0.5, point.y - size * 0.5);
        piece.position = playfield.clamp(target, size);
        piece.prev_position = piece.position;
        true
    }

    /// Returns an immutable reference to configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    #[must_use]
    pub fn pieces_mut(&mut self) -> &mut [Piece] {
        &mut self.pieces
    }

    #[must_use]
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    #[must_use]
    pub const fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn census(&self) -> Census {
        Census::from_pieces(&self.pieces)
    }

    /// True once a single kind holds the whole population.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.census().winner().is_some()
    }

    /// Borrow the world RNG mutably for deterministic sampling.
    #[must_use]
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}
