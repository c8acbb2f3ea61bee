pub mod background;
pub mod camera;
pub mod collectibles;
pub mod config;
pub mod enemies;
pub mod entity;
pub mod level_data;
pub mod patrol;
pub mod physics;
pub mod player;
pub mod scoring;
pub mod world_bounds;

use serde::{Deserialize, Serialize};

use cherrytrail_core::collision::{
    Collider, CollisionMode, CollisionRegistry, CollisionWorld, Contact, resolve_collisions,
};
use cherrytrail_core::error::GameError;
use cherrytrail_core::events::{LevelEvent, MusicCue, SoundCue};
use cherrytrail_core::geometry::{Facing, Rect, Side, Vec2};
use cherrytrail_core::input::InputState;
use cherrytrail_core::level_state_boilerplate;
use cherrytrail_core::level_trait::Level;
use cherrytrail_core::round::{Difficulty, RoundPhase, RoundResult, RoundState};
use cherrytrail_core::settings::GameContext;

use background::{BackgroundManager, Dimension, create_background_manager};
use camera::Camera;
use collectibles::{Cherry, PickupState, Spike, Trophy};
use config::LevelConfig;
use enemies::{Flyer, Mushroom, Saw};
use entity::{Entity, EntityId, EntityKind, LevelTimer, LevelTimers};
use level_data::{LevelData, ObjectKind};
use player::Player;
use scoring::{calculate_score, submit_score};
use world_bounds::{WorldExitAction, world_exit_action};

/// Longest slice of time simulated in one step; longer frames are split.
const MAX_STEP: f32 = 1.0 / 60.0;
/// Leftover frame time below this is dropped.
const MIN_STEP: f32 = 1e-6;

/// Rules suspended while the player is invulnerable.
pub const DAMAGE_RULES: [&str; 3] = ["enemy", "saw", "hazard"];

/// Collider groups the collision rules pair up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderGroup {
    Player,
    Terrain,
    Spikes,
    Mushrooms,
    Saws,
    Flyers,
    Cherries,
    Trophy,
}

/// Serializable level state: everything observable about the round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelState {
    pub round: RoundState,
    pub player: Player,
    pub terrain: Vec<Rect>,
    pub spikes: Vec<Spike>,
    pub mushrooms: Vec<Mushroom>,
    pub saws: Vec<Saw>,
    pub flyers: Vec<Flyer>,
    pub cherries: Vec<Cherry>,
    pub trophy: Trophy,
    pub camera: Camera,
    pub result: Option<RoundResult>,
    /// Jump key state on the previous frame; jumps trigger on the press edge.
    pub jump_held: bool,
}

/// One round of the forest level.
pub struct LevelController {
    name: String,
    config: LevelConfig,
    difficulty: Difficulty,
    context: GameContext,
    state: LevelState,
    registry: CollisionRegistry<LevelController>,
    timers: LevelTimers,
    background: Box<dyn BackgroundManager>,
    world: Rect,
    world_bottom: f32,
    /// Events raised by collision and timer callbacks during the current update.
    pending: Vec<LevelEvent>,
    torn_down: bool,
}

impl LevelController {
    /// Build the level and start the round.
    ///
    /// Fails if the level data is malformed or the configured background
    /// theme does not exist.
    pub fn new(
        data: LevelData,
        config: LevelConfig,
        difficulty: Difficulty,
        context: GameContext,
    ) -> Result<Self, GameError> {
        data.validate()?;
        config.validate();

        let background = create_background_manager(
            &config.background.theme,
            Dimension {
                width: config.camera.width,
                height: config.camera.height,
            },
            &config.background,
        )?;

        let world_size = data.world_size();
        let world = Rect::new(0.0, 0.0, world_size.x, world_size.y);

        let spikes = data
            .spike_rects()
            .into_iter()
            .enumerate()
            .map(|(i, r)| Spike::new(EntityId::new(EntityKind::Spike, i as u32), r))
            .collect();
        let cherries = data
            .points(ObjectKind::Cherry)
            .into_iter()
            .enumerate()
            .map(|(i, p)| Cherry::new(EntityId::new(EntityKind::Cherry, i as u32), p, &config.cherry))
            .collect();
        let flyers = data
            .points(ObjectKind::Flyer)
            .into_iter()
            .enumerate()
            .map(|(i, p)| Flyer::new(EntityId::new(EntityKind::Flyer, i as u32), p, &config.flyer))
            .collect();

        let mut mushrooms = Vec::new();
        for (i, route) in data.routes(ObjectKind::Mushroom).into_iter().enumerate() {
            let id = EntityId::new(EntityKind::Mushroom, i as u32);
            let mut mushroom = Mushroom::new(id, route.start, &config.mushroom);
            if let Some(end) = route.end {
                mushroom.set_patrol_route(end, &config.mushroom);
            }
            mushrooms.push(mushroom);
        }
        let mut saws = Vec::new();
        for (i, route) in data.routes(ObjectKind::Saw).into_iter().enumerate() {
            let id = EntityId::new(EntityKind::Saw, i as u32);
            let mut saw = Saw::new(id, route.start, &config.saw);
            if let Some(end) = route.end {
                saw.set_patrol_route(end, &config.saw);
            }
            saws.push(saw);
        }

        let trophy = Trophy::new(data.trophy()?, &config.trophy);
        let lives = config.score.difficulty.get(difficulty).lives;
        let player = Player::new(data.spawn()?, lives, &config.player);

        let mut camera = Camera::new(config.camera.width, config.camera.height, world_size);
        camera.follow(player.body.center());

        let state = LevelState {
            round: RoundState::new(config.round.time_limit_secs),
            player,
            terrain: data.terrain_rects(),
            spikes,
            mushrooms,
            saws,
            flyers,
            cherries,
            trophy,
            camera,
            result: None,
            jump_held: false,
        };

        let mut level = Self {
            name: data.name.clone(),
            world_bottom: world.bottom() + config.physics.hellhole,
            config,
            difficulty,
            context,
            state,
            registry: CollisionRegistry::new(),
            timers: LevelTimers::new(),
            background,
            world,
            pending: Vec::new(),
            torn_down: false,
        };
        level.register_rules();

        tracing::info!(
            level = %level.name,
            ?difficulty,
            lives,
            mushrooms = level.state.mushrooms.len(),
            saws = level.state.saws.len(),
            cherries = level.state.cherries.len(),
            "round started"
        );
        Ok(level)
    }

    /// The bundled forest level with default config.
    pub fn forest(difficulty: Difficulty, context: GameContext) -> Result<Self, GameError> {
        Self::new(LevelData::forest()?, LevelConfig::load(), difficulty, context)
    }

    fn register_rules(&mut self) {
        use ColliderGroup as G;
        use CollisionMode::{Overlap, Physical};

        let r = &mut self.registry;
        r.register_rule("terrain", G::Player, G::Terrain, Physical, on_terrain);
        r.register_rule("flyer", G::Player, G::Flyers, Physical, on_flyer);
        r.register_rule("hazard", G::Player, G::Spikes, Overlap, on_hazard);
        r.register_rule("saw", G::Player, G::Saws, Overlap, on_hazard);
        r.register_rule("enemy", G::Player, G::Mushrooms, Overlap, on_enemy);
        r.register_rule("cherry", G::Player, G::Cherries, Overlap, on_cherry);
        r.register_rule("trophy", G::Player, G::Trophy, Overlap, on_trophy);
    }

    pub fn state(&self) -> &LevelState {
        &self.state
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn context(&self) -> &GameContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut GameContext {
        &mut self.context
    }

    pub fn background(&self) -> &dyn BackgroundManager {
        self.background.as_ref()
    }

    /// Map rectangle in pixels.
    pub fn world(&self) -> Rect {
        self.world
    }

    /// Depth at which falling bodies leave the world.
    pub fn world_bottom(&self) -> f32 {
        self.world_bottom
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn emit(&mut self, event: LevelEvent) {
        self.pending.push(event);
    }

    fn sound(&mut self, cue: SoundCue) {
        if self.context.settings.sfx {
            self.emit(LevelEvent::Sound(cue));
        }
    }

    /// One fixed slice of the frame, in update order.
    fn step(&mut self, dt: f32, input: &InputState) {
        self.state.player.tick();

        let direction = self.handle_input(input);

        match direction {
            Some(Facing::Left) => self.background.scroll_left(),
            Some(Facing::Right) => self.background.scroll_right(),
            None => self.background.idle(),
        }

        self.state.camera.follow(self.state.player.body.center());
        self.background.follow_camera(self.state.camera.scroll_x());
        self.cull_patrols();

        for mushroom in &mut self.state.mushrooms {
            mushroom.advance(dt);
        }
        for saw in &mut self.state.saws {
            saw.advance(dt);
        }
        for flyer in &mut self.state.flyers {
            flyer.advance(dt, &self.config.flyer);
        }

        self.integrate(dt);

        resolve_collisions(self);
        if !self.state.round.is_running() {
            return;
        }

        self.apply_world_exits();
        if !self.state.round.is_running() {
            return;
        }

        for event in self.timers.advance(dt) {
            self.on_timer(event);
        }

        self.state.round.tick(dt);
    }

    /// Translate input into player actions. Returns the direction actually moved.
    fn handle_input(&mut self, input: &InputState) -> Option<Facing> {
        let player_cfg = &self.config.player;
        let player = &mut self.state.player;

        let direction = input.horizontal().filter(|facing| {
            let side = match facing {
                Facing::Left => Side::Left,
                Facing::Right => Side::Right,
            };
            !player.body.blocked.has(side)
        });
        match direction {
            Some(facing) => player.move_to(facing, player_cfg),
            None => player.idle(),
        }

        let pressed = input.jump && !self.state.jump_held;
        self.state.jump_held = input.jump;
        if pressed && self.state.player.jump(&self.config.player) {
            self.sound(SoundCue::Jump);
        }
        direction
    }

    /// Pause patrols outside the padded camera view, resume those inside.
    fn cull_patrols(&mut self) {
        let mushroom_zone = self.state.camera.culling_rect(self.config.mushroom.cull_radius);
        for mushroom in self.state.mushrooms.iter_mut().filter(|m| m.is_active()) {
            if mushroom_zone.intersects(&mushroom.bounds()) {
                mushroom.start_patrol();
            } else {
                mushroom.stop_patrol();
            }
        }
        let saw_zone = self.state.camera.culling_rect(self.config.saw.cull_radius);
        for saw in self.state.saws.iter_mut().filter(|s| s.is_active()) {
            if saw_zone.intersects(&saw.bounds()) {
                saw.start_patrol();
            } else {
                saw.stop_patrol();
            }
        }
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.config.physics.gravity;
        let player = &mut self.state.player;
        if player.is_active() {
            player.body.integrate(gravity, dt);
            player.body.clamp_to_world(&self.world);
        }
        for mushroom in self.state.mushrooms.iter_mut().filter(|m| m.is_active()) {
            mushroom.body.integrate(gravity, dt);
        }
        for flyer in self.state.flyers.iter_mut().filter(|f| f.is_active()) {
            flyer.body.integrate(gravity, dt);
        }
    }

    /// Dispatch every entity whose top fell below the world bottom through the
    /// world exit table.
    fn apply_world_exits(&mut self) {
        let bottom = self.world_bottom;
        let below = |e: &dyn Entity| e.is_active() && e.body().position.y > bottom;

        let mut exited = Vec::new();
        if below(&self.state.player) {
            exited.push(EntityId::PLAYER);
        }
        exited.extend(self.state.mushrooms.iter().filter(|m| below(*m)).map(Entity::id));
        exited.extend(self.state.flyers.iter().filter(|f| below(*f)).map(Entity::id));

        for id in exited {
            match world_exit_action(id.kind) {
                WorldExitAction::LoseRound => {
                    tracing::info!("player fell out of the world");
                    self.state.player.die();
                    self.lose();
                },
                WorldExitAction::Deactivate => self.deactivate_entity(id),
                WorldExitAction::Ignore => {},
            }
        }
    }

    fn deactivate_entity(&mut self, id: EntityId) {
        let slot = id.slot();
        match id.kind {
            EntityKind::Player => self.state.player.die(),
            EntityKind::Mushroom => {
                if let Some(m) = self.state.mushrooms.get_mut(slot) {
                    m.mark_dead();
                }
            },
            EntityKind::Flyer => {
                if let Some(f) = self.state.flyers.get_mut(slot) {
                    f.deactivate(&mut self.timers);
                }
            },
            EntityKind::Saw => {
                if let Some(s) = self.state.saws.get_mut(slot) {
                    s.deactivate();
                }
            },
            EntityKind::Cherry => {
                if let Some(c) = self.state.cherries.get_mut(slot) {
                    c.deactivate();
                }
            },
            EntityKind::Spike => {
                if let Some(s) = self.state.spikes.get_mut(slot) {
                    s.deactivate();
                }
            },
            EntityKind::Trophy => {
                self.state.trophy.deactivate();
            },
            EntityKind::Terrain => {},
        }
    }

    fn on_timer(&mut self, event: LevelTimer) {
        match event {
            LevelTimer::KnockbackEnded => self.state.player.end_knockback(),
            LevelTimer::BlinkToggle => self.state.player.toggle_blink(),
            LevelTimer::InvulnerabilityEnded => {
                self.state.player.recover(&mut self.timers);
                if !self.state.player.is_dead() {
                    for rule in DAMAGE_RULES {
                        self.registry.set_active(rule, true);
                    }
                }
            },
            LevelTimer::FlyerDrop(id) => {
                if let Some(flyer) = self.state.flyers.get_mut(id.slot())
                    && flyer.drop_now(&self.config.flyer)
                {
                    tracing::debug!(entity = ?id, "flyer dropping");
                }
            },
            LevelTimer::CherryFaded(id) => {
                if let Some(cherry) = self.state.cherries.get_mut(id.slot()) {
                    cherry.finish_fade();
                }
            },
        }
    }

    /// Damage from a hazard or enemy. Ignored while invulnerable.
    fn hurt_player(&mut self) {
        if !self.state.round.is_running()
            || self.state.player.invulnerable
            || self.state.player.is_dead()
        {
            return;
        }
        let lives = self.state.player.decrement_lives();
        tracing::info!(lives, "life lost");
        self.emit(LevelEvent::LivesChanged(lives));
        self.sound(SoundCue::Hit);

        if lives == 0 {
            self.state.player.die();
            self.state.player.ragdoll(&self.config.player);
            self.lose();
            return;
        }

        for rule in DAMAGE_RULES {
            self.registry.set_active(rule, false);
        }
        self.state
            .player
            .get_hit(&mut self.timers, &self.config.player);
    }

    /// Returns whether this call ended the round.
    fn win(&mut self) -> bool {
        if !self.state.round.win() {
            return false;
        }
        self.state.trophy.collect();
        let result = RoundResult::won(&self.state.round, self.difficulty, self.state.player.lives);
        self.finish_round(result, SoundCue::Win);
        true
    }

    fn lose(&mut self) {
        if !self.state.round.lose() {
            return;
        }
        let result = RoundResult::lost(&self.state.round, self.difficulty);
        self.finish_round(result, SoundCue::Lose);
    }

    /// Rebuild timers and rule flags after a snapshot replaced `state`.
    ///
    /// Pending continuations are not part of the snapshot; they are
    /// rescheduled from the restored entity states instead.
    fn restore_runtime(&mut self) {
        if self.torn_down {
            return;
        }
        self.timers.clear();
        self.registry.clear();
        self.register_rules();

        let invulnerable = self
            .state
            .player
            .restore_timers(&mut self.timers, &self.config.player);
        for rule in DAMAGE_RULES {
            self.registry.set_active(rule, !invulnerable);
        }
        for flyer in &mut self.state.flyers {
            flyer.restore_drop(&mut self.timers, &self.config.flyer);
        }
        for cherry in &mut self.state.cherries {
            if cherry.restore_fade(&mut self.timers, &self.config.cherry) {
                self.registry.detach("cherry", cherry.id());
            }
        }
        for mushroom in self.state.mushrooms.iter().filter(|m| !m.is_alive()) {
            self.registry.detach("enemy", mushroom.id());
        }
        if self.state.trophy.state == PickupState::Collected {
            self.registry.detach("trophy", EntityId::TROPHY);
        }

        if self.state.round.is_running() {
            self.timers.resume();
        } else {
            self.timers.pause();
        }
        tracing::info!(
            level = %self.name,
            phase = ?self.state.round.phase,
            invulnerable,
            pending_timers = self.timers.len(),
            "level state applied"
        );
    }

    fn finish_round(&mut self, result: RoundResult, cue: SoundCue) {
        let score = calculate_score(&result, &self.config.score);
        let new_high_score = score > 0 && submit_score(self.context.store.as_mut(), score);
        tracing::info!(
            outcome = ?result.outcome,
            score,
            new_high_score,
            cherries = result.cherries,
            time_remaining = result.time_remaining,
            "round over"
        );
        self.timers.pause();
        self.sound(cue);
        self.state.result = Some(result.clone());
        self.emit(LevelEvent::RoundEnded {
            result,
            score,
            new_high_score,
        });
    }
}

impl std::fmt::Debug for LevelController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelController")
            .field("name", &self.name)
            .field("difficulty", &self.difficulty)
            .field("phase", &self.state.round.phase)
            .field("rules", &self.registry)
            .finish_non_exhaustive()
    }
}

fn collidable_bounds<E: Entity>(entity: &E) -> Option<Rect> {
    entity.is_collidable().then(|| entity.bounds())
}

fn colliders_of<E: Entity>(entities: &[E]) -> Vec<Collider<EntityId>> {
    entities
        .iter()
        .filter(|e| e.is_collidable())
        .map(|e| Collider {
            id: e.id(),
            bounds: e.bounds(),
        })
        .collect()
}

impl CollisionWorld for LevelController {
    type Group = ColliderGroup;
    type Id = EntityId;

    fn registry(&self) -> &CollisionRegistry<Self> {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut CollisionRegistry<Self> {
        &mut self.registry
    }

    fn colliders(&self, group: ColliderGroup) -> Vec<Collider<EntityId>> {
        let s = &self.state;
        match group {
            ColliderGroup::Player => colliders_of(std::slice::from_ref(&s.player)),
            ColliderGroup::Terrain => s
                .terrain
                .iter()
                .enumerate()
                .map(|(i, &bounds)| Collider {
                    id: EntityId::new(EntityKind::Terrain, i as u32),
                    bounds,
                })
                .collect(),
            ColliderGroup::Spikes => colliders_of(&s.spikes),
            ColliderGroup::Mushrooms => colliders_of(&s.mushrooms),
            ColliderGroup::Saws => colliders_of(&s.saws),
            ColliderGroup::Flyers => colliders_of(&s.flyers),
            ColliderGroup::Cherries => colliders_of(&s.cherries),
            ColliderGroup::Trophy => colliders_of(std::slice::from_ref(&s.trophy)),
        }
    }

    fn collider(&self, id: EntityId) -> Option<Rect> {
        let s = &self.state;
        let slot = id.slot();
        match id.kind {
            EntityKind::Player => collidable_bounds(&s.player),
            EntityKind::Terrain => s.terrain.get(slot).copied(),
            EntityKind::Spike => s.spikes.get(slot).and_then(collidable_bounds),
            EntityKind::Mushroom => s.mushrooms.get(slot).and_then(collidable_bounds),
            EntityKind::Saw => s.saws.get(slot).and_then(collidable_bounds),
            EntityKind::Flyer => s.flyers.get(slot).and_then(collidable_bounds),
            EntityKind::Cherry => s.cherries.get(slot).and_then(collidable_bounds),
            EntityKind::Trophy => collidable_bounds(&s.trophy),
        }
    }

    fn separate(&mut self, id: EntityId, mtv: Vec2, side: Side) {
        match id.kind {
            EntityKind::Player => self.state.player.body.separate(mtv, side),
            _ => tracing::warn!(entity = ?id, "push-out requested for a non-player body"),
        }
    }
}

fn on_terrain(_level: &mut LevelController, _contact: &Contact<EntityId>) {}

/// Standing on a flyer starts its drop countdown.
fn on_flyer(level: &mut LevelController, contact: &Contact<EntityId>) {
    if contact.side != Side::Down {
        return;
    }
    if let Some(flyer) = level.state.flyers.get_mut(contact.b.slot()) {
        flyer.schedule_drop(&mut level.timers, &level.config.flyer);
    }
}

fn on_hazard(level: &mut LevelController, _contact: &Contact<EntityId>) {
    level.hurt_player();
}

/// Landing on a mushroom stomps it; any other touch hurts the player.
fn on_enemy(level: &mut LevelController, contact: &Contact<EntityId>) {
    let stomp = contact.side == Side::Down && level.state.player.body.velocity.y >= 0.0;
    if !stomp {
        level.hurt_player();
        return;
    }
    let Some(mushroom) = level.state.mushrooms.get_mut(contact.b.slot()) else {
        return;
    };
    if mushroom.get_hit(&level.config.mushroom) {
        level.registry.detach(contact.rule, contact.b);
        level.state.player.hit_mushroom(&level.config.player);
        level.sound(SoundCue::Stomp);
    }
}

fn on_cherry(level: &mut LevelController, contact: &Contact<EntityId>) {
    let Some(cherry) = level.state.cherries.get_mut(contact.b.slot()) else {
        return;
    };
    if !cherry.collect(&mut level.timers, &level.config.cherry) {
        return;
    }
    level.registry.detach(contact.rule, contact.b);
    if level.state.round.collect_cherry() {
        let total = level.state.round.cherries_collected;
        tracing::debug!(entity = ?contact.b, total, "cherry collected");
        level.emit(LevelEvent::CherryCollected(total));
        level.sound(SoundCue::Collect);
    }
}

fn on_trophy(level: &mut LevelController, contact: &Contact<EntityId>) {
    if level.win() {
        level.registry.detach(contact.rule, contact.b);
    }
}

impl Level for LevelController {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, dt: f32, input: &InputState) -> Vec<LevelEvent> {
        if self.torn_down || !self.state.round.is_running() || !dt.is_finite() || dt <= 0.0 {
            return Vec::new();
        }

        let mut remaining = dt;
        while remaining > MIN_STEP && self.state.round.is_running() {
            let step = remaining.min(MAX_STEP);
            self.step(step, input);
            remaining -= step;
        }
        std::mem::take(&mut self.pending)
    }

    fn pause(&mut self) -> Vec<LevelEvent> {
        if self.torn_down || !self.state.round.pause() {
            return Vec::new();
        }
        self.timers.pause();
        tracing::info!(level = %self.name, "round paused");
        if self.context.settings.bgm {
            vec![LevelEvent::Music(MusicCue::Pause)]
        } else {
            Vec::new()
        }
    }

    fn resume(&mut self) -> Vec<LevelEvent> {
        if self.torn_down || !self.state.round.resume() {
            return Vec::new();
        }
        self.timers.resume();
        tracing::info!(level = %self.name, "round resumed");
        if self.context.settings.bgm {
            vec![LevelEvent::Music(MusicCue::Resume)]
        } else {
            Vec::new()
        }
    }

    fn phase(&self) -> RoundPhase {
        self.state.round.phase
    }

    fn round_result(&self) -> Option<RoundResult> {
        self.state.result.clone()
    }

    level_state_boilerplate!(state_type: LevelState, after_apply: restore_runtime);

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.registry.clear();
        self.timers.clear();
        let ids: Vec<EntityId> = self
            .state
            .mushrooms
            .iter()
            .map(Entity::id)
            .chain(self.state.saws.iter().map(Entity::id))
            .chain(self.state.flyers.iter().map(Entity::id))
            .chain(self.state.cherries.iter().map(Entity::id))
            .chain(self.state.spikes.iter().map(Entity::id))
            .chain([EntityId::TROPHY])
            .collect();
        for id in ids {
            self.deactivate_entity(id);
        }
        self.torn_down = true;
        tracing::info!(level = %self.name, "level torn down");
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use cherrytrail_core::round::RoundOutcome;
    use cherrytrail_core::settings::GameSettings;
    use cherrytrail_core::storage::{HighScoreStore, MemoryStore};
    use cherrytrail_core::test_helpers::{FRAME, idle_input, run_level_ticks};
    use enemies::{FlyerState, MushroomState};
    use level_data::MapObject;

    /// Floor top in the test arenas.
    const FLOOR_Y: f32 = 176.0;
    /// Player centre height when standing on the floor.
    const STAND_Y: f32 = 163.0;

    fn obj(name: &str, kind: ObjectKind, x: f32, y: f32) -> MapObject {
        MapObject {
            name: name.to_string(),
            kind,
            x,
            y,
        }
    }

    /// Flat floor `cols` tiles wide, spawn at the left, trophy at the right.
    fn arena_data(cols: usize, walls: &[usize], extra: Vec<MapObject>) -> LevelData {
        let mut rows = vec![".".repeat(cols); 11];
        for &col in walls {
            for row in &mut rows[9..11] {
                row.replace_range(col..=col, "#");
            }
        }
        rows.push("#".repeat(cols));
        let mut objects = vec![
            obj("spawn", ObjectKind::Spawn, 40.0, STAND_Y),
            obj("trophy", ObjectKind::Trophy, cols as f32 * 16.0 - 40.0, 160.0),
        ];
        objects.extend(extra);
        LevelData::new("Arena", 16.0, rows, objects).unwrap()
    }

    fn build(data: LevelData, difficulty: Difficulty, context: GameContext) -> LevelController {
        LevelController::new(data, LevelConfig::default(), difficulty, context).unwrap()
    }

    fn arena(difficulty: Difficulty, extra: Vec<MapObject>) -> LevelController {
        build(arena_data(40, &[], extra), difficulty, GameContext::in_memory())
    }

    fn forest() -> LevelController {
        build(
            LevelData::forest().unwrap(),
            Difficulty::Normal,
            GameContext::in_memory(),
        )
    }

    fn run_secs(level: &mut LevelController, secs: f32, input: &InputState) -> Vec<LevelEvent> {
        let frames = (secs / FRAME).round() as usize;
        run_level_ticks(level, frames, FRAME, input)
    }

    fn round_ends(events: &[LevelEvent]) -> Vec<(RoundResult, u64, bool)> {
        events
            .iter()
            .filter_map(|e| match e {
                LevelEvent::RoundEnded {
                    result,
                    score,
                    new_high_score,
                } => Some((result.clone(), *score, *new_high_score)),
                _ => None,
            })
            .collect()
    }

    fn teleport(level: &mut LevelController, x: f32) {
        level.state.player.body.set_center(Vec2::new(x, STAND_Y));
    }

    #[test]
    fn forest_builds_every_entity() {
        let level = forest();
        let s = level.state();
        assert_eq!(s.mushrooms.len(), 3);
        assert_eq!(s.saws.len(), 2);
        assert_eq!(s.flyers.len(), 2);
        assert_eq!(s.cherries.len(), 6);
        assert_eq!(s.spikes.len(), 4);
        assert_eq!(s.player.lives, 2, "normal difficulty");
        assert_eq!(s.round.time_remaining, 300);
        assert_eq!(
            level.registry.rule_names(),
            vec!["terrain", "flyer", "hazard", "saw", "enemy", "cherry", "trophy"]
        );
        assert_eq!(level.world(), Rect::new(0.0, 0.0, 1280.0, 384.0));
        assert_eq!(level.world_bottom(), 432.0);
    }

    #[test]
    fn unknown_background_theme_fails_construction() {
        let mut config = LevelConfig::default();
        config.background.theme = "Desert".to_string();
        let err = LevelController::new(
            arena_data(40, &[], vec![]),
            config,
            Difficulty::Easy,
            GameContext::in_memory(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Feature DesertBackgroundManager has not been implemented yet."
        );
    }

    #[test]
    fn lives_follow_difficulty() {
        assert_eq!(arena(Difficulty::Easy, vec![]).state.player.lives, 3);
        assert_eq!(arena(Difficulty::Normal, vec![]).state.player.lives, 2);
        assert_eq!(arena(Difficulty::Hard, vec![]).state.player.lives, 1);
    }

    #[test]
    fn player_settles_on_the_floor() {
        let mut level = arena(Difficulty::Easy, vec![]);
        run_secs(&mut level, 0.5, &idle_input());
        let player = &level.state.player;
        assert!((player.body.bounds().bottom() - FLOOR_Y).abs() < 0.5);
        assert!(player.body.blocked.has(Side::Down));
    }

    #[test]
    fn jump_is_edge_triggered_and_capped() {
        let mut level = arena(Difficulty::Easy, vec![]);
        run_secs(&mut level, 0.2, &idle_input());

        let events = level.update(FRAME, &InputState::jump());
        assert!(events.contains(&LevelEvent::Sound(SoundCue::Jump)));
        assert_eq!(level.state.player.jump_count, 1);

        // Holding the key does not jump again.
        let held = run_level_ticks(&mut level, 5, FRAME, &InputState::jump());
        assert!(held.is_empty());
        assert_eq!(level.state.player.jump_count, 1);

        level.update(FRAME, &idle_input());
        level.update(FRAME, &InputState::jump());
        assert_eq!(level.state.player.jump_count, 2);
        level.update(FRAME, &idle_input());
        let third = level.update(FRAME, &InputState::jump());
        assert!(third.is_empty(), "no third jump in the air");
        assert_eq!(level.state.player.jump_count, 2);
    }

    #[test]
    fn wall_blocks_horizontal_movement() {
        let mut level = build(
            arena_data(40, &[4], vec![]),
            Difficulty::Easy,
            GameContext::in_memory(),
        );
        for _ in 0..60 {
            level.update(FRAME, &InputState::right());
            assert!(level.state.player.body.bounds().right() <= 64.0 + 1e-3);
        }
    }

    #[test]
    fn background_follows_input() {
        let mut level = arena(Difficulty::Easy, vec![]);
        level.update(FRAME, &InputState::right());
        let ground = &level.background().layers()[2];
        assert!(ground.tile_position_x > 0.0);

        let mut idle = arena(Difficulty::Easy, vec![]);
        idle.update(FRAME, &idle_input());
        let layers = idle.background().layers();
        assert!(layers[0].tile_position_x > 0.0, "clouds drift while idle");
        assert_eq!(layers[2].tile_position_x, 0.0);
    }

    // Hazard hit, invulnerability window, hit inside the window ignored.
    #[test]
    fn hazard_hit_starts_invulnerability_window() {
        let saw = obj("start_1", ObjectKind::Saw, 65.0, STAND_Y);
        let mut level = arena(Difficulty::Easy, vec![saw]);

        let events = level.update(FRAME, &idle_input());
        assert!(events.contains(&LevelEvent::LivesChanged(2)));
        assert!(events.contains(&LevelEvent::Sound(SoundCue::Hit)));
        assert!(level.state.player.invulnerable);
        for rule in DAMAGE_RULES {
            assert!(!level.registry.is_active(rule), "{rule} suspended");
        }

        run_secs(&mut level, 0.5, &idle_input());
        teleport(&mut level, 65.0);
        let inside = run_secs(&mut level, 0.5, &idle_input());
        assert!(!inside.contains(&LevelEvent::LivesChanged(1)));
        assert_eq!(level.state.player.lives, 2);
        assert!(level.state.player.invulnerable);

        teleport(&mut level, 20.0);
        run_secs(&mut level, 1.0, &idle_input());
        assert!(!level.state.player.invulnerable);
        assert!(level.state.player.visible);
        assert_eq!(level.state.player.lives, 2);
        for rule in DAMAGE_RULES {
            assert!(level.registry.is_active(rule), "{rule} resumed");
        }
    }

    // Three spaced hits lose the round exactly once.
    #[test]
    fn spaced_hits_lose_the_round_once() {
        let saw = obj("start_1", ObjectKind::Saw, 200.0, STAND_Y);
        let mut level = arena(Difficulty::Easy, vec![saw]);

        for expected in [2, 1] {
            teleport(&mut level, 200.0);
            let events = level.update(FRAME, &idle_input());
            assert!(events.contains(&LevelEvent::LivesChanged(expected)));
            teleport(&mut level, 40.0);
            run_secs(&mut level, 2.0, &idle_input());
            assert!(!level.state.player.invulnerable);
            assert_eq!(level.phase(), RoundPhase::Running);
        }

        teleport(&mut level, 200.0);
        let events = level.update(FRAME, &idle_input());
        assert!(events.contains(&LevelEvent::LivesChanged(0)));
        assert!(events.contains(&LevelEvent::Sound(SoundCue::Lose)));
        let ends = round_ends(&events);
        assert_eq!(ends.len(), 1);
        let (result, score, new_high) = &ends[0];
        assert_eq!(result.outcome, RoundOutcome::Lost);
        assert_eq!(result.lives, 0);
        assert_eq!(*score, 0);
        assert!(!new_high);
        assert_eq!(level.phase(), RoundPhase::Lost);
        assert!(level.state.player.is_dead());

        let clock = level.state.round.time_remaining;
        let elapsed = level.state.round.elapsed;
        assert!(run_secs(&mut level, 2.0, &idle_input()).is_empty());
        assert_eq!(level.state.round.time_remaining, clock);
        assert_eq!(level.state.round.elapsed, elapsed);

        level.hurt_player();
        assert!(level.pending.is_empty());
        assert_eq!(level.state.player.lives, 0);
    }

    // Trophy overlap wins once and submits the score once.
    #[test]
    fn trophy_wins_once() {
        let mut level = arena(Difficulty::Easy, vec![]);
        teleport(&mut level, 600.0);
        let events = level.update(FRAME, &idle_input());
        assert!(events.contains(&LevelEvent::Sound(SoundCue::Win)));

        let ends = round_ends(&events);
        assert_eq!(ends.len(), 1);
        let (result, score, new_high) = &ends[0];
        assert_eq!(result.outcome, RoundOutcome::Won);
        assert_eq!(result.lives, 3);
        // 3 * 200 + 300 * 5, easy multiplier 1.0.
        assert_eq!(*score, 2100);
        assert!(new_high);
        assert_eq!(level.context().store.high_score(), 2100);
        assert_eq!(level.round_result().as_ref(), Some(result));
        assert_eq!(level.state.trophy.animation(), "trophy-hit");
        assert!(level.registry.is_detached("trophy", EntityId::TROPHY));
        assert!(level.state.trophy.is_active(), "trophy stays visible");

        assert!(!level.win());
        assert!(level.pending.is_empty());
        assert!(run_secs(&mut level, 1.0, &idle_input()).is_empty());
        assert_eq!(level.context().store.high_score(), 2100);
    }

    #[test]
    fn lower_score_keeps_the_high_score() {
        let mut store = MemoryStore::default();
        store.set_high_score(5000).unwrap();
        let context = GameContext::new(GameSettings::default(), Box::new(store));
        let mut level = build(arena_data(40, &[], vec![]), Difficulty::Easy, context);
        teleport(&mut level, 600.0);
        let ends = round_ends(&level.update(FRAME, &idle_input()));
        assert_eq!(ends.len(), 1);
        assert!(!ends[0].2);
        assert_eq!(level.context().store.high_score(), 5000);
    }

    #[test]
    fn muted_settings_suppress_cues() {
        let settings = GameSettings {
            sfx: false,
            bgm: false,
        };
        let context = GameContext::new(settings, Box::new(MemoryStore::default()));
        let mut level = build(arena_data(40, &[], vec![]), Difficulty::Easy, context);
        assert!(level.pause().is_empty());
        assert_eq!(level.phase(), RoundPhase::Paused);
        assert!(level.resume().is_empty());

        teleport(&mut level, 600.0);
        let events = level.update(FRAME, &idle_input());
        assert!(!events.iter().any(|e| matches!(e, LevelEvent::Sound(_))));
        assert_eq!(round_ends(&events).len(), 1);
    }

    #[test]
    fn stomp_kills_mushroom_without_damage() {
        let mushroom = obj("start_1", ObjectKind::Mushroom, 200.0, 166.0);
        let mut level = arena(Difficulty::Normal, vec![mushroom]);
        level.state.player.body.set_center(Vec2::new(200.0, 140.0));

        let events = run_secs(&mut level, 0.3, &idle_input());
        assert!(events.contains(&LevelEvent::Sound(SoundCue::Stomp)));
        assert!(!events.iter().any(|e| matches!(e, LevelEvent::LivesChanged(_))));
        assert_eq!(level.state.player.lives, 2);
        assert_eq!(level.state.mushrooms[0].state, MushroomState::Hit);
        assert!(
            level
                .registry
                .is_detached("enemy", EntityId::new(EntityKind::Mushroom, 0))
        );

        // The stomped mushroom falls out of the world.
        run_secs(&mut level, 2.0, &idle_input());
        let mushroom = &level.state.mushrooms[0];
        assert_eq!(mushroom.state, MushroomState::Dead);
        assert!(!mushroom.is_active());
        assert_eq!(level.state.player.lives, 2);
    }

    #[test]
    fn walking_into_mushroom_hurts() {
        let mushroom = obj("start_1", ObjectKind::Mushroom, 200.0, 166.0);
        let mut level = arena(Difficulty::Normal, vec![mushroom]);
        teleport(&mut level, 150.0);

        let events = run_secs(&mut level, 1.0, &InputState::right());
        assert!(events.contains(&LevelEvent::LivesChanged(1)));
        assert!(!events.contains(&LevelEvent::Sound(SoundCue::Stomp)));
        assert!(level.state.mushrooms[0].is_alive());
        assert!(level.state.player.invulnerable);
    }

    #[test]
    fn cherry_counts_once_then_fades() {
        let cherry = obj("cherry", ObjectKind::Cherry, 45.0, STAND_Y);
        let mut level = arena(Difficulty::Easy, vec![cherry]);

        let events = level.update(FRAME, &idle_input());
        assert!(events.contains(&LevelEvent::CherryCollected(1)));
        assert!(events.contains(&LevelEvent::Sound(SoundCue::Collect)));

        let later = run_secs(&mut level, 0.5, &idle_input());
        assert!(!later.iter().any(|e| matches!(e, LevelEvent::CherryCollected(_))));
        assert_eq!(level.state.round.cherries_collected, 1);
        assert!(!level.state.cherries[0].is_active(), "faded out");
    }

    #[test]
    fn standing_on_flyer_drops_it() {
        let flyer = obj("flyer", ObjectKind::Flyer, 200.0, 150.0);
        let mut level = arena(Difficulty::Easy, vec![flyer]);
        level.state.player.body.set_center(Vec2::new(200.0, 120.0));

        run_secs(&mut level, 0.5, &idle_input());
        assert_eq!(level.state.flyers[0].state, FlyerState::Dropping);
        assert!(level.state.flyers[0].is_drop_pending());

        run_secs(&mut level, 1.0, &idle_input());
        assert_eq!(level.state.flyers[0].state, FlyerState::Dropped);

        run_secs(&mut level, 2.0, &idle_input());
        assert!(!level.state.flyers[0].is_active(), "fell out of the world");
    }

    #[test]
    fn deactivating_flyer_cancels_its_drop() {
        let flyer = obj("flyer", ObjectKind::Flyer, 200.0, 150.0);
        let mut level = arena(Difficulty::Easy, vec![flyer]);
        level.state.player.body.set_center(Vec2::new(200.0, 120.0));

        run_secs(&mut level, 0.5, &idle_input());
        assert_eq!(level.pending_timers(), 1);
        level.deactivate_entity(EntityId::new(EntityKind::Flyer, 0));
        assert_eq!(level.pending_timers(), 0);

        run_secs(&mut level, 1.5, &idle_input());
        assert_eq!(level.state.flyers[0].state, FlyerState::Dropping);
    }

    // Culled patrols hold still and resume from the same phase.
    #[test]
    fn culled_patrol_freezes_and_resumes() {
        let extra = vec![
            obj("start_1", ObjectKind::Mushroom, 1500.0, 166.0),
            obj("end_1", ObjectKind::Mushroom, 1600.0, 166.0),
        ];
        let mut level = build(
            arena_data(200, &[], extra),
            Difficulty::Easy,
            GameContext::in_memory(),
        );
        let start = level.state.mushrooms[0].body.position;

        run_secs(&mut level, 1.0, &idle_input());
        let m = &level.state.mushrooms[0];
        assert_eq!(m.state, MushroomState::Idle);
        assert_eq!(m.body.position, start);

        teleport(&mut level, 1400.0);
        run_secs(&mut level, 1.0, &idle_input());
        let m = &level.state.mushrooms[0];
        assert_eq!(m.state, MushroomState::Patrolling);
        assert_ne!(m.body.position, start);

        teleport(&mut level, 40.0);
        level.update(FRAME, &idle_input());
        let paused_at = level.state.mushrooms[0].body.position;
        let phase = level.state.mushrooms[0].route.as_ref().unwrap().phase;
        run_secs(&mut level, 2.0, &idle_input());
        let m = &level.state.mushrooms[0];
        assert_eq!(m.state, MushroomState::Idle);
        assert_eq!(m.body.position, paused_at);
        assert_eq!(m.route.as_ref().unwrap().phase, phase);

        teleport(&mut level, 1400.0);
        level.update(FRAME, &idle_input());
        let resumed = level.state.mushrooms[0].route.as_ref().unwrap().phase;
        assert!(resumed > phase && resumed < phase + 0.1);
    }

    #[test]
    fn pause_freezes_timers() {
        let mut level = arena(Difficulty::Easy, vec![]);
        level.hurt_player();
        assert!(level.state.player.invulnerable);

        assert_eq!(level.pause(), vec![LevelEvent::Music(MusicCue::Pause)]);
        assert!(level.pause().is_empty());
        assert!(level.update(5.0, &idle_input()).is_empty());
        assert!(level.state.player.invulnerable);

        assert_eq!(level.resume(), vec![LevelEvent::Music(MusicCue::Resume)]);
        assert!(level.resume().is_empty());
        run_secs(&mut level, 2.0, &idle_input());
        assert!(!level.state.player.invulnerable);
    }

    #[test]
    fn long_frame_is_substepped() {
        let mut level = arena(Difficulty::Easy, vec![]);
        level.update(1.5, &idle_input());
        let bottom = level.state.player.body.bounds().bottom();
        assert!((bottom - FLOOR_Y).abs() < 0.5, "did not tunnel through the floor");
        assert_eq!(level.state.round.time_remaining, 299);
    }

    #[test]
    fn invalid_dt_is_ignored() {
        let mut level = arena(Difficulty::Easy, vec![]);
        let before = level.serialize_state();
        for dt in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(level.update(dt, &InputState::right()).is_empty());
        }
        assert_eq!(before, level.serialize_state());
    }

    #[test]
    fn falling_out_of_the_world_loses() {
        let mut level = arena(Difficulty::Easy, vec![]);
        level.state.player.body.position.y = level.world_bottom() + 1.0;
        let events = level.update(FRAME, &idle_input());
        assert!(!events.iter().any(|e| matches!(e, LevelEvent::LivesChanged(_))));
        let ends = round_ends(&events);
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0].0.outcome, RoundOutcome::Lost);
    }

    #[test]
    fn teardown_releases_everything() {
        let mut level = forest();
        level.hurt_player();
        assert!(level.pending_timers() > 0);

        level.teardown();
        assert!(level.registry.is_empty());
        assert_eq!(level.pending_timers(), 0);
        assert!(level.state.mushrooms.iter().all(|m| !m.is_active()));
        assert!(level.state.cherries.iter().all(|c| !c.is_active()));
        assert!(!level.state.trophy.is_active());
        assert!(level.update(FRAME, &InputState::right()).is_empty());
        assert!(level.pause().is_empty());
        level.teardown();
    }

    // ================================================================
    // Level Trait Contract Tests
    // ================================================================

    #[test]
    fn contract_update_advances_clock() {
        let mut level = forest();
        cherrytrail_core::test_helpers::contract_update_advances_clock(&mut level);
    }

    #[test]
    fn contract_pause_freezes_state() {
        let mut level = forest();
        cherrytrail_core::test_helpers::contract_pause_freezes_state(&mut level);
    }

    #[test]
    fn contract_double_pause_single_resume() {
        let mut level = forest();
        cherrytrail_core::test_helpers::contract_double_pause_single_resume(&mut level);
    }

    #[test]
    fn contract_state_roundtrip_preserves() {
        let mut level = forest();
        level.update(0.5, &InputState::right());
        cherrytrail_core::test_helpers::contract_state_roundtrip_preserves(&mut level);
    }

    #[test]
    fn applied_snapshot_restarts_the_invulnerability_window() {
        let saw = obj("start_1", ObjectKind::Saw, 65.0, STAND_Y);
        let mut level = arena(Difficulty::Easy, vec![saw]);
        level.update(FRAME, &idle_input());
        assert!(level.state.player.invulnerable);
        let snapshot = level.serialize_state();

        teleport(&mut level, 20.0);
        run_secs(&mut level, 3.0, &idle_input());
        assert!(!level.state.player.invulnerable);
        assert_eq!(level.pending_timers(), 0);

        level.apply_state(&snapshot);
        assert!(level.state.player.invulnerable);
        assert!(level.pending_timers() > 0, "window end rescheduled");
        for rule in DAMAGE_RULES {
            assert!(!level.registry.is_active(rule), "{rule} suspended");
        }

        teleport(&mut level, 20.0);
        run_secs(&mut level, 3.0, &idle_input());
        assert!(!level.state.player.invulnerable);
        assert!(level.state.player.visible);
        for rule in DAMAGE_RULES {
            assert!(level.registry.is_active(rule), "{rule} resumed");
        }

        let lives = level.state.player.lives;
        level.hurt_player();
        assert_eq!(level.state.player.lives, lives - 1);
    }

    #[test]
    fn applied_snapshot_restores_pending_continuations() {
        let mut level = forest();
        level.state.flyers[0].schedule_drop(&mut level.timers, &level.config.flyer);
        level.state.cherries[0].collect(&mut level.timers, &level.config.cherry);
        let snapshot = level.serialize_state();

        level.timers.clear();
        level.apply_state(&snapshot);
        assert_eq!(level.pending_timers(), 2);
        assert!(level.state.flyers[0].is_drop_pending());
        assert!(level.registry.is_detached("cherry", level.state.cherries[0].id()));
        for rule in DAMAGE_RULES {
            assert!(level.registry.is_active(rule));
        }

        run_secs(&mut level, 1.5, &idle_input());
        assert_eq!(level.state.flyers[0].state, FlyerState::Dropped);
        assert!(!level.state.cherries[0].is_active());
    }

    #[test]
    fn applied_snapshot_of_a_finished_round_keeps_timers_paused() {
        let mut level = arena(Difficulty::Easy, vec![]);
        teleport(&mut level, 600.0);
        level.update(FRAME, &idle_input());
        assert_eq!(level.phase(), RoundPhase::Won);
        let snapshot = level.serialize_state();
        level.apply_state(&snapshot);
        assert_eq!(level.phase(), RoundPhase::Won);
        assert!(level.registry.is_detached("trophy", EntityId::TROPHY));
        assert!(run_secs(&mut level, 1.0, &idle_input()).is_empty());
    }

    #[test]
    fn contract_round_eventually_ends() {
        let mut level = arena(Difficulty::Normal, vec![]);
        cherrytrail_core::test_helpers::contract_round_eventually_ends(
            &mut level,
            &InputState::right(),
            600,
        );
        assert_eq!(level.phase(), RoundPhase::Won);
    }

    #[test]
    fn contract_terminal_round_is_frozen() {
        let mut level = arena(Difficulty::Normal, vec![]);
        teleport(&mut level, 600.0);
        level.update(FRAME, &idle_input());
        cherrytrail_core::test_helpers::contract_terminal_round_is_frozen(&mut level);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn hits_inside_the_window_cost_one_life(
                gaps in proptest::collection::vec(0.01f32..0.1, 1..12)
            ) {
                let mut level = arena(Difficulty::Easy, vec![]);
                level.hurt_player();
                for gap in gaps {
                    level.update(gap, &idle_input());
                    level.hurt_player();
                }
                prop_assert_eq!(level.state.player.lives, 2);
                prop_assert!(level.state.player.invulnerable);
            }

            #[test]
            fn clock_never_runs_backwards(
                frames in proptest::collection::vec(0.001f32..0.5, 1..40)
            ) {
                let mut level = arena(Difficulty::Easy, vec![]);
                let mut last = level.state.round.time_remaining;
                for dt in frames {
                    level.update(dt, &idle_input());
                    let now = level.state.round.time_remaining;
                    prop_assert!(now <= last);
                    last = now;
                }
            }
        }
    }
}
