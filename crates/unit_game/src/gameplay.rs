use bevy::input::ButtonInput;
use bevy::prelude::*;
use bevy::time::{Fixed, Time};
use combat_core::{
    BoardPosition, MatchOutcome, Roster, ScenarioConfig, Team, UnitId, UnitRecord, UnitState,
    UnitStats, UnitTemplate,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const DEFAULT_SEED: u64 = 42;
const DEFAULT_FIXED_DELTA: f64 = 1.0 / 30.0;
const DEFAULT_BOARD_SIZE: f32 = 900.0;
const DEFAULT_SQUAD_SIZE: usize = 3;
const MAX_SQUAD_SIZE: usize = 8;
const SLOT_SPACING: f32 = 150.0;
const ENEMY_ROW_Y: f32 = 600.0;
const SPAWN_JITTER: f32 = 20.0;
const HEALTH_ROLL: RangeInclusive<u32> = 80..=120;
/// Board coordinates are offset so the default rows sit around the origin.
const BOARD_CENTER: Vec2 = Vec2::new(300.0, 300.0);

const PLAYER_COLOR: Color = Color::srgb(0.26, 0.65, 0.93);
const ENEMY_COLOR: Color = Color::srgb(0.93, 0.26, 0.28);
const NEUTRAL_COLOR: Color = Color::srgb(0.94, 0.76, 0.16);
const CORPSE_COLOR: Color = Color::srgb(0.3, 0.3, 0.32);

/// Hosts the roster and maps engine callbacks onto the unit hooks.
pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<MatchParams>() {
            app.insert_resource(MatchParams::from_env());
        }
        if !app.world().contains_resource::<BoardSettings>() {
            app.insert_resource(BoardSettings::from_env());
        }
        if app.world().get_resource::<ButtonInput<KeyCode>>().is_none() {
            app.world_mut()
                .insert_resource(ButtonInput::<KeyCode>::default());
        }

        app.init_resource::<SimulationRng>()
            .init_resource::<MatchRoster>()
            .init_resource::<MatchPhase>()
            .add_event::<PhaseRequest>()
            .add_systems(Startup, configure_fixed_time)
            .add_systems(Startup, (setup_board, spawn_lineup.after(setup_board)))
            .add_systems(FixedUpdate, (tick_roster, track_outcome.after(tick_roster)))
            .add_systems(
                Update,
                (
                    begin_play_units,
                    keyboard_phase_requests,
                    apply_phase_requests
                        .after(keyboard_phase_requests)
                        .after(begin_play_units),
                    sync_unit_sprites.after(apply_phase_requests),
                    despawn_collected_units.after(sync_unit_sprites),
                ),
            );
    }
}

#[derive(Resource, Clone, Debug)]
pub struct MatchParams {
    pub seed: u64,
    pub fixed_delta: f64,
}

impl MatchParams {
    pub fn from_env() -> Self {
        let seed = std::env::var("MATCH_SEED")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(DEFAULT_SEED);
        let fixed_delta = std::env::var("MATCH_FIXED_DT")
            .ok()
            .and_then(|val| val.parse().ok())
            .filter(|dt: &f64| *dt > 0.0)
            .unwrap_or(DEFAULT_FIXED_DELTA);
        Self { seed, fixed_delta }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            fixed_delta: DEFAULT_FIXED_DELTA,
        }
    }
}

#[derive(Resource, Clone, Debug)]
pub struct BoardSettings {
    pub board_size: f32,
    /// Units per team in the generated lineup.
    pub squad_size: usize,
    /// When set, the lineup is loaded from this scenario file instead.
    pub scenario: Option<PathBuf>,
}

impl BoardSettings {
    pub fn from_env() -> Self {
        let board_size = std::env::var("BOARD_SIZE")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(DEFAULT_BOARD_SIZE);
        let squad_size = std::env::var("SQUAD_SIZE")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(DEFAULT_SQUAD_SIZE)
            .clamp(1, MAX_SQUAD_SIZE);
        let scenario = std::env::var("SCENARIO_PATH").ok().map(PathBuf::from);
        Self {
            board_size,
            squad_size,
            scenario,
        }
    }
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            squad_size: DEFAULT_SQUAD_SIZE,
            scenario: None,
        }
    }
}

#[derive(Resource, Debug)]
pub struct SimulationRng {
    seed: u64,
    rng: StdRng,
}

impl SimulationRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn gen_range(&mut self, range: RangeInclusive<u32>) -> u32 {
        self.rng.gen_range(range)
    }

    pub fn gen_f32(&mut self, range: RangeInclusive<f32>) -> f32 {
        self.rng.gen_range(range)
    }
}

impl FromWorld for SimulationRng {
    fn from_world(world: &mut World) -> Self {
        let seed = world
            .get_resource::<MatchParams>()
            .cloned()
            .unwrap_or_default()
            .seed;
        Self::new(seed)
    }
}

/// The authoritative unit store. Systems read and mutate units only through it.
#[derive(Resource, Default, Deref, DerefMut)]
pub struct MatchRoster(pub Roster);

/// Engine-side actor for one roster unit.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitActor {
    pub id: UnitId,
}

#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchPhase {
    #[default]
    Planning,
    Combat,
    Finished(MatchOutcome),
}

/// Player or UI intent. Illegal requests are logged and ignored.
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub enum PhaseRequest {
    Place { unit: UnitId, position: BoardPosition },
    Unplace { unit: UnitId },
    StartCombat,
    EndCombat,
    /// Ends any round in progress and benches the whole roster.
    ResetToPrep,
}

pub fn board_to_world(position: BoardPosition) -> Vec2 {
    Vec2::new(position.x, position.y) - BOARD_CENTER
}

fn team_color(team: Team) -> Color {
    match team {
        Team::Player => PLAYER_COLOR,
        Team::Enemy => ENEMY_COLOR,
        Team::Neutral => NEUTRAL_COLOR,
    }
}

fn setup_board(mut commands: Commands, settings: Res<BoardSettings>) {
    commands.spawn((
        Sprite {
            color: Color::srgb(0.09, 0.12, 0.2),
            custom_size: Some(Vec2::splat(settings.board_size)),
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, -0.5),
    ));
}

fn spawn_lineup(
    mut commands: Commands,
    settings: Res<BoardSettings>,
    mut rng: ResMut<SimulationRng>,
    mut roster: ResMut<MatchRoster>,
) {
    if let Some(path) = settings.scenario.as_ref() {
        match load_scenario(path, &mut roster) {
            Ok(count) => {
                info!(target: "unit_game.lineup", path = %path.display(), units = count, "scenario loaded");
                for record in roster.units() {
                    spawn_actor(&mut commands, record);
                }
                return;
            }
            Err(err) => {
                warn!(target: "unit_game.lineup", path = %path.display(), %err, "scenario rejected, using generated lineup");
                roster.0 = Roster::default();
            }
        }
    }

    for (team, row_y) in [(Team::Player, 0.0), (Team::Enemy, ENEMY_ROW_Y)] {
        for slot in 0..settings.squad_size {
            let health = rng.gen_range(HEALTH_ROLL) as f32;
            let template = UnitTemplate::new(
                format!("{} {}", team.label(), slot + 1),
                team,
                UnitStats::default().with_max_health(health),
            );
            let position = BoardPosition::new(
                slot as f32 * SLOT_SPACING + rng.gen_f32(-SPAWN_JITTER..=SPAWN_JITTER),
                row_y + rng.gen_f32(-SPAWN_JITTER..=SPAWN_JITTER),
            );
            let placed = roster
                .spawn(template)
                .and_then(|id| roster.place(id, position).map(|_| id));
            match placed {
                Ok(id) => {
                    if let Some(record) = roster.get(id) {
                        spawn_actor(&mut commands, record);
                    }
                }
                Err(err) => warn!(target: "unit_game.lineup", %err, "failed to spawn unit"),
            }
        }
    }
    info!(target: "unit_game.lineup", seed = rng.seed(), units = roster.len(), "generated lineup");
}

fn load_scenario(
    path: &std::path::Path,
    roster: &mut MatchRoster,
) -> Result<usize, combat_core::ScenarioError> {
    let scenario = ScenarioConfig::from_path(path)?;
    roster.0 = Roster::new(scenario.rules.clone());
    let spawned = scenario.spawn_into(roster)?;
    Ok(spawned.len())
}

fn spawn_actor(commands: &mut Commands, record: &UnitRecord) {
    let world = board_to_world(record.position());
    commands.spawn((
        Sprite {
            color: team_color(record.team()),
            custom_size: Some(Vec2::new(24.0, 32.0)),
            ..default()
        },
        Transform::from_xyz(world.x, world.y, 0.2),
        Name::new(record.name().to_owned()),
        UnitActor { id: record.id() },
    ));
}

/// Activation hook: runs once per actor, the frame after it is spawned.
fn begin_play_units(mut roster: ResMut<MatchRoster>, actors: Query<&UnitActor, Added<UnitActor>>) {
    for actor in actors.iter() {
        if let Err(err) = roster.begin_play(actor.id) {
            warn!(target: "unit_game.lifecycle", unit = %actor.id, %err, "actor has no roster unit");
        }
    }
}

fn tick_roster(time: Res<Time>, mut roster: ResMut<MatchRoster>) {
    roster.tick(time.delta_secs());
}

fn track_outcome(roster: Res<MatchRoster>, mut phase: ResMut<MatchPhase>) {
    if *phase != MatchPhase::Combat {
        return;
    }
    let outcome = roster.outcome();
    if outcome != MatchOutcome::Ongoing {
        info!(target: "unit_game.phase", ?outcome, elapsed = roster.elapsed(), "match decided");
        *phase = MatchPhase::Finished(outcome);
    }
}

fn keyboard_phase_requests(
    keys: Res<ButtonInput<KeyCode>>,
    mut requests: EventWriter<PhaseRequest>,
) {
    if keys.just_pressed(KeyCode::Space) {
        requests.send(PhaseRequest::StartCombat);
    }
    if keys.just_pressed(KeyCode::KeyR) {
        requests.send(PhaseRequest::EndCombat);
    }
    if keys.just_pressed(KeyCode::KeyB) {
        requests.send(PhaseRequest::ResetToPrep);
    }
}

fn apply_phase_requests(
    mut requests: EventReader<PhaseRequest>,
    mut roster: ResMut<MatchRoster>,
    mut phase: ResMut<MatchPhase>,
) {
    for request in requests.read() {
        let result = match *request {
            PhaseRequest::Place { unit, position } => roster.place(unit, position).map(drop),
            PhaseRequest::Unplace { unit } => roster.unplace(unit).map(drop),
            PhaseRequest::StartCombat => {
                if *phase != MatchPhase::Planning {
                    warn!(target: "unit_game.phase", phase = ?*phase, "combat already running");
                    continue;
                }
                let entered = roster.start_combat();
                info!(target: "unit_game.phase", units = entered.len(), "combat started");
                *phase = MatchPhase::Combat;
                Ok(())
            }
            PhaseRequest::EndCombat => {
                if *phase == MatchPhase::Planning {
                    warn!(target: "unit_game.phase", "no combat to end");
                    continue;
                }
                let left = roster.end_combat();
                info!(target: "unit_game.phase", units = left.len(), "combat ended");
                *phase = MatchPhase::Planning;
                Ok(())
            }
            PhaseRequest::ResetToPrep => {
                let changed = roster.full_reset_to_prep();
                info!(target: "unit_game.phase", transitions = changed.len(), "reset to prep");
                *phase = MatchPhase::Planning;
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(target: "unit_game.phase", ?request, %err, "request rejected");
        }
    }
}

fn sync_unit_sprites(
    roster: Res<MatchRoster>,
    mut actors: Query<(&UnitActor, &mut Transform, &mut Sprite, &mut Visibility)>,
) {
    for (actor, mut transform, mut sprite, mut visibility) in actors.iter_mut() {
        let Some(record) = roster.get(actor.id) else {
            continue;
        };
        let world = board_to_world(record.position());
        transform.translation.x = world.x;
        transform.translation.y = world.y;
        *visibility = if record.state() == UnitState::Bench || record.is_hidden() {
            Visibility::Hidden
        } else {
            Visibility::Inherited
        };
        sprite.color = if record.state() == UnitState::Removed {
            CORPSE_COLOR
        } else {
            let fraction = record.current_health() / record.max_health();
            team_color(record.team()).with_alpha(0.35 + 0.65 * fraction)
        };
    }
}

fn despawn_collected_units(
    mut commands: Commands,
    roster: Res<MatchRoster>,
    actors: Query<(Entity, &UnitActor)>,
) {
    for (entity, actor) in actors.iter() {
        if !roster.contains(actor.id) {
            debug!(target: "unit_game.lifecycle", unit = %actor.id, "despawning collected actor");
            commands.entity(entity).despawn_recursive();
        }
    }
}

fn configure_fixed_time(mut fixed_time: ResMut<Time<Fixed>>, params: Res<MatchParams>) {
    fixed_time.set_timestep_seconds(params.fixed_delta);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::time::{TimePlugin, TimeUpdateStrategy};
    use std::time::Duration;

    fn lineup_app(squad_size: usize) -> App {
        let mut app = App::new();
        app.insert_resource(BoardSettings {
            squad_size,
            ..Default::default()
        });
        app.insert_resource(MatchParams::from_seed(DEFAULT_SEED));
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::ZERO));
        app.add_plugins(MinimalPlugins.set(TimePlugin::default()));
        app.add_plugins(GameplayPlugin);
        app.update();
        app
    }

    #[test]
    fn lineup_spawns_one_actor_per_unit() {
        let mut app = lineup_app(2);
        let roster = app.world().resource::<MatchRoster>();
        assert_eq!(roster.len(), 4);
        assert!(roster.units().all(|u| u.state() == UnitState::BoardIdle));
        let world = app.world_mut();
        let actors = world.query::<&UnitActor>().iter(world).count();
        assert_eq!(actors, 4);
    }

    #[test]
    fn phase_requests_start_and_end_combat() {
        let mut app = lineup_app(1);
        app.world_mut().send_event(PhaseRequest::StartCombat);
        app.update();
        assert_eq!(*app.world().resource::<MatchPhase>(), MatchPhase::Combat);
        let roster = app.world().resource::<MatchRoster>();
        assert!(roster.units().all(|u| u.state() == UnitState::Combat));

        app.world_mut().send_event(PhaseRequest::EndCombat);
        app.update();
        assert_eq!(*app.world().resource::<MatchPhase>(), MatchPhase::Planning);
        let roster = app.world().resource::<MatchRoster>();
        assert!(roster.units().all(|u| u.state() == UnitState::BoardIdle));
    }

    #[test]
    fn illegal_place_request_is_ignored() {
        let mut app = lineup_app(1);
        let first = app.world().resource::<MatchRoster>().units().next().unwrap().id();
        app.world_mut().send_event(PhaseRequest::Place {
            unit: first,
            position: BoardPosition::new(0.0, 0.0),
        });
        app.update();
        let roster = app.world().resource::<MatchRoster>();
        assert_eq!(roster.get(first).unwrap().state(), UnitState::BoardIdle);
    }

    fn run_fixed_steps(app: &mut App, steps: usize) {
        for _ in 0..steps {
            {
                let mut time = app.world_mut().resource_mut::<Time>();
                time.advance_by(Duration::from_millis(100));
            }
            app.world_mut().run_schedule(FixedUpdate);
        }
    }

    fn actor_visibility(app: &mut App, id: UnitId) -> Option<Visibility> {
        let world = app.world_mut();
        world
            .query::<(&UnitActor, &Visibility)>()
            .iter(world)
            .find(|(actor, _)| actor.id == id)
            .map(|(_, visibility)| *visibility)
    }

    #[test]
    fn fallen_player_actor_is_hidden_then_revived() {
        let mut app = lineup_app(1);
        app.world_mut().send_event(PhaseRequest::StartCombat);
        app.update();
        let player = {
            let mut roster = app.world_mut().resource_mut::<MatchRoster>();
            let id = roster.units().find(|u| u.team() == Team::Player).unwrap().id();
            roster
                .resolve(id, combat_core::DamageEvent::true_damage(10_000.0))
                .unwrap();
            id
        };
        run_fixed_steps(&mut app, 20);
        app.update();
        assert!(app.world().resource::<MatchRoster>().get(player).unwrap().is_hidden());
        assert_eq!(actor_visibility(&mut app, player), Some(Visibility::Hidden));

        app.world_mut().send_event(PhaseRequest::EndCombat);
        app.update();
        let roster = app.world().resource::<MatchRoster>();
        assert_eq!(roster.get(player).unwrap().state(), UnitState::BoardIdle);
        assert_eq!(actor_visibility(&mut app, player), Some(Visibility::Inherited));
    }

    #[test]
    fn reset_to_prep_benches_everyone() {
        let mut app = lineup_app(1);
        app.world_mut().send_event(PhaseRequest::StartCombat);
        app.update();
        app.world_mut().send_event(PhaseRequest::ResetToPrep);
        app.update();
        assert_eq!(*app.world().resource::<MatchPhase>(), MatchPhase::Planning);
        let roster = app.world().resource::<MatchRoster>();
        assert!(roster.units().all(|u| u.state() == UnitState::Bench));
    }

    #[test]
    fn fixed_ticks_drive_the_fight_to_a_result() {
        let mut app = lineup_app(1);
        app.world_mut().send_event(PhaseRequest::StartCombat);
        app.update();
        run_fixed_steps(&mut app, 600);
        assert!(matches!(
            *app.world().resource::<MatchPhase>(),
            MatchPhase::Finished(_)
        ));
    }
}
