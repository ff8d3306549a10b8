use std::path::PathBuf;

use bracket_random::prelude::RandomNumberGenerator;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use prismforge::{
    Result,
    ai::{
        AbilityId, ArenaPoint, BossAction, BossController, BossId, CombatOutcome, PlayerAction,
        PlayerActionKind, StrategyId,
    },
    config::Tuning,
    data::{Theme, monsters::MonsterTemplate},
    generation::{
        DungeonGenerationParams, DungeonGenerator, GeneratedDungeon, PlayStyle, RoomFeedback,
    },
};

const LOG_MAX_ENTRIES: usize = 12;
const ROUND_MS: i64 = 800;
const ARENA_CENTER: ArenaPoint = ArenaPoint { x: 0.0, y: 0.0 };

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StyleArg {
    Aggressive,
    Defensive,
    Balanced,
    Explorer,
}

impl From<StyleArg> for PlayStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Aggressive => PlayStyle::Aggressive,
            StyleArg::Defensive => PlayStyle::Defensive,
            StyleArg::Balanced => PlayStyle::Balanced,
            StyleArg::Explorer => PlayStyle::Explorer,
        }
    }
}

/// Generate a themed dungeon and play a simulated boss fight against it.
#[derive(Debug, Parser)]
#[command(name = "prismforge", version)]
struct Args {
    /// RNG seed for both generation and the simulated fight.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    #[arg(long, default_value_t = 5)]
    rooms: usize,
    #[arg(long, default_value_t = 5.0)]
    difficulty: f32,
    #[arg(long, default_value_t = 1)]
    level: u32,
    #[arg(long, value_enum, default_value_t = StyleArg::Balanced)]
    style: StyleArg,
    /// Boss rounds to simulate.
    #[arg(long, default_value_t = 24)]
    rounds: u32,
    /// YAML tuning file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the dungeon as JSON instead of ASCII layouts.
    #[arg(long)]
    json: bool,
}

struct Simulation {
    controller: BossController,
    boss: BossId,
    style: PlayStyle,
    rng: RandomNumberGenerator,
    clock: DateTime<Utc>,
    angle: f32,
    message_log: Vec<String>,
}

impl Simulation {
    fn new(
        tuning: &Tuning,
        boss: &MonsterTemplate,
        level: u32,
        style: PlayStyle,
        seed: u64,
    ) -> Self {
        let mut controller = BossController::new(tuning.controller.clone());
        let boss_id = BossId::new(boss.name);
        let stats = boss.scaled(level);
        controller.initialize(boss_id.clone(), stats.max_hp as f32);
        Self {
            controller,
            boss: boss_id,
            style,
            rng: RandomNumberGenerator::seeded(seed),
            clock: Utc::now(),
            angle: 0.0,
            message_log: Vec::new(),
        }
    }

    fn push_log_entry<S: Into<String>>(&mut self, entry: S) {
        self.message_log.insert(0, entry.into());
        self.message_log.truncate(LOG_MAX_ENTRIES);
    }

    /// Where the simulated player stands and what they do this round.
    fn player_turn(&mut self) -> PlayerAction {
        let roll = self.rng.rand::<f32>();
        let (distance, kind) = match self.style {
            PlayStyle::Aggressive => {
                let kind = if roll < 0.7 {
                    PlayerActionKind::Attack
                } else {
                    PlayerActionKind::Move
                };
                (40.0 + self.rng.range(0, 40) as f32, kind)
            }
            PlayStyle::Defensive => {
                let kind = if roll < 0.5 {
                    PlayerActionKind::Dodge
                } else if roll < 0.7 {
                    PlayerActionKind::Heal
                } else {
                    PlayerActionKind::Attack
                };
                (240.0 + self.rng.range(0, 80) as f32, kind)
            }
            PlayStyle::Balanced => {
                let kind = if roll < 0.4 {
                    PlayerActionKind::Attack
                } else if roll < 0.7 {
                    PlayerActionKind::Dodge
                } else {
                    PlayerActionKind::Move
                };
                (90.0 + self.rng.range(0, 140) as f32, kind)
            }
            PlayStyle::Explorer => {
                let kind = if roll < 0.3 {
                    PlayerActionKind::Ability(AbilityId::new("prism_lance"))
                } else {
                    PlayerActionKind::Move
                };
                (200.0, kind)
            }
        };
        self.angle += 0.4;
        let position = ArenaPoint::new(distance * self.angle.cos(), distance * self.angle.sin());
        PlayerAction::new(kind, position, self.clock).with_boss_at(ARENA_CENTER)
    }

    fn play_round(&mut self, round: u32) {
        self.clock += Duration::milliseconds(ROUND_MS);
        let action = self.player_turn();
        self.controller.update_behavior(&self.boss, &action);

        if matches!(
            action.kind,
            PlayerActionKind::Attack | PlayerActionKind::Ability(_)
        ) {
            let damage = self.rng.range(4, 10) as f32;
            if let Some(change) = self.controller.apply_damage(&self.boss, damage) {
                self.push_log_entry(format!(
                    "[{round:02}] {} enters phase {} (from {})",
                    self.boss, change.to, change.from
                ));
            }
        }

        let telegraph = self.clock + Duration::milliseconds(ROUND_MS / 2);
        let (strategy_id, actions) = match self.controller.select_strategy(&self.boss) {
            Some(strategy) => (
                Some(strategy.id),
                self.controller
                    .execute_action_at(&self.boss, strategy, telegraph)
                    .unwrap_or_default(),
            ),
            None => (
                None,
                self.controller
                    .next_actions(&self.boss, telegraph)
                    .unwrap_or_default(),
            ),
        };

        let outcome = self.resolve(&action, &actions);
        let summary = actions
            .iter()
            .map(BossAction::describe)
            .collect::<Vec<_>>()
            .join(", ");
        self.push_log_entry(format!(
            "[{round:02}] {} uses {} -> {}",
            self.boss,
            summary,
            describe_outcome(&outcome)
        ));

        if let Some(id) = strategy_id {
            self.learn(id, &outcome);
        }
    }

    fn resolve(&mut self, action: &PlayerAction, actions: &[BossAction]) -> CombatOutcome {
        let multiplier = self
            .controller
            .difficulty_multiplier(&self.boss)
            .unwrap_or(1.0);
        let dodged =
            matches!(action.kind, PlayerActionKind::Dodge) && self.rng.rand::<f32>() < 0.6;
        let hit_chance = (0.35 + actions.len() as f32 * 0.05) * multiplier;
        let hit = !dodged && self.rng.rand::<f32>() < hit_chance;
        let damage_dealt = if hit {
            self.rng.range(8, 26) as f32 * multiplier
        } else {
            0.0
        };
        CombatOutcome {
            damage_dealt,
            player_hit: hit,
            player_dodged: dodged,
        }
    }

    fn learn(&mut self, id: StrategyId, outcome: &CombatOutcome) {
        if let Some(weight) = self.controller.learn_from_outcome(&self.boss, id, outcome) {
            tracing::debug!(strategy = ?id, weight, "simulated outcome learned");
        }
    }
}

fn describe_outcome(outcome: &CombatOutcome) -> String {
    if outcome.player_dodged {
        "dodged".to_string()
    } else if outcome.player_hit {
        format!("hit for {:.0}", outcome.damage_dealt)
    } else {
        "missed".to_string()
    }
}

fn print_dungeon(dungeon: &GeneratedDungeon) {
    println!(
        "{} | {} rooms | estimated difficulty {:.1} | confidence {:.2}",
        dungeon.theme.as_str(),
        dungeon.rooms.len(),
        dungeon.estimated_difficulty,
        dungeon.ai_confidence
    );
    println!("{}", dungeon.theme.notes());
    for room in &dungeon.rooms {
        println!();
        println!(
            "{} [{}] {}x{} difficulty {:.1} score {:.0} reachable {:.0}%",
            room.id,
            room.kind.as_str(),
            room.layout.width,
            room.layout.height,
            room.difficulty,
            room.ai_score,
            room.connectivity * 100.0
        );
        let mut rows: Vec<Vec<char>> = room
            .layout
            .rows()
            .iter()
            .map(|row| row.chars().collect())
            .collect();
        let mut stamp = |x: i32, y: i32, glyph: char| {
            if let Some(cell) = rows
                .get_mut(y as usize)
                .and_then(|row| row.get_mut(x as usize))
            {
                *cell = glyph;
            }
        };
        for hazard in &room.hazards {
            stamp(hazard.position.x, hazard.position.y, '^');
        }
        for item in &room.items {
            stamp(item.position.x, item.position.y, '!');
        }
        for enemy in &room.enemies {
            stamp(enemy.position.x, enemy.position.y, enemy.glyph);
        }
        for row in rows {
            println!("  {}", row.into_iter().collect::<String>());
        }
        for enemy in &room.enemies {
            println!(
                "  {} ({:?}) hp {} pow {}",
                enemy.name, enemy.behavior, enemy.stats.max_hp, enemy.stats.power
            );
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let tuning = match &args.config {
        Some(path) => Tuning::load(path)?,
        None => Tuning::default(),
    };

    let params = DungeonGenerationParams {
        player_level: args.level,
        play_style: args.style.into(),
        desired_difficulty: args.difficulty,
        ..DungeonGenerationParams::default()
    };
    let mut rng = RandomNumberGenerator::seeded(args.seed);
    let mut generator = DungeonGenerator::new(tuning.generation.clone());
    let dungeon = generator.generate_dungeon(&params, args.rooms, &mut rng);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&dungeon)?);
        return Ok(());
    }
    print_dungeon(&dungeon);

    let theme: Theme = dungeon.theme;
    let boss = MonsterTemplate::boss_for(theme);
    let mut sim = Simulation::new(&tuning, &boss, args.level, params.play_style, args.seed);
    for round in 1..=args.rounds {
        sim.play_round(round);
    }

    println!();
    println!("Encounter log (newest first):");
    for entry in &sim.message_log {
        println!("  {entry}");
    }
    if let Some(insights) = sim.controller.ai_insights(&sim.boss) {
        println!();
        print!("{insights}");
    }

    if let Some(last) = dungeon.rooms.last() {
        let health = sim
            .controller
            .state(&sim.boss)
            .map(|state| state.health_ratio())
            .unwrap_or(1.0);
        generator.learn_from_feedback(
            last.id,
            &RoomFeedback {
                enjoyment: 10.0 * (1.0 - health),
                difficulty: 10.0 * health,
                completed: health <= 0.0,
                time_spent_secs: (args.rounds as i64 * ROUND_MS) as f32 / 1000.0,
            },
        );
        tracing::info!(
            boss_bias = generator.weights().bias(last.kind),
            density = generator.weights().enemy_density,
            "room feedback applied"
        );
    }
    Ok(())
}
