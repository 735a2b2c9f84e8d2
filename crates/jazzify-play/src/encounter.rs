use anyhow::Result;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use jazzify_types::{Classification, JudgmentResult, StageDescriptor, Target};

use crate::listener::SessionListener;

/// Extra damage dealt by a perfect hit.
pub const PERFECT_BONUS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enemy {
    pub hp: u32,
    pub max_hp: u32,
    pub defeated: bool,
}

impl Enemy {
    fn new(max_hp: u32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            defeated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    Victory,
    Defeat,
}

/// Judgment counts for the result screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub perfect: u32,
    pub early: u32,
    pub late: u32,
    pub miss: u32,
    pub activated: u32,
    pub damage_dealt: u32,
}

impl Tally {
    pub fn hits(&self) -> u32 {
        self.perfect + self.early + self.late
    }

    fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Perfect => self.perfect += 1,
            Classification::Early => self.early += 1,
            Classification::Late => self.late += 1,
            Classification::Miss => self.miss += 1,
        }
    }
}

/// Enemy-encounter store driven by session callbacks.
///
/// Successes damage the current enemy and advance to the next slot on
/// defeat; failures cost the player one hp.
#[derive(Debug, Clone)]
pub struct Encounter {
    enemies: Vec<Enemy>,
    current: usize,
    player_hp: u32,
    player_max_hp: u32,
    min_damage: u32,
    max_damage: u32,
    tally: Tally,
    completed: bool,
    rng: StdRng,
}

impl Encounter {
    pub fn from_stage(stage: &StageDescriptor, rng: StdRng) -> Self {
        Self {
            enemies: (0..stage.enemy_count)
                .map(|_| Enemy::new(stage.enemy_hp))
                .collect(),
            current: 0,
            player_hp: stage.max_hp,
            player_max_hp: stage.max_hp,
            min_damage: stage.min_damage,
            max_damage: stage.max_damage.max(stage.min_damage),
            tally: Tally::default(),
            completed: false,
            rng,
        }
    }

    pub fn with_seed(stage: &StageDescriptor, seed: u64) -> Self {
        Self::from_stage(stage, StdRng::seed_from_u64(seed))
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// The enemy currently being fought, if any is left.
    pub fn current_enemy(&self) -> Option<&Enemy> {
        self.enemies.get(self.current)
    }

    pub fn player_hp(&self) -> u32 {
        self.player_hp
    }

    pub fn player_max_hp(&self) -> u32 {
        self.player_max_hp
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Whether the session reported completion to this store.
    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn outcome(&self) -> Outcome {
        if self.enemies.iter().all(|e| e.defeated) {
            Outcome::Victory
        } else if self.player_hp == 0 {
            Outcome::Defeat
        } else {
            Outcome::InProgress
        }
    }

    fn roll_damage(&mut self, classification: Classification) -> u32 {
        let base = self.rng.gen_range(self.min_damage..=self.max_damage);
        if classification == Classification::Perfect {
            base + PERFECT_BONUS
        } else {
            base
        }
    }
}

impl SessionListener for Encounter {
    fn on_question_activated(&mut self, _target: &Target) -> Result<()> {
        self.tally.activated += 1;
        Ok(())
    }

    fn on_attack_success(&mut self, target: &Target, judgment: &JudgmentResult) -> Result<()> {
        self.tally.record(judgment.classification);
        if self.outcome() != Outcome::InProgress {
            return Ok(());
        }
        let damage = self.roll_damage(judgment.classification);
        let index = self.current;
        let Some(enemy) = self.enemies.get_mut(index) else {
            return Ok(());
        };
        let dealt = damage.min(enemy.hp);
        enemy.hp -= dealt;
        self.tally.damage_dealt += dealt;
        log::debug!(
            "{} hit enemy {} for {dealt} ({} hp left)",
            target.chord,
            index + 1,
            enemy.hp
        );
        if enemy.hp == 0 {
            enemy.defeated = true;
            log::info!("enemy {} defeated", index + 1);
            self.current += 1;
        }
        Ok(())
    }

    fn on_attack_fail(&mut self, target: &Target) -> Result<()> {
        self.tally.miss += 1;
        if self.outcome() != Outcome::InProgress {
            return Ok(());
        }
        self.player_hp = self.player_hp.saturating_sub(1);
        log::debug!("missed {} ({} hp left)", target.chord, self.player_hp);
        Ok(())
    }

    fn on_game_complete(&mut self) -> Result<()> {
        self.completed = true;
        log::info!("encounter finished: {:?}", self.outcome());
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.outcome() != Outcome::InProgress
    }
}
