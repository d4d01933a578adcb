use std::collections::VecDeque;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::thread_rng;

use super::clock::Clock;
use super::command::{parse_ai_line, Verb};
use super::config::{AI_QUEUE_CAP, HATCH_FOOD, FOOD_PERIOD};
use super::gui::GuiEvent;
use super::player::{Direction, Player, PlayerId, PlayerState, Team};
use super::resources::Resource;
use super::world::World;

/// Startup parameters, straight from the command line.
#[derive(Clone, Debug)]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    pub frequency: u32,
    pub team_names: Vec<String>,
    pub team_count: u32,
}

/// One outbound wire line produced by the engine, without its terminator.
/// The transport layer routes it to the right socket; GUI lines are dropped
/// when no spectator is bound.
#[derive(Debug)]
pub enum Outbound {
    Ai(PlayerId, String),
    Gui(GuiEvent),
}

/// Successful team handshake.
#[derive(Debug, PartialEq, Eq)]
pub struct JoinOutcome {
    pub id: PlayerId,
    /// Free slots left in the team after this claim.
    pub remaining: usize,
    pub hatched_from_egg: bool,
}

/// The authoritative game state and scheduler. Socket-free: inbound lines
/// are pushed in by the transport, outbound lines accumulate in `outbox`.
///
/// Every deadline compares `Instant`s handed in by the caller, so the engine
/// can be driven headless with fabricated time in tests.
pub struct Game {
    pub clock: Clock,
    pub world: World,
    pub teams: Vec<Team>,
    pub outbox: VecDeque<Outbound>,
    next_id: PlayerId,
    last_regen: Instant,
    winner: Option<String>,
}

impl Game {
    pub fn new(config: &GameConfig, now: Instant) -> Self {
        let mut world = World::new(config.width, config.height);
        world.seed_resources(&mut thread_rng());
        let mut next_id = 0;
        let teams = config
            .team_names
            .iter()
            .map(|name| {
                let mut team = Team::new(name);
                for _ in 0..config.team_count {
                    team.players.push(Player::unused(next_id));
                    next_id += 1;
                }
                team
            })
            .collect();
        Game {
            clock: Clock::new(config.frequency),
            world,
            teams,
            outbox: VecDeque::new(),
            next_id,
            last_regen: now,
            winner: None,
        }
    }

    // --- Roster access ---

    pub fn fresh_id(&mut self) -> PlayerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.teams
            .iter()
            .flat_map(|t| t.players.iter())
            .find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.teams
            .iter_mut()
            .flat_map(|t| t.players.iter_mut())
            .find(|p| p.id == id)
    }

    pub fn alive_player(&self, id: PlayerId) -> Option<&Player> {
        self.player(id).filter(|p| p.is_alive())
    }

    /// Index of the team owning `id`.
    pub fn team_index_of(&self, id: PlayerId) -> Option<usize> {
        self.teams
            .iter()
            .position(|t| t.players.iter().any(|p| p.id == id))
    }

    pub fn team_name_of(&self, id: PlayerId) -> Option<&str> {
        self.team_index_of(id).map(|i| self.teams[i].name.as_str())
    }

    /// Ids of every ALIVE player at the tile, ascending.
    pub fn alive_ids_at(&self, x: i32, y: i32) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .teams
            .iter()
            .flat_map(|t| t.players.iter())
            .filter(|p| p.is_alive() && p.is_at(x, y))
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    // --- Connection lifecycle ---

    /// Bind a new connection to `team_name`. Prefers hatching a random egg
    /// (position preserved); otherwise claims the first UNUSED slot at a
    /// random position. Queues the two handshake reply lines and the GUI
    /// notifications; returns None when the team is unknown or full.
    pub fn join_team(&mut self, team_name: &str, now: Instant) -> Option<JoinOutcome> {
        let team_idx = self.teams.iter().position(|t| t.name == team_name)?;
        let team = &mut self.teams[team_idx];

        let eggs: Vec<usize> = team
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.state == PlayerState::Egg)
            .map(|(i, _)| i)
            .collect();
        let slot_idx = match eggs.choose(&mut thread_rng()) {
            Some(&i) => i,
            None => team
                .players
                .iter()
                .position(|p| p.state == PlayerState::Unused)?,
        };

        let hatched = {
            let slot = &mut team.players[slot_idx];
            let hatched = slot.state == PlayerState::Egg;
            if !hatched {
                let (x, y) = self.world.random_position(&mut thread_rng());
                slot.x = x;
                slot.y = y;
                slot.direction = Direction::North;
            }
            slot.state = PlayerState::Alive;
            slot.level = 1;
            slot.inventory = Default::default();
            slot.inventory.add(Resource::Food, HATCH_FOOD);
            slot.last_meal = Some(now);
            slot.queue.clear();
            slot.started = None;
            slot.incantation_locked = false;
            hatched
        };

        let remaining = self.teams[team_idx].free_slots();
        let player = &self.teams[team_idx].players[slot_idx];
        let (id, x, y, orientation, level) =
            (player.id, player.x, player.y, player.direction.gui_code(), player.level);
        tracing::info!(id, team = team_name, x, y, hatched, "player joined");

        self.send_ai(id, remaining.to_string());
        self.send_ai(id, format!("{} {}", self.world.width, self.world.height));
        if hatched {
            self.emit(GuiEvent::EggHatched { egg: id });
        }
        self.emit(GuiEvent::NewPlayer {
            id,
            x,
            y,
            orientation,
            level,
            team: team_name.to_string(),
        });
        Some(JoinOutcome {
            id,
            remaining,
            hatched_from_egg: hatched,
        })
    }

    /// An AI socket went away: the slot returns to UNUSED under a fresh id
    /// (wire-visible ids are never reused) and its queue is dropped.
    pub fn disconnect(&mut self, id: PlayerId) {
        let fresh = self.fresh_id();
        let Some(player) = self.player_mut(id) else {
            return;
        };
        let was_alive = player.is_alive();
        let at = (player.x, player.y);
        let mid_ritual = was_alive
            && player.started.is_some()
            && player.queue.front().map(|c| c.verb) == Some(Verb::Incantation);
        *player = Player::unused(fresh);
        tracing::info!(id, "player disconnected");
        if mid_ritual {
            self.abort_ritual(at.0, at.1);
        }
        if was_alive {
            self.emit(GuiEvent::Death { id });
        }
    }

    // --- Inbound commands ---

    /// Parse one line from an AI client. Unknown verbs answer `ko`
    /// immediately; a full queue swallows the line.
    pub fn enqueue_ai_line(&mut self, id: PlayerId, line: &str) {
        let Some(entry) = parse_ai_line(line) else {
            tracing::debug!(id, line, "unknown command");
            self.send_ai(id, "ko");
            return;
        };
        let Some(player) = self.player_mut(id) else {
            return;
        };
        if player.queue.len() >= AI_QUEUE_CAP {
            tracing::debug!(id, "command queue full, dropping");
            return;
        }
        player.queue.push_back(entry);
    }

    // --- Scheduler ---

    /// Advance every player's head command: bill a start time when idle,
    /// execute once the duration has elapsed. Players are visited in
    /// ascending id order so cross-client effects are deterministic.
    pub fn drive_commands(&mut self, now: Instant) {
        let mut ids: Vec<PlayerId> = self
            .teams
            .iter()
            .flat_map(|t| t.players.iter())
            .filter(|p| p.is_alive())
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();

        for id in ids {
            let Some(player) = self.player(id) else {
                continue;
            };
            if !player.is_alive() || player.incantation_locked || player.queue.is_empty() {
                continue;
            }
            match player.started {
                None => {
                    let verb = player.queue.front().map(|c| c.verb);
                    if verb == Some(Verb::Incantation) {
                        self.start_incantation(id, now);
                    } else if let Some(p) = self.player_mut(id) {
                        p.started = Some(now);
                    }
                }
                Some(started) => {
                    let verb = player.queue.front().map(|c| c.verb).unwrap_or(Verb::Forward);
                    if now.duration_since(started) >= self.clock.period(verb.duration()) {
                        let entry = {
                            let p = self.player_mut(id).expect("player vanished mid-turn");
                            p.started = None;
                            p.queue.pop_front()
                        };
                        if let Some(entry) = entry {
                            self.execute_command(id, entry);
                        }
                    }
                }
            }
        }
    }

    // --- Housekeeping ---

    pub fn housekeeping(&mut self, now: Instant) {
        self.food_ticks(now);
        self.regen_resources(now);
    }

    /// Every 126 time-units an alive player consumes one food; starving
    /// below zero marks it DEAD for the reaper.
    fn food_ticks(&mut self, now: Instant) {
        let period = self.clock.period(FOOD_PERIOD);
        for player in self.teams.iter_mut().flat_map(|t| t.players.iter_mut()) {
            if !player.is_alive() {
                continue;
            }
            let due = match player.last_meal {
                Some(last) => now.duration_since(last) >= period,
                None => true,
            };
            if due {
                player.inventory.add(Resource::Food, -1);
                player.last_meal = Some(now);
                if player.inventory.get(Resource::Food) < 0 {
                    tracing::info!(id = player.id, "player starved");
                    player.state = PlayerState::Dead;
                }
            }
        }
    }

    /// At most one top-up pass per turn, once 20 time-units have elapsed.
    fn regen_resources(&mut self, now: Instant) {
        if now.duration_since(self.last_regen) < self.clock.period(self.world.regen_period()) {
            return;
        }
        self.last_regen = now;
        let changed = self.world.regen_resources(&mut thread_rng());
        tracing::debug!(tiles = changed.len(), "resources replenished");
        for (x, y) in changed {
            self.emit_tile(x, y);
        }
    }

    // --- Death ---

    /// Remove every DEAD slot: `dead` notice to the client, `pdi` to the
    /// GUI, roster slot dropped (shrinking the team's capacity). Returns the
    /// reaped ids so the transport can close their sockets.
    pub fn reap(&mut self) -> Vec<PlayerId> {
        let mut reaped = Vec::new();
        for team_idx in 0..self.teams.len() {
            loop {
                let dead = self.teams[team_idx]
                    .players
                    .iter()
                    .find(|p| p.state == PlayerState::Dead)
                    .map(|p| {
                        let mid_ritual = p.started.is_some()
                            && p.queue.front().map(|c| c.verb) == Some(Verb::Incantation);
                        (p.id, p.x, p.y, mid_ritual)
                    });
                let Some((id, x, y, mid_ritual)) = dead else {
                    break;
                };
                self.teams[team_idx].players.retain(|p| p.id != id);
                if mid_ritual {
                    self.abort_ritual(x, y);
                }
                self.send_ai(id, "dead");
                self.emit(GuiEvent::Death { id });
                reaped.push(id);
            }
        }
        reaped
    }

    /// The invoker of a ritual vanished: release the frozen participants
    /// and tell the GUI the ritual failed.
    fn abort_ritual(&mut self, x: i32, y: i32) {
        for player in self.teams.iter_mut().flat_map(|t| t.players.iter_mut()) {
            if player.is_at(x, y) {
                player.incantation_locked = false;
            }
        }
        self.emit(GuiEvent::IncantationEnd { x, y, success: false });
    }

    // --- Win condition ---

    /// The game ends as soon as any alive player reaches the maximum level.
    /// Emits `seg` with the winning team once.
    pub fn check_winner(&mut self) -> Option<String> {
        if let Some(team) = &self.winner {
            return Some(team.clone());
        }
        let winner = self.teams.iter().find(|t| {
            t.players
                .iter()
                .any(|p| p.is_alive() && p.level >= super::config::MAX_LEVEL)
        });
        let team = winner?.name.clone();
        tracing::info!(team, "team won the game");
        self.winner = Some(team.clone());
        self.emit(GuiEvent::EndOfGame { team: team.clone() });
        Some(team)
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    // --- Outbox ---

    pub(crate) fn send_ai(&mut self, id: PlayerId, line: impl Into<String>) {
        self.outbox.push_back(Outbound::Ai(id, line.into()));
    }

    /// Drain everything queued for the wire.
    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        self.outbox.drain(..).collect()
    }
}
