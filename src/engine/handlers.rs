//! Execution of the twelve AI verbs. Each handler replies `ok`/`ko`/payload
//! to its invoker and mirrors every mutation to the GUI; all effects of one
//! handler are queued before the next handler runs.

use std::f64::consts::PI;
use std::time::Instant;

use rand::thread_rng;

use super::command::{CommandEntry, Verb};
use super::config::{ELEVATION_REQS, MAX_LEVEL, MAX_RESPONSE_SIZE};
use super::game::Game;
use super::gui::GuiEvent;
use super::player::{Direction, PlayerId, PlayerState};
use super::resources::Resource;
use super::world::World;

impl Game {
    /// Dispatch a dequeued command to its handler. Verb durations were
    /// already billed by the scheduler.
    pub(crate) fn execute_command(&mut self, id: PlayerId, entry: CommandEntry) {
        match entry.verb {
            Verb::Forward => self.cmd_forward(id),
            Verb::Right => self.cmd_turn(id, true),
            Verb::Left => self.cmd_turn(id, false),
            Verb::Look => self.cmd_look(id),
            Verb::Inventory => self.cmd_inventory(id),
            Verb::Broadcast => self.cmd_broadcast(id, &entry.arg),
            Verb::ConnectNbr => self.cmd_connect_nbr(id),
            Verb::Fork => self.cmd_fork(id),
            Verb::Eject => self.cmd_eject(id),
            Verb::Take => self.cmd_take(id, &entry.arg),
            Verb::Set => self.cmd_set(id, &entry.arg),
            Verb::Incantation => self.complete_incantation(id),
        }
    }

    // --- Movement ---

    fn cmd_forward(&mut self, id: PlayerId) {
        let (width, height) = (self.world.width, self.world.height);
        let Some(player) = self.player_mut(id) else {
            return;
        };
        let (dx, dy) = player.direction.delta();
        let (x, y) = ((player.x + dx).rem_euclid(width), (player.y + dy).rem_euclid(height));
        player.x = x;
        player.y = y;
        self.send_ai(id, "ok");
        self.emit_position(id);
    }

    fn cmd_turn(&mut self, id: PlayerId, clockwise: bool) {
        let Some(player) = self.player_mut(id) else {
            return;
        };
        player.direction = if clockwise {
            player.direction.turn_right()
        } else {
            player.direction.turn_left()
        };
        self.send_ai(id, "ok");
        self.emit_position(id);
    }

    fn emit_position(&mut self, id: PlayerId) {
        if let Some(p) = self.player(id) {
            let ev = GuiEvent::Position {
                id,
                x: p.x,
                y: p.y,
                orientation: p.direction.gui_code(),
            };
            self.emit(ev);
        }
    }

    // --- Vision ---

    /// The vision cone: rows 0..=level, row k spanning offsets -k..=k along
    /// the viewer's right axis (left to right from the viewer's seat), for
    /// `(level + 1)^2` tiles total. Each tile lists one `player` token per
    /// alive player, then one token per resource unit.
    fn cmd_look(&mut self, id: PlayerId) {
        let Some(player) = self.player(id) else {
            return;
        };
        let (px, py, dir, level) = (player.x, player.y, player.direction, player.level);
        let (fx, fy) = dir.delta();
        let (rx, ry) = dir.right_delta();

        let mut response = String::from("[");
        let mut first = true;
        for row in 0..=i32::from(level) {
            for side in -row..=row {
                let (x, y) = self
                    .world
                    .wrap(px + fx * row + rx * side, py + fy * row + ry * side);
                if !first {
                    response.push(',');
                }
                first = false;
                let mut empty = true;
                for _ in 0..self.alive_ids_at(x, y).len() {
                    if !empty {
                        response.push(' ');
                    }
                    response.push_str("player");
                    empty = false;
                }
                let tile = self.world.tile(x, y);
                for kind in Resource::ALL {
                    for _ in 0..tile.get(kind) {
                        if !empty {
                            response.push(' ');
                        }
                        response.push_str(kind.name());
                        empty = false;
                    }
                }
                if response.len() > MAX_RESPONSE_SIZE {
                    tracing::warn!(id, "look response overflow");
                    self.send_ai(id, "ko");
                    return;
                }
            }
        }
        response.push(']');
        self.send_ai(id, response);
    }

    fn cmd_inventory(&mut self, id: PlayerId) {
        let Some(player) = self.player(id) else {
            return;
        };
        let slots = player.inventory.slots();
        let body: Vec<String> = Resource::ALL
            .iter()
            .map(|kind| format!("{} {}", kind.name(), slots[kind.index()]))
            .collect();
        self.send_ai(id, format!("[{}]", body.join(", ")));
    }

    // --- Sound ---

    fn cmd_broadcast(&mut self, id: PlayerId, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.send_ai(id, "ko");
            return;
        }
        let Some(sender) = self.player(id) else {
            return;
        };
        let (sx, sy) = (sender.x, sender.y);
        let receivers: Vec<(PlayerId, i32, i32, Direction)> = self
            .teams
            .iter()
            .flat_map(|t| t.players.iter())
            .filter(|p| p.is_alive() && p.id != id)
            .map(|p| (p.id, p.x, p.y, p.direction))
            .collect();
        for (rid, rx, ry, rdir) in receivers {
            let k = broadcast_direction(&self.world, rx, ry, rdir, sx, sy);
            self.send_ai(rid, format!("message {k}, {text}"));
        }
        self.send_ai(id, "ok");
        self.emit(GuiEvent::Broadcast {
            id,
            text: text.to_string(),
        });
    }

    fn cmd_connect_nbr(&mut self, id: PlayerId) {
        let Some(team_idx) = self.team_index_of(id) else {
            return;
        };
        let slots = self.teams[team_idx].free_slots();
        self.send_ai(id, slots.to_string());
    }

    // --- Reproduction ---

    fn cmd_fork(&mut self, id: PlayerId) {
        let egg_id = self.fresh_id();
        let Some(team_idx) = self.team_index_of(id) else {
            return;
        };
        let Some(parent) = self.player(id) else {
            return;
        };
        let (x, y) = (parent.x, parent.y);
        let egg = super::player::Player::egg(egg_id, x, y, Direction::random(&mut thread_rng()));
        self.teams[team_idx].players.push(egg);
        tracing::debug!(parent = id, egg = egg_id, x, y, "egg laid");
        self.send_ai(id, "ok");
        self.emit(GuiEvent::Fork { id });
        self.emit(GuiEvent::NewEgg {
            egg: egg_id,
            parent: id,
            x,
            y,
        });
    }

    // --- Expulsion ---

    fn cmd_eject(&mut self, id: PlayerId) {
        let Some(ejector) = self.player(id) else {
            return;
        };
        let (x, y, dir) = (ejector.x, ejector.y, ejector.direction);
        let (dx, dy) = dir.delta();
        let (tx, ty) = self.world.wrap(x + dx, y + dy);

        let victims: Vec<PlayerId> = self
            .alive_ids_at(x, y)
            .into_iter()
            .filter(|&v| v != id)
            .collect();
        let eggs: Vec<PlayerId> = self
            .teams
            .iter()
            .flat_map(|t| t.players.iter())
            .filter(|p| p.state == PlayerState::Egg && p.is_at(x, y))
            .map(|p| p.id)
            .collect();
        if victims.is_empty() && eggs.is_empty() {
            self.send_ai(id, "ko");
            return;
        }

        self.send_ai(id, "ok");
        self.emit(GuiEvent::Expulsion { id });
        for victim in victims {
            if let Some(p) = self.player_mut(victim) {
                p.x = tx;
                p.y = ty;
            }
            self.emit_position(victim);
        }
        for egg in eggs {
            for team in &mut self.teams {
                team.players.retain(|p| p.id != egg);
            }
            self.emit(GuiEvent::EggDied { egg });
        }
    }

    // --- Object manipulation ---

    fn cmd_take(&mut self, id: PlayerId, arg: &str) {
        let Some(kind) = Resource::from_name(arg.trim()) else {
            self.send_ai(id, "ko");
            return;
        };
        let Some(player) = self.player(id) else {
            return;
        };
        let (x, y) = (player.x, player.y);
        if !self.world.tile_mut(x, y).take_one(kind) {
            self.send_ai(id, "ko");
            return;
        }
        if let Some(p) = self.player_mut(id) {
            p.inventory.add(kind, 1);
        }
        self.send_ai(id, "ok");
        self.emit(GuiEvent::ResourceTake {
            id,
            index: kind.index(),
        });
        self.emit_tile(x, y);
        self.emit_player_inventory(id);
    }

    fn cmd_set(&mut self, id: PlayerId, arg: &str) {
        let Some(kind) = Resource::from_name(arg.trim()) else {
            self.send_ai(id, "ko");
            return;
        };
        let Some(player) = self.player_mut(id) else {
            return;
        };
        let (x, y) = (player.x, player.y);
        if !player.inventory.take_one(kind) {
            self.send_ai(id, "ko");
            return;
        }
        self.world.tile_mut(x, y).add(kind, 1);
        self.send_ai(id, "ok");
        self.emit(GuiEvent::ResourceDrop {
            id,
            index: kind.index(),
        });
        self.emit_tile(x, y);
        self.emit_player_inventory(id);
    }

    fn emit_player_inventory(&mut self, id: PlayerId) {
        if let Some(p) = self.player(id) {
            let ev = GuiEvent::PlayerInventory {
                id,
                x: p.x,
                y: p.y,
                slots: *p.inventory.slots(),
            };
            self.emit(ev);
        }
    }

    // --- Elevation ritual ---

    /// Participants of a ritual at the invoker's tile: every co-located
    /// ALIVE player of the same level, the invoker first.
    fn ritual_participants(&self, id: PlayerId) -> Option<(i32, i32, u8, Vec<PlayerId>)> {
        let invoker = self.alive_player(id)?;
        let (x, y, level) = (invoker.x, invoker.y, invoker.level);
        let mut ids: Vec<PlayerId> = self
            .alive_ids_at(x, y)
            .into_iter()
            .filter(|&p| {
                self.player(p)
                    .map(|q| q.level == level)
                    .unwrap_or(false)
            })
            .collect();
        ids.retain(|&p| p != id);
        ids.insert(0, id);
        Some((x, y, level, ids))
    }

    /// Whether the requirement row for `level` is met at the tile.
    fn elevation_possible(&self, x: i32, y: i32, level: u8, participants: usize) -> bool {
        if level >= MAX_LEVEL {
            return false;
        }
        let reqs = &ELEVATION_REQS[usize::from(level) - 1];
        if (participants as i32) < reqs[0] {
            return false;
        }
        let needed = [0, reqs[1], reqs[2], reqs[3], reqs[4], reqs[5], reqs[6]];
        self.world.tile(x, y).covers(&needed)
    }

    /// Bill the ritual's start: validate the requirement row, then freeze
    /// every other participant while the 300 time-units elapse. A failed
    /// pre-check is answered immediately with no wait and nothing consumed.
    pub(crate) fn start_incantation(&mut self, id: PlayerId, now: Instant) {
        let Some((x, y, level, participants)) = self.ritual_participants(id) else {
            return;
        };
        if !self.elevation_possible(x, y, level, participants.len()) {
            if let Some(p) = self.player_mut(id) {
                p.queue.pop_front();
                p.started = None;
            }
            self.send_ai(id, "ko");
            self.emit(GuiEvent::IncantationEnd { x, y, success: false });
            return;
        }
        if let Some(p) = self.player_mut(id) {
            p.started = Some(now);
        }
        // The invoker stays unlocked: its own in-flight ritual must still
        // reach the completion check.
        for &pid in &participants[1..] {
            if let Some(p) = self.player_mut(pid) {
                p.incantation_locked = true;
            }
        }
        tracing::debug!(id, x, y, level, n = participants.len(), "incantation started");
        for &pid in &participants {
            self.send_ai(pid, "Elevation underway");
        }
        self.emit(GuiEvent::IncantationStart {
            x,
            y,
            level,
            ids: participants,
        });
    }

    /// The 300 time-units elapsed: re-validate (participants may have moved
    /// or died), then consume the tile resources and raise every matching
    /// co-located player one level.
    fn complete_incantation(&mut self, id: PlayerId) {
        let Some((x, y, level, participants)) = self.ritual_participants(id) else {
            return;
        };
        // Release the freeze whatever the outcome.
        for player in self.teams.iter_mut().flat_map(|t| t.players.iter_mut()) {
            if player.is_at(x, y) && player.level == level {
                player.incantation_locked = false;
            }
        }
        if !self.elevation_possible(x, y, level, participants.len()) {
            self.send_ai(id, "ko");
            self.emit(GuiEvent::IncantationEnd { x, y, success: false });
            return;
        }

        let reqs = &ELEVATION_REQS[usize::from(level) - 1];
        let tile = self.world.tile_mut(x, y);
        for (kind, &needed) in Resource::ALL[1..].iter().zip(&reqs[1..]) {
            tile.add(*kind, -needed);
        }

        for &pid in &participants {
            if let Some(p) = self.player_mut(pid) {
                p.level += 1;
            }
            self.send_ai(pid, format!("Current level: {}", level + 1));
        }
        tracing::info!(x, y, to = level + 1, n = participants.len(), "elevation succeeded");
        self.emit(GuiEvent::IncantationEnd { x, y, success: true });
        for &pid in &participants {
            self.emit(GuiEvent::Level {
                id: pid,
                level: level + 1,
            });
        }
        self.emit_tile(x, y);
    }
}

/// The `message K` direction heard by a receiver: 0 on the sender's tile,
/// else the 45-degree sector of the toroidally-minimal bearing towards the
/// sender, in the receiver's frame (1 = front, increasing clockwise).
fn broadcast_direction(
    world: &World,
    rx: i32,
    ry: i32,
    rdir: Direction,
    sx: i32,
    sy: i32,
) -> u8 {
    let dx = World::wrapped_delta(rx, sx, world.width);
    let dy = World::wrapped_delta(ry, sy, world.height);
    if dx == 0 && dy == 0 {
        return 0;
    }
    // Bearing clockwise from north (north is y+1).
    let bearing = (f64::from(dx)).atan2(f64::from(dy));
    let relative = (bearing - rdir.bearing()).rem_euclid(2.0 * PI);
    let sector = (relative / (PI / 4.0)).round() as u32 % 8;
    (sector + 1) as u8
}
