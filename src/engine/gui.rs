//! The spectator protocol: asynchronous notifications mirrored on every
//! state mutation, plus the synchronous query verbs.

use std::fmt;

use super::command::GuiQuery;
use super::game::{Game, Outbound};
use super::player::{PlayerId, PlayerState};
use super::resources::RESOURCE_KINDS;

/// One notification line for the GUI. `Display` renders the wire form
/// without the trailing newline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuiEvent {
    MapSize { width: i32, height: i32 },
    TileContent { x: i32, y: i32, slots: [i32; RESOURCE_KINDS] },
    TeamName { name: String },
    NewPlayer { id: PlayerId, x: i32, y: i32, orientation: i32, level: u8, team: String },
    Position { id: PlayerId, x: i32, y: i32, orientation: i32 },
    Level { id: PlayerId, level: u8 },
    PlayerInventory { id: PlayerId, x: i32, y: i32, slots: [i32; RESOURCE_KINDS] },
    Expulsion { id: PlayerId },
    Broadcast { id: PlayerId, text: String },
    IncantationStart { x: i32, y: i32, level: u8, ids: Vec<PlayerId> },
    IncantationEnd { x: i32, y: i32, success: bool },
    Fork { id: PlayerId },
    NewEgg { egg: PlayerId, parent: PlayerId, x: i32, y: i32 },
    EggHatched { egg: PlayerId },
    EggDied { egg: PlayerId },
    ResourceDrop { id: PlayerId, index: usize },
    ResourceTake { id: PlayerId, index: usize },
    Death { id: PlayerId },
    TimeUnit { frequency: u32 },
    TimeUnitChanged { frequency: u32 },
    EndOfGame { team: String },
    ServerMessage { text: String },
    UnknownCommand,
    BadParameters,
}

impl fmt::Display for GuiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuiEvent::MapSize { width, height } => write!(f, "msz {width} {height}"),
            GuiEvent::TileContent { x, y, slots } => {
                write!(f, "bct {x} {y}")?;
                for q in slots {
                    write!(f, " {q}")?;
                }
                Ok(())
            }
            GuiEvent::TeamName { name } => write!(f, "tna {name}"),
            GuiEvent::NewPlayer { id, x, y, orientation, level, team } => {
                write!(f, "pnw #{id} {x} {y} {orientation} {level} {team}")
            }
            GuiEvent::Position { id, x, y, orientation } => {
                write!(f, "ppo #{id} {x} {y} {orientation}")
            }
            GuiEvent::Level { id, level } => write!(f, "plv #{id} {level}"),
            GuiEvent::PlayerInventory { id, x, y, slots } => {
                write!(f, "pin #{id} {x} {y}")?;
                for q in slots {
                    write!(f, " {q}")?;
                }
                Ok(())
            }
            GuiEvent::Expulsion { id } => write!(f, "pex #{id}"),
            GuiEvent::Broadcast { id, text } => write!(f, "pbc #{id} {text}"),
            GuiEvent::IncantationStart { x, y, level, ids } => {
                write!(f, "pic {x} {y} {level}")?;
                for id in ids {
                    write!(f, " #{id}")?;
                }
                Ok(())
            }
            GuiEvent::IncantationEnd { x, y, success } => {
                write!(f, "pie {x} {y} {}", if *success { 1 } else { 0 })
            }
            GuiEvent::Fork { id } => write!(f, "pfk #{id}"),
            GuiEvent::NewEgg { egg, parent, x, y } => write!(f, "enw #{egg} #{parent} {x} {y}"),
            GuiEvent::EggHatched { egg } => write!(f, "ebo #{egg}"),
            GuiEvent::EggDied { egg } => write!(f, "edi #{egg}"),
            GuiEvent::ResourceDrop { id, index } => write!(f, "pdr #{id} {index}"),
            GuiEvent::ResourceTake { id, index } => write!(f, "pgt #{id} {index}"),
            GuiEvent::Death { id } => write!(f, "pdi #{id}"),
            GuiEvent::TimeUnit { frequency } => write!(f, "sgt {frequency}"),
            GuiEvent::TimeUnitChanged { frequency } => write!(f, "sst {frequency}"),
            GuiEvent::EndOfGame { team } => write!(f, "seg {team}"),
            GuiEvent::ServerMessage { text } => write!(f, "smg {text}"),
            GuiEvent::UnknownCommand => write!(f, "suc"),
            GuiEvent::BadParameters => write!(f, "sbp"),
        }
    }
}

impl Game {
    /// The full-state dump sent to a GUI right after its handshake: map
    /// size, every tile, team names, every alive player, every egg, and the
    /// time unit.
    pub fn gui_snapshot(&mut self) {
        self.emit(GuiEvent::MapSize {
            width: self.world.width,
            height: self.world.height,
        });
        for y in 0..self.world.height {
            for x in 0..self.world.width {
                self.emit_tile(x, y);
            }
        }
        let names: Vec<String> = self.teams.iter().map(|t| t.name.clone()).collect();
        for name in names {
            self.emit(GuiEvent::TeamName { name });
        }
        let mut players = Vec::new();
        let mut eggs = Vec::new();
        for team in &self.teams {
            for p in &team.players {
                match p.state {
                    PlayerState::Alive => players.push(GuiEvent::NewPlayer {
                        id: p.id,
                        x: p.x,
                        y: p.y,
                        orientation: p.direction.gui_code(),
                        level: p.level,
                        team: team.name.clone(),
                    }),
                    // The laying parent is gone from the snapshot's point of
                    // view; the egg is announced as its own origin.
                    PlayerState::Egg => eggs.push(GuiEvent::NewEgg {
                        egg: p.id,
                        parent: p.id,
                        x: p.x,
                        y: p.y,
                    }),
                    _ => {}
                }
            }
        }
        players.sort_by_key(event_id);
        eggs.sort_by_key(event_id);
        for ev in players.into_iter().chain(eggs) {
            self.emit(ev);
        }
        self.emit(GuiEvent::TimeUnit {
            frequency: self.clock.frequency(),
        });
    }

    /// Answer one queued GUI query from current state.
    pub fn answer_gui_query(&mut self, query: GuiQuery) {
        match query {
            GuiQuery::MapSize => self.emit(GuiEvent::MapSize {
                width: self.world.width,
                height: self.world.height,
            }),
            GuiQuery::MapContent => {
                for y in 0..self.world.height {
                    for x in 0..self.world.width {
                        self.emit_tile(x, y);
                    }
                }
            }
            GuiQuery::TileContent { x, y } => {
                if x < self.world.width && y < self.world.height {
                    self.emit_tile(x, y);
                } else {
                    self.emit(GuiEvent::BadParameters);
                }
            }
            GuiQuery::TeamNames => {
                let names: Vec<String> = self.teams.iter().map(|t| t.name.clone()).collect();
                for name in names {
                    self.emit(GuiEvent::TeamName { name });
                }
            }
            GuiQuery::PlayerPosition { id } => match self.alive_player(id) {
                Some(p) => {
                    let ev = GuiEvent::Position {
                        id: p.id,
                        x: p.x,
                        y: p.y,
                        orientation: p.direction.gui_code(),
                    };
                    self.emit(ev);
                }
                None => self.emit(GuiEvent::BadParameters),
            },
            GuiQuery::PlayerLevel { id } => match self.alive_player(id) {
                Some(p) => {
                    let ev = GuiEvent::Level {
                        id: p.id,
                        level: p.level,
                    };
                    self.emit(ev);
                }
                None => self.emit(GuiEvent::BadParameters),
            },
            GuiQuery::PlayerInventory { id } => match self.alive_player(id) {
                Some(p) => {
                    let ev = GuiEvent::PlayerInventory {
                        id: p.id,
                        x: p.x,
                        y: p.y,
                        slots: *p.inventory.slots(),
                    };
                    self.emit(ev);
                }
                None => self.emit(GuiEvent::BadParameters),
            },
            GuiQuery::TimeUnit => self.emit(GuiEvent::TimeUnit {
                frequency: self.clock.frequency(),
            }),
            GuiQuery::SetTimeUnit { frequency } => {
                self.clock.set_frequency(frequency);
                tracing::info!(frequency, "time unit changed by spectator");
                self.emit(GuiEvent::TimeUnitChanged { frequency });
            }
        }
    }

    /// Unknown GUI verb.
    pub fn gui_unknown_command(&mut self) {
        self.emit(GuiEvent::UnknownCommand);
    }

    /// Known GUI verb, malformed parameters.
    pub fn gui_bad_parameters(&mut self) {
        self.emit(GuiEvent::BadParameters);
    }

    /// Free-form server notice (`smg`).
    pub fn gui_server_message(&mut self, text: &str) {
        self.emit(GuiEvent::ServerMessage {
            text: text.to_string(),
        });
    }

    /// Push the current contents of a tile as a `bct` event.
    pub(crate) fn emit_tile(&mut self, x: i32, y: i32) {
        let slots = *self.world.tile(x, y).slots();
        self.emit(GuiEvent::TileContent { x, y, slots });
    }

    pub(crate) fn emit(&mut self, event: GuiEvent) {
        self.outbox.push_back(Outbound::Gui(event));
    }
}

fn event_id(ev: &GuiEvent) -> PlayerId {
    match ev {
        GuiEvent::NewPlayer { id, .. } => *id,
        GuiEvent::NewEgg { egg, .. } => *egg,
        _ => 0,
    }
}
