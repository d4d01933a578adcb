use std::collections::VecDeque;
use std::time::Instant;

use rand::Rng;

use super::command::CommandEntry;
use super::resources::Inventory;

pub type PlayerId = u32;

/// Facing direction. North is y+1 on the torus; the numeric value is the
/// orientation `O` of the GUI protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    North = 1,
    East = 2,
    South = 3,
    West = 4,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn random<R: Rng>(rng: &mut R) -> Direction {
        Direction::ALL[rng.gen_range(0..4)]
    }

    /// One-tile step vector.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    /// Unit vector pointing to the viewer's right, for the Look cone.
    pub fn right_delta(self) -> (i32, i32) {
        self.turn_right().delta()
    }

    pub fn turn_right(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    pub fn turn_left(self) -> Direction {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    /// Compass bearing in radians, measured clockwise from north.
    pub fn bearing(self) -> f64 {
        use std::f64::consts::FRAC_PI_2;
        match self {
            Direction::North => 0.0,
            Direction::East => FRAC_PI_2,
            Direction::South => 2.0 * FRAC_PI_2,
            Direction::West => 3.0 * FRAC_PI_2,
        }
    }

    /// Orientation field of `ppo`/`pnw`.
    pub fn gui_code(self) -> i32 {
        self as i32
    }
}

/// Lifecycle of a roster slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    /// Open slot from the initial team budget, no position yet.
    Unused,
    /// Laid by Fork; bound to a tile, waiting for a connection to hatch it.
    Egg,
    Alive,
    /// Starved; reaped at the end of the turn.
    Dead,
}

/// One roster slot: an unused opening, an egg, or a live player.
///
/// Ids are assigned at slot creation and never reused; freeing a slot back to
/// UNUSED re-assigns a fresh id so a later claim cannot resurrect an id the
/// GUI has already seen die.
pub struct Player {
    pub id: PlayerId,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub level: u8,
    pub inventory: Inventory,
    pub state: PlayerState,
    /// Start of the current food cycle.
    pub last_meal: Option<Instant>,
    /// Pending commands; the head may be in flight.
    pub queue: VecDeque<CommandEntry>,
    /// Start instant of the head command, once billed.
    pub started: Option<Instant>,
    /// Frozen by a co-located ritual; no command starts or completes.
    pub incantation_locked: bool,
}

impl Player {
    pub fn unused(id: PlayerId) -> Self {
        Player {
            id,
            x: 0,
            y: 0,
            direction: Direction::North,
            level: 1,
            inventory: Inventory::new(),
            state: PlayerState::Unused,
            last_meal: None,
            queue: VecDeque::new(),
            started: None,
            incantation_locked: false,
        }
    }

    pub fn egg(id: PlayerId, x: i32, y: i32, direction: Direction) -> Self {
        Player {
            x,
            y,
            direction,
            state: PlayerState::Egg,
            ..Player::unused(id)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == PlayerState::Alive
    }

    pub fn is_at(&self, x: i32, y: i32) -> bool {
        self.x == x && self.y == y
    }
}

/// A team: name plus its roster of slots. The slot list is the capacity —
/// free slots are the UNUSED and EGG entries, Fork appends one, a death or a
/// destroyed egg removes one.
pub struct Team {
    pub name: String,
    pub players: Vec<Player>,
}

impl Team {
    pub fn new(name: &str) -> Self {
        Team {
            name: name.to_string(),
            players: Vec::new(),
        }
    }

    pub fn free_slots(&self) -> usize {
        self.players
            .iter()
            .filter(|p| matches!(p.state, PlayerState::Unused | PlayerState::Egg))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turns_are_inverse() {
        for dir in Direction::ALL {
            assert_eq!(dir.turn_right().turn_left(), dir);
            assert_eq!(dir.turn_left().turn_right(), dir);
            assert_eq!(dir.turn_right().turn_right(), dir.turn_left().turn_left());
        }
    }

    #[test]
    fn test_deltas() {
        assert_eq!(Direction::North.delta(), (0, 1));
        assert_eq!(Direction::South.delta(), (0, -1));
        assert_eq!(Direction::East.delta(), (1, 0));
        assert_eq!(Direction::West.delta(), (-1, 0));
        // Facing north, right is east.
        assert_eq!(Direction::North.right_delta(), (1, 0));
        assert_eq!(Direction::South.right_delta(), (-1, 0));
    }

    #[test]
    fn test_gui_codes() {
        assert_eq!(Direction::North.gui_code(), 1);
        assert_eq!(Direction::East.gui_code(), 2);
        assert_eq!(Direction::South.gui_code(), 3);
        assert_eq!(Direction::West.gui_code(), 4);
    }

    #[test]
    fn test_free_slots() {
        let mut team = Team::new("alpha");
        assert_eq!(team.free_slots(), 0);
        team.players.push(Player::unused(0));
        team.players.push(Player::egg(1, 2, 3, Direction::East));
        let mut alive = Player::unused(2);
        alive.state = PlayerState::Alive;
        team.players.push(alive);
        assert_eq!(team.free_slots(), 2);
    }
}
