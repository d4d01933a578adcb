// Protocol constants shared across the engine.

use super::resources::RESOURCE_KINDS;

/// Time-units between two food decrements for an alive player.
pub const FOOD_PERIOD: u32 = 126;

/// Food a player holds right after hatching or joining.
pub const HATCH_FOOD: i32 = 10;

/// Time-units between two resource top-up passes.
pub const REGEN_PERIOD: u32 = 20;

/// Per-tile spawn target density for each resource kind, in `bct` order.
pub const DENSITIES: [f64; RESOURCE_KINDS] = [0.5, 0.3, 0.15, 0.1, 0.1, 0.08, 0.05];

/// Maximum number of commands buffered per AI client. Extra lines parsed
/// while the queue is full are dropped without a reply.
pub const AI_QUEUE_CAP: usize = 10;

/// Maximum number of pending GUI queries.
pub const GUI_QUEUE_CAP: usize = 25;

/// Receive ring buffer capacity per connection. Overflow without a newline
/// closes the connection.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// Longest accepted command line. Anything longer is discarded whole.
pub const MAX_LINE_LEN: usize = 1024;

/// Upper bound on a single outbound response (the Look reply grows with
/// level and tile contents).
pub const MAX_RESPONSE_SIZE: usize = 16384;

/// Highest reachable level; reaching it ends the game.
pub const MAX_LEVEL: u8 = 8;

/// Elevation requirements for levels 1..=7, indexed by `level - 1`:
/// same-level players on the tile, then linemate, deraumere, sibur,
/// mendiane, phiras, thystame.
pub const ELEVATION_REQS: [[i32; 7]; 7] = [
    [1, 1, 0, 0, 0, 0, 0],
    [2, 1, 1, 1, 0, 0, 0],
    [2, 2, 0, 1, 0, 2, 0],
    [4, 1, 1, 2, 0, 1, 0],
    [4, 1, 2, 1, 3, 0, 0],
    [6, 1, 2, 3, 0, 1, 0],
    [6, 2, 2, 2, 2, 2, 1],
];
