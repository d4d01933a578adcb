use std::fmt;

/// Number of distinct resource kinds.
pub const RESOURCE_KINDS: usize = 7;

/// The seven collectible resource kinds, in wire order (`bct`, `pin`,
/// `pgt`/`pdr` indices).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Food,
    Linemate,
    Deraumere,
    Sibur,
    Mendiane,
    Phiras,
    Thystame,
}

impl Resource {
    pub const ALL: [Resource; RESOURCE_KINDS] = [
        Resource::Food,
        Resource::Linemate,
        Resource::Deraumere,
        Resource::Sibur,
        Resource::Mendiane,
        Resource::Phiras,
        Resource::Thystame,
    ];

    /// Wire index (0 = food .. 6 = thystame).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Resource::Food => "food",
            Resource::Linemate => "linemate",
            Resource::Deraumere => "deraumere",
            Resource::Sibur => "sibur",
            Resource::Mendiane => "mendiane",
            Resource::Phiras => "phiras",
            Resource::Thystame => "thystame",
        }
    }

    pub fn from_name(name: &str) -> Option<Resource> {
        Resource::ALL.iter().copied().find(|r| r.name() == name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A seven-slot resource inventory, used both for tiles and for players.
///
/// Tile inventories never go negative; the player food slot may briefly reach
/// -1 between a food tick and the death reap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    counts: [i32; RESOURCE_KINDS],
}

impl Inventory {
    pub fn new() -> Self {
        Inventory::default()
    }

    pub fn get(&self, kind: Resource) -> i32 {
        self.counts[kind.index()]
    }

    pub fn add(&mut self, kind: Resource, amount: i32) {
        self.counts[kind.index()] += amount;
    }

    /// Remove one unit if present. Returns false (leaving the slot
    /// untouched) when the count is already zero.
    pub fn take_one(&mut self, kind: Resource) -> bool {
        if self.counts[kind.index()] <= 0 {
            return false;
        }
        self.counts[kind.index()] -= 1;
        true
    }

    /// Whether every per-kind count in `required` is covered.
    pub fn covers(&self, required: &[i32; RESOURCE_KINDS]) -> bool {
        self.counts.iter().zip(required).all(|(have, need)| have >= need)
    }

    pub fn total(&self) -> i32 {
        self.counts.iter().sum()
    }

    /// Counts in wire order, for `bct`/`pin` formatting.
    pub fn slots(&self) -> &[i32; RESOURCE_KINDS] {
        &self.counts
    }
}
