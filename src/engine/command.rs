//! The static command catalogs: AI verbs with their durations, and the GUI
//! query verbs.

/// The twelve AI verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Forward,
    Right,
    Left,
    Look,
    Inventory,
    Broadcast,
    ConnectNbr,
    Fork,
    Eject,
    Take,
    Set,
    Incantation,
}

/// Verb name -> duration in time-units.
const AI_CATALOG: [(&str, Verb, u32); 12] = [
    ("Forward", Verb::Forward, 7),
    ("Right", Verb::Right, 7),
    ("Left", Verb::Left, 7),
    ("Look", Verb::Look, 7),
    ("Inventory", Verb::Inventory, 1),
    ("Broadcast", Verb::Broadcast, 7),
    ("Connect_nbr", Verb::ConnectNbr, 1),
    ("Fork", Verb::Fork, 42),
    ("Eject", Verb::Eject, 7),
    ("Take", Verb::Take, 7),
    ("Set", Verb::Set, 7),
    ("Incantation", Verb::Incantation, 300),
];

impl Verb {
    /// Cost of the verb in game time-units.
    pub fn duration(self) -> u32 {
        AI_CATALOG
            .iter()
            .find(|(_, v, _)| *v == self)
            .map(|&(_, _, d)| d)
            .unwrap_or(0)
    }
}

/// A parsed AI command waiting in a player's queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEntry {
    pub verb: Verb,
    /// Raw argument text after the verb (empty for argument-less verbs).
    pub arg: String,
}

/// Parse one AI command line. The first whitespace-separated token is the
/// verb; everything after the first space is the raw argument (Broadcast
/// keeps embedded spaces). Unknown verbs are a parse error.
pub fn parse_ai_line(line: &str) -> Option<CommandEntry> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let verb = AI_CATALOG
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|&(_, v, _)| v)?;
    Some(CommandEntry {
        verb,
        arg: rest.to_string(),
    })
}

/// The synchronous GUI query verbs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuiQuery {
    MapSize,
    MapContent,
    TileContent { x: i32, y: i32 },
    TeamNames,
    PlayerPosition { id: u32 },
    PlayerLevel { id: u32 },
    PlayerInventory { id: u32 },
    TimeUnit,
    SetTimeUnit { frequency: u32 },
}

/// Outcome of parsing one GUI line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuiParse {
    Query(GuiQuery),
    /// Known verb, malformed parameters -> `sbp`.
    BadParameters,
    /// Unknown verb -> `suc`.
    UnknownVerb,
}

/// Parse one GUI request line.
pub fn parse_gui_line(line: &str) -> GuiParse {
    let mut words = line.split_whitespace();
    let verb = match words.next() {
        Some(v) => v,
        None => return GuiParse::UnknownVerb,
    };
    let args: Vec<&str> = words.collect();
    match verb {
        "msz" => GuiParse::Query(GuiQuery::MapSize),
        "mct" => GuiParse::Query(GuiQuery::MapContent),
        "tna" => GuiParse::Query(GuiQuery::TeamNames),
        "sgt" => GuiParse::Query(GuiQuery::TimeUnit),
        "bct" => match parse_coords(&args) {
            Some((x, y)) => GuiParse::Query(GuiQuery::TileContent { x, y }),
            None => GuiParse::BadParameters,
        },
        "ppo" => match parse_player_ref(&args) {
            Some(id) => GuiParse::Query(GuiQuery::PlayerPosition { id }),
            None => GuiParse::BadParameters,
        },
        "plv" => match parse_player_ref(&args) {
            Some(id) => GuiParse::Query(GuiQuery::PlayerLevel { id }),
            None => GuiParse::BadParameters,
        },
        "pin" => match parse_player_ref(&args) {
            Some(id) => GuiParse::Query(GuiQuery::PlayerInventory { id }),
            None => GuiParse::BadParameters,
        },
        "sst" => match args.first().and_then(|a| a.parse::<u32>().ok()) {
            Some(f) if f > 0 => GuiParse::Query(GuiQuery::SetTimeUnit { frequency: f }),
            _ => GuiParse::BadParameters,
        },
        _ => GuiParse::UnknownVerb,
    }
}

fn parse_coords(args: &[&str]) -> Option<(i32, i32)> {
    let x = args.first()?.parse::<i32>().ok()?;
    let y = args.get(1)?.parse::<i32>().ok()?;
    if x < 0 || y < 0 {
        return None;
    }
    Some((x, y))
}

/// Player references arrive as `#<id>`.
fn parse_player_ref(args: &[&str]) -> Option<u32> {
    args.first()?.strip_prefix('#')?.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations() {
        assert_eq!(Verb::Forward.duration(), 7);
        assert_eq!(Verb::Inventory.duration(), 1);
        assert_eq!(Verb::ConnectNbr.duration(), 1);
        assert_eq!(Verb::Fork.duration(), 42);
        assert_eq!(Verb::Incantation.duration(), 300);
    }

    #[test]
    fn test_parse_plain_verb() {
        let cmd = parse_ai_line("Forward").unwrap();
        assert_eq!(cmd.verb, Verb::Forward);
        assert_eq!(cmd.arg, "");
    }

    #[test]
    fn test_parse_with_argument() {
        let cmd = parse_ai_line("Take linemate").unwrap();
        assert_eq!(cmd.verb, Verb::Take);
        assert_eq!(cmd.arg, "linemate");
    }

    #[test]
    fn test_parse_broadcast_keeps_spaces() {
        let cmd = parse_ai_line("Broadcast meet at base").unwrap();
        assert_eq!(cmd.verb, Verb::Broadcast);
        assert_eq!(cmd.arg, "meet at base");
    }

    #[test]
    fn test_parse_unknown_verb() {
        assert!(parse_ai_line("forward").is_none());
        assert!(parse_ai_line("Jump").is_none());
        assert!(parse_ai_line("").is_none());
    }

    #[test]
    fn test_parse_gui_queries() {
        assert_eq!(parse_gui_line("msz"), GuiParse::Query(GuiQuery::MapSize));
        assert_eq!(
            parse_gui_line("bct 3 4"),
            GuiParse::Query(GuiQuery::TileContent { x: 3, y: 4 })
        );
        assert_eq!(
            parse_gui_line("ppo #7"),
            GuiParse::Query(GuiQuery::PlayerPosition { id: 7 })
        );
        assert_eq!(
            parse_gui_line("sst 50"),
            GuiParse::Query(GuiQuery::SetTimeUnit { frequency: 50 })
        );
    }

    #[test]
    fn test_parse_gui_bad_parameters() {
        assert_eq!(parse_gui_line("bct x y"), GuiParse::BadParameters);
        assert_eq!(parse_gui_line("bct 3"), GuiParse::BadParameters);
        assert_eq!(parse_gui_line("ppo 7"), GuiParse::BadParameters);
        assert_eq!(parse_gui_line("pin #"), GuiParse::BadParameters);
        assert_eq!(parse_gui_line("sst 0"), GuiParse::BadParameters);
    }

    #[test]
    fn test_parse_gui_unknown() {
        assert_eq!(parse_gui_line("xyz"), GuiParse::UnknownVerb);
        assert_eq!(parse_gui_line(""), GuiParse::UnknownVerb);
    }
}
