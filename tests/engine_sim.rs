// Headless end-to-end scenarios: build a Game, script inbound command lines,
// drive the scheduler with fabricated instants, and assert on the outbox.

use std::time::{Duration, Instant};

use zappy_server::engine::game::{Game, GameConfig, Outbound};
use zappy_server::engine::player::{Direction, PlayerId, PlayerState};
use zappy_server::engine::resources::{Inventory, Resource};

fn config(teams: &[&str], team_count: u32) -> GameConfig {
    GameConfig {
        width: 10,
        height: 10,
        frequency: 100,
        team_names: teams.iter().map(|s| s.to_string()).collect(),
        team_count,
    }
}

/// A game whose ground is wiped clean so scenarios control every unit.
fn bare_game(teams: &[&str], team_count: u32, t0: Instant) -> Game {
    let mut game = Game::new(&config(teams, team_count), t0);
    for y in 0..10 {
        for x in 0..10 {
            *game.world.tile_mut(x, y) = Inventory::new();
        }
    }
    game
}

fn join(game: &mut Game, team: &str, x: i32, y: i32, dir: Direction, t0: Instant) -> PlayerId {
    let id = game.join_team(team, t0).expect("join failed").id;
    let p = game.player_mut(id).unwrap();
    p.x = x;
    p.y = y;
    p.direction = dir;
    game.take_outbox();
    id
}

/// Bill the head command, let its duration pass, execute it.
fn run_command(game: &mut Game, now: &mut Instant, time_units: u32) {
    game.drive_commands(*now);
    *now += game.clock.period(time_units);
    game.drive_commands(*now);
}

fn split(outbox: Vec<Outbound>) -> (Vec<(PlayerId, String)>, Vec<String>) {
    let mut ai = Vec::new();
    let mut gui = Vec::new();
    for out in outbox {
        match out {
            Outbound::Ai(id, line) => ai.push((id, line)),
            Outbound::Gui(ev) => gui.push(ev.to_string()),
        }
    }
    (ai, gui)
}

#[test]
fn test_movement_round_trip_with_spectator_echo() {
    let t0 = Instant::now();
    let mut game = bare_game(&["t1"], 1, t0);
    let id = join(&mut game, "t1", 4, 4, Direction::North, t0);

    let mut now = t0;
    game.enqueue_ai_line(id, "Forward");
    run_command(&mut game, &mut now, 7);
    let (ai, gui) = split(game.take_outbox());
    assert_eq!(ai, vec![(id, "ok".into())]);
    assert_eq!(gui, vec![format!("ppo #{id} 4 5 1")]);
    assert_eq!(
        now.duration_since(t0),
        Duration::from_millis(70),
        "a 7 time-unit verb takes 70 ms at frequency 100"
    );
}

#[test]
fn test_take_set_broadcast_sequence_keeps_handler_events_contiguous() {
    let t0 = Instant::now();
    let mut game = bare_game(&["red", "blue"], 2, t0);
    let a = join(&mut game, "red", 2, 2, Direction::North, t0);
    let b = join(&mut game, "blue", 2, 3, Direction::South, t0);
    game.world.tile_mut(2, 2).add(Resource::Phiras, 1);

    let mut now = t0;
    game.enqueue_ai_line(a, "Take phiras");
    run_command(&mut game, &mut now, 7);
    let (_, gui) = split(game.take_outbox());
    // All events of one handler, in order, before anything else.
    assert_eq!(gui.len(), 3);
    assert_eq!(gui[0], format!("pgt #{a} 5"));
    assert_eq!(gui[1], "bct 2 2 0 0 0 0 0 0 0");
    assert_eq!(gui[2], format!("pin #{a} 2 2 10 0 0 0 0 0 1"));

    game.enqueue_ai_line(a, "Set phiras");
    run_command(&mut game, &mut now, 7);
    assert_eq!(game.world.tile(2, 2).get(Resource::Phiras), 1);
    game.take_outbox();

    game.enqueue_ai_line(a, "Broadcast rally");
    run_command(&mut game, &mut now, 7);
    let (ai, gui) = split(game.take_outbox());
    // b is one tile north of a and faces south: the shout comes from its
    // front sector.
    assert!(ai.contains(&(b, "message 1, rally".into())));
    assert!(ai.contains(&(a, "ok".into())));
    assert_eq!(gui, vec![format!("pbc #{a} rally")]);
}

#[test]
fn test_fork_hatch_eject_lifecycle() {
    let t0 = Instant::now();
    let mut game = bare_game(&["t1", "t2"], 1, t0);
    let parent = join(&mut game, "t1", 5, 5, Direction::East, t0);
    let rival = join(&mut game, "t2", 5, 5, Direction::North, t0);

    // Fork raises the slot budget by appending an egg on the parent's tile.
    let mut now = t0;
    game.enqueue_ai_line(parent, "Fork");
    run_command(&mut game, &mut now, 42);
    let (_, gui) = split(game.take_outbox());
    assert_eq!(game.teams[0].free_slots(), 1);
    assert_eq!(gui[0], format!("pfk #{parent}"));
    assert!(gui[1].starts_with("enw #"));

    // A new connection on that team hatches the egg in place.
    let outcome = game.join_team("t1", now).expect("egg should be claimable");
    assert!(outcome.hatched_from_egg);
    assert_eq!(outcome.remaining, 0);
    let hatchling = outcome.id;
    let p = game.player(hatchling).unwrap();
    assert_eq!((p.x, p.y), (5, 5));
    let (_, gui) = split(game.take_outbox());
    assert_eq!(gui[0], format!("ebo #{hatchling}"));
    game.player_mut(hatchling).unwrap().x = 4; // step aside

    // The rival ejects the parent eastward.
    game.enqueue_ai_line(rival, "Eject");
    run_command(&mut game, &mut now, 7);
    let (ai, gui) = split(game.take_outbox());
    assert!(ai.contains(&(rival, "ok".into())));
    assert_eq!(game.player(parent).unwrap().y, 6);
    assert_eq!(gui[0], format!("pex #{rival}"));
    assert!(gui.contains(&format!("ppo #{parent} 5 6 2")));
}

#[test]
fn test_starvation_frees_the_slot_for_a_new_join() {
    let t0 = Instant::now();
    let mut game = bare_game(&["t1"], 1, t0);
    let id = join(&mut game, "t1", 0, 0, Direction::North, t0);
    let p = game.player_mut(id).unwrap();
    p.inventory = Inventory::new();
    p.inventory.add(Resource::Food, 1);

    // Two food cycles: 1 -> 0 -> starved.
    let mut now = t0;
    for _ in 0..2 {
        now += game.clock.period(126);
        game.housekeeping(now);
    }
    assert_eq!(game.player(id).unwrap().state, PlayerState::Dead);
    let reaped = game.reap();
    assert_eq!(reaped, vec![id]);
    let (ai, gui) = split(game.take_outbox());
    assert!(ai.contains(&(id, "dead".into())));
    assert!(gui.contains(&format!("pdi #{id}")));

    // The roster shrank, so a fresh UNUSED slot is not restored...
    assert_eq!(game.teams[0].free_slots(), 0);
    assert!(game.join_team("t1", now).is_none());
}

#[test]
fn test_six_players_reach_level_eight_and_win() {
    let t0 = Instant::now();
    let mut game = bare_game(&["zenith"], 6, t0);
    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(join(&mut game, "zenith", 7, 7, Direction::North, t0));
    }
    for &id in &ids {
        game.player_mut(id).unwrap().level = 7;
    }
    // Requirement row for 7 -> 8.
    let tile = game.world.tile_mut(7, 7);
    tile.add(Resource::Linemate, 2);
    tile.add(Resource::Deraumere, 2);
    tile.add(Resource::Sibur, 2);
    tile.add(Resource::Mendiane, 2);
    tile.add(Resource::Phiras, 2);
    tile.add(Resource::Thystame, 1);

    let mut now = t0;
    game.enqueue_ai_line(ids[0], "Incantation");
    run_command(&mut game, &mut now, 300);
    for &id in &ids {
        assert_eq!(game.player(id).unwrap().level, 8);
    }
    assert_eq!(game.world.tile(7, 7).total(), 0);
    assert_eq!(game.check_winner(), Some("zenith".to_string()));
    let (ai, gui) = split(game.take_outbox());
    for &id in &ids {
        assert!(ai.contains(&(id, "Current level: 8".into())));
    }
    assert!(gui.contains(&"pie 7 7 1".to_string()));
    assert!(gui.contains(&"seg zenith".to_string()));
}

#[test]
fn test_invariants_hold_under_mixed_load() {
    let t0 = Instant::now();
    let mut game = bare_game(&["red", "blue"], 3, t0);
    let script = [
        "Forward",
        "Take food",
        "Right",
        "Set linemate",
        "Eject",
        "Look",
        "Forward",
        "Broadcast push",
        "Left",
        "Fork",
        "Inventory",
        "Take linemate",
        "Connect_nbr",
    ];
    let mut players = Vec::new();
    for (i, team) in ["red", "blue", "red", "blue"].into_iter().enumerate() {
        players.push(join(&mut game, team, i as i32 * 2, 3, Direction::East, t0));
    }
    game.world.tile_mut(2, 3).add(Resource::Linemate, 2);
    game.world.tile_mut(4, 3).add(Resource::Food, 3);

    let mut now = t0;
    let mut forks = 0;
    for round in 0..40 {
        for (i, &id) in players.iter().enumerate() {
            let line = script[(round + i) % script.len()];
            game.enqueue_ai_line(id, line);
        }
        game.drive_commands(now);
        now += game.clock.period(45);
        game.drive_commands(now);
        game.housekeeping(now);
        game.reap();

        for line in split(game.take_outbox()).1 {
            if line.starts_with("pfk ") {
                forks += 1;
            }
        }
        for team in &game.teams {
            assert!(team.free_slots() <= 3 + forks, "slot budget exceeded");
            for p in &team.players {
                if p.is_alive() {
                    assert!(p.x >= 0 && p.x < 10 && p.y >= 0 && p.y < 10);
                    assert!((1..=8).contains(&p.level));
                }
            }
        }
        for y in 0..10 {
            for x in 0..10 {
                for kind in Resource::ALL {
                    assert!(game.world.tile(x, y).get(kind) >= 0);
                }
            }
        }
    }
}
