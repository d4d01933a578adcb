use std::net::{Ipv4Addr, SocketAddr};
use std::process::ExitCode;

use zappy_server::args::{Args, USAGE};
use zappy_server::net::server::Server;

/// Exit code for any start-up failure.
const EXIT_FAILURE: u8 = 84;

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match Args::parse(&argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("zappy-server: {e}");
            eprintln!("{USAGE}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.port));
    let mut server = match Server::bind(addr, &args.game_config()) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("zappy-server: failed to bind port {}: {e}", args.port);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match server.run() {
        Ok(Some(team)) => {
            tracing::info!(team, "game over");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("zappy-server: {e}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
