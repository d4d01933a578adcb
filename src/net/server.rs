//! The poll loop: accepts connections, frames their bytes, feeds the game
//! engine, and fans its outbox back out to the sockets.

use std::collections::{HashMap, VecDeque};
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};

use crate::engine::command::{parse_gui_line, GuiParse};
use crate::engine::config::GUI_QUEUE_CAP;
use crate::engine::game::{Game, GameConfig, Outbound};
use crate::engine::player::PlayerId;

use super::connection::{Connection, ReadOutcome, Role};

const LISTENER: Token = Token(0);

/// Short poll timeout so command deadlines are checked at high resolution
/// without busy-waiting.
const POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// The server: one listener, one optional GUI, any number of AI clients,
/// all multiplexed on a single thread.
pub struct Server {
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    game: Game,
    gui_token: Option<Token>,
    ai_tokens: HashMap<PlayerId, Token>,
    gui_queries: VecDeque<GuiParse>,
    running: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listening socket and build the world.
    pub fn bind(addr: SocketAddr, config: &GameConfig) -> io::Result<Server> {
        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(addr)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        Ok(Server {
            poll,
            listener,
            connections: HashMap::new(),
            next_token: 1,
            game: Game::new(config, Instant::now()),
            gui_token: None,
            ai_tokens: HashMap::new(),
            gui_queries: VecDeque::new(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared flag that stops the loop from another thread (tests, signal
    /// wiring in `main`).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Run until a team wins or the stop flag is cleared. Returns the
    /// winning team, if any.
    pub fn run(&mut self) -> io::Result<Option<String>> {
        let mut events = Events::with_capacity(256);
        loop {
            if !self.running.load(Ordering::Relaxed) {
                self.announce_shutdown();
                return Ok(None);
            }
            match self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            let mut ready = Vec::new();
            for event in events.iter() {
                ready.push((event.token(), event.is_readable(), event.is_writable()));
            }
            for (token, readable, writable) in ready {
                if token == LISTENER {
                    self.accept_pending();
                } else {
                    self.socket_ready(token, readable, writable);
                }
            }

            let now = Instant::now();
            self.game.drive_commands(now);
            self.game.housekeeping(now);
            let reaped = self.game.reap();
            while let Some(parsed) = self.gui_queries.pop_front() {
                match parsed {
                    GuiParse::Query(q) => self.game.answer_gui_query(q),
                    GuiParse::BadParameters => self.game.gui_bad_parameters(),
                    GuiParse::UnknownVerb => self.game.gui_unknown_command(),
                }
            }
            let winner = self.game.check_winner();
            self.dispatch_outbox();
            for id in reaped {
                if let Some(token) = self.ai_tokens.remove(&id) {
                    self.drop_connection(token);
                }
            }
            if winner.is_some() {
                return Ok(winner);
            }
        }
    }

    // --- Accepting ---

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;
                    if let Err(e) = self.poll.registry().register(
                        &mut stream,
                        token,
                        Interest::READABLE | Interest::WRITABLE,
                    ) {
                        tracing::warn!(error = %e, "failed to register client");
                        continue;
                    }
                    let mut conn = Connection::new(stream);
                    if conn.send_line("WELCOME").is_err() {
                        continue;
                    }
                    tracing::info!(%peer, ?token, "client connected");
                    self.connections.insert(token, conn);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }

    // --- Socket readiness ---

    fn socket_ready(&mut self, token: Token, readable: bool, writable: bool) {
        if writable {
            if let Some(conn) = self.connections.get_mut(&token) {
                if conn.flush_pending().is_err() {
                    self.close_connection(token);
                    return;
                }
            }
        }
        if !readable {
            return;
        }
        let outcome = match self.connections.get_mut(&token) {
            Some(conn) => conn.read_ready(),
            None => return,
        };
        match outcome {
            ReadOutcome::Disconnected => self.close_connection(token),
            ReadOutcome::Lines(lines) => {
                for line in lines {
                    if !self.connections.contains_key(&token) {
                        break;
                    }
                    self.handle_line(token, &line);
                }
            }
        }
    }

    fn handle_line(&mut self, token: Token, line: &str) {
        let role = match self.connections.get(&token) {
            Some(conn) => conn.role,
            None => return,
        };
        match role {
            Role::Waiting => self.handle_handshake(token, line),
            Role::Ai(id) => self.game.enqueue_ai_line(id, line),
            Role::Gui => {
                if self.gui_queries.len() >= GUI_QUEUE_CAP {
                    tracing::debug!("spectator query queue full, dropping");
                    return;
                }
                self.gui_queries.push_back(parse_gui_line(line));
            }
        }
    }

    /// First inbound line decides the role: the literal GRAPHIC binds the
    /// spectator singleton, anything else is tried as a team name.
    fn handle_handshake(&mut self, token: Token, line: &str) {
        if line == "GRAPHIC" {
            if self.gui_token.is_some() {
                tracing::warn!("second GRAPHIC handshake refused");
                self.refuse(token);
                return;
            }
            if let Some(conn) = self.connections.get_mut(&token) {
                conn.role = Role::Gui;
            }
            self.gui_token = Some(token);
            tracing::info!("spectator connected");
            self.game.gui_snapshot();
            return;
        }
        match self.game.join_team(line, Instant::now()) {
            Some(outcome) => {
                if let Some(conn) = self.connections.get_mut(&token) {
                    conn.role = Role::Ai(outcome.id);
                }
                self.ai_tokens.insert(outcome.id, token);
            }
            None => {
                tracing::info!(team = line, "join refused");
                self.refuse(token);
            }
        }
    }

    fn refuse(&mut self, token: Token) {
        if let Some(conn) = self.connections.get_mut(&token) {
            let _ = conn.send_line("ko");
        }
        self.drop_connection(token);
    }

    // --- Teardown ---

    /// Peer-initiated teardown: free the simulation slot too.
    fn close_connection(&mut self, token: Token) {
        if let Some(role) = self.connections.get(&token).map(|c| c.role) {
            match role {
                Role::Ai(id) => {
                    self.ai_tokens.remove(&id);
                    self.game.disconnect(id);
                }
                Role::Gui => {
                    self.gui_token = None;
                    self.gui_queries.clear();
                    tracing::info!("spectator disconnected");
                }
                Role::Waiting => {}
            }
        }
        self.drop_connection(token);
    }

    /// Deregister and drop the socket without touching the simulation.
    fn drop_connection(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = conn.flush_pending();
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
        if self.gui_token == Some(token) {
            self.gui_token = None;
            self.gui_queries.clear();
        }
    }

    // --- Outbound fan-out ---

    /// Route everything the engine queued this turn. GUI lines are dropped
    /// on the floor when no spectator is bound.
    fn dispatch_outbox(&mut self) {
        let mut broken = Vec::new();
        for message in self.game.take_outbox() {
            let (token, line) = match message {
                Outbound::Ai(id, line) => match self.ai_tokens.get(&id) {
                    Some(&token) => (token, line),
                    None => continue,
                },
                Outbound::Gui(event) => match self.gui_token {
                    Some(token) => (token, event.to_string()),
                    None => continue,
                },
            };
            if broken.contains(&token) {
                continue;
            }
            if let Some(conn) = self.connections.get_mut(&token) {
                if conn.send_line(&line).is_err() {
                    broken.push(token);
                }
            }
        }
        for token in broken {
            self.close_connection(token);
        }
    }

    fn announce_shutdown(&mut self) {
        self.game.gui_server_message("server shutting down");
        self.dispatch_outbox();
        tracing::info!("server stopped");
    }
}
