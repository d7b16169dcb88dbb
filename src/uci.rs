//! Falchion - UCI Protocol Module
//!
//! Universal Chess Interface front end. Searches run on a background
//! thread so `stop` and `ponderhit` can reach the engine mid-search;
//! everything else is handled inline on the stdin loop.

use std::io::{self, BufRead, Write};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::move_generator::find_move;
use crate::parallel_search::{Engine, SearchContext};
use crate::perft;
use crate::position::Position;
use crate::search::{SearchType, MAX_SEARCH_DEPTH};
use crate::types::*;

// Engine identification
pub const ENGINE_NAME: &str = "Falchion";
pub const ENGINE_AUTHOR: &str = "Falchion Developers";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One line of the engine banner.
pub fn engine_info() -> String {
    format!("{} {}", ENGINE_NAME, ENGINE_VERSION)
}

/// UCI option representation
#[derive(Clone)]
pub struct UCIOption {
    pub name: String,
    pub opt_type: String,
    pub default: String,
    pub value: String,
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl UCIOption {
    pub fn spin(name: &str, default: i32, min: i32, max: i32) -> Self {
        UCIOption {
            name: name.to_string(),
            opt_type: "spin".to_string(),
            default: default.to_string(),
            value: default.to_string(),
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn check(name: &str, default: bool) -> Self {
        UCIOption {
            name: name.to_string(),
            opt_type: "check".to_string(),
            default: default.to_string(),
            value: default.to_string(),
            min: None,
            max: None,
        }
    }

    pub fn button(name: &str) -> Self {
        UCIOption {
            name: name.to_string(),
            opt_type: "button".to_string(),
            default: String::new(),
            value: String::new(),
            min: None,
            max: None,
        }
    }

    pub fn to_uci_string(&self) -> String {
        let mut s = format!("option name {} type {}", self.name, self.opt_type);
        match self.opt_type.as_str() {
            "spin" => {
                s.push_str(&format!(
                    " default {} min {} max {}",
                    self.default,
                    self.min.unwrap_or(0),
                    self.max.unwrap_or(1)
                ));
            }
            "check" => {
                s.push_str(&format!(" default {}", self.default));
            }
            _ => {}
        }
        s
    }

    /// Accept a value. Out-of-range spins are clamped into the
    /// option's bounds, never rejected; only unparseable text fails.
    pub fn set_value(&mut self, value_str: &str) -> bool {
        match self.opt_type.as_str() {
            "spin" => {
                if let Ok(val) = value_str.parse::<i32>() {
                    if let (Some(min), Some(max)) = (self.min, self.max) {
                        self.value = val.clamp(min, max).to_string();
                        return true;
                    }
                }
                false
            }
            "check" => {
                self.value = (value_str.to_lowercase() == "true").to_string();
                true
            }
            _ => false,
        }
    }

    pub fn get_int(&self) -> i32 {
        self.value.parse().unwrap_or(0)
    }

    pub fn get_bool(&self) -> bool {
        self.value == "true"
    }
}

/// UCI protocol handler
pub struct UCIProtocol {
    position: Position,
    engine: Arc<Mutex<Engine>>,
    ctx: Arc<SearchContext>,
    search: Option<JoinHandle<()>>,
    running: bool,
    debug_mode: bool,
    options: Vec<UCIOption>,
}

impl UCIProtocol {
    pub fn new(hash_mb: usize, threads: usize) -> Self {
        let engine = Engine::new(hash_mb, threads);
        let ctx = engine.context();
        let mut protocol = UCIProtocol {
            position: Position::new(),
            engine: Arc::new(Mutex::new(engine)),
            ctx,
            search: None,
            running: true,
            debug_mode: false,
            options: Vec::new(),
        };
        protocol.init_options();
        protocol
    }

    fn init_options(&mut self) {
        self.options = vec![
            UCIOption::spin("Hash", 32, 1, 1024),
            UCIOption::spin("Threads", 1, 1, 64),
            UCIOption::check("Ponder", true),
            UCIOption::button("Clear Hash"),
        ];
    }

    /// Push every option value into the engine. Unchanged values are
    /// no-ops on the engine side.
    fn apply_options(&mut self) {
        {
            let mut engine = self.engine.lock().unwrap();
            for opt in &self.options {
                match opt.name.as_str() {
                    "Hash" => engine.set_hash_size(opt.get_int() as usize),
                    "Threads" => engine.set_threads(opt.get_int() as usize),
                    _ => {}
                }
            }
        }
        // A hash resize replaces the shared context
        self.ctx = self.engine.lock().unwrap().context();
    }

    pub fn run(&mut self) {
        let stdin = io::stdin();

        for line in stdin.lock().lines() {
            if let Ok(line) = line {
                let line = line.trim();
                if !line.is_empty() {
                    self.process_command(line);
                }
                if !self.running {
                    break;
                }
            }
        }
        self.halt_search();
    }

    fn process_command(&mut self, line: &str) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            return;
        }

        let command = parts[0];
        let args = &parts[1..];

        match command {
            "uci" => self.cmd_uci(),
            "isready" => self.cmd_isready(),
            "setoption" => self.cmd_setoption(args),
            "ucinewgame" => self.cmd_ucinewgame(),
            "position" => self.cmd_position(args),
            "go" => self.cmd_go(args),
            "stop" => self.halt_search(),
            "ponderhit" => self.cmd_ponderhit(),
            "quit" => self.cmd_quit(),
            "debug" => self.cmd_debug(args),
            "d" => self.cmd_display(),
            "perft" => self.cmd_perft(args),
            "divide" => self.cmd_divide(args),
            "bench" => self.cmd_bench(args),
            _ => {
                log::warn!("unknown command: {}", command);
                if self.debug_mode {
                    self.send(&format!("info string unknown command: {}", command));
                }
            }
        }
    }

    fn send(&self, message: &str) {
        println!("{}", message);
        io::stdout().flush().ok();
    }

    /// Flag the running search down and wait for its bestmove.
    fn halt_search(&mut self) {
        self.ctx.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.search.take() {
            let _ = handle.join();
        }
    }

    fn searching(&mut self) -> bool {
        if let Some(handle) = &self.search {
            if !handle.is_finished() {
                return true;
            }
        }
        // Reap the finished thread
        if let Some(handle) = self.search.take() {
            let _ = handle.join();
        }
        false
    }

    fn cmd_uci(&self) {
        self.send(&format!("id name {}", engine_info()));
        self.send(&format!("id author {}", ENGINE_AUTHOR));
        for option in &self.options {
            self.send(&option.to_uci_string());
        }
        self.send("uciok");
    }

    fn cmd_isready(&self) {
        self.send("readyok");
    }

    fn cmd_setoption(&mut self, args: &[&str]) {
        if args.len() < 2 || args[0] != "name" {
            return;
        }

        let mut name_parts = Vec::new();
        let mut value_str = None;
        let mut i = 1;
        while i < args.len() {
            if args[i] == "value" {
                if i + 1 < args.len() {
                    value_str = Some(args[i + 1..].join(" "));
                }
                break;
            }
            name_parts.push(args[i]);
            i += 1;
        }
        let name = name_parts.join(" ");

        if name == "Clear Hash" {
            self.engine.lock().unwrap().clear_hash();
            if self.debug_mode {
                self.send("info string hash table cleared");
            }
            return;
        }

        let mut changed = false;
        for opt in &mut self.options {
            if opt.name == name {
                if let Some(ref val) = value_str {
                    changed = opt.set_value(val);
                }
                break;
            }
        }
        if changed {
            self.apply_options();
        } else if self.debug_mode {
            self.send(&format!("info string option {} not changed", name));
        }
    }

    fn cmd_ucinewgame(&mut self) {
        self.engine.lock().unwrap().clear_hash();
    }

    fn cmd_position(&mut self, args: &[&str]) {
        if args.is_empty() {
            return;
        }

        let mut moves_index = None;
        match args[0] {
            "startpos" => {
                self.position = Position::new();
                if args.len() > 1 && args[1] == "moves" {
                    moves_index = Some(2);
                }
            }
            "fen" => {
                let mut i = 1;
                let mut fen_parts = Vec::new();
                while i < args.len() && args[i] != "moves" {
                    fen_parts.push(args[i]);
                    i += 1;
                }
                match Position::from_fen(&fen_parts.join(" ")) {
                    Ok(pos) => self.position = pos,
                    Err(err) => {
                        log::warn!("rejected fen: {}", err);
                        self.send(&format!("info string {}", err));
                        return;
                    }
                }
                if i < args.len() && args[i] == "moves" {
                    moves_index = Some(i + 1);
                }
            }
            _ => return,
        }

        if let Some(idx) = moves_index {
            for token in &args[idx..] {
                match find_move(&mut self.position, token) {
                    Ok(mv) => self.position.make_move(mv),
                    Err(err) => {
                        log::warn!("rejected move token: {}", err);
                        self.send(&format!("info string {}", err));
                        break;
                    }
                }
            }
        }
    }

    fn cmd_go(&mut self, args: &[&str]) {
        if self.searching() {
            return;
        }

        let side = self.position.side_to_move;
        let mut wtime = 0u64;
        let mut btime = 0u64;
        let mut depth_limit = MAX_SEARCH_DEPTH;
        let mut stype = SearchType::Infinite;

        let mut i = 0;
        while i < args.len() {
            match args[i] {
                "depth" if i + 1 < args.len() => {
                    if let Ok(d) = args[i + 1].parse::<i32>() {
                        depth_limit = d.clamp(1, MAX_SEARCH_DEPTH);
                    }
                    stype = SearchType::Infinite;
                    i += 2;
                }
                "movetime" if i + 1 < args.len() => {
                    if let Ok(ms) = args[i + 1].parse::<u64>() {
                        stype = SearchType::TimePerMove { budget_ms: ms.max(1) };
                    }
                    i += 2;
                }
                "wtime" if i + 1 < args.len() => {
                    wtime = args[i + 1].parse().unwrap_or(0);
                    stype = SearchType::TimePerGame { remaining_ms: 0 };
                    i += 2;
                }
                "btime" if i + 1 < args.len() => {
                    btime = args[i + 1].parse().unwrap_or(0);
                    stype = SearchType::TimePerGame { remaining_ms: 0 };
                    i += 2;
                }
                "infinite" => {
                    stype = SearchType::Infinite;
                    i += 1;
                }
                "ponder" => {
                    stype = SearchType::Ponder { remaining_ms: 0 };
                    i += 1;
                }
                "winc" | "binc" | "movestogo" | "nodes" | "mate" => {
                    i += 2;
                }
                _ => {
                    i += 1;
                }
            }
        }

        let remaining = if side == WHITE { wtime } else { btime };
        match &mut stype {
            SearchType::TimePerGame { remaining_ms } => *remaining_ms = remaining,
            SearchType::Ponder { remaining_ms } => *remaining_ms = remaining,
            _ => {}
        }

        let engine = Arc::clone(&self.engine);
        let mut pos = self.position.clone();
        self.search = Some(thread::spawn(move || {
            let mut engine = engine.lock().unwrap();
            engine.set_depth_limit(depth_limit);
            engine.start_thinking(stype, &mut pos, true);
        }));
    }

    fn cmd_ponderhit(&mut self) {
        self.ctx.ponder_hit.store(true, Ordering::SeqCst);
    }

    fn cmd_quit(&mut self) {
        self.running = false;
    }

    fn cmd_debug(&mut self, args: &[&str]) {
        if !args.is_empty() {
            self.debug_mode = args[0] == "on";
        }
    }

    fn cmd_display(&mut self) {
        self.send(&self.position.display());
        self.send(&format!("Fen: {}", self.position.to_fen()));
        self.send(&format!("Key: {:016x}", self.position.hash));
    }

    fn cmd_perft(&mut self, args: &[&str]) {
        let depth = args.first().and_then(|s| s.parse().ok()).unwrap_or(6);
        let mut pos = self.position.clone();
        perft::run_perft(&mut pos, depth);
    }

    fn cmd_divide(&mut self, args: &[&str]) {
        let depth = args.first().and_then(|s| s.parse().ok()).unwrap_or(6);
        let mut pos = self.position.clone();
        perft::run_divide(&mut pos, depth);
    }

    fn cmd_bench(&mut self, args: &[&str]) {
        let depth = args.first().and_then(|s| s.parse().ok()).unwrap_or(8);
        let hash_mb = self.option_int("Hash").max(1) as usize;
        let threads = self.option_int("Threads").max(1) as usize;
        if let Err(err) = perft::run_bench(depth, hash_mb, threads) {
            self.send(&format!("info string {}", err));
        }
    }

    fn option_int(&self, name: &str) -> i32 {
        self.options
            .iter()
            .find(|opt| opt.name == name)
            .map(|opt| opt.get_int())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn protocol() -> UCIProtocol {
        UCIProtocol::new(8, 1)
    }

    fn finish_search(uci: &mut UCIProtocol) {
        if let Some(handle) = uci.search.take() {
            handle.join().unwrap();
        }
    }

    #[test]
    fn startpos_with_moves_is_applied() {
        let mut uci = protocol();
        uci.process_command("position startpos moves e2e4 e7e5 g1f3");

        assert_eq!(uci.position.side_to_move, BLACK);
        // Emitted FENs always carry the fixed "0 1" tail
        assert_eq!(
            uci.position.to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 0 1"
        );
        assert_eq!(uci.position.halfmove_clock, 1);
        assert_eq!(uci.position.fullmove_number, 2);
    }

    #[test]
    fn fen_position_with_moves_is_applied() {
        let mut uci = protocol();
        uci.process_command("position fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1 moves e2e4");

        assert_eq!(uci.position.to_fen(), "4k3/8/8/8/4P3/8/8/4K3 b - e3 0 1");
    }

    #[test]
    fn bad_fen_leaves_position_untouched() {
        let mut uci = protocol();
        uci.process_command("position startpos moves e2e4");
        let before = uci.position.to_fen();

        uci.process_command("position fen not/a/real/position w - - 0 1");
        assert_eq!(uci.position.to_fen(), before);
    }

    #[test]
    fn illegal_move_stops_the_move_list() {
        let mut uci = protocol();
        uci.process_command("position startpos moves e2e4 e2e4 e7e5");

        // Only the first token was legal
        assert_eq!(uci.position.side_to_move, BLACK);
        assert_eq!(uci.position.fullmove_number, 1);
    }

    #[test]
    fn setoption_clamps_spins_into_bounds() {
        let mut uci = protocol();
        uci.process_command("setoption name Hash value 64");
        assert_eq!(uci.option_int("Hash"), 64);

        uci.process_command("setoption name Hash value 99999");
        assert_eq!(uci.option_int("Hash"), 1024);

        uci.process_command("setoption name Threads value 0");
        assert_eq!(uci.option_int("Threads"), 1);
    }

    #[test]
    fn hash_resize_refreshes_the_context_handle() {
        let mut uci = protocol();
        uci.process_command("setoption name Hash value 16");
        let current = uci.engine.lock().unwrap().context();
        assert!(Arc::ptr_eq(&uci.ctx, &current));
    }

    #[test]
    fn go_depth_completes_and_raises_stop() {
        let mut uci = protocol();
        uci.process_command("position startpos");
        uci.process_command("go depth 3");
        finish_search(&mut uci);

        assert!(uci.ctx.stop.load(Ordering::SeqCst));
        assert_eq!(uci.position.to_fen(), Position::new().to_fen());
    }

    #[test]
    fn stop_without_search_is_harmless() {
        let mut uci = protocol();
        uci.process_command("stop");
        uci.process_command("position startpos moves e2e4");
        assert_eq!(uci.position.side_to_move, BLACK);
    }

    #[test]
    fn quit_exits_the_loop_flag() {
        let mut uci = protocol();
        uci.process_command("quit");
        assert!(!uci.running);
    }

    #[test]
    fn spin_option_renders_with_bounds() {
        let opt = UCIOption::spin("Hash", 32, 1, 1024);
        assert_eq!(
            opt.to_uci_string(),
            "option name Hash type spin default 32 min 1 max 1024"
        );
    }

    #[test]
    fn check_option_parses_case_insensitively() {
        let mut opt = UCIOption::check("Ponder", true);
        assert!(opt.set_value("FALSE"));
        assert!(!opt.get_bool());
    }
}
