//! Line-oriented interactive shell.
//!
//! Each received line is tokenized into at most [`MAX_PARAMS`] bounded
//! parameter slots and dispatched against a fixed command table.  The table
//! is stateless: handlers receive the parsed parameter set plus an explicit
//! [`ShellContext`] naming everything they are allowed to touch.  Every
//! line, valid or not, ends with the prompt re-displayed so the session is
//! always ready for the next command.

pub mod ansi;

use heapless::String;
use log::info;

use crate::app::ports::{ShellIo, StoragePort, SystemPort};
use crate::config::bounded;
use crate::config_store::ConfigStore;
use crate::diagnostics::DiagSnapshot;

/// Parameter slots per line.
pub const MAX_PARAMS: usize = 3;
/// Capacity of one parameter slot.
pub const PARAM_LEN: usize = 63;
/// Capacity of a buffered input line.
const LINE_LEN: usize = 128;

/// The parsed parameter slots of one line; slot 0 is the command name.
pub type ParamSet = [String<PARAM_LEN>; MAX_PARAMS];

/// Split a line on spaces into at most [`MAX_PARAMS`] slots.
///
/// Fails (no handler runs) when a token exceeds a slot's capacity or when
/// more tokens arrive than there are slots.  Runs of spaces are treated as
/// one boundary.
pub fn tokenize(line: &str) -> Option<ParamSet> {
    let mut params: ParamSet = Default::default();
    let mut count = 0;
    for token in line.trim().split(' ').filter(|t| !t.is_empty()) {
        if count == MAX_PARAMS || token.len() > PARAM_LEN {
            return None;
        }
        // Length checked above; push cannot fail.
        let _ = params[count].push_str(token);
        count += 1;
    }
    Some(params)
}

// ───────────────────────────────────────────────────────────────
// Command table
// ───────────────────────────────────────────────────────────────

/// Everything a command handler may touch, passed explicitly.
pub struct ShellContext<'a> {
    pub io: &'a mut dyn ShellIo,
    pub store: &'a mut ConfigStore,
    pub storage: &'a mut dyn StoragePort,
    pub system: &'a mut dyn SystemPort,
    pub diag: &'a DiagSnapshot,
}

type Handler = fn(&mut ShellContext<'_>, &ParamSet);

struct ShellCommand {
    name: &'static str,
    params: &'static str,
    help: &'static str,
    handler: Handler,
}

static COMMANDS: &[ShellCommand] = &[
    ShellCommand {
        name: "cls",
        params: "",
        help: "clear terminal screen",
        handler: cmd_cls,
    },
    ShellCommand {
        name: "config",
        params: "<reset>",
        help: "reset configuration to defaults",
        handler: cmd_config,
    },
    ShellCommand {
        name: "disconnect",
        params: "",
        help: "close this session",
        handler: cmd_disconnect,
    },
    ShellCommand {
        name: "help",
        params: "[command]",
        help: "show help text",
        handler: cmd_help,
    },
    ShellCommand {
        name: "info",
        params: "",
        help: "show device information",
        handler: cmd_info,
    },
    ShellCommand {
        name: "restart",
        params: "",
        help: "restart the device",
        handler: cmd_restart,
    },
];

fn cmd_cls(ctx: &mut ShellContext<'_>, _params: &ParamSet) {
    ctx.io.print(ansi::CLEAR_SCREEN);
    ctx.io.print(ansi::CURSOR_HOME);
}

fn cmd_config(ctx: &mut ShellContext<'_>, params: &ParamSet) {
    if params[1].as_str() == "reset" {
        ctx.store.reset_to_defaults();
        match ctx.store.save(ctx.storage) {
            Ok(()) => ctx.io.println("configuration reset to defaults"),
            Err(e) => ctx.io.println(&format!("configuration reset failed: {e}")),
        }
    } else {
        ctx.io.println("Syntax error. Use 'config reset'.");
    }
}

fn cmd_disconnect(ctx: &mut ShellContext<'_>, _params: &ParamSet) {
    ctx.io.println("bye");
    ctx.io.disconnect();
}

fn cmd_help(ctx: &mut ShellContext<'_>, params: &ParamSet) {
    if params[1].is_empty() {
        ctx.io.println("available commands:");
        for cmd in COMMANDS {
            ctx.io
                .println(&format!("  {:<12}{:<12}{}", cmd.name, cmd.params, cmd.help));
        }
        return;
    }
    match COMMANDS.iter().find(|c| c.name == params[1].as_str()) {
        Some(cmd) => ctx
            .io
            .println(&format!("{} {} - {}", cmd.name, cmd.params, cmd.help)),
        None => ctx
            .io
            .println("Unknown command. Use 'help' to see all commands."),
    }
}

fn cmd_info(ctx: &mut ShellContext<'_>, _params: &ParamSet) {
    let d = ctx.diag;
    let c = ctx.store.config();
    ctx.io.println(&format!("firmware      {}", env!("CARGO_PKG_VERSION")));
    ctx.io.println(&format!("hostname      {}", c.wifi.hostname));
    ctx.io.println(&format!("uptime        {}", d.uptime));
    ctx.io.println(&format!("time          {}", d.date_time));
    ctx.io.println(&format!("ip address    {}", d.ip_address));
    match d.rssi {
        Some(rssi) => ctx.io.println(&format!("wifi rssi     {rssi} dBm")),
        None => ctx.io.println("wifi rssi     ---"),
    }
    ctx.io
        .println(&format!("restart cause {}", d.restart_reason));
    ctx.io.println(&format!(
        "bus           {}",
        if d.bus_connected { "connected" } else { "disconnected" }
    ));
    ctx.io
        .println(&format!("bus error     {}", d.bus_last_error));
    if d.setup_mode {
        ctx.io.println("setup mode    active");
    }
}

fn cmd_restart(ctx: &mut ShellContext<'_>, _params: &ParamSet) {
    ctx.io.println("restarting device ...");
    info!("restart requested over telnet");
    ctx.system.save_restart_reason("telnet command");
    ctx.system.delay_ms(1000);
    ctx.system.restart();
}

// ───────────────────────────────────────────────────────────────
// Session
// ───────────────────────────────────────────────────────────────

/// One interactive session.  The transport callback hands complete lines to
/// [`on_line`](ShellSession::on_line) (bounded copy only); dispatch happens
/// in [`cyclic`](ShellSession::cyclic) on the cooperative cycle.
#[derive(Debug, Default)]
pub struct ShellSession {
    pending: Option<String<LINE_LEN>>,
}

impl ShellSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect banner plus the first prompt.
    pub fn greet(&self, io: &mut dyn ShellIo) {
        io.println(&format!(
            "{}EspWebUI {}{}",
            ansi::FG_BRIGHT_WHITE,
            env!("CARGO_PKG_VERSION"),
            ansi::RESET
        ));
        io.println("type 'help' to see all commands");
        prompt(io);
    }

    /// Buffer one received line for the next cycle (truncating copy).
    pub fn on_line(&mut self, line: &str) {
        self.pending = Some(bounded(line));
    }

    /// Dispatch the buffered line, if any.
    pub fn cyclic(&mut self, ctx: &mut ShellContext<'_>) {
        if let Some(line) = self.pending.take() {
            dispatch(line.as_str(), ctx);
        }
    }
}

fn prompt(io: &mut dyn ShellIo) {
    io.print(ansi::FG_BRIGHT_GREEN);
    io.print("$ >");
    io.print(ansi::RESET);
    io.print(" ");
}

fn dispatch(line: &str, ctx: &mut ShellContext<'_>) {
    let Some(params) = tokenize(line) else {
        ctx.io.println("Syntax error");
        prompt(ctx.io);
        return;
    };

    // Empty line: just re-display the prompt.
    if params[0].is_empty() {
        prompt(ctx.io);
        return;
    }

    match COMMANDS.iter().find(|c| c.name == params[0].as_str()) {
        Some(cmd) => (cmd.handler)(ctx, &params),
        None => ctx
            .io
            .println("Unknown command. Use 'help' to see all commands."),
    }
    prompt(ctx.io);
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────


#[cfg(all(test, not(target_os = "espidf")))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn tokenize_never_panics(line in "[ -~]{0,200}") {
            let _ = tokenize(&line);
        }

        #[test]
        fn short_token_lines_always_parse(tokens in prop::collection::vec("[!-~]{1,63}", 0..=3)) {
            let line = tokens.join(" ");
            let params = tokenize(&line).unwrap();
            for (i, token) in tokens.iter().enumerate() {
                prop_assert_eq!(params[i].as_str(), token.as_str());
            }
        }
    }
}
