//! Diagnostic commands for the persistent macro slots.
//!
//! One command per line, the firmware passes the lines it receives on its debug channel.
//! Lines of other commands return [`ConsoleError::UnknownCommand`].
use core::fmt::Write;

use crate::config::{PERSISTENT_SLOTS, RECORD_SIZE, TOTAL_SLOTS};
use crate::storage::eeprom::Eeprom;
use crate::storage::{MacroRecord, MacroStore, Occupancy, StoreError};

/// Console error with code and message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleError {
    /// E01: Unknown command
    UnknownCommand,
    /// E02: Invalid argument
    InvalidArgument,
    /// E03: Storage error
    Storage,
    /// E04: Writing the output failed
    Output,
}

impl ConsoleError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "E01",
            Self::InvalidArgument => "E02",
            Self::Storage => "E03",
            Self::Output => "E04",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "unknown command",
            Self::InvalidArgument => "invalid argument",
            Self::Storage => "storage error",
            Self::Output => "output error",
        }
    }
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl From<core::fmt::Error> for ConsoleError {
    fn from(_: core::fmt::Error) -> Self {
        ConsoleError::Output
    }
}

impl From<StoreError> for ConsoleError {
    fn from(_: StoreError) -> Self {
        ConsoleError::Storage
    }
}

/// Parsed command line, the command name and up to 2 arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub command: &'a str,
    pub args: [Option<&'a str>; 2],
    /// More arguments than `args` can hold were given
    pub extra_args: bool,
}

impl<'a> ParsedCommand<'a> {
    /// Get argument by index (0-based)
    pub fn arg(&self, idx: usize) -> Option<&'a str> {
        self.args.get(idx).copied().flatten()
    }
}

/// Split a command line on whitespace
pub fn parse_line(line: &str) -> ParsedCommand<'_> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("");

    let mut args = [None; 2];
    for arg in args.iter_mut() {
        *arg = parts.next();
    }

    ParsedCommand {
        command,
        args,
        extra_args: parts.next().is_some(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Help,
    Dump,
    Clean,
    Commit,
    Free,
}

struct CommandDescriptor {
    name: &'static str,
    brief: &'static str,
    command: Command,
}

static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "help",
        brief: "List commands",
        command: Command::Help,
    },
    CommandDescriptor {
        name: "live_macros.dump",
        brief: "Show persistent macros, `raw` for the stored bytes",
        command: Command::Dump,
    },
    CommandDescriptor {
        name: "live_macros.clean",
        brief: "Erase all persistent macros",
        command: Command::Clean,
    },
    CommandDescriptor {
        name: "live_macros.commit",
        brief: "Write persistent macros to flash",
        command: Command::Commit,
    },
    CommandDescriptor {
        name: "live_macros.free",
        brief: "Show free macro slots",
        command: Command::Free,
    },
];

/// Get all command names
pub fn command_names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|c| c.name)
}

/// Parse and execute a command line
pub fn execute_line<E: Eeprom>(line: &str, store: &mut MacroStore<E>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    execute(&parse_line(line), store, out)
}

/// Execute a parsed command
pub fn execute<E: Eeprom>(
    cmd: &ParsedCommand<'_>,
    store: &mut MacroStore<E>,
    out: &mut dyn Write,
) -> Result<(), ConsoleError> {
    if cmd.command.is_empty() {
        return Ok(());
    }

    let descriptor = COMMANDS
        .iter()
        .find(|c| c.name == cmd.command)
        .ok_or(ConsoleError::UnknownCommand)?;
    if cmd.extra_args {
        return Err(ConsoleError::InvalidArgument);
    }
    debug!("Console command: {}", descriptor.name);

    match descriptor.command {
        Command::Help => cmd_help(cmd, out),
        Command::Dump => match (cmd.arg(0), cmd.arg(1)) {
            (None, None) => cmd_dump(store, out),
            (Some("raw"), None) => cmd_dump_raw(store, out),
            _ => Err(ConsoleError::InvalidArgument),
        },
        Command::Clean => no_args(cmd).and_then(|_| cmd_clean(store, out)),
        Command::Commit => no_args(cmd).and_then(|_| cmd_commit(store, out)),
        Command::Free => no_args(cmd).and_then(|_| cmd_free(store, out)),
    }
}

fn no_args(cmd: &ParsedCommand<'_>) -> Result<(), ConsoleError> {
    match cmd.arg(0) {
        Some(_) => Err(ConsoleError::InvalidArgument),
        None => Ok(()),
    }
}

fn cmd_help(cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if let Some(name) = cmd.arg(0) {
        let c = COMMANDS
            .iter()
            .find(|c| c.name == name)
            .ok_or(ConsoleError::UnknownCommand)?;
        writeln!(out, "{}: {}", c.name, c.brief)?;
    } else {
        for c in COMMANDS {
            writeln!(out, "  {:<20} {}", c.name, c.brief)?;
        }
    }
    Ok(())
}

fn cmd_dump<E: Eeprom>(store: &mut MacroStore<E>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let mut raw = [0; RECORD_SIZE];
    for slot in 0..PERSISTENT_SLOTS as u8 {
        store.read_persistent_raw(slot, &mut raw)?;
        write!(out, "slot {}:", slot)?;
        match MacroRecord::from_bytes(&raw) {
            Some(record) => {
                for event in record.events() {
                    let sign = if event.pressed { '+' } else { '-' };
                    write!(out, " {}{:02x}:{:02x}", sign, event.key.flags.into_bits(), event.key.keycode)?;
                }
                writeln!(out)?;
            }
            None => writeln!(out, " free")?,
        }
    }
    Ok(())
}

fn cmd_dump_raw<E: Eeprom>(store: &mut MacroStore<E>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let mut raw = [0; RECORD_SIZE];
    for slot in 0..PERSISTENT_SLOTS as u8 {
        store.read_persistent_raw(slot, &mut raw)?;
        write!(out, "slot {}:", slot)?;
        for byte in raw {
            write!(out, " {:02x}", byte)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn cmd_clean<E: Eeprom>(store: &mut MacroStore<E>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    store.erase_persistent()?;
    writeln!(out, "persistent macros erased, run live_macros.commit to persist")?;
    Ok(())
}

fn cmd_commit<E: Eeprom>(store: &mut MacroStore<E>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    store.commit()?;
    writeln!(out, "committed")?;
    Ok(())
}

fn cmd_free<E: Eeprom>(store: &mut MacroStore<E>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let space = store.free_space();
    writeln!(out, "persistent slots free: {}", space.persistent_slots)?;
    writeln!(out, "volatile slots free: {}", space.volatile_slots)?;
    writeln!(out, "slot bytes free: {}", space.bytes)?;
    for slot in 0..TOTAL_SLOTS as u8 {
        if let Occupancy::Occupied(count) = store.occupancy(slot) {
            writeln!(out, "slot {}: {} events", slot, count)?;
        }
    }
    Ok(())
}
