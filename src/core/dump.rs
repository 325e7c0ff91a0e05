// KioskLog - core/dump.rs
//
// Raw line grammars for the `dump` command, one per log kind.
// Core layer: pure functions over file names and lines.
//
// Accepted shapes (after trimming the whole line):
//   main     10:20:28.389 [Info]启动MQTT重连定时器
//   local    09:24:12 645 [ServiceUnavailableHelper.CheckServerConnect]服务器状态：False
//   command  09:23:12.395  HttpHelper Send   https://example.invalid/api/clientParameter

use crate::util::constants;
use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const MAIN_PATTERN: &str = r"^(\d{2}:\d{2}:\d{2}\.\d{3})\s*\[([^\]]+)\](.*)";
const LOCAL_PATTERN: &str = r"^(\d{2}:\d{2}:\d{2})\s+(\d+)\s+\[([^\]]+)\](.*)";
const COMMAND_PATTERN: &str = r"^(\d{2}:\d{2}:\d{2}\.\d{3})\s+(\S+)\s+(\S+)\s*(.*)";

fn main_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(MAIN_PATTERN).expect("dump: invalid main regex"))
}

fn local_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LOCAL_PATTERN).expect("dump: invalid local regex"))
}

fn command_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(COMMAND_PATTERN).expect("dump: invalid command regex"))
}

// =============================================================================
// Log kinds
// =============================================================================

/// Which daily log a file is, decided by its name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Main,
    Local,
    Command,
}

impl LogKind {
    pub const ALL: [LogKind; 3] = [LogKind::Main, LogKind::Local, LogKind::Command];

    /// `*_local.log` and `*_command.log` are their own kinds; any other
    /// `.log` file is the main log. Everything else is not a log.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        if file_name.ends_with("_local.log") {
            Some(Self::Local)
        } else if file_name.ends_with("_command.log") {
            Some(Self::Command)
        } else if file_name.ends_with(".log") {
            Some(Self::Main)
        } else {
            None
        }
    }

    /// Table name, also used as the output file stem.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Main => "Main_Logs",
            Self::Local => "Local_Logs",
            Self::Command => "Command_Logs",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Main => &constants::MAIN_DUMP_COLUMNS,
            Self::Local => &constants::LOCAL_DUMP_COLUMNS,
            Self::Command => &constants::COMMAND_DUMP_COLUMNS,
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Main => "main",
            Self::Local => "local",
            Self::Command => "command",
        })
    }
}

// =============================================================================
// Rows
// =============================================================================

/// Fields captured after the timestamp, by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpFields {
    Main {
        level: String,
        message: String,
    },
    Local {
        sequence: String,
        component: String,
        message: String,
    },
    Command {
        component: String,
        action: String,
        details: String,
    },
}

/// One dumped log line. The timestamp is kept exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRow {
    pub date: NaiveDate,
    pub timestamp: String,
    pub fields: DumpFields,
}

impl DumpRow {
    pub fn kind(&self) -> LogKind {
        match self.fields {
            DumpFields::Main { .. } => LogKind::Main,
            DumpFields::Local { .. } => LogKind::Local,
            DumpFields::Command { .. } => LogKind::Command,
        }
    }

    /// Cell values in the order of [`LogKind::columns`].
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![self.date.format("%Y-%m-%d").to_string(), self.timestamp.clone()];
        match &self.fields {
            DumpFields::Main { level, message } => {
                cells.extend([level.clone(), message.clone()]);
            }
            DumpFields::Local {
                sequence,
                component,
                message,
            } => cells.extend([sequence.clone(), component.clone(), message.clone()]),
            DumpFields::Command {
                component,
                action,
                details,
            } => cells.extend([component.clone(), action.clone(), details.clone()]),
        }
        cells
    }
}

/// Parse one raw line of a `kind` log dated `date`.
///
/// Lines outside the grammar yield `None`.
pub fn parse_dump_line(kind: LogKind, date: NaiveDate, raw: &str) -> Option<DumpRow> {
    let line = raw.trim();
    let (timestamp, fields) = match kind {
        LogKind::Main => {
            let caps = main_regex().captures(line)?;
            (
                caps[1].to_string(),
                DumpFields::Main {
                    level: caps[2].to_string(),
                    message: caps[3].trim().to_string(),
                },
            )
        }
        LogKind::Local => {
            let caps = local_regex().captures(line)?;
            (
                caps[1].to_string(),
                DumpFields::Local {
                    sequence: caps[2].to_string(),
                    component: caps[3].to_string(),
                    message: caps[4].trim().to_string(),
                },
            )
        }
        LogKind::Command => {
            let caps = command_regex().captures(line)?;
            (
                caps[1].to_string(),
                DumpFields::Command {
                    component: caps[2].to_string(),
                    action: caps[3].to_string(),
                    details: caps[4].trim().to_string(),
                },
            )
        }
    };
    Some(DumpRow {
        date,
        timestamp,
        fields,
    })
}

/// Parse every line of one file, skipping lines outside the grammar.
pub fn parse_dump_content(kind: LogKind, date: NaiveDate, content: &str) -> Vec<DumpRow> {
    content
        .lines()
        .filter_map(|line| parse_dump_line(kind, date, line))
        .collect()
}

// =============================================================================
// Tables
// =============================================================================

/// Dumped rows grouped by kind, each in file then line order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpTables {
    main: Vec<DumpRow>,
    local: Vec<DumpRow>,
    command: Vec<DumpRow>,
}

impl DumpTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, kind: LogKind, rows: Vec<DumpRow>) {
        self.rows_mut(kind).extend(rows);
    }

    pub fn rows(&self, kind: LogKind) -> &[DumpRow] {
        match kind {
            LogKind::Main => &self.main,
            LogKind::Local => &self.local,
            LogKind::Command => &self.command,
        }
    }

    fn rows_mut(&mut self, kind: LogKind) -> &mut Vec<DumpRow> {
        match kind {
            LogKind::Main => &mut self.main,
            LogKind::Local => &mut self.local,
            LogKind::Command => &mut self.command,
        }
    }

    pub fn total(&self) -> usize {
        self.main.len() + self.local.len() + self.command.len()
    }
}
