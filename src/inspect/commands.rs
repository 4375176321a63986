use std::io::Write;

use thiserror::Error;
use tracing::debug;

use crate::{
    inspect::{PageInfo, describe_elements, dump},
    storage::page_reader::PageReader,
    types::{
        Pgid,
        error::PageError,
        page::{Page, PageType},
        pgids::Pgids,
    },
};

pub const HELP_TEXT: &str = r#"
Available commands:
  help, h              - Show this help message
  pages                - Number of pages in the file
  info <id>            - Header summary of a page (JSON)
  dump <id> [n]        - Hex dump of the first n bytes (default: whole page)
  elements <id>        - Keys and values of a branch or leaf page
  freelist <id>        - Page ids stored on a freelist page
  clear                - Clear the screen
  exit, quit, q        - Exit the inspector
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Pages,
    Info(Pgid),
    Dump(Pgid, Option<usize>),
    Elements(Pgid),
    Freelist(Pgid),
    Clear,
    Exit,
    Empty,
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Unknown command: {0} (try 'help')")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn parse_number<T: std::str::FromStr>(token: &str) -> Result<T, CommandError> {
    token
        .parse()
        .map_err(|_| CommandError::InvalidNumber(token.to_string()))
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let mut tokens = input.split_whitespace();
        let Some(head) = tokens.next() else {
            return Ok(Command::Empty);
        };
        let args: Vec<&str> = tokens.collect();

        match (head.to_lowercase().as_str(), args.as_slice()) {
            ("help" | "h", []) => Ok(Command::Help),
            ("exit" | "quit" | "q", []) => Ok(Command::Exit),
            ("clear", []) => Ok(Command::Clear),
            ("pages", []) => Ok(Command::Pages),
            ("info", [id]) => Ok(Command::Info(parse_number(id)?)),
            ("info", _) => Err(CommandError::Usage("info <id>")),
            ("dump", [id]) => Ok(Command::Dump(parse_number(id)?, None)),
            ("dump", [id, n]) => Ok(Command::Dump(parse_number(id)?, Some(parse_number(n)?))),
            ("dump", _) => Err(CommandError::Usage("dump <id> [n]")),
            ("elements", [id]) => Ok(Command::Elements(parse_number(id)?)),
            ("elements", _) => Err(CommandError::Usage("elements <id>")),
            ("freelist", [id]) => Ok(Command::Freelist(parse_number(id)?)),
            ("freelist", _) => Err(CommandError::Usage("freelist <id>")),
            _ => Err(CommandError::Unknown(input.trim().to_string())),
        }
    }
}

/// Runs one command against the open file, writing results to `out`.
/// Returns false when the session should end.
pub fn execute<W: Write>(
    reader: &mut PageReader,
    command: &Command,
    out: &mut W,
) -> Result<bool, CommandError> {
    debug!("Executing {:?}", command);
    match command {
        Command::Exit => return Ok(false),
        Command::Empty => {}
        Command::Help => writeln!(out, "{}", HELP_TEXT)?,
        Command::Clear => {
            write!(out, "\x1B[2J\x1B[1;1H")?;
            out.flush()?;
        }
        Command::Pages => writeln!(
            out,
            "{} pages of {} bytes",
            reader.page_count(),
            reader.page_size().get()
        )?,
        Command::Info(id) => {
            let buf = reader.read_page(*id)?;
            let info = PageInfo::from_page(&Page::new(&buf)?);
            writeln!(out, "{}", serde_json::to_string_pretty(&info)?)?;
        }
        Command::Dump(id, n) => {
            let buf = reader.read_page(*id)?;
            let n = n.unwrap_or(buf.len()).min(buf.len());
            dump(&Page::new(&buf)?, n, out)?;
        }
        Command::Elements(id) => {
            let buf = reader.read_page(*id)?;
            let page = Page::new(&buf)?;
            match page.page_type() {
                Some(PageType::Branch | PageType::Leaf) => {
                    for line in describe_elements(&page)? {
                        writeln!(out, "{}", line)?;
                    }
                }
                _ => {
                    return Err(PageError::UnexpectedPageType {
                        id: *id,
                        expected: "branch or leaf",
                        actual: page.type_name(),
                    }
                    .into());
                }
            }
        }
        Command::Freelist(id) => {
            let buf = reader.read_page(*id)?;
            let page = Page::new(&buf)?;
            if !page.is_freelist() {
                return Err(PageError::UnexpectedPageType {
                    id: *id,
                    expected: "freelist",
                    actual: page.type_name(),
                }
                .into());
            }
            let ids: Pgids = page.try_freelist_ids()?.collect();
            writeln!(out, "{}", serde_json::to_string(&ids)?)?;
        }
    }
    Ok(true)
}

/// Parses and executes one line of input.
pub fn run_line<W: Write>(
    reader: &mut PageReader,
    input: &str,
    out: &mut W,
) -> Result<bool, CommandError> {
    let command = Command::parse(input)?;
    execute(reader, &command, out)
}
