//! Interactive question loop for `docqa chat`.
//!
//! Reads one question per line. Lines starting with `:` are commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `:files` | list ingested files |
//! | `:filter <name>` | restrict answers to one file |
//! | `:filter` | clear the file filter |
//! | `:top <n>` | change the number of results |
//! | `:quit` | leave the loop |

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::output::{write_results, NOT_FOUND_MESSAGE};
use crate::session::Session;

/// Per-conversation settings changed by `:` commands.
#[derive(Debug, Clone)]
pub struct ChatState {
    pub filter: Option<String>,
    pub top_k: usize,
}

enum Command {
    Files,
    Filter(Option<String>),
    Top(String),
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let rest = line.strip_prefix(':')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    Some(match name {
        "files" => Command::Files,
        "filter" if arg.is_empty() => Command::Filter(None),
        "filter" => Command::Filter(Some(arg.to_string())),
        "top" => Command::Top(arg.to_string()),
        "quit" | "q" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    })
}

/// Run until `:quit` or end of input.
pub async fn run_chat<R, W>(session: &Session, input: R, out: &mut W, mut state: ChatState) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Some(Command::Quit) => break,
            Some(Command::Files) => {
                let names = session.filenames().await?;
                if names.is_empty() {
                    writeln!(out, "no documents ingested")?;
                }
                for name in names {
                    writeln!(out, "  {}", name)?;
                }
            }
            Some(Command::Filter(filter)) => {
                match &filter {
                    Some(name) => writeln!(out, "filter: {}", name)?,
                    None => writeln!(out, "filter cleared")?,
                }
                state.filter = filter;
            }
            Some(Command::Top(arg)) => match arg.parse::<usize>() {
                Ok(n) if n > 0 => {
                    state.top_k = n;
                    writeln!(out, "top: {}", n)?;
                }
                _ => writeln!(out, "usage: :top <positive integer>")?,
            },
            Some(Command::Unknown(name)) => {
                writeln!(out, "unknown command :{} (try :files, :filter, :top, :quit)", name)?;
            }
            None => {
                let results = session
                    .query(line, state.filter.as_deref(), Some(state.top_k), None)
                    .await;
                match results {
                    Ok(results) if results.is_empty() => writeln!(out, "{}", NOT_FOUND_MESSAGE)?,
                    Ok(results) => write_results(out, &results)?,
                    Err(e) => writeln!(out, "error: {}", e)?,
                }
            }
        }
    }
    Ok(())
}
