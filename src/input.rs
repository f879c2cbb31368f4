//! Line-oriented identifier input from stdin, a file, or a literal argument.

use crate::error::Result;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

/// Argument value that selects standard input explicitly
pub const STDIN_MARKER: &str = "-";

/// Where identifiers come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
    /// Identifiers given directly, one per line
    Literal(String),
}

impl InputSource {
    /// Interpret a positional identifier argument: `-` is stdin, an existing
    /// file is read line by line, anything else is the identifier itself.
    pub fn for_argument(arg: &str) -> Self {
        if arg == STDIN_MARKER {
            InputSource::Stdin
        } else if Path::new(arg).is_file() {
            InputSource::File(PathBuf::from(arg))
        } else {
            InputSource::Literal(arg.to_string())
        }
    }

    /// An optional `--input` path; absent or `-` means stdin
    pub fn for_path(path: Option<&Path>) -> Self {
        match path {
            Some(path) if path != Path::new(STDIN_MARKER) => InputSource::File(path.to_path_buf()),
            _ => InputSource::Stdin,
        }
    }

    pub async fn open(&self) -> Result<TokenReader> {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = match self {
            InputSource::Stdin => Box::new(BufReader::new(tokio::io::stdin())),
            InputSource::File(path) => Box::new(BufReader::new(File::open(path).await?)),
            InputSource::Literal(text) => Box::new(Cursor::new(text.clone().into_bytes())),
        };
        Ok(TokenReader {
            lines: reader.lines(),
        })
    }
}

/// Yields trimmed, non-blank lines one at a time
pub struct TokenReader {
    lines: Lines<Box<dyn AsyncBufRead + Unpin + Send>>,
}

impl TokenReader {
    pub async fn next_token(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.lines.next_line().await? {
            let token = line.trim();
            if !token.is_empty() {
                return Ok(Some(token.to_string()));
            }
        }
        Ok(None)
    }
}
