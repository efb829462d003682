use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::Error;

/// Leading whitespace for one level of nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
    Tabs,
    Spaces(usize),
}

impl Indent {
    /// Write `depth` levels of indentation.
    pub fn write(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            match self {
                Indent::Tabs => out.push('\t'),
                Indent::Spaces(n) => out.extend(std::iter::repeat(' ').take(*n)),
            }
        }
    }
}

/// How rendered text is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub indent: Indent,

    /// Pad the columns of line-oriented output (zone files) to a
    /// common width.
    pub align_columns: bool,

    /// End the output with exactly one newline.  If false, the final
    /// newline is stripped.
    pub trailing_newline: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: Indent::Spaces(4),
            align_columns: true,
            trailing_newline: true,
        }
    }
}

/// Something which renders as one line of whitespace-separated
/// columns, such as a resource record.
pub trait Columns {
    /// The cells of the line.  Empty cells are skipped when the
    /// column they belong to is empty in every row.
    fn columns(&self) -> Vec<String>;

    /// Lines written verbatim before the row, such as comments.
    fn preamble(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Something which renders as a (possibly nested) block of
/// configuration text.
pub trait Block {
    /// Append this block to `out`, indented to `depth`.
    fn render_block(&self, out: &mut String, depth: usize, options: &FormatOptions);
}

/// Render a sequence of rows, one per line.
///
/// With `align_columns`, every column but the last is padded to the
/// width of its widest cell.  Trailing whitespace is never emitted.
pub fn render_lines<'a, T, I>(rows: I, options: &FormatOptions) -> String
where
    T: Columns + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let rendered: Vec<(Vec<String>, Vec<String>)> = rows
        .into_iter()
        .map(|row| (row.preamble(), row.columns()))
        .collect();

    let mut widths: Vec<usize> = Vec::new();
    for (_, cells) in &rendered {
        for (i, cell) in cells.iter().enumerate() {
            if i == widths.len() {
                widths.push(0);
            }
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for (preamble, cells) in rendered {
        for line in preamble {
            out.push_str(&line);
            out.push('\n');
        }

        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if widths[i] == 0 {
                continue;
            }
            if !line.is_empty() {
                line.push(' ');
            }
            if options.align_columns {
                line.push_str(&format!("{cell:<width$}", width = widths[i]));
            } else if !cell.is_empty() {
                line.push_str(cell);
            } else {
                // nothing in this cell, drop the separator again
                line.pop();
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Render a sequence of top-level blocks.
pub fn render_blocks<'a, T, I>(items: I, options: &FormatOptions) -> String
where
    T: Block + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out = String::new();
    for item in items {
        item.render_block(&mut out, 0, options);
    }
    out
}

/// Apply the trailing newline policy to a complete document.  An
/// empty document stays empty.
pub fn finish(mut text: String, options: &FormatOptions) -> String {
    while text.ends_with('\n') {
        text.pop();
    }
    if options.trailing_newline && !text.is_empty() {
        text.push('\n');
    }
    text
}

/// Write a complete document to a path.
///
/// The text goes to a temporary file in the destination directory
/// first, which is then renamed over the path, so a failed write never
/// leaves a partial file behind.
///
/// # Errors
///
/// If the temporary file cannot be created, written, or renamed.
pub fn write_file<P: AsRef<Path>>(path: P, contents: &str) -> Result<(), Error> {
    let path = path.as_ref();
    let io_error = |error| Error::Io {
        path: path.to_path_buf(),
        error,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(contents.as_bytes()).map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;
    file.persist(path).map_err(|err| io_error(err.error))?;

    tracing::debug!(?path, octets = contents.len(), "wrote file");
    Ok(())
}

/// Write a complete document to a stream and flush it.
///
/// # Errors
///
/// If the stream cannot be written or flushed.
pub fn write_to<W: Write + ?Sized>(stream: &mut W, contents: &str) -> io::Result<()> {
    stream.write_all(contents.as_bytes())?;
    stream.flush()
}
