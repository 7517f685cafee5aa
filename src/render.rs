//! Terminal renderer for validation results.
//!
//! Draws the status line, the SQL source with error lines marked, and the
//! projected summary. Styling goes through crossterm and can be disabled
//! for non-terminal output.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::style::{style, Color, Stylize};
use crossterm::terminal::{Clear, ClearType};

use crate::projector::{Projection, ProjectionStatus};

const RULE: &str = "────────────────────────────────────────";

/// Everything one redraw needs.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub source: Option<&'a str>,
    pub dialect: &'a str,
    pub is_loading: bool,
    pub projection: &'a Projection,
}

pub struct TerminalRenderer<W: Write> {
    out: W,
    color: bool,
    clear: bool,
}

impl<W: Write> TerminalRenderer<W> {
    /// Plain renderer: no colors, no screen clearing.
    pub fn new(out: W) -> Self {
        Self {
            out,
            color: false,
            clear: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Clear the screen before each frame.
    pub fn with_clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn render(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        if self.clear {
            crossterm::queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }

        let status = if frame.is_loading {
            self.paint("Validating...", Color::Cyan)
        } else {
            match frame.projection.status {
                ProjectionStatus::Empty => "Waiting for input".to_string(),
                ProjectionStatus::Valid => self.paint("Valid", Color::Green),
                ProjectionStatus::Invalid => self.paint("Invalid", Color::Red),
                ProjectionStatus::Failed => self.paint("Error", Color::Yellow),
            }
        };
        writeln!(self.out, "SQL Syntax Validator | dialect: {} | {}", frame.dialect, status)?;

        if let Some(source) = frame.source {
            writeln!(self.out, "{}", RULE)?;
            self.render_source(source, frame.projection)?;
        }

        if !frame.projection.summary.is_empty() {
            writeln!(self.out, "{}", RULE)?;
            let color = match frame.projection.status {
                ProjectionStatus::Valid => Color::Green,
                ProjectionStatus::Failed => Color::Yellow,
                _ => Color::Red,
            };
            let mut lines = frame.projection.summary.lines();
            if let Some(first) = lines.next() {
                let first = self.paint(first, color);
                writeln!(self.out, "{}", first)?;
            }
            for line in lines {
                writeln!(self.out, "{}", line)?;
            }
        }

        if let Some(fixed) = &frame.projection.fixed_text {
            writeln!(self.out, "{}", RULE)?;
            let heading = self.paint("Auto-fixed SQL:", Color::Blue);
            writeln!(self.out, "{}", heading)?;
            for line in fixed.lines() {
                writeln!(self.out, "  {}", line)?;
            }
        }

        self.out.flush()
    }

    fn render_source(&mut self, source: &str, projection: &Projection) -> io::Result<()> {
        let width = source.lines().count().max(1).to_string().len();
        for (index, line) in source.lines().enumerate() {
            let number = u32::try_from(index + 1).unwrap_or(u32::MAX);
            if projection.error_lines.contains(&number) {
                let text = format!("> {:>width$} | {}", number, line, width = width);
                let text = self.paint(&text, Color::Red);
                writeln!(self.out, "{}", text)?;
            } else {
                writeln!(self.out, "  {:>width$} | {}", number, line, width = width)?;
            }
        }
        Ok(())
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            style(text).with(color).to_string()
        } else {
            text.to_string()
        }
    }
}
