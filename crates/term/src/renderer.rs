//! TerminalRenderer: flushes text frames to a real terminal.
//!
//! Frames are diffed line by line against the previous one; only changed lines are
//! rewritten.

use std::io::{self, Write};

use anyhow::Result;

use crossterm::{
    cursor,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal, QueueableCommand,
};

use crate::types::Rgb;
use crate::view::Line;

pub struct TerminalRenderer {
    stdout: io::Stdout,
    last: Option<Vec<Line>>,
    buf: Vec<u8>,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            last: None,
            buf: Vec::with_capacity(16 * 1024),
        }
    }

    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.buf.clear();
        self.buf.queue(terminal::EnterAlternateScreen)?;
        self.buf.queue(cursor::Hide)?;
        self.buf.queue(terminal::DisableLineWrap)?;
        self.flush_buf()?;
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.queue(ResetColor)?;
        self.buf.queue(SetAttribute(Attribute::Reset))?;
        self.buf.queue(terminal::EnableLineWrap)?;
        self.buf.queue(cursor::Show)?;
        self.buf.queue(terminal::LeaveAlternateScreen)?;
        self.flush_buf()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Force the next draw to be a full redraw.
    ///
    /// Useful on terminal resize events.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    pub fn draw(&mut self, lines: Vec<Line>) -> Result<()> {
        self.buf.clear();
        match &self.last {
            Some(prev) => encode_diff_into(prev, &lines, &mut self.buf)?,
            None => encode_full_into(&lines, &mut self.buf)?,
        }
        self.flush_buf()?;
        self.last = Some(lines);
        Ok(())
    }

    fn flush_buf(&mut self) -> Result<()> {
        self.stdout.write_all(&self.buf)?;
        self.stdout.flush()?;
        Ok(())
    }
}

/// Encode a full-frame redraw into `out`.
pub fn encode_full_into(lines: &[Line], out: &mut Vec<u8>) -> Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    for (y, line) in lines.iter().enumerate() {
        encode_line_into(y as u16, line, out)?;
    }
    out.queue(ResetColor)?;
    out.queue(SetAttribute(Attribute::Reset))?;
    Ok(())
}

/// Encode only the lines that differ from `prev` into `out`.
pub fn encode_diff_into(prev: &[Line], next: &[Line], out: &mut Vec<u8>) -> Result<()> {
    for (y, line) in next.iter().enumerate() {
        if prev.get(y) != Some(line) {
            encode_line_into(y as u16, line, out)?;
        }
    }
    // Blank out rows the new frame no longer covers.
    for y in next.len()..prev.len() {
        out.queue(cursor::MoveTo(0, y as u16))?;
        out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
    }
    out.queue(ResetColor)?;
    Ok(())
}

fn encode_line_into(y: u16, line: &Line, out: &mut Vec<u8>) -> Result<()> {
    out.queue(cursor::MoveTo(0, y))?;
    for span in &line.spans {
        match span.fg {
            Some(rgb) => out.queue(SetForegroundColor(rgb_to_color(rgb)))?,
            None => out.queue(SetForegroundColor(Color::Reset))?,
        };
        out.queue(Print(&span.text))?;
    }
    out.queue(terminal::Clear(terminal::ClearType::UntilNewLine))?;
    Ok(())
}

fn rgb_to_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}
