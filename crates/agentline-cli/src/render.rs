//! Incremental terminal rendering of the transcript.
//!
//! The renderer remembers how much of each message it has written and only
//! prints what is new. Text already shown is never taken back: when a tool
//! payload is lifted out of an ai message the payload stays where it was
//! printed and the tool message is shown again under its own label. Tool
//! messages naming a file are followed by a `[file]` line pointing at
//! `/download`.

use agentline_core::file_reference;
use agentline_types::{Message, Sender};
use std::io::{self, Write};

fn label(sender: Sender) -> &'static str {
    match sender {
        Sender::Human => "you> ",
        Sender::Ai => "agent> ",
        Sender::Tool => "[tool] ",
    }
}

fn file_hint(message: &Message) -> Option<String> {
    if message.sender != Sender::Tool {
        return None;
    }
    file_reference(&message.content).map(|path| format!("[file] {} (/download to save)", path))
}

#[derive(Debug, Default)]
pub struct Renderer {
    /// Sender and printed byte length per message
    printed: Vec<(Sender, usize)>,
    at_line_start: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            printed: Vec::new(),
            at_line_start: true,
        }
    }

    /// Print whatever changed since the last call. Human messages are not
    /// echoed; the user just typed them.
    pub fn render(&mut self, messages: &[Message], out: &mut impl Write) -> io::Result<()> {
        let diverged = self
            .printed
            .iter()
            .zip(messages)
            .position(|((sender, _), message)| *sender != message.sender)
            .unwrap_or(self.printed.len().min(messages.len()));
        self.printed.truncate(diverged);

        for (index, message) in messages.iter().enumerate() {
            let len = message.content.len();

            if let Some((_, shown)) = self.printed.get_mut(index) {
                if len > *shown && message.content.is_char_boundary(*shown) {
                    let delta = &message.content[*shown..];
                    out.write_all(delta.as_bytes())?;
                    self.at_line_start = delta.ends_with('\n');
                }
                *shown = len;
                continue;
            }

            self.printed.push((message.sender, len));
            if message.sender == Sender::Human {
                continue;
            }
            self.start_line(out)?;
            write!(out, "{}{}", label(message.sender), message.content)?;
            if let Some(hint) = file_hint(message) {
                write!(out, "\n{}", hint)?;
            }
            self.at_line_start = false;
        }

        out.flush()
    }

    /// Forget what was printed and write the whole transcript.
    pub fn redraw(&mut self, messages: &[Message], out: &mut impl Write) -> io::Result<()> {
        self.printed.clear();
        self.start_line(out)?;

        for message in messages {
            writeln!(out, "{}{}", label(message.sender), message.content)?;
            if let Some(hint) = file_hint(message) {
                writeln!(out, "{}", hint)?;
            }
            self.printed.push((message.sender, message.content.len()));
        }
        self.at_line_start = true;
        out.flush()
    }

    /// End the current output line, if one is open.
    pub fn finish_turn(&mut self, out: &mut impl Write) -> io::Result<()> {
        self.start_line(out)?;
        out.flush()
    }

    pub fn reset(&mut self) {
        self.printed.clear();
    }

    fn start_line(&mut self, out: &mut impl Write) -> io::Result<()> {
        if !self.at_line_start {
            writeln!(out)?;
            self.at_line_start = true;
        }
        Ok(())
    }
}
