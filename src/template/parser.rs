//! Template source scanner.
//!
//! Splits a template into literal text, code blocks and interpolations.
//!
//! # Grammar
//!
//! ```text
//! ##EJSON          switch template processing on (own line)
//! ##EJSOFF         switch it off again
//! ##EJSDISABLE     everything after this line is literal
//! ## code          directive line; adjacent directive lines form one block
//! ##=              starts a block running up to the next `##=` line
//! #{ expr }        interpolation, brace and string aware
//! ###              escape: `##` at line start
//! ##{              escape: `#{`
//! ```
//!
//! The stream starts with processing off. Command lines may be surrounded
//! by blanks and consume their line break.

/// One structural element of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Literal(String),
    /// Statements, from a directive run or a delimited block.
    Block { code: String, line: usize },
    /// A single expression whose value is written in place.
    Interpolation { code: String, line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    On,
    Off,
    Disable,
}

impl Command {
    fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "EJSON" => Some(Self::On),
            "EJSOFF" => Some(Self::Off),
            "EJSDISABLE" => Some(Self::Disable),
            _ => None,
        }
    }
}

/// What a line starting in main mode turned out to be.
enum Line {
    Text,
    Code,
    Command(Command),
}

/// How main mode ended.
enum Exit {
    Off,
    End,
}

/// Scan `source` into events.
pub fn parse(source: &str) -> Vec<Event> {
    let mut scanner = Scanner::new(source);
    scanner.top();
    scanner.events
}

#[inline]
fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\x0b' | b'\x0c')
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    literal: String,
    events: Vec<Event>,
    line_starts: Vec<usize>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            src,
            pos: 0,
            literal: String::new(),
            events: Vec::new(),
            line_starts,
        }
    }

    /// 1-based line number of a byte offset.
    fn line_at(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    fn line_end(&self, from: usize) -> usize {
        self.src[from..].find('\n').map_or(self.src.len(), |i| from + i)
    }

    /// Position after the line break at `line_end`, if any.
    fn after_line(&self, line_end: usize) -> usize {
        (line_end + 1).min(self.src.len())
    }

    fn skip_blanks(&self, from: usize) -> usize {
        let bytes = self.src.as_bytes();
        let mut i = from;
        while i < bytes.len() && is_blank(bytes[i]) {
            i += 1;
        }
        i
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            self.events.push(Event::Literal(std::mem::take(&mut self.literal)));
        }
    }

    fn push_code(&mut self, code: String, start: usize, interpolation: bool) {
        if code.is_empty() {
            return;
        }
        let line = self.line_at(start);
        self.events.push(if interpolation {
            Event::Interpolation { code, line }
        } else {
            Event::Block { code, line }
        });
    }

    fn rest_as_literal(&mut self) {
        let src = self.src;
        self.literal.push_str(&src[self.pos..]);
        self.pos = src.len();
    }

    // ========================================================================
    // Top mode: literal lines, waiting for a command
    // ========================================================================

    fn top(&mut self) {
        let src = self.src;
        while self.pos < src.len() {
            let end = self.line_end(self.pos);
            let line = &src[self.pos..end];
            let next = self.after_line(end);

            match line.trim_matches(|c: char| c.is_ascii() && is_blank(c as u8)) {
                "##EJSON" => {
                    self.flush_literal();
                    self.pos = next;
                    if let Exit::End = self.main() {
                        break;
                    }
                }
                "##EJSDISABLE" => {
                    self.flush_literal();
                    self.pos = next;
                    self.rest_as_literal();
                }
                "###EJSON" | "###EJSDISABLE" => {
                    // One `#` is dropped; the rest of the line stays as is.
                    let hash = line.find('#').unwrap_or(0);
                    self.literal.push_str(&line[..hash]);
                    self.literal.push_str(&src[self.pos + hash + 1..next]);
                    self.pos = next;
                }
                _ => {
                    self.literal.push_str(&src[self.pos..next]);
                    self.pos = next;
                }
            }
        }
        self.flush_literal();
    }

    // ========================================================================
    // Main mode: directives, blocks and interpolations
    // ========================================================================

    fn main(&mut self) -> Exit {
        let src = self.src;
        let bytes = src.as_bytes();
        while self.pos < src.len() {
            let at_line_start = self.pos == 0 || bytes[self.pos - 1] == b'\n';
            if at_line_start {
                match self.line_start() {
                    Line::Text => {}
                    Line::Code | Line::Command(Command::On) => continue,
                    Line::Command(Command::Off) => return Exit::Off,
                    Line::Command(Command::Disable) => {
                        self.rest_as_literal();
                        return Exit::End;
                    }
                }
            }

            let rest = &src[self.pos..];
            let Some(offset) = rest.find(['#', '\n']) else {
                self.rest_as_literal();
                break;
            };
            self.literal.push_str(&rest[..offset]);
            self.pos += offset;

            let rest = &src[self.pos..];
            if rest.starts_with('\n') {
                self.literal.push('\n');
                self.pos += 1;
            } else if rest.starts_with("##{") {
                self.literal.push_str("#{");
                self.pos += 3;
            } else if rest.starts_with("#{") {
                self.flush_literal();
                self.interpolation(self.pos + 2);
            } else {
                self.literal.push('#');
                self.pos += 1;
            }
        }
        Exit::End
    }

    /// Handle a `##` marker at the start of the current line.
    fn line_start(&mut self) -> Line {
        let src = self.src;
        let marker = self.skip_blanks(self.pos);
        let rest = &src[marker..];
        if !rest.starts_with("##") {
            return Line::Text;
        }

        if rest.starts_with("###") {
            self.literal.push_str(&src[self.pos..marker]);
            self.literal.push_str("##");
            self.pos = marker + 3;
            return Line::Text;
        }

        if rest.starts_with("##=") {
            self.flush_literal();
            self.delimited_block(marker + 3);
            return Line::Code;
        }

        // Commands keep pending text, so literal runs continue across a mode switch.
        let end = self.line_end(marker);
        if let Some(command) = Command::parse(&src[marker + 2..end]) {
            self.pos = self.after_line(end);
            return Line::Command(command);
        }
        self.flush_literal();
        self.directive_run(marker + 2);
        Line::Code
    }

    /// Whether the line at `from` continues a directive run, returning the
    /// start of its code.
    fn continues_run(&self, from: usize) -> Option<usize> {
        let marker = self.skip_blanks(from);
        let rest = &self.src[marker..];
        if !rest.starts_with("##") || rest.starts_with("###") || rest.starts_with("##=") {
            return None;
        }
        let end = self.line_end(marker);
        match Command::parse(&self.src[marker + 2..end]) {
            Some(_) => None,
            None => Some(marker + 2),
        }
    }

    fn directive_run(&mut self, first: usize) {
        let src = self.src;
        let mut code = String::new();
        let mut start = first;
        loop {
            let end = self.line_end(start);
            code.push_str(&src[start..end]);
            code.push('\n');
            self.pos = self.after_line(end);

            if self.pos >= src.len() {
                break;
            }
            match self.continues_run(self.pos) {
                Some(next) => start = next,
                None => break,
            }
        }
        self.push_code(code, first, false);
    }

    fn delimited_block(&mut self, start: usize) {
        let src = self.src;
        let mut line = self.after_line(self.line_end(start));
        while line < src.len() {
            let end = self.line_end(line);
            let text = &src[line..end];
            if text.trim_matches(|c: char| c.is_ascii() && is_blank(c as u8)) == "##=" {
                let code = src[start..line].to_string();
                self.pos = self.after_line(end);
                self.push_code(code, start, false);
                return;
            }
            line = self.after_line(end);
        }

        let code = src[start..].to_string();
        self.pos = src.len();
        self.push_code(code, start, false);
    }

    fn interpolation(&mut self, start: usize) {
        let src = self.src;
        let (end, next) = match scan_closing_brace(&src[start..]) {
            Some(offset) => (start + offset, start + offset + 1),
            None => (src.len(), src.len()),
        };
        let code = src[start..end].to_string();
        self.pos = next;
        self.push_code(code, start, true);
    }
}

/// Offset of the brace closing an already opened `{`.
///
/// Nested braces are balanced; braces inside string literals are ignored.
fn scan_closing_brace(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
