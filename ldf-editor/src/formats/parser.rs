//! LDF text parser
//!
//! Recursive descent over the token stream from [`lexer`](super::lexer).
//! The header, `Nodes`, `Signals` and `Frames` sections are parsed into the
//! document model; every other top-level section is kept verbatim as an
//! [`OpaqueSection`].
//!
//! Definitions are collected first and inserted once the whole file has been
//! read, so sections may appear in any order. A definition the document
//! rejects (duplicate name, unknown node, bad layout) is reported as a parse
//! error at the line where it was defined.

use crate::formats::lexer::{line_of, tokenize, Spanned, Token};
use crate::formats::LdfParser;
use crate::model::{Frame, Header, LdfDocument, MasterTiming, Node, OpaqueSection, Signal};
use crate::types::{InitValue, LdfError, Result};

/// Parser for the LDF text format
#[derive(Debug, Clone, Copy, Default)]
pub struct TextParser;

impl TextParser {
    pub fn new() -> Self {
        Self
    }
}

impl LdfParser for TextParser {
    fn parse(&self, text: &str) -> Result<LdfDocument> {
        let mut parser = Parser::new(text);
        let parsed = parser.parse_file()?;
        parsed.into_document(text)
    }
}

/// A definition paired with the byte offset it started at
struct Located<T> {
    offset: usize,
    item: T,
}

/// Everything read from the file, before cross-entity validation
struct ParsedFile {
    header: Header,
    nodes: Vec<Located<Node>>,
    signals: Vec<Located<Signal>>,
    frames: Vec<Located<Frame>>,
    opaque: Vec<OpaqueSection>,
}

impl ParsedFile {
    fn into_document(self, source: &str) -> Result<LdfDocument> {
        let at = |offset: usize, err: LdfError| {
            LdfError::parse(line_of(source, offset), err.to_string())
        };

        let mut doc = LdfDocument::new(self.header);
        for Located { offset, item } in self.nodes {
            doc.insert_node(item).map_err(|e| at(offset, e))?;
        }
        for Located { offset, item } in self.signals {
            doc.insert_signal(item).map_err(|e| at(offset, e))?;
        }
        for Located { offset, item } in self.frames {
            doc.insert_frame(item).map_err(|e| at(offset, e))?;
        }
        for section in self.opaque {
            doc.push_opaque_section(section);
        }

        log::debug!("Parsed LDF document: {:?}", doc.stats());
        Ok(doc)
    }
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Spanned<'src>>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
        }
    }

    // ----- token helpers -----

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).and_then(|t| t.token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or(self.source.len())
    }

    fn error(&self, message: impl Into<String>) -> LdfError {
        LdfError::parse(line_of(self.source, self.offset()), message)
    }

    fn found(&self) -> String {
        match self.tokens.get(self.pos) {
            None => "end of file".to_string(),
            Some(Spanned { token: Some(token), .. }) => token.describe(),
            Some(Spanned { token: None, span }) => {
                format!("unexpected character '{}'", &self.source[span.clone()])
            }
        }
    }

    fn expect(&mut self, expected: Token<'src>) -> Result<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {}", expected.describe(), self.found())))
        }
    }

    fn eat(&mut self, token: Token<'src>) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> Result<&'src str> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(format!("expected identifier, found {}", self.found()))),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        match self.peek() {
            Some(Token::Ident(name)) if name == keyword => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error(format!("expected '{}', found {}", keyword, self.found()))),
        }
    }

    fn expect_string(&mut self) -> Result<&'src str> {
        match self.peek() {
            Some(Token::Str(value)) => {
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.error(format!("expected string, found {}", self.found()))),
        }
    }

    fn expect_number(&mut self) -> Result<&'src str> {
        match self.peek() {
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.error(format!("expected number, found {}", self.found()))),
        }
    }

    fn expect_integer(&mut self) -> Result<u64> {
        let offset = self.offset();
        let raw = self.expect_number()?;
        let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u64>().ok(),
        };
        value.ok_or_else(|| {
            LdfError::parse(
                line_of(self.source, offset),
                format!("expected non-negative integer, found {}", raw),
            )
        })
    }

    fn expect_float(&mut self) -> Result<f64> {
        let offset = self.offset();
        let raw = self.expect_number()?;
        if raw.starts_with("0x") || raw.starts_with("0X") {
            let value = u64::from_str_radix(&raw[2..], 16).ok().map(|v| v as f64);
            return self.narrow(offset, value, raw);
        }
        self.narrow(offset, raw.parse::<f64>().ok(), raw)
    }

    fn narrow<T>(&self, offset: usize, value: Option<T>, raw: &str) -> Result<T> {
        value.ok_or_else(|| {
            LdfError::parse(line_of(self.source, offset), format!("invalid number {}", raw))
        })
    }

    fn integer_as<T: TryFrom<u64>>(&mut self, what: &str) -> Result<T> {
        let offset = self.offset();
        let value = self.expect_integer()?;
        T::try_from(value).map_err(|_| {
            LdfError::parse(
                line_of(self.source, offset),
                format!("{} {} is out of range", what, value),
            )
        })
    }

    // ----- grammar -----

    fn parse_file(&mut self) -> Result<ParsedFile> {
        self.expect_keyword("LIN_description_file")?;
        self.expect(Token::Semi)?;

        let mut protocol_version = None;
        let mut language_version = None;
        let mut speed_kbps = None;
        let mut channel_name = None;
        let mut parsed = ParsedFile {
            header: Header::default(),
            nodes: Vec::new(),
            signals: Vec::new(),
            frames: Vec::new(),
            opaque: Vec::new(),
        };

        while !self.at_end() {
            let keyword = match self.peek() {
                Some(Token::Ident(keyword)) => keyword,
                _ => {
                    return Err(self.error(format!(
                        "expected section name, found {}",
                        self.found()
                    )))
                }
            };
            match keyword {
                "LIN_protocol_version" => protocol_version = Some(self.parse_string_statement()?),
                "LIN_language_version" => language_version = Some(self.parse_string_statement()?),
                "Channel_name" => channel_name = Some(self.parse_string_statement()?),
                "LIN_speed" => speed_kbps = Some(self.parse_speed()?),
                "Nodes" => self.parse_nodes(&mut parsed.nodes)?,
                "Signals" => self.parse_signals(&mut parsed.signals)?,
                "Frames" => self.parse_frames(&mut parsed.frames)?,
                _ => parsed.opaque.push(self.parse_opaque()?),
            }
        }

        parsed.header = Header {
            protocol_version: protocol_version
                .ok_or_else(|| self.error("missing LIN_protocol_version"))?,
            language_version: language_version
                .ok_or_else(|| self.error("missing LIN_language_version"))?,
            speed_kbps: speed_kbps.ok_or_else(|| self.error("missing LIN_speed"))?,
            channel_name,
        };
        Ok(parsed)
    }

    /// `Keyword = "value";`
    fn parse_string_statement(&mut self) -> Result<String> {
        self.expect_ident()?;
        self.expect(Token::Eq)?;
        let value = self.expect_string()?.to_string();
        self.expect(Token::Semi)?;
        Ok(value)
    }

    /// `LIN_speed = 19.2 kbps;`
    fn parse_speed(&mut self) -> Result<f64> {
        self.expect_keyword("LIN_speed")?;
        self.expect(Token::Eq)?;
        let speed = self.expect_float()?;
        self.expect_keyword("kbps")?;
        self.expect(Token::Semi)?;
        Ok(speed)
    }

    fn parse_nodes(&mut self, nodes: &mut Vec<Located<Node>>) -> Result<()> {
        self.expect_keyword("Nodes")?;
        self.expect(Token::LBrace)?;
        while !self.eat(Token::RBrace) {
            let offset = self.offset();
            match self.expect_ident()? {
                "Master" => {
                    self.expect(Token::Colon)?;
                    let name = self.expect_ident()?.to_string();
                    self.expect(Token::Comma)?;
                    let timebase_ms = self.expect_float()?;
                    self.expect_keyword("ms")?;
                    self.expect(Token::Comma)?;
                    let jitter_ms = self.expect_float()?;
                    self.expect_keyword("ms")?;
                    let mut timing = MasterTiming::new(timebase_ms, jitter_ms);
                    if self.eat(Token::Comma) {
                        timing.max_header_length = Some(self.integer_as("max header length")?);
                        self.expect_keyword("bits")?;
                        self.expect(Token::Comma)?;
                        timing.response_tolerance = Some(self.expect_float()?);
                        self.expect(Token::Percent)?;
                    }
                    self.expect(Token::Semi)?;
                    nodes.push(Located {
                        offset,
                        item: Node::master(name, timing),
                    });
                }
                "Slaves" => {
                    self.expect(Token::Colon)?;
                    if !self.eat(Token::Semi) {
                        loop {
                            let offset = self.offset();
                            let name = self.expect_ident()?;
                            nodes.push(Located {
                                offset,
                                item: Node::slave(name),
                            });
                            if !self.eat(Token::Comma) {
                                break;
                            }
                        }
                        self.expect(Token::Semi)?;
                    }
                }
                other => {
                    return Err(LdfError::parse(
                        line_of(self.source, offset),
                        format!("unexpected '{}' in Nodes section", other),
                    ))
                }
            }
        }
        Ok(())
    }

    /// `Name: width, init, publisher, subscriber...;`
    fn parse_signals(&mut self, signals: &mut Vec<Located<Signal>>) -> Result<()> {
        self.expect_keyword("Signals")?;
        self.expect(Token::LBrace)?;
        while !self.eat(Token::RBrace) {
            let offset = self.offset();
            let name = self.expect_ident()?;
            self.expect(Token::Colon)?;
            let width: u8 = self.integer_as("signal width")?;
            self.expect(Token::Comma)?;
            let init_value = self.parse_init_value()?;
            self.expect(Token::Comma)?;
            let publisher = self.expect_ident()?;
            let mut signal = Signal::new(name, width, init_value).with_publisher(publisher);
            while self.eat(Token::Comma) {
                signal.subscribers.insert(self.expect_ident()?.to_string());
            }
            self.expect(Token::Semi)?;
            signals.push(Located { offset, item: signal });
        }
        Ok(())
    }

    fn parse_init_value(&mut self) -> Result<InitValue> {
        if !self.eat(Token::LBrace) {
            return Ok(InitValue::Scalar(self.expect_integer()?));
        }
        let mut bytes: Vec<u8> = Vec::new();
        loop {
            bytes.push(self.integer_as("initial byte")?);
            if !self.eat(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace)?;
        Ok(InitValue::Array(bytes))
    }

    /// `Name: id, publisher, length { signal, offset; ... }`
    fn parse_frames(&mut self, frames: &mut Vec<Located<Frame>>) -> Result<()> {
        self.expect_keyword("Frames")?;
        self.expect(Token::LBrace)?;
        while !self.eat(Token::RBrace) {
            let offset = self.offset();
            let name = self.expect_ident()?;
            self.expect(Token::Colon)?;
            let frame_id: u8 = self.integer_as("frame id")?;
            self.expect(Token::Comma)?;
            let publisher = self.expect_ident()?;
            self.expect(Token::Comma)?;
            let length: u8 = self.integer_as("frame length")?;
            let mut frame = Frame::new(name, frame_id, length).with_publisher(publisher);

            self.expect(Token::LBrace)?;
            while !self.eat(Token::RBrace) {
                let signal = self.expect_ident()?;
                self.expect(Token::Comma)?;
                let signal_offset_pos = self.offset();
                let bit_offset: u16 = self.integer_as("signal offset")?;
                self.expect(Token::Semi)?;
                if let Some(existing) = frame.signals.insert(bit_offset, signal.to_string()) {
                    return Err(LdfError::parse(
                        line_of(self.source, signal_offset_pos),
                        format!(
                            "signals '{}' and '{}' share offset {} in frame '{}'",
                            existing, signal, bit_offset, frame.name
                        ),
                    ));
                }
            }
            frames.push(Located { offset, item: frame });
        }
        Ok(())
    }

    /// Skip a section or statement, returning its source text
    fn parse_opaque(&mut self) -> Result<OpaqueSection> {
        let start = self.offset();
        let name = self.expect_ident()?.to_string();
        let mut depth = 0usize;

        while let Some(spanned) = self.tokens.get(self.pos) {
            let end = spanned.span.end;
            let token = spanned.token;
            self.pos += 1;
            match token {
                Some(Token::LBrace) => depth += 1,
                Some(Token::RBrace) => {
                    depth = depth.checked_sub(1).ok_or_else(|| self.error("unbalanced '}'"))?;
                    if depth == 0 {
                        return Ok(self.opaque(name, start, end));
                    }
                }
                Some(Token::Semi) if depth == 0 => return Ok(self.opaque(name, start, end)),
                _ => {}
            }
        }
        Err(LdfError::parse(
            line_of(self.source, start),
            format!("section '{}' is not terminated", name),
        ))
    }

    fn opaque(&self, name: String, start: usize, end: usize) -> OpaqueSection {
        log::debug!("Keeping section '{}' verbatim", name);
        OpaqueSection {
            name,
            text: self.source[start..end].to_string(),
        }
    }
}
