//! Reader for the textual grammar notation.
//!
//! ```text
//! S    ::= Nome.S mangia Nome.P | (Nome mangiano Nome).P ;
//! Nome ::= (S: il | P: i) (lup | gatt) ^ (S: o | P: i) ;
//! ```
//!
//! Non-terminals start with an uppercase letter, every other word is a
//! terminal. `_` is the empty atom, `[ ... ]` an optional group, `^` glues an
//! item to the previous word and `a,b` is a positional choice. `>( ... )` and
//! `>Name` unfold a group or a non-terminal: its alternatives are spliced into
//! the enclosing choice, so `D ::= z: 0 | nz: >(1 | 2)` reads as
//! `D ::= z: 0 | nz: 1 | nz: 2`. Comments are written `(* ... *)` and may nest.

use std::collections::HashSet;

use crate::grammar::{Atom, Document, DocumentBuilder, Item, Join, Label, Production, Sequence};
use crate::selection::{LabelSelection, is_label_char};
use crate::utils::{GrammarError, Result};

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Word(String),
    Quoted(String),
    Selection(String),
    Define,
    Colon,
    Semicolon,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Caret,
    Comma,
    Unfold,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Word(w) => format!("`{}`", w),
            TokenKind::Quoted(q) => format!("\"{}\"", q),
            TokenKind::Selection(s) => format!("`{}`", s),
            TokenKind::Define => "`::=`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::Semicolon => "`;`".to_string(),
            TokenKind::Pipe => "`|`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::Caret => "`^`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Unfold => "`>`".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
    column: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> GrammarError {
        GrammarError::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);

            if c.is_whitespace() {
                self.bump();
                continue;
            }

            let kind = match c {
                '(' if self.peek_at(1) == Some('*') => {
                    self.skip_comment()?;
                    continue;
                }
                ':' if self.peek_at(1) == Some(':') && self.peek_at(2) == Some('=') => {
                    self.bump();
                    self.bump();
                    self.bump();
                    TokenKind::Define
                }
                '"' => TokenKind::Quoted(self.quoted()?),
                '.' => TokenKind::Selection(self.selection_chain()),
                c if is_word_char(c) => {
                    let mut word = String::new();
                    while let Some(c) = self.peek().filter(|c| is_word_char(*c)) {
                        word.push(c);
                        self.bump();
                    }
                    TokenKind::Word(word)
                }
                _ => {
                    self.bump();
                    match c {
                        ':' => TokenKind::Colon,
                        ';' => TokenKind::Semicolon,
                        '|' => TokenKind::Pipe,
                        '(' => TokenKind::LParen,
                        ')' => TokenKind::RParen,
                        '[' => TokenKind::LBracket,
                        ']' => TokenKind::RBracket,
                        '^' => TokenKind::Caret,
                        ',' => TokenKind::Comma,
                        '>' => TokenKind::Unfold,
                        other => {
                            return Err(self.error(
                                line,
                                column,
                                format!("unexpected character `{}`", other),
                            ));
                        }
                    }
                }
            };

            tokens.push(Token { kind, line, column });
        }

        Ok(tokens)
    }

    fn skip_comment(&mut self) -> Result<()> {
        let (line, column) = (self.line, self.column);
        let mut nesting = 0usize;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some('('), Some('*')) => {
                    self.bump();
                    self.bump();
                    nesting += 1;
                }
                (Some('*'), Some(')')) => {
                    self.bump();
                    self.bump();
                    nesting -= 1;
                    if nesting == 0 {
                        return Ok(());
                    }
                }
                (Some(_), _) => {
                    self.bump();
                }
                (None, _) => return Err(self.error(line, column, "unterminated comment")),
            }
        }
    }

    fn quoted(&mut self) -> Result<String> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') => match self.bump() {
                    Some(c) => text.push(c),
                    None => break,
                },
                Some(c) => text.push(c),
                None => break,
            }
        }
        Err(self.error(line, column, "unterminated quoted terminal"))
    }

    /// Consume a run of `.label`, `.(a|b)` and bare `.` elements verbatim.
    /// Validation is left to [`LabelSelection::parse`].
    fn selection_chain(&mut self) -> String {
        let mut chain = String::new();
        while self.peek() == Some('.') {
            self.bump();
            chain.push('.');
            match self.peek() {
                Some('(') => {
                    while let Some(c) = self.bump() {
                        chain.push(c);
                        if c == ')' {
                            break;
                        }
                    }
                }
                Some(c) if is_label_char(c) => {
                    while let Some(c) = self.peek().filter(|c| is_label_char(*c)) {
                        chain.push(c);
                        self.bump();
                    }
                }
                _ => {}
            }
        }
        chain
    }
}

fn is_word_char(c: char) -> bool {
    is_label_char(c) || c == '\''
}

fn is_non_terminal(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

/// One parsed item of an alternative, before unfolded groups are spliced in.
enum Piece {
    Item(Item),
    Unfold {
        join: Join,
        alternatives: Vec<Production>,
    },
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Definitions that `>Name` is unfolded against; unset on the first reading.
    symbols: Option<&'a Document>,
    /// `>Name` references left folded because `symbols` was unset.
    deferred: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], symbols: Option<&'a Document>) -> Self {
        Parser {
            tokens,
            pos: 0,
            symbols,
            deferred: 0,
        }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.pos)?.kind.clone();
        self.pos += 1;
        Some(token)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn error(&self, message: impl Into<String>) -> GrammarError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, index: usize, message: impl Into<String>) -> GrammarError {
        let (line, column) = match self.tokens.get(index).or_else(|| self.tokens.last()) {
            Some(token) => (token.line, token.column),
            None => (1, 1),
        };
        GrammarError::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(TokenKind::describe)
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if self.check(&kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {} but found {}",
                kind.describe(),
                self.found()
            )))
        }
    }

    fn parse_definitions(&mut self, start_symbol: &str) -> Result<Document> {
        let mut builder = DocumentBuilder::new(start_symbol);
        let mut defined = HashSet::new();

        while self.peek().is_some() {
            let name = match self.peek() {
                Some(TokenKind::Word(w)) if is_non_terminal(w) => w.clone(),
                _ => {
                    return Err(self.error(format!(
                        "expected a non-terminal name but found {}",
                        self.found()
                    )));
                }
            };
            if !defined.insert(name.clone()) {
                return Err(self.error(format!("`{}` is defined more than once", name)));
            }
            self.pos += 1;
            self.expect(TokenKind::Define)?;
            let productions = self.parse_productions()?;
            self.expect(TokenKind::Semicolon)?;
            builder = builder.rule(&name, productions);
        }

        builder.build()
    }

    fn parse_productions(&mut self) -> Result<Vec<Production>> {
        let mut productions = self.parse_production()?;
        while self.check(&TokenKind::Pipe) {
            self.pos += 1;
            productions.extend(self.parse_production()?);
        }
        Ok(productions)
    }

    /// One written alternative; it yields several productions when it unfolds.
    fn parse_production(&mut self) -> Result<Vec<Production>> {
        let label = match (self.peek(), self.peek_at(1)) {
            (Some(TokenKind::Word(w)), Some(TokenKind::Colon)) => {
                let label = Label::new(w);
                self.pos += 2;
                Some(label)
            }
            _ => None,
        };

        let mut pieces = Vec::new();
        while !matches!(
            self.peek(),
            None | Some(TokenKind::Pipe)
                | Some(TokenKind::Semicolon)
                | Some(TokenKind::RParen)
                | Some(TokenKind::RBracket)
        ) {
            pieces.push(self.parse_item()?);
        }
        if pieces.is_empty() {
            return Err(self.error("empty alternative, write `_` to generate nothing"));
        }

        Ok(splice(label, pieces))
    }

    fn parse_item(&mut self) -> Result<Piece> {
        let join = if self.check(&TokenKind::Caret) {
            self.pos += 1;
            Join::Glue
        } else {
            Join::Space
        };
        if self.check(&TokenKind::Unfold) {
            self.pos += 1;
            return self.parse_unfolded(join);
        }
        let atom = self.parse_atom()?;
        Ok(Piece::Item(Item { atom, join }))
    }

    fn parse_unfolded(&mut self, join: Join) -> Result<Piece> {
        let at = self.pos;
        let alternatives = match self.parse_unit()? {
            Atom::Group(group) if group.selection.is_empty() => group.alternatives,
            Atom::Reference(reference) if reference.selection.is_empty() => {
                let Some(document) = self.symbols else {
                    self.deferred += 1;
                    return Ok(Piece::Item(Item {
                        atom: Atom::Reference(reference),
                        join,
                    }));
                };
                match document.get(&reference.symbol) {
                    Some(productions) => productions.to_vec(),
                    None => {
                        return Err(self.error_at(
                            at,
                            format!("cannot unfold undefined `{}`", reference.symbol),
                        ));
                    }
                }
            }
            Atom::Group(_) | Atom::Reference(_) => {
                return Err(self.error_at(at, "an unfolded atom cannot carry a selection"));
            }
            _ => {
                return Err(self.error_at(at, "only groups and non-terminals can be unfolded"));
            }
        };
        Ok(Piece::Unfold { join, alternatives })
    }

    fn parse_atom(&mut self) -> Result<Atom> {
        let first = self.parse_unit()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut choices = vec![first];
        while self.check(&TokenKind::Comma) {
            self.pos += 1;
            choices.push(self.parse_unit()?);
        }
        Ok(Atom::Positional(choices))
    }

    fn parse_unit(&mut self) -> Result<Atom> {
        let Some(kind) = self.advance() else {
            return Err(self.error("expected an atom but found end of input"));
        };
        match kind {
            TokenKind::Word(word) if word == "_" => {
                self.parse_selection()?;
                Ok(Atom::Epsilon)
            }
            TokenKind::Word(word) if is_non_terminal(&word) => {
                let selection = self.parse_selection()?;
                Ok(Atom::selected(&word, selection))
            }
            TokenKind::Word(text) | TokenKind::Quoted(text) => {
                // Terminals carry no alternatives, so a selection on them is inert.
                self.parse_selection()?;
                Ok(Atom::Terminal(text))
            }
            TokenKind::LParen => {
                let alternatives = self.parse_productions()?;
                self.expect(TokenKind::RParen)?;
                let selection = self.parse_selection()?;
                Ok(Atom::group(alternatives, selection))
            }
            TokenKind::LBracket => {
                let mut alternatives = self.parse_productions()?;
                self.expect(TokenKind::RBracket)?;
                alternatives.push(Production::epsilon());
                let selection = self.parse_selection()?;
                Ok(Atom::group(alternatives, selection))
            }
            other => {
                self.pos -= 1;
                Err(self.error(format!("expected an atom but found {}", other.describe())))
            }
        }
    }

    fn parse_selection(&mut self) -> Result<LabelSelection> {
        match self.peek() {
            Some(TokenKind::Selection(chain)) => {
                let selection = LabelSelection::parse(chain)?;
                self.pos += 1;
                Ok(selection)
            }
            _ => Ok(LabelSelection::none()),
        }
    }
}

/// Build the productions of one alternative, crossing its plain items with
/// the alternatives of every unfolded piece. A spliced production keeps the
/// outer label and falls back to the label of the unfolded alternative.
fn splice(label: Option<Label>, pieces: Vec<Piece>) -> Vec<Production> {
    let mut sequences = vec![Sequence {
        label,
        items: Vec::new(),
    }];
    for piece in pieces {
        match piece {
            Piece::Item(item) => {
                for sequence in &mut sequences {
                    sequence.items.push(item.clone());
                }
            }
            Piece::Unfold { join, alternatives } => {
                let mut crossed = Vec::with_capacity(sequences.len() * alternatives.len());
                for sequence in &sequences {
                    for alternative in &alternatives {
                        let mut spliced = sequence.clone();
                        if spliced.label.is_none() {
                            spliced.label = alternative.label().cloned();
                        }
                        let mut inner = alternative.sequence.items.iter().cloned();
                        if let Some(first) = inner.next() {
                            let join = if join == Join::Glue { join } else { first.join };
                            spliced.items.push(Item { join, ..first });
                        }
                        spliced.items.extend(inner);
                        crossed.push(spliced);
                    }
                }
                sequences = crossed;
            }
        }
    }
    sequences.into_iter().map(Production::new).collect()
}

/// Parse grammar source into a document rooted at `start_symbol`
pub fn parse_document(source: &str, start_symbol: &str) -> Result<Document> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(&tokens, None);
    let document = parser.parse_definitions(start_symbol)?;
    if parser.deferred == 0 {
        return Ok(document);
    }

    // `>Name` may unfold a symbol defined further down, so read the source a
    // second time against the definitions of the first reading.
    log::debug!("unfolding {} non-terminal references", parser.deferred);
    Parser::new(&tokens, Some(&document)).parse_definitions(start_symbol)
}
