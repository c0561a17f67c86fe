use crate::compiler::Parse;
use crate::error::{Error, Result};
use crate::location::Location;
use crate::node::{Data, Node, Operand, SrcPos, BSS, DATA, TEXT};
use crate::pseudo::Expand;
use indexmap::IndexMap;
use std::num::ParseIntError;

// ----------------------------------------------------------------------------
// Source files

/// Line oriented front end over one or more source files, read as a single
/// program in the order they were added.
pub struct Parser<'a> {
    sources: Vec<(String, String)>,
    expander: &'a dyn Expand,
    loc: Location,
}

impl<'a> Parser<'a> {
    pub fn new(expander: &'a dyn Expand) -> Self {
        Parser {
            sources: vec![],
            expander,
            loc: Location::new(),
        }
    }

    pub fn add(&mut self, name: &str, src: &str) {
        self.sources.push((name.to_string(), src.to_string()));
    }

    pub fn read(&mut self, path: &str) -> Result<()> {
        let src =
            std::fs::read_to_string(path).map_err(|e| Error::FileRead(path.to_string(), e))?;
        self.add(path, &src);
        Ok(())
    }

    /// Lines of every source, for diagnostics.
    pub fn lines(&self) -> IndexMap<String, Vec<String>> {
        self.sources
            .iter()
            .map(|(name, src)| (name.clone(), src.lines().map(String::from).collect()))
            .collect()
    }
}

impl Parse for Parser<'_> {
    fn parse(&mut self) -> Result<Vec<Node>> {
        self.loc.reset();
        let mut nodes = vec![];
        for (file, src) in &self.sources {
            for (line, raw) in src.split('\n').enumerate() {
                let pos = SrcPos {
                    file: file.clone(),
                    line,
                    offset: self.loc.current(),
                };
                self.loc.advance(raw.len() + 1);
                let stmts = parse_line(raw, self.expander).map_err(|e| e.at(Some(&pos)))?;
                nodes.extend(stmts.into_iter().map(|n| n.at(Some(pos.clone()))));
            }
        }
        Ok(nodes)
    }
}

// ----------------------------------------------------------------------------
// Statement

/// Nodes of one source line: an optional label, then an optional statement.
pub fn parse_line(raw: &str, expander: &dyn Expand) -> Result<Vec<Node>> {
    let mut code = strip_comment(raw).trim();
    let mut nodes = vec![];

    // main:
    if let Some((head, tail)) = code.split_once(':') {
        let head = head.trim_end();
        if is_ident(head) {
            if DIRECTIVES.contains(&head) {
                return Err(Error::Syntax(format!("Directive used as label: `{}`", head)));
            }
            nodes.push(Node::label(head));
            code = tail.trim();
        }
    }
    if code.is_empty() {
        return Ok(nodes);
    }

    let (word, rest) = match code.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (code, ""),
    };

    if word.starts_with('.') {
        nodes.extend(directive(word, rest)?);
        return Ok(nodes);
    }

    let operands = split_operands(rest)?
        .iter()
        .map(|s| Operand::parse(s))
        .collect::<Result<Vec<_>>>()?;
    if expander.is_pseudo(word) {
        nodes.push(Node::pseudo(word, operands));
    } else {
        nodes.push(Node::inst(word, operands));
    }
    Ok(nodes)
}

const DIRECTIVES: [&str; 11] = [
    ".text", ".data", ".bss", ".section", ".ascii", ".asciz", ".space", ".byte", ".half",
    ".word", ".quad",
];

fn directive(word: &str, rest: &str) -> Result<Vec<Node>> {
    let width = match word {
        ".text" => return Ok(vec![Node::section(TEXT)]),
        ".data" => return Ok(vec![Node::section(DATA)]),
        ".bss" => return Ok(vec![Node::section(BSS)]),
        ".section" => {
            if !is_ident(rest) {
                return Err(Error::Syntax(format!("Invalid section name: `{}`", rest)));
            }
            return Ok(vec![Node::section(rest)]);
        }
        ".ascii" | ".asciz" => {
            let mut bytes = unquote(rest)?.into_bytes();
            if word == ".asciz" {
                bytes.push(0);
            }
            let width = bytes.len();
            return Ok(vec![Node::data(Data::Bytes(bytes), width)]);
        }
        ".space" => {
            let n = parse_int(rest)
                .ok()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| Error::Syntax(format!("Invalid size: `{}`", rest)))?;
            return Ok(vec![Node::space(n)]);
        }
        ".byte" => 1,
        ".half" => 2,
        ".word" => 4,
        ".quad" => 8,
        _ => return Err(Error::Syntax(format!("Unknown directive: `{}`", word))),
    };

    split_operands(rest)?
        .iter()
        .map(|v| match Operand::parse(v)? {
            Operand::Imm(v) => Ok(Node::data(Data::Int(v), width)),
            // only wide enough slots hold an address
            Operand::Label(name) if width >= 4 => Ok(Node::data(Data::Label(name), width)),
            _ => Err(Error::Syntax(format!("Expected a number: `{}`", v))),
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Operand

impl Operand {
    /// `$name` and `r<digits>` are registers, numbers and char literals are
    /// immediates, quoted text is a string, any other identifier a label.
    pub fn parse(s: &str) -> Result<Operand> {
        if let Some(name) = s.strip_prefix('$') {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::Syntax(format!("Invalid register: `{}`", s)));
            }
            return Ok(Operand::Reg(name.to_string()));
        }
        if let Some(num) = s.strip_prefix('r') {
            if !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()) {
                return Ok(Operand::Reg(s.to_string()));
            }
        }
        if s.starts_with('"') {
            return Ok(Operand::Str(unquote(s)?));
        }
        if s.starts_with('\'') {
            return char_literal(s).map(Operand::Imm);
        }
        if let Ok(v) = parse_int(s) {
            return Ok(Operand::Imm(v));
        }
        if is_ident(s) {
            return Ok(Operand::Label(s.to_string()));
        }
        Err(Error::Syntax(format!("Invalid operand: `{}`", s)))
    }
}

pub fn parse_int(s: &str) -> std::result::Result<i64, ParseIntError> {
    let (neg, s) = match s.strip_prefix('-') {
        Some(s) => (true, s),
        None => (false, s),
    };
    let v = parse_with_prefix(s)?;
    Ok(if neg { -v } else { v })
}

fn parse_with_prefix(s: &str) -> std::result::Result<i64, ParseIntError> {
    if let Some(num) = s.strip_prefix("0b") {
        i64::from_str_radix(num, 2)
    } else if let Some(num) = s.strip_prefix("0o") {
        i64::from_str_radix(num, 8)
    } else if let Some(num) = s.strip_prefix("0x") {
        i64::from_str_radix(num, 16)
    } else {
        s.parse()
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

// ----------------------------------------------------------------------------
// Lexing helpers

fn escape(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '0' => Some('\0'),
        '\\' | '\'' | '"' => Some(c),
        _ => None,
    }
}

fn unquote(s: &str) -> Result<String> {
    let err = || Error::Syntax(format!("Invalid string literal: {}", s));
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(err)?;
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next().and_then(escape).ok_or_else(err)?),
            '"' => return Err(err()),
            c => out.push(c),
        }
    }
    Ok(out)
}

fn char_literal(s: &str) -> Result<i64> {
    let err = || Error::Syntax(format!("Invalid char literal: {}", s));
    let inner = s
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .ok_or_else(err)?;
    let mut chars = inner.chars();
    let c = match chars.next() {
        Some('\\') => chars.next().and_then(escape).ok_or_else(err)?,
        Some(c) => c,
        None => return Err(err()),
    };
    if chars.next().is_some() {
        return Err(err());
    }
    Ok(c as i64)
}

/// Cut the line at the first `;` or `#` outside a quoted literal.
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        match (quote, c) {
            _ if escaped => escaped = false,
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            (None, ';' | '#') => return &line[..idx],
            _ => {}
        }
    }
    line
}

/// Split on commas outside quoted literals. An empty list is fine; an empty
/// item is not.
fn split_operands(s: &str) -> Result<Vec<String>> {
    if s.trim().is_empty() {
        return Ok(vec![]);
    }
    let mut items = vec![];
    let mut cur = String::new();
    let mut quote = None;
    let mut escaped = false;
    for c in s.chars() {
        match (quote, c) {
            _ if escaped => escaped = false,
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            (None, ',') => {
                items.push(std::mem::take(&mut cur));
                continue;
            }
            _ => {}
        }
        cur.push(c);
    }
    items.push(cur);

    let items: Vec<String> = items.into_iter().map(|s| s.trim().to_string()).collect();
    if items.iter().any(|s| s.is_empty()) {
        return Err(Error::Syntax(format!("Empty operand in `{}`", s)));
    }
    Ok(items)
}
