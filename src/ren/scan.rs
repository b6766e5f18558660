// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/scan.rs

// Source text to unbound arrays. The reader for each value is chosen
// from its first character; words and paths are read a segment at a
// time so that groups may appear inside paths.

// <>

use std::iter;
use std::str;

use super::cell::{Cell, CellFlags};
use super::error::{fail, ErrId};
use super::kinds::Kind;
use super::memmgt::manage;
use super::series::{Array, Link, Misc, SeriesFlags};
use super::symtab::Sym;
use super::throws::Flow;

struct Scanner<'a> {
    chars: iter::Peekable<str::Chars<'a>>,
    acc: String,
    line: u32,
    /// a newline was passed since the last value
    newline: bool,
}

/// Scan UTF-8 source bytes
pub fn scan_utf8(bytes: &[u8], file: Option<&str>) -> Result<Array, Flow> {
    let text = str::from_utf8(bytes).map_err(|e| {
        invalid("utf-8", &format!("byte {}", e.valid_up_to()))
    })?;
    scan_source(text, file)
}

/// Scan source text into an unbound block of values
pub fn scan_source(text: &str, file: Option<&str>) -> Result<Array, Flow> {
    let mut scanner = Scanner {
        chars: text.chars().peekable(),
        acc: String::new(),
        line: 1,
        newline: false,
    };
    let cells = scanner.read_items(None)?;
    let array = Array::from_cells(cells);
    if let Some(file) = file {
        array.set_link(Link::File(Sym::intern(file)));
        array.set_misc(Misc::Line(1));
        array.set_flags(SeriesFlags::FILE_LINE);
    }
    manage(&array);
    Ok(array)
}

fn invalid(what: &str, token: &str) -> Flow {
    fail(ErrId::ScanInvalid, &[Cell::string(what), Cell::string(token)])
}

fn missing(what: &str, within: &str) -> Flow {
    fail(ErrId::ScanMissing, &[Cell::string(what), Cell::string(within)])
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | '"' | '{' | '}' | ';')
}

/// Characters that end a word or path segment
fn ends_segment(c: char) -> bool {
    is_delimiter(c) || c == '/' || c == ':'
}

fn hex_value(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

/// Decode `%XX` escapes in url text; malformed escapes stay as written
fn percent_decode(text: &str) -> String {
    let mut bytes = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let mut ahead = chars.clone();
            if let (Some(hi), Some(lo)) = (
                ahead.next().and_then(hex_value),
                ahead.next().and_then(hex_value),
            ) {
                bytes.push(hi << 4 | lo);
                chars = ahead;
                continue;
            }
        }
        let mut utf8 = [0; 4];
        bytes.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

impl<'a> Scanner<'a> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn at_delimiter(&mut self) -> bool {
        self.peek().map_or(true, is_delimiter)
    }

    fn skip_space(&mut self) {
        while let Some(c) = self.peek() {
            if c == ';' {
                while let Some(c) = self.next() {
                    if c == '\n' {
                        self.newline = true;
                        break;
                    }
                }
            } else if c.is_whitespace() {
                if c == '\n' {
                    self.newline = true;
                }
                self.next();
            } else {
                break;
            }
        }
    }

    /// Values up to `close`, or to the end of input at top level
    fn read_items(&mut self, close: Option<char>) -> Result<Vec<Cell>, Flow> {
        let mut cells = Vec::new();
        loop {
            self.skip_space();
            let Some(c) = self.peek() else {
                return match close {
                    Some(close) => Err(missing(&close.to_string(), "input")),
                    None => Ok(cells),
                };
            };
            if c == ']' || c == ')' {
                self.next();
                if Some(c) == close {
                    return Ok(cells);
                }
                return Err(invalid("end-of-block", &c.to_string()));
            }
            let newline = std::mem::take(&mut self.newline);
            let mut value = self.read_value()?;
            if newline {
                value.set_flag(CellFlags::LINE);
            }
            cells.push(value);
        }
    }

    fn read_value(&mut self) -> Result<Cell, Flow> {
        let Some(c) = self.peek() else {
            return Err(missing("value", "input"));
        };
        match c {
            '[' => {
                self.next();
                Ok(Cell::block(self.read_array(']')?))
            }
            '(' => {
                self.next();
                Ok(Cell::group(self.read_array(')')?))
            }
            '"' => {
                self.next();
                let s = self.read_quoted()?;
                Ok(Cell::string(&s))
            }
            '{' => {
                self.next();
                let s = self.read_braced()?;
                Ok(Cell::string(&s))
            }
            '#' => {
                self.next();
                self.read_special()
            }
            '%' => {
                self.next();
                self.read_file()
            }
            '$' => {
                self.next();
                self.read_number(String::new()).and_then(|n| match n.as_number() {
                    Some(d) => Ok(Cell::money(d)),
                    None => Err(invalid("money", &n.to_string())),
                })
            }
            '\'' => {
                self.next();
                if self.peek() == Some('|') {
                    self.next();
                    return Ok(Cell::lit_bar());
                }
                let value = self.read_path_or_word()?;
                match value.kind() {
                    Kind::Word => Ok(value.with_kind(Kind::LitWord)),
                    Kind::Path => Ok(value.with_kind(Kind::LitPath)),
                    _ => Err(invalid("lit-word", &value.to_string())),
                }
            }
            ':' => {
                self.next();
                let value = self.read_path_or_word()?;
                match value.kind() {
                    Kind::Word => Ok(value.with_kind(Kind::GetWord)),
                    Kind::Path => Ok(value.with_kind(Kind::GetPath)),
                    _ => Err(invalid("get-word", &value.to_string())),
                }
            }
            '/' => {
                self.next();
                match self.peek() {
                    Some('/') => {
                        self.next();
                        Ok(self.finish_word("//".into()))
                    }
                    Some(':') => Ok(self.finish_word("/".into())),
                    Some(c) if !is_delimiter(c) => {
                        let name = self.read_segment();
                        Ok(Cell::word(Kind::Refinement, Sym::intern(&name)))
                    }
                    _ => Ok(self.finish_word("/".into())),
                }
            }
            '<' => {
                self.next();
                match self.peek() {
                    Some(c) if c.is_alphabetic() || c == '/' || c == '.' => self.read_tag(),
                    _ => {
                        let rest = self.read_segment();
                        Ok(self.finish_word(format!("<{}", rest)))
                    }
                }
            }
            '+' | '-' => {
                self.next();
                if self.peek().map_or(false, |d| d.is_ascii_digit()) {
                    return self.read_number(c.to_string());
                }
                let rest = self.read_segment();
                Ok(self.finish_word(format!("{}{}", c, rest)))
            }
            _ if c.is_ascii_digit() => self.read_number(String::new()),
            _ => self.read_path_or_word(),
        }
    }

    /// Word read by hand, becoming a set-word when a colon ends it
    fn finish_word(&mut self, name: String) -> Cell {
        if self.peek() == Some(':') {
            self.next();
            return set_word(&name);
        }
        Cell::word(Kind::Word, Sym::intern(&name))
    }

    fn read_array(&mut self, close: char) -> Result<Array, Flow> {
        let cells = self.read_items(Some(close))?;
        let array = Array::from_cells(cells);
        manage(&array);
        Ok(array)
    }

    /// Characters up to the end of a word or path segment
    fn read_segment(&mut self) -> String {
        self.acc.clear();
        while let Some(c) = self.peek() {
            if ends_segment(c) {
                break;
            }
            self.acc.push(c);
            self.next();
        }
        self.acc.clone()
    }

    /// Characters up to the next delimiter
    fn read_token(&mut self, into: &mut String) {
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            into.push(c);
            self.next();
        }
    }

    fn read_path_or_word(&mut self) -> Result<Cell, Flow> {
        let mut parts = Vec::new();
        loop {
            let part = if self.peek() == Some('(') {
                self.next();
                Cell::group(self.read_array(')')?)
            } else {
                let seg = self.read_segment();
                if seg.is_empty() {
                    let c = self.peek().map(String::from).unwrap_or_default();
                    return Err(invalid("word", &c));
                }
                if parts.is_empty() && self.peek() == Some(':') {
                    self.next();
                    if !self.at_delimiter() {
                        let mut url = format!("{}:", seg);
                        self.read_token(&mut url);
                        return Ok(Cell::string_of(Kind::Url, &percent_decode(&url)));
                    }
                    return Ok(set_word(&seg));
                }
                if parts.is_empty() && seg.contains('@') {
                    let mut email = seg.clone();
                    self.read_token(&mut email);
                    return Ok(Cell::string_of(Kind::Email, &email));
                }
                segment_value(&seg)
            };
            parts.push(part);

            match self.peek() {
                Some('/') => {
                    self.next();
                }
                Some(':') => {
                    self.next();
                    return Ok(Cell::array(Kind::SetPath, path_array(parts), 0));
                }
                _ => break,
            }
        }
        if parts.len() == 1 {
            if let Some(single) = parts.pop() {
                return Ok(single);
            }
        }
        Ok(Cell::array(Kind::Path, path_array(parts), 0))
    }

    fn read_number(&mut self, prefix: String) -> Result<Cell, Flow> {
        let mut token = prefix;
        self.read_token(&mut token);
        parse_number(&token).ok_or_else(|| invalid("number", &token))
    }

    fn read_escape(&mut self) -> Result<char, Flow> {
        let c = self.next().ok_or_else(|| missing("escape", "string"))?;
        Ok(match c {
            '/' => '\n',
            '-' => '\t',
            '@' => '\0',
            '(' => {
                let mut name = String::new();
                loop {
                    match self.next() {
                        Some(')') => break,
                        Some(c) => name.push(c),
                        None => return Err(missing(")", "escape")),
                    }
                }
                match name.to_lowercase().as_str() {
                    "line" => '\n',
                    "tab" => '\t',
                    "null" => '\0',
                    "back" => '\u{8}',
                    "esc" => '\u{1b}',
                    hex => u32::from_str_radix(hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| invalid("escape", &name))?,
                }
            }
            other => other,
        })
    }

    fn read_quoted(&mut self) -> Result<String, Flow> {
        let mut s = String::new();
        loop {
            match self.next() {
                Some('"') => return Ok(s),
                Some('^') => s.push(self.read_escape()?),
                Some('\n') | None => return Err(missing("\"", "string")),
                Some(c) => s.push(c),
            }
        }
    }

    fn read_braced(&mut self) -> Result<String, Flow> {
        let mut s = String::new();
        let mut depth = 1;
        loop {
            match self.next() {
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(s);
                    }
                    s.push('}');
                }
                Some('{') => {
                    depth += 1;
                    s.push('{');
                }
                Some('^') => s.push(self.read_escape()?),
                Some(c) => s.push(c),
                None => return Err(missing("}", "string")),
            }
        }
    }

    /// After `#`: chars, binaries, construction syntax, and issues
    fn read_special(&mut self) -> Result<Cell, Flow> {
        match self.peek() {
            Some('"') => {
                self.next();
                let c = match self.next() {
                    Some('^') => self.read_escape()?,
                    Some('"') | None => return Err(invalid("char", "#\"\"")),
                    Some(c) => c,
                };
                if self.next() != Some('"') {
                    return Err(missing("\"", "char"));
                }
                Ok(Cell::char(c))
            }
            Some('{') => {
                self.next();
                let mut bytes = Vec::new();
                let mut high: Option<u8> = None;
                loop {
                    match self.next() {
                        Some('}') => break,
                        Some(c) if c.is_whitespace() => (),
                        Some(c) => {
                            let nibble = hex_value(c).ok_or_else(|| invalid("binary", &c.to_string()))?;
                            match high.take() {
                                Some(h) => bytes.push(h << 4 | nibble),
                                None => high = Some(nibble),
                            }
                        }
                        None => return Err(missing("}", "binary")),
                    }
                }
                if high.is_some() {
                    return Err(invalid("binary", "odd number of digits"));
                }
                Ok(Cell::bytes(&bytes))
            }
            Some('[') => {
                self.next();
                let mut name = String::new();
                loop {
                    match self.next() {
                        Some(']') => break,
                        Some(c) => name.push(c),
                        None => return Err(missing("]", "construct")),
                    }
                }
                match name.trim() {
                    "true" => Ok(Cell::logic(true)),
                    "false" => Ok(Cell::logic(false)),
                    "none" | "blank" => Ok(Cell::blank()),
                    other => Err(invalid("construct", &format!("#[{}]", other))),
                }
            }
            _ => {
                let name = self.read_segment();
                if name.is_empty() {
                    return Err(invalid("issue", "#"));
                }
                Ok(Cell::word(Kind::Issue, Sym::intern(&name)))
            }
        }
    }

    fn read_file(&mut self) -> Result<Cell, Flow> {
        if self.peek() == Some('"') {
            self.next();
            let s = self.read_quoted()?;
            return Ok(Cell::string_of(Kind::File, &s));
        }
        let mut s = String::new();
        self.read_token(&mut s);
        Ok(Cell::string_of(Kind::File, &s))
    }

    fn read_tag(&mut self) -> Result<Cell, Flow> {
        let mut s = String::new();
        loop {
            match self.next() {
                Some('>') => return Ok(Cell::string_of(Kind::Tag, &s)),
                Some('\n') | None => return Err(missing(">", "tag")),
                Some(c) => s.push(c),
            }
        }
    }
}

fn set_word(name: &str) -> Cell {
    Cell::word(Kind::SetWord, Sym::intern(name))
}

fn path_array(parts: Vec<Cell>) -> Array {
    let array = Array::from_cells(parts);
    manage(&array);
    array
}

/// A path segment or bare word
fn segment_value(seg: &str) -> Cell {
    if seg.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = seg.parse::<i64>() {
            return Cell::integer(i);
        }
    }
    match seg {
        "_" => Cell::blank(),
        "|" => Cell::bar(),
        _ => Cell::word(Kind::Word, Sym::intern(seg)),
    }
}

fn parse_number(token: &str) -> Option<Cell> {
    if let Some(body) = token.strip_suffix('%') {
        return body.parse::<f64>().ok().map(|d| Cell::percent(d / 100.0));
    }
    if let Some((x, y)) = token.split_once(|c| c == 'x' || c == 'X') {
        let x = x.parse::<f64>().ok()?;
        let y = y.parse::<f64>().ok()?;
        return Some(Cell::pair(x, y));
    }
    if token.matches('.').count() >= 2 {
        let bytes: Option<Vec<u8>> = token.split('.').map(|p| p.parse::<u8>().ok()).collect();
        return bytes.map(|b| Cell::tuple(&b));
    }
    if let Ok(i) = token.parse::<i64>() {
        return Some(Cell::integer(i));
    }
    let digits = token.replace('\'', "");
    digits.parse::<f64>().ok().filter(|d| d.is_finite()).map(Cell::decimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ren::mold::mold_only;

    fn rescan(code: &str) -> String {
        let array = scan_source(code, None).unwrap();
        mold_only(&Cell::block(array))
    }

    #[test]
    fn words_in_all_forms() {
        assert_eq!("a b: :c 'd /e #f", rescan("a b: :c 'd /e #f"));
        assert_eq!("a/b a/1: :a/b 'a/b", rescan("a/b a/1: :a/b 'a/b"));
        assert_eq!("+ - / // < <= <> > >=", rescan("+ - / // < <= <> > >="));
        assert_eq!("_ | '|", rescan("_ | '|"));
        assert_eq!("/: <=: +: =:", rescan("/: <=: +: =:"));
    }

    #[test]
    fn numbers() {
        assert_eq!("1 -2 3.5 50% 1x2 1.2.3 $1.50", rescan("1 -2 3.5 50% 1x2 1.2.3 $1.50"));
    }

    #[test]
    fn strings_and_friends() {
        assert_eq!("\"a^/b\"", rescan("{a\nb}"));
        assert_eq!("\"q^\"\"", rescan("\"q^\"\""));
        assert_eq!("#\"x\" #{0AFF}", rescan("#\"x\" #{0a ff}"));
        assert_eq!("%dir/file.r <local> http://x.org a@b.c", rescan("%dir/file.r <local> http://x.org a@b.c"));
        let array = scan_source("true #[true]", None).unwrap();
        assert_eq!(Kind::Word, array.get(0).unwrap().kind());
        assert_eq!(Some(true), array.get(1).unwrap().as_logic());
    }

    #[test]
    fn quoted_files_and_escaped_urls() {
        assert_eq!("%\"a b\" %\"\" %\"x[1]\"", rescan("%\"a b\" %\"\" %\"x[1]\""));
        let array = scan_source("http://x.org/a%20b%", None).unwrap();
        assert_eq!(Some("http://x.org/a b%".to_string()), array.get(0).unwrap().as_text());
        assert_eq!("http://x.org/a%20b%25", rescan("http://x.org/a%20b%"));
    }

    #[test]
    fn nesting_and_comments() {
        assert_eq!("[1 (2 3)] a/(b)", rescan("[1 (2 3)] ; comment\n a/(b)"));
    }

    #[test]
    fn newline_flags_and_file() {
        let array = scan_source("a\nb", Some("test.r")).unwrap();
        assert!(!array.get(0).unwrap().get_flag(CellFlags::LINE));
        assert!(array.get(1).unwrap().get_flag(CellFlags::LINE));
        assert_eq!("test.r", &*array.file_line().unwrap().0.name());
    }

    #[test]
    fn malformed_input() {
        assert!(scan_source("[1 2", None).is_err());
        assert!(scan_source("(1]", None).is_err());
        assert!(scan_source("\"open", None).is_err());
        assert!(scan_source("#{abc}", None).is_err());
        assert!(scan_source("#[void]", None).is_err());
    }
}
