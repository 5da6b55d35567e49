//! Tag glob patterns
//!
//! Tags are dot-delimited strings like `app.access.error`. A `Pattern` is the
//! glob language used to select them:
//!
//! - a literal segment matches one tag segment exactly (`a.b`)
//! - `*` matches exactly one segment of any value (`a.*.c`)
//! - `**` matches zero or more whole segments (`a.**`)
//! - `{x,y}` matches if any alternative matches; alternatives may themselves
//!   be dotted sub-sequences and end in `**` (`a.{b.**,c}`)
//! - `*` may also appear inside a segment (`app*`, `*error`); it never
//!   crosses a `.` boundary
//!
//! Patterns are compiled once at config load and are immutable afterwards.
//! Alternation groups are expanded during compilation, so matching is a pure
//! recursive walk over segment slices with no allocation beyond the initial
//! tag split.

use std::fmt;

use crate::error::{Result, RoutingError};

/// Delimiter separating tag segments
pub const TAG_DELIMITER: char = '.';

/// One compiled pattern segment
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Exact segment text
    Literal(String),
    /// `*` - exactly one segment, any value
    Any,
    /// `**` - zero or more segments
    MatchAll,
    /// Segment text containing `*` wildcards; literal parts split on `*`
    Glob(Vec<String>),
}

/// A compiled tag glob matcher
///
/// Built once from its source string via [`Pattern::compile`]; matching is
/// pure and side-effect-free.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Original pattern source, kept for logs and config errors
    source: String,

    /// Alternative segment sequences; the pattern matches if any does.
    /// A pattern without alternation groups compiles to a single sequence.
    alternatives: Vec<Vec<Segment>>,
}

impl Pattern {
    /// Compile a pattern from its source string
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidPattern`] for unbalanced braces, empty
    /// segments or alternation branches, groups not spanning a whole
    /// segment, and `**` glued to other characters (ambiguous; rejected
    /// rather than guessed).
    pub fn compile(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(RoutingError::invalid_pattern(source, "empty pattern"));
        }

        let alternatives = parse_sequence(source, source)?;

        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    /// Test a tag against this pattern
    #[must_use]
    pub fn matches(&self, tag: &str) -> bool {
        let segments: Vec<&str> = if tag.is_empty() {
            Vec::new()
        } else {
            tag.split(TAG_DELIMITER).collect()
        };

        self.alternatives
            .iter()
            .any(|alt| match_segments(alt, &segments))
    }

    /// The original pattern source
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split on `delim`, ignoring delimiters nested inside `{...}` groups
fn split_top_level(input: &str, delim: char, source: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in input.chars() {
        match ch {
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                if depth == 0 {
                    return Err(RoutingError::invalid_pattern(source, "unbalanced '}'"));
                }
                depth -= 1;
                current.push(ch);
            }
            c if c == delim && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }

    if depth != 0 {
        return Err(RoutingError::invalid_pattern(source, "unbalanced '{'"));
    }

    parts.push(current);
    Ok(parts)
}

/// Parse a dotted sub-sequence into its expanded alternatives
///
/// Returns one segment sequence per combination of alternation branches.
fn parse_sequence(input: &str, source: &str) -> Result<Vec<Vec<Segment>>> {
    let pieces = split_top_level(input, TAG_DELIMITER, source)?;

    // Cartesian product of per-piece alternatives, in branch order.
    let mut alternatives: Vec<Vec<Segment>> = vec![Vec::new()];
    for piece in &pieces {
        let piece_alternatives = parse_piece(piece, source)?;
        let mut expanded = Vec::with_capacity(alternatives.len() * piece_alternatives.len());
        for prefix in &alternatives {
            for suffix in &piece_alternatives {
                let mut sequence = prefix.clone();
                sequence.extend(suffix.iter().cloned());
                expanded.push(sequence);
            }
        }
        alternatives = expanded;
    }

    Ok(alternatives)
}

/// Parse a single dot-delimited piece into its alternatives
fn parse_piece(piece: &str, source: &str) -> Result<Vec<Vec<Segment>>> {
    if piece.is_empty() {
        return Err(RoutingError::invalid_pattern(source, "empty segment"));
    }

    if piece.starts_with('{') {
        if !piece.ends_with('}') {
            return Err(RoutingError::invalid_pattern(
                source,
                "alternation group must span a whole segment",
            ));
        }
        let inner = &piece[1..piece.len() - 1];
        let branches = split_top_level(inner, ',', source)?;
        if branches.iter().any(|b| b.is_empty()) {
            return Err(RoutingError::invalid_pattern(
                source,
                "empty alternation branch",
            ));
        }

        let mut alternatives = Vec::new();
        for branch in &branches {
            alternatives.extend(parse_sequence(branch, source)?);
        }
        return Ok(alternatives);
    }

    if piece.contains('{') || piece.contains('}') {
        return Err(RoutingError::invalid_pattern(
            source,
            "alternation group must span a whole segment",
        ));
    }

    let segment = match piece {
        "*" => Segment::Any,
        "**" => Segment::MatchAll,
        _ if piece.contains("**") => {
            return Err(RoutingError::invalid_pattern(
                source,
                "'**' must stand alone in a segment",
            ));
        }
        _ if piece.contains('*') => {
            Segment::Glob(piece.split('*').map(str::to_string).collect())
        }
        _ => Segment::Literal(piece.to_string()),
    };

    Ok(vec![vec![segment]])
}

/// Recursive segment-sequence match
///
/// `MatchAll` as the final segment matches any remainder including none;
/// mid-sequence it backtracks over every possible split point.
fn match_segments(pattern: &[Segment], tag: &[&str]) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return tag.is_empty();
    };

    match head {
        Segment::Literal(lit) => {
            tag.first().map_or(false, |s| *s == lit.as_str()) && match_segments(rest, &tag[1..])
        }
        Segment::Any => !tag.is_empty() && match_segments(rest, &tag[1..]),
        Segment::Glob(parts) => {
            tag.first().map_or(false, |s| glob_segment_match(parts, s))
                && match_segments(rest, &tag[1..])
        }
        Segment::MatchAll => {
            if rest.is_empty() {
                true
            } else {
                (0..=tag.len()).any(|skip| match_segments(rest, &tag[skip..]))
            }
        }
    }
}

/// Match a single tag segment against intra-segment glob parts
///
/// `parts` are the literal fragments of the segment split on `*`; the first
/// must be a prefix, the last a suffix, and any middle parts must appear in
/// order in between. Never crosses the delimiter (the text is one segment).
fn glob_segment_match(parts: &[String], text: &str) -> bool {
    debug_assert!(parts.len() >= 2);

    let first = &parts[0];
    if !text.starts_with(first.as_str()) {
        return false;
    }
    let mut rest = &text[first.len()..];

    let last_index = parts.len() - 1;
    for part in &parts[1..last_index] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part.as_str()) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }

    rest.ends_with(parts[last_index].as_str())
}
