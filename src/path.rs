//! Dot + bracket path addressing over [`State`] values.
//!
//! Grammar: `segment ("." segment | "[" unsigned-integer "]")*`. Parsed once
//! into a `Vec<Segment>` with `nom` rather than hand-rolling a scanner.

use std::sync::Arc;

use im::{OrdMap, Vector};
use nom::{
    branch::alt,
    character::complete::{char, digit1},
    combinator::{map, map_res, recognize},
    multi::{many0, many1},
    sequence::{delimited, preceded},
    IResult,
};
use thiserror::Error;

use crate::state::State;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A parsed, reusable path. Cheaply cloneable (`Arc<[Segment]>`) so a rule's
/// constraints/effects can hold a pre-parsed path without re-parsing it on
/// every state they're checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    raw: Arc<str>,
    segments: Arc<[Segment]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("invalid path syntax: {0}")]
    InvalidSyntax(String),
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("path traverses a non-container at: {0}")]
    NotAContainer(String),
}

impl Path {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let segments = parse_segments(raw)?;
        Ok(Self { raw: Arc::from(raw), segments: Arc::from(segments) })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn key_segment(input: &str) -> IResult<&str, Segment> {
    map(
        recognize(many1(nom::character::complete::satisfy(|c| {
            c.is_alphanumeric() || c == '_' || c == '-'
        }))),
        |s: &str| Segment::Key(s.to_string()),
    )(input)
}

fn index_segment(input: &str) -> IResult<&str, Segment> {
    map(
        delimited(
            char('['),
            map_res(digit1, |s: &str| s.parse::<usize>()),
            char(']'),
        ),
        Segment::Index,
    )(input)
}

fn dotted_key_segment(input: &str) -> IResult<&str, Segment> {
    preceded(char('.'), key_segment)(input)
}

fn path_segments(input: &str) -> IResult<&str, Vec<Segment>> {
    let (input, first) = alt((key_segment, index_segment))(input)?;
    let (input, rest) = many0(alt((dotted_key_segment, index_segment)))(input)?;
    let mut segments = vec![first];
    segments.extend(rest);
    Ok((input, segments))
}

fn parse_segments(raw: &str) -> Result<Vec<Segment>, PathError> {
    if raw.trim().is_empty() {
        return Err(PathError::InvalidSyntax(raw.to_string()));
    }
    match path_segments(raw) {
        Ok((rest, segments)) if rest.is_empty() => Ok(segments),
        _ => Err(PathError::InvalidSyntax(raw.to_string())),
    }
}

/// Reads the value at `path`, or `PathError` if any segment doesn't resolve.
pub fn value_at<'a>(state: &'a State, path: &Path) -> Result<&'a State, PathError> {
    value_at_segments(state, path.segments())
}

fn value_at_segments<'a>(state: &'a State, segments: &[Segment]) -> Result<&'a State, PathError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(state);
    };
    let child = match (state, head) {
        (State::Object(fields), Segment::Key(key)) => {
            fields.get(key).ok_or_else(|| PathError::NotFound(key.clone()))?
        }
        (State::Array(items), Segment::Index(index)) => {
            items.get(*index).ok_or_else(|| PathError::NotFound(format!("[{index}]")))?
        }
        _ => return Err(PathError::NotAContainer(format!("{head:?}"))),
    };
    value_at_segments(child, rest)
}

/// Produces a new state with the value at `path` replaced. Missing
/// intermediate segments are an error; a missing *terminal* segment is also
/// an error here (use [`with_value_at_create`] for `set`-family effects,
/// which may create a new leaf on an existing object).
pub fn with_value_at(state: &State, path: &Path, new_value: State) -> Result<State, PathError> {
    replace(state, path.segments(), new_value, false)
}

/// Like [`with_value_at`], but allows creating a new key on an existing
/// object (or appending at `array.len()`) when the *terminal* segment is
/// absent. Intermediate missing segments remain an error.
pub fn with_value_at_create(
    state: &State,
    path: &Path,
    new_value: State,
) -> Result<State, PathError> {
    replace(state, path.segments(), new_value, true)
}

fn replace(
    state: &State,
    segments: &[Segment],
    new_value: State,
    create: bool,
) -> Result<State, PathError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(new_value);
    };
    match (state, head) {
        (State::Object(fields), Segment::Key(key)) => {
            let mut fields: OrdMap<String, State> = fields.clone();
            match fields.get(key) {
                Some(child) => {
                    let updated = replace(child, rest, new_value, create)?;
                    fields.insert(key.clone(), updated);
                }
                None if create && rest.is_empty() => {
                    fields.insert(key.clone(), new_value);
                }
                None => return Err(PathError::NotFound(key.clone())),
            }
            Ok(State::Object(fields))
        }
        (State::Array(items), Segment::Index(index)) => {
            let mut items: Vector<State> = items.clone();
            if *index < items.len() {
                let updated = replace(&items[*index], rest, new_value, create)?;
                items.set(*index, updated);
            } else if create && rest.is_empty() && *index == items.len() {
                items.push_back(new_value);
            } else {
                return Err(PathError::NotFound(format!("[{index}]")));
            }
            Ok(State::Array(items))
        }
        _ => Err(PathError::NotAContainer(format!("{head:?}"))),
    }
}

/// Removes the leaf at `path`, leaving its container unset (object key
/// removed, or — for arrays — the element spliced out, shifting later
/// indices). Used by the `unset` effect.
pub fn without_value_at(state: &State, path: &Path) -> Result<State, PathError> {
    remove(state, path.segments())
}

fn remove(state: &State, segments: &[Segment]) -> Result<State, PathError> {
    let Some((head, rest)) = segments.split_first() else {
        return Err(PathError::InvalidSyntax("unset requires a non-empty path".to_string()));
    };
    match (state, head) {
        (State::Object(fields), Segment::Key(key)) => {
            let mut fields: OrdMap<String, State> = fields.clone();
            if rest.is_empty() {
                fields.remove(key).ok_or_else(|| PathError::NotFound(key.clone()))?;
            } else {
                let child = fields.get(key).ok_or_else(|| PathError::NotFound(key.clone()))?;
                let updated = remove(child, rest)?;
                fields.insert(key.clone(), updated);
            }
            Ok(State::Object(fields))
        }
        (State::Array(items), Segment::Index(index)) => {
            let mut items: Vector<State> = items.clone();
            if rest.is_empty() {
                if *index >= items.len() {
                    return Err(PathError::NotFound(format!("[{index}]")));
                }
                items.remove(*index);
            } else {
                let updated = remove(
                    items.get(*index).ok_or_else(|| PathError::NotFound(format!("[{index}]")))?,
                    rest,
                )?;
                items.set(*index, updated);
            }
            Ok(State::Array(items))
        }
        _ => Err(PathError::NotAContainer(format!("{head:?}"))),
    }
}

/// Enumerates every reachable path in `state`, including array indices.
pub fn paths_of(state: &State) -> Vec<String> {
    let mut out = Vec::new();
    collect_paths(state, String::new(), &mut out);
    out
}

fn collect_paths(state: &State, prefix: String, out: &mut Vec<String>) {
    match state {
        State::Object(fields) => {
            for (key, value) in fields.iter() {
                let next =
                    if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                out.push(next.clone());
                collect_paths(value, next, out);
            }
        }
        State::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                let next = format!("{prefix}[{index}]");
                out.push(next.clone());
                collect_paths(value, next, out);
            }
        }
        _ => {}
    }
}
