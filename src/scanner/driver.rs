//! The scan driver: runs a parser's regex rules over a buffer.
//!
//! Line rules are applied to each line in declaration order and fire
//! independently of each other, except that a match of an `{exclusive}` rule
//! ends rule processing for that line. Multi-line rules run over the whole
//! buffer once the line pass is finished.

use regex::{CaptureMatches, Captures};

use crate::error::TaggerError;
use crate::parsers::{ActiveRule, ParserDescriptor, ResolvedParser};
use crate::pattern::ScopeAction;
use crate::rules::RegexRule;
use crate::tag::{TagRecord, TagScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    Done,
    /// The buffer could not be read; nothing was scanned
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Lines longer than this trip the match guard for every line rule
    pub max_line_len: usize,
    /// Buffers longer than this trip the match guard for multi-line rules
    pub max_buffer_len: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_line_len: 64 * 1024,
            max_buffer_len: 16 * 1024 * 1024,
        }
    }
}

/// Lazy sequence of tags for one parser over one buffer.
///
/// Holds no state shared with other scans, so scanning the same buffer twice
/// yields the same records.
pub struct Scan<'a> {
    parser: &'a ParserDescriptor,
    resolved: Option<&'a ResolvedParser>,
    buffer: &'a str,
    options: ScanOptions,
    state: ScanState,
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    current: Option<(usize, &'a str)>,
    next_rule: usize,
    next_multiline: usize,
    multiline_matches: Option<(&'a ActiveRule, CaptureMatches<'a, 'a>)>,
    line_starts: Option<Vec<usize>>,
    scope: Vec<TagScope>,
    faults: usize,
}

pub fn scan<'a>(parser: &'a ParserDescriptor, buffer: &'a str) -> Scan<'a> {
    scan_with_options(parser, buffer, ScanOptions::default())
}

pub fn scan_with_options<'a>(
    parser: &'a ParserDescriptor,
    buffer: &'a str,
    options: ScanOptions,
) -> Scan<'a> {
    let resolved = if parser.is_enabled() {
        parser.resolved()
    } else {
        None
    };
    if resolved.is_none() {
        tracing::debug!("{} is disabled or not initialized, skipping", parser.name());
    }

    Scan {
        parser,
        resolved,
        buffer,
        options,
        state: ScanState::Idle,
        lines: buffer.lines().enumerate(),
        current: None,
        next_rule: 0,
        next_multiline: 0,
        multiline_matches: None,
        line_starts: None,
        scope: Vec::new(),
        faults: 0,
    }
}

impl<'a> Scan<'a> {
    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn parser(&self) -> &'a ParserDescriptor {
        self.parser
    }

    /// Rule applications skipped because the match guard tripped.
    pub fn faults(&self) -> usize {
        self.faults
    }

    fn next_line_tag(&mut self, resolved: &'a ResolvedParser) -> Option<TagRecord> {
        let parser = self.parser;
        loop {
            if let Some((line_no, line)) = self.current {
                while self.next_rule < resolved.line_rules.len() {
                    let active = &resolved.line_rules[self.next_rule];
                    self.next_rule += 1;
                    let rule = &parser.rules()[active.rule];

                    if line.len() > self.options.max_line_len {
                        self.fault(active, line_no, "line exceeds the match guard length");
                        continue;
                    }
                    let Some(caps) = rule.pattern.regex().captures(line) else {
                        continue;
                    };
                    if is_empty_match(&caps) {
                        continue;
                    }
                    if rule.exclusive {
                        self.next_rule = resolved.line_rules.len();
                    }

                    let column = caps.get(0).map_or(0, |m| m.start());
                    if let Some(tag) = self.make_tag(rule, active, &caps, line_no, column) {
                        return Some(tag);
                    }
                }
                self.current = None;
            }

            let (index, line) = self.lines.next()?;
            self.current = Some((index + 1, line));
            self.next_rule = 0;
        }
    }

    fn next_multiline_tag(&mut self, resolved: &'a ResolvedParser) -> Option<TagRecord> {
        let parser = self.parser;
        loop {
            let next = match self.multiline_matches.as_mut() {
                Some((active, matches)) => matches.next().map(|caps| (*active, caps)),
                None => None,
            };

            if let Some((active, caps)) = next {
                if is_empty_match(&caps) {
                    continue;
                }
                let rule = &parser.rules()[active.rule];
                let start = caps.get(0).map_or(0, |m| m.start());
                let (line, column) = self.locate(start);
                if let Some(tag) = self.make_tag(rule, active, &caps, line, column) {
                    return Some(tag);
                }
                continue;
            }

            self.multiline_matches = None;
            let active = resolved.multiline_rules.get(self.next_multiline)?;
            self.next_multiline += 1;

            if self.buffer.len() > self.options.max_buffer_len {
                self.fault(active, 1, "buffer exceeds the match guard length");
                continue;
            }
            let rule = &parser.rules()[active.rule];
            self.multiline_matches = Some((active, rule.pattern.regex().captures_iter(self.buffer)));
        }
    }

    fn make_tag(
        &mut self,
        rule: &RegexRule,
        active: &ActiveRule,
        caps: &Captures<'_>,
        line: usize,
        column: usize,
    ) -> Option<TagRecord> {
        if !active.kind.enabled {
            return None;
        }

        let mut tag = TagRecord {
            name: rule.name.expand(caps),
            kind: active.kind.letter,
            kind_name: active.kind.name.clone(),
            role: active.role.clone(),
            line,
            column,
            parser: self.parser.name().to_string(),
            language: active.language.clone(),
            fields: rule
                .fields
                .iter()
                .map(|(name, template)| (name.clone(), template.expand(caps)))
                .collect(),
            scope: None,
        };

        if let Some(action) = rule.scope {
            self.apply_scope(action, &mut tag);
        }

        if rule.placeholder {
            None
        } else {
            Some(tag)
        }
    }

    fn apply_scope(&mut self, action: ScopeAction, tag: &mut TagRecord) {
        match action {
            ScopeAction::Ref => tag.scope = self.scope.last().cloned(),
            ScopeAction::Push => {
                tag.scope = self.scope.last().cloned();
                self.scope.push(TagScope::new(&tag.kind_name, &tag.name));
            }
            // The popping tag belongs to the enclosing scope.
            ScopeAction::Pop => {
                self.scope.pop();
                tag.scope = self.scope.last().cloned();
            }
            ScopeAction::Clear => {
                self.scope.clear();
                tag.scope = None;
            }
            ScopeAction::Set => {
                self.scope.clear();
                tag.scope = None;
                self.scope.push(TagScope::new(&tag.kind_name, &tag.name));
            }
        }
    }

    fn fault(&mut self, active: &ActiveRule, line: usize, message: &str) {
        self.faults += 1;
        let error = TaggerError::MatchFault {
            parser: self.parser.name().to_string(),
            rule: self.parser.rule_row(active.rule),
            line,
            message: message.to_string(),
        };
        tracing::warn!("{}", error);
    }

    /// 1-based line and 0-based column of a byte offset in the buffer.
    fn locate(&mut self, offset: usize) -> (usize, usize) {
        let buffer = self.buffer;
        let starts = self.line_starts.get_or_insert_with(|| {
            std::iter::once(0)
                .chain(buffer.match_indices('\n').map(|(i, _)| i + 1))
                .collect()
        });
        let line = starts.partition_point(|&start| start <= offset);
        (line, offset - starts[line - 1])
    }
}

/// Patterns that can match nothing, like `([a-z]*)`, would otherwise tag
/// every line, or every byte offset in a multi-line pass.
fn is_empty_match(caps: &Captures<'_>) -> bool {
    caps.get(0).map_or(true, |m| m.is_empty())
}

impl<'a> Iterator for Scan<'a> {
    type Item = TagRecord;

    fn next(&mut self) -> Option<TagRecord> {
        let Some(resolved) = self.resolved else {
            self.state = ScanState::Done;
            return None;
        };

        match self.state {
            ScanState::Idle => self.state = ScanState::Scanning,
            ScanState::Scanning => {}
            ScanState::Done | ScanState::Aborted => return None,
        }

        if let Some(tag) = self.next_line_tag(resolved) {
            return Some(tag);
        }
        if let Some(tag) = self.next_multiline_tag(resolved) {
            return Some(tag);
        }

        self.state = ScanState::Done;
        None
    }
}
