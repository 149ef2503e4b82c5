//! Combat log
//!
//! Plain lines go through the same verbosity/output-mode gate as everywhere
//! else in the engine. Tag-rule applications additionally produce structured
//! [`CombatLogEvent`] records that listeners (a UI, a replay writer) can
//! subscribe to.

use crate::rules::TagRuleApplicationResult;
use bumpalo::Bump;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::fmt::Write as FmtWrite;
use std::ops::Deref;

/// Verbosity level for combat output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Silent - no output
    Silent = 0,
    /// Minimal - battle outcome only
    Minimal = 1,
    /// Normal - turns and resolved actions (default)
    #[default]
    Normal = 2,
    /// Verbose - rule applications and dropped actions
    Verbose = 3,
}

/// Output destination for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    /// Output only to stdout (default)
    #[default]
    Stdout,
    /// Capture only to in-memory buffer (no stdout)
    Memory,
    /// Both stdout and in-memory buffer
    Both,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    pub message: String,
    /// e.g. "action", "diagnostic", "tag_rule"
    pub category: Option<String>,
}

/// Structured record of one tag-rule application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatLogEvent {
    pub message: String,
    pub result: TagRuleApplicationResult,
    pub target: Option<String>,
    pub turn: u32,
}

/// Read-only view of captured entries
pub struct LogGuard<'a> {
    guard: Ref<'a, Vec<LogEntry>>,
}

impl<'a> LogGuard<'a> {
    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.guard.iter()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

impl<'a> Deref for LogGuard<'a> {
    type Target = [LogEntry];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

type Listener = Box<dyn Fn(&CombatLogEvent) + Send>;

/// Battle logger
///
/// Formatting of event lines goes through a bump arena that is reset when the
/// log is cleared. Listeners and captured entries are not carried over by
/// `clone`.
pub struct CombatLog {
    verbosity: VerbosityLevel,
    output_mode: OutputMode,
    turn: u32,

    format_bump: RefCell<Bump>,
    log_buffer: RefCell<Vec<LogEntry>>,
    events: RefCell<Vec<CombatLogEvent>>,
    listeners: Vec<Listener>,
}

impl CombatLog {
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        CombatLog {
            verbosity,
            output_mode: OutputMode::default(),
            turn: 0,
            format_bump: RefCell::new(Bump::new()),
            log_buffer: RefCell::new(Vec::new()),
            events: RefCell::new(Vec::new()),
            listeners: Vec::new(),
        }
    }

    /// Capture into memory only (tests, batch runs)
    pub fn captured(verbosity: VerbosityLevel) -> Self {
        let mut log = Self::with_verbosity(verbosity);
        log.output_mode = OutputMode::Memory;
        log
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    /// Turn number stamped on events
    pub fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }

    /// Register a callback invoked for every tag-rule event
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(&CombatLogEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn logs(&self) -> LogGuard<'_> {
        LogGuard {
            guard: self.log_buffer.borrow(),
        }
    }

    /// Tag-rule events recorded so far
    pub fn events(&self) -> Vec<CombatLogEvent> {
        self.events.borrow().clone()
    }

    /// Captured messages of one category
    pub fn messages_in(&self, category: &str) -> Vec<String> {
        self.log_buffer
            .borrow()
            .iter()
            .filter(|entry| entry.category.as_deref() == Some(category))
            .map(|entry| entry.message.clone())
            .collect()
    }

    pub fn clear_logs(&mut self) {
        self.log_buffer.borrow_mut().clear();
        self.events.borrow_mut().clear();
        self.format_bump.borrow_mut().reset();
    }

    /// Print buffered entries the verbosity allows, then clear
    pub fn flush_buffer(&mut self) {
        let buffer = self.log_buffer.borrow();
        for entry in buffer.iter() {
            if entry.level <= self.verbosity {
                self.log_to_stdout(entry.level, &entry.message);
            }
        }
        drop(buffer);
        self.clear_logs();
    }

    #[inline]
    fn log_to_stdout(&self, level: VerbosityLevel, message: &str) {
        if level == VerbosityLevel::Minimal {
            println!("{}", message);
        } else {
            println!("  {}", message);
        }
    }

    fn emit(&self, level: VerbosityLevel, message: &str, category: Option<&str>) {
        let should_capture = self.is_capturing();
        let should_output = matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both);

        if level > self.verbosity && !should_capture {
            return;
        }

        if should_capture {
            self.log_buffer.borrow_mut().push(LogEntry {
                level,
                message: message.to_string(),
                category: category.map(str::to_string),
            });
        }

        if should_output && level <= self.verbosity {
            self.log_to_stdout(level, message);
        }
    }

    #[inline]
    pub fn minimal(&self, message: &str) {
        self.emit(VerbosityLevel::Minimal, message, None);
    }

    #[inline]
    pub fn normal(&self, message: &str) {
        self.emit(VerbosityLevel::Normal, message, None);
    }

    #[inline]
    pub fn verbose(&self, message: &str) {
        self.emit(VerbosityLevel::Verbose, message, None);
    }

    /// An executed or planned action
    #[inline]
    pub fn action(&self, message: &str) {
        self.emit(VerbosityLevel::Normal, message, Some("action"));
    }

    /// Something dropped or skipped without an error
    #[inline]
    pub fn diagnostic(&self, message: &str) {
        self.emit(VerbosityLevel::Verbose, message, Some("diagnostic"));
    }

    /// Report one tag-rule application
    ///
    /// The event is always recorded and handed to listeners; the text line
    /// follows the usual gate.
    pub fn tag_rule(&self, result: &TagRuleApplicationResult, target: Option<&str>) {
        let message = {
            let bump = self.format_bump.borrow();
            let mut line = bumpalo::collections::String::new_in(&bump);
            let _ = write!(line, "Tag '{}' -> {}", result.source_tag, result.effect_description);
            line.as_str().to_string()
        };

        self.emit(VerbosityLevel::Verbose, &message, Some("tag_rule"));

        let event = CombatLogEvent {
            message,
            result: result.clone(),
            target: target.map(str::to_string),
            turn: self.turn,
        };
        for listener in &self.listeners {
            listener(&event);
        }
        self.events.borrow_mut().push(event);
    }
}

impl Default for CombatLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CombatLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatLog")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("log_count", &self.log_buffer.borrow().len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Clone for CombatLog {
    fn clone(&self) -> Self {
        CombatLog {
            verbosity: self.verbosity,
            output_mode: self.output_mode,
            turn: self.turn,
            format_bump: RefCell::new(Bump::new()),
            log_buffer: RefCell::new(Vec::new()),
            events: RefCell::new(Vec::new()),
            listeners: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{TagRule, TagRuleEffectType, TagRuleTargetType};
    use std::sync::{Arc, Mutex};

    fn sample_result() -> TagRuleApplicationResult {
        let rule = TagRule::new("Nocturne", TagRuleEffectType::AttackModifier, 2.0, TagRuleTargetType::SelfTarget);
        TagRuleApplicationResult::applied("NUIT", &rule, Vec::new(), "Nocturne attack +2")
    }

    #[test]
    fn test_default_verbosity() {
        let log = CombatLog::new();
        assert_eq!(log.verbosity(), VerbosityLevel::Normal);
        assert!(!log.is_capturing());
    }

    #[test]
    fn test_capture_keeps_categories() {
        let log = CombatLog::captured(VerbosityLevel::Normal);
        log.action("Unit 1 attacks Unit 2");
        log.diagnostic("Unit 3 cannot attack");
        log.minimal("Alice wins");

        let logs = log.logs();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].category.as_deref(), Some("action"));
        assert_eq!(logs[1].level, VerbosityLevel::Verbose);
        assert_eq!(log.messages_in("diagnostic"), vec!["Unit 3 cannot attack".to_string()]);
    }

    #[test]
    fn test_tag_rule_event_and_listener() {
        let mut log = CombatLog::captured(VerbosityLevel::Silent);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        log.add_listener(move |event| sink.lock().unwrap().push(event.message.clone()));
        log.set_turn(3);

        log.tag_rule(&sample_result(), Some("Gardien"));

        let events = log.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Tag 'NUIT' -> Nocturne attack +2");
        assert_eq!(events[0].turn, 3);
        assert_eq!(events[0].target.as_deref(), Some("Gardien"));
        assert_eq!(*seen.lock().unwrap(), vec!["Tag 'NUIT' -> Nocturne attack +2".to_string()]);
        assert_eq!(log.messages_in("tag_rule").len(), 1);
    }

    #[test]
    fn test_clear_and_clone() {
        let mut log = CombatLog::captured(VerbosityLevel::Verbose);
        log.tag_rule(&sample_result(), None);
        log.normal("line");
        let copy = log.clone();
        assert!(copy.logs().is_empty());
        assert_eq!(copy.output_mode(), OutputMode::Memory);

        log.clear_logs();
        assert!(log.logs().is_empty());
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_flush_buffer_empties_capture() {
        let mut log = CombatLog::captured(VerbosityLevel::Normal);
        log.normal("message 1");
        log.verbose("hidden");
        assert_eq!(log.logs().len(), 2);
        log.flush_buffer();
        assert_eq!(log.logs().len(), 0);
    }
}
