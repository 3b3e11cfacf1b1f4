// libs/scheduling-cell/src/services/input.rs
//
// Per-keystroke handling for the date and time text fields. The field keeps
// its own display text and only hands a canonical value to the surrounding
// form once the text is complete and valid.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::error::PolicyViolation;
use crate::models::{CalendarDate, ClockTime};
use crate::services::codec;
use crate::services::policy::TemporalPolicyGuard;

// ==============================================================================
// FIELD FORMATS
// ==============================================================================

/// Shape of one kind of field: how many digits, where separators go, and how
/// the complete text maps to a canonical value.
pub trait FieldFormat {
    type Value: Copy + fmt::Debug + PartialEq;

    const SEPARATOR: char;
    /// Digit counts after which a separator is inserted.
    const SEPARATOR_AFTER: &'static [usize];
    const MAX_DIGITS: usize;
    const MAX_LEN: usize;
    const PLACEHOLDER: &'static str;

    fn parse(text: &str) -> Option<Self::Value>;
    fn display(value: &Self::Value) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct DateFormat;

impl FieldFormat for DateFormat {
    type Value = CalendarDate;

    const SEPARATOR: char = '/';
    const SEPARATOR_AFTER: &'static [usize] = &[2, 4];
    const MAX_DIGITS: usize = 8;
    const MAX_LEN: usize = 10;
    const PLACEHOLDER: &'static str = "dd/mm/yyyy";

    fn parse(text: &str) -> Option<CalendarDate> {
        codec::parse_display_date(text)
    }

    fn display(value: &CalendarDate) -> String {
        codec::format_calendar_date_to_display(value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimeFormat;

impl FieldFormat for TimeFormat {
    type Value = ClockTime;

    const SEPARATOR: char = ':';
    const SEPARATOR_AFTER: &'static [usize] = &[2];
    const MAX_DIGITS: usize = 4;
    const MAX_LEN: usize = 5;
    const PLACEHOLDER: &'static str = "HH:mm";

    fn parse(text: &str) -> Option<ClockTime> {
        codec::parse_display_time(text)
    }

    fn display(value: &ClockTime) -> String {
        codec::format_clock_time_to_display(value)
    }
}

/// Keep only digits, cap their count, and put the fixed separators back.
/// Editing is treated as append/remove at the right end.
pub fn auto_format<F: FieldFormat>(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).take(F::MAX_DIGITS).collect();

    let mut out = String::with_capacity(F::MAX_LEN);
    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && F::SEPARATOR_AFTER.contains(&index) {
            out.push(F::SEPARATOR);
        }
        out.push(*digit);
    }
    out
}

// ==============================================================================
// KEY FILTERING
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Delete,
    Tab,
    Escape,
    Enter,
    Home,
    End,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
}

impl KeyPress {
    pub fn plain(key: Key) -> Self {
        Self { key, ctrl: false, shift: false }
    }

    pub fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    pub fn ctrl(c: char) -> Self {
        Self { key: Key::Char(c), ctrl: true, shift: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDecision {
    Accept,
    Block,
}

// ==============================================================================
// FIELD STATE MACHINE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Empty,
    Partial,
    /// Complete and accepted; the value has been emitted.
    Valid,
    /// Complete but refused by policy; the text was cleared.
    Rejected(PolicyViolation),
}

/// What the field tells the surrounding form after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEmission<T> {
    /// Nothing to report.
    Unchanged,
    Value(T),
    /// Empty value: the text was emptied, was incomplete on blur, or did not parse.
    Cleared,
    /// Empty value because the complete entry broke the temporal policy.
    Rejected(PolicyViolation),
}

impl<T> FieldEmission<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FieldEmission::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty_value(&self) -> bool {
        matches!(self, FieldEmission::Cleared | FieldEmission::Rejected(_))
    }
}

type Acceptor<T> = Arc<dyn Fn(&T) -> Result<(), PolicyViolation> + Send + Sync>;

pub struct InputField<F: FieldFormat> {
    text: String,
    state: FieldState,
    value: Option<F::Value>,
    acceptor: Option<Acceptor<F::Value>>,
    _format: PhantomData<F>,
}

pub type DateField = InputField<DateFormat>;
pub type TimeField = InputField<TimeFormat>;

impl<F: FieldFormat> Default for InputField<F> {
    fn default() -> Self {
        Self {
            text: String::new(),
            state: FieldState::Empty,
            value: None,
            acceptor: None,
            _format: PhantomData,
        }
    }
}

impl<F: FieldFormat> fmt::Debug for InputField<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputField")
            .field("text", &self.text)
            .field("state", &self.state)
            .field("value", &self.value)
            .finish()
    }
}

impl<F: FieldFormat> InputField<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    pub fn value(&self) -> Option<F::Value> {
        self.value
    }

    pub fn placeholder(&self) -> &'static str {
        F::PLACEHOLDER
    }

    /// Decide whether a key press may reach the text at all.
    pub fn filter_key(&self, press: KeyPress) -> KeyDecision {
        match press.key {
            Key::Backspace
            | Key::Delete
            | Key::Tab
            | Key::Escape
            | Key::Enter
            | Key::Home
            | Key::End
            | Key::ArrowLeft
            | Key::ArrowRight
            | Key::ArrowUp => KeyDecision::Accept,
            Key::ArrowDown => KeyDecision::Block,
            Key::Char(c) if press.ctrl => {
                if matches!(c.to_ascii_lowercase(), 'a' | 'c' | 'v' | 'x') {
                    KeyDecision::Accept
                } else {
                    KeyDecision::Block
                }
            }
            Key::Char(c) if c.is_ascii_digit() && !press.shift => KeyDecision::Accept,
            Key::Char(c) if c == F::SEPARATOR => KeyDecision::Accept,
            Key::Char(_) => KeyDecision::Block,
        }
    }

    /// Replace the whole text, as an `input` event would.
    pub fn input(&mut self, raw: &str) -> FieldEmission<F::Value> {
        self.text = auto_format::<F>(raw);

        if self.text.is_empty() {
            self.state = FieldState::Empty;
            self.value = None;
            return FieldEmission::Cleared;
        }

        if self.text.chars().count() < F::MAX_LEN {
            self.state = FieldState::Partial;
            return FieldEmission::Unchanged;
        }

        self.complete()
    }

    /// Append one typed character at the right end.
    pub fn type_char(&mut self, c: char) -> FieldEmission<F::Value> {
        let mut raw = self.text.clone();
        raw.push(c);
        self.input(&raw)
    }

    /// Paste or type a run of characters, key by key, as a user would.
    /// Blocked characters never reach the text.
    pub fn type_text(&mut self, typed: &str) -> FieldEmission<F::Value> {
        let mut last = FieldEmission::Unchanged;
        for c in typed.chars() {
            if self.filter_key(KeyPress::char(c)) == KeyDecision::Block {
                continue;
            }
            match self.type_char(c) {
                FieldEmission::Unchanged => {}
                emission => last = emission,
            }
        }
        last
    }

    /// Remove the right-most character.
    pub fn backspace(&mut self) -> FieldEmission<F::Value> {
        let mut raw = self.text.clone();
        raw.pop();
        // Dropping a separator alone would leave the digits unchanged.
        if raw.ends_with(F::SEPARATOR) {
            raw.pop();
        }
        self.input(&raw)
    }

    /// Focus left the field.
    pub fn blur(&mut self) -> FieldEmission<F::Value> {
        match self.state {
            FieldState::Partial => {
                debug!("Clearing incomplete entry '{}' on blur", self.text);
                self.clear();
                FieldEmission::Cleared
            }
            FieldState::Valid => {
                if let Some(value) = &self.value {
                    self.text = F::display(value);
                }
                FieldEmission::Unchanged
            }
            FieldState::Empty | FieldState::Rejected(_) => FieldEmission::Unchanged,
        }
    }

    /// Seed the field from a canonical value owned by the form. No emission.
    pub fn set_value(&mut self, value: Option<F::Value>) {
        match value {
            Some(value) => {
                self.text = F::display(&value);
                self.value = Some(value);
                self.state = FieldState::Valid;
            }
            None => self.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.value = None;
        self.state = FieldState::Empty;
    }

    fn complete(&mut self) -> FieldEmission<F::Value> {
        let Some(value) = F::parse(&self.text) else {
            debug!("Complete entry '{}' did not parse, clearing", self.text);
            self.clear();
            return FieldEmission::Cleared;
        };

        if let Some(acceptor) = self.acceptor.clone() {
            if let Err(violation) = acceptor(&value) {
                self.clear();
                self.state = FieldState::Rejected(violation);
                return FieldEmission::Rejected(violation);
            }
        }

        self.value = Some(value);
        self.state = FieldState::Valid;
        FieldEmission::Value(value)
    }
}

impl DateField {
    /// A date field that refuses days before today.
    pub fn with_policy(guard: TemporalPolicyGuard) -> Self {
        Self {
            acceptor: Some(Arc::new(move |date: &CalendarDate| guard.check_date(date))),
            ..Self::default()
        }
    }
}
