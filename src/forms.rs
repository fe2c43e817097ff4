//! Declarative form schemas and client-side validation.
//!
//! A form is a fixed list of [`FieldSpec`]s plus one string value per field.
//! Dialogs and inline edit buffers both use [`Form`], so the same rules guard
//! creation and updates.

use crate::error::FieldErrors;
use crate::models::{parse_date, parse_time, parse_timestamp};

/// How a field takes input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Free text rendered masked.
    Secret,
    /// Digits only.
    Number,
    /// One of a fixed list, cycled with Left/Right.
    Choice(&'static [&'static str]),
    /// One of a list supplied at runtime as `(value, label)` pairs.
    Lookup,
}

/// A constraint on a field value. Each carries the message shown on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    MinLen(usize, &'static str),
    /// Like `MinLen`, but an empty value passes.
    MinLenIfPresent(usize, &'static str),
    OneOf(&'static [&'static str], &'static str),
    PositiveInt(&'static str),
    Date(&'static str),
    Time(&'static str),
    DateTime(&'static str),
    Email(&'static str),
}

impl Rule {
    fn check(&self, value: &str) -> Result<(), &'static str> {
        let ok = match *self {
            Rule::MinLen(min, _) => value.trim().chars().count() >= min,
            Rule::MinLenIfPresent(min, _) => value.is_empty() || value.chars().count() >= min,
            Rule::OneOf(options, _) => options.contains(&value),
            Rule::PositiveInt(_) => value.trim().parse::<u64>().map_or(false, |n| n > 0),
            Rule::Date(_) => parse_date(value).is_some(),
            Rule::Time(_) => parse_time(value).is_some(),
            Rule::DateTime(_) => parse_timestamp(value).is_some(),
            Rule::Email(_) => is_email(value.trim()),
        };
        if ok {
            Ok(())
        } else {
            Err(self.message())
        }
    }

    fn message(&self) -> &'static str {
        match *self {
            Rule::MinLen(_, m)
            | Rule::MinLenIfPresent(_, m)
            | Rule::OneOf(_, m)
            | Rule::PositiveInt(m)
            | Rule::Date(m)
            | Rule::Time(m)
            | Rule::DateTime(m)
            | Rule::Email(m) => m,
        }
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !value.contains(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub rules: &'static [Rule],
    pub placeholder: &'static str,
}

/// A schema-bound set of field values with focus and error state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    schema: &'static [FieldSpec],
    values: Vec<String>,
    errors: FieldErrors,
    focus: usize,
    lookup: Vec<(String, String)>,
}

impl Form {
    pub fn new(schema: &'static [FieldSpec]) -> Self {
        Self {
            schema,
            values: vec![String::new(); schema.len()],
            errors: FieldErrors::new(),
            focus: 0,
            lookup: Vec::new(),
        }
    }

    /// Builds a form pre-filled from `(key, value)` pairs. Unknown keys are ignored.
    pub fn with_values(schema: &'static [FieldSpec], values: &[(&str, String)]) -> Self {
        let mut form = Self::new(schema);
        for (key, value) in values {
            form.set(key, value.clone());
        }
        form
    }

    pub fn schema(&self) -> &'static [FieldSpec] {
        self.schema
    }

    fn index(&self, key: &str) -> Option<usize> {
        self.schema.iter().position(|f| f.key == key)
    }

    pub fn value(&self, key: &str) -> &str {
        self.index(key)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: String) {
        if let Some(i) = self.index(key) {
            self.values[i] = value;
        }
    }

    pub fn values(&self) -> impl Iterator<Item = (&'static FieldSpec, &str)> {
        self.schema.iter().zip(self.values.iter().map(String::as_str))
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focus_next(&mut self) {
        if !self.schema.is_empty() {
            self.focus = (self.focus + 1) % self.schema.len();
        }
    }

    pub fn focus_previous(&mut self) {
        if !self.schema.is_empty() {
            self.focus = (self.focus + self.schema.len() - 1) % self.schema.len();
        }
    }

    /// Options for [`FieldKind::Lookup`] fields, as `(value, label)` pairs.
    pub fn set_lookup(&mut self, options: Vec<(String, String)>) {
        self.lookup = options;
    }

    pub fn lookup_label(&self, value: &str) -> Option<&str> {
        self.lookup
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, label)| label.as_str())
    }

    /// Types a character into the focused field.
    pub fn input_char(&mut self, c: char) {
        let Some(spec) = self.schema.get(self.focus) else {
            return;
        };
        match spec.kind {
            FieldKind::Text | FieldKind::Secret => self.values[self.focus].push(c),
            FieldKind::Number if c.is_ascii_digit() => self.values[self.focus].push(c),
            FieldKind::Number | FieldKind::Choice(_) | FieldKind::Lookup => {}
        }
        self.errors = without(&self.errors, spec.key);
    }

    pub fn backspace(&mut self) {
        let Some(spec) = self.schema.get(self.focus) else {
            return;
        };
        if matches!(spec.kind, FieldKind::Text | FieldKind::Secret | FieldKind::Number) {
            self.values[self.focus].pop();
        }
    }

    /// Steps a choice or lookup field forward or back. No-op on text fields.
    pub fn cycle(&mut self, forward: bool) {
        let Some(spec) = self.schema.get(self.focus) else {
            return;
        };
        let options: Vec<&str> = match spec.kind {
            FieldKind::Choice(options) => options.to_vec(),
            FieldKind::Lookup => self.lookup.iter().map(|(v, _)| v.as_str()).collect(),
            _ => return,
        };
        if options.is_empty() {
            return;
        }
        let current = options.iter().position(|o| *o == self.values[self.focus]);
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % options.len(),
            (Some(i), false) => (i + options.len() - 1) % options.len(),
        };
        self.values[self.focus] = options[next].to_string();
        self.errors = without(&self.errors, spec.key);
    }

    /// Runs every rule. Errors are kept on the form for rendering.
    pub fn validate(&mut self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for (spec, value) in self.schema.iter().zip(&self.values) {
            for rule in spec.rules {
                if let Err(message) = rule.check(value) {
                    errors.push(spec.key, message);
                    break;
                }
            }
        }
        self.errors = errors.clone();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn error(&self, key: &str) -> Option<&'static str> {
        self.errors.get(key)
    }

    /// Parses a field as a positive integer, reporting the field's own message.
    pub fn positive(&self, key: &'static str) -> Result<u64, FieldErrors> {
        let value = self.value(key).trim();
        match value.parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => {
                let mut errors = FieldErrors::new();
                errors.push(key, "Must be a positive number");
                Err(errors)
            }
        }
    }
}

fn without(errors: &FieldErrors, key: &str) -> FieldErrors {
    let mut kept = FieldErrors::new();
    for e in errors.iter().filter(|e| e.field != key) {
        kept.push(e.field, e.message);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &[FieldSpec] = &[
        FieldSpec {
            key: "name",
            label: "Name",
            kind: FieldKind::Text,
            rules: &[Rule::MinLen(2, "Name must be at least 2 characters")],
            placeholder: "",
        },
        FieldSpec {
            key: "role",
            label: "Role",
            kind: FieldKind::Choice(&["staff", "patient"]),
            rules: &[Rule::OneOf(&["staff", "patient"], "Select a role")],
            placeholder: "",
        },
        FieldSpec {
            key: "doctor",
            label: "Doctor ID",
            kind: FieldKind::Number,
            rules: &[Rule::PositiveInt("Doctor ID must be positive")],
            placeholder: "",
        },
        FieldSpec {
            key: "password",
            label: "Password",
            kind: FieldKind::Secret,
            rules: &[Rule::MinLenIfPresent(6, "Password must be at least 6 characters")],
            placeholder: "",
        },
    ];

    #[test]
    fn validate_reports_first_failure_per_field() {
        let mut form = Form::with_values(SCHEMA, &[("name", "J".to_string())]);
        let errors = form.validate().unwrap_err();

        assert_eq!(form.error("name"), Some("Name must be at least 2 characters"));
        assert_eq!(form.error("role"), Some("Select a role"));
        assert_eq!(form.error("doctor"), Some("Doctor ID must be positive"));
        assert_eq!(form.error("password"), None);
        assert_eq!(errors.iter().count(), 3);
    }

    #[test]
    fn valid_form_passes() {
        let mut form = Form::with_values(
            SCHEMA,
            &[
                ("name", "Jo".to_string()),
                ("role", "staff".to_string()),
                ("doctor", "7".to_string()),
            ],
        );
        assert!(form.validate().is_ok());
        assert_eq!(form.positive("doctor").unwrap(), 7);
    }

    #[test]
    fn number_fields_only_take_digits() {
        let mut form = Form::new(SCHEMA);
        form.focus_next();
        form.focus_next();
        assert_eq!(form.focus(), 2);
        for c in "4a2".chars() {
            form.input_char(c);
        }
        assert_eq!(form.value("doctor"), "42");
    }

    #[test]
    fn choice_fields_cycle_both_ways() {
        let mut form = Form::new(SCHEMA);
        form.focus_next();
        form.cycle(true);
        assert_eq!(form.value("role"), "staff");
        form.cycle(true);
        assert_eq!(form.value("role"), "patient");
        form.cycle(true);
        assert_eq!(form.value("role"), "staff");
        form.cycle(false);
        assert_eq!(form.value("role"), "patient");
    }

    #[test]
    fn typing_clears_that_fields_error() {
        let mut form = Form::new(SCHEMA);
        let _ = form.validate();
        assert!(form.error("name").is_some());
        form.input_char('A');
        assert!(form.error("name").is_none());
        assert!(form.error("role").is_some());
    }

    #[test]
    fn email_rule_rejects_obvious_garbage() {
        assert!(Rule::Email("bad").check("ada@example.com").is_ok());
        assert!(Rule::Email("bad").check("ada@example").is_err());
        assert!(Rule::Email("bad").check("@example.com").is_err());
        assert!(Rule::Email("bad").check("ada smith@example.com").is_err());
    }

    #[test]
    fn lookup_cycles_runtime_options() {
        const LOOKUP: &[FieldSpec] = &[FieldSpec {
            key: "doctorId",
            label: "Doctor",
            kind: FieldKind::Lookup,
            rules: &[Rule::MinLen(1, "Please select a doctor")],
            placeholder: "",
        }];
        let mut form = Form::new(LOOKUP);
        form.cycle(true);
        assert_eq!(form.value("doctorId"), "");

        form.set_lookup(vec![
            ("1".to_string(), "Dr. Grey".to_string()),
            ("2".to_string(), "Dr. House".to_string()),
        ]);
        form.cycle(true);
        assert_eq!(form.value("doctorId"), "1");
        assert_eq!(form.lookup_label("1"), Some("Dr. Grey"));
    }
}
