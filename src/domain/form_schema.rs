//! Dynamic form definitions and answer validation.
//!
//! A form field's `field_type`, `options` and `validation_rules` are compiled
//! once into a [`FieldRule`]; submitted answers are then checked against the
//! compiled form. The first violation aborts validation.

use crate::domain::models::{FieldType, FormField};
use crate::error::{AppError, AppResult};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerInput {
    pub field_key: String,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Required-field coverage is skipped; unknown keys and bad values still fail.
    Draft,
    Submission,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RuleSpec {
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<String>,
    min: Option<Value>,
    max: Option<Value>,
    integer: bool,
    min_items: Option<usize>,
    max_items: Option<usize>,
}

#[derive(Debug, Clone)]
pub enum FieldRule {
    Text {
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<Regex>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
        integer: bool,
    },
    Rating {
        min: i64,
        max: i64,
    },
    Choice {
        options: Vec<Value>,
        multiple: bool,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Flag,
    Date {
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
    },
    File {
        max_length: Option<usize>,
    },
}

fn rule_error(key: &str, rule: &str) -> AppError {
    AppError::validation(format!("field {key}: invalid validation rule {rule}"))
}

fn value_error(key: &str, rule: impl std::fmt::Display) -> AppError {
    AppError::validation(format!("invalid value for field {key}: {rule}"))
}

fn number_bound(key: &str, name: &str, raw: &Option<Value>) -> AppResult<Option<f64>> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| rule_error(key, name)),
    }
}

fn date_bound(key: &str, name: &str, raw: &Option<Value>) -> AppResult<Option<NaiveDate>> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| rule_error(key, name)),
        Some(_) => Err(rule_error(key, name)),
    }
}

fn choice_values(options: Option<&Value>) -> Vec<Value> {
    match options {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => obj.get("value").cloned().unwrap_or(Value::Null),
                other => other.clone(),
            })
            .filter(|v| !v.is_null())
            .collect(),
        Some(Value::Object(obj)) => choice_values(obj.get("choices")),
        _ => Vec::new(),
    }
}

/// True for `null`, blank strings, empty arrays and empty objects.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

impl FieldRule {
    pub fn compile(
        key: &str,
        field_type: FieldType,
        options: Option<&Value>,
        rules: Option<&Value>,
    ) -> AppResult<Self> {
        let spec: RuleSpec = match rules {
            None | Some(Value::Null) => RuleSpec::default(),
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| AppError::validation(format!("field {key}: malformed validation rules ({e})")))?,
        };

        if let (Some(lo), Some(hi)) = (spec.min_length, spec.max_length) {
            if lo > hi {
                return Err(rule_error(key, "min_length > max_length"));
            }
        }
        if let (Some(lo), Some(hi)) = (spec.min_items, spec.max_items) {
            if lo > hi {
                return Err(rule_error(key, "min_items > max_items"));
            }
        }

        let rule = match field_type {
            FieldType::Text | FieldType::Textarea => {
                let pattern = match &spec.pattern {
                    Some(p) => Some(Regex::new(p).map_err(|_| rule_error(key, "pattern"))?),
                    None => None,
                };
                FieldRule::Text {
                    min_length: spec.min_length,
                    max_length: spec.max_length,
                    pattern,
                }
            }
            FieldType::Number => {
                let min = number_bound(key, "min", &spec.min)?;
                let max = number_bound(key, "max", &spec.max)?;
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(rule_error(key, "min > max"));
                    }
                }
                FieldRule::Number {
                    min,
                    max,
                    integer: spec.integer,
                }
            }
            FieldType::Rating => {
                let min = number_bound(key, "min", &spec.min)?.map(|v| v as i64).unwrap_or(1);
                let max = number_bound(key, "max", &spec.max)?.map(|v| v as i64).unwrap_or(5);
                if min > max {
                    return Err(rule_error(key, "min > max"));
                }
                FieldRule::Rating { min, max }
            }
            FieldType::Select | FieldType::Radio | FieldType::MultiSelect => {
                let options = choice_values(options);
                if options.is_empty() {
                    return Err(AppError::validation(format!(
                        "field {key}: {} requires options",
                        field_type.as_str()
                    )));
                }
                FieldRule::Choice {
                    options,
                    multiple: field_type == FieldType::MultiSelect,
                    min_items: spec.min_items,
                    max_items: spec.max_items,
                }
            }
            FieldType::Checkbox => {
                let options = choice_values(options);
                if options.is_empty() {
                    FieldRule::Flag
                } else {
                    FieldRule::Choice {
                        options,
                        multiple: true,
                        min_items: spec.min_items,
                        max_items: spec.max_items,
                    }
                }
            }
            FieldType::Boolean => FieldRule::Flag,
            FieldType::Date => {
                let min = date_bound(key, "min", &spec.min)?;
                let max = date_bound(key, "max", &spec.max)?;
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(rule_error(key, "min > max"));
                    }
                }
                FieldRule::Date { min, max }
            }
            FieldType::File => FieldRule::File {
                max_length: spec.max_length,
            },
        };
        Ok(rule)
    }

    /// Checks a non-empty submitted value.
    pub fn check(&self, key: &str, value: &Value) -> AppResult<()> {
        match self {
            FieldRule::Text {
                min_length,
                max_length,
                pattern,
            } => {
                let text = value.as_str().ok_or_else(|| value_error(key, "expected text"))?;
                let len = text.chars().count();
                if let Some(min) = min_length {
                    if len < *min {
                        return Err(value_error(key, format!("min_length {min}")));
                    }
                }
                if let Some(max) = max_length {
                    if len > *max {
                        return Err(value_error(key, format!("max_length {max}")));
                    }
                }
                if let Some(re) = pattern {
                    if !re.is_match(text) {
                        return Err(value_error(key, format!("pattern {}", re.as_str())));
                    }
                }
            }
            FieldRule::Number { min, max, integer } => {
                let n = value.as_f64().ok_or_else(|| value_error(key, "expected a number"))?;
                if *integer && n.fract() != 0.0 {
                    return Err(value_error(key, "integer"));
                }
                if let Some(lo) = min {
                    if n < *lo {
                        return Err(value_error(key, format!("min {lo}")));
                    }
                }
                if let Some(hi) = max {
                    if n > *hi {
                        return Err(value_error(key, format!("max {hi}")));
                    }
                }
            }
            FieldRule::Rating { min, max } => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| value_error(key, "expected an integer rating"))?;
                if n < *min || n > *max {
                    return Err(value_error(key, format!("rating range {min}..{max}")));
                }
            }
            FieldRule::Choice {
                options,
                multiple,
                min_items,
                max_items,
            } => {
                if *multiple {
                    let picked = value
                        .as_array()
                        .ok_or_else(|| value_error(key, "expected a list of options"))?;
                    let mut seen = HashSet::new();
                    for item in picked {
                        if !options.contains(item) {
                            return Err(value_error(key, format!("option {item} not allowed")));
                        }
                        if !seen.insert(item.to_string()) {
                            return Err(value_error(key, format!("option {item} selected twice")));
                        }
                    }
                    if let Some(min) = min_items {
                        if picked.len() < *min {
                            return Err(value_error(key, format!("min_items {min}")));
                        }
                    }
                    if let Some(max) = max_items {
                        if picked.len() > *max {
                            return Err(value_error(key, format!("max_items {max}")));
                        }
                    }
                } else if !options.contains(value) {
                    return Err(value_error(key, format!("option {value} not allowed")));
                }
            }
            FieldRule::Flag => {
                if !value.is_boolean() {
                    return Err(value_error(key, "expected true or false"));
                }
            }
            FieldRule::Date { min, max } => {
                let raw = value.as_str().ok_or_else(|| value_error(key, "expected a date"))?;
                let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
                    .map_err(|_| value_error(key, "date format YYYY-MM-DD"))?;
                if let Some(lo) = min {
                    if date < *lo {
                        return Err(value_error(key, format!("min {lo}")));
                    }
                }
                if let Some(hi) = max {
                    if date > *hi {
                        return Err(value_error(key, format!("max {hi}")));
                    }
                }
            }
            FieldRule::File { max_length } => {
                let reference = value
                    .as_str()
                    .ok_or_else(|| value_error(key, "expected a file reference"))?;
                if let Some(max) = max_length {
                    if reference.chars().count() > *max {
                        return Err(value_error(key, format!("max_length {max}")));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CompiledField {
    pub key: String,
    pub required: bool,
    pub rule: FieldRule,
}

/// Field definitions of one form, in `order_index` order, ready to validate answers.
#[derive(Debug, Clone)]
pub struct CompiledForm {
    fields: Vec<CompiledField>,
}

impl CompiledForm {
    pub fn compile(fields: &[FormField]) -> AppResult<Self> {
        let mut ordered: Vec<&FormField> = fields.iter().collect();
        ordered.sort_by_key(|f| f.order_index);

        let mut compiled = Vec::with_capacity(ordered.len());
        for field in ordered {
            compiled.push(CompiledField {
                key: field.field_key.clone(),
                required: field.is_required,
                rule: FieldRule::compile(
                    &field.field_key,
                    field.field_type,
                    field.options.as_ref(),
                    field.validation_rules.as_ref(),
                )?,
            });
        }
        Ok(Self { fields: compiled })
    }

    fn field(&self, key: &str) -> Option<&CompiledField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn validate(&self, answers: &[AnswerInput], mode: ValidationMode) -> AppResult<()> {
        let mut submitted = HashSet::new();
        for answer in answers {
            if self.field(&answer.field_key).is_none() {
                return Err(AppError::validation(format!("unknown field {}", answer.field_key)));
            }
            if !submitted.insert(answer.field_key.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate answer for field {}",
                    answer.field_key
                )));
            }
        }

        for field in &self.fields {
            let value = answers
                .iter()
                .find(|a| a.field_key == field.key)
                .map(|a| &a.value)
                .filter(|v| !is_empty_value(v));

            match value {
                Some(v) => field.rule.check(&field.key, v)?,
                None if field.required && mode == ValidationMode::Submission => {
                    return Err(AppError::validation(format!(
                        "missing required field {}",
                        field.key
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    pub(crate) fn field(key: &str, field_type: FieldType, required: bool, order: i32) -> FormField {
        FormField {
            id: Uuid::new_v4(),
            form_id: Uuid::nil(),
            label: key.to_string(),
            field_key: key.to_string(),
            field_type,
            is_required: required,
            order_index: order,
            options: None,
            ui_schema: None,
            validation_rules: None,
        }
    }

    fn answer(key: &str, value: Value) -> AnswerInput {
        AnswerInput {
            field_key: key.to_string(),
            value,
        }
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_field_fails_submission_but_not_draft() {
        let form = CompiledForm::compile(&[
            field("performance", FieldType::Rating, true, 0),
            field("notes", FieldType::Textarea, false, 1),
        ])
        .unwrap();
        let answers = vec![answer("notes", json!("great quarter"))];

        let err = form.validate(&answers, ValidationMode::Submission).unwrap_err();
        assert_eq!(message(err), "missing required field performance");
        assert!(form.validate(&answers, ValidationMode::Draft).is_ok());
    }

    #[test]
    fn empty_values_count_as_missing() {
        let form = CompiledForm::compile(&[field("summary", FieldType::Text, true, 0)]).unwrap();
        for empty in [json!(null), json!("   "), json!([]), json!({})] {
            let err = form
                .validate(&[answer("summary", empty)], ValidationMode::Submission)
                .unwrap_err();
            assert_eq!(message(err), "missing required field summary");
        }
    }

    #[test]
    fn unknown_keys_fail_in_every_mode() {
        let form = CompiledForm::compile(&[field("performance", FieldType::Rating, true, 0)]).unwrap();
        let answers = vec![answer("performance", json!(4)), answer("bogus", json!("x"))];
        for mode in [ValidationMode::Draft, ValidationMode::Submission] {
            let err = form.validate(&answers, mode).unwrap_err();
            assert_eq!(message(err), "unknown field bogus");
        }
    }

    #[test]
    fn duplicate_answer_keys_are_rejected() {
        let form = CompiledForm::compile(&[field("performance", FieldType::Rating, true, 0)]).unwrap();
        let answers = vec![answer("performance", json!(4)), answer("performance", json!(5))];
        let err = form.validate(&answers, ValidationMode::Draft).unwrap_err();
        assert!(message(err).contains("duplicate answer"));
    }

    #[test]
    fn rating_defaults_to_one_through_five() {
        let form = CompiledForm::compile(&[field("performance", FieldType::Rating, true, 0)]).unwrap();
        assert!(form
            .validate(&[answer("performance", json!(5))], ValidationMode::Submission)
            .is_ok());
        let err = form
            .validate(&[answer("performance", json!(6))], ValidationMode::Submission)
            .unwrap_err();
        assert!(message(err).contains("performance"));
        assert!(form
            .validate(&[answer("performance", json!(4.5))], ValidationMode::Submission)
            .is_err());
    }

    #[test]
    fn text_rules_name_the_violated_rule() {
        let mut f = field("headline", FieldType::Text, false, 0);
        f.validation_rules = Some(json!({"min_length": 3, "max_length": 10, "pattern": "^[A-Z]"}));
        let form = CompiledForm::compile(&[f]).unwrap();

        let err = form
            .validate(&[answer("headline", json!("Hi"))], ValidationMode::Draft)
            .unwrap_err();
        assert_eq!(message(err), "invalid value for field headline: min_length 3");

        let err = form
            .validate(&[answer("headline", json!("way too long text"))], ValidationMode::Draft)
            .unwrap_err();
        assert_eq!(message(err), "invalid value for field headline: max_length 10");

        let err = form
            .validate(&[answer("headline", json!("lowercase"))], ValidationMode::Draft)
            .unwrap_err();
        assert!(message(err).contains("pattern"));

        assert!(form
            .validate(&[answer("headline", json!("Leader"))], ValidationMode::Draft)
            .is_ok());
    }

    #[test]
    fn number_bounds_and_integer_flag() {
        let mut f = field("projects", FieldType::Number, true, 0);
        f.validation_rules = Some(json!({"min": 0, "max": 20, "integer": true}));
        let form = CompiledForm::compile(&[f]).unwrap();
        assert!(form
            .validate(&[answer("projects", json!(7))], ValidationMode::Submission)
            .is_ok());
        assert!(form
            .validate(&[answer("projects", json!(2.5))], ValidationMode::Submission)
            .is_err());
        assert!(form
            .validate(&[answer("projects", json!(21))], ValidationMode::Submission)
            .is_err());
        assert!(form
            .validate(&[answer("projects", json!("7"))], ValidationMode::Submission)
            .is_err());
    }

    #[test]
    fn choices_accept_plain_and_labelled_options() {
        let mut select = field("category", FieldType::Select, true, 0);
        select.options = Some(json!([{"label": "Innovation", "value": "innovation"}, {"label": "Teamwork", "value": "teamwork"}]));
        let mut multi = field("values", FieldType::MultiSelect, false, 1);
        multi.options = Some(json!({"choices": ["ownership", "candor", "craft"]}));
        multi.validation_rules = Some(json!({"max_items": 2}));
        let form = CompiledForm::compile(&[select, multi]).unwrap();

        assert!(form
            .validate(
                &[answer("category", json!("teamwork")), answer("values", json!(["candor", "craft"]))],
                ValidationMode::Submission
            )
            .is_ok());
        assert!(form
            .validate(&[answer("category", json!("speed"))], ValidationMode::Submission)
            .is_err());
        assert!(form
            .validate(
                &[answer("category", json!("teamwork")), answer("values", json!(["candor", "candor"]))],
                ValidationMode::Submission
            )
            .is_err());
        assert!(form
            .validate(
                &[
                    answer("category", json!("teamwork")),
                    answer("values", json!(["candor", "craft", "ownership"]))
                ],
                ValidationMode::Submission
            )
            .is_err());
    }

    #[test]
    fn select_without_options_does_not_compile() {
        let err = FieldRule::compile("category", FieldType::Select, None, None).unwrap_err();
        assert!(message(err).contains("requires options"));
    }

    #[test]
    fn bad_regex_does_not_compile() {
        let err = FieldRule::compile("code", FieldType::Text, None, Some(&json!({"pattern": "(["})))
            .unwrap_err();
        assert_eq!(message(err), "field code: invalid validation rule pattern");
    }

    #[test]
    fn checkbox_is_boolean_without_options() {
        let form = CompiledForm::compile(&[field("consent", FieldType::Checkbox, true, 0)]).unwrap();
        assert!(form
            .validate(&[answer("consent", json!(true))], ValidationMode::Submission)
            .is_ok());
        assert!(form
            .validate(&[answer("consent", json!("yes"))], ValidationMode::Submission)
            .is_err());
    }

    #[test]
    fn date_bounds() {
        let mut f = field("milestone", FieldType::Date, false, 0);
        f.validation_rules = Some(json!({"min": "2024-01-01", "max": "2024-03-31"}));
        let form = CompiledForm::compile(&[f]).unwrap();
        assert!(form
            .validate(&[answer("milestone", json!("2024-02-14"))], ValidationMode::Draft)
            .is_ok());
        assert!(form
            .validate(&[answer("milestone", json!("2024-04-01"))], ValidationMode::Draft)
            .is_err());
        assert!(form
            .validate(&[answer("milestone", json!("14/02/2024"))], ValidationMode::Draft)
            .is_err());
    }

    #[test]
    fn fields_are_ordered_by_order_index() {
        let form = CompiledForm::compile(&[
            field("b", FieldType::Text, true, 2),
            field("a", FieldType::Text, true, 1),
            field("c", FieldType::Boolean, true, 3),
        ])
        .unwrap();
        let err = form.validate(&[], ValidationMode::Submission).unwrap_err();
        assert_eq!(err.to_string(), "missing required field a");
    }

    #[test]
    fn first_violation_in_field_order_is_reported() {
        let form = CompiledForm::compile(&[
            field("second", FieldType::Rating, true, 2),
            field("first", FieldType::Boolean, true, 1),
        ])
        .unwrap();
        let err = form.validate(&[], ValidationMode::Submission).unwrap_err();
        assert_eq!(message(err), "missing required field first");
    }
}
