//! Turns a model's free-text answer into a [`ProductSheet`].
//!
//! Parsing runs in four steps: pull the JSON body out of the text, coerce
//! scalar/list mismatches the model commonly makes, validate against the
//! declared schema, then check what the schema cannot express (blank text).
//! Anything that fails is reported as a [`SchemaViolation`]; a partially
//! filled sheet is never returned.

use jsonschema::Validator;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::product::{ProductSheet, SheetContent};
use crate::schema::{self, LIST_FIELDS, MAX_FEATURES, MAX_SEO_TAGS, MIN_SEO_TAGS, STRING_FIELDS};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("response contains no JSON object")]
    NoJson,
    #[error("response is not valid JSON: {0}")]
    Malformed(String),
    #[error("response does not match the product sheet schema: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("product sheet schema failed to compile: {0}")]
    Contract(String),
}

pub struct SheetParser {
    validator: Validator,
}

impl SheetParser {
    pub fn new() -> Result<Self, SchemaViolation> {
        let validator = jsonschema::validator_for(&schema::sheet_schema())
            .map_err(|e| SchemaViolation::Contract(e.to_string()))?;
        Ok(Self { validator })
    }

    pub fn parse(&self, raw: &str) -> Result<ProductSheet, SchemaViolation> {
        let mut value = decode_json(raw)?;

        coerce_sheet(&mut value);

        let errors: Vec<String> = self.validator.iter_errors(&value).map(|e| e.to_string()).collect();
        if !errors.is_empty() {
            return Err(SchemaViolation::Invalid(errors));
        }

        let sheet: ProductSheet =
            serde_json::from_value(value).map_err(|e| SchemaViolation::Invalid(vec![e.to_string()]))?;

        let mut problems = content_problems(&sheet.content, "");
        if let Some(translations) = &sheet.translations {
            for (language, content) in translations {
                problems.extend(content_problems(content, &format!("translations.{language}.")));
            }
        }
        if !problems.is_empty() {
            return Err(SchemaViolation::Invalid(problems));
        }

        Ok(sheet)
    }
}

/// Candidate JSON bodies in a model answer, most specific first: the body of
/// a fenced code block if there is one, then the span from the first `{` to
/// the last `}`.
fn json_candidates(raw: &str) -> Vec<&str> {
    let trimmed = raw.trim();
    let mut candidates = Vec::with_capacity(2);

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let tag_end = after.find('\n').unwrap_or(0);
        let body = if after[..tag_end].trim().chars().all(|c| c.is_ascii_alphanumeric()) {
            &after[tag_end..]
        } else {
            after
        };
        if let Some(end) = body.find("```") {
            let fenced = body[..end].trim();
            if fenced.starts_with('{') {
                candidates.push(fenced);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            let span = &trimmed[start..=end];
            if !candidates.contains(&span) {
                candidates.push(span);
            }
        }
    }

    candidates
}

/// Decodes the first candidate that is valid JSON. A fence marker inside a
/// string value cuts the fenced body short, so the brace span is tried next.
fn decode_json(raw: &str) -> Result<Value, SchemaViolation> {
    let mut last_error = None;
    for candidate in json_candidates(raw) {
        match serde_json::from_str(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.map_or(SchemaViolation::NoJson, |e| SchemaViolation::Malformed(e.to_string())))
}

fn coerce_sheet(value: &mut Value) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    coerce_content(obj);

    if obj.get("translations").is_some_and(Value::is_null) {
        obj.remove("translations");
    }
    if let Some(Value::Object(translations)) = obj.get_mut("translations") {
        for entry in translations.values_mut() {
            if let Value::Object(content) = entry {
                coerce_content(content);
            }
        }
    }
}

/// Numbers and booleans become strings; a lone string where a list is
/// expected becomes a one-item list.
fn coerce_content(obj: &mut Map<String, Value>) {
    for field in STRING_FIELDS {
        if let Some(v) = obj.get_mut(field) {
            scalar_to_string(v);
        }
    }

    for field in LIST_FIELDS {
        let Some(v) = obj.get_mut(field) else {
            continue;
        };
        if v.is_string() {
            let item = v.take();
            *v = Value::Array(vec![item]);
        } else if let Value::Array(items) = v {
            items.iter_mut().for_each(scalar_to_string);
        }
    }
}

fn scalar_to_string(v: &mut Value) {
    match v {
        Value::Number(n) => *v = Value::String(n.to_string()),
        Value::Bool(b) => *v = Value::String(b.to_string()),
        _ => {}
    }
}

fn content_problems(content: &SheetContent, prefix: &str) -> Vec<String> {
    let mut problems = Vec::new();

    let texts = [
        ("title", &content.title),
        ("description", &content.description),
        ("priceSuggestion", &content.price_suggestion),
        ("category", &content.category),
        ("cta", &content.cta),
    ];
    for (name, text) in texts {
        if text.trim().is_empty() {
            problems.push(format!("{prefix}{name} is blank"));
        }
    }

    let lists = [
        ("features", &content.features),
        ("benefits", &content.benefits),
        ("seoTags", &content.seo_tags),
    ];
    for (name, items) in lists {
        if items.iter().any(|item| item.trim().is_empty()) {
            problems.push(format!("{prefix}{name} contains a blank entry"));
        }
    }

    if content.features.len() > MAX_FEATURES {
        problems.push(format!("{prefix}features has more than {MAX_FEATURES} items"));
    }
    if content.benefits.is_empty() {
        problems.push(format!("{prefix}benefits is empty"));
    }
    if !(MIN_SEO_TAGS..=MAX_SEO_TAGS).contains(&content.seo_tags.len()) {
        problems.push(format!(
            "{prefix}seoTags must have between {MIN_SEO_TAGS} and {MAX_SEO_TAGS} items"
        ));
    }

    problems
}
