//! Validation Utilities
//!
//! A small declarative schema language for the untyped parts of a request.
//! A [`RequestSchema`] describes the body, query string and path parameters
//! together; all three are checked in a single pass so that every failing
//! field is reported at once.

use std::fmt;
use std::num::IntErrorKind;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::utils::error::ApiError;

/// Prefix of the message attached to every validation failure
pub const VALIDATION_ERROR_PREFIX: &str = "Validation error: ";

/// Validates email address format using a comprehensive regex pattern
pub fn validate_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(email))
}

/// Normalizes email address to lowercase and removes whitespace
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates a MongoDB ObjectId in its 24 character hex form
pub fn validate_object_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validation error messages for user-friendly responses
pub mod messages {
    pub const INVALID_EMAIL: &str = "Invalid email address";
    pub const INVALID_OBJECT_ID: &str = "Invalid ObjectId";
    pub const EXPECTED_INTEGER: &str = "Invalid input: expected int, received number";
}

/// A single field-level failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dot-separated, surface-prefixed field path such as `body.email`
    pub path: String,
    pub message: String,
}

/// Every issue found while checking one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationFailure {
    pub fn paths(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.path.as_str()).collect()
    }

    pub fn message(&self) -> String {
        format!("{}{}", VALIDATION_ERROR_PREFIX, self.paths().join(", "))
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        let details = Value::Array(
            failure
                .issues
                .iter()
                .map(|issue| json!({ "path": issue.path, "message": issue.message }))
                .collect(),
        );
        ApiError::bad_request(failure.message()).with_details(details)
    }
}

/// Format checks available on string schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    ObjectId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRules {
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub format: Option<StringFormat>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegerRules {
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Accept numeric strings, as found in query strings and path parameters
    pub coerce: bool,
}

/// Declarative description of the expected shape of a JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Anything passes, including an absent value
    Any,
    /// The value may be absent; when present it must satisfy the inner schema
    Optional(Box<Schema>),
    /// An object with the given fields, checked in declaration order.
    /// Undeclared keys are ignored and dropped from the output.
    Object(Vec<(String, Schema)>),
    String(StringRules),
    Integer(IntegerRules),
    Boolean,
    /// A string restricted to one of the given options
    OneOf(Vec<String>),
}

impl Schema {
    pub fn any() -> Self {
        Schema::Any
    }

    pub fn string() -> Self {
        Schema::String(StringRules::default())
    }

    pub fn email() -> Self {
        Schema::string().format(StringFormat::Email)
    }

    pub fn object_id() -> Self {
        Schema::string().format(StringFormat::ObjectId)
    }

    pub fn integer() -> Self {
        Schema::Integer(IntegerRules::default())
    }

    pub fn boolean() -> Self {
        Schema::Boolean
    }

    pub fn one_of<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Schema::OneOf(options.into_iter().map(Into::into).collect())
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Object(
            fields
                .into_iter()
                .map(|(name, schema)| (name.into(), schema))
                .collect(),
        )
    }

    /// An optional object with no declared fields
    pub fn empty_object() -> Self {
        Schema::object(Vec::<(String, Schema)>::new()).optional()
    }

    pub fn optional(self) -> Self {
        match self {
            Schema::Optional(_) | Schema::Any => self,
            other => Schema::Optional(Box::new(other)),
        }
    }

    /// Minimum length, in characters, of a string schema
    pub fn min_len(self, min: usize) -> Self {
        self.map_string(|rules| rules.min_len = Some(min))
    }

    /// Maximum length, in characters, of a string schema
    pub fn max_len(self, max: usize) -> Self {
        self.map_string(|rules| rules.max_len = Some(max))
    }

    pub fn format(self, format: StringFormat) -> Self {
        self.map_string(|rules| rules.format = Some(format))
    }

    /// Lower bound of an integer schema
    pub fn min(self, min: i64) -> Self {
        self.map_integer(|rules| rules.min = Some(min))
    }

    /// Upper bound of an integer schema
    pub fn max(self, max: i64) -> Self {
        self.map_integer(|rules| rules.max = Some(max))
    }

    pub fn coerce(self) -> Self {
        self.map_integer(|rules| rules.coerce = true)
    }

    fn map_string(self, apply: impl FnOnce(&mut StringRules)) -> Self {
        match self {
            Schema::String(mut rules) => {
                apply(&mut rules);
                Schema::String(rules)
            }
            Schema::Optional(inner) => Schema::Optional(Box::new(inner.map_string(apply))),
            other => {
                debug_assert!(false, "string refinement applied to {:?}", other);
                other
            }
        }
    }

    fn map_integer(self, apply: impl FnOnce(&mut IntegerRules)) -> Self {
        match self {
            Schema::Integer(mut rules) => {
                apply(&mut rules);
                Schema::Integer(rules)
            }
            Schema::Optional(inner) => Schema::Optional(Box::new(inner.map_integer(apply))),
            other => {
                debug_assert!(false, "integer refinement applied to {:?}", other);
                other
            }
        }
    }

    /// Checks `value` against this schema.
    ///
    /// Returns the normalized value (coerced numbers, undeclared object keys
    /// removed) or every issue found. `None` stands for an absent value.
    pub fn validate(&self, value: Option<&Value>) -> Result<Option<Value>, ValidationFailure> {
        let mut issues = Vec::new();
        let mut path = Vec::new();
        let output = self.visit(value, &mut path, &mut issues);
        if issues.is_empty() {
            Ok(output)
        } else {
            Err(ValidationFailure { issues })
        }
    }

    fn visit(
        &self,
        value: Option<&Value>,
        path: &mut Vec<String>,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<Value> {
        match (self, value) {
            (Schema::Any, value) => value.cloned(),
            (Schema::Optional(_), None) => None,
            (Schema::Optional(inner), value) => inner.visit(value, path, issues),
            (Schema::Object(fields), Some(Value::Object(map))) => {
                let mut output = Map::new();
                for (name, schema) in fields {
                    path.push(name.clone());
                    if let Some(field) = schema.visit(map.get(name), path, issues) {
                        output.insert(name.clone(), field);
                    }
                    path.pop();
                }
                Some(Value::Object(output))
            }
            (Schema::Object(_), value) => reject(path, issues, expected("object", value)),
            (Schema::String(rules), Some(Value::String(text))) => match rules.check(text) {
                Ok(()) => Some(Value::String(text.clone())),
                Err(message) => reject(path, issues, message),
            },
            (Schema::String(_), value) => reject(path, issues, expected("string", value)),
            (Schema::Integer(rules), Some(value)) => match rules.check(value) {
                Ok(number) => Some(Value::from(number)),
                Err(message) => reject(path, issues, message),
            },
            (Schema::Integer(_), None) => reject(path, issues, expected("number", None)),
            (Schema::Boolean, Some(Value::Bool(flag))) => Some(Value::Bool(*flag)),
            (Schema::Boolean, value) => reject(path, issues, expected("boolean", value)),
            (Schema::OneOf(options), Some(Value::String(text))) if options.contains(text) => {
                Some(Value::String(text.clone()))
            }
            (Schema::OneOf(options), _) => {
                let listed: Vec<String> = options.iter().map(|o| format!("\"{}\"", o)).collect();
                reject(
                    path,
                    issues,
                    format!("Invalid option: expected one of {}", listed.join("|")),
                )
            }
        }
    }
}

impl StringRules {
    fn check(&self, text: &str) -> Result<(), String> {
        let length = text.chars().count();
        if let Some(min) = self.min_len {
            if length < min {
                return Err(format!(
                    "Too small: expected string to have >={} characters",
                    min
                ));
            }
        }
        if let Some(max) = self.max_len {
            if length > max {
                return Err(format!(
                    "Too big: expected string to have <={} characters",
                    max
                ));
            }
        }
        match self.format {
            Some(StringFormat::Email) if !validate_email(text) => {
                Err(messages::INVALID_EMAIL.to_string())
            }
            Some(StringFormat::ObjectId) if !validate_object_id(text) => {
                Err(messages::INVALID_OBJECT_ID.to_string())
            }
            _ => Ok(()),
        }
    }
}

/// 2^63, the first whole float past `i64::MAX`
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

impl IntegerRules {
    fn check(&self, value: &Value) -> Result<i64, String> {
        let number = match value {
            Value::Number(number) => match (number.as_i64(), number.as_f64()) {
                (Some(number), _) => number,
                (None, Some(float)) => self.whole(float)?,
                (None, None) => return Err(messages::EXPECTED_INTEGER.to_string()),
            },
            Value::String(text) if self.coerce => self.parse(text.trim())?,
            other => return Err(expected("number", Some(other))),
        };
        if let Some(min) = self.min {
            if number < min {
                return Err(self.too_small());
            }
        }
        if let Some(max) = self.max {
            if number > max {
                return Err(self.too_big());
            }
        }
        Ok(number)
    }

    /// Parses integer text exactly, falling back to floats only to tell
    /// fractions from garbage
    fn parse(&self, text: &str) -> Result<i64, String> {
        match text.parse::<i64>() {
            Ok(number) => return Ok(number),
            Err(error) => match error.kind() {
                IntErrorKind::PosOverflow => return Err(self.too_big()),
                IntErrorKind::NegOverflow => return Err(self.too_small()),
                _ => {}
            },
        }
        match text.parse::<f64>() {
            Ok(float) if float.is_finite() => self.whole(float),
            _ => Err("Invalid input: expected number, received NaN".to_string()),
        }
    }

    fn whole(&self, float: f64) -> Result<i64, String> {
        if float.fract() != 0.0 {
            Err(messages::EXPECTED_INTEGER.to_string())
        } else if float >= I64_LIMIT {
            Err(self.too_big())
        } else if float < -I64_LIMIT {
            Err(self.too_small())
        } else {
            Ok(float as i64)
        }
    }

    fn too_small(&self) -> String {
        format!(
            "Too small: expected number to be >={}",
            self.min.unwrap_or(i64::MIN)
        )
    }

    fn too_big(&self) -> String {
        format!(
            "Too big: expected number to be <={}",
            self.max.unwrap_or(i64::MAX)
        )
    }
}

fn kind_of(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

fn expected(kind: &str, value: Option<&Value>) -> String {
    format!("Invalid input: expected {}, received {}", kind, kind_of(value))
}

fn reject(path: &[String], issues: &mut Vec<ValidationIssue>, message: String) -> Option<Value> {
    issues.push(ValidationIssue {
        path: path.join("."),
        message,
    });
    None
}

/// Raw values of the three input surfaces of one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInput {
    /// Parsed JSON body, `None` when the request carried no JSON
    pub body: Option<Value>,
    /// Query string as an object of strings
    pub query: Map<String, Value>,
    /// Path parameters as an object of strings
    pub params: Map<String, Value>,
}

impl RequestInput {
    fn envelope(&self) -> Value {
        let mut envelope = Map::new();
        if let Some(body) = &self.body {
            envelope.insert("body".to_string(), body.clone());
        }
        envelope.insert("query".to_string(), Value::Object(self.query.clone()));
        envelope.insert("params".to_string(), Value::Object(self.params.clone()));
        Value::Object(envelope)
    }
}

/// Normalized surfaces of a request that passed validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedInput {
    pub body: Value,
    pub query: Value,
    pub params: Value,
}

/// Schema for the body, query and params of one route
///
/// Surfaces that are not declared accept anything, including absence.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSchema {
    body: Schema,
    query: Schema,
    params: Schema,
}

impl Default for RequestSchema {
    fn default() -> Self {
        Self {
            body: Schema::Any,
            query: Schema::Any,
            params: Schema::Any,
        }
    }
}

impl RequestSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, schema: Schema) -> Self {
        self.body = schema;
        self
    }

    pub fn query(mut self, schema: Schema) -> Self {
        self.query = schema;
        self
    }

    pub fn params(mut self, schema: Schema) -> Self {
        self.params = schema;
        self
    }

    fn composite(&self) -> Schema {
        Schema::object([
            ("body", self.body.clone()),
            ("query", self.query.clone()),
            ("params", self.params.clone()),
        ])
    }

    /// Validates all three surfaces together
    pub fn validate(&self, input: &RequestInput) -> Result<ValidatedInput, ValidationFailure> {
        let envelope = input.envelope();
        let output = self.composite().validate(Some(&envelope))?;

        let mut surfaces = match output {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Ok(ValidatedInput {
            body: surfaces.remove("body").unwrap_or(Value::Null),
            query: surfaces.remove("query").unwrap_or(Value::Null),
            params: surfaces.remove("params").unwrap_or(Value::Null),
        })
    }
}
