//! Turns an operation descriptor plus caller arguments into an `HttpRequest`.
//!
//! # Design
//! Validation and encoding happen in one pass over the descriptor: format
//! first, then the positional path argument, then each declared parameter in
//! declaration order. The first failure aborts before anything is emitted.
//! Arguments are `Option`-free here: a parameter that is absent from
//! `RequestArgs` is omitted, a parameter that is present is always sent
//! (except an unset flag).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::catalog::{OperationDescriptor, ParamKind, ParamSpec, PathArg};
use crate::error::ValidationError;
use crate::http::{HttpMethod, HttpRequest, FORM_CONTENT_TYPE};
use crate::types::Format;
use crate::validate;

/// Value supplied for a declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(u64),
    Flag(bool),
    Text(String),
}

impl ParamValue {
    fn describe(&self) -> String {
        match self {
            ParamValue::Integer(n) => n.to_string(),
            ParamValue::Flag(flag) => flag.to_string(),
            ParamValue::Text(text) => text.clone(),
        }
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Positional identifier supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathValue {
    Id(u64),
    Name(String),
}

/// Caller arguments for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestArgs {
    /// Requested format; `None` means the operation's default.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub path: Option<PathValue>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl Default for RequestArgs {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestArgs {
    pub fn new() -> Self {
        Self {
            format: None,
            path: None,
            params: BTreeMap::new(),
        }
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn id(mut self, id: u64) -> Self {
        self.path = Some(PathValue::Id(id));
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.path = Some(PathValue::Name(name.to_string()));
        self
    }

    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Adds the parameter only when `value` is `Some`.
    pub fn optional<V: Into<ParamValue>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }
}

/// Resolves the requested format against the descriptor's allowed set.
pub fn resolve_format(
    descriptor: &OperationDescriptor,
    requested: Option<&str>,
) -> Result<Format, ValidationError> {
    let Some(requested) = requested else {
        return Ok(descriptor.default_format());
    };
    let allowed: Vec<&str> = descriptor.formats.iter().map(|f| f.as_str()).collect();
    let name = validate::one_of("format", requested, &allowed)?;
    Format::from_name(&name).ok_or_else(|| {
        ValidationError::new("format", name, format!("valid options include: {}", allowed.join(", ")))
    })
}

/// Builds the request for `descriptor` against `base_url`.
pub fn build_request(
    base_url: &str,
    descriptor: &OperationDescriptor,
    args: &RequestArgs,
) -> Result<HttpRequest, ValidationError> {
    let format = resolve_format(descriptor, args.format.as_deref())?;

    let mut path = format!("{}{}", base_url.trim_end_matches('/'), descriptor.path);
    if let Some(segment) = path_segment(descriptor, args.path.as_ref())? {
        path.push('/');
        path.push_str(&segment);
    }
    if let Some(extension) = format.extension() {
        path.push('.');
        path.push_str(extension);
    }

    if let Some((name, value)) = args
        .params
        .iter()
        .find(|(name, _)| descriptor.param(name).is_none())
    {
        return Err(ValidationError::new(
            name.as_str(),
            value.describe(),
            format!("not accepted by {}", descriptor.operation),
        ));
    }

    let mut encoded = form_urlencoded::Serializer::new(String::new());
    for spec in descriptor.params {
        match args.params.get(spec.name) {
            Some(value) => {
                if let Some(text) = encode_param(spec, value)? {
                    encoded.append_pair(spec.name, &text);
                }
            }
            None if spec.required => {
                return Err(ValidationError::new(spec.name, "", "is required"));
            }
            None => {}
        }
    }
    let encoded = encoded.finish();

    let (url, headers, body) = match descriptor.method {
        HttpMethod::Get if encoded.is_empty() => (path, Vec::new(), None),
        HttpMethod::Get => (format!("{path}?{encoded}"), Vec::new(), None),
        HttpMethod::Post => (
            path,
            vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
            Some(encoded),
        ),
    };

    Ok(HttpRequest {
        method: descriptor.method,
        url,
        headers,
        body,
        use_auth: descriptor.requires_auth,
        format,
    })
}

fn path_segment(
    descriptor: &OperationDescriptor,
    value: Option<&PathValue>,
) -> Result<Option<String>, ValidationError> {
    match (descriptor.path_arg, value) {
        (PathArg::None, None) => Ok(None),
        (PathArg::None, Some(value)) => Err(ValidationError::new(
            "path",
            describe_path(value),
            format!("{} takes no positional identifier", descriptor.operation),
        )),
        (PathArg::Id, Some(PathValue::Id(id))) => {
            Ok(Some(validate::non_negative_integer("id", *id)?.to_string()))
        }
        (PathArg::Id, Some(PathValue::Name(raw))) => Err(ValidationError::new(
            "id",
            raw.as_str(),
            "must be a non-negative integer",
        )),
        (PathArg::Id, None) => Err(ValidationError::new("id", "", "is required")),
        (PathArg::Name, Some(value)) => {
            let name = describe_path(value);
            if name.is_empty() {
                return Err(ValidationError::new("user", "", "must not be empty"));
            }
            Ok(Some(urlencoding::encode(&name).into_owned()))
        }
        (PathArg::Name, None) => Err(ValidationError::new("user", "", "is required")),
    }
}

fn describe_path(value: &PathValue) -> String {
    match value {
        PathValue::Id(id) => id.to_string(),
        PathValue::Name(name) => name.clone(),
    }
}

/// Validates one parameter; `None` means the value encodes to nothing.
fn encode_param(spec: &ParamSpec, value: &ParamValue) -> Result<Option<String>, ValidationError> {
    let name = spec.name;
    match (spec.kind, value) {
        (ParamKind::Integer, ParamValue::Integer(n)) => {
            Ok(Some(validate::non_negative_integer(name, *n)?.to_string()))
        }
        (ParamKind::Count { max }, ParamValue::Integer(n)) => {
            let n = validate::non_negative_integer(name, *n)?;
            Ok(Some(validate::at_most(name, n, max)?.to_string()))
        }
        (ParamKind::Date, ParamValue::Text(raw)) => {
            let parsed = validate::date(name, raw)?;
            Ok(Some(validate::service_date(&parsed)))
        }
        (ParamKind::Flag, ParamValue::Flag(set)) => Ok(set.then(|| "true".to_string())),
        (ParamKind::Text { max_chars }, ParamValue::Text(text)) => {
            if let Some(max) = max_chars {
                validate::max_chars(name, text, max)?;
            }
            Ok(Some(text.clone()))
        }
        (ParamKind::Choice(allowed), ParamValue::Text(raw)) => {
            Ok(Some(validate::one_of(name, raw, allowed)?))
        }
        (kind, other) => Err(ValidationError::new(
            name,
            other.describe(),
            expected_type(kind),
        )),
    }
}

fn expected_type(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Integer | ParamKind::Count { .. } => "must be a non-negative integer",
        ParamKind::Date => "must be a valid date string",
        ParamKind::Flag => "must be a boolean flag",
        ParamKind::Text { .. } | ParamKind::Choice(_) => "must be a string",
    }
}
