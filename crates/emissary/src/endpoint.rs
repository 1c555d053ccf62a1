//! Endpoint descriptors.
//!
//! An [`Endpoint`] is built once per route from its path template, method,
//! declared fields and response type. It validates call arguments into an
//! [`Args`] envelope and resolves responses into [`ResponseValue`]s.

use crate::channels::CaseConverters;
use crate::model::ModelType;
use crate::parser::{FieldRef, ParamsParser};
use crate::receiver::{MethodType, Receiver};
use crate::response::{DecoratedResponse, ResponseValue};
use crate::Kwargs;
use emissary_core::{
    value_type_name, Args, EmissaryError, FieldErrors, HttpMethod, Param, ParamKind,
    PathTemplate, Result, Schema,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};

const RESULT_LOC: &str = "result";

/// Declaration of one route field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDecl {
    /// A field with a parameter marker.
    Marked(Param),
    /// A field without a marker. It goes to the query string or the JSON
    /// body depending on the method.
    Plain {
        /// Value schema.
        schema: Schema,
        /// Value used when the argument is omitted.
        default: Option<Value>,
    },
}

impl FieldDecl {
    /// A required unmarked field.
    #[must_use]
    pub const fn plain(schema: Schema) -> Self {
        Self::Plain {
            schema,
            default: None,
        }
    }

    /// An unmarked field with a default.
    #[must_use]
    pub fn plain_with_default(schema: Schema, default: impl Into<Value>) -> Self {
        Self::Plain {
            schema,
            default: Some(default.into()),
        }
    }

    /// Value schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        match self {
            Self::Marked(param) => param.schema(),
            Self::Plain { schema, .. } => schema,
        }
    }

    /// Explicit alias.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Marked(param) => param.alias_name(),
            Self::Plain { .. } => None,
        }
    }

    /// Default value.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        match self {
            Self::Marked(param) => param.default_value(),
            Self::Plain { default, .. } => default.as_ref(),
        }
    }

    /// The marker, if any.
    #[must_use]
    pub const fn param(&self) -> Option<&Param> {
        match self {
            Self::Marked(param) => Some(param),
            Self::Plain { .. } => None,
        }
    }

    fn matches(&self, name: &str, key: &str) -> bool {
        name == key || self.alias() == Some(key)
    }

    fn as_field_ref(&self) -> FieldRef<'_> {
        match self {
            Self::Marked(param) => FieldRef::Marked(param),
            Self::Plain { .. } => FieldRef::Plain,
        }
    }
}

impl From<Param> for FieldDecl {
    fn from(param: Param) -> Self {
        Self::Marked(param)
    }
}

impl From<Schema> for FieldDecl {
    fn from(schema: Schema) -> Self {
        Self::plain(schema)
    }
}

/// Declared response type of a route.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseType {
    /// One record built from the JSON body.
    Record(Schema),
    /// Body text.
    Text,
    /// A JSON mapping; response headers for HEAD and OPTIONS.
    Json,
    /// Raw body.
    Bytes,
    /// A JSON array of records.
    Records(Schema),
    /// A JSON array of mappings.
    JsonList,
    /// The body is discarded.
    None,
    /// The owning model: the receiver itself for instance routes, a record
    /// built from the body for class routes.
    SelfRecord,
    /// A list of the owning model. Class routes only.
    SelfList,
    /// Any other type. Needs a response finalizer.
    Custom(String),
}

impl ResponseType {
    /// Short description used in errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Record(schema) => schema.type_name(),
            Self::Text => "str".to_string(),
            Self::Json => "dict".to_string(),
            Self::Bytes => "bytes".to_string(),
            Self::Records(schema) => format!("list[{}]", schema.type_name()),
            Self::JsonList => "list[dict]".to_string(),
            Self::None => "None".to_string(),
            Self::SelfRecord => "Self".to_string(),
            Self::SelfList => "list[Self]".to_string(),
            Self::Custom(name) => name.clone(),
        }
    }
}

/// Context an endpoint is built in.
#[derive(Debug, Clone, Default)]
pub struct EndpointContext {
    /// How the route binds to its model.
    pub method_type: MethodType,
    /// The owning model, if any.
    pub owner: Option<ModelType>,
    /// Whether a response finalizer is configured.
    pub has_finalizer: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Resolution {
    Record(Schema),
    Text,
    Json,
    Bytes,
    Records(Schema),
    JsonList,
    None,
    Receiver(Option<Schema>),
    Custom(String),
}

/// A validated route description.
///
/// # Example
///
/// ```
/// use emissary::{CaseConverters, Endpoint, EndpointContext, FieldDecl, Kwargs, ResponseType};
/// use emissary_core::{HttpMethod, Param, Schema};
/// use indexmap::IndexMap;
///
/// let mut fields = IndexMap::new();
/// fields.insert("id".to_string(), FieldDecl::from(Param::path(Schema::integer())));
/// fields.insert("verbose".to_string(), FieldDecl::plain_with_default(Schema::boolean(), false));
///
/// let endpoint = Endpoint::new(
///     "/users/{id}",
///     HttpMethod::Get,
///     fields,
///     ResponseType::Json,
///     &EndpointContext::default(),
/// )
/// .unwrap();
///
/// let args = endpoint
///     .get_args(&Kwargs::new().arg("id", "42"), &CaseConverters::default())
///     .unwrap();
/// assert_eq!(args.url, "/users/42");
/// assert_eq!(args.params["verbose"], false);
/// ```
#[derive(Debug, Clone)]
pub struct Endpoint {
    path: PathTemplate,
    method: HttpMethod,
    fields: IndexMap<String, FieldDecl>,
    response_type: ResponseType,
    resolution: Resolution,
    declared: bool,
}

impl Endpoint {
    /// Builds an endpoint.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if a path marker declares a default, names no
    ///   placeholder, a placeholder matches no field, or a field schema has
    ///   a pattern that does not compile
    /// - `InvalidReturnAnnotation` if `Self` is used outside a class or
    ///   instance route, or `list[Self]` outside a class route
    /// - `MissingFinalizer` for a custom response type without a finalizer
    pub fn new(
        path: &str,
        method: HttpMethod,
        fields: IndexMap<String, FieldDecl>,
        response_type: ResponseType,
        context: &EndpointContext,
    ) -> Result<Self> {
        let template = PathTemplate::parse(path);
        check_fields(&template, &fields)?;
        if let ResponseType::Record(schema) | ResponseType::Records(schema) = &response_type {
            schema
                .check_patterns(RESULT_LOC)
                .map_err(|errors| EmissaryError::invalid_return(errors.to_string()))?;
        }
        let resolution = resolve_type(&response_type, context)?;
        Ok(Self {
            path: template,
            method,
            fields,
            response_type,
            resolution,
            declared: true,
        })
    }

    /// Marks the response type as defaulted rather than declared.
    pub(crate) fn with_undeclared_response(mut self) -> Self {
        self.declared = false;
        self
    }

    /// Whether the response type was declared by the route.
    ///
    /// A route without one resolves plain responses as [`ResponseType::Json`]
    /// and takes a response finalizer's value as is.
    #[must_use]
    pub const fn declares_response(&self) -> bool {
        self.declared
    }

    /// Path template.
    #[must_use]
    pub const fn path(&self) -> &PathTemplate {
        &self.path
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Declared fields in order.
    #[must_use]
    pub const fn fields(&self) -> &IndexMap<String, FieldDecl> {
        &self.fields
    }

    /// Declared response type.
    #[must_use]
    pub const fn response_type(&self) -> &ResponseType {
        &self.response_type
    }

    /// Validates call arguments and builds the request envelope.
    ///
    /// # Errors
    ///
    /// - `Validation` listing every unknown, missing or invalid argument
    /// - `UnresolvedPlaceholder` if a path value is null
    /// - `IncompatibleMediaTypes` / `EmbedConflict` from the parser
    pub fn get_args(&self, kwargs: &Kwargs, cases: &CaseConverters) -> Result<Args> {
        let values = self.validate_args(kwargs)?;

        let mut path_values = Map::new();
        let mut path_fields = Vec::new();
        for placeholder in self.path.placeholders() {
            let field = self
                .fields
                .iter()
                .find(|(name, decl)| decl.matches(name, placeholder));
            if let Some((name, _)) = field {
                path_fields.push(name.as_str());
                if let Some(value) = values.get(name).filter(|v| !v.is_null()) {
                    path_values.insert(placeholder.to_string(), value.clone());
                }
            }
        }
        let unresolved = self
            .path
            .placeholders()
            .into_iter()
            .any(|placeholder| !path_values.contains_key(placeholder));
        let url = self.path.format(&path_values);
        if unresolved {
            return Err(EmissaryError::unresolved_placeholder(url));
        }

        let fields: Vec<(&str, FieldRef<'_>)> = self
            .fields
            .iter()
            .filter(|(name, _)| !path_fields.contains(&name.as_str()))
            .map(|(name, decl)| (name.as_str(), decl.as_field_ref()))
            .collect();
        let payload = ParamsParser::new(self.method, cases).parse(&fields, &values)?;
        Ok(payload.into_args(url))
    }

    fn validate_args(&self, kwargs: &Kwargs) -> Result<Map<String, Value>> {
        let mut errors = FieldErrors::new();
        for key in kwargs.keys() {
            if !self.fields.iter().any(|(name, decl)| decl.matches(name, key)) {
                errors.push(key.as_str(), "unexpected argument");
            }
        }

        let mut values = Map::new();
        for (name, decl) in &self.fields {
            let supplied = kwargs
                .get(name)
                .or_else(|| decl.alias().and_then(|alias| kwargs.get(alias)));
            let value = match (supplied, decl.default_value()) {
                (Some(value), _) => decl.schema().coerce_at(value, name, &mut errors),
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    errors.push(name.as_str(), "field required");
                    continue;
                }
            };
            values.insert(name.clone(), value);
        }

        if errors.is_empty() {
            Ok(values)
        } else {
            Err(EmissaryError::Validation { errors })
        }
    }

    /// Resolves a response into the declared type and validates it.
    ///
    /// # Errors
    ///
    /// `ResponseValidation` when the body does not match, `Decode` when a
    /// JSON body is expected and the body is not JSON.
    pub fn get_response(
        &self,
        response: &DecoratedResponse,
        receiver: Option<&Receiver>,
    ) -> Result<ResponseValue> {
        let value = self.resolve(response, receiver)?;
        self.check_response(&value)?;
        Ok(value)
    }

    pub(crate) fn resolve(
        &self,
        response: &DecoratedResponse,
        receiver: Option<&Receiver>,
    ) -> Result<ResponseValue> {
        match &self.resolution {
            Resolution::Record(schema) => {
                let body = response.json()?;
                schema
                    .coerce(&body, RESULT_LOC)
                    .map(ResponseValue::Record)
                    .map_err(|errors| EmissaryError::ResponseValidation { errors })
            }
            Resolution::Text => Ok(ResponseValue::Text(response.text())),
            Resolution::Json if self.method.answers_with_headers() => {
                Ok(ResponseValue::Headers(response.headers_map()))
            }
            Resolution::Json => Ok(ResponseValue::Json(response.json()?)),
            Resolution::Bytes => Ok(ResponseValue::Bytes(response.content().clone())),
            Resolution::Records(schema) => {
                let body = response.json()?;
                let items = body.as_array().ok_or_else(|| not_a_list(&body))?;
                let mut errors = FieldErrors::new();
                let records: Vec<Value> = items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| schema.coerce_at(item, &item_loc(idx), &mut errors))
                    .collect();
                errors.into_result(|errors| EmissaryError::ResponseValidation { errors })?;
                Ok(ResponseValue::Records(records))
            }
            Resolution::JsonList => match response.json()? {
                Value::Array(items) => Ok(ResponseValue::JsonList(items)),
                other => Err(not_a_list(&other)),
            },
            Resolution::None => Ok(ResponseValue::None),
            Resolution::Receiver(_) => receiver
                .and_then(Receiver::as_instance)
                .cloned()
                .map(ResponseValue::Record)
                .ok_or_else(|| EmissaryError::InvalidReceiver {
                    message: "Self response needs an instance receiver".to_string(),
                }),
            Resolution::Custom(name) => Err(EmissaryError::MissingFinalizer {
                response: name.clone(),
            }),
        }
    }

    /// Checks the value a call produced. `finalized` is true when a response
    /// finalizer produced it.
    ///
    /// # Errors
    ///
    /// `ResponseValidation` on mismatch.
    pub fn check_result(&self, value: &ResponseValue, finalized: bool) -> Result<()> {
        if finalized && !self.declared {
            return Ok(());
        }
        self.check_response(value)
    }

    /// Checks a resolved value against the declared response type.
    ///
    /// # Errors
    ///
    /// `ResponseValidation` on mismatch.
    pub fn check_response(&self, value: &ResponseValue) -> Result<()> {
        let mut errors = FieldErrors::new();
        match (&self.resolution, value) {
            (Resolution::Custom(_), _)
            | (Resolution::Text, ResponseValue::Text(_) | ResponseValue::Custom(Value::String(_)))
            | (Resolution::Bytes, ResponseValue::Bytes(_))
            | (Resolution::None, ResponseValue::None)
            | (Resolution::Receiver(None), ResponseValue::Record(_) | ResponseValue::Custom(_))
            | (
                Resolution::Json,
                ResponseValue::Headers(_)
                | ResponseValue::Json(Value::Object(_))
                | ResponseValue::Record(Value::Object(_))
                | ResponseValue::Custom(Value::Object(_)),
            ) => {}
            (
                Resolution::Record(schema) | Resolution::Receiver(Some(schema)),
                ResponseValue::Record(record) | ResponseValue::Json(record) | ResponseValue::Custom(record),
            ) => {
                schema.coerce_at(record, RESULT_LOC, &mut errors);
            }
            (
                Resolution::Records(schema),
                ResponseValue::Records(items)
                | ResponseValue::JsonList(items)
                | ResponseValue::Custom(Value::Array(items)),
            ) => {
                for (idx, item) in items.iter().enumerate() {
                    schema.coerce_at(item, &item_loc(idx), &mut errors);
                }
            }
            (
                Resolution::JsonList,
                ResponseValue::JsonList(items)
                | ResponseValue::Records(items)
                | ResponseValue::Custom(Value::Array(items)),
            ) => {
                for (idx, item) in items.iter().enumerate() {
                    if !item.is_object() {
                        errors.push(
                            item_loc(idx),
                            format!("expected object, got {}", value_type_name(item)),
                        );
                    }
                }
            }
            (_, other) => errors.push(
                RESULT_LOC,
                format!(
                    "expected {}, got {}",
                    self.response_type.describe(),
                    describe_value(other)
                ),
            ),
        }
        errors.into_result(|errors| EmissaryError::ResponseValidation { errors })
    }
}

fn check_fields(template: &PathTemplate, fields: &IndexMap<String, FieldDecl>) -> Result<()> {
    for (name, decl) in fields {
        decl.schema()
            .check_patterns(name)
            .map_err(|errors| EmissaryError::invalid_parameter(name, errors.to_string()))?;
    }

    for (name, decl) in fields {
        let Some(param) = decl.param() else {
            continue;
        };
        if param.kind() != ParamKind::Path {
            continue;
        }
        if param.declares_default() {
            return Err(EmissaryError::invalid_parameter(
                name,
                "path parameters cannot have a default",
            ));
        }
        let in_template = template
            .placeholders()
            .into_iter()
            .any(|placeholder| decl.matches(name, placeholder));
        if !in_template {
            return Err(EmissaryError::invalid_parameter(
                name,
                format!("path parameter is not a placeholder of {}", template.as_str()),
            ));
        }
    }

    for placeholder in template.placeholders() {
        if !fields.iter().any(|(name, decl)| decl.matches(name, placeholder)) {
            return Err(EmissaryError::invalid_parameter(
                placeholder,
                format!("placeholder of {} has no matching parameter", template.as_str()),
            ));
        }
    }
    Ok(())
}

fn resolve_type(response_type: &ResponseType, context: &EndpointContext) -> Result<Resolution> {
    let owner_schema = || context.owner.as_ref().map(|owner| owner.schema().clone());
    let resolution = match response_type {
        ResponseType::Record(schema) => Resolution::Record(schema.clone()),
        ResponseType::Text => Resolution::Text,
        ResponseType::Json => Resolution::Json,
        ResponseType::Bytes => Resolution::Bytes,
        ResponseType::Records(schema) => Resolution::Records(schema.clone()),
        ResponseType::JsonList => Resolution::JsonList,
        ResponseType::None => Resolution::None,
        ResponseType::SelfRecord => match context.method_type {
            MethodType::Instance => Resolution::Receiver(owner_schema()),
            MethodType::Class => Resolution::Record(owner_schema().ok_or_else(|| {
                EmissaryError::invalid_return("Response \"Self\" needs an owning model")
            })?),
            MethodType::Static => {
                return Err(EmissaryError::invalid_return(
                    "Response \"Self\" is only for class or instance methods",
                ))
            }
        },
        ResponseType::SelfList => match (context.method_type, owner_schema()) {
            (MethodType::Class, Some(schema)) => Resolution::Records(schema),
            (MethodType::Class, None) => {
                return Err(EmissaryError::invalid_return(
                    "Response \"list[Self]\" needs an owning model",
                ))
            }
            _ => {
                return Err(EmissaryError::invalid_return(
                    "Response \"list[Self]\" is only for class methods",
                ))
            }
        },
        ResponseType::Custom(name) if !context.has_finalizer => {
            return Err(EmissaryError::MissingFinalizer {
                response: name.clone(),
            })
        }
        ResponseType::Custom(name) => Resolution::Custom(name.clone()),
    };
    Ok(resolution)
}

fn item_loc(idx: usize) -> String {
    format!("{RESULT_LOC}[{idx}]")
}

fn not_a_list(value: &Value) -> EmissaryError {
    EmissaryError::response_validation(
        RESULT_LOC,
        format!("expected array, got {}", value_type_name(value)),
    )
}

const fn describe_value(value: &ResponseValue) -> &'static str {
    match value {
        ResponseValue::Record(_) => "record",
        ResponseValue::Text(_) => "str",
        ResponseValue::Json(_) => "dict",
        ResponseValue::Bytes(_) => "bytes",
        ResponseValue::Records(_) => "list of records",
        ResponseValue::JsonList(_) => "list[dict]",
        ResponseValue::Headers(_) => "headers",
        ResponseValue::None => "None",
        ResponseValue::Custom(_) => "custom value",
    }
}
