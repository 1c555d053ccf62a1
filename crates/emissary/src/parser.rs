//! Partitioning of validated arguments into request channels.
//!
//! Every field goes to exactly one bucket of a [`Payload`]:
//!
//! | Marker | Bucket |
//! |--------|--------|
//! | `Query` | `params` |
//! | `Header` | `headers` |
//! | `Cookie` | `cookies` |
//! | `Body`/`Form`/`File` with a JSON media type | `json` |
//! | `File` with `multipart/form-data` | `files` |
//! | other body markers | `data` |
//! | none | `params` for GET, HEAD, OPTIONS and TRACE, `json` otherwise |
//!
//! Body fields share one media type per call. The only mix allowed is
//! `multipart/form-data` with `application/x-www-form-urlencoded`.

use crate::channels::{CaseConverters, Channel};
use emissary_core::{
    Args, EmissaryError, HttpMethod, Param, ParamKind, Result, Schema, FORM_URLENCODED, JSON,
    MULTIPART,
};
use serde_json::{Map, Value};

/// Media types whose fields land in the JSON body.
pub const JSON_MEDIA_TYPES: [&str; 3] = [JSON, "application/vnd.api+json", "application/ld+json"];

const EMBED_MIXED: &str = "Embed and non-embed variants of body are provided.";
const MULTIPLE_BODIES: &str = "Multiple variants of non-embed body are provided.";
const MULTIPLE_FILE_BODIES: &str = "Multiple variants of non-embed file body are provided.";

/// A field as the parser sees it.
#[derive(Debug, Clone, Copy)]
pub enum FieldRef<'a> {
    /// A field with an explicit marker.
    Marked(&'a Param),
    /// A field without a marker.
    Plain,
}

/// Per-channel request payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    /// Query parameters.
    pub params: Map<String, Value>,
    /// JSON body.
    pub json: Option<Value>,
    /// Form fields or a raw body.
    pub data: Option<Value>,
    /// Multipart file fields.
    pub files: Option<Value>,
    /// Headers.
    pub headers: Map<String, Value>,
    /// Cookies.
    pub cookies: Map<String, Value>,
}

impl Payload {
    /// Places the payload into an envelope for `url`.
    #[must_use]
    pub fn into_args(self, url: impl Into<String>) -> Args {
        Args {
            url: url.into(),
            params: self.params,
            json: self.json,
            data: self.data,
            files: self.files,
            headers: self.headers,
            cookies: self.cookies,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyBucket {
    Json,
    Data,
    Files,
}

/// Body buckets under construction. `None` means untouched.
#[derive(Default)]
struct Bodies {
    json: Option<Value>,
    data: Option<Value>,
    files: Option<Value>,
}

impl Bodies {
    fn slot(&mut self, bucket: BodyBucket) -> &mut Option<Value> {
        match bucket {
            BodyBucket::Json => &mut self.json,
            BodyBucket::Data => &mut self.data,
            BodyBucket::Files => &mut self.files,
        }
    }

    fn replace(&mut self, bucket: BodyBucket, value: Value) {
        *self.slot(bucket) = Some(value);
    }

    fn insert(&mut self, bucket: BodyBucket, key: String, value: Value) {
        let slot = self.slot(bucket);
        match slot {
            Some(Value::Object(map)) => {
                map.insert(key, value);
            }
            _ => {
                let mut map = Map::new();
                map.insert(key, value);
                *slot = Some(Value::Object(map));
            }
        }
    }
}

/// Bookkeeping for the body rules of one call.
#[derive(Default)]
struct BodyState {
    media_type: Option<String>,
    has_embed: bool,
    has_body: bool,
    has_file_body: bool,
}

impl BodyState {
    fn check_media_type(&mut self, media_type: &str) -> Result<()> {
        if let Some(current) = self.media_type.as_deref() {
            if current != media_type && !is_form_pair(current, media_type) {
                return Err(EmissaryError::incompatible_media_types(current, media_type));
            }
        }
        self.media_type = Some(media_type.to_string());
        Ok(())
    }

    fn check_embed(&mut self, embed: bool, is_file_body: bool) -> Result<()> {
        if embed {
            if self.has_body || self.has_file_body {
                return Err(EmissaryError::embed_conflict(EMBED_MIXED));
            }
            self.has_embed = true;
            return Ok(());
        }

        if self.has_embed {
            return Err(EmissaryError::embed_conflict(EMBED_MIXED));
        }
        if is_file_body {
            if self.has_file_body {
                return Err(EmissaryError::embed_conflict(MULTIPLE_FILE_BODIES));
            }
            self.has_file_body = true;
        } else {
            if self.has_body {
                return Err(EmissaryError::embed_conflict(MULTIPLE_BODIES));
            }
            self.has_body = true;
        }
        Ok(())
    }
}

fn is_form_pair(a: &str, b: &str) -> bool {
    (a == MULTIPART && b == FORM_URLENCODED) || (a == FORM_URLENCODED && b == MULTIPART)
}

/// Returns true for the JSON family of media types.
#[must_use]
pub fn is_json_media_type(media_type: &str) -> bool {
    JSON_MEDIA_TYPES.contains(&media_type)
}

/// Splits validated field values into request channels.
///
/// # Example
///
/// ```
/// use emissary::{CaseConverters, CaseOverrides, Channel, FieldRef, ParamsParser};
/// use emissary_core::{CaseConverter, HttpMethod, Param, Schema};
/// use serde_json::json;
///
/// let cases = CaseConverters::resolve(
///     &CaseOverrides::new(),
///     &CaseOverrides::new().channel(Channel::Query, CaseConverter::camel()),
/// );
/// let parser = ParamsParser::new(HttpMethod::Get, &cases);
///
/// let token = Param::header(Schema::string()).alias("X-Token");
/// let fields = [("first_name", FieldRef::Plain), ("token", FieldRef::Marked(&token))];
/// let values = json!({"first_name": "Ann", "token": "t0k"});
///
/// let payload = parser.parse(&fields, values.as_object().unwrap()).unwrap();
/// assert_eq!(payload.params["firstName"], "Ann");
/// assert_eq!(payload.headers["X-Token"], "t0k");
/// assert!(payload.json.is_none());
/// ```
#[derive(Debug)]
pub struct ParamsParser<'a> {
    method: HttpMethod,
    cases: &'a CaseConverters,
}

impl<'a> ParamsParser<'a> {
    /// Creates a parser for one call.
    #[must_use]
    pub const fn new(method: HttpMethod, cases: &'a CaseConverters) -> Self {
        Self { method, cases }
    }

    /// Partitions `values` following the declaration order of `fields`.
    ///
    /// Fields missing from `values` are skipped.
    ///
    /// # Errors
    ///
    /// `IncompatibleMediaTypes` when two body fields disagree on media type,
    /// `EmbedConflict` when embed rules are broken.
    pub fn parse(&self, fields: &[(&str, FieldRef<'_>)], values: &Map<String, Value>) -> Result<Payload> {
        let mut payload = Payload::default();
        let mut bodies = Bodies::default();
        let mut state = BodyState::default();
        let implicit_body = Param::body(Schema::any());

        for (name, field) in fields {
            let Some(value) = values.get(*name) else {
                continue;
            };
            let param = match field {
                FieldRef::Marked(param) => *param,
                FieldRef::Plain if self.method.accepts_body() => &implicit_body,
                FieldRef::Plain => {
                    let key = self.cases.convert(Channel::Query, name);
                    payload.params.insert(key, value.clone());
                    continue;
                }
            };
            self.place(name, param, value.clone(), &mut payload, &mut bodies, &mut state)?;
        }

        payload.json = bodies.json.filter(is_present);
        payload.data = bodies.data.filter(is_present);
        payload.files = bodies.files.filter(is_present);
        Ok(payload)
    }

    fn place(
        &self,
        name: &str,
        param: &Param,
        value: Value,
        payload: &mut Payload,
        bodies: &mut Bodies,
        state: &mut BodyState,
    ) -> Result<()> {
        let channel = match param.kind() {
            ParamKind::Query | ParamKind::Path => Channel::Query,
            ParamKind::Header => Channel::Header,
            ParamKind::Cookie => Channel::Cookie,
            ParamKind::Body | ParamKind::Form | ParamKind::File => Channel::Body,
        };
        let key = param
            .alias_name()
            .map_or_else(|| self.cases.convert(channel, name), str::to_string);

        match param.kind() {
            ParamKind::Header => {
                payload.headers.insert(key, value);
                return Ok(());
            }
            ParamKind::Cookie => {
                payload.cookies.insert(key, value);
                return Ok(());
            }
            ParamKind::Query | ParamKind::Path => {
                payload.params.insert(key, value);
                return Ok(());
            }
            ParamKind::Body | ParamKind::Form | ParamKind::File => {}
        }

        let media_type = param
            .media_type_name()
            .or_else(|| param.kind().default_media_type())
            .unwrap_or(JSON);
        state.check_media_type(media_type)?;

        let bucket = if is_json_media_type(media_type) {
            BodyBucket::Json
        } else if media_type == MULTIPART && param.kind() == ParamKind::File {
            BodyBucket::Files
        } else {
            if media_type != MULTIPART && media_type != FORM_URLENCODED {
                payload
                    .headers
                    .insert("Content-Type".to_string(), Value::String(media_type.to_string()));
            }
            BodyBucket::Data
        };

        state.check_embed(param.is_embed(), bucket == BodyBucket::Files)?;
        if param.is_embed() {
            bodies.insert(bucket, key, value);
        } else {
            bodies.replace(bucket, value);
        }
        Ok(())
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::CaseOverrides;
    use emissary_core::CaseConverter;
    use serde_json::json;

    fn values(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn identity() -> CaseConverters {
        CaseConverters::default()
    }

    fn parse(
        method: HttpMethod,
        cases: &CaseConverters,
        fields: &[(&str, FieldRef<'_>)],
        input: Value,
    ) -> Result<Payload> {
        ParamsParser::new(method, cases).parse(fields, &values(input))
    }

    #[test]
    fn test_plain_fields_follow_method() {
        let cases = identity();
        let fields = [("name", FieldRef::Plain)];

        let get = parse(HttpMethod::Get, &cases, &fields, json!({"name": "Ann"})).unwrap();
        assert_eq!(get.params["name"], "Ann");
        assert!(get.json.is_none());

        let post = parse(HttpMethod::Post, &cases, &fields, json!({"name": "Ann"})).unwrap();
        assert!(post.params.is_empty());
        assert_eq!(post.json, Some(json!({"name": "Ann"})));
    }

    #[test]
    fn test_channel_case_and_alias() {
        let cases = CaseConverters::resolve(
            &CaseOverrides::new(),
            &CaseOverrides::new()
                .channel(Channel::Query, CaseConverter::camel())
                .channel(Channel::Header, CaseConverter::header())
                .channel(Channel::Cookie, CaseConverter::kebab())
                .channel(Channel::Body, CaseConverter::pascal()),
        );
        let page = Param::query(Schema::integer());
        let trace = Param::header(Schema::string());
        let session = Param::cookie(Schema::string());
        let raw = Param::query(Schema::string()).alias("RAW_key");
        let body = Param::body(Schema::string());
        let fields = [
            ("page_size", FieldRef::Marked(&page)),
            ("trace_id", FieldRef::Marked(&trace)),
            ("session_id", FieldRef::Marked(&session)),
            ("raw", FieldRef::Marked(&raw)),
            ("user_name", FieldRef::Marked(&body)),
        ];
        let payload = parse(
            HttpMethod::Post,
            &cases,
            &fields,
            json!({"page_size": 10, "trace_id": "t", "session_id": "s", "raw": "r", "user_name": "u"}),
        )
        .unwrap();

        assert_eq!(payload.params, values(json!({"pageSize": 10, "RAW_key": "r"})));
        assert_eq!(payload.headers["Trace-Id"], "t");
        assert_eq!(payload.cookies["session-id"], "s");
        assert_eq!(payload.json, Some(json!({"UserName": "u"})));
    }

    #[test]
    fn test_non_embed_replaces_bucket() {
        let profile = Param::body(Schema::any()).embed(false);
        let payload = parse(
            HttpMethod::Post,
            &identity(),
            &[("profile", FieldRef::Marked(&profile))],
            json!({"profile": {"name": "Ann", "age": 30}}),
        )
        .unwrap();
        assert_eq!(payload.json, Some(json!({"name": "Ann", "age": 30})));
    }

    #[test]
    fn test_non_embed_then_embed_conflict() {
        let profile = Param::body(Schema::any()).embed(false);
        let extra = Param::body(Schema::any()).alias("Extra-Data");
        let err = parse(
            HttpMethod::Post,
            &identity(),
            &[
                ("profile", FieldRef::Marked(&profile)),
                ("extra", FieldRef::Marked(&extra)),
            ],
            json!({"profile": {}, "extra": 1}),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Embed conflict: Embed and non-embed variants of body are provided."
        );
    }

    #[test]
    fn test_embed_then_non_embed_conflict() {
        let extra = Param::body(Schema::any());
        let profile = Param::body(Schema::any()).embed(false);
        let err = parse(
            HttpMethod::Post,
            &identity(),
            &[
                ("extra", FieldRef::Marked(&extra)),
                ("profile", FieldRef::Marked(&profile)),
            ],
            json!({"extra": 1, "profile": {}}),
        )
        .unwrap_err();
        assert!(matches!(err, EmissaryError::EmbedConflict { .. }));
    }

    #[test]
    fn test_two_non_embed_bodies() {
        let a = Param::body(Schema::any()).embed(false);
        let b = Param::body(Schema::any()).embed(false);
        let err = parse(
            HttpMethod::Put,
            &identity(),
            &[("a", FieldRef::Marked(&a)), ("b", FieldRef::Marked(&b))],
            json!({"a": 1, "b": 2}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), format!("Embed conflict: {MULTIPLE_BODIES}"));
    }

    #[test]
    fn test_non_embed_file_and_form_coexist() {
        let upload = Param::file(Schema::any()).embed(false);
        let meta = Param::form(Schema::any())
            .media_type(MULTIPART)
            .embed(false);
        let payload = parse(
            HttpMethod::Post,
            &identity(),
            &[
                ("upload", FieldRef::Marked(&upload)),
                ("meta", FieldRef::Marked(&meta)),
            ],
            json!({"upload": {"file": "Zm9v"}, "meta": {"title": "t"}}),
        )
        .unwrap();
        assert_eq!(payload.files, Some(json!({"file": "Zm9v"})));
        assert_eq!(payload.data, Some(json!({"title": "t"})));
    }

    #[test]
    fn test_two_non_embed_files() {
        let a = Param::file(Schema::any()).embed(false);
        let b = Param::file(Schema::any()).embed(false);
        let err = parse(
            HttpMethod::Post,
            &identity(),
            &[("a", FieldRef::Marked(&a)), ("b", FieldRef::Marked(&b))],
            json!({"a": {}, "b": {}}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), format!("Embed conflict: {MULTIPLE_FILE_BODIES}"));
    }

    #[test]
    fn test_form_and_multipart_mix() {
        let title = Param::form(Schema::string());
        let upload = Param::file(Schema::string());
        let payload = parse(
            HttpMethod::Post,
            &identity(),
            &[
                ("title", FieldRef::Marked(&title)),
                ("upload", FieldRef::Marked(&upload)),
            ],
            json!({"title": "report", "upload": "Zm9v"}),
        )
        .unwrap();
        assert_eq!(payload.data, Some(json!({"title": "report"})));
        assert_eq!(payload.files, Some(json!({"upload": "Zm9v"})));
        assert!(!payload.headers.contains_key("Content-Type"));
    }

    #[test]
    fn test_json_family_mismatch() {
        let a = Param::body(Schema::any());
        let b = Param::body(Schema::any()).media_type("application/vnd.api+json");
        let err = parse(
            HttpMethod::Post,
            &identity(),
            &[("a", FieldRef::Marked(&a)), ("b", FieldRef::Marked(&b))],
            json!({"a": 1, "b": 2}),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EmissaryError::IncompatibleMediaTypes { ref first, ref second }
                if first == JSON && second == "application/vnd.api+json"
        ));
    }

    #[test]
    fn test_plain_body_field_conflicts_with_form() {
        let title = Param::form(Schema::string());
        let err = parse(
            HttpMethod::Post,
            &identity(),
            &[("title", FieldRef::Marked(&title)), ("note", FieldRef::Plain)],
            json!({"title": "t", "note": "n"}),
        )
        .unwrap_err();
        assert!(matches!(err, EmissaryError::IncompatibleMediaTypes { .. }));
    }

    #[test]
    fn test_custom_media_type_sets_content_type() {
        let doc = Param::body(Schema::string())
            .media_type("application/xml")
            .embed(false);
        let payload = parse(
            HttpMethod::Post,
            &identity(),
            &[("doc", FieldRef::Marked(&doc))],
            json!({"doc": "<a/>"}),
        )
        .unwrap();
        assert_eq!(payload.data, Some(json!("<a/>")));
        assert_eq!(payload.headers["Content-Type"], "application/xml");
        assert!(payload.json.is_none());
    }

    #[test]
    fn test_json_family_goes_to_json() {
        let doc = Param::body(Schema::any()).media_type("application/ld+json");
        let payload = parse(
            HttpMethod::Post,
            &identity(),
            &[("doc", FieldRef::Marked(&doc))],
            json!({"doc": {"@id": "x"}}),
        )
        .unwrap();
        assert_eq!(payload.json, Some(json!({"doc": {"@id": "x"}})));
        assert!(payload.headers.is_empty());
    }

    #[test]
    fn test_empty_buckets_are_omitted() {
        let profile = Param::body(Schema::any()).embed(false);
        let payload = parse(
            HttpMethod::Post,
            &identity(),
            &[("profile", FieldRef::Marked(&profile))],
            json!({"profile": {}}),
        )
        .unwrap();
        assert_eq!(payload, Payload::default());
    }

    #[test]
    fn test_into_args() {
        let payload = Payload {
            json: Some(json!({"a": 1})),
            ..Payload::default()
        };
        let args = payload.into_args("/things");
        assert_eq!(args.url, "/things");
        assert_eq!(args.json, Some(json!({"a": 1})));
    }
}
