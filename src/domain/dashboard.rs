// Dashboard domain model
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const DEFAULT_TITLE: &str = "No Title";
pub const DEFAULT_TIMEZONE: &str = "browser";
pub const FILTERING_PULLDOWN: &str = "filtering";
pub const ANNOTATIONS_PULLDOWN: &str = "annotations";
pub const TIMEPICKER_NAV: &str = "timepicker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Dark,
    Light,
}

impl Style {
    fn from_raw(value: &Value) -> Self {
        match value.as_str() {
            Some("light") => Style::Light,
            Some("dark") | None => Style::Dark,
            Some(other) => {
                tracing::warn!("Unknown dashboard style '{}', falling back to dark", other);
                Style::Dark
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            from: "now-6h".to_string(),
            to: "now".to_string(),
        }
    }
}

impl TimeRange {
    /// Reads `{from, to}`; anything without two string bounds is rejected.
    pub fn from_raw(value: &Value) -> Option<Self> {
        let from = value.get("from")?.as_str()?;
        let to = value.get("to")?.as_str()?;
        Some(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Templating {
    pub list: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Templating {
    fn from_raw(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let mut templating = Self::default();
        for (key, field) in object {
            if key == "list" {
                match field.as_array() {
                    Some(list) => templating.list = list.clone(),
                    None => warn_malformed("templating.list", field),
                }
            } else {
                templating.extra.insert(key.clone(), field.clone());
            }
        }
        templating
    }
}

/// A toggleable top-level feature such as filtering or annotations. Entries
/// without a string `type` are kept as-is and never match a known kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pulldown {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub enable: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Pulldown {
    pub fn disabled(kind: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            enable: false,
            extra: Map::new(),
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    fn from_raw(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let kind = type_name(object);
        let enable = object.get("enable").and_then(Value::as_bool).unwrap_or(false);
        let extra = object
            .iter()
            .filter(|(key, _)| key.as_str() != "enable" && !(kind.is_some() && key.as_str() == "type"))
            .map(|(key, field)| (key.clone(), field.clone()))
            .collect();

        Some(Self {
            kind,
            enable,
            extra,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavItem {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NavItem {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            extra: Map::new(),
        }
    }

    fn from_raw(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let kind = type_name(object);
        let extra = object
            .iter()
            .filter(|(key, _)| !(kind.is_some() && key.as_str() == "type"))
            .map(|(key, field)| (key.clone(), field.clone()))
            .collect();

        Some(Self { kind, extra })
    }
}

/// A string `type`; any other `type` value stays in the entry's extra fields.
fn type_name(object: &Map<String, Value>) -> Option<String> {
    object.get("type").and_then(Value::as_str).map(str::to_string)
}

/// A single visualization unit. Panel kinds carry arbitrary options, so the
/// panel stays an open JSON object with typed accessors for the fields the
/// schema cares about.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Panel(Map<String, Value>);

impl Panel {
    pub fn new(kind: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("type".to_string(), Value::from(kind));
        Self(fields)
    }

    pub fn id(&self) -> Option<u64> {
        self.0.get("id").and_then(Value::as_u64)
    }

    pub fn set_id(&mut self, id: u64) {
        self.0.insert("id".to_string(), Value::from(id));
    }

    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn legend(&self) -> Option<&Value> {
        self.0.get("legend")
    }

    pub fn grid(&self) -> Option<&Map<String, Value>> {
        self.0.get("grid").and_then(Value::as_object)
    }

    pub fn y_formats(&self) -> Option<&Vec<Value>> {
        self.0.get("y_formats").and_then(Value::as_array)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Panel {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Row {
    pub panels: Vec<Panel>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Row {
    pub fn with_panels(panels: Vec<Panel>) -> Self {
        Self {
            panels,
            extra: Map::new(),
        }
    }

    fn from_raw(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut row = Self::default();

        for (key, field) in object {
            if key != "panels" {
                row.extra.insert(key.clone(), field.clone());
                continue;
            }

            match field.as_array() {
                Some(panels) => {
                    row.panels = panels
                        .iter()
                        .filter_map(|panel| match panel.as_object() {
                            Some(fields) => Some(Panel(fields.clone())),
                            None => {
                                tracing::warn!("Skipping panel that is not an object: {}", panel);
                                None
                            }
                        })
                        .collect();
                }
                None => warn_malformed("rows[].panels", field),
            }
        }

        Some(row)
    }
}

/// In-memory dashboard document. Built only through [`DashboardModel::from_raw`],
/// which defaults every field and repairs the pulldown and nav entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardModel {
    pub title: String,
    pub tags: Vec<String>,
    pub style: Style,
    pub timezone: String,
    pub editable: bool,
    pub rows: Vec<Row>,
    pub pulldowns: Vec<Pulldown>,
    pub nav: Vec<NavItem>,
    pub time: TimeRange,
    pub templating: Templating,
    /// Interval string, or any other truthy value the document carried.
    /// `None` for falsy input; written back as `false`.
    #[serde(serialize_with = "serialize_refresh")]
    pub refresh: Option<Value>,
    pub version: u32,
    /// Top-level keys this model does not interpret, kept for write-back.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for DashboardModel {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            tags: Vec::new(),
            style: Style::default(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            editable: true,
            rows: Vec::new(),
            pulldowns: Vec::new(),
            nav: Vec::new(),
            time: TimeRange::default(),
            templating: Templating::default(),
            refresh: None,
            version: 0,
            extra: Map::new(),
        }
    }
}

impl DashboardModel {
    /// Default every field from a raw, possibly legacy document. Never fails:
    /// wrong-shaped fields fall back to their defaults.
    pub fn from_raw(raw: &Value) -> Self {
        let mut model = Self::default();

        match raw.as_object() {
            Some(object) => {
                for (key, value) in object {
                    model.apply_raw_field(key, value);
                }
            }
            None if raw.is_null() => {}
            None => tracing::warn!("Dashboard document is not an object, using defaults"),
        }

        model.ensure_nav();
        model.ensure_pulldowns();
        model
    }

    fn apply_raw_field(&mut self, key: &str, value: &Value) {
        match key {
            "title" => {
                if let Some(title) = non_empty_str(value) {
                    self.title = title.to_string();
                }
            }
            "tags" => match value.as_array() {
                Some(tags) => {
                    self.tags = tags
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect();
                }
                None => warn_malformed(key, value),
            },
            "style" => self.style = Style::from_raw(value),
            "timezone" => {
                if let Some(timezone) = non_empty_str(value) {
                    self.timezone = timezone.to_string();
                }
            }
            "editable" => match value.as_bool() {
                Some(editable) => self.editable = editable,
                None => warn_malformed(key, value),
            },
            "rows" => match value.as_array() {
                Some(rows) => {
                    self.rows = rows
                        .iter()
                        .filter_map(|row| {
                            let parsed = Row::from_raw(row);
                            if parsed.is_none() {
                                tracing::warn!("Skipping row that is not an object: {}", row);
                            }
                            parsed
                        })
                        .collect();
                }
                None => warn_malformed(key, value),
            },
            "pulldowns" => match value.as_array() {
                Some(pulldowns) => {
                    self.pulldowns = pulldowns.iter().filter_map(|entry| keep_object(key, entry, Pulldown::from_raw)).collect();
                }
                None => warn_malformed(key, value),
            },
            "nav" => match value.as_array() {
                Some(nav) => self.nav = nav.iter().filter_map(|entry| keep_object(key, entry, NavItem::from_raw)).collect(),
                None => warn_malformed(key, value),
            },
            "time" => match TimeRange::from_raw(value) {
                Some(time) => self.time = time,
                None => warn_malformed(key, value),
            },
            "templating" => self.templating = Templating::from_raw(value),
            "refresh" => self.refresh = is_truthy(value).then(|| value.clone()),
            "version" => self.version = declared_version(value),
            _ => {
                self.extra.insert(key.to_string(), value.clone());
            }
        }
    }

    /// Guarantee exactly one filtering and one annotations pulldown. The first
    /// occurrence of each wins; missing ones are appended disabled.
    pub fn ensure_pulldowns(&mut self) {
        let mut has_filtering = false;
        let mut has_annotations = false;

        self.pulldowns.retain(|pulldown| match pulldown.kind.as_deref().unwrap_or_default() {
            FILTERING_PULLDOWN => !std::mem::replace(&mut has_filtering, true),
            ANNOTATIONS_PULLDOWN => !std::mem::replace(&mut has_annotations, true),
            _ => true,
        });

        if !has_filtering {
            self.pulldowns.push(Pulldown::disabled(FILTERING_PULLDOWN));
        }
        if !has_annotations {
            self.pulldowns.push(Pulldown::disabled(ANNOTATIONS_PULLDOWN));
        }
    }

    pub fn ensure_nav(&mut self) {
        if self.nav.is_empty() {
            self.nav.push(NavItem::new(TIMEPICKER_NAV));
        }
    }

    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.rows.iter().flat_map(|row| row.panels.iter())
    }

    pub fn panel_count(&self) -> usize {
        self.rows.iter().map(|row| row.panels.len()).sum()
    }

    pub fn pulldown(&self, kind: &str) -> Option<&Pulldown> {
        self.pulldowns.iter().find(|pulldown| pulldown.is(kind))
    }
}

/// `version` as declared by the document; anything that is not a
/// non-negative integer counts as the oldest schema.
fn declared_version(value: &Value) -> u32 {
    if let Some(version) = value.as_u64() {
        return u32::try_from(version).unwrap_or(u32::MAX);
    }

    match value.as_f64() {
        Some(version) if version >= 0.0 && version.fract() == 0.0 => version.min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

/// Entries that are not objects cannot be pulldowns or nav items.
fn keep_object<T>(field: &str, entry: &Value, parse: impl Fn(&Value) -> Option<T>) -> Option<T> {
    let parsed = parse(entry);
    if parsed.is_none() {
        tracing::warn!("Skipping {} entry that is not an object: {}", field, entry);
    }
    parsed
}

/// JSON truthiness: `null`, `false`, `0` and `""` are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn warn_malformed(field: &str, value: &Value) {
    if !value.is_null() {
        tracing::warn!("Ignoring malformed dashboard field '{}': {}", field, value);
    }
}

fn serialize_refresh<S: Serializer>(refresh: &Option<Value>, serializer: S) -> Result<S::Ok, S::Error> {
    match refresh {
        Some(refresh) => refresh.serialize(serializer),
        None => serializer.serialize_bool(false),
    }
}
