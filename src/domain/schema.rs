// Schema migration - upgrades legacy dashboard documents to the current version
use crate::domain::dashboard::{DashboardModel, Panel, TimeRange};
use serde_json::{Map, Value, json};

pub const CURRENT_SCHEMA_VERSION: u32 = 3;

const GRAPH_PANEL: &str = "graph";
const LEGACY_GRAPHITE_PANEL: &str = "graphite";

/// Default and migrate a raw document in one step. Total and idempotent.
pub fn normalize(raw: &Value) -> DashboardModel {
    migrate(DashboardModel::from_raw(raw), raw)
}

/// Upgrade a defaulted document to [`CURRENT_SCHEMA_VERSION`].
///
/// `target.version` is the declared version and selects which transforms
/// run, newest first. `context` is the raw input; legacy keys that were
/// never copied onto the model (`services`) are read from there.
///
/// A document declaring version 2 still gets panel ids but skips the
/// version 2 structural rewrite.
pub fn migrate(target: DashboardModel, context: &Value) -> DashboardModel {
    let old_version = target.version;

    if old_version >= CURRENT_SCHEMA_VERSION {
        if old_version > CURRENT_SCHEMA_VERSION {
            tracing::warn!(
                "Dashboard '{}' declares unknown schema v{}, treating it as v{}",
                target.title,
                old_version,
                CURRENT_SCHEMA_VERSION
            );
        }
        return DashboardModel {
            version: CURRENT_SCHEMA_VERSION,
            ..target
        };
    }

    tracing::debug!(
        "Migrating dashboard '{}' from schema v{} to v{}",
        target.title,
        old_version,
        CURRENT_SCHEMA_VERSION
    );

    // Version 3: panel ids
    let mut model = assign_panel_ids(target);

    // Version 2: filter services and graph panel fields
    if old_version < 2 {
        model = upgrade_graph_panels(lift_filter_services(model, context));
    }

    model.version = CURRENT_SCHEMA_VERSION;
    model
}

/// Number every panel 1, 2, 3... in row-major order.
pub fn assign_panel_ids(mut model: DashboardModel) -> DashboardModel {
    let mut next_id = 1;
    for row in &mut model.rows {
        for panel in &mut row.panels {
            panel.set_id(next_id);
            next_id += 1;
        }
    }
    model
}

/// Move legacy `services.filter.{time,list}` onto `time` and
/// `templating.list`, then drop `services`.
pub fn lift_filter_services(mut model: DashboardModel, context: &Value) -> DashboardModel {
    let Some(services) = context.get("services") else {
        return model;
    };

    if let Some(filter) = services.get("filter").filter(|filter| filter.is_object()) {
        match filter.get("time").and_then(TimeRange::from_raw) {
            Some(time) => model.time = time,
            None => tracing::warn!("Legacy services.filter.time is malformed, keeping '{}'", model.time.from),
        }

        match filter.get("list").and_then(Value::as_array) {
            Some(list) => model.templating.list = list.clone(),
            None => tracing::warn!("Legacy services.filter.list is not a list, keeping templating"),
        }
    }

    model.extra.remove("services");
    model
}

pub fn upgrade_graph_panels(mut model: DashboardModel) -> DashboardModel {
    for row in &mut model.rows {
        row.panels = std::mem::take(&mut row.panels)
            .into_iter()
            .map(upgrade_panel)
            .collect();
    }
    model
}

/// Rewrite one panel from the version 1 field layout. Only `graphite` and
/// `graph` panels are touched; other kinds pass through unchanged.
pub fn upgrade_panel(panel: Panel) -> Panel {
    let mut fields = panel.into_map();

    if panel_kind(&fields) == Some(LEGACY_GRAPHITE_PANEL) {
        fields.insert("type".to_string(), Value::from(GRAPH_PANEL));
    }

    if panel_kind(&fields) != Some(GRAPH_PANEL) {
        return Panel::from(fields);
    }

    if let Some(&Value::Bool(show)) = fields.get("legend") {
        fields.insert("legend".to_string(), json!({ "show": show }));
    }

    if let Some(Value::Object(grid)) = fields.get_mut("grid") {
        rename_key(grid, "min", "leftMin");
        rename_key(grid, "max", "leftMax");
    }

    let primary = fields.remove("y_format");
    let secondary = fields.remove("y2_format");
    if primary.is_some() || secondary.is_some() {
        fold_y_formats(&mut fields, primary, secondary);
    }

    Panel::from(fields)
}

fn panel_kind(fields: &Map<String, Value>) -> Option<&str> {
    fields.get("type").and_then(Value::as_str)
}

fn rename_key(map: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = map.remove(from) {
        if !value.is_null() {
            map.insert(to.to_string(), value);
        }
    }
}

/// `y_formats` is always a pair once a legacy format has been folded in.
fn fold_y_formats(fields: &mut Map<String, Value>, primary: Option<Value>, secondary: Option<Value>) {
    let mut formats = match fields.remove("y_formats") {
        Some(Value::Array(formats)) => formats,
        _ => Vec::new(),
    };
    if formats.len() < 2 {
        formats.resize(2, Value::Null);
    }

    for (slot, format) in [(0, primary), (1, secondary)] {
        if let Some(format) = format.filter(|format| !format.is_null()) {
            formats[slot] = format;
        }
    }

    fields.insert("y_formats".to_string(), Value::Array(formats));
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn config() -> ProptestConfig {
        ProptestConfig {
            failure_persistence: None,
            ..ProptestConfig::default()
        }
    }

    fn arb_legend() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<bool>().prop_map(|show| json!({ "show": show })),
        ]
    }

    /// Panel in any historical layout.
    fn arb_panel() -> impl Strategy<Value = Value> {
        (
            prop_oneof![Just("graphite"), Just("graph"), Just("text"), Just("table")],
            prop::option::of(arb_legend()),
            prop::option::of((prop::option::of(-50i64..50), prop::option::of(-50i64..50))),
            prop::option::of(prop_oneof![Just("bytes"), Just("ms"), Just("percent")]),
            prop::option::of(prop_oneof![Just("short"), Just("bits")]),
            any::<bool>(),
        )
            .prop_map(|(kind, legend, grid, y_format, y2_format, has_y_formats)| {
                let mut fields = Map::new();
                fields.insert("type".to_string(), json!(kind));
                if let Some(legend) = legend {
                    fields.insert("legend".to_string(), legend);
                }
                if let Some((min, max)) = grid {
                    let mut bounds = Map::new();
                    if let Some(min) = min {
                        bounds.insert("min".to_string(), json!(min));
                    }
                    if let Some(max) = max {
                        bounds.insert("max".to_string(), json!(max));
                    }
                    fields.insert("grid".to_string(), Value::Object(bounds));
                }
                if let Some(format) = y_format {
                    fields.insert("y_format".to_string(), json!(format));
                }
                if let Some(format) = y2_format {
                    fields.insert("y2_format".to_string(), json!(format));
                }
                if has_y_formats {
                    fields.insert("y_formats".to_string(), json!(["short", "short"]));
                }
                Value::Object(fields)
            })
    }

    fn arb_nav() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None),
            Just(Some(json!([]))),
            Just(Some(json!([{"type": "timepicker"}]))),
            Just(Some(json!([{"collapse": true}]))),
        ]
    }

    fn arb_pulldowns() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None),
            Just(Some(json!([]))),
            Just(Some(json!([{"type": "filtering", "enable": true}, {"type": "filtering"}]))),
            Just(Some(json!([{"type": "annotations"}, {"type": "annotations", "enable": true}]))),
            Just(Some(json!([{"name": "custom", "enable": true}]))),
        ]
    }

    /// Partial or legacy document, version 0 through 4 or absent.
    fn arb_document() -> impl Strategy<Value = Value> {
        (
            prop::option::of(0u64..=4),
            prop::collection::vec(prop::collection::vec(arb_panel(), 0..4), 0..4),
            arb_nav(),
            arb_pulldowns(),
            any::<bool>(),
        )
            .prop_map(|(version, rows, nav, pulldowns, has_services)| {
                let mut document = Map::new();
                if let Some(version) = version {
                    document.insert("version".to_string(), json!(version));
                }
                let rows: Vec<Value> = rows.into_iter().map(|panels| json!({ "panels": panels })).collect();
                document.insert("rows".to_string(), Value::Array(rows));
                if let Some(nav) = nav {
                    document.insert("nav".to_string(), nav);
                }
                if let Some(pulldowns) = pulldowns {
                    document.insert("pulldowns".to_string(), pulldowns);
                }
                if has_services {
                    document.insert(
                        "services".to_string(),
                        json!({"filter": {"time": {"from": "now-1d", "to": "now"}, "list": [{"name": "host"}]}}),
                    );
                }
                Value::Object(document)
            })
    }

    fn raw_panels(raw: &Value) -> Vec<&Value> {
        raw["rows"]
            .as_array()
            .into_iter()
            .flatten()
            .flat_map(|row| row["panels"].as_array().into_iter().flatten())
            .collect()
    }

    proptest! {
        #![proptest_config(config())]

        #[test]
        fn test_normalize_twice_equals_once(raw in arb_document()) {
            let once = normalize(&raw);
            let twice = normalize(&serde_json::to_value(&once).unwrap());
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn test_normalized_document_holds_invariants(raw in arb_document()) {
            let model = normalize(&raw);
            let declared = raw.get("version").and_then(Value::as_u64).unwrap_or(0);

            prop_assert_eq!(model.version, CURRENT_SCHEMA_VERSION);
            prop_assert!(!model.nav.is_empty());
            prop_assert_eq!(model.pulldowns.iter().filter(|p| p.is("filtering")).count(), 1);
            prop_assert_eq!(model.pulldowns.iter().filter(|p| p.is("annotations")).count(), 1);

            if declared < 3 {
                let ids: Vec<Option<u64>> = model.panels().map(Panel::id).collect();
                let expected: Vec<Option<u64>> = (1..=model.panel_count() as u64).map(Some).collect();
                prop_assert_eq!(ids, expected);
            }

            if declared < 2 {
                let before = raw_panels(&raw);
                prop_assert_eq!(before.len(), model.panel_count());

                for (before, after) in before.into_iter().zip(model.panels()) {
                    prop_assert_ne!(after.kind(), Some(LEGACY_GRAPHITE_PANEL));
                    if after.kind() != Some(GRAPH_PANEL) {
                        continue;
                    }

                    match before.get("legend") {
                        Some(Value::Bool(show)) => {
                            let wrapped = json!({ "show": show });
                            prop_assert_eq!(after.legend(), Some(&wrapped));
                        }
                        other => prop_assert_eq!(after.legend(), other),
                    }

                    for (legacy, current) in [("min", "leftMin"), ("max", "leftMax")] {
                        prop_assert!(after.grid().is_none_or(|grid| !grid.contains_key(legacy)));
                        if let Some(bound) = before.get("grid").and_then(|grid| grid.get(legacy)) {
                            prop_assert_eq!(after.grid().and_then(|grid| grid.get(current)), Some(bound));
                        }
                    }

                    for (slot, legacy) in [(0, "y_format"), (1, "y2_format")] {
                        prop_assert!(after.get(legacy).is_none());
                        if let Some(format) = before.get(legacy) {
                            prop_assert_eq!(after.y_formats().map(|formats| &formats[slot]), Some(format));
                        }
                    }
                }
            }
        }
    }
}
