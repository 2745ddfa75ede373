use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One classified `dataLayer` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataLayerEvent {
    /// A known event from the catalog
    Catalog { name: String, description: String },
    /// An entry carrying an `ecommerce` payload
    Ecommerce { name: Option<String> },
    /// A named event missing from the catalog
    Custom { name: String },
    /// Anything else (non-objects, config pushes, gtm internals without a name)
    Unrecognized,
}

/// Classified data-layer contents for one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLayerSummary {
    /// Number of entries considered, after truncation
    pub total_events: usize,
    /// Classified entries in input order
    pub events: Vec<DataLayerEvent>,
    /// Catalog description to occurrence count
    pub catalog_counts: BTreeMap<String, usize>,
    pub ecommerce_events: usize,
    /// Names of custom events in input order
    pub custom_events: Vec<String>,
}

/// Classifies the raw `window.dataLayer` array
///
/// # Arguments
///
/// * `events` - The raw data-layer entries
/// * `catalog` - Known events as (event name, description) pairs
/// * `max_events` - Entries beyond this count are ignored
///
/// # Returns
///
/// A summary whose `total_events` equals `min(events.len(), max_events)`
pub fn parse_data_layer_events(
    events: &[Value],
    catalog: &[(String, String)],
    max_events: usize,
) -> DataLayerSummary {
    let considered = &events[..events.len().min(max_events)];
    let mut summary = DataLayerSummary {
        total_events: considered.len(),
        ..Default::default()
    };

    for value in considered {
        let event = classify(value, catalog);
        match &event {
            DataLayerEvent::Catalog { description, .. } => {
                *summary
                    .catalog_counts
                    .entry(description.clone())
                    .or_insert(0) += 1;
            }
            DataLayerEvent::Ecommerce { .. } => summary.ecommerce_events += 1,
            DataLayerEvent::Custom { name } => summary.custom_events.push(name.clone()),
            DataLayerEvent::Unrecognized => {}
        }
        summary.events.push(event);
    }

    summary
}

fn classify(value: &Value, catalog: &[(String, String)]) -> DataLayerEvent {
    let object = match value.as_object() {
        Some(object) => object,
        None => return DataLayerEvent::Unrecognized,
    };

    let name = object.get("event").and_then(Value::as_str);
    let has_ecommerce = object.contains_key("ecommerce");

    if let Some(name) = name {
        if let Some((_, description)) = catalog.iter().find(|(event, _)| event == name) {
            return DataLayerEvent::Catalog {
                name: name.to_string(),
                description: description.clone(),
            };
        }
    }

    if has_ecommerce {
        return DataLayerEvent::Ecommerce {
            name: name.map(str::to_string),
        };
    }

    match name {
        Some(name) => DataLayerEvent::Custom {
            name: name.to_string(),
        },
        None => DataLayerEvent::Unrecognized,
    }
}
