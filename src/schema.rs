// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Metric store schema: collection validators, indexes, and write-time checks.
//!
//! The validators are emitted in MongoDB `$jsonSchema` form so the same
//! definitions can initialize a document database. Writes through the meta
//! and spotify services are checked against equivalent typed rules.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use validator::{Validate, ValidationErrors};

use crate::error::AppError;
use crate::models::{MetaAdMetric, SpotifyMetric};

pub const META_AD_METRICS: &str = "metaAdMetrics";
pub const SPOTIFY_METRICS: &str = "spotifyMetrics";

/// One index on a collection.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    /// Key pattern, e.g. `{"campaignId": 1, "date": -1}`
    pub keys: Value,
    pub name: String,
    pub unique: bool,
}

/// Validator and indexes for one collection.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub validator: Value,
    pub indexes: Vec<IndexSpec>,
}

const COUNTER: [&str; 2] = ["int", "long"];
const AMOUNT: [&str; 4] = ["double", "int", "long", "decimal"];

fn counter(description: &str) -> Value {
    json!({ "bsonType": COUNTER, "minimum": 0, "description": description })
}

fn meta_ad_metrics() -> CollectionSpec {
    CollectionSpec {
        name: META_AD_METRICS,
        validator: json!({
            "$jsonSchema": {
                "bsonType": "object",
                "required": ["campaignId", "adId", "date", "impressions", "clicks", "spend"],
                "properties": {
                    "campaignId": { "bsonType": "string", "description": "campaign reference" },
                    "adId": { "bsonType": "string", "description": "Meta ad id" },
                    "date": { "bsonType": "date", "description": "snapshot day" },
                    "impressions": counter("ad impressions"),
                    "clicks": counter("link clicks"),
                    "spend": { "bsonType": AMOUNT, "minimum": 0, "description": "spend in account currency" },
                    "reach": counter("unique accounts reached"),
                    "conversions": counter("attributed conversions"),
                }
            }
        }),
        indexes: vec![
            IndexSpec {
                keys: json!({ "campaignId": 1, "date": -1 }),
                name: "campaignId_1_date_-1".to_string(),
                unique: false,
            },
            IndexSpec {
                keys: json!({ "adId": 1 }),
                name: "adId_1".to_string(),
                unique: false,
            },
            IndexSpec {
                keys: json!({ "campaignId": 1, "date": 1, "adId": 1 }),
                name: "campaignId_1_date_1_adId_1".to_string(),
                unique: true,
            },
        ],
    }
}

fn spotify_metrics() -> CollectionSpec {
    CollectionSpec {
        name: SPOTIFY_METRICS,
        validator: json!({
            "$jsonSchema": {
                "bsonType": "object",
                "required": ["campaignId", "trackId", "date", "streams", "listeners"],
                "properties": {
                    "campaignId": { "bsonType": "string", "description": "campaign reference" },
                    "trackId": { "bsonType": "string", "description": "Spotify track id" },
                    "date": { "bsonType": "date", "description": "snapshot day" },
                    "streams": counter("streams"),
                    "listeners": counter("unique listeners"),
                    "saves": counter("library saves"),
                    "playlistAdds": counter("playlist adds"),
                    "followers": counter("artist followers"),
                }
            }
        }),
        indexes: vec![
            IndexSpec {
                keys: json!({ "campaignId": 1, "date": -1 }),
                name: "campaignId_1_date_-1".to_string(),
                unique: false,
            },
            IndexSpec {
                keys: json!({ "trackId": 1 }),
                name: "trackId_1".to_string(),
                unique: false,
            },
            IndexSpec {
                keys: json!({ "campaignId": 1, "date": 1, "trackId": 1 }),
                name: "campaignId_1_date_1_trackId_1".to_string(),
                unique: true,
            },
        ],
    }
}

/// All metric collections.
pub fn collection_specs() -> Vec<CollectionSpec> {
    vec![meta_ad_metrics(), spotify_metrics()]
}

/// Initialization document: `createCollection` + `createIndexes` commands per collection.
pub fn init_document() -> Value {
    let collections: Vec<Value> = collection_specs()
        .into_iter()
        .map(|spec| {
            json!({
                "create": spec.name,
                "validator": spec.validator,
                "validationLevel": "strict",
                "validationAction": "error",
                "indexes": spec.indexes.iter().map(|index| json!({
                    "key": index.keys,
                    "name": index.name,
                    "unique": index.unique,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({ "collections": collections })
}

/// Check a `metaAdMetrics` document before it is written.
pub fn validate_meta_ad_metric(doc: Value) -> Result<MetaAdMetric, AppError> {
    validate_document(doc)
}

/// Check a `spotifyMetrics` document before it is written.
pub fn validate_spotify_metric(doc: Value) -> Result<SpotifyMetric, AppError> {
    validate_document(doc)
}

fn validate_document<T: DeserializeOwned + Validate>(doc: Value) -> Result<T, AppError> {
    if !doc.is_object() {
        return Err(AppError::Validation("document must be a JSON object".to_string()));
    }

    let parsed: T =
        serde_json::from_value(doc).map_err(|e| AppError::Validation(e.to_string()))?;
    parsed
        .validate()
        .map_err(|e| AppError::Validation(describe_errors(&e)))?;
    Ok(parsed)
}

/// Flatten validator errors into `field: message` pairs.
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: invalid ({})", field, e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_doc() -> Value {
        json!({
            "campaignId": "c1",
            "adId": "ad-9",
            "date": "2026-04-01",
            "impressions": 1200,
            "clicks": 34,
            "spend": 12.5
        })
    }

    #[test]
    fn test_valid_meta_document() {
        let metric = validate_meta_ad_metric(meta_doc()).expect("valid");
        assert_eq!(metric.clicks, 34);
        assert_eq!(metric.reach, None);
    }

    #[test]
    fn test_missing_spend_rejected() {
        let mut doc = meta_doc();
        doc.as_object_mut().unwrap().remove("spend");

        let err = validate_meta_ad_metric(doc).unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("spend"), "got {msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_counters_rejected() {
        let mut doc = meta_doc();
        doc["spend"] = json!(-3.0);
        assert!(validate_meta_ad_metric(doc).is_err());

        let mut doc = meta_doc();
        doc["clicks"] = json!(-1);
        assert!(validate_meta_ad_metric(doc).is_err());
    }

    #[test]
    fn test_bad_date_rejected() {
        let mut doc = meta_doc();
        doc["date"] = json!("April 1st");
        assert!(validate_meta_ad_metric(doc).is_err());
    }

    #[test]
    fn test_counters_capped_at_long_range() {
        let mut doc = meta_doc();
        doc["impressions"] = json!(u64::MAX);
        assert!(validate_meta_ad_metric(doc).is_err());

        let mut doc = meta_doc();
        doc["impressions"] = json!(i64::MAX);
        assert!(validate_meta_ad_metric(doc).is_ok());
    }

    #[test]
    fn test_spotify_requires_listeners() {
        let doc = json!({
            "campaignId": "c1",
            "trackId": "t1",
            "date": "2026-04-01",
            "streams": 900
        });
        assert!(validate_spotify_metric(doc).is_err());
    }

    #[test]
    fn test_init_document_lists_indexes() {
        let doc = init_document();
        let collections = doc["collections"].as_array().unwrap();
        assert_eq!(collections.len(), 2);

        let meta = &collections[0];
        assert_eq!(meta["create"], META_AD_METRICS);
        assert_eq!(meta["indexes"][0]["key"], json!({ "campaignId": 1, "date": -1 }));
        assert_eq!(meta["indexes"][1]["key"], json!({ "adId": 1 }));
        let required = meta["validator"]["$jsonSchema"]["required"].as_array().unwrap();
        assert!(required.contains(&json!("spend")));

        assert_eq!(meta["indexes"][2]["unique"], true);

        assert_eq!(collections[1]["indexes"][1]["key"], json!({ "trackId": 1 }));
    }
}
