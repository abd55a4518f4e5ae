//! Watchlist domain models
//!
//! `RawRecord` is the untyped field bag emitted by source adapters.
//! `CanonicalRecord` is the durable, deduplicated watchlist entry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Wire field names carried by raw records
pub mod fields {
    pub const WATCHLIST_ID: &str = "ricaWatchlistId";
    pub const FULL_NAME: &str = "ricaFullName";
    pub const FIRST_NAME: &str = "ricaFirstName";
    pub const MIDDLE_NAME: &str = "ricaMiddleName";
    pub const SURNAME: &str = "ricaSurname";
    pub const TITLE: &str = "ricaTitle";
    pub const WATCH_TYPE: &str = "ricaWatchType";
    pub const SOURCE: &str = "ricaSource";
    pub const SOURCE_KEY: &str = "source_key";
    pub const CATEGORY: &str = "ricaCategory";
    pub const SUB_CATEGORY: &str = "ricaSubCategory";
    pub const DESCRIPTION: &str = "ricaDescription";
    pub const NATIONALITY: &str = "ricaNationality";
    pub const ADDRESS: &str = "ricaAddress";
    pub const COUNTRY: &str = "ricaCountry";
    pub const REMARKS: &str = "ricaRemarks";
    pub const ACTION_DATE: &str = "ricaActionDate";
    pub const DOB: &str = "ricaDOB";
    pub const FLAG_DATE: &str = "ricaFlagDate";
}

/// Maximum stored length (in characters) of each text column
pub mod limits {
    pub const WATCHLIST_ID: usize = 100;
    pub const FULL_NAME: usize = 500;
    pub const NAME_PART: usize = 200;
    pub const TITLE: usize = 100;
    pub const SOURCE: usize = 100;
    pub const CATEGORY: usize = 100;
    pub const DESCRIPTION: usize = 4000;
    pub const NATIONALITY: usize = 200;
    pub const ADDRESS: usize = 1000;
    pub const COUNTRY: usize = 100;
    pub const REMARKS: usize = 2000;
    pub const RELATION_LIST: usize = 2000;
}

/// Truncate to at most `max` characters without splitting a code point
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

/// Untyped record produced by a source adapter
///
/// Has no guaranteed schema beyond an optional raw identifier and raw name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert for string fields
    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.0.insert(field.to_string(), Value::String(value.into()));
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Textual rendering of a field (`null` and missing are `None`)
    pub fn get_text(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Entity-or-individual flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchType {
    Individual,
    Entity,
}

impl WatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchType::Individual => "Individual",
            WatchType::Entity => "Entity",
        }
    }

    /// Lenient parse of source-supplied labels
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "individual" | "person" | "natural person" => Some(WatchType::Individual),
            "entity" | "organization" | "organisation" | "company" | "vessel" => {
                Some(WatchType::Entity)
            }
            _ => None,
        }
    }
}

/// Durable watchlist entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "ricaWatchlistId")]
    pub watchlist_id: String,
    #[serde(rename = "ricaFullName")]
    pub full_name: String,
    #[serde(rename = "ricaFirstName")]
    pub first_name: Option<String>,
    #[serde(rename = "ricaMiddleName")]
    pub middle_name: Option<String>,
    #[serde(rename = "ricaSurname")]
    pub surname: Option<String>,
    #[serde(rename = "ricaTitle")]
    pub title: Option<String>,
    #[serde(rename = "ricaWatchType")]
    pub watch_type: Option<WatchType>,
    #[serde(rename = "ricaSource")]
    pub source: String,
    #[serde(rename = "ricaCategory")]
    pub category: Option<String>,
    #[serde(rename = "ricaSubCategory")]
    pub sub_category: Option<String>,
    #[serde(rename = "ricaDescription")]
    pub description: Option<String>,
    #[serde(rename = "ricaNationality")]
    pub nationality: Option<String>,
    #[serde(rename = "ricaAddress")]
    pub address: Option<String>,
    #[serde(rename = "ricaCountry")]
    pub country: Option<String>,
    #[serde(rename = "ricaRemarks")]
    pub remarks: Option<String>,
    #[serde(rename = "ricaActionDate")]
    pub action_date: Option<NaiveDate>,
    #[serde(rename = "ricaDOB")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(rename = "ricaFlagDate")]
    pub flag_date: Option<NaiveDate>,
    #[serde(rename = "ricaSpouse")]
    pub spouse: Option<String>,
    #[serde(rename = "ricaChildren")]
    pub children: Option<String>,
    #[serde(rename = "ricaParents")]
    pub parents: Option<String>,
    #[serde(rename = "ricaRelative")]
    pub relative: Option<String>,
    #[serde(rename = "ricaLanguage")]
    pub language: String,
    #[serde(rename = "ricaReportedBy")]
    pub reported_by: Option<String>,
    #[serde(rename = "ricaOperator")]
    pub operator: String,
    #[serde(rename = "ricaRecordDate")]
    pub record_date: String,
    #[serde(rename = "ricaRecordTime")]
    pub record_time: String,
}

impl CanonicalRecord {
    /// Truncate every text column to its maximum stored length
    pub fn truncate_to_schema(&mut self) {
        fn clip(field: &mut Option<String>, max: usize) {
            if let Some(value) = field.as_mut() {
                if value.chars().count() > max {
                    *value = truncate_chars(value, max);
                }
            }
        }

        self.watchlist_id = truncate_chars(&self.watchlist_id, limits::WATCHLIST_ID);
        self.full_name = truncate_chars(&self.full_name, limits::FULL_NAME);
        self.source = truncate_chars(&self.source, limits::SOURCE);
        clip(&mut self.first_name, limits::NAME_PART);
        clip(&mut self.middle_name, limits::NAME_PART);
        clip(&mut self.surname, limits::NAME_PART);
        clip(&mut self.title, limits::TITLE);
        clip(&mut self.category, limits::CATEGORY);
        clip(&mut self.sub_category, limits::CATEGORY);
        clip(&mut self.description, limits::DESCRIPTION);
        clip(&mut self.nationality, limits::NATIONALITY);
        clip(&mut self.address, limits::ADDRESS);
        clip(&mut self.country, limits::COUNTRY);
        clip(&mut self.remarks, limits::REMARKS);
        clip(&mut self.reported_by, limits::CATEGORY);
        clip(&mut self.spouse, limits::RELATION_LIST);
        clip(&mut self.children, limits::RELATION_LIST);
        clip(&mut self.parents, limits::RELATION_LIST);
        clip(&mut self.relative, limits::RELATION_LIST);
    }
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for CanonicalRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let watch_type: Option<String> = row.try_get("watch_type")?;
        Ok(Self {
            watchlist_id: row.try_get("watchlist_id")?,
            full_name: row.try_get("full_name")?,
            first_name: row.try_get("first_name")?,
            middle_name: row.try_get("middle_name")?,
            surname: row.try_get("surname")?,
            title: row.try_get("title")?,
            watch_type: watch_type.as_deref().and_then(WatchType::parse),
            source: row.try_get("source")?,
            category: row.try_get("category")?,
            sub_category: row.try_get("sub_category")?,
            description: row.try_get("description")?,
            nationality: row.try_get("nationality")?,
            address: row.try_get("address")?,
            country: row.try_get("country")?,
            remarks: row.try_get("remarks")?,
            action_date: row.try_get("action_date")?,
            date_of_birth: row.try_get("date_of_birth")?,
            flag_date: row.try_get("flag_date")?,
            spouse: row.try_get("spouse")?,
            children: row.try_get("children")?,
            parents: row.try_get("parents")?,
            relative: row.try_get("relative")?,
            language: row.try_get("language")?,
            reported_by: row.try_get("reported_by")?,
            operator: row.try_get("operator")?,
            record_date: row.try_get("record_date")?,
            record_time: row.try_get("record_time")?,
        })
    }
}

/// Directed relationship between two canonical identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FamilyEdge {
    /// Record that receives the derived name list
    pub person_id: String,
    /// Counterpart whose full name is listed
    pub relative_id: String,
    /// Relationship label (`Spouse`, `Child/Parent`, `Parent/Child`, ...)
    pub relationship: Option<String>,
}
