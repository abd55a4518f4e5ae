//! Shared column list and binding for canonical-shaped rows
//!
//! `watchlist` and `watchlist_staging` carry identical record columns.

use once_cell::sync::Lazy;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use watchlist_common::models::{limits, truncate_chars};
use watchlist_common::CanonicalRecord;

use crate::models::FamilyFields;

pub(crate) const RECORD_COLUMNS: [&str; 27] = [
    "watchlist_id",
    "full_name",
    "first_name",
    "middle_name",
    "surname",
    "title",
    "watch_type",
    "source",
    "category",
    "sub_category",
    "description",
    "nationality",
    "address",
    "country",
    "remarks",
    "action_date",
    "date_of_birth",
    "flag_date",
    "spouse",
    "children",
    "parents",
    "relative",
    "language",
    "reported_by",
    "operator",
    "record_date",
    "record_time",
];

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub(crate) static INSERT_CANONICAL: Lazy<String> = Lazy::new(|| {
    format!(
        "INSERT INTO watchlist ({}) VALUES ({}) ON CONFLICT(watchlist_id) DO NOTHING",
        RECORD_COLUMNS.join(", "),
        placeholders(RECORD_COLUMNS.len())
    )
});

pub(crate) static INSERT_STAGING: Lazy<String> = Lazy::new(|| {
    format!(
        "INSERT OR REPLACE INTO watchlist_staging ({}, cycle_id) VALUES ({})",
        RECORD_COLUMNS.join(", "),
        placeholders(RECORD_COLUMNS.len() + 1)
    )
});

/// Bind every record column in `RECORD_COLUMNS` order
pub(crate) fn bind_record<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    r: &'q CanonicalRecord,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(r.watchlist_id.as_str())
        .bind(r.full_name.as_str())
        .bind(r.first_name.as_deref())
        .bind(r.middle_name.as_deref())
        .bind(r.surname.as_deref())
        .bind(r.title.as_deref())
        .bind(r.watch_type.map(|w| w.as_str()))
        .bind(r.source.as_str())
        .bind(r.category.as_deref())
        .bind(r.sub_category.as_deref())
        .bind(r.description.as_deref())
        .bind(r.nationality.as_deref())
        .bind(r.address.as_deref())
        .bind(r.country.as_deref())
        .bind(r.remarks.as_deref())
        .bind(r.action_date)
        .bind(r.date_of_birth)
        .bind(r.flag_date)
        .bind(r.spouse.as_deref())
        .bind(r.children.as_deref())
        .bind(r.parents.as_deref())
        .bind(r.relative.as_deref())
        .bind(r.language.as_str())
        .bind(r.reported_by.as_deref())
        .bind(r.operator.as_str())
        .bind(r.record_date.as_str())
        .bind(r.record_time.as_str())
}

/// Relationship lists clipped to their column width
pub(crate) fn clipped_family(fields: &FamilyFields) -> [Option<String>; 4] {
    let clip = |v: &Option<String>| v.as_deref().map(|s| truncate_chars(s, limits::RELATION_LIST));
    [
        clip(&fields.spouse),
        clip(&fields.children),
        clip(&fields.parents),
        clip(&fields.relative),
    ]
}
