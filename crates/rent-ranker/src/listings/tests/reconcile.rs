use serde_json::json;

use super::common::*;
use crate::listings::domain::{GroupTag, ListingId, Rating};
use crate::listings::reconcile::{IssueKind, ListingField, ListingPatch};

fn patch(payload: serde_json::Value) -> ListingPatch {
    ListingPatch::from_value(payload).expect("patch parses")
}

fn stored_listing() -> crate::listings::Listing {
    let mut listing = listing(7);
    listing.price = Some(1500.0);
    listing.square_footage = Some(750);
    listing.bedrooms = Some(2.0);
    listing.utility_estimate = Some(100.0);
    listing.occupant_count = 2;
    listing.refresh_metrics();
    listing
}

#[test]
fn blank_price_leaves_value_unchanged() {
    let current = stored_listing();

    for value in [json!(""), json!(null), json!("   ")] {
        let outcome = patch(json!({"id": 7, "price": value})).apply(&current);
        assert_eq!(outcome.listing.price, Some(1500.0));
        assert!(outcome.changed.is_empty());
        assert!(outcome.issues.is_empty());
    }
}

#[test]
fn explicit_zero_is_a_value() {
    let current = stored_listing();

    let outcome = patch(json!({"id": 7, "utility_estimate": 0})).apply(&current);

    assert_eq!(outcome.listing.utility_estimate, Some(0.0));
    assert!(outcome.changed.contains(&ListingField::UtilityEstimate));
    assert_eq!(outcome.listing.metrics.cost_per_occupant, Some(750.0));
}

#[test]
fn out_of_range_rating_resets_while_other_fields_apply() {
    let mut current = stored_listing();
    current.overall_rating = Rating::new(8).expect("valid rating");

    let outcome = patch(json!({
        "id": 7,
        "overall_rating": 15,
        "comments": "Great light",
    }))
    .apply(&current);

    assert_eq!(outcome.listing.overall_rating, Rating::DEFAULT);
    assert_eq!(outcome.listing.comments, "Great light");
    assert!(outcome.changed.contains(&ListingField::OverallRating));
    assert!(outcome.changed.contains(&ListingField::Comments));
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].kind, IssueKind::RatingReset);
}

#[test]
fn unparseable_and_negative_numbers_are_field_local() {
    let current = stored_listing();

    let outcome = patch(json!({
        "id": 7,
        "price": "call for pricing",
        "bedrooms": -1,
        "bathrooms": "1.5",
    }))
    .apply(&current);

    assert_eq!(outcome.listing.price, Some(1500.0));
    assert_eq!(outcome.listing.bedrooms, Some(2.0));
    assert_eq!(outcome.listing.bathrooms, Some(1.5));
    assert_eq!(
        outcome.changed.iter().copied().collect::<Vec<_>>(),
        vec![ListingField::Bathrooms]
    );

    let kinds: Vec<(String, IssueKind)> = outcome
        .issues
        .iter()
        .map(|issue| (issue.field.clone(), issue.kind))
        .collect();
    assert!(kinds.contains(&("price".to_string(), IssueKind::Unparseable)));
    assert!(kinds.contains(&("bedrooms".to_string(), IssueKind::Negative)));
}

#[test]
fn integer_fields_truncate_and_refresh_metrics() {
    let current = stored_listing();

    let outcome = patch(json!({
        "id": 7,
        "square_footage": "1,000.8",
        "roommates": 3.9,
    }))
    .apply(&current);

    assert_eq!(outcome.listing.square_footage, Some(1000));
    assert_eq!(outcome.listing.occupant_count, 3);
    assert_eq!(outcome.listing.metrics.cost_per_sqft, Some(1.5));
    assert_eq!(outcome.listing.metrics.cost_per_occupant, Some(1600.0 / 3.0));
}

#[test]
fn invalid_group_is_rejected_for_that_field_only() {
    let current = stored_listing();

    let outcome = patch(json!({"id": 7, "group": "orange", "contacted": true})).apply(&current);

    assert_eq!(outcome.listing.group, GroupTag::Unassigned);
    assert!(outcome.listing.contacted);
    assert_eq!(outcome.issues[0].kind, IssueKind::InvalidGroup);
}

#[test]
fn image_is_replaced_and_cleared() {
    let current = stored_listing();

    let with_image = patch(json!({
        "id": 7,
        "new_image_base64": "data:image/jpeg;base64,aGVsbG8=",
    }))
    .apply(&current);
    let image = with_image.listing.image.as_ref().expect("image stored");
    assert_eq!(image.media_type(), "image/jpeg");
    assert_eq!(image.bytes(), b"hello");

    let replaced = patch(json!({"id": 7, "image": "data:image/png;base64,d29ybGQ="}))
        .apply(&with_image.listing);
    assert_eq!(
        replaced.listing.image.as_ref().map(|image| image.bytes().to_vec()),
        Some(b"world".to_vec())
    );

    let cleared = patch(json!({"id": 7, "image": null})).apply(&replaced.listing);
    assert!(cleared.listing.image.is_none());
    assert!(cleared.changed.contains(&ListingField::Image));
}

#[test]
fn malformed_image_keeps_previous_image() {
    let current = patch(json!({"id": 7, "image": "data:image/png;base64,aGVsbG8="}))
        .apply(&stored_listing())
        .listing;

    let outcome = patch(json!({"id": 7, "image": "not an image"})).apply(&current);

    assert_eq!(outcome.listing.image, current.image);
    assert_eq!(outcome.issues[0].kind, IssueKind::InvalidImage);
}

#[test]
fn derived_and_unknown_keys_are_reported() {
    let current = stored_listing();

    let outcome = patch(json!({
        "id": 7,
        "score": 0.99,
        "cost_per_sqft": 1.0,
        "parking": "garage",
    }))
    .apply(&current);

    assert!(outcome.changed.is_empty());
    assert_eq!(outcome.listing.score, current.score);
    let kinds: Vec<IssueKind> = outcome.issues.iter().map(|issue| issue.kind).collect();
    assert_eq!(
        kinds,
        vec![IssueKind::ReadOnly, IssueKind::UnknownField, IssueKind::ReadOnly]
    );
}

#[test]
fn text_fields_follow_replace_and_clear_rules() {
    let mut current = stored_listing();
    current.url = Some("https://example.com/7".to_string());
    current.comments = "call back".to_string();

    let outcome = patch(json!({
        "id": 7,
        "url": "",
        "comments": null,
        "date_available": "June 1, 2025",
        "address": "   ",
        "applied": "true",
    }))
    .apply(&current);

    assert_eq!(outcome.listing.url, None);
    assert_eq!(outcome.listing.comments, "");
    assert_eq!(outcome.listing.date_available.as_deref(), Some("June 1, 2025"));
    assert_eq!(outcome.listing.address, current.address);
    assert!(outcome.listing.applied);
    assert_eq!(outcome.issues[0].kind, IssueKind::EmptyAddress);
}

#[test]
fn identifier_is_never_rewritten() {
    let current = stored_listing();

    let outcome = patch(json!({"id": "7", "price": 1600})).apply(&current);

    assert_eq!(outcome.listing.id, ListingId(7));
    assert_eq!(outcome.listing.price, Some(1600.0));
}

#[test]
fn creation_applies_the_same_rules_to_a_blank_listing() {
    let outcome = draft(json!({
        "address": " 12 Elm St ",
        "price": "$1,250",
        "overall_rating": "eleven",
        "roommates": 0,
    }))
    .build()
    .expect("draft builds");

    assert_eq!(outcome.listing.address, "12 Elm St");
    assert_eq!(outcome.listing.overall_rating, Rating::DEFAULT);
    assert_eq!(outcome.listing.occupant_count, 0);
    assert_eq!(outcome.listing.metrics.cost_per_occupant, Some(1250.0));
    assert_eq!(outcome.issues[0].kind, IssueKind::RatingReset);
}
