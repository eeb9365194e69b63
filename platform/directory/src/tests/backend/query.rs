use serde_json::json;

use crate::backend::{Filter, Query, Table};

#[test]
fn test_query_params() {
	let query = Query::new(Table::Updates)
		.eq("is_published", true)
		.order_desc("published_at")
		.limit(20)
		.with_startup();

	assert_eq!(
		query.to_params(),
		vec![
			("select".to_owned(), "*,startup:startups(*)".to_owned()),
			("is_published".to_owned(), "eq.true".to_owned()),
			("order".to_owned(), "published_at.desc".to_owned()),
			("limit".to_owned(), "20".to_owned()),
		]
	);

	let query = Query::new(Table::Startups).eq("slug", "acme");
	assert_eq!(
		query.to_params(),
		vec![
			("select".to_owned(), "*".to_owned()),
			("slug".to_owned(), "eq.acme".to_owned()),
		]
	);
}

#[test]
fn test_filter_matches() {
	let row = json!({ "slug": "acme", "is_public": true, "tagline": null });

	assert!(Filter::eq("slug", "acme").matches(&row));
	assert!(!Filter::eq("slug", "other").matches(&row));
	assert!(Filter::eq("is_public", true).matches(&row));
	assert!(Filter::eq("tagline", "null").matches(&row));
	assert!(Filter::eq("missing", "null").matches(&row));
}
