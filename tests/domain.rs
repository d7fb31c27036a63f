use glitch_export::domain::{Category, Credentials, ProjectListing};

#[test]
fn listing_parses_items() {
    let listing: ProjectListing = serde_json::from_str(
        r#"{"items":[{"id":"p1","domain":"proj-one","private":false},{"id":"p2"}],"hasMore":false}"#,
    )
    .unwrap();
    assert_eq!(listing.items.len(), 2);
    assert_eq!(listing.items[0].title(), "proj-one");
    assert_eq!(listing.items[1].title(), "p2");
}

#[test]
fn listing_without_items_is_empty() {
    let listing: ProjectListing = serde_json::from_str("{}").unwrap();
    assert!(listing.items.is_empty());
}

#[test]
fn odd_listing_items_do_not_sink_the_listing() {
    let listing: ProjectListing = serde_json::from_str(
        r#"{"items":[
            {"id":"p1","domain":"proj-one"},
            {"id":17,"domain":"numeric-id"},
            {"id":"p3","domain":42},
            {"id":null,"domain":"no-id"},
            {"domain":"missing-id"},
            "not an object",
            {"id":"p7","domain":null}
        ]}"#,
    )
    .unwrap();
    let titles: Vec<&str> = listing.items.iter().map(|p| p.title()).collect();
    assert_eq!(titles, ["proj-one", "numeric-id", "p3", "p7"]);
    assert_eq!(listing.items[1].id, "17");
}

#[test]
fn null_items_is_empty() {
    let listing: ProjectListing = serde_json::from_str(r#"{"items":null}"#).unwrap();
    assert!(listing.items.is_empty());
}

#[test]
fn category_paths() {
    assert_eq!(Category::Active.as_str(), "active");
    assert_eq!(Category::Archived.as_str(), "archived");
    assert_eq!(Category::Archived.listing_segment(), "deletedProjects");
}

#[test]
fn credentials_strip_quotes() {
    let creds = Credentials::new("42", "'a\"b'");
    assert_eq!(creds.token(), "ab");
}
