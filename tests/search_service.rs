//! Integration tests for `ItemQueryService` against the in-memory store.
//!
//! Each test seeds a fresh `MemoryStore` with item documents, runs the service
//! operation and checks the returned view models and the issued queries.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rental_scout::models::{
    GeoPoint, Item, ItemCategory, ItemUpdate, NewItem, PriceRange, PriceType, SearchFilters,
    SortOption, PROVINCE,
};
use rental_scout::search::{item_fields, ItemQueryService, ITEMS};
use rental_scout::store::{DocumentStore, FieldValue, MemoryStore, Predicate};
use rental_scout::ItemError;

const ORIGIN: GeoPoint = GeoPoint {
    latitude: 7.0,
    longitude: 125.0,
};

fn item(id: &str, category: ItemCategory, price: f64) -> Item {
    Item {
        id: id.to_owned(),
        title: format!("Listing {id}"),
        description: "Well kept".to_owned(),
        category,
        subcategory: None,
        price,
        price_type: PriceType::PerDay,
        images: Vec::new(),
        location: ORIGIN,
        address: "Poblacion".to_owned(),
        city: "Davao City".to_owned(),
        province: PROVINCE.to_owned(),
        lessor_id: "lessor-1".to_owned(),
        is_available: true,
        is_verified: false,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        updated_at: None,
        tags: Vec::new(),
        specifications: None,
        deposit: None,
        minimum_rental_period: None,
        maximum_rental_period: None,
        rating: 0.0,
        total_reviews: 0,
        view_count: 0,
        distance_km: None,
    }
}

fn seed(items: &[Item]) -> (Arc<MemoryStore>, ItemQueryService) {
    let store = Arc::new(MemoryStore::new());
    for item in items {
        store
            .insert(ITEMS, &item.id, item_fields(item).unwrap())
            .unwrap();
    }
    let service = ItemQueryService::new(store.clone());
    (store, service)
}

/// 3 electronics priced 60/90/500 and 2 tools priced 80/100
fn marketplace() -> Vec<Item> {
    vec![
        item("e1", ItemCategory::Electronics, 500.0),
        item("e2", ItemCategory::Electronics, 90.0),
        item("e3", ItemCategory::Electronics, 60.0),
        item("t1", ItemCategory::Tools, 80.0),
        item("t2", ItemCategory::Tools, 100.0),
    ]
}

fn ids(items: &[Item]) -> Vec<&str> {
    items.iter().map(|i| i.id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn electronics_in_price_range_sorted_low_to_high() {
    let (_, service) = seed(&marketplace());
    let filters = SearchFilters {
        category: Some(ItemCategory::Electronics),
        price_range: Some(PriceRange {
            min: 50.0,
            max: 200.0,
        }),
        sort_by: Some(SortOption::PriceLowToHigh),
        ..SearchFilters::default()
    };

    let results = service.search(&filters, None, 1, 20).await.unwrap();

    assert_eq!(ids(&results.items), vec!["e3", "e2"]);
    let prices: Vec<f64> = results.items.iter().map(|i| i.price).collect();
    assert_eq!(prices, vec![60.0, 90.0]);
    assert_eq!(results.total, 2);
}

#[tokio::test]
async fn category_filter_never_widens_results() {
    let (_, service) = seed(&marketplace());
    let filters = SearchFilters {
        category: Some(ItemCategory::Tools),
        ..SearchFilters::default()
    };

    let results = service.search(&filters, None, 1, 20).await.unwrap();

    assert_eq!(results.total, 2);
    assert!(results
        .items
        .iter()
        .all(|i| i.category == ItemCategory::Tools));
}

#[tokio::test]
async fn every_query_is_pinned_to_the_province() {
    let mut outside = item("x1", ItemCategory::Tools, 10.0);
    outside.province = "Cebu".to_owned();
    let mut items = marketplace();
    items.push(outside);
    let (store, service) = seed(&items);

    let results = service
        .search(&SearchFilters::default(), None, 1, 20)
        .await
        .unwrap();
    service
        .search(
            &SearchFilters {
                category: Some(ItemCategory::Tools),
                availability: Some(true),
                ..SearchFilters::default()
            },
            Some(ORIGIN),
            2,
            5,
        )
        .await
        .unwrap();

    assert!(!ids(&results.items).contains(&"x1"));
    let province = Predicate::eq("province", PROVINCE);
    let issued = store.issued_queries();
    assert_eq!(issued.len(), 2);
    assert!(issued.iter().all(|q| q.predicates.contains(&province)));
}

#[tokio::test]
async fn store_side_sort_orders_are_monotonic() {
    let mut items = marketplace();
    for (n, item) in items.iter_mut().enumerate() {
        item.rating = [4.5, 3.0, 5.0, 1.0, 2.5][n];
        item.view_count = [10, 50, 0, 7, 3][n];
        item.created_at += Duration::days([3, 1, 4, 0, 2][n]);
    }
    let (_, service) = seed(&items);

    let search = |sort_by| {
        let service = service.clone();
        async move {
            let filters = SearchFilters {
                sort_by: Some(sort_by),
                ..SearchFilters::default()
            };
            service.search(&filters, None, 1, 20).await.unwrap().items
        }
    };

    let by_price = search(SortOption::PriceHighToLow).await;
    assert!(by_price.windows(2).all(|w| w[0].price >= w[1].price));

    let by_rating = search(SortOption::Rating).await;
    assert!(by_rating.windows(2).all(|w| w[0].rating >= w[1].rating));

    let by_views = search(SortOption::Popularity).await;
    assert!(by_views.windows(2).all(|w| w[0].view_count >= w[1].view_count));

    let newest = search(SortOption::Newest).await;
    assert!(newest.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let oldest = search(SortOption::Oldest).await;
    assert!(oldest.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    assert_eq!(oldest.len(), 5);
}

#[tokio::test]
async fn radius_keeps_only_nearby_items() {
    let mut near = item("near", ItemCategory::Tools, 80.0);
    near.location = GeoPoint::new(7.027, 125.0); // ~3 km
    let mut far = item("far", ItemCategory::Tools, 90.0);
    far.location = GeoPoint::new(7.072, 125.0); // ~8 km
    let (_, service) = seed(&[near, far]);

    let filters = SearchFilters {
        radius: Some(5.0),
        ..SearchFilters::default()
    };
    let results = service.search(&filters, Some(ORIGIN), 1, 20).await.unwrap();

    assert_eq!(ids(&results.items), vec!["near"]);
    assert_eq!(results.total, 1);
    assert!(results.items[0].distance_km.unwrap() <= 5.0);
}

#[tokio::test]
async fn distance_sort_without_origin_keeps_store_order() {
    let mut a = item("a", ItemCategory::Tools, 80.0);
    a.location = GeoPoint::new(8.0, 125.0);
    a.created_at += Duration::days(1);
    let b = item("b", ItemCategory::Tools, 90.0);
    let (_, service) = seed(&[a, b]);

    let filters = SearchFilters {
        sort_by: Some(SortOption::Distance),
        radius: Some(1.0),
        ..SearchFilters::default()
    };
    let results = service.search(&filters, None, 1, 20).await.unwrap();

    // Newest first, nothing dropped
    assert_eq!(ids(&results.items), vec!["a", "b"]);
}

#[tokio::test]
async fn distance_sort_with_origin_orders_nearest_first() {
    let mut a = item("a", ItemCategory::Tools, 80.0);
    a.location = GeoPoint::new(7.5, 125.0);
    let mut b = item("b", ItemCategory::Tools, 90.0);
    b.location = GeoPoint::new(7.1, 125.0);
    let (_, service) = seed(&[a, b]);

    let filters = SearchFilters {
        sort_by: Some(SortOption::Distance),
        ..SearchFilters::default()
    };
    let results = service.search(&filters, Some(ORIGIN), 1, 20).await.unwrap();

    assert_eq!(ids(&results.items), vec!["b", "a"]);
}

#[tokio::test]
async fn second_page_skips_first_page_records() {
    let (_, service) = seed(&marketplace());
    let filters = SearchFilters {
        sort_by: Some(SortOption::PriceLowToHigh),
        ..SearchFilters::default()
    };

    let first = service.search(&filters, None, 1, 2).await.unwrap();
    let second = service.search(&filters, None, 2, 2).await.unwrap();
    let third = service.search(&filters, None, 3, 2).await.unwrap();

    assert_eq!(ids(&first.items), vec!["e3", "t1"]);
    assert_eq!(ids(&second.items), vec!["e2", "t2"]);
    assert_eq!(ids(&third.items), vec!["e1"]);
    assert!(third.next_cursor.is_none());
}

#[tokio::test]
async fn search_after_follows_the_cursor_chain() {
    let (_, service) = seed(&marketplace());
    let filters = SearchFilters {
        sort_by: Some(SortOption::PriceHighToLow),
        ..SearchFilters::default()
    };

    let mut seen = Vec::new();
    let mut page = service.search(&filters, None, 1, 2).await.unwrap();
    loop {
        seen.extend(page.items.iter().map(|i| i.id.clone()));
        match page.next_cursor.take() {
            Some(cursor) => {
                page = service
                    .search_after(&filters, None, cursor, 2)
                    .await
                    .unwrap();
            }
            None => break,
        }
    }

    assert_eq!(seen, vec!["e1", "t2", "e2", "t1", "e3"]);
}

#[tokio::test]
async fn store_failure_surfaces_with_its_message() {
    let (store, service) = seed(&marketplace());
    store.fail_with("quota exceeded");

    let err = service
        .search(&SearchFilters::default(), None, 1, 20)
        .await
        .unwrap_err();

    assert!(matches!(err, ItemError::Store(_)));
    assert_eq!(err.to_string(), "quota exceeded");
}

// ---------------------------------------------------------------------------
// increment_view_count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn increment_view_count_bumps_the_counter() {
    let (store, service) = seed(&marketplace());

    service.increment_view_count("t1").await;
    service.increment_view_count("t1").await;

    let snapshot = store.get(ITEMS, "t1").await.unwrap().unwrap();
    assert_eq!(snapshot.get("viewCount"), Some(&FieldValue::Integer(2)));
}

#[tokio::test]
async fn increment_view_count_swallows_store_failures() {
    let (store, service) = seed(&marketplace());
    store.fail_with("permission denied");

    // Returns unit: nothing for the caller to observe
    service.increment_view_count("t1").await;
    service.increment_view_count("does-not-exist").await;
}

// ---------------------------------------------------------------------------
// item reads and writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_item_returns_none_for_missing_documents() {
    let (_, service) = seed(&marketplace());

    assert!(service.get_item("nope").await.unwrap().is_none());
    let found = service.get_item("e2").await.unwrap().unwrap();
    assert_eq!(found.location, ORIGIN);
    assert_eq!(found.price, 90.0);
}

#[tokio::test]
async fn items_by_category_returns_only_available_ones() {
    let mut rented = item("t3", ItemCategory::Tools, 70.0);
    rented.is_available = false;
    let mut items = marketplace();
    items.push(rented);
    let (_, service) = seed(&items);

    let tools = service
        .items_by_category(ItemCategory::Tools)
        .await
        .unwrap();

    let mut found = ids(&tools);
    found.sort_unstable();
    assert_eq!(found, vec!["t1", "t2"]);
}

#[tokio::test]
async fn items_by_lessor_lists_newest_first() {
    let mut older = item("o", ItemCategory::Tools, 1.0);
    older.lessor_id = "lessor-2".to_owned();
    let mut newer = item("n", ItemCategory::Tools, 1.0);
    newer.lessor_id = "lessor-2".to_owned();
    newer.created_at += Duration::days(2);
    let mut items = marketplace();
    items.extend([older, newer]);
    let (_, service) = seed(&items);

    let listed = service.items_by_lessor("lessor-2").await.unwrap();
    assert_eq!(ids(&listed), vec!["n", "o"]);
}

fn new_listing() -> NewItem {
    NewItem {
        title: "Karaoke set".to_owned(),
        description: "Two mics and speaker".to_owned(),
        category: ItemCategory::PartyEquipment,
        subcategory: Some("audio".to_owned()),
        price: 1200.0,
        price_type: PriceType::PerDay,
        images: Vec::new(),
        location: GeoPoint::new(7.07, 125.61),
        address: "Matina".to_owned(),
        city: "Davao City".to_owned(),
        tags: vec!["party".to_owned()],
        specifications: None,
        deposit: Some(2000.0),
        minimum_rental_period: Some(1),
        maximum_rental_period: Some(3),
    }
}

#[tokio::test]
async fn created_item_is_searchable() {
    let (_, service) = seed(&[]);

    let created = service.create_item(&new_listing(), "lessor-9").await.unwrap();
    assert_eq!(created.province, PROVINCE);
    assert!(created.is_available);
    assert_eq!(created.view_count, 0);

    let filters = SearchFilters {
        category: Some(ItemCategory::PartyEquipment),
        subcategory: Some("audio".to_owned()),
        ..SearchFilters::default()
    };
    let results = service.search(&filters, None, 1, 20).await.unwrap();
    assert_eq!(ids(&results.items), vec![created.id.as_str()]);
}

#[tokio::test]
async fn only_the_owner_may_update_or_delete() {
    let (_, service) = seed(&marketplace());
    let update = ItemUpdate {
        price: Some(75.0),
        location: Some(GeoPoint::new(7.2, 125.4)),
        ..ItemUpdate::default()
    };

    let err = service.update_item("t1", &update, "intruder").await.unwrap_err();
    assert!(matches!(err, ItemError::NotAuthorized { .. }));
    let err = service.delete_item("t1", "intruder").await.unwrap_err();
    assert!(matches!(err, ItemError::NotAuthorized { .. }));

    let updated = service.update_item("t1", &update, "lessor-1").await.unwrap();
    assert_eq!(updated.price, 75.0);
    assert_eq!(updated.location, GeoPoint::new(7.2, 125.4));
    assert!(updated.updated_at.is_some());

    service.delete_item("t1", "lessor-1").await.unwrap();
    assert!(service.get_item("t1").await.unwrap().is_none());
}

#[tokio::test]
async fn updating_a_missing_item_is_not_found() {
    let (_, service) = seed(&marketplace());

    let err = service
        .update_item("ghost", &ItemUpdate::default(), "lessor-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ItemError::NotFound(ref id) if id == "ghost"));
}

#[tokio::test]
async fn bundled_seed_file_loads_and_searches() {
    let items: Vec<Item> =
        serde_json::from_str(include_str!("../data/seed_items.json")).unwrap();
    let (_, service) = seed(&items);

    let filters = SearchFilters {
        category: Some(ItemCategory::Electronics),
        sort_by: Some(SortOption::Popularity),
        ..SearchFilters::default()
    };
    let results = service.search(&filters, None, 1, 20).await.unwrap();

    assert_eq!(
        ids(&results.items),
        vec!["itm-camera-01", "itm-projector-02"]
    );
}

#[tokio::test]
async fn negative_radius_returns_an_empty_page() {
    let mut near = item("near", ItemCategory::Tools, 80.0);
    near.location = GeoPoint::new(7.03, 125.0);
    let mut far = item("far", ItemCategory::Tools, 90.0);
    far.location = GeoPoint::new(7.08, 125.0);
    let (_, service) = seed(&[near, far]);

    let filters = SearchFilters {
        radius: Some(-1.0),
        ..SearchFilters::default()
    };
    let results = service.search(&filters, Some(ORIGIN), 1, 20).await.unwrap();

    assert!(results.items.is_empty());
    assert_eq!(results.total, 0);
}

#[tokio::test]
async fn page_far_beyond_the_end_is_empty() {
    let (_, service) = seed(&marketplace());

    let results = service
        .search(&SearchFilters::default(), None, usize::MAX, 20)
        .await
        .unwrap();

    assert!(results.items.is_empty());
    assert!(results.next_cursor.is_none());
}
