use crate::geo::distance_km;
use crate::models::{GeoPoint, Item, SearchFilters, SortOption, PROVINCE};
use crate::store::{Direction, Predicate, Query};

/// Collection holding item documents
pub const ITEMS: &str = "items";

/// Store-side ordering for a sort option.
///
/// The store cannot order by a derived distance, so `Distance` (and no
/// choice at all) fall back to newest first and are re-sorted after fetch.
pub fn sort_clause(sort_by: Option<SortOption>) -> (&'static str, Direction) {
    match sort_by {
        Some(SortOption::PriceLowToHigh) => ("price", Direction::Ascending),
        Some(SortOption::PriceHighToLow) => ("price", Direction::Descending),
        Some(SortOption::Rating) => ("rating", Direction::Descending),
        Some(SortOption::Newest) => ("createdAt", Direction::Descending),
        Some(SortOption::Oldest) => ("createdAt", Direction::Ascending),
        Some(SortOption::Popularity) => ("viewCount", Direction::Descending),
        Some(SortOption::Distance) | None => ("createdAt", Direction::Descending),
    }
}

/// Build the item query for one page of search results.
///
/// Predicates are appended in a fixed order: category, subcategory,
/// availability, price bounds, then the province pin. Filter values are not
/// validated here; the store decides what an inverted price range means.
pub fn build_search_query(filters: &SearchFilters, page: usize, page_size: usize) -> Query {
    let mut query = Query::new(ITEMS);

    if let Some(category) = filters.category {
        query = query.filter(Predicate::eq("category", category.as_str()));
    }
    if let Some(subcategory) = &filters.subcategory {
        query = query.filter(Predicate::eq("subcategory", subcategory.as_str()));
    }
    if let Some(available) = filters.availability {
        query = query.filter(Predicate::eq("isAvailable", available));
    }
    if let Some(range) = filters.price_range {
        query = query
            .filter(Predicate::gte("price", range.min))
            .filter(Predicate::lte("price", range.max));
    }
    query = query.filter(Predicate::eq("province", PROVINCE));

    let (field, direction) = sort_clause(filters.sort_by);
    query
        .order_by(field, direction)
        .limit(page_size)
        .offset(page.saturating_sub(1).saturating_mul(page_size))
}

/// Client-side distance pass: attach distances, sort by them when asked and
/// drop items outside the radius. Without an origin this returns `items` untouched.
pub fn apply_distance_pass(
    mut items: Vec<Item>,
    filters: &SearchFilters,
    origin: Option<GeoPoint>,
) -> Vec<Item> {
    let Some(origin) = origin.or(filters.location) else {
        return items;
    };
    let by_distance = filters.sort_by == Some(SortOption::Distance);
    // Zero (or NaN) means no radius; a negative radius excludes everything
    let radius = filters.radius.filter(|r| *r != 0.0 && !r.is_nan());
    if !by_distance && radius.is_none() {
        return items;
    }

    for item in &mut items {
        item.distance_km = Some(distance_km(origin, item.location));
    }

    if by_distance {
        // Stable, so equal distances keep the store's newest-first order
        items.sort_by(|a, b| {
            a.distance_km
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
        });
    }

    if let Some(radius) = radius {
        items.retain(|item| item.distance_km.is_some_and(|d| d <= radius));
    }

    items
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
