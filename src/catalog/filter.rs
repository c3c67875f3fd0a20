//! Public catalog search.

// std
use std::collections::BTreeSet;
// self
use crate::{_prelude::*, catalog::BeerWithSizes};

/// Search box + style dropdown on the public beer list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
	/// Case-insensitive term matched against name, style, and description.
	pub search: Option<String>,
	/// Exact style to keep.
	pub style: Option<String>,
}
impl CatalogFilter {
	/// Filter matching a search term.
	pub fn search(term: impl Into<String>) -> Self {
		Self { search: Some(term.into()), style: None }
	}

	/// Restricts the filter to one style.
	pub fn with_style(mut self, style: impl Into<String>) -> Self {
		self.style = Some(style.into());

		self
	}

	/// Returns `true` when `entry` passes both criteria.
	pub fn matches(&self, entry: &BeerWithSizes) -> bool {
		let beer = &entry.beer;

		if self.style.as_deref().is_some_and(|style| !style.is_empty() && beer.style != style) {
			return false;
		}

		let Some(term) = self.search.as_deref().map(str::trim).filter(|term| !term.is_empty())
		else {
			return true;
		};
		let term = term.to_lowercase();

		[Some(beer.name.as_str()), Some(beer.style.as_str()), beer.description.as_deref()]
			.into_iter()
			.flatten()
			.any(|field| field.to_lowercase().contains(&term))
	}

	/// Keeps the entries that match, preserving order.
	pub fn apply(&self, entries: Vec<BeerWithSizes>) -> Vec<BeerWithSizes> {
		entries.into_iter().filter(|entry| self.matches(entry)).collect()
	}
}

/// Distinct styles present in `entries`, sorted.
pub fn beer_styles(entries: &[BeerWithSizes]) -> Vec<String> {
	entries
		.iter()
		.map(|entry| entry.beer.style.clone())
		.collect::<BTreeSet<_>>()
		.into_iter()
		.collect()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{auth::BeerId, catalog::Beer};

	fn entry(id: &str, name: &str, style: &str, description: Option<&str>) -> BeerWithSizes {
		let at = macros::datetime!(2025-01-01 00:00 UTC);

		BeerWithSizes {
			beer: Beer {
				id: BeerId::new(id).expect("Beer fixture should be valid."),
				name: name.into(),
				style: style.into(),
				abv: 5.0,
				description: description.map(str::to_owned),
				image_url: None,
				is_active: true,
				created_at: at,
				updated_at: at,
			},
			sizes: Vec::new(),
		}
	}

	fn catalog() -> Vec<BeerWithSizes> {
		vec![
			entry("b1", "Harbour Haze", "IPA", Some("Juicy and hazy.")),
			entry("b2", "Lighthouse Lager", "Lager", None),
			entry("b3", "Night Watch", "Stout", Some("Roasty with a hint of hops.")),
		]
	}

	fn names(entries: &[BeerWithSizes]) -> Vec<&str> {
		entries.iter().map(|entry| entry.beer.name.as_str()).collect()
	}

	#[test]
	fn search_covers_name_style_and_description() {
		assert_eq!(names(&CatalogFilter::search("LAGER").apply(catalog())), ["Lighthouse Lager"]);
		assert_eq!(names(&CatalogFilter::search("hop").apply(catalog())), ["Night Watch"]);
		assert_eq!(names(&CatalogFilter::search("ipa").apply(catalog())), ["Harbour Haze"]);
	}

	#[test]
	fn blank_criteria_keep_everything() {
		assert_eq!(CatalogFilter::default().apply(catalog()).len(), 3);
		assert_eq!(CatalogFilter::search("   ").with_style("").apply(catalog()).len(), 3);
	}

	#[test]
	fn style_is_an_exact_match() {
		let filter = CatalogFilter::search("h").with_style("Stout");

		assert_eq!(names(&filter.apply(catalog())), ["Night Watch"]);
		assert!(CatalogFilter::default().with_style("stout").apply(catalog()).is_empty());
	}

	#[test]
	fn styles_are_distinct_and_sorted() {
		let mut entries = catalog();

		entries.push(entry("b4", "Second Haze", "IPA", None));

		assert_eq!(beer_styles(&entries), ["IPA", "Lager", "Stout"]);
	}
}
