//! Beer catalog records, the storage contract behind them, and catalog queries.

pub mod filter;
pub mod inventory;

pub use filter::*;
pub use inventory::*;

// self
use crate::{
	_prelude::*,
	auth::{BeerId, SizeId},
};

/// Boxed future returned by [`CatalogStore`] calls.
pub type CatalogFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CatalogError>> + 'a + Send>>;

/// Row-level access to the `beers` and `beer_sizes` tables.
///
/// Implementations return rows unfiltered and in storage order; [`Inventory`] applies the
/// active-only filters and ordering.
pub trait CatalogStore
where
	Self: Send + Sync,
{
	/// Lists every beer row.
	fn list_beers(&self) -> CatalogFuture<'_, Vec<Beer>>;

	/// Lists every size row belonging to `beer`.
	fn list_sizes<'a>(&'a self, beer: &'a BeerId) -> CatalogFuture<'a, Vec<BeerSize>>;

	/// Fetches one beer row.
	fn fetch_beer<'a>(&'a self, id: &'a BeerId) -> CatalogFuture<'a, Option<Beer>>;

	/// Inserts a beer row and returns it with its generated id.
	fn insert_beer(&self, draft: BeerDraft, at: OffsetDateTime) -> CatalogFuture<'_, Beer>;

	/// Applies `patch` to a beer row and stamps `updated_at`.
	fn update_beer<'a>(
		&'a self,
		id: &'a BeerId,
		patch: BeerPatch,
		at: OffsetDateTime,
	) -> CatalogFuture<'a, Beer>;

	/// Inserts a size row.
	fn insert_size(&self, draft: SizeDraft, at: OffsetDateTime) -> CatalogFuture<'_, BeerSize>;

	/// Applies `patch` to a size row and stamps `updated_at`.
	fn update_size<'a>(
		&'a self,
		id: &'a SizeId,
		patch: SizePatch,
		at: OffsetDateTime,
	) -> CatalogFuture<'a, BeerSize>;
}

/// Errors produced by [`CatalogStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CatalogError {
	/// Referenced beer row does not exist.
	#[error("Beer {id} does not exist.")]
	BeerNotFound {
		/// Requested identifier.
		id: String,
	},
	/// Referenced size row does not exist.
	#[error("Size {id} does not exist.")]
	SizeNotFound {
		/// Requested identifier.
		id: String,
	},
	/// Backend-level failure.
	#[error("Catalog backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Row of the `beers` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Beer {
	/// Row identifier.
	pub id: BeerId,
	/// Display name.
	pub name: String,
	/// Style, e.g. "IPA".
	#[serde(rename = "type")]
	pub style: String,
	/// Alcohol by volume, in percent.
	pub abv: f64,
	/// Tasting notes.
	pub description: Option<String>,
	/// Label artwork.
	pub image_url: Option<String>,
	/// Soft-delete flag.
	pub is_active: bool,
	/// Row creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	/// Last modification instant.
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}

/// Row of the `beer_sizes` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeerSize {
	/// Row identifier.
	pub id: SizeId,
	/// Owning beer.
	pub beer_id: BeerId,
	/// Container label, e.g. "473ml Can".
	pub size_name: String,
	/// Unit price.
	pub price: f64,
	/// Units on hand.
	pub stock_quantity: u32,
	/// Soft-delete flag.
	pub is_active: bool,
	/// Row creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	/// Last modification instant.
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl BeerSize {
	/// Returns `true` when at least one unit is on hand.
	pub fn in_stock(&self) -> bool {
		self.stock_quantity > 0
	}

	/// `true` when some units remain but no more than `threshold`.
	pub fn is_low_stock(&self, threshold: u32) -> bool {
		self.in_stock() && self.stock_quantity <= threshold
	}
}

/// A beer together with its active sizes, cheapest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeerWithSizes {
	/// Beer row.
	#[serde(flatten)]
	pub beer: Beer,
	/// Active sizes sorted by ascending price.
	pub sizes: Vec<BeerSize>,
}
impl BeerWithSizes {
	/// Pairs `beer` with the active subset of `sizes`, sorted by price.
	pub fn assemble(beer: Beer, sizes: Vec<BeerSize>) -> Self {
		let mut sizes = sizes.into_iter().filter(|size| size.is_active).collect::<Vec<_>>();

		sizes.sort_by(|a, b| a.price.total_cmp(&b.price));

		Self { beer, sizes }
	}

	/// Lowest active price, if any size is listed.
	pub fn starting_price(&self) -> Option<f64> {
		self.sizes.first().map(|size| size.price)
	}
}

/// Values for a new beer row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeerDraft {
	/// Display name.
	pub name: String,
	/// Style.
	#[serde(rename = "type")]
	pub style: String,
	/// Alcohol by volume, in percent.
	pub abv: f64,
	/// Tasting notes.
	pub description: Option<String>,
	/// Label artwork.
	pub image_url: Option<String>,
}

/// Partial update for a beer row; `None` leaves a column untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BeerPatch {
	/// New name.
	pub name: Option<String>,
	/// New style.
	pub style: Option<String>,
	/// New ABV.
	pub abv: Option<f64>,
	/// New description; `Some(None)` clears it.
	pub description: Option<Option<String>>,
	/// New image URL; `Some(None)` clears it.
	pub image_url: Option<Option<String>>,
	/// New soft-delete flag.
	pub is_active: Option<bool>,
}
impl BeerPatch {
	/// Patch that overwrites every editable column from `draft`.
	pub fn from_draft(draft: BeerDraft) -> Self {
		Self {
			name: Some(draft.name),
			style: Some(draft.style),
			abv: Some(draft.abv),
			description: Some(draft.description),
			image_url: Some(draft.image_url),
			is_active: None,
		}
	}

	/// Applies the patch to `beer`.
	pub fn apply(self, beer: &mut Beer) {
		if let Some(name) = self.name {
			beer.name = name;
		}
		if let Some(style) = self.style {
			beer.style = style;
		}
		if let Some(abv) = self.abv {
			beer.abv = abv;
		}
		if let Some(description) = self.description {
			beer.description = description;
		}
		if let Some(image_url) = self.image_url {
			beer.image_url = image_url;
		}
		if let Some(is_active) = self.is_active {
			beer.is_active = is_active;
		}
	}
}

/// Values for a new size row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeDraft {
	/// Owning beer.
	pub beer_id: BeerId,
	/// Container label.
	pub size_name: String,
	/// Unit price.
	pub price: f64,
	/// Units on hand.
	pub stock_quantity: u32,
}

/// Partial update for a size row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SizePatch {
	/// New container label.
	pub size_name: Option<String>,
	/// New price.
	pub price: Option<f64>,
	/// New stock level.
	pub stock_quantity: Option<u32>,
	/// New soft-delete flag.
	pub is_active: Option<bool>,
}
impl SizePatch {
	/// Applies the patch to `size`.
	pub fn apply(self, size: &mut BeerSize) {
		if let Some(size_name) = self.size_name {
			size.size_name = size_name;
		}
		if let Some(price) = self.price {
			size.price = price;
		}
		if let Some(stock_quantity) = self.stock_quantity {
			size.stock_quantity = stock_quantity;
		}
		if let Some(is_active) = self.is_active {
			size.is_active = is_active;
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn size(id: &str, price: f64, is_active: bool) -> BeerSize {
		let at = macros::datetime!(2025-01-01 00:00 UTC);

		BeerSize {
			id: SizeId::new(id).expect("Size fixture should be valid."),
			beer_id: BeerId::new("beer_1").expect("Beer fixture should be valid."),
			size_name: id.into(),
			price,
			stock_quantity: 3,
			is_active,
			created_at: at,
			updated_at: at,
		}
	}

	fn beer() -> Beer {
		let at = macros::datetime!(2025-01-01 00:00 UTC);

		Beer {
			id: BeerId::new("beer_1").expect("Beer fixture should be valid."),
			name: "Lighthouse Lager".into(),
			style: "Lager".into(),
			abv: 4.8,
			description: None,
			image_url: None,
			is_active: true,
			created_at: at,
			updated_at: at,
		}
	}

	#[test]
	fn assemble_keeps_active_sizes_cheapest_first() {
		let assembled = BeerWithSizes::assemble(
			beer(),
			vec![size("growler", 18.5, true), size("can", 4.25, true), size("keg", 1.0, false)],
		);
		let names = assembled.sizes.iter().map(|size| size.size_name.as_str()).collect::<Vec<_>>();

		assert_eq!(names, ["can", "growler"]);
		assert_eq!(assembled.starting_price(), Some(4.25));
	}

	#[test]
	fn low_stock_excludes_empty_and_well_stocked_sizes() {
		let levels = [0, 1, 5, 6]
			.map(|stock_quantity| BeerSize { stock_quantity, ..size("pint", 6.5, true) })
			.map(|size| size.is_low_stock(5));

		assert_eq!(levels, [false, true, true, false]);
	}

	#[test]
	fn patches_touch_only_provided_columns() {
		let mut row = beer();

		BeerPatch { description: Some(Some("Crisp.".into())), ..Default::default() }.apply(&mut row);

		assert_eq!(row.name, "Lighthouse Lager");
		assert_eq!(row.description.as_deref(), Some("Crisp."));

		BeerPatch { description: Some(None), is_active: Some(false), ..Default::default() }
			.apply(&mut row);

		assert_eq!(row.description, None);
		assert!(!row.is_active);
	}

	#[test]
	fn beer_rows_use_the_type_column() {
		let row = serde_json::to_value(beer()).expect("Beer rows should serialize.");

		assert_eq!(row["type"], "Lager");
		assert!(row.get("style").is_none());
	}
}
