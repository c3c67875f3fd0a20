//! Catalog reads for the public pages and admin-gated catalog edits.
//!
//! Reads are open to everyone and only ever return active rows (except [`Inventory::beer`], which
//! also serves the editor). Every write, and the admin [`Inventory::dashboard`], first checks the
//! caller's [`Session`] against [`Requirement::Admin`]; writes then validate their input before
//! reaching the [`CatalogStore`].

// self
use crate::{
	_prelude::*,
	auth::{BeerId, SizeId},
	catalog::{
		Beer, BeerDraft, BeerPatch, BeerSize, BeerWithSizes, CatalogStore, SizeDraft, SizePatch,
	},
	config::Settings,
	gate::{self, Requirement},
	obs::{self, OpKind, OpOutcome, OpSpan},
	session::Session,
};

/// One row of the size table in the beer editor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeRow {
	/// Existing size being edited; `None` for a new row.
	pub id: Option<SizeId>,
	/// Container label.
	pub size_name: String,
	/// Unit price.
	pub price: f64,
	/// Units on hand.
	pub stock_quantity: u32,
}
impl SizeRow {
	/// Rows without a name or a positive price are left blank in the editor and are not saved.
	pub fn is_listed(&self) -> bool {
		!self.size_name.trim().is_empty() && self.price > 0.0
	}
}

/// Submission of the beer editor: the beer plus its size rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeerForm {
	/// Beer being edited; `None` creates a new one.
	pub id: Option<BeerId>,
	/// Beer columns.
	pub beer: BeerDraft,
	/// Size rows in editor order.
	pub sizes: Vec<SizeRow>,
}

/// Stock overview shown on the admin dashboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
	/// Active beers.
	pub total_beers: usize,
	/// Active sizes across all active beers.
	pub total_sizes: usize,
	/// Sizes still in stock but at or below [`Settings::low_stock_threshold`].
	pub low_stock_sizes: usize,
	/// Sizes with nothing on hand.
	pub out_of_stock_sizes: usize,
	/// Leading entries of [`Inventory::active_beers`], sized by [`Settings::recent_count`].
	pub recent: Vec<BeerWithSizes>,
}
impl DashboardStats {
	fn tally(mut beers: Vec<BeerWithSizes>, low_stock_threshold: u32, recent_count: usize) -> Self {
		let sizes = beers.iter().flat_map(|entry| &entry.sizes);
		let total_sizes = sizes.clone().count();
		let low_stock_sizes =
			sizes.clone().filter(|size| size.is_low_stock(low_stock_threshold)).count();
		let out_of_stock_sizes = sizes.filter(|size| !size.in_stock()).count();
		let total_beers = beers.len();

		beers.truncate(recent_count);

		Self { total_beers, total_sizes, low_stock_sizes, out_of_stock_sizes, recent: beers }
	}
}

/// Catalog service shared by the public pages and the inventory editor.
pub struct Inventory {
	store: Arc<dyn CatalogStore>,
	settings: Settings,
}
impl Inventory {
	/// Creates the service over `store`.
	pub fn new(store: Arc<dyn CatalogStore>, settings: Settings) -> Self {
		Self { store, settings }
	}

	/// Settings the service validates against.
	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Active beers ordered by name, each with its active sizes cheapest first.
	pub async fn active_beers(&self) -> Result<Vec<BeerWithSizes>> {
		let mut beers =
			self.store.list_beers().await?.into_iter().filter(|beer| beer.is_active).collect::<Vec<_>>();

		beers.sort_by(|a, b| a.name.cmp(&b.name));

		let mut entries = Vec::with_capacity(beers.len());

		for beer in beers {
			entries.push(self.with_sizes(beer).await?);
		}

		Ok(entries)
	}

	/// One beer with its active sizes, whether or not the beer itself is active.
	pub async fn beer(&self, id: &BeerId) -> Result<Option<BeerWithSizes>> {
		match self.store.fetch_beer(id).await? {
			Some(beer) => Ok(Some(self.with_sizes(beer).await?)),
			None => Ok(None),
		}
	}

	/// The first `count` entries of [`Inventory::active_beers`].
	pub async fn featured(&self, count: usize) -> Result<Vec<BeerWithSizes>> {
		let mut entries = self.active_beers().await?;

		entries.truncate(count);

		Ok(entries)
	}

	/// Landing-page selection sized by [`Settings::featured_count`].
	pub async fn home_page(&self) -> Result<Vec<BeerWithSizes>> {
		self.featured(self.settings.featured_count).await
	}

	/// Stock counters for the admin dashboard.
	pub async fn dashboard(&self, session: &Session) -> Result<DashboardStats> {
		self.admin_op("dashboard", session, async move {
			let beers = self.active_beers().await?;

			Ok(DashboardStats::tally(
				beers,
				self.settings.low_stock_threshold,
				self.settings.recent_count,
			))
		})
		.await
	}

	/// Inserts a new beer.
	pub async fn create_beer(&self, session: &Session, draft: BeerDraft) -> Result<Beer> {
		self.admin_op("create_beer", session, async move {
			self.check_draft(&draft)?;

			Ok(self.store.insert_beer(draft, OffsetDateTime::now_utc()).await?)
		})
		.await
	}

	/// Applies `patch` to a beer and bumps its `updated_at`.
	pub async fn update_beer(&self, session: &Session, id: &BeerId, patch: BeerPatch) -> Result<Beer> {
		self.admin_op("update_beer", session, async move {
			self.check_patch(&patch)?;

			Ok(self.store.update_beer(id, patch, OffsetDateTime::now_utc()).await?)
		})
		.await
	}

	/// Soft-deletes a beer; its rows stay in storage with `is_active = false`.
	pub async fn delete_beer(&self, session: &Session, id: &BeerId) -> Result<Beer> {
		let patch = BeerPatch { is_active: Some(false), ..Default::default() };

		self.admin_op("delete_beer", session, async move {
			Ok(self.store.update_beer(id, patch, OffsetDateTime::now_utc()).await?)
		})
		.await
	}

	/// Adds a size to an existing beer.
	pub async fn add_size(&self, session: &Session, draft: SizeDraft) -> Result<BeerSize> {
		self.admin_op("add_size", session, async move {
			check_size_name(&draft.size_name)?;
			check_price(draft.price)?;

			Ok(self.store.insert_size(draft, OffsetDateTime::now_utc()).await?)
		})
		.await
	}

	/// Applies `patch` to a size.
	pub async fn update_size(
		&self,
		session: &Session,
		id: &SizeId,
		patch: SizePatch,
	) -> Result<BeerSize> {
		self.admin_op("update_size", session, async move {
			if let Some(size_name) = &patch.size_name {
				check_size_name(size_name)?;
			}
			if let Some(price) = patch.price {
				check_price(price)?;
			}

			Ok(self.store.update_size(id, patch, OffsetDateTime::now_utc()).await?)
		})
		.await
	}

	/// Sets the stock level of a size.
	pub async fn update_stock(
		&self,
		session: &Session,
		id: &SizeId,
		stock_quantity: u32,
	) -> Result<BeerSize> {
		let patch = SizePatch { stock_quantity: Some(stock_quantity), ..Default::default() };

		self.admin_op("update_stock", session, async move {
			Ok(self.store.update_size(id, patch, OffsetDateTime::now_utc()).await?)
		})
		.await
	}

	/// Soft-deletes a size.
	pub async fn delete_size(&self, session: &Session, id: &SizeId) -> Result<BeerSize> {
		let patch = SizePatch { is_active: Some(false), ..Default::default() };

		self.admin_op("delete_size", session, async move {
			Ok(self.store.update_size(id, patch, OffsetDateTime::now_utc()).await?)
		})
		.await
	}

	/// Saves the beer editor: creates or updates the beer, then each listed size row.
	///
	/// Rows with an id are updated, the rest are inserted; unlisted rows are skipped. All input
	/// is validated before the first write.
	pub async fn save_beer_with_sizes(
		&self,
		session: &Session,
		form: BeerForm,
	) -> Result<BeerWithSizes> {
		self.admin_op("save_beer_with_sizes", session, async move {
			let BeerForm { id, beer: draft, sizes } = form;
			let rows = sizes.into_iter().filter(SizeRow::is_listed).collect::<Vec<_>>();

			self.check_draft(&draft)?;

			for row in &rows {
				check_price(row.price)?;
			}

			let now = OffsetDateTime::now_utc();
			let beer = match &id {
				Some(id) => self.store.update_beer(id, BeerPatch::from_draft(draft), now).await?,
				None => self.store.insert_beer(draft, now).await?,
			};
			let mut saved = Vec::with_capacity(rows.len());

			for SizeRow { id, size_name, price, stock_quantity } in rows {
				let size = match id {
					Some(id) => {
						let patch = SizePatch {
							size_name: Some(size_name),
							price: Some(price),
							stock_quantity: Some(stock_quantity),
							is_active: None,
						};

						self.store.update_size(&id, patch, now).await?
					},
					None => {
						let draft =
							SizeDraft { beer_id: beer.id.clone(), size_name, price, stock_quantity };

						self.store.insert_size(draft, now).await?
					},
				};

				saved.push(size);
			}

			Ok(BeerWithSizes::assemble(beer, saved))
		})
		.await
	}

	async fn with_sizes(&self, beer: Beer) -> Result<BeerWithSizes> {
		let sizes = self.store.list_sizes(&beer.id).await?;

		Ok(BeerWithSizes::assemble(beer, sizes))
	}

	async fn admin_op<T, F>(&self, stage: &'static str, session: &Session, op: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		const KIND: OpKind = OpKind::Inventory;

		let span = OpSpan::new(KIND, stage);

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = match gate::authorize(session, Requirement::Admin) {
			Ok(()) => span.instrument(op).await,
			Err(err) => Err(err),
		};

		obs::record_result(KIND, result)
	}

	fn check_draft(&self, draft: &BeerDraft) -> Result<()> {
		check_text("name", &draft.name)?;
		check_text("type", &draft.style)?;

		self.check_abv(draft.abv)
	}

	fn check_patch(&self, patch: &BeerPatch) -> Result<()> {
		if let Some(name) = &patch.name {
			check_text("name", name)?;
		}
		if let Some(style) = &patch.style {
			check_text("type", style)?;
		}
		if let Some(abv) = patch.abv {
			self.check_abv(abv)?;
		}

		Ok(())
	}

	fn check_abv(&self, abv: f64) -> Result<()> {
		if !(0.0..=self.settings.max_abv).contains(&abv) {
			return Err(Error::validation(
				"abv",
				format!("must be between 0 and {}", self.settings.max_abv),
			));
		}

		Ok(())
	}
}
impl Debug for Inventory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Inventory").field("settings", &self.settings).finish_non_exhaustive()
	}
}

fn check_text(field: &'static str, value: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(Error::validation(field, "cannot be blank"));
	}

	Ok(())
}

fn check_size_name(value: &str) -> Result<()> {
	check_text("size_name", value)
}

fn check_price(price: f64) -> Result<()> {
	if !price.is_finite() || price < 0.0 {
		return Err(Error::validation("price", "cannot be negative"));
	}

	Ok(())
}
