//! Walks an admin session through the in-memory backend: bootstrap, sign-in, gated pages,
//! catalog edits, and sign-out.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
// self
use taproom::{
	auth::{Role, Secret},
	backend::MemoryBackend,
	catalog::{BeerDraft, BeerForm, Inventory, SizeRow},
	config::{Route, Settings},
	gate::{Gate, Requirement},
	session::{Session, SessionStore},
	view::{self, AccountBadge, HeaderView, RecordingNavigator, SignInForm},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let settings = Settings::default();
	let backend = Arc::new(MemoryBackend::default());
	let password = Secret::new("hoppy-secret");

	backend.register_user("owner@example.com", &password, Some(Role::SuperAdmin))?;
	backend.register_user("admin@example.com", &password, Some(Role::Admin))?;

	let store = SessionStore::attach(backend.clone(), backend.clone(), |task| {
		tokio::spawn(task);
	});
	let _observer = store.observe(|session: &Session| {
		println!("published: role={:?} loading={}", session.role(), session.loading);
	});
	let navigator = RecordingNavigator::new(settings.routes.clone());
	let users_page = Gate::protected(Requirement::SuperAdmin);
	let inventory_page = Gate::protected(Requirement::Admin);

	store.bootstrap().await;

	println!("users page before sign-in: {:?}", users_page.drive(&store.snapshot(), &navigator));

	let form = SignInForm::new("admin@example.com", password.clone());

	view::sign_in(backend.as_ref(), &navigator, &form).await?;

	let session = wait_for_profile(&store).await;

	println!("header: {:?}", HeaderView::for_session(&session, Route::Dashboard));
	println!("badge: {:?}", AccountBadge::for_session(&session));
	println!("users page as admin: {:?}", users_page.drive(&session, &navigator));
	println!("inventory page as admin: {:?}", inventory_page.drive(&session, &navigator));

	let inventory = Inventory::new(backend.clone(), settings.clone());
	let editor = BeerForm {
		id: None,
		beer: BeerDraft {
			name: "Harbour Haze".into(),
			style: "IPA".into(),
			abv: 6.2,
			description: Some("Juicy and hazy.".into()),
			image_url: None,
		},
		sizes: vec![
			SizeRow { id: None, size_name: "Pint".into(), price: 6.5, stock_quantity: 40 },
			SizeRow { id: None, size_name: "473ml Can".into(), price: 4.25, stock_quantity: 96 },
		],
	};

	inventory.save_beer_with_sizes(&session, editor).await?;

	for entry in inventory.home_page().await? {
		let from = entry.starting_price().unwrap_or_default();

		println!("on tap: {} ({}) from {from:.2}", entry.beer.name, entry.beer.style);
	}

	view::sign_out(&store, &navigator).await;

	for (route, path) in navigator.visits().into_iter().zip(navigator.paths()) {
		println!("visited {route} at {path}");
	}

	store.teardown();

	Ok(())
}

async fn wait_for_profile(store: &SessionStore) -> Session {
	loop {
		let session = store.snapshot();

		if session.profile.is_some() {
			return session;
		}

		tokio::time::sleep(Duration::from_millis(5)).await;
	}
}
