//! Reference data handlers

use axum::{extract::State, Json};

use domain_expense::adapters::Country;

use crate::AppState;

/// Country and currency list for company setup
///
/// Never fails: the catalog serves its built-in list when the upstream
/// service is unreachable.
pub async fn list_countries(State(state): State<AppState>) -> Json<Vec<Country>> {
    Json(state.countries.countries().await)
}
