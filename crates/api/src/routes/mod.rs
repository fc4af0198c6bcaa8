//! API route definitions.

use axum::{middleware, Router};

use crate::{middleware::auth::auth_middleware, AppState};

pub mod accounts;
pub mod auth;
pub mod exchange_rates;
pub mod health;
pub mod refunds;
pub mod transactions;
pub mod transfers;

/// Creates the API router: public routes plus the authenticated surface.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(accounts::routes())
        .merge(transactions::routes())
        .merge(transfers::routes())
        .merge(refunds::routes())
        .merge(exchange_rates::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}
