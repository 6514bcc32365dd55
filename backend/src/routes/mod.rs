//! Route definitions for the back-office API

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Auth routes (public)
        .route("/auth/login", post(handlers::login))
        // Protected routes
        .nest("/sales", sale_routes(&state))
        .nest("/purchases", purchase_routes(&state))
        .nest("/debts", debt_routes(&state))
        .nest("/debt-payments", debt_payment_routes(&state))
        .nest("/inventories", inventory_routes(&state))
        .nest("/cash-bank-transactions", cash_bank_routes(&state))
        .nest("/stock-opnames", stock_opname_routes(&state))
        .nest("/capitals", capital_routes(&state))
        .nest("/expenses", expense_routes(&state))
}

/// Sale routes (protected)
fn sale_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route(
            "/:code",
            get(handlers::get_sale).delete(handlers::cancel_sale),
        )
        .route("/:code/details/:size_id", delete(handlers::cancel_sale_detail))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Purchase routes (protected)
fn purchase_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchases).post(handlers::create_purchase),
        )
        .route(
            "/:code",
            get(handlers::get_purchase).delete(handlers::cancel_purchase),
        )
        .route(
            "/:code/sizes/:size_id",
            delete(handlers::cancel_purchase_detail),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Debt routes (protected)
fn debt_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_debts))
        .route("/:debt_id", get(handlers::get_debt))
        .route("/:debt_id/payments", post(handlers::create_debt_payment))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

fn debt_payment_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/:payment_id", delete(handlers::delete_debt_payment))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Branch inventory routes (protected)
fn inventory_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_inventories))
        .route(
            "/:inventory_id/movements",
            get(handlers::list_inventory_movements),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Cash book routes (protected)
fn cash_bank_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_cash_transactions))
        .route("/balance", get(handlers::cash_balance))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Stock opname routes (protected)
fn stock_opname_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_stock_opnames).post(handlers::create_stock_opname),
        )
        .route(
            "/:id",
            get(handlers::get_stock_opname)
                .put(handlers::approve_stock_opname)
                .delete(handlers::delete_stock_opname),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

fn capital_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_capital))
        .route(
            "/:id",
            put(handlers::update_capital).delete(handlers::delete_capital),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

fn expense_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_expense))
        .route(
            "/:id",
            put(handlers::update_expense).delete(handlers::delete_expense),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
