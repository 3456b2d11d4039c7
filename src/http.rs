// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! REST API over [`InvoiceService`].
//!
//! The owner of every request arrives in the `x-owner-id` header, set by the
//! authentication layer in front of this router.
//!
//! ## Endpoints
//!
//! - `POST /invoices` - Create an invoice, body `{"amount": "0.01"}` (BTC)
//! - `GET /invoices` - List the owner's invoices
//! - `GET /invoices/{id}` - Invoice details
//! - `DELETE /invoices/{id}` - Delete an invoice
//! - `GET /invoices/{id}/balance` - Balance at the invoice address
//! - `GET /invoices/{id}/check` - Settlement state
//! - `POST /invoices/{id}/withdraw` - Sweep funds, body `{"address": "tb1q..."}`
//! - `POST /invoices/{id}/release` - Pay vendors, body `{"tb1q...": {"amount": "1.0", "fee": "2"}}`
//!
//! Failures answer with `{"error": "...", "code": "..."}` and a 4xx status.

use crate::base::{Address, InvoiceId, OwnerId, TransactionId};
use crate::disbursement::DisbursementRequest;
use crate::service::InvoiceService;
use crate::settlement::SettlementState;
use crate::store::InvoiceStore;
use crate::wallet::Wallet;
use crate::{Invoice, InvoiceError, Money};
use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// Header carrying the authenticated owner.
pub const OWNER_HEADER: &str = "x-owner-id";

// === Request/Response DTOs ===

/// Request body for creating invoices. The BTC amount is a decimal string or
/// a JSON number.
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    #[serde(deserialize_with = "rust_decimal::serde::arbitrary_precision::deserialize")]
    pub amount: Decimal,
}

/// Request body for withdrawing invoice funds.
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub address: Address,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub amount: Money,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub settled: bool,
    pub message: String,
    #[serde(flatten)]
    pub state: SettlementState,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: TransactionId,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn error_body(status: StatusCode, error: String, code: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error,
            code: code.to_string(),
        }),
    )
        .into_response()
}

// === Error Handling ===

/// Wrapper for converting [`InvoiceError`] into HTTP responses.
#[derive(Debug)]
pub struct AppError(InvoiceError);

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        AppError(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError(InvoiceError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            InvoiceError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            InvoiceError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            InvoiceError::UnitMismatch { .. } => (StatusCode::BAD_REQUEST, "UNIT_MISMATCH"),
            InvoiceError::InvalidRate(_) => (StatusCode::BAD_REQUEST, "INVALID_RATE"),
            InvoiceError::NegativeNetAmount { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NEGATIVE_NET_AMOUNT")
            }
            InvoiceError::PrecisionLoss { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PRECISION_LOSS")
            }
            InvoiceError::SpendInProgress => (StatusCode::CONFLICT, "SPEND_IN_PROGRESS"),
            InvoiceError::Wallet(_) => (StatusCode::BAD_REQUEST, "WALLET_ERROR"),
            InvoiceError::WalletTimeout => (StatusCode::REQUEST_TIMEOUT, "WALLET_TIMEOUT"),
            InvoiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        };

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            debug!(error = %self.0, "Request rejected");
        }

        error_body(status, self.0.to_string(), code)
    }
}

// === Extractors ===

/// Owner resolved by the upstream authentication layer.
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Owner(OwnerId::from(value)))
            .ok_or_else(|| {
                error_body(
                    StatusCode::UNAUTHORIZED,
                    "missing owner".to_string(),
                    "UNAUTHORIZED",
                )
            })
    }
}

fn parse_id(raw: &str) -> Result<InvoiceId, AppError> {
    raw.parse()
        .map_err(|_| AppError(InvoiceError::Validation(format!("invalid invoice id '{raw}'"))))
}

// === Handlers ===

type AppState<W, S> = Arc<InvoiceService<W, S>>;

/// POST /invoices - Create an invoice.
async fn create_invoice<W: Wallet + 'static, S: InvoiceStore + 'static>(
    State(service): State<AppState<W, S>>,
    Owner(owner): Owner,
    body: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body?;
    let invoice = service.create(owner, Money::btc(request.amount)).await?;
    Ok((StatusCode::CREATED, Json(invoice.as_ref())).into_response())
}

/// GET /invoices - List the owner's invoices.
async fn list_invoices<W: Wallet + 'static, S: InvoiceStore + 'static>(
    State(service): State<AppState<W, S>>,
    Owner(owner): Owner,
) -> Result<Response, AppError> {
    let invoices = service.list(&owner).await?;
    let views: Vec<&Invoice> = invoices.iter().map(Arc::as_ref).collect();
    Ok(Json(views).into_response())
}

/// GET /invoices/{id} - Invoice details.
async fn invoice_details<W: Wallet + 'static, S: InvoiceStore + 'static>(
    State(service): State<AppState<W, S>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let invoice = service.details(&parse_id(&id)?, &owner).await?;
    Ok(Json(invoice.as_ref()).into_response())
}

/// DELETE /invoices/{id} - Delete an invoice.
async fn delete_invoice<W: Wallet + 'static, S: InvoiceStore + 'static>(
    State(service): State<AppState<W, S>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete(&parse_id(&id)?, &owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /invoices/{id}/balance - Funds at the invoice address.
async fn invoice_balance<W: Wallet + 'static, S: InvoiceStore + 'static>(
    State(service): State<AppState<W, S>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<BalanceResponse>, AppError> {
    let amount = service.balance(&parse_id(&id)?, &owner).await?;
    Ok(Json(BalanceResponse { amount }))
}

/// GET /invoices/{id}/check - Settlement state.
async fn check_invoice<W: Wallet + 'static, S: InvoiceStore + 'static>(
    State(service): State<AppState<W, S>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<CheckResponse>, AppError> {
    let state = service.check(&parse_id(&id)?, &owner).await?;
    Ok(Json(CheckResponse {
        settled: state.is_settled(),
        message: state.message(),
        state,
    }))
}

/// POST /invoices/{id}/withdraw - Sweep funds to an address.
async fn withdraw_invoice<W: Wallet + 'static, S: InvoiceStore + 'static>(
    State(service): State<AppState<W, S>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    body: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, AppError> {
    let id = parse_id(&id)?;
    let Json(request) = body?;
    let txid = service.withdraw(&id, &owner, &request.address).await?;
    Ok(Json(TransactionResponse { id: txid }))
}

/// POST /invoices/{id}/release - Pay vendors net of fees.
async fn release_invoice<W: Wallet + 'static, S: InvoiceStore + 'static>(
    State(service): State<AppState<W, S>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    body: Result<Json<DisbursementRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, AppError> {
    let id = parse_id(&id)?;
    let Json(request) = body?;
    let txid = service.release(&id, &owner, &request).await?;
    Ok(Json(TransactionResponse { id: txid }))
}

// === Router ===

/// Builds the invoice API router.
pub fn router<W, S>(service: Arc<InvoiceService<W, S>>) -> Router
where
    W: Wallet + 'static,
    S: InvoiceStore + 'static,
{
    Router::new()
        .route(
            "/invoices",
            get(list_invoices::<W, S>).post(create_invoice::<W, S>),
        )
        .route(
            "/invoices/{id}",
            get(invoice_details::<W, S>).delete(delete_invoice::<W, S>),
        )
        .route("/invoices/{id}/balance", get(invoice_balance::<W, S>))
        .route("/invoices/{id}/check", get(check_invoice::<W, S>))
        .route("/invoices/{id}/withdraw", post(withdraw_invoice::<W, S>))
        .route("/invoices/{id}/release", post(release_invoice::<W, S>))
        .with_state(service)
}
