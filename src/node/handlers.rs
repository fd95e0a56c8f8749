use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::ledger::{Account, Hash, Ledger, Transaction};

/// Data structure for the shared ledger engine
pub type LedgerData = web::Data<Ledger>;

/// Response for the balances endpoint
#[derive(Serialize, Deserialize)]
pub struct BalancesResponse {
    /// Hash of the latest persisted block
    pub block_hash: Hash,

    /// Balance of every known account
    pub balances: BTreeMap<Account, u64>,
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize)]
pub struct TxAddRequest {
    /// The sending account
    pub from: String,

    /// The receiving account
    pub to: String,

    /// The amount to move
    pub value: u64,

    /// Transaction marker; "reward" mints value instead of transferring it
    #[serde(default)]
    pub data: String,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize)]
pub struct TxAddResponse {
    /// Hash of the block the transaction was persisted into
    pub block_hash: Hash,
}

/// List all balances
///
/// Returns the balance of every known account together with the hash of
/// the latest persisted block
pub async fn list_balances(ledger: LedgerData) -> impl Responder {
    let block_hash = ledger.latest_block_hash();
    let balances = ledger.balances();

    let response = BalancesResponse {
        block_hash,
        balances,
    };

    HttpResponse::Ok().json(response)
}

/// Add a transaction
///
/// Validates and applies the transaction, then immediately persists it in
/// a new single-transaction block
pub async fn add_tx(ledger: LedgerData, tx_req: web::Json<TxAddRequest>) -> impl Responder {
    let from = Account::new(tx_req.from.clone());
    let to = Account::new(tx_req.to.clone());

    let tx = Transaction::new(from, to, tx_req.value, &tx_req.data);

    if let Err(err) = ledger.add_tx(tx) {
        return HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("{}", err)
        }));
    }

    match ledger.persist() {
        Ok(block_hash) => HttpResponse::Ok().json(TxAddResponse { block_hash }),
        Err(err) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("{}", err)
        })),
    }
}
