//! Property tests: random sequences of write operations against the in-memory store
//!
//! After every operation, successful or not, the ledger must reconcile: stock equals
//! the movement journal and never goes negative, debt paid amounts equal their payment
//! rows, document totals equal their active lines. A failed operation must leave no
//! rows behind.

use std::sync::Arc;

use proptest::prelude::*;
use shared::{
    ActorRole, ApproveStockOpnameRequest, CodeClock, CreateDebtPaymentRequest,
    CreatePurchaseRequest, CreateSaleRequest, CreateStockOpnameDetailRequest,
    CreateStockOpnameRequest, DebtPaymentRequest, DebtRequest, Money, PaymentMethod,
    PaymentRequest, PurchaseDetailRequest, SaleDetailRequest,
};

use super::{DebtService, PurchaseService, SaleService, StockOpnameService};
use crate::middleware::AuthUser;
use crate::store::memory::{MemoryState, MemoryStore};

const BRANCH: i64 = 1;
const DISTRIBUTOR: i64 = 1;
const SIZES: [i64; 3] = [11, 12, 13];

#[derive(Debug, Clone)]
enum Op {
    Purchase {
        size: usize,
        qty: i64,
        price: i64,
        credit: Option<i64>,
    },
    Sale {
        size: usize,
        qty: i64,
        credit: Option<i64>,
    },
    CancelSale(usize),
    CancelSaleDetail(usize, usize),
    CancelPurchase(usize),
    CancelPurchaseDetail(usize, usize),
    PayDebt(usize, i64),
    Opname(usize, i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..3usize, 1..20i64, 1..40i64, prop::option::of(0..50i64))
            .prop_map(|(size, qty, price, credit)| Op::Purchase { size, qty, price, credit }),
        3 => (0..3usize, 1..15i64, prop::option::of(0..50i64))
            .prop_map(|(size, qty, credit)| Op::Sale { size, qty, credit }),
        1 => (0..8usize).prop_map(Op::CancelSale),
        1 => (0..8usize, 0..3usize).prop_map(|(doc, size)| Op::CancelSaleDetail(doc, size)),
        1 => (0..8usize).prop_map(Op::CancelPurchase),
        1 => (0..8usize, 0..3usize).prop_map(|(doc, size)| Op::CancelPurchaseDetail(doc, size)),
        2 => (0..8usize, 1..200i64).prop_map(|(debt, amount)| Op::PayDebt(debt, amount)),
        1 => (0..3usize, 0..25i64).prop_map(|(size, qty)| Op::Opname(size, qty)),
    ]
}

fn owner() -> AuthUser {
    AuthUser {
        username: "owner".to_string(),
        role: ActorRole::Owner,
        branch_id: None,
    }
}

fn settlement(credit: Option<i64>) -> (Option<Vec<PaymentRequest>>, Option<DebtRequest>) {
    match credit {
        Some(down_payment) => (
            None,
            Some(DebtRequest {
                due_date: None,
                debt_payments: (down_payment > 0).then(|| {
                    vec![DebtPaymentRequest {
                        amount: Money::from(down_payment),
                        note: None,
                    }]
                }),
            }),
        ),
        None => (
            Some(vec![PaymentRequest {
                payment_method: PaymentMethod::Cash,
                amount: Money::from(100_000),
                note: None,
            }]),
            None,
        ),
    }
}

/// Row counts that any write touches.
fn footprint(state: &MemoryState) -> (usize, usize, usize, usize) {
    (
        state.movements.len(),
        state.cash.len(),
        state.debt_payments.len(),
        state.sales.len() + state.purchases.len() + state.opnames.len(),
    )
}

struct World {
    store: MemoryStore,
    sales: SaleService<MemoryStore>,
    purchases: PurchaseService<MemoryStore>,
    debts: DebtService<MemoryStore>,
    opnames: StockOpnameService<MemoryStore>,
    sale_codes: Vec<String>,
    purchase_codes: Vec<String>,
}

impl World {
    async fn new() -> Self {
        let store = MemoryStore::new();
        store.seed_branch(BRANCH).await;
        store.seed_distributor(DISTRIBUTOR).await;
        for size in SIZES {
            store
                .seed_size(size, Money::from(size * 2), Money::from(size))
                .await;
        }
        let codes = Arc::new(CodeClock::new());
        Self {
            sales: SaleService::new(store.clone(), codes.clone()),
            purchases: PurchaseService::new(store.clone(), codes),
            debts: DebtService::new(store.clone()),
            opnames: StockOpnameService::new(store.clone()),
            store,
            sale_codes: Vec::new(),
            purchase_codes: Vec::new(),
        }
    }

    /// Run one operation; returns whether it succeeded.
    async fn apply(&mut self, op: Op) -> bool {
        let user = owner();
        match op {
            Op::Purchase {
                size,
                qty,
                price,
                credit,
            } => {
                let (payments, debt) = settlement(credit);
                let request = CreatePurchaseRequest {
                    distributor_id: DISTRIBUTOR,
                    sales_name: "Pak Budi".to_string(),
                    details: vec![PurchaseDetailRequest {
                        size_id: SIZES[size],
                        qty,
                        buy_price: Money::from(price),
                    }],
                    payments,
                    debt,
                };
                match self.purchases.create(&user, Some(BRANCH), request).await {
                    Ok(result) => {
                        self.purchase_codes.push(result.purchase.code);
                        true
                    }
                    Err(_) => false,
                }
            }
            Op::Sale { size, qty, credit } => {
                let (payments, debt) = settlement(credit);
                let request = CreateSaleRequest {
                    customer_name: "Bu Sari".to_string(),
                    details: vec![SaleDetailRequest {
                        size_id: SIZES[size],
                        qty,
                    }],
                    payments,
                    debt,
                };
                match self.sales.create(&user, Some(BRANCH), request).await {
                    Ok(result) => {
                        self.sale_codes.push(result.sale.code);
                        true
                    }
                    Err(_) => false,
                }
            }
            Op::CancelSale(doc) => match self.sale_codes.get(doc) {
                Some(code) => self.sales.cancel(&user, code).await.is_ok(),
                None => false,
            },
            Op::CancelSaleDetail(doc, size) => match self.sale_codes.get(doc) {
                Some(code) => self
                    .sales
                    .cancel_detail(&user, code, SIZES[size])
                    .await
                    .is_ok(),
                None => false,
            },
            Op::CancelPurchase(doc) => match self.purchase_codes.get(doc) {
                Some(code) => self.purchases.cancel(&user, code).await.is_ok(),
                None => false,
            },
            Op::CancelPurchaseDetail(doc, size) => match self.purchase_codes.get(doc) {
                Some(code) => self
                    .purchases
                    .cancel_detail(&user, code, SIZES[size])
                    .await
                    .is_ok(),
                None => false,
            },
            Op::PayDebt(pick, amount) => {
                let state = self.store.snapshot().await;
                let Some(debt_id) = state.debts.keys().nth(pick).copied() else {
                    return false;
                };
                let request = CreateDebtPaymentRequest {
                    amount: Money::from(amount),
                    payment_date: None,
                    note: None,
                };
                self.debts.create_payment(&user, debt_id, request).await.is_ok()
            }
            Op::Opname(size, physical_qty) => {
                let state = self.store.snapshot().await;
                let Some(row) = state.inventory(BRANCH, SIZES[size]) else {
                    return false;
                };
                let request = CreateStockOpnameRequest {
                    branch_id: Some(BRANCH),
                    date: None,
                    details: vec![CreateStockOpnameDetailRequest {
                        branch_inventory_id: row.id,
                        physical_qty,
                        notes: None,
                    }],
                };
                let Ok(draft) = self.opnames.create(&user, request).await else {
                    return false;
                };
                self.opnames
                    .approve(&user, draft.opname.id, ApproveStockOpnameRequest::default())
                    .await
                    .is_ok()
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_ledger_reconciles_after_any_sequence(ops in prop::collection::vec(op_strategy(), 1..30)) {
        tokio_test::block_on(async {
            let mut world = World::new().await;
            for op in ops {
                let before = world.store.snapshot().await;
                let succeeded = world.apply(op.clone()).await;
                let after = world.store.snapshot().await;

                after.assert_consistent();
                if !succeeded && !matches!(op, Op::Opname(..)) {
                    assert_eq!(
                        footprint(&before),
                        footprint(&after),
                        "failed {:?} left rows behind",
                        op
                    );
                }
            }
        });
    }

    #[test]
    fn prop_sales_never_oversell(stock in 0..30i64, wanted in prop::collection::vec(1..12i64, 1..8)) {
        tokio_test::block_on(async {
            let mut world = World::new().await;
            if stock > 0 {
                world
                    .apply(Op::Purchase { size: 0, qty: stock, price: 5, credit: None })
                    .await;
            }

            let mut sold = 0;
            for qty in wanted {
                if world.apply(Op::Sale { size: 0, qty, credit: None }).await {
                    sold += qty;
                }
            }

            let state = world.store.snapshot().await;
            assert!(sold <= stock);
            assert_eq!(state.stock(BRANCH, SIZES[0]), stock - sold);
        });
    }
}
