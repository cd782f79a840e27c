//! # Checkout Orchestrator
//!
//! Turns a cart into stock decrements plus one transaction record.
//!
//! ## State Machine
//! ```text
//!   ┌────────────┐ add_item ┌─────────────┐ checkout ┌──────────────────┐
//!   │ Empty cart │ ───────► │ Items added │ ───────► │ Checkout running │
//!   └────────────┘          └─────────────┘          └────────┬─────────┘
//!         ▲                                                   │
//!         │ cart cleared                     all lines ok     │   some line failed
//!         │                        ┌──────────────────────────┴───────────┐
//!         │                        ▼                                      ▼
//!         │                 ┌───────────┐                      ┌─────────────────┐
//!         └──────────────── │ Completed │                      │ PartiallyFailed │
//!                           └───────────┘                      │ cart kept       │
//!                                                              └─────────────────┘
//! ```
//!
//! ## Policies
//! - `best_effort`: each line is its own stock write. Every line is attempted;
//!   lines that succeeded stay applied when another fails.
//! - `atomic`: all lines and the transaction record share one write; a failing
//!   line rolls the whole checkout back.
//!
//! In both cases a failure means no transaction is recorded and the cart is
//! left as it was.

use stockroom_core::validation::validate_payment;
use stockroom_core::{Cart, LineItem, Money, StockChangeType, Transaction, ValidationError};
use stockroom_db::Database;
use tracing::{debug, info, warn};

use crate::config::{CheckoutPolicy, PosConfig};
use crate::error::{PosError, PosResult};
use crate::inventory::{apply_adjustment, StockMutator};

/// Runs checkouts. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct CheckoutOrchestrator {
    db: Database,
    mutator: StockMutator,
    policy: CheckoutPolicy,
    note: String,
}

impl CheckoutOrchestrator {
    pub fn new(db: Database, policy: CheckoutPolicy, note: impl Into<String>) -> Self {
        CheckoutOrchestrator {
            mutator: StockMutator::new(db.clone()),
            db,
            policy,
            note: note.into(),
        }
    }

    /// Creates an orchestrator from `[checkout]` settings.
    pub fn from_config(db: Database, config: &PosConfig) -> Self {
        Self::new(db, config.checkout.policy, config.checkout.note.clone())
    }

    pub fn policy(&self) -> CheckoutPolicy {
        self.policy
    }

    /// Checks out `cart`, paid with `paid`.
    ///
    /// On success the transaction is recorded and the cart cleared.
    ///
    /// ## Errors
    /// - [`PosError::Validation`] for an empty cart or a negative payment;
    ///   nothing is written
    /// - [`PosError::PartialCheckout`] with one `"<name>: <reason>"` message
    ///   per failed line
    /// - [`PosError::Persistence`] when the store fails
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        paid: Money,
        operator: &str,
    ) -> PosResult<Transaction> {
        if cart.is_empty() {
            return Err(ValidationError::Required {
                field: "cart items".to_string(),
            }
            .into());
        }
        validate_payment(paid)?;

        debug!(
            lines = cart.len(),
            total = %cart.total(),
            paid = %paid,
            operator,
            policy = %self.policy,
            "Checkout requested"
        );

        let txn = match self.policy {
            CheckoutPolicy::BestEffort => self.best_effort(cart.lines(), paid, operator).await?,
            CheckoutPolicy::Atomic => self.atomic(cart.lines(), paid, operator).await?,
        };
        cart.clear();

        info!(
            txn_id = %txn.txn_id,
            total = %txn.total,
            change = %txn.change,
            "Checkout completed"
        );
        Ok(txn)
    }

    async fn best_effort(
        &self,
        lines: &[LineItem],
        paid: Money,
        operator: &str,
    ) -> PosResult<Transaction> {
        let mut failures = Vec::new();

        for line in lines {
            let result = self
                .mutator
                .adjust_stock(
                    &line.barcode,
                    -line.qty,
                    operator,
                    StockChangeType::Sale,
                    &self.note,
                )
                .await;
            if let Err(e) = result {
                warn!(
                    name = %line.name,
                    barcode = %line.barcode,
                    error = %e,
                    "Checkout line failed"
                );
                failures.push(line_failure(line, &e));
            }
        }

        if !failures.is_empty() {
            return Err(PosError::PartialCheckout { failures });
        }

        let txn = self.record(lines, paid, operator)?;
        self.db.ledger().append_transaction(&txn).await?;
        Ok(txn)
    }

    async fn atomic(
        &self,
        lines: &[LineItem],
        paid: Money,
        operator: &str,
    ) -> PosResult<Transaction> {
        let mut tx = self.db.begin_write().await?;
        let mut failures = Vec::new();

        for line in lines {
            let result = apply_adjustment(
                &mut tx,
                &line.barcode,
                -line.qty,
                operator,
                StockChangeType::Sale,
                &self.note,
            )
            .await;
            match result {
                Ok(_) => {}
                Err(e @ PosError::Persistence(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        name = %line.name,
                        barcode = %line.barcode,
                        error = %e,
                        "Checkout line failed"
                    );
                    failures.push(line_failure(line, &e));
                }
            }
        }

        if !failures.is_empty() {
            tx.rollback().await?;
            return Err(PosError::PartialCheckout { failures });
        }

        let txn = self.record(lines, paid, operator)?;
        tx.append_transaction(&txn).await?;
        tx.commit().await?;
        Ok(txn)
    }

    fn record(&self, lines: &[LineItem], paid: Money, operator: &str) -> PosResult<Transaction> {
        let items = lines.to_vec();
        let txn = Transaction::from_lines(items, paid, operator, &self.note, crate::now())?;
        Ok(txn)
    }
}

fn line_failure(line: &LineItem, err: &PosError) -> String {
    format!("{}: {}", line.name, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::Product;
    use stockroom_db::DbConfig;

    fn water() -> Product {
        Product {
            id: "id-water".to_string(),
            barcode: "6901234567890".to_string(),
            name: "矿泉水 500ml".to_string(),
            price: Some(Money::from_cents(250)),
            stock: 50,
            ..Default::default()
        }
    }

    fn noodles() -> Product {
        Product {
            id: "id-noodles".to_string(),
            barcode: "6909876543210".to_string(),
            name: "方便面".to_string(),
            price: Some(Money::from_cents(400)),
            stock: 30,
            ..Default::default()
        }
    }

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog().save(&[water(), noodles()]).await.unwrap();
        db
    }

    fn orchestrator(db: &Database, policy: CheckoutPolicy) -> CheckoutOrchestrator {
        CheckoutOrchestrator::new(db.clone(), policy, "POS checkout")
    }

    async fn stock_of(db: &Database, barcode: &str) -> Option<i64> {
        db.catalog()
            .try_load()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.barcode == barcode)
            .map(|p| p.stock)
    }

    #[tokio::test]
    async fn test_checkout_decrements_and_records() {
        let db = setup().await;
        let orchestrator = orchestrator(&db, CheckoutPolicy::BestEffort);

        let mut cart = Cart::new();
        cart.add_item(&water(), 2).unwrap();

        let txn = orchestrator
            .checkout(&mut cart, Money::from_cents(1000), "cashier")
            .await
            .unwrap();

        assert_eq!(txn.total, Money::from_cents(500));
        assert_eq!(txn.change, Money::from_cents(500));
        assert_eq!(txn.operator, "cashier");
        assert!(cart.is_empty());
        assert_eq!(stock_of(&db, "6901234567890").await, Some(48));

        let log = db.ledger().read_stock_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].change_type, StockChangeType::Sale);
        assert_eq!(log[0].change, -2);
        assert_eq!((log[0].before_stock, log[0].after_stock), (50, 48));

        assert_eq!(db.ledger().read_transactions().await, vec![txn]);
    }

    #[tokio::test]
    async fn test_best_effort_keeps_applied_lines() {
        let db = setup().await;
        let orchestrator = orchestrator(&db, CheckoutPolicy::BestEffort);

        let mut cart = Cart::new();
        cart.add_item(&water(), 1).unwrap();
        cart.add_item(&noodles(), 1).unwrap();
        db.catalog().save(&[water()]).await.unwrap();

        let err = orchestrator
            .checkout(&mut cart, Money::from_cents(1000), "cashier")
            .await
            .unwrap_err();

        match err {
            PosError::PartialCheckout { failures } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].starts_with("方便面: "));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stock_of(&db, "6901234567890").await, Some(49));
        assert_eq!(cart.len(), 2);
        assert!(db.ledger().read_transactions().await.is_empty());
        assert_eq!(db.ledger().read_stock_log().await.len(), 1);
    }

    #[tokio::test]
    async fn test_atomic_rolls_back_every_line() {
        let db = setup().await;
        let orchestrator = orchestrator(&db, CheckoutPolicy::Atomic);

        let mut cart = Cart::new();
        cart.add_item(&water(), 3).unwrap();
        cart.add_item(&noodles(), 1).unwrap();
        db.catalog().save(&[water()]).await.unwrap();

        let err = orchestrator
            .checkout(&mut cart, Money::from_cents(2000), "cashier")
            .await
            .unwrap_err();

        assert!(matches!(err, PosError::PartialCheckout { ref failures } if failures.len() == 1));
        assert_eq!(stock_of(&db, "6901234567890").await, Some(50));
        assert_eq!(cart.len(), 2);
        assert!(db.ledger().read_stock_log().await.is_empty());
        assert!(db.ledger().read_transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_atomic_success_commits_everything() {
        let db = setup().await;
        let orchestrator = orchestrator(&db, CheckoutPolicy::Atomic);

        let mut cart = Cart::new();
        cart.add_item(&water(), 2).unwrap();
        cart.add_item(&noodles(), 3).unwrap();

        let txn = orchestrator
            .checkout(&mut cart, Money::from_cents(2000), "cashier")
            .await
            .unwrap();

        assert_eq!(txn.total, Money::from_cents(1700));
        assert_eq!(txn.items.len(), 2);
        assert_eq!(stock_of(&db, "6901234567890").await, Some(48));
        assert_eq!(stock_of(&db, "6909876543210").await, Some(27));
        assert_eq!(db.ledger().read_stock_log().await.len(), 2);
        assert_eq!(db.ledger().read_transactions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let db = setup().await;
        let orchestrator = orchestrator(&db, CheckoutPolicy::BestEffort);

        let err = orchestrator
            .checkout(&mut Cart::new(), Money::from_cents(1000), "cashier")
            .await
            .unwrap_err();

        assert!(matches!(err, PosError::Validation(_)));
        assert!(db.ledger().read_transactions().await.is_empty());
        assert!(db.ledger().read_stock_log().await.is_empty());
    }

    #[tokio::test]
    async fn test_underpayment_gives_negative_change() {
        let db = setup().await;
        let orchestrator = orchestrator(&db, CheckoutPolicy::BestEffort);

        let mut cart = Cart::new();
        cart.add_item(&noodles(), 2).unwrap();

        let txn = orchestrator
            .checkout(&mut cart, Money::from_cents(500), "cashier")
            .await
            .unwrap();
        assert_eq!(txn.change, Money::from_cents(-300));
        assert_eq!(txn.change.to_decimal_string(), "-3.00");
    }
}
