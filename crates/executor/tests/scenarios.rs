mod common;

use common::{harness, Harness, DEFAULT_CASH};
use configuration::QuoteFailurePolicy;
use core_types::OrderSide;
use database::LedgerStore;
use executor::{ExecutorError, Holding};
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn test_buy_then_sell_at_a_new_price() {
    let h = harness();
    let account = h.orders.open_account(None).await.unwrap();
    let id = account.account_id;
    assert_eq!(account.cash, DEFAULT_CASH);

    let bought = h.orders.buy(id, "X", 10).await.unwrap();
    assert_eq!(bought.cash_after, dec!(9500.00));
    assert_eq!(bought.entry.side(), OrderSide::Buy);
    assert_eq!(bought.entry.price, dec!(50.00));

    h.quotes.set_price("X", dec!(60.00));
    let sold = h.orders.sell(id, "X", 4).await.unwrap();
    assert_eq!(sold.cash_after, dec!(9740.00));
    assert_eq!(sold.entry.shares, -4);
    assert_eq!(sold.entry.side(), OrderSide::Sell);

    let snapshot = h.portfolio.get_portfolio(id).await.unwrap();
    assert_eq!(snapshot.cash, dec!(9740.00));
    assert_eq!(snapshot.positions.len(), 1);
    let x = &snapshot.positions[0];
    assert_eq!(x.symbol, "X");
    assert_eq!(x.net_shares, 6);
    assert_eq!(x.current_price, dec!(60.00));
    assert_eq!(x.market_value, dec!(360.00));
    assert_eq!(snapshot.total, dec!(10100.00));

    let history = h.portfolio.get_history(id).await.unwrap();
    assert_eq!(history, vec![bought.entry, sold.entry]);
}

#[tokio::test]
async fn test_unknown_symbol_writes_nothing() {
    let h = harness();
    let id = h.orders.open_account(None).await.unwrap().account_id;

    let err = h.orders.buy(id, "NOPE", 1).await.unwrap_err();
    assert!(matches!(err, ExecutorError::InvalidSymbol(ref s) if s == "NOPE"));
    assert!(!err.is_retryable());

    let statement = h.store.statement(id).await.unwrap();
    assert!(statement.entries.is_empty());
    assert_eq!(statement.account.cash, DEFAULT_CASH);
}

#[tokio::test]
async fn test_overspend_and_oversell_leave_account_unchanged() {
    let h = harness();
    let id = h.orders.open_account(Some(dec!(100.00))).await.unwrap().account_id;
    h.orders.buy(id, "X", 1).await.unwrap();
    let before = h.portfolio.get_portfolio(id).await.unwrap();

    match h.orders.buy(id, "X", 2).await {
        Err(ExecutorError::InsufficientFunds { required, available }) => {
            assert_eq!(required, dec!(100.00));
            assert_eq!(available, dec!(50.00));
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }

    assert!(matches!(
        h.orders.sell(id, "X", 2).await,
        Err(ExecutorError::InsufficientShares { requested: 2, held: 1 })
    ));
    assert!(matches!(
        h.orders.sell(id, "Y", 1).await,
        Err(ExecutorError::InsufficientShares { requested: 1, held: 0 })
    ));

    let after = h.portfolio.get_portfolio(id).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(h.portfolio.get_history(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_spending_exact_balance_is_allowed() {
    let h = harness();
    let id = h.orders.open_account(Some(dec!(100.00))).await.unwrap().account_id;
    let execution = h.orders.buy(id, "X", 2).await.unwrap();
    assert_eq!(execution.cash_after, dec!(0.00));
}

#[tokio::test]
async fn test_round_trip_at_same_price_is_cash_neutral() {
    let h = harness();
    let id = h.orders.open_account(None).await.unwrap().account_id;

    h.orders.buy(id, "Y", 7).await.unwrap();
    let sold = h.orders.sell(id, "Y", 7).await.unwrap();
    assert_eq!(sold.cash_after, DEFAULT_CASH);

    assert!(h.portfolio.holdings(id).await.unwrap().is_empty());
    let snapshot = h.portfolio.get_portfolio(id).await.unwrap();
    assert!(snapshot.positions.is_empty());
    assert_eq!(snapshot.total, DEFAULT_CASH);
    assert_eq!(h.portfolio.get_history(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_cash_is_rounded_to_cents() {
    let h = harness();
    let id = h.orders.open_account(None).await.unwrap().account_id;

    // 3 * 33.333 = 99.999
    let execution = h.orders.buy(id, "Z", 3).await.unwrap();
    assert_eq!(execution.entry.price, dec!(33.333));
    assert_eq!(execution.cash_after, dec!(9900.00));

    let snapshot = h.portfolio.get_portfolio(id).await.unwrap();
    assert_eq!(snapshot.positions[0].market_value, dec!(100.00));
    assert_eq!(snapshot.total, DEFAULT_CASH);
}

#[tokio::test]
async fn test_total_is_cash_plus_market_values() {
    let h = harness();
    let id = h.orders.open_account(None).await.unwrap().account_id;
    h.orders.buy(id, "Y", 5).await.unwrap();
    h.orders.buy(id, "X", 2).await.unwrap();
    h.quotes.set_price("Y", dec!(25.50));

    let snapshot = h.portfolio.get_portfolio(id).await.unwrap();
    let symbols: Vec<&str> = snapshot.positions.iter().map(|p| p.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["X", "Y"]);

    let values: rust_decimal::Decimal = snapshot.positions.iter().map(|p| p.market_value).sum();
    assert_eq!(snapshot.total, snapshot.cash + values);
    assert_eq!(snapshot.cash, dec!(9800.00));
    assert_eq!(snapshot.total, dec!(9800.00) + dec!(100.00) + dec!(127.50));

    assert_eq!(
        h.portfolio.holdings(id).await.unwrap(),
        vec![
            Holding { symbol: "X".into(), net_shares: 2 },
            Holding { symbol: "Y".into(), net_shares: 5 },
        ]
    );
}

#[tokio::test]
async fn test_empty_account_portfolio() {
    let h = harness();
    let id = h.orders.open_account(Some(dec!(42.00))).await.unwrap().account_id;
    let snapshot = h.portfolio.get_portfolio(id).await.unwrap();
    assert!(snapshot.positions.is_empty());
    assert!(snapshot.unpriced.is_empty());
    assert_eq!(snapshot.total, dec!(42.00));
    assert!(h.portfolio.get_history(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_quote_failure_fails_the_whole_portfolio() {
    let h = harness();
    let id = h.orders.open_account(None).await.unwrap().account_id;
    h.orders.buy(id, "X", 1).await.unwrap();
    h.orders.buy(id, "Y", 1).await.unwrap();
    h.quotes.set_failing("Y", true);

    let err = h.portfolio.get_portfolio(id).await.unwrap_err();
    assert!(matches!(err, ExecutorError::QuoteUnavailable { ref symbol, .. } if symbol == "Y"));
    assert!(err.is_retryable());

    // The ledger side of the read does not depend on quotes.
    assert_eq!(h.portfolio.holdings(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_omit_policy_reports_unpriced_positions() {
    let h = Harness::new(QuoteFailurePolicy::Omit);
    let id = h.orders.open_account(None).await.unwrap().account_id;
    h.orders.buy(id, "X", 1).await.unwrap();
    h.orders.buy(id, "Y", 3).await.unwrap();
    h.quotes.set_failing("Y", true);

    let snapshot = h.portfolio.get_portfolio(id).await.unwrap();
    assert_eq!(snapshot.positions.len(), 1);
    assert_eq!(snapshot.positions[0].symbol, "X");
    assert_eq!(snapshot.unpriced.len(), 1);
    assert_eq!(snapshot.unpriced[0].symbol, "Y");
    assert_eq!(snapshot.unpriced[0].net_shares, 3);
    assert_eq!(snapshot.total, snapshot.cash + dec!(50.00));
}

#[tokio::test]
async fn test_sell_fails_when_quote_is_unavailable() {
    let h = harness();
    let id = h.orders.open_account(None).await.unwrap().account_id;
    h.orders.buy(id, "X", 2).await.unwrap();
    h.quotes.set_failing("X", true);

    let err = h.orders.sell(id, "X", 1).await.unwrap_err();
    assert!(matches!(err, ExecutorError::QuoteUnavailable { .. }));
    assert_eq!(h.store.net_shares(id, "X").await.unwrap(), 2);
}

#[tokio::test]
async fn test_held_symbol_dropped_by_provider() {
    let h = harness();
    let id = h.orders.open_account(None).await.unwrap().account_id;
    h.orders.buy(id, "X", 2).await.unwrap();
    h.quotes.remove_price("X");

    let err = h.orders.sell(id, "X", 1).await.unwrap_err();
    assert!(matches!(err, ExecutorError::QuoteUnavailable { ref symbol, .. } if symbol == "X"));
    assert!(matches!(
        h.portfolio.get_portfolio(id).await,
        Err(ExecutorError::QuoteUnavailable { .. })
    ));
    assert_eq!(h.store.net_shares(id, "X").await.unwrap(), 2);
}

#[tokio::test]
async fn test_store_outage_is_retryable_and_writes_nothing() {
    let h = harness();
    let id = h.orders.open_account(None).await.unwrap().account_id;

    h.store.set_offline(true);
    let err = h.orders.buy(id, "X", 1).await.unwrap_err();
    assert!(matches!(err, ExecutorError::StoreUnavailable(_)));
    assert!(err.is_retryable());
    assert!(matches!(
        h.portfolio.get_portfolio(id).await,
        Err(ExecutorError::StoreUnavailable(_))
    ));

    h.store.set_offline(false);
    let snapshot = h.portfolio.get_portfolio(id).await.unwrap();
    assert_eq!(snapshot.cash, DEFAULT_CASH);
    assert!(snapshot.positions.is_empty());

    // Repeating the request after the outage succeeds.
    h.orders.buy(id, "X", 1).await.unwrap();
}

#[tokio::test]
async fn test_reads_for_unknown_account() {
    let h = harness();
    let missing = Uuid::new_v4();
    assert!(matches!(
        h.portfolio.get_portfolio(missing).await,
        Err(ExecutorError::AccountNotFound(_))
    ));
    assert!(matches!(
        h.portfolio.get_history(missing).await,
        Err(ExecutorError::AccountNotFound(_))
    ));
    assert!(matches!(
        h.portfolio.holdings(missing).await,
        Err(ExecutorError::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn test_accounts_are_isolated() {
    let h = harness();
    let a = h.orders.open_account(None).await.unwrap().account_id;
    let b = h.orders.open_account(None).await.unwrap().account_id;

    h.orders.buy(a, "X", 3).await.unwrap();
    assert!(matches!(
        h.orders.sell(b, "X", 1).await,
        Err(ExecutorError::InsufficientShares { held: 0, .. })
    ));
    assert!(h.portfolio.holdings(b).await.unwrap().is_empty());
    assert_eq!(h.portfolio.get_portfolio(b).await.unwrap().cash, DEFAULT_CASH);
}

#[tokio::test]
async fn test_sub_cent_price_cannot_buy_shares_for_free() {
    let h = harness();
    h.quotes.set_price("X", dec!(0.004));

    let broke = h.orders.open_account(Some(dec!(0.00))).await.unwrap().account_id;
    match h.orders.buy(broke, "X", 1).await {
        Err(ExecutorError::InsufficientFunds { required, available }) => {
            assert_eq!(required, dec!(0.01));
            assert_eq!(available, dec!(0.00));
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
    assert!(h.portfolio.holdings(broke).await.unwrap().is_empty());

    // Every one-share buy costs a full cent, so a dollar buys 100 of them.
    let id = h.orders.open_account(Some(dec!(1.00))).await.unwrap().account_id;
    let mut filled = 0;
    for _ in 0..250 {
        match h.orders.buy(id, "X", 1).await {
            Ok(_) => filled += 1,
            Err(ExecutorError::InsufficientFunds { .. }) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(filled, 100);
    assert_eq!(h.store.account(id).await.unwrap().cash, dec!(0.00));

    let sold = h.orders.sell(id, "X", filled).await.unwrap();
    assert_eq!(sold.cash_after, dec!(0.40));
    assert!(sold.cash_after <= dec!(1.00));
}

#[tokio::test]
async fn test_unrepresentable_market_value_is_an_error() {
    let h = harness();
    let id = h.orders.open_account(None).await.unwrap().account_id;
    h.orders.buy(id, "X", 2).await.unwrap();
    h.quotes.set_price("X", rust_decimal::Decimal::MAX);

    let err = h.portfolio.get_portfolio(id).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Overflow(_)));
    assert_eq!(err.reason_code(), "overflow");
    assert!(!err.is_retryable());
}
