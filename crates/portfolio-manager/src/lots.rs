use crate::models::Transaction;
use std::collections::BTreeMap;
use tax_optimizer::{Lot, TaxResult, TransactionType};

const SHARE_EPSILON: f64 = 1e-6;

/// Reduce a transaction history to the buy lots still held.
///
/// Sells close the oldest lots of the same ticker first (FIFO). A partially
/// closed lot keeps its id and date with the remaining quantity. Selling more
/// than is held is logged and the excess ignored.
pub fn open_lots(transactions: &[Transaction]) -> TaxResult<Vec<Lot>> {
    let mut by_ticker: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        by_ticker.entry(tx.ticker.as_str()).or_default().push(tx);
    }

    let mut result = Vec::new();

    for (ticker, mut history) in by_ticker {
        // Same-day buys settle before same-day sells
        history.sort_by(|a, b| {
            a.transaction_date
                .cmp(&b.transaction_date)
                .then_with(|| sell_rank(a).cmp(&sell_rank(b)))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut held: Vec<Lot> = Vec::new();

        for tx in history {
            let lot = tx.lot()?;
            match lot.transaction_type {
                TransactionType::Buy => held.push(lot),
                TransactionType::Sell => {
                    let mut remaining = lot.quantity;
                    while remaining > SHARE_EPSILON && !held.is_empty() {
                        let oldest = &mut held[0];
                        if oldest.quantity <= remaining + SHARE_EPSILON {
                            remaining -= oldest.quantity;
                            held.remove(0);
                        } else {
                            oldest.quantity -= remaining;
                            remaining = 0.0;
                        }
                    }

                    if remaining > SHARE_EPSILON {
                        tracing::warn!(
                            ticker,
                            transaction_id = tx.id,
                            excess = remaining,
                            "sell exceeds shares held, ignoring excess"
                        );
                    }
                }
            }
        }

        result.extend(held);
    }

    Ok(result)
}

fn sell_rank(tx: &Transaction) -> u8 {
    if tx.transaction_type == TransactionType::Sell.as_str() {
        1
    } else {
        0
    }
}
