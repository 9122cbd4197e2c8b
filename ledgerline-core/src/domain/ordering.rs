//! Deterministic ordering of balance updates
//!
//! Every unit of work that touches two accounts updates the one with the
//! smaller id first. Row locks are therefore always acquired in ascending id
//! order across all concurrent transfers, which rules out circular waits.

use serde::{Deserialize, Serialize};

/// A signed change to one account's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub account_id: i64,
    pub delta: i64,
}

impl BalanceDelta {
    pub fn new(account_id: i64, delta: i64) -> Self {
        Self { account_id, delta }
    }
}

/// Order two balance updates by ascending account id.
///
/// The result depends only on the two ids, never on which side is the
/// source of the transfer. Equal ids keep their argument order.
pub fn order_pair(a: BalanceDelta, b: BalanceDelta) -> (BalanceDelta, BalanceDelta) {
    if b.account_id < a.account_id {
        (b, a)
    } else {
        (a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smaller_id_first_regardless_of_direction() {
        let (first, second) = order_pair(BalanceDelta::new(5, -30), BalanceDelta::new(9, 30));
        assert_eq!(first, BalanceDelta::new(5, -30));
        assert_eq!(second, BalanceDelta::new(9, 30));

        let (first, second) = order_pair(BalanceDelta::new(9, -30), BalanceDelta::new(5, 30));
        assert_eq!(first, BalanceDelta::new(5, 30));
        assert_eq!(second, BalanceDelta::new(9, -30));
    }

    #[test]
    fn test_deltas_travel_with_their_account() {
        let (first, second) = order_pair(BalanceDelta::new(42, 7), BalanceDelta::new(-1, -7));
        assert_eq!(first.account_id, -1);
        assert_eq!(first.delta, -7);
        assert_eq!(second.account_id, 42);
        assert_eq!(second.delta, 7);
    }

    #[test]
    fn test_deterministic() {
        let a = BalanceDelta::new(100, -1);
        let b = BalanceDelta::new(3, 1);
        assert_eq!(order_pair(a, b), order_pair(a, b));
        assert_eq!(order_pair(a, b).0.account_id, order_pair(b, a).0.account_id);
    }
}
