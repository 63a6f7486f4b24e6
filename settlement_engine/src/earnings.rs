//! Revenue split between the platform and costume owners.
//!
//! Every rental line of an order is split 30/70: the platform keeps 30 % of the line revenue, rounded to the nearest
//! whole dong (midpoints to even), and the costume's owner gets the remainder. Both shares of a line therefore always
//! add up to the line revenue exactly. Sale lines and deposits never earn anything.
use std::collections::HashMap;

use crate::{
    db_types::{Costume, EarningStatus, NewEarning, Order, OrderItem, Vnd},
    traits::SettlementError,
};

/// The platform's share of rental revenue, in percent.
pub const PLATFORM_SHARE_PERCENT: i64 = 30;

/// Splits `revenue` into `(platform_share, collaborator_share)`.
pub fn split_revenue(revenue: Vnd) -> (Vnd, Vnd) {
    let platform = revenue.scale_to_dong(PLATFORM_SHARE_PERCENT, 100);
    (platform, revenue - platform)
}

/// A line is a rental line if the whole order is a rental (it has a rental window), or if the line was charged at the
/// costume's rental price.
pub fn is_rental_line(order: &Order, item: &OrderItem, costume: &Costume) -> bool {
    order.is_rental() || item.price == costume.rental_price
}

/// Computes the earnings rows for an order. Zero-amount shares are left out. If the costume belongs to the platform
/// account itself, a single row carries the whole line revenue.
pub fn distribute(
    order: &Order,
    items: &[OrderItem],
    costumes: &HashMap<i64, Costume>,
    platform_account_id: i64,
    status: EarningStatus,
) -> Result<Vec<NewEarning>, SettlementError> {
    let mut rows = Vec::new();
    for item in items {
        let costume = costumes.get(&item.costume_id).ok_or(SettlementError::CostumeNotFound(item.costume_id))?;
        if !is_rental_line(order, item, costume) {
            continue;
        }
        let revenue = item.line_total().map_err(|e| {
            SettlementError::InvalidOrder(format!("Item {} of order {} has no valid line total. {e}", item.id, order.id))
        })?;
        let shares = if costume.owner_id == platform_account_id {
            vec![(platform_account_id, revenue)]
        } else {
            let (platform, collaborator) = split_revenue(revenue);
            vec![(platform_account_id, platform), (costume.owner_id, collaborator)]
        };
        rows.extend(shares.into_iter().filter(|(_, amount)| !amount.is_zero()).map(|(user_id, amount)| NewEarning {
            order_item_id: item.id,
            user_id,
            amount,
            status,
        }));
    }
    Ok(rows)
}
