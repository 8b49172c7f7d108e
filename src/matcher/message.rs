//! In-game whisper for a chosen trade option

use std::collections::HashMap;

use crate::types::{GoodId, SellerInfo, TradeOption};

/// Render the `/w` message proposing `option` to its seller.
///
/// `names` maps good ids to display names; unknown ids are shown as-is.
pub fn trade_message(
    seller: &SellerInfo,
    option: &TradeOption,
    names: &HashMap<GoodId, String>,
) -> String {
    let mut parts = Vec::with_capacity(option.items.len());
    let mut terms = Vec::with_capacity(option.items.len());

    for (good, item) in &option.items {
        let name = names.get(good).map(String::as_str).unwrap_or(good);
        if item.quantity > 1 {
            parts.push(format!(
                "\"{}\" x{} for {} platinum each",
                name, item.quantity, item.price
            ));
            terms.push(format!("{}*{}", item.price, item.quantity));
        } else {
            parts.push(format!("\"{}\" for {} platinum", name, item.price));
            terms.push(item.price.to_string());
        }
    }

    format!(
        "/w {} Hi! I want to buy: {}, with a total of {} = {} platinum. (warframe.market)",
        seller.display_name,
        parts.join(", "),
        terms.join("+"),
        option.total_price
    )
}
