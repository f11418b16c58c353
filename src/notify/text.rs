//! Reply texts.

pub const USAGE_OPEN: &str = "Create a new order collection like /neworder 15:30 Coffeeshop Kopi";
pub const USAGE_ADD: &str = "Add to the order like /order 2 kopi o kosong";
pub const USAGE_REMOVE: &str = "Use /cancelorder to remove one of your items";
pub const USAGE_CLOSE: &str = "Use /endorders to close the current order early";

pub const GENERIC_FAILURE: &str = "Oops, something went wrong";
pub const NO_ACTIVE_ORDER: &str =
    "No active orders! Create a new order collection like /neworder 15:30 Coffeeshop Kopi";
pub const OPEN_INVALID_FORMAT: &str =
    "Invalid format! Create a new order collection like /neworder 15:30 Coffeeshop Kopi";
pub const OPEN_INVALID_TIME: &str =
    "Invalid time! Create a new order collection like /neworder 15:30 Coffeeshop Kopi";
pub const ADD_INVALID_FORMAT: &str = "Invalid order! Add to the order like /order 2 kopi o kosong";
pub const ADD_INVALID_QUANTITY: &str = "Invalid quantity! Add to the order like /order 2 kopi o kosong";
pub const ORDER_CANCELLED: &str = "Active take orders cancelled";
pub const NO_ITEMS: &str = "You have no current orders";
pub const SELECT_ITEM_TO_REMOVE: &str = "Select order item to delete";
pub const INVALID_ITEM: &str = "Invalid Item";
pub const REMOVAL_ABANDONED: &str = "Canceled cancel order request";
pub const CLOSED: &str = "Orders closed";
pub const NO_ITEMS_YET: &str = "No items yet";
pub const CONSOLIDATED: &str = "Consolidated";

pub fn help() -> String {
    format!(
        "Use this bot to collect group orders!\n\n{}\n{}\n{}\n{}",
        USAGE_OPEN, USAGE_ADD, USAGE_REMOVE, USAGE_CLOSE
    )
}

pub fn existing_order(title: &str) -> String {
    format!("There is already an existing order for {}. {}", title, USAGE_CLOSE)
}

pub fn taking_orders(title: &str, deadline: &str, is_tomorrow: bool) -> String {
    let when = if is_tomorrow {
        format!("{} tomorrow", deadline)
    } else {
        deadline.to_string()
    };
    format!("Taking orders for {}, ending at {}\n\n{}\n{}", title, when, USAGE_ADD, USAGE_CLOSE)
}

pub fn removed_item(quantity: u32, name: &str) -> String {
    format!("Deleted order: {} x {}", quantity, name)
}
