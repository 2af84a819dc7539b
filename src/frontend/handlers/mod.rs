mod admin;
mod cart;
mod catalog;
mod health;

pub(crate) use admin::sessions;
pub(crate) use cart::{add_to_cart, checkout, show_cart};
pub(crate) use catalog::{get_item, list_by_type, list_types, search};
pub(crate) use health::ping;
