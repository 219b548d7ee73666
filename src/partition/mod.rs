pub mod asset_key;
pub mod health;
pub mod selection;
pub mod span;
