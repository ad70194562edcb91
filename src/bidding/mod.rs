pub mod commands;
pub mod model;
pub mod price;
pub mod rules;
