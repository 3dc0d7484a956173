//! Record types and their filter schemas

pub mod client;
pub mod meal;
pub mod menu;
pub mod product;
pub mod recipe;

pub use client::Client;
pub use meal::{Meal, MealRepo, MealWithRecipes};
pub use menu::Menu;
pub use product::Product;
pub use recipe::Recipe;
