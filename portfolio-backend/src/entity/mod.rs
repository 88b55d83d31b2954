pub mod portfolio;

pub use portfolio::Entity as Portfolio;
