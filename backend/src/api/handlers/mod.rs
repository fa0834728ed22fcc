pub mod citations;
pub mod health;
pub mod identity;
pub mod oauth;
pub mod profile;
pub mod search;
pub mod social;
pub mod works;
