//! Image-generation provider adapters.
//!
//! Every backend implements [`provider::ImageProvider`]; the closed set of
//! backends is named by [`provider::ProviderKind`] and selected through
//! [`registry::ProviderRegistry::resolve`].

pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod reference;
pub mod registry;
pub mod text_prompt;
