//! Session, connectivity and sensitive-operation core of a CSC desktop
//! wallet.
//!
//! The display layer talks to [`home::HomeController`] exclusively through
//! [`events::Command`] and [`events::UiEvent`] channels; the host shell
//! delivers lifecycle signals the same way. Wallet persistence, the network
//! protocol and market data sit behind the [`store::WalletStore`],
//! [`network::NetworkClient`] and [`market::MarketService`] traits.

pub mod config;
pub mod error;
pub mod events;
pub mod home;
pub mod market;
pub mod network;
pub mod store;

pub use home::{Collaborators, HomeController};
