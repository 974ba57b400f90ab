pub mod authorize;
pub mod error;
pub mod exchanger;
pub mod transport;

pub use error::ExchangeError;
pub use exchanger::{TokenExchanger, TokenPair};
