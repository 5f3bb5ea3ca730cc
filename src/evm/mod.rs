pub mod contract;
pub mod driver;
pub mod transport;

pub use driver::EvmBetting;
pub use transport::{
    AlloyConnector, BetTransaction, ChainReader, Confirmation, TransportConnector, WalletTransport,
};
