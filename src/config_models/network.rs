//! Network parameter sets (§1.1): each variant fixes the genesis file name,
//! the difficulty floor, and the default listen port for that network.

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Network {
    Main,
    Testnet,
    Regtest,
}

impl Network {
    pub fn dir_name(self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Network::Main => 9876,
            Network::Testnet => 19876,
            Network::Regtest => 29876,
        }
    }

    pub fn min_difficulty(self) -> u8 {
        match self {
            Network::Main => crate::constants::MIN_DIFFICULTY,
            Network::Testnet => crate::constants::MIN_DIFFICULTY,
            Network::Regtest => 1,
        }
    }

    pub fn genesis_file_name(self) -> &'static str {
        match self {
            Network::Main => "genesis.json",
            Network::Testnet => "genesis-testnet.json",
            Network::Regtest => "genesis-regtest.json",
        }
    }
}
