//! Local key wallet
//!
//! SECURITY: this is the only place a private key is parsed.
//! - Keys arrive as `SecretString` and are exposed only to build the signer
//! - Keys are never serialized or logged

use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use secrecy::{ExposeSecret, SecretString};

/// Wallet holding a local private key
pub struct SecureWallet {
    /// Public address (safe to expose)
    address: Address,
    /// Ethereum wallet for alloy provider integration
    wallet: EthereumWallet,
}

impl SecureWallet {
    pub fn from_secret(key: &SecretString) -> Result<Self> {
        let key_hex = key.expose_secret();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Wallet(format!("Invalid private key: {}", e)))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        Ok(Self { address, wallet })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the EthereumWallet for use with alloy providers
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

// Avoid exposing the signer
impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::network::{Ethereum, NetworkWallet};

    // Well-known development key (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn derives_address_from_secret() {
        let wallet = SecureWallet::from_secret(&SecretString::from(TEST_KEY.to_string())).unwrap();
        let expected: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        assert_eq!(wallet.address(), expected);
    }

    #[test]
    fn rejects_malformed_key() {
        let err = SecureWallet::from_secret(&SecretString::from("0xnothex".to_string())).unwrap_err();
        assert!(matches!(err, Error::Wallet(_)));
    }

    #[test]
    fn provider_wallet_signs_as_derived_address() {
        let wallet = SecureWallet::from_secret(&SecretString::from(TEST_KEY.to_string())).unwrap();
        let signer = <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(
            wallet.wallet(),
        );
        assert_eq!(signer, wallet.address());
    }

    #[test]
    fn debug_redacts_key() {
        let wallet = SecureWallet::from_secret(&SecretString::from(TEST_KEY.to_string())).unwrap();
        let debug_str = format!("{:?}", wallet);
        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
