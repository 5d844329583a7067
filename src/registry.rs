// 🗂️ Adapter Registry
// Maps bank codes (as sent by upload forms / CLI) to adapter constructors

use std::collections::BTreeMap;

use crate::adapters::{BpiAdapter, CgdAdapter, FormatAdapter, RevolutAdapter};
use crate::error::UnsupportedBankError;

/// Builds a fresh adapter for one ingestion
pub type AdapterConstructor = fn() -> Box<dyn FormatAdapter>;

/// AdapterRegistry - bank code → adapter factory
///
/// Lookup is exact and case-sensitive: "BPI" is registered, "bpi" is not.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    constructors: BTreeMap<String, AdapterConstructor>,
}

impl AdapterRegistry {
    /// Empty registry (every lookup fails until banks are registered)
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the supported banks: BPI, CGD, Revolut
    pub fn with_default_banks() -> Self {
        let mut registry = Self::new();
        registry.register("BPI", || Box::new(BpiAdapter::new()));
        registry.register("CGD", || Box::new(CgdAdapter::new()));
        registry.register("Revolut", || Box::new(RevolutAdapter::new()));
        registry
    }

    /// Add (or replace) the constructor for a bank code
    pub fn register(&mut self, bank: &str, constructor: AdapterConstructor) {
        self.constructors.insert(bank.to_string(), constructor);
    }

    /// Registered bank codes, sorted
    pub fn banks(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn get_handler(&self, bank: &str) -> Result<Box<dyn FormatAdapter>, UnsupportedBankError> {
        self.constructors
            .get(bank)
            .map(|construct| construct())
            .ok_or_else(|| UnsupportedBankError {
                bank: bank.to_string(),
            })
    }
}
