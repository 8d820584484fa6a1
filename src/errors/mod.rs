//! Contract faults raised by the type engine
//!
//! Every operation validates its preconditions before touching any state.
//! A failed check is reported as a [`ContractError`] carrying the fault
//! category and the contract clause that was violated.

use std::fmt;
use thiserror::Error;

/// Category of a violated contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Wrong argument kind (not a routine, bad arity, empty identifier...)
    Shape,
    /// Reference to an undefined feature, key or converter
    Existence,
    /// Operation attempted in the wrong phase, or circular inheritance
    State,
    /// Conflicting redefinition or duplicate key
    Uniqueness,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape => write!(f, "shape"),
            Self::Existence => write!(f, "existence"),
            Self::State => write!(f, "state"),
            Self::Uniqueness => write!(f, "uniqueness"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} fault: {contract}")]
pub struct ContractError {
    pub kind: FaultKind,
    pub contract: String,
}

impl ContractError {
    pub fn new(kind: FaultKind, contract: impl Into<String>) -> Self {
        let contract = contract.into();
        tracing::debug!(target: "contract", %kind, contract = contract.as_str(), "contract fault");
        Self { kind, contract }
    }

    pub fn shape(contract: impl Into<String>) -> Self {
        Self::new(FaultKind::Shape, contract)
    }

    pub fn existence(contract: impl Into<String>) -> Self {
        Self::new(FaultKind::Existence, contract)
    }

    pub fn state(contract: impl Into<String>) -> Self {
        Self::new(FaultKind::State, contract)
    }

    pub fn uniqueness(contract: impl Into<String>) -> Self {
        Self::new(FaultKind::Uniqueness, contract)
    }

    pub fn is(&self, kind: FaultKind) -> bool {
        self.kind == kind
    }
}

/// Check a precondition, failing with `kind` when it does not hold
#[inline]
pub fn require(condition: bool, kind: FaultKind, contract: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(ContractError::new(kind, contract()))
    }
}

/// Errors raised while loading engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ContractError>;
