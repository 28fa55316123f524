//! The contract every comparison strategy implements

use crate::error::{Result, TabcompareError};
use crate::params::{ParameterSchema, Parameters};
use crate::result::ComparisonResult;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identity and parameter schema of a strategy, used for lookup and
/// for building configuration forms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    pub name: String,
    pub description: String,
    pub version: String,
    pub parameters: ParameterSchema,
}

/// Cooperative cancellation flag shared between a caller and a running comparison
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fail with [`TabcompareError::Cancelled`] once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TabcompareError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A comparison algorithm over two tables.
///
/// Implementations must not keep state between calls; anything needed
/// while comparing lives on the stack of `compare`.
pub trait ComparisonStrategy: Send + Sync {
    /// Unique, stable name used for lookup and persisted user choices
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn version(&self) -> &str;

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
    }

    /// Check inputs before comparing; `Some(message)` rejects them.
    ///
    /// Either side missing is rejected, and so is a pair of empty tables.
    /// One empty side is a legitimate comparison.
    fn validate(&self, a: Option<&Table>, b: Option<&Table>) -> Option<String> {
        match (a, b) {
            (None, _) | (_, None) => Some("Both tables must be provided".to_string()),
            (Some(a), Some(b)) if a.is_empty() && b.is_empty() => {
                Some("Both tables are empty; nothing to compare".to_string())
            }
            _ => None,
        }
    }

    fn compare(
        &self,
        a: &Table,
        b: &Table,
        params: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResult>;

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            version: self.version().to_string(),
            parameters: self.parameters(),
        }
    }
}
