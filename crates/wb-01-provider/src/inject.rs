//! Single access point for the page's provider.
//!
//! A page gets exactly one provider. A second injection (for example a
//! content script that runs twice) is detected and skipped; the first
//! provider stays in place.

use crate::service::Provider;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

/// Injection errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error("A provider is already injected")]
    AlreadyInjected,
}

/// Write-once slot holding an injected value.
pub struct InjectionSlot<T> {
    cell: OnceLock<T>,
}

impl<T> InjectionSlot<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Install the value built by `init`.
    ///
    /// `init` runs only if the slot is empty.
    pub fn install_with<F>(&self, init: F) -> Result<&T, InjectError>
    where
        F: FnOnce() -> T,
    {
        let mut created = false;
        let value = self.cell.get_or_init(|| {
            created = true;
            init()
        });

        if created {
            Ok(value)
        } else {
            warn!("Provider already injected, skipping");
            Err(InjectError::AlreadyInjected)
        }
    }

    /// Install a value.
    pub fn install(&self, value: T) -> Result<&T, InjectError> {
        self.install_with(|| value)
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_installed(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for InjectionSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide provider.
pub static GLOBAL_PROVIDER: InjectionSlot<Provider> = InjectionSlot::new();
