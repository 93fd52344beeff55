//! Model-first composite with a rule-engine fallback
//!
//! Every decision trait in this crate is implemented for `WithFallback`:
//! the primary (model-backed) strategy is tried first and any error it
//! returns is logged and answered by the fallback (rule-engine) strategy
//! instead. Rule engines never fail, so the composite never does either.

/// Primary strategy guarded by a fallback strategy of the same trait
#[derive(Debug, Clone)]
pub struct WithFallback<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> WithFallback<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }
}

/// Run the primary future, recovering with the fallback on error
macro_rules! try_primary {
    ($component:literal, $primary:expr, $fallback:expr) => {
        match $primary.await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    component = $component,
                    "model strategy failed, falling back to rule engine"
                );
                $fallback.await
            }
        }
    };
}

pub(crate) use try_primary;
