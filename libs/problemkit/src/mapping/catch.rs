use crate::error::DynError;

/// Runtime type test used by every rule.
///
/// Concrete error types match by exact type through [`DynError::downcast_ref`].
/// The base error object type [`DynError`] matches every error, so rules
/// registered against it act as catch-all rules.
pub trait Catch: 'static {
    /// Narrow `error` to `Self`, or `None` if it is of another type.
    fn catch(error: &DynError) -> Option<&Self>;

    #[must_use]
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<E> Catch for E
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn catch(error: &DynError) -> Option<&Self> {
        error.downcast_ref::<E>()
    }
}

impl Catch for DynError {
    fn catch(error: &DynError) -> Option<&Self> {
        Some(error)
    }
}
