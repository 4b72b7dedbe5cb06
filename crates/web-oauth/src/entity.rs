//! Entity verification seam.
//!
//! After a token's claims validate, the entity they name still has to be
//! accepted by the application. That decision is never made here: it is
//! delegated to an [`EntityVerifier`] supplied at setup.

use crate::errors::AuthError;
use crate::rpc::AuthContext;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Decides whether an entity may connect.
#[async_trait]
pub trait EntityVerifier: Send + Sync {
    /// Opaque information about the entity, bound to the request on success.
    type Info: Send + Sync + 'static;

    /// Verify `entity` for the request described by `ctx`.
    ///
    /// # Errors
    ///
    /// Any error rejects the request.
    async fn verify_entity(&self, ctx: &AuthContext, entity: &str) -> Result<Self::Info, AuthError>;
}

/// [`EntityVerifier`] backed by an async closure.
#[derive(Clone)]
pub struct FnEntityVerifier<F> {
    f: F,
}

impl<F> fmt::Debug for FnEntityVerifier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEntityVerifier").finish_non_exhaustive()
    }
}

/// Wrap an async closure as an [`EntityVerifier`].
///
/// The closure receives an owned copy of the context and entity so its
/// future does not borrow from the caller.
///
/// ```rust,ignore
/// let verifier = entity_verifier_fn(|_ctx, entity| async move {
///     Ok::<_, AuthError>(entity)
/// });
/// ```
pub fn entity_verifier_fn<F, Fut, I>(f: F) -> FnEntityVerifier<F>
where
    F: Fn(AuthContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<I, AuthError>> + Send + 'static,
    I: Send + Sync + 'static,
{
    FnEntityVerifier { f }
}

#[async_trait]
impl<F, Fut, I> EntityVerifier for FnEntityVerifier<F>
where
    F: Fn(AuthContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<I, AuthError>> + Send + 'static,
    I: Send + Sync + 'static,
{
    type Info = I;

    async fn verify_entity(&self, ctx: &AuthContext, entity: &str) -> Result<I, AuthError> {
        (self.f)(ctx.clone(), entity.to_string()).await
    }
}

#[async_trait]
impl<T> EntityVerifier for Arc<T>
where
    T: EntityVerifier + ?Sized,
{
    type Info = T::Info;

    async fn verify_entity(&self, ctx: &AuthContext, entity: &str) -> Result<T::Info, AuthError> {
        (**self).verify_entity(ctx, entity).await
    }
}
