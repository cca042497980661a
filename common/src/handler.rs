//! [`Handler`] abstraction shared by commands, queries and database
//! operations.

use std::future::Future;

/// Asynchronous handler of `Args`.
///
/// The same [`Handler`] type usually handles many different `Args` types,
/// each being a separate command, query or database operation.
///
/// ```rust
/// # use std::convert::Infallible;
/// use common::Handler;
///
/// struct Ledger {
///     capacity: u32,
/// }
///
/// struct Free {
///     taken: u32,
/// }
///
/// impl Handler<Free> for Ledger {
///     type Ok = u32;
///     type Err = Infallible;
///
///     async fn execute(&self, args: Free) -> Result<u32, Infallible> {
///         Ok(self.capacity.saturating_sub(args.taken))
///     }
/// }
/// ```
pub trait Handler<Args = ()> {
    /// Successful result of handling `Args`.
    type Ok;

    /// Error of handling `Args`.
    type Err;

    /// Handles the provided `Args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
